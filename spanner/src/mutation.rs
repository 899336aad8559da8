use crate::key::KeySet;
use crate::statement::ToValue;
use crate::value::Value;

/// A row write: the named columns and one list of values per row.
#[derive(Clone, Debug, PartialEq)]
pub struct Write {
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Value>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Delete {
    pub table: String,
    pub key_set: KeySet,
}

/// A modification to one or more rows, buffered until commit.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    Insert(Write),
    Update(Write),
    InsertOrUpdate(Write),
    Replace(Write),
    Delete(Delete),
}

impl Mutation {
    pub fn table(&self) -> &str {
        match self {
            Mutation::Insert(w) | Mutation::Update(w) | Mutation::InsertOrUpdate(w) | Mutation::Replace(w) => &w.table,
            Mutation::Delete(d) => &d.table,
        }
    }
}

fn write(table: &str, columns: &[&str], values: &[&dyn ToValue]) -> Write {
    Write {
        table: table.to_string(),
        columns: columns.iter().map(|x| x.to_string()).collect(),
        values: vec![values.iter().map(|x| x.to_value()).collect()],
    }
}

fn write_map(table: &str, columns_and_values: &[(&str, &dyn ToValue)]) -> Write {
    let mut columns = Vec::with_capacity(columns_and_values.len());
    let mut values = Vec::with_capacity(columns_and_values.len());
    columns_and_values.iter().for_each(|x| {
        columns.push(x.0.to_string());
        values.push(x.1.to_value());
    });
    Write {
        table: table.to_string(),
        columns,
        values: vec![values],
    }
}

fn write_rows(table: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Write {
    Write {
        table: table.to_string(),
        columns: columns.iter().map(|x| x.to_string()).collect(),
        values: rows,
    }
}

/// insert returns a Mutation to insert a row into a table. If the row already
/// exists, the write or transaction fails with Code::AlreadyExists.
pub fn insert(table: &str, columns: &[&str], values: &[&dyn ToValue]) -> Mutation {
    Mutation::Insert(write(table, columns, values))
}

/// insert_map returns a Mutation to insert a row into a table, specified by
/// a map of column name to value. If the row already exists, the write or
/// transaction fails with Code::AlreadyExists.
pub fn insert_map(table: &str, columns_and_values: &[(&str, &dyn ToValue)]) -> Mutation {
    Mutation::Insert(write_map(table, columns_and_values))
}

/// insert_rows returns a Mutation to insert several rows sharing the same columns.
pub fn insert_rows(table: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Mutation {
    Mutation::Insert(write_rows(table, columns, rows))
}

/// update returns a Mutation to update a row in a table. If the row does not
/// already exist, the write or transaction fails with Code::NotFound.
pub fn update(table: &str, columns: &[&str], values: &[&dyn ToValue]) -> Mutation {
    Mutation::Update(write(table, columns, values))
}

/// update_map returns a Mutation to update a row in a table, specified by
/// a map of column to value. If the row does not already exist, the write or
/// transaction fails.
pub fn update_map(table: &str, columns_and_values: &[(&str, &dyn ToValue)]) -> Mutation {
    Mutation::Update(write_map(table, columns_and_values))
}

/// update_rows returns a Mutation to update several existing rows sharing the same columns.
pub fn update_rows(table: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Mutation {
    Mutation::Update(write_rows(table, columns, rows))
}

/// replace returns a Mutation to insert a row into a table, deleting any
/// existing row. Unlike insert_or_update, this means any values not explicitly
/// written become NULL.
pub fn replace(table: &str, columns: &[&str], values: &[&dyn ToValue]) -> Mutation {
    Mutation::Replace(write(table, columns, values))
}

/// replace_map returns a Mutation to insert a row into a table, deleting any
/// existing row. The row is specified by a map of column to value.
pub fn replace_map(table: &str, columns_and_values: &[(&str, &dyn ToValue)]) -> Mutation {
    Mutation::Replace(write_map(table, columns_and_values))
}

/// insert_or_update returns a Mutation to insert a row into a table. If the row
/// already exists, it updates it instead. Any column values not explicitly
/// written are preserved.
pub fn insert_or_update(table: &str, columns: &[&str], values: &[&dyn ToValue]) -> Mutation {
    Mutation::InsertOrUpdate(write(table, columns, values))
}

/// insert_or_update_map is insert_or_update with the row given as column/value pairs.
pub fn insert_or_update_map(table: &str, columns_and_values: &[(&str, &dyn ToValue)]) -> Mutation {
    Mutation::InsertOrUpdate(write_map(table, columns_and_values))
}

/// delete removes the rows described by the KeySet from the table. It succeeds
/// whether or not the keys were present.
pub fn delete(table: &str, key_set: impl Into<KeySet>) -> Mutation {
    Mutation::Delete(Delete {
        table: table.to_string(),
        key_set: key_set.into(),
    })
}

#[cfg(test)]
mod tests {
    use crate::key::*;
    use crate::mutation::*;

    #[test]
    fn test_insert() {
        let mutation = insert("Singers", &["SingerId", "FirstName", "LastName"], &[&1, &"Marc", &"Richards"]);
        match mutation {
            Mutation::Insert(mut w) => {
                assert_eq!("Singers", w.table);
                assert_eq!(3, w.values.pop().unwrap().len());
                assert_eq!("LastName", w.columns.pop().unwrap());
                assert_eq!("FirstName", w.columns.pop().unwrap());
                assert_eq!("SingerId", w.columns.pop().unwrap());
            }
            _ => panic!("invalid operation"),
        }
    }

    #[test]
    fn test_insert_map() {
        let singer_id = 1;
        let mutation = insert_map("Singers", &[("FirstName", &"Marc"), ("SingerId", &singer_id)]);
        match mutation {
            Mutation::Insert(w) => {
                assert_eq!(vec!["FirstName".to_string(), "SingerId".to_string()], w.columns);
                assert_eq!(vec![vec![Value::String("Marc".into()), Value::Int64(1)]], w.values);
            }
            _ => panic!("invalid operation"),
        }
    }

    #[test]
    fn test_insert_rows() {
        let mutation = insert_rows(
            "Albums",
            &["SingerId", "AlbumId", "AlbumTitle"],
            vec![
                vec![Value::Int64(1), Value::Int64(1), Value::String("Total Junk".into())],
                vec![Value::Int64(1), Value::Int64(2), Value::String("Go, Go, Go".into())],
            ],
        );
        match mutation {
            Mutation::Insert(w) => assert_eq!(2, w.values.len()),
            _ => panic!("invalid operation"),
        }
    }

    #[test]
    fn test_update() {
        let mutation = update("Albums", &["SingerId", "AlbumId", "MarketingBudget"], &[&1, &1, &100000]);
        match mutation {
            Mutation::Update(w) => {
                assert_eq!("Albums", w.table);
                assert_eq!(3, w.columns.len());
            }
            _ => panic!("invalid operation"),
        }
    }

    #[test]
    fn test_replace() {
        let mutation = replace("Singers", &["SingerId"], &[&1]);
        assert!(matches!(mutation, Mutation::Replace(_)));
    }

    #[test]
    fn test_insert_or_update() {
        let mutation = insert_or_update("Singers", &["SingerId", "FirstName"], &[&1, &None::<String>]);
        match mutation {
            Mutation::InsertOrUpdate(w) => assert_eq!(vec![vec![Value::Int64(1), Value::Null]], w.values),
            _ => panic!("invalid operation"),
        }
    }

    #[test]
    fn test_delete() {
        let mutation = delete("Singers", all_keys());
        match mutation {
            Mutation::Delete(d) => {
                assert_eq!("Singers", d.table);
                assert!(d.key_set.is_all());
            }
            _ => panic!("invalid operation"),
        }
    }
}
