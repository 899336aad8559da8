use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use snippets_gax::status::Status;

use crate::row::{metadata, Field, Row};
use crate::value::Value;

/// RowIterator yields the rows of one read or query.
///
/// The rows are materialized from a single snapshot when the read is issued,
/// so iterating never observes later commits.
pub struct RowIterator {
    index: Arc<HashMap<String, usize>>,
    fields: Arc<Vec<Field>>,
    rows: VecDeque<Vec<Value>>,
}

impl RowIterator {
    pub(crate) fn new(fields: Vec<Field>, rows: Vec<Vec<Value>>) -> Self {
        let (index, fields) = metadata(fields);
        RowIterator {
            index,
            fields,
            rows: rows.into(),
        }
    }

    pub fn columns_metadata(&self) -> &Arc<Vec<Field>> {
        &self.fields
    }

    pub fn column_metadata(&self, column_name: &str) -> Option<(usize, Field)> {
        let index = *self.index.get(column_name)?;
        self.fields.get(index).map(|f| (index, f.clone()))
    }

    /// Number of rows not yet returned by next.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    /// next returns the next result.
    /// Its second return value is None if there are no more results.
    pub async fn next(&mut self) -> Result<Option<Row>, Status> {
        Ok(self
            .rows
            .pop_front()
            .map(|values| Row::new(self.index.clone(), self.fields.clone(), values)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ColumnType;

    #[tokio::test]
    async fn test_next_until_exhausted() {
        let fields = vec![
            Field {
                name: "SingerId".to_string(),
                column_type: ColumnType::Int64,
            },
            Field {
                name: "AlbumTitle".to_string(),
                column_type: ColumnType::String(None),
            },
        ];
        let mut iter = RowIterator::new(
            fields,
            vec![
                vec![Value::Int64(1), Value::String("Total Junk".to_string())],
                vec![Value::Int64(2), Value::String("Green".to_string())],
            ],
        );
        assert_eq!(iter.column_metadata("AlbumTitle").map(|(i, _)| i), Some(1));
        assert!(iter.column_metadata("Nope").is_none());

        let row = iter.next().await.unwrap().unwrap();
        assert_eq!(row.column_by_name::<i64>("SingerId").unwrap(), 1);
        assert_eq!(iter.remaining(), 1);
        let row = iter.next().await.unwrap().unwrap();
        assert_eq!(row.column::<String>(1).unwrap(), "Green");
        assert!(iter.next().await.unwrap().is_none());
    }
}
