//! Schema definitions and the DDL subset accepted by the store.
//!
//! Supported statements:
//!
//! ```text
//! CREATE TABLE t (c TYPE [NOT NULL], ...) PRIMARY KEY (c [ASC|DESC], ...)
//!     [, INTERLEAVE IN PARENT p [ON DELETE {CASCADE | NO ACTION}]]
//! ALTER TABLE t ADD COLUMN c TYPE
//! ALTER TABLE t DROP COLUMN c
//! DROP TABLE t
//! ```
//!
//! TYPE is one of INT64, FLOAT64, BOOL, STRING(n|MAX), BYTES(n|MAX).

use std::collections::BTreeMap;

use snippets_gax::status::Status;

use crate::lexer::{Parser, Token};
use crate::value::ColumnType;

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    pub not_null: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    NoAction,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Interleave {
    pub parent: String,
    pub on_delete: OnDelete,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    pub interleave: Option<Interleave>,
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_key_column(&self, name: &str) -> bool {
        self.primary_key.iter().any(|k| k == name)
    }

    /// Renders the table as a CREATE TABLE statement that `parse` accepts.
    pub fn to_ddl(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let not_null = if c.not_null { " NOT NULL" } else { "" };
                format!("  {} {}{},\n", c.name, c.column_type, not_null)
            })
            .collect::<String>();
        let mut ddl = format!(
            "CREATE TABLE {} (\n{}) PRIMARY KEY ({})",
            self.name,
            columns,
            self.primary_key.join(", ")
        );
        if let Some(interleave) = &self.interleave {
            let on_delete = match interleave.on_delete {
                OnDelete::Cascade => "CASCADE",
                OnDelete::NoAction => "NO ACTION",
            };
            ddl.push_str(&format!(
                ",\n  INTERLEAVE IN PARENT {} ON DELETE {}",
                interleave.parent, on_delete
            ));
        }
        ddl
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DdlStatement {
    CreateTable(TableDef),
    AddColumn { table: String, column: ColumnDef },
    DropColumn { table: String, column: String },
    DropTable(String),
}

/// Tables of one database, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    tables: BTreeMap<String, TableDef>,
}

impl Schema {
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    pub(crate) fn table_or_not_found(&self, name: &str) -> Result<&TableDef, Status> {
        self.table(name)
            .ok_or_else(|| Status::not_found(format!("Table not found: {}", name)))
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableDef> {
        self.tables.values()
    }

    /// Tables directly interleaved in `parent`.
    pub fn children<'a>(&'a self, parent: &'a str) -> impl Iterator<Item = &'a TableDef> + 'a {
        self.tables
            .values()
            .filter(move |t| t.interleave.as_ref().is_some_and(|i| i.parent == parent))
    }

    /// Tables ordered so that every parent precedes its interleaved children.
    pub fn ordered_tables(&self) -> Vec<&TableDef> {
        fn visit<'a>(schema: &'a Schema, table: &'a TableDef, out: &mut Vec<&'a TableDef>) {
            out.push(table);
            for child in schema.children(&table.name) {
                visit(schema, child, out);
            }
        }
        let mut out = Vec::with_capacity(self.tables.len());
        for root in self.tables.values().filter(|t| t.interleave.is_none()) {
            visit(self, root, &mut out);
        }
        out
    }

    /// The schema as a list of CREATE TABLE statements.
    pub fn ddl(&self) -> Vec<String> {
        self.ordered_tables().into_iter().map(|t| t.to_ddl()).collect()
    }

    /// Validates `statement` against the current schema and applies it.
    pub(crate) fn apply(&mut self, statement: &DdlStatement) -> Result<(), Status> {
        match statement {
            DdlStatement::CreateTable(def) => {
                if self.tables.contains_key(&def.name) {
                    return Err(Status::already_exists(format!("Duplicate name in schema: {}", def.name)));
                }
                self.validate_new_table(def)?;
                self.tables.insert(def.name.clone(), def.clone());
            }
            DdlStatement::AddColumn { table, column } => {
                let def = self.table_or_not_found(table)?;
                if def.column(&column.name).is_some() {
                    return Err(Status::already_exists(format!(
                        "Duplicate column name {}.{}",
                        table, column.name
                    )));
                }
                if column.not_null {
                    return Err(Status::failed_precondition(format!(
                        "Cannot add NOT NULL column {}.{} to existing table",
                        table, column.name
                    )));
                }
                if let Some(def) = self.tables.get_mut(table) {
                    def.columns.push(column.clone());
                }
            }
            DdlStatement::DropColumn { table, column } => {
                let def = self.table_or_not_found(table)?;
                if def.column(column).is_none() {
                    return Err(Status::not_found(format!("Column not found: {}.{}", table, column)));
                }
                if def.is_key_column(column) {
                    return Err(Status::failed_precondition(format!(
                        "Cannot drop key column {}.{}",
                        table, column
                    )));
                }
                if let Some(def) = self.tables.get_mut(table) {
                    def.columns.retain(|c| &c.name != column);
                }
            }
            DdlStatement::DropTable(table) => {
                self.table_or_not_found(table)?;
                if let Some(child) = self.children(table).next() {
                    return Err(Status::failed_precondition(format!(
                        "Cannot drop table {} with interleaved table {}",
                        table, child.name
                    )));
                }
                self.tables.remove(table);
            }
        }
        Ok(())
    }

    fn validate_new_table(&self, def: &TableDef) -> Result<(), Status> {
        for (i, column) in def.columns.iter().enumerate() {
            if def.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(Status::invalid_argument(format!(
                    "Duplicate column name {}.{}",
                    def.name, column.name
                )));
            }
        }
        if def.primary_key.is_empty() {
            return Err(Status::invalid_argument(format!("Table {} has no primary key", def.name)));
        }
        for key in &def.primary_key {
            if def.column(key).is_none() {
                return Err(Status::invalid_argument(format!(
                    "Table {} references nonexistent key column {}",
                    def.name, key
                )));
            }
        }
        if let Some(interleave) = &def.interleave {
            let parent = self.table(&interleave.parent).ok_or_else(|| {
                Status::not_found(format!(
                    "Table {} is interleaved in nonexistent table {}",
                    def.name, interleave.parent
                ))
            })?;
            if parent.primary_key.len() >= def.primary_key.len() {
                return Err(Status::failed_precondition(format!(
                    "Table {} must have more key columns than its parent {}",
                    def.name, parent.name
                )));
            }
            for (i, parent_key) in parent.primary_key.iter().enumerate() {
                let same_type = parent.column(parent_key).map(|c| c.column_type)
                    == def.column(&def.primary_key[i]).map(|c| c.column_type);
                if &def.primary_key[i] != parent_key || !same_type {
                    return Err(Status::failed_precondition(format!(
                        "Table {} does not reference parent key column {}",
                        def.name, parent_key
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Parses a single DDL statement.
pub fn parse(sql: &str) -> Result<DdlStatement, Status> {
    parse_statement(sql).map_err(|e| Status::invalid_argument(format!("Error parsing Spanner DDL statement: {} : {}", sql.trim(), e)))
}

fn parse_statement(sql: &str) -> Result<DdlStatement, String> {
    let mut p = Parser::new(sql)?;
    let statement = if p.consume_keyword("CREATE") {
        p.expect_keyword("TABLE")?;
        parse_create_table(&mut p)?
    } else if p.consume_keyword("ALTER") {
        p.expect_keyword("TABLE")?;
        let table = p.expect_identifier()?;
        if p.consume_keyword("ADD") {
            p.consume_keyword("COLUMN");
            DdlStatement::AddColumn {
                table,
                column: parse_column(&mut p)?,
            }
        } else if p.consume_keyword("DROP") {
            p.consume_keyword("COLUMN");
            DdlStatement::DropColumn {
                table,
                column: p.expect_identifier()?,
            }
        } else {
            return Err("expected ADD or DROP".to_string());
        }
    } else if p.consume_keyword("DROP") {
        p.expect_keyword("TABLE")?;
        DdlStatement::DropTable(p.expect_identifier()?)
    } else {
        return Err("expected CREATE, ALTER or DROP".to_string());
    };
    p.expect_end()?;
    Ok(statement)
}

fn parse_create_table(p: &mut Parser) -> Result<DdlStatement, String> {
    let name = p.expect_identifier()?;
    p.expect(&Token::LeftParen)?;
    let mut columns = vec![];
    // a trailing comma before ')' is allowed
    while !p.consume(&Token::RightParen) {
        columns.push(parse_column(p)?);
        if !p.consume(&Token::Comma) {
            p.expect(&Token::RightParen)?;
            break;
        }
    }
    p.expect_keyword("PRIMARY")?;
    p.expect_keyword("KEY")?;
    p.expect(&Token::LeftParen)?;
    let mut primary_key = vec![];
    while !p.consume(&Token::RightParen) {
        primary_key.push(p.expect_identifier()?);
        if !p.consume_keyword("ASC") {
            p.consume_keyword("DESC");
        }
        if !p.consume(&Token::Comma) {
            p.expect(&Token::RightParen)?;
            break;
        }
    }
    let mut interleave = None;
    if p.consume(&Token::Comma) {
        p.expect_keyword("INTERLEAVE")?;
        p.expect_keyword("IN")?;
        p.expect_keyword("PARENT")?;
        let parent = p.expect_identifier()?;
        let mut on_delete = OnDelete::NoAction;
        if p.consume_keyword("ON") {
            p.expect_keyword("DELETE")?;
            if p.consume_keyword("CASCADE") {
                on_delete = OnDelete::Cascade;
            } else {
                p.expect_keyword("NO")?;
                p.expect_keyword("ACTION")?;
            }
        }
        interleave = Some(Interleave { parent, on_delete });
    }
    Ok(DdlStatement::CreateTable(TableDef {
        name,
        columns,
        primary_key,
        interleave,
    }))
}

fn parse_column(p: &mut Parser) -> Result<ColumnDef, String> {
    let name = p.expect_identifier()?;
    let column_type = parse_type(p)?;
    let not_null = if p.consume_keyword("NOT") {
        p.expect_keyword("NULL")?;
        true
    } else {
        false
    };
    Ok(ColumnDef {
        name,
        column_type,
        not_null,
    })
}

fn parse_type(p: &mut Parser) -> Result<ColumnType, String> {
    let name = p.expect_identifier()?;
    match name.to_ascii_uppercase().as_str() {
        "INT64" => Ok(ColumnType::Int64),
        "FLOAT64" => Ok(ColumnType::Float64),
        "BOOL" => Ok(ColumnType::Bool),
        "STRING" => Ok(ColumnType::String(parse_length(p)?)),
        "BYTES" => Ok(ColumnType::Bytes(parse_length(p)?)),
        other => Err(format!("unsupported type {}", other)),
    }
}

fn parse_length(p: &mut Parser) -> Result<Option<usize>, String> {
    p.expect(&Token::LeftParen)?;
    let length = match p.next_token() {
        Some(Token::Integer(n)) if n > 0 => Some(n as usize),
        Some(t) if t.is_keyword("MAX") => None,
        Some(t) => return Err(format!("invalid length {}", t)),
        None => return Err("missing length".to_string()),
    };
    p.expect(&Token::RightParen)?;
    Ok(length)
}

#[cfg(test)]
mod tests {
    use snippets_gax::status::Code;

    use super::*;

    const SINGERS: &str = "CREATE TABLE Singers (
            SingerId     INT64 NOT NULL,
            FirstName    STRING(1024),
            LastName     STRING(1024),
            SingerInfo   BYTES(MAX)
        ) PRIMARY KEY (SingerId)";

    const ALBUMS: &str = "CREATE TABLE Albums (
            SingerId     INT64 NOT NULL,
            AlbumId      INT64 NOT NULL,
            AlbumTitle   STRING(MAX)
        ) PRIMARY KEY (SingerId, AlbumId),
        INTERLEAVE IN PARENT Singers ON DELETE CASCADE";

    fn schema() -> Schema {
        let mut schema = Schema::default();
        schema.apply(&parse(SINGERS).unwrap()).unwrap();
        schema.apply(&parse(ALBUMS).unwrap()).unwrap();
        schema
    }

    #[test]
    fn test_parse_create_table() {
        match parse(SINGERS).unwrap() {
            DdlStatement::CreateTable(def) => {
                assert_eq!(def.name, "Singers");
                assert_eq!(def.primary_key, vec!["SingerId".to_string()]);
                assert_eq!(def.columns.len(), 4);
                assert!(def.columns[0].not_null);
                assert_eq!(def.columns[1].column_type, ColumnType::String(Some(1024)));
                assert_eq!(def.columns[3].column_type, ColumnType::Bytes(None));
                assert!(def.interleave.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_interleave() {
        match parse(ALBUMS).unwrap() {
            DdlStatement::CreateTable(def) => {
                let interleave = def.interleave.unwrap();
                assert_eq!(interleave.parent, "Singers");
                assert_eq!(interleave.on_delete, OnDelete::Cascade);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_alter() {
        assert_eq!(
            parse("ALTER TABLE Albums ADD COLUMN MarketingBudget INT64").unwrap(),
            DdlStatement::AddColumn {
                table: "Albums".to_string(),
                column: ColumnDef {
                    name: "MarketingBudget".to_string(),
                    column_type: ColumnType::Int64,
                    not_null: false,
                },
            }
        );
        assert_eq!(
            parse("alter table Albums drop column MarketingBudget;").unwrap(),
            DdlStatement::DropColumn {
                table: "Albums".to_string(),
                column: "MarketingBudget".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_error() {
        let err = parse("CREATE TABLE Broken (Id INT32) PRIMARY KEY (Id)").unwrap_err();
        assert_eq!(err.code(), Code::InvalidArgument);
        assert!(err.message().contains("unsupported type INT32"));
    }

    #[test]
    fn test_apply_schema() {
        let schema = schema();
        assert_eq!(schema.children("Singers").map(|t| t.name.as_str()).collect::<Vec<_>>(), vec!["Albums"]);
        assert!(schema.table("Albums").unwrap().is_key_column("AlbumId"));
    }

    #[test]
    fn test_ddl_renders_parents_first() {
        let mut schema = schema();
        schema
            .apply(&parse("ALTER TABLE Albums ADD COLUMN MarketingBudget INT64").unwrap())
            .unwrap();
        let ddl = schema.ddl();
        assert_eq!(ddl.len(), 2);
        assert!(ddl[0].starts_with("CREATE TABLE Singers"));
        assert!(ddl[1].contains("MarketingBudget INT64"));
        assert!(ddl[1].contains("INTERLEAVE IN PARENT Singers ON DELETE CASCADE"));

        let mut replayed = Schema::default();
        for statement in &ddl {
            replayed.apply(&parse(statement).unwrap()).unwrap();
        }
        assert_eq!(replayed.table("Albums"), schema.table("Albums"));
    }

    #[test]
    fn test_apply_rejects_invalid_changes() {
        let mut schema = schema();
        let err = schema.apply(&parse(SINGERS).unwrap()).unwrap_err();
        assert_eq!(err.code(), Code::AlreadyExists);

        let err = schema.apply(&parse("DROP TABLE Singers").unwrap()).unwrap_err();
        assert_eq!(err.code(), Code::FailedPrecondition);

        let err = schema
            .apply(&parse("ALTER TABLE Albums ADD COLUMN Budget INT64 NOT NULL").unwrap())
            .unwrap_err();
        assert_eq!(err.code(), Code::FailedPrecondition);

        let err = schema.apply(&parse("ALTER TABLE Albums DROP COLUMN AlbumId").unwrap()).unwrap_err();
        assert_eq!(err.code(), Code::FailedPrecondition);

        let orphan = "CREATE TABLE Tracks (SingerId INT64, TrackId INT64) PRIMARY KEY (SingerId, TrackId), INTERLEAVE IN PARENT Nope";
        let err = schema.apply(&parse(orphan).unwrap()).unwrap_err();
        assert_eq!(err.code(), Code::NotFound);

        let wrong_prefix = "CREATE TABLE Tracks (TrackId INT64, SingerId INT64) PRIMARY KEY (TrackId, SingerId), INTERLEAVE IN PARENT Singers";
        let err = schema.apply(&parse(wrong_prefix).unwrap()).unwrap_err();
        assert_eq!(err.code(), Code::FailedPrecondition);
    }

    #[test]
    fn test_apply_add_and_drop_column() {
        let mut schema = schema();
        schema
            .apply(&parse("ALTER TABLE Albums ADD COLUMN MarketingBudget INT64").unwrap())
            .unwrap();
        assert!(schema.table("Albums").unwrap().column("MarketingBudget").is_some());
        schema.apply(&parse("ALTER TABLE Albums DROP COLUMN MarketingBudget").unwrap()).unwrap();
        assert!(schema.table("Albums").unwrap().column("MarketingBudget").is_none());
        schema.apply(&parse("DROP TABLE Albums").unwrap()).unwrap();
        assert!(schema.table("Albums").is_none());
    }
}
