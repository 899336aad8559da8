//! In-process storage for one database.
//!
//! Committed state is an immutable [`Snapshot`] behind a lock. Readers clone
//! the `Arc` and never block writers. A commit validates the transaction's
//! read set against the latest snapshot, applies its mutations to a copy and
//! swaps the copy in, so a failed commit leaves no trace.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use snippets_gax::status::Status;

use crate::ddl::{self, OnDelete, Schema, TableDef};
use crate::key::{Key, KeySet};
use crate::mutation::{Delete, Mutation, Write};
use crate::query;
use crate::row::Field;
use crate::statement::Statement;
use crate::value::{CommitTimestamp, Value};

#[derive(Clone, Debug)]
pub(crate) struct StoredRow {
    pub(crate) values: BTreeMap<String, Value>,
    /// Commit sequence number of the last write to this row.
    pub(crate) version: u64,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Table {
    pub(crate) rows: BTreeMap<Key, StoredRow>,
    /// Commit sequence number of the last write to any row of this table.
    pub(crate) version: u64,
}

/// One row returned by [`Snapshot::read`].
pub(crate) struct ReadRow {
    pub(crate) key: Key,
    pub(crate) values: Vec<Value>,
    pub(crate) version: u64,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Snapshot {
    pub(crate) schema: Schema,
    pub(crate) tables: HashMap<String, Table>,
    /// Sequence number of the last commit, data or schema.
    pub(crate) version: u64,
    pub(crate) schema_version: u64,
}

/// What a read-write transaction observed, checked again at commit.
#[derive(Clone, Debug, Default)]
pub(crate) struct ReadSet {
    rows: HashMap<(String, Key), Option<u64>>,
    tables: HashMap<String, u64>,
    schema_version: Option<u64>,
}

impl ReadSet {
    pub(crate) fn record_schema(&mut self, schema_version: u64) {
        self.schema_version.get_or_insert(schema_version);
    }

    /// Records a point read. `version` is `None` when the row was absent.
    pub(crate) fn record_row(&mut self, table: &str, key: Key, version: Option<u64>) {
        self.rows.entry((table.to_string(), key)).or_insert(version);
    }

    /// Records a range scan or query over the whole table.
    pub(crate) fn record_table(&mut self, table: &str, version: u64) {
        self.tables.entry(table.to_string()).or_insert(version);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.tables.is_empty()
    }

    fn validate(&self, snapshot: &Snapshot) -> Result<(), Status> {
        if let Some(schema_version) = self.schema_version {
            if schema_version != snapshot.schema_version {
                return Err(Status::aborted("Transaction aborted: schema changed"));
            }
        }
        for ((table, key), observed) in &self.rows {
            let current = snapshot.tables.get(table).and_then(|t| t.rows.get(key)).map(|r| r.version);
            if current != *observed {
                tracing::debug!("read of {} {} is stale: observed={:?} current={:?}", table, key, observed, current);
                return Err(Status::aborted(format!(
                    "Transaction aborted: row {} in table {} was modified concurrently",
                    key, table
                )));
            }
        }
        for (table, observed) in &self.tables {
            let current = snapshot.tables.get(table).map(|t| t.version);
            if current != Some(*observed) {
                tracing::debug!("scan of {} is stale: observed={} current={:?}", table, observed, current);
                return Err(Status::aborted(format!(
                    "Transaction aborted: table {} was modified concurrently",
                    table
                )));
            }
        }
        Ok(())
    }
}

impl Snapshot {
    fn table_data(&self, name: &str) -> Result<&Table, Status> {
        self.tables
            .get(name)
            .ok_or_else(|| Status::not_found(format!("Table not found: {}", name)))
    }

    /// Reads `columns` of every row of `table` contained in `key_set`, in key order.
    /// A `limit` below 1 means no limit.
    pub(crate) fn read(
        &self,
        table: &str,
        columns: &[String],
        key_set: &KeySet,
        limit: i64,
    ) -> Result<(Vec<Field>, Vec<ReadRow>), Status> {
        let def = self.schema.table_or_not_found(table)?;
        let fields = fields(def, columns)?;
        let data = self.table_data(table)?;
        let limit = if limit < 1 { usize::MAX } else { limit as usize };

        let rows = match key_set.point_keys() {
            Some(keys) => {
                let mut keys = keys.to_vec();
                keys.sort();
                keys.dedup();
                keys.into_iter()
                    .filter_map(|key| data.rows.get(&key).map(|row| (key, row)))
                    .take(limit)
                    .map(|(key, row)| project(&fields, key, row))
                    .collect()
            }
            None => data
                .rows
                .iter()
                .filter(|(key, _)| key_set.contains(key))
                .take(limit)
                .map(|(key, row)| project(&fields, key.clone(), row))
                .collect(),
        };
        Ok((fields, rows))
    }

    pub(crate) fn query(&self, stmt: &Statement) -> Result<(Vec<Field>, Vec<Vec<Value>>), Status> {
        let query = query::parse(&stmt.sql)?;
        let def = self.schema.table_or_not_found(&query.table)?;
        let data = self.table_data(&query.table)?;
        query.execute(def, &stmt.params, data.rows.values().map(|r| &r.values))
    }

    pub(crate) fn query_table(stmt: &Statement) -> Result<String, Status> {
        Ok(query::parse(&stmt.sql)?.table)
    }

    pub(crate) fn table_version(&self, table: &str) -> Option<u64> {
        self.tables.get(table).map(|t| t.version)
    }

    pub(crate) fn row_version(&self, table: &str, key: &Key) -> Option<u64> {
        self.tables.get(table).and_then(|t| t.rows.get(key)).map(|r| r.version)
    }

    fn apply(&mut self, mutation: &Mutation, seq: u64) -> Result<(), Status> {
        match mutation {
            Mutation::Insert(w) => self.apply_write(w, seq, WriteMode::Insert),
            Mutation::Update(w) => self.apply_write(w, seq, WriteMode::Update),
            Mutation::InsertOrUpdate(w) => self.apply_write(w, seq, WriteMode::InsertOrUpdate),
            Mutation::Replace(w) => self.apply_write(w, seq, WriteMode::Replace),
            Mutation::Delete(d) => self.apply_delete(d, seq),
        }
    }

    fn apply_write(&mut self, w: &Write, seq: u64, mode: WriteMode) -> Result<(), Status> {
        let def = self.schema.table_or_not_found(&w.table)?.clone();
        for (i, column) in w.columns.iter().enumerate() {
            if def.column(column).is_none() {
                return Err(Status::not_found(format!("Column not found in table {}: {}", def.name, column)));
            }
            if w.columns[..i].contains(column) {
                return Err(Status::invalid_argument(format!("Duplicate column in mutation: {}", column)));
            }
        }
        for key_column in &def.primary_key {
            if !w.columns.contains(key_column) {
                return Err(Status::failed_precondition(format!(
                    "Mutation for table {} does not specify key column {}",
                    def.name, key_column
                )));
            }
        }

        for values in &w.values {
            if values.len() != w.columns.len() {
                return Err(Status::invalid_argument(format!(
                    "Mutation has {} columns but {} values",
                    w.columns.len(),
                    values.len()
                )));
            }
            let mut row = BTreeMap::new();
            for (column, value) in w.columns.iter().zip(values.iter()) {
                check_value(&def, column, value)?;
                row.insert(column.clone(), value.clone());
            }
            let key = key_of(&def, &row);
            let exists = self.table_data(&def.name)?.rows.contains_key(&key);
            match mode {
                WriteMode::Insert if exists => {
                    return Err(Status::already_exists(format!(
                        "Row {} in table {} already exists",
                        key, def.name
                    )));
                }
                WriteMode::Update if !exists => {
                    return Err(Status::not_found(format!("Row {} in table {} not found", key, def.name)));
                }
                WriteMode::Update | WriteMode::InsertOrUpdate if exists => {
                    self.update_row(&def, key, row, seq)?;
                }
                WriteMode::Replace if exists => {
                    self.delete_row(&def, &key, seq)?;
                    self.insert_row(&def, key, row, seq)?;
                }
                _ => self.insert_row(&def, key, row, seq)?,
            }
        }
        Ok(())
    }

    fn insert_row(&mut self, def: &TableDef, key: Key, row: BTreeMap<String, Value>, seq: u64) -> Result<(), Status> {
        for column in def.columns.iter().filter(|c| c.not_null) {
            if row.get(&column.name).map_or(true, |v| v.is_null()) {
                return Err(Status::failed_precondition(format!(
                    "{} must not be NULL in table {}",
                    column.name, def.name
                )));
            }
        }
        if let Some(interleave) = &def.interleave {
            let parent_len = self.schema.table_or_not_found(&interleave.parent)?.primary_key.len();
            let parent_key = Key::from_values(key.values()[..parent_len].to_vec());
            if !self.table_data(&interleave.parent)?.rows.contains_key(&parent_key) {
                return Err(Status::not_found(format!(
                    "Parent row {} for row {} in table {} is missing",
                    parent_key, key, def.name
                )));
            }
        }
        let table = self.table_mut(&def.name)?;
        table.rows.insert(key, StoredRow { values: row, version: seq });
        table.version = seq;
        Ok(())
    }

    fn update_row(&mut self, def: &TableDef, key: Key, row: BTreeMap<String, Value>, seq: u64) -> Result<(), Status> {
        for (column, value) in &row {
            if value.is_null() && def.column(column).is_some_and(|c| c.not_null) {
                return Err(Status::failed_precondition(format!(
                    "{} must not be NULL in table {}",
                    column, def.name
                )));
            }
        }
        let table = self.table_mut(&def.name)?;
        let stored = table
            .rows
            .get_mut(&key)
            .ok_or_else(|| Status::not_found(format!("Row {} in table {} not found", key, def.name)))?;
        stored.values.extend(row);
        stored.version = seq;
        table.version = seq;
        Ok(())
    }

    fn apply_delete(&mut self, d: &Delete, seq: u64) -> Result<(), Status> {
        let def = self.schema.table_or_not_found(&d.table)?.clone();
        let keys: Vec<Key> = self
            .table_data(&def.name)?
            .rows
            .keys()
            .filter(|k| d.key_set.contains(k))
            .cloned()
            .collect();
        for key in keys {
            self.delete_row(&def, &key, seq)?;
        }
        Ok(())
    }

    /// Deletes one row and, depending on ON DELETE, its interleaved descendants.
    fn delete_row(&mut self, def: &TableDef, key: &Key, seq: u64) -> Result<(), Status> {
        let children: Vec<TableDef> = self.schema.children(&def.name).cloned().collect();
        for child in children {
            let child_keys: Vec<Key> = self
                .table_data(&child.name)?
                .rows
                .keys()
                .filter(|k| k.starts_with(key))
                .cloned()
                .collect();
            if child_keys.is_empty() {
                continue;
            }
            let cascade = child.interleave.as_ref().is_some_and(|i| i.on_delete == OnDelete::Cascade);
            if !cascade {
                return Err(Status::failed_precondition(format!(
                    "Integrity constraint violation: row {} in table {} has child rows in table {}",
                    key, def.name, child.name
                )));
            }
            for child_key in child_keys {
                self.delete_row(&child, &child_key, seq)?;
            }
        }
        let table = self.table_mut(&def.name)?;
        if table.rows.remove(key).is_some() {
            table.version = seq;
        }
        Ok(())
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, Status> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| Status::not_found(format!("Table not found: {}", name)))
    }

    fn apply_ddl(&mut self, statement: &ddl::DdlStatement, seq: u64) -> Result<(), Status> {
        self.schema.apply(statement)?;
        match statement {
            ddl::DdlStatement::CreateTable(def) => {
                self.tables.insert(
                    def.name.clone(),
                    Table {
                        rows: BTreeMap::new(),
                        version: seq,
                    },
                );
            }
            ddl::DdlStatement::AddColumn { table, .. } => {
                self.table_mut(table)?.version = seq;
            }
            ddl::DdlStatement::DropColumn { table, column } => {
                let table = self.table_mut(table)?;
                for row in table.rows.values_mut() {
                    row.values.remove(column);
                    row.version = seq;
                }
                table.version = seq;
            }
            ddl::DdlStatement::DropTable(table) => {
                self.tables.remove(table);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum WriteMode {
    Insert,
    Update,
    InsertOrUpdate,
    Replace,
}

fn fields(def: &TableDef, columns: &[String]) -> Result<Vec<Field>, Status> {
    columns
        .iter()
        .map(|name| {
            def.column(name)
                .map(|c| Field {
                    name: c.name.clone(),
                    column_type: c.column_type,
                })
                .ok_or_else(|| Status::not_found(format!("Column not found in table {}: {}", def.name, name)))
        })
        .collect()
}

fn project(fields: &[Field], key: Key, row: &StoredRow) -> ReadRow {
    ReadRow {
        key,
        values: fields
            .iter()
            .map(|f| row.values.get(&f.name).cloned().unwrap_or(Value::Null))
            .collect(),
        version: row.version,
    }
}

fn check_value(def: &TableDef, column: &str, value: &Value) -> Result<(), Status> {
    match def.column(column) {
        Some(c) if value.conforms_to(&c.column_type) => Ok(()),
        Some(c) => Err(Status::failed_precondition(format!(
            "Invalid value for column {} in table {}: Expected {}",
            column, def.name, c.column_type
        ))),
        None => Err(Status::not_found(format!("Column not found in table {}: {}", def.name, column))),
    }
}

fn key_of(def: &TableDef, row: &BTreeMap<String, Value>) -> Key {
    Key::from_values(
        def.primary_key
            .iter()
            .map(|k| row.get(k).cloned().unwrap_or(Value::Null))
            .collect(),
    )
}

/// A single database held in memory.
#[derive(Debug)]
pub struct Database {
    name: String,
    state: RwLock<Arc<Snapshot>>,
    next_transaction_id: AtomicU64,
}

impl Database {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Database {
            name: name.into(),
            state: RwLock::new(Arc::new(Snapshot::default())),
            next_transaction_id: AtomicU64::new(1),
        }
    }

    /// Full resource name, e.g. `instances/test-instance/databases/example-db`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> Schema {
        self.snapshot().schema.clone()
    }

    pub(crate) fn snapshot(&self) -> Arc<Snapshot> {
        self.state.read().clone()
    }

    pub(crate) fn next_transaction_id(&self) -> u64 {
        self.next_transaction_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Applies all statements or none of them.
    pub(crate) fn update_ddl(&self, statements: &[String]) -> Result<(), Status> {
        let parsed = statements
            .iter()
            .map(|s| ddl::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        let mut state = self.state.write();
        let mut next = Snapshot::clone(&state);
        next.version += 1;
        next.schema_version = next.version;
        let seq = next.version;
        for statement in &parsed {
            next.apply_ddl(statement, seq)?;
        }
        *state = Arc::new(next);
        tracing::debug!("{}: applied {} ddl statements at version {}", self.name, parsed.len(), seq);
        Ok(())
    }

    /// The schema as DDL plus every row of every table, parents first.
    pub(crate) fn export(&self) -> (Vec<String>, Vec<(String, Vec<BTreeMap<String, Value>>)>) {
        let snapshot = self.snapshot();
        let rows = snapshot
            .schema
            .ordered_tables()
            .into_iter()
            .map(|def| {
                let rows = snapshot
                    .tables
                    .get(&def.name)
                    .map(|t| t.rows.values().map(|r| r.values.clone()).collect())
                    .unwrap_or_default();
                (def.name.clone(), rows)
            })
            .collect();
        (snapshot.schema.ddl(), rows)
    }

    /// Restores what [`Database::export`] produced into an empty database.
    pub(crate) fn import(&self, ddl: &[String], tables: &[(String, Vec<BTreeMap<String, Value>>)]) -> Result<(), Status> {
        if !ddl.is_empty() {
            self.update_ddl(ddl)?;
        }
        let mutations: Vec<Mutation> = tables
            .iter()
            .flat_map(|(table, rows)| {
                rows.iter().map(move |row| {
                    Mutation::Insert(Write {
                        table: table.clone(),
                        columns: row.keys().cloned().collect(),
                        values: vec![row.values().cloned().collect()],
                    })
                })
            })
            .collect();
        self.commit(&mutations, &ReadSet::default())?;
        Ok(())
    }

    /// Validates `read_set` and applies `mutations` atomically.
    pub(crate) fn commit(&self, mutations: &[Mutation], read_set: &ReadSet) -> Result<CommitTimestamp, Status> {
        let mut state = self.state.write();
        read_set.validate(&state)?;
        if mutations.is_empty() {
            return Ok(CommitTimestamp::now());
        }
        let mut next = Snapshot::clone(&state);
        next.version += 1;
        let seq = next.version;
        for mutation in mutations {
            next.apply(mutation, seq)?;
        }
        *state = Arc::new(next);
        tracing::trace!("{}: committed {} mutations at version {}", self.name, mutations.len(), seq);
        Ok(CommitTimestamp::now())
    }
}

#[cfg(test)]
mod tests {
    use snippets_gax::status::Code;

    use super::*;
    use crate::key::{all_keys, KeyRange, RangeKind};
    use crate::mutation::{delete, insert, insert_or_update, replace, update};

    fn database() -> Database {
        let db = Database::new("instances/test/databases/db");
        db.update_ddl(&[
            "CREATE TABLE Singers (SingerId INT64 NOT NULL, FirstName STRING(1024)) PRIMARY KEY (SingerId)".to_string(),
            "CREATE TABLE Albums (SingerId INT64 NOT NULL, AlbumId INT64 NOT NULL, AlbumTitle STRING(MAX)) PRIMARY KEY (SingerId, AlbumId), INTERLEAVE IN PARENT Singers ON DELETE CASCADE".to_string(),
        ])
        .unwrap();
        db.commit(
            &[
                insert("Singers", &["SingerId", "FirstName"], &[&1, &"Marc"]),
                insert("Singers", &["SingerId", "FirstName"], &[&2, &"Catalina"]),
                insert("Albums", &["SingerId", "AlbumId", "AlbumTitle"], &[&1, &1, &"Total Junk"]),
                insert("Albums", &["SingerId", "AlbumId", "AlbumTitle"], &[&2, &1, &"Green"]),
                insert("Albums", &["SingerId", "AlbumId", "AlbumTitle"], &[&2, &2, &"Forever Hold Your Peace"]),
            ],
            &ReadSet::default(),
        )
        .unwrap();
        db
    }

    fn album_count(db: &Database) -> usize {
        db.snapshot().tables["Albums"].rows.len()
    }

    #[test]
    fn test_read_in_key_order() {
        let db = database();
        let (fields, rows) = db
            .snapshot()
            .read("Albums", &["AlbumTitle".to_string()], &all_keys(), 0)
            .unwrap();
        assert_eq!(fields[0].name, "AlbumTitle");
        let titles: Vec<_> = rows.iter().map(|r| r.values[0].to_string()).collect();
        assert_eq!(titles, vec!["Total Junk", "Green", "Forever Hold Your Peace"]);
    }

    #[test]
    fn test_read_range_and_limit() {
        let db = database();
        let range = KeyRange::new(Key::new(&2), Key::new(&2), RangeKind::ClosedClosed);
        let (_, rows) = db
            .snapshot()
            .read("Albums", &["AlbumId".to_string()], &range.into(), 1)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, Key::composite(&[&2, &1]));
    }

    #[test]
    fn test_insert_duplicate_is_atomic() {
        let db = database();
        let err = db
            .commit(
                &[
                    insert("Singers", &["SingerId"], &[&3]),
                    insert("Singers", &["SingerId"], &[&1]),
                ],
                &ReadSet::default(),
            )
            .unwrap_err();
        assert_eq!(err.code(), Code::AlreadyExists);
        assert!(db.snapshot().row_version("Singers", &Key::new(&3)).is_none());
    }

    #[test]
    fn test_constraints() {
        let db = database();
        let err = db
            .commit(&[update("Singers", &["SingerId"], &[&9])], &ReadSet::default())
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);

        let err = db
            .commit(&[insert("Albums", &["SingerId", "AlbumId"], &[&9, &1])], &ReadSet::default())
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);

        let err = db
            .commit(&[insert("Singers", &["SingerId", "FirstName"], &[&3, &1])], &ReadSet::default())
            .unwrap_err();
        assert_eq!(err.code(), Code::FailedPrecondition);

        let err = db
            .commit(&[insert("Singers", &["FirstName"], &[&"Nobody"])], &ReadSet::default())
            .unwrap_err();
        assert_eq!(err.code(), Code::FailedPrecondition);
    }

    #[test]
    fn test_update_preserves_other_columns() {
        let db = database();
        db.commit(
            &[insert_or_update("Albums", &["SingerId", "AlbumId"], &[&1, &1])],
            &ReadSet::default(),
        )
        .unwrap();
        let snapshot = db.snapshot();
        let row = &snapshot.tables["Albums"].rows[&Key::composite(&[&1, &1])];
        assert_eq!(row.values["AlbumTitle"], Value::String("Total Junk".to_string()));
    }

    #[test]
    fn test_replace_clears_unwritten_columns() {
        let db = database();
        db.commit(&[replace("Singers", &["SingerId"], &[&2])], &ReadSet::default())
            .unwrap();
        let snapshot = db.snapshot();
        let row = &snapshot.tables["Singers"].rows[&Key::new(&2)];
        assert!(row.values.get("FirstName").is_none());
        // replacing the parent row removes its interleaved children
        assert_eq!(album_count(&db), 1);
    }

    #[test]
    fn test_delete_cascades() {
        let db = database();
        db.commit(&[delete("Singers", Key::new(&2))], &ReadSet::default())
            .unwrap();
        assert_eq!(album_count(&db), 1);
    }

    #[test]
    fn test_delete_no_action_rejects_parent_with_children() {
        let db = Database::new("db");
        db.update_ddl(&[
            "CREATE TABLE Singers (SingerId INT64 NOT NULL) PRIMARY KEY (SingerId)".to_string(),
            "CREATE TABLE Albums (SingerId INT64 NOT NULL, AlbumId INT64 NOT NULL) PRIMARY KEY (SingerId, AlbumId), INTERLEAVE IN PARENT Singers".to_string(),
        ])
        .unwrap();
        db.commit(
            &[
                insert("Singers", &["SingerId"], &[&1]),
                insert("Albums", &["SingerId", "AlbumId"], &[&1, &1]),
            ],
            &ReadSet::default(),
        )
        .unwrap();
        let err = db
            .commit(&[delete("Singers", all_keys())], &ReadSet::default())
            .unwrap_err();
        assert_eq!(err.code(), Code::FailedPrecondition);
        assert_eq!(album_count(&db), 1);
    }

    #[test]
    fn test_stale_read_set_aborts() {
        let db = database();
        let key = Key::composite(&[&1, &1]);
        let mut read_set = ReadSet::default();
        read_set.record_row("Albums", key.clone(), db.snapshot().row_version("Albums", &key));

        db.commit(
            &[update("Albums", &["SingerId", "AlbumId", "AlbumTitle"], &[&1, &1, &"Other"])],
            &ReadSet::default(),
        )
        .unwrap();

        let err = db
            .commit(&[delete("Albums", key)], &read_set)
            .unwrap_err();
        assert_eq!(err.code(), Code::Aborted);
        assert_eq!(album_count(&db), 3);
    }

    #[test]
    fn test_phantom_insert_aborts_scan() {
        let db = database();
        let mut read_set = ReadSet::default();
        read_set.record_table("Singers", db.snapshot().table_version("Singers").unwrap());
        db.commit(&[insert("Singers", &["SingerId"], &[&3])], &ReadSet::default())
            .unwrap();
        let err = db.commit(&[], &read_set).unwrap_err();
        assert_eq!(err.code(), Code::Aborted);
    }

    #[test]
    fn test_ddl_is_atomic() {
        let db = database();
        let err = db
            .update_ddl(&[
                "ALTER TABLE Albums ADD COLUMN MarketingBudget INT64".to_string(),
                "ALTER TABLE Nope ADD COLUMN X INT64".to_string(),
            ])
            .unwrap_err();
        assert_eq!(err.code(), Code::NotFound);
        assert!(db.schema().table("Albums").unwrap().column("MarketingBudget").is_none());
    }

    #[test]
    fn test_export_import() {
        let db = database();
        let (ddl, tables) = db.export();
        assert_eq!(tables[0].0, "Singers");
        let restored = Database::new("copy");
        restored.import(&ddl, &tables).unwrap();
        assert_eq!(album_count(&restored), 3);
        assert_eq!(restored.schema().ddl(), db.schema().ddl());
    }

    #[test]
    fn test_query() {
        let db = database();
        let mut stmt = Statement::new("SELECT AlbumTitle FROM Albums WHERE SingerId = @id");
        stmt.add_param("id", &2);
        let (_, rows) = db.snapshot().query(&stmt).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
