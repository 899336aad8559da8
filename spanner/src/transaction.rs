use std::sync::Arc;

use snippets_gax::status::Status;

use crate::database::{Database, Snapshot};
use crate::key::{Key, KeySet};
use crate::reader::RowIterator;
use crate::statement::Statement;

#[derive(Clone, Debug, Default)]
pub struct ReadOptions {
    /// The maximum number of rows to read. A limit value less than 1 means no limit.
    pub limit: i64,
}

/// Transaction is the part shared by read-only and read-write transactions.
pub struct Transaction {
    pub(crate) database: Arc<Database>,
}

impl Transaction {
    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    // read rows of a table at the given snapshot, with the version each row was last written at
    pub(crate) fn read_at<C>(
        snapshot: &Snapshot,
        table: &str,
        columns: &[C],
        key_set: &KeySet,
        options: Option<ReadOptions>,
    ) -> Result<(RowIterator, Vec<(Key, u64)>), Status>
    where
        C: AsRef<str>,
    {
        let opt = options.unwrap_or_default();
        let columns: Vec<String> = columns.iter().map(|c| c.as_ref().to_string()).collect();
        let (fields, rows) = snapshot.read(table, &columns, key_set, opt.limit)?;
        let versions = rows.iter().map(|r| (r.key.clone(), r.version)).collect();
        let values = rows.into_iter().map(|r| r.values).collect();
        Ok((RowIterator::new(fields, values), versions))
    }

    // execute query with SQL statement
    pub(crate) fn query_at(snapshot: &Snapshot, statement: &Statement) -> Result<RowIterator, Status> {
        let (fields, rows) = snapshot.query(statement)?;
        Ok(RowIterator::new(fields, rows))
    }
}
