use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use snippets_gax::status::Status;

use crate::database::{Database, Snapshot};
use crate::key::{Key, KeySet};
use crate::reader::RowIterator;
use crate::row::Row;
use crate::statement::Statement;
use crate::transaction::{ReadOptions, Transaction};
use crate::value::CommitTimestamp;

/// ReadOnlyTransaction provides a snapshot transaction with guaranteed
/// consistency across reads, but does not allow writes.
///
/// Read-only transactions do not take locks. Every read is served from the
/// committed state captured when the transaction began, so they never block
/// read-write transactions and never abort.
pub struct ReadOnlyTransaction {
    base_tx: Transaction,
    snapshot: Arc<Snapshot>,
    rts: Option<CommitTimestamp>,
}

impl Deref for ReadOnlyTransaction {
    type Target = Transaction;

    fn deref(&self) -> &Self::Target {
        &self.base_tx
    }
}

impl DerefMut for ReadOnlyTransaction {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.base_tx
    }
}

impl ReadOnlyTransaction {
    /// single creates a transaction meant for exactly one read or query.
    pub(crate) fn single(database: Arc<Database>) -> ReadOnlyTransaction {
        let snapshot = database.snapshot();
        ReadOnlyTransaction {
            base_tx: Transaction { database },
            snapshot,
            rts: None,
        }
    }

    /// begin starts a multi-use snapshot transaction.
    pub(crate) fn begin(database: Arc<Database>) -> ReadOnlyTransaction {
        let snapshot = database.snapshot();
        tracing::trace!("{}: read-only transaction at version {}", database.name(), snapshot.version);
        ReadOnlyTransaction {
            base_tx: Transaction { database },
            snapshot,
            rts: Some(CommitTimestamp::now()),
        }
    }

    /// Time the snapshot was taken. Single-use transactions have none.
    pub fn read_timestamp(&self) -> Option<CommitTimestamp> {
        self.rts
    }

    pub async fn read<C>(
        &mut self,
        table: &str,
        columns: &[C],
        key_set: impl Into<KeySet>,
        options: Option<ReadOptions>,
    ) -> Result<RowIterator, Status>
    where
        C: AsRef<str>,
    {
        let (iter, _) = Transaction::read_at(&self.snapshot, table, columns, &key_set.into(), options)?;
        Ok(iter)
    }

    pub async fn read_row<C>(&mut self, table: &str, columns: &[C], key: Key) -> Result<Option<Row>, Status>
    where
        C: AsRef<str>,
    {
        let mut iter = self.read(table, columns, key, None).await?;
        iter.next().await
    }

    pub async fn query(&mut self, statement: Statement) -> Result<RowIterator, Status> {
        Transaction::query_at(&self.snapshot, &statement)
    }
}
