use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use snippets_gax::retry::TryAs;
use snippets_gax::status::{Code, Status};

use crate::database::{Database, ReadSet, Snapshot};
use crate::key::{Key, KeySet};
use crate::mutation::Mutation;
use crate::reader::RowIterator;
use crate::row::Row;
use crate::statement::Statement;
use crate::transaction::{ReadOptions, Transaction};
use crate::value::CommitTimestamp;

#[derive(Clone, Debug, Default)]
pub struct CommitOptions {
    pub return_commit_stats: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitStats {
    pub mutation_count: usize,
}

#[derive(Clone, Debug)]
pub struct CommitResult {
    pub timestamp: CommitTimestamp,
    pub stats: Option<CommitStats>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Active,
    Committed,
    RolledBack,
}

/// ReadWriteTransaction provides an optimistic read-write transaction.
///
/// Reads see the latest committed data and remember the version of every row
/// (or, for range reads and queries, every table) they observed. Writes are
/// buffered locally and only applied at commit, after which none of the
/// buffered mutations are visible to the transaction's own reads.
///
/// Commit succeeds only if nothing the transaction read has changed since it
/// was read. Otherwise the commit fails with ABORTED, nothing is written, and
/// the caller may begin a fresh transaction and try again.
///
/// Dropping a transaction without committing applies nothing.
pub struct ReadWriteTransaction {
    base_tx: Transaction,
    tx_id: u64,
    wb: Vec<Mutation>,
    read_set: ReadSet,
    state: State,
}

impl Deref for ReadWriteTransaction {
    type Target = Transaction;

    fn deref(&self) -> &Self::Target {
        &self.base_tx
    }
}

impl DerefMut for ReadWriteTransaction {
    fn deref_mut(&mut self) -> &mut Transaction {
        &mut self.base_tx
    }
}

impl ReadWriteTransaction {
    pub(crate) fn begin(database: Arc<Database>) -> ReadWriteTransaction {
        let tx_id = database.next_transaction_id();
        tracing::trace!("{}: begin read-write transaction {}", database.name(), tx_id);
        ReadWriteTransaction {
            base_tx: Transaction { database },
            tx_id,
            wb: vec![],
            read_set: ReadSet::default(),
            state: State::Active,
        }
    }

    pub fn transaction_id(&self) -> u64 {
        self.tx_id
    }

    /// Mutations buffered so far, in the order they will be applied.
    pub fn buffered(&self) -> &[Mutation] {
        &self.wb
    }

    pub fn buffer_write(&mut self, ms: Vec<Mutation>) {
        self.wb.extend(ms)
    }

    fn check_active(&self) -> Result<(), Status> {
        match self.state {
            State::Active => Ok(()),
            State::Committed => Err(Status::failed_precondition(format!(
                "transaction {} has already been committed",
                self.tx_id
            ))),
            State::RolledBack => Err(Status::failed_precondition(format!(
                "transaction {} has already been rolled back",
                self.tx_id
            ))),
        }
    }

    fn latest(&mut self) -> Result<Arc<Snapshot>, Status> {
        self.check_active()?;
        let snapshot = self.database.snapshot();
        self.read_set.record_schema(snapshot.schema_version);
        Ok(snapshot)
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
        let snapshot = self.latest()?;
        let key_set = key_set.into();
        let (iter, versions) = Transaction::read_at(&snapshot, table, columns, &key_set, options)?;
        match key_set.point_keys() {
            Some(keys) => {
                for key in keys {
                    let version = versions.iter().find(|(k, _)| k == key).map(|(_, v)| *v);
                    self.read_set.record_row(table, key.clone(), version);
                }
            }
            None => {
                if let Some(version) = snapshot.table_version(table) {
                    self.read_set.record_table(table, version);
                }
            }
        }
        Ok(iter)
    }

    /// read_row reads a single row by key. A missing row is Ok(None) and is
    /// still tracked, so a concurrent insert of that key aborts the commit.
    pub async fn read_row<C>(&mut self, table: &str, columns: &[C], key: Key) -> Result<Option<Row>, Status>
    where
        C: AsRef<str>,
    {
        let mut iter = self.read(table, columns, key, None).await?;
        iter.next().await
    }

    pub async fn query(&mut self, statement: Statement) -> Result<RowIterator, Status> {
        let snapshot = self.latest()?;
        let table = Snapshot::query_table(&statement)?;
        let iter = Transaction::query_at(&snapshot, &statement)?;
        if let Some(version) = snapshot.table_version(&table) {
            self.read_set.record_table(&table, version);
        }
        Ok(iter)
    }

    /// end commits the transaction when `result` is Ok and rolls it back otherwise.
    pub async fn end<S, E>(
        &mut self,
        result: Result<S, E>,
        options: Option<CommitOptions>,
    ) -> Result<(Option<CommitTimestamp>, S), E>
    where
        E: TryAs<Status> + From<Status>,
    {
        let opt = options.unwrap_or_default();
        match result {
            Ok(success) => {
                let cr = self.commit(opt).await?;
                Ok((Some(cr.timestamp), success))
            }
            Err(err) => {
                if let Some(status) = err.try_as() {
                    // nothing to roll back after a failed validation
                    if status.code() == Code::Aborted {
                        self.state = State::RolledBack;
                        return Err(err);
                    }
                }
                let _ = self.rollback().await;
                Err(err)
            }
        }
    }

    pub async fn commit(&mut self, options: CommitOptions) -> Result<CommitResult, Status> {
        self.check_active()?;
        let result = self.database.commit(&self.wb, &self.read_set);
        // a transaction can't be reused after any commit attempt
        self.state = match result {
            Ok(_) => State::Committed,
            Err(_) => State::RolledBack,
        };
        let timestamp = match result {
            Ok(ts) => ts,
            Err(status) => {
                tracing::debug!("transaction {} commit failed: {}", self.tx_id, status);
                return Err(status);
            }
        };
        let mutation_count = std::mem::take(&mut self.wb).len();
        Ok(CommitResult {
            timestamp,
            stats: options.return_commit_stats.then_some(CommitStats { mutation_count }),
        })
    }

    /// rollback discards the buffered mutations.
    pub async fn rollback(&mut self) -> Result<(), Status> {
        self.check_active()?;
        self.wb.clear();
        self.state = State::RolledBack;
        tracing::trace!("transaction {} rolled back", self.tx_id);
        Ok(())
    }
}
