use async_trait::async_trait;
use snippets_gax::status::Status;
use spanner_lite::client::{Client, TxError};
use spanner_lite::key::Key;
use spanner_lite::mutation::update_rows;
use spanner_lite::row::Row;
use spanner_lite::transaction_rw::{CommitOptions, ReadWriteTransaction};
use spanner_lite::value::{CommitTimestamp, Value};

/// The narrow surface a transfer needs from a transactional store.
///
/// Every call after `begin_transaction` runs inside the transaction the handle
/// identifies. Writes are staged and become visible only on `commit`; a
/// handle that is aborted or simply dropped leaves the store untouched.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    type Handle: Send;

    async fn begin_transaction(&self) -> Result<Self::Handle, Status>;

    /// Reads one row by primary key. A missing row is `Ok(None)`.
    async fn read_row(
        &self,
        handle: &mut Self::Handle,
        table: &str,
        key: Key,
        columns: &[&str],
    ) -> Result<Option<Row>, Status>;

    /// Stages updates of existing rows.
    async fn write_rows(
        &self,
        handle: &mut Self::Handle,
        table: &str,
        columns: &[&str],
        rows: Vec<Vec<Value>>,
    ) -> Result<(), Status>;

    /// Fails with `Code::Aborted` when a concurrent transaction invalidated the reads.
    async fn commit(&self, handle: Self::Handle) -> Result<CommitTimestamp, Status>;

    async fn abort(&self, handle: Self::Handle) -> Result<(), Status>;
}

#[async_trait]
impl TransactionalStore for Client {
    type Handle = ReadWriteTransaction;

    async fn begin_transaction(&self) -> Result<Self::Handle, Status> {
        self.begin_read_write_transaction().await.map_err(|e| match e {
            TxError::GRPC(status) => status,
        })
    }

    async fn read_row(
        &self,
        handle: &mut Self::Handle,
        table: &str,
        key: Key,
        columns: &[&str],
    ) -> Result<Option<Row>, Status> {
        handle.read_row(table, columns, key).await
    }

    async fn write_rows(
        &self,
        handle: &mut Self::Handle,
        table: &str,
        columns: &[&str],
        rows: Vec<Vec<Value>>,
    ) -> Result<(), Status> {
        handle.buffer_write(vec![update_rows(table, columns, rows)]);
        Ok(())
    }

    async fn commit(&self, mut handle: Self::Handle) -> Result<CommitTimestamp, Status> {
        let result = handle.commit(CommitOptions::default()).await?;
        tracing::trace!("transaction {} committed at {}", handle.transaction_id(), *result.timestamp);
        Ok(result.timestamp)
    }

    async fn abort(&self, mut handle: Self::Handle) -> Result<(), Status> {
        handle.rollback().await
    }
}
