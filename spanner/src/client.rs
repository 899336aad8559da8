use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use snippets_gax::cancel::CancellationToken;
use snippets_gax::retry::{invoke, TryAs};
use snippets_gax::status::Status;

use crate::database::Database;
use crate::instance::Instance;
use crate::mutation::Mutation;
use crate::retry::TransactionRetrySetting;
use crate::transaction_ro::ReadOnlyTransaction;
use crate::transaction_rw::{CommitOptions, ReadWriteTransaction};
use crate::value::CommitTimestamp;

#[derive(Clone, Default)]
pub struct ApplyOptions {
    pub transaction_retry_setting: Option<TransactionRetrySetting>,
    pub commit_options: CommitOptions,
}

#[derive(Clone, Debug, Default)]
pub struct ClientConfig {
    /// Retry setting used by apply when ApplyOptions carry none.
    pub transaction_retry_setting: TransactionRetrySetting,
}

#[derive(thiserror::Error, Debug)]
pub enum TxError {
    #[error(transparent)]
    GRPC(#[from] Status),
}

impl TryAs<Status> for TxError {
    fn try_as(&self) -> Option<&Status> {
        match self {
            TxError::GRPC(s) => Some(s),
        }
    }
}

/// Client is a client for reading and writing data to one database.
#[derive(Clone)]
pub struct Client {
    database: Arc<Database>,
    closed: Arc<AtomicBool>,
    config: ClientConfig,
}

impl Client {
    /// new creates a client for `database_id` in `instance`.
    /// The database must already exist.
    pub fn new(instance: &Instance, database_id: &str, config: Option<ClientConfig>) -> Result<Self, TxError> {
        let database = instance.database(database_id)?;
        Ok(Client {
            database,
            closed: Arc::new(AtomicBool::new(false)),
            config: config.unwrap_or_default(),
        })
    }

    /// Full resource name of the database.
    pub fn database_name(&self) -> &str {
        self.database.name()
    }

    /// close closes the client. Every clone observes it, and later calls fail with UNAVAILABLE.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!("client for {} closed", self.database.name());
    }

    fn database(&self) -> Result<Arc<Database>, Status> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Status::unavailable("client closed"));
        }
        Ok(self.database.clone())
    }

    /// single provides a read-only snapshot transaction optimized for the case
    /// where only a single read or query is needed.
    pub async fn single(&self) -> Result<ReadOnlyTransaction, TxError> {
        Ok(ReadOnlyTransaction::single(self.database()?))
    }

    /// read_only_transaction returns a ReadOnlyTransaction that can be used for
    /// multiple reads from the database, all observing the same snapshot.
    pub async fn read_only_transaction(&self) -> Result<ReadOnlyTransaction, TxError> {
        Ok(ReadOnlyTransaction::begin(self.database()?))
    }

    /// begin_read_write_transaction starts a ReadWriteTransaction.
    /// The caller commits, rolls back or ends it explicitly.
    pub async fn begin_read_write_transaction(&self) -> Result<ReadWriteTransaction, TxError> {
        Ok(ReadWriteTransaction::begin(self.database()?))
    }

    /// apply applies a list of mutations atomically to the database,
    /// retrying with a fresh transaction when the commit aborts.
    pub async fn apply(&self, ms: Vec<Mutation>, options: Option<ApplyOptions>) -> Result<CommitTimestamp, TxError> {
        self.apply_with_cancel(None, ms, options).await
    }

    pub async fn apply_with_cancel(
        &self,
        cancel: Option<CancellationToken>,
        ms: Vec<Mutation>,
        options: Option<ApplyOptions>,
    ) -> Result<CommitTimestamp, TxError> {
        let opt = options.unwrap_or_default();
        let retry = opt
            .transaction_retry_setting
            .unwrap_or_else(|| self.config.transaction_retry_setting.clone());
        let co = opt.commit_options;
        invoke(cancel, Some(retry), || async {
            let mut tx = self.begin_read_write_transaction().await?;
            tx.buffer_write(ms.clone());
            let result = tx.commit(co.clone()).await?;
            Ok::<_, TxError>(result.timestamp)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use snippets_gax::status::Code;

    use super::*;
    use crate::key::all_keys;
    use crate::mutation::insert;

    fn client() -> Client {
        let instance = Instance::new("test-instance");
        let db = Arc::new(Database::new(instance.database_name("db")));
        db.update_ddl(&["CREATE TABLE Singers (SingerId INT64 NOT NULL) PRIMARY KEY (SingerId)".to_string()])
            .unwrap();
        instance.register("db", db).unwrap();
        Client::new(&instance, "db", None).unwrap()
    }

    #[test]
    fn test_missing_database() {
        let instance = Instance::new("test-instance");
        match Client::new(&instance, "nope", None) {
            Err(TxError::GRPC(status)) => assert_eq!(status.code(), Code::NotFound),
            Ok(_) => panic!("client created for a missing database"),
        }
    }

    #[tokio::test]
    async fn test_apply() {
        let client = client();
        client
            .apply(vec![insert("Singers", &["SingerId"], &[&1])], None)
            .await
            .unwrap();
        let mut tx = client.single().await.unwrap();
        let iter = tx.read("Singers", &["SingerId"], all_keys(), None).await.unwrap();
        assert_eq!(iter.remaining(), 1);

        let err = client
            .apply(vec![insert("Singers", &["SingerId"], &[&1])], None)
            .await
            .unwrap_err();
        assert_eq!(err.try_as().map(|s| s.code()), Some(Code::AlreadyExists));
    }

    #[tokio::test]
    async fn test_closed_client() {
        let client = client();
        let clone = client.clone();
        client.close();
        let err = clone.begin_read_write_transaction().await.err().unwrap();
        assert_eq!(err.try_as().map(|s| s.code()), Some(Code::Unavailable));
        let err = clone.apply(vec![], None).await.unwrap_err();
        assert_eq!(err.try_as().map(|s| s.code()), Some(Code::Unavailable));
    }
}
