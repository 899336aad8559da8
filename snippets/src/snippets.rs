use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use snippets_gax::status::Status;

use spanner_lite::admin::{CreateDatabaseRequest, DatabaseAdminClient, UpdateDatabaseDdlRequest};
use spanner_lite::client::{Client, TxError};
use spanner_lite::instance::{Instance, PersistError};
use spanner_lite::key::all_keys;
use spanner_lite::mutation::{insert, update};
use spanner_lite::reader::RowIterator;
use spanner_lite::row::{self, Row};
use spanner_lite::statement::Statement;

use snippets_gax::retry::RetrySetting;

use crate::config::{Config, TransferSettings};
use crate::transfer::{run_fund_transfer, AbortReason, TransactionOutcome, TransferError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Tx(#[from] TxError),
    #[error(transparent)]
    Status(#[from] Status),
    #[error(transparent)]
    Row(#[from] row::Error),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// One row of the Albums table as printed by the read and query snippets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Album {
    pub singer_id: i64,
    pub album_id: i64,
    pub album_title: Option<String>,
}

impl Album {
    fn from_row(row: &Row) -> Result<Self, row::Error> {
        Ok(Album {
            singer_id: row.column_by_name("SingerId")?,
            album_id: row.column_by_name("AlbumId")?,
            album_title: row.column_by_name("AlbumTitle")?,
        })
    }
}

impl Display for Album {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SingerId: {}, AlbumId: {}, AlbumTitle: {}",
            self.singer_id,
            self.album_id,
            self.album_title.as_deref().unwrap_or("None")
        )
    }
}

const CREATE_SINGERS: &str = "CREATE TABLE Singers (
            SingerId     INT64 NOT NULL,
            FirstName    STRING(1024),
            LastName     STRING(1024),
            SingerInfo   BYTES(MAX)
        ) PRIMARY KEY (SingerId)";

const CREATE_ALBUMS: &str = "CREATE TABLE Albums (
            SingerId     INT64 NOT NULL,
            AlbumId      INT64 NOT NULL,
            AlbumTitle   STRING(MAX)
        ) PRIMARY KEY (SingerId, AlbumId),
        INTERLEAVE IN PARENT Singers ON DELETE CASCADE";

/// Creates a database with the Singers and Albums tables.
pub async fn create_database(instance: &Arc<Instance>, database_id: &str) -> Result<(), Error> {
    let admin = DatabaseAdminClient::new(instance.clone());
    let mut operation = admin
        .create_database(
            None,
            CreateDatabaseRequest {
                parent: instance.name().to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![CREATE_SINGERS.to_string(), CREATE_ALBUMS.to_string()],
            },
            None,
        )
        .await?;

    tracing::info!("Waiting for operation to complete...");
    operation.wait(None, None).await?;

    tracing::info!("Created database {} on instance {}", database_id, instance.name());
    Ok(())
}

/// Inserts the sample singers and albums in one batch.
pub async fn insert_data(instance: &Arc<Instance>, database_id: &str) -> Result<(), Error> {
    let client = Client::new(instance, database_id, None)?;
    let singers: [(i64, &str, &str); 5] = [
        (1, "Marc", "Richards"),
        (2, "Catalina", "Smith"),
        (3, "Alice", "Trentor"),
        (4, "Lea", "Martin"),
        (5, "David", "Lomond"),
    ];
    let albums: [(i64, i64, &str); 5] = [
        (1, 1, "Total Junk"),
        (1, 2, "Go, Go, Go"),
        (2, 1, "Green"),
        (2, 2, "Forever Hold Your Peace"),
        (2, 3, "Terrified"),
    ];
    let columns = ["SingerId", "FirstName", "LastName"];
    let mut ms: Vec<_> = singers
        .iter()
        .map(|(id, first, last)| insert("Singers", &columns, &[id, first, last]))
        .collect();
    let columns = ["SingerId", "AlbumId", "AlbumTitle"];
    ms.extend(
        albums
            .iter()
            .map(|(singer_id, album_id, title)| insert("Albums", &columns, &[singer_id, album_id, title])),
    );
    client.apply(ms, None).await?;

    tracing::info!("Inserted data.");
    Ok(())
}

/// Queries the albums using SQL.
pub async fn query_data(instance: &Arc<Instance>, database_id: &str) -> Result<Vec<Album>, Error> {
    let client = Client::new(instance, database_id, None)?;
    let mut tx = client.single().await?;
    let iter = tx
        .query(Statement::new("SELECT SingerId, AlbumId, AlbumTitle FROM Albums"))
        .await?;
    albums(iter).await
}

/// Reads every album with a key-set read over the whole table.
pub async fn read_data(instance: &Arc<Instance>, database_id: &str) -> Result<Vec<Album>, Error> {
    let client = Client::new(instance, database_id, None)?;
    let mut tx = client.single().await?;
    let iter = tx
        .read("Albums", &["SingerId", "AlbumId", "AlbumTitle"], all_keys(), None)
        .await?;
    albums(iter).await
}

async fn albums(mut iter: RowIterator) -> Result<Vec<Album>, Error> {
    let mut albums = vec![];
    while let Some(row) = iter.next().await? {
        albums.push(Album::from_row(&row)?);
    }
    Ok(albums)
}

/// Adds the MarketingBudget column to Albums.
pub async fn add_column(instance: &Arc<Instance>, database_id: &str) -> Result<(), Error> {
    let admin = DatabaseAdminClient::new(instance.clone());
    let mut operation = admin
        .update_database_ddl(
            None,
            UpdateDatabaseDdlRequest {
                database: instance.database_name(database_id),
                statements: vec!["ALTER TABLE Albums ADD COLUMN MarketingBudget INT64".to_string()],
            },
            None,
        )
        .await?;

    tracing::info!("Waiting for operation to complete...");
    operation.wait(None, None).await?;

    tracing::info!("Added the MarketingBudget column.");
    Ok(())
}

/// Sets the marketing budgets of albums (1, 1) and (2, 2).
pub async fn update_data(instance: &Arc<Instance>, database_id: &str) -> Result<(), Error> {
    let client = Client::new(instance, database_id, None)?;
    let columns = ["SingerId", "AlbumId", "MarketingBudget"];
    client
        .apply(
            vec![
                update("Albums", &columns, &[&1, &1, &100000]),
                update("Albums", &columns, &[&2, &2, &500000]),
            ],
            None,
        )
        .await?;

    tracing::info!("Updated data.");
    Ok(())
}

/// Moves budget from the destination album to the source album when the
/// destination can afford it.
pub async fn read_write_transaction(
    instance: &Arc<Instance>,
    database_id: &str,
    transfer: &TransferSettings,
    retry: &RetrySetting,
) -> Result<TransactionOutcome, Error> {
    let client = Client::new(instance, database_id, None)?;
    let outcome = run_fund_transfer(&client, &transfer.request(), Some(retry.clone()), None).await?;
    match outcome {
        TransactionOutcome::Committed {
            source_balance,
            destination_balance,
        } => {
            tracing::info!(
                "Setting first album's budget to {} and the second album's budget to {}.",
                source_balance,
                destination_balance
            );
            tracing::info!("Transaction complete.");
        }
        TransactionOutcome::Aborted(AbortReason::InsufficientFunds) => {
            tracing::warn!("The second album doesn't have enough funds to transfer");
        }
        TransactionOutcome::Aborted(AbortReason::StoreConflict) => {
            tracing::warn!("The transfer kept conflicting with other transactions and was abandoned");
        }
    }
    Ok(outcome)
}

/// The snippets runnable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    CreateDatabase,
    InsertData,
    QueryData,
    ReadData,
    AddColumn,
    UpdateData,
    ReadWriteTransaction,
    RunAll,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::CreateDatabase,
        Command::InsertData,
        Command::QueryData,
        Command::ReadData,
        Command::AddColumn,
        Command::UpdateData,
        Command::ReadWriteTransaction,
        Command::RunAll,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Command::CreateDatabase => "create_database",
            Command::InsertData => "insert_data",
            Command::QueryData => "query_data",
            Command::ReadData => "read_data",
            Command::AddColumn => "add_column",
            Command::UpdateData => "update_data",
            Command::ReadWriteTransaction => "read_write_transaction",
            Command::RunAll => "run_all",
        }
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| Error::UnknownCommand(s.to_string()))
    }
}

/// Runs `command` against `instance` and returns the lines to print.
pub async fn run(instance: &Arc<Instance>, config: &Config, command: Command) -> Result<Vec<String>, Error> {
    let database_id = config.database_id.as_str();
    let mut lines = vec![];
    let steps: Vec<Command> = match command {
        Command::RunAll => Command::ALL.into_iter().filter(|c| *c != Command::RunAll).collect(),
        other => vec![other],
    };
    for step in steps {
        tracing::debug!("running {}", step.name());
        match step {
            Command::CreateDatabase => create_database(instance, database_id).await?,
            Command::InsertData => insert_data(instance, database_id).await?,
            Command::QueryData => {
                lines.extend(query_data(instance, database_id).await?.iter().map(Album::to_string))
            }
            Command::ReadData => {
                lines.extend(read_data(instance, database_id).await?.iter().map(Album::to_string))
            }
            Command::AddColumn => add_column(instance, database_id).await?,
            Command::UpdateData => update_data(instance, database_id).await?,
            Command::ReadWriteTransaction => {
                read_write_transaction(instance, database_id, &config.transfer, &config.retry).await?;
            }
            Command::RunAll => {}
        }
    }
    Ok(lines)
}

/// Loads the instance from `config.state_path`, runs `command` and saves the
/// instance back so the next invocation sees its effects.
pub async fn run_with_state(config: &Config, command: Command) -> Result<Vec<String>, Error> {
    let instance = Arc::new(Instance::load(&config.instance_id, &config.state_path)?);
    let result = run(&instance, config, command).await;
    match (result, instance.save(&config.state_path)) {
        (Ok(lines), saved) => saved.map(|_| lines).map_err(Error::from),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(save_error)) => {
            tracing::error!("failed to save {}: {}", config.state_path.display(), save_error);
            Err(e)
        }
    }
}
