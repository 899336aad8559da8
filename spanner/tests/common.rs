use std::sync::Arc;

use snippets_gax::status::Status;
use spanner_lite::admin::{CreateDatabaseRequest, DatabaseAdminClient};
use spanner_lite::client::Client;
use spanner_lite::instance::Instance;
use spanner_lite::mutation::insert;
use spanner_lite::reader::RowIterator;
use spanner_lite::row::Row;

pub const INSTANCE_ID: &str = "test-instance";

pub fn ddl() -> Vec<String> {
    vec![
        "CREATE TABLE User (
            UserId STRING(MAX) NOT NULL,
            Premium BOOL,
            Balance INT64
        ) PRIMARY KEY (UserId)"
            .to_string(),
        "CREATE TABLE UserItem (
            UserId STRING(MAX) NOT NULL,
            ItemId INT64 NOT NULL,
            Quantity INT64 NOT NULL
        ) PRIMARY KEY (UserId, ItemId),
        INTERLEAVE IN PARENT User ON DELETE CASCADE"
            .to_string(),
    ]
}

/// Creates a fresh instance with one database holding the test schema.
pub async fn create_client(database_id: &str) -> (Arc<Instance>, Client) {
    let instance = Arc::new(Instance::new(INSTANCE_ID));
    let admin = DatabaseAdminClient::new(instance.clone());
    let mut op = admin
        .create_database(
            None,
            CreateDatabaseRequest {
                parent: instance.name().to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: ddl(),
            },
            None,
        )
        .await
        .unwrap();
    op.wait(None, None).await.unwrap();
    let client = Client::new(&instance, database_id, None).unwrap();
    (instance, client)
}

pub async fn insert_users(client: &Client, users: &[(&str, i64)]) {
    let ms = users
        .iter()
        .map(|(id, balance)| insert("User", &["UserId", "Premium", "Balance"], &[id, &true, balance]))
        .collect();
    client.apply(ms, None).await.unwrap();
}

pub async fn all_rows(mut itr: RowIterator) -> Result<Vec<Row>, Status> {
    let mut rows = vec![];
    while let Some(row) = itr.next().await? {
        rows.push(row);
    }
    Ok(rows)
}
