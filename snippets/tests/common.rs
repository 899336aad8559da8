#![allow(dead_code)]

use std::sync::Arc;

use spanner_lite::client::Client;
use spanner_lite::instance::Instance;
use spanner_lite::key::Key;
use spanner_lite::mutation::update;
use spanner_snippets::config::{DATABASE_ID, INSTANCE_ID};
use spanner_snippets::snippets::{add_column, create_database, insert_data};
use spanner_snippets::transfer::{AlbumKey, BALANCE_COLUMN, TABLE};

pub fn source() -> AlbumKey {
    AlbumKey::new(1, 1)
}

pub fn destination() -> AlbumKey {
    AlbumKey::new(2, 2)
}

/// Builds the sample database and sets the budgets of albums (1, 1) and (2, 2).
pub async fn setup(source_budget: i64, destination_budget: i64) -> (Arc<Instance>, Client) {
    let instance = Arc::new(Instance::new(INSTANCE_ID));
    create_database(&instance, DATABASE_ID).await.unwrap();
    insert_data(&instance, DATABASE_ID).await.unwrap();
    add_column(&instance, DATABASE_ID).await.unwrap();
    let client = Client::new(&instance, DATABASE_ID, None).unwrap();
    set_budget(&client, source(), source_budget).await;
    set_budget(&client, destination(), destination_budget).await;
    (instance, client)
}

pub async fn set_budget(client: &Client, album: AlbumKey, budget: i64) {
    let ms = vec![update(
        TABLE,
        &["SingerId", "AlbumId", BALANCE_COLUMN],
        &[&album.singer_id, &album.album_id, &budget],
    )];
    client.apply(ms, None).await.unwrap();
}

pub async fn budget(client: &Client, album: AlbumKey) -> i64 {
    let mut tx = client.single().await.unwrap();
    let key = Key::composite(&[&album.singer_id, &album.album_id]);
    let row = tx
        .read_row(TABLE, &[BALANCE_COLUMN], key)
        .await
        .unwrap()
        .unwrap();
    row.column_by_name::<i64>(BALANCE_COLUMN).unwrap()
}

pub async fn budgets(client: &Client) -> (i64, i64) {
    (budget(client, source()).await, budget(client, destination()).await)
}
