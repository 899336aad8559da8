use snippets_gax::status::{Code, Status};
use spanner_lite::client::Client;
use spanner_lite::key::{all_keys, Key};
use spanner_lite::mutation::{insert, update};
use spanner_lite::statement::Statement;
use spanner_lite::transaction_rw::CommitOptions;

mod common;
use common::*;

#[ctor::ctor]
fn init() {
    let _ = tracing_subscriber::fmt().try_init();
}

async fn balance(client: &Client, user_id: &str) -> i64 {
    let mut tx = client.single().await.unwrap();
    let row = tx
        .read_row("User", &["Balance"], Key::new(&user_id))
        .await
        .unwrap()
        .unwrap();
    row.column(0).unwrap()
}

async fn withdraw(client: &Client, user_id: &str, amount: i64) -> Result<i64, Status> {
    let mut tx = client.begin_read_write_transaction().await.map_err(|e| match e {
        spanner_lite::client::TxError::GRPC(s) => s,
    })?;
    let result = async {
        let row = tx
            .read_row("User", &["Balance"], Key::new(&user_id))
            .await?
            .ok_or_else(|| Status::not_found(user_id.to_string()))?;
        let current: i64 = row
            .column(0)
            .map_err(|e| Status::failed_precondition(e.to_string()))?;
        if current < amount {
            return Err(Status::failed_precondition("insufficient balance"));
        }
        tx.buffer_write(vec![update("User", &["UserId", "Balance"], &[&user_id, &(current - amount)])]);
        Ok(current - amount)
    }
    .await;
    tx.end(result, None).await.map(|(_, v)| v)
}

#[tokio::test]
async fn test_end_commits_mutations() {
    let (_instance, client) = create_client("rw-end").await;
    insert_users(&client, &[("user_a", 100)]).await;

    assert_eq!(withdraw(&client, "user_a", 30).await.unwrap(), 70);
    assert_eq!(balance(&client, "user_a").await, 70);
}

#[tokio::test]
async fn test_end_rolls_back_on_business_error() {
    let (_instance, client) = create_client("rw-rollback").await;
    insert_users(&client, &[("user_a", 10)]).await;

    let err = withdraw(&client, "user_a", 30).await.unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
    assert_eq!(balance(&client, "user_a").await, 10);
}

#[tokio::test]
async fn test_lost_update_is_prevented() {
    let (_instance, client) = create_client("rw-lost-update").await;
    insert_users(&client, &[("user_a", 100)]).await;

    let mut tx1 = client.begin_read_write_transaction().await.unwrap();
    let mut tx2 = client.begin_read_write_transaction().await.unwrap();
    for tx in [&mut tx1, &mut tx2] {
        let row = tx
            .read_row("User", &["Balance"], Key::new(&"user_a"))
            .await
            .unwrap()
            .unwrap();
        let current: i64 = row.column(0).unwrap();
        tx.buffer_write(vec![update("User", &["UserId", "Balance"], &[&"user_a", &(current - 60)])]);
    }

    tx1.commit(CommitOptions::default()).await.unwrap();
    let err = tx2.commit(CommitOptions::default()).await.unwrap_err();
    assert_eq!(err.code(), Code::Aborted);
    assert_eq!(balance(&client, "user_a").await, 40);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_withdrawals_never_overdraw() {
    let (_instance, client) = create_client("rw-concurrent").await;
    insert_users(&client, &[("user_a", 100)]).await;

    let mut handles = vec![];
    for _ in 0..10 {
        let client = client.clone();
        handles.push(tokio::spawn(async move { withdraw(&client, "user_a", 30).await }));
    }
    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(status) => assert!(matches!(status.code(), Code::Aborted | Code::FailedPrecondition)),
        }
    }
    let remaining = balance(&client, "user_a").await;
    assert_eq!(remaining, 100 - 30 * succeeded);
    assert!(remaining >= 0);
}

#[tokio::test]
async fn test_query_conflicts_with_concurrent_insert() {
    let (_instance, client) = create_client("rw-phantom").await;
    insert_users(&client, &[("user_a", 100)]).await;

    let mut tx = client.begin_read_write_transaction().await.unwrap();
    let rows = all_rows(tx.query(Statement::new("SELECT UserId FROM User")).await.unwrap())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);

    insert_users(&client, &[("user_b", 100)]).await;

    tx.buffer_write(vec![insert("User", &["UserId", "Balance"], &[&"user_c", &0])]);
    let err = tx.commit(CommitOptions::default()).await.unwrap_err();
    assert_eq!(err.code(), Code::Aborted);

    let mut ro = client.single().await.unwrap();
    let rows = all_rows(ro.read("User", &["UserId"], all_keys(), None).await.unwrap())
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn test_commit_after_rollback_fails() {
    let (_instance, client) = create_client("rw-state").await;
    let mut tx = client.begin_read_write_transaction().await.unwrap();
    tx.rollback().await.unwrap();
    let err = tx.commit(CommitOptions::default()).await.unwrap_err();
    assert_eq!(err.code(), Code::FailedPrecondition);
}
