use snippets_gax::retry::TryAs;
use snippets_gax::status::Code;
use spanner_lite::key::{all_keys, Key};
use spanner_lite::mutation::{delete, insert, update};
use spanner_lite::statement::Statement;

mod common;
use common::*;

#[ctor::ctor]
fn init() {
    let _ = tracing_subscriber::fmt().try_init();
}

#[tokio::test]
async fn test_apply_and_query() {
    let (_instance, client) = create_client("client-apply").await;
    insert_users(&client, &[("user_a", 100), ("user_b", 200), ("user_c", 300)]).await;

    let mut stmt = Statement::new("SELECT UserId, Balance FROM User WHERE Balance >= @min ORDER BY Balance DESC");
    stmt.add_param("min", &200);
    let mut tx = client.single().await.unwrap();
    let rows = all_rows(tx.query(stmt).await.unwrap()).await.unwrap();
    let ids: Vec<String> = rows.iter().map(|r| r.column_by_name("UserId").unwrap()).collect();
    assert_eq!(ids, vec!["user_c", "user_b"]);
}

#[tokio::test]
async fn test_apply_is_atomic() {
    let (_instance, client) = create_client("client-atomic").await;
    insert_users(&client, &[("user_a", 100)]).await;

    let err = client
        .apply(
            vec![
                update("User", &["UserId", "Balance"], &[&"user_a", &0]),
                insert("UserItem", &["UserId", "ItemId", "Quantity"], &[&"missing", &1, &1]),
            ],
            None,
        )
        .await
        .unwrap_err();
    assert_eq!(err.try_as().map(|s| s.code()), Some(Code::NotFound));

    let mut tx = client.single().await.unwrap();
    let row = tx
        .read_row("User", &["Balance"], Key::new(&"user_a"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.column::<i64>(0).unwrap(), 100);
}

#[tokio::test]
async fn test_delete_cascades_to_interleaved_rows() {
    let (_instance, client) = create_client("client-cascade").await;
    insert_users(&client, &[("user_a", 100), ("user_b", 100)]).await;
    client
        .apply(
            vec![
                insert("UserItem", &["UserId", "ItemId", "Quantity"], &[&"user_a", &1, &10]),
                insert("UserItem", &["UserId", "ItemId", "Quantity"], &[&"user_a", &2, &20]),
                insert("UserItem", &["UserId", "ItemId", "Quantity"], &[&"user_b", &1, &30]),
            ],
            None,
        )
        .await
        .unwrap();

    client.apply(vec![delete("User", Key::new(&"user_a"))], None).await.unwrap();

    let mut tx = client.single().await.unwrap();
    let rows = all_rows(
        tx.read("UserItem", &["UserId", "Quantity"], all_keys(), None)
            .await
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].column::<i64>(1).unwrap(), 30);
}

#[tokio::test]
async fn test_read_only_transaction_sees_one_snapshot() {
    let (_instance, client) = create_client("client-ro").await;
    insert_users(&client, &[("user_a", 100)]).await;

    let mut ro = client.read_only_transaction().await.unwrap();
    client
        .apply(vec![update("User", &["UserId", "Balance"], &[&"user_a", &1])], None)
        .await
        .unwrap();

    let row = ro
        .read_row("User", &["Balance"], Key::new(&"user_a"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.column::<i64>(0).unwrap(), 100);

    let mut single = client.single().await.unwrap();
    let row = single
        .read_row("User", &["Balance"], Key::new(&"user_a"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.column::<i64>(0).unwrap(), 1);
}

#[tokio::test]
async fn test_query_errors() {
    let (_instance, client) = create_client("client-query-errors").await;
    let mut tx = client.single().await.unwrap();
    let err = tx.query(Statement::new("SELECT * FROM Nope")).await.err().unwrap();
    assert_eq!(err.code(), Code::NotFound);

    let err = tx
        .query(Statement::new("SELECT UserId FROM User WHERE Balance > @missing"))
        .await
        .err()
        .unwrap();
    assert_eq!(err.code(), Code::InvalidArgument);

    let err = tx.query(Statement::new("SELEC UserId FROM User")).await.err().unwrap();
    assert_eq!(err.code(), Code::InvalidArgument);
}
