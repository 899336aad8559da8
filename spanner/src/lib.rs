//! # spanner-lite
//!
//! An in-process, single-node relational store with the client surface of a
//! Cloud Spanner client library: key-set reads, a SELECT subset, mutations,
//! read-only snapshot transactions and optimistic read-write transactions.
//!
//! ## Quickstart
//!
//! ```ignore
//! use std::sync::Arc;
//! use spanner_lite::admin::{CreateDatabaseRequest, DatabaseAdminClient};
//! use spanner_lite::client::Client;
//! use spanner_lite::instance::Instance;
//! use spanner_lite::key::all_keys;
//! use spanner_lite::mutation::insert;
//!
//! let instance = Arc::new(Instance::new("test-instance"));
//! let admin = DatabaseAdminClient::new(instance.clone());
//! let mut op = admin.create_database(None, CreateDatabaseRequest {
//!     parent: instance.name().to_string(),
//!     create_statement: "CREATE DATABASE `example-db`".to_string(),
//!     extra_statements: vec!["CREATE TABLE Singers (SingerId INT64 NOT NULL) PRIMARY KEY (SingerId)".to_string()],
//! }, None).await?;
//! op.wait(None, None).await?;
//!
//! let client = Client::new(&instance, "example-db", None)?;
//! client.apply(vec![insert("Singers", &["SingerId"], &[&1])], None).await?;
//!
//! let mut tx = client.single().await?;
//! let mut iter = tx.read("Singers", &["SingerId"], all_keys(), None).await?;
//! while let Some(row) = iter.next().await? {
//!     let singer_id: i64 = row.column(0)?;
//! }
//! ```
//!
//! ## Read-write transactions
//!
//! There is no closure-based runner. Begin a transaction, read and buffer
//! writes through it, then commit (or call `end` with the outcome). A commit
//! whose reads went stale fails with `Code::Aborted` and writes nothing; retry
//! from the beginning with a new transaction.
pub mod admin;
pub mod client;
pub mod database;
pub mod ddl;
pub mod instance;
pub mod key;
mod lexer;
pub mod longrunning;
pub mod mutation;
mod query;
pub mod reader;
pub mod retry;
pub mod row;
pub mod statement;
pub mod transaction;
pub mod transaction_ro;
pub mod transaction_rw;
pub mod value;
