//! Getting-started snippets for a Spanner-style database: create a database,
//! load sample singers and albums, read them back, alter the schema and move
//! marketing budget between albums inside a read-write transaction.
pub mod config;
pub mod snippets;
pub mod store;
pub mod transfer;

pub use snippets::Error;
