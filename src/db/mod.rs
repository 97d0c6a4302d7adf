//! Storage collaborator for the feed server.
//!
//! Queries are always a static template plus bound parameters; the
//! [`Storage`] trait executes them and hands back loosely typed records.

pub mod models;
pub mod operations;
pub mod query;

pub use models::{Credential, FeedEntry, Record};
pub use operations::{SqliteStorage, Storage};
pub use query::{BoundQuery, SqlValue};
