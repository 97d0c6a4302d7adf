//! The shared message feed: query construction and HTTP handlers.

pub mod handlers;
pub mod query;

pub use query::FeedQueryBuilder;
