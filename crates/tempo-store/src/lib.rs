//! `tempo-store` — schema-typed record persistence over SQLite.
//!
//! # Overview
//!
//! A [`RecordStore`] owns one SQLite table whose columns are declared by a
//! [`Schema`] at open time. Values are encoded per their declared type
//! (booleans as 0/1, structured values as JSON text) and decoded back on
//! read, so callers only ever see [`Value`]s.
//!
//! # Concurrency
//!
//! The store is safe to share across threads (the connection lives behind a
//! `Mutex`) and safe to open from multiple processes against the same file:
//! first-time schema creation is serialized by a cross-process file lock,
//! and every statement retries transient `SQLITE_BUSY` / `SQLITE_LOCKED`
//! failures with capped exponential backoff before surfacing
//! [`StoreError::Contention`]. No write is silently dropped short of
//! exhausting the retry budget.

pub mod error;
mod retry;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use schema::{AttrType, Schema, Value};
pub use store::{RecordStore, StoreLocation};

pub use tempo_core::RecordId;
