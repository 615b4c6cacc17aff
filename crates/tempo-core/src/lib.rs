//! `tempo-core` — shared types, configuration, and logging bootstrap.
//!
//! Every other tempo crate depends on this one. It deliberately contains no
//! storage or scheduling logic of its own.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::TempoConfig;
pub use error::{Result, TempoError};
pub use types::RecordId;
