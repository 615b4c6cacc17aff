//! `tempo-timers` — the timer domain layer over the record store.
//!
//! A timer is a record with attributes `name`, `duration`, `start_time`,
//! `end_time`, and `status`, tracked through RUNNING → PAUSED ⇄ RUNNING →
//! FINISHED. While RUNNING, `end_time - duration == start_time`; while
//! PAUSED, both timestamps are the [`NOT_SET`] sentinel and `duration`
//! holds the remaining seconds. Every successful mutation publishes its
//! lifecycle event on the shared [`tempo_bus::EventBus`].

pub mod error;
pub mod repo;
pub mod types;

pub use error::{Result, TimerError};
pub use repo::TimerRepository;
pub use types::{unix_now, Timer, TimerStatus, MAX_NAME_LEN, NOT_SET};
