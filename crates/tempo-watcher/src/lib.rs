//! `tempo-watcher` — the async expiry watcher.
//!
//! One background task per repository sleeps until the soonest running
//! timer's `end_time`, marks it finished, and invokes a caller-supplied
//! callback. Lifecycle events from the repository's bus wake the task so
//! it can re-target whenever the soonest expiry changes underneath it.

pub mod watcher;

pub use watcher::{ExpiryWatcher, FinishedCallback};
