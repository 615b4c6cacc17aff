//! `tempo-bus` — synchronous in-process fan-out of timer lifecycle events.
//!
//! Delivery is best-effort: handlers run in registration order on the
//! publishing thread, and a failing handler is logged and skipped rather
//! than aborting the publication.

pub mod bus;
pub mod event;

pub use bus::{EventBus, EventHandler};
pub use event::TimerEvent;
