//! Bounded retry with capped exponential backoff for transient SQLite
//! failures under concurrent writers.

use std::time::Duration;

use rusqlite::ErrorCode;
use tracing::trace;

use crate::error::{Result, StoreError};

pub(crate) struct RetryPolicy {
    pub initial: Duration,
    pub cap: Duration,
    pub multiplier: f64,
    pub max_attempts: u32,
}

/// Mutating statements: 50ms start, x1.6 growth, 800ms cap.
pub(crate) const WRITE_RETRY: RetryPolicy = RetryPolicy {
    initial: Duration::from_millis(50),
    cap: Duration::from_millis(800),
    multiplier: 1.6,
    max_attempts: 80,
};

/// Reads back off faster and shorter than writes.
pub(crate) const READ_RETRY: RetryPolicy = RetryPolicy {
    initial: Duration::from_millis(20),
    cap: Duration::from_millis(600),
    multiplier: 1.6,
    max_attempts: 80,
};

impl RetryPolicy {
    /// Run `op`, retrying transient busy/locked failures until the budget is
    /// exhausted. Non-transient errors propagate immediately; exhaustion
    /// surfaces as [`StoreError::Contention`].
    pub(crate) fn run<T>(&self, mut op: impl FnMut() -> rusqlite::Result<T>) -> Result<T> {
        let mut delay = self.initial;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(v) => return Ok(v),
                Err(e) if is_transient(&e) => {
                    if attempt >= self.max_attempts {
                        return Err(StoreError::Contention { attempts: attempt });
                    }
                    trace!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient sqlite failure, backing off"
                    );
                    std::thread::sleep(delay);
                    delay = self.cap.min(delay.mul_f64(self.multiplier));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Busy/locked conditions from concurrent writers, plus the transient disk
/// I/O failures some filesystems surface under the same contention.
fn is_transient(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, msg) => {
            matches!(
                e.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::SystemIoFailure
            ) || msg.as_deref().is_some_and(|m| {
                let m = m.to_ascii_lowercase();
                m.contains("locked") || m.contains("busy")
            })
        }
        _ => false,
    }
}
