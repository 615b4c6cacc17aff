use serde::{Deserialize, Serialize};
use tempo_core::RecordId;

/// Sentinel for "timestamp not set" (paused timers).
pub const NOT_SET: f64 = -1.0;

/// Upper bound on timer name length, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Lifecycle state of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    /// Counting down toward `end_time`.
    Running,
    /// Suspended; `duration` holds the remaining seconds.
    Paused,
    /// Expired (or finished externally). Terminal for scheduling.
    Finished,
}

impl std::fmt::Display for TimerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Finished => "finished",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TimerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(TimerStatus::Running),
            "paused" => Ok(TimerStatus::Paused),
            "finished" => Ok(TimerStatus::Finished),
            other => Err(format!("unknown timer status: {other}")),
        }
    }
}

/// Full snapshot of one timer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timer {
    pub id: RecordId,
    pub name: String,
    /// Requested span while running; remaining seconds while paused.
    pub duration: f64,
    /// Epoch seconds, or [`NOT_SET`] while paused.
    pub start_time: f64,
    /// Epoch seconds, or [`NOT_SET`] while paused.
    pub end_time: f64,
    pub status: TimerStatus,
}

/// Current wall-clock time as fractional epoch seconds — the unit all
/// timer timestamps are stored in.
pub fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
