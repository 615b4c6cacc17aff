/// Lifecycle events published by the timer repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Created,
    Paused,
    Resumed,
    Deleted,
    Finished,
}

impl std::fmt::Display for TimerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimerEvent::Created => "created",
            TimerEvent::Paused => "paused",
            TimerEvent::Resumed => "resumed",
            TimerEvent::Deleted => "deleted",
            TimerEvent::Finished => "finished",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TimerEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(TimerEvent::Created),
            "paused" => Ok(TimerEvent::Paused),
            "resumed" => Ok(TimerEvent::Resumed),
            "deleted" => Ok(TimerEvent::Deleted),
            "finished" => Ok(TimerEvent::Finished),
            other => Err(format!("unknown timer event: {other}")),
        }
    }
}
