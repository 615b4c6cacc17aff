use std::collections::BTreeMap;
use std::sync::Arc;

use tempo_bus::{EventBus, TimerEvent};
use tempo_core::RecordId;
use tempo_store::{RecordStore, Schema, StoreError, StoreLocation, Value};
use tracing::{debug, info};

use crate::error::{Result, TimerError};
use crate::types::{unix_now, Timer, TimerStatus, MAX_NAME_LEN, NOT_SET};

fn timer_schema() -> Schema {
    Schema::new()
        .with_attr("name", tempo_store::AttrType::Text)
        .with_attr("duration", tempo_store::AttrType::Real)
        .with_attr("start_time", tempo_store::AttrType::Real)
        .with_attr("end_time", tempo_store::AttrType::Real)
        .with_attr("status", tempo_store::AttrType::Text)
}

/// CRUD plus the RUNNING/PAUSED/FINISHED state machine, persisted through a
/// [`RecordStore`] and announced on a shared [`EventBus`].
pub struct TimerRepository {
    store: RecordStore,
    bus: Arc<EventBus>,
}

impl TimerRepository {
    pub fn open(location: StoreLocation, bus: Arc<EventBus>) -> Result<Self> {
        let store = RecordStore::open(timer_schema(), location)?;
        Ok(Self { store, bus })
    }

    /// The bus this repository publishes lifecycle events on.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Create a timer that starts running immediately for `duration` seconds.
    pub fn create(&self, name: &str, duration: f64) -> Result<RecordId> {
        if name.is_empty() {
            return Err(TimerError::InvalidArgument(
                "timer name must not be empty".into(),
            ));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(TimerError::InvalidArgument(format!(
                "timer name exceeds {MAX_NAME_LEN} characters"
            )));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(TimerError::InvalidArgument(format!(
                "duration must be a positive number of seconds, got {duration}"
            )));
        }

        let now = unix_now();
        let mut record = BTreeMap::new();
        record.insert("name".to_string(), Value::from(name));
        record.insert("duration".to_string(), Value::from(duration));
        record.insert("start_time".to_string(), Value::from(now));
        record.insert("end_time".to_string(), Value::from(now + duration));
        record.insert(
            "status".to_string(),
            Value::from(TimerStatus::Running.to_string()),
        );

        let id = self.store.insert(&record)?;
        info!(id, name, duration, "timer created");
        self.bus.publish(TimerEvent::Created, id);
        Ok(id)
    }

    /// Suspend a running timer, banking its remaining seconds in `duration`.
    pub fn pause(&self, id: RecordId) -> Result<()> {
        self.require_status(id, TimerStatus::Running)?;
        let end_time = self.read_real(id, "end_time")?;
        let remaining = end_time - unix_now();

        self.set(id, "duration", Value::from(remaining))?;
        self.set(id, "start_time", Value::from(NOT_SET))?;
        self.set(id, "end_time", Value::from(NOT_SET))?;
        self.set(id, "status", Value::from(TimerStatus::Paused.to_string()))?;
        info!(id, remaining, "timer paused");
        self.bus.publish(TimerEvent::Paused, id);
        Ok(())
    }

    /// Restart a paused timer with whatever time it had left.
    pub fn resume(&self, id: RecordId) -> Result<()> {
        self.require_status(id, TimerStatus::Paused)?;
        let remaining = self.read_real(id, "duration")?;
        if remaining < 0.0 {
            return Err(TimerError::InvalidArgument(
                "cannot resume a timer with negative remaining duration".into(),
            ));
        }

        let now = unix_now();
        self.set(id, "start_time", Value::from(now))?;
        self.set(id, "end_time", Value::from(now + remaining))?;
        self.set(id, "status", Value::from(TimerStatus::Running.to_string()))?;
        info!(id, remaining, "timer resumed");
        self.bus.publish(TimerEvent::Resumed, id);
        Ok(())
    }

    /// Delete a timer in any state.
    pub fn remove(&self, id: RecordId) -> Result<()> {
        self.store.remove(id).map_err(|e| map_missing(e, id))?;
        info!(id, "timer removed");
        self.bus.publish(TimerEvent::Deleted, id);
        Ok(())
    }

    /// Move a timer to FINISHED. Returns whether this call performed the
    /// transition: `Ok(false)` means the timer was already finished or is
    /// gone, which lets racing callers (watcher vs. user) settle on exactly
    /// one Finished event.
    pub fn mark_finished(&self, id: RecordId) -> Result<bool> {
        match self.status(id) {
            Ok(TimerStatus::Finished) => return Ok(false),
            Ok(_) => {}
            Err(TimerError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e),
        }
        match self
            .store
            .set_attr(id, "status", &Value::from(TimerStatus::Finished.to_string()))
        {
            Ok(()) => {}
            // Deleted between the status read and the write.
            Err(StoreError::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        info!(id, "timer finished");
        self.bus.publish(TimerEvent::Finished, id);
        Ok(true)
    }

    /// Current status of a timer.
    pub fn status(&self, id: RecordId) -> Result<TimerStatus> {
        let value = self
            .store
            .get_attr(id, "status")
            .map_err(|e| map_missing(e, id))?;
        parse_status(&value)
    }

    /// Full snapshot of one timer.
    pub fn info(&self, id: RecordId) -> Result<Timer> {
        let record = self.store.get_record(id).map_err(|e| map_missing(e, id))?;
        let name = record["name"]
            .as_text()
            .map(String::from)
            .unwrap_or_default();
        let duration = record["duration"].as_real().unwrap_or(NOT_SET);
        let start_time = record["start_time"].as_real().unwrap_or(NOT_SET);
        let end_time = record["end_time"].as_real().unwrap_or(NOT_SET);
        let status = parse_status(&record["status"])?;
        Ok(Timer {
            id,
            name,
            duration,
            start_time,
            end_time,
            status,
        })
    }

    pub fn exists(&self, id: RecordId) -> Result<bool> {
        match self.store.get_attr(id, "status") {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Up to `limit` running timers, soonest expiry first.
    pub fn soonest_running(&self, limit: usize) -> Result<Vec<RecordId>> {
        let mut filter = BTreeMap::new();
        filter.insert(
            "status".to_string(),
            Value::from(TimerStatus::Running.to_string()),
        );
        let ids = self.store.top_n("end_time", limit, false, &filter)?;
        debug!(?ids, "soonest running timers");
        Ok(ids)
    }

    fn require_status(&self, id: RecordId, expected: TimerStatus) -> Result<()> {
        let actual = self.status(id)?;
        if actual != expected {
            return Err(TimerError::InvalidState { expected, actual });
        }
        Ok(())
    }

    fn read_real(&self, id: RecordId, attr: &str) -> Result<f64> {
        let value = self
            .store
            .get_attr(id, attr)
            .map_err(|e| map_missing(e, id))?;
        value.as_real().ok_or_else(|| {
            TimerError::InvalidArgument(format!("attribute {attr} of timer {id} is not numeric"))
        })
    }

    fn set(&self, id: RecordId, attr: &str, value: Value) -> Result<()> {
        self.store
            .set_attr(id, attr, &value)
            .map_err(|e| map_missing(e, id))
    }
}

fn map_missing(e: StoreError, id: RecordId) -> TimerError {
    match e {
        StoreError::NotFound { .. } => TimerError::NotFound { id },
        other => TimerError::Store(other),
    }
}

fn parse_status(value: &Value) -> Result<TimerStatus> {
    let text = value.as_text().ok_or_else(|| {
        TimerError::InvalidArgument("status attribute is not text".to_string())
    })?;
    text.parse().map_err(TimerError::InvalidArgument)
}
