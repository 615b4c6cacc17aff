use std::sync::Arc;
use std::time::Duration;

use tempo_bus::{EventHandler, TimerEvent};
use tempo_core::RecordId;
use tempo_timers::{unix_now, TimerRepository, TimerStatus};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Invoked (on the watcher task) each time the watcher itself moves a timer
/// to FINISHED.
pub type FinishedCallback = Arc<dyn Fn(RecordId) + Send + Sync>;

/// Bridges bus events onto the watcher task's channel.
struct Forwarder {
    tx: mpsc::UnboundedSender<(TimerEvent, RecordId)>,
}

impl EventHandler for Forwarder {
    fn on_event(&self, event: TimerEvent, id: RecordId) -> anyhow::Result<()> {
        // A closed channel just means the watcher has stopped.
        let _ = self.tx.send((event, id));
        Ok(())
    }
}

/// What the watcher task is currently sleeping towards.
#[derive(Debug, Clone, Copy)]
struct WatchState {
    id: RecordId,
    end_time: f64,
}

/// Background task that finishes running timers as their deadlines pass.
///
/// The task sleeps until the soonest `end_time` among RUNNING timers and is
/// woken early by any lifecycle event that could change that target: a new
/// or resumed timer with a sooner deadline switches the watch, and pausing,
/// deleting, or finishing the watched timer forces a re-query. With no
/// running timers it idles until an event arrives.
pub struct ExpiryWatcher {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl ExpiryWatcher {
    /// Subscribe to `repo`'s bus and spawn the watcher task.
    pub fn spawn(repo: Arc<TimerRepository>, on_finished: FinishedCallback) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        repo.bus().subscribe(Arc::new(Forwarder { tx }));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(repo, on_finished, rx, shutdown_rx));
        Self {
            shutdown: shutdown_tx,
            handle,
        }
    }

    /// Signal the task to stop and wait for it to drain.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            error!("expiry watcher task failed: {e}");
        }
    }
}

async fn run(
    repo: Arc<TimerRepository>,
    on_finished: FinishedCallback,
    mut events: mpsc::UnboundedReceiver<(TimerEvent, RecordId)>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut current = rearm(&repo);
    info!("expiry watcher started");
    loop {
        match current {
            Some(target) => {
                let delay = sleep_until_deadline(target.end_time);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        current = handle_elapsed(&repo, &on_finished, target);
                    }
                    event = events.recv() => match event {
                        Some((event, id)) => {
                            current = handle_event(&repo, Some(target), event, id);
                        }
                        None => break,
                    },
                    changed = shutdown.changed() => {
                        // Err means the controller is gone; shut down too.
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            None => {
                tokio::select! {
                    event = events.recv() => match event {
                        Some((event, id)) => {
                            current = handle_event(&repo, None, event, id);
                        }
                        None => break,
                    },
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
        }
    }
    info!("expiry watcher stopped");
}

/// React to one lifecycle event, returning the new watch target.
fn handle_event(
    repo: &TimerRepository,
    current: Option<WatchState>,
    event: TimerEvent,
    id: RecordId,
) -> Option<WatchState> {
    match event {
        TimerEvent::Created | TimerEvent::Resumed => match current {
            None => rearm(repo),
            Some(target) => match snapshot(repo, id) {
                // Switch only if the newcomer expires sooner.
                Some(candidate) if candidate.end_time < target.end_time => {
                    debug!(id, "switching watch to sooner timer");
                    Some(candidate)
                }
                _ => Some(target),
            },
        },
        // Only the watched timer pausing or vanishing invalidates the
        // target; any other timer leaving RUNNING cannot make the soonest
        // expiry sooner.
        TimerEvent::Paused | TimerEvent::Deleted => {
            if current.is_some_and(|target| target.id == id) {
                rearm(repo)
            } else {
                current
            }
        }
        // Always re-query on a finish, ours or an external finisher's, so
        // the watch stays consistent with whoever performed the transition.
        TimerEvent::Finished => rearm(repo),
    }
}

/// The sleep ran out: finish the watched timer if it is still due, then
/// pick the next target.
fn handle_elapsed(
    repo: &TimerRepository,
    on_finished: &FinishedCallback,
    target: WatchState,
) -> Option<WatchState> {
    match snapshot(repo, target.id) {
        // Gone, or no longer running; nothing to finish.
        None => {}
        // The deadline moved while we slept; rearm re-targets it.
        Some(now_watched) if unix_now() < now_watched.end_time => {}
        Some(_) => match repo.mark_finished(target.id) {
            Ok(true) => {
                info!(id = target.id, "timer expired");
                on_finished(target.id);
            }
            Ok(false) => debug!(id = target.id, "timer already finished"),
            Err(e) => error!(id = target.id, "could not finish expired timer: {e}"),
        },
    }
    rearm(repo)
}

/// Query the soonest running timer and validate it, retrying until the
/// query and the snapshot agree. Each pass re-reads the table, so a
/// candidate that changed state underneath us just drops out.
fn rearm(repo: &TimerRepository) -> Option<WatchState> {
    loop {
        let ids = match repo.soonest_running(1) {
            Ok(ids) => ids,
            Err(e) => {
                error!("could not query soonest running timer: {e}");
                return None;
            }
        };
        let Some(&id) = ids.first() else {
            debug!("no running timers; watcher idle");
            return None;
        };
        if let Some(target) = snapshot(repo, id) {
            debug!(id, end_time = target.end_time, "watching timer");
            return Some(target);
        }
    }
}

/// Time left until `end_time`, saturating at both ends: already-overdue
/// deadlines sleep zero, and deadlines beyond `Duration`'s range (a timer
/// created with an astronomically large duration) sleep `Duration::MAX`
/// rather than panicking the task.
fn sleep_until_deadline(end_time: f64) -> Duration {
    Duration::try_from_secs_f64((end_time - unix_now()).max(0.0)).unwrap_or(Duration::MAX)
}

/// The timer's current deadline, if it is still running.
fn snapshot(repo: &TimerRepository, id: RecordId) -> Option<WatchState> {
    match repo.info(id) {
        Ok(t) if t.status == TimerStatus::Running => Some(WatchState {
            id,
            end_time: t.end_time,
        }),
        _ => None,
    }
}
