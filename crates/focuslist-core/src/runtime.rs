//! Async driver for the interval engine.
//!
//! [`EngineHandle`] is the single writer: every command and every tick goes
//! through its mutex, so transitions never interleave. Readers get snapshots
//! through a `watch` channel and events through a `broadcast` channel.
//! [`run_ticker`] is the shared periodic tick source.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::events::Event;
use crate::ports::Collaborators;
use crate::task::{FocusTask, TaskId};
use crate::timer::{Clock, CycleConfig, IntervalEngine, SystemClock, TimerSnapshot};

const EVENT_BUFFER: usize = 64;

/// Shared, serialized access to an [`IntervalEngine`].
pub struct EngineHandle<C: Clock = SystemClock> {
    engine: Mutex<IntervalEngine<C>>,
    collaborators: Collaborators,
    snapshots: watch::Sender<Vec<TimerSnapshot>>,
    events: broadcast::Sender<Event>,
}

impl EngineHandle<SystemClock> {
    pub fn new(config: CycleConfig, collaborators: Collaborators) -> Arc<Self> {
        Self::with_engine(IntervalEngine::new(config), collaborators)
    }
}

impl<C: Clock> EngineHandle<C> {
    pub fn with_engine(engine: IntervalEngine<C>, collaborators: Collaborators) -> Arc<Self> {
        let (snapshots, _) = watch::channel(engine.snapshots());
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Arc::new(Self {
            engine: Mutex::new(engine),
            collaborators,
            snapshots,
            events,
        })
    }

    /// Read-only view of all timers, refreshed after every change and tick.
    pub fn watch_snapshots(&self) -> watch::Receiver<Vec<TimerSnapshot>> {
        self.snapshots.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub async fn snapshots(&self) -> Vec<TimerSnapshot> {
        self.engine.lock().await.snapshots()
    }

    pub async fn snapshot(&self, id: &TaskId) -> Option<TimerSnapshot> {
        self.engine.lock().await.snapshot(id)
    }

    pub async fn active_subscriptions(&self) -> usize {
        self.engine.lock().await.active_subscriptions()
    }

    pub async fn start_focus(&self, task: &FocusTask) -> Option<Event> {
        self.command(|engine| engine.start_focus(task)).await
    }

    pub async fn start_break(&self, id: &TaskId) -> Option<Event> {
        self.command(|engine| engine.start_break(id)).await
    }

    pub async fn start_next_cycle(&self, id: &TaskId) -> Option<Event> {
        self.command(|engine| engine.start_next_cycle(id)).await
    }

    pub async fn stop(&self, id: &TaskId) -> Option<Event> {
        self.command(|engine| engine.stop(id)).await
    }

    pub async fn resume(&self, id: &TaskId) -> Option<Event> {
        self.command(|engine| engine.resume(id)).await
    }

    pub async fn reset(&self, id: &TaskId) -> Option<Event> {
        self.command(|engine| engine.reset(id)).await
    }

    pub async fn force_restart(&self, id: &TaskId) -> Option<Event> {
        self.command(|engine| engine.force_restart(id)).await
    }

    /// Evaluate every subscribed task at the engine clock's current time and
    /// dispatch the resulting effects. Returns the phase-completion events.
    pub async fn tick(&self) -> Vec<Event> {
        let expiries = {
            let mut engine = self.engine.lock().await;
            let now = engine.clock().now_ms();
            let expiries = engine.tick_all(now);
            // Publish under the lock so a later command cannot be overwritten.
            for expiry in &expiries {
                let _ = self.events.send(expiry.event.clone());
            }
            self.snapshots.send_replace(engine.snapshots());
            expiries
        };
        // Collaborators run outside the lock.
        let mut events = Vec::with_capacity(expiries.len());
        for expiry in expiries {
            self.collaborators.dispatch(&expiry.effects);
            events.push(expiry.event);
        }
        events
    }

    /// Cancel every subscription; used on teardown.
    pub async fn shutdown(&self) -> Option<Event> {
        self.command(|engine| engine.shutdown()).await
    }

    async fn command<F>(&self, f: F) -> Option<Event>
    where
        F: FnOnce(&mut IntervalEngine<C>) -> Option<Event>,
    {
        let mut engine = self.engine.lock().await;
        let event = f(&mut *engine);
        if let Some(event) = &event {
            let _ = self.events.send(event.clone());
            self.snapshots.send_replace(engine.snapshots());
        }
        event
    }
}

/// Drive `handle.tick()` every `period` until `shutdown` flips to true or its
/// sender is dropped, then cancel every remaining subscription.
///
/// Missed ticks are skipped rather than replayed: each task measures elapsed
/// time from its own start timestamp, so one late tick resolves everything.
pub async fn run_ticker<C: Clock>(
    handle: Arc<EngineHandle<C>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(period_ms = period.as_millis() as u64, "ticker started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let events = handle.tick().await;
                if !events.is_empty() {
                    debug!(count = events.len(), "tick produced phase completions");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    handle.shutdown().await;
    info!("ticker stopped");
}
