//! Interval engine implementation.
//!
//! The engine is a wall-clock-based state machine keyed by task id. It does
//! not use internal threads - the caller drives it by calling `advance()` (or
//! `tick_all()`) periodically, nominally once per second.
//!
//! ## State Transitions
//!
//! ```text
//! (absent) -start_focus-> Work -expire-> RestReady -start_break-> Rest
//!                          ^                                        |
//!                          +---- start_next_cycle ---- NextReady <--+ expire
//!                                                                   |
//!                                          Done <-- last cycle -----+
//! ```
//!
//! A work expiry always lands in `RestReady`, even on the final cycle; a task
//! only reaches `Done` once its last break has run out.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = IntervalEngine::new(CycleConfig::default());
//! engine.start_focus(&task);
//! // In a loop:
//! for expiry in engine.tick_all(now_ms) {
//!     collaborators.dispatch(&expiry.effects);
//! }
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::clock::{ms_to_clock_string, Clock, SystemClock};
use super::cycle::{CycleConfig, CycleSpec, Phase};
use crate::events::{
    Effect, Event, ALL_COMPLETE_BODY, ALL_COMPLETE_TITLE, BREAK_OVER_BODY, BREAK_OVER_TITLE,
    FOCUS_COMPLETE_FIRST_BODY, FOCUS_COMPLETE_LATER_BODY, FOCUS_COMPLETE_TITLE,
};
use crate::task::{FocusTask, TaskId};

/// Timer state of a single task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub phase: Phase,
    pub running: bool,
    pub current_cycle: u32,
    pub total_cycles: u32,
    /// Timestamp (ms since epoch) the current countdown is anchored to.
    pub start_time_ms: u64,
    /// Length of the current countdown in milliseconds.
    pub duration_ms: u64,
    /// Cached countdown value as of the last evaluation.
    pub remaining_ms: u64,
}

impl TimerState {
    /// Remaining countdown at `now`, measured from the absolute start time.
    pub fn remaining_at(&self, now_ms: u64) -> u64 {
        let elapsed = now_ms.saturating_sub(self.start_time_ms);
        self.duration_ms.saturating_sub(elapsed)
    }

    fn begin_countdown(&mut self, phase: Phase, duration_ms: u64, now_ms: u64) {
        self.phase = phase;
        self.running = true;
        self.start_time_ms = now_ms;
        self.duration_ms = duration_ms;
        self.remaining_ms = duration_ms;
    }
}

/// Handle of the tick subscription held by a running task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

#[derive(Debug)]
struct TimerSlot {
    state: TimerState,
    /// Present exactly when `state.running` is true.
    subscription: Option<Subscription>,
}

/// Result of a countdown running out.
#[derive(Debug, Clone, PartialEq)]
pub struct Expiry {
    pub event: Event,
    /// Side effects to dispatch, in order.
    pub effects: Vec<Effect>,
}

/// Read-only view of one task's timer, for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub task_id: TaskId,
    pub phase: Phase,
    pub label: String,
    pub running: bool,
    pub current_cycle: u32,
    pub total_cycles: u32,
    pub remaining_ms: u64,
    pub remaining_clock: String,
}

/// Per-task interval engine.
///
/// Operates on wall-clock timestamps -- no internal thread. Every task id owns
/// at most one slot, and every running slot owns exactly one subscription.
#[derive(Debug)]
pub struct IntervalEngine<C: Clock = SystemClock> {
    config: CycleConfig,
    clock: C,
    slots: HashMap<TaskId, TimerSlot>,
    next_subscription: u64,
}

impl IntervalEngine<SystemClock> {
    pub fn new(config: CycleConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> IntervalEngine<C> {
    pub fn with_clock(config: CycleConfig, clock: C) -> Self {
        Self {
            config,
            clock,
            slots: HashMap::new(),
            next_subscription: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn config(&self) -> CycleConfig {
        self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn state(&self, id: &TaskId) -> Option<&TimerState> {
        self.slots.get(id).map(|slot| &slot.state)
    }

    pub fn is_tracked(&self, id: &TaskId) -> bool {
        self.slots.contains_key(id)
    }

    pub fn tracked_count(&self) -> usize {
        self.slots.len()
    }

    /// Number of live tick subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| slot.subscription.is_some())
            .count()
    }

    pub fn subscription(&self, id: &TaskId) -> Option<Subscription> {
        self.slots.get(id).and_then(|slot| slot.subscription)
    }

    /// Ids holding a subscription, sorted for deterministic evaluation.
    pub fn subscribed_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.subscription.is_some())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn snapshot(&self, id: &TaskId) -> Option<TimerSnapshot> {
        let slot = self.slots.get(id)?;
        let state = &slot.state;
        let remaining_ms = if state.running {
            state.remaining_at(self.clock.now_ms())
        } else {
            state.remaining_ms
        };
        Some(TimerSnapshot {
            task_id: id.clone(),
            phase: state.phase,
            label: state.phase.label().to_string(),
            running: state.running,
            current_cycle: state.current_cycle,
            total_cycles: state.total_cycles,
            remaining_ms,
            remaining_clock: ms_to_clock_string(remaining_ms.min(i64::MAX as u64) as i64),
        })
    }

    /// Snapshots of every tracked task, ordered by id.
    pub fn snapshots(&self) -> Vec<TimerSnapshot> {
        let mut ids: Vec<&TaskId> = self.slots.keys().collect();
        ids.sort();
        ids.into_iter().filter_map(|id| self.snapshot(id)).collect()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start the first focus cycle, replacing any existing timer for the task.
    pub fn start_focus(&mut self, task: &FocusTask) -> Option<Event> {
        let now = self.clock.now_ms();
        let spec = CycleSpec::for_minutes(task.duration_minutes);
        let work_ms = self.config.work_ms;

        // Overwriting drops the old slot; its subscription goes first.
        self.cancel(&task.id);
        let mut state = TimerState {
            phase: Phase::Work,
            running: false,
            current_cycle: 1,
            total_cycles: spec.total_cycles,
            start_time_ms: now,
            duration_ms: work_ms,
            remaining_ms: work_ms,
        };
        state.begin_countdown(Phase::Work, work_ms, now);
        self.slots.insert(
            task.id.clone(),
            TimerSlot {
                state,
                subscription: None,
            },
        );
        self.subscribe(&task.id);

        info!(
            task_id = %task.id,
            total_cycles = spec.total_cycles,
            "focus started"
        );
        Some(Event::FocusStarted {
            task_id: task.id.clone(),
            cycle: 1,
            total_cycles: spec.total_cycles,
            duration_ms: work_ms,
            at: to_datetime(now),
        })
    }

    /// Start the break that follows a finished focus cycle.
    pub fn start_break(&mut self, id: &TaskId) -> Option<Event> {
        let now = self.clock.now_ms();
        let rest_ms = self.config.rest_ms;
        let slot = self.slots.get_mut(id)?;
        if slot.state.phase != Phase::RestReady {
            debug!(task_id = %id, phase = %slot.state.phase, "start_break ignored");
            return None;
        }
        slot.state.begin_countdown(Phase::Rest, rest_ms, now);
        let cycle = slot.state.current_cycle;
        self.subscribe(id);

        info!(task_id = %id, cycle, "break started");
        Some(Event::BreakStarted {
            task_id: id.clone(),
            cycle,
            duration_ms: rest_ms,
            at: to_datetime(now),
        })
    }

    /// Start the next focus cycle after a finished break.
    pub fn start_next_cycle(&mut self, id: &TaskId) -> Option<Event> {
        let now = self.clock.now_ms();
        let work_ms = self.config.work_ms;
        let slot = self.slots.get_mut(id)?;
        if slot.state.phase != Phase::NextReady {
            debug!(task_id = %id, phase = %slot.state.phase, "start_next_cycle ignored");
            return None;
        }
        let state = &mut slot.state;
        state.current_cycle = (state.current_cycle + 1).min(state.total_cycles);
        state.begin_countdown(Phase::Work, work_ms, now);
        let (cycle, total_cycles) = (state.current_cycle, state.total_cycles);
        self.subscribe(id);

        info!(task_id = %id, cycle, total_cycles, "next cycle started");
        Some(Event::NextCycleStarted {
            task_id: id.clone(),
            cycle,
            total_cycles,
            duration_ms: work_ms,
            at: to_datetime(now),
        })
    }

    /// Freeze a running countdown. The phase and cycle are kept.
    pub fn stop(&mut self, id: &TaskId) -> Option<Event> {
        let now = self.clock.now_ms();
        let slot = self.slots.get_mut(id)?;
        if !slot.state.running {
            return None;
        }
        // Flush elapsed time first.
        slot.state.remaining_ms = slot.state.remaining_at(now);
        slot.state.running = false;
        let phase = slot.state.phase;
        let remaining_ms = slot.state.remaining_ms;
        self.cancel(id);

        info!(task_id = %id, %phase, remaining_ms, "timer stopped");
        Some(Event::TimerStopped {
            task_id: id.clone(),
            phase,
            remaining_ms,
            at: to_datetime(now),
        })
    }

    /// Continue a stopped countdown from where it was frozen.
    pub fn resume(&mut self, id: &TaskId) -> Option<Event> {
        let now = self.clock.now_ms();
        let slot = self.slots.get_mut(id)?;
        let state = &mut slot.state;
        if state.running || !state.phase.is_timed() || state.remaining_ms == 0 {
            return None;
        }
        // Re-anchor so that `remaining_at(now)` equals the frozen value.
        let consumed = state.duration_ms.saturating_sub(state.remaining_ms);
        state.start_time_ms = now.saturating_sub(consumed);
        state.running = true;
        let phase = state.phase;
        let remaining_ms = state.remaining_ms;
        self.subscribe(id);

        info!(task_id = %id, %phase, remaining_ms, "timer resumed");
        Some(Event::TimerResumed {
            task_id: id.clone(),
            phase,
            remaining_ms,
            at: to_datetime(now),
        })
    }

    /// Forget the task's timer entirely.
    pub fn reset(&mut self, id: &TaskId) -> Option<Event> {
        self.remove(id)?;
        info!(task_id = %id, "timer reset");
        Some(Event::TimerReset {
            task_id: id.clone(),
            at: to_datetime(self.clock.now_ms()),
        })
    }

    /// Same effect as [`reset`](Self::reset); the next `start_focus` begins at cycle 1.
    pub fn force_restart(&mut self, id: &TaskId) -> Option<Event> {
        self.remove(id)?;
        info!(task_id = %id, "timer restarted");
        Some(Event::TimerRestarted {
            task_id: id.clone(),
            at: to_datetime(self.clock.now_ms()),
        })
    }

    /// Evaluate one tick for `id`.
    ///
    /// Returns `Some(Expiry)` only when the countdown ran out and the task
    /// changed phase; otherwise just refreshes the cached remaining time.
    pub fn advance(&mut self, id: &TaskId, now_ms: u64) -> Option<Expiry> {
        let slot = self.slots.get_mut(id)?;
        if !slot.state.running {
            return None;
        }
        let remaining = slot.state.remaining_at(now_ms);
        if remaining > 0 {
            slot.state.remaining_ms = remaining;
            return None;
        }

        let state = &mut slot.state;
        let from = state.phase;
        let mut effects = Vec::new();
        let to = match from {
            Phase::Work => {
                let body = if state.current_cycle <= 1 {
                    FOCUS_COMPLETE_FIRST_BODY
                } else {
                    FOCUS_COMPLETE_LATER_BODY
                };
                effects.push(Effect::notify(id, FOCUS_COMPLETE_TITLE, body));
                effects.push(Effect::OpenCompanion);
                Phase::RestReady
            }
            Phase::Rest => {
                effects.push(Effect::notify(id, BREAK_OVER_TITLE, BREAK_OVER_BODY));
                effects.push(Effect::OpenCompanion);
                if state.current_cycle + 1 > state.total_cycles {
                    effects.push(Effect::notify(id, ALL_COMPLETE_TITLE, ALL_COMPLETE_BODY));
                    effects.push(Effect::MarkCompleted {
                        task_id: id.clone(),
                    });
                    Phase::Done
                } else {
                    Phase::NextReady
                }
            }
            // Waiting phases never hold a subscription; drop a stray one.
            Phase::RestReady | Phase::NextReady | Phase::Done => {
                state.running = false;
                self.cancel(id);
                return None;
            }
        };
        state.phase = to;
        state.running = false;
        state.remaining_ms = 0;
        let (cycle, total_cycles) = (state.current_cycle, state.total_cycles);
        self.cancel(id);

        info!(task_id = %id, %from, %to, cycle, total_cycles, "phase completed");
        Some(Expiry {
            event: Event::PhaseCompleted {
                task_id: id.clone(),
                from,
                to,
                cycle,
                total_cycles,
                at: to_datetime(now_ms),
            },
            effects,
        })
    }

    /// Evaluate `advance` for `id` at the engine clock's current time.
    pub fn tick(&mut self, id: &TaskId) -> Option<Expiry> {
        let now = self.clock.now_ms();
        self.advance(id, now)
    }

    /// Evaluate every subscribed task independently at `now_ms`.
    pub fn tick_all(&mut self, now_ms: u64) -> Vec<Expiry> {
        self.subscribed_ids()
            .iter()
            .filter_map(|id| self.advance(id, now_ms))
            .collect()
    }

    /// Cancel every live subscription. Entries are kept, frozen.
    pub fn shutdown(&mut self) -> Option<Event> {
        let now = self.clock.now_ms();
        let mut cancelled = 0;
        for slot in self.slots.values_mut() {
            if slot.subscription.take().is_some() {
                cancelled += 1;
            }
            if slot.state.running {
                slot.state.remaining_ms = slot.state.remaining_at(now);
                slot.state.running = false;
            }
        }
        info!(cancelled, "interval engine shut down");
        Some(Event::EngineShutdown {
            cancelled_subscriptions: cancelled,
            at: to_datetime(now),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Replace the task's subscription with a fresh one.
    fn subscribe(&mut self, id: &TaskId) {
        self.cancel(id);
        self.next_subscription += 1;
        let sub = Subscription(self.next_subscription);
        if let Some(slot) = self.slots.get_mut(id) {
            debug!(task_id = %id, subscription = sub.0, "tick subscription created");
            slot.subscription = Some(sub);
        }
    }

    fn cancel(&mut self, id: &TaskId) {
        if let Some(sub) = self.slots.get_mut(id).and_then(|slot| slot.subscription.take()) {
            debug!(task_id = %id, subscription = sub.0, "tick subscription cancelled");
        }
    }

    fn remove(&mut self, id: &TaskId) -> Option<TimerSlot> {
        self.cancel(id);
        self.slots.remove(id)
    }
}

fn to_datetime(ms: u64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms.min(i64::MAX as u64) as i64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::clock::ManualClock;

    const WORK: u64 = 25 * 60 * 1000;
    const REST: u64 = 5 * 60 * 1000;

    fn engine() -> (IntervalEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        (
            IntervalEngine::with_clock(CycleConfig::default(), clock.clone()),
            clock,
        )
    }

    fn id(s: &str) -> TaskId {
        TaskId::new(s)
    }

    #[test]
    fn start_focus_on_fresh_task() {
        let (mut engine, _) = engine();
        let event = engine.start_focus(&FocusTask::new("a", Some(60.0)));
        assert!(matches!(event, Some(Event::FocusStarted { cycle: 1, total_cycles: 2, .. })));

        let state = engine.state(&id("a")).unwrap();
        assert_eq!(state.phase, Phase::Work);
        assert!(state.running);
        assert_eq!(state.current_cycle, 1);
        assert_eq!(state.remaining_ms, WORK);
        assert_eq!(engine.active_subscriptions(), 1);
    }

    #[test]
    fn advance_before_expiry_only_updates_remaining() {
        let (mut engine, clock) = engine();
        engine.start_focus(&FocusTask::new("a", Some(30.0)));
        let start = clock.now_ms();

        assert!(engine.advance(&id("a"), start + 61_000).is_none());
        let state = engine.state(&id("a")).unwrap();
        assert_eq!(state.phase, Phase::Work);
        assert_eq!(state.remaining_ms, WORK - 61_000);
    }

    #[test]
    fn work_expiry_goes_to_rest_ready_even_on_last_cycle() {
        let (mut engine, clock) = engine();
        engine.start_focus(&FocusTask::new("a", Some(10.0)));
        let expiry = engine.advance(&id("a"), clock.now_ms() + WORK).unwrap();

        assert_eq!(
            expiry.effects,
            vec![
                Effect::notify(&id("a"), FOCUS_COMPLETE_TITLE, FOCUS_COMPLETE_FIRST_BODY),
                Effect::OpenCompanion,
            ]
        );
        let state = engine.state(&id("a")).unwrap();
        assert_eq!(state.phase, Phase::RestReady);
        assert!(!state.running);
        assert_eq!(state.remaining_ms, 0);
        assert_eq!(engine.active_subscriptions(), 0);
    }

    #[test]
    fn expiry_fires_once() {
        let (mut engine, clock) = engine();
        engine.start_focus(&FocusTask::new("a", None));
        let end = clock.now_ms() + WORK;
        assert!(engine.advance(&id("a"), end).is_some());
        assert!(engine.advance(&id("a"), end + 1_000).is_none());
    }

    #[test]
    fn rest_expiry_on_last_cycle_completes_task() {
        let (mut engine, clock) = engine();
        engine.start_focus(&FocusTask::new("a", Some(30.0)));
        clock.advance(WORK);
        engine.tick(&id("a"));
        engine.start_break(&id("a")).unwrap();
        clock.advance(REST);
        let expiry = engine.tick(&id("a")).unwrap();

        assert_eq!(engine.state(&id("a")).unwrap().phase, Phase::Done);
        assert_eq!(
            expiry.effects.last(),
            Some(&Effect::MarkCompleted { task_id: id("a") })
        );
        assert_eq!(expiry.effects.len(), 4);
    }

    #[test]
    fn start_break_outside_rest_ready_is_ignored() {
        let (mut engine, _) = engine();
        assert!(engine.start_break(&id("missing")).is_none());
        engine.start_focus(&FocusTask::new("a", Some(30.0)));
        assert!(engine.start_break(&id("a")).is_none());
        assert_eq!(engine.state(&id("a")).unwrap().phase, Phase::Work);
        assert!(engine.start_next_cycle(&id("a")).is_none());
    }

    #[test]
    fn stop_freezes_and_resume_continues() {
        let (mut engine, clock) = engine();
        engine.start_focus(&FocusTask::new("a", Some(30.0)));
        clock.advance(60_000);
        let stopped = engine.stop(&id("a"));
        assert!(matches!(stopped, Some(Event::TimerStopped { remaining_ms, .. }) if remaining_ms == WORK - 60_000));
        assert!(engine.stop(&id("a")).is_none());

        // Time passing while stopped does not count.
        clock.advance(10 * 60_000);
        assert!(engine.advance(&id("a"), clock.now_ms() + WORK).is_none());
        assert_eq!(engine.state(&id("a")).unwrap().remaining_ms, WORK - 60_000);

        engine.resume(&id("a")).unwrap();
        assert_eq!(engine.snapshot(&id("a")).unwrap().remaining_ms, WORK - 60_000);
        clock.advance(WORK - 60_000);
        let expiry = engine.tick(&id("a")).unwrap();
        assert!(matches!(expiry.event, Event::PhaseCompleted { to: Phase::RestReady, .. }));
    }

    #[test]
    fn resume_rejects_waiting_phases() {
        let (mut engine, clock) = engine();
        engine.start_focus(&FocusTask::new("a", Some(30.0)));
        clock.advance(WORK);
        engine.tick(&id("a"));
        assert!(engine.resume(&id("a")).is_none());
        assert!(engine.resume(&id("missing")).is_none());
    }

    #[test]
    fn resume_rejects_exhausted_countdown() {
        let (mut engine, clock) = engine();
        engine.start_focus(&FocusTask::new("a", Some(30.0)));
        // Stopped after the countdown ran out but before a tick saw it.
        clock.advance(WORK + 5_000);
        let stopped = engine.stop(&id("a"));
        assert!(matches!(stopped, Some(Event::TimerStopped { remaining_ms: 0, .. })));

        assert!(engine.resume(&id("a")).is_none());
        let state = engine.state(&id("a")).unwrap();
        assert!(!state.running);
        assert_eq!(state.phase, Phase::Work);
        assert_eq!(engine.active_subscriptions(), 0);
        assert!(engine.tick(&id("a")).is_none());
    }

    #[test]
    fn reset_and_restart_remove_entry() {
        let (mut engine, _) = engine();
        engine.start_focus(&FocusTask::new("a", Some(30.0)));
        engine.start_focus(&FocusTask::new("b", Some(30.0)));
        assert!(matches!(engine.reset(&id("a")), Some(Event::TimerReset { .. })));
        assert!(matches!(engine.force_restart(&id("b")), Some(Event::TimerRestarted { .. })));
        assert!(!engine.is_tracked(&id("a")));
        assert!(!engine.is_tracked(&id("b")));
        assert_eq!(engine.active_subscriptions(), 0);
        assert!(engine.reset(&id("a")).is_none());
    }

    #[test]
    fn restarting_focus_keeps_single_subscription() {
        let (mut engine, _) = engine();
        let task = FocusTask::new("a", Some(90.0));
        engine.start_focus(&task);
        let first = engine.subscription(&id("a")).unwrap();
        engine.start_focus(&task);
        let second = engine.subscription(&id("a")).unwrap();
        assert_ne!(first, second);
        assert_eq!(engine.active_subscriptions(), 1);
    }

    #[test]
    fn shutdown_cancels_everything() {
        let (mut engine, _) = engine();
        engine.start_focus(&FocusTask::new("a", None));
        engine.start_focus(&FocusTask::new("b", None));
        let event = engine.shutdown();
        assert!(matches!(event, Some(Event::EngineShutdown { cancelled_subscriptions: 2, .. })));
        assert_eq!(engine.active_subscriptions(), 0);
        assert!(engine.snapshots().iter().all(|s| !s.running));
    }

    #[test]
    fn snapshot_reports_label_and_clock() {
        let (mut engine, clock) = engine();
        engine.start_focus(&FocusTask::new("a", Some(30.0)));
        clock.advance(65_000);
        let snap = engine.snapshot(&id("a")).unwrap();
        assert_eq!(snap.label, "Focussing");
        assert_eq!(snap.remaining_clock, "23:55");
        assert!(engine.snapshot(&id("zzz")).is_none());
    }
}
