use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::TaskId;
use crate::timer::Phase;

/// Every state change in the engine produces an Event.
/// The presentation layer renders them; nothing in the engine consumes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    FocusStarted {
        task_id: TaskId,
        cycle: u32,
        total_cycles: u32,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    BreakStarted {
        task_id: TaskId,
        cycle: u32,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    NextCycleStarted {
        task_id: TaskId,
        cycle: u32,
        total_cycles: u32,
        duration_ms: u64,
        at: DateTime<Utc>,
    },
    TimerStopped {
        task_id: TaskId,
        phase: Phase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        task_id: TaskId,
        phase: Phase,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// A countdown ran out and the task moved to a waiting or terminal phase.
    PhaseCompleted {
        task_id: TaskId,
        from: Phase,
        to: Phase,
        cycle: u32,
        total_cycles: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        task_id: TaskId,
        at: DateTime<Utc>,
    },
    TimerRestarted {
        task_id: TaskId,
        at: DateTime<Utc>,
    },
    EngineShutdown {
        cancelled_subscriptions: usize,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn task_id(&self) -> Option<&TaskId> {
        match self {
            Event::FocusStarted { task_id, .. }
            | Event::BreakStarted { task_id, .. }
            | Event::NextCycleStarted { task_id, .. }
            | Event::TimerStopped { task_id, .. }
            | Event::TimerResumed { task_id, .. }
            | Event::PhaseCompleted { task_id, .. }
            | Event::TimerReset { task_id, .. }
            | Event::TimerRestarted { task_id, .. } => Some(task_id),
            Event::EngineShutdown { .. } => None,
        }
    }
}

/// Side effect requested by a transition, dispatched by the caller in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    Notify {
        task_id: TaskId,
        title: String,
        body: String,
    },
    OpenCompanion,
    MarkCompleted {
        task_id: TaskId,
    },
}

pub const FOCUS_COMPLETE_TITLE: &str = "🎯 Focus Session Complete!";
pub const FOCUS_COMPLETE_FIRST_BODY: &str = "Time for a break. Great work!";
pub const FOCUS_COMPLETE_LATER_BODY: &str = "Cycle finished!";
pub const BREAK_OVER_TITLE: &str = "☕ Break Time Over!";
pub const BREAK_OVER_BODY: &str = "Ready to focus again?";
pub const ALL_COMPLETE_TITLE: &str = "🎉 All Cycles Complete!";
pub const ALL_COMPLETE_BODY: &str = "Great job! Task completed successfully.";

impl Effect {
    pub(crate) fn notify(task_id: &TaskId, title: &str, body: &str) -> Self {
        Effect::Notify {
            task_id: task_id.clone(),
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}
