//! # Focuslist Core Library
//!
//! This library provides the per-task focus/break interval engine behind the
//! Focuslist task list. Every task the user starts gets its own cycle
//! sequence (focus, break, next focus, ... done), and any number of tasks can
//! count down at once.
//!
//! ## Architecture
//!
//! - **Interval Engine**: A wall-clock-based state machine keyed by task id
//!   that requires the caller to periodically invoke `tick_all()`
//! - **Runtime**: A tokio ticker and single-writer handle that publishes
//!   read-only snapshots
//! - **Ports**: Notifier, task store and companion-view collaborators that
//!   receive the effects of phase completions
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`IntervalEngine`]: Core timer state machine
//! - [`EngineHandle`]: Serialized async access plus snapshot subscription
//! - [`Collaborators`]: Effect dispatch to external collaborators
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod ports;
pub mod runtime;
pub mod storage;
pub mod task;
pub mod timer;

pub use error::{ConfigError, CoreError};
pub use events::{Effect, Event};
pub use ports::{
    Collaborators, CompanionOpener, LogNotifier, MemoryTaskStore, NoopNotifier, NoopOpener,
    Notifier, TaskStore, UrlOpener,
};
pub use runtime::{run_ticker, EngineHandle};
pub use storage::Config;
pub use task::{FocusTask, TaskId};
pub use timer::{
    ms_to_clock_string, Clock, CycleConfig, CycleSpec, Expiry, IntervalEngine, ManualClock, Phase,
    SystemClock, TimerSnapshot, TimerState,
};
