//! Collaborators the engine's effects are delivered to.
//!
//! The engine never calls these directly; it returns [`Effect`]s and the
//! caller hands them to [`Collaborators::dispatch`]. None of the collaborators
//! can influence engine state, so their failures are logged and dropped.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::error::{CoreError, Result};
use crate::events::Effect;
use crate::task::TaskId;

/// Fires user-visible alerts. Best-effort, fire-and-forget.
pub trait Notifier: Send + Sync {
    fn fire(&self, title: &str, body: &str);
}

/// Holds task records; receives completion updates.
pub trait TaskStore: Send + Sync {
    /// Mark the task completed. Must tolerate repeated calls.
    fn mark_completed(&self, task_id: &TaskId);
}

/// Opens the companion view after a phase completes.
pub trait CompanionOpener: Send + Sync {
    fn open(&self) -> Result<()>;
}

/// Notifier that drops every alert (notifications disabled or unsupported).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn fire(&self, _title: &str, _body: &str) {}
}

/// Notifier that writes alerts to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn fire(&self, title: &str, body: &str) {
        info!(target: "focuslist::notify", %title, %body, "notification");
    }
}

/// Task store that only remembers which ids were completed.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    completed: Mutex<BTreeSet<TaskId>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_completed(&self, task_id: &TaskId) -> bool {
        self.completed
            .lock()
            .map(|set| set.contains(task_id))
            .unwrap_or(false)
    }

    pub fn completed(&self) -> Vec<TaskId> {
        self.completed
            .lock()
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl TaskStore for MemoryTaskStore {
    fn mark_completed(&self, task_id: &TaskId) {
        match self.completed.lock() {
            Ok(mut set) => {
                set.insert(task_id.clone());
            }
            Err(e) => warn!(%task_id, "task store lock poisoned: {e}"),
        }
    }
}

/// Opener used when no companion view is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOpener;

impl CompanionOpener for NoopOpener {
    fn open(&self) -> Result<()> {
        Ok(())
    }
}

/// Opens a URL in the user's default browser.
#[derive(Debug, Clone)]
pub struct UrlOpener {
    url: String,
}

impl UrlOpener {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CompanionOpener for UrlOpener {
    fn open(&self) -> Result<()> {
        open::that(&self.url).map_err(|e| CoreError::Collaborator {
            collaborator: "companion",
            message: format!("could not open {}", self.url),
            source: Some(Box::new(e)),
        })
    }
}

/// The three collaborators bundled for effect dispatch.
#[derive(Clone)]
pub struct Collaborators {
    pub notifier: Arc<dyn Notifier>,
    pub task_store: Arc<dyn TaskStore>,
    pub opener: Arc<dyn CompanionOpener>,
}

impl Collaborators {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        task_store: Arc<dyn TaskStore>,
        opener: Arc<dyn CompanionOpener>,
    ) -> Self {
        Self {
            notifier,
            task_store,
            opener,
        }
    }

    /// Deliver effects in order.
    pub fn dispatch(&self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::Notify { title, body, .. } => self.notifier.fire(title, body),
                Effect::OpenCompanion => {
                    if let Err(e) = self.opener.open() {
                        warn!("companion view: {e}");
                    }
                }
                Effect::MarkCompleted { task_id } => self.task_store.mark_completed(task_id),
            }
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new(
            Arc::new(NoopNotifier),
            Arc::new(MemoryTaskStore::new()),
            Arc::new(NoopOpener),
        )
    }
}
