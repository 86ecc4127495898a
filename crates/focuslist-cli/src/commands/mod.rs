pub mod config;
pub mod session;

use focuslist_core::{CycleSpec, FocusTask};

/// `"<minutes> min → <n> cycles"`, as shown next to a task that has not started.
pub fn cycles_line(raw_minutes: &str) -> String {
    let spec = CycleSpec::for_minutes(FocusTask::parse_duration(raw_minutes));
    format!("{} min → {} cycles", raw_minutes.trim(), spec.total_cycles)
}
