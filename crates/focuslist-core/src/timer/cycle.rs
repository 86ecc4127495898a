use serde::{Deserialize, Serialize};

/// Minutes of declared task duration covered by one focus/break cycle.
pub const MINUTES_PER_CYCLE: u32 = 30;

pub const DEFAULT_WORK_MINUTES: u64 = 25;
pub const DEFAULT_REST_MINUTES: u64 = 5;

/// Stage of a task's cycle sequence.
///
/// `RestReady` and `NextReady` are waiting states: the countdown has finished
/// and the engine holds until the user issues the next start command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Work,
    Rest,
    RestReady,
    NextReady,
    Done,
}

impl Phase {
    /// Short status label shown next to a task.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Work => "Focussing",
            Phase::Rest => "Resting",
            Phase::RestReady => "Cycle Done!",
            Phase::NextReady => "Ready for Next",
            Phase::Done => "All Done",
        }
    }

    /// Phases that carry a live countdown.
    pub fn is_timed(&self) -> bool {
        matches!(self, Phase::Work | Phase::Rest)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Work => "work",
            Phase::Rest => "rest",
            Phase::RestReady => "restReady",
            Phase::NextReady => "nextReady",
            Phase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Engine-wide countdown lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    pub work_ms: u64,
    pub rest_ms: u64,
}

impl CycleConfig {
    /// Build from minute values.
    ///
    /// Uses saturating arithmetic to prevent overflow with large values.
    pub fn from_minutes(work_min: u64, rest_min: u64) -> Self {
        Self {
            work_ms: minutes_to_ms(work_min),
            rest_ms: minutes_to_ms(rest_min),
        }
    }
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self::from_minutes(DEFAULT_WORK_MINUTES, DEFAULT_REST_MINUTES)
    }
}

fn minutes_to_ms(min: u64) -> u64 {
    min.saturating_mul(60).saturating_mul(1000)
}

/// Cycle plan derived once when focus starts on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSpec {
    pub total_cycles: u32,
}

impl CycleSpec {
    /// Derive the cycle count from a declared duration in minutes.
    ///
    /// Missing, negative and non-finite durations count as zero minutes, which
    /// still yields a single cycle.
    pub fn for_minutes(minutes: Option<f64>) -> Self {
        let minutes = minutes.filter(|m| m.is_finite() && *m > 0.0).unwrap_or(0.0);
        let cycles = (minutes / f64::from(MINUTES_PER_CYCLE)).ceil();
        // `as` saturates at u32::MAX for absurdly long tasks.
        let total_cycles = (cycles as u32).max(1);
        Self { total_cycles }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_count_rounds_up_per_half_hour() {
        assert_eq!(CycleSpec::for_minutes(Some(30.0)).total_cycles, 1);
        assert_eq!(CycleSpec::for_minutes(Some(31.0)).total_cycles, 2);
        assert_eq!(CycleSpec::for_minutes(Some(45.0)).total_cycles, 2);
        assert_eq!(CycleSpec::for_minutes(Some(90.0)).total_cycles, 3);
    }

    #[test]
    fn malformed_duration_yields_one_cycle() {
        assert_eq!(CycleSpec::for_minutes(None).total_cycles, 1);
        assert_eq!(CycleSpec::for_minutes(Some(0.0)).total_cycles, 1);
        assert_eq!(CycleSpec::for_minutes(Some(-60.0)).total_cycles, 1);
        assert_eq!(CycleSpec::for_minutes(Some(f64::NAN)).total_cycles, 1);
        assert_eq!(CycleSpec::for_minutes(Some(f64::INFINITY)).total_cycles, 1);
    }

    #[test]
    fn default_config_is_25_and_5() {
        let cfg = CycleConfig::default();
        assert_eq!(cfg.work_ms, 25 * 60 * 1000);
        assert_eq!(cfg.rest_ms, 5 * 60 * 1000);
    }

    #[test]
    fn phase_serializes_camel_case() {
        let json = serde_json::to_string(&Phase::RestReady).unwrap();
        assert_eq!(json, "\"restReady\"");
        assert_eq!(Phase::NextReady.to_string(), "nextReady");
    }
}
