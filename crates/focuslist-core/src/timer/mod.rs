mod clock;
mod cycle;
mod engine;

pub use clock::{ms_to_clock_string, ms_to_clock_string_f64, Clock, ManualClock, SystemClock};
pub use cycle::{
    CycleConfig, CycleSpec, Phase, DEFAULT_REST_MINUTES, DEFAULT_WORK_MINUTES, MINUTES_PER_CYCLE,
};
pub use engine::{Expiry, IntervalEngine, Subscription, TimerSnapshot, TimerState};
