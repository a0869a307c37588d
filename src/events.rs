// PulseWatch - Data Types & Monitor Events

use std::fmt;

// ---------------------------------------------------------------------------
// Heart-rate sample (one reading from the simulated sensor)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartRateSample {
    pub bpm: u16,
}

impl HeartRateSample {
    pub fn new(bpm: u16) -> Self {
        Self { bpm }
    }
}

// ---------------------------------------------------------------------------
// Monitor Events - what the display task emits each iteration
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorEvent {
    /// A sample was dequeued.
    HeartRate {
        bpm: u16,
        steps: u32,
        step_delta: u32,
        /// Above the high heart-rate threshold.
        high: bool,
    },
    /// `STEP_ALERT` was observed. `reset` is set when the ceiling was reached
    /// and the counter was zeroed as part of handling it.
    Milestone { steps: u32, reset: bool },
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::HeartRate { bpm, steps, step_delta, high } => {
                write!(f, "HR: {bpm} BPM | Steps: {steps} (+{step_delta})")?;
                if high {
                    write!(f, " | HIGH HEART RATE")?;
                }
                Ok(())
            }
            Self::Milestone { steps, reset: false } => write!(f, "Step milestone: {steps}"),
            Self::Milestone { steps, reset: true } => {
                write!(f, "Step milestone: {steps} - goal reached, counter reset")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heart_rate_line_flags_high_readings() {
        let ev = MonitorEvent::HeartRate { bpm: 131, steps: 12, step_delta: 2, high: true };
        assert_eq!(ev.to_string(), "HR: 131 BPM | Steps: 12 (+2) | HIGH HEART RATE");
    }

    #[test]
    fn milestone_line_mentions_reset() {
        let ev = MonitorEvent::Milestone { steps: 50, reset: true };
        assert!(ev.to_string().contains("counter reset"));
    }
}
