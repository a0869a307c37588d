// PulseWatch - Step Counter
//
// Shared pedometer state. The step task is the only incrementer; the monitor
// and the console may read it or reset it to zero.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Timing, STEP_MILESTONE};
use crate::state::{StateBits, StateRegister, WORKOUT};

#[derive(Debug)]
pub struct StepCounter {
    count: AtomicU32,
    state: Arc<StateRegister>,
}

impl StepCounter {
    pub fn new(state: Arc<StateRegister>) -> Self {
        Self {
            count: AtomicU32::new(0),
            state,
        }
    }

    /// Record one step. Raises `STEP_ALERT` whenever the new total is a
    /// multiple of [`STEP_MILESTONE`], and returns the new total.
    pub fn step(&self) -> u32 {
        let steps = self.count.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        if steps % STEP_MILESTONE == 0 {
            self.state.raise_step_alert();
            log::warn!("Step milestone: {}", steps);
        }
        steps
    }

    pub fn get_steps(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    /// Zero the counter. A pending `STEP_ALERT` is left for the monitor.
    pub fn reset_steps(&self) {
        self.count.store(0, Ordering::SeqCst);
        log::info!("Step counter reset");
    }

    pub fn state(&self) -> &Arc<StateRegister> {
        &self.state
    }
}

/// Delay before the next step, picked from a register snapshot.
pub fn step_period(bits: StateBits, timing: &Timing) -> Duration {
    if bits & WORKOUT != 0 {
        timing.step_workout
    } else {
        timing.step_rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::STEP_ALERT;

    fn counter() -> StepCounter {
        StepCounter::new(Arc::new(StateRegister::new()))
    }

    #[test]
    fn step_increments_by_one() {
        let c = counter();
        assert_eq!(c.step(), 1);
        assert_eq!(c.step(), 2);
        assert_eq!(c.get_steps(), 2);
    }

    #[test]
    fn alert_only_on_multiples_of_ten() {
        let c = counter();
        for _ in 0..9 {
            c.step();
            assert!(!c.state().step_alert_pending());
        }
        c.step();
        assert!(c.state().step_alert_pending());
    }

    #[test]
    fn hundred_steps_raise_ten_alerts_when_acknowledged() {
        let c = counter();
        let mut alerts = Vec::new();
        for _ in 0..100 {
            let steps = c.step();
            if c.state().take(STEP_ALERT) != 0 {
                alerts.push(steps);
            }
        }
        assert_eq!(c.get_steps(), 100);
        assert_eq!(alerts, (1..=10).map(|n| n * 10).collect::<Vec<_>>());
        assert!(!c.state().step_alert_pending());
    }

    #[test]
    fn unacknowledged_alerts_do_not_queue() {
        let c = counter();
        for _ in 0..30 {
            c.step();
        }
        assert_eq!(c.state().take(STEP_ALERT), STEP_ALERT);
        assert_eq!(c.state().take(STEP_ALERT), 0);
    }

    #[test]
    fn reset_zeroes_count_but_keeps_pending_alert() {
        let c = counter();
        for _ in 0..10 {
            c.step();
        }
        c.reset_steps();
        assert_eq!(c.get_steps(), 0);
        assert!(c.state().step_alert_pending());
        assert_eq!(c.step(), 1);
    }

    #[test]
    fn period_follows_workout_bit() {
        let timing = Timing::default();
        assert_eq!(step_period(0, &timing), Duration::from_millis(2000));
        assert_eq!(step_period(STEP_ALERT, &timing), Duration::from_millis(2000));
        assert_eq!(step_period(WORKOUT, &timing), Duration::from_millis(500));
    }
}
