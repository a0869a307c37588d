// PulseWatch - Scripted Workout Trigger
//
// Stands in for the wearer starting a workout: flips WORKOUT on once after a
// fixed delay. The console can toggle it afterwards.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use crate::state::StateRegister;
use crate::tasks::sleep_for;

pub fn workout_demo_task(state: Arc<StateRegister>, shutdown: Arc<AtomicBool>, delay: Duration) {
    if sleep_for(&shutdown, delay) {
        state.set_workout(true);
        log::warn!("Workout mode activated!");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn sets_workout_after_delay() {
        let state = Arc::new(StateRegister::new());
        workout_demo_task(Arc::clone(&state), Arc::new(AtomicBool::new(false)), Duration::from_millis(10));
        assert!(state.workout_active());
    }

    #[test]
    fn shutdown_before_delay_leaves_mode_alone() {
        let state = Arc::new(StateRegister::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        shutdown.store(true, Ordering::SeqCst);
        workout_demo_task(Arc::clone(&state), shutdown, Duration::from_secs(10));
        assert!(!state.workout_active());
    }
}
