// PulseWatch - Step Simulation Task

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::Timing;
use crate::steps::{step_period, StepCounter};
use crate::tasks::sleep_for;

pub fn step_task(counter: Arc<StepCounter>, shutdown: Arc<AtomicBool>, timing: Timing) {
    log::info!("Step task started");

    loop {
        // Read once per step: a mode change applies from the next step on.
        let delay = step_period(counter.state().get(), &timing);

        counter.step();

        if !sleep_for(&shutdown, delay) {
            break;
        }
    }

    log::info!("Step task stopped at {} steps", counter.get_steps());
}
