// PulseWatch - Heart-Rate Task
//
// Simulated optical sensor: one BPM reading per period, pushed into the
// sample channel. A full channel blocks this task until the monitor drains it.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::channel::SampleSender;
use crate::config::*;
use crate::events::HeartRateSample;
use crate::state::StateRegister;
use crate::tasks::sleep_for;

/// Resting `[60, 100)`, workout `[80, 160)`.
pub fn draw_bpm<R: Rng + ?Sized>(workout: bool, rng: &mut R) -> u16 {
    let mut bpm = rng.gen_range(HR_REST_MIN..HR_REST_MAX);
    if workout {
        bpm += rng.gen_range(HR_WORKOUT_BOOST_MIN..HR_WORKOUT_BOOST_MAX);
    }
    bpm
}

pub fn heart_rate_task(
    state: Arc<StateRegister>,
    samples: SampleSender,
    shutdown: Arc<AtomicBool>,
    period: Duration,
) {
    log::info!("Heart-rate task started");

    let mut rng = rand::thread_rng();

    loop {
        let bpm = draw_bpm(state.workout_active(), &mut rng);

        if samples.push(HeartRateSample::new(bpm)).is_err() {
            log::warn!("Sample channel closed - exiting heart-rate task");
            return;
        }

        if !sleep_for(&shutdown, period) {
            break;
        }
    }

    log::info!("Heart-rate task stopped");
}
