// PulseWatch - Clock Task
//
// Owns the tick cadence of the simulated clock and checkpoints it to
// storage once a simulated minute and on shutdown.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::CLOCK_CHECKPOINT_TICKS;
use crate::tasks::sleep_for;
use crate::time_store::TimeStore;

pub fn clock_task(time: Arc<TimeStore>, shutdown: Arc<AtomicBool>, tick: Duration) {
    log::info!("Clock task started at {}", time.peek());

    let mut ticks: u32 = 0;
    while sleep_for(&shutdown, tick) {
        let now = time.get_current_time();
        ticks = ticks.wrapping_add(1);
        if ticks % CLOCK_CHECKPOINT_TICKS == 0 {
            log::debug!("Clock checkpoint {}", now);
            time.flush();
        }
    }

    time.flush();
    log::info!("Clock task stopped at {}", time.peek());
}
