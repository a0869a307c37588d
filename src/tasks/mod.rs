pub mod clock;
pub mod console;
pub mod heart_rate;
pub mod monitor;
pub mod steps;
pub mod workout;

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single sleep, so a shutdown request is noticed promptly.
const SHUTDOWN_POLL: Duration = Duration::from_millis(50);

pub fn shutdown_requested(shutdown: &AtomicBool) -> bool {
    shutdown.load(Ordering::SeqCst)
}

/// Sleep until `deadline`. Returns `false` if shutdown was requested first.
pub fn sleep_until(shutdown: &AtomicBool, deadline: Instant) -> bool {
    loop {
        if shutdown_requested(shutdown) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(SHUTDOWN_POLL));
    }
}

pub fn sleep_for(shutdown: &AtomicBool, duration: Duration) -> bool {
    sleep_until(shutdown, Instant::now() + duration)
}
