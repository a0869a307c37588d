// PulseWatch - System Configuration

use std::time::Duration;

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_HEART_RATE: usize = 4096;
pub const STACK_STEPS: usize = 4096;
pub const STACK_CLOCK: usize = 4096;
pub const STACK_MONITOR: usize = 8192;
pub const STACK_WORKOUT: usize = 2048;

// ---------------------------------------------------------------------------
// Task Priorities (FreeRTOS; ignored on the host)
// ---------------------------------------------------------------------------
pub const PRIORITY_PRODUCER: u8 = 2;
pub const PRIORITY_MONITOR: u8 = 1;
pub const PRIORITY_BACKGROUND: u8 = 1;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const HEART_RATE_INTERVAL_MS: u64 = 1000;
pub const STEP_INTERVAL_MS: u64 = 2000;          // 0.5 steps/s at rest
pub const STEP_WORKOUT_INTERVAL_MS: u64 = 500;   // 2 steps/s in workout
pub const MONITOR_INTERVAL_MS: u64 = 1000;
pub const MONITOR_WORKOUT_INTERVAL_MS: u64 = 300;
pub const CLOCK_TICK_MS: u64 = 1000;
pub const WORKOUT_DEMO_DELAY_MS: u64 = 5000;     // scripted workout start after boot

// ---------------------------------------------------------------------------
// Heart Rate (BPM, half-open ranges)
// ---------------------------------------------------------------------------
pub const HR_REST_MIN: u16 = 60;
pub const HR_REST_MAX: u16 = 100;
pub const HR_WORKOUT_BOOST_MIN: u16 = 20;
pub const HR_WORKOUT_BOOST_MAX: u16 = 60;
pub const HR_HIGH_THRESHOLD: u16 = 120;
pub const HR_CHANNEL_CAPACITY: usize = 5;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------
pub const STEP_MILESTONE: u32 = 10;
pub const STEP_CEILING: u32 = 50;                // monitor auto-resets here

// ---------------------------------------------------------------------------
// Persistent Storage
// ---------------------------------------------------------------------------
pub const STORAGE_NAMESPACE: &str = "storage";
pub const STORAGE_TIME_KEY: &str = "time";
pub const HOST_STORE_PATH: &str = "pulsewatch-nvs.json";
pub const CLOCK_CHECKPOINT_TICKS: u32 = 60;      // persist once a simulated minute

/// Every period the tasks sleep for, grouped so tests can run the loops fast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub heart_rate: Duration,
    pub step_rest: Duration,
    pub step_workout: Duration,
    pub monitor_rest: Duration,
    pub monitor_workout: Duration,
    pub clock_tick: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            heart_rate: Duration::from_millis(HEART_RATE_INTERVAL_MS),
            step_rest: Duration::from_millis(STEP_INTERVAL_MS),
            step_workout: Duration::from_millis(STEP_WORKOUT_INTERVAL_MS),
            monitor_rest: Duration::from_millis(MONITOR_INTERVAL_MS),
            monitor_workout: Duration::from_millis(MONITOR_WORKOUT_INTERVAL_MS),
            clock_tick: Duration::from_millis(CLOCK_TICK_MS),
        }
    }
}

impl Timing {
    /// Same ratios as the defaults, divided down for fast-running tests.
    pub fn scaled_down(divisor: u32) -> Self {
        let d = Self::default();
        Self {
            heart_rate: d.heart_rate / divisor,
            step_rest: d.step_rest / divisor,
            step_workout: d.step_workout / divisor,
            monitor_rest: d.monitor_rest / divisor,
            monitor_workout: d.monitor_workout / divisor,
            clock_tick: d.clock_tick / divisor,
        }
    }
}
