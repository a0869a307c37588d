// PulseWatch - Shared State Register
//
// One bitmask shared by every task. Bits are independent signals:
//   WORKOUT    - mode flag, read at the start of each producer iteration.
//   STEP_ALERT - level-triggered latch, raised by the step counter and
//                cleared by the monitor once it has handled the milestone.
//
// set/clear/get only ever touch the atomic word. Blocking waiters park on a
// condvar which setters signal only when someone is actually waiting.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

pub type StateBits = u32;

pub const WORKOUT: StateBits = 1 << 0;
pub const STEP_ALERT: StateBits = 1 << 2;

#[derive(Debug, Default)]
pub struct StateRegister {
    bits: AtomicU32,
    waiters: AtomicUsize,
    park: Mutex<()>,
    wake: Condvar,
}

impl StateRegister {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every bit.
    pub fn get(&self) -> StateBits {
        self.bits.load(Ordering::SeqCst)
    }

    /// `true` if any of `bits` is currently asserted.
    pub fn test(&self, bits: StateBits) -> bool {
        self.get() & bits != 0
    }

    pub fn set(&self, bits: StateBits) {
        self.bits.fetch_or(bits, Ordering::SeqCst);
        self.notify_waiters();
    }

    pub fn clear(&self, bits: StateBits) {
        self.bits.fetch_and(!bits, Ordering::SeqCst);
    }

    /// Atomically clear `bits` and return which of them were set.
    pub fn take(&self, bits: StateBits) -> StateBits {
        self.bits.fetch_and(!bits, Ordering::SeqCst) & bits
    }

    /// Block until any of `bits` is set or `timeout` elapses.
    ///
    /// Returns the subset of `bits` that matched, or `None` on timeout. A zero
    /// timeout degenerates to a poll.
    pub fn wait_any(&self, bits: StateBits, timeout: Duration) -> Option<StateBits> {
        let matched = self.get() & bits;
        if matched != 0 {
            return Some(matched);
        }
        if timeout.is_zero() {
            return None;
        }

        let deadline = Instant::now() + timeout;
        // Registered before the re-check below so a concurrent `set` either
        // is seen by the check or sees us in the waiter count.
        self.waiters.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.park.lock().unwrap_or_else(|e| e.into_inner());
        let result = loop {
            let matched = self.get() & bits;
            if matched != 0 {
                break Some(matched);
            }
            let now = Instant::now();
            if now >= deadline {
                break None;
            }
            guard = match self.wake.wait_timeout(guard, deadline - now) {
                Ok((g, _)) => g,
                Err(poisoned) => poisoned.into_inner().0,
            };
        };
        drop(guard);
        self.waiters.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn notify_waiters(&self) {
        if self.waiters.load(Ordering::SeqCst) == 0 {
            return;
        }
        // Taking the lock orders this notify after a waiter's final check.
        let _guard = self.park.lock().unwrap_or_else(|e| e.into_inner());
        self.wake.notify_all();
    }

    // -----------------------------------------------------------------------
    // Mode flag (level read)
    // -----------------------------------------------------------------------

    pub fn workout_active(&self) -> bool {
        self.test(WORKOUT)
    }

    pub fn set_workout(&self, active: bool) {
        if active {
            self.set(WORKOUT);
        } else {
            self.clear(WORKOUT);
        }
    }

    // -----------------------------------------------------------------------
    // Milestone latch (observe, then acknowledge)
    // -----------------------------------------------------------------------

    /// Idempotent: a second raise before acknowledgement is a no-op.
    pub fn raise_step_alert(&self) {
        self.set(STEP_ALERT);
    }

    pub fn step_alert_pending(&self) -> bool {
        self.test(STEP_ALERT)
    }

    pub fn acknowledge_step_alert(&self) {
        self.clear(STEP_ALERT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn set_is_visible_until_cleared() {
        let reg = StateRegister::new();
        reg.set(WORKOUT);
        assert!(reg.test(WORKOUT));
        reg.set(STEP_ALERT);
        assert_eq!(reg.get(), WORKOUT | STEP_ALERT);
        reg.clear(STEP_ALERT);
        assert_eq!(reg.get(), WORKOUT);
        assert!(reg.workout_active());
    }

    #[test]
    fn bits_are_independent() {
        let reg = StateRegister::new();
        reg.raise_step_alert();
        reg.set_workout(true);
        reg.set_workout(false);
        assert!(reg.step_alert_pending());
        assert!(!reg.workout_active());
    }

    #[test]
    fn take_reports_and_clears_only_requested_bits() {
        let reg = StateRegister::new();
        reg.set(WORKOUT | STEP_ALERT);
        assert_eq!(reg.take(STEP_ALERT), STEP_ALERT);
        assert_eq!(reg.take(STEP_ALERT), 0);
        assert_eq!(reg.get(), WORKOUT);
    }

    #[test]
    fn wait_any_returns_immediately_when_already_set() {
        let reg = StateRegister::new();
        reg.set(STEP_ALERT);
        assert_eq!(reg.wait_any(WORKOUT | STEP_ALERT, Duration::ZERO), Some(STEP_ALERT));
    }

    #[test]
    fn wait_any_times_out() {
        let reg = StateRegister::new();
        reg.set(WORKOUT);
        let start = Instant::now();
        assert_eq!(reg.wait_any(STEP_ALERT, Duration::from_millis(30)), None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn wait_any_wakes_on_set_from_another_thread() {
        let reg = Arc::new(StateRegister::new());
        let setter = Arc::clone(&reg);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            setter.raise_step_alert();
        });
        let matched = reg.wait_any(STEP_ALERT, Duration::from_secs(5));
        handle.join().unwrap();
        assert_eq!(matched, Some(STEP_ALERT));
    }

    #[test]
    fn concurrent_writers_on_different_bits_do_not_lose_updates() {
        let reg = Arc::new(StateRegister::new());
        let toggler = {
            let reg = Arc::clone(&reg);
            thread::spawn(move || {
                for i in 0..10_000 {
                    reg.set_workout(i % 2 == 0);
                }
            })
        };
        for _ in 0..10_000 {
            reg.raise_step_alert();
            assert!(reg.step_alert_pending());
        }
        toggler.join().unwrap();
        assert!(reg.step_alert_pending());
        assert!(!reg.workout_active());
    }
}
