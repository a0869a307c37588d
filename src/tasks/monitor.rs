// PulseWatch - Monitor (Display) Task
//
// The only consumer of heart-rate samples and of STEP_ALERT. Each iteration:
//   1. Poll the sample channel without blocking; report BPM with the number
//      of steps taken since the previous report.
//   2. If STEP_ALERT is latched, re-read the step count, report the
//      milestone, reset at the daily goal, then acknowledge the alert.
//
// Runs on a fixed-wake-time schedule so processing time does not accumulate
// as drift.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::channel::{ChannelError, SampleReceiver};
use crate::config::{Timing, HR_HIGH_THRESHOLD, STEP_CEILING};
use crate::events::{HeartRateSample, MonitorEvent};
use crate::state::{StateBits, StateRegister, WORKOUT};
use crate::steps::StepCounter;
use crate::tasks::sleep_until;

pub struct Monitor {
    state: Arc<StateRegister>,
    steps: Arc<StepCounter>,
    samples: SampleReceiver,
    last_observed_steps: u32,
    producer_gone: bool,
}

impl Monitor {
    pub fn new(state: Arc<StateRegister>, steps: Arc<StepCounter>, samples: SampleReceiver) -> Self {
        Self {
            state,
            steps,
            samples,
            last_observed_steps: 0,
            producer_gone: false,
        }
    }

    pub fn last_observed_steps(&self) -> u32 {
        self.last_observed_steps
    }

    /// One iteration of the display loop, returning what was emitted.
    pub fn tick(&mut self) -> Vec<MonitorEvent> {
        let mut events = Vec::with_capacity(2);

        if let Some(sample) = self.poll_sample() {
            events.push(self.observe(sample));
        }

        if self.state.step_alert_pending() {
            events.push(self.handle_milestone());
        }

        events
    }

    fn poll_sample(&mut self) -> Option<HeartRateSample> {
        match self.samples.try_pop() {
            Ok(sample) => sample,
            Err(ChannelError::Disconnected) => {
                if !self.producer_gone {
                    log::warn!("Heart-rate producer gone - no more samples");
                    self.producer_gone = true;
                }
                None
            }
            Err(e) => {
                log::error!("Sample channel error: {}", e);
                None
            }
        }
    }

    fn observe(&mut self, sample: HeartRateSample) -> MonitorEvent {
        let steps = self.steps.get_steps();
        // A console reset can leave the counter below our last reading.
        let step_delta = steps.saturating_sub(self.last_observed_steps);
        self.last_observed_steps = steps;

        MonitorEvent::HeartRate {
            bpm: sample.bpm,
            steps,
            step_delta,
            high: sample.bpm > HR_HIGH_THRESHOLD,
        }
    }

    fn handle_milestone(&mut self) -> MonitorEvent {
        let steps = self.steps.get_steps();
        let reset = steps >= STEP_CEILING;
        if reset {
            self.steps.reset_steps();
            self.last_observed_steps = 0;
        }
        self.state.acknowledge_step_alert();
        MonitorEvent::Milestone { steps, reset }
    }
}

/// Poll period, picked from a register snapshot.
pub fn monitor_period(bits: StateBits, timing: &Timing) -> Duration {
    if bits & WORKOUT != 0 {
        timing.monitor_workout
    } else {
        timing.monitor_rest
    }
}

/// Next wake time on a fixed schedule. Re-anchors at `now` once the loop
/// has fallen more than a whole interval behind, instead of bursting.
pub fn next_wake(previous: Instant, interval: Duration, now: Instant) -> Instant {
    let next = previous + interval;
    if next + interval <= now {
        now
    } else {
        next
    }
}

fn render(event: &MonitorEvent) {
    match event {
        MonitorEvent::HeartRate { high: true, .. } | MonitorEvent::Milestone { .. } => {
            log::warn!("{}", event)
        }
        MonitorEvent::HeartRate { .. } => log::info!("{}", event),
    }
}

pub fn monitor_task(mut monitor: Monitor, shutdown: Arc<AtomicBool>, timing: Timing) {
    log::info!("Monitor task started");

    let mut wake = Instant::now();
    loop {
        for event in monitor.tick() {
            render(&event);
        }

        let interval = monitor_period(monitor.state.get(), &timing);
        wake = next_wake(wake, interval, Instant::now());
        if !sleep_until(&shutdown, wake) {
            break;
        }
    }

    // Dropping `monitor` closes the channel and frees a blocked producer.
    log::info!("Monitor task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{sample_channel, SampleSender};
    use crate::state::STEP_ALERT;

    fn rig() -> (Monitor, SampleSender, Arc<StepCounter>) {
        let state = Arc::new(StateRegister::new());
        let steps = Arc::new(StepCounter::new(Arc::clone(&state)));
        let (tx, rx) = sample_channel(5).unwrap();
        (Monitor::new(state, Arc::clone(&steps), rx), tx, steps)
    }

    #[test]
    fn idle_tick_emits_nothing() {
        let (mut m, _tx, _steps) = rig();
        assert!(m.tick().is_empty());
    }

    #[test]
    fn sample_reports_step_delta_since_last_sample() {
        let (mut m, tx, steps) = rig();
        for _ in 0..3 {
            steps.step();
        }
        tx.push(HeartRateSample::new(72)).unwrap();
        assert_eq!(
            m.tick(),
            vec![MonitorEvent::HeartRate { bpm: 72, steps: 3, step_delta: 3, high: false }]
        );

        steps.step();
        tx.push(HeartRateSample::new(121)).unwrap();
        assert_eq!(
            m.tick(),
            vec![MonitorEvent::HeartRate { bpm: 121, steps: 4, step_delta: 1, high: true }]
        );
        assert_eq!(m.last_observed_steps(), 4);
    }

    #[test]
    fn threshold_itself_is_not_high() {
        let (mut m, tx, _steps) = rig();
        tx.push(HeartRateSample::new(HR_HIGH_THRESHOLD)).unwrap();
        assert!(matches!(m.tick()[0], MonitorEvent::HeartRate { high: false, .. }));
    }

    #[test]
    fn one_sample_per_tick() {
        let (mut m, tx, _steps) = rig();
        tx.push(HeartRateSample::new(70)).unwrap();
        tx.push(HeartRateSample::new(71)).unwrap();
        assert_eq!(m.tick().len(), 1);
        assert_eq!(m.tick().len(), 1);
        assert!(m.tick().is_empty());
    }

    #[test]
    fn milestone_is_handled_once_and_cleared() {
        let (mut m, _tx, steps) = rig();
        for _ in 0..10 {
            steps.step();
        }
        assert_eq!(m.tick(), vec![MonitorEvent::Milestone { steps: 10, reset: false }]);
        assert!(!steps.state().test(STEP_ALERT));
        assert!(m.tick().is_empty());
        assert_eq!(steps.get_steps(), 10);
    }

    #[test]
    fn milestone_rereads_the_counter() {
        let (mut m, _tx, steps) = rig();
        for _ in 0..12 {
            steps.step();
        }
        assert_eq!(m.tick(), vec![MonitorEvent::Milestone { steps: 12, reset: false }]);
    }

    #[test]
    fn goal_reached_in_workout_resets_counter_and_delta_baseline() {
        let (mut m, tx, steps) = rig();
        steps.state().set_workout(true);

        for _ in 0..48 {
            steps.step();
        }
        tx.push(HeartRateSample::new(130)).unwrap();
        assert_eq!(
            m.tick(),
            vec![
                MonitorEvent::HeartRate { bpm: 130, steps: 48, step_delta: 48, high: true },
                MonitorEvent::Milestone { steps: 48, reset: false },
            ]
        );
        assert_eq!(m.last_observed_steps(), 48);

        steps.step();
        steps.step();
        assert_eq!(m.tick(), vec![MonitorEvent::Milestone { steps: 50, reset: true }]);
        assert_eq!(steps.get_steps(), 0);
        assert_eq!(m.last_observed_steps(), 0);

        for _ in 0..3 {
            steps.step();
        }
        tx.push(HeartRateSample::new(125)).unwrap();
        assert_eq!(
            m.tick(),
            vec![MonitorEvent::HeartRate { bpm: 125, steps: 3, step_delta: 3, high: true }]
        );
    }

    #[test]
    fn external_reset_does_not_underflow_delta() {
        let (mut m, tx, steps) = rig();
        for _ in 0..5 {
            steps.step();
        }
        tx.push(HeartRateSample::new(80)).unwrap();
        m.tick();
        steps.reset_steps();
        steps.step();
        tx.push(HeartRateSample::new(80)).unwrap();
        assert!(matches!(m.tick()[0], MonitorEvent::HeartRate { steps: 1, step_delta: 0, .. }));
    }

    #[test]
    fn disconnected_producer_still_handles_alerts() {
        let (mut m, tx, steps) = rig();
        drop(tx);
        for _ in 0..10 {
            steps.step();
        }
        assert_eq!(m.tick().len(), 1);
        assert!(m.tick().is_empty());
    }

    #[test]
    fn period_follows_workout_bit() {
        let timing = Timing::default();
        assert_eq!(monitor_period(0, &timing), Duration::from_millis(1000));
        assert_eq!(monitor_period(WORKOUT | STEP_ALERT, &timing), Duration::from_millis(300));
    }

    #[test]
    fn schedule_does_not_accumulate_processing_time() {
        let start = Instant::now();
        let interval = Duration::from_millis(100);
        let late_but_in_window = start + Duration::from_millis(130);
        assert_eq!(next_wake(start, interval, late_but_in_window), start + interval);
    }

    #[test]
    fn schedule_reanchors_when_far_behind() {
        let start = Instant::now();
        let interval = Duration::from_millis(100);
        let now = start + Duration::from_millis(450);
        assert_eq!(next_wake(start, interval, now), now);
    }
}
