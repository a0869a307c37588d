// PulseWatch - Heart-Rate Sample Channel
//
// Bounded FIFO between the heart-rate task and the monitor. Built on
// `std::sync::mpsc::sync_channel`: the producer blocks while the buffer is
// full, the consumer can block, wait with a timeout, or poll.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::time::Duration;

use thiserror::Error;

use crate::events::HeartRateSample;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("sample channel capacity must be non-zero")]
    ZeroCapacity,
    /// The other end was dropped; the task holding this end should exit.
    #[error("sample channel disconnected")]
    Disconnected,
}

#[derive(Debug, Clone)]
pub struct SampleSender {
    tx: SyncSender<HeartRateSample>,
}

#[derive(Debug)]
pub struct SampleReceiver {
    rx: Receiver<HeartRateSample>,
}

/// Create a channel holding at most `capacity` samples.
pub fn sample_channel(capacity: usize) -> Result<(SampleSender, SampleReceiver), ChannelError> {
    // A zero-capacity sync_channel is a rendezvous, which would make every
    // push wait for the monitor's poll.
    if capacity == 0 {
        return Err(ChannelError::ZeroCapacity);
    }
    let (tx, rx) = mpsc::sync_channel(capacity);
    Ok((SampleSender { tx }, SampleReceiver { rx }))
}

impl SampleSender {
    /// Blocks while the channel is full. Never drops a sample.
    pub fn push(&self, sample: HeartRateSample) -> Result<(), ChannelError> {
        self.tx.send(sample).map_err(|_| ChannelError::Disconnected)
    }
}

impl SampleReceiver {
    /// Non-blocking dequeue. `Ok(None)` when empty.
    pub fn try_pop(&self) -> Result<Option<HeartRateSample>, ChannelError> {
        match self.rx.try_recv() {
            Ok(sample) => Ok(Some(sample)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ChannelError::Disconnected),
        }
    }

    pub fn pop(&self) -> Result<HeartRateSample, ChannelError> {
        self.rx.recv().map_err(|_| ChannelError::Disconnected)
    }

    pub fn pop_timeout(&self, timeout: Duration) -> Result<Option<HeartRateSample>, ChannelError> {
        match self.rx.recv_timeout(timeout) {
            Ok(sample) => Ok(Some(sample)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ChannelError::Disconnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn zero_capacity_is_rejected() {
        assert_eq!(sample_channel(0).unwrap_err(), ChannelError::ZeroCapacity);
    }

    #[test]
    fn poll_on_empty_returns_none() {
        let (_tx, rx) = sample_channel(5).unwrap();
        assert_eq!(rx.try_pop(), Ok(None));
        assert_eq!(rx.pop_timeout(Duration::from_millis(5)), Ok(None));
    }

    #[test]
    fn consumer_sees_every_sample_in_order_under_backpressure() {
        let (tx, rx) = sample_channel(5).unwrap();
        let producer = thread::spawn(move || {
            for bpm in 0..200u16 {
                tx.push(HeartRateSample::new(bpm)).unwrap();
            }
        });

        let mut seen = Vec::new();
        while seen.len() < 200 {
            if let Some(s) = rx.try_pop().unwrap() {
                seen.push(s.bpm);
            } else {
                thread::yield_now();
            }
        }
        producer.join().unwrap();
        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }

    #[test]
    fn producer_blocks_when_full() {
        let (tx, rx) = sample_channel(2).unwrap();
        tx.push(HeartRateSample::new(70)).unwrap();
        tx.push(HeartRateSample::new(71)).unwrap();

        let (done_tx, done_rx) = mpsc::channel();
        let blocked = thread::spawn(move || {
            tx.push(HeartRateSample::new(72)).unwrap();
            done_tx.send(()).unwrap();
        });

        assert!(done_rx.recv_timeout(Duration::from_millis(50)).is_err());
        assert_eq!(rx.pop().unwrap().bpm, 70);
        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        blocked.join().unwrap();
        assert_eq!(rx.pop().unwrap().bpm, 71);
        assert_eq!(rx.pop().unwrap().bpm, 72);
    }

    #[test]
    fn dropping_the_receiver_releases_a_blocked_producer() {
        let (tx, rx) = sample_channel(1).unwrap();
        tx.push(HeartRateSample::new(80)).unwrap();
        let blocked = thread::spawn(move || tx.push(HeartRateSample::new(81)));
        thread::sleep(Duration::from_millis(20));
        drop(rx);
        assert_eq!(blocked.join().unwrap(), Err(ChannelError::Disconnected));
    }
}
