// PulseWatch - Persistent Wall-Clock Time
//
// There is no RTC: the held time advances one second per
// `get_current_time` call, so it runs fast or slow depending on how often it
// is polled. The clock task polls once per second to keep it roughly honest.
//
// Persistence is best effort. Explicit `set_time` writes synchronously;
// `flush` checkpoints ticked time and is called periodically by the clock task.

use std::fmt;
use std::sync::{Mutex, MutexGuard};

use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::config::{STORAGE_NAMESPACE, STORAGE_TIME_KEY};
use crate::drivers::storage::{KvStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeValue {
    pub datetime: NaiveDateTime,
    pub valid: bool,
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.datetime.format("%H:%M:%S"))
    }
}

/// On-flash layout of the `time` blob.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedTime {
    datetime: NaiveDateTime,
}

pub struct TimeStore {
    current: Mutex<TimeValue>,
    store: Mutex<Box<dyn KvStore>>,
}

impl TimeStore {
    /// Load the persisted time, falling back to the host's local clock.
    pub fn init(store: Box<dyn KvStore>) -> Self {
        Self::init_with_fallback(store, || Local::now().naive_local())
    }

    /// Like [`TimeStore::init`], with the fallback clock supplied by the caller.
    pub fn init_with_fallback(
        mut store: Box<dyn KvStore>,
        fallback: impl FnOnce() -> NaiveDateTime,
    ) -> Self {
        let datetime = match load_time(store.as_mut()) {
            Some(datetime) => {
                log::info!("Loaded time from storage: {}", datetime);
                datetime
            }
            None => {
                let now = fallback();
                log::warn!("Using system time as fallback: {}", now);
                now
            }
        };

        Self {
            current: Mutex::new(TimeValue { datetime, valid: true }),
            store: Mutex::new(store),
        }
    }

    fn current(&self) -> MutexGuard<'_, TimeValue> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Advance the held time by one second and return it.
    pub fn get_current_time(&self) -> TimeValue {
        let mut current = self.current();
        if let Some(next) = current.datetime.checked_add_signed(TimeDelta::seconds(1)) {
            current.datetime = next;
        }
        *current
    }

    /// Read without ticking.
    pub fn peek(&self) -> TimeValue {
        *self.current()
    }

    /// Replace the held time and persist it before returning. A failed write
    /// is logged; the new time stays valid in memory.
    pub fn set_time(&self, datetime: NaiveDateTime) {
        *self.current() = TimeValue { datetime, valid: true };
        self.persist_logged(datetime);
    }

    /// Keep the held calendar date, replace hour/minute/second.
    pub fn set_time_of_day(&self, time: NaiveTime) -> TimeValue {
        let value = {
            let mut current = self.current();
            *current = TimeValue {
                datetime: current.datetime.date().and_time(time),
                valid: true,
            };
            *current
        };
        self.persist_logged(value.datetime);
        value
    }

    /// Checkpoint the held time without ticking it.
    pub fn flush(&self) {
        let datetime = self.peek().datetime;
        self.persist_logged(datetime);
    }

    fn persist_logged(&self, datetime: NaiveDateTime) {
        match self.persist(datetime) {
            Ok(()) => log::debug!("Persisted time {}", datetime),
            Err(e) => log::error!("Failed to persist time: {}", e),
        }
    }

    fn persist(&self, datetime: NaiveDateTime) -> Result<(), StoreError> {
        let blob = serde_json::to_vec(&PersistedTime { datetime })
            .map_err(|e| StoreError::Write(e.to_string()))?;
        let mut store = self.store.lock().unwrap_or_else(|e| e.into_inner());
        store.set_blob(STORAGE_NAMESPACE, STORAGE_TIME_KEY, &blob)?;
        store.commit()
    }
}

/// `None` means "no usable persisted time"; never an error.
fn load_time(store: &mut dyn KvStore) -> Option<NaiveDateTime> {
    let blob = match store.get_blob(STORAGE_NAMESPACE, STORAGE_TIME_KEY) {
        Ok(blob) => blob,
        Err(StoreError::Corrupted(reason)) => {
            log::warn!("Storage corrupted ({}), erasing and retrying", reason);
            if let Err(e) = store.erase_and_reinit() {
                log::error!("Storage erase failed: {}", e);
                return None;
            }
            match store.get_blob(STORAGE_NAMESPACE, STORAGE_TIME_KEY) {
                Ok(blob) => blob,
                Err(e) => {
                    log::error!("Storage still unreadable after erase: {}", e);
                    return None;
                }
            }
        }
        Err(e) => {
            log::warn!("Storage unavailable: {}", e);
            return None;
        }
    }?;

    match serde_json::from_slice::<PersistedTime>(&blob) {
        Ok(persisted) => Some(persisted.datetime),
        Err(e) => {
            log::warn!("Discarding unreadable time blob: {}", e);
            None
        }
    }
}
