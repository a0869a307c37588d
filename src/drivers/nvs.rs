// PulseWatch - ESP-IDF NVS Blob Store
//
// Opens the namespace per operation (the handle is cheap) and keeps the
// default partition for the lifetime of the firmware.

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};
use esp_idf_svc::sys::{esp, nvs_flash_erase, nvs_flash_init};

use super::storage::{KvStore, StoreError};

/// Largest blob the firmware stores (a JSON timestamp).
const MAX_BLOB_LEN: usize = 128;

pub struct NvsStore {
    partition: EspDefaultNvsPartition,
}

impl NvsStore {
    /// Takes the default partition. esp-idf-svc already erases and retries
    /// once if the partition has no free pages or a newer layout version.
    pub fn take() -> Result<Self, StoreError> {
        let partition = EspDefaultNvsPartition::take()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { partition })
    }
}

impl KvStore for NvsStore {
    fn get_blob(&mut self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let nvs = EspNvs::new(self.partition.clone(), namespace, true)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let mut buf = [0u8; MAX_BLOB_LEN];
        match nvs.get_blob(key, &mut buf) {
            Ok(found) => Ok(found.map(<[u8]>::to_vec)),
            Err(e) => Err(StoreError::Corrupted(e.to_string())),
        }
    }

    fn set_blob(&mut self, namespace: &str, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let mut nvs = EspNvs::new(self.partition.clone(), namespace, true)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        nvs.set_blob(key, value)
            .map_err(|e| StoreError::Write(e.to_string()))
    }

    // EspNvs commits inside every set_blob.
    fn commit(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn erase_and_reinit(&mut self) -> Result<(), StoreError> {
        log::warn!("Erasing NVS partition");
        esp!(unsafe { nvs_flash_erase() }).map_err(|e| StoreError::Erase(e.to_string()))?;
        esp!(unsafe { nvs_flash_init() }).map_err(|e| StoreError::Erase(e.to_string()))
    }
}
