pub mod storage;

#[cfg(target_os = "espidf")]
pub mod nvs;
