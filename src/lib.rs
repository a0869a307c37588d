// PulseWatch - Simulated Smartwatch Firmware
//
// Synthetic heart-rate and step producers coordinate with a monitor task
// through one shared state register and a bounded sample channel. A
// persistent clock and an operator console sit alongside.

pub mod channel;
pub mod config;
pub mod console;
pub mod drivers;
pub mod events;
pub mod state;
pub mod steps;
pub mod tasks;
pub mod time_store;

pub use channel::{sample_channel, SampleReceiver, SampleSender};
pub use events::{HeartRateSample, MonitorEvent};
pub use state::{StateRegister, STEP_ALERT, WORKOUT};
pub use steps::StepCounter;
pub use time_store::{TimeStore, TimeValue};
