// PulseWatch - Firmware Entry Point
//
// Start-up order:
//   1. Logging (EspLogger on the device, env_logger on the host).
//   2. State register, sample channel, step counter.
//   3. Time store (NVS on the device, a JSON file on the host).
//   4. Spawn heart-rate, step, clock, monitor and workout-trigger tasks.
//   5. Run the operator console on the main thread until `quit` or EOF,
//      then join every task.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use pulsewatch::config::*;
use pulsewatch::console::Console;
use pulsewatch::drivers::storage::{KvStore, MemoryStore};
use pulsewatch::tasks::{clock, console, heart_rate, monitor, steps, workout};
use pulsewatch::{sample_channel, StateRegister, StepCounter, TimeStore};

fn main() -> anyhow::Result<()> {
    init_logging();
    log::info!("PulseWatch firmware starting…");

    // ---- Shared state -----------------------------------------------------
    // The register exists before any task that reads it.
    let state = Arc::new(StateRegister::new());
    let (hr_tx, hr_rx) = sample_channel(HR_CHANNEL_CAPACITY)?;
    let step_counter = Arc::new(StepCounter::new(Arc::clone(&state)));
    let time = Arc::new(TimeStore::init(open_store()));
    let shutdown = Arc::new(AtomicBool::new(false));
    let timing = Timing::default();

    // ---- Spawn tasks (map to FreeRTOS tasks via std::thread) ---------------
    let mut tasks = Vec::new();

    let hr_state = Arc::clone(&state);
    let hr_shutdown = Arc::clone(&shutdown);
    tasks.push(spawn("heart_rate", STACK_HEART_RATE, PRIORITY_PRODUCER, move || {
        heart_rate::heart_rate_task(hr_state, hr_tx, hr_shutdown, timing.heart_rate);
    })?);

    let step_task_counter = Arc::clone(&step_counter);
    let step_shutdown = Arc::clone(&shutdown);
    tasks.push(spawn("steps", STACK_STEPS, PRIORITY_PRODUCER, move || {
        steps::step_task(step_task_counter, step_shutdown, timing);
    })?);

    let clock_time = Arc::clone(&time);
    let clock_shutdown = Arc::clone(&shutdown);
    tasks.push(spawn("clock", STACK_CLOCK, PRIORITY_BACKGROUND, move || {
        clock::clock_task(clock_time, clock_shutdown, timing.clock_tick);
    })?);

    let display = monitor::Monitor::new(Arc::clone(&state), Arc::clone(&step_counter), hr_rx);
    let monitor_shutdown = Arc::clone(&shutdown);
    tasks.push(spawn("monitor", STACK_MONITOR, PRIORITY_MONITOR, move || {
        monitor::monitor_task(display, monitor_shutdown, timing);
    })?);

    let workout_state = Arc::clone(&state);
    let workout_shutdown = Arc::clone(&shutdown);
    tasks.push(spawn("workout", STACK_WORKOUT, PRIORITY_BACKGROUND, move || {
        workout::workout_demo_task(
            workout_state,
            workout_shutdown,
            Duration::from_millis(WORKOUT_DEMO_DELAY_MS),
        );
    })?);

    // ---- Operator console -------------------------------------------------
    let operator = Console::new(Arc::clone(&step_counter), Arc::clone(&time));
    if let Err(e) = console::console_task(&operator, io::stdin().lock(), io::stdout(), &shutdown) {
        log::error!("Console failed: {}", e);
        shutdown.store(true, Ordering::SeqCst);
    }

    for task in tasks {
        let name = task.thread().name().unwrap_or("?").to_owned();
        if task.join().is_err() {
            log::error!("Task '{}' panicked", name);
        }
    }

    log::info!("PulseWatch stopped");
    Ok(())
}

fn spawn<F>(name: &str, stack_size: usize, priority: u8, f: F) -> anyhow::Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    set_next_task_priority(priority)?;
    Ok(thread::Builder::new()
        .name(name.into())
        .stack_size(stack_size)
        .spawn(f)?)
}

// ---------------------------------------------------------------------------
// Platform glue
// ---------------------------------------------------------------------------

#[cfg(target_os = "espidf")]
fn init_logging() {
    // Link esp-idf-sys runtime patches and initialise logging.
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();
}

#[cfg(not(target_os = "espidf"))]
fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Applies to the next `std::thread` spawned from this thread.
#[cfg(target_os = "espidf")]
fn set_next_task_priority(priority: u8) -> anyhow::Result<()> {
    use esp_idf_hal::task::thread::ThreadSpawnConfiguration;

    ThreadSpawnConfiguration {
        priority,
        ..Default::default()
    }
    .set()?;
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
fn set_next_task_priority(_priority: u8) -> anyhow::Result<()> {
    Ok(())
}

#[cfg(target_os = "espidf")]
fn open_store() -> Box<dyn KvStore> {
    match pulsewatch::drivers::nvs::NvsStore::take() {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::error!("NVS unavailable ({}) - time will not persist", e);
            Box::new(MemoryStore::new())
        }
    }
}

#[cfg(not(target_os = "espidf"))]
fn open_store() -> Box<dyn KvStore> {
    use pulsewatch::drivers::storage::FileStore;

    match FileStore::open(HOST_STORE_PATH) {
        Ok(store) => {
            log::info!("Persisting to {}", store.path().display());
            Box::new(store)
        }
        Err(e) => {
            log::error!("Cannot open {} ({}) - time will not persist", HOST_STORE_PATH, e);
            Box::new(MemoryStore::new())
        }
    }
}
