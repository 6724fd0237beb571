//! Simulated pins, for tests and for trying the driver without hardware.
//!
//! A [`SimPin`] is a cheap handle onto shared line state. The driver gets one
//! clone through a [`SimRegistry`]; a test keeps another and plays the module
//! with [`SimPin::drive`], [`SimPin::wait_for_pulses`] and friends.

use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::debug;
use thiserror::Error;

use crate::pin::{Edge, GpioPin, Level, PinRegistry, Pull};

#[derive(Debug, Error)]
pub enum SimPinError {
    #[error("simulated pin {0} rejected the configuration")]
    Rejected(String),
    #[error("simulated pin {0} is not configured as an output")]
    NotOutput(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Unconfigured,
    Output,
    Input(Edge),
}

#[derive(Debug)]
struct LineState {
    level: Level,
    mode: Mode,
    latched: bool,
    pulses: u64,
    high_since: Option<Instant>,
    last_high: Option<Duration>,
    reject: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<LineState>,
    changed: Condvar,
}

#[derive(Debug, Clone)]
pub struct SimPin {
    name: Arc<str>,
    shared: Arc<Shared>,
}

impl SimPin {
    pub fn new(name: &str, level: Level) -> Self {
        Self {
            name: Arc::from(name),
            shared: Arc::new(Shared {
                state: Mutex::new(LineState {
                    level,
                    mode: Mode::Unconfigured,
                    latched: false,
                    pulses: 0,
                    high_since: None,
                    last_high: None,
                    reject: false,
                }),
                changed: Condvar::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.lock().level
    }

    /// Edge the line is currently armed for, if it is an input.
    pub fn watched_edge(&self) -> Option<Edge> {
        match self.lock().mode {
            Mode::Input(edge) => Some(edge),
            _ => None,
        }
    }

    /// Completed high-to-low pulses driven through [`GpioPin::set_level`].
    pub fn pulses(&self) -> u64 {
        self.lock().pulses
    }

    /// How long the line stayed high during the last completed pulse.
    pub fn last_high_width(&self) -> Option<Duration> {
        self.lock().last_high
    }

    /// Makes every following `configure_*` call fail.
    pub fn reject_configuration(&self, reject: bool) {
        self.lock().reject = reject;
    }

    /// Drives the line from the device side, latching an edge if the
    /// transition is one the input is armed for.
    pub fn drive(&self, level: Level) {
        let mut state = self.lock();
        self.transition(&mut state, level);
    }

    /// Waits until at least `count` pulses have completed.
    pub fn wait_for_pulses(&self, count: u64, timeout: Duration) -> bool {
        self.wait_until(timeout, |s| s.pulses >= count)
    }

    /// Waits until the driver arms the input for `edge`.
    pub fn wait_for_watched_edge(&self, edge: Edge, timeout: Duration) -> bool {
        self.wait_until(timeout, |s| s.mode == Mode::Input(edge))
    }

    fn lock(&self) -> MutexGuard<'_, LineState> {
        // state stays consistent even if a holder panicked
        self.shared.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn transition(&self, state: &mut LineState, level: Level) {
        let from = state.level;
        state.level = level;
        if let Mode::Input(edge) = state.mode {
            if edge.matches(from, level) {
                state.latched = true;
            }
        }
        match (from, level) {
            (Level::Low, Level::High) => state.high_since = Some(Instant::now()),
            (Level::High, Level::Low) => {
                state.pulses += 1;
                state.last_high = state.high_since.take().map(|since| since.elapsed());
            }
            _ => {}
        }
        self.shared.changed.notify_all();
    }

    fn wait_until(&self, timeout: Duration, mut done: impl FnMut(&LineState) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        loop {
            if done(&state) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = match self.shared.changed.wait_timeout(state, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
    }

    fn configure(&self, mode: Mode) -> Result<(), SimPinError> {
        let mut state = self.lock();
        if state.reject {
            return Err(SimPinError::Rejected(self.name.to_string()));
        }
        state.mode = mode;
        state.latched = false;
        self.shared.changed.notify_all();
        Ok(())
    }
}

impl GpioPin for SimPin {
    type Error = SimPinError;

    fn configure_output(&mut self, initial: Level) -> Result<(), Self::Error> {
        self.configure(Mode::Output)?;
        let mut state = self.lock();
        self.transition(&mut state, initial);
        Ok(())
    }

    fn set_level(&mut self, level: Level) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if state.mode != Mode::Output {
            return Err(SimPinError::NotOutput(self.name.to_string()));
        }
        self.transition(&mut state, level);
        Ok(())
    }

    fn configure_input(&mut self, _pull: Pull, edge: Edge) -> Result<(), Self::Error> {
        self.configure(Mode::Input(edge))
    }

    fn wait_for_edge(&mut self, timeout: Duration) -> bool {
        let triggered = self.wait_until(timeout, |s| s.latched);
        if triggered {
            self.lock().latched = false;
        }
        triggered
    }
}

/// Name to [`SimPin`] lookup, standing in for a platform pin registry.
#[derive(Debug, Default)]
pub struct SimRegistry {
    pins: HashMap<String, SimPin>,
}

impl SimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `pin` under its name and hands back a device-side handle.
    pub fn register(&mut self, pin: SimPin) -> SimPin {
        debug!("registering simulated pin {}", pin.name());
        self.pins.insert(pin.name().to_owned(), pin.clone());
        pin
    }
}

impl PinRegistry for SimRegistry {
    type Pin = SimPin;

    fn resolve(&mut self, name: &str) -> Option<SimPin> {
        self.pins.get(name).cloned()
    }
}
