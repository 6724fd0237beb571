//! `gpio-cdev` backend for Linux GPIO character devices.

use gpio_cdev::{
    Chip, EventRequestFlags, EventType, Line, LineEventHandle, LineHandle, LineRequestFlags,
};
use log::{debug, warn};
use std::io::ErrorKind;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::pin::{Edge, GpioPin, Level, PinRegistry, Pull};

/// The 40-pin header on a Raspberry Pi 5.
pub const DEFAULT_CHIP: &str = "/dev/gpiochip4";

const TRIG_CONSUMER: &str = "hc-sr04-trigger";
const ECHO_CONSUMER: &str = "hc-sr04-echo";

/// Resolves pin names as line offsets on one GPIO chip.
pub struct CdevRegistry {
    chip: Chip,
}

impl CdevRegistry {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, gpio_cdev::Error> {
        let chip = Chip::new(path)?;
        debug!("opened {} ({} lines)", chip.name(), chip.num_lines());
        Ok(Self { chip })
    }
}

impl PinRegistry for CdevRegistry {
    type Pin = CdevPin;

    fn resolve(&mut self, name: &str) -> Option<CdevPin> {
        let offset = match name.trim().parse::<u32>() {
            Ok(offset) => offset,
            Err(_) => {
                debug!("pin name {name:?} is not a line offset");
                return None;
            }
        };
        match self.chip.get_line(offset) {
            Ok(line) => Some(CdevPin {
                line,
                request: Request::Released,
            }),
            Err(e) => {
                debug!("no line {offset} on {}: {e}", self.chip.name());
                None
            }
        }
    }
}

enum Request {
    Released,
    Output(LineHandle),
    Input(LineEventHandle),
}

/// One requested line. Reconfiguring gives the line back to the kernel
/// first, which also throws away events queued for the old request.
pub struct CdevPin {
    line: Line,
    request: Request,
}

#[derive(Debug, thiserror::Error)]
pub enum CdevPinError {
    #[error(transparent)]
    Gpio(#[from] gpio_cdev::Error),
    #[error("line {0} is not configured as an output")]
    NotOutput(u32),
}

/// Waits for `fd` to become readable. A signal landing mid-wait restarts
/// the poll with whatever is left of `timeout`.
fn poll_with_timeout(fd: i32, timeout: Duration) -> std::io::Result<bool> {
    let deadline = Instant::now() + timeout;
    loop {
        let mut pollfd = libc::pollfd {
            fd,
            events: libc::POLLIN | libc::POLLPRI,
            revents: 0,
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        let timeout_ms = remaining.as_millis().min(i32::MAX as u128) as i32;

        // SAFETY: pollfd lives across the call and nfds is 1.
        match unsafe { libc::poll(&mut pollfd, 1, timeout_ms) } {
            -1 => {
                let err = std::io::Error::last_os_error();
                if err.kind() != ErrorKind::Interrupted {
                    return Err(err);
                }
                debug!("poll interrupted, {remaining:?} left");
            }
            0 => return Ok(false),
            _ => return Ok(true),
        }
    }
}

fn level_value(level: Level) -> u8 {
    match level {
        Level::Low => 0,
        Level::High => 1,
    }
}

impl GpioPin for CdevPin {
    type Error = CdevPinError;

    fn configure_output(&mut self, initial: Level) -> Result<(), Self::Error> {
        self.request = Request::Released;
        let handle = self
            .line
            .request(LineRequestFlags::OUTPUT, level_value(initial), TRIG_CONSUMER)?;
        self.request = Request::Output(handle);
        Ok(())
    }

    fn set_level(&mut self, level: Level) -> Result<(), Self::Error> {
        match &self.request {
            Request::Output(handle) => Ok(handle.set_value(level_value(level))?),
            _ => Err(CdevPinError::NotOutput(self.line.offset())),
        }
    }

    fn configure_input(&mut self, pull: Pull, edge: Edge) -> Result<(), Self::Error> {
        // the v1 uAPI has no bias flags, the pull-down has to be on the board
        debug!("line {}: {pull:?} requested, leaving bias to the wiring", self.line.offset());
        let events = match edge {
            Edge::Rising => EventRequestFlags::RISING_EDGE,
            Edge::Falling => EventRequestFlags::FALLING_EDGE,
            Edge::Both => EventRequestFlags::BOTH_EDGES,
        };
        self.request = Request::Released;
        let handle = self.line.events(LineRequestFlags::INPUT, events, ECHO_CONSUMER)?;
        self.request = Request::Input(handle);
        Ok(())
    }

    fn wait_for_edge(&mut self, timeout: Duration) -> bool {
        let offset = self.line.offset();
        let events = match &mut self.request {
            Request::Input(events) => events,
            _ => {
                warn!("line {offset}: edge wait on a line not requested for events");
                return false;
            }
        };

        match poll_with_timeout(events.as_raw_fd(), timeout) {
            Ok(true) => {}
            Ok(false) => return false,
            Err(e) => {
                warn!("line {offset}: poll failed: {e}");
                return false;
            }
        }

        match events.get_event() {
            Ok(event) => {
                let kind = match event.event_type() {
                    EventType::RisingEdge => "rising",
                    EventType::FallingEdge => "falling",
                };
                debug!("line {offset}: {kind} edge at {}ns", event.timestamp());
                true
            }
            Err(e) => {
                warn!("line {offset}: reading edge event failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::thread::JoinHandleExt;
    use std::thread;

    fn pipe() -> (i32, i32) {
        let mut fds = [0; 2];
        // SAFETY: fds has room for the two descriptors.
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        (fds[0], fds[1])
    }

    fn close(fds: &[i32]) {
        for &fd in fds {
            // SAFETY: each descriptor came from pipe() and is closed once.
            unsafe { libc::close(fd) };
        }
    }

    extern "C" fn ignore(_: libc::c_int) {}

    /// SIGUSR1 handler without SA_RESTART, so a blocked poll fails with EINTR.
    fn interrupt_on_sigusr1() {
        // SAFETY: zeroed sigaction is a valid empty action; the handler does nothing.
        unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = ignore as extern "C" fn(libc::c_int) as libc::sighandler_t;
            libc::sigemptyset(&mut action.sa_mask);
            assert_eq!(libc::sigaction(libc::SIGUSR1, &action, std::ptr::null_mut()), 0);
        }
    }

    #[test]
    fn poll_times_out_on_a_quiet_fd() {
        let (rx, tx) = pipe();
        let started = Instant::now();
        assert!(!poll_with_timeout(rx, Duration::from_millis(30)).unwrap());
        // the remainder is rounded down to whole milliseconds
        assert!(started.elapsed() >= Duration::from_millis(25));
        close(&[rx, tx]);
    }

    #[test]
    fn poll_sees_readable_fd() {
        let (rx, tx) = pipe();
        // SAFETY: writes one byte from a live buffer.
        assert_eq!(unsafe { libc::write(tx, b"x".as_ptr().cast(), 1) }, 1);
        assert!(poll_with_timeout(rx, Duration::from_millis(30)).unwrap());
        close(&[rx, tx]);
    }

    #[test]
    fn poll_resumes_after_a_signal() {
        interrupt_on_sigusr1();
        let (rx, tx) = pipe();

        let waiter = thread::spawn(move || poll_with_timeout(rx, Duration::from_secs(5)));
        thread::sleep(Duration::from_millis(50));
        // SAFETY: the waiter thread is still running, it has a 5s budget.
        unsafe { libc::pthread_kill(waiter.as_pthread_t(), libc::SIGUSR1) };
        thread::sleep(Duration::from_millis(50));
        // SAFETY: writes one byte from a live buffer.
        assert_eq!(unsafe { libc::write(tx, b"x".as_ptr().cast(), 1) }, 1);

        assert!(waiter.join().unwrap().unwrap());
        close(&[rx, tx]);
    }
}
