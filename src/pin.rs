//! The GPIO capabilities the driver needs from a platform.
//!
//! A backend resolves pin names to handles and lets the driver drive an
//! output line and block on edges of an input line. [`crate::sim`] and, with
//! the `cdev` feature, [`crate::cdev`] implement these traits.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Input bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    PullDown,
}

/// Which transitions of an input line are reported by [`GpioPin::wait_for_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
    Both,
}

impl Edge {
    /// Whether a transition from `from` to `to` is one this edge watches for.
    pub fn matches(self, from: Level, to: Level) -> bool {
        match (from, to) {
            (Level::Low, Level::High) => matches!(self, Edge::Rising | Edge::Both),
            (Level::High, Level::Low) => matches!(self, Edge::Falling | Edge::Both),
            _ => false,
        }
    }
}

pub trait GpioPin {
    type Error: std::error::Error + Send + Sync + 'static;

    fn configure_output(&mut self, initial: Level) -> Result<(), Self::Error>;

    /// Drives an output-configured line.
    fn set_level(&mut self, level: Level) -> Result<(), Self::Error>;

    /// Configures the line as an input watching `edge`. Any edge latched
    /// under a previous configuration must be discarded.
    fn configure_input(&mut self, pull: Pull, edge: Edge) -> Result<(), Self::Error>;

    /// Blocks until the watched edge occurs (`true`) or `timeout` elapses
    /// (`false`).
    fn wait_for_edge(&mut self, timeout: Duration) -> bool;
}

pub trait PinRegistry {
    type Pin: GpioPin;

    /// Looks a pin up by its platform name, e.g. a BCM line number as a string.
    fn resolve(&mut self, name: &str) -> Option<Self::Pin>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_matching() {
        assert!(Edge::Rising.matches(Level::Low, Level::High));
        assert!(!Edge::Rising.matches(Level::High, Level::Low));
        assert!(Edge::Falling.matches(Level::High, Level::Low));
        assert!(!Edge::Falling.matches(Level::Low, Level::High));
        assert!(Edge::Both.matches(Level::Low, Level::High));
        assert!(Edge::Both.matches(Level::High, Level::Low));
        assert!(!Edge::Both.matches(Level::High, Level::High));
    }
}
