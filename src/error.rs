use std::fmt;

use thiserror::Error;

/// Which of the two module lines an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRole {
    Echo,
    Trigger,
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinRole::Echo => f.write_str("echo"),
            PinRole::Trigger => f.write_str("trigger"),
        }
    }
}

#[derive(Debug, Error)]
pub enum HcSr04Error {
    /// The pin name has no binding in the registry.
    #[error("no GPIO {role} pin named: {name}")]
    PinNotFound { role: PinRole, name: String },

    /// The backend rejected a mode, bias or edge configuration, or a level write.
    #[error("configuring GPIO {role} pin {name}")]
    PinConfiguration {
        role: PinRole,
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No rising edge on the echo line after the trigger pulse.
    #[error("no timing signal detected")]
    NoSignal,

    /// The echo line rose but never fell within the timeout.
    #[error("timing signal exceeded valid duration")]
    SignalDurationExceeded,

    #[error("speed of sound must be a positive, finite number of m/s, got {0}")]
    InvalidSpeedOfSound(f64),

    #[error("speed of sound is not a number of m/s: {0:?}")]
    UnparsableSpeedOfSound(String),

    #[error("invalid sensor configuration: {0}")]
    InvalidConfig(&'static str),
}

impl HcSr04Error {
    pub(crate) fn configuration<E>(role: PinRole, name: &str, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HcSr04Error::PinConfiguration {
            role,
            name: name.to_owned(),
            source: Box::new(source),
        }
    }
}
