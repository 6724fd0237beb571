//! Distance measurement with an HC-SR04 ultrasonic ranging module.
//!
//! The driver pulses the trigger line, waits for the echo line to rise and
//! then to fall, and turns the pulse width into a distance. Pin access goes
//! through the [`GpioPin`] and [`PinRegistry`] traits; the `cdev` feature
//! (on by default) provides a Linux GPIO character-device implementation and
//! [`sim`] provides simulated pins.
//!
//! ```no_run
//! # #[cfg(feature = "cdev")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use hcsr04_ranging::{cdev::CdevRegistry, HcSr04};
//!
//! let mut chip = CdevRegistry::open("/dev/gpiochip4")?;
//! let mut sensor = HcSr04::new(&mut chip, "20", "21")?;
//! let m = sensor.measure_distance()?;
//! println!("{:.1}cm ({}us)", m.centimeters(), m.microseconds());
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "cdev"))]
//! # fn main() {}
//! ```

#[cfg(feature = "cdev")]
pub mod cdev;
mod error;
mod measurement;
pub mod pin;
mod sensor;
pub mod sim;
mod units;

pub use error::{HcSr04Error, PinRole};
pub use measurement::Measurement;
pub use pin::{Edge, GpioPin, Level, PinRegistry, Pull};
pub use sensor::{EDGE_TIMEOUT, HcSr04, Phase, SensorConfig, TRIGGER_PULSE};
pub use units::{SpeedOfSound, time_to_centimeters};
