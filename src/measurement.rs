use std::fmt;
use std::time::Duration;

use crate::units::SpeedOfSound;

const CM_PER_INCH: f32 = 2.54;

/// A single echo timing taken by [`HcSr04::measure_distance`](crate::HcSr04::measure_distance).
///
/// Holds the full round-trip time between the rising and falling edge of the
/// echo line, together with the speed of sound the sensor was configured with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    time_of_flight: Duration,
    speed_of_sound: SpeedOfSound,
}

impl Measurement {
    pub(crate) fn new(time_of_flight: Duration, speed_of_sound: SpeedOfSound) -> Self {
        Self {
            time_of_flight,
            speed_of_sound,
        }
    }

    pub fn centimeters(&self) -> f32 {
        self.speed_of_sound.time_to_centimeters(self.microseconds())
    }

    pub fn inches(&self) -> f32 {
        self.centimeters() / CM_PER_INCH
    }

    /// Raw time of flight, truncated to whole microseconds.
    pub fn microseconds(&self) -> i64 {
        i64::try_from(self.time_of_flight.as_micros()).unwrap_or(i64::MAX)
    }

    /// Raw time of flight, truncated to whole milliseconds.
    pub fn milliseconds(&self) -> i64 {
        i64::try_from(self.time_of_flight.as_millis()).unwrap_or(i64::MAX)
    }

    pub fn time_of_flight(&self) -> Duration {
        self.time_of_flight
    }

    pub fn speed_of_sound(&self) -> SpeedOfSound {
        self.speed_of_sound
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}cm", self.centimeters())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::time_to_centimeters;

    fn tof(micros: u64) -> Measurement {
        Measurement::new(Duration::from_micros(micros), SpeedOfSound::DEFAULT)
    }

    #[test]
    fn inches_follow_centimeters() {
        for micros in [0u64, 1, 150, 5_831, 23_529, 1_000_000] {
            let m = tof(micros);
            assert_eq!(m.inches(), time_to_centimeters(micros as i64) / 2.54);
            assert_eq!(m.centimeters(), time_to_centimeters(micros as i64));
        }
    }

    #[test]
    fn accessors_truncate() {
        let m = Measurement::new(Duration::from_nanos(1_999_999_999), SpeedOfSound::DEFAULT);
        assert_eq!(m.microseconds(), 1_999_999);
        assert_eq!(m.milliseconds(), 1_999);

        let short = Measurement::new(Duration::from_nanos(999), SpeedOfSound::DEFAULT);
        assert_eq!(short.microseconds(), 0);
        assert_eq!(short.milliseconds(), 0);
    }

    #[test]
    fn uses_its_own_speed_of_sound() {
        let speed = SpeedOfSound::new(300.0).unwrap();
        let m = Measurement::new(Duration::from_secs(2), speed);
        assert_eq!(m.centimeters(), 30_000.0);
        assert_eq!(m.speed_of_sound(), speed);
    }

    #[test]
    fn displays_centimeters() {
        assert_eq!(tof(2_000_000).to_string(), "34400.00cm");
    }
}
