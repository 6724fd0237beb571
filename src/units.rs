//! Time of flight to distance conversion.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::HcSr04Error;

const MICROSECS_PER_SEC: f64 = 1_000_000.0;
const CM_PER_METER: f64 = 100.0;

/// Speed of sound in air, in meters per second.
///
/// The value is fixed for the lifetime of whatever holds it; there is no
/// temperature or humidity compensation.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct SpeedOfSound(f64);

impl SpeedOfSound {
    /// Sea level, nominal room temperature.
    pub const DEFAULT: SpeedOfSound = SpeedOfSound(344.0);

    pub fn new(meters_per_sec: f64) -> Result<Self, HcSr04Error> {
        if meters_per_sec.is_finite() && meters_per_sec > 0.0 {
            Ok(SpeedOfSound(meters_per_sec))
        } else {
            Err(HcSr04Error::InvalidSpeedOfSound(meters_per_sec))
        }
    }

    pub const fn meters_per_sec(self) -> f64 {
        self.0
    }

    /// Converts a round-trip echo duration in microseconds to the one-way
    /// distance in centimeters.
    ///
    /// `micros` is expected to be non-negative; negative input is not
    /// rejected and yields a negative distance.
    pub fn time_to_centimeters(self, micros: i64) -> f32 {
        let cm_per_sec = self.0 * CM_PER_METER;
        let cm_per_microsec = cm_per_sec / MICROSECS_PER_SEC;
        // the echo covers sensor -> target -> sensor
        let one_way = micros as f64 / 2.0;
        (one_way * cm_per_microsec) as f32
    }

    /// Echo duration expected for a target `centimeters` away. YMMV on real
    /// hardware, the module adds its own latency on top.
    ///
    /// Saturates at [`Duration::MAX`] for distances too far to represent.
    pub fn round_trip_time(self, centimeters: f32) -> Duration {
        let cm_per_sec = self.0 * CM_PER_METER;
        let secs = 2.0 * f64::from(centimeters.max(0.0)) / cm_per_sec;
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl Default for SpeedOfSound {
    fn default() -> Self {
        SpeedOfSound::DEFAULT
    }
}

impl fmt::Display for SpeedOfSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} m/s", self.0)
    }
}

impl FromStr for SpeedOfSound {
    type Err = HcSr04Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .trim_end_matches("m/s")
            .trim()
            .parse::<f64>()
            .map_err(|_| HcSr04Error::UnparsableSpeedOfSound(s.to_owned()))?;
        SpeedOfSound::new(value)
    }
}

/// [`SpeedOfSound::time_to_centimeters`] at [`SpeedOfSound::DEFAULT`], for
/// offline analysis without a sensor.
pub fn time_to_centimeters(micros: i64) -> f32 {
    SpeedOfSound::DEFAULT.time_to_centimeters(micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_second_round_trip_is_one_second_one_way() {
        assert_eq!(time_to_centimeters(2_000_000), 34400.0);

        let slow = SpeedOfSound::new(331.3).unwrap();
        assert_eq!(slow.time_to_centimeters(2_000_000), (331.3f64 * 100.0) as f32);
    }

    #[test]
    fn conversion_is_monotonic() {
        let samples = [0i64, 1, 2, 57, 58, 59, 100, 1_000, 23_529, 38_000, 1_000_000];
        for pair in samples.windows(2) {
            assert!(time_to_centimeters(pair[0]) <= time_to_centimeters(pair[1]));
        }
    }

    #[test]
    fn conversion_has_no_hidden_state() {
        let first = time_to_centimeters(5_831);
        for _ in 0..100 {
            assert_eq!(time_to_centimeters(5_831).to_bits(), first.to_bits());
        }
    }

    #[test]
    fn zero_time_is_zero_distance() {
        assert_eq!(time_to_centimeters(0), 0.0);
    }

    #[test]
    fn rejects_nonsense_speeds() {
        assert!(SpeedOfSound::new(0.0).is_err());
        assert!(SpeedOfSound::new(-343.0).is_err());
        assert!(SpeedOfSound::new(f64::NAN).is_err());
        assert!(SpeedOfSound::new(f64::INFINITY).is_err());
    }

    #[test]
    fn parses_with_or_without_unit() {
        assert_eq!("343".parse::<SpeedOfSound>().unwrap().meters_per_sec(), 343.0);
        assert_eq!(" 340.5 m/s ".parse::<SpeedOfSound>().unwrap().meters_per_sec(), 340.5);
        match "fast".parse::<SpeedOfSound>() {
            Err(err @ HcSr04Error::UnparsableSpeedOfSound(_)) => {
                assert_eq!(err.to_string(), "speed of sound is not a number of m/s: \"fast\"");
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
        assert!("0".parse::<SpeedOfSound>().is_err());
    }

    #[test]
    fn round_trip_time_inverts_conversion() {
        let rtt = SpeedOfSound::DEFAULT.round_trip_time(344.0);
        assert_eq!(rtt.as_micros(), 20_000);
        assert!((time_to_centimeters(rtt.as_micros() as i64) - 344.0).abs() < 0.01);
    }

    #[test]
    fn round_trip_time_saturates_for_huge_distances() {
        assert_eq!(SpeedOfSound::DEFAULT.round_trip_time(f32::MAX), Duration::MAX);
        assert_eq!(SpeedOfSound::DEFAULT.round_trip_time(f32::INFINITY), Duration::MAX);
        assert_eq!(SpeedOfSound::DEFAULT.round_trip_time(-5.0), Duration::ZERO);
    }
}
