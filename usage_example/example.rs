use hcsr04_ranging::cdev::{CdevRegistry, DEFAULT_CHIP};
use hcsr04_ranging::{HcSr04, HcSr04Error, SensorConfig, SpeedOfSound};
use std::{thread::sleep, time::Duration};

const ECHO_PIN: &str = "20"; // GPIO20
const TRIG_PIN: &str = "21"; // GPIO21

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let speed_of_sound = match std::env::var("HCSR04_SPEED_OF_SOUND") {
        Ok(val) => val.parse::<SpeedOfSound>()?,
        Err(_) => SpeedOfSound::DEFAULT,
    };
    // 4m is the datasheet range; anything further is as good as no echo
    let timeout = speed_of_sound.round_trip_time(400.0) * 2;
    let config = SensorConfig::new(speed_of_sound).with_edge_timeout(timeout);

    let mut chip = CdevRegistry::open(DEFAULT_CHIP)?;
    let mut hcsr04 = HcSr04::with_config(&mut chip, ECHO_PIN, TRIG_PIN, config)?;

    loop {
        match hcsr04.measure_distance() {
            Ok(m) => println!(
                "Distance: {:05.2}cm ({:.2}in, {}us)",
                m.centimeters(),
                m.inches(),
                m.microseconds()
            ),
            Err(e @ (HcSr04Error::NoSignal | HcSr04Error::SignalDurationExceeded)) => {
                eprintln!("{e}")
            }
            Err(e) => return Err(e.into()),
        }
        sleep(Duration::from_secs_f32(0.2));
    }
}
