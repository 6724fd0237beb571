use std::time::{Duration, Instant};

use log::{debug, trace};

use crate::error::{HcSr04Error, PinRole};
use crate::measurement::Measurement;
use crate::pin::{Edge, GpioPin, Level, PinRegistry, Pull};
use crate::units::SpeedOfSound;

/// Datasheet minimum for the trigger pulse.
pub const TRIGGER_PULSE: Duration = Duration::from_micros(10);
/// Per phase: once for the echo to rise, once for it to fall.
pub const EDGE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    pub speed_of_sound: SpeedOfSound,
    /// How long the trigger line is held high.
    pub trigger_pulse: Duration,
    /// Timeout of each of the two edge waits.
    pub edge_timeout: Duration,
}

impl SensorConfig {
    pub const fn new(speed_of_sound: SpeedOfSound) -> Self {
        Self {
            speed_of_sound,
            trigger_pulse: TRIGGER_PULSE,
            edge_timeout: EDGE_TIMEOUT,
        }
    }

    pub const fn with_edge_timeout(mut self, edge_timeout: Duration) -> Self {
        self.edge_timeout = edge_timeout;
        self
    }

    pub const fn with_trigger_pulse(mut self, trigger_pulse: Duration) -> Self {
        self.trigger_pulse = trigger_pulse;
        self
    }

    pub fn validate(&self) -> Result<(), HcSr04Error> {
        if self.trigger_pulse < TRIGGER_PULSE {
            return Err(HcSr04Error::InvalidConfig(
                "trigger pulse is shorter than the 10us datasheet minimum",
            ));
        }
        if self.edge_timeout.is_zero() {
            return Err(HcSr04Error::InvalidConfig("edge timeout must be longer than zero"));
        }
        Ok(())
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig::new(SpeedOfSound::DEFAULT)
    }
}

/// Where a measurement is, or where the last one stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ArmedRising,
    WaitingRisingEdge,
    ArmedFalling,
    WaitingFallingEdge,
    Done,
    TimedOut,
    /// A pin rejected a reconfiguration or a level write.
    Aborted,
}

/// An HC-SR04 bound to an echo input and a trigger output.
///
/// Both pins belong to the sensor for its whole lifetime; nothing else may
/// drive or reconfigure them. Measurements take `&mut self`, so one sensor
/// can't be measured from two places at once.
pub struct HcSr04<P: GpioPin> {
    echo: P,
    trig: P,
    echo_name: String,
    trig_name: String,
    config: SensorConfig,
    phase: Phase,
}

impl<P: GpioPin> HcSr04<P> {
    /// Resolves and configures both pins with the default [`SensorConfig`].
    pub fn new<R>(registry: &mut R, echo: &str, trig: &str) -> Result<Self, HcSr04Error>
    where
        R: PinRegistry<Pin = P>,
    {
        Self::with_config(registry, echo, trig, SensorConfig::default())
    }

    pub fn with_config<R>(
        registry: &mut R,
        echo: &str,
        trig: &str,
        config: SensorConfig,
    ) -> Result<Self, HcSr04Error>
    where
        R: PinRegistry<Pin = P>,
    {
        config.validate()?;

        let mut echo_pin = registry.resolve(echo).ok_or_else(|| HcSr04Error::PinNotFound {
            role: PinRole::Echo,
            name: echo.to_owned(),
        })?;
        let mut trig_pin = registry.resolve(trig).ok_or_else(|| HcSr04Error::PinNotFound {
            role: PinRole::Trigger,
            name: trig.to_owned(),
        })?;

        trig_pin
            .configure_output(Level::Low)
            .map_err(|e| HcSr04Error::configuration(PinRole::Trigger, trig, e))?;
        // watch both edges once so nothing latched before we owned the line survives
        echo_pin
            .configure_input(Pull::PullDown, Edge::Both)
            .map_err(|e| HcSr04Error::configuration(PinRole::Echo, echo, e))?;

        debug!(
            "hc-sr04 ready: echo={echo} trigger={trig} speed_of_sound={} timeout={:?}",
            config.speed_of_sound, config.edge_timeout
        );

        Ok(Self {
            echo: echo_pin,
            trig: trig_pin,
            echo_name: echo.to_owned(),
            trig_name: trig.to_owned(),
            config,
            phase: Phase::Idle,
        })
    }

    pub fn config(&self) -> &SensorConfig {
        &self.config
    }

    /// Phase the previous [`measure_distance`](Self::measure_distance) call
    /// ended in: `Done`, `TimedOut`, or `Aborted` when a pin failed.
    pub fn last_phase(&self) -> Phase {
        self.phase
    }

    /// Runs one trigger-and-echo cycle.
    ///
    /// Blocks for at most two edge timeouts plus the trigger pulse. There is
    /// no retry and no pacing between calls: leave the module enough quiet
    /// time (the datasheet suggests 60ms) or a late echo of the previous
    /// burst may be timed instead.
    pub fn measure_distance(&mut self) -> Result<Measurement, HcSr04Error> {
        let result = self.trigger_and_time();
        if matches!(result, Err(HcSr04Error::PinConfiguration { .. })) {
            self.enter(Phase::Aborted);
        }
        result
    }

    fn trigger_and_time(&mut self) -> Result<Measurement, HcSr04Error> {
        self.enter(Phase::Idle);

        // drop any edge latched since the last call so it can't pass for this start
        self.arm_echo(Edge::Rising)?;
        self.enter(Phase::ArmedRising);

        self.pulse_trigger()?;

        self.enter(Phase::WaitingRisingEdge);
        if !self.echo.wait_for_edge(self.config.edge_timeout) {
            self.enter(Phase::TimedOut);
            return Err(HcSr04Error::NoSignal);
        }
        let start = Instant::now();

        self.arm_echo(Edge::Falling)?;
        self.enter(Phase::ArmedFalling);

        self.enter(Phase::WaitingFallingEdge);
        if !self.echo.wait_for_edge(self.config.edge_timeout) {
            self.enter(Phase::TimedOut);
            return Err(HcSr04Error::SignalDurationExceeded);
        }
        let end = Instant::now();

        self.enter(Phase::Done);
        let tof = end.duration_since(start);
        trace!("hc-sr04 echo {tof:?}");
        Ok(Measurement::new(tof, self.config.speed_of_sound))
    }

    fn arm_echo(&mut self, edge: Edge) -> Result<(), HcSr04Error> {
        self.echo
            .configure_input(Pull::PullDown, edge)
            .map_err(|e| HcSr04Error::configuration(PinRole::Echo, &self.echo_name, e))
    }

    fn pulse_trigger(&mut self) -> Result<(), HcSr04Error> {
        self.set_trig(Level::High)?;
        spin_sleep::sleep(self.config.trigger_pulse);
        self.set_trig(Level::Low)
    }

    fn set_trig(&mut self, level: Level) -> Result<(), HcSr04Error> {
        self.trig
            .set_level(level)
            .map_err(|e| HcSr04Error::configuration(PinRole::Trigger, &self.trig_name, e))
    }

    fn enter(&mut self, phase: Phase) {
        trace!("hc-sr04 {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}
