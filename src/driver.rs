use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::clock::Clock;
use crate::factors::{quantity, FactorConfig, Factors};
use crate::interrupt::{EdgeCapture, EdgeTrigger, Interrupt, SWITCH_COUNT};
use crate::mode::Mode;
use crate::polling::Polling;
use crate::store::PulseStore;

/// Longest time a blocking pulse measurement may take, and how long a line may stay
/// silent in interrupt regime before its readings drop to zero.
pub const PULSE_TIMEOUT_US: u32 = 2_000_000;

/// Source of pulse widths for the driver.
///
/// Implemented by [`Polling`] and by [`Interrupt`]. Widths are full output periods in
/// microseconds; zero means no signal.
pub trait Acquisition {
    type Error;

    fn current_width(&mut self) -> u32;

    fn voltage_width(&mut self) -> u32;

    fn power_width(&mut self) -> Result<u32, Self::Error>;

    /// The quantity CF1 is currently carrying.
    fn mode(&self) -> Mode;
}

#[derive(Copy, Clone, Debug)]
pub enum HLW8012Error<E> {
    Pin(E),
}

impl<E> From<E> for HLW8012Error<E> {
    fn from(e: E) -> Self {
        HLW8012Error::Pin(e)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct HLW8012Config {
    /// The SEL level that selects current measurement on CF1
    pub current_level: PinState,
    /// Parameters for the default conversion factors
    pub factors: FactorConfig,
    /// Bound on blocking pulse measurements and signal loss window, in microseconds
    pub pulse_timeout_us: u32,
    /// CF1 edges per mode in interrupt regime
    pub switch_count: u32,
    /// The edges the interrupt handlers are attached to
    pub edge_trigger: EdgeTrigger,
}

impl Default for HLW8012Config {
    fn default() -> Self {
        Self {
            current_level: PinState::High,
            factors: FactorConfig::default(),
            pulse_timeout_us: PULSE_TIMEOUT_US,
            switch_count: SWITCH_COUNT,
            edge_trigger: EdgeTrigger::AnyEdge,
        }
    }
}

pub struct HLW8012Driver<A> {
    acquisition: A,
    config: FactorConfig,
    factors: Factors,
    current: f32,
    voltage: f32,
    power: f32,
}

impl<CF, CF1, SEL, CLK, E> HLW8012Driver<Polling<CF, CF1, SEL, CLK>>
where
    CF: InputPin<Error = E>,
    CF1: InputPin<Error = E>,
    SEL: OutputPin<Error = E>,
    CLK: Clock,
{
    ///
    ///
    /// # Arguments
    ///
    /// * `cf`: The CF output of the chip (active power).
    /// * `cf1`: The CF1 output of the chip (current or voltage, depending on SEL).
    /// * `sel`: The pin connected to SEL. It is driven to `config.current_level` here.
    /// * `clock`: The microsecond time source used to time pulses.
    /// * `config`: Board wiring and calibration parameters.
    ///
    /// returns: Result<HLW8012Driver<Polling<CF, CF1, SEL, CLK>>, HLW8012Error<E>>
    pub fn new_polling(
        cf: CF,
        cf1: CF1,
        sel: SEL,
        clock: CLK,
        config: HLW8012Config,
    ) -> Result<Self, HLW8012Error<E>> {
        let acquisition = Polling::new(
            cf,
            cf1,
            sel,
            clock,
            config.current_level,
            config.pulse_timeout_us,
        )?;

        Ok(Self::with_acquisition(acquisition, config.factors))
    }

    /// Samples CF1 for the selected quantity and switches SEL, if at least
    /// `interval_us` passed since the last sample. Otherwise does nothing.
    pub fn handle(&mut self, interval_us: u32) -> Result<(), HLW8012Error<E>> {
        self.acquisition.handle(interval_us)?;
        Ok(())
    }

    /// Gives back the pins and the clock.
    pub fn release(self) -> (CF, CF1, SEL, CLK) {
        self.acquisition.release()
    }
}

impl<'a, CLK> HLW8012Driver<Interrupt<'a, CLK>>
where
    CLK: Clock + Clone,
{
    ///
    ///
    /// # Arguments
    ///
    /// * `store`: Storage shared with the interrupt handlers, usually a `static`.
    /// * `sel`: The pin connected to SEL. It is driven to `config.current_level` here.
    /// * `clock`: The microsecond time source, shared by both halves.
    /// * `config`: Board wiring and calibration parameters.
    ///
    /// returns: the driver and the [`EdgeCapture`] whose `on_power_edge` and
    /// `on_shared_line_edge` must be called from the CF and CF1 interrupt handlers on
    /// the edges given by `config.edge_trigger`.
    pub fn new_interrupt<SEL>(
        store: &'a PulseStore,
        sel: SEL,
        clock: CLK,
        config: HLW8012Config,
    ) -> Result<(Self, EdgeCapture<'a, SEL, CLK>), HLW8012Error<SEL::Error>>
    where
        SEL: OutputPin,
    {
        let capture = EdgeCapture::new(
            store,
            sel,
            clock.clone(),
            config.current_level,
            config.switch_count,
            config.edge_trigger,
        )?;
        let acquisition = Interrupt::new(
            store,
            clock,
            config.pulse_timeout_us,
            config.edge_trigger,
        );

        Ok((Self::with_acquisition(acquisition, config.factors), capture))
    }

    /// Active energy counted from CF edges since start or the last
    /// [`reset_energy`](Self::reset_energy), in watt-seconds.
    pub fn get_energy(&self) -> f32 {
        let edges = self.acquisition.store().energy_edges() as f32;
        let periods = edges / self.acquisition.edges_per_period() as f32;
        periods * self.factors.power / 1_000_000.0
    }

    pub fn reset_energy(&mut self) {
        self.acquisition.store().reset_energy_edges();
    }
}

impl<A> HLW8012Driver<A>
where
    A: Acquisition,
{
    fn with_acquisition(acquisition: A, config: FactorConfig) -> Self {
        let factors = Factors::from_config(&config);
        debug!(
            "hlw8012: factors I={} V={} P={}",
            factors.current,
            factors.voltage,
            factors.power
        );

        Self {
            acquisition,
            config,
            factors,
            current: 0.0,
            voltage: 0.0,
            power: 0.0,
        }
    }

    /// RMS current in amperes.
    ///
    /// Reads zero while the last active power reading is zero, so that noise on CF1 is
    /// not reported as current without a load.
    pub fn get_line_current(&mut self) -> Result<f32, HLW8012Error<A::Error>> {
        self.current = if self.power == 0.0 {
            0.0
        } else {
            quantity(self.factors.current, self.acquisition.current_width())
        };
        Ok(self.current)
    }

    /// RMS voltage in volts.
    pub fn get_line_voltage(&mut self) -> Result<f32, HLW8012Error<A::Error>> {
        self.voltage = quantity(self.factors.voltage, self.acquisition.voltage_width());
        Ok(self.voltage)
    }

    /// Active power in watts. Blocks for up to one CF period in polling regime.
    pub fn get_active_power(&mut self) -> Result<f32, HLW8012Error<A::Error>> {
        let width = self.acquisition.power_width()?;
        self.power = quantity(self.factors.power, width);
        Ok(self.power)
    }

    /// Product of RMS voltage and current, in volt-amperes.
    pub fn get_apparent_power(&mut self) -> Result<f32, HLW8012Error<A::Error>> {
        let current = self.get_line_current()?;
        let voltage = self.get_line_voltage()?;
        Ok(voltage * current)
    }

    /// Ratio of active to apparent power, within 0.0..=1.0.
    ///
    /// Reads 1.0 whenever the active power exceeds the apparent power, including when no
    /// apparent power is known yet.
    pub fn get_power_factor(&mut self) -> Result<f32, HLW8012Error<A::Error>> {
        let active = self.get_active_power()?;
        let apparent = self.get_apparent_power()?;

        Ok(if active > apparent {
            1.0
        } else if apparent == 0.0 {
            0.0
        } else {
            active / apparent
        })
    }

    /// Scales the current factor so that the present reading becomes `expected`.
    ///
    /// Does nothing if the current reads zero.
    pub fn expected_current(&mut self, expected: f32) -> Result<(), HLW8012Error<A::Error>> {
        if self.current == 0.0 {
            self.get_line_current()?;
        }
        if let Some(factor) = recalibrate(self.factors.current, self.current, expected) {
            debug!("hlw8012: current factor {} -> {}", self.factors.current, factor);
            self.factors.current = factor;
        }
        Ok(())
    }

    /// Scales the voltage factor so that the present reading becomes `expected`.
    ///
    /// Does nothing if the voltage reads zero.
    pub fn expected_voltage(&mut self, expected: f32) -> Result<(), HLW8012Error<A::Error>> {
        if self.voltage == 0.0 {
            self.get_line_voltage()?;
        }
        if let Some(factor) = recalibrate(self.factors.voltage, self.voltage, expected) {
            debug!("hlw8012: voltage factor {} -> {}", self.factors.voltage, factor);
            self.factors.voltage = factor;
        }
        Ok(())
    }

    /// Scales the power factor so that the present reading becomes `expected`.
    ///
    /// Does nothing if the active power reads zero.
    pub fn expected_active_power(&mut self, expected: f32) -> Result<(), HLW8012Error<A::Error>> {
        if self.power == 0.0 {
            self.get_active_power()?;
        }
        if let Some(factor) = recalibrate(self.factors.power, self.power, expected) {
            debug!("hlw8012: power factor {} -> {}", self.factors.power, factor);
            self.factors.power = factor;
        }
        Ok(())
    }

    pub fn get_current_multiplier(&self) -> f32 {
        self.factors.current
    }

    pub fn get_voltage_multiplier(&self) -> f32 {
        self.factors.voltage
    }

    pub fn get_power_multiplier(&self) -> f32 {
        self.factors.power
    }

    pub fn set_current_multiplier(&mut self, factor: f32) {
        self.factors.current = factor;
    }

    pub fn set_voltage_multiplier(&mut self, factor: f32) {
        self.factors.voltage = factor;
    }

    pub fn set_power_multiplier(&mut self, factor: f32) {
        self.factors.power = factor;
    }

    pub fn factors(&self) -> Factors {
        self.factors
    }

    pub fn factor_config(&self) -> FactorConfig {
        self.config
    }

    /// Changes the sense resistor and voltage divider and recomputes the default factors,
    /// dropping any runtime calibration.
    ///
    /// Ignored unless both `current` and `voltage_downstream` are positive.
    pub fn set_resistors(&mut self, current: f32, voltage_upstream: f32, voltage_downstream: f32) {
        match self
            .config
            .with_resistors(current, voltage_upstream, voltage_downstream)
        {
            Some(config) => {
                self.config = config;
                self.reset_factors();
            }
            None => warn!(
                "hlw8012: ignoring resistors {} {} {}",
                current,
                voltage_upstream,
                voltage_downstream
            ),
        }
    }

    /// Drops runtime calibration and goes back to the datasheet factors.
    pub fn reset_factors(&mut self) {
        self.factors = Factors::from_config(&self.config);
        debug!(
            "hlw8012: factors I={} V={} P={}",
            self.factors.current,
            self.factors.voltage,
            self.factors.power
        );
    }

    /// The quantity CF1 is currently carrying.
    pub fn mode(&self) -> Mode {
        self.acquisition.mode()
    }
}

fn recalibrate(factor: f32, measured: f32, expected: f32) -> Option<f32> {
    if measured > 0.0 {
        Some(factor * (expected / measured))
    } else {
        warn!("hlw8012: cannot calibrate against a zero reading");
        None
    }
}

#[cfg(feature = "std")]
impl<E> std::fmt::Display for HLW8012Error<E>
where
    E: std::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HLW8012Error::Pin(pin) => write!(f, "Pin Error: {pin:?}"),
        }
    }
}

#[cfg(feature = "std")]
impl<E> std::error::Error for HLW8012Error<E>
where
    E: std::fmt::Debug,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
