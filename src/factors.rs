//! Conversion factors between output period and measured quantity.
//!
//! The HLW8012 datasheet gives the output frequencies as proportional to the
//! RMS current, RMS voltage and active power seen on its inputs. Inverting those
//! relations gives, for each quantity, the value it takes when the output period
//! is one microsecond. Dividing a factor by a measured period in microseconds
//! yields the physical quantity.

/// Internal voltage reference, in volts.
pub const V_REF: f32 = 2.43;

/// Current sense resistor of the reference design (1 mOhm, ~30 A full scale).
pub const R_CURRENT: f32 = 0.001;

/// Voltage divider ratio of the reference design: 5x 470k upstream, 1k downstream.
pub const R_VOLTAGE: f32 = 2351.0;

/// Frequency of the HLW8012 internal oscillator, in Hz.
pub const F_OSC: f32 = 3_579_000.0;

const US_PER_S: f32 = 1_000_000.0;

/// Electrical parameters the default factors are computed from.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FactorConfig {
    /// Internal voltage reference, in volts
    pub v_ref: f32,
    /// Current sense resistor, in ohms
    pub current_resistor: f32,
    /// Voltage divider ratio, (upstream + downstream) / downstream
    pub voltage_ratio: f32,
    /// Chip oscillator frequency, in Hz
    pub f_osc: f32,
}

impl Default for FactorConfig {
    fn default() -> Self {
        Self {
            v_ref: V_REF,
            current_resistor: R_CURRENT,
            voltage_ratio: R_VOLTAGE,
            f_osc: F_OSC,
        }
    }
}

impl FactorConfig {
    /// Builds a config for a board with the given sense resistor and voltage divider.
    ///
    /// Returns `None` when the resistor values cannot describe a real circuit, that is
    /// when either the current resistor or the downstream divider resistor is not
    /// strictly positive.
    pub fn with_resistors(
        self,
        current: f32,
        voltage_upstream: f32,
        voltage_downstream: f32,
    ) -> Option<Self> {
        if voltage_downstream > 0.0 && current > 0.0 {
            Some(Self {
                current_resistor: current,
                voltage_ratio: (voltage_upstream + voltage_downstream) / voltage_downstream,
                ..self
            })
        } else {
            None
        }
    }
}

/// Quantity value at an output period of one microsecond, for each output.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Factors {
    /// Amperes x microseconds
    pub current: f32,
    /// Volts x microseconds
    pub voltage: f32,
    /// Watts x microseconds
    pub power: f32,
}

impl Factors {
    /// Datasheet factors for the given electrical parameters.
    ///
    /// For the reference design a 1 Hz output means roughly 15 mA on CF1 in current
    /// mode, 0.41 V on CF1 in voltage mode and 10 W on CF.
    pub fn from_config(config: &FactorConfig) -> Self {
        let FactorConfig {
            v_ref,
            current_resistor,
            voltage_ratio,
            f_osc,
        } = *config;

        Self {
            current: US_PER_S * 512.0 * v_ref / current_resistor / 24.0 / f_osc,
            voltage: US_PER_S * 512.0 * v_ref * voltage_ratio / 2.0 / f_osc,
            power: US_PER_S * 128.0 * v_ref * v_ref * voltage_ratio / current_resistor
                / 48.0
                / f_osc,
        }
    }
}

impl Default for Factors {
    fn default() -> Self {
        Self::from_config(&FactorConfig::default())
    }
}

/// `factor / width`, or zero when no pulse width is known.
#[inline]
pub(crate) fn quantity(factor: f32, width_us: u32) -> f32 {
    if width_us == 0 {
        0.0
    } else {
        factor / width_us as f32
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        ((a - b) / b).abs() < 1e-5
    }

    #[test]
    fn reference_design_factors() {
        let factors = Factors::default();

        let current = 1_000_000.0 * 512.0 * 2.43 / 0.001 / 24.0 / 3_579_000.0;
        let voltage = 1_000_000.0 * 512.0 * 2.43 * 2351.0 / 2.0 / 3_579_000.0;
        let power = 1_000_000.0 * 128.0 * 2.43 * 2.43 * 2351.0 / 0.001 / 48.0 / 3_579_000.0;

        assert!(close(factors.current, current));
        assert!(close(factors.voltage, voltage));
        assert!(close(factors.power, power));

        // A 1 Hz output: ~15 mA, ~0.41 V, ~10 W.
        assert!((factors.current / 1_000_000.0 - 0.0145).abs() < 0.0005);
        assert!((factors.voltage / 1_000_000.0 - 0.409).abs() < 0.001);
        assert!((factors.power / 1_000_000.0 - 10.34).abs() < 0.01);
    }

    #[test]
    fn quantity_divides_factor_by_width() {
        assert_eq!(quantity(1000.0, 4), 250.0);
        assert_eq!(quantity(408_636.5, 1), 408_636.5);
        assert_eq!(quantity(1000.0, 0), 0.0);
    }

    #[test]
    fn resistors_change_ratio() {
        let config = FactorConfig::default()
            .with_resistors(0.002, 2_350_000.0, 1_000.0)
            .unwrap();
        assert_eq!(config.current_resistor, 0.002);
        assert_eq!(config.voltage_ratio, 2351.0);

        let halved = Factors::from_config(&config);
        let reference = Factors::default();
        assert!(close(halved.current, reference.current / 2.0));
        assert!(close(halved.voltage, reference.voltage));
        assert!(close(halved.power, reference.power / 2.0));
    }

    #[test]
    fn zero_downstream_resistor_is_rejected() {
        assert_eq!(
            FactorConfig::default().with_resistors(0.001, 2_350_000.0, 0.0),
            None
        );
        assert_eq!(
            FactorConfig::default().with_resistors(0.0, 2_350_000.0, 1_000.0),
            None
        );
    }
}
