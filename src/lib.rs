//!
//! A platform-agnostic driver for the HLW8012 single-phase energy metering device. Built using embedded-hal.
//!
//! The HLW8012 reports active power as a pulse train on its CF output, and RMS current or
//! RMS voltage on its CF1 output depending on the level of its SEL input. The output
//! frequencies are proportional to the measured quantities, so this driver times the
//! pulses and turns periods into amperes, volts and watts.
//!
//! Two acquisition regimes are available, chosen at construction:
//!
//! * Polling, see [`HLW8012Driver::new_polling`]: call
//!   [`handle`](HLW8012Driver::handle) periodically. Each call times one pulse on CF1 and
//!   switches SEL to the other quantity. Reading the active power times one pulse on CF.
//!   Both measurements busy wait.
//! * Interrupts, see [`HLW8012Driver::new_interrupt`]: the platform calls
//!   [`EdgeCapture::on_power_edge`] and [`EdgeCapture::on_shared_line_edge`] from its CF
//!   and CF1 edge interrupts. SEL is switched every [`SWITCH_COUNT`] CF1 edges. Readings
//!   of a line that stopped producing edges drop to zero after
//!   [`PULSE_TIMEOUT_US`].
//!
//! Conversion factors default to the datasheet values for the reference design and can be
//! adjusted at runtime against a known load with
//! [`expected_current`](HLW8012Driver::expected_current),
//! [`expected_voltage`](HLW8012Driver::expected_voltage) and
//! [`expected_active_power`](HLW8012Driver::expected_active_power). Persisting them across
//! restarts is left to the application, using the multiplier getters and setters.
//!
//! ```ignore
//! use hlw8012::{HLW8012Config, HLW8012Driver, PulseStore};
//!
//! static STORE: PulseStore = PulseStore::new();
//!
//! let (mut meter, capture) =
//!     HLW8012Driver::new_interrupt(&STORE, sel_pin, clock, HLW8012Config::default())?;
//! // hand `capture` to the CF / CF1 interrupt handlers, then:
//! let power = meter.get_active_power()?;
//! let voltage = meter.get_line_voltage()?;
//! ```
//!

#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod fmt;

pub mod clock;
pub mod driver;
pub mod factors;
pub mod interrupt;
pub mod mode;
pub mod polling;
pub mod store;

#[cfg(test)]
mod testing;

pub use clock::{pulse_in, Clock};
pub use driver::*;
pub use factors::{FactorConfig, Factors};
pub use interrupt::{EdgeCapture, EdgeTrigger, Interrupt, SWITCH_COUNT};
pub use mode::{Mode, ModeSelect};
pub use polling::{Polling, READING_INTERVAL_US};
pub use store::{PulseStore, SignalMonitor};
