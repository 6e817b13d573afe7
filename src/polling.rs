use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::clock::{elapsed_us, pulse_in, Clock};
use crate::driver::Acquisition;
use crate::mode::{Mode, ModeSelect};
use crate::store::PulseStore;

/// Suggested interval between [`Polling::handle`] calls.
///
/// The chip needs time after a mode change before CF1 carries the new quantity.
pub const READING_INTERVAL_US: u32 = 3_000_000;

/// Acquisition by measuring single pulses on CF and CF1, busy waiting.
///
/// Only the high half of a period is timed, so measured widths are doubled before they
/// are stored.
pub struct Polling<CF, CF1, SEL, CLK> {
    cf: CF,
    cf1: CF1,
    select: ModeSelect<SEL>,
    clock: CLK,
    store: PulseStore,
    timeout_us: u32,
    last_reading_us: u32,
}

impl<CF, CF1, SEL, CLK, E> Polling<CF, CF1, SEL, CLK>
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
    /// * `cf`: The CF (active power) output of the chip.
    /// * `cf1`: The CF1 (current or voltage) output of the chip.
    /// * `sel`: The pin driving SEL; it is set to `current_level` right away.
    /// * `clock`: The microsecond time source.
    /// * `current_level`: The SEL level that selects current on this board.
    /// * `timeout_us`: Longest time a single pulse measurement may block.
    pub fn new(
        cf: CF,
        cf1: CF1,
        sel: SEL,
        clock: CLK,
        current_level: PinState,
        timeout_us: u32,
    ) -> Result<Self, E> {
        let select = ModeSelect::new(sel, current_level)?;
        let last_reading_us = clock.now_us();

        Ok(Self {
            cf,
            cf1,
            select,
            clock,
            store: PulseStore::new(),
            timeout_us,
            last_reading_us,
        })
    }

    /// Measures CF1 and switches SEL to the other quantity, unless less than
    /// `interval_us` passed since the previous measurement.
    ///
    /// returns: whether a measurement was taken
    pub fn handle(&mut self, interval_us: u32) -> Result<bool, E> {
        let now = self.clock.now_us();
        if elapsed_us(self.last_reading_us, now) < interval_us {
            return Ok(false);
        }
        self.last_reading_us = now;

        let width = pulse_in(&mut self.cf1, &self.clock, self.timeout_us)?.saturating_mul(2);
        self.store.set_shared_width(self.select.mode(), width);

        let mode = self.select.toggle()?;
        self.store.set_mode(mode);

        Ok(true)
    }

    pub(crate) fn store(&self) -> &PulseStore {
        &self.store
    }

    /// Gives back the pins and the clock.
    pub fn release(self) -> (CF, CF1, SEL, CLK) {
        (self.cf, self.cf1, self.select.release(), self.clock)
    }
}

impl<CF, CF1, SEL, CLK, E> Acquisition for Polling<CF, CF1, SEL, CLK>
where
    CF: InputPin<Error = E>,
    CF1: InputPin<Error = E>,
    SEL: OutputPin<Error = E>,
    CLK: Clock,
{
    type Error = E;

    fn current_width(&mut self) -> u32 {
        self.store.current_width()
    }

    fn voltage_width(&mut self) -> u32 {
        self.store.voltage_width()
    }

    fn power_width(&mut self) -> Result<u32, E> {
        let width = pulse_in(&mut self.cf, &self.clock, self.timeout_us)?.saturating_mul(2);
        self.store.set_power_width(width);
        Ok(width)
    }

    fn mode(&self) -> Mode {
        self.select.mode()
    }
}
