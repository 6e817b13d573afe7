//! Simulated time and pins for unit tests.

use core::cell::Cell;
use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

use crate::clock::Clock;

/// Clock that moves forward by `step` microseconds every time it is read.
pub struct SimClock {
    now: Cell<u32>,
    step: u32,
}

impl SimClock {
    pub fn stepping(step: u32) -> Self {
        Self {
            now: Cell::new(0),
            step,
        }
    }

    pub fn set(&self, now: u32) {
        self.now.set(now);
    }

    pub fn advance(&self, us: u32) {
        self.now.set(self.now.get().wrapping_add(us));
    }

    /// Current time, without stepping.
    pub fn peek(&self) -> u32 {
        self.now.get()
    }
}

impl Clock for SimClock {
    fn now_us(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }
}

fn wave_level(now: u32, (period, high): (u32, u32)) -> bool {
    now % period < high
}

/// Input that is high for the first `high` microseconds of every `period`.
pub struct SquareWave<'a> {
    clock: &'a SimClock,
    shape: (u32, u32),
    flat: Option<bool>,
}

impl<'a> SquareWave<'a> {
    pub fn new(clock: &'a SimClock, period: u32, high: u32) -> Self {
        Self {
            clock,
            shape: (period, high),
            flat: None,
        }
    }

    pub fn flat(clock: &'a SimClock, level: bool) -> Self {
        Self {
            clock,
            shape: (1, 0),
            flat: Some(level),
        }
    }
}

impl ErrorType for SquareWave<'_> {
    type Error = Infallible;
}

impl InputPin for SquareWave<'_> {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self
            .flat
            .unwrap_or_else(|| wave_level(self.clock.peek(), self.shape)))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.is_high()?)
    }
}

/// CF1 as seen by the host: the wave shape depends on the level of SEL.
pub struct MuxWave<'a> {
    clock: &'a SimClock,
    select: &'a SelectLine,
    when_high: (u32, u32),
    when_low: (u32, u32),
}

impl<'a> MuxWave<'a> {
    pub fn new(
        clock: &'a SimClock,
        select: &'a SelectLine,
        when_high: (u32, u32),
        when_low: (u32, u32),
    ) -> Self {
        Self {
            clock,
            select,
            when_high,
            when_low,
        }
    }
}

impl ErrorType for MuxWave<'_> {
    type Error = Infallible;
}

impl InputPin for MuxWave<'_> {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        let shape = match self.select.state() {
            PinState::High => self.when_high,
            PinState::Low => self.when_low,
        };
        Ok(wave_level(self.clock.peek(), shape))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.is_high()?)
    }
}

/// Records what is written to the SEL pin.
pub struct SelectLine {
    state: Cell<PinState>,
    writes: Cell<u32>,
}

impl SelectLine {
    pub fn new() -> Self {
        Self {
            state: Cell::new(PinState::Low),
            writes: Cell::new(0),
        }
    }

    pub fn pin(&self) -> SelectPin<'_> {
        SelectPin(self)
    }

    pub fn state(&self) -> PinState {
        self.state.get()
    }

    pub fn writes(&self) -> u32 {
        self.writes.get()
    }
}

pub struct SelectPin<'a>(&'a SelectLine);

impl SelectPin<'_> {
    fn write(&mut self, state: PinState) {
        self.0.state.set(state);
        self.0.writes.set(self.0.writes.get() + 1);
    }
}

impl ErrorType for SelectPin<'_> {
    type Error = Infallible;
}

impl OutputPin for SelectPin<'_> {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.write(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.write(PinState::High);
        Ok(())
    }
}
