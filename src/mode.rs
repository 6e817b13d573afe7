use embedded_hal::digital::{OutputPin, PinState};

/// The quantity carried by the shared CF1 output.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Current,
    Voltage,
}

impl Mode {
    pub fn toggled(self) -> Self {
        match self {
            Mode::Current => Mode::Voltage,
            Mode::Voltage => Mode::Current,
        }
    }
}

/// Drives the SEL pin of the chip.
///
/// The pin level always mirrors [`ModeSelect::mode`]: the mode only changes once the
/// new level has been written successfully.
pub struct ModeSelect<SEL> {
    pin: SEL,
    current_level: PinState,
    mode: Mode,
}

impl<SEL> ModeSelect<SEL>
where
    SEL: OutputPin,
{
    /// Takes the SEL pin and selects current mode.
    ///
    /// `current_level` is the pin level that selects current on this board.
    pub fn new(mut pin: SEL, current_level: PinState) -> Result<Self, SEL::Error> {
        pin.set_state(current_level)?;
        Ok(Self {
            pin,
            current_level,
            mode: Mode::Current,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub(crate) fn level(&self, mode: Mode) -> PinState {
        match mode {
            Mode::Current => self.current_level,
            Mode::Voltage => !self.current_level,
        }
    }

    /// Switches to the other quantity and returns the new mode.
    pub fn toggle(&mut self) -> Result<Mode, SEL::Error> {
        let next = self.mode.toggled();
        self.pin.set_state(self.level(next))?;
        self.mode = next;
        trace!("hlw8012: select {:?}", next);
        Ok(next)
    }

    pub fn release(self) -> SEL {
        self.pin
    }
}
