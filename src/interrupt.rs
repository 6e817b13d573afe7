//! Acquisition from edge interrupts on CF and CF1.
//!
//! The work is split in two halves sharing a [`PulseStore`]:
//!
//! * [`EdgeCapture`] is called from the platform's interrupt handlers. It owns the SEL
//!   pin and is the only writer of pulse widths, mode and edge counters.
//! * [`Interrupt`] is the reading half held by the driver in the main context. It
//!   never touches a pin and only writes the store to hand back the power edge counter
//!   and to zero widths of a line that went silent.

use core::convert::Infallible;

use embedded_hal::digital::{OutputPin, PinState};

use crate::clock::{elapsed_us, Clock};
use crate::driver::Acquisition;
use crate::mode::{Mode, ModeSelect};
use crate::store::{PulseStore, SignalMonitor};

/// Number of CF1 edges per mode before switching SEL.
///
/// Switching less often hides the settling time of the chip after a mode change, at
/// the cost of slower updates for each quantity.
pub const SWITCH_COUNT: u32 = 100;

/// Which edges the platform dispatches to the edge callbacks.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeTrigger {
    /// Rising and falling edges; each delta is half an output period.
    AnyEdge,
    Rising,
    Falling,
}

impl EdgeTrigger {
    /// Edges seen per output period.
    pub fn edges_per_period(self) -> u32 {
        match self {
            EdgeTrigger::AnyEdge => 2,
            EdgeTrigger::Rising | EdgeTrigger::Falling => 1,
        }
    }
}

/// Writer half, driven by the CF and CF1 interrupt handlers.
pub struct EdgeCapture<'a, SEL, CLK> {
    store: &'a PulseStore,
    select: ModeSelect<SEL>,
    clock: CLK,
    switch_count: u32,
    edges_per_period: u32,
    last_power_edge_us: u32,
    last_shared_edge_us: u32,
    interval_edges: u32,
}

impl<'a, SEL, CLK> EdgeCapture<'a, SEL, CLK>
where
    SEL: OutputPin,
    CLK: Clock,
{
    pub(crate) fn new(
        store: &'a PulseStore,
        sel: SEL,
        clock: CLK,
        current_level: PinState,
        switch_count: u32,
        trigger: EdgeTrigger,
    ) -> Result<Self, SEL::Error> {
        let select = ModeSelect::new(sel, current_level)?;
        store.set_mode(select.mode());
        let now = clock.now_us();

        Ok(Self {
            store,
            select,
            clock,
            switch_count: switch_count.max(1),
            edges_per_period: trigger.edges_per_period(),
            last_power_edge_us: now,
            last_shared_edge_us: now,
            interval_edges: 0,
        })
    }

    /// To be called on every configured edge of CF.
    pub fn on_power_edge(&mut self) {
        let now = self.clock.now_us();
        let delta = elapsed_us(self.last_power_edge_us, now);
        self.last_power_edge_us = now;

        self.store
            .set_power_width(delta.saturating_mul(self.edges_per_period));
        self.store.count_power_edge();
    }

    /// To be called on every configured edge of CF1.
    ///
    /// Every `switch_count` edges the last delta is stored for the quantity currently
    /// selected and SEL is switched to the other one.
    pub fn on_shared_line_edge(&mut self) -> Result<(), SEL::Error> {
        let now = self.clock.now_us();
        let delta = elapsed_us(self.last_shared_edge_us, now);
        self.last_shared_edge_us = now;
        self.store.count_shared_edge();

        self.interval_edges += 1;
        if self.interval_edges < self.switch_count {
            return Ok(());
        }
        self.interval_edges = 0;

        self.store.set_shared_width(
            self.select.mode(),
            delta.saturating_mul(self.edges_per_period),
        );
        let mode = self.select.toggle()?;
        self.store.set_mode(mode);

        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.select.mode()
    }

    /// Gives back the SEL pin and the clock.
    pub fn release(self) -> (SEL, CLK) {
        (self.select.release(), self.clock)
    }
}

/// Reader half, owned by the driver.
pub struct Interrupt<'a, CLK> {
    store: &'a PulseStore,
    clock: CLK,
    timeout_us: u32,
    edges_per_period: u32,
    power_monitor: SignalMonitor,
    shared_monitor: SignalMonitor,
}

impl<'a, CLK> Interrupt<'a, CLK>
where
    CLK: Clock,
{
    pub(crate) fn new(
        store: &'a PulseStore,
        clock: CLK,
        timeout_us: u32,
        trigger: EdgeTrigger,
    ) -> Self {
        let now = clock.now_us();
        Self {
            store,
            clock,
            timeout_us,
            edges_per_period: trigger.edges_per_period(),
            power_monitor: SignalMonitor::new(now),
            shared_monitor: SignalMonitor::new(now),
        }
    }

    pub(crate) fn store(&self) -> &'a PulseStore {
        self.store
    }

    pub(crate) fn edges_per_period(&self) -> u32 {
        self.edges_per_period
    }

    fn check_shared_line(&mut self) {
        let now = self.clock.now_us();
        if self
            .shared_monitor
            .check(self.store.shared_edges(), now, self.timeout_us)
        {
            debug!("hlw8012: no signal on CF1");
            self.store.clear_shared_widths();
        }
    }

    fn check_power_line(&mut self) {
        let now = self.clock.now_us();
        if self
            .power_monitor
            .check(self.store.power_edges(), now, self.timeout_us)
        {
            debug!("hlw8012: no signal on CF");
            self.store.set_power_width(0);
        }
    }
}

impl<'a, CLK> Acquisition for Interrupt<'a, CLK>
where
    CLK: Clock,
{
    type Error = Infallible;

    fn current_width(&mut self) -> u32 {
        self.check_shared_line();
        self.store.current_width()
    }

    fn voltage_width(&mut self) -> u32 {
        self.check_shared_line();
        self.store.voltage_width()
    }

    fn power_width(&mut self) -> Result<u32, Infallible> {
        self.check_power_line();
        let width = self.store.power_width();
        self.store.reset_power_edges();
        self.power_monitor.rearm();
        Ok(width)
    }

    fn mode(&self) -> Mode {
        self.store.mode()
    }
}
