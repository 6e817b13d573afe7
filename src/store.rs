//! Pulse widths and edge counters shared between acquisition and readout.
//!
//! Every field is an independent atomic scalar with a single writer. In interrupt
//! regime the writer is the edge capture running in interrupt context, and readers
//! may observe a value one sample old. That is an accepted outcome; no field ever
//! needs to be consistent with another one.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::clock::elapsed_us;
use crate::mode::Mode;

/// Last known full output period of each quantity, in microseconds, plus edge counters.
///
/// A width of zero means "no signal". `new` is `const` so the store can live in a
/// `static` reachable from interrupt handlers.
pub struct PulseStore {
    current: AtomicU32,
    voltage: AtomicU32,
    power: AtomicU32,
    voltage_selected: AtomicBool,
    power_edges: AtomicU32,
    shared_edges: AtomicU32,
    energy_edges: AtomicU32,
}

impl Default for PulseStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseStore {
    pub const fn new() -> Self {
        Self {
            current: AtomicU32::new(0),
            voltage: AtomicU32::new(0),
            power: AtomicU32::new(0),
            voltage_selected: AtomicBool::new(false),
            power_edges: AtomicU32::new(0),
            shared_edges: AtomicU32::new(0),
            energy_edges: AtomicU32::new(0),
        }
    }

    pub fn current_width(&self) -> u32 {
        self.current.load(Ordering::Relaxed)
    }

    pub fn voltage_width(&self) -> u32 {
        self.voltage.load(Ordering::Relaxed)
    }

    pub fn power_width(&self) -> u32 {
        self.power.load(Ordering::Relaxed)
    }

    pub fn mode(&self) -> Mode {
        if self.voltage_selected.load(Ordering::Acquire) {
            Mode::Voltage
        } else {
            Mode::Current
        }
    }

    /// Edges seen on CF since the last power readout.
    pub fn power_edges(&self) -> u32 {
        self.power_edges.load(Ordering::Relaxed)
    }

    /// Edges seen on CF1 since start.
    pub fn shared_edges(&self) -> u32 {
        self.shared_edges.load(Ordering::Relaxed)
    }

    /// Edges seen on CF since start or the last energy reset.
    pub fn energy_edges(&self) -> u32 {
        self.energy_edges.load(Ordering::Relaxed)
    }

    pub(crate) fn set_shared_width(&self, mode: Mode, width_us: u32) {
        match mode {
            Mode::Current => self.current.store(width_us, Ordering::Relaxed),
            Mode::Voltage => self.voltage.store(width_us, Ordering::Relaxed),
        }
    }

    pub(crate) fn set_power_width(&self, width_us: u32) {
        self.power.store(width_us, Ordering::Relaxed);
    }

    pub(crate) fn set_mode(&self, mode: Mode) {
        self.voltage_selected
            .store(mode == Mode::Voltage, Ordering::Release);
    }

    pub(crate) fn clear_shared_widths(&self) {
        self.current.store(0, Ordering::Relaxed);
        self.voltage.store(0, Ordering::Relaxed);
    }

    // Counters are only ever incremented by the edge capture, so a load/store pair
    // is enough and keeps the store usable on cores without atomic read-modify-write.
    pub(crate) fn count_power_edge(&self) {
        bump(&self.power_edges);
        bump(&self.energy_edges);
    }

    pub(crate) fn count_shared_edge(&self) {
        bump(&self.shared_edges);
    }

    pub(crate) fn reset_power_edges(&self) {
        self.power_edges.store(0, Ordering::Relaxed);
    }

    pub(crate) fn reset_energy_edges(&self) {
        self.energy_edges.store(0, Ordering::Relaxed);
    }
}

#[inline]
fn bump(counter: &AtomicU32) {
    counter.store(
        counter.load(Ordering::Relaxed).wrapping_add(1),
        Ordering::Relaxed,
    );
}

/// Detects a line that stopped producing edges.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalMonitor {
    last_edges: u32,
    last_activity_us: u32,
}

impl SignalMonitor {
    pub fn new(now_us: u32) -> Self {
        Self {
            last_edges: 0,
            last_activity_us: now_us,
        }
    }

    /// Returns `true` when `edges` has not moved for more than `timeout_us`.
    ///
    /// Silence is measured from the first check that saw the counter move, so frequent
    /// checks do not keep a dead line alive.
    pub fn check(&mut self, edges: u32, now_us: u32, timeout_us: u32) -> bool {
        if edges != self.last_edges {
            self.last_edges = edges;
            self.last_activity_us = now_us;
            return false;
        }
        elapsed_us(self.last_activity_us, now_us) > timeout_us
    }

    /// Forgets the last edge count, for counters that were reset to zero.
    pub fn rearm(&mut self) {
        self.last_edges = 0;
    }
}
