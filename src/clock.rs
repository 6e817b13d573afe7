use embedded_hal::digital::InputPin;

/// A free running microsecond time source.
///
/// The value is expected to wrap around at `u32::MAX`; all interval arithmetic in
/// this crate is wrapping.
pub trait Clock {
    fn now_us(&self) -> u32;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_us(&self) -> u32 {
        T::now_us(self)
    }
}

#[inline]
pub(crate) fn elapsed_us(since: u32, now: u32) -> u32 {
    now.wrapping_sub(since)
}

///
/// Measures the length of one high pulse on `pin`, busy waiting.
///
/// If the pin is already high the pulse in progress is skipped. The whole
/// measurement, including waiting for the pulse to start, is bounded by
/// `timeout_us`.
///
/// returns: the pulse length in microseconds, or 0 if no complete pulse was seen in time.
pub fn pulse_in<P, C>(pin: &mut P, clock: &C, timeout_us: u32) -> Result<u32, P::Error>
where
    P: InputPin,
    C: Clock,
{
    let start = clock.now_us();

    while pin.is_high()? {
        if elapsed_us(start, clock.now_us()) >= timeout_us {
            return Ok(0);
        }
    }

    while pin.is_low()? {
        if elapsed_us(start, clock.now_us()) >= timeout_us {
            return Ok(0);
        }
    }

    let rise = clock.now_us();
    while pin.is_high()? {
        if elapsed_us(start, clock.now_us()) >= timeout_us {
            return Ok(0);
        }
    }

    Ok(elapsed_us(rise, clock.now_us()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{SimClock, SquareWave};

    #[test]
    fn elapsed_wraps() {
        assert_eq!(elapsed_us(u32::MAX - 9, 10), 20);
        assert_eq!(elapsed_us(100, 250), 150);
    }

    #[test]
    fn measures_high_time() {
        let clock = SimClock::stepping(1);
        let mut pin = SquareWave::new(&clock, 1_000, 500);

        let width = pulse_in(&mut pin, &clock, 10_000).unwrap();
        assert!((498..=502).contains(&width), "width {width}");
    }

    #[test]
    fn skips_pulse_in_progress() {
        let clock = SimClock::stepping(1);
        clock.set(100);
        let mut pin = SquareWave::new(&clock, 1_000, 300);

        let width = pulse_in(&mut pin, &clock, 10_000).unwrap();
        assert!((298..=302).contains(&width), "width {width}");
        assert!(clock.peek() > 1_000);
    }

    #[test]
    fn flat_line_times_out() {
        let clock = SimClock::stepping(1);
        let mut pin = SquareWave::flat(&clock, false);

        assert_eq!(pulse_in(&mut pin, &clock, 5_000).unwrap(), 0);
        assert!(clock.peek() >= 5_000);
    }
}
