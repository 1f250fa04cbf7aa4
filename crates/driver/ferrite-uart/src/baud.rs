//! Baud divisor computation.
//!
//! The fractional baud generator divides the peripheral clock by
//! `S * BAUD / 64`, with `S = 16` at normal speed and `S = 8` in double-speed
//! (`CLK2X`) mode. Rates above `f_cpu / 16` cannot be reached at normal
//! speed, so they switch to double-speed and halve the target before the
//! divisor is computed.

/// Smallest divisor the hardware accepts.
pub const MIN_DIVISOR: u16 = 64;

/// A computed baud configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaudSetting {
    /// Value for the `BAUD` register.
    pub divisor: u16,
    /// Whether double-speed (`CLK2X`) mode is required.
    pub double_speed: bool,
    /// Whether the divisor had to be clamped into range.
    pub clamped: bool,
}

impl BaudSetting {
    /// Computes the divisor for `baud` with a `clock_hz` peripheral clock.
    ///
    /// A zero rate selects the slowest setting.
    #[must_use]
    pub fn compute(clock_hz: u32, baud: u32) -> Self {
        let mut target = u64::from(baud);
        let double_speed = target > u64::from(clock_hz / 16);
        if double_speed {
            target >>= 1;
        }

        let raw = (4 * u64::from(clock_hz)).checked_div(target).unwrap_or(u64::MAX);
        let divisor = raw.clamp(u64::from(MIN_DIVISOR), u64::from(u16::MAX));

        Self {
            divisor: u16::try_from(divisor).unwrap_or(u16::MAX),
            double_speed,
            clamped: divisor != raw,
        }
    }

    /// Returns the rate the setting actually produces with a `clock_hz`
    /// peripheral clock.
    #[must_use]
    pub fn actual_baud(&self, clock_hz: u32) -> u32 {
        let samples: u64 = if self.double_speed { 8 } else { 16 };
        let rate = 64 * u64::from(clock_hz) / (samples * u64::from(self.divisor));
        u32::try_from(rate).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const F_CPU: u32 = 24_000_000;

    #[test]
    fn normal_speed_divisor() {
        let setting = BaudSetting::compute(F_CPU, 115_200);
        assert!(!setting.double_speed);
        assert!(!setting.clamped);
        assert_eq!(setting.divisor, 833);
        assert_eq!(setting.actual_baud(F_CPU), 115_246);
    }

    #[test]
    fn fast_rates_use_double_speed() {
        // 2 Mbaud > 24 MHz / 16.
        let setting = BaudSetting::compute(F_CPU, 2_000_000);
        assert!(setting.double_speed);
        assert_eq!(setting.divisor, 96);
        assert_eq!(setting.actual_baud(F_CPU), 2_000_000);
    }

    #[test]
    fn boundary_stays_at_normal_speed() {
        let setting = BaudSetting::compute(F_CPU, F_CPU / 16);
        assert!(!setting.double_speed);
        assert_eq!(setting.divisor, MIN_DIVISOR);
    }

    #[test]
    fn too_fast_clamps_to_minimum() {
        let setting = BaudSetting::compute(F_CPU, 10_000_000);
        assert!(setting.double_speed);
        assert!(setting.clamped);
        assert_eq!(setting.divisor, MIN_DIVISOR);
    }

    #[test]
    fn too_slow_clamps_to_maximum() {
        let setting = BaudSetting::compute(F_CPU, 300);
        assert!(setting.clamped);
        assert_eq!(setting.divisor, u16::MAX);

        let zero = BaudSetting::compute(F_CPU, 0);
        assert_eq!(zero.divisor, u16::MAX);
        assert!(!zero.double_speed);
    }
}
