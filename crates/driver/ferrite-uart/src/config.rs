//! Channel configuration.
//!
//! A [`SerialConfig`] describes the frame format and line mode passed to
//! `begin`. It also has a compact `u16` encoding for the `SERIAL_*`
//! constants:
//!
//! ```text
//!  15  14  13  12  11  10   9   8 |  7   6   5   4   3   2   1   0
//! !RX !TX EVT  -  LBM  OD   -  485|  -   -  PEN ODD  SB  5N  CHSIZE
//! ```
//!
//! The low byte is the `CTRLC` frame format. Zero there means 8N1, so 5N1
//! is marked with the otherwise unused bit 2. The high byte holds channel
//! flags; the transceiver enables are inverted so that zero means "both
//! enabled".
//!
//! This module also carries the default ring sizes derived from device SRAM.

use bitflags::bitflags;

use crate::regs::CtrlC;

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataBits {
    /// 5 data bits.
    Five,
    /// 6 data bits.
    Six,
    /// 7 data bits.
    Seven,
    /// 8 data bits.
    #[default]
    Eight,
}

impl DataBits {
    const fn chsize(self) -> u8 {
        match self {
            Self::Five => 0b000,
            Self::Six => 0b001,
            Self::Seven => 0b010,
            Self::Eight => 0b011,
        }
    }

    const fn from_chsize(raw: u8) -> Self {
        match raw & 0b011 {
            0b000 => Self::Five,
            0b001 => Self::Six,
            0b010 => Self::Seven,
            _ => Self::Eight,
        }
    }
}

/// Parity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Even parity.
    Even,
    /// Odd parity.
    Odd,
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    /// One stop bit.
    #[default]
    One,
    /// Two stop bits.
    Two,
}

bitflags! {
    /// Channel flags carried in the high byte of the options word.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelFlags: u8 {
        /// RS-485 mode: drive XDIR around transmissions.
        const RS485         = 1 << 0;
        /// Open-drain TX output.
        const OPEN_DRAIN    = 1 << 2;
        /// Internal loop-back from TX to RX.
        const LOOPBACK      = 1 << 3;
        /// Receive from the event system instead of the RX pin.
        const EVENT_RX      = 1 << 5;
        /// Transmitter disabled.
        const TX_DISABLE    = 1 << 6;
        /// Receiver disabled.
        const RX_DISABLE    = 1 << 7;
    }
}

/// Marks 5N1 in the low byte, where zero already means 8N1.
const FRAME_5N1_MARKER: u8 = 0x04;

// ---------------------------------------------------------------------------
// Option constants
// ---------------------------------------------------------------------------

/// 5 data bits, no parity, 1 stop bit.
pub const SERIAL_5N1: u16 = 0x0004;
/// 6 data bits, no parity, 1 stop bit.
pub const SERIAL_6N1: u16 = 0x0001;
/// 7 data bits, no parity, 1 stop bit.
pub const SERIAL_7N1: u16 = 0x0002;
/// 8 data bits, no parity, 1 stop bit.
pub const SERIAL_8N1: u16 = 0x0003;
/// 7 data bits, even parity, 1 stop bit.
pub const SERIAL_7E1: u16 = 0x0022;
/// 8 data bits, even parity, 1 stop bit.
pub const SERIAL_8E1: u16 = 0x0023;
/// 8 data bits, odd parity, 1 stop bit.
pub const SERIAL_8O1: u16 = 0x0033;
/// 8 data bits, no parity, 2 stop bits.
pub const SERIAL_8N2: u16 = 0x000B;
/// 8 data bits, even parity, 2 stop bits.
pub const SERIAL_8E2: u16 = 0x002B;

/// RS-485 direction control on XDIR.
pub const SERIAL_RS485: u16 = 0x0100;
/// Open-drain TX.
pub const SERIAL_OPENDRAIN: u16 = 0x0400;
/// Internal loop-back.
pub const SERIAL_LOOPBACK: u16 = 0x0800;
/// Single-wire half duplex: loop-back plus open-drain.
pub const SERIAL_HALF_DUPLEX: u16 = SERIAL_LOOPBACK | SERIAL_OPENDRAIN;
/// RX from the event system.
pub const SERIAL_EVENT_RX: u16 = 0x2000;
/// Receiver only.
pub const SERIAL_RX_ONLY: u16 = 0x4000;
/// Transmitter only.
pub const SERIAL_TX_ONLY: u16 = 0x8000;

// ---------------------------------------------------------------------------
// SerialConfig
// ---------------------------------------------------------------------------

/// Frame format and line mode for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SerialConfig {
    /// Data bits per character.
    pub data_bits: DataBits,
    /// Parity mode.
    pub parity: Parity,
    /// Stop bits.
    pub stop_bits: StopBits,
    /// Channel flags.
    pub flags: ChannelFlags,
}

impl SerialConfig {
    /// 8N1, receiver and transmitter enabled.
    pub const fn new() -> Self {
        Self {
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flags: ChannelFlags::empty(),
        }
    }

    /// Decodes an options word.
    pub const fn from_options(options: u16) -> Self {
        let [low, high] = options.to_le_bytes();

        let (data_bits, frame) = match low {
            0 => (DataBits::Eight, 0),
            _ if low & FRAME_5N1_MARKER != 0 => (DataBits::Five, low & !FRAME_5N1_MARKER),
            _ => (DataBits::from_chsize(low), low),
        };

        let parity = if frame & CtrlC::PMODE_ENABLE.bits() == 0 {
            Parity::None
        } else if frame & CtrlC::PMODE_ODD.bits() == 0 {
            Parity::Even
        } else {
            Parity::Odd
        };

        let stop_bits = if frame & CtrlC::SBMODE.bits() == 0 {
            StopBits::One
        } else {
            StopBits::Two
        };

        Self {
            data_bits,
            parity,
            stop_bits,
            flags: ChannelFlags::from_bits_truncate(high),
        }
    }

    /// Encodes the configuration as an options word.
    pub const fn to_options(&self) -> u16 {
        let mut low = self.frame_format().bits();
        if matches!(self.data_bits, DataBits::Five) {
            low |= FRAME_5N1_MARKER;
        }
        u16::from_le_bytes([low, self.flags.bits()])
    }

    /// Returns the `CTRLC` frame format.
    pub const fn frame_format(&self) -> CtrlC {
        let mut bits = self.data_bits.chsize();
        bits |= match self.parity {
            Parity::None => 0,
            Parity::Even => CtrlC::PMODE_ENABLE.bits(),
            Parity::Odd => CtrlC::PMODE_ENABLE.bits() | CtrlC::PMODE_ODD.bits(),
        };
        if matches!(self.stop_bits, StopBits::Two) {
            bits |= CtrlC::SBMODE.bits();
        }
        CtrlC::from_bits_retain(bits)
    }

    /// Sets the data bits.
    #[must_use]
    pub const fn data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    /// Sets the parity mode.
    #[must_use]
    pub const fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Sets the stop bits.
    #[must_use]
    pub const fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Adds channel flags.
    #[must_use]
    pub const fn with(mut self, flags: ChannelFlags) -> Self {
        self.flags = self.flags.union(flags);
        self
    }

    /// Single-wire half duplex (loop-back plus open-drain).
    #[must_use]
    pub const fn half_duplex(self) -> Self {
        self.with(ChannelFlags::LOOPBACK.union(ChannelFlags::OPEN_DRAIN))
    }

    /// Returns `true` if the receiver is enabled.
    pub const fn rx_enabled(&self) -> bool {
        !self.flags.contains(ChannelFlags::RX_DISABLE)
    }

    /// Returns `true` if the transmitter is enabled.
    pub const fn tx_enabled(&self) -> bool {
        !self.flags.contains(ChannelFlags::TX_DISABLE)
    }

    /// Returns `true` for single-wire half duplex: loop-back and open-drain
    /// with both directions enabled.
    pub const fn is_half_duplex(&self) -> bool {
        self.flags
            .contains(ChannelFlags::LOOPBACK.union(ChannelFlags::OPEN_DRAIN))
            && self.rx_enabled()
            && self.tx_enabled()
    }
}

impl From<u16> for SerialConfig {
    fn from(options: u16) -> Self {
        Self::from_options(options)
    }
}

// ---------------------------------------------------------------------------
// Default buffer sizes
// ---------------------------------------------------------------------------

/// Default transmit ring size for a part with `sram` bytes of SRAM.
pub const fn default_tx_size(sram: usize) -> usize {
    if sram < 1024 {
        16
    } else if sram < 2048 {
        32
    } else {
        64
    }
}

/// Default receive ring size for a part with `sram` bytes of SRAM.
pub const fn default_rx_size(sram: usize) -> usize {
    if sram < 512 {
        16
    } else if sram < 1024 {
        32
    } else {
        64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_low_byte_means_8n1() {
        assert_eq!(SerialConfig::from_options(0), SerialConfig::new());
        assert_eq!(SerialConfig::from_options(SERIAL_8N1), SerialConfig::new());
        assert_eq!(SerialConfig::new().frame_format().bits(), 0x03);
    }

    #[test]
    fn five_bit_marker_is_stripped() {
        let config = SerialConfig::from_options(SERIAL_5N1);
        assert_eq!(config.data_bits, DataBits::Five);
        assert_eq!(config.frame_format().bits(), 0x00);
        assert_eq!(config.to_options(), SERIAL_5N1);
    }

    #[test]
    fn parity_and_stop_bits_decode() {
        let even = SerialConfig::from_options(SERIAL_8E2);
        assert_eq!(even.parity, Parity::Even);
        assert_eq!(even.stop_bits, StopBits::Two);

        let odd = SerialConfig::from_options(SERIAL_8O1);
        assert_eq!(odd.parity, Parity::Odd);
        assert_eq!(odd.frame_format().bits(), 0x33);

        let seven = SerialConfig::from_options(SERIAL_7E1);
        assert_eq!(seven.data_bits, DataBits::Seven);
    }

    #[test]
    fn builder_matches_constants() {
        let config = SerialConfig::new()
            .parity(Parity::Even)
            .stop_bits(StopBits::Two)
            .half_duplex();
        assert_eq!(config.to_options(), SERIAL_8E2 | SERIAL_HALF_DUPLEX);
        assert_eq!(SerialConfig::from(config.to_options()), config);
    }

    #[test]
    fn half_duplex_needs_both_directions() {
        let config = SerialConfig::from_options(SERIAL_8N1 | SERIAL_HALF_DUPLEX);
        assert!(config.is_half_duplex());

        let tx_only = SerialConfig::from_options(SERIAL_HALF_DUPLEX | SERIAL_TX_ONLY);
        assert!(!tx_only.rx_enabled());
        assert!(!tx_only.is_half_duplex());

        let loopback = SerialConfig::from_options(SERIAL_LOOPBACK);
        assert!(!loopback.is_half_duplex());
    }

    #[test]
    fn default_sizes_follow_sram() {
        assert_eq!(default_tx_size(512), 16);
        assert_eq!(default_tx_size(1024), 32);
        assert_eq!(default_tx_size(16 * 1024), 64);
        assert_eq!(default_rx_size(256), 16);
        assert_eq!(default_rx_size(512), 32);
        assert_eq!(default_rx_size(2048), 64);
    }
}
