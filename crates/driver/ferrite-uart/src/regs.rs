//! AVR Dx USART register map.
//!
//! Bit definitions for the registers the buffered driver touches and a
//! [`register_block!`] accessor over one USART instance.

use bitflags::bitflags;
use ferrite_mmio::register_block;

// ---------------------------------------------------------------------------
// Instance base addresses
// ---------------------------------------------------------------------------

/// USART instance base addresses on AVR DA/DB parts.
pub mod base {
    /// USART0.
    pub const USART0: usize = 0x0800;
    /// USART1.
    pub const USART1: usize = 0x0820;
    /// USART2.
    pub const USART2: usize = 0x0840;
    /// USART3.
    pub const USART3: usize = 0x0860;
    /// USART4 (48/64-pin parts).
    pub const USART4: usize = 0x0880;
    /// USART5 (64-pin parts).
    pub const USART5: usize = 0x08A0;
}

// ---------------------------------------------------------------------------
// Bitflag types
// ---------------------------------------------------------------------------

bitflags! {
    /// `RXDATAH`: status latched with the received character.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RxDataH: u8 {
        /// Ninth data bit (unused in 8-bit framing).
        const DATA8     = 1 << 0;
        /// Parity error.
        const PERR      = 1 << 1;
        /// Frame error.
        const FERR      = 1 << 2;
        /// Receive buffer overflow.
        const BUFOVF    = 1 << 6;
        /// Receive complete.
        const RXCIF     = 1 << 7;
    }
}

bitflags! {
    /// `STATUS`: interrupt flags. Writable bits clear on one.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Status: u8 {
        /// Wait for break.
        const WFB       = 1 << 0;
        /// Break detected.
        const BDF       = 1 << 1;
        /// Inconsistent sync field.
        const ISFIF     = 1 << 3;
        /// Receive start of frame.
        const RXSIF     = 1 << 4;
        /// Data register empty.
        const DREIF     = 1 << 5;
        /// Transmit complete.
        const TXCIF     = 1 << 6;
        /// Receive complete.
        const RXCIF     = 1 << 7;

        /// Bits that are cleared by writing one.
        const WRITE_ONE_TO_CLEAR = Self::BDF.bits()
            | Self::ISFIF.bits()
            | Self::RXSIF.bits()
            | Self::TXCIF.bits();
    }
}

bitflags! {
    /// `CTRLA`: interrupt enables and line modes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CtrlA: u8 {
        /// RS-485 mode, external driver enable on XDIR.
        const RS485     = 1 << 0;
        /// Auto-baud error interrupt enable.
        const ABEIE     = 1 << 2;
        /// Loop-back mode enable.
        const LBME      = 1 << 3;
        /// Receiver start frame interrupt enable.
        const RXSIE     = 1 << 4;
        /// Data register empty interrupt enable.
        const DREIE     = 1 << 5;
        /// Transmit complete interrupt enable.
        const TXCIE     = 1 << 6;
        /// Receive complete interrupt enable.
        const RXCIE     = 1 << 7;
    }
}

bitflags! {
    /// `CTRLB`: transceiver enables and receiver mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CtrlB: u8 {
        /// Multi-processor communication mode.
        const MPCM          = 1 << 0;
        /// Double-speed receiver mode (`RXMODE = CLK2X`).
        const RXMODE_CLK2X  = 1 << 1;
        /// Open-drain mode enable.
        const ODME          = 1 << 3;
        /// Start-of-frame detection enable.
        const SFDEN         = 1 << 4;
        /// Transmitter enable.
        const TXEN          = 1 << 6;
        /// Receiver enable.
        const RXEN          = 1 << 7;
    }
}

bitflags! {
    /// `CTRLC` in asynchronous mode: frame format.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CtrlC: u8 {
        /// Character size field (`0b000` = 5 bits .. `0b011` = 8 bits).
        const CHSIZE        = 0b111;
        /// Two stop bits.
        const SBMODE        = 1 << 3;
        /// Odd parity (with `PMODE_ENABLE`).
        const PMODE_ODD     = 1 << 4;
        /// Parity generation and checking enable.
        const PMODE_ENABLE  = 1 << 5;
        /// Communication mode field; zero selects asynchronous.
        const CMODE         = 0b11 << 6;
    }
}

/// `EVCTRL` value that takes RX from the event system.
pub const EVCTRL_IREI: u8 = 1 << 0;

/// `TXPLCTRL` value that disables IrDA pulse-length encoding.
pub const TXPLCTRL_DISABLED: u8 = 0xFF;

// ---------------------------------------------------------------------------
// Register block
// ---------------------------------------------------------------------------

register_block! {
    /// One AVR Dx USART instance.
    pub UsartRegs {
        /// Receive data, low byte. Read after `rxdatah`.
        [0x00; u8; ro] rxdatal,
        /// Receive data, high byte and error flags.
        [0x01; u8; ro] rxdatah => RxDataH,
        /// Transmit data, low byte.
        [0x02; u8; rw] txdatal,
        /// Status flags.
        [0x04; u8; w1c] status => Status,
        /// Control A.
        [0x05; u8; rw] ctrla => CtrlA,
        /// Control B.
        [0x06; u8; rw] ctrlb => CtrlB,
        /// Control C (frame format).
        [0x07; u8; rw] ctrlc => CtrlC,
        /// Baud rate divisor.
        [0x08; u16; rw] baud,
        /// Event control.
        [0x0C; u8; rw] evctrl,
        /// IrDA transmit pulse-length control.
        [0x0D; u8; rw] txplctrl,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_clearable_bits() {
        assert!(Status::WRITE_ONE_TO_CLEAR.contains(Status::TXCIF));
        assert!(!Status::WRITE_ONE_TO_CLEAR.contains(Status::DREIF));
        assert!(!Status::WRITE_ONE_TO_CLEAR.contains(Status::RXCIF));
    }

    #[test]
    fn bit_positions_match_datasheet() {
        assert_eq!(Status::DREIF.bits(), 0x20);
        assert_eq!(CtrlA::DREIE.bits(), 0x20);
        assert_eq!((CtrlA::RXCIE | CtrlA::TXCIE).bits(), 0xC0);
        assert_eq!((CtrlB::RXEN | CtrlB::TXEN).bits(), 0xC0);
        assert_eq!(RxDataH::PERR.bits(), 0x02);
    }
}
