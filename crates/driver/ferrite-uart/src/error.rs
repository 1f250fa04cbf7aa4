//! Error types for the serial driver.

use core::fmt;

/// Errors reported by the fallible helpers of the serial port.
///
/// The buffering engine itself never fails: receive overruns and parity
/// errors drop bytes silently, and a full transmit ring blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    /// The selector names no pin set of this USART.
    InvalidPinSet(u8),
    /// No pin set carries this TX/RX pair.
    PinsNotRouted {
        /// Requested TX pin.
        tx: Option<u8>,
        /// Requested RX pin.
        rx: Option<u8>,
    },
}

impl fmt::Display for SerialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPinSet(selector) => write!(f, "invalid pin set selector {selector}"),
            Self::PinsNotRouted { tx, rx } => {
                write!(f, "no pin set routes tx={tx:?} rx={rx:?}")
            }
        }
    }
}

impl embedded_io::Error for SerialError {
    fn kind(&self) -> embedded_io::ErrorKind {
        embedded_io::ErrorKind::InvalidInput
    }
}

/// Errors reported by [`ChannelTable`](crate::dispatch::ChannelTable).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The unit index is outside the table.
    UnitOutOfRange(usize),
    /// A channel is already bound to the unit.
    AlreadyBound(usize),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnitOutOfRange(unit) => write!(f, "usart{unit} is not in the channel table"),
            Self::AlreadyBound(unit) => write!(f, "usart{unit} already has a channel bound"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::string::ToString;

    #[test]
    fn display_all_variants() {
        assert_eq!(
            SerialError::InvalidPinSet(9).to_string(),
            "invalid pin set selector 9"
        );
        assert_eq!(
            SerialError::PinsNotRouted {
                tx: Some(4),
                rx: Some(6)
            }
            .to_string(),
            "no pin set routes tx=Some(4) rx=Some(6)"
        );
        assert_eq!(
            DispatchError::UnitOutOfRange(3).to_string(),
            "usart3 is not in the channel table"
        );
        assert_eq!(
            DispatchError::AlreadyBound(0).to_string(),
            "usart0 already has a channel bound"
        );
    }

    #[test]
    fn io_error_kind() {
        use embedded_io::Error;
        assert_eq!(
            SerialError::InvalidPinSet(200).kind(),
            embedded_io::ErrorKind::InvalidInput
        );
    }
}
