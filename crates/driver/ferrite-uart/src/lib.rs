//! Interrupt-driven buffered UART transport for AVR Dx USART peripherals.
//!
//! A [`Port`] pairs one USART with a receive ring and a transmit ring.
//! Foreground code writes into the transmit ring and reads from the receive
//! ring; the receive-complete, data-register-empty and transmit-complete
//! interrupt handlers ([`SerialIsr`]) move bytes between the rings and the
//! hardware. When interrupts cannot fire, blocking calls service the
//! transmitter by polling, so `write` and `flush` never deadlock.
//!
//! # Wiring a port
//!
//! ```ignore
//! use ferrite_core::Cpu;
//! use ferrite_uart::{Port, SERIAL_8N1, regs::{UsartRegs, base}};
//!
//! static SERIAL: Port<UsartRegs, BoardPins, Cpu, 64, 64> =
//!     unsafe { Port::new("usart0", UsartRegs::new(base::USART0), BOARD_PINS, Cpu, F_CPU) };
//!
//! SERIAL.begin(115_200, SERIAL_8N1);
//! SERIAL.write_bytes(b"hello\r\n");
//! ```
//!
//! The interrupt vectors then call [`SerialIsr::receive_complete`] and
//! friends on `SERIAL`, directly or through a [`ChannelTable`].

#![cfg_attr(not(any(test, feature = "sim")), no_std)]
#![warn(missing_docs)]

pub mod baud;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod isr;
pub mod pins;
pub mod port;
pub mod regs;
pub mod stream;
pub mod usart;

mod io;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use config::{
    ChannelFlags, DataBits, Parity, SERIAL_5N1, SERIAL_6N1, SERIAL_7E1, SERIAL_7N1, SERIAL_8E1,
    SERIAL_8E2, SERIAL_8N1, SERIAL_8N2, SERIAL_8O1, SERIAL_EVENT_RX, SERIAL_HALF_DUPLEX,
    SERIAL_LOOPBACK, SERIAL_OPENDRAIN, SERIAL_RS485, SERIAL_RX_ONLY, SERIAL_TX_ONLY, SerialConfig,
    StopBits,
};
pub use dispatch::ChannelTable;
pub use error::{DispatchError, SerialError};
pub use isr::{SerialIsr, Vector};
pub use pins::{MUX_NONE, PinEnable, PinRole, PinRouter};
pub use port::Port;
pub use stream::{PrintHex, Stream, TextWriter};
pub use usart::{RxFrame, Usart};
