//! Interrupt handlers.
//!
//! Each USART raises three vectors. The handlers here are short, never
//! block and never log; they are the only code besides the polling
//! fallback that touches the consumer side of the TX ring and the producer
//! side of the RX ring.

use ferrite_core::Interrupts;
use ferrite_core::ring::{Capacity, SupportedCapacity};

use crate::pins::PinRouter;
use crate::port::Port;
use crate::usart::Usart;

/// A USART interrupt vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vector {
    /// Receive complete (`RXC`).
    ReceiveComplete,
    /// Data register empty (`DRE`).
    DataRegisterEmpty,
    /// Transmit complete (`TXC`), used in half duplex.
    TransmitComplete,
}

/// Interrupt entry points of a serial channel.
///
/// Object safe, so a [`ChannelTable`](crate::dispatch::ChannelTable) can hold
/// ports of different sizes behind one type.
pub trait SerialIsr {
    /// Moves one received character into the RX ring.
    ///
    /// Characters with a parity error, and characters arriving while the
    /// ring is full, are dropped.
    fn receive_complete(&self);

    /// Moves one byte from the TX ring to the data register, or disarms the
    /// vector if the ring is empty.
    fn data_register_empty(&self);

    /// Ends a half-duplex transmission: drains the echo of our own bytes and
    /// re-enables reception.
    fn transmit_complete(&self);

    /// Runs the handler for `vector`.
    fn service(&self, vector: Vector) {
        match vector {
            Vector::ReceiveComplete => self.receive_complete(),
            Vector::DataRegisterEmpty => self.data_register_empty(),
            Vector::TransmitComplete => self.transmit_complete(),
        }
    }
}

impl<U, P, I, const RX: usize, const TX: usize> SerialIsr for Port<U, P, I, RX, TX>
where
    U: Usart,
    P: PinRouter,
    I: Interrupts,
    Capacity<RX>: SupportedCapacity,
    Capacity<TX>: SupportedCapacity,
{
    #[inline]
    fn receive_complete(&self) {
        self.receive_next();
    }

    #[inline]
    fn data_register_empty(&self) {
        self.transmit_next();
    }

    #[inline]
    fn transmit_complete(&self) {
        self.finish_transmission();
    }
}
