//! `embedded-io` traits for [`Port`].
//!
//! Implemented for both `Port` and `&Port`, so a port in a `static` can be
//! used with generic `embedded-io` code without a mutable borrow. The port
//! never reports an error from these calls; the error type exists for the
//! trait contract.

use ferrite_core::Interrupts;
use ferrite_core::ring::{Capacity, SupportedCapacity};

use crate::error::SerialError;
use crate::pins::PinRouter;
use crate::port::Port;
use crate::usart::Usart;

impl<U, P, I, const RX: usize, const TX: usize> Port<U, P, I, RX, TX>
where
    U: Usart,
    P: PinRouter,
    I: Interrupts,
    Capacity<RX>: SupportedCapacity,
    Capacity<TX>: SupportedCapacity,
{
    /// Blocks until at least one byte has arrived, then reads as many as are
    /// available into `buf`.
    fn blocking_read(&self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }
        while self.available() == 0 {
            core::hint::spin_loop();
        }

        let mut count = 0;
        for slot in buf.iter_mut() {
            match self.read() {
                Some(byte) => *slot = byte,
                None => break,
            }
            count += 1;
        }
        count
    }
}

macro_rules! impl_embedded_io {
    ($($target:ty),+ $(,)?) => {$(
        impl<U, P, I, const RX: usize, const TX: usize> embedded_io::ErrorType for $target
        where
            U: Usart,
            P: PinRouter,
            I: Interrupts,
            Capacity<RX>: SupportedCapacity,
            Capacity<TX>: SupportedCapacity,
        {
            type Error = SerialError;
        }

        impl<U, P, I, const RX: usize, const TX: usize> embedded_io::Read for $target
        where
            U: Usart,
            P: PinRouter,
            I: Interrupts,
            Capacity<RX>: SupportedCapacity,
            Capacity<TX>: SupportedCapacity,
        {
            fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
                Ok(self.blocking_read(buf))
            }
        }

        impl<U, P, I, const RX: usize, const TX: usize> embedded_io::ReadReady for $target
        where
            U: Usart,
            P: PinRouter,
            I: Interrupts,
            Capacity<RX>: SupportedCapacity,
            Capacity<TX>: SupportedCapacity,
        {
            fn read_ready(&mut self) -> Result<bool, Self::Error> {
                Ok(self.available() > 0)
            }
        }

        impl<U, P, I, const RX: usize, const TX: usize> embedded_io::Write for $target
        where
            U: Usart,
            P: PinRouter,
            I: Interrupts,
            Capacity<RX>: SupportedCapacity,
            Capacity<TX>: SupportedCapacity,
        {
            fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
                Ok(self.write_bytes(buf))
            }

            fn flush(&mut self) -> Result<(), Self::Error> {
                Port::flush(self);
                Ok(())
            }
        }

        impl<U, P, I, const RX: usize, const TX: usize> embedded_io::WriteReady for $target
        where
            U: Usart,
            P: PinRouter,
            I: Interrupts,
            Capacity<RX>: SupportedCapacity,
            Capacity<TX>: SupportedCapacity,
        {
            fn write_ready(&mut self) -> Result<bool, Self::Error> {
                Ok(self.available_for_write() > 0)
            }
        }
    )+};
}

impl_embedded_io!(Port<U, P, I, RX, TX>, &Port<U, P, I, RX, TX>);
