//! Byte-stream capability.
//!
//! [`Stream`] is the foreground surface of a serial port as a trait, so
//! formatting helpers and protocol code can be written once for any port
//! size. [`PrintHex`] and [`TextWriter`] build on it.

use core::fmt;

use ferrite_core::Interrupts;
use ferrite_core::ring::{Capacity, SupportedCapacity};

use crate::pins::PinRouter;
use crate::port::Port;
use crate::usart::Usart;

/// A buffered, blocking byte stream.
pub trait Stream {
    /// Queues one byte, blocking while the transmit buffer is full.
    /// Returns the number of bytes accepted (always 1).
    fn write(&self, byte: u8) -> usize;

    /// Removes and returns the next received byte.
    fn read(&self) -> Option<u8>;

    /// Returns the next received byte without consuming it.
    fn peek(&self) -> Option<u8>;

    /// Number of received bytes waiting.
    fn available(&self) -> usize;

    /// Number of bytes that can be written without blocking.
    fn available_for_write(&self) -> usize;

    /// Blocks until all written bytes have been transmitted.
    fn flush(&self);

    /// Writes every byte of `bytes`, returning the count.
    fn write_bytes(&self, bytes: &[u8]) -> usize {
        bytes.iter().map(|&byte| self.write(byte)).sum()
    }

    /// Returns a [`fmt::Write`] adaptor over this stream.
    fn text(&self) -> TextWriter<'_, Self>
    where
        Self: Sized,
    {
        TextWriter { stream: self }
    }
}

impl<U, P, I, const RX: usize, const TX: usize> Stream for Port<U, P, I, RX, TX>
where
    U: Usart,
    P: PinRouter,
    I: Interrupts,
    Capacity<RX>: SupportedCapacity,
    Capacity<TX>: SupportedCapacity,
{
    fn write(&self, byte: u8) -> usize {
        Port::write(self, byte)
    }

    fn read(&self) -> Option<u8> {
        Port::read(self)
    }

    fn peek(&self) -> Option<u8> {
        Port::peek(self)
    }

    fn available(&self) -> usize {
        Port::available(self)
    }

    fn available_for_write(&self) -> usize {
        Port::available_for_write(self)
    }

    fn flush(&self) {
        Port::flush(self);
    }
}

// ---------------------------------------------------------------------------
// Hex output
// ---------------------------------------------------------------------------

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Upper-case hex dumps for any [`Stream`].
///
/// Multi-byte values print most significant byte first unless
/// `swap_order` is set, in which case they print in memory (little-endian)
/// order. The slice helpers end the line with `"\r\n"`.
pub trait PrintHex: Stream {
    /// Prints a byte as two hex digits.
    fn print_hex_u8(&self, byte: u8) {
        self.write(HEX_DIGITS[usize::from(byte >> 4)]);
        self.write(HEX_DIGITS[usize::from(byte & 0x0F)]);
    }

    /// Prints a 16-bit value as four hex digits.
    fn print_hex_u16(&self, value: u16, swap_order: bool) {
        let bytes = if swap_order {
            value.to_le_bytes()
        } else {
            value.to_be_bytes()
        };
        bytes.iter().for_each(|&byte| self.print_hex_u8(byte));
    }

    /// Prints a 32-bit value as eight hex digits.
    fn print_hex_u32(&self, value: u32, swap_order: bool) {
        let bytes = if swap_order {
            value.to_le_bytes()
        } else {
            value.to_be_bytes()
        };
        bytes.iter().for_each(|&byte| self.print_hex_u8(byte));
    }

    /// Prints each byte of `bytes`, separated by `separator` if given, and
    /// ends the line.
    fn print_hex_bytes(&self, bytes: &[u8], separator: Option<u8>) {
        for (index, &byte) in bytes.iter().enumerate() {
            if let Some(sep) = separator.filter(|_| index > 0) {
                self.write(sep);
            }
            self.print_hex_u8(byte);
        }
        self.write_bytes(b"\r\n");
    }

    /// Prints each word of `words`, separated by `separator` if given, and
    /// ends the line.
    fn print_hex_words(&self, words: &[u16], separator: Option<u8>, swap_order: bool) {
        for (index, &word) in words.iter().enumerate() {
            if let Some(sep) = separator.filter(|_| index > 0) {
                self.write(sep);
            }
            self.print_hex_u16(word, swap_order);
        }
        self.write_bytes(b"\r\n");
    }
}

impl<S: Stream + ?Sized> PrintHex for S {}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

/// [`fmt::Write`] adaptor for a [`Stream`].
///
/// Translates `\n` to `\r\n` so `writeln!` produces terminal line endings.
#[derive(Debug)]
pub struct TextWriter<'a, S> {
    stream: &'a S,
}

impl<'a, S: Stream> TextWriter<'a, S> {
    /// Wraps `stream`.
    pub const fn new(stream: &'a S) -> Self {
        Self { stream }
    }
}

impl<S: Stream> fmt::Write for TextWriter<'_, S> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for &byte in s.as_bytes() {
            if byte == b'\n' {
                self.stream.write(b'\r');
            }
            self.stream.write(byte);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use core::fmt::Write as _;
    use std::vec::Vec;

    /// Stream that records written bytes and never receives.
    #[derive(Default)]
    struct Capture(RefCell<Vec<u8>>);

    impl Capture {
        fn taken(&self) -> Vec<u8> {
            self.0.take()
        }
    }

    impl Stream for Capture {
        fn write(&self, byte: u8) -> usize {
            self.0.borrow_mut().push(byte);
            1
        }

        fn read(&self) -> Option<u8> {
            None
        }

        fn peek(&self) -> Option<u8> {
            None
        }

        fn available(&self) -> usize {
            0
        }

        fn available_for_write(&self) -> usize {
            usize::MAX
        }

        fn flush(&self) {}
    }

    #[test]
    fn hex_digits_are_upper_case() {
        let out = Capture::default();
        out.print_hex_u8(0x0A);
        out.print_hex_u8(0xF3);
        assert_eq!(out.taken(), b"0AF3");
    }

    #[test]
    fn word_order() {
        let out = Capture::default();
        out.print_hex_u16(0x1234, false);
        assert_eq!(out.taken(), b"1234");
        out.print_hex_u16(0x1234, true);
        assert_eq!(out.taken(), b"3412");
        out.print_hex_u32(0xDEAD_BEEF, false);
        assert_eq!(out.taken(), b"DEADBEEF");
        out.print_hex_u32(0xDEAD_BEEF, true);
        assert_eq!(out.taken(), b"EFBEADDE");
    }

    #[test]
    fn slices_with_and_without_separator() {
        let out = Capture::default();
        out.print_hex_bytes(&[0x01, 0xAB, 0x10], Some(b':'));
        assert_eq!(out.taken(), b"01:AB:10\r\n");

        out.print_hex_bytes(&[0x01, 0xAB], None);
        assert_eq!(out.taken(), b"01AB\r\n");

        out.print_hex_words(&[0x0102, 0xA0B0], Some(b' '), false);
        assert_eq!(out.taken(), b"0102 A0B0\r\n");

        out.print_hex_bytes(&[], Some(b','));
        assert_eq!(out.taken(), b"\r\n");
    }

    #[test]
    fn text_writer_expands_newlines() {
        let out = Capture::default();
        write!(out.text(), "a={}\nb", 7).unwrap();
        assert_eq!(out.taken(), b"a=7\r\nb");
    }

    #[test]
    fn write_bytes_counts() {
        let out = Capture::default();
        assert_eq!(out.write_bytes(b"hello"), 5);
        assert_eq!(out.taken(), b"hello");
    }
}
