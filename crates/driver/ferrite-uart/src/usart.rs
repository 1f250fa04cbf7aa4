//! Peripheral register interface.
//!
//! [`Usart`] is everything the buffered driver needs from the hardware.
//! [`UsartRegs`] implements it over MMIO; the simulator in `sim` implements
//! it in memory.

use crate::regs::{CtrlA, CtrlB, CtrlC, EVCTRL_IREI, RxDataH, Status, TXPLCTRL_DISABLED, UsartRegs};

/// One received character with the status latched alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxFrame {
    /// `RXDATAH` flags.
    pub flags: RxDataH,
    /// `RXDATAL` data byte.
    pub data: u8,
}

impl RxFrame {
    /// Creates a frame without error flags.
    pub const fn new(data: u8) -> Self {
        Self {
            flags: RxDataH::RXCIF,
            data,
        }
    }

    /// Returns `true` if the character failed its parity check.
    pub const fn parity_error(&self) -> bool {
        self.flags.contains(RxDataH::PERR)
    }
}

/// Register-level access to one USART.
///
/// All methods take `&self`; implementations perform volatile accesses (or
/// their simulated equivalent) and never cache register state.
pub trait Usart {
    /// Reads one received frame.
    ///
    /// The status half is read before the data half. Reading the data byte
    /// pops the hardware receive FIFO and releases the latched status, so
    /// implementations must keep this order.
    fn receive(&self) -> RxFrame;

    /// Writes a byte to the transmit data register.
    fn transmit(&self, byte: u8);

    /// Reads `STATUS`.
    fn status(&self) -> Status;

    /// Clears the given `STATUS` flags (write-one-to-clear).
    fn clear_status(&self, flags: Status);

    /// Reads `CTRLA`.
    fn control_a(&self) -> CtrlA;

    /// Writes `CTRLA`.
    fn set_control_a(&self, value: CtrlA);

    /// Reads `CTRLB`.
    fn control_b(&self) -> CtrlB;

    /// Writes `CTRLB`.
    fn set_control_b(&self, value: CtrlB);

    /// Writes the frame format (`CTRLC`).
    fn set_frame_format(&self, value: CtrlC);

    /// Writes the baud divisor.
    fn set_baud(&self, divisor: u16);

    /// Routes RX from the event system instead of the RX pin.
    fn set_event_input(&self, enabled: bool);

    /// Read-modify-writes `CTRLA`.
    ///
    /// Not atomic: callers outside interrupt handlers mask interrupts
    /// around it.
    fn modify_control_a(&self, f: impl FnOnce(CtrlA) -> CtrlA)
    where
        Self: Sized,
    {
        self.set_control_a(f(self.control_a()));
    }
}

impl Usart for UsartRegs {
    #[inline]
    fn receive(&self) -> RxFrame {
        let flags = self.rxdatah();
        let data = self.rxdatal();
        RxFrame { flags, data }
    }

    #[inline]
    fn transmit(&self, byte: u8) {
        self.set_txdatal(byte);
    }

    #[inline]
    fn status(&self) -> Status {
        UsartRegs::status(self)
    }

    #[inline]
    fn clear_status(&self, flags: Status) {
        UsartRegs::clear_status(self, flags);
    }

    #[inline]
    fn control_a(&self) -> CtrlA {
        self.ctrla()
    }

    #[inline]
    fn set_control_a(&self, value: CtrlA) {
        self.set_ctrla(value);
    }

    #[inline]
    fn control_b(&self) -> CtrlB {
        self.ctrlb()
    }

    #[inline]
    fn set_control_b(&self, value: CtrlB) {
        self.set_ctrlb(value);
    }

    #[inline]
    fn set_frame_format(&self, value: CtrlC) {
        self.set_ctrlc(value);
    }

    #[inline]
    fn set_baud(&self, divisor: u16) {
        UsartRegs::set_baud(self, divisor);
    }

    #[inline]
    fn set_event_input(&self, enabled: bool) {
        if enabled {
            self.set_evctrl(EVCTRL_IREI);
            self.set_txplctrl(TXPLCTRL_DISABLED);
        } else {
            self.set_evctrl(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::UnsafeCell;

    #[repr(C, align(2))]
    struct FakeMmio(UnsafeCell<[u8; 16]>);

    impl FakeMmio {
        fn regs(&self) -> UsartRegs {
            // SAFETY: 16 bytes cover every register offset up to TXPLCTRL.
            unsafe { UsartRegs::new(self.0.get() as usize) }
        }

        fn byte(&self, offset: usize) -> u8 {
            // SAFETY: Single-threaded test, offset in range.
            unsafe { (*self.0.get())[offset] }
        }

        fn poke(&self, offset: usize, value: u8) {
            // SAFETY: Single-threaded test, offset in range.
            unsafe { (*self.0.get())[offset] = value }
        }
    }

    #[test]
    fn mmio_receive_reads_both_halves() {
        let mem = FakeMmio(UnsafeCell::new([0; 16]));
        mem.poke(0x00, b'Z');
        mem.poke(0x01, (RxDataH::RXCIF | RxDataH::PERR).bits());

        let frame = Usart::receive(&mem.regs());
        assert_eq!(frame.data, b'Z');
        assert!(frame.parity_error());
    }

    #[test]
    fn mmio_event_input_programs_both_registers() {
        let mem = FakeMmio(UnsafeCell::new([0; 16]));
        let regs = mem.regs();

        regs.set_event_input(true);
        assert_eq!(mem.byte(0x0C), EVCTRL_IREI);
        assert_eq!(mem.byte(0x0D), TXPLCTRL_DISABLED);

        regs.set_event_input(false);
        assert_eq!(mem.byte(0x0C), 0);
    }

    #[test]
    fn mmio_modify_control_a() {
        let mem = FakeMmio(UnsafeCell::new([0; 16]));
        let regs = mem.regs();

        regs.set_control_a(CtrlA::RXCIE);
        regs.modify_control_a(|a| a | CtrlA::DREIE);
        assert_eq!(mem.byte(0x05), 0xA0);
        Usart::transmit(&regs, 0x42);
        assert_eq!(mem.byte(0x02), 0x42);
    }
}
