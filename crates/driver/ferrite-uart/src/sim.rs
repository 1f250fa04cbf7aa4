//! Hosted USART simulator.
//!
//! Models just enough of the peripheral to run the driver on a development
//! machine: a one-byte holding register in front of a shift register, a
//! two-deep receive FIFO, write-one-to-clear status flags and loop-back
//! echo. Every register write is appended to an event log so tests can
//! check ordering.
//!
//! Nothing happens on its own. Tests move time forward with
//! [`SimUsart::shift_out`] (one character leaves the shift register) and
//! take interrupts with [`Port::service_interrupts`], or let
//! [`Port::run_until_idle`] do both until the port settles. With
//! [`SimUsart::set_auto_shift`], every status read also shifts a character,
//! which lets blocking calls complete from the polling fallback.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::vec::Vec;

use ferrite_core::ring::{Capacity, SupportedCapacity};
use ferrite_core::{Interrupts, IrqState};

use crate::isr::{SerialIsr, Vector};
use crate::pins::{Gpio, MuxRow, MuxTable, PinMode};
use crate::port::Port;
use crate::regs::{CtrlA, CtrlB, CtrlC, RxDataH, Status};
use crate::usart::{RxFrame, Usart};

/// Depth of the hardware receive FIFO.
const RX_FIFO_DEPTH: usize = 2;

/// Peripheral clock of the simulated part.
pub const SIM_CLOCK_HZ: u32 = 24_000_000;

/// A register write seen by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// `STATUS` flags cleared.
    ClearStatus(Status),
    /// Byte written to `TXDATAL`.
    Transmit(u8),
    /// `CTRLA` written.
    ControlA(CtrlA),
    /// `CTRLB` written.
    ControlB(CtrlB),
    /// `CTRLC` written.
    FrameFormat(CtrlC),
    /// `BAUD` written.
    Baud(u16),
    /// Event input enabled or disabled.
    EventInput(bool),
}

// ---------------------------------------------------------------------------
// SimUsart
// ---------------------------------------------------------------------------

/// In-memory USART.
#[derive(Debug)]
pub struct SimUsart {
    ctrla: Cell<CtrlA>,
    ctrlb: Cell<CtrlB>,
    ctrlc: Cell<CtrlC>,
    baud: Cell<u16>,
    event_input: Cell<bool>,
    status: Cell<Status>,
    rx_fifo: RefCell<VecDeque<RxFrame>>,
    holding: Cell<Option<u8>>,
    shifter: Cell<Option<u8>>,
    wire: RefCell<Vec<u8>>,
    auto_shift: Cell<bool>,
    events: RefCell<Vec<SimEvent>>,
}

impl Default for SimUsart {
    fn default() -> Self {
        Self::new()
    }
}

impl SimUsart {
    /// Creates a USART in its reset state: data register empty, nothing
    /// received.
    pub fn new() -> Self {
        Self {
            ctrla: Cell::new(CtrlA::empty()),
            ctrlb: Cell::new(CtrlB::empty()),
            ctrlc: Cell::new(CtrlC::empty()),
            baud: Cell::new(0),
            event_input: Cell::new(false),
            status: Cell::new(Status::DREIF),
            rx_fifo: RefCell::new(VecDeque::with_capacity(RX_FIFO_DEPTH)),
            holding: Cell::new(None),
            shifter: Cell::new(None),
            wire: RefCell::new(Vec::new()),
            auto_shift: Cell::new(false),
            events: RefCell::new(Vec::new()),
        }
    }

    /// Makes every `STATUS` read shift out one character first.
    pub fn set_auto_shift(&self, enabled: bool) {
        self.auto_shift.set(enabled);
    }

    /// Finishes transmitting the character in the shift register.
    ///
    /// Returns `false` if the transmitter was idle.
    pub fn shift_out(&self) -> bool {
        let Some(byte) = self.shifter.take() else {
            return false;
        };
        self.wire.borrow_mut().push(byte);
        if self.ctrla.get().contains(CtrlA::LBME) {
            self.push_frame(RxFrame::new(byte));
        }

        let next = self.holding.take();
        self.shifter.set(next);
        let mut status = self.status.get() | Status::DREIF;
        if next.is_none() {
            status |= Status::TXCIF;
        }
        self.status.set(status);
        true
    }

    /// Delivers a character on the RX line.
    pub fn inject(&self, byte: u8) {
        self.push_frame(RxFrame::new(byte));
    }

    /// Delivers a character that fails its parity check.
    pub fn inject_parity_error(&self, byte: u8) {
        let mut frame = RxFrame::new(byte);
        frame.flags |= RxDataH::PERR;
        self.push_frame(frame);
    }

    fn push_frame(&self, frame: RxFrame) {
        let mut fifo = self.rx_fifo.borrow_mut();
        if fifo.len() < RX_FIFO_DEPTH {
            fifo.push_back(frame);
        } else if let Some(last) = fifo.back_mut() {
            last.flags |= RxDataH::BUFOVF;
        }
        self.status.set(self.status.get() | Status::RXCIF);
    }

    /// Returns the highest-priority vector that is both flagged and
    /// enabled.
    pub fn pending(&self) -> Option<Vector> {
        let status = self.status.get();
        let ctrla = self.ctrla.get();
        if ctrla.contains(CtrlA::RXCIE) && status.contains(Status::RXCIF) {
            Some(Vector::ReceiveComplete)
        } else if ctrla.contains(CtrlA::DREIE) && status.contains(Status::DREIF) {
            Some(Vector::DataRegisterEmpty)
        } else if ctrla.contains(CtrlA::TXCIE) && status.contains(Status::TXCIF) {
            Some(Vector::TransmitComplete)
        } else {
            None
        }
    }

    /// Returns `true` if nothing is waiting in the transmit path.
    pub fn tx_idle(&self) -> bool {
        self.holding.get().is_none() && self.shifter.get().is_none()
    }

    /// Returns and clears the bytes that have left the transmitter.
    pub fn take_wire(&self) -> Vec<u8> {
        self.wire.take()
    }

    /// Returns and clears the event log.
    pub fn take_events(&self) -> Vec<SimEvent> {
        self.events.take()
    }

    /// Returns the current frame format.
    pub fn frame_format(&self) -> CtrlC {
        self.ctrlc.get()
    }

    /// Returns the current baud divisor.
    pub fn baud(&self) -> u16 {
        self.baud.get()
    }

    /// Returns `true` if RX comes from the event system.
    pub fn event_input(&self) -> bool {
        self.event_input.get()
    }

    /// Returns `STATUS` without side effects.
    pub fn peek_status(&self) -> Status {
        self.status.get()
    }

    fn record(&self, event: SimEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl Usart for SimUsart {
    fn receive(&self) -> RxFrame {
        let mut fifo = self.rx_fifo.borrow_mut();
        let frame = fifo.pop_front().unwrap_or(RxFrame {
            flags: RxDataH::empty(),
            data: 0,
        });
        if fifo.is_empty() {
            self.status.set(self.status.get().difference(Status::RXCIF));
        }
        frame
    }

    fn transmit(&self, byte: u8) {
        self.record(SimEvent::Transmit(byte));
        if self.shifter.get().is_none() {
            self.shifter.set(Some(byte));
        } else if self.holding.get().is_none() {
            self.holding.set(Some(byte));
            self.status.set(self.status.get().difference(Status::DREIF));
        }
    }

    fn status(&self) -> Status {
        if self.auto_shift.get() {
            self.shift_out();
        }
        self.status.get()
    }

    fn clear_status(&self, flags: Status) {
        self.record(SimEvent::ClearStatus(flags));
        let cleared = flags.intersection(Status::WRITE_ONE_TO_CLEAR);
        self.status.set(self.status.get().difference(cleared));
    }

    fn control_a(&self) -> CtrlA {
        self.ctrla.get()
    }

    fn set_control_a(&self, value: CtrlA) {
        self.record(SimEvent::ControlA(value));
        self.ctrla.set(value);
    }

    fn control_b(&self) -> CtrlB {
        self.ctrlb.get()
    }

    fn set_control_b(&self, value: CtrlB) {
        self.record(SimEvent::ControlB(value));
        self.ctrlb.set(value);
    }

    fn set_frame_format(&self, value: CtrlC) {
        self.record(SimEvent::FrameFormat(value));
        self.ctrlc.set(value);
    }

    fn set_baud(&self, divisor: u16) {
        self.record(SimEvent::Baud(divisor));
        self.baud.set(divisor);
    }

    fn set_event_input(&self, enabled: bool) {
        self.record(SimEvent::EventInput(enabled));
        self.event_input.set(enabled);
    }
}

// ---------------------------------------------------------------------------
// SimInterrupts
// ---------------------------------------------------------------------------

/// Simulated global interrupt state.
#[derive(Debug)]
pub struct SimInterrupts {
    enabled: Cell<bool>,
    in_handler: Cell<bool>,
    masked_sections: Cell<u32>,
}

impl Default for SimInterrupts {
    fn default() -> Self {
        Self::new()
    }
}

impl SimInterrupts {
    /// Interrupts enabled, not in a handler.
    pub const fn new() -> Self {
        Self {
            enabled: Cell::new(true),
            in_handler: Cell::new(false),
            masked_sections: Cell::new(0),
        }
    }

    /// Sets the global enable state.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// Marks the CPU as inside or outside an interrupt handler.
    pub fn set_in_handler(&self, in_handler: bool) {
        self.in_handler.set(in_handler);
    }

    /// Number of `save_and_disable` calls so far.
    pub fn masked_sections(&self) -> u32 {
        self.masked_sections.get()
    }
}

impl Interrupts for SimInterrupts {
    fn enabled(&self) -> bool {
        self.enabled.get()
    }

    fn in_handler(&self) -> bool {
        self.in_handler.get()
    }

    fn save_and_disable(&self) -> IrqState {
        self.masked_sections.set(self.masked_sections.get() + 1);
        IrqState::saved(self.enabled.replace(false))
    }

    fn restore(&self, state: IrqState) {
        self.enabled.set(state.was_enabled());
    }
}

// ---------------------------------------------------------------------------
// Pins
// ---------------------------------------------------------------------------

/// A GPIO request seen by [`SimGpio`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioCall {
    /// Pin drive mode set.
    Mode(u8, PinMode),
    /// Route group code written.
    Route(u8),
}

/// GPIO backend that records requests.
#[derive(Debug, Default)]
pub struct SimGpio {
    calls: RefCell<Vec<GpioCall>>,
}

impl SimGpio {
    /// Returns and clears the recorded requests.
    pub fn take_calls(&self) -> Vec<GpioCall> {
        self.calls.take()
    }
}

impl Gpio for SimGpio {
    fn set_mode(&self, pin: u8, mode: PinMode) {
        self.calls.borrow_mut().push(GpioCall::Mode(pin, mode));
    }

    fn select_route(&self, group_code: u8) {
        self.calls.borrow_mut().push(GpioCall::Route(group_code));
    }
}

/// Two pin sets: TX on pin 0 (XCK 2) and TX on pin 4 (XCK 6).
pub const SIM_ROWS: [MuxRow; 2] = [
    MuxRow {
        group_code: 0x00,
        tx: Some(0),
        xck: Some(2),
    },
    MuxRow {
        group_code: 0x01,
        tx: Some(4),
        xck: Some(6),
    },
];

/// Route group code that disconnects the simulated USART.
pub const SIM_ROUTE_NONE: u8 = 0x03;

/// Pin router of the simulated part.
pub type SimPins = MuxTable<'static, SimGpio>;

// ---------------------------------------------------------------------------
// SimPort
// ---------------------------------------------------------------------------

/// A port wired to the simulator.
pub type SimPort<const RX: usize, const TX: usize> = Port<SimUsart, SimPins, SimInterrupts, RX, TX>;

impl<const RX: usize, const TX: usize> Port<SimUsart, SimPins, SimInterrupts, RX, TX>
where
    Capacity<RX>: SupportedCapacity,
    Capacity<TX>: SupportedCapacity,
{
    /// Creates a port on a fresh simulator.
    pub fn simulated() -> Self {
        let pins = MuxTable::new(&SIM_ROWS, SIM_ROUTE_NONE, SimGpio::default());
        // SAFETY: The simulator is single-threaded and its handlers only run
        // from `service_interrupts`, never preempting foreground code.
        unsafe {
            Self::new(
                "sim",
                SimUsart::new(),
                pins,
                SimInterrupts::new(),
                SIM_CLOCK_HZ,
            )
        }
    }

    /// Takes the highest-priority pending interrupt, if interrupts are
    /// enabled. Returns `false` if none was taken.
    pub fn service_interrupts(&self) -> bool {
        if !self.interrupts().enabled() {
            return false;
        }
        let Some(vector) = self.usart().pending() else {
            return false;
        };
        let irq = self.interrupts();
        irq.set_in_handler(true);
        irq.set_enabled(false);
        self.service(vector);
        irq.set_enabled(true);
        irq.set_in_handler(false);
        true
    }

    /// Alternates interrupts and character times until nothing is left to
    /// do.
    pub fn run_until_idle(&self) {
        while self.service_interrupts() || self.usart().shift_out() {}
    }
}
