//! Buffered serial port.
//!
//! A [`Port`] owns one USART, its receive and transmit rings, and the
//! channel mode. Foreground code calls the methods here; the three
//! interrupt handlers (see [`SerialIsr`](crate::isr::SerialIsr)) move bytes
//! between the rings and the data registers.
//!
//! # Ring ownership
//!
//! | Ring | Producer | Consumer |
//! |------|----------|----------|
//! | RX | receive-complete handler | `read` / `peek` / `end` |
//! | TX | `write` | data-register-empty handler, or the polling fallback |
//!
//! # Polling fallback
//!
//! `write` on a full ring and `flush` spin until the hardware drains. If
//! interrupts are globally disabled, or the caller is itself an interrupt
//! handler, the data-register-empty handler cannot run, so each spin
//! iteration performs its transfer directly. When the handler can run, the
//! fallback does nothing so the two never dequeue the same byte.

use core::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;
use ferrite_core::ring::{Capacity, RingBuffer, SupportedCapacity};
use ferrite_core::{Interrupts, fdebug, fwarn};

use crate::baud::BaudSetting;
use crate::config::{ChannelFlags, SerialConfig};
use crate::error::SerialError;
use crate::pins::{MUX_NONE, PinEnable, PinRole, PinRouter};
use crate::regs::{CtrlA, CtrlB, Status};
use crate::usart::Usart;

bitflags! {
    /// Channel mode bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct State: u8 {
        /// A byte was written since the last `begin`/`end`.
        const WRITTEN       = 1 << 0;
        /// Single-wire half duplex: RX is disabled while transmitting.
        const HALF_DUPLEX   = 1 << 1;
        /// `begin` has configured the peripheral.
        const ACTIVE        = 1 << 2;
    }
}

/// An interrupt-driven buffered serial port.
///
/// `RX` and `TX` are the ring storage sizes; each holds one byte less than
/// its size. See [`config::default_rx_size`](crate::config::default_rx_size)
/// for SRAM-based defaults.
pub struct Port<U, P, I, const RX: usize, const TX: usize>
where
    Capacity<RX>: SupportedCapacity,
    Capacity<TX>: SupportedCapacity,
{
    label: &'static str,
    usart: U,
    pins: P,
    irq: I,
    clock_hz: u32,
    rx: RingBuffer<RX>,
    tx: RingBuffer<TX>,
    /// `State` bits. Written only by foreground code.
    state: AtomicU8,
    /// Active pin set. Written only by foreground code.
    pin_set: AtomicU8,
}

impl<U, P, I, const RX: usize, const TX: usize> Port<U, P, I, RX, TX>
where
    U: Usart,
    P: PinRouter,
    I: Interrupts,
    Capacity<RX>: SupportedCapacity,
    Capacity<TX>: SupportedCapacity,
{
    /// Creates an unconfigured port on pin set 0.
    ///
    /// `label` names the port in log messages; `clock_hz` is the peripheral
    /// clock used for baud computation.
    ///
    /// # Safety
    ///
    /// The port's rings are lock-free single-producer single-consumer
    /// queues. The caller must ensure that:
    ///
    /// - the foreground methods (`begin`, `end`, `write`, `read`, `peek`,
    ///   `flush`, `pins`, `swap` and the trait adaptors built on them) are
    ///   never executing in two contexts at once, and
    /// - the [`SerialIsr`](crate::isr::SerialIsr) handlers are only invoked
    ///   from this USART's interrupt vectors (or a dispatcher standing in for
    ///   them) and never preempt each other.
    pub const unsafe fn new(label: &'static str, usart: U, pins: P, irq: I, clock_hz: u32) -> Self {
        Self {
            label,
            usart,
            pins,
            irq,
            clock_hz,
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            state: AtomicU8::new(0),
            pin_set: AtomicU8::new(0),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Returns the port's log label.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Returns the register interface.
    pub fn usart(&self) -> &U {
        &self.usart
    }

    /// Returns the pin router.
    pub fn pin_router(&self) -> &P {
        &self.pins
    }

    /// Returns the interrupt controller.
    pub fn interrupts(&self) -> &I {
        &self.irq
    }

    /// Returns `true` between `begin` and `end`.
    pub fn is_active(&self) -> bool {
        self.state().contains(State::ACTIVE)
    }

    /// Returns `true` if the port runs single-wire half duplex.
    pub fn is_half_duplex(&self) -> bool {
        self.state().contains(State::HALF_DUPLEX)
    }

    /// Returns the active pin-set selector.
    pub fn pin_set(&self) -> u8 {
        self.pin_set.load(Ordering::Relaxed)
    }

    fn state(&self) -> State {
        State::from_bits_retain(self.state.load(Ordering::Relaxed))
    }

    fn set_state(&self, state: State) {
        self.state.store(state.bits(), Ordering::Relaxed);
    }

    // Wide ring indices take more than one access on 8-bit cores, so
    // foreground reads run with interrupts masked.
    fn with_rx<R>(&self, f: impl FnOnce(&RingBuffer<RX>) -> R) -> R {
        if RingBuffer::<RX>::WIDE_INDEX {
            self.irq.free(|| f(&self.rx))
        } else {
            f(&self.rx)
        }
    }

    fn with_tx<R>(&self, f: impl FnOnce(&RingBuffer<TX>) -> R) -> R {
        if RingBuffer::<TX>::WIDE_INDEX {
            self.irq.free(|| f(&self.tx))
        } else {
            f(&self.tx)
        }
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Configures and enables the port with the 8N1 frame format.
    pub fn begin_default(&self, baud: u32) {
        self.begin_with(baud, SerialConfig::new());
    }

    /// Configures and enables the port from an options word
    /// (`SERIAL_8N1 | SERIAL_HALF_DUPLEX`, ...).
    pub fn begin(&self, baud: u32, options: u16) {
        self.begin_with(baud, SerialConfig::from_options(options));
    }

    /// Configures and enables the port.
    ///
    /// A port that is already active is shut down with [`end`](Self::end)
    /// first. Pin modes for the active pin set are applied here.
    pub fn begin_with(&self, baud: u32, config: SerialConfig) {
        if self.is_active() {
            self.end();
        }

        let setting = BaudSetting::compute(self.clock_hz, baud);
        if setting.clamped {
            fwarn!(
                "{}: {} baud is out of range, using divisor {}",
                self.label,
                baud,
                setting.divisor
            );
        }

        let rx_enabled = config.rx_enabled();
        let tx_enabled = config.tx_enabled();

        let mut ctrlb = CtrlB::empty();
        ctrlb.set(CtrlB::RXEN, rx_enabled);
        ctrlb.set(CtrlB::TXEN, tx_enabled);
        ctrlb.set(CtrlB::ODME, config.flags.contains(ChannelFlags::OPEN_DRAIN));
        ctrlb.set(CtrlB::RXMODE_CLK2X, setting.double_speed);

        let mut ctrla = CtrlA::empty();
        ctrla.set(CtrlA::LBME, config.flags.contains(ChannelFlags::LOOPBACK));
        ctrla.set(CtrlA::RS485, config.flags.contains(ChannelFlags::RS485));
        ctrla.set(CtrlA::RXCIE, rx_enabled);

        let mut enable = PinEnable::empty();
        enable.set(PinEnable::RX, rx_enabled);
        enable.set(PinEnable::TX, tx_enabled);
        enable.set(PinEnable::OPEN_DRAIN, config.flags.contains(ChannelFlags::OPEN_DRAIN));
        enable.set(PinEnable::RS485, config.flags.contains(ChannelFlags::RS485));

        let mut state = State::ACTIVE;
        if config.is_half_duplex() {
            state |= State::HALF_DUPLEX;
            enable |= PinEnable::HALF_DUPLEX;
        }

        let event_rx = config.flags.contains(ChannelFlags::EVENT_RX);
        if event_rx {
            enable.remove(PinEnable::RX);
        }

        let pin_set = self.pin_set();
        self.irq.free(|| {
            // Some fields are enable-locked, so the transceivers go off first.
            self.usart.set_control_b(CtrlB::empty());
            self.usart.set_frame_format(config.frame_format());
            self.usart.set_baud(setting.divisor);
            self.usart.set_event_input(event_rx);
            self.usart.set_control_a(ctrla);
            self.usart.set_control_b(ctrlb);
            self.pins.configure(pin_set, enable);
        });
        self.set_state(state);

        fdebug!(
            "{}: begin {} baud (divisor {}{}), options {:#06x}, pin set {}",
            self.label,
            baud,
            setting.divisor,
            if setting.double_speed { ", clk2x" } else { "" },
            config.to_options(),
            pin_set
        );
    }

    /// Drains pending output and disables the port.
    ///
    /// Unread received bytes are discarded. Pin modes are left as they are.
    pub fn end(&self) {
        self.flush();

        self.irq.free(|| {
            self.usart.set_control_b(CtrlB::empty());
            self.usart.set_control_a(CtrlA::empty());
            self.usart.clear_status(Status::TXCIF);
        });

        // SAFETY: Foreground code is the only RX consumer.
        self.with_rx(|rx| unsafe { rx.clear() });
        self.set_state(State::empty());

        fdebug!("{}: end", self.label);
    }

    // -----------------------------------------------------------------------
    // Pin selection
    // -----------------------------------------------------------------------

    /// Selects a pin set by index, or [`MUX_NONE`] for no pins.
    ///
    /// Takes effect at the next `begin`.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::InvalidPinSet`] for any other selector; the
    /// active pin set then falls back to set 0.
    pub fn try_swap(&self, selector: u8) -> Result<(), SerialError> {
        let count = self.pins.mux_count();
        let (pin_set, result) = if selector < count {
            (selector, Ok(()))
        } else if selector == MUX_NONE {
            (count, Ok(()))
        } else {
            (0, Err(SerialError::InvalidPinSet(selector)))
        };

        self.pin_set.store(pin_set, Ordering::Relaxed);
        match result {
            Ok(()) => fdebug!("{}: pin set {}", self.label, pin_set),
            Err(_) => fwarn!("{}: invalid pin set {}, using 0", self.label, selector),
        }
        result
    }

    /// Selects a pin set by index. Returns `false` if the selector is
    /// invalid, in which case pin set 0 becomes active.
    pub fn swap(&self, selector: u8) -> bool {
        self.try_swap(selector).is_ok()
    }

    /// Selects the pin set that carries `tx` and `rx`; both `None` selects no
    /// pins.
    ///
    /// # Errors
    ///
    /// Returns [`SerialError::PinsNotRouted`] if no pin set matches; the
    /// active pin set then falls back to set 0.
    pub fn try_pins(&self, tx: Option<u8>, rx: Option<u8>) -> Result<(), SerialError> {
        match self.pins.resolve(tx, rx) {
            Some(selector) => self.try_swap(selector),
            None => {
                self.pin_set.store(0, Ordering::Relaxed);
                fwarn!("{}: no pin set for tx={:?} rx={:?}, using 0", self.label, tx, rx);
                Err(SerialError::PinsNotRouted { tx, rx })
            }
        }
    }

    /// Selects the pin set that carries `tx` and `rx`. Returns `false` if
    /// none does.
    pub fn pins(&self, tx: Option<u8>, rx: Option<u8>) -> bool {
        self.try_pins(tx, rx).is_ok()
    }

    /// Returns the physical pin carrying `role` in the active pin set.
    pub fn pin(&self, role: PinRole) -> Option<u8> {
        let pin_set = self.pin_set();
        if pin_set >= self.pins.mux_count() {
            return None;
        }
        self.pins.pin(pin_set, role)
    }

    // -----------------------------------------------------------------------
    // Receive
    // -----------------------------------------------------------------------

    /// Returns the number of received bytes waiting to be read.
    pub fn available(&self) -> usize {
        self.with_rx(RingBuffer::len)
    }

    /// Returns the next received byte without consuming it.
    pub fn peek(&self) -> Option<u8> {
        // SAFETY: Foreground code is the only RX consumer.
        self.with_rx(|rx| unsafe { rx.peek() })
    }

    /// Removes and returns the next received byte.
    pub fn read(&self) -> Option<u8> {
        // SAFETY: Foreground code is the only RX consumer.
        self.with_rx(|rx| unsafe { rx.pop() })
    }

    // -----------------------------------------------------------------------
    // Transmit
    // -----------------------------------------------------------------------

    /// Returns how many bytes can be written without blocking.
    pub fn available_for_write(&self) -> usize {
        self.with_tx(RingBuffer::free)
    }

    /// Queues `byte` for transmission and returns 1.
    ///
    /// If nothing is queued and the data register is empty, the byte goes
    /// straight to the hardware. Otherwise it is appended to the transmit
    /// ring, spinning while the ring is full, and the data-register-empty
    /// interrupt is armed.
    pub fn write(&self, byte: u8) -> usize {
        let state = self.state() | State::WRITTEN;
        self.set_state(state);
        let half_duplex = state.contains(State::HALF_DUPLEX);

        let sent = self.irq.free(|| {
            if !self.tx.is_empty() || !self.usart.status().contains(Status::DREIF) {
                return false;
            }
            // TXCIF must be cleared before the data write, or a late clear
            // could erase the flag for this very byte.
            self.usart.clear_status(Status::TXCIF);
            if half_duplex {
                self.usart
                    .modify_control_a(|a| a.difference(CtrlA::RXCIE) | CtrlA::TXCIE);
            }
            self.usart.transmit(byte);
            true
        });
        if sent {
            return 1;
        }

        // SAFETY: `write` is the only TX producer.
        while !self.with_tx(|tx| unsafe { tx.try_push(byte) }) {
            self.poll_tx();
            core::hint::spin_loop();
        }

        self.irq.free(|| {
            if half_duplex {
                self.usart.clear_status(Status::TXCIF);
                self.usart.modify_control_a(|a| {
                    a.difference(CtrlA::RXCIE) | CtrlA::TXCIE | CtrlA::DREIE
                });
            } else {
                self.usart.modify_control_a(|a| a | CtrlA::DREIE);
            }
        });
        1
    }

    /// Writes every byte of `bytes`, returning the count.
    pub fn write_bytes(&self, bytes: &[u8]) -> usize {
        bytes.iter().map(|&byte| self.write(byte)).sum()
    }

    /// Blocks until every written byte has left the shift register.
    ///
    /// Returns immediately if nothing was written since `begin`.
    pub fn flush(&self) {
        if !self.state().contains(State::WRITTEN) {
            return;
        }

        while self.usart.control_a().contains(CtrlA::DREIE)
            || !self.usart.status().contains(Status::TXCIF)
        {
            self.poll_tx();
            core::hint::spin_loop();
        }
    }

    /// Performs the data-register-empty transfer when its interrupt cannot
    /// fire.
    fn poll_tx(&self) {
        if self.irq.can_preempt() {
            return;
        }
        if self.usart.status().contains(Status::DREIF) {
            self.transmit_next();
        }
    }

    /// Moves one byte from the TX ring to the data register, disarming the
    /// data-register-empty interrupt once the ring drains.
    pub(crate) fn transmit_next(&self) {
        // SAFETY: The data-register-empty handler and the polling fallback
        // are the TX consumers, and the fallback only runs when the handler
        // cannot.
        let Some(byte) = (unsafe { self.tx.peek() }) else {
            self.usart.modify_control_a(|a| a.difference(CtrlA::DREIE));
            return;
        };

        self.usart.clear_status(Status::TXCIF);
        self.usart.transmit(byte);
        // Disarm before publishing the new tail, so a writer that sees the
        // ring empty never races a still-armed interrupt.
        if self.tx.len() == 1 {
            self.usart.modify_control_a(|a| a.difference(CtrlA::DREIE));
        }
        // SAFETY: Same consumer as above; the ring holds `byte`.
        unsafe { self.tx.advance() };
    }

    /// Stores a received frame, dropping it on parity error or overflow.
    pub(crate) fn receive_next(&self) {
        let frame = self.usart.receive();
        if frame.parity_error() {
            return;
        }
        // SAFETY: The receive-complete handler is the only RX producer.
        let _ = unsafe { self.rx.try_push(frame.data) };
    }

    /// Ends a half-duplex transmission: discards the echo of our own bytes
    /// and hands the line back to the receiver.
    pub(crate) fn finish_transmission(&self) {
        while self.usart.status().contains(Status::RXCIF) {
            let _ = self.usart.receive();
        }
        self.usart
            .modify_control_a(|a| a.difference(CtrlA::TXCIE) | CtrlA::RXCIE);
    }
}
