//! Pin routing.
//!
//! Each USART can be routed to one of several pin sets through the port
//! multiplexer. A pin set is selected by index; [`MUX_NONE`] disconnects the
//! peripheral from all pins. The driver only records the selection and asks
//! the [`PinRouter`] to apply it during `begin`; which pins exist and how
//! their drive modes are set is board data behind that trait.
//!
//! [`MuxTable`] is a table-driven router for parts where a set's pins are
//! consecutive: RX is TX + 1, XCK is TX + 2 and XDIR is XCK + 1.

use bitflags::bitflags;

/// Selector that disconnects the USART from all pins.
pub const MUX_NONE: u8 = 128;

/// A signal of the USART.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinRole {
    /// Transmit data.
    Tx,
    /// Receive data.
    Rx,
    /// Clock (synchronous modes).
    Xck,
    /// RS-485 transmit direction.
    Xdir,
}

bitflags! {
    /// Which signals a configuration uses, handed to [`PinRouter::configure`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PinEnable: u8 {
        /// RS-485: XDIR drives the transceiver direction.
        const RS485         = 1 << 0;
        /// TX is open-drain.
        const OPEN_DRAIN    = 1 << 3;
        /// Single-wire half duplex: RX is looped back internally and the RX
        /// pin is left alone.
        const HALF_DUPLEX   = 1 << 4;
        /// Transmitter in use.
        const TX            = 1 << 6;
        /// Receiver in use.
        const RX            = 1 << 7;
    }
}

/// Drive mode requested for a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Push-pull output.
    Output,
    /// Input with pull-up.
    InputPullup,
}

/// Board-specific pin resolution and configuration for one USART.
pub trait PinRouter {
    /// Number of selectable pin sets, excluding [`MUX_NONE`].
    fn mux_count(&self) -> u8;

    /// Finds the selector for a TX/RX pin pair.
    ///
    /// Both `None` resolves to [`MUX_NONE`]. Returns `None` if no pin set
    /// matches.
    fn resolve(&self, tx: Option<u8>, rx: Option<u8>) -> Option<u8>;

    /// Returns the pin carrying `role` in `pin_set`.
    fn pin(&self, pin_set: u8, role: PinRole) -> Option<u8>;

    /// Configures pin modes for `pin_set` and routes the USART to it. A
    /// `pin_set` equal to [`mux_count`](Self::mux_count) selects no pins.
    fn configure(&self, pin_set: u8, enable: PinEnable);
}

/// GPIO operations needed by [`MuxTable`].
pub trait Gpio {
    /// Sets the drive mode of a pin.
    fn set_mode(&self, pin: u8, mode: PinMode);

    /// Writes the USART's route group code to the port multiplexer.
    fn select_route(&self, group_code: u8);
}

/// One selectable pin set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxRow {
    /// Port multiplexer group code.
    pub group_code: u8,
    /// TX pin, if bonded out.
    pub tx: Option<u8>,
    /// XCK pin, if bonded out.
    pub xck: Option<u8>,
}

/// Table-driven [`PinRouter`].
#[derive(Debug)]
pub struct MuxTable<'a, G> {
    rows: &'a [MuxRow],
    none_code: u8,
    gpio: G,
}

impl<'a, G: Gpio> MuxTable<'a, G> {
    /// Creates a router over `rows`; `none_code` is the group code that
    /// disconnects the USART.
    pub const fn new(rows: &'a [MuxRow], none_code: u8, gpio: G) -> Self {
        Self {
            rows,
            none_code,
            gpio,
        }
    }

    /// Returns the GPIO backend.
    pub const fn gpio(&self) -> &G {
        &self.gpio
    }

    fn row(&self, pin_set: u8) -> Option<&MuxRow> {
        self.rows.get(usize::from(pin_set))
    }
}

impl<G: Gpio> PinRouter for MuxTable<'_, G> {
    fn mux_count(&self) -> u8 {
        u8::try_from(self.rows.len()).unwrap_or(u8::MAX)
    }

    fn resolve(&self, tx: Option<u8>, rx: Option<u8>) -> Option<u8> {
        match (tx, rx) {
            (None, None) => Some(MUX_NONE),
            (Some(tx), Some(rx)) if rx.wrapping_sub(tx) == 1 => self
                .rows
                .iter()
                .position(|row| row.tx == Some(tx))
                .and_then(|index| u8::try_from(index).ok()),
            _ => None,
        }
    }

    fn pin(&self, pin_set: u8, role: PinRole) -> Option<u8> {
        let row = self.row(pin_set)?;
        match role {
            PinRole::Tx => row.tx,
            PinRole::Rx => row.tx?.checked_add(1),
            PinRole::Xck => row.xck,
            PinRole::Xdir => row.xck?.checked_add(1),
        }
    }

    fn configure(&self, pin_set: u8, enable: PinEnable) {
        let Some(row) = self.row(pin_set) else {
            self.gpio.select_route(self.none_code);
            return;
        };

        if let Some(tx) = row.tx {
            if enable.contains(PinEnable::TX) && !enable.contains(PinEnable::OPEN_DRAIN) {
                self.gpio.set_mode(tx, PinMode::Output);
            } else if enable.intersects(PinEnable::TX | PinEnable::HALF_DUPLEX) {
                self.gpio.set_mode(tx, PinMode::InputPullup);
            }
            if enable.contains(PinEnable::RX) && !enable.contains(PinEnable::HALF_DUPLEX) {
                if let Some(rx) = tx.checked_add(1) {
                    self.gpio.set_mode(rx, PinMode::InputPullup);
                }
            }
            if enable.contains(PinEnable::RS485) {
                if let Some(xdir) = tx.checked_add(3) {
                    self.gpio.set_mode(xdir, PinMode::Output);
                }
            }
        }

        self.gpio.select_route(row.group_code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::vec::Vec;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Mode(u8, PinMode),
        Route(u8),
    }

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Call>>);

    impl Gpio for Recorder {
        fn set_mode(&self, pin: u8, mode: PinMode) {
            self.0.borrow_mut().push(Call::Mode(pin, mode));
        }

        fn select_route(&self, group_code: u8) {
            self.0.borrow_mut().push(Call::Route(group_code));
        }
    }

    const ROWS: [MuxRow; 2] = [
        MuxRow {
            group_code: 0x00,
            tx: Some(0),
            xck: Some(2),
        },
        MuxRow {
            group_code: 0x01,
            tx: Some(4),
            xck: None,
        },
    ];

    fn table() -> MuxTable<'static, Recorder> {
        MuxTable::new(&ROWS, 0x03, Recorder::default())
    }

    fn calls(table: &MuxTable<'_, Recorder>) -> Vec<Call> {
        table.gpio().0.borrow().clone()
    }

    #[test]
    fn resolve_requires_adjacent_pins() {
        let table = table();
        assert_eq!(table.resolve(Some(4), Some(5)), Some(1));
        assert_eq!(table.resolve(Some(0), Some(1)), Some(0));
        assert_eq!(table.resolve(Some(4), Some(6)), None);
        assert_eq!(table.resolve(Some(8), Some(9)), None);
        assert_eq!(table.resolve(None, None), Some(MUX_NONE));
        assert_eq!(table.resolve(Some(0), None), None);
    }

    #[test]
    fn pin_lookup_by_role() {
        let table = table();
        assert_eq!(table.pin(0, PinRole::Tx), Some(0));
        assert_eq!(table.pin(0, PinRole::Rx), Some(1));
        assert_eq!(table.pin(0, PinRole::Xck), Some(2));
        assert_eq!(table.pin(0, PinRole::Xdir), Some(3));
        assert_eq!(table.pin(1, PinRole::Xdir), None);
        assert_eq!(table.pin(2, PinRole::Tx), None);
    }

    #[test]
    fn full_duplex_modes() {
        let table = table();
        table.configure(1, PinEnable::TX | PinEnable::RX);
        assert_eq!(
            calls(&table),
            [
                Call::Mode(4, PinMode::Output),
                Call::Mode(5, PinMode::InputPullup),
                Call::Route(0x01),
            ]
        );
    }

    #[test]
    fn half_duplex_leaves_rx_alone() {
        let table = table();
        table.configure(
            0,
            PinEnable::TX | PinEnable::RX | PinEnable::OPEN_DRAIN | PinEnable::HALF_DUPLEX,
        );
        assert_eq!(
            calls(&table),
            [Call::Mode(0, PinMode::InputPullup), Call::Route(0x00)]
        );
    }

    #[test]
    fn rs485_drives_xdir() {
        let table = table();
        table.configure(0, PinEnable::TX | PinEnable::RS485);
        assert_eq!(
            calls(&table),
            [
                Call::Mode(0, PinMode::Output),
                Call::Mode(3, PinMode::Output),
                Call::Route(0x00),
            ]
        );
    }

    #[test]
    fn no_pins_only_routes() {
        let table = table();
        table.configure(table.mux_count(), PinEnable::TX | PinEnable::RX);
        assert_eq!(calls(&table), [Call::Route(0x03)]);
    }
}
