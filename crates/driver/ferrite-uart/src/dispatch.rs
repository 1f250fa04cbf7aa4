//! Vector-to-channel dispatch.
//!
//! Parts with several USARTs need one set of vector stubs per unit. A
//! [`ChannelTable`] maps unit numbers to bound channels so the stubs can
//! share a single dispatcher:
//!
//! ```ignore
//! static CHANNELS: ChannelTable<'static, 6> = ChannelTable::new();
//!
//! CHANNELS.bind(&Cpu, 0, &SERIAL0)?;
//!
//! // In the USART0 RXC vector:
//! CHANNELS.dispatch(0, Vector::ReceiveComplete);
//! ```
//!
//! Binding is one-shot per unit. A stub that fires before its unit is
//! bound does nothing.
//!
//! AVR has no atomic read-modify-write, so a slot is claimed with a plain
//! load and store inside an interrupt-masked section. That makes `bind`
//! safe against the vector stubs of the same core, which is the only
//! concurrency the table is built for.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU8, Ordering};

use ferrite_core::Interrupts;

use crate::error::DispatchError;
use crate::isr::{SerialIsr, Vector};

const EMPTY: u8 = 0;
const BOUND: u8 = 1;

struct Slot<'a, S: ?Sized> {
    state: AtomicU8,
    channel: UnsafeCell<Option<&'a S>>,
}

impl<S: ?Sized> Slot<'_, S> {
    const fn new() -> Self {
        Self {
            state: AtomicU8::new(EMPTY),
            channel: UnsafeCell::new(None),
        }
    }
}

/// Maps USART unit numbers to serial channels.
pub struct ChannelTable<'a, const N: usize, S: ?Sized + SerialIsr + 'a = dyn SerialIsr + Sync + 'a> {
    slots: [Slot<'a, S>; N],
}

// SAFETY: A slot's channel is written once, with interrupts masked and
// before its state is published as BOUND with Release ordering, and only
// read after an Acquire load observes BOUND. The channels themselves are
// shared, so they must be Sync.
unsafe impl<'a, const N: usize, S: ?Sized + SerialIsr + Sync + 'a> Sync for ChannelTable<'a, N, S> {}

impl<'a, const N: usize, S: ?Sized + SerialIsr + 'a> ChannelTable<'a, N, S> {
    /// Creates a table with no channels bound.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [const { Slot::new() }; N],
        }
    }

    /// Binds `channel` to `unit`, masking interrupts through `irq` while the
    /// slot is claimed.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnitOutOfRange`] if `unit >= N` and
    /// [`DispatchError::AlreadyBound`] if the unit already has a channel.
    pub fn bind<I: Interrupts>(
        &self,
        irq: &I,
        unit: usize,
        channel: &'a S,
    ) -> Result<(), DispatchError> {
        let slot = self
            .slots
            .get(unit)
            .ok_or(DispatchError::UnitOutOfRange(unit))?;

        irq.free(|| {
            if slot.state.load(Ordering::Relaxed) != EMPTY {
                return Err(DispatchError::AlreadyBound(unit));
            }
            // SAFETY: The slot is still EMPTY and interrupts are masked, so
            // no dispatcher reads it and no other `bind` can interleave.
            unsafe { *slot.channel.get() = Some(channel) };
            slot.state.store(BOUND, Ordering::Release);
            Ok(())
        })
    }

    /// Returns `true` if `unit` has a channel bound.
    pub fn is_bound(&self, unit: usize) -> bool {
        self.slots
            .get(unit)
            .is_some_and(|slot| slot.state.load(Ordering::Acquire) == BOUND)
    }

    /// Runs the `vector` handler of the channel bound to `unit`.
    ///
    /// Returns `false` if no channel is bound there.
    pub fn dispatch(&self, unit: usize, vector: Vector) -> bool {
        let Some(slot) = self.slots.get(unit) else {
            return false;
        };
        if slot.state.load(Ordering::Acquire) != BOUND {
            return false;
        }
        // SAFETY: BOUND is only published after the channel is written, and
        // the slot is never written again.
        match unsafe { *slot.channel.get() } {
            Some(channel) => {
                channel.service(vector);
                true
            }
            None => false,
        }
    }
}

impl<'a, const N: usize, S: ?Sized + SerialIsr + 'a> Default for ChannelTable<'a, N, S> {
    fn default() -> Self {
        Self::new()
    }
}
