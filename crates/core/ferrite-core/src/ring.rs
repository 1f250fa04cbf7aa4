//! Lock-free single-producer single-consumer byte ring.
//!
//! [`RingBuffer`] is the hand-off point between foreground code and an
//! interrupt handler. One side only ever advances `head` (the producer),
//! the other only ever advances `tail` (the consumer), so neither side needs
//! a lock: the single-writer rule per index is the whole synchronisation
//! protocol.
//!
//! # Capacity
//!
//! The storage size `N` is a compile-time power of two between 2 and 32768.
//! One slot is always left free to tell "full" from "empty", so the usable
//! capacity is `N - 1`. `head == tail` means empty; `(head + 1) & (N - 1) ==
//! tail` means full.
//!
//! Unsupported sizes fail to compile because [`Capacity<N>`] only implements
//! [`SupportedCapacity`] for valid `N`. The same rule is available at run
//! time as [`validate_capacity`].
//!
//! # Index width
//!
//! Each capacity selects the narrowest index that can hold `[0, N)`: `u8` up
//! to 256 slots, `u16` above. On 8-bit cores a `u16` index takes two memory
//! accesses, so [`RingBuffer::WIDE_INDEX`] tells callers when foreground
//! reads of the indices must run with interrupts masked.
//!
//! # Ordering
//!
//! The producer writes the slot and then stores `head` with `Release`; the
//! consumer loads `head` with `Acquire` before reading the slot. The same
//! pairing applies to `tail` in the other direction, which keeps the
//! producer from overwriting a slot the consumer has not read yet.
//!
//! # Examples
//!
//! ```ignore
//! static RX: RingBuffer<16> = RingBuffer::new();
//!
//! // Interrupt handler (the only producer):
//! // SAFETY: Only the receive handler pushes into RX.
//! let _ = unsafe { RX.try_push(byte) };
//!
//! // Foreground (the only consumer):
//! // SAFETY: Only foreground code pops from RX.
//! if let Some(byte) = unsafe { RX.pop() } { /* ... */ }
//! ```

use core::fmt;

use crate::loom_compat::{AtomicU8, AtomicU16, Ordering, UnsafeCell};

// ---------------------------------------------------------------------------
// Capacity validation
// ---------------------------------------------------------------------------

/// Largest supported storage size. Keeps `N` representable in a 16-bit
/// `usize`.
pub const MAX_CAPACITY: usize = 1 << 15;

/// Reason a ring storage size is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityError {
    /// Fewer than two slots leaves no usable capacity.
    TooSmall(usize),
    /// The size is not a power of two.
    NotPowerOfTwo(usize),
    /// The size exceeds [`MAX_CAPACITY`].
    TooLarge(usize),
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooSmall(n) => write!(f, "ring size {n} is too small (minimum 2)"),
            Self::NotPowerOfTwo(n) => write!(f, "ring size {n} is not a power of two"),
            Self::TooLarge(n) => {
                write!(f, "ring size {n} exceeds the maximum of {MAX_CAPACITY}")
            }
        }
    }
}

/// Checks whether `n` is a valid ring storage size.
///
/// # Errors
///
/// Returns the [`CapacityError`] describing why `n` is rejected.
pub const fn validate_capacity(n: usize) -> Result<(), CapacityError> {
    if n < 2 {
        Err(CapacityError::TooSmall(n))
    } else if !n.is_power_of_two() {
        Err(CapacityError::NotPowerOfTwo(n))
    } else if n > MAX_CAPACITY {
        Err(CapacityError::TooLarge(n))
    } else {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Index types
// ---------------------------------------------------------------------------

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
}

/// An unsigned integer usable as a ring index.
pub trait RingIndex: sealed::Sealed {
    /// Atomic storage for the index.
    type Cell: Send + Sync;

    /// `true` if the index is wider than one byte.
    const WIDE: bool;

    /// A zeroed index cell.
    #[cfg(not(all(test, loom)))]
    #[allow(clippy::declare_interior_mutable_const)]
    #[doc(hidden)]
    const ZERO: Self::Cell;

    /// A zeroed index cell.
    #[cfg(all(test, loom))]
    #[doc(hidden)]
    fn zero() -> Self::Cell;

    #[doc(hidden)]
    fn load(cell: &Self::Cell, order: Ordering) -> usize;

    #[doc(hidden)]
    fn store(cell: &Self::Cell, value: usize, order: Ordering);
}

macro_rules! ring_index {
    ($int:ty, $atomic:ty, $wide:expr) => {
        impl RingIndex for $int {
            type Cell = $atomic;

            const WIDE: bool = $wide;

            #[cfg(not(all(test, loom)))]
            #[allow(clippy::declare_interior_mutable_const)]
            const ZERO: Self::Cell = <$atomic>::new(0);

            #[cfg(all(test, loom))]
            fn zero() -> Self::Cell {
                <$atomic>::new(0)
            }

            #[inline]
            fn load(cell: &Self::Cell, order: Ordering) -> usize {
                usize::from(cell.load(order))
            }

            #[inline]
            #[allow(clippy::cast_possible_truncation)]
            fn store(cell: &Self::Cell, value: usize, order: Ordering) {
                // Indices are always masked below N, which fits the type.
                cell.store(value as $int, order);
            }
        }
    };
}

ring_index!(u8, AtomicU8, false);
ring_index!(u16, AtomicU16, true);

/// Marker carrying a ring storage size.
#[derive(Debug, Clone, Copy)]
pub struct Capacity<const N: usize>;

/// Implemented by [`Capacity<N>`] for every supported storage size.
pub trait SupportedCapacity {
    /// The narrowest index type that holds `[0, N)`.
    type Index: RingIndex;
}

macro_rules! supported_capacities {
    ($($n:literal => $index:ty),* $(,)?) => {
        $(
            impl SupportedCapacity for Capacity<$n> {
                type Index = $index;
            }

            crate::static_assert!(
                validate_capacity($n).is_ok() && $n - 1 <= <$index>::MAX as usize
            );
        )*
    };
}

supported_capacities! {
    2 => u8,
    4 => u8,
    8 => u8,
    16 => u8,
    32 => u8,
    64 => u8,
    128 => u8,
    256 => u8,
    512 => u16,
    1024 => u16,
    2048 => u16,
    4096 => u16,
    8192 => u16,
    16384 => u16,
    32768 => u16,
}

type Index<const N: usize> = <Capacity<N> as SupportedCapacity>::Index;
type IndexCell<const N: usize> = <Index<N> as RingIndex>::Cell;

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity SPSC byte ring with `N - 1` usable slots.
///
/// The producer and consumer operations are `unsafe`: each side must be
/// driven from exactly one execution context at a time. Observers (`len`,
/// `is_empty`, `is_full`, `free`) may be called from either side.
pub struct RingBuffer<const N: usize>
where
    Capacity<N>: SupportedCapacity,
{
    slots: [UnsafeCell<u8>; N],
    head: IndexCell<N>,
    tail: IndexCell<N>,
}

// SAFETY: Slots are only written by the single producer at `head` and only
// read by the single consumer at `tail`; the index protocol keeps those
// slots disjoint. Callers of the unsafe push/pop methods uphold the
// single-producer / single-consumer contract.
unsafe impl<const N: usize> Sync for RingBuffer<N> where Capacity<N>: SupportedCapacity {}

impl<const N: usize> RingBuffer<N>
where
    Capacity<N>: SupportedCapacity,
{
    /// Storage size in bytes.
    pub const SIZE: usize = N;

    /// `true` if the indices are wider than one byte.
    pub const WIDE_INDEX: bool = <Index<N> as RingIndex>::WIDE;

    const MASK: usize = N - 1;

    /// Creates an empty ring.
    #[cfg(not(all(test, loom)))]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [const { UnsafeCell::new(0) }; N],
            head: <Index<N> as RingIndex>::ZERO,
            tail: <Index<N> as RingIndex>::ZERO,
        }
    }

    /// Creates an empty ring.
    #[cfg(all(test, loom))]
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| UnsafeCell::new(0)),
            head: <Index<N> as RingIndex>::zero(),
            tail: <Index<N> as RingIndex>::zero(),
        }
    }

    /// Returns the number of bytes the ring can hold (`N - 1`).
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    #[inline]
    fn head(&self, order: Ordering) -> usize {
        <Index<N> as RingIndex>::load(&self.head, order)
    }

    #[inline]
    fn tail(&self, order: Ordering) -> usize {
        <Index<N> as RingIndex>::load(&self.tail, order)
    }

    /// Returns the number of queued bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        let head = self.head(Ordering::Acquire);
        let tail = self.tail(Ordering::Acquire);
        (N + head - tail) & Self::MASK
    }

    /// Returns the number of bytes that can be pushed before the ring is
    /// full.
    #[must_use]
    pub fn free(&self) -> usize {
        let head = self.head(Ordering::Acquire);
        let tail = self.tail(Ordering::Acquire);
        if head >= tail {
            N - 1 - head + tail
        } else {
            tail - head - 1
        }
    }

    /// Returns `true` if no bytes are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head(Ordering::Acquire) == self.tail(Ordering::Acquire)
    }

    /// Returns `true` if no more bytes can be pushed.
    #[must_use]
    pub fn is_full(&self) -> bool {
        (self.head(Ordering::Acquire) + 1) & Self::MASK == self.tail(Ordering::Acquire)
    }

    // -----------------------------------------------------------------------
    // Producer side
    // -----------------------------------------------------------------------

    /// Appends `byte`, returning `false` (and dropping it) if the ring is
    /// full.
    ///
    /// # Safety
    ///
    /// The caller must be the ring's only producer: no other context may
    /// call `try_push` concurrently.
    pub unsafe fn try_push(&self, byte: u8) -> bool {
        let head = self.head(Ordering::Relaxed);
        let next = (head + 1) & Self::MASK;
        if next == self.tail(Ordering::Acquire) {
            return false;
        }

        // SAFETY: `head` is never handed to the consumer until the store
        // below, and only the single producer writes here.
        self.slots[head].with_mut(|slot| unsafe { slot.write(byte) });
        <Index<N> as RingIndex>::store(&self.head, next, Ordering::Release);
        true
    }

    // -----------------------------------------------------------------------
    // Consumer side
    // -----------------------------------------------------------------------

    /// Returns the oldest byte without removing it.
    ///
    /// # Safety
    ///
    /// The caller must be the ring's only consumer.
    #[must_use]
    pub unsafe fn peek(&self) -> Option<u8> {
        let tail = self.tail(Ordering::Relaxed);
        if tail == self.head(Ordering::Acquire) {
            return None;
        }

        // SAFETY: The producer published this slot with the `Release` store
        // of `head` observed above and will not touch it until `tail` moves.
        Some(self.slots[tail].with(|slot| unsafe { slot.read() }))
    }

    /// Removes and returns the oldest byte.
    ///
    /// # Safety
    ///
    /// The caller must be the ring's only consumer.
    pub unsafe fn pop(&self) -> Option<u8> {
        // SAFETY: Forwarded consumer contract.
        let byte = unsafe { self.peek() }?;
        let tail = self.tail(Ordering::Relaxed);
        <Index<N> as RingIndex>::store(&self.tail, (tail + 1) & Self::MASK, Ordering::Release);
        Some(byte)
    }

    /// Discards the oldest byte, typically one already read with
    /// [`peek`](Self::peek).
    ///
    /// # Safety
    ///
    /// The caller must be the ring's only consumer and the ring must not be
    /// empty.
    pub unsafe fn advance(&self) {
        debug_assert!(!self.is_empty(), "advance on an empty ring");
        let tail = self.tail(Ordering::Relaxed);
        <Index<N> as RingIndex>::store(&self.tail, (tail + 1) & Self::MASK, Ordering::Release);
    }

    /// Discards every queued byte by moving `tail` up to `head`.
    ///
    /// # Safety
    ///
    /// The caller must be the ring's only consumer.
    pub unsafe fn clear(&self) {
        let head = self.head(Ordering::Acquire);
        <Index<N> as RingIndex>::store(&self.tail, head, Ordering::Release);
    }
}

#[cfg(not(all(test, loom)))]
impl<const N: usize> Default for RingBuffer<N>
where
    Capacity<N>: SupportedCapacity,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> fmt::Debug for RingBuffer<N>
where
    Capacity<N>: SupportedCapacity,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("size", &N)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    fn drain<const N: usize>(ring: &RingBuffer<N>) -> Vec<u8>
    where
        Capacity<N>: SupportedCapacity,
    {
        // SAFETY: Tests drive both sides from one thread.
        core::iter::from_fn(|| unsafe { ring.pop() }).collect()
    }

    #[test]
    fn new_ring_is_empty() {
        let ring = RingBuffer::<16>::new();
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.free(), 15);
        assert_eq!(ring.capacity(), 15);
        // SAFETY: Single-threaded test.
        assert_eq!(unsafe { ring.pop() }, None);
    }

    #[test]
    fn push_pop_fifo_order() {
        let ring = RingBuffer::<8>::new();
        for byte in [10, 20, 30] {
            // SAFETY: Single-threaded test.
            assert!(unsafe { ring.try_push(byte) });
        }
        assert_eq!(drain(&ring), [10, 20, 30]);
    }

    #[test]
    fn peek_does_not_consume() {
        let ring = RingBuffer::<4>::new();
        // SAFETY: Single-threaded test.
        unsafe {
            assert!(ring.try_push(0xA5));
            assert_eq!(ring.peek(), Some(0xA5));
            assert_eq!(ring.peek(), Some(0xA5));
            assert_eq!(ring.len(), 1);
            ring.advance();
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn overflow_keeps_first_bytes() {
        let ring = RingBuffer::<16>::new();
        let accepted = (0..16u8)
            // SAFETY: Single-threaded test.
            .filter(|&b| unsafe { ring.try_push(b) })
            .count();

        assert_eq!(accepted, 15);
        assert!(ring.is_full());
        assert_eq!(ring.len(), 15);
        assert_eq!(drain(&ring), (0..15).collect::<Vec<_>>());
    }

    #[test]
    fn wrap_around_multiple_times() {
        let ring = RingBuffer::<4>::new();
        let mut expected = 0u8;
        for round in 0..50u8 {
            // SAFETY: Single-threaded test.
            unsafe {
                assert!(ring.try_push(round.wrapping_mul(3)));
                assert!(ring.try_push(round.wrapping_mul(3).wrapping_add(1)));
                assert_eq!(ring.pop(), Some(expected));
                assert_eq!(ring.pop(), Some(expected.wrapping_add(1)));
            }
            expected = expected.wrapping_add(3);
        }
        assert!(ring.is_empty());
    }

    #[test]
    fn len_and_free_are_complementary() {
        let ring = RingBuffer::<8>::new();
        for step in 0..40u8 {
            // SAFETY: Single-threaded test.
            unsafe {
                if step % 3 == 2 {
                    let _ = ring.pop();
                } else {
                    let _ = ring.try_push(step);
                }
            }
            assert_eq!(ring.len() + ring.free(), 7);
        }
    }

    #[test]
    fn clear_discards_everything() {
        let ring = RingBuffer::<32>::new();
        // SAFETY: Single-threaded test.
        unsafe {
            for b in 0..20 {
                assert!(ring.try_push(b));
            }
            ring.clear();
        }
        assert!(ring.is_empty());
        assert_eq!(ring.free(), 31);
    }

    #[test]
    fn wide_index_above_256() {
        assert!(!RingBuffer::<256>::WIDE_INDEX);
        assert!(RingBuffer::<512>::WIDE_INDEX);

        let ring = RingBuffer::<512>::new();
        for i in 0..600u16 {
            // SAFETY: Single-threaded test.
            let _ = unsafe { ring.try_push(i.to_le_bytes()[0]) };
        }
        assert_eq!(ring.len(), 511);
    }

    #[test]
    fn capacity_validation() {
        assert_eq!(validate_capacity(0), Err(CapacityError::TooSmall(0)));
        assert_eq!(validate_capacity(1), Err(CapacityError::TooSmall(1)));
        assert_eq!(validate_capacity(24), Err(CapacityError::NotPowerOfTwo(24)));
        assert_eq!(validate_capacity(1 << 16), Err(CapacityError::TooLarge(1 << 16)));
        assert_eq!(validate_capacity(2), Ok(()));
        assert_eq!(validate_capacity(MAX_CAPACITY), Ok(()));
    }

    #[test]
    fn capacity_error_display() {
        assert_eq!(
            CapacityError::NotPowerOfTwo(24).to_string(),
            "ring size 24 is not a power of two"
        );
        assert_eq!(
            CapacityError::TooSmall(1).to_string(),
            "ring size 1 is too small (minimum 2)"
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "advance on an empty ring")]
    fn advance_empty_panics_in_debug() {
        let ring = RingBuffer::<2>::new();
        // SAFETY: Deliberately violates the precondition to hit the check.
        unsafe { ring.advance() };
    }

    #[test]
    fn threads_preserve_order() {
        use std::sync::Arc;

        let ring = Arc::new(RingBuffer::<16>::new());
        let producer = {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || {
                for b in 0..=255u8 {
                    // SAFETY: This thread is the only producer.
                    while !unsafe { ring.try_push(b) } {
                        std::hint::spin_loop();
                    }
                }
            })
        };

        let mut received = Vec::with_capacity(256);
        while received.len() < 256 {
            // SAFETY: The test thread is the only consumer.
            match unsafe { ring.pop() } {
                Some(b) => received.push(b),
                None => std::hint::spin_loop(),
            }
        }
        producer.join().unwrap();
        assert_eq!(received, (0..=255).collect::<Vec<u8>>());
    }
}

#[cfg(all(test, loom))]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    fn transfer<const N: usize>(bytes: &'static [u8])
    where
        Capacity<N>: SupportedCapacity,
    {
        loom::model(move || {
            let ring = Arc::new(RingBuffer::<N>::new());
            let producer = {
                let ring = ring.clone();
                thread::spawn(move || {
                    for &b in bytes {
                        // SAFETY: This thread is the only producer.
                        while !unsafe { ring.try_push(b) } {
                            thread::yield_now();
                        }
                    }
                })
            };

            let mut received = Vec::new();
            while received.len() < bytes.len() {
                // SAFETY: The model thread is the only consumer.
                match unsafe { ring.pop() } {
                    Some(b) => received.push(b),
                    None => thread::yield_now(),
                }
            }
            producer.join().unwrap();
            assert_eq!(received, bytes);
        });
    }

    #[test]
    fn spsc_preserves_order() {
        transfer::<4>(&[1, 2, 3]);
    }

    #[test]
    fn spsc_under_backpressure() {
        transfer::<2>(&[7, 8, 9]);
    }
}
