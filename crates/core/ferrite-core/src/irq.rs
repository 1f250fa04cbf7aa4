//! Global interrupt control.
//!
//! Code that shares state with interrupt handlers needs to know two things
//! about the context it runs in: whether interrupts are globally enabled,
//! and whether it is already executing inside a handler. When either says
//! "a handler cannot fire right now", the caller has to do the handler's
//! work itself instead of waiting for it.
//!
//! [`Interrupts`] captures those queries together with a save-and-disable /
//! restore pair for short critical sections. [`Cpu`] implements it for the
//! running target; simulated implementations live next to the drivers that
//! use them.

use core::marker::PhantomData;

/// Interrupt state captured by [`Interrupts::save_and_disable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "the saved state must be handed back to `restore`"]
pub struct IrqState {
    enabled: bool,
}

impl IrqState {
    /// Creates a saved state from the previous global enable flag.
    pub const fn saved(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Returns `true` if interrupts were enabled when the state was saved.
    pub const fn was_enabled(self) -> bool {
        self.enabled
    }
}

/// Global interrupt control for one CPU.
pub trait Interrupts {
    /// Returns `true` if interrupts are globally enabled.
    fn enabled(&self) -> bool;

    /// Returns `true` if the CPU is currently executing an interrupt handler.
    fn in_handler(&self) -> bool;

    /// Disables interrupts and returns the previous state.
    fn save_and_disable(&self) -> IrqState;

    /// Restores the state returned by a matching [`save_and_disable`].
    ///
    /// [`save_and_disable`]: Interrupts::save_and_disable
    fn restore(&self, state: IrqState);

    /// Returns `true` if a pending interrupt could be taken right now.
    fn can_preempt(&self) -> bool {
        self.enabled() && !self.in_handler()
    }

    /// Disables interrupts until the returned guard is dropped.
    fn guard(&self) -> IrqGuard<'_, Self>
    where
        Self: Sized,
    {
        IrqGuard {
            irq: self,
            state: self.save_and_disable(),
            _not_send: PhantomData,
        }
    }

    /// Runs `f` with interrupts disabled.
    fn free<R>(&self, f: impl FnOnce() -> R) -> R
    where
        Self: Sized,
    {
        let _guard = self.guard();
        f()
    }
}

/// RAII guard that restores the saved interrupt state on drop.
///
/// Not `Send`: interrupt state belongs to the CPU that saved it.
pub struct IrqGuard<'a, I: Interrupts> {
    irq: &'a I,
    state: IrqState,
    _not_send: PhantomData<*const ()>,
}

impl<I: Interrupts> Drop for IrqGuard<'_, I> {
    fn drop(&mut self) {
        self.irq.restore(self.state);
    }
}

// ---------------------------------------------------------------------------
// Target implementation
// ---------------------------------------------------------------------------

/// Interrupt control for the CPU the code is running on.
///
/// Backed by `SREG` and `CPUINT` on AVR. Everywhere else there is no
/// interrupt controller to drive: interrupts report as enabled, the CPU is
/// never inside a handler, and masking does nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cpu;

impl Interrupts for Cpu {
    #[inline]
    fn enabled(&self) -> bool {
        arch::enabled()
    }

    #[inline]
    fn in_handler(&self) -> bool {
        arch::in_handler()
    }

    #[inline]
    fn save_and_disable(&self) -> IrqState {
        IrqState::saved(arch::save_and_disable())
    }

    #[inline]
    fn restore(&self, state: IrqState) {
        if state.was_enabled() {
            arch::enable();
        }
    }
}

#[cfg(all(target_os = "none", target_arch = "avr"))]
mod arch {
    /// SREG in data space.
    const SREG: *const u8 = 0x5F as *const u8;
    const SREG_I: u8 = 1 << 7;

    /// `CPUINT.STATUS` on AVR Dx parts. NMIEX, LVL1EX and LVL0EX are set
    /// while the matching handler executes.
    const CPUINT_STATUS: *const u8 = 0x0111 as *const u8;
    const CPUINT_EXECUTING: u8 = 0x83;

    #[inline]
    pub(super) fn enabled() -> bool {
        // SAFETY: SREG is always mapped.
        unsafe { core::ptr::read_volatile(SREG) & SREG_I != 0 }
    }

    #[inline]
    pub(super) fn in_handler() -> bool {
        // SAFETY: CPUINT is always mapped on AVR Dx.
        unsafe { core::ptr::read_volatile(CPUINT_STATUS) & CPUINT_EXECUTING != 0 }
    }

    #[inline]
    pub(super) fn save_and_disable() -> bool {
        let was_enabled = enabled();
        // SAFETY: Masking interrupts has no memory-safety impact. No
        // `nomem`, so the compiler keeps accesses inside the section.
        unsafe { core::arch::asm!("cli", options(nostack)) };
        was_enabled
    }

    #[inline]
    pub(super) fn enable() {
        // SAFETY: Restoring a previously enabled state.
        unsafe { core::arch::asm!("sei", options(nostack)) };
    }
}

#[cfg(not(all(target_os = "none", target_arch = "avr")))]
mod arch {
    #[inline]
    pub(super) fn enabled() -> bool {
        true
    }

    #[inline]
    pub(super) fn in_handler() -> bool {
        false
    }

    #[inline]
    pub(super) fn save_and_disable() -> bool {
        true
    }

    #[inline]
    pub(super) fn enable() {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    #[derive(Default)]
    struct FakeIrq {
        enabled: Cell<bool>,
        in_handler: Cell<bool>,
        restores: Cell<u32>,
    }

    impl Interrupts for FakeIrq {
        fn enabled(&self) -> bool {
            self.enabled.get()
        }

        fn in_handler(&self) -> bool {
            self.in_handler.get()
        }

        fn save_and_disable(&self) -> IrqState {
            IrqState::saved(self.enabled.replace(false))
        }

        fn restore(&self, state: IrqState) {
            self.restores.set(self.restores.get() + 1);
            self.enabled.set(state.was_enabled());
        }
    }

    #[test]
    fn free_masks_and_restores() {
        let irq = FakeIrq::default();
        irq.enabled.set(true);

        let inside = irq.free(|| irq.enabled());
        assert!(!inside);
        assert!(irq.enabled());
        assert_eq!(irq.restores.get(), 1);
    }

    #[test]
    fn nested_sections_keep_outer_state() {
        let irq = FakeIrq::default();
        irq.enabled.set(true);

        {
            let _outer = irq.guard();
            {
                let _inner = irq.guard();
            }
            assert!(!irq.enabled(), "inner guard must not re-enable");
        }
        assert!(irq.enabled());
    }

    #[test]
    fn preemption_requires_enabled_and_thread_context() {
        let irq = FakeIrq::default();
        assert!(!irq.can_preempt());

        irq.enabled.set(true);
        assert!(irq.can_preempt());

        irq.in_handler.set(true);
        assert!(!irq.can_preempt());
    }

    #[test]
    fn host_cpu_is_inert() {
        let cpu = Cpu;
        assert!(cpu.can_preempt());
        let state = cpu.save_and_disable();
        assert!(state.was_enabled());
        cpu.restore(state);
    }
}
