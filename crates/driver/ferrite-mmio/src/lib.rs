//! Typed MMIO register block abstractions.
//!
//! This crate re-exports the [`register_block!`] macro from
//! `ferrite-mmio-macros`, which generates typed register accessor structs
//! from a declarative definition. All `unsafe` volatile access is
//! consolidated behind the struct's `const unsafe fn new(base)`, so
//! individual register reads and writes are safe and register blocks can be
//! placed in statics.
//!
//! # Example
//!
//! ```ignore
//! use ferrite_mmio::register_block;
//!
//! register_block! {
//!     /// Port multiplexer.
//!     pub PortMuxRegs {
//!         /// USART route A.
//!         [0x02; u8; rw] usartroutea,
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

pub use ferrite_mmio_macros::register_block;

#[cfg(test)]
mod tests {
    use super::register_block;
    use bitflags::bitflags;
    use core::cell::UnsafeCell;

    bitflags! {
        /// Flags used to exercise typed accessors.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct Flags: u8 {
            const READY = 1 << 5;
            const DONE = 1 << 6;
        }
    }

    register_block! {
        /// Test block over plain memory.
        TestRegs {
            /// Read-only byte.
            [0x00; u8; ro] data,
            /// Write-only byte.
            [0x01; u8; wo] command,
            /// Flag register.
            [0x02; u8; w1c] flags => Flags,
            /// Control flags.
            [0x03; u8; rw] control => Flags,
            /// Wide register.
            [0x04; u16; rw] divisor,
        }
    }

    #[repr(C, align(4))]
    struct Backing(UnsafeCell<[u8; 8]>);

    impl Backing {
        fn new() -> Self {
            Self(UnsafeCell::new([0; 8]))
        }

        fn regs(&self) -> TestRegs {
            // SAFETY: The backing array outlives the accessor and covers
            // every offset in `TestRegs`.
            unsafe { TestRegs::new(self.0.get() as usize) }
        }

        fn bytes(&self) -> [u8; 8] {
            // SAFETY: No accessor writes concurrently.
            unsafe { *self.0.get() }
        }
    }

    #[test]
    fn raw_accessors_hit_offsets() {
        let mem = Backing::new();
        let regs = mem.regs();

        regs.set_command(0x5A);
        regs.set_divisor(0x1234);
        assert_eq!(regs.data(), 0);
        assert_eq!(regs.divisor(), 0x1234);

        let bytes = mem.bytes();
        assert_eq!(bytes[1], 0x5A);
        assert_eq!(u16::from_ne_bytes([bytes[4], bytes[5]]), 0x1234);
    }

    #[test]
    fn bitflags_accessors_round_through_bits() {
        let mem = Backing::new();
        let regs = mem.regs();

        regs.set_control(Flags::READY | Flags::DONE);
        assert_eq!(regs.control(), Flags::READY | Flags::DONE);
        assert_eq!(mem.bytes()[3], 0x60);

        regs.clear_flags(Flags::DONE);
        assert_eq!(mem.bytes()[2], 0x40);
        assert_eq!(regs.flags(), Flags::DONE);
    }

    #[test]
    fn base_is_reported() {
        let mem = Backing::new();
        let regs = mem.regs();
        assert_eq!(regs.base(), mem.0.get() as usize);
    }
}
