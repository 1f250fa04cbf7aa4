//! Core primitives for the Ferrite serial stack.
//!
//! This crate holds the pieces of the driver that do not depend on a
//! particular peripheral: global interrupt control, the leveled log
//! interface, and the lock-free single-producer single-consumer byte ring
//! that carries data between foreground code and interrupt handlers.
//!
//! Everything here builds for the host as well as for bare-metal targets,
//! so the ring can be exercised with `cargo test` and loom.

#![cfg_attr(not(test), no_std)]
#![cfg_attr(
    all(target_arch = "avr", target_os = "none"),
    feature(asm_experimental_arch)
)]
#![warn(missing_docs)]

pub mod irq;
pub mod log;
pub mod ring;
pub mod static_assert;

mod loom_compat;

pub use irq::{Cpu, Interrupts, IrqGuard, IrqState};
pub use ring::{Capacity, CapacityError, RingBuffer, SupportedCapacity};
