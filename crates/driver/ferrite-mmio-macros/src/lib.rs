//! Proc-macro crate for the `register_block!` MMIO register DSL.
//!
//! Generates typed MMIO register accessors from a declarative definition.
//! The single `unsafe` point is the `const` constructor; all generated
//! read/write methods are safe.

mod codegen;
mod parse;

use proc_macro::TokenStream;
use syn::parse_macro_input;

use crate::parse::RegisterBlock;

/// Generates a typed MMIO register block struct with safe accessors.
///
/// # Syntax
///
/// ```ignore
/// register_block! {
///     /// Doc comment for the struct.
///     pub StructName {
///         /// Doc comment for the register.
///         [offset; width; access_mode] name => OptionalBitflagsType,
///     }
/// }
/// ```
///
/// - `offset`: byte offset from base (integer literal, e.g. `0x04`)
/// - `width`: `u8`, `u16`, `u32`, or `u64`
/// - `access_mode`: `ro` (read-only), `wo` (write-only), `rw` (read-write),
///   or `w1c` (readable, bits cleared by writing one)
/// - `name`: register name (generates method names)
/// - `=> Type`: optional bitflags type (must have `from_bits_retain`/`.bits()`)
///
/// # Generated Code
///
/// The struct holds the peripheral base address as a `usize` and gets a
/// `const unsafe fn new(base)` so instances can live in statics. For each
/// register:
/// - `ro`/`rw`/`w1c`: `fn name(&self) -> Type` (reader)
/// - `wo`/`rw`: `fn set_name(&self, value: Type)` (writer)
/// - `w1c`: `fn clear_name(&self, value: Type)` (writes ones to clear)
///
/// # Example
///
/// ```ignore
/// use ferrite_mmio::register_block;
///
/// register_block! {
///     /// USART registers.
///     pub UsartRegs {
///         /// Receive data, low byte.
///         [0x00; u8; ro] rxdatal,
///         /// Status flags.
///         [0x04; u8; w1c] status => Status,
///         /// Baud divisor.
///         [0x08; u16; rw] baud,
///     }
/// }
/// ```
#[proc_macro]
pub fn register_block(input: TokenStream) -> TokenStream {
    let block = parse_macro_input!(input as RegisterBlock);
    codegen::generate(&block).into()
}
