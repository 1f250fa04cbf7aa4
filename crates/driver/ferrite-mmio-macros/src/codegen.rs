//! Code generation for the `register_block!` macro.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};

use crate::parse::{AccessMode, RegisterBlock, RegisterDef};

/// Generates the complete output for a register block definition.
pub fn generate(block: &RegisterBlock) -> TokenStream {
    let vis = &block.vis;
    let name = &block.name;
    let attrs = &block.attrs;

    let methods: Vec<TokenStream> = block.registers.iter().map(generate_methods).collect();

    quote! {
        #(#attrs)*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #vis struct #name {
            base: usize,
        }

        impl #name {
            /// Creates a new register block accessor.
            ///
            /// # Safety
            ///
            /// `base` must be the address of a valid MMIO region covering all
            /// defined registers, for as long as the accessor is used.
            #[must_use]
            #vis const unsafe fn new(base: usize) -> Self {
                Self { base }
            }

            /// Returns the base address.
            #[must_use]
            #vis const fn base(&self) -> usize {
                self.base
            }

            #(#methods)*
        }
    }
}

/// Generates accessor methods for a single register.
fn generate_methods(reg: &RegisterDef) -> TokenStream {
    let mut methods = TokenStream::new();

    if reg.access.readable() {
        methods.extend(generate_read(reg));
    }
    if reg.access.writable() {
        let setter = format_ident!("set_{}", reg.name);
        let doc = format!("Writes the `{}` register.", reg.name);
        methods.extend(generate_write(reg, &setter, &doc));
    }
    if reg.access == AccessMode::WriteOneToClear {
        let clearer = format_ident!("clear_{}", reg.name);
        let doc = format!("Clears the given `{}` bits by writing ones.", reg.name);
        methods.extend(generate_write(reg, &clearer, &doc));
    }

    methods
}

/// Generates the read accessor for a register.
fn generate_read(reg: &RegisterDef) -> TokenStream {
    let name = &reg.name;
    let offset = &reg.offset;
    let width_ty = width_type(reg);
    let attrs = &reg.attrs;

    let read = quote! {
        // SAFETY: Caller of `new` guarantees base points to a valid MMIO region.
        unsafe {
            core::ptr::read_volatile((self.base + #offset) as *const #width_ty)
        }
    };

    if let Some(ref bf_type) = reg.bitflags_type {
        quote! {
            #(#attrs)*
            #[inline]
            #[must_use]
            pub fn #name(&self) -> #bf_type {
                #bf_type::from_bits_retain(#read)
            }
        }
    } else {
        quote! {
            #(#attrs)*
            #[inline]
            #[must_use]
            pub fn #name(&self) -> #width_ty {
                #read
            }
        }
    }
}

/// Generates a volatile writer named `method` for a register.
fn generate_write(reg: &RegisterDef, method: &syn::Ident, doc: &str) -> TokenStream {
    let offset = &reg.offset;
    let width_ty = width_type(reg);

    let (value_ty, raw) = match reg.bitflags_type {
        Some(ref bf_type) => (quote! { #bf_type }, quote! { value.bits() }),
        None => (width_ty.clone(), quote! { value }),
    };

    quote! {
        #[doc = #doc]
        #[inline]
        pub fn #method(&self, value: #value_ty) {
            // SAFETY: Caller of `new` guarantees base points to a valid MMIO region.
            unsafe {
                core::ptr::write_volatile((self.base + #offset) as *mut #width_ty, #raw);
            }
        }
    }
}

/// Returns the token stream for the register's width type.
fn width_type(reg: &RegisterDef) -> TokenStream {
    let ident = format_ident!("{}", reg.width.type_name());
    quote! { #ident }
}
