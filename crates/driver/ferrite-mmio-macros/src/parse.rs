//! Parsing logic for the `register_block!` DSL.

use syn::parse::{Parse, ParseStream};
use syn::{Attribute, Ident, LitInt, Token, Visibility, braced, bracketed};

/// A complete register block definition.
pub struct RegisterBlock {
    /// Doc attributes on the struct.
    pub attrs: Vec<Attribute>,
    /// Visibility of the generated struct.
    pub vis: Visibility,
    /// Name of the generated struct.
    pub name: Ident,
    /// Register definitions.
    pub registers: Vec<RegisterDef>,
}

/// Access mode for a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only.
    ReadOnly,
    /// Write-only.
    WriteOnly,
    /// Read-write.
    ReadWrite,
    /// Readable; writing a one clears the corresponding bit.
    WriteOneToClear,
}

impl AccessMode {
    /// Returns `true` if the register gets a reader.
    pub fn readable(self) -> bool {
        self != Self::WriteOnly
    }

    /// Returns `true` if the register gets a plain `set_` writer.
    pub fn writable(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

/// Width of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegWidth {
    /// 8-bit register.
    U8,
    /// 16-bit register.
    U16,
    /// 32-bit register.
    U32,
    /// 64-bit register.
    U64,
}

impl RegWidth {
    /// Returns the Rust type name for this width.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
        }
    }
}

/// A single register definition.
pub struct RegisterDef {
    /// Doc attributes on this register.
    pub attrs: Vec<Attribute>,
    /// Byte offset from base.
    pub offset: LitInt,
    /// Register width.
    pub width: RegWidth,
    /// Access mode.
    pub access: AccessMode,
    /// Register name (used for method names).
    pub name: Ident,
    /// Optional associated bitflags type.
    pub bitflags_type: Option<Ident>,
}

impl Parse for RegisterBlock {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let vis: Visibility = input.parse()?;
        let name: Ident = input.parse()?;

        let content;
        braced!(content in input);

        let mut registers = Vec::new();
        while !content.is_empty() {
            registers.push(content.call(parse_register)?);
        }

        Ok(Self {
            attrs,
            vis,
            name,
            registers,
        })
    }
}

/// Parses a single register definition line.
fn parse_register(input: ParseStream) -> syn::Result<RegisterDef> {
    let attrs = input.call(Attribute::parse_outer)?;

    // [offset; width; access_mode]
    let bracket_content;
    bracketed!(bracket_content in input);

    let offset: LitInt = bracket_content.parse()?;
    bracket_content.parse::<Token![;]>()?;

    let width_ident: Ident = bracket_content.parse()?;
    let width = match width_ident.to_string().as_str() {
        "u8" => RegWidth::U8,
        "u16" => RegWidth::U16,
        "u32" => RegWidth::U32,
        "u64" => RegWidth::U64,
        _ => {
            return Err(syn::Error::new(
                width_ident.span(),
                "expected register width: u8, u16, u32, or u64",
            ));
        }
    };

    bracket_content.parse::<Token![;]>()?;

    let access_ident: Ident = bracket_content.parse()?;
    let access = match access_ident.to_string().as_str() {
        "ro" => AccessMode::ReadOnly,
        "wo" => AccessMode::WriteOnly,
        "rw" => AccessMode::ReadWrite,
        "w1c" => AccessMode::WriteOneToClear,
        _ => {
            return Err(syn::Error::new(
                access_ident.span(),
                "expected access mode: ro, wo, rw, or w1c",
            ));
        }
    };

    let name: Ident = input.parse()?;

    let bitflags_type = if input.peek(Token![=>]) {
        input.parse::<Token![=>]>()?;
        Some(input.parse::<Ident>()?)
    } else {
        None
    };

    if !input.is_empty() {
        input.parse::<Token![,]>()?;
    }

    Ok(RegisterDef {
        attrs,
        offset,
        width,
        access,
        name,
        bitflags_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> syn::Result<RegisterBlock> {
        syn::parse_str(src)
    }

    #[test]
    fn parses_all_access_modes() {
        let block = parse(
            "pub UsartRegs {
                [0x00; u8; ro] rxdatal,
                [0x02; u8; wo] txdatal,
                [0x04; u8; w1c] status => Status,
                [0x08; u16; rw] baud
            }",
        )
        .unwrap();

        assert_eq!(block.name, "UsartRegs");
        let modes: Vec<_> = block.registers.iter().map(|r| r.access).collect();
        assert_eq!(
            modes,
            [
                AccessMode::ReadOnly,
                AccessMode::WriteOnly,
                AccessMode::WriteOneToClear,
                AccessMode::ReadWrite,
            ]
        );
        assert_eq!(block.registers[2].bitflags_type.as_ref().unwrap(), "Status");
        assert_eq!(block.registers[3].width, RegWidth::U16);
        assert_eq!(block.registers[3].offset.base10_parse::<usize>().unwrap(), 8);
    }

    #[test]
    fn rejects_unknown_width() {
        let err = parse("Regs { [0x00; u128; rw] wide, }").err().unwrap();
        assert!(err.to_string().contains("expected register width"));
    }

    #[test]
    fn rejects_unknown_access_mode() {
        let err = parse("Regs { [0x00; u8; rc] flags, }").err().unwrap();
        assert!(err.to_string().contains("expected access mode"));
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(parse("Regs { [0x00; u8; rw] a [0x01; u8; rw] b }").is_err());
    }

    #[test]
    fn access_mode_capabilities() {
        assert!(AccessMode::WriteOneToClear.readable());
        assert!(!AccessMode::WriteOneToClear.writable());
        assert!(!AccessMode::WriteOnly.readable());
        assert!(AccessMode::ReadWrite.writable());
    }
}
