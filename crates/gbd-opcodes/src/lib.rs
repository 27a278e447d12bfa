//! Macro-id enumeration, packed-field decoding, diagnostic taxonomy, and the
//! `Decoder`/`TextDecoder` collaborator traits for the display-list debugger.
//!
//! This crate is the debugger's "opcode tables" collaborator: it knows the
//! bit layout of display-list commands and packed pipeline config words.
//! `gbd-core` knows none of that — it only asks a `Decoder` for the next
//! macro and asks the field types here what a given selector means.

#![allow(clippy::cast_possible_truncation)]

pub mod decoder;
pub mod diagnostics;
pub mod f3dex2;
pub mod fields;
pub mod macro_id;
pub mod text;
pub mod ucode;

pub use decoder::{Decoder, DecodedMacro, MacroArgs};
pub use diagnostics::{Diagnostic, Kind as DiagnosticKind, Severity};
pub use macro_id::MacroId;
pub use ucode::{UcodeRegistryEntry, UcodeTag};
