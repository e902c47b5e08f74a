//! YANG text to IR
//!
//! Parsing is purely syntactic: [`lexer`] tokenizes one source, [`statement`]
//! builds the [`ir::IrStatement`] tree, and [`argument`] decodes raw argument
//! tokens into logical strings once the language version is known.
//!
//! Parsing one source shares no state with any other, so callers are free to
//! parse many sources on parallel workers.

pub mod argument;
pub mod ir;
pub mod lexer;
pub mod statement;

pub use argument::decode_argument;
pub use ir::{IrArgument, IrKeyword, IrSource, IrStatement};
pub use statement::parse_source;
