//! Core domain types for the TSN language server.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! The compiler result model mirrors the JSON document the compiler prints on
//! stdout; editor coordinates mirror the LSP wire shape.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod ast;
mod compiler;
mod position;
mod settings;

pub use ast::{
    AstChild, AstNode, AstSource, LiteralType, NodeFlag, NodeType, Operation, RawAst,
};
pub use compiler::{
    AccessModifier, BriefFunctionInfo, CodeRange, CompilerLog, CompilerResult, FunctionArg,
    FunctionArgType, FunctionInfo, GlobalInfo, LogKind, SourcePoint, SymbolKind, SymbolRange,
    TypeBase, TypeFlag, TypeInfo, TypeProperty, TypePropertyFlag,
};
pub use position::{Position, Range};
pub use settings::{
    CompilerConfig, CompilerConfigError, DEFAULT_COMPILE_TIMEOUT_SECS, DEFAULT_COMPILER_COMMAND,
    DEFAULT_MAX_NUMBER_OF_PROBLEMS, Settings, SettingsError,
};
