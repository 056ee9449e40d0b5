//! Language server core for TSN: compiler invocation, diagnostics folding,
//! scoped completion and the stdio protocol shell.

pub mod codec;
pub mod compiler;
pub mod completion;
pub mod documents;
pub mod types;

pub(crate) mod diagnostics;
pub(crate) mod protocol;

mod manager;
mod processor;
mod server;

#[cfg(test)]
mod testing;

pub use compiler::{CompileError, Compiler, CompilerOutput, ExternalCompiler};
pub use documents::{DocumentStore, TextDocument};
pub use manager::{CompileEvent, Messager, ScriptManager};
pub use processor::{DocumentProcessor, ProcessorId};
pub use server::{StopReason, run};
pub use types::{
    CompletionItem, CompletionItemKind, Diagnostic, DiagnosticSeverity, RelatedInformation,
    ValidationResult,
};
