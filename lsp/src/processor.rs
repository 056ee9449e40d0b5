//! Per-document processor: one open document's relationship to the compiler.
//!
//! Owns the document snapshot and the last successfully parsed
//! [`CompilerResult`]. A new result replaces the old one wholesale; a
//! failed run leaves the cached result alone.

use std::path::PathBuf;

use tsn_types::{CompilerResult, Range, Settings};

use crate::compiler::{CompileError, Compiler, CompilerOutput};
use crate::diagnostics::fold_logs;
use crate::documents::TextDocument;
use crate::manager::Messager;
use crate::types::ValidationResult;

/// Identity of one processor instance.
///
/// A document that is closed and reopened gets a fresh id, so results of
/// compiles started before the close can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessorId(pub(crate) u64);

pub struct DocumentProcessor {
    id: ProcessorId,
    document: TextDocument,
    last: Option<CompilerResult>,
}

impl DocumentProcessor {
    #[must_use]
    pub fn new(id: ProcessorId, document: TextDocument) -> Self {
        Self {
            id,
            document,
            last: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> ProcessorId {
        self.id
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        self.document.uri()
    }

    /// Whole-document span, used for logs that carry no range.
    #[must_use]
    pub fn full_range(&self) -> Range {
        self.document.full_range()
    }

    /// Most recently *successfully parsed* compile, if any.
    #[must_use]
    pub fn last_result(&self) -> Option<&CompilerResult> {
        self.last.as_ref()
    }

    /// Refresh the text snapshot. Does not recompile.
    pub fn set_document(&mut self, document: TextDocument) {
        self.document = document;
    }

    /// Path handed to the compiler, or `None` when the document has no
    /// filesystem location (unsaved buffer, non-`file` scheme).
    #[must_use]
    pub fn file_path(&self) -> Option<PathBuf> {
        self.document.file_path()
    }

    /// Path to hand the compiler, or `None` when there is nothing to compile.
    /// Both the inline and the spawned compile paths start here.
    pub(crate) fn compile_path(&self) -> Option<PathBuf> {
        let path = self.file_path();
        if path.is_none() {
            tracing::debug!(uri = self.uri(), "No filesystem path; skipping compile");
        }
        path
    }

    /// Compile the document inline and translate the outcome.
    ///
    /// [`ScriptManager`](crate::ScriptManager) runs the same two halves with
    /// the compile on a spawned task; this is the entry point for callers
    /// that await the result directly.
    ///
    /// Never fails: every problem is reported through `messager` and
    /// resolves to an empty diagnostics set.
    pub async fn validate<C, M>(
        &mut self,
        compiler: &C,
        settings: &Settings,
        messager: &M,
    ) -> ValidationResult
    where
        C: Compiler,
        M: Messager,
    {
        let Some(path) = self.compile_path() else {
            return ValidationResult::empty(self.uri());
        };
        let outcome = compiler.compile(&path).await;
        self.complete(outcome, settings, messager)
    }

    /// Apply the outcome of a compiler run to this document.
    pub fn complete<M: Messager>(
        &mut self,
        outcome: Result<CompilerOutput, CompileError>,
        settings: &Settings,
        messager: &M,
    ) -> ValidationResult {
        let output = match outcome {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(uri = self.uri(), error = %e, "Compiler run failed");
                messager.error(&e.to_string());
                return ValidationResult::empty(self.uri());
            }
        };

        let result = match serde_json::from_str::<CompilerResult>(&output.stdout) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    uri = self.uri(),
                    error = %e,
                    stdout_bytes = output.stdout.len(),
                    "Unparseable compiler output; keeping previous result"
                );
                messager.error(&format!(
                    "Failed to parse compiler output for {}: {e}",
                    self.uri()
                ));
                messager.info(&output.stdout);
                messager.info(&output.stderr);
                return ValidationResult::empty(self.uri());
            }
        };

        let diagnostics = fold_logs(
            &result.logs,
            self.uri(),
            self.full_range(),
            settings.max_number_of_problems(),
        );
        tracing::debug!(
            uri = self.uri(),
            logs = result.logs.len(),
            diagnostics = diagnostics.len(),
            symbols = result.symbols.len(),
            "Compile result cached"
        );
        self.last = Some(result);
        ValidationResult::new(self.uri(), diagnostics)
    }
}
