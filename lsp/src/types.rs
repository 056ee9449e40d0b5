//! Public types produced by the language server core.
//!
//! These types define what the core hands to the protocol layer:
//! [`Diagnostic`]s wrapped in a [`ValidationResult`], and
//! [`CompletionItem`]s. Field names serialize to the LSP wire shape.

use serde::{Serialize, Serializer};
use tsn_types::{LogKind, Range};

/// Value of `Diagnostic.source` for everything the compiler reports.
pub const DIAGNOSTIC_SOURCE: &str = "tsn-compiler";

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

impl DiagnosticSeverity {
    /// Convert from LSP numeric severity (1=Error, 2=Warning, 3=Info, 4=Hint).
    ///
    /// Returns `None` for values outside the LSP-defined range.
    #[must_use]
    pub fn from_lsp(value: u64) -> Option<Self> {
        match value {
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Information),
            4 => Some(Self::Hint),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_lsp(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        }
    }
}

impl From<LogKind> for DiagnosticSeverity {
    fn from(kind: LogKind) -> Self {
        match kind {
            LogKind::Error => Self::Error,
            LogKind::Warning => Self::Warning,
            LogKind::Info => Self::Information,
        }
    }
}

impl Serialize for DiagnosticSeverity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.to_lsp())
    }
}

/// A document and a span inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

/// Secondary annotation attached to a primary diagnostic ("declared here").
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedInformation {
    location: Location,
    message: String,
}

impl RelatedInformation {
    #[must_use]
    pub fn new(uri: impl Into<String>, range: Range, message: impl Into<String>) -> Self {
        Self {
            location: Location {
                uri: uri.into(),
                range,
            },
            message: message.into(),
        }
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A single editor diagnostic derived from compiler logs.
///
/// Fields are private; construction goes through [`Diagnostic::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    range: Range,
    severity: DiagnosticSeverity,
    code: String,
    message: String,
    source: &'static str,
    related_information: Vec<RelatedInformation>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        severity: DiagnosticSeverity,
        range: Range,
        code: String,
        message: String,
        related_information: Vec<RelatedInformation>,
    ) -> Self {
        Self {
            range,
            severity,
            code,
            message,
            source: DIAGNOSTIC_SOURCE,
            related_information,
        }
    }

    #[must_use]
    pub fn severity(&self) -> DiagnosticSeverity {
        self.severity
    }

    #[must_use]
    pub fn range(&self) -> Range {
        self.range
    }

    /// Compiler error code, or the empty string when the log carried none.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn source(&self) -> &str {
        self.source
    }

    #[must_use]
    pub fn related_information(&self) -> &[RelatedInformation] {
        &self.related_information
    }

    /// Format as `uri:line:col: severity: message` (1-indexed for display).
    #[must_use]
    pub fn display_with_uri(&self, uri: &str) -> String {
        format!(
            "{}:{}:{}: {}: [{}] {}",
            uri,
            self.range.start.line + 1,
            self.range.start.character + 1,
            self.severity.label(),
            self.source,
            self.message,
        )
    }
}

/// The diagnostics for one document after one validation round.
///
/// Ephemeral: handed to the messager and not retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    uri: String,
    diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    #[must_use]
    pub fn new(uri: impl Into<String>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            uri: uri.into(),
            diagnostics,
        }
    }

    /// A result that clears every diagnostic for `uri`.
    #[must_use]
    pub fn empty(uri: impl Into<String>) -> Self {
        Self::new(uri, Vec::new())
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity().is_error())
            .count()
    }
}

/// Completion categories used by this server (LSP `CompletionItemKind`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletionItemKind {
    Function = 3,
    Variable = 6,
    Class = 7,
    Module = 9,
    Value = 12,
    Keyword = 14,
    Constant = 21,
}

impl CompletionItemKind {
    #[must_use]
    pub fn to_lsp(self) -> u8 {
        self as u8
    }
}

impl Serialize for CompletionItemKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.to_lsp())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    pub label: String,
    pub kind: CompletionItemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl CompletionItem {
    #[must_use]
    pub fn new(label: impl Into<String>, kind: CompletionItemKind, detail: Option<String>) -> Self {
        Self {
            label: label.into(),
            kind,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tsn_types::Position;

    fn make_diag(severity: DiagnosticSeverity, msg: &str) -> Diagnostic {
        Diagnostic::new(
            severity,
            Range::new(Position::new(10, 5), Position::new(10, 8)),
            String::new(),
            msg.to_string(),
            Vec::new(),
        )
    }

    // ── DiagnosticSeverity ─────────────────────────────────────────────

    #[test]
    fn test_from_lsp_round_trips_known_values() {
        for sev in [
            DiagnosticSeverity::Error,
            DiagnosticSeverity::Warning,
            DiagnosticSeverity::Information,
            DiagnosticSeverity::Hint,
        ] {
            assert_eq!(
                DiagnosticSeverity::from_lsp(u64::from(sev.to_lsp())),
                Some(sev)
            );
        }
        assert_eq!(DiagnosticSeverity::from_lsp(0), None);
        assert_eq!(DiagnosticSeverity::from_lsp(99), None);
    }

    #[test]
    fn test_log_kind_mapping() {
        assert_eq!(
            DiagnosticSeverity::from(LogKind::Error),
            DiagnosticSeverity::Error
        );
        assert_eq!(
            DiagnosticSeverity::from(LogKind::Warning),
            DiagnosticSeverity::Warning
        );
        assert_eq!(
            DiagnosticSeverity::from(LogKind::Info),
            DiagnosticSeverity::Information
        );
    }

    // ── Diagnostic ─────────────────────────────────────────────────────

    #[test]
    fn test_display_with_uri() {
        let diag = make_diag(DiagnosticSeverity::Error, "unknown symbol 'x'");
        assert_eq!(
            diag.display_with_uri("file:///a.tsn"),
            "file:///a.tsn:11:6: error: [tsn-compiler] unknown symbol 'x'"
        );
    }

    #[test]
    fn test_diagnostic_wire_shape() {
        let related = RelatedInformation::new(
            "file:///a.tsn",
            Range::new(Position::new(1, 0), Position::new(1, 3)),
            "declared here",
        );
        let diag = Diagnostic::new(
            DiagnosticSeverity::Warning,
            Range::new(Position::new(2, 1), Position::new(2, 4)),
            "W12".to_string(),
            "unused import".to_string(),
            vec![related],
        );

        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["severity"], 2);
        assert_eq!(json["code"], "W12");
        assert_eq!(json["source"], "tsn-compiler");
        assert_eq!(json["range"]["start"]["character"], 1);
        let info = &json["relatedInformation"][0];
        assert_eq!(info["message"], "declared here");
        assert_eq!(info["location"]["uri"], "file:///a.tsn");
        assert_eq!(info["location"]["range"]["end"]["character"], 3);
    }

    // ── ValidationResult ───────────────────────────────────────────────

    #[test]
    fn test_validation_result_counts() {
        let result = ValidationResult::new(
            "file:///a.tsn",
            vec![
                make_diag(DiagnosticSeverity::Error, "e1"),
                make_diag(DiagnosticSeverity::Warning, "w1"),
                make_diag(DiagnosticSeverity::Error, "e2"),
            ],
        );
        assert_eq!(result.error_count(), 2);
        assert!(!result.is_empty());
        assert!(ValidationResult::empty("file:///a.tsn").is_empty());
    }

    // ── CompletionItem ─────────────────────────────────────────────────

    #[test]
    fn test_completion_item_omits_missing_detail() {
        let item = CompletionItem::new("if", CompletionItemKind::Keyword, None);
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["label"], "if");
        assert_eq!(json["kind"], 14);
        assert!(json.get("detail").is_none());
    }
}
