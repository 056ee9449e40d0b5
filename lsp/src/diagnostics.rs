//! Log folding: turns the compiler's ordered log stream into diagnostics.
//!
//! An `info` log whose message starts with `^` points back at the log
//! before it ("declared here", "previous definition"). Those pointer logs
//! are folded into the preceding diagnostic as related information instead
//! of being published on their own.

use tsn_types::{CompilerLog, LogKind, Range};

use crate::types::{Diagnostic, RelatedInformation};

const CONTINUATION_MARKER: char = '^';

/// Width of the `"^ "` prefix removed from continuation messages.
const MARKER_PREFIX_CHARS: usize = 2;

/// Message of a continuation log with its marker prefix removed, or `None`
/// when `log` stands on its own.
fn continuation_message(log: &CompilerLog) -> Option<&str> {
    if log.kind != LogKind::Info || !log.message.starts_with(CONTINUATION_MARKER) {
        return None;
    }
    let body = match log.message.char_indices().nth(MARKER_PREFIX_CHARS) {
        Some((idx, _)) => &log.message[idx..],
        None => "",
    };
    Some(body)
}

/// Editor range for a log; logs without a range cover the whole document.
fn log_range(log: &CompilerLog, full_range: Range) -> Range {
    log.range.map_or(full_range, |r| r.to_range())
}

/// Fold `logs` into at most `max_problems` primary diagnostics.
///
/// Only primaries count toward the cap. Continuations directly after the
/// last counted primary are still attached to it.
pub(crate) fn fold_logs(
    logs: &[CompilerLog],
    uri: &str,
    full_range: Range,
    max_problems: usize,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut idx = 0;

    while idx < logs.len() && diagnostics.len() < max_problems {
        let primary = &logs[idx];
        idx += 1;

        let mut related = Vec::new();
        while let Some(message) = logs.get(idx).and_then(continuation_message) {
            related.push(RelatedInformation::new(
                uri,
                log_range(&logs[idx], full_range),
                message,
            ));
            idx += 1;
        }

        diagnostics.push(Diagnostic::new(
            primary.kind.into(),
            log_range(primary, full_range),
            primary.code.clone().unwrap_or_default(),
            primary.message.clone(),
            related,
        ));
    }

    if idx < logs.len() {
        tracing::debug!(
            uri,
            published = diagnostics.len(),
            skipped_logs = logs.len() - idx,
            "Diagnostics cap reached"
        );
    }

    diagnostics
}
