//! Open text documents, keyed by URI.
//!
//! Holds the full text of every document the client has opened (full
//! synchronization) and converts between byte offsets and editor positions.
//! Columns are counted in UTF-16 code units, as LSP requires.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tsn_types::{Position, Range};

#[derive(Debug, thiserror::Error)]
#[error("cannot convert path to file URI: {}", .path.display())]
pub struct PathToUriError {
    path: PathBuf,
}

pub fn path_to_file_uri(path: &Path) -> Result<url::Url, PathToUriError> {
    url::Url::from_file_path(path).map_err(|()| PathToUriError {
        path: path.to_path_buf(),
    })
}

/// Filesystem path for a `file:` URI, percent-decoded.
///
/// Any other scheme, or a malformed URI, yields `None`.
#[must_use]
pub fn file_uri_to_path(uri: &str) -> Option<PathBuf> {
    let parsed = url::Url::parse(uri).ok()?;
    if parsed.scheme() != "file" {
        return None;
    }
    parsed.to_file_path().ok()
}

/// Byte offsets at which each line begins. Always starts with `0`.
fn compute_line_starts(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut starts = vec![0];
    let mut idx = 0;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\r' if bytes.get(idx + 1) == Some(&b'\n') => {
                starts.push(idx + 2);
                idx += 2;
            }
            b'\r' | b'\n' => {
                starts.push(idx + 1);
                idx += 1;
            }
            _ => idx += 1,
        }
    }
    starts
}

/// Snapshot of one open document.
#[derive(Debug, Clone)]
pub struct TextDocument {
    uri: String,
    version: i32,
    text: String,
    line_starts: Vec<usize>,
}

impl TextDocument {
    #[must_use]
    pub fn new(uri: impl Into<String>, version: i32, text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = compute_line_starts(&text);
        Self {
            uri: uri.into(),
            version,
            text,
            line_starts,
        }
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn version(&self) -> i32 {
        self.version
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Replace the whole text (full document sync).
    pub fn update(&mut self, version: i32, text: impl Into<String>) {
        self.text = text.into();
        self.line_starts = compute_line_starts(&self.text);
        self.version = version;
    }

    /// Where the compiler should read this document from, if anywhere.
    #[must_use]
    pub fn file_path(&self) -> Option<PathBuf> {
        file_uri_to_path(&self.uri)
    }

    /// Position of a byte offset. Offsets past the end clamp to the end;
    /// offsets inside a multi-byte character clamp to its start.
    #[must_use]
    pub fn position_at(&self, offset: usize) -> Position {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }

        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line];
        let character: usize = self.text[line_start..offset]
            .chars()
            .map(char::len_utf16)
            .sum();

        Position::new(line as u32, character as u32)
    }

    /// Byte offset of a position. Lines past the end clamp to the end of
    /// the text; columns past the end of a line clamp to the line break.
    #[must_use]
    pub fn offset_at(&self, pos: Position) -> usize {
        let line = pos.line as usize;
        let Some(&line_start) = self.line_starts.get(line) else {
            return self.text.len();
        };
        let line_end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.text.len());
        let content = self.text[line_start..line_end].trim_end_matches(['\r', '\n']);

        let target = pos.character as usize;
        let mut units = 0;
        for (idx, ch) in content.char_indices() {
            if units >= target {
                return line_start + idx;
            }
            units += ch.len_utf16();
        }
        line_start + content.len()
    }

    /// Span covering the entire document.
    #[must_use]
    pub fn full_range(&self) -> Range {
        Range::new(self.position_at(0), self.position_at(self.text.len()))
    }
}

/// Every document the client currently has open.
#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: HashMap<String, TextDocument>,
}

impl DocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened document, replacing any stale entry.
    pub fn open(&mut self, uri: &str, version: i32, text: String) -> &TextDocument {
        self.docs.insert(uri.to_string(), TextDocument::new(uri, version, text));
        &self.docs[uri]
    }

    /// Apply a full-text change. Unknown URIs are ignored.
    pub fn change(&mut self, uri: &str, version: i32, text: String) -> Option<&TextDocument> {
        let doc = self.docs.get_mut(uri)?;
        doc.update(version, text);
        Some(doc)
    }

    pub fn close(&mut self, uri: &str) -> Option<TextDocument> {
        self.docs.remove(uri)
    }

    #[must_use]
    pub fn get(&self, uri: &str) -> Option<&TextDocument> {
        self.docs.get(uri)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
