use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use thiserror::Error;

/// A data file that could not be read into records, with the location of
/// the problem in the source text.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn error(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        ParseError {
            message: message.into(),
            span,
            file_id,
            notes: Vec::new(),
        }
    }

    /// Locate a JSON error in `source`. serde_json reports 1-based lines and
    /// columns; line 0 means the error has no position.
    pub fn from_json(error: &serde_json::Error, source: &str, file_id: usize) -> Self {
        let offset = byte_offset(source, error.line(), error.column());
        let end = (offset + 1).min(source.len());
        let parse_error = ParseError::error(error.to_string(), offset..end, file_id);
        if error.is_eof() {
            parse_error.with_note("the file ends before the JSON document is complete")
        } else {
            parse_error
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(Severity::Error)
            .with_message(&self.message)
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

fn byte_offset(source: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}
