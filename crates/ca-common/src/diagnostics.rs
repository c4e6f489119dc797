//! Diagnostic types for the CA compiler.
//!
//! Errors are values: every fallible core entry point returns
//! `CaResult<T>` and the embedding driver decides when to stop. The
//! user-visible rendering is `line: L, col: C: <message>` with one
//! `note: <text>` line per attached note, matching the compiler's
//! historical output format.

use crate::sloc::Sloc;
use crate::source_info::SourceInfo;
use serde::Serialize;

/// A secondary message attached to a diagnostic, pointing at a
/// counter-example or candidate site.
#[derive(Clone, Debug, Serialize)]
pub struct Note {
    pub loc: Option<Sloc>,
    pub message: String,
}

/// A source-located compiler diagnostic.
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    pub beg: Sloc,
    pub end: Option<Sloc>,
    pub message: String,
    /// Accumulated notes (trait mismatch sites, ambiguity candidates).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

impl Diagnostic {
    #[must_use]
    pub fn error(beg: Sloc, message: impl Into<String>) -> Self {
        Diagnostic {
            beg,
            end: None,
            message: message.into(),
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn error_range(beg: Sloc, end: Sloc, message: impl Into<String>) -> Self {
        Diagnostic {
            beg,
            end: Some(end),
            message: message.into(),
            notes: Vec::new(),
        }
    }

    /// Attach a note line; used where the compiler keeps collecting
    /// context before the final failure.
    #[must_use]
    pub fn with_note(mut self, loc: Option<Sloc>, message: impl Into<String>) -> Self {
        self.notes.push(Note {
            loc,
            message: message.into(),
        });
        self
    }

    /// Render the diagnostic with a source snippet appended, when the
    /// source text is available.
    #[must_use]
    pub fn render_with_source(&self, source: &SourceInfo) -> String {
        let mut out = self.to_string();
        if let Some(line) = source.line(self.beg.row) {
            out.push('\n');
            out.push_str(line);
        }
        out
    }
}

impl Diagnostic {
    /// Machine-readable rendering for embedding drivers.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.beg, self.message)?;
        for note in &self.notes {
            write!(f, "\nnote: {}", note.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for CaError {}

/// The error type carried by every fallible core entry point.
#[derive(Clone, Debug)]
pub struct CaError(pub Box<Diagnostic>);

impl CaError {
    #[must_use]
    pub fn diagnostic(&self) -> &Diagnostic {
        &self.0
    }
}

impl std::fmt::Display for CaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Diagnostic> for CaError {
    fn from(diag: Diagnostic) -> Self {
        CaError(Box::new(diag))
    }
}

pub type CaResult<T> = Result<T, CaError>;

/// Shorthand for building an error result in one expression.
pub fn err<T>(beg: Sloc, message: impl Into<String>) -> CaResult<T> {
    Err(Diagnostic::error(beg, message).into())
}

/// Shorthand carrying both ends of the offending region.
pub fn err_range<T>(beg: Sloc, end: Sloc, message: impl Into<String>) -> CaResult<T> {
    Err(Diagnostic::error_range(beg, end, message).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_location_prefix() {
        let d = Diagnostic::error(Sloc::new(3, 7), "cannot find data type 'AA'");
        assert_eq!(d.to_string(), "line: 3, col: 7: cannot find data type 'AA'");
    }

    #[test]
    fn renders_notes_in_order() {
        let d = Diagnostic::error(Sloc::new(1, 0), "multiple applicable items in scope")
            .with_note(None, "candidate #1 is defined in an impl of the trait `T1` for the type `S`")
            .with_note(None, "candidate #2 is defined in an impl of the trait `T2` for the type `S`");
        let text = d.to_string();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("line: 1, col: 0: multiple applicable items in scope")
        );
        assert!(lines.next().unwrap().contains("candidate #1"));
        assert!(lines.next().unwrap().contains("candidate #2"));
    }
}
