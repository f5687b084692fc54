//! Known issue declarations

use crate::error::{KnownIssueError, KnownIssueResult};
use crate::matcher::IssueMatcher;

/// A ticketed defect whose failure signature the suite tolerates.
///
/// `reference` and `note` are diagnostic only; matching is done entirely
/// by the matcher.
#[derive(Debug, Clone)]
pub struct KnownIssue {
    reference: String,
    matcher: IssueMatcher,
    note: Option<String>,
}

impl KnownIssue {
    /// Declare a known issue. The reference (usually a ticket URL) must not
    /// be blank.
    pub fn new(
        reference: impl Into<String>,
        matcher: impl Into<IssueMatcher>,
    ) -> KnownIssueResult<Self> {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return Err(KnownIssueError::EmptyReference);
        }
        Ok(Self {
            reference,
            matcher: matcher.into(),
            note: None,
        })
    }

    /// Attach a human explanation. Blank notes are dropped.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        let note = note.into();
        self.note = (!note.trim().is_empty()).then_some(note);
        self
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn matcher(&self) -> &IssueMatcher {
        &self.matcher
    }
}
