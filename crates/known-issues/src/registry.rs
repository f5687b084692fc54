//! Ordered known-issue registry

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::failure::{panic_message, FailureView};
use crate::issue::KnownIssue;

/// Known issues for one test or suite, in declaration order.
///
/// Immutable once built and holds no per-run state, so the same registry
/// can guard any number of sequential runs.
#[derive(Debug, Clone, Default)]
pub struct KnownIssueRegistry {
    issues: Vec<KnownIssue>,
}

impl KnownIssueRegistry {
    pub fn new(issues: Vec<KnownIssue>) -> Self {
        Self { issues }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Append an issue while building
    pub fn with(mut self, issue: KnownIssue) -> Self {
        self.issues.push(issue);
        self
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, KnownIssue> {
        self.issues.iter()
    }

    /// First issue, in declaration order, whose matcher accepts the failure.
    ///
    /// A matcher that panics is logged and skipped; it never replaces the
    /// failure being classified.
    pub fn find_match(&self, failure: &FailureView<'_>) -> Option<&KnownIssue> {
        self.issues
            .iter()
            .enumerate()
            .find(|(index, issue)| evaluate(*index, issue, failure))
            .map(|(_, issue)| issue)
    }
}

fn evaluate(index: usize, issue: &KnownIssue, failure: &FailureView<'_>) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| issue.matcher().matches(failure))) {
        Ok(matched) => matched,
        Err(payload) => {
            warn!(
                index,
                reference = issue.reference(),
                matcher = %issue.matcher().describe(),
                panic = panic_message(&*payload).unwrap_or("<non-string payload>"),
                "Known issue matcher panicked, treating as no match"
            );
            false
        }
    }
}

impl FromIterator<KnownIssue> for KnownIssueRegistry {
    fn from_iter<I: IntoIterator<Item = KnownIssue>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a KnownIssueRegistry {
    type Item = &'a KnownIssue;
    type IntoIter = std::slice::Iter<'a, KnownIssue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{expected_exception, ExpectedKind, IssueMatcher};

    fn issue(reference: &str, pattern: &str) -> KnownIssue {
        KnownIssue::new(reference, expected_exception(ExpectedKind::Any, pattern).unwrap()).unwrap()
    }

    #[test]
    fn test_first_match_wins() {
        let registry: KnownIssueRegistry = vec![
            issue("BMS-1", "energy"),
            issue("BMS-2", "alarm"),
            issue("BMS-3", "alarm"),
        ]
        .into_iter()
        .collect();

        let err = anyhow::anyhow!("missing alarm, id=AB12");
        let found = registry.find_match(&FailureView::from_failure(&err)).unwrap();
        assert_eq!(found.reference(), "BMS-2");
    }

    #[test]
    fn test_no_match() {
        let registry = KnownIssueRegistry::empty().with(issue("BMS-1", "energy"));
        let err = anyhow::anyhow!("device offline");
        assert!(registry.find_match(&FailureView::from_failure(&err)).is_none());
    }

    #[test]
    fn test_panicking_matcher_is_skipped() {
        let registry = KnownIssueRegistry::new(vec![
            KnownIssue::new(
                "BMS-9",
                IssueMatcher::predicate("explodes", |_| panic!("matcher bug")),
            )
            .unwrap(),
            issue("BMS-10", "offline"),
        ]);

        let err = anyhow::anyhow!("device offline");
        let found = registry.find_match(&FailureView::from_failure(&err)).unwrap();
        assert_eq!(found.reference(), "BMS-10");
    }
}
