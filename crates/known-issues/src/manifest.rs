//! Declarative known-issue manifests (YAML)
//!
//! Lets a suite keep its known-issue list in one file and build a fresh,
//! scoped registry for each test:
//!
//! ```yaml
//! issues:
//!   - reference: https://tracker.example/BMS-1042
//!     kind: graphql
//!     pattern: 'missing alarm, id=([A-F0-9]+)'
//!     note: alarm feed lags behind the dashboard
//!     environments: [staging]
//!     tests: [alarms-list-matches-api]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{KnownIssueError, KnownIssueResult};
use crate::issue::KnownIssue;
use crate::matcher::{ErrorMatcher, ExpectedKind, MessagePattern};
use crate::registry::KnownIssueRegistry;

/// A parsed manifest file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnownIssueManifest {
    #[serde(default)]
    pub issues: Vec<ManifestEntry>,
}

/// One known issue as written in a manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Ticket reference, usually a URL
    pub reference: String,

    /// `any`, `panic`, or a failure kind tag. Required, so "any kind" is
    /// always spelled out.
    pub kind: String,

    /// Regular expression tested against the failure message, or the whole
    /// expected message when `exact` is set
    pub pattern: String,

    #[serde(default)]
    pub exact: bool,

    #[serde(default)]
    pub note: Option<String>,

    /// Environments the issue applies in (empty = all)
    #[serde(default)]
    pub environments: Vec<String>,

    /// Test names the issue applies to (empty = all)
    #[serde(default)]
    pub tests: Vec<String>,
}

impl ManifestEntry {
    /// Whether the entry is in effect for this environment and test.
    ///
    /// A scoped entry never applies when the corresponding value is unknown.
    pub fn applies_to(&self, environment: Option<&str>, test: Option<&str>) -> bool {
        in_scope(&self.environments, environment) && in_scope(&self.tests, test)
    }

    /// Compile into a [`KnownIssue`]
    pub fn compile(&self) -> KnownIssueResult<KnownIssue> {
        let kind: ExpectedKind = self.kind.parse()?;
        let pattern = if self.exact {
            MessagePattern::exact(self.pattern.clone())
        } else {
            MessagePattern::regex(&self.pattern)?
        };
        let issue = KnownIssue::new(self.reference.clone(), ErrorMatcher::new(kind, pattern))?;
        Ok(match &self.note {
            Some(note) => issue.with_note(note.clone()),
            None => issue,
        })
    }

    /// Reject a tag kind that is not one of `known_tags`.
    ///
    /// A tag no failure ever carries parses fine but can never match.
    pub fn check_kind(&self, known_tags: &[&str]) -> KnownIssueResult<()> {
        match self.kind.parse::<ExpectedKind>()? {
            ExpectedKind::Tag(tag) if !known_tags.contains(&tag.as_str()) => {
                Err(KnownIssueError::UnknownKind(tag))
            }
            _ => Ok(()),
        }
    }
}

fn in_scope(scope: &[String], value: Option<&str>) -> bool {
    scope.is_empty() || value.is_some_and(|v| scope.iter().any(|s| s == v))
}

impl KnownIssueManifest {
    /// Parse a manifest from a YAML string
    pub fn from_yaml(yaml: &str) -> KnownIssueResult<Self> {
        serde_yaml::from_str(yaml).map_err(KnownIssueError::from)
    }

    /// Parse a manifest from a YAML file
    pub fn from_file(path: &Path) -> KnownIssueResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Compile every entry, returning the first problem found
    pub fn validate(&self) -> KnownIssueResult<()> {
        self.problems().into_iter().next().map_or(Ok(()), Err)
    }

    /// Like [`validate`](Self::validate), also rejecting tag kinds
    /// outside `known_tags`
    pub fn validate_with_tags(&self, known_tags: &[&str]) -> KnownIssueResult<()> {
        self.problems_with_tags(known_tags)
            .into_iter()
            .next()
            .map_or(Ok(()), Err)
    }

    /// Compile every entry and collect all problems
    pub fn problems(&self) -> Vec<KnownIssueError> {
        self.collect_problems(|entry| entry.compile().map(drop))
    }

    /// Like [`problems`](Self::problems), also reporting tag kinds outside
    /// `known_tags` as [`KnownIssueError::UnknownKind`]
    pub fn problems_with_tags(&self, known_tags: &[&str]) -> Vec<KnownIssueError> {
        self.collect_problems(|entry| {
            entry.compile()?;
            entry.check_kind(known_tags)
        })
    }

    fn collect_problems<F>(&self, check: F) -> Vec<KnownIssueError>
    where
        F: Fn(&ManifestEntry) -> KnownIssueResult<()>,
    {
        self.issues
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| check(entry).err().map(|e| entry_error(index, entry, e)))
            .collect()
    }

    /// Entries in effect for this environment and test, in file order
    pub fn entries_for<'a>(
        &'a self,
        environment: Option<&'a str>,
        test: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ManifestEntry> + 'a {
        self.issues
            .iter()
            .filter(move |entry| entry.applies_to(environment, test))
    }

    /// Build a fresh registry of the entries in effect for this
    /// environment and test
    pub fn registry_for(
        &self,
        environment: Option<&str>,
        test: Option<&str>,
    ) -> KnownIssueResult<KnownIssueRegistry> {
        self.issues
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.applies_to(environment, test))
            .map(|(index, entry)| entry.compile().map_err(|e| entry_error(index, entry, e)))
            .collect()
    }
}

fn entry_error(index: usize, entry: &ManifestEntry, source: KnownIssueError) -> KnownIssueError {
    KnownIssueError::InvalidEntry {
        index,
        reference: entry.reference.clone(),
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::FailureView;

    const MANIFEST: &str = r#"
issues:
  - reference: https://tracker.example/BMS-1042
    kind: any
    pattern: 'missing alarm, id=([A-F0-9]+)'
    note: alarm feed lags behind the dashboard
    environments: [staging]
  - reference: https://tracker.example/BMS-1107
    kind: timeout
    pattern: energy chart
    tests: [energy-dashboard-loads]
  - reference: https://tracker.example/BMS-1200
    kind: any
    pattern: 'Unauthorized'
    exact: true
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = KnownIssueManifest::from_yaml(MANIFEST).unwrap();
        assert_eq!(manifest.issues.len(), 3);
        assert_eq!(manifest.issues[0].environments, vec!["staging"]);
        assert!(manifest.issues[2].exact);
        manifest.validate().unwrap();
    }

    #[test]
    fn test_scoping() {
        let manifest = KnownIssueManifest::from_yaml(MANIFEST).unwrap();

        let refs = |env: Option<&'static str>, test: Option<&'static str>| -> Vec<String> {
            manifest
                .entries_for(env, test)
                .map(|e| e.reference.rsplit('/').next().unwrap_or_default().to_string())
                .collect()
        };

        assert_eq!(
            refs(Some("staging"), Some("energy-dashboard-loads")),
            vec!["BMS-1042", "BMS-1107", "BMS-1200"]
        );
        assert_eq!(refs(Some("production"), Some("alarms-list")), vec!["BMS-1200"]);
        assert_eq!(refs(None, None), vec!["BMS-1200"]);
    }

    #[test]
    fn test_registry_for_preserves_order() {
        let manifest = KnownIssueManifest::from_yaml(MANIFEST).unwrap();
        let registry = manifest
            .registry_for(Some("staging"), Some("energy-dashboard-loads"))
            .unwrap();
        let refs: Vec<&str> = registry.iter().map(|i| i.reference()).collect();
        assert_eq!(
            refs,
            vec![
                "https://tracker.example/BMS-1042",
                "https://tracker.example/BMS-1107",
                "https://tracker.example/BMS-1200",
            ]
        );
        assert_eq!(
            registry.iter().next().and_then(|i| i.note()),
            Some("alarm feed lags behind the dashboard")
        );
    }

    #[test]
    fn test_exact_entry() {
        let manifest = KnownIssueManifest::from_yaml(MANIFEST).unwrap();
        let registry = manifest.registry_for(None, None).unwrap();

        let exact = anyhow::anyhow!("Unauthorized");
        let partial = anyhow::anyhow!("401 Unauthorized");
        assert!(registry.find_match(&FailureView::from_failure(&exact)).is_some());
        assert!(registry.find_match(&FailureView::from_failure(&partial)).is_none());
    }

    #[test]
    fn test_invalid_entries_reported_with_index() {
        let manifest = KnownIssueManifest::from_yaml(
            r#"
issues:
  - reference: BMS-1
    kind: any
    pattern: 'ok'
  - reference: BMS-2
    kind: any
    pattern: 'unclosed ('
  - reference: ''
    kind: any
    pattern: 'ok'
"#,
        )
        .unwrap();

        let problems = manifest.problems();
        assert_eq!(problems.len(), 2);
        assert!(matches!(&problems[0], KnownIssueError::InvalidEntry { index: 1, .. }));
        assert!(matches!(&problems[1], KnownIssueError::InvalidEntry { index: 2, .. }));
        assert!(manifest.validate().is_err());
        assert!(manifest.registry_for(None, None).is_err());
    }

    #[test]
    fn test_unknown_tag_reported() {
        let manifest = KnownIssueManifest::from_yaml(
            r#"
issues:
  - reference: BMS-1
    kind: graphql
    pattern: 'ok'
  - reference: BMS-2
    kind: graphq1
    pattern: 'ok'
  - reference: BMS-3
    kind: panic
    pattern: 'ok'
"#,
        )
        .unwrap();
        let tags = ["graphql", "timeout"];

        assert!(manifest.problems().is_empty());
        let problems = manifest.problems_with_tags(&tags);
        assert_eq!(problems.len(), 1);
        match &problems[0] {
            KnownIssueError::InvalidEntry { index, source, .. } => {
                assert_eq!(*index, 1);
                assert!(matches!(&**source, KnownIssueError::UnknownKind(tag) if tag == "graphq1"));
            }
            other => panic!("unexpected problem: {other}"),
        }
        assert!(manifest.validate_with_tags(&tags).is_err());
    }

    #[test]
    fn test_kind_is_required() {
        let err = KnownIssueManifest::from_yaml(
            r#"
issues:
  - reference: BMS-1
    pattern: 'ok'
"#,
        )
        .unwrap_err();
        assert!(matches!(err, KnownIssueError::Yaml(_)));
    }
}
