//! Error matchers: deciding whether a failure "is" a known issue

use std::error::Error as StdError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;

use crate::error::{KnownIssueError, KnownIssueResult};
use crate::failure::FailureView;

/// Type-based kind check, the counterpart of an `instanceof` test.
///
/// Rust has no subclassing, so "assignable to" means the failure's top-level
/// error is exactly a `T`. Errors wrapped in `anyhow` context are checked
/// as the context wrapper, not the inner cause.
#[derive(Clone, Copy)]
pub struct TypeCheck {
    name: &'static str,
    check: fn(&(dyn StdError + 'static)) -> bool,
}

impl TypeCheck {
    pub fn of<T: StdError + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            check: is_type::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn admits(&self, error: &(dyn StdError + 'static)) -> bool {
        (self.check)(error)
    }
}

fn is_type<T: StdError + 'static>(error: &(dyn StdError + 'static)) -> bool {
    error.is::<T>()
}

impl fmt::Debug for TypeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeCheck").field(&self.name).finish()
    }
}

/// Which failures a matcher considers, before the message test.
#[derive(Debug, Clone)]
pub enum ExpectedKind {
    /// Every failure passes the kind check. Must be chosen explicitly.
    Any,
    /// The error is exactly the given type
    Type(TypeCheck),
    /// The failure carries this kind tag
    Tag(String),
    /// The body panicked instead of returning an error
    Panic,
}

impl ExpectedKind {
    pub fn of<T: StdError + 'static>() -> Self {
        Self::Type(TypeCheck::of::<T>())
    }

    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }

    /// Whether the failure's kind is acceptable
    pub fn admits(&self, failure: &FailureView<'_>) -> bool {
        match self {
            Self::Any => true,
            Self::Type(check) => failure.error().is_some_and(|e| check.admits(e)),
            Self::Tag(tag) => failure.tag() == Some(tag.as_str()),
            Self::Panic => failure.is_panic(),
        }
    }
}

impl fmt::Display for ExpectedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Type(check) => write!(f, "{}", check.name()),
            Self::Tag(tag) => write!(f, "{}", tag),
            Self::Panic => write!(f, "panic"),
        }
    }
}

/// Parses the labels used in manifests: `any`, `panic`, or a kind tag.
impl FromStr for ExpectedKind {
    type Err = KnownIssueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(KnownIssueError::UnknownKind(s.to_string())),
            "any" => Ok(Self::Any),
            "panic" => Ok(Self::Panic),
            tag if tag.chars().any(char::is_whitespace) => {
                Err(KnownIssueError::UnknownKind(tag.to_string()))
            }
            tag => Ok(Self::Tag(tag.to_string())),
        }
    }
}

/// Test applied to a failure's message.
#[derive(Debug, Clone)]
pub enum MessagePattern {
    /// Partial match unless the pattern anchors itself with `^`/`$`
    Regex(Regex),
    /// Whole-message equality
    Exact(String),
}

impl MessagePattern {
    pub fn regex(pattern: &str) -> KnownIssueResult<Self> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|source| KnownIssueError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })
    }

    pub fn exact(message: impl Into<String>) -> Self {
        Self::Exact(message.into())
    }

    pub fn test(&self, message: &str) -> bool {
        match self {
            Self::Regex(re) => re.is_match(message),
            Self::Exact(expected) => expected == message,
        }
    }
}

impl fmt::Display for MessagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regex(re) => write!(f, "/{}/", re.as_str()),
            Self::Exact(message) => write!(f, "{:?}", message),
        }
    }
}

/// Kind plus message pattern; matches when both agree.
#[derive(Debug, Clone)]
pub struct ErrorMatcher {
    kind: ExpectedKind,
    pattern: MessagePattern,
}

impl ErrorMatcher {
    pub fn new(kind: ExpectedKind, pattern: MessagePattern) -> Self {
        Self { kind, pattern }
    }

    pub fn kind(&self) -> &ExpectedKind {
        &self.kind
    }

    pub fn pattern(&self) -> &MessagePattern {
        &self.pattern
    }

    pub fn matches(&self, failure: &FailureView<'_>) -> bool {
        self.kind.admits(failure) && self.pattern.test(failure.message())
    }
}

impl fmt::Display for ErrorMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} matching {}", self.kind, self.pattern)
    }
}

/// Build a matcher for failures of `kind` whose message matches the
/// regular expression `pattern`.
///
/// A malformed pattern is rejected here so it can never surface while a
/// failure is being classified.
pub fn expected_exception(kind: ExpectedKind, pattern: &str) -> KnownIssueResult<ErrorMatcher> {
    Ok(ErrorMatcher::new(kind, MessagePattern::regex(pattern)?))
}

type PredicateFn = dyn Fn(&FailureView<'_>) -> bool + Send + Sync;

/// The matcher a known issue holds.
#[derive(Clone)]
pub enum IssueMatcher {
    Expected(ErrorMatcher),
    Predicate {
        description: String,
        predicate: Arc<PredicateFn>,
    },
}

impl IssueMatcher {
    /// Wrap an arbitrary predicate. A predicate that panics is treated as
    /// not matching by the registry.
    pub fn predicate<F>(description: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&FailureView<'_>) -> bool + Send + Sync + 'static,
    {
        Self::Predicate {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn matches(&self, failure: &FailureView<'_>) -> bool {
        match self {
            Self::Expected(matcher) => matcher.matches(failure),
            Self::Predicate { predicate, .. } => predicate(failure),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Expected(matcher) => matcher.to_string(),
            Self::Predicate { description, .. } => description.clone(),
        }
    }
}

impl From<ErrorMatcher> for IssueMatcher {
    fn from(matcher: ErrorMatcher) -> Self {
        Self::Expected(matcher)
    }
}

impl fmt::Debug for IssueMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expected(matcher) => f.debug_tuple("Expected").field(matcher).finish(),
            Self::Predicate { description, .. } => {
                f.debug_struct("Predicate")
                    .field("description", description)
                    .finish_non_exhaustive()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use test_case::test_case;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct TypeError(String);

    #[test_case("missing alarm, id=AB12", true ; "partial regex match")]
    #[test_case("prefix: missing alarm, id=FF00 suffix", true ; "unanchored matches inside")]
    #[test_case("missing alarm id AB12", false ; "missing id token")]
    #[test_case("", false ; "empty message")]
    fn test_unanchored_pattern(message: &str, expected: bool) {
        let matcher =
            expected_exception(ExpectedKind::Any, r"missing alarm, id=([A-F0-9]+)").unwrap();
        let err = anyhow::anyhow!(message.to_string());
        assert_eq!(matcher.matches(&FailureView::from_failure(&err)), expected);
    }

    #[test]
    fn test_anchored_pattern_requires_whole_message() {
        let matcher =
            expected_exception(ExpectedKind::Any, r"^missing alarm, id=([A-F0-9]+)$").unwrap();
        let err = anyhow::anyhow!("prefix: missing alarm, id=AB12");
        assert!(!matcher.matches(&FailureView::from_failure(&err)));
    }

    #[test]
    fn test_type_kind() {
        let matcher = expected_exception(ExpectedKind::of::<TypeError>(), "boom").unwrap();
        let typed: anyhow::Error = TypeError("boom".into()).into();
        let untyped = anyhow::anyhow!("boom");
        assert!(matcher.matches(&FailureView::from_failure(&typed)));
        assert!(!matcher.matches(&FailureView::from_failure(&untyped)));
    }

    #[test]
    fn test_type_kind_never_admits_panics() {
        let matcher = expected_exception(ExpectedKind::of::<TypeError>(), "boom").unwrap();
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert!(!matcher.matches(&FailureView::from_panic(&*payload)));

        let panics = expected_exception(ExpectedKind::Panic, "boom").unwrap();
        assert!(panics.matches(&FailureView::from_panic(&*payload)));
    }

    #[test]
    fn test_exact_pattern() {
        let matcher =
            ErrorMatcher::new(ExpectedKind::Any, MessagePattern::exact("graphql timeout"));
        let same = anyhow::anyhow!("graphql timeout");
        let longer = anyhow::anyhow!("graphql timeout after 30s");
        assert!(matcher.matches(&FailureView::from_failure(&same)));
        assert!(!matcher.matches(&FailureView::from_failure(&longer)));
    }

    #[test]
    fn test_invalid_pattern_is_rejected_up_front() {
        let err =
            expected_exception(ExpectedKind::Any, "missing alarm, id=([A-F0-9]+").unwrap_err();
        assert!(matches!(err, KnownIssueError::InvalidPattern { .. }));
    }

    #[test_case("any" ; "any")]
    #[test_case("panic" ; "panic")]
    #[test_case("timeout" ; "tag")]
    fn test_kind_labels_round_trip(label: &str) {
        let kind: ExpectedKind = label.parse().unwrap();
        assert_eq!(kind.to_string(), label);
    }

    #[test]
    fn test_blank_kind_label_is_rejected() {
        assert!("  ".parse::<ExpectedKind>().is_err());
        assert!("graphql error".parse::<ExpectedKind>().is_err());
    }

    #[test]
    fn test_describe() {
        let matcher: IssueMatcher =
            expected_exception(ExpectedKind::tag("graphql"), "^Unauthorized").unwrap().into();
        assert_eq!(matcher.describe(), "graphql matching /^Unauthorized/");

        let custom = IssueMatcher::predicate("always", |_| true);
        assert_eq!(custom.describe(), "always");
    }
}
