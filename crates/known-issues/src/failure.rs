//! Captured failures and the read-only view matchers evaluate against

use std::any::Any;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};

/// An error a guarded body can fail with.
///
/// Implemented for `anyhow::Error` and boxed trait-object errors. Suite
/// error types implement it directly to expose a stable kind tag.
pub trait Failure {
    /// The error as a trait object, used for type-based kind checks
    fn as_error(&self) -> &(dyn StdError + 'static);

    /// Stable kind tag, if the error type carries one
    fn tag(&self) -> Option<&str> {
        None
    }
}

impl Failure for anyhow::Error {
    fn as_error(&self) -> &(dyn StdError + 'static) {
        &**self
    }
}

impl Failure for Box<dyn StdError + Send + Sync + 'static> {
    fn as_error(&self) -> &(dyn StdError + 'static) {
        &**self
    }
}

impl Failure for Box<dyn StdError + 'static> {
    fn as_error(&self) -> &(dyn StdError + 'static) {
        &**self
    }
}

/// What a matcher sees of a failure.
///
/// Built either from a returned error or from a panic payload. Building a
/// view never panics: an error whose `Display` panics renders as the empty
/// message, as does a panic payload that is not a string.
#[derive(Debug)]
pub struct FailureView<'a> {
    message: Cow<'a, str>,
    error: Option<&'a (dyn StdError + 'static)>,
    tag: Option<&'a str>,
    panicked: bool,
}

impl<'a> FailureView<'a> {
    /// View of an error returned by a body
    pub fn from_failure<E: Failure + ?Sized>(failure: &'a E) -> Self {
        let error = failure.as_error();
        Self {
            message: Cow::Owned(render_message(error)),
            error: Some(error),
            tag: failure.tag(),
            panicked: false,
        }
    }

    /// View of a panic raised while polling a body
    pub fn from_panic(payload: &'a (dyn Any + Send)) -> Self {
        Self {
            message: Cow::Borrowed(panic_message(payload).unwrap_or_default()),
            error: None,
            tag: None,
            panicked: true,
        }
    }

    /// Top-level message, or `""` when none could be rendered
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The error object, `None` for panics
    pub fn error(&self) -> Option<&'a (dyn StdError + 'static)> {
        self.error
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag
    }

    pub fn is_panic(&self) -> bool {
        self.panicked
    }
}

fn render_message(error: &(dyn StdError + 'static)) -> String {
    panic::catch_unwind(AssertUnwindSafe(|| error.to_string())).unwrap_or_default()
}

/// Text carried by a panic payload, if it is a `&str` or `String`
pub fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Exploding;

    impl fmt::Display for Exploding {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            panic!("display is broken")
        }
    }

    impl StdError for Exploding {}

    #[test]
    fn test_view_of_anyhow_error() {
        let err = anyhow::anyhow!("missing alarm, id=AB12");
        let view = FailureView::from_failure(&err);
        assert_eq!(view.message(), "missing alarm, id=AB12");
        assert!(view.error().is_some());
        assert!(!view.is_panic());
        assert_eq!(view.tag(), None);
    }

    #[test]
    fn test_view_of_panicking_display_is_empty() {
        let err: Box<dyn StdError + Send + Sync> = Box::new(Exploding);
        let view = FailureView::from_failure(&err);
        assert_eq!(view.message(), "");
    }

    #[test]
    fn test_panic_payloads() {
        let borrowed: Box<dyn Any + Send> = Box::new("static text");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned text"));
        let opaque: Box<dyn Any + Send> = Box::new(42u32);

        assert_eq!(FailureView::from_panic(&*borrowed).message(), "static text");
        assert_eq!(FailureView::from_panic(&*owned).message(), "owned text");
        assert_eq!(FailureView::from_panic(&*opaque).message(), "");
        assert!(FailureView::from_panic(&*opaque).is_panic());
    }
}
