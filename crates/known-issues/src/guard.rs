//! Guarded execution of a test body
//!
//! A guarded run polls the body once. Success passes straight through. A
//! failure is classified against the registry: the first matching known
//! issue turns it into a skip, anything else is handed back unchanged.
//!
//! ```text
//!            ┌──────────► Succeeded   Ok(Outcome::Passed)
//!  Running ──┼──────────► Suppressed  Ok(Outcome::Suppressed(..)) + skip signal
//!            └──────────► Failed      Err(original) / resumed panic
//! ```

use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::failure::{Failure, FailureView};
use crate::registry::KnownIssueRegistry;
use crate::reporter::{LogReporter, SkipReporter};

static LOG_REPORTER: LogReporter = LogReporter;

/// States of one guarded run. The three end states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Succeeded,
    Suppressed,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Running => "running",
            RunState::Succeeded => "succeeded",
            RunState::Suppressed => "suppressed",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A failure that was recognised as a known issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suppression {
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_name: Option<String>,
}

impl Suppression {
    /// Skip reason in the form `known issue <reference>: <note> (<error>)`
    pub fn reason(&self) -> String {
        match &self.note {
            Some(note) => format!(
                "known issue {}: {} ({})",
                self.reference, note, self.error_message
            ),
            None => format!("known issue {} ({})", self.reference, self.error_message),
        }
    }
}

/// How a guarded run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Suppressed(Suppression),
}

impl Outcome {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Outcome::Suppressed(_))
    }

    pub fn suppression(&self) -> Option<&Suppression> {
        match self {
            Outcome::Suppressed(s) => Some(s),
            Outcome::Passed => None,
        }
    }
}

/// Start a guarded run against `registry`.
pub fn with_known_issues(registry: &KnownIssueRegistry) -> GuardedExecution<'_> {
    GuardedExecution {
        registry,
        reporter: &LOG_REPORTER,
        test_name: None,
    }
}

/// One guarded run, bound to a registry. Consumed by [`GuardedExecution::run`].
pub struct GuardedExecution<'a> {
    registry: &'a KnownIssueRegistry,
    reporter: &'a dyn SkipReporter,
    test_name: Option<String>,
}

impl<'a> GuardedExecution<'a> {
    /// Send skip signals somewhere other than the log
    pub fn with_reporter(mut self, reporter: &'a dyn SkipReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Name used in diagnostics and carried in the suppression
    pub fn with_test_name(mut self, name: impl Into<String>) -> Self {
        self.test_name = Some(name.into());
        self
    }

    /// Run `body` once and classify its failure, if any.
    ///
    /// Returns `Ok(Outcome::Passed)` when the body succeeds and
    /// `Ok(Outcome::Suppressed(..))` when its failure matches a known issue.
    /// Any other error is returned as-is; any other panic is resumed with
    /// its original payload.
    ///
    /// A panicking body goes through the process panic hook before it is
    /// classified, so even a suppressed panic leaves the default
    /// `thread '..' panicked at ..` line on stderr ahead of the `SKIPPED`
    /// line. Install a quieter hook with [`std::panic::set_hook`] if that
    /// output is unwanted.
    pub async fn run<F, E>(self, body: F) -> Result<Outcome, E>
    where
        F: Future<Output = Result<(), E>>,
        E: Failure,
    {
        debug!(
            test = self.label(),
            state = %RunState::Running,
            known_issues = self.registry.len(),
            "Running guarded body"
        );

        match AssertUnwindSafe(body).catch_unwind().await {
            Ok(Ok(())) => {
                debug!(test = self.label(), state = %RunState::Succeeded, "Guarded body passed");
                Ok(Outcome::Passed)
            }
            Ok(Err(error)) => {
                let suppression = self.classify(&FailureView::from_failure(&error));
                match suppression {
                    Some(suppression) => Ok(Outcome::Suppressed(suppression)),
                    None => Err(error),
                }
            }
            Err(payload) => {
                let suppression = self.classify(&FailureView::from_panic(&*payload));
                match suppression {
                    Some(suppression) => Ok(Outcome::Suppressed(suppression)),
                    None => panic::resume_unwind(payload),
                }
            }
        }
    }

    fn classify(&self, failure: &FailureView<'_>) -> Option<Suppression> {
        let Some(issue) = self.registry.find_match(failure) else {
            debug!(
                test = self.label(),
                state = %RunState::Failed,
                panicked = failure.is_panic(),
                "No known issue matched, propagating failure"
            );
            return None;
        };

        let suppression = Suppression {
            reference: issue.reference().to_string(),
            note: issue.note().map(str::to_string),
            error_message: failure.message().to_string(),
            test_name: self.test_name.clone(),
        };
        info!(
            test = self.label(),
            state = %RunState::Suppressed,
            reference = issue.reference(),
            matcher = %issue.matcher().describe(),
            "Failure matched known issue"
        );
        self.reporter.skip(&suppression);
        Some(suppression)
    }

    fn label(&self) -> &str {
        self.test_name.as_deref().unwrap_or("<unnamed>")
    }
}
