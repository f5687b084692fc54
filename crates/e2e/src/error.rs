//! Error types for E2E scenarios

use std::error::Error as StdError;

use bms_known_issues::{Failure, KnownIssueError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("GraphQL error in {operation}: {message}")]
    GraphQl { operation: String, message: String },

    #[error("UI error on {page}: {reason}")]
    Ui { page: String, reason: String },

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("No fixtures for environment: {0}")]
    MissingEnvironment(String),

    #[error("Test case not found: {0}")]
    CaseNotFound(String),

    #[error("Known issues: {0}")]
    KnownIssues(#[from] KnownIssueError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl E2eError {
    /// Every tag [`E2eError::tag`] can return
    pub const TAGS: &'static [&'static str] = &[
        "assertion",
        "graphql",
        "ui",
        "timeout",
        "fixture",
        "environment",
        "case",
        "known_issues",
        "io",
        "json",
    ];

    /// Stable kind tag, as written in the `kind` field of a known-issue manifest
    pub fn tag(&self) -> &'static str {
        match self {
            E2eError::AssertionFailed(_) => "assertion",
            E2eError::GraphQl { .. } => "graphql",
            E2eError::Ui { .. } => "ui",
            E2eError::Timeout(_) => "timeout",
            E2eError::Fixture(_) => "fixture",
            E2eError::MissingEnvironment(_) => "environment",
            E2eError::CaseNotFound(_) => "case",
            E2eError::KnownIssues(_) => "known_issues",
            E2eError::Io(_) => "io",
            E2eError::Json(_) => "json",
        }
    }

    pub fn assertion(message: impl Into<String>) -> Self {
        E2eError::AssertionFailed(message.into())
    }

    pub fn graphql(operation: impl Into<String>, message: impl Into<String>) -> Self {
        E2eError::GraphQl {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn ui(page: impl Into<String>, reason: impl Into<String>) -> Self {
        E2eError::Ui {
            page: page.into(),
            reason: reason.into(),
        }
    }
}

impl Failure for E2eError {
    fn as_error(&self) -> &(dyn StdError + 'static) {
        self
    }

    fn tag(&self) -> Option<&str> {
        Some(E2eError::tag(self))
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
