//! Suite runner that executes scenario cases under known-issue guards

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Instant;

use bms_known_issues::failure::panic_message;
use bms_known_issues::{with_known_issues, KnownIssueManifest, Outcome, SkipReporter, Suppression};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::RunnerConfig;
use crate::error::{E2eError, E2eResult};

/// How a case ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    /// Failed with a known issue; never counted as passed
    Skipped,
    Failed,
}

/// Result of running a single case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    pub name: String,
    pub status: CaseStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub known_issue: Option<Suppression>,
}

/// Result of running a set of cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub environment: String,
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration_ms: u64,
    pub results: Vec<CaseResult>,
}

impl SuiteResult {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn case(&self, name: &str) -> Option<&CaseResult> {
        self.results.iter().find(|r| r.name == name)
    }
}

type CaseBody = Box<dyn Fn() -> BoxFuture<'static, E2eResult<()>> + Send + Sync>;

struct Case {
    name: String,
    tags: Vec<String>,
    body: CaseBody,
}

/// Runs registered cases one at a time, each under a fresh known-issue
/// registry scoped to the configured environment and the case name.
pub struct SuiteRunner {
    config: RunnerConfig,
    manifest: KnownIssueManifest,
    reporter: Option<Box<dyn SkipReporter>>,
    cases: Vec<Case>,
}

impl SuiteRunner {
    /// Create a runner, loading the known-issue manifest named in the
    /// configuration. Every manifest entry is compiled up front so a bad
    /// pattern fails here rather than in the middle of a run.
    pub fn new(config: RunnerConfig) -> E2eResult<Self> {
        let manifest = match &config.known_issues {
            Some(path) => {
                info!("Loading known issues from {}", path.display());
                KnownIssueManifest::from_file(path)?
            }
            None => KnownIssueManifest::default(),
        };
        Self::with_manifest(config, manifest)
    }

    /// Create a runner with an already-parsed manifest. Tag kinds must be
    /// ones [`E2eError::tag`] can produce.
    pub fn with_manifest(config: RunnerConfig, manifest: KnownIssueManifest) -> E2eResult<Self> {
        manifest.validate_with_tags(E2eError::TAGS)?;
        debug!(
            "{} known issue(s) declared for environment '{}'",
            manifest.entries_for(Some(config.environment.as_str()), None).count(),
            config.environment
        );
        Ok(Self {
            config,
            manifest,
            reporter: None,
            cases: Vec::new(),
        })
    }

    /// Send skip signals to `reporter` instead of the log
    pub fn with_reporter(mut self, reporter: impl SkipReporter + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Register a case. `body` is called once per run of the case.
    pub fn case<F, Fut>(&mut self, name: impl Into<String>, tags: &[&str], body: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<()>> + Send + 'static,
    {
        self.cases.push(Case {
            name: name.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            body: Box::new(move || body().boxed()),
        });
        self
    }

    pub fn case_names(&self) -> Vec<&str> {
        self.cases.iter().map(|c| c.name.as_str()).collect()
    }

    /// Run every registered case
    pub async fn run_all(&self) -> E2eResult<SuiteResult> {
        self.run_cases(self.cases.iter().collect()).await
    }

    /// Run cases carrying `tag`
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<SuiteResult> {
        let cases = self
            .cases
            .iter()
            .filter(|c| c.tags.iter().any(|t| t == tag))
            .collect();
        self.run_cases(cases).await
    }

    /// Run a single case by name
    pub async fn run_case(&self, name: &str) -> E2eResult<CaseResult> {
        let case = self
            .cases
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| E2eError::CaseNotFound(name.to_string()))?;
        self.execute(case).await
    }

    async fn run_cases(&self, cases: Vec<&Case>) -> E2eResult<SuiteResult> {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(cases.len());
        let (mut passed, mut failed, mut skipped) = (0, 0, 0);

        info!("Running {} case(s) against '{}'...", cases.len(), self.config.environment);

        for case in &cases {
            let result = self.execute(case).await?;
            match result.status {
                CaseStatus::Passed => {
                    passed += 1;
                    info!("✓ {} ({} ms)", result.name, result.duration_ms);
                }
                CaseStatus::Skipped => {
                    skipped += 1;
                    let reference = result.known_issue.as_ref().map(|s| s.reference.as_str());
                    warn!("↷ {} - known issue {}", result.name, reference.unwrap_or("?"));
                }
                CaseStatus::Failed => {
                    failed += 1;
                    let message = result.error.as_deref().unwrap_or("unknown error");
                    error!("✗ {} - {}", result.name, message);
                }
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!(
            "Case Results: {} passed, {} failed, {} skipped ({} ms)",
            passed, failed, skipped, duration_ms
        );

        Ok(SuiteResult {
            environment: self.config.environment.clone(),
            started_at,
            total: cases.len(),
            passed,
            failed,
            skipped,
            duration_ms,
            results,
        })
    }

    async fn execute(&self, case: &Case) -> E2eResult<CaseResult> {
        let registry = self
            .manifest
            .registry_for(Some(self.config.environment.as_str()), Some(case.name.as_str()))?;
        let start = Instant::now();
        debug!("Running case: {} ({} known issue(s))", case.name, registry.len());

        let mut guard = with_known_issues(&registry).with_test_name(case.name.clone());
        if let Some(reporter) = &self.reporter {
            guard = guard.with_reporter(&**reporter);
        }

        // The factory call sits inside the guarded future so a panic while
        // building the body is classified like any other.
        let run = guard.run(async { (case.body)().await });

        let (status, error, known_issue) = match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(Outcome::Passed)) => (CaseStatus::Passed, None, None),
            Ok(Ok(Outcome::Suppressed(suppression))) => (
                CaseStatus::Skipped,
                Some(suppression.error_message.clone()),
                Some(suppression),
            ),
            Ok(Err(e)) => (CaseStatus::Failed, Some(e.to_string()), None),
            Err(payload) => {
                let message = panic_message(&*payload).unwrap_or("<non-string panic payload>");
                (CaseStatus::Failed, Some(format!("panicked: {}", message)), None)
            }
        };

        Ok(CaseResult {
            name: case.name.clone(),
            status,
            duration_ms: start.elapsed().as_millis() as u64,
            error,
            known_issue,
        })
    }

    /// Write suite results to `test-results.json` in the output directory
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_status_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&CaseStatus::Skipped).unwrap(), "\"skipped\"");
    }

    #[tokio::test]
    async fn test_unknown_case() {
        let runner = SuiteRunner::new(RunnerConfig::default()).unwrap();
        let err = runner.run_case("missing").await.unwrap_err();
        assert!(matches!(err, E2eError::CaseNotFound(_)));
    }
}
