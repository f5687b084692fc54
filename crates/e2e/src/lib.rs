//! BMS E2E Suite Harness
//!
//! Runs building-management scenarios (dashboards, alarms, energy,
//! device monitoring) with known-issue suppression:
//! - Registers async scenario cases by name and tag
//! - Builds a fresh known-issue registry per case from a YAML manifest,
//!   scoped to the deployment environment and the case name
//! - Reports suppressed failures as skipped, never as passed
//! - Writes a JSON results file
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  SuiteRunner                                                │
//! │    ├── case(name, tags, body)                               │
//! │    ├── run_all() / run_tagged(tag) / run_case(name)         │
//! │    │     └── with_known_issues(registry_for(env, case))     │
//! │    │           .run(body) -> Passed | Skipped | Failed      │
//! │    └── write_results(&SuiteResult) -> test-results.json     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  wait::with_timeout / wait::eventually                      │
//! │    elapsed deadline -> E2eError::Timeout (kind "timeout")   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod runner;
pub mod wait;

pub use config::RunnerConfig;
pub use error::{E2eError, E2eResult};
pub use runner::{CaseResult, CaseStatus, SuiteResult, SuiteRunner};
