//! Runner configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable naming the deployment environment under test
pub const ENV_ENVIRONMENT: &str = "BMS_E2E_ENV";
/// Environment variable pointing at the known-issue manifest
pub const ENV_KNOWN_ISSUES: &str = "BMS_E2E_KNOWN_ISSUES";
/// Environment variable overriding the results directory
pub const ENV_OUTPUT: &str = "BMS_E2E_OUTPUT";

/// Configuration for the suite runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Deployment environment the suite targets (e.g. `staging`)
    pub environment: String,

    /// Known-issue manifest, if any
    #[serde(default)]
    pub known_issues: Option<PathBuf>,

    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            environment: "local".to_string(),
            known_issues: None,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

impl RunnerConfig {
    /// Defaults overridden by `BMS_E2E_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            environment: non_empty(ENV_ENVIRONMENT).unwrap_or(defaults.environment),
            known_issues: non_empty(ENV_KNOWN_ISSUES).map(PathBuf::from).or(defaults.known_issues),
            output_dir: non_empty(ENV_OUTPUT).map(PathBuf::from).unwrap_or(defaults.output_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_variables() {
        let config = RunnerConfig::from_lookup(|_| None);
        assert_eq!(config.environment, "local");
        assert!(config.known_issues.is_none());
        assert_eq!(config.output_dir, PathBuf::from("test-results"));
    }

    #[test]
    fn test_variables_override_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_ENVIRONMENT, "staging"),
            (ENV_KNOWN_ISSUES, "known-issues.yaml"),
            (ENV_OUTPUT, " "),
        ]);
        let config = RunnerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.environment, "staging");
        assert_eq!(config.known_issues, Some(PathBuf::from("known-issues.yaml")));
        assert_eq!(config.output_dir, PathBuf::from("test-results"));
    }
}
