//! bms-issues - inspect and check known-issue manifests
//!
//! ```text
//! bms-issues check known-issues.yaml
//! bms-issues list known-issues.yaml --env staging --test alarms-list-matches-api
//! bms-issues classify known-issues.yaml --kind graphql --message "missing alarm, id=AB12"
//! ```

use std::any::Any;
use std::fmt;
use std::path::PathBuf;

use anyhow::Context;
use bms_e2e::E2eError;
use bms_known_issues::{Failure, FailureView, KnownIssueManifest, ManifestEntry};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

mod output;

use output::{OutputFormat, TableDisplay};

#[derive(Parser)]
#[command(name = "bms-issues")]
#[command(author, version, long_about = None)]
#[command(about = "Inspect and check BMS known-issue manifests")]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every entry and report invalid ones, including kinds no
    /// suite error carries
    Check {
        /// Path to the manifest
        manifest: PathBuf,
    },

    /// List the entries in effect for an environment and test
    List(ScopeArgs),

    /// Show which known issue would suppress a failure
    Classify {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Failure message
        #[arg(short, long)]
        message: String,

        /// Failure kind tag (e.g. graphql, timeout, assertion)
        #[arg(short, long, conflicts_with = "panic")]
        kind: Option<String>,

        /// Classify as a panic rather than a returned error
        #[arg(long)]
        panic: bool,
    },
}

#[derive(Args)]
struct ScopeArgs {
    /// Path to the manifest
    manifest: PathBuf,

    /// Deployment environment
    #[arg(long, env = bms_e2e::config::ENV_ENVIRONMENT)]
    env: Option<String>,

    /// Test case name
    #[arg(long)]
    test: Option<String>,
}

impl ScopeArgs {
    fn load(&self) -> anyhow::Result<KnownIssueManifest> {
        KnownIssueManifest::from_file(&self.manifest)
            .with_context(|| format!("Failed to load {}", self.manifest.display()))
    }
}

#[derive(Serialize)]
struct EntryRow {
    reference: String,
    kind: String,
    pattern: String,
    note: Option<String>,
    environments: Vec<String>,
    tests: Vec<String>,
}

impl From<&ManifestEntry> for EntryRow {
    fn from(entry: &ManifestEntry) -> Self {
        let pattern = if entry.exact {
            format!("{:?}", entry.pattern)
        } else {
            format!("/{}/", entry.pattern)
        };
        Self {
            reference: entry.reference.clone(),
            kind: entry.kind.clone(),
            pattern,
            note: entry.note.clone(),
            environments: entry.environments.clone(),
            tests: entry.tests.clone(),
        }
    }
}

impl TableDisplay for EntryRow {
    fn headers() -> Vec<&'static str> {
        vec!["Reference", "Kind", "Pattern", "Note", "Environments", "Tests"]
    }

    fn row(&self) -> Vec<String> {
        let scope = |values: &[String]| {
            if values.is_empty() {
                "*".to_string()
            } else {
                values.join(", ")
            }
        };
        vec![
            self.reference.clone(),
            self.kind.clone(),
            self.pattern.clone(),
            self.note.clone().unwrap_or_default(),
            scope(&self.environments),
            scope(&self.tests),
        ]
    }
}

#[derive(Serialize)]
struct Classification {
    suppressed: bool,
    reference: Option<String>,
    note: Option<String>,
}

impl TableDisplay for Classification {
    fn headers() -> Vec<&'static str> {
        vec!["Suppressed", "Reference", "Note"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            if self.suppressed { "yes" } else { "no" }.to_string(),
            self.reference.clone().unwrap_or_else(|| "-".to_string()),
            self.note.clone().unwrap_or_default(),
        ]
    }
}

/// A failure described on the command line
#[derive(Debug)]
struct ProbeFailure {
    message: String,
    kind: Option<String>,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ProbeFailure {}

impl Failure for ProbeFailure {
    fn as_error(&self) -> &(dyn std::error::Error + 'static) {
        self
    }

    fn tag(&self) -> Option<&str> {
        self.kind.as_deref()
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check { manifest: path } => {
            let manifest = KnownIssueManifest::from_file(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            let problems = manifest.problems_with_tags(E2eError::TAGS);
            if problems.is_empty() {
                println!(
                    "✅ {} known issue(s) in {} are valid",
                    manifest.issues.len(),
                    path.display()
                );
            } else {
                for problem in &problems {
                    println!("❌ {}", problem);
                }
                std::process::exit(1);
            }
        }
        Commands::List(scope) => {
            let manifest = scope.load()?;
            let rows: Vec<EntryRow> = manifest
                .entries_for(scope.env.as_deref(), scope.test.as_deref())
                .map(EntryRow::from)
                .collect();
            output::print_list(&rows, cli.format);
        }
        Commands::Classify {
            scope,
            message,
            kind,
            panic,
        } => {
            let manifest = scope.load()?;
            let registry = manifest.registry_for(scope.env.as_deref(), scope.test.as_deref())?;

            let probe = ProbeFailure { message, kind };
            let payload: Box<dyn Any + Send> = Box::new(probe.message.clone());
            let view = if panic {
                FailureView::from_panic(&*payload)
            } else {
                FailureView::from_failure(&probe)
            };

            let found = registry.find_match(&view);
            let classification = Classification {
                suppressed: found.is_some(),
                reference: found.map(|i| i.reference().to_string()),
                note: found.and_then(|i| i.note()).map(str::to_string),
            };
            output::print_item(&classification, cli.format);
        }
    }

    Ok(())
}
