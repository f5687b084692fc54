//! Skip signals sent to the surrounding test framework

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::guard::Suppression;

/// Where a guarded run reports that a failure was suppressed.
///
/// Called exactly once per suppressed run and never otherwise.
pub trait SkipReporter: Send + Sync {
    fn skip(&self, suppression: &Suppression);
}

impl<T: SkipReporter + ?Sized> SkipReporter for Arc<T> {
    fn skip(&self, suppression: &Suppression) {
        (**self).skip(suppression)
    }
}

/// Default reporter: a structured warning plus a `SKIPPED` line on stderr,
/// which stays visible in `cargo test` output.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl SkipReporter for LogReporter {
    fn skip(&self, suppression: &Suppression) {
        warn!(
            test = suppression.test_name.as_deref().unwrap_or("<unnamed>"),
            reference = %suppression.reference,
            note = suppression.note.as_deref().unwrap_or(""),
            error = %suppression.error_message,
            "Test skipped due to known issue"
        );
        eprintln!("SKIPPED {}", suppression.reason());
    }
}

/// Keeps every skip signal it receives.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    skips: Mutex<Vec<Suppression>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the signals received so far
    pub fn skips(&self) -> Vec<Suppression> {
        self.skips.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.skips.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.skips.lock().is_empty()
    }

    /// Drain the recorded signals
    pub fn take(&self) -> Vec<Suppression> {
        std::mem::take(&mut *self.skips.lock())
    }
}

impl SkipReporter for RecordingReporter {
    fn skip(&self, suppression: &Suppression) {
        self.skips.lock().push(suppression.clone());
    }
}
