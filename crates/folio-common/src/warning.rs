//! Diagnostics for recoverable compile issues.
//!
//! The pipeline never aborts on bad input: tokenizers recover, unsupported
//! CSS constructs are dropped, missing resources evaluate as unset. This
//! module is where those events land. Each stage reports through its own
//! [`WarnKind`], which keeps a running error counter per stage and prints
//! each distinct message once, so a document with ten thousand copies of
//! the same malformed entity produces one line of terminal noise and an
//! accurate count.

use std::collections::HashSet;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Mutex, OnceLock, PoisonError};

/// ANSI escapes for the terminal output.
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

/// Which stage of the pipeline raised a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarnKind {
    /// HTML tokenizer parse errors (stray nulls, malformed references).
    HtmlTokenizer,
    /// HTML tree-builder parse errors (misnested or misplaced tags).
    HtmlParser,
    /// Dropped CSS constructs: unknown properties, invalid values,
    /// unsupported selectors and at-rules.
    Css,
    /// Resource fetch or decode failures.
    Resource,
}

impl WarnKind {
    const COUNT: usize = 4;

    const fn index(self) -> usize {
        match self {
            Self::HtmlTokenizer => 0,
            Self::HtmlParser => 1,
            Self::Css => 2,
            Self::Resource => 3,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::HtmlTokenizer => "html-tokenizer",
            Self::HtmlParser => "html-parser",
            Self::Css => "css",
            Self::Resource => "resource",
        }
    }
}

/// Per-document diagnostic state: a counter per stage, plus the set of
/// message fingerprints already printed.
struct DiagnosticLog {
    counts: [usize; WarnKind::COUNT],
    printed: HashSet<u64>,
}

impl DiagnosticLog {
    fn new() -> Self {
        Self {
            counts: [0; WarnKind::COUNT],
            printed: HashSet::new(),
        }
    }
}

static LOG: OnceLock<Mutex<DiagnosticLog>> = OnceLock::new();

fn log() -> std::sync::MutexGuard<'static, DiagnosticLog> {
    LOG.get_or_init(|| Mutex::new(DiagnosticLog::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Record a recoverable issue for `kind`. The stage counter always
/// advances; the message prints only the first time its fingerprint is
/// seen.
///
/// # Example
/// ```ignore
/// warn_once(WarnKind::Css, "dropping unknown property 'colr'");
/// ```
pub fn warn_once(kind: WarnKind, message: &str) {
    let mut hasher = DefaultHasher::new();
    kind.hash(&mut hasher);
    message.hash(&mut hasher);
    let fingerprint = hasher.finish();

    let mut log = log();
    log.counts[kind.index()] += 1;
    if log.printed.insert(fingerprint) {
        eprintln!("{YELLOW}folio[{}] ⚠ {message}{RESET}", kind.label());
    }
}

/// How many issues `kind` has recorded since the last
/// [`clear_warnings`]. Duplicates count; only the printing is
/// deduplicated.
#[must_use]
pub fn warning_count(kind: WarnKind) -> usize {
    log().counts[kind.index()]
}

/// Total issues recorded across all stages since the last
/// [`clear_warnings`].
#[must_use]
pub fn total_warnings() -> usize {
    log().counts.iter().sum()
}

/// Reset counters and the printed-message set. Called when a new document
/// load begins, so counts are per-document.
pub fn clear_warnings() {
    let mut log = log();
    log.counts = [0; WarnKind::COUNT];
    log.printed.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    // The log is process-global, so these assertions run in one test to
    // avoid cross-test interference.
    #[test]
    fn counters_advance_and_clear() {
        clear_warnings();
        warn_once(WarnKind::Css, "counter test message one");
        warn_once(WarnKind::Css, "counter test message one");
        warn_once(WarnKind::HtmlParser, "counter test message two");
        assert_eq!(warning_count(WarnKind::Css), 2);
        assert_eq!(warning_count(WarnKind::HtmlParser), 1);
        assert_eq!(warning_count(WarnKind::Resource), 0);
        assert!(total_warnings() >= 3);
        clear_warnings();
        assert_eq!(total_warnings(), 0);
    }
}
