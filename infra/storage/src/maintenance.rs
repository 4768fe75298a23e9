use crate::scratch;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Outcome of a scratch directory purge.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct PurgeReport {
    /// Stale scratch files removed.
    pub removed: usize,
    /// Stale scratch files that could not be removed.
    pub failed: usize,
    /// Entries left alone: too recent, or not named like a scratch file.
    pub kept: usize,
}

/// Removes scratch files older than `older_than`, judged by the timestamp in their name.
///
/// Only the top level of `dir` is inspected. Names that do not parse as scratch names are
/// never touched, and peers' in-flight files are protected as long as `older_than` exceeds
/// both the longest operation and the clock skew between machines sharing the store.
pub(crate) fn purge_scratch(dir: &Path, now: SystemTime, older_than: Duration) -> PurgeReport {
    let mut report = PurgeReport::default();

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).into_iter().flatten() {
        let stale = entry
            .file_name()
            .to_str()
            .and_then(scratch::created_at)
            .and_then(|created| now.duration_since(created).ok())
            .is_some_and(|age| age > older_than);

        if !stale || !entry.file_type().is_file() {
            report.kept += 1;
            continue;
        }

        match std::fs::remove_file(entry.path()) {
            Ok(()) => report.removed += 1,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "Failed to purge scratch file");
                report.failed += 1;
            },
        }
    }

    if report.removed > 0 || report.failed > 0 {
        info!(removed = report.removed, failed = report.failed, "Purged stale scratch files");
    }

    report
}
