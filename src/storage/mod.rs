//! Poll Archive
//!
//! Durable snapshot/restore of the poll store. The archive is one JSON
//! document holding every poll; saves replace the file atomically so a
//! crash mid-write cannot corrupt it, and loading falls back to an empty
//! store so startup never fails on archive problems.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::polls::store::PollStore;
use crate::polls::types::{Poll, PollId};

/// Current archive format version
pub const ARCHIVE_VERSION: u32 = 1;

/// Archive errors
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Archive I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid archive format: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Unsupported archive version: {0}")]
    UnsupportedVersion(u32),
}

/// Archive contents stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveDocument {
    /// Version for future compatibility
    pub version: u32,

    /// All polls, keyed by ID
    pub polls: HashMap<PollId, Poll>,
}

impl ArchiveDocument {
    /// Wrap polls in the current archive format
    pub fn new(polls: HashMap<PollId, Poll>) -> Self {
        Self {
            version: ARCHIVE_VERSION,
            polls,
        }
    }
}

/// Poll archive on local disk
#[derive(Debug, Clone)]
pub struct PollArchive {
    /// Durable archive file
    path: PathBuf,
}

impl PollArchive {
    /// Create an archive handle for the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the archive file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every poll from the archive
    pub async fn load_all(&self) -> Result<HashMap<PollId, Poll>, ArchiveError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let doc: ArchiveDocument = serde_json::from_str(&content)?;
        if doc.version > ARCHIVE_VERSION {
            return Err(ArchiveError::UnsupportedVersion(doc.version));
        }
        Ok(doc.polls)
    }

    /// Load the archive, falling back to empty on any failure
    ///
    /// A missing file is the normal first run. Anything else is logged and
    /// the service starts with no polls rather than refusing to start.
    pub async fn load_or_default(&self) -> HashMap<PollId, Poll> {
        match self.load_all().await {
            Ok(polls) => {
                info!(
                    path = %self.path.display(),
                    polls = polls.len(),
                    "loaded poll archive"
                );
                polls
            }
            Err(ArchiveError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no poll archive yet, starting empty");
                HashMap::new()
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to load poll archive, starting empty"
                );
                HashMap::new()
            }
        }
    }

    /// Save every poll, replacing the archive atomically
    ///
    /// Writes a sibling temp file and renames it over the archive, so a
    /// crash mid-write leaves the previous archive intact.
    pub async fn save_all(&self, polls: HashMap<PollId, Poll>) -> Result<(), ArchiveError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let doc = ArchiveDocument::new(polls);
        let mut content = serde_json::to_string_pretty(&doc)?;
        content.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Save the store's polls if it has unsaved changes
///
/// Clears the dirty flag before saving and restores it on failure, so the
/// next pass retries the same state.
pub async fn save_if_dirty(store: &PollStore, archive: &PollArchive) {
    if !store.take_dirty() {
        return;
    }

    let polls = store.snapshot();
    let count = polls.len();
    if let Err(e) = archive.save_all(polls).await {
        warn!(
            path = %archive.path().display(),
            error = %e,
            "failed to save poll archive"
        );
        store.mark_dirty();
        return;
    }
    debug!(polls = count, "saved poll archive");
}

/// Run the autosave loop.
///
/// Wakes when the store is dirtied, every `interval`, or on shutdown; a
/// final save runs on the way out so no acknowledged change stays
/// memory-only.
pub async fn autosave_loop(
    store: Arc<PollStore>,
    archive: PollArchive,
    interval: Duration,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) {
    loop {
        // Wait for notification, timeout, or shutdown
        tokio::select! {
            _ = store.notifier().notified() => {}
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.changed() => {
                break;
            }
        }

        // Check shutdown after waking
        if *shutdown.borrow() {
            break;
        }

        save_if_dirty(&store, &archive).await;
    }

    save_if_dirty(&store, &archive).await;
}
