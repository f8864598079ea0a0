//! JSON sidecar store mapping user emails to the sandbox projects this tool
//! created for them.
//!
//! The file is read fully at startup and rewritten fully after every change.
//! Single-writer assumption: nothing guards against two processes mutating
//! the same file concurrently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::{JanitorError, JanitorResult};

/// A project recorded as owned by an email address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnedProject {
    pub project_id: String,
    pub project_name: String,
    pub created_at: DateTime<Utc>,
}

/// Persistent email → project mapping.
#[derive(Debug)]
pub struct OwnershipTracker {
    path: PathBuf,
    entries: BTreeMap<String, OwnedProject>,
}

impl OwnershipTracker {
    /// Open (or initialize) the tracker at `path`.
    ///
    /// A missing file starts an empty mapping. A file that exists but does
    /// not parse is treated as empty with a warning, so one corrupt write
    /// does not brick every subsequent run.
    ///
    /// # Errors
    ///
    /// Returns a store error if the file exists but cannot be read.
    pub fn open(path: impl AsRef<Path>) -> JanitorResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "Ownership file is not valid JSON, starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(JanitorError::store_with_source(
                    format!("failed to read ownership file {}", path.display()),
                    e,
                ))
            }
        };
        Ok(Self { path, entries })
    }

    /// Record a project for an email and persist immediately.
    pub fn record(
        &mut self,
        email: &str,
        project_id: &str,
        project_name: &str,
    ) -> JanitorResult<()> {
        self.entries.insert(
            email.to_string(),
            OwnedProject {
                project_id: project_id.to_string(),
                project_name: project_name.to_string(),
                created_at: Utc::now(),
            },
        );
        self.save()
    }

    /// The project id recorded for an email, if any.
    #[must_use]
    pub fn project_id(&self, email: &str) -> Option<&str> {
        self.entries.get(email).map(|p| p.project_id.as_str())
    }

    /// Remove an email's entry and persist. Returns whether it existed.
    pub fn remove(&mut self, email: &str) -> JanitorResult<bool> {
        let existed = self.entries.remove(email).is_some();
        if existed {
            self.save()?;
        }
        Ok(existed)
    }

    /// All tracked emails, in sorted order.
    #[must_use]
    pub fn emails(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// The full mapping.
    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, OwnedProject> {
        &self.entries
    }

    /// Number of tracked projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no projects are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // Full-file rewrite; no partial writes, no locking.
    fn save(&self) -> JanitorResult<()> {
        let raw = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, raw).map_err(|e| {
            JanitorError::store_with_source(
                format!("failed to write ownership file {}", self.path.display()),
                e,
            )
        })
    }
}
