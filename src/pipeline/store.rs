//! Phase Artifact Store
//!
//! Phase outputs persisted as pretty JSON under
//! `<root>/<submission_id>/<phase_dir>/<name>.json`. File presence is the
//! signal that a phase completed.
//!
//! ## Single writer
//!
//! - One async lock per submission id, held for a whole pipeline run and
//!   dropped from the registry once released with no other holder
//! - Writes are create-if-absent: an existing artifact is never replaced

use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::types::{Phase, PipelineError, Result, SubmissionId};

/// Result of a create-if-absent write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Created,
    AlreadyExists,
}

pub struct ArtifactStore {
    root: PathBuf,
    locks: DashMap<SubmissionId, Arc<Mutex<()>>>,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn submission_dir(&self, submission: &SubmissionId) -> PathBuf {
        self.root.join(submission.as_str())
    }

    pub fn path(&self, submission: &SubmissionId, phase: Phase, name: &str) -> PathBuf {
        self.submission_dir(submission)
            .join(phase.dir_name())
            .join(name)
    }

    /// Acquire the per-submission writer lock
    pub async fn lock(&self, submission: &SubmissionId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(submission.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        debug!(submission_id = %submission, "Waiting for submission lock");
        lock.lock_owned().await
    }

    /// Non-blocking variant; `None` when another run holds the submission
    pub fn try_lock(&self, submission: &SubmissionId) -> Option<OwnedMutexGuard<()>> {
        let lock = self
            .locks
            .entry(submission.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.try_lock_owned().ok()
    }

    /// Drop the lock entry for a submission nobody holds or waits on
    pub fn release(&self, submission: &SubmissionId) {
        self.locks
            .remove_if(submission, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Submissions with a live lock entry
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    pub async fn exists(&self, submission: &SubmissionId, phase: Phase, name: &str) -> bool {
        tokio::fs::try_exists(self.path(submission, phase, name))
            .await
            .unwrap_or(false)
    }

    /// Load a typed artifact; `Ok(None)` when it was never written
    pub async fn load<T: DeserializeOwned>(
        &self,
        submission: &SubmissionId,
        phase: Phase,
        name: &str,
    ) -> Result<Option<T>> {
        let path = self.path(submission, phase, name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content).map_err(|e| {
                    PipelineError::Storage(format!("Failed to parse {}: {}", path.display(), e))
                })?;
                debug!(path = %path.display(), "Loaded artifact");
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write an artifact unless it already exists
    pub async fn write_once<T: Serialize>(
        &self,
        submission: &SubmissionId,
        phase: Phase,
        name: &str,
        value: &T,
    ) -> Result<WriteOutcome> {
        let path = self.path(submission, phase, name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(value)?;

        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                warn!(path = %path.display(), "Artifact already exists; keeping original");
                return Ok(WriteOutcome::AlreadyExists);
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        info!(
            submission_id = %submission,
            phase = phase.dir_name(),
            artifact = name,
            bytes = content.len(),
            "Artifact written"
        );
        Ok(WriteOutcome::Created)
    }

    /// Phases whose primary artifact is present for a submission
    pub async fn completed_phases(&self, submission: &SubmissionId) -> Vec<Phase> {
        let mut phases = Vec::new();
        for phase in Phase::ALL {
            if self.exists(submission, phase, phase.artifact_name()).await {
                phases.push(phase);
            }
        }
        phases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn id(s: &str) -> SubmissionId {
        SubmissionId::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_write_once_keeps_first_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        let sub = id("sub-1");

        let first = store
            .write_once(&sub, Phase::Assembly, "idm.json", &json!({"v": 1}))
            .await
            .unwrap();
        let second = store
            .write_once(&sub, Phase::Assembly, "idm.json", &json!({"v": 2}))
            .await
            .unwrap();

        assert_eq!(first, WriteOutcome::Created);
        assert_eq!(second, WriteOutcome::AlreadyExists);
        let stored: Value = store.load(&sub, Phase::Assembly, "idm.json").await.unwrap().unwrap();
        assert_eq!(stored, json!({"v": 1}));
        assert!(temp_dir.path().join("sub-1/phase4/idm.json").exists());
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        let loaded: Option<Value> = store
            .load(&id("sub-2"), Phase::Analysis, "analysis.json")
            .await
            .unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_artifact_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        let sub = id("sub-3");
        let path = store.path(&sub, Phase::Executive, "executive.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let result: Result<Option<Value>> = store.load(&sub, Phase::Executive, "executive.json").await;
        assert!(matches!(result, Err(PipelineError::Storage(_))));
    }

    #[tokio::test]
    async fn test_submission_lock_is_exclusive() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        let sub = id("sub-4");

        let guard = store.lock(&sub).await;
        assert!(store.try_lock(&sub).is_none());
        assert!(store.try_lock(&id("sub-5")).is_some());
        drop(guard);
        assert!(store.try_lock(&sub).is_some());
    }

    #[tokio::test]
    async fn test_release_keeps_held_locks() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        let held = id("sub-7");
        let done = id("sub-8");

        let guard = store.lock(&held).await;
        drop(store.lock(&done).await);
        assert_eq!(store.lock_count(), 2);

        store.release(&held);
        store.release(&done);
        assert_eq!(store.lock_count(), 1);
        assert!(store.try_lock(&held).is_none());

        drop(guard);
        store.release(&held);
        assert_eq!(store.lock_count(), 0);
    }

    #[tokio::test]
    async fn test_completed_phases() {
        let temp_dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(temp_dir.path());
        let sub = id("sub-6");
        store
            .write_once(&sub, Phase::Analysis, Phase::Analysis.artifact_name(), &json!({}))
            .await
            .unwrap();
        assert_eq!(store.completed_phases(&sub).await, vec![Phase::Analysis]);
    }
}
