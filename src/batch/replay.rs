//! Replay analysis service
//!
//! Serves recorded phase outputs instead of calling a live model. Responses
//! are keyed by the request key without its submission prefix, so
//! `sub-1/phase1_5/STR` is answered by the `phase1_5/STR` recording.
//!
//! Directory layout:
//! ```text
//! responses/
//!   phase1.json
//!   phase1_5/STR.json ... phase1_5/CMP.json
//!   phase2.json
//!   phase3.json
//!   phase4_5.json
//! ```

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use super::{AnalysisRequest, AnalysisService, PollStatus};
use crate::types::{ErrorCategory, Result, ServiceError};

#[derive(Debug, Default)]
pub struct ReplayService {
    responses: DashMap<String, Value>,
    jobs: DashMap<String, String>,
}

impl ReplayService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, key: impl Into<String>, output: Value) -> Self {
        self.responses.insert(key.into(), output);
        self
    }

    pub fn insert(&self, key: impl Into<String>, output: Value) {
        self.responses.insert(key.into(), output);
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Load every `*.json` file under `dir` (one level of subdirectories)
    pub async fn from_dir(dir: &Path) -> Result<Self> {
        let service = Self::new();
        let mut pending = vec![(dir.to_path_buf(), String::new())];

        while let Some((current, prefix)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let key = if prefix.is_empty() {
                    stem.to_string()
                } else {
                    format!("{}/{}", prefix, stem)
                };

                if entry.file_type().await?.is_dir() {
                    if prefix.is_empty() {
                        pending.push((path.clone(), key));
                    }
                    continue;
                }
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }

                let content = tokio::fs::read_to_string(&path).await?;
                let value: Value = serde_json::from_str(&content)?;
                debug!(key = %key, path = %path.display(), "Loaded replay response");
                service.insert(key, value);
            }
        }

        Ok(service)
    }

    fn lookup_key(request_key: &str) -> &str {
        request_key
            .split_once('/')
            .map_or(request_key, |(_, rest)| rest)
    }
}

#[async_trait]
impl AnalysisService for ReplayService {
    fn name(&self) -> &str {
        "replay"
    }

    async fn submit(&self, request: &AnalysisRequest) -> std::result::Result<String, ServiceError> {
        let key = Self::lookup_key(&request.key);
        if !self.responses.contains_key(key) {
            return Err(ServiceError::new(
                ErrorCategory::BadRequest,
                format!("no recorded response for '{}'", key),
            ));
        }
        let job_id = format!("replay-{}", Uuid::new_v4());
        self.jobs.insert(job_id.clone(), key.to_string());
        Ok(job_id)
    }

    async fn poll(&self, job_id: &str) -> std::result::Result<PollStatus, ServiceError> {
        let key = self.jobs.get(job_id).map(|k| k.value().clone()).ok_or_else(|| {
            ServiceError::new(ErrorCategory::Unavailable, format!("unknown job {}", job_id))
        })?;
        self.responses
            .get(&key)
            .map(|output| PollStatus::Completed(output.value().clone()))
            .ok_or_else(|| {
                ServiceError::new(ErrorCategory::Unavailable, format!("response for '{}' vanished", key))
            })
    }
}
