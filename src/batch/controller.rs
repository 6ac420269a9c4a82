//! Batch job controller
//!
//! Drives one job through submit and poll with exponential backoff on
//! transient failures and a hard wall-clock deadline.
//!
//! ## Retry accounting
//!
//! - Consecutive transient failures share one backoff schedule:
//!   `backoff_ms * multiplier^n` for the n-th consecutive failure (n from 0)
//! - A successful submit or poll resets the schedule
//! - `max_attempts` consecutive failures end the job as Failed
//! - Permanent errors (auth, bad request, explicit job failure) fail at once
//! - The deadline wraps the whole loop; reaching it drops the in-flight poll
//!   and the job ends as TimedOut

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout, timeout_at};
use tracing::{debug, info, instrument, warn};

use super::{
    AnalysisRequest, JobRecord, JobState, PollStatus, ResponseCache, SharedService,
};
use crate::config::BatchPhaseConfig;
use crate::types::{ErrorClassifier, ServiceError};

pub struct BatchJobController {
    service: SharedService,
    settings: BatchPhaseConfig,
    cache: Arc<ResponseCache>,
}

impl BatchJobController {
    pub fn new(service: SharedService, settings: &BatchPhaseConfig) -> Self {
        Self {
            service,
            settings: settings.clone(),
            cache: Arc::new(ResponseCache::new(&settings.cache)),
        }
    }

    pub fn service_name(&self) -> &str {
        self.service.name()
    }

    fn backoff(&self) -> ExponentialBackoff {
        let retry = &self.settings.retry;
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(retry.backoff_ms))
            .with_max_delay(Duration::from_millis(retry.max_backoff_ms))
            .with_factor(retry.backoff_multiplier)
            .with_max_times(retry.max_attempts as usize)
            .build()
    }

    fn max_wait(&self) -> Duration {
        Duration::from_secs(self.settings.batch.max_wait_minutes.saturating_mul(60))
    }

    /// Run one job to a terminal state
    #[instrument(skip(self, request), fields(key = %request.key, phase = %request.phase.dir_name()))]
    pub async fn run(&self, request: AnalysisRequest) -> JobRecord {
        let started = Instant::now();
        let mut record = JobRecord::new(&request);

        if let Some(output) = self.cache.get(&request.key) {
            debug!("Serving cached response");
            record.state = JobState::Completed;
            record.output = Some(output);
            record.cached = true;
            return record;
        }

        let outcome = match started.checked_add(self.max_wait()) {
            Some(deadline) => timeout_at(deadline, self.drive(&request, &mut record)).await,
            None => timeout(self.max_wait(), self.drive(&request, &mut record)).await,
        };
        record.elapsed = started.elapsed();

        match outcome {
            Ok(Ok(output)) => {
                self.cache.insert(&request.key, output.clone());
                record.state = JobState::Completed;
                record.output = Some(output);
                info!(
                    job_id = record.job_id.as_deref().unwrap_or("-"),
                    polls = record.polls,
                    attempts = record.attempts,
                    elapsed_ms = record.elapsed.as_millis() as u64,
                    "Batch job completed"
                );
            }
            Ok(Err(error)) => {
                warn!(
                    job_id = record.job_id.as_deref().unwrap_or("-"),
                    attempts = record.attempts,
                    error = %error,
                    "Batch job failed"
                );
                record.state = JobState::Failed;
                record.last_error = Some(error);
            }
            Err(_) => {
                warn!(
                    job_id = record.job_id.as_deref().unwrap_or("-"),
                    polls = record.polls,
                    elapsed_ms = record.elapsed.as_millis() as u64,
                    max_wait_minutes = self.settings.batch.max_wait_minutes,
                    "Batch job timed out"
                );
                record.state = JobState::TimedOut;
            }
        }

        record
    }

    /// Run many jobs with at most `concurrency_limit` in flight.
    /// Records come back in completion order.
    pub async fn run_all(&self, requests: Vec<AnalysisRequest>) -> Vec<JobRecord> {
        let limit = self.settings.concurrency_limit.max(1);
        debug!(jobs = requests.len(), limit, "Running batch jobs");

        stream::iter(requests)
            .map(|request| self.run(request))
            .buffer_unordered(limit)
            .collect()
            .await
    }

    async fn drive(
        &self,
        request: &AnalysisRequest,
        record: &mut JobRecord,
    ) -> Result<Value, ServiceError> {
        let generation = Duration::from_secs(self.settings.timeouts.generation_secs);
        let interval = Duration::from_millis(self.settings.batch.polling_interval_ms);
        let mut backoff = self.backoff();
        let mut failures = 0u32;

        let job_id = loop {
            let submitted = timeout(generation, self.service.submit(request))
                .await
                .unwrap_or_else(|_| Err(ServiceError::network("submit request timed out")));
            match submitted {
                Ok(job_id) => break job_id,
                Err(error) => {
                    let delay = self.next_delay(error, &mut failures, &mut backoff, record)?;
                    sleep(delay).await;
                }
            }
        };

        info!(job_id = %job_id, service = self.service.name(), "Batch job submitted");
        record.job_id = Some(job_id.clone());
        record.state = JobState::Polling;
        backoff = self.backoff();
        failures = 0;

        let mut wait = interval;
        loop {
            sleep(wait).await;
            record.polls += 1;

            let polled = timeout(generation, self.service.poll(&job_id))
                .await
                .unwrap_or_else(|_| Err(ServiceError::network("poll request timed out")));

            match polled {
                Ok(PollStatus::Processing) => {
                    debug!(job_id = %job_id, poll = record.polls, "Still processing");
                    if failures > 0 {
                        backoff = self.backoff();
                        failures = 0;
                    }
                    wait = interval;
                }
                Ok(PollStatus::Completed(output)) => return Ok(output),
                Ok(PollStatus::Failed(message)) => {
                    record.attempts += 1;
                    return Err(ErrorClassifier::classify(&message));
                }
                Err(error) => {
                    wait = self.next_delay(error, &mut failures, &mut backoff, record)?;
                }
            }
        }
    }

    /// Account a failed try. Returns the delay before the next try, or the
    /// error when the job must fail.
    fn next_delay(
        &self,
        error: ServiceError,
        failures: &mut u32,
        backoff: &mut ExponentialBackoff,
        record: &mut JobRecord,
    ) -> Result<Duration, ServiceError> {
        record.attempts += 1;
        *failures += 1;

        if !error.is_retryable() {
            return Err(error);
        }
        if *failures >= self.settings.retry.max_attempts {
            return Err(error);
        }

        let scheduled = backoff
            .next()
            .unwrap_or(Duration::from_millis(self.settings.retry.max_backoff_ms));
        let delay = error.retry_after.map_or(scheduled, |hint| hint.max(scheduled));

        debug!(
            attempt = *failures,
            max_attempts = self.settings.retry.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying after transient failure"
        );

        record.total_backoff += delay;
        record.last_error = Some(error);
        Ok(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::AnalysisService;
    use crate::types::{ErrorCategory, Phase};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Replays a fixed script of poll responses; `Processing` forever once
    /// the script runs out when `endless` is set.
    struct ScriptedService {
        polls: Mutex<VecDeque<Result<PollStatus, ServiceError>>>,
        submit_failures: AtomicU32,
        endless: bool,
    }

    impl ScriptedService {
        fn new(polls: Vec<Result<PollStatus, ServiceError>>) -> Self {
            Self {
                polls: Mutex::new(polls.into()),
                submit_failures: AtomicU32::new(0),
                endless: false,
            }
        }

        fn endless() -> Self {
            Self {
                endless: true,
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait]
    impl AnalysisService for ScriptedService {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn submit(&self, request: &AnalysisRequest) -> Result<String, ServiceError> {
            if self.submit_failures.load(Ordering::SeqCst) > 0 {
                self.submit_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(ServiceError::new(ErrorCategory::RateLimit, "429"));
            }
            Ok(format!("job-{}", request.key))
        }

        async fn poll(&self, _job_id: &str) -> Result<PollStatus, ServiceError> {
            let next = self.polls.lock().unwrap().pop_front();
            match next {
                Some(response) => response,
                None if self.endless => Ok(PollStatus::Processing),
                None => Ok(PollStatus::Failed("script exhausted".to_string())),
            }
        }
    }

    fn settings(max_attempts: u32) -> BatchPhaseConfig {
        let mut settings = BatchPhaseConfig::default();
        settings.retry.max_attempts = max_attempts;
        settings.retry.backoff_ms = 1_000;
        settings.retry.backoff_multiplier = 2.0;
        settings.batch.polling_interval_ms = 5_000;
        settings.batch.max_wait_minutes = 1;
        settings.cache.enabled = false;
        settings
    }

    fn request(key: &str) -> AnalysisRequest {
        AnalysisRequest {
            key: key.to_string(),
            phase: Phase::CategorySynthesis,
            model: "test-model".to_string(),
            max_tokens: 1024,
            payload: json!({}),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_transient_failures_then_success() {
        let service = Arc::new(ScriptedService::new(vec![
            Err(ServiceError::transient("overloaded")),
            Err(ServiceError::network("connection reset")),
            Ok(PollStatus::Completed(json!({"code": "STR"}))),
        ]));
        let controller = BatchJobController::new(service, &settings(3));

        let record = controller.run(request("sub-1/phase1_5/STR")).await;

        assert_eq!(record.state, JobState::Completed);
        assert_eq!(record.total_backoff, Duration::from_millis(1_000 + 2_000));
        assert_eq!(record.attempts, 2);
        assert_eq!(record.polls, 3);
        assert_eq!(record.output, Some(json!({"code": "STR"})));
        assert!(record.elapsed >= record.total_backoff);
    }

    #[tokio::test(start_paused = true)]
    async fn test_endless_processing_times_out() {
        let controller = BatchJobController::new(Arc::new(ScriptedService::endless()), &settings(3));

        let record = controller.run(request("sub-1/phase2")).await;

        assert_eq!(record.state, JobState::TimedOut);
        assert!(record.output.is_none());
        assert!(record.elapsed >= Duration::from_secs(60));
        assert!(record.polls >= 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_exhausted_fails_with_last_error() {
        let service = Arc::new(ScriptedService::new(vec![
            Err(ServiceError::transient("first")),
            Err(ServiceError::transient("second")),
            Err(ServiceError::transient("third")),
            Ok(PollStatus::Completed(json!({}))),
        ]));
        let controller = BatchJobController::new(service, &settings(3));

        let record = controller.run(request("sub-1/phase3")).await;

        assert_eq!(record.state, JobState::Failed);
        assert_eq!(record.attempts, 3);
        assert_eq!(record.last_error.unwrap().message, "third");
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_fails_immediately() {
        let service = Arc::new(ScriptedService::new(vec![Err(ServiceError::new(
            ErrorCategory::Auth,
            "invalid api key",
        ))]));
        let controller = BatchJobController::new(service, &settings(5));

        let record = controller.run(request("sub-1/phase1")).await;

        assert_eq!(record.state, JobState::Failed);
        assert_eq!(record.attempts, 1);
        assert_eq!(record.total_backoff, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_backoff_schedule() {
        let service = Arc::new(ScriptedService::new(vec![
            Err(ServiceError::transient("a")),
            Err(ServiceError::transient("b")),
            Ok(PollStatus::Processing),
            Err(ServiceError::transient("c")),
            Err(ServiceError::transient("d")),
            Ok(PollStatus::Completed(json!(1))),
        ]));
        let controller = BatchJobController::new(service, &settings(3));

        let record = controller.run(request("sub-1/phase1")).await;

        assert_eq!(record.state, JobState::Completed);
        assert_eq!(record.total_backoff, Duration::from_millis(2 * (1_000 + 2_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_failures_are_retried() {
        let service = ScriptedService::new(vec![Ok(PollStatus::Completed(json!(true)))]);
        service.submit_failures.store(2, Ordering::SeqCst);
        let controller = BatchJobController::new(Arc::new(service), &settings(3));

        let record = controller.run(request("sub-1/phase1")).await;

        assert_eq!(record.state, JobState::Completed);
        assert_eq!(record.job_id.as_deref(), Some("job-sub-1/phase1"));
        assert_eq!(record.total_backoff, Duration::from_millis(3_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_job_failure_is_not_retried() {
        let service = Arc::new(ScriptedService::new(vec![Ok(PollStatus::Failed(
            "invalid request: prompt too long".to_string(),
        ))]));
        let controller = BatchJobController::new(service, &settings(3));

        let record = controller.run(request("sub-1/phase1")).await;

        assert_eq!(record.state, JobState::Failed);
        assert_eq!(record.polls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_all_bounded_concurrency() {
        let service = Arc::new(ScriptedService::endless());
        let mut config = settings(3);
        config.concurrency_limit = 2;
        config.batch.max_wait_minutes = 1;
        let controller = BatchJobController::new(service, &config);

        let requests = (0..4).map(|i| request(&format!("sub-1/job{}", i))).collect();
        let started = Instant::now();
        let records = controller.run_all(requests).await;

        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.state == JobState::TimedOut));
        // two waves of two one-minute jobs
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(120), "{:?}", elapsed);
        assert!(elapsed < Duration::from_secs(180), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_max_wait_does_not_overflow() {
        let service = Arc::new(ScriptedService::new(vec![
            Ok(PollStatus::Processing),
            Ok(PollStatus::Completed(json!({"ok": true}))),
        ]));
        let mut config = settings(3);
        config.batch.max_wait_minutes = u64::MAX / 60;
        let controller = BatchJobController::new(service, &config);

        let record = controller.run(request("sub-1/phase2")).await;

        assert_eq!(record.state, JobState::Completed);
        assert_eq!(record.polls, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cached_response_skips_service() {
        let service = Arc::new(ScriptedService::new(vec![Ok(PollStatus::Completed(json!(7)))]));
        let mut config = settings(3);
        config.cache.enabled = true;
        let controller = BatchJobController::new(service, &config);

        let first = controller.run(request("sub-1/phase4_5")).await;
        let second = controller.run(request("sub-1/phase4_5")).await;

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(second.output, Some(json!(7)));
        assert_eq!(second.polls, 0);
    }
}
