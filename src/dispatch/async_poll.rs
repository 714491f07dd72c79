use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::config::PollConfig;
use crate::dispatch::{JobStatus, VideoAdapter};
use crate::error::GenerationError;
use crate::request::{Credential, ProviderId};
use crate::response::{MediaResult, MimeClass, ResultWarning};

/// Max consecutive failed status checks before giving up.
pub const MAX_POLL_FAILURES: u32 = 5;

/// Atomic counter for unique materialized filenames.
static PERSIST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Anything that can report the status of a provider job.
#[async_trait]
pub trait JobStatusSource: Send + Sync {
    async fn check_status(&self, job_id: &str) -> Result<JobStatus, GenerationError>;
}

/// Binds a video adapter to the credential of the request that owns the job.
pub struct AdapterStatusSource<'a> {
    pub adapter: &'a dyn VideoAdapter,
    pub credential: &'a Credential,
}

#[async_trait]
impl JobStatusSource for AdapterStatusSource<'_> {
    async fn check_status(&self, job_id: &str) -> Result<JobStatus, GenerationError> {
        self.adapter.check_status(job_id, self.credential).await
    }
}

/// Poller-side lifecycle of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobPhase {
    Submitted,
    Polling,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::TimedOut | Self::Cancelled
        )
    }

    fn can_transition_to(&self, next: JobPhase) -> bool {
        match self {
            Self::Submitted => next == Self::Polling,
            Self::Polling => next != Self::Submitted,
            _ => false,
        }
    }
}

/// One provider job, owned by exactly one request.
#[derive(Debug)]
pub struct AsyncJob {
    id: String,
    provider: ProviderId,
    status: JobStatus,
    phase: JobPhase,
    result: Option<MediaResult>,
    attempts_made: u32,
    created_at: SystemTime,
}

impl AsyncJob {
    pub fn submitted(provider: ProviderId, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            provider,
            status: JobStatus::Pending,
            phase: JobPhase::Submitted,
            result: None,
            attempts_made: 0,
            created_at: SystemTime::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    /// Last status reported by the provider.
    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn phase(&self) -> JobPhase {
        self.phase
    }

    pub fn result(&self) -> Option<&MediaResult> {
        self.result.as_ref()
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    fn transition(&mut self, next: JobPhase) {
        if !self.phase.can_transition_to(next) {
            tracing::error!(
                job_id = self.id,
                from = ?self.phase,
                to = ?next,
                "rejected illegal job transition"
            );
            return;
        }
        tracing::debug!(job_id = self.id, from = ?self.phase, to = ?next, "job transition");
        self.phase = next;
    }

    fn fail(&mut self, err: GenerationError) -> GenerationError {
        self.transition(JobPhase::Failed);
        err
    }
}

/// Errors a status check may hit without killing the job.
fn is_transient(err: &GenerationError) -> bool {
    match err {
        GenerationError::RateLimited { .. } | GenerationError::Transport { .. } => true,
        GenerationError::Upstream { status, .. } => status.is_none_or(|s| s >= 500),
        _ => false,
    }
}

/// Drives async jobs to a terminal state and optionally downloads the result.
pub struct JobPoller {
    config: PollConfig,
    client: Client,
    materialize_dir: PathBuf,
}

impl JobPoller {
    pub fn new(config: PollConfig, client: Client, materialize_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            client,
            materialize_dir: materialize_dir.into(),
        }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll `job` until it succeeds, fails, times out or is cancelled.
    ///
    /// One status check per interval, never more than `max_attempts` of them.
    /// Only a freshly submitted job can be driven.
    pub async fn drive(
        &self,
        job: &mut AsyncJob,
        source: &dyn JobStatusSource,
        mime_class: MimeClass,
        cancel: Option<&CancellationToken>,
    ) -> Result<MediaResult, GenerationError> {
        let start = Instant::now();
        let provider = job.provider;
        let interval = self.config.interval();
        let mut consecutive_failures: u32 = 0;

        // One poll loop per job: a job already polled, or finished, is not driven again.
        if job.phase != JobPhase::Submitted {
            tracing::error!(job_id = job.id, phase = ?job.phase, "refusing to drive job twice");
            return Err(GenerationError::InvalidRequest(format!(
                "job {} is already {:?}",
                job.id, job.phase
            )));
        }
        job.transition(JobPhase::Polling);

        loop {
            if job.attempts_made >= self.config.max_attempts {
                tracing::warn!(
                    provider = %provider,
                    job_id = job.id,
                    attempts = job.attempts_made,
                    "job timed out"
                );
                job.transition(JobPhase::TimedOut);
                return Err(GenerationError::TimedOut {
                    provider,
                    job_id: job.id.clone(),
                    attempts: job.attempts_made,
                });
            }

            match cancel {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => {}
                        _ = tokio::time::sleep(interval) => {}
                    }
                }
                None => tokio::time::sleep(interval).await,
            }

            // Checked after the wait so a cancellation during the sleep never
            // reaches the network.
            if cancel.is_some_and(|t| t.is_cancelled()) {
                tracing::info!(provider = %provider, job_id = job.id, "job polling cancelled");
                job.transition(JobPhase::Cancelled);
                return Err(GenerationError::Cancelled {
                    provider,
                    job_id: job.id.clone(),
                    attempts: job.attempts_made,
                });
            }

            job.attempts_made += 1;
            let attempt = job.attempts_made;

            let status = match source.check_status(&job.id).await {
                Ok(status) => {
                    consecutive_failures = 0;
                    status
                }
                Err(e) if is_transient(&e) => {
                    consecutive_failures += 1;
                    tracing::warn!(
                        provider = %provider,
                        job_id = job.id,
                        attempt = attempt,
                        failures = consecutive_failures,
                        "status check failed: {e}"
                    );
                    if consecutive_failures >= MAX_POLL_FAILURES {
                        let err = GenerationError::PollFailed {
                            provider,
                            job_id: job.id.clone(),
                            message: format!("{consecutive_failures} consecutive failures: {e}"),
                        };
                        return Err(job.fail(err));
                    }
                    continue;
                }
                Err(e) => return Err(job.fail(e)),
            };

            job.status = status.clone();

            match status {
                JobStatus::Pending | JobStatus::Running => {
                    tracing::debug!(
                        provider = %provider,
                        job_id = job.id,
                        attempt = attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "job still in progress"
                    );
                }
                JobStatus::Succeeded(Some(url)) if !url.trim().is_empty() => {
                    tracing::info!(
                        provider = %provider,
                        job_id = job.id,
                        attempts = attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "job succeeded"
                    );
                    let media = MediaResult::remote(url, mime_class);
                    job.result = Some(media.clone());
                    job.transition(JobPhase::Succeeded);
                    return Ok(media);
                }
                JobStatus::Succeeded(_) => {
                    tracing::warn!(
                        provider = %provider,
                        job_id = job.id,
                        "job reported success without a media reference"
                    );
                    let err = GenerationError::InconsistentSuccess {
                        provider,
                        job_id: job.id.clone(),
                    };
                    return Err(job.fail(err));
                }
                JobStatus::Failed(detail) => {
                    tracing::warn!(provider = %provider, job_id = job.id, "job failed: {detail}");
                    let err = GenerationError::JobFailed {
                        provider,
                        job_id: job.id.clone(),
                        detail,
                    };
                    return Err(job.fail(err));
                }
            }
        }
    }

    /// Download `media` to disk and point the result at the local copy.
    ///
    /// Failure is not fatal: the remote reference comes back with a
    /// `MaterializationFailed` warning.
    pub async fn materialize(
        &self,
        media: MediaResult,
        label: &str,
        headers: &[(String, String)],
    ) -> MediaResult {
        match self
            .download(&media.url, label, media.mime_class, headers)
            .await
        {
            Ok(path) => {
                let absolute = std::path::absolute(&path).unwrap_or_else(|_| path.clone());
                MediaResult {
                    url: format!("file://{}", absolute.display()),
                    local_path: Some(path),
                    ..media
                }
            }
            Err(e) => {
                tracing::warn!(job_id = label, "materialization failed, returning remote url: {e}");
                media.with_warning(ResultWarning::MaterializationFailed {
                    message: e.to_string(),
                })
            }
        }
    }

    async fn download(
        &self,
        url: &str,
        label: &str,
        mime_class: MimeClass,
        headers: &[(String, String)],
    ) -> Result<PathBuf, GenerationError> {
        let materialize_err = |message: String| GenerationError::MaterializationFailed { message };

        let mut req = self.client.get(url);
        for (k, v) in headers {
            req = req.header(k, v);
        }
        let response = req
            .send()
            .await
            .map_err(|e| materialize_err(format!("download request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(materialize_err(format!(
                "download returned HTTP {}",
                response.status()
            )));
        }

        tokio::fs::create_dir_all(&self.materialize_dir)
            .await
            .map_err(|e| materialize_err(format!("create dir: {e}")))?;

        let path = self.materialize_dir.join(media_filename(label, mime_class));
        let tmp_path = path.with_extension("tmp");

        let written = write_body(&tmp_path, response).await;
        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(materialize_err(e));
        }

        // Atomic write: temp file + rename prevents partial reads
        if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(materialize_err(format!("rename: {e}")));
        }
        Ok(path)
    }
}

async fn write_body(path: &Path, response: reqwest::Response) -> Result<(), String> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| format!("create file: {e}"))?;
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| format!("download interrupted: {e}"))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| format!("write: {e}"))?;
    }
    file.flush().await.map_err(|e| format!("flush: {e}"))?;
    Ok(())
}

/// Sanitize a job id for use in filenames. Only allows alphanumeric, `-`, `_`.
pub fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn media_filename(label: &str, mime_class: MimeClass) -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let seq = PERSIST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!(
        "{ts}_{seq}_{}.{}",
        sanitize_label(label),
        mime_class.extension()
    )
}
