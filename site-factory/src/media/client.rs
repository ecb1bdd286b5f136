//! Runware job client: submit, poll, fall back.
//!
//! Every request is a JSON array of task descriptors; every response is
//! `{ "data": [...], "errors": [...] }`. Sync tasks resolve in the submit
//! response. Async tasks are acknowledged and must be polled with
//! `getResponse` until they reach `success` or `error`.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::transport::JobTransport;

// ── Task descriptors ───────────────────────────────────────────────

/// How the service delivers the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    Sync,
    Async,
}

/// One unit of remote work, tagged by `taskType` on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "taskType")]
pub enum Task {
    #[serde(rename = "imageInference")]
    ImageInference(ImageInference),
    #[serde(rename = "videoInference")]
    VideoInference(VideoInference),
    #[serde(rename = "getResponse")]
    GetResponse(GetResponse),
}

impl Task {
    pub fn task_uuid(&self) -> Uuid {
        match self {
            Task::ImageInference(t) => t.task_uuid,
            Task::VideoInference(t) => t.task_uuid,
            Task::GetResponse(t) => t.task_uuid,
        }
    }

    pub fn get_response(task_uuid: Uuid) -> Self {
        Task::GetResponse(GetResponse { task_uuid })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageInference {
    #[serde(rename = "taskUUID")]
    pub task_uuid: Uuid,
    pub positive_prompt: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    pub output_type: String,
    pub output_format: String,
    pub number_results: u32,
    pub delivery_method: DeliveryMethod,
    pub include_cost: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInference {
    #[serde(rename = "taskUUID")]
    pub task_uuid: Uuid,
    pub positive_prompt: String,
    pub negative_prompt: String,
    pub model: String,
    pub duration: u32,
    pub width: u32,
    pub height: u32,
    pub output_type: String,
    pub output_format: String,
    pub delivery_method: DeliveryMethod,
    pub seed: u64,
    pub number_results: u32,
    pub provider_settings: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    #[serde(rename = "taskUUID")]
    pub task_uuid: Uuid,
}

// ── Responses ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Vec<TaskResult>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

/// One entry of a response's `data` list.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskResult {
    #[serde(rename = "taskUUID", default)]
    pub task_uuid: Option<Uuid>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "imageURL", default)]
    pub image_url: Option<String>,
    #[serde(rename = "videoURL", default)]
    pub video_url: Option<String>,
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Runware HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Runware task errors: {0}")]
    TaskErrors(String),
    #[error("Runware returned no data: {0}")]
    NoData(String),
    #[error("No acknowledgment for {0}")]
    NoAcknowledgment(Uuid),
    #[error("No response for taskUUID {0}")]
    NoResponse(Uuid),
    #[error("Task {0} failed")]
    TaskFailed(Uuid),
    #[error("Timeout waiting for task {task} after {attempts} polls")]
    Timeout { task: Uuid, attempts: u32 },
    #[error("No {field} returned for model {model}")]
    MissingOutput { model: String, field: &'static str },
    #[error("Media fetch failed: {status}")]
    Fetch { status: u16 },
    #[error("no models to try")]
    NoModels,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ── Poll configuration ─────────────────────────────────────────────

/// Backoff for the poll loop. Delays start at `initial`, grow by
/// `growth` after each non-terminal poll and never exceed `ceiling`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub initial: Duration,
    pub growth: f64,
    pub ceiling: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial: Duration::from_millis(1500),
            growth: 1.5,
            ceiling: Duration::from_millis(8000),
        }
    }
}

impl PollConfig {
    pub fn first_delay(&self) -> Duration {
        self.initial.min(self.ceiling)
    }

    /// Overflowing products (huge or infinite growth) land on the ceiling.
    pub fn next_delay(&self, current: Duration) -> Duration {
        let grown = current.as_secs_f64() * self.growth.max(1.0);
        Duration::try_from_secs_f64(grown)
            .unwrap_or(self.ceiling)
            .min(self.ceiling)
    }

    /// Delays slept between polls when no terminal state ever arrives.
    pub fn schedule(&self) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut delay = self.first_delay();
        for _ in 1..self.max_attempts {
            delays.push(delay);
            delay = self.next_delay(delay);
        }
        delays
    }
}

// ── Client ─────────────────────────────────────────────────────────

pub struct JobClient<T> {
    transport: T,
    poll: PollConfig,
}

impl<T: JobTransport> JobClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            poll: PollConfig::default(),
        }
    }

    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one batch. Rejects bad HTTP status, a non-empty error list,
    /// and an empty result list.
    pub async fn submit(&self, tasks: &[Task]) -> Result<Vec<TaskResult>, JobError> {
        let resp = self.transport.post_tasks(tasks).await?;
        let body = String::from_utf8_lossy(&resp.body);
        if !resp.is_success() {
            return Err(JobError::Http {
                status: resp.status,
                body: body.into_owned(),
            });
        }

        let envelope: Envelope = serde_json::from_slice(&resp.body)?;
        if !envelope.errors.is_empty() {
            let errors = serde_json::to_string_pretty(&envelope.errors)?;
            return Err(JobError::TaskErrors(errors));
        }
        if envelope.data.is_empty() {
            return Err(JobError::NoData(body.into_owned()));
        }
        Ok(envelope.data)
    }

    /// Submit a sync task and return its result.
    pub async fn run_sync(&self, task: Task) -> Result<TaskResult, JobError> {
        let uuid = task.task_uuid();
        let data = self.submit(std::slice::from_ref(&task)).await?;
        let position = data
            .iter()
            .position(|r| r.task_uuid == Some(uuid))
            .unwrap_or(0);
        Ok(data.into_iter().nth(position).unwrap_or_default())
    }

    /// Submit an async task, check the acknowledgment, and poll it.
    pub async fn run_async(&self, task: Task) -> Result<TaskResult, JobError> {
        let uuid = task.task_uuid();
        let data = self.submit(std::slice::from_ref(&task)).await?;
        if !data.iter().any(|r| r.task_uuid == Some(uuid)) {
            return Err(JobError::NoAcknowledgment(uuid));
        }
        self.poll(uuid).await
    }

    /// Poll `task_uuid` until it succeeds, fails, or runs out of attempts.
    pub async fn poll(&self, task_uuid: Uuid) -> Result<TaskResult, JobError> {
        let mut delay = self.poll.first_delay();
        for attempt in 1..=self.poll.max_attempts {
            let data = self.submit(&[Task::get_response(task_uuid)]).await?;
            let candidate = data
                .into_iter()
                .find(|r| r.task_uuid == Some(task_uuid))
                .ok_or(JobError::NoResponse(task_uuid))?;

            match candidate.status.as_deref() {
                Some("success") => return Ok(candidate),
                Some("error") => return Err(JobError::TaskFailed(task_uuid)),
                status => {
                    tracing::debug!(task = %task_uuid, attempt, ?status, ?delay, "task still running");
                }
            }

            if attempt < self.poll.max_attempts {
                tokio::time::sleep(delay).await;
                delay = self.poll.next_delay(delay);
            }
        }
        Err(JobError::Timeout {
            task: task_uuid,
            attempts: self.poll.max_attempts,
        })
    }

    /// Download a result URL.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, JobError> {
        let resp = self.transport.fetch(url).await?;
        if !resp.is_success() {
            return Err(JobError::Fetch {
                status: resp.status,
            });
        }
        Ok(resp.body)
    }
}

/// Try `attempt` for each model in order, one at a time, returning the
/// first success. Failures are logged and the next model is tried; when
/// every model fails the last error is returned.
pub async fn with_fallback<R, F, Fut>(models: &[String], mut attempt: F) -> Result<(String, R), JobError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<R, JobError>>,
{
    let mut last_error = None;
    for model in models {
        match attempt(model.clone()).await {
            Ok(result) => return Ok((model.clone(), result)),
            Err(e) => {
                tracing::warn!(model = %model, error = %e, "model failed, trying fallback");
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or(JobError::NoModels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_schedule_is_monotonic_and_capped() {
        let config = PollConfig::default();
        let delays = config.schedule();
        assert_eq!(delays.len(), 29);
        assert_eq!(delays[0], Duration::from_millis(1500));
        assert_eq!(delays[1], Duration::from_millis(2250));
        for pair in delays.windows(2) {
            assert!(pair[0] <= pair[1]);
        }
        assert!(delays.iter().all(|d| *d <= config.ceiling));
        assert_eq!(*delays.last().unwrap(), Duration::from_millis(8000));
    }

    #[test]
    fn shrinking_growth_is_clamped() {
        let config = PollConfig {
            growth: 0.5,
            ..PollConfig::default()
        };
        let delays = config.schedule();
        assert!(delays.iter().all(|d| *d == Duration::from_millis(1500)));
    }

    #[test]
    fn unbounded_growth_stops_at_ceiling() {
        for growth in [f64::INFINITY, 1e30, f64::NAN] {
            let config = PollConfig {
                growth,
                max_attempts: 4,
                ..PollConfig::default()
            };
            let delays = config.schedule();
            assert_eq!(delays.len(), 3);
            assert_eq!(delays[0], Duration::from_millis(1500));
            let expected = if growth.is_nan() {
                Duration::from_millis(1500)
            } else {
                config.ceiling
            };
            assert!(delays[1..].iter().all(|d| *d == expected), "{growth}: {delays:?}");
        }
    }

    #[test]
    fn initial_above_ceiling_is_capped() {
        let config = PollConfig {
            initial: Duration::from_secs(20),
            ..PollConfig::default()
        };
        assert_eq!(config.first_delay(), config.ceiling);
    }

    #[test]
    fn tasks_serialize_with_wire_names() {
        let uuid = Uuid::new_v4();
        let task = Task::VideoInference(VideoInference {
            task_uuid: uuid,
            positive_prompt: "p".into(),
            negative_prompt: "n".into(),
            model: "m".into(),
            duration: 6,
            width: 864,
            height: 486,
            output_type: "URL".into(),
            output_format: "MP4".into(),
            delivery_method: DeliveryMethod::Async,
            seed: 42,
            number_results: 1,
            provider_settings: json!({ "bytedance": { "cameraFixed": false } }),
        });
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["taskType"], "videoInference");
        assert_eq!(value["taskUUID"], uuid.to_string());
        assert_eq!(value["positivePrompt"], "p");
        assert_eq!(value["deliveryMethod"], "async");
        assert_eq!(value["providerSettings"]["bytedance"]["cameraFixed"], false);

        let poll = serde_json::to_value(Task::get_response(uuid)).unwrap();
        assert_eq!(poll, json!({ "taskType": "getResponse", "taskUUID": uuid.to_string() }));
    }

    #[test]
    fn task_result_reads_url_fields() {
        let result: TaskResult = serde_json::from_value(json!({
            "taskType": "videoInference",
            "taskUUID": "1b4e28ba-2fa1-41d2-883f-0016d3cca427",
            "status": "success",
            "videoURL": "https://cdn/x.mp4",
            "cost": 0.1
        }))
        .unwrap();
        assert_eq!(result.status.as_deref(), Some("success"));
        assert_eq!(result.video_url.as_deref(), Some("https://cdn/x.mp4"));
        assert_eq!(result.image_url, None);
    }
}
