//! HTTP boundary of the job client.

use async_trait::async_trait;

use super::client::{JobError, Task};

/// Status code and body of one HTTP exchange, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves task batches and media bytes over the wire.
#[async_trait]
pub trait JobTransport: Send + Sync {
    /// POST a batch of tasks as one JSON array.
    async fn post_tasks(&self, tasks: &[Task]) -> Result<RawResponse, JobError>;

    /// GET a generated media file.
    async fn fetch(&self, url: &str) -> Result<RawResponse, JobError>;
}

/// Runware over HTTPS with bearer auth.
pub struct HttpTransport {
    api_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl JobTransport for HttpTransport {
    async fn post_tasks(&self, tasks: &[Task]) -> Result<RawResponse, JobError> {
        let resp = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(tasks)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        Ok(RawResponse { status, body })
    }

    async fn fetch(&self, url: &str) -> Result<RawResponse, JobError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        Ok(RawResponse { status, body })
    }
}
