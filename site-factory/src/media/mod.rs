//! Runware media generation.
//!
//! - `client`: batched task submission, polling with backoff, model fallback
//! - `transport`: the HTTP boundary, behind a trait so tests can script it
//! - `generate`: the hero images / hero video flows used by the media skill

pub mod client;
pub mod generate;
pub mod transport;

pub use client::{JobClient, JobError, PollConfig, Task, TaskResult};
pub use generate::{MediaGenerator, MediaMode, MediaReport, MediaSettings};
pub use transport::{HttpTransport, JobTransport, RawResponse};

/// Default Runware endpoint.
pub const DEFAULT_API_URL: &str = "https://api.runware.ai/v1";
/// Default model for hero images.
pub const DEFAULT_IMAGE_MODEL: &str = "bytedance:seedream@4.5";
/// Default primary model for the hero video.
pub const DEFAULT_VIDEO_MODEL: &str = "bytedance:seedance@2";
/// Video model tried after the primary one fails.
pub const FALLBACK_VIDEO_MODEL: &str = "bytedance:1@1";

/// Show only the first eight characters of an API key.
pub fn mask_key(key: &str) -> String {
    let head: String = key.chars().take(8).collect();
    format!("{head}••••")
}
