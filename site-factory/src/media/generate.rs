//! Hero media for a generated site: two still images and one short video.

use std::path::PathBuf;

use serde_json::json;
use uuid::Uuid;

use super::client::{
    DeliveryMethod, ImageInference, JobClient, JobError, Task, VideoInference, with_fallback,
};
use super::transport::JobTransport;
use super::{DEFAULT_IMAGE_MODEL, DEFAULT_VIDEO_MODEL, FALLBACK_VIDEO_MODEL};

/// Which media to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum MediaMode {
    Images,
    Video,
    All,
}

impl std::fmt::Display for MediaMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaMode::Images => write!(f, "images"),
            MediaMode::Video => write!(f, "video"),
            MediaMode::All => write!(f, "all"),
        }
    }
}

/// Models and prompts for a media run.
#[derive(Debug, Clone)]
pub struct MediaSettings {
    pub image_model: String,
    /// Tried in order until one succeeds.
    pub video_models: Vec<String>,
    pub video_seed: u64,
    pub image_prompts: Vec<String>,
    pub video_prompt: String,
    pub negative_prompt: String,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            video_models: video_models(DEFAULT_VIDEO_MODEL),
            video_seed: 42,
            image_prompts: vec![
                "A modern co-working environment with people designing intelligent workflows, premium office textures, cinematic natural light, editorial still.".to_string(),
                "A founder and operations director planning AI workflows on a whiteboard, high attention to process detail, premium editorial look.".to_string(),
            ],
            video_prompt: "Editorial cinematic sequence for a premium technology consulting agency, calm office scenes, collaborative strategizing, subtle movement, warm natural light, premium brand tone".to_string(),
            negative_prompt: "no logos, no text overlays, no futuristic robot themes, no exaggerated glow, no gradients, no vaporwave, no abstract glitch art".to_string(),
        }
    }
}

/// Primary video model followed by the fixed fallback.
pub fn video_models(primary: &str) -> Vec<String> {
    let mut models = vec![primary.to_string()];
    if primary != FALLBACK_VIDEO_MODEL {
        models.push(FALLBACK_VIDEO_MODEL.to_string());
    }
    models
}

/// Public paths of everything written during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaReport {
    pub images: Vec<String>,
    pub video: Option<String>,
}

pub struct MediaGenerator<T> {
    client: JobClient<T>,
    settings: MediaSettings,
    out_dir: PathBuf,
}

impl<T: JobTransport> MediaGenerator<T> {
    pub fn new(client: JobClient<T>, settings: MediaSettings, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            settings,
            out_dir: out_dir.into(),
        }
    }

    pub fn client(&self) -> &JobClient<T> {
        &self.client
    }

    pub async fn run(&self, mode: MediaMode) -> Result<MediaReport, JobError> {
        let mut report = MediaReport::default();
        if matches!(mode, MediaMode::Images | MediaMode::All) {
            report.images = self.generate_images().await?;
        }
        if matches!(mode, MediaMode::Video | MediaMode::All) {
            report.video = Some(self.generate_video().await?);
        }
        Ok(report)
    }

    /// One sync image task per prompt, saved as `hero-bg-<n>.webp`.
    pub async fn generate_images(&self) -> Result<Vec<String>, JobError> {
        let mut paths = Vec::with_capacity(self.settings.image_prompts.len());
        for (index, prompt) in self.settings.image_prompts.iter().enumerate() {
            let task = Task::ImageInference(ImageInference {
                task_uuid: Uuid::new_v4(),
                positive_prompt: prompt.clone(),
                model: self.settings.image_model.clone(),
                width: 2048,
                height: 2048,
                output_type: "URL".to_string(),
                output_format: "WEBP".to_string(),
                number_results: 1,
                delivery_method: DeliveryMethod::Sync,
                include_cost: false,
            });

            let result = self.client.run_sync(task).await?;
            let url = result.image_url.ok_or_else(|| JobError::MissingOutput {
                model: self.settings.image_model.clone(),
                field: "imageURL",
            })?;
            let public = self.save_media(&url, &format!("hero-bg-{}.webp", index + 1)).await?;
            tracing::info!(path = %public, "image generated");
            paths.push(public);
        }
        Ok(paths)
    }

    /// Async video task, trying each configured model in turn.
    pub async fn generate_video(&self) -> Result<String, JobError> {
        let (model, public) =
            with_fallback(&self.settings.video_models, |model| self.video_attempt(model)).await?;
        tracing::info!(model = %model, path = %public, "video generated");
        Ok(public)
    }

    async fn video_attempt(&self, model: String) -> Result<String, JobError> {
        let task = Task::VideoInference(VideoInference {
            task_uuid: Uuid::new_v4(),
            positive_prompt: self.settings.video_prompt.clone(),
            negative_prompt: self.settings.negative_prompt.clone(),
            model: model.clone(),
            duration: 6,
            width: 864,
            height: 486,
            output_type: "URL".to_string(),
            output_format: "MP4".to_string(),
            delivery_method: DeliveryMethod::Async,
            seed: self.settings.video_seed,
            number_results: 1,
            provider_settings: json!({ "bytedance": { "cameraFixed": false } }),
        });

        let result = self.client.run_async(task).await?;
        let url = result.video_url.ok_or(JobError::MissingOutput {
            model,
            field: "videoURL",
        })?;
        self.save_media(&url, "hero-video.mp4").await
    }

    /// Download `url` into the output directory and return `/media/<filename>`.
    async fn save_media(&self, url: &str, filename: &str) -> Result<String, JobError> {
        let bytes = self.client.download(url).await?;
        tokio::fs::create_dir_all(&self.out_dir).await?;
        tokio::fs::write(self.out_dir.join(filename), bytes).await?;
        Ok(format!("/media/{filename}"))
    }
}
