//! Job client tests against a scripted in-memory transport.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::time::Instant;
use uuid::Uuid;

use site_factory::media::client::{GetResponse, with_fallback};
use site_factory::media::{
    JobClient, JobError, JobTransport, MediaGenerator, MediaMode, MediaSettings, PollConfig,
    RawResponse, Task,
};

fn ok(body: Value) -> RawResponse {
    RawResponse {
        status: 200,
        body: serde_json::to_vec(&body).unwrap(),
    }
}

fn status(code: u16, body: &str) -> RawResponse {
    RawResponse {
        status: code,
        body: body.as_bytes().to_vec(),
    }
}

type Handler = Box<dyn Fn(&Task) -> RawResponse + Send + Sync>;

/// Answers each single-task batch with `handler` and serves fixed bytes
/// for every fetch. Records the time of every post.
struct ScriptedTransport {
    handler: Handler,
    fetch_status: u16,
    posts: Mutex<Vec<(Instant, Task)>>,
    fetched: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(handler: impl Fn(&Task) -> RawResponse + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            fetch_status: 200,
            posts: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
        }
    }

    fn posts(&self) -> Vec<(Instant, Task)> {
        self.posts.lock().unwrap().clone()
    }

    fn polls(&self) -> usize {
        self.posts()
            .iter()
            .filter(|(_, t)| matches!(t, Task::GetResponse(_)))
            .count()
    }

    fn video_models(&self) -> Vec<String> {
        self.posts()
            .into_iter()
            .filter_map(|(_, t)| match t {
                Task::VideoInference(v) => Some(v.model),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl JobTransport for ScriptedTransport {
    async fn post_tasks(&self, tasks: &[Task]) -> Result<RawResponse, JobError> {
        assert_eq!(tasks.len(), 1, "every request carries one task");
        self.posts
            .lock()
            .unwrap()
            .push((Instant::now(), tasks[0].clone()));
        Ok((self.handler)(&tasks[0]))
    }

    async fn fetch(&self, url: &str) -> Result<RawResponse, JobError> {
        self.fetched.lock().unwrap().push(url.to_string());
        Ok(RawResponse {
            status: self.fetch_status,
            body: format!("bytes of {url}").into_bytes(),
        })
    }
}

fn fast_poll(max_attempts: u32) -> PollConfig {
    PollConfig {
        max_attempts,
        initial: Duration::from_millis(100),
        growth: 1.5,
        ceiling: Duration::from_millis(300),
    }
}

/// Video service where each model either acknowledges and then finishes
/// with `outcome`, or rejects the submit with HTTP 503.
fn video_service(outcomes: &[(&str, &'static str)]) -> ScriptedTransport {
    let outcomes: HashMap<String, &'static str> =
        outcomes.iter().map(|(m, o)| (m.to_string(), *o)).collect();
    let jobs: Arc<Mutex<HashMap<Uuid, String>>> = Arc::default();

    ScriptedTransport::new(move |task| match task {
        Task::VideoInference(v) => match outcomes.get(&v.model).copied() {
            Some("reject") | None => status(503, "overloaded"),
            Some("no-ack") => ok(json!({ "data": [{ "taskUUID": Uuid::new_v4() }] })),
            Some(_) => {
                jobs.lock().unwrap().insert(v.task_uuid, v.model.clone());
                ok(json!({ "data": [{ "taskUUID": v.task_uuid, "taskType": "videoInference" }] }))
            }
        },
        Task::GetResponse(GetResponse { task_uuid }) => {
            let model = jobs.lock().unwrap().get(task_uuid).cloned().unwrap_or_default();
            match outcomes.get(&model).copied() {
                Some("success") => ok(json!({ "data": [{
                    "taskUUID": task_uuid,
                    "status": "success",
                    "videoURL": format!("https://cdn.example/{model}.mp4"),
                }] })),
                Some("no-url") => ok(json!({ "data": [{ "taskUUID": task_uuid, "status": "success" }] })),
                _ => ok(json!({ "data": [{ "taskUUID": task_uuid, "status": "error" }] })),
            }
        }
        Task::ImageInference(_) => status(400, "unexpected"),
    })
}

fn generator(
    transport: ScriptedTransport,
    models: &[&str],
    out_dir: &std::path::Path,
) -> MediaGenerator<ScriptedTransport> {
    let settings = MediaSettings {
        video_models: models.iter().map(|m| m.to_string()).collect(),
        ..Default::default()
    };
    MediaGenerator::new(JobClient::new(transport).with_poll(fast_poll(5)), settings, out_dir)
}

// ── Submit ─────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_rejects_bad_status() {
    let client = JobClient::new(ScriptedTransport::new(|_| status(500, "boom")));
    let err = client.submit(&[Task::get_response(Uuid::new_v4())]).await.unwrap_err();
    assert!(matches!(err, JobError::Http { status: 500, ref body } if body == "boom"));
}

#[tokio::test]
async fn submit_rejects_error_list() {
    let client = JobClient::new(ScriptedTransport::new(|_| {
        ok(json!({ "data": [{ "taskUUID": Uuid::new_v4() }], "errors": [{ "code": "invalidModel" }] }))
    }));
    let err = client.submit(&[Task::get_response(Uuid::new_v4())]).await.unwrap_err();
    match err {
        JobError::TaskErrors(text) => assert!(text.contains("invalidModel")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn submit_rejects_empty_data() {
    for body in [json!({ "data": [] }), json!({})] {
        let client = JobClient::new(ScriptedTransport::new(move |_| ok(body.clone())));
        let err = client.submit(&[Task::get_response(Uuid::new_v4())]).await.unwrap_err();
        assert!(matches!(err, JobError::NoData(_)));
    }
}

// ── Sync images ────────────────────────────────────────────────────

#[tokio::test]
async fn images_are_generated_in_order_and_saved() {
    let out = tempfile::tempdir().unwrap();
    let transport = ScriptedTransport::new(|task| match task {
        Task::ImageInference(img) => ok(json!({ "data": [{
            "taskUUID": img.task_uuid,
            "imageURL": format!("https://cdn.example/{}.webp", img.task_uuid),
        }] })),
        _ => status(400, "unexpected"),
    });
    let media = generator(transport, &[], out.path());

    let report = media.run(MediaMode::Images).await.unwrap();

    assert_eq!(report.images, vec!["/media/hero-bg-1.webp", "/media/hero-bg-2.webp"]);
    assert_eq!(report.video, None);
    let posts = media.client().transport().posts();
    assert_eq!(posts.len(), 2);
    for (_, task) in &posts {
        let Task::ImageInference(img) = task else {
            panic!("expected image tasks only");
        };
        assert_eq!((img.width, img.height), (2048, 2048));
        assert_eq!(img.model, "bytedance:seedream@4.5");
    }
    let first = std::fs::read_to_string(out.path().join("hero-bg-1.webp")).unwrap();
    assert_eq!(first, format!("bytes of https://cdn.example/{}.webp", posts[0].1.task_uuid()));
    assert!(out.path().join("hero-bg-2.webp").exists());
}

#[tokio::test]
async fn failed_download_is_a_hard_error() {
    let out = tempfile::tempdir().unwrap();
    let mut transport = ScriptedTransport::new(|task| {
        ok(json!({ "data": [{ "taskUUID": task.task_uuid(), "imageURL": "https://cdn.example/x.webp" }] }))
    });
    transport.fetch_status = 404;
    let media = generator(transport, &[], out.path());

    let err = media.generate_images().await.unwrap_err();
    assert!(matches!(err, JobError::Fetch { status: 404 }));
    assert!(!out.path().join("hero-bg-1.webp").exists());
}

// ── Polling ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn poll_times_out_after_max_attempts_with_growing_delays() {
    let config = fast_poll(6);
    let client = JobClient::new(ScriptedTransport::new(|task| {
        ok(json!({ "data": [{ "taskUUID": task.task_uuid(), "status": "processing" }] }))
    }))
    .with_poll(config);
    let task = Uuid::new_v4();

    let err = client.poll(task).await.unwrap_err();

    assert!(matches!(err, JobError::Timeout { task: t, attempts: 6 } if t == task));
    let posts = client.transport().posts();
    assert_eq!(posts.len(), 6);
    let gaps: Vec<Duration> = posts.windows(2).map(|w| w[1].0 - w[0].0).collect();
    assert_close(&gaps, &config.schedule());
    assert_close(&gaps, &[100, 150, 225, 300, 300].map(Duration::from_millis));
}

/// Timer ticks are whole milliseconds, so allow a little slack.
fn assert_close(actual: &[Duration], expected: &[Duration]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        let diff = if a > e { *a - *e } else { *e - *a };
        assert!(diff <= Duration::from_millis(2), "{actual:?} vs {expected:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn poll_returns_success_after_running_states() {
    let calls = Arc::new(Mutex::new(0u32));
    let counter = calls.clone();
    let client = JobClient::new(ScriptedTransport::new(move |task| {
        let mut n = counter.lock().unwrap();
        *n += 1;
        let state = if *n < 3 { "processing" } else { "success" };
        ok(json!({ "data": [{ "taskUUID": task.task_uuid(), "status": state, "videoURL": "https://v" }] }))
    }))
    .with_poll(fast_poll(10));

    let result = client.poll(Uuid::new_v4()).await.unwrap();

    assert_eq!(result.video_url.as_deref(), Some("https://v"));
    assert_eq!(*calls.lock().unwrap(), 3);
}

#[tokio::test]
async fn poll_error_state_fails_the_task() {
    let client = JobClient::new(ScriptedTransport::new(|task| {
        ok(json!({ "data": [{ "taskUUID": task.task_uuid(), "status": "error" }] }))
    }));
    let task = Uuid::new_v4();
    let err = client.poll(task).await.unwrap_err();
    assert!(matches!(err, JobError::TaskFailed(t) if t == task));
    assert_eq!(client.transport().polls(), 1);
}

#[tokio::test]
async fn poll_without_matching_entry_fails() {
    let client = JobClient::new(ScriptedTransport::new(|_| {
        ok(json!({ "data": [{ "taskUUID": Uuid::new_v4(), "status": "success" }] }))
    }));
    let task = Uuid::new_v4();
    let err = client.poll(task).await.unwrap_err();
    assert!(matches!(err, JobError::NoResponse(t) if t == task));
}

// ── Fallback ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn video_falls_back_to_the_next_model() {
    let out = tempfile::tempdir().unwrap();
    let transport = video_service(&[("model-a", "error"), ("model-b", "success")]);
    let media = generator(transport, &["model-a", "model-b"], out.path());

    let path = media.generate_video().await.unwrap();

    assert_eq!(path, "/media/hero-video.mp4");
    assert_eq!(media.client().transport().video_models(), vec!["model-a", "model-b"]);
    let saved = std::fs::read_to_string(out.path().join("hero-video.mp4")).unwrap();
    assert_eq!(saved, "bytes of https://cdn.example/model-b.mp4");
}

#[tokio::test(start_paused = true)]
async fn all_models_failing_surfaces_the_last_error() {
    let out = tempfile::tempdir().unwrap();
    let transport = video_service(&[("model-a", "error"), ("model-b", "reject")]);
    let media = generator(transport, &["model-a", "model-b"], out.path());

    let err = media.generate_video().await.unwrap_err();

    assert!(matches!(err, JobError::Http { status: 503, .. }), "got {err}");
    assert_eq!(media.client().transport().video_models(), vec!["model-a", "model-b"]);
    assert!(!out.path().join("hero-video.mp4").exists());
}

#[tokio::test(start_paused = true)]
async fn missing_ack_and_missing_url_advance_the_fallback() {
    let out = tempfile::tempdir().unwrap();
    let transport = video_service(&[
        ("no-ack-model", "no-ack"),
        ("no-url-model", "no-url"),
        ("good-model", "success"),
    ]);
    let media = generator(transport, &["no-ack-model", "no-url-model", "good-model"], out.path());

    let path = media.generate_video().await.unwrap();

    assert_eq!(path, "/media/hero-video.mp4");
    assert_eq!(
        media.client().transport().video_models(),
        vec!["no-ack-model", "no-url-model", "good-model"]
    );
}

#[tokio::test]
async fn fallback_with_no_models_is_an_error() {
    let result = with_fallback(&[], |_model| async { Ok::<_, JobError>(()) }).await;
    assert!(matches!(result, Err(JobError::NoModels)));
}

#[tokio::test]
async fn fallback_stops_at_first_success() {
    let tried = Mutex::new(Vec::new());
    let models = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    let (model, value) = with_fallback(&models, |model| {
        tried.lock().unwrap().push(model.clone());
        async move {
            if model == "a" {
                Err(JobError::TaskFailed(Uuid::nil()))
            } else {
                Ok(model.len())
            }
        }
    })
    .await
    .unwrap();
    assert_eq!((model.as_str(), value), ("b", 1));
    assert_eq!(*tried.lock().unwrap(), vec!["a", "b"]);
}
