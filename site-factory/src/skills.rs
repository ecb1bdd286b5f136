//! Optional post-scaffold skills.
//!
//! Each skill is gated by a pure eligibility check, run as an isolated
//! subprocess in the generated project, and classified into a
//! [`SkillResult`]. A skill never aborts the run and never affects another.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

pub const CONTENT_SCAFFOLD: &str = "content-scaffold";
pub const VERCEL_SETUP: &str = "vercel-setup";
pub const RUNWARE_MEDIA: &str = "runware-media";
pub const CLOUDFLARE_DNS: &str = "cloudflare-dns";

pub const DEFAULT_VERCEL_IPV4: &str = "76.76.21.21";
pub const DEFAULT_CLOUDFLARE_TTL: &str = "300";

/// Outcome of one skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkillStatus {
    Completed,
    Skipped,
    Failed,
    PendingManual,
}

impl std::fmt::Display for SkillStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkillStatus::Completed => write!(f, "completed"),
            SkillStatus::Skipped => write!(f, "skipped"),
            SkillStatus::Failed => write!(f, "failed"),
            SkillStatus::PendingManual => write!(f, "pending-manual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillResult {
    pub id: String,
    pub status: SkillStatus,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub note: Option<String>,
}

impl SkillResult {
    pub fn new(id: &str, status: SkillStatus, note: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            status,
            note,
        }
    }
}

// ── Commands ───────────────────────────────────────────────────────

/// An external command plus the environment scoped to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Added on top of the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl SkillCommand {
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
        }
    }

    /// Parse a whitespace-separated command line.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program, parts))
    }

    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.insert(key.to_string(), value.into());
        self
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured output of a successful command.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs skill commands. Swapped for a fake in tests.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command` in `cwd`. A non-zero exit is an error.
    async fn run(&self, command: &SkillCommand, cwd: &Path) -> Result<CommandOutput>;
}

/// Real subprocesses via tokio.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &SkillCommand, cwd: &Path) -> Result<CommandOutput> {
        let output = Command::new(&command.program)
            .args(&command.args)
            .envs(&command.env)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("Failed to execute {}", command.display()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            tracing::debug!(command = %command.display(), %stderr, "skill command failed");
            anyhow::bail!("Command failed: {} (code: {code})", command.display());
        }
        Ok(CommandOutput { stdout, stderr })
    }
}

// ── Eligibility ────────────────────────────────────────────────────

/// Whether a skill runs, decided before anything executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    Run(SkillCommand),
    Skip(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillPlan {
    pub id: String,
    pub gate: Gate,
}

#[derive(Debug, Clone, Default)]
pub struct MediaSkillOptions {
    pub runware_key: Option<String>,
    pub run_media: bool,
    pub skip_media: bool,
    /// Command that generates the media; receives `RUNWARE_API_KEY`.
    pub command: Option<SkillCommand>,
}

#[derive(Debug, Clone, Default)]
pub struct DnsSkillOptions {
    pub include_cloudflare: bool,
    pub domain: String,
    pub cloudflare_token: Option<String>,
    pub cloudflare_zone_id: Option<String>,
    pub cloudflare_ttl: Option<String>,
    pub vercel_ipv4: Option<String>,
    /// Command that syncs the DNS records.
    pub command: Option<SkillCommand>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

pub fn media_plan(options: &MediaSkillOptions) -> SkillPlan {
    let key = present(&options.runware_key);
    let wanted = options.run_media || (key.is_some() && !options.skip_media);

    let gate = match (wanted, key, &options.command) {
        (false, _, _) if options.skip_media => Gate::Skip("disabled by --skip-media".to_string()),
        (false, _, _) => Gate::Skip("runware key not provided".to_string()),
        (true, None, _) => Gate::Skip(
            "runware key missing; pass --runware-key or set in environment".to_string(),
        ),
        (true, Some(_), None) => Gate::Skip("no media command configured".to_string()),
        (true, Some(key), Some(command)) => Gate::Run(command.clone().env("RUNWARE_API_KEY", key)),
    };
    SkillPlan {
        id: RUNWARE_MEDIA.to_string(),
        gate,
    }
}

pub fn dns_plan(options: &DnsSkillOptions) -> SkillPlan {
    let gate = if !options.include_cloudflare {
        Gate::Skip("set --include-cloudflare to sync records".to_string())
    } else {
        match (
            present(&options.cloudflare_token),
            present(&options.cloudflare_zone_id),
            &options.command,
        ) {
            (Some(token), Some(zone), Some(command)) => Gate::Run(
                command
                    .clone()
                    .env("ROOT_DOMAIN", options.domain.as_str())
                    .env("CLOUDFLARE_API_TOKEN", token)
                    .env("CLOUDFLARE_ZONE_ID", zone)
                    .env(
                        "VERCEL_IPV4",
                        present(&options.vercel_ipv4).unwrap_or(DEFAULT_VERCEL_IPV4),
                    )
                    .env(
                        "CLOUDFLARE_TTL",
                        present(&options.cloudflare_ttl).unwrap_or(DEFAULT_CLOUDFLARE_TTL),
                    ),
            ),
            (Some(_), Some(_), None) => Gate::Skip("no dns command configured".to_string()),
            _ => Gate::Skip("missing --cloudflare-token or --cloudflare-zone-id".to_string()),
        }
    };
    SkillPlan {
        id: CLOUDFLARE_DNS.to_string(),
        gate,
    }
}

// ── Orchestration ──────────────────────────────────────────────────

pub struct SkillOrchestrator<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> SkillOrchestrator<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Run `plans` one after another in `cwd`, in order.
    pub async fn run(&self, plans: Vec<SkillPlan>, cwd: &Path) -> Vec<SkillResult> {
        let mut results = Vec::with_capacity(plans.len());
        for plan in plans {
            let result = match plan.gate {
                Gate::Skip(note) => {
                    tracing::warn!(skill = %plan.id, %note, "skill skipped");
                    SkillResult::new(&plan.id, SkillStatus::Skipped, Some(note))
                }
                Gate::Run(command) => {
                    tracing::info!(skill = %plan.id, command = %command.display(), "running skill");
                    match self.runner.run(&command, cwd).await {
                        Ok(_) => {
                            tracing::info!(skill = %plan.id, "skill completed");
                            SkillResult::new(&plan.id, SkillStatus::Completed, None)
                        }
                        Err(e) => {
                            let note = format!("{e:#}");
                            tracing::warn!(skill = %plan.id, error = %note, "skill failed");
                            SkillResult::new(&plan.id, SkillStatus::Failed, Some(note))
                        }
                    }
                }
            };
            results.push(result);
        }
        results
    }
}

/// The fixed scaffold and deployment entries followed by the runtime skills.
pub fn skill_statuses(runtime: Vec<SkillResult>) -> Vec<SkillResult> {
    let mut skills = vec![
        SkillResult::new(
            CONTENT_SCAFFOLD,
            SkillStatus::Completed,
            Some("copied templates and rendered placeholders".to_string()),
        ),
        SkillResult::new(
            VERCEL_SETUP,
            SkillStatus::PendingManual,
            Some("deploy workflow and README included; connect GitHub repo in Vercel".to_string()),
        ),
    ];
    skills.extend(runtime);
    skills
}
