//! Factory orchestrator: drives one run through the pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Datelike, SubsecRound, Utc};

use crate::copy::{self, CopyBundle, safe_sentence};
use crate::manifest::Manifest;
use crate::project::{IdentityInput, ProjectIdentity};
use crate::skills::{
    self, CommandRunner, DnsSkillOptions, MediaSkillOptions, SkillOrchestrator, SkillResult,
};
use crate::template::{self, RenderMode, RenderReport, Replacements};
use crate::workspace::{EnvFile, Workspace};

/// Recorded as `generatedFrom` in the manifest.
const GENERATED_FROM: &str = "site-factory new";

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("a description is required")]
    MissingDescription,
    #[error("Output exists: {}. Use --force to overwrite or point --output to a new folder.", .0.display())]
    OutputExists(PathBuf),
    #[error("template root not found: {}", .0.display())]
    TemplateRootMissing(PathBuf),
}

/// Pipeline stage, logged as the run advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Resolving,
    Scaffolding,
    Rendering,
    Skills,
    Recording,
    Complete,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Resolving => write!(f, "resolving"),
            Phase::Scaffolding => write!(f, "scaffolding"),
            Phase::Rendering => write!(f, "rendering"),
            Phase::Skills => write!(f, "skills"),
            Phase::Recording => write!(f, "recording"),
            Phase::Complete => write!(f, "complete"),
        }
    }
}

/// Factory configuration.
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// Directory holding the project template.
    pub template_root: PathBuf,
    /// Base for relative output paths.
    pub cwd: PathBuf,
}

/// Everything one run needs from the caller.
#[derive(Debug, Clone, Default)]
pub struct FactoryRequest {
    pub identity: IdentityInput,
    pub web3forms_key: Option<String>,
    /// Written to `.env` when `write_env` is set.
    pub runware_api_url: String,
    pub force: bool,
    pub write_env: bool,
    pub render_mode: RenderMode,
    pub media: MediaSkillOptions,
    /// `domain` is filled in from the resolved identity.
    pub dns: DnsSkillOptions,
}

#[derive(Debug, Clone)]
pub struct FactoryOutcome {
    pub identity: ProjectIdentity,
    pub render: RenderReport,
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
}

/// The site factory.
pub struct Factory {
    pub config: FactoryConfig,
    runner: Arc<dyn CommandRunner>,
}

impl Factory {
    pub fn new(config: FactoryConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { config, runner }
    }

    /// Run the full pipeline. Errors before the skills stage are fatal;
    /// skill failures are recorded in the manifest instead.
    pub async fn run(&self, request: FactoryRequest) -> Result<FactoryOutcome> {
        enter(Phase::Resolving);
        if request.identity.description.trim().is_empty() {
            return Err(FactoryError::MissingDescription.into());
        }
        let identity = ProjectIdentity::resolve(request.identity, &self.config.cwd);
        let copy = copy::generate(&identity.description, &identity.company);
        let web3forms_key = request.web3forms_key.unwrap_or_default();
        let values = replacements(&identity, &copy, &web3forms_key, Utc::now().year())?;
        tracing::info!(
            company = %identity.company,
            slug = %identity.slug,
            domain = %identity.domain,
            "resolved project identity"
        );

        enter(Phase::Scaffolding);
        let workspace =
            Workspace::create(&identity.output, &self.config.template_root, request.force).await?;

        enter(Phase::Rendering);
        let render = template::render_tree(&workspace.root, &values, request.render_mode).await?;
        tracing::info!(rendered = render.rendered.len(), "rendered templates");

        if request.write_env {
            let path = workspace
                .write_env(&EnvFile {
                    web3forms_key,
                    runware_key: request.media.runware_key.clone().unwrap_or_default(),
                    runware_api_url: request.runware_api_url,
                    domain: identity.domain.clone(),
                    contact_email: identity.email.clone(),
                })
                .await?;
            tracing::info!(path = %path.display(), "wrote .env");
        }

        enter(Phase::Skills);
        let dns = DnsSkillOptions {
            domain: identity.domain.clone(),
            ..request.dns
        };
        let plans = vec![skills::media_plan(&request.media), skills::dns_plan(&dns)];
        let runtime = SkillOrchestrator::new(self.runner.as_ref())
            .run(plans, &workspace.root)
            .await;

        enter(Phase::Recording);
        let manifest = build_manifest(&identity, skills::skill_statuses(runtime));
        let manifest_path = manifest.write(&workspace.root).await?;

        enter(Phase::Complete);
        Ok(FactoryOutcome {
            identity,
            render,
            manifest,
            manifest_path,
        })
    }
}

fn enter(phase: Phase) {
    tracing::info!(%phase, "factory phase");
}

fn build_manifest(identity: &ProjectIdentity, skills: Vec<SkillResult>) -> Manifest {
    Manifest {
        created_at: Utc::now().trunc_subsecs(3),
        source_description: identity.description.clone(),
        domain: identity.domain.clone(),
        company: identity.company.clone(),
        slug: identity.slug.clone(),
        output: identity.output.clone(),
        generated_from: GENERATED_FROM.to_string(),
        skills,
    }
}

/// Token values for the template tree.
pub fn replacements(
    identity: &ProjectIdentity,
    copy: &CopyBundle,
    web3forms_key: &str,
    year: i32,
) -> Result<Replacements> {
    let company = &identity.company;
    Ok(Replacements::new()
        .with("COMPANY_NAME", company.as_str())
        .with("COMPANY_SLUG", identity.slug.as_str())
        .with("DOMAIN", identity.domain.as_str())
        .with("YEAR", year.to_string())
        .with(
            "TAGLINE",
            safe_sentence(
                &copy.uvp_headline,
                &format!("{company} for practical AI and systems growth."),
            ),
        )
        .with(
            "HERO_HEADLINE",
            safe_sentence(
                &copy.headline,
                &format!("{company} modernizes operations with practical AI."),
            ),
        )
        .with("HERO_SUBTITLE", copy.subtitle.as_str())
        .with("UVP_HEADLINE", copy.uvp_headline.as_str())
        .with("UVP_BODY", copy.uvp_body.as_str())
        .with("SERVICES_JSON", serde_json::to_string_pretty(&copy.services)?)
        .with("PROCESS_JSON", serde_json::to_string_pretty(&copy.process)?)
        .with("ICP_JSON", serde_json::to_string_pretty(&copy.icp)?)
        .with("CONTACT_EMAIL", identity.email.as_str())
        .with("PHONE_NUMBER", identity.phone.as_str())
        .with("SMS_DESCRIPTION", identity.sms_description.as_str())
        .with("WEB3FORMS_KEY", web3forms_key))
}
