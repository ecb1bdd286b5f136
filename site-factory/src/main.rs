//! site-factory: scaffold a marketing site from a one-line description.
//!
//!   site-factory new "<description>" [options]   Generate a project
//!   site-factory media [images|video|all]        Generate hero media (run inside a project)
//!   site-factory check-env                       Verify Runware settings
//!
//! Set RUST_LOG to adjust logging (default: site_factory=info).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use site_factory::factory::{Factory, FactoryConfig, FactoryRequest};
use site_factory::media::{
    self, HttpTransport, JobClient, MediaGenerator, MediaMode, MediaSettings, PollConfig,
};
use site_factory::output;
use site_factory::project::IdentityInput;
use site_factory::skills::{DnsSkillOptions, MediaSkillOptions, ProcessRunner, SkillCommand};
use site_factory::template::RenderMode;

const DEFAULT_TEMPLATE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/factory-template");
const DEFAULT_DNS_COMMAND: &str = "bun run scripts/setup-cloudflare-domain.mjs";

#[derive(Parser)]
#[command(name = "site-factory", version, about = "Marketing-site factory")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new project from a description
    New(NewArgs),
    /// Generate hero media for the project in the current directory
    Media(MediaArgs),
    /// Check that the Runware environment is configured
    CheckEnv(CheckEnvArgs),
}

#[derive(Args)]
struct NewArgs {
    /// What the business does, in a sentence or two
    description: Option<String>,

    /// Same as the positional description
    #[arg(long = "description", id = "description_flag")]
    description_flag: Option<String>,

    /// Company name (default: inferred from the description)
    #[arg(long)]
    company: Option<String>,

    /// Project slug (default: derived from the company)
    #[arg(long)]
    slug: Option<String>,

    /// Primary domain used in metadata (default: <slug>.com)
    #[arg(long)]
    domain: Option<String>,

    /// Output directory (default: ./<slug>)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Contact email for legal pages (default: hello@<domain>)
    #[arg(long, visible_alias = "contact-email")]
    email: Option<String>,

    /// Business phone for SMS opt-out instructions
    #[arg(long)]
    phone: Option<String>,

    /// Brief SMS business description for legal pages
    #[arg(long)]
    sms_description: Option<String>,

    /// Web3Forms access key
    #[arg(long, env = "PUBLIC_WEB3FORMS_ACCESS_KEY")]
    web3forms_key: Option<String>,

    /// Runware API key (enables hero media generation)
    #[arg(long, env = "RUNWARE_API_KEY")]
    runware_key: Option<String>,

    /// Runware endpoint written to .env
    #[arg(long, env = "RUNWARE_API_URL", default_value = media::DEFAULT_API_URL)]
    runware_api_url: String,

    /// Skip the media generation step
    #[arg(long)]
    skip_media: bool,

    /// Force the media generation step
    #[arg(long)]
    run_media: bool,

    /// What the media skill generates
    #[arg(long, value_enum, default_value_t = MediaMode::Images)]
    media_mode: MediaMode,

    /// Write .env with discovered keys in the output project
    #[arg(long)]
    write_env: bool,

    /// Run the Cloudflare record sync after generation
    #[arg(long)]
    include_cloudflare: bool,

    /// Cloudflare API token
    #[arg(long, env = "CLOUDFLARE_API_TOKEN")]
    cloudflare_token: Option<String>,

    /// Cloudflare zone id
    #[arg(long, env = "CLOUDFLARE_ZONE_ID")]
    cloudflare_zone_id: Option<String>,

    /// Cloudflare DNS TTL (default 300)
    #[arg(long)]
    cloudflare_ttl: Option<String>,

    /// IPv4 A record for Vercel (default 76.76.21.21)
    #[arg(long)]
    vercel_ipv4: Option<String>,

    /// Command that syncs the DNS records, run inside the project
    #[arg(long, default_value = DEFAULT_DNS_COMMAND)]
    dns_command: String,

    /// Template directory
    #[arg(long, env = "SITE_FACTORY_TEMPLATE", default_value = DEFAULT_TEMPLATE)]
    template: PathBuf,

    /// Fail on template tokens with no value instead of rendering them empty
    #[arg(long)]
    strict_templates: bool,

    /// Overwrite an existing target directory
    #[arg(long)]
    force: bool,
}

#[derive(Args)]
struct MediaArgs {
    /// What to generate
    #[arg(value_enum, default_value_t = MediaMode::All)]
    mode: MediaMode,

    /// Runware API key
    #[arg(long, env = "RUNWARE_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Runware endpoint
    #[arg(long, env = "RUNWARE_API_URL", default_value = media::DEFAULT_API_URL)]
    api_url: String,

    /// Model for hero images
    #[arg(long, env = "RUNWARE_IMAGE_MODEL", default_value = media::DEFAULT_IMAGE_MODEL)]
    image_model: String,

    /// Primary video model; the fallback model is tried after it
    #[arg(long, env = "RUNWARE_VIDEO_MODEL", default_value = media::DEFAULT_VIDEO_MODEL)]
    video_model: String,

    /// Seed for video generation
    #[arg(long, env = "VIDEO_SEED", default_value_t = 42)]
    video_seed: u64,

    /// Where media files are written
    #[arg(long, default_value = "public/media")]
    output_dir: PathBuf,

    /// Polls before giving up on an async task
    #[arg(long, env = "RUNWARE_POLL_MAX_ATTEMPTS", default_value_t = 30)]
    poll_max_attempts: u32,

    /// First delay between polls
    #[arg(long, env = "RUNWARE_POLL_INTERVAL_MS", default_value_t = 1500)]
    poll_interval_ms: u64,

    /// Delay multiplier after each poll
    #[arg(long, env = "RUNWARE_POLL_GROWTH", default_value_t = 1.5)]
    poll_growth: f64,

    /// Longest delay between polls
    #[arg(long, env = "RUNWARE_POLL_CEILING_MS", default_value_t = 8000)]
    poll_ceiling_ms: u64,
}

#[derive(Args)]
struct CheckEnvArgs {
    #[arg(long, env = "RUNWARE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, env = "RUNWARE_IMAGE_MODEL", default_value = media::DEFAULT_IMAGE_MODEL)]
    image_model: String,

    #[arg(long, env = "RUNWARE_VIDEO_MODEL", default_value = media::DEFAULT_VIDEO_MODEL)]
    video_model: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "site_factory=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::New(args) => run_new(args).await,
        Commands::Media(args) => run_media(args).await,
        Commands::CheckEnv(args) => check_env(args),
    }
}

async fn run_new(args: NewArgs) -> Result<()> {
    let description = args
        .description_flag
        .or(args.description)
        .unwrap_or_default();
    let web3forms_key = args
        .web3forms_key
        .or_else(|| std::env::var("WEB3FORMS_KEY").ok());

    let media_command = SkillCommand::new(self_program(), ["media".to_string(), args.media_mode.to_string()]);

    let request = FactoryRequest {
        identity: IdentityInput {
            description,
            company: args.company,
            slug: args.slug,
            domain: args.domain,
            output: args.output,
            email: args.email,
            phone: args.phone,
            sms_description: args.sms_description,
        },
        web3forms_key,
        runware_api_url: args.runware_api_url,
        force: args.force,
        write_env: args.write_env,
        render_mode: if args.strict_templates {
            RenderMode::Strict
        } else {
            RenderMode::Lenient
        },
        media: MediaSkillOptions {
            runware_key: args.runware_key,
            run_media: args.run_media,
            skip_media: args.skip_media,
            command: Some(media_command),
        },
        dns: DnsSkillOptions {
            include_cloudflare: args.include_cloudflare,
            cloudflare_token: args.cloudflare_token,
            cloudflare_zone_id: args.cloudflare_zone_id,
            cloudflare_ttl: args.cloudflare_ttl,
            vercel_ipv4: args.vercel_ipv4,
            command: SkillCommand::parse(&args.dns_command),
            ..Default::default()
        },
    };

    let factory = Factory::new(
        FactoryConfig {
            template_root: args.template,
            cwd: std::env::current_dir()?,
        },
        Arc::new(ProcessRunner),
    );
    let outcome = factory.run(request).await?;

    tracing::info!(manifest = %outcome.manifest_path.display(), "manifest written");
    println!("{}", output::summary(&outcome.identity.output, &outcome.manifest.skills));
    Ok(())
}

/// Path to this binary, so the media skill can re-invoke it.
fn self_program() -> String {
    std::env::current_exe()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "site-factory".to_string())
}

async fn run_media(args: MediaArgs) -> Result<()> {
    let poll = PollConfig {
        max_attempts: args.poll_max_attempts,
        initial: Duration::from_millis(args.poll_interval_ms),
        growth: args.poll_growth,
        ceiling: Duration::from_millis(args.poll_ceiling_ms),
    };
    let client = JobClient::new(HttpTransport::new(args.api_url, args.api_key)).with_poll(poll);
    let settings = MediaSettings {
        image_model: args.image_model,
        video_models: media::generate::video_models(&args.video_model),
        video_seed: args.video_seed,
        ..Default::default()
    };

    let generator = MediaGenerator::new(client, settings, args.output_dir);
    let report = generator.run(args.mode).await?;
    for path in &report.images {
        println!("Image generated -> {path}");
    }
    if let Some(path) = &report.video {
        println!("Video generated -> {path}");
    }
    Ok(())
}

fn check_env(args: CheckEnvArgs) -> Result<()> {
    let Some(key) = args.api_key.filter(|k| !k.is_empty()) else {
        anyhow::bail!(
            "Missing required variables:\n- RUNWARE_API_KEY\nCopy .env.example and fill the values before generating media."
        );
    };
    println!("Runware environment check: OK");
    println!("API key detected: {}", media::mask_key(&key));
    println!("Image model: {}", args.image_model);
    println!("Video model: {}", args.video_model);
    Ok(())
}
