//! `reelcut` command-line interface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelcut_media::{is_supported_url, SourceVideo, VideoAcquirer, YtDlpAcquirer};
use reelcut_models::timestamp::parse_timestamp;
use reelcut_models::{AspectRatio, FocalMode, RenderRequest, SegmentSource};
use reelcut_studio::accounts::{premium_members, validate_registration};
use reelcut_studio::{
    parse_candidates, AccountStore, GeminiProposer, JsonFileAccountStore, RenderBatch, RenderPipeline,
    RequestContext, StudioConfig, StudioError, SupabaseAccountStore,
};

/// Vertical short-clip studio
#[derive(Parser)]
#[command(name = "reelcut")]
#[command(about = "Cut vertical short clips from long videos")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render clips from a local file or a video URL
    Render(RenderArgs),
    /// Extract segment candidates from saved model output
    Parse(ParseArgs),
    /// Manage accounts
    #[command(subcommand)]
    Account(AccountCommand),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Local video file or http(s) URL
    source: String,

    /// Account email to charge
    #[arg(long, env = "REELCUT_EMAIL")]
    email: String,

    /// Clip start (seconds, MM:SS or HH:MM:SS); default picks a window automatically
    #[arg(long, conflicts_with = "ai")]
    start: Option<String>,

    /// Ask the analysis model for the most shareable moments
    #[arg(long)]
    ai: bool,

    /// Horizontal focus: center, face, or a percentage 0-100
    #[arg(long, default_value = "center", value_parser = parse_focus)]
    focus: FocalMode,

    /// Apply contrast, saturation and sharpening
    #[arg(long)]
    enhance: bool,

    /// Output aspect ratio
    #[arg(long, default_value = "9:16")]
    ratio: AspectRatio,

    /// Directory for the finished clips
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Netscape cookies file handed to yt-dlp for URL sources
    #[arg(long, env = "REELCUT_YTDLP_COOKIES")]
    cookies: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ParseArgs {
    /// Text file holding the raw model answer
    input: PathBuf,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Register a free account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "REELCUT_PASSWORD")]
        password: String,
    },
    /// Grant premium (admin only)
    Grant {
        email: String,
        #[arg(long = "as", env = "REELCUT_EMAIL")]
        acting: String,
    },
    /// Revoke premium (admin only)
    Revoke {
        email: String,
        #[arg(long = "as", env = "REELCUT_EMAIL")]
        acting: String,
    },
    /// List premium members (admin only)
    Premium {
        #[arg(long = "as", env = "REELCUT_EMAIL")]
        acting: String,
    },
    /// Show an account's balance
    Show { email: String },
}

fn parse_focus(value: &str) -> Result<FocalMode, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "center" | "centre" => Ok(FocalMode::Fixed),
        "face" | "auto" => Ok(FocalMode::FaceDetected),
        other => other
            .trim_end_matches('%')
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && (0.0..=100.0).contains(p))
            .map(|percent| FocalMode::Explicit { percent })
            .ok_or_else(|| format!("expected center, face or 0-100, got '{}'", value)),
    }
}

fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reelcut=info,reelcut_studio=info,reelcut_media=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

fn account_store(config: &StudioConfig) -> Arc<dyn AccountStore> {
    match SupabaseAccountStore::from_config(config) {
        Some(store) => Arc::new(store),
        None => {
            let path = config.accounts_path();
            info!("SUPABASE_URL/SUPABASE_KEY not set, using account file {}", path.display());
            Arc::new(JsonFileAccountStore::new(path))
        }
    }
}

fn require_admin(config: &StudioConfig, acting: &str) -> Result<()> {
    if !config.is_admin(acting) {
        bail!(StudioError::access_denied(format!("{} is not the administrator", acting)));
    }
    Ok(())
}

fn acquirer(cookies: Option<&Path>) -> YtDlpAcquirer {
    match cookies {
        Some(path) => {
            if !path.exists() {
                warn!("Cookies file {} not found, downloading without it", path.display());
            }
            YtDlpAcquirer::new().with_cookies(path)
        }
        None => YtDlpAcquirer::new(),
    }
}

async fn open_source(
    source: &str,
    cookies: Option<&Path>,
    config: &StudioConfig,
) -> Result<(SourceVideo, Option<tempfile::TempDir>)> {
    if is_supported_url(source) {
        tokio::fs::create_dir_all(&config.work_dir).await?;
        let download_dir = tempfile::Builder::new()
            .prefix("source_")
            .tempdir_in(&config.work_dir)?;
        let path = acquirer(cookies)
            .acquire(source, download_dir.path())
            .await
            .map_err(|e| StudioError::acquisition_failed(e.to_string()))?;
        let video = SourceVideo::open(&path).await?;
        return Ok((video, Some(download_dir)));
    }

    let path = Path::new(source);
    let video = SourceVideo::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok((video, None))
}

async fn write_batch(batch: &RenderBatch, output_dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(output_dir).await?;
    for clip in &batch.clips {
        let path = output_dir.join(&clip.filename);
        tokio::fs::write(&path, &clip.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!(
            "{}\t{}\t[{:.2}s - {:.2}s]\t{} bytes",
            path.display(),
            clip.label,
            clip.segment.start,
            clip.segment.end,
            clip.size_bytes()
        );
    }
    for skipped in &batch.skipped {
        eprintln!("skipped #{} '{}': {}", skipped.index + 1, skipped.label, skipped.reason);
    }
    Ok(())
}

async fn run_render(args: RenderArgs, config: StudioConfig) -> Result<()> {
    let ctx = RequestContext::for_email(&args.email, &config);
    let store = account_store(&config);
    let pipeline = RenderPipeline::with_ffmpeg(store, config.clone());

    // Refuse early, before any download.
    pipeline.authorize(&ctx).await?;

    let (source, _download_dir) = open_source(&args.source, args.cookies.as_deref(), &config).await?;

    let mut request = RenderRequest::default()
        .with_focal(args.focus)
        .with_enhancement(args.enhance)
        .with_target_ratio(args.ratio);

    let batch = if args.ai {
        let proposer = GeminiProposer::from_config(&config)?;
        pipeline.analyze_and_render(&ctx, &source, &proposer, request).await?
    } else {
        if let Some(start) = args.start.as_deref() {
            let start = parse_timestamp(start).with_context(|| format!("Invalid --start '{}'", start))?;
            request = request.with_segments(SegmentSource::ExplicitStart { start });
        }
        pipeline.render(&ctx, &source, &request).await?
    };

    write_batch(&batch, &args.output_dir).await?;
    info!(
        request_id = %batch.request_id,
        clips = batch.clips.len(),
        credit_charged = batch.credit_charged,
        "Render finished"
    );
    Ok(())
}

async fn run_parse(args: ParseArgs) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let candidates = parse_candidates(&raw);
    println!("{}", serde_json::to_string_pretty(&candidates)?);
    Ok(())
}

async fn run_account(cmd: AccountCommand, config: StudioConfig) -> Result<()> {
    let store = account_store(&config);
    match cmd {
        AccountCommand::Register { email, password } => {
            validate_registration(&email, &password)?;
            let account = store.register(&email, &password).await?;
            println!("registered {} with {} credits", account.email, account.credits);
        }
        AccountCommand::Grant { email, acting } => {
            require_admin(&config, &acting)?;
            store.set_premium(&email, true).await?;
            println!("{} is now premium", email);
        }
        AccountCommand::Revoke { email, acting } => {
            require_admin(&config, &acting)?;
            store.set_premium(&email, false).await?;
            println!("{} is back on the free plan", email);
        }
        AccountCommand::Premium { acting } => {
            require_admin(&config, &acting)?;
            for email in premium_members(store.as_ref(), &config).await? {
                println!("{}", email);
            }
        }
        AccountCommand::Show { email } => match store.find(&email).await? {
            Some(account) => println!(
                "{}\tcredits={}\tpremium={}",
                account.email, account.credits, account.is_premium
            ),
            None => bail!("no account for {}", email),
        },
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = StudioConfig::from_env();
    info!("Studio config: {:?}", config);

    let result = match cli.command {
        Commands::Render(args) => run_render(args, config).await,
        Commands::Parse(args) => run_parse(args).await,
        Commands::Account(cmd) => run_account(cmd, config).await,
    };

    if let Err(e) = result {
        match e.downcast_ref::<StudioError>() {
            Some(studio) => eprintln!("{} ({})", studio.user_message(), studio),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}
