//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use docforge_genai::OpenRouterClient;
use docforge_pipeline::{ContentUpdatePipeline, RelationshipAnalyzer};
use docforge_scrape::HttpScraper;
use docforge_shared::{
    AnalysisJobType, AppConfig, JobId, RelationKind, TriggerKind, init_config, load_config,
    validate_api_key,
};
use docforge_storage::Storage;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docforge — keep documentation fresh with AI-assisted refresh jobs.
#[derive(Parser)]
#[command(
    name = "docforge",
    version,
    about = "AI-assisted content refresh and relationship discovery for documentation sites.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Content update jobs (scrape, rewrite, review, apply).
    Content {
        #[command(subcommand)]
        action: ContentAction,
    },

    /// Relationship analysis jobs.
    Relations {
        #[command(subcommand)]
        action: RelationsAction,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Content update subcommands.
#[derive(Subcommand)]
pub(crate) enum ContentAction {
    /// Create a pending update job for one content item.
    Trigger {
        /// Content item id.
        item_id: String,

        /// Who triggered the refresh (recorded on the job).
        #[arg(long, default_value = "cli")]
        by: String,

        /// Process the job immediately after creating it.
        #[arg(long)]
        process: bool,
    },

    /// Run a pending job through scrape and rewrite.
    Process {
        /// Job id.
        job_id: String,
    },

    /// Approve a reviewed job and apply its proposed content.
    Approve {
        /// Job id.
        job_id: String,

        /// Reviewer name recorded on the job.
        #[arg(long)]
        reviewer: String,

        /// Optional review notes.
        #[arg(long)]
        notes: Option<String>,
    },

    /// Reject a reviewed job, leaving the item untouched.
    Reject {
        /// Job id.
        job_id: String,

        /// Reviewer name recorded on the job.
        #[arg(long)]
        reviewer: String,

        /// Optional review notes.
        #[arg(long)]
        notes: Option<String>,
    },

    /// Cancel a job from any non-terminal status.
    Cancel {
        /// Job id.
        job_id: String,
    },

    /// Create update jobs for stale published items.
    Sweep {
        /// Restrict the sweep to these categories (repeatable).
        #[arg(long)]
        category: Vec<String>,

        /// Process the created jobs immediately.
        #[arg(long)]
        process: bool,
    },

    /// Show one job in full, including the proposed diff.
    Show {
        /// Job id.
        job_id: String,
    },

    /// List recent jobs.
    List {
        /// Maximum number of jobs to show.
        #[arg(long, default_value = "20")]
        limit: u32,
    },
}

/// Relationship analysis subcommands.
#[derive(Subcommand)]
pub(crate) enum RelationsAction {
    /// Create an analysis job.
    Analyze {
        /// Strategy: doc_to_resources, resource_to_docs, resource_to_resources,
        /// batch_docs, or batch_resources.
        job_type: String,

        /// Source entity id (required for single-entity strategies).
        #[arg(long)]
        target: Option<String>,

        /// Process the job immediately after creating it.
        #[arg(long)]
        process: bool,

        /// Apply discovered relationships after processing (implies --process).
        #[arg(long)]
        apply: bool,
    },

    /// Run a pending analysis job.
    Process {
        /// Job id.
        job_id: String,
    },

    /// Upsert a completed job's relationships into the database.
    Apply {
        /// Job id.
        job_id: String,

        /// Only apply relationships at or above this confidence.
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Only apply these relationship types (repeatable).
        #[arg(long = "type")]
        types: Vec<String>,
    },

    /// Create a batch sweep job over all docs or all resources.
    Sweep {
        /// Entity class to sweep: docs or resources.
        class: String,

        /// Process the job immediately after creating it.
        #[arg(long)]
        process: bool,
    },

    /// Cancel a job from any non-terminal status.
    Cancel {
        /// Job id.
        job_id: String,
    },

    /// Show one analysis job in full.
    Show {
        /// Job id.
        job_id: String,
    },

    /// List recent analysis jobs.
    List {
        /// Maximum number of jobs to show.
        #[arg(long, default_value = "20")]
        limit: u32,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docforge=info",
        1 => "docforge=debug",
        _ => "docforge=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Content { action } => match action {
            ContentAction::Trigger {
                item_id,
                by,
                process,
            } => cmd_content_trigger(&item_id, &by, process).await,
            ContentAction::Process { job_id } => cmd_content_process(&job_id).await,
            ContentAction::Approve {
                job_id,
                reviewer,
                notes,
            } => cmd_content_approve(&job_id, &reviewer, notes).await,
            ContentAction::Reject {
                job_id,
                reviewer,
                notes,
            } => cmd_content_reject(&job_id, &reviewer, notes).await,
            ContentAction::Cancel { job_id } => cmd_content_cancel(&job_id).await,
            ContentAction::Sweep { category, process } => cmd_content_sweep(&category, process).await,
            ContentAction::Show { job_id } => cmd_content_show(&job_id).await,
            ContentAction::List { limit } => cmd_content_list(limit).await,
        },
        Command::Relations { action } => match action {
            RelationsAction::Analyze {
                job_type,
                target,
                process,
                apply,
            } => cmd_relations_analyze(&job_type, target, process, apply).await,
            RelationsAction::Process { job_id } => cmd_relations_process(&job_id).await,
            RelationsAction::Apply {
                job_id,
                min_confidence,
                types,
            } => cmd_relations_apply(&job_id, min_confidence, &types).await,
            RelationsAction::Sweep { class, process } => {
                cmd_relations_sweep(&class, process).await
            }
            RelationsAction::Cancel { job_id } => cmd_relations_cancel(&job_id).await,
            RelationsAction::Show { job_id } => cmd_relations_show(&job_id).await,
            RelationsAction::List { limit } => cmd_relations_list(limit).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

/// Expand a leading `~/` in the configured database path.
fn resolve_db_path(config: &AppConfig) -> Result<PathBuf> {
    let raw = &config.defaults.db_path;
    if let Some(rest) = raw.strip_prefix("~/") {
        let home =
            dirs::home_dir().ok_or_else(|| eyre!("could not determine home directory"))?;
        Ok(home.join(rest))
    } else {
        Ok(PathBuf::from(raw))
    }
}

async fn open_storage(config: &AppConfig) -> Result<Storage> {
    let path = resolve_db_path(config)?;
    Ok(Storage::open(&path).await?)
}

fn parse_job_id(raw: &str) -> Result<JobId> {
    raw.parse::<JobId>()
        .map_err(|e| eyre!("invalid job id '{raw}': {e}"))
}

// ---------------------------------------------------------------------------
// Content command handlers
// ---------------------------------------------------------------------------

async fn cmd_content_trigger(item_id: &str, by: &str, process: bool) -> Result<()> {
    let config = load_config()?;
    if process {
        validate_api_key(&config)?;
    }
    let storage = open_storage(&config).await?;

    // The generator is only constructed when processing; job creation does
    // not touch the network.
    if !process {
        let pipeline = review_pipeline(&storage, &config)?;
        let job = pipeline.create_job(item_id, TriggerKind::Manual, by).await?;
        println!("Created job {} (pending)", job.id);
        return Ok(());
    }

    let scraper = HttpScraper::new(&config.scrape)?;
    let generator = OpenRouterClient::new(&config.generation)?;
    let pipeline = ContentUpdatePipeline::new(&storage, scraper, generator, config.clone());
    let job = pipeline.create_job(item_id, TriggerKind::Manual, by).await?;
    info!(job_id = %job.id, item_id, "job created, processing");
    let job = pipeline.process_job(&job.id).await?;
    print_content_summary(&job);
    Ok(())
}

async fn cmd_content_process(job_id: &str) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;
    let storage = open_storage(&config).await?;

    let scraper = HttpScraper::new(&config.scrape)?;
    let generator = OpenRouterClient::new(&config.generation)?;
    let pipeline = ContentUpdatePipeline::new(&storage, scraper, generator, config.clone());

    let id = parse_job_id(job_id)?;
    let job = pipeline.process_job(&id).await?;
    print_content_summary(&job);
    Ok(())
}

async fn cmd_content_approve(job_id: &str, reviewer: &str, notes: Option<String>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;
    let pipeline = review_pipeline(&storage, &config)?;

    let id = parse_job_id(job_id)?;
    let job = pipeline.approve_job(&id, reviewer, notes).await?;
    println!("Approved and applied job {} (status: {})", job.id, job.status);
    Ok(())
}

async fn cmd_content_reject(job_id: &str, reviewer: &str, notes: Option<String>) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;
    let pipeline = review_pipeline(&storage, &config)?;

    let id = parse_job_id(job_id)?;
    let job = pipeline.reject_job(&id, reviewer, notes).await?;
    println!("Rejected job {}", job.id);
    Ok(())
}

async fn cmd_content_cancel(job_id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;
    let pipeline = review_pipeline(&storage, &config)?;

    let id = parse_job_id(job_id)?;
    let job = pipeline.cancel_job(&id).await?;
    println!("Cancelled job {}", job.id);
    Ok(())
}

async fn cmd_content_sweep(categories: &[String], process: bool) -> Result<()> {
    let config = load_config()?;
    if process {
        validate_api_key(&config)?;
    }
    let storage = open_storage(&config).await?;

    let jobs = if process {
        let scraper = HttpScraper::new(&config.scrape)?;
        let generator = OpenRouterClient::new(&config.generation)?;
        let pipeline = ContentUpdatePipeline::new(&storage, scraper, generator, config.clone());
        let jobs = pipeline.create_sweep_jobs(categories).await?;
        println!("Created {} sweep job(s)", jobs.len());

        let bar = ProgressBar::new(jobs.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        let mut ready = 0usize;
        let mut failed = 0usize;
        for job in &jobs {
            bar.set_message(job.item_id.clone());
            match pipeline.process_job(&job.id).await {
                Ok(_) => ready += 1,
                Err(e) => {
                    failed += 1;
                    tracing::warn!(job_id = %job.id, error = %e, "sweep job failed");
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();
        println!("Processed: {ready} ready for review, {failed} failed");
        jobs
    } else {
        let pipeline = review_pipeline(&storage, &config)?;
        let jobs = pipeline.create_sweep_jobs(categories).await?;
        println!("Created {} sweep job(s) (pending)", jobs.len());
        jobs
    };

    for job in &jobs {
        println!("  {}  {}", job.id, job.item_id);
    }
    Ok(())
}

async fn cmd_content_show(job_id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let id = parse_job_id(job_id)?;
    let job = storage
        .get_content_job(&id)
        .await?
        .ok_or_else(|| eyre!("no content job with id {id}"))?;
    println!("{}", serde_json::to_string_pretty(&job)?);
    Ok(())
}

async fn cmd_content_list(limit: u32) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let jobs = storage.list_content_jobs(limit).await?;
    if jobs.is_empty() {
        println!("No content jobs.");
        return Ok(());
    }
    for job in jobs {
        println!(
            "{}  {:<16}  {:<9}  item={}",
            job.id,
            job.status.as_str(),
            job.trigger.as_str(),
            job.item_id
        );
    }
    Ok(())
}

fn print_content_summary(job: &docforge_shared::ContentUpdateJob) {
    println!();
    println!("  Job:        {}", job.id);
    println!("  Status:     {}", job.status);
    if let Some(confidence) = job.confidence {
        println!("  Confidence: {confidence:.2}");
    }
    if let Some(summary) = &job.summary {
        println!("  Summary:    {summary}");
    }
    if !job.warnings.is_empty() {
        println!("  Warnings:");
        for w in &job.warnings {
            println!("    - {w}");
        }
    }
    if let Some(diff) = &job.diff {
        if !diff.is_empty() {
            println!();
            println!("{diff}");
        }
    }
    println!();
}

/// Pipeline for review-stage commands that never hit the network. The
/// scraper and generator seams still have to be filled in.
fn review_pipeline<'a>(
    storage: &'a Storage,
    config: &AppConfig,
) -> Result<ContentUpdatePipeline<'a, HttpScraper, NoopGenerator>> {
    let scraper = HttpScraper::new(&config.scrape)?;
    Ok(ContentUpdatePipeline::new(
        storage,
        scraper,
        NoopGenerator,
        config.clone(),
    ))
}

/// Generator seam for commands that never generate.
struct NoopGenerator;

impl docforge_genai::Generator for NoopGenerator {
    async fn generate(
        &self,
        _request: &docforge_genai::GenerationRequest,
    ) -> docforge_shared::Result<docforge_genai::Generation> {
        Err(docforge_shared::DocforgeError::Generation(
            "generator not configured".into(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Relations command handlers
// ---------------------------------------------------------------------------

async fn cmd_relations_analyze(
    job_type: &str,
    target: Option<String>,
    process: bool,
    apply: bool,
) -> Result<()> {
    let config = load_config()?;
    let run_now = process || apply;
    if run_now {
        validate_api_key(&config)?;
    }
    let storage = open_storage(&config).await?;

    let parsed: AnalysisJobType = job_type
        .parse()
        .map_err(|e| eyre!("invalid job type '{job_type}': {e}"))?;

    if !run_now {
        let analyzer = RelationshipAnalyzer::new(&storage, NoopGenerator, config.clone());
        let job = analyzer.create_job(parsed, target).await?;
        println!("Created analysis job {} (pending)", job.id);
        return Ok(());
    }

    let generator = OpenRouterClient::new(&config.generation)?;
    let analyzer = RelationshipAnalyzer::new(&storage, generator, config.clone());
    let job = analyzer.create_job(parsed, target).await?;
    info!(job_id = %job.id, "analysis job created, processing");
    let job = analyzer.process_job(&job.id).await?;
    print_relations_summary(&job);

    if apply {
        let summary = analyzer.apply_job(&job.id, None, None).await?;
        println!(
            "Applied: {} created, {} updated, {} skipped",
            summary.created, summary.updated, summary.skipped
        );
    }
    Ok(())
}

async fn cmd_relations_sweep(class: &str, process: bool) -> Result<()> {
    let job_type = match class {
        "docs" => AnalysisJobType::BatchDocs,
        "resources" => AnalysisJobType::BatchResources,
        other => return Err(eyre!("unknown sweep class '{other}': expected 'docs' or 'resources'")),
    };

    let config = load_config()?;
    if process {
        validate_api_key(&config)?;
    }
    let storage = open_storage(&config).await?;

    if !process {
        let analyzer = RelationshipAnalyzer::new(&storage, NoopGenerator, config.clone());
        let job = analyzer.create_job(job_type, None).await?;
        println!("Created sweep job {} (pending)", job.id);
        return Ok(());
    }

    let generator = OpenRouterClient::new(&config.generation)?;
    let analyzer = RelationshipAnalyzer::new(&storage, generator, config.clone());
    let job = analyzer.create_job(job_type, None).await?;
    info!(job_id = %job.id, "sweep job created, processing");
    let job = analyzer.process_job(&job.id).await?;
    print_relations_summary(&job);
    Ok(())
}

async fn cmd_relations_process(job_id: &str) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;
    let storage = open_storage(&config).await?;

    let generator = OpenRouterClient::new(&config.generation)?;
    let analyzer = RelationshipAnalyzer::new(&storage, generator, config.clone());

    let id = parse_job_id(job_id)?;
    let job = analyzer.process_job(&id).await?;
    print_relations_summary(&job);
    Ok(())
}

async fn cmd_relations_apply(
    job_id: &str,
    min_confidence: Option<f64>,
    types: &[String],
) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;
    let analyzer = RelationshipAnalyzer::new(&storage, NoopGenerator, config.clone());

    let allowed: Option<Vec<RelationKind>> = if types.is_empty() {
        None
    } else {
        Some(
            types
                .iter()
                .map(|t| {
                    t.parse::<RelationKind>()
                        .map_err(|e| eyre!("invalid relationship type '{t}': {e}"))
                })
                .collect::<Result<Vec<_>>>()?,
        )
    };

    let id = parse_job_id(job_id)?;
    let summary = analyzer.apply_job(&id, min_confidence, allowed.as_deref()).await?;
    println!(
        "Applied: {} created, {} updated, {} skipped",
        summary.created, summary.updated, summary.skipped
    );
    Ok(())
}

async fn cmd_relations_cancel(job_id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;
    let analyzer = RelationshipAnalyzer::new(&storage, NoopGenerator, config.clone());

    let id = parse_job_id(job_id)?;
    let job = analyzer.cancel_job(&id).await?;
    println!("Cancelled analysis job {}", job.id);
    Ok(())
}

async fn cmd_relations_show(job_id: &str) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let id = parse_job_id(job_id)?;
    let job = storage
        .get_analysis_job(&id)
        .await?
        .ok_or_else(|| eyre!("no analysis job with id {id}"))?;
    println!("{}", serde_json::to_string_pretty(&job)?);
    Ok(())
}

async fn cmd_relations_list(limit: u32) -> Result<()> {
    let config = load_config()?;
    let storage = open_storage(&config).await?;

    let jobs = storage.list_analysis_jobs(limit).await?;
    if jobs.is_empty() {
        println!("No analysis jobs.");
        return Ok(());
    }
    for job in jobs {
        println!(
            "{}  {:<10}  {:<22}  relationships={}",
            job.id,
            job.status.as_str(),
            job.job_type.as_str(),
            job.relationships.len()
        );
    }
    Ok(())
}

fn print_relations_summary(job: &docforge_shared::RelationshipAnalysisJob) {
    println!();
    println!("  Job:           {}", job.id);
    println!("  Status:        {}", job.status);
    println!("  Relationships: {}", job.relationships.len());
    println!("  Tokens used:   {}", job.tokens_used);
    println!("  Est. cost:     ${:.4}", job.cost_estimate);
    for rel in &job.relationships {
        println!(
            "    {} -> {}  {}  ({:.2})",
            rel.source_id,
            rel.target_id,
            rel.relationship_type.as_str(),
            rel.confidence
        );
    }
    if !job.warnings.is_empty() {
        println!("  Warnings:");
        for w in &job.warnings {
            println!("    - {w}");
        }
    }
    println!();
}

// ---------------------------------------------------------------------------
// Config command handlers
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
