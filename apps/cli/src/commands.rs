//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use tenderpilot_core::{
    LoadOptions, LoadOutcome, ProgressReporter, TenderFilter, assist, card, facets, load_tenders,
    result_page, select,
};
use tenderpilot_llm::{AssistTask, client_from_config};
use tenderpilot_shared::{
    AiProvider, AppConfig, ColumnRole, Tender, db_path, init_config, load_config,
    load_config_from,
};
use tenderpilot_storage::Storage;

/// Longest title shown in the results table.
const TITLE_WIDTH: usize = 60;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// TenderPilot — search Canadian government tenders and draft bids with AI.
#[derive(Parser)]
#[command(
    name = "tenderpilot",
    version,
    about = "Browse Canadian government tender notices and get AI bid strategies and outreach emails.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.tenderpilot/tenderpilot.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Read tenders from a local CSV file instead of downloading.
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    /// Ignore the cached snapshot and download again.
    #[arg(long, global = true)]
    pub refresh: bool,

    /// AI provider to use instead of the configured one (openai, gemini).
    #[arg(long, global = true, env = "TENDERPILOT_PROVIDER")]
    pub provider: Option<AiProvider>,

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
    /// Download the dataset and report what was detected.
    Fetch,

    /// Search and filter tenders.
    Search {
        /// Case-insensitive text to look for in any column.
        query: Option<String>,

        /// Only this category.
        #[arg(long)]
        category: Option<String>,

        /// Only this status.
        #[arg(long)]
        status: Option<String>,

        /// Only this contracting authority.
        #[arg(long)]
        authority: Option<String>,

        /// Only tenders closing on or after this date (YYYY-MM-DD).
        #[arg(long)]
        closing_after: Option<NaiveDate>,

        /// Hide tenders whose closing date has passed.
        #[arg(long)]
        open_only: bool,

        /// Maximum rows to print.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print matches as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show one tender in full.
    Show {
        /// Row number or reference number.
        tender: String,
    },

    /// List the values available for the category, status and authority filters.
    Facets,

    /// Generate a winning strategy for a tender.
    Strategy {
        /// Row number or reference number.
        tender: String,

        /// Ask the model again even if a cached answer exists.
        #[arg(long)]
        no_cache: bool,
    },

    /// Draft an outreach email for a tender.
    Email {
        /// Row number or reference number.
        tender: String,

        /// Ask the model again even if a cached answer exists.
        #[arg(long)]
        no_cache: bool,
    },

    /// Launch the interactive dashboard.
    Tui,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Local AI response cache.
    Cache {
        /// Cache subcommand.
        #[command(subcommand)]
        action: CacheAction,
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

/// Cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheAction {
    /// Forget cached AI answers so the next request asks the model again.
    Clear {
        /// Only answers for this task (strategy, email).
        #[arg(long)]
        task: Option<AssistTask>,
    },
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tenderpilot=info",
        1 => "tenderpilot=debug",
        _ => "tenderpilot=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    if let Command::Config { action } = &cli.command {
        return match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&cli),
        };
    }
    if let Command::Cache { action } = &cli.command {
        return match action {
            CacheAction::Clear { task } => cmd_cache_clear(&cli, *task).await,
        };
    }
    if let Command::Tui = cli.command {
        return cmd_tui();
    }

    let ctx = Context::open(&cli).await?;

    match cli.command {
        Command::Fetch => cmd_fetch(&ctx).await,
        Command::Search {
            query,
            category,
            status,
            authority,
            closing_after,
            open_only,
            limit,
            json,
        } => {
            let filter = TenderFilter {
                search: query,
                category,
                status,
                authority,
                closing_after,
                open_only,
            };
            cmd_search(&ctx, &filter, limit, json).await
        }
        Command::Show { tender } => cmd_show(&ctx, &tender).await,
        Command::Facets => cmd_facets(&ctx).await,
        Command::Strategy { tender, no_cache } => {
            cmd_assist(&ctx, AssistTask::WinningStrategy, &tender, !no_cache).await
        }
        Command::Email { tender, no_cache } => {
            cmd_assist(&ctx, AssistTask::OutreachEmail, &tender, !no_cache).await
        }
        Command::Tui | Command::Config { .. } | Command::Cache { .. } => Ok(()),
    }
}

/// Resolved config, local database and load flags for one invocation.
struct Context {
    config: AppConfig,
    storage: Option<Storage>,
    file: Option<PathBuf>,
    refresh: bool,
}

impl Context {
    async fn open(cli: &Cli) -> Result<Self> {
        let config = resolve_config(cli)?;

        // The database only caches; commands still work without it.
        let storage = match db_path(&config) {
            Ok(path) => match Storage::open(&path).await {
                Ok(storage) => Some(storage),
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "local cache unavailable");
                    None
                }
            },
            Err(e) => {
                warn!(error = %e, "local cache unavailable");
                None
            }
        };

        Ok(Self {
            config,
            storage,
            file: cli.file.clone(),
            refresh: cli.refresh,
        })
    }

    async fn load(&self, force_refresh: bool) -> Result<LoadOutcome> {
        let opts = LoadOptions::from_config(
            &self.config,
            self.file.clone(),
            self.refresh || force_refresh,
        )?;
        let reporter = CliProgress::new();
        let outcome = load_tenders(&opts, self.storage.as_ref(), &reporter).await?;
        Ok(outcome)
    }
}

fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(apply_overrides(config, cli))
}

/// Apply command-line overrides on top of the loaded config.
fn apply_overrides(mut config: AppConfig, cli: &Cli) -> AppConfig {
    if let Some(provider) = cli.provider {
        if provider != config.ai.provider {
            // Model, endpoint and key variable are provider-specific.
            config.ai.model = None;
            config.ai.base_url = None;
            config.ai.api_key_env = None;
        }
        config.ai.provider = provider;
    }
    config
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _outcome: &LoadOutcome) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_fetch(ctx: &Context) -> Result<()> {
    let outcome = ctx.load(true).await?;
    let table = &outcome.table;

    println!();
    println!("  Tender notices loaded");
    println!("  Source:  {}", table.source);
    println!("  Origin:  {}", outcome.origin);
    println!("  Rows:    {}", table.len());
    println!("  Columns: {}", table.columns.len());
    println!("  Time:    {:.1}s", outcome.elapsed.as_secs_f64());
    println!();
    println!("  Detected columns:");
    for role in ColumnRole::ALL {
        let header = table.header_for(role).unwrap_or("-");
        println!("    {:<18} {header}", role.to_string());
    }
    println!();

    Ok(())
}

async fn cmd_search(
    ctx: &Context,
    filter: &TenderFilter,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let outcome = ctx.load(false).await?;
    let page = result_page(
        &outcome.table,
        filter,
        today(),
        ctx.config.display.page_size,
        limit,
    );
    info!(matched = page.matched, shown = page.rows.len(), "search complete");

    if json {
        let doc = serde_json::json!({
            "summary": page.summary,
            "matched": page.matched,
            "tenders": page.rows,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("{}", page.summary);
    if page.rows.is_empty() {
        return Ok(());
    }
    println!();
    println!(
        "  {:>5}  {:<12} {:<10} {:<width$}  Authority",
        "Row",
        "Closes",
        "Status",
        "Title",
        width = TITLE_WIDTH
    );
    for tender in &page.rows {
        println!(
            "  {:>5}  {:<12} {:<10} {:<width$}  {}",
            tender.row,
            clip(&tender.closing_date_raw, 12),
            clip(&tender.status, 10),
            clip(&tender.title, TITLE_WIDTH),
            tender.authority,
            width = TITLE_WIDTH
        );
    }
    println!();

    Ok(())
}

async fn cmd_show(ctx: &Context, key: &str) -> Result<()> {
    let outcome = ctx.load(false).await?;
    let tender = select(&outcome.table, key)?;
    print_card(tender);
    Ok(())
}

async fn cmd_facets(ctx: &Context) -> Result<()> {
    let outcome = ctx.load(false).await?;
    let facets = facets(&outcome.table.tenders);

    for (label, values) in [
        ("Categories", &facets.categories),
        ("Statuses", &facets.statuses),
        ("Authorities", &facets.authorities),
    ] {
        println!("{label}:");
        for v in values {
            println!("  {:>5}  {}", v.count, v.value);
        }
        println!();
    }

    Ok(())
}

async fn cmd_assist(ctx: &Context, task: AssistTask, key: &str, use_cache: bool) -> Result<()> {
    // Fail on a missing key before downloading anything.
    let client = client_from_config(&ctx.config.ai)?;

    let outcome = ctx.load(false).await?;
    let tender = select(&outcome.table, key)?;
    info!(task = task.as_str(), row = tender.row, "running assistant");

    let spinner = CliProgress::new();
    spinner.phase(&format!("{task} for \"{}\"", clip(&tender.title, 50)));
    let result = assist(
        task,
        tender,
        &ctx.config.profile,
        client.as_ref(),
        ctx.storage.as_ref(),
        use_cache,
    )
    .await;
    spinner.spinner.finish_and_clear();
    let output = result?;

    println!("{}", output.text);
    eprintln!();
    eprintln!(
        "  {} · {}{}",
        output.task,
        output.model,
        if output.cached { " · cached" } else { "" }
    );

    Ok(())
}

fn cmd_tui() -> Result<()> {
    println!("The dashboard is a separate binary. Launch it with:");
    println!();
    println!("  tenderpilot-tui");
    println!();
    println!("It reads the same config file and local cache as this CLI.");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

async fn cmd_cache_clear(cli: &Cli, task: Option<AssistTask>) -> Result<()> {
    let config = resolve_config(cli)?;
    let path = db_path(&config)?;
    let storage = Storage::open(&path).await?;
    let removed = storage.clear_ai_cache(task.map(|t| t.as_str())).await?;
    match task {
        Some(task) => println!("Removed {removed} cached {} answers.", task.as_str()),
        None => println!("Removed {removed} cached AI answers."),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn print_card(tender: &Tender) {
    println!();
    for (label, value) in card(tender) {
        if label == "Description" {
            println!();
            println!("  {value}");
        } else {
            println!("  {:<12} {value}", format!("{label}:"));
        }
    }
    println!();
}

/// Cut `s` to `max` characters, marking the cut with an ellipsis.
fn clip(s: &str, max: usize) -> String {
    let s = s.trim();
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
