//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use newsroom_core::pipeline::{
    ArticleReport, ArticleStatus, BatchResult, GenerateOptions, ProgressReporter, RunContext,
};
use newsroom_core::update::{ApplyOptions, FileOutcome};
use newsroom_markdown::{front_matter_value, leading_h1, sanitize, split_front_matter, validate};
use newsroom_provider::client_from_config;
use newsroom_shared::{
    AppConfig, Category, NewsroomError, Topic, init_config, load_config, now_jst,
};
use newsroom_storage::{BatchOutcome, ContextOptions, KnowledgeSnapshot, KnowledgeStore};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Newsroom: quality-gated article generation.
#[derive(Parser)]
#[command(
    name = "newsroom",
    version,
    about = "Generate articles through a quality-gated pipeline and keep the knowledge base current.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
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
    /// Plan, write and publish a batch of articles.
    Generate {
        /// Number of articles (defaults to the configured count).
        #[arg(short, long)]
        articles: Option<usize>,

        /// Run every stage with placeholder output; call nothing, write nothing.
        #[arg(long)]
        dry_run: bool,

        /// Skip post-process steps marked as enrichment.
        #[arg(long)]
        skip_enrich: bool,

        /// Directory articles are written to.
        #[arg(long)]
        posts_dir: Option<String>,

        /// Knowledge-base directory.
        #[arg(long)]
        kb_dir: Option<String>,
    },

    /// Score an article and print the quality report. Exits non-zero on FAIL.
    Score {
        /// Article file (header block optional).
        file: PathBuf,

        /// Title to score with when the file has none.
        #[arg(long)]
        title: Option<String>,
    },

    /// Sanitize a title and report anything suspicious about it.
    Title {
        text: String,

        /// Maximum length in characters (defaults to the configured limit).
        #[arg(long)]
        max_len: Option<usize>,
    },

    /// Knowledge-base operations.
    Kb {
        #[command(subcommand)]
        action: KbAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Knowledge-base subcommands.
#[derive(Subcommand)]
pub(crate) enum KbAction {
    /// Merge pending research batches into the knowledge base.
    Apply {
        /// Apply a single batch file, regardless of its age.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Report changes without writing.
        #[arg(long)]
        dry_run: bool,

        /// Skip batches older than this many days.
        #[arg(long)]
        max_age: Option<i64>,

        /// Research batch directory.
        #[arg(long)]
        research_dir: Option<String>,

        /// Knowledge-base directory.
        #[arg(long)]
        kb_dir: Option<String>,
    },
    /// Print the prompt context block drafting would see.
    Context {
        /// Restrict company details to these ids (repeatable).
        #[arg(long = "company")]
        companies: Vec<String>,

        /// Select sections the way an article in this category would.
        #[arg(long)]
        category: Option<String>,

        /// Knowledge-base directory.
        #[arg(long)]
        kb_dir: Option<String>,
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

/// Log targets of the workspace crates.
const WORKSPACE_TARGETS: [&str; 7] = [
    "newsroom",
    "newsroom_core",
    "newsroom_provider",
    "newsroom_storage",
    "newsroom_shared",
    "newsroom_quality",
    "newsroom_markdown",
];

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

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
    match cli.command {
        Command::Generate {
            articles,
            dry_run,
            skip_enrich,
            posts_dir,
            kb_dir,
        } => cmd_generate(articles, dry_run, skip_enrich, posts_dir, kb_dir).await,
        Command::Score { file, title } => cmd_score(&file, title.as_deref()),
        Command::Title { text, max_len } => cmd_title(&text, max_len),
        Command::Kb { action } => match action {
            KbAction::Apply {
                file,
                dry_run,
                max_age,
                research_dir,
                kb_dir,
            } => cmd_kb_apply(file, dry_run, max_age, research_dir, kb_dir),
            KbAction::Context {
                companies,
                category,
                kb_dir,
            } => cmd_kb_context(companies, category.as_deref(), kb_dir),
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

async fn cmd_generate(
    articles: Option<usize>,
    dry_run: bool,
    skip_enrich: bool,
    posts_dir: Option<String>,
    kb_dir: Option<String>,
) -> Result<()> {
    let config = load_config()?;

    let options = GenerateOptions {
        articles: articles.unwrap_or(config.defaults.articles),
        skip_enrichment: skip_enrich,
        posts_dir: PathBuf::from(posts_dir.unwrap_or(config.defaults.posts_dir)),
        kb_dir: PathBuf::from(kb_dir.unwrap_or(config.defaults.kb_dir)),
        research_dir: PathBuf::from(&config.defaults.research_dir),
        knowledge_dir: PathBuf::from(&config.defaults.knowledge_dir),
        research_lookup_days: config.knowledge.research_lookup_days,
    };

    // A dry run needs no credentials.
    let client = if dry_run {
        None
    } else {
        Some(client_from_config(&config.gemini)?)
    };
    let ctx = match &client {
        Some(client) => RunContext::live(client, &config.pipeline),
        None => RunContext::dry_run(&config.pipeline),
    };

    info!(
        articles = options.articles,
        dry_run,
        posts_dir = %options.posts_dir.display(),
        "starting generation run"
    );

    let reporter = CliProgress::new();
    let result = newsroom_core::run_batch(&ctx, &options, &reporter).await;

    print_batch_summary(&result, dry_run);

    if result.produced() == 0 {
        return Err(eyre!("no articles were produced"));
    }
    Ok(())
}

fn print_batch_summary(result: &BatchResult, dry_run: bool) {
    println!();
    for report in &result.articles {
        println!("  {}", describe_article(report));
    }
    println!();
    let verb = if dry_run { "Previewed" } else { "Published" };
    println!(
        "  {verb}: {}/{}  (below threshold: {})",
        result.produced(),
        result.articles.len(),
        result.below_threshold()
    );
    println!("  Time: {:.1}s", result.elapsed.as_secs_f64());
    println!();
}

fn describe_article(report: &ArticleReport) -> String {
    let title = report.title.as_deref().unwrap_or(&report.topic.seed);
    match &report.status {
        ArticleStatus::Published { path, verdict, .. } => {
            format!("{}. [{verdict:?}] {title} → {}", report.n, path.display())
        }
        ArticleStatus::Previewed { path, verdict } => {
            format!("{}. [{verdict:?}] {title} → {} (dry run)", report.n, path.display())
        }
        ArticleStatus::Skipped { reason } => {
            format!("{}. [Skipped] {title}: {reason}", report.n)
        }
    }
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
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn article_started(&self, n: usize, total: usize, topic: &Topic) {
        self.spinner
            .set_message(format!("Writing [{n}/{total}] [{}] {}", topic.category, topic.seed));
    }

    fn article_finished(&self, report: &ArticleReport) {
        self.spinner.println(format!("  {}", describe_article(report)));
    }

    fn done(&self, _result: &BatchResult) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// score / title
// ---------------------------------------------------------------------------

/// Title and body of an article file. The header's `title` wins over
/// `--title`, which wins over a leading `# ` heading.
fn scoring_input<'a>(text: &'a str, title: Option<&str>) -> newsroom_shared::Result<(String, &'a str)> {
    let (header, body) = split_front_matter(text);
    if header.is_none() && (text.starts_with("---\n") || text.starts_with("---\r\n")) {
        return Err(NewsroomError::parse("header block is never closed with '---'"));
    }
    if body.trim().is_empty() {
        return Err(NewsroomError::validation("article body is empty"));
    }

    let title = header
        .and_then(|h| front_matter_value(h, "title"))
        .filter(|t| !t.is_empty())
        .or_else(|| title.map(str::trim).filter(|t| !t.is_empty()).map(String::from))
        .or_else(|| leading_h1(body, 5))
        .ok_or_else(|| NewsroomError::validation("article has no title; pass --title"))?;
    Ok((title, body))
}

fn cmd_score(file: &std::path::Path, title: Option<&str>) -> Result<()> {
    let text = std::fs::read_to_string(file).map_err(|e| NewsroomError::io(file, e))?;
    let (title, body) = scoring_input(&text, title)?;

    let score = newsroom_quality::score(&title, body);
    println!("{}", newsroom_quality::format_report(&score));

    if !score.passed() {
        return Err(eyre!(
            "quality gate failed: {}/100 (threshold {})",
            score.total(),
            newsroom_quality::PASS_THRESHOLD
        ));
    }
    Ok(())
}

fn cmd_title(text: &str, max_len: Option<usize>) -> Result<()> {
    if text.trim().is_empty() {
        return Err(NewsroomError::validation("title text is empty").into());
    }
    let max_len = match max_len {
        Some(n) => n,
        None => load_config()?.pipeline.title_max_len,
    };

    let title = sanitize(text, max_len);
    println!("{title}");
    for issue in validate(&title) {
        eprintln!("  warning: {issue}");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// kb
// ---------------------------------------------------------------------------

fn cmd_kb_apply(
    file: Option<PathBuf>,
    dry_run: bool,
    max_age: Option<i64>,
    research_dir: Option<String>,
    kb_dir: Option<String>,
) -> Result<()> {
    let config = load_config()?;
    let options = ApplyOptions {
        research_dir: PathBuf::from(research_dir.unwrap_or(config.defaults.research_dir)),
        kb_dir: PathBuf::from(kb_dir.unwrap_or(config.defaults.kb_dir)),
        file,
        dry_run,
        max_age_days: max_age.unwrap_or(config.knowledge.max_age_days),
        max_recent_news: config.knowledge.max_recent_news,
    };

    info!(
        research_dir = %options.research_dir.display(),
        kb_dir = %options.kb_dir.display(),
        dry_run,
        "applying research batches"
    );

    let result = newsroom_core::apply_research(&options, now_jst().date_naive())?;

    println!();
    if result.files.is_empty() {
        println!("  No research batches found.");
    }
    for report in &result.files {
        let name = report
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("  {name}: {}", describe_outcome(&report.outcome));
    }
    let verb = if dry_run { "Would apply" } else { "Applied" };
    println!();
    println!(
        "  {verb} {} change(s) from {} batch(es)",
        result.changes(),
        result.applied()
    );
    println!();
    Ok(())
}

fn describe_outcome(outcome: &FileOutcome) -> String {
    match outcome {
        FileOutcome::Merged(BatchOutcome::Applied(report)) => format!(
            "{} change(s) (companies {}, market {}, benchmarks {}, added {})",
            report.total(),
            report.companies,
            report.market_sizes,
            report.benchmarks,
            report.added
        ),
        FileOutcome::Merged(BatchOutcome::NoChanges) => "already up to date".into(),
        FileOutcome::Merged(BatchOutcome::Empty) => "nothing to apply".into(),
        FileOutcome::Merged(BatchOutcome::Unreadable(reason)) => {
            format!("skipped, store unreadable ({reason})")
        }
        FileOutcome::Stale => "skipped, too old".into(),
        FileOutcome::AlreadyApplied => "skipped, already applied".into(),
        FileOutcome::Unreadable(reason) => format!("skipped, unreadable ({reason})"),
        FileOutcome::WriteFailed(reason) => format!("failed to save ({reason})"),
    }
}

fn cmd_kb_context(
    companies: Vec<String>,
    category: Option<&str>,
    kb_dir: Option<String>,
) -> Result<()> {
    let config = load_config()?;
    let kb_dir = PathBuf::from(kb_dir.unwrap_or(config.defaults.kb_dir));

    let options = match category {
        Some(raw) => {
            let category: Category = raw.parse()?;
            ContextOptions::for_article(category, &companies)
        }
        None => ContextOptions {
            company_ids: companies,
            ..ContextOptions::all()
        },
    };

    let snapshot = KnowledgeSnapshot::load(&KnowledgeStore::open_readonly(kb_dir));
    println!("{}", snapshot.prompt_context(&options));
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
