//! End-to-end `generate` pipeline: plan → draft → title → metadata → gate → write → post-process.
//!
//! Stages run strictly in order for one topic at a time. A topic whose draft
//! cannot be generated is skipped without writing anything; every other
//! stage degrades to fallback values. No single topic can abort the batch.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use tracing::{error, info, instrument, warn};

use newsroom_provider::GenerationService;
use newsroom_shared::{PipelineSettings, Topic, now_jst};
use newsroom_storage::{
    ComplianceLibrary, ContextOptions, KnowledgeSnapshot, KnowledgeStore, find_research,
};

use crate::assembler::{Article, file_name, recent_titles, write_article};
use crate::draft::{reference_context, write_draft};
use crate::gate::{Verdict, quality_gate};
use crate::headline::choose_title;
use crate::metadata::derive_metadata;
use crate::planning::plan_topics;
use crate::postprocess::{StepReport, post_process};

// ---------------------------------------------------------------------------
// Run context
// ---------------------------------------------------------------------------

/// What every stage sees.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    /// `None` in a dry run: stages produce placeholder output without
    /// calling out, and nothing is written.
    pub service: Option<&'a dyn GenerationService>,
    pub settings: &'a PipelineSettings,
}

impl<'a> RunContext<'a> {
    pub fn live(service: &'a dyn GenerationService, settings: &'a PipelineSettings) -> Self {
        Self {
            service: Some(service),
            settings,
        }
    }

    pub fn dry_run(settings: &'a PipelineSettings) -> Self {
        Self {
            service: None,
            settings,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.service.is_none()
    }
}

// ---------------------------------------------------------------------------
// Options & results
// ---------------------------------------------------------------------------

/// Configuration for one `generate` run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Number of topics to plan.
    pub articles: usize,
    /// Skip post-process steps marked as enrichment.
    pub skip_enrichment: bool,
    pub posts_dir: PathBuf,
    pub kb_dir: PathBuf,
    /// Research notes quoted in drafts.
    pub research_dir: PathBuf,
    /// Markdown compliance and tool library.
    pub knowledge_dir: PathBuf,
    /// Research notes older than this are ignored.
    pub research_lookup_days: i64,
}

#[derive(Debug, Clone)]
pub enum ArticleStatus {
    /// Written to disk.
    Published {
        path: PathBuf,
        verdict: Verdict,
        steps: Vec<StepReport>,
    },
    /// Dry run: where it would have been written.
    Previewed { path: PathBuf, verdict: Verdict },
    /// Nothing persisted for this topic.
    Skipped { reason: String },
}

#[derive(Debug, Clone)]
pub struct ArticleReport {
    /// 1-based position in the batch.
    pub n: usize,
    pub topic: Topic,
    pub title: Option<String>,
    pub status: ArticleStatus,
}

impl ArticleReport {
    pub fn verdict(&self) -> Option<Verdict> {
        match &self.status {
            ArticleStatus::Published { verdict, .. } | ArticleStatus::Previewed { verdict, .. } => {
                Some(*verdict)
            }
            ArticleStatus::Skipped { .. } => None,
        }
    }
}

/// Result of a `generate` run.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub articles: Vec<ArticleReport>,
    pub elapsed: Duration,
}

impl BatchResult {
    /// Articles published (or previewed, in a dry run).
    pub fn produced(&self) -> usize {
        self.articles.iter().filter(|a| a.verdict().is_some()).count()
    }

    /// Produced articles that stayed below the quality threshold.
    pub fn below_threshold(&self) -> usize {
        self.articles
            .iter()
            .filter(|a| a.verdict() == Some(Verdict::FailedPublished))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before the first stage of each article.
    fn article_started(&self, n: usize, total: usize, topic: &Topic);
    /// Called once an article is written, previewed or skipped.
    fn article_finished(&self, report: &ArticleReport);
    /// Called when the batch completes.
    fn done(&self, result: &BatchResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn article_started(&self, _n: usize, _total: usize, _topic: &Topic) {}
    fn article_finished(&self, _report: &ArticleReport) {}
    fn done(&self, _result: &BatchResult) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full pipeline for `options.articles` topics.
#[instrument(skip_all, fields(articles = options.articles, dry_run = ctx.is_dry_run()))]
pub async fn run_batch(
    ctx: &RunContext<'_>,
    options: &GenerateOptions,
    progress: &dyn ProgressReporter,
) -> BatchResult {
    let start = Instant::now();
    let today = now_jst().date_naive();

    progress.phase("Loading knowledge base");
    let snapshot = KnowledgeSnapshot::load(&KnowledgeStore::open_readonly(&options.kb_dir));
    let recent = recent_titles(&options.posts_dir, today, ctx.settings.recent_title_days);
    info!(recent = recent.len(), "recent titles collected");

    progress.phase("Planning topics");
    let topics = plan_topics(ctx, options.articles, today, &recent, &snapshot.trends_context()).await;

    let total = topics.len();
    let mut articles = Vec::with_capacity(total);
    for (i, topic) in topics.into_iter().enumerate() {
        let n = i + 1;
        progress.article_started(n, total, &topic);
        let report = run_article(ctx, options, &snapshot, today, n, topic).await;
        progress.article_finished(&report);
        articles.push(report);
    }

    let result = BatchResult {
        articles,
        elapsed: start.elapsed(),
    };
    info!(
        produced = result.produced(),
        planned = total,
        below_threshold = result.below_threshold(),
        elapsed_ms = result.elapsed.as_millis() as u64,
        "batch complete"
    );
    progress.done(&result);
    result
}

/// Stages 2 to 6 for one topic.
#[instrument(skip_all, fields(n, category = %topic.category))]
async fn run_article(
    ctx: &RunContext<'_>,
    options: &GenerateOptions,
    snapshot: &KnowledgeSnapshot,
    today: NaiveDate,
    n: usize,
    topic: Topic,
) -> ArticleReport {
    let knowledge = snapshot.prompt_context(&ContextOptions::for_article(topic.category, &topic.entities));
    let research = find_research(&options.research_dir, &topic, today, options.research_lookup_days)
        .map(|notes| notes.prompt_context())
        .unwrap_or_default();
    let compliance = ComplianceLibrary::open(&options.knowledge_dir)
        .article_context(topic.category, &topic.entities);
    let context = reference_context(&knowledge, &research, &compliance);

    let Some(body) = write_draft(ctx, &topic, &context).await else {
        return ArticleReport {
            n,
            topic,
            title: None,
            status: ArticleStatus::Skipped {
                reason: "draft generation failed".into(),
            },
        };
    };

    let title = choose_title(ctx, &topic, &body).await;
    let metadata = derive_metadata(ctx, &title, &body, topic.category).await;
    let gate = quality_gate(ctx, &title, body).await;
    if !gate.verdict.passed() {
        warn!(total = gate.final_total, %title, "publishing below quality threshold");
    }

    let article = Article {
        title: title.clone(),
        metadata,
        body: gate.body,
        published_at: now_jst(),
    };

    let status = if ctx.is_dry_run() {
        let name = file_name(article.published_at.date_naive(), n, &article.metadata.slug);
        let path = options.posts_dir.join(name);
        info!(path = %path.display(), "dry run, not writing");
        ArticleStatus::Previewed {
            path,
            verdict: gate.verdict,
        }
    } else {
        match write_article(&options.posts_dir, n, &article) {
            Ok(path) => {
                let steps =
                    post_process(&ctx.settings.post_process, &path, options.skip_enrichment).await;
                ArticleStatus::Published {
                    path,
                    verdict: gate.verdict,
                    steps,
                }
            }
            Err(e) => {
                error!(error = %e, "could not write article");
                ArticleStatus::Skipped {
                    reason: e.to_string(),
                }
            }
        }
    };

    ArticleReport {
        n,
        topic,
        title: Some(title),
        status,
    }
}
