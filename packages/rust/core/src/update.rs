//! Research-batch runner: keeps the knowledge base current.
//!
//! Batches are applied one at a time, in file-name order, each independently
//! of the others. In directory mode batches older than the age limit are
//! skipped; a single explicitly named file is always considered. A batch
//! whose content hash matches the marker has already been applied and is
//! skipped without reading the store.

use std::path::PathBuf;

use chrono::NaiveDate;
use tracing::{info, instrument, warn};

use newsroom_shared::Result;
use newsroom_storage::{BatchOutcome, KnowledgeStore, MergeEngine, ResearchBatch, list_batches};

// ---------------------------------------------------------------------------
// Options & results
// ---------------------------------------------------------------------------

/// Configuration for one `kb apply` run.
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub research_dir: PathBuf,
    pub kb_dir: PathBuf,
    /// Apply only this batch, regardless of its age.
    pub file: Option<PathBuf>,
    /// Compute changes without writing.
    pub dry_run: bool,
    pub max_age_days: i64,
    pub max_recent_news: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Merged(BatchOutcome),
    /// Older than the age limit.
    Stale,
    /// Hash matches the last applied batch.
    AlreadyApplied,
    /// The batch file itself could not be read or parsed.
    Unreadable(String),
    /// The merge ran but saving it failed.
    WriteFailed(String),
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: FileOutcome,
}

/// Result of a `kb apply` run.
#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub files: Vec<FileReport>,
    pub dry_run: bool,
}

impl ApplyResult {
    /// Total record changes across all batches.
    pub fn changes(&self) -> usize {
        self.files
            .iter()
            .map(|f| match &f.outcome {
                FileOutcome::Merged(outcome) => outcome.changes(),
                _ => 0,
            })
            .sum()
    }

    /// Batches that changed something.
    pub fn applied(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, FileOutcome::Merged(BatchOutcome::Applied(_))))
            .count()
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Apply pending research batches as of `today`.
///
/// Only listing the research directory can fail the whole run; every
/// per-batch problem is recorded in its [`FileReport`].
#[instrument(skip_all, fields(dry_run = options.dry_run))]
pub fn apply_research(options: &ApplyOptions, today: NaiveDate) -> Result<ApplyResult> {
    let (paths, check_age) = match &options.file {
        Some(file) => (vec![file.clone()], false),
        None => (list_batches(&options.research_dir)?, true),
    };

    let store = if options.dry_run {
        KnowledgeStore::open_readonly(&options.kb_dir)
    } else {
        KnowledgeStore::open(&options.kb_dir)
    };
    let engine = MergeEngine::new(&store, options.max_recent_news);

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let outcome = apply_one(&store, &engine, &path, check_age, options, today);
        files.push(FileReport { path, outcome });
    }

    let result = ApplyResult {
        files,
        dry_run: options.dry_run,
    };
    info!(
        batches = result.files.len(),
        applied = result.applied(),
        changes = result.changes(),
        "research apply complete"
    );
    Ok(result)
}

fn apply_one(
    store: &KnowledgeStore,
    engine: &MergeEngine<'_>,
    path: &std::path::Path,
    check_age: bool,
    options: &ApplyOptions,
    today: NaiveDate,
) -> FileOutcome {
    let batch = match ResearchBatch::load(path) {
        Ok(batch) => batch,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping unreadable batch");
            return FileOutcome::Unreadable(e.to_string());
        }
    };

    if check_age && batch.is_stale(today, options.max_age_days) {
        info!(source = %batch.source, max_age_days = options.max_age_days, "skipping stale batch");
        return FileOutcome::Stale;
    }

    let last_hash = store.marker().ok().and_then(|m| m.research_sha256);
    if last_hash.as_deref() == Some(batch.sha256.as_str()) {
        info!(source = %batch.source, "batch already applied");
        return FileOutcome::AlreadyApplied;
    }

    match engine.apply(&batch, options.dry_run) {
        Ok(outcome) => FileOutcome::Merged(outcome),
        Err(e) => {
            warn!(source = %batch.source, error = %e, "could not save merged batch");
            FileOutcome::WriteFailed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use uuid::Uuid;

    const COMPANIES: &str = "- id: openai\n  name: OpenAI\n";

    fn news_batch(headline: &str) -> String {
        format!(
            "kb_updates:\n  companies:\n    - id: openai\n      recent_news:\n        - {{date: '2025-06-01', headline: {headline}}}\n"
        )
    }

    fn setup() -> (PathBuf, ApplyOptions) {
        let dir = std::env::temp_dir().join(format!("nr-update-{}", Uuid::now_v7()));
        let kb = dir.join("market");
        let research = dir.join("research");
        std::fs::create_dir_all(&kb).unwrap();
        std::fs::create_dir_all(&research).unwrap();
        std::fs::write(kb.join("companies.yml"), COMPANIES).unwrap();
        let options = ApplyOptions {
            research_dir: research,
            kb_dir: kb,
            file: None,
            dry_run: false,
            max_age_days: 3,
            max_recent_news: 5,
        };
        (dir, options)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    fn headlines(kb: &Path) -> Vec<String> {
        KnowledgeStore::open_readonly(kb).companies().unwrap()[0]
            .recent_news
            .iter()
            .map(|n| n.headline.clone())
            .collect()
    }

    #[test]
    fn directory_mode_skips_stale_and_unreadable() {
        let (dir, options) = setup();
        let research = &options.research_dir;
        std::fs::write(research.join("2025-05-20-old.yml"), news_batch("old news")).unwrap();
        std::fs::write(research.join("2025-06-01-bad.yml"), "kb_updates: [oops").unwrap();
        std::fs::write(research.join("2025-06-02-new.yml"), news_batch("fresh news")).unwrap();

        let result = apply_research(&options, today()).unwrap();
        let outcomes: Vec<&FileOutcome> = result.files.iter().map(|f| &f.outcome).collect();
        assert_eq!(outcomes[0], &FileOutcome::Stale);
        assert!(matches!(outcomes[1], FileOutcome::Unreadable(_)));
        assert_eq!(result.applied(), 1);
        assert_eq!(result.changes(), 1);
        assert_eq!(headlines(&options.kb_dir), ["fresh news"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rerun_is_skipped_by_hash() {
        let (dir, options) = setup();
        std::fs::write(options.research_dir.join("2025-06-02-a.yml"), news_batch("X announced Y"))
            .unwrap();

        assert_eq!(apply_research(&options, today()).unwrap().changes(), 1);
        let second = apply_research(&options, today()).unwrap();
        assert_eq!(second.files[0].outcome, FileOutcome::AlreadyApplied);
        assert_eq!(headlines(&options.kb_dir), ["X announced Y"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn same_facts_in_a_new_batch_change_nothing() {
        let (dir, options) = setup();
        let research = &options.research_dir;
        std::fs::write(research.join("2025-06-01-a.yml"), news_batch("X announced Y")).unwrap();
        std::fs::write(
            research.join("2025-06-02-b.yml"),
            format!("# follow-up\n{}", news_batch("X announced Y")),
        )
        .unwrap();

        let result = apply_research(&options, today()).unwrap();
        assert_eq!(result.applied(), 1);
        assert_eq!(
            result.files[1].outcome,
            FileOutcome::Merged(BatchOutcome::NoChanges)
        );
        assert_eq!(headlines(&options.kb_dir), ["X announced Y"]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn explicit_file_ignores_age() {
        let (dir, mut options) = setup();
        let path = options.research_dir.join("2025-01-01-archive.yml");
        std::fs::write(&path, news_batch("archived")).unwrap();
        options.file = Some(path);

        let result = apply_research(&options, today()).unwrap();
        assert_eq!(result.applied(), 1);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn dry_run_leaves_store_untouched() {
        let (dir, mut options) = setup();
        std::fs::write(options.research_dir.join("2025-06-02-a.yml"), news_batch("preview")).unwrap();
        options.dry_run = true;

        let result = apply_research(&options, today()).unwrap();
        assert!(result.dry_run);
        assert_eq!(result.changes(), 1);
        assert!(headlines(&options.kb_dir).is_empty());
        assert_eq!(
            std::fs::read_to_string(options.kb_dir.join("companies.yml")).unwrap(),
            COMPANIES
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_research_dir_is_empty_run() {
        let (dir, mut options) = setup();
        options.research_dir = dir.join("nowhere");
        let result = apply_research(&options, today()).unwrap();
        assert!(result.files.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }
}
