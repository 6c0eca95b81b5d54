//! Applying a whole research batch to the store.
//!
//! All target collections are read before anything is merged. If any of them
//! is unreadable the batch is a no-op. Only collections that changed are
//! rewritten, and the marker is updated only when the batch changed
//! something.

use serde_yaml::Mapping;
use tracing::{info, instrument, warn};

use newsroom_shared::now_jst;

use crate::batch::ResearchBatch;
use crate::merge::{
    MergeReport, add_benchmarks, add_companies, merge_benchmarks, merge_companies,
    merge_market_sizes,
};
use crate::records::{Benchmarks, Company};
use crate::store::{KnowledgeStore, StoreError};

/// What happened to one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Changes were merged (or would be, in a dry run).
    Applied(MergeReport),
    /// Everything in the batch was already in the store.
    NoChanges,
    /// The batch carries no updates or additions.
    Empty,
    /// The store or the batch could not be read; nothing was written.
    Unreadable(String),
}

impl BatchOutcome {
    pub fn changes(&self) -> usize {
        match self {
            BatchOutcome::Applied(report) => report.total(),
            _ => 0,
        }
    }
}

/// Merge engine bound to one store.
pub struct MergeEngine<'a> {
    store: &'a KnowledgeStore,
    max_recent_news: usize,
}

impl<'a> MergeEngine<'a> {
    pub fn new(store: &'a KnowledgeStore, max_recent_news: usize) -> Self {
        Self {
            store,
            max_recent_news,
        }
    }

    fn load_targets(&self) -> Result<(Vec<Company>, Mapping, Benchmarks), StoreError> {
        Ok((
            self.store.companies()?,
            self.store.market_sizes()?,
            self.store.benchmarks()?,
        ))
    }

    /// Merge `batch` into the store. With `dry_run`, changes are computed
    /// but nothing is written.
    #[instrument(skip_all, fields(source = %batch.source))]
    pub fn apply(&self, batch: &ResearchBatch, dry_run: bool) -> Result<BatchOutcome, StoreError> {
        if batch.is_empty() {
            return Ok(BatchOutcome::Empty);
        }

        let (mut companies, mut market, mut benchmarks) = match self.load_targets() {
            Ok(collections) => collections,
            Err(e) => {
                warn!(error = %e, "store unreadable, batch skipped");
                return Ok(BatchOutcome::Unreadable(e.to_string()));
            }
        };

        let added_companies = add_companies(&mut companies, &batch.additions.companies);
        let added_benchmarks = add_benchmarks(&mut benchmarks, &batch.additions.benchmarks);
        let report = MergeReport {
            companies: merge_companies(
                &mut companies,
                &batch.updates.companies,
                self.max_recent_news,
            ),
            market_sizes: merge_market_sizes(&mut market, &batch.updates.market_sizes),
            benchmarks: merge_benchmarks(&mut benchmarks, &batch.updates.benchmarks.llm_benchmarks),
            added: added_companies + added_benchmarks,
        };

        if report.total() == 0 {
            info!("batch already reflected in store");
            return Ok(BatchOutcome::NoChanges);
        }

        info!(
            companies = report.companies,
            market_sizes = report.market_sizes,
            benchmarks = report.benchmarks,
            added = report.added,
            dry_run,
            "batch merged"
        );

        if dry_run {
            return Ok(BatchOutcome::Applied(report));
        }

        // Everything lands together; the marker goes last so a batch is
        // never recorded without its changes.
        let mut writes = self.store.write_set()?;
        if report.companies > 0 || added_companies > 0 {
            writes.stage_companies(&companies)?;
        }
        if report.market_sizes > 0 {
            writes.stage_market_sizes(&market)?;
        }
        if report.benchmarks > 0 || added_benchmarks > 0 {
            writes.stage_benchmarks(&benchmarks)?;
        }

        // A broken marker is rebuilt rather than blocking the record.
        let mut marker = self.store.marker().unwrap_or_default();
        marker.last_research_applied = Some(now_jst().format("%Y-%m-%d %H:%M JST").to_string());
        marker.research_source = Some(batch.source.clone());
        marker.research_sha256 = Some(batch.sha256.clone());
        writes.stage_marker(&marker)?;
        writes.commit()?;

        Ok(BatchOutcome::Applied(report))
    }
}
