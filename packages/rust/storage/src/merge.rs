//! Idempotent merge of proposed updates into record collections.
//!
//! Every function mutates the collection in place and returns the number of
//! changes it made. Applying the same input twice reports zero the second
//! time. Fields absent from an update are never touched, and records that no
//! update references are never touched.

use std::collections::HashSet;

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::records::{Benchmark, Benchmarks, Company, is_present};

// ---------------------------------------------------------------------------
// Change report
// ---------------------------------------------------------------------------

/// Per-collection change counts for one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub companies: usize,
    pub market_sizes: usize,
    pub benchmarks: usize,
    /// Records created through the explicit additions path.
    pub added: usize,
}

impl MergeReport {
    pub fn total(&self) -> usize {
        self.companies + self.market_sizes + self.benchmarks + self.added
    }
}

// ---------------------------------------------------------------------------
// Companies
// ---------------------------------------------------------------------------

/// Merge company updates keyed by `id`. Unknown ids are ignored.
///
/// Several updates for the same id in one batch are folded together first,
/// later values winning.
pub fn merge_companies(existing: &mut [Company], updates: &[Company], max_recent_news: usize) -> usize {
    let mut changes = 0;
    for update in coalesce_companies(updates) {
        let Some(company) = existing.iter_mut().find(|c| c.id == update.id) else {
            debug!(id = %update.id, "no company with this id, update ignored");
            continue;
        };
        changes += merge_company(company, &update, max_recent_news);
    }
    changes
}

fn coalesce_companies(updates: &[Company]) -> Vec<Company> {
    let mut out: Vec<Company> = Vec::new();
    for update in updates.iter().filter(|u| !u.id.is_empty()) {
        match out.iter_mut().find(|c| c.id == update.id) {
            Some(acc) => {
                merge_company(acc, update, usize::MAX);
            }
            None => out.push(update.clone()),
        }
    }
    out
}

fn merge_company(company: &mut Company, update: &Company, max_recent_news: usize) -> usize {
    let mut changes = 0;

    // New headlines go on top as a block, keeping the update's own order.
    // Only the newest `max_recent_news` proposed items are considered.
    let mut seen: HashSet<&str> = company
        .recent_news
        .iter()
        .map(|n| n.headline.as_str())
        .collect();
    let fresh: Vec<_> = update
        .recent_news
        .iter()
        .take(max_recent_news)
        .filter(|n| !n.headline.is_empty() && seen.insert(n.headline.as_str()))
        .cloned()
        .collect();
    if !fresh.is_empty() {
        changes += fresh.len();
        company.recent_news.splice(0..0, fresh);
        company.recent_news.truncate(max_recent_news);
    }

    changes += overwrite(&mut company.valuation_usd, &update.valuation_usd);
    changes += overwrite(&mut company.revenue_annual_usd, &update.revenue_annual_usd);
    if let Some(name) = &update.name {
        if company.name.as_ref() != Some(name) {
            company.name = Some(name.clone());
            changes += 1;
        }
    }
    changes += overwrite_scalars(&mut company.extra, &update.extra);

    for product in &update.key_products {
        if product.name.is_empty() || company.key_products.iter().any(|p| p.name == product.name) {
            continue;
        }
        company.key_products.push(product.clone());
        changes += 1;
    }

    for partner in &update.partnerships {
        if !company.partnerships.contains(partner) {
            company.partnerships.push(partner.clone());
            changes += 1;
        }
    }

    changes
}

/// Overwrite `slot` with a present, different `proposed` value.
fn overwrite(slot: &mut Option<Value>, proposed: &Option<Value>) -> usize {
    if is_present(proposed) && slot != proposed {
        slot.clone_from(proposed);
        1
    } else {
        0
    }
}

/// Overwrite scalar fields of `target` from `source`. Nested values are left
/// to the typed fields.
fn overwrite_scalars(target: &mut Mapping, source: &Mapping) -> usize {
    let mut changes = 0;
    for (key, value) in source {
        if value.is_null() || value.is_sequence() || value.is_mapping() {
            continue;
        }
        if target.get(key) != Some(value) {
            target.insert(key.clone(), value.clone());
            changes += 1;
        }
    }
    changes
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Merge aggregate figures keyed by bucket path.
///
/// For a bucket whose update is a mapping, only the keys present in the
/// update are written; sibling keys stay as they are. Any other value
/// replaces the bucket when it differs.
pub fn merge_market_sizes(existing: &mut Mapping, updates: &Mapping) -> usize {
    let mut changes = 0;
    for (bucket, update) in updates {
        if update.is_null() {
            continue;
        }
        match update {
            Value::Mapping(fields) => {
                if !existing.get(bucket).is_some_and(Value::is_mapping) {
                    existing.insert(bucket.clone(), Value::Mapping(Mapping::new()));
                }
                let Some(Value::Mapping(target)) = existing.get_mut(bucket) else {
                    continue;
                };
                for (key, value) in fields {
                    if !value.is_null() && target.get(key) != Some(value) {
                        target.insert(key.clone(), value.clone());
                        changes += 1;
                    }
                }
            }
            other => {
                if existing.get(bucket) != Some(other) {
                    existing.insert(bucket.clone(), other.clone());
                    changes += 1;
                }
            }
        }
    }
    changes
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Merge benchmark rows keyed by `model`. Unknown models are ignored.
pub fn merge_benchmarks(existing: &mut Benchmarks, updates: &[Benchmark]) -> usize {
    let mut changes = 0;
    for update in coalesce_benchmarks(updates) {
        let Some(row) = existing
            .llm_benchmarks
            .iter_mut()
            .find(|b| b.model == update.model)
        else {
            debug!(model = %update.model, "no benchmark row for this model, update ignored");
            continue;
        };
        changes += merge_scores(row, &update);
    }
    changes
}

fn merge_scores(row: &mut Benchmark, update: &Benchmark) -> usize {
    row.scores_mut()
        .into_iter()
        .zip(update.scores())
        .map(|((_, slot), proposed)| overwrite(slot, proposed))
        .sum()
}

fn coalesce_benchmarks(updates: &[Benchmark]) -> Vec<Benchmark> {
    let mut out: Vec<Benchmark> = Vec::new();
    for update in updates.iter().filter(|u| !u.model.is_empty()) {
        match out.iter_mut().find(|b| b.model == update.model) {
            Some(acc) => {
                merge_scores(acc, update);
            }
            None => out.push(update.clone()),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Explicit creation path
// ---------------------------------------------------------------------------

/// Insert companies whose id is not yet present. Existing ids are left alone.
pub fn add_companies(existing: &mut Vec<Company>, additions: &[Company]) -> usize {
    let mut added = 0;
    for company in additions {
        if company.id.is_empty() || existing.iter().any(|c| c.id == company.id) {
            continue;
        }
        existing.push(company.clone());
        added += 1;
    }
    added
}

/// Insert benchmark rows whose model is not yet present.
pub fn add_benchmarks(existing: &mut Benchmarks, additions: &[Benchmark]) -> usize {
    let mut added = 0;
    for row in additions {
        if row.model.is_empty() || existing.llm_benchmarks.iter().any(|b| b.model == row.model) {
            continue;
        }
        existing.llm_benchmarks.push(row.clone());
        added += 1;
    }
    added
}
