//! Knowledge-base record store and merge engine.
//!
//! The knowledge base is a directory of YAML collections (companies, market
//! sizes, benchmarks, trends, pricing) plus a marker file recording the last
//! applied research batch. [`KnowledgeStore`] reads and writes collections,
//! [`MergeEngine`] folds a [`ResearchBatch`] into them idempotently, and
//! [`KnowledgeSnapshot`] renders the prompt context consumed by drafting.
//! Drafting also quotes recent research notes ([`find_research`]) and the
//! editors' Markdown rule library ([`ComplianceLibrary`]).
//!
//! **Access rules:** one writer at a time. Nothing here locks the directory.

pub mod batch;
mod compliance;
mod context;
mod engine;
pub mod merge;
pub mod records;
mod research;
mod store;

pub use batch::{KbAdditions, KbUpdates, ResearchBatch, batch_date, list_batches};
pub use compliance::ComplianceLibrary;
pub use context::{ContextOptions, KnowledgeSnapshot};
pub use engine::{BatchOutcome, MergeEngine};
pub use merge::MergeReport;
pub use records::{Benchmark, Benchmarks, Company, Marker, NewsItem, Product};
pub use research::{ResearchNotes, find_research};
pub use store::{KnowledgeStore, StoreError, WriteSet};
