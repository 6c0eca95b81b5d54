//! Article pipeline orchestration for Newsroom.
//!
//! Ties the generation service, the quality scorer and the knowledge base
//! together into end-to-end workflows:
//! - [`pipeline::run_batch`]: plan topics and take each through drafting,
//!   titling, metadata, the quality gate, writing and post-processing
//! - [`update::apply_research`]: merge research batches into the knowledge base

pub mod assembler;
pub mod draft;
pub mod gate;
pub mod headline;
pub mod metadata;
pub mod personas;
pub mod pipeline;
pub mod planning;
pub mod postprocess;
pub mod update;

#[cfg(test)]
mod scripted;

pub use gate::Verdict;
pub use pipeline::{
    ArticleReport, ArticleStatus, BatchResult, GenerateOptions, ProgressReporter, RunContext,
    SilentProgress, run_batch,
};
pub use update::{ApplyOptions, ApplyResult, FileOutcome, apply_research};
