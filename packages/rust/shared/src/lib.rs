//! Shared types, error model, and configuration for Newsroom.
//!
//! This crate is the foundation depended on by all other Newsroom crates.
//! It provides:
//! - [`NewsroomError`], the unified error type
//! - Domain types ([`Category`], [`Topic`], [`ArticleMetadata`])
//! - Configuration ([`AppConfig`], config loading, API key resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, GeminiConfig, KnowledgeConfig, PipelineSettings, PostProcessStep,
    config_dir, config_file_path, init_config, load_config, load_config_from, resolve_api_keys,
};
pub use error::{NewsroomError, Result};
pub use types::{ArticleMetadata, Category, Topic, jst, now_jst};
