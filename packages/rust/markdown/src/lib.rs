//! Text utilities for generated articles.
//!
//! - [`title`]: sanitation, truncation, slugs and validation of titles
//! - [`cleanup`]: passes applied to generated bodies, plus header-block helpers

pub mod cleanup;
pub mod title;

pub use cleanup::{
    clean_draft, first_prose_line, front_matter_value, leading_h1, remove_first_h1,
    split_front_matter, strip_end_markers, take_chars,
};
pub use title::{TitleIssue, is_boundary, normalize, sanitize, smart_truncate, to_slug, validate};
