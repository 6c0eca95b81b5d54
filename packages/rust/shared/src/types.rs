//! Core domain types for Newsroom articles.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NewsroomError;

/// Offset of Japan Standard Time from UTC, in seconds.
const JST_OFFSET_SECS: i32 = 9 * 3600;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The fixed set of article categories.
///
/// Serialized as the display label, which is also what appears in the
/// article header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "AI最新ニュース")]
    LatestNews,
    #[serde(rename = "AI技術ガイド")]
    TechGuide,
    #[serde(rename = "AI導入戦略")]
    AdoptionStrategy,
    #[serde(rename = "業界別AI活用")]
    IndustryUseCases,
    #[serde(rename = "導入事例")]
    CaseStudies,
    #[serde(rename = "研究論文")]
    ResearchPapers,
}

impl Category {
    /// Every category in declaration order.
    pub const ALL: [Category; 6] = [
        Category::LatestNews,
        Category::TechGuide,
        Category::AdoptionStrategy,
        Category::IndustryUseCases,
        Category::CaseStudies,
        Category::ResearchPapers,
    ];

    /// Display label used in prompts and the article header.
    pub fn label(self) -> &'static str {
        match self {
            Category::LatestNews => "AI最新ニュース",
            Category::TechGuide => "AI技術ガイド",
            Category::AdoptionStrategy => "AI導入戦略",
            Category::IndustryUseCases => "業界別AI活用",
            Category::CaseStudies => "導入事例",
            Category::ResearchPapers => "研究論文",
        }
    }

    /// ASCII key, used for fallback slugs.
    pub fn key(self) -> &'static str {
        match self {
            Category::LatestNews => "latest-news",
            Category::TechGuide => "tech-guide",
            Category::AdoptionStrategy => "adoption-strategy",
            Category::IndustryUseCases => "industry",
            Category::CaseStudies => "case-study",
            Category::ResearchPapers => "research",
        }
    }

    /// Exact label match.
    pub fn from_label(label: &str) -> Option<Category> {
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    /// Map a free-form category string onto the fixed set.
    ///
    /// Tries an exact label match first, then a substring match in either
    /// direction (`"技術ガイド"` resolves to [`Category::TechGuide`]).
    /// Blank input never matches.
    pub fn resolve(raw: &str) -> Option<Category> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        Self::from_label(raw).or_else(|| {
            Self::ALL
                .into_iter()
                .find(|c| c.label().contains(raw) || raw.contains(c.label()))
        })
    }
}

impl FromStr for Category {
    type Err = NewsroomError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::resolve(raw).ok_or_else(|| {
            NewsroomError::validation(format!("category '{}' is not recognized", raw.trim()))
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// A planned unit of work produced by topic planning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Working title the article grows from.
    pub seed: String,
    /// Category, always one of the fixed set.
    pub category: Category,
    /// Short description of the angle the article takes.
    pub angle: String,
    /// Knowledge-base entity ids the article is expected to reference.
    #[serde(default)]
    pub entities: Vec<String>,
}

// ---------------------------------------------------------------------------
// ArticleMetadata
// ---------------------------------------------------------------------------

/// Everything in the article header block apart from the title and date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleMetadata {
    pub category: Category,
    /// Ordered tags, 3 to 6 entries.
    pub tags: Vec<String>,
    /// URL-safe slug (`[a-z0-9-]`).
    pub slug: String,
    pub excerpt: String,
    pub author: String,
    /// Estimated reading time in minutes.
    pub reading_time: u32,
}

// ---------------------------------------------------------------------------
// Time helpers
// ---------------------------------------------------------------------------

/// The Japan Standard Time offset.
pub fn jst() -> FixedOffset {
    // 9 hours is always within the valid offset range.
    FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Current wall-clock time in JST.
pub fn now_jst() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&jst())
}
