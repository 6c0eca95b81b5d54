//! Article assembly.
//!
//! Builds the header block, names the file, writes it atomically, and reads
//! titles back out of previously published articles.

use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, NaiveDate};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use newsroom_markdown::{front_matter_value, remove_first_h1, split_front_matter};
use newsroom_shared::{ArticleMetadata, NewsroomError, Result};

/// Newest files inspected when collecting recent titles.
const RECENT_SCAN_FILES: usize = 30;

/// Recent titles kept.
const RECENT_MAX_TITLES: usize = 15;

/// Numbers tried past the requested one before giving up on a name.
const MAX_NUMBER_BUMPS: usize = 100;

/// A finished article, ready to be written.
#[derive(Debug, Clone)]
pub struct Article {
    pub title: String,
    pub metadata: ArticleMetadata,
    pub body: String,
    pub published_at: DateTime<FixedOffset>,
}

/// Double-quoted header value.
fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn unquoted(value: &str) -> String {
    value.replace("\\\"", "\"").replace("\\\\", "\\")
}

/// Header block, fields in the order the site templates expect.
pub fn header_block(title: &str, metadata: &ArticleMetadata, at: DateTime<FixedOffset>) -> String {
    let tags = serde_json::to_string(&metadata.tags).unwrap_or_else(|_| "[]".to_string());
    [
        "---".to_string(),
        "layout: post".to_string(),
        format!("title: {}", quoted(title)),
        format!("date: {}", at.format("%Y-%m-%d %H:%M:%S %z")),
        format!("categories: [{}]", metadata.category),
        format!("tags: {tags}"),
        format!("author: {}", quoted(&metadata.author)),
        format!("excerpt: {}", quoted(&metadata.excerpt)),
        format!("reading_time: {}", metadata.reading_time),
        "---".to_string(),
    ]
    .join("\n")
}

/// Full file contents. The body's leading H1 is dropped; the title lives in
/// the header.
pub fn render(article: &Article) -> String {
    format!(
        "{}\n\n{}\n",
        header_block(&article.title, &article.metadata, article.published_at),
        remove_first_h1(&article.body)
    )
}

/// `{YYYY-MM-DD}-{n}-{slug}.md`
pub fn file_name(date: NaiveDate, n: usize, slug: &str) -> String {
    format!("{}-{n}-{slug}.md", date.format("%Y-%m-%d"))
}

/// Write `article` as number `n` of the day into `posts_dir`.
///
/// An existing article is never replaced: when the name is taken the
/// number is bumped until a free name is found. Returns the path written.
#[instrument(skip_all, fields(n, slug = %article.metadata.slug))]
pub fn write_article(posts_dir: &Path, n: usize, article: &Article) -> Result<PathBuf> {
    std::fs::create_dir_all(posts_dir).map_err(|e| NewsroomError::io(posts_dir, e))?;

    let date = article.published_at.date_naive();
    let temp = posts_dir.join(format!(".{}.{}.tmp", article.metadata.slug, Uuid::now_v7()));
    let contents = render(article);
    std::fs::write(&temp, &contents).map_err(|e| NewsroomError::io(&temp, e))?;

    // Linking fails on an existing name, so the claim is atomic.
    let mut claimed = None;
    let mut last_err = None;
    for number in n..n + MAX_NUMBER_BUMPS {
        let target = posts_dir.join(file_name(date, number, &article.metadata.slug));
        match std::fs::hard_link(&temp, &target) {
            Ok(()) => {
                claimed = Some(target);
                break;
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!(path = %target.display(), "article name taken");
                last_err = Some(NewsroomError::io(&target, e));
            }
            Err(e) => {
                last_err = Some(NewsroomError::io(&target, e));
                break;
            }
        }
    }
    std::fs::remove_file(&temp).ok();

    let Some(target) = claimed else {
        return Err(last_err.unwrap_or_else(|| {
            NewsroomError::io(posts_dir, std::io::ErrorKind::AlreadyExists.into())
        }));
    };
    info!(path = %target.display(), chars = contents.chars().count(), "article written");
    Ok(target)
}

/// Title from an article's header block.
pub fn read_title(text: &str) -> Option<String> {
    let (header, _) = split_front_matter(text);
    front_matter_value(header?, "title")
        .map(|t| unquoted(&t))
        .filter(|t| !t.is_empty())
}

fn article_date(path: &Path) -> Option<NaiveDate> {
    let name = path.file_name()?.to_str()?;
    NaiveDate::parse_from_str(name.get(..10)?, "%Y-%m-%d").ok()
}

/// Titles of articles published within `days` of `today`, newest first.
///
/// Only the newest files by name are inspected. A missing directory or an
/// unreadable file just contributes nothing.
pub fn recent_titles(posts_dir: &Path, today: NaiveDate, days: i64) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(posts_dir) else {
        debug!(dir = %posts_dir.display(), "no posts directory");
        return Vec::new();
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect();
    paths.sort_by(|a, b| b.cmp(a));

    paths
        .iter()
        .take(RECENT_SCAN_FILES)
        .filter(|p| article_date(p).is_some_and(|d| (today - d).num_days() <= days))
        .filter_map(|p| match std::fs::read_to_string(p) {
            Ok(text) => read_title(&text),
            Err(e) => {
                debug!(path = %p.display(), error = %e, "skipping unreadable article");
                None
            }
        })
        .take(RECENT_MAX_TITLES)
        .collect()
}
