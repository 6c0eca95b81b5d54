//! Stage 4: metadata derivation.
//!
//! Tags, slug and excerpt come from the service and are repaired locally.
//! Reading time and author are never requested.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use newsroom_markdown::{first_prose_line, take_chars, to_slug};
use newsroom_provider::GenerationRequest;
use newsroom_shared::{ArticleMetadata, Category};

use crate::personas::persona;
use crate::pipeline::RunContext;

const MIN_TAGS: usize = 3;
const MAX_TAGS: usize = 6;
const SLUG_MAX_CHARS: usize = 30;
const EXCERPT_MAX_CHARS: usize = 150;
const EXCERPT_FALLBACK_CHARS: usize = 120;
const PROMPT_BODY_CHARS: usize = 1000;

const CHARS_PER_MINUTE: usize = 500;
const MIN_READING_MINUTES: usize = 3;
const MAX_READING_MINUTES: usize = 15;

const TAG_CHOICES: &str = "技術: LLM, RAG, AIエージェント, マルチモーダル, 画像生成, 音声AI, 推論最適化, ファインチューニング
企業: OpenAI, Google, Microsoft, NVIDIA, Meta, Anthropic, Amazon, Apple, 日本企業, 中国AI
ビジネス: ROI分析, 導入ロードマップ, PoC設計, AI人材育成, AI規制対応, コスト削減, DX推進, AI投資";

fn metadata_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "tags": {"type": "ARRAY", "items": {"type": "STRING"}},
            "slug": {"type": "STRING"},
            "excerpt": {"type": "STRING"},
        },
        "required": ["tags", "slug", "excerpt"],
    })
}

pub fn metadata_prompt(title: &str, category: Category, body: &str) -> String {
    format!(
        "以下の記事のメタデータを生成してください。\n\n\
         【タイトル】{title}\n\
         【カテゴリ】{category}\n\
         【本文冒頭】{intro}\n\n\
         【タグ条件】3-6個、以下から選択:\n{TAG_CHOICES}\n\n\
         【slug条件】英語のURL用スラグ、30文字以内、ハイフン区切り（例: openai-gpt5-enterprise-impact）\n\n\
         【excerpt条件】記事の要約、80-120文字の日本語",
        intro = take_chars(body, PROMPT_BODY_CHARS),
    )
}

/// Minutes to read `body`: one per 500 characters plus one, within 3..=15.
pub fn reading_time(body: &str) -> u32 {
    let minutes = (body.chars().count() / CHARS_PER_MINUTE + 1)
        .clamp(MIN_READING_MINUTES, MAX_READING_MINUTES);
    minutes as u32
}

/// Restrict a slug to `[a-z0-9-]`, collapse hyphen runs, cap at 30 characters.
pub fn clean_slug(raw: &str) -> String {
    static DISALLOWED_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("valid regex"));
    static HYPHEN_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"-+").expect("valid regex"));

    let lowered = raw.trim().to_lowercase();
    let slug = DISALLOWED_RE.replace_all(&lowered, "");
    let slug = HYPHEN_RUN_RE.replace_all(&slug, "-");
    let slug: String = slug.trim_matches('-').chars().take(SLUG_MAX_CHARS).collect();
    slug.trim_end_matches('-').to_string()
}

fn fallback_slug(category: Category) -> String {
    format!("ai-{}", category.key())
}

/// Drop blanks, keep at most six, top up to three from `fallback`.
fn repair_tags(tags: impl IntoIterator<Item = String>, fallback: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
        if out.len() == MAX_TAGS {
            break;
        }
    }
    for extra in fallback {
        if out.len() >= MIN_TAGS {
            break;
        }
        if !out.iter().any(|t| t == extra) {
            out.push((*extra).to_string());
        }
    }
    out
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn excerpt_from_body(body: &str) -> String {
    first_prose_line(body)
        .map(|line| take_chars(line, EXCERPT_FALLBACK_CHARS))
        .unwrap_or_default()
}

fn assemble(
    category: Category,
    body: &str,
    tags: Vec<String>,
    slug: String,
    excerpt: String,
) -> ArticleMetadata {
    let persona = persona(category);
    ArticleMetadata {
        category,
        tags: repair_tags(tags, &persona.fallback_tags),
        slug,
        excerpt: take_chars(&single_line(&excerpt), EXCERPT_MAX_CHARS),
        author: persona.author.to_string(),
        reading_time: reading_time(body),
    }
}

/// Metadata from a usable structured response.
fn from_response(value: &Value, category: Category, body: &str) -> ArticleMetadata {
    let tags = value
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(Value::as_str).map(String::from).collect())
        .unwrap_or_default();

    let slug = value
        .get("slug")
        .and_then(Value::as_str)
        .map(clean_slug)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_slug(category));

    let excerpt = value
        .get("excerpt")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from)
        .unwrap_or_else(|| excerpt_from_body(body));

    assemble(category, body, tags, slug, excerpt)
}

/// Metadata built without the service.
fn local_fallback(title: &str, category: Category, body: &str) -> ArticleMetadata {
    let slug = Some(clean_slug(&to_slug(title, SLUG_MAX_CHARS * 4)))
        .filter(|s| !s.is_empty() && s != "article")
        .unwrap_or_else(|| fallback_slug(category));
    let tags = vec!["AI".to_string(), category.label().to_string()];
    assemble(category, body, tags, slug, take_chars(body, EXCERPT_FALLBACK_CHARS))
}

fn dry_run_metadata(category: Category, body: &str) -> ArticleMetadata {
    let tags = vec!["AI".to_string(), "LLM".to_string()];
    assemble(category, body, tags, "test-article".into(), "テスト記事の要約です。".into())
}

/// Derive header metadata for an article.
#[instrument(skip_all, fields(%category))]
pub async fn derive_metadata(
    ctx: &RunContext<'_>,
    title: &str,
    body: &str,
    category: Category,
) -> ArticleMetadata {
    let Some(service) = ctx.service else {
        return dry_run_metadata(category, body);
    };

    let prompt = metadata_prompt(title, category, body);
    let metadata = match service
        .generate(&GenerationRequest::json(prompt, metadata_schema()))
        .await
    {
        Ok(generated) => match generated.json.as_ref().filter(|v| v.is_object()) {
            Some(value) => from_response(value, category, body),
            None => {
                warn!(model = %generated.model, "metadata is not an object, using fallback");
                local_fallback(title, category, body)
            }
        },
        Err(e) => {
            warn!(error = %e, "metadata generation failed, using fallback");
            local_fallback(title, category, body)
        }
    };

    info!(
        tags = ?metadata.tags,
        slug = %metadata.slug,
        reading_time = metadata.reading_time,
        "metadata derived"
    );
    metadata
}
