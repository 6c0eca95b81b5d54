//! Pre-research notes for drafting.
//!
//! Research files double as notes for the writer: besides the knowledge-base
//! sections they may carry `topic`, `facts`, `statistics`, `companies` and
//! `quotes`. Drafting picks the best recent file for a topic and quotes it
//! in the prompt.

use std::path::Path;

use chrono::NaiveDate;
use serde_yaml::Value;
use tracing::{debug, info};

use newsroom_shared::Topic;

use crate::batch::{batch_date, list_batches};
use crate::records::field_text;

const RESEARCH_HEADER: &str = "【事前リサーチ結果（検証済みデータ）】";
const RESEARCH_INSTRUCTIONS: &str = "【指示】上記リサーチデータを積極的に引用すること。出典を明示すること。";

const MAX_FACTS: usize = 10;
const MAX_STATISTICS: usize = 8;
const MAX_COMPANIES: usize = 5;
const MAX_QUOTES: usize = 3;

const SLUG_WORD_SCORE: usize = 10;
const KEYWORD_SCORE: usize = 20;
const RECENCY_DAYS: i64 = 7;

/// One research file chosen for a topic.
#[derive(Debug, Clone)]
pub struct ResearchNotes {
    /// File name the notes came from.
    pub source: String,
    pub date: NaiveDate,
    pub score: usize,
    data: Value,
}

/// Find the research file that best fits `topic`.
///
/// Only dated files at most `max_age_days` old are considered. A file is a
/// candidate when its slug names one of the topic's entities or its `topic`
/// field mentions the seed or an entity; newer files get a small bonus.
/// Ties go to the newest file. Unreadable files are skipped.
pub fn find_research(
    dir: &Path,
    topic: &Topic,
    today: NaiveDate,
    max_age_days: i64,
) -> Option<ResearchNotes> {
    let paths = match list_batches(dir) {
        Ok(paths) => paths,
        Err(e) => {
            debug!(error = %e, "research directory unreadable");
            return None;
        }
    };

    let keywords: Vec<String> = std::iter::once(&topic.seed)
        .chain(&topic.entities)
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    let entities: Vec<String> = topic.entities.iter().map(|e| e.to_lowercase()).collect();

    let mut best: Option<ResearchNotes> = None;
    for path in paths.iter().rev() {
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(date) = batch_date(&source) else {
            continue;
        };
        let age = (today - date).num_days();
        if age > max_age_days {
            continue;
        }

        let data = match std::fs::read_to_string(path)
            .ok()
            .and_then(|text| serde_yaml::from_str::<Value>(&text).ok())
        {
            Some(data) => data,
            None => {
                debug!(%source, "skipping unreadable research file");
                continue;
            }
        };

        let relevance = slug_score(&source, &entities) + keyword_score(&data, &keywords);
        if relevance == 0 {
            continue;
        }
        let score = relevance + (RECENCY_DAYS - age.max(0)).max(0) as usize;
        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(ResearchNotes {
                source,
                date,
                score,
                data,
            });
        }
    }

    if let Some(notes) = &best {
        info!(source = %notes.source, score = notes.score, "research notes found");
    }
    best
}

/// Entity ids that appear as whole words of the file slug.
fn slug_score(source: &str, entities: &[String]) -> usize {
    let slug = source
        .get(11..)
        .unwrap_or_default()
        .trim_end_matches(".yml")
        .to_lowercase();
    let words: Vec<&str> = slug.split('-').collect();
    entities
        .iter()
        .filter(|e| words.contains(&e.as_str()))
        .count()
        * SLUG_WORD_SCORE
}

fn keyword_score(data: &Value, keywords: &[String]) -> usize {
    let topic = field_text(data, "topic").to_lowercase();
    if topic.is_empty() {
        return 0;
    }
    keywords.iter().filter(|k| topic.contains(k.as_str())).count() * KEYWORD_SCORE
}

fn items<'a>(data: &'a Value, key: &str) -> &'a [Value] {
    data.get(key)
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// `", {date}"`, or nothing when the entry carries no date.
fn dated(entry: &Value) -> String {
    match field_text(entry, "date") {
        date if date.is_empty() => String::new(),
        date => format!(", {date}"),
    }
}

fn or_unknown(text: String) -> String {
    if text.is_empty() { "不明".into() } else { text }
}

impl ResearchNotes {
    /// Prompt block quoting the notes. Empty when nothing quotable is present.
    pub fn prompt_context(&self) -> String {
        let mut lines = vec![RESEARCH_HEADER.to_string()];

        let facts: Vec<&Value> = items(&self.data, "facts")
            .iter()
            .filter(|f| matches!(field_text(f, "confidence").as_str(), "high" | "medium"))
            .take(MAX_FACTS)
            .collect();
        if !facts.is_empty() {
            lines.push("■ 検証済みファクト:".into());
            for fact in facts {
                lines.push(format!(
                    "  - {}（出典: {}{}）",
                    field_text(fact, "claim"),
                    or_unknown(field_text(fact, "source_name")),
                    dated(fact)
                ));
            }
        }

        let statistics = items(&self.data, "statistics");
        if !statistics.is_empty() {
            lines.push("■ 統計データ:".into());
            for stat in statistics.iter().take(MAX_STATISTICS) {
                lines.push(format!(
                    "  - {}: {}（{}{}）",
                    field_text(stat, "metric"),
                    field_text(stat, "value"),
                    or_unknown(field_text(stat, "source")),
                    dated(stat)
                ));
            }
        }

        let companies = items(&self.data, "companies");
        if !companies.is_empty() {
            lines.push("■ 企業最新情報:".into());
            for company in companies.iter().take(MAX_COMPANIES) {
                let mut line = format!("  - {}", field_text(company, "name"));
                let news = field_text(company, "latest_news");
                if !news.is_empty() {
                    line.push_str(&format!(": {news}"));
                }
                let numbers = field_text(company, "key_numbers");
                if !numbers.is_empty() {
                    line.push_str(&format!("（{numbers}）"));
                }
                lines.push(line);
            }
        }

        let quotes = items(&self.data, "quotes");
        if !quotes.is_empty() {
            lines.push("■ 注目発言:".into());
            for quote in quotes.iter().take(MAX_QUOTES) {
                lines.push(format!(
                    "  - 「{}」- {}",
                    field_text(quote, "text"),
                    or_unknown(field_text(quote, "speaker"))
                ));
            }
        }

        if lines.len() == 1 {
            return String::new();
        }
        lines.push(String::new());
        lines.push(RESEARCH_INSTRUCTIONS.to_string());
        lines.join("\n")
    }
}
