//! Stage 3: title optimization.

use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use newsroom_markdown::{leading_h1, sanitize, take_chars, validate};
use newsroom_provider::GenerationRequest;
use newsroom_shared::Topic;

use crate::pipeline::RunContext;

/// Last-resort title when nothing else survives sanitation.
pub const FALLBACK_TITLE: &str = "AI最新動向の分析";

const DRY_RUN_TITLE: &str = "テスト記事タイトル";

/// Lines searched for a heading the draft may have started with.
const HEADING_SCAN_LINES: usize = 5;

const INTRO_CHARS: usize = 500;

fn title_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "titles": {"type": "ARRAY", "items": {"type": "STRING"}},
            "best_index": {"type": "INTEGER"},
        },
        "required": ["titles", "best_index"],
    })
}

pub fn title_prompt(seed: &str, body_title: &str, intro: &str) -> String {
    format!(
        "以下の記事に最適なタイトルを3案生成してください。\n\n\
         【仮タイトル】{seed}\n\
         【本文から抽出したタイトル】{body_title}\n\
         【記事冒頭】{intro}\n\n\
         【タイトル条件】\n\
         - 25-40文字\n\
         - 好奇心を刺激する（「その真意は？」「何が変わるのか？」型）\n\
         - 煽り文句禁止（【衝撃】【速報】等）\n\
         - Markdown記号禁止（**, ##, []() 等）\n\
         - 必ず完全な文として終わる（途中で切れない）\n\
         - 具体的な企業名や数値を含むと良い\n\n\
         3案をtitles配列で返し、best_indexで最も良いもののインデックス(0始まり)を指定。"
    )
}

/// The candidate named by `best_index`, or the first one when the index is
/// missing or out of range.
fn pick_candidate(value: &Value) -> Option<&str> {
    let titles = value.get("titles")?.as_array()?;
    let index = value
        .get("best_index")
        .and_then(Value::as_u64)
        .map(|i| i as usize)
        .filter(|&i| i < titles.len())
        .unwrap_or(0);
    titles.get(index)?.as_str()
}

/// First candidate that is still non-empty after sanitation.
fn first_usable<'a>(candidates: impl IntoIterator<Item = &'a str>, max_len: usize) -> String {
    candidates
        .into_iter()
        .map(|c| sanitize(c, max_len))
        .find(|t| !t.is_empty())
        .unwrap_or_else(|| sanitize(FALLBACK_TITLE, max_len))
}

/// Choose the article title.
#[instrument(skip_all, fields(seed = %topic.seed))]
pub async fn choose_title(ctx: &RunContext<'_>, topic: &Topic, body: &str) -> String {
    let max_len = ctx.settings.title_max_len;

    let Some(service) = ctx.service else {
        let seed = Some(topic.seed.as_str()).filter(|s| !s.trim().is_empty());
        return first_usable(seed.or(Some(DRY_RUN_TITLE)), max_len);
    };

    let body_title = leading_h1(body, HEADING_SCAN_LINES).unwrap_or_default();
    let prompt = title_prompt(&topic.seed, &body_title, &take_chars(body, INTRO_CHARS));

    let chosen = match service
        .generate(&GenerationRequest::json(prompt, title_schema()))
        .await
    {
        Ok(generated) => generated
            .json
            .as_ref()
            .and_then(pick_candidate)
            .map(|raw| sanitize(raw, max_len))
            .filter(|t| !t.is_empty()),
        Err(e) => {
            warn!(error = %e, "title generation failed, using fallback");
            None
        }
    };

    let title = chosen.unwrap_or_else(|| {
        first_usable([body_title.as_str(), topic.seed.as_str()], max_len)
    });

    for issue in validate(&title) {
        debug!(%issue, "title check");
    }
    info!(%title, chars = title.chars().count(), "title chosen");
    title
}
