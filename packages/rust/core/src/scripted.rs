//! In-memory generation service that replays a fixed script of replies.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use newsroom_provider::{GenerationError, GenerationRequest, GenerationService, Generated};

pub(crate) enum Reply {
    Text(String),
    Json(Value),
    Fail,
}

pub(crate) fn text(s: impl Into<String>) -> Reply {
    Reply::Text(s.into())
}

pub(crate) fn json(v: Value) -> Reply {
    Reply::Json(v)
}

/// Replies are consumed in order. Once the script runs out every call fails.
pub(crate) struct ScriptedService {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedService {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generated, GenerationError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(text)) => Ok(Generated {
                model: "scripted".into(),
                text,
                json: None,
            }),
            Some(Reply::Json(value)) => Ok(Generated {
                model: "scripted".into(),
                text: value.to_string(),
                json: Some(value),
            }),
            Some(Reply::Fail) | None => Err(GenerationError::Exhausted { attempts: 1 }),
        }
    }
}

// ---------------------------------------------------------------------------
// Article fixtures
// ---------------------------------------------------------------------------

pub(crate) const STRONG_TITLE: &str = "なぜ企業はRAGを選ぶのか";

/// `seed` padded with filler to exactly `len` characters, ending in `。`.
fn para(seed: &str, len: usize) -> String {
    let used = seed.chars().count() + 1;
    format!("{seed}{}。", "あ".repeat(len.saturating_sub(used)))
}

/// A body that clears the quality gate comfortably.
pub(crate) fn strong_article() -> String {
    [
        para("生成AIの導入は本当に進んでいるのでしょうか？", 120),
        "## 背景".to_string(),
        para("まず前提となる状況を整理します", 380),
        para("現場の声を集めると課題が見えてきます", 380),
        "## 市場の動き".to_string(),
        para("2025年の市場は前年比30%伸びました", 380),
        para("投資額は$157Bに達し国内でも1.5兆円規模です", 380),
        "## 導入の実際".to_string(),
        format!(
            "{}\n- 検証環境の整備\n- 評価指標の設計",
            para("OpenAIとGoogleとNVIDIAの動きを見てみましょう？", 380)
        ),
        para("GPT-4oとGeminiを比較すると処理性能は3倍です", 380),
        "## まとめ".to_string(),
        para("調査会社によると導入企業は増えています", 380),
        para("次の一手が重要になると考えられる理由は何でしょうか？", 380),
    ]
    .join("\n\n")
}

/// The strong body without headings, cut to 1,200 characters. Fails the gate
/// but scores well above a one-line body.
pub(crate) fn truncated_article() -> String {
    let blocks: Vec<String> = strong_article()
        .split("\n\n")
        .filter(|block| !block.starts_with('#'))
        .map(String::from)
        .collect();
    blocks.join("\n\n").chars().take(1200).collect()
}
