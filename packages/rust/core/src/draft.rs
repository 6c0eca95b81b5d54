//! Stage 2: draft generation.

use tracing::{info, instrument, warn};

use newsroom_markdown::clean_draft;
use newsroom_provider::{GenerationRequest, GenerationService};
use newsroom_shared::Topic;

use crate::personas::persona;
use crate::pipeline::RunContext;

/// Body returned in a dry run.
pub const DRY_RUN_DRAFT: &str =
    "# テスト記事\n\nこれはテスト記事です。\n\n## セクション1\n\nテスト内容。";

const STYLE_RULES: &str = "【文体指示】
- やや丁寧だが堅すぎない、技術者として自然な語り口
- 体験ベースの語り（「〜を作った時に」「〜で気づいたのは」「実際にやってみると」）
- 短い文で注意を引き、長い文で詳しく説明するリズム
- 読者に直接話しかけるスタイル（「あなたも感じているかもしれませんが」「正直なところ」等）
- 読者への問いかけを2回以上含める
- 個人的見解や経験を体験ベースで含める（「知識で示す」スタイル）

【避けること】
- 「結論として」「留意すべき重要な点は」等の常套句
- 「予測されます」の多用
- 「大幅な改善」「革命的な」等の曖昧な表現
- 箇条書きの多用（全体の30%以下に）
- 「SIGGRAPH出展した私が〜」等の権威アピール
- 「15年の経験から言うと〜」等の経験マウント
- 煽り系マーケティング語（「知らないと損」等）

【必須条件】
- 3000-4000文字
- 参照データの数値は「〜によると」「〜年時点で」と出典明示
- 具体的な企業名・製品名・数値を含む
- 必ず完結させる（文章途中で終わらない）
- 最後は読者への問いかけで締める

【出力形式】Markdown形式の記事本文のみ（frontmatterなし）";

/// Reference block for the draft prompt: knowledge base, then research
/// notes, then compliance rules. Empty parts are left out.
pub fn reference_context(knowledge: &str, research: &str, compliance: &str) -> String {
    [knowledge, research, compliance]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn draft_prompt(topic: &Topic, preamble: Option<&str>, context: &str) -> String {
    let persona = persona(topic.category);
    format!(
        "{persona_text}\n\n{context}\n\n\
         【トピック】{seed}\n\
         【角度】{angle}\n\
         【カテゴリ】{category}\n\n\
         【記事構成】{structure}\n\n\
         {STYLE_RULES}",
        persona_text = persona.render(preamble),
        seed = topic.seed,
        angle = topic.angle,
        category = topic.category,
        structure = persona.structure,
    )
}

/// One attempt. `None` on failure or when nothing survives cleanup.
async fn attempt(
    service: &dyn GenerationService,
    request: &GenerationRequest,
    label: &str,
) -> Option<String> {
    let generated = match service.generate(request).await {
        Ok(generated) => generated,
        Err(e) => {
            warn!(error = %e, attempt = label, "draft request failed");
            return None;
        }
    };

    let body = clean_draft(&generated.text);
    if body.is_empty() {
        warn!(model = %generated.model, attempt = label, "draft empty after cleanup");
        return None;
    }
    info!(model = %generated.model, attempt = label, chars = body.chars().count(), "draft generated");
    Some(body)
}

/// Generate the body for `topic`.
///
/// Tries a search-augmented request first and a plain one second; an empty
/// draft counts as a failed attempt. `None` means both failed and the topic
/// should be skipped.
#[instrument(skip_all, fields(category = %topic.category, seed = %topic.seed))]
pub async fn write_draft(ctx: &RunContext<'_>, topic: &Topic, context: &str) -> Option<String> {
    let Some(service) = ctx.service else {
        return Some(DRY_RUN_DRAFT.to_string());
    };

    let prompt = draft_prompt(topic, ctx.settings.persona_preamble.as_deref(), context);
    let plain = GenerationRequest::text(prompt).with_max_output_tokens(ctx.settings.draft_max_tokens);

    if let Some(body) = attempt(service, &plain.clone().with_search(), "search").await {
        return Some(body);
    }
    let body = attempt(service, &plain, "plain").await;
    if body.is_none() {
        warn!("no usable draft, skipping topic");
    }
    body
}
