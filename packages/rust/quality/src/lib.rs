//! Heuristic quality scoring for generated articles.
//!
//! [`score`] grades a `(title, body)` pair on four independent dimensions,
//! each worth up to [`DIMENSION_MAX`] points, and passes it when the total
//! reaches [`PASS_THRESHOLD`]. Every failed check contributes exactly one
//! [`Feedback`] item. The function is pure: no I/O, no clock, no randomness.

mod checks;
pub mod lexicon;
pub mod revision;

use std::fmt;

use serde::Serialize;

pub use revision::{format_report, improvement_prompt, revision_instructions};

/// Minimum total for a pass.
pub const PASS_THRESHOLD: u32 = 60;

/// Ceiling of each dimension's sub-score.
pub const DIMENSION_MAX: u32 = 25;

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

/// The four scoring dimensions, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Completeness,
    FactualDensity,
    Readability,
    Engagement,
}

impl Dimension {
    /// Short tag used in feedback strings.
    pub fn tag(self) -> &'static str {
        match self {
            Dimension::Completeness => "completeness",
            Dimension::FactualDensity => "factual",
            Dimension::Readability => "readability",
            Dimension::Engagement => "engagement",
        }
    }
}

/// Which check failed. Each kind belongs to exactly one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    /// Below the partial-credit length tier.
    TooShort,
    /// Partial-credit length tier.
    BelowTargetLength,
    MissingTerminalPunctuation,
    MissingHeadings,
    MissingConclusion,
    /// Fewer than the partial-credit number of data points.
    FewDataPoints,
    /// Partial credit for data points.
    SomeDataPoints,
    FewOrganizations,
    FewProducts,
    NoSources,
    /// A single source attribution.
    FewSources,
    FewParagraphs,
    ParagraphsTooShort,
    ParagraphsTooLong,
    TooManyBullets,
    /// One or two cliché phrases.
    SomeCliches,
    /// Three or more cliché phrases.
    ManyCliches,
    NoQuestions,
    FewQuestions,
    NoOpinion,
    IntroTooLong,
    MissingIntro,
    FlatTitle,
}

impl FeedbackKind {
    pub fn dimension(self) -> Dimension {
        use FeedbackKind::*;
        match self {
            TooShort | BelowTargetLength | MissingTerminalPunctuation | MissingHeadings
            | MissingConclusion => Dimension::Completeness,
            FewDataPoints | SomeDataPoints | FewOrganizations | FewProducts | NoSources
            | FewSources => Dimension::FactualDensity,
            FewParagraphs | ParagraphsTooShort | ParagraphsTooLong | TooManyBullets
            | SomeCliches | ManyCliches => Dimension::Readability,
            NoQuestions | FewQuestions | NoOpinion | IntroTooLong | MissingIntro | FlatTitle => {
                Dimension::Engagement
            }
        }
    }
}

/// One diagnosed problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub message: String,
}

impl Feedback {
    pub(crate) fn new(kind: FeedbackKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.kind.dimension()
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.dimension().tag(), self.message)
    }
}

// ---------------------------------------------------------------------------
// Score
// ---------------------------------------------------------------------------

/// An immutable grading result. Construct with [`score`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Score {
    completeness: u32,
    factual_density: u32,
    readability: u32,
    engagement: u32,
    total: u32,
    passed: bool,
    feedback: Vec<Feedback>,
}

impl Score {
    pub fn completeness(&self) -> u32 {
        self.completeness
    }

    pub fn factual_density(&self) -> u32 {
        self.factual_density
    }

    pub fn readability(&self) -> u32 {
        self.readability
    }

    pub fn engagement(&self) -> u32 {
        self.engagement
    }

    /// Sum of the four sub-scores.
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Feedback in evaluation order.
    pub fn feedback(&self) -> &[Feedback] {
        &self.feedback
    }

    pub fn has(&self, kind: FeedbackKind) -> bool {
        self.feedback.iter().any(|f| f.kind == kind)
    }
}

/// Grade an article.
pub fn score(title: &str, body: &str) -> Score {
    let mut feedback = Vec::new();

    let completeness = checks::completeness(body, &mut feedback);
    let factual_density = checks::factual_density(body, &mut feedback);
    let readability = checks::readability(body, &mut feedback);
    let engagement = checks::engagement(title, body, &mut feedback);

    let total = completeness + factual_density + readability + engagement;

    Score {
        completeness,
        factual_density,
        readability,
        engagement,
        total,
        passed: total >= PASS_THRESHOLD,
        feedback,
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Article bodies with known scores.

    /// `seed` padded with filler to exactly `len` characters, ending in `。`.
    pub fn para(seed: &str, len: usize) -> String {
        let used = seed.chars().count() + 1;
        format!("{seed}{}。", "あ".repeat(len.saturating_sub(used)))
    }

    /// A long, well-structured article: 4 headings ending in a conclusion,
    /// 5 data points, 3 organizations, 2+ products, 1 attribution,
    /// 9 paragraphs, 2 bullet lines, 3 questions, 1 opinion marker,
    /// a 120-character opening.
    pub fn strong_article() -> String {
        let sections = [
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
        ];
        sections.join("\n\n")
    }

    pub const STRONG_TITLE: &str = "なぜ企業はRAGを選ぶのか";

    /// A figure-free article: 3,500 characters in 4 sections ending in a
    /// conclusion, 3 organizations, 2 products, 1 attribution, 6 paragraphs
    /// averaging 200 characters, 2 bullet lines out of 40, 3 questions,
    /// 1 opinion marker, a 120-character opening.
    pub fn figure_free_article() -> String {
        let lines = |n: usize| (0..n).map(|_| para("", 78)).collect::<Vec<_>>();
        let section = |heading: &str, lines: Vec<String>| format!("{heading}\n{}", lines.join("\n"));

        let mut practice = lines(5);
        practice.push("- 検証環境の整備".into());
        practice.push("- 評価指標の設計".into());
        let mut wrap_up = lines(8);
        wrap_up.push(para("", 101));

        [
            para("生成AIの導入は本当に進んでいるのでしょうか？", 120),
            section("## 背景", lines(7)),
            para("OpenAIとGoogleとNVIDIAの動きを整理します", 216),
            section("## 現場の課題", lines(7)),
            para("GeminiとClaudeはどちらを選ぶべきでしょうか？", 216),
            section("## 導入の実際", practice),
            para("調査会社によると導入企業は増えています", 216),
            para("個人的には運用体制が鍵だと見ています", 216),
            section("## まとめ", wrap_up),
            para("次の一手はどこに打つべきでしょうか？", 216),
        ]
        .join("\n\n")
    }

    /// The strong article with headings dropped, cut to 1,200 characters.
    pub fn truncated_article() -> String {
        let without_headings: Vec<String> = strong_article()
            .split("\n\n")
            .filter(|block| !block.starts_with('#'))
            .map(String::from)
            .collect();
        without_headings.join("\n\n").chars().take(1200).collect()
    }
}
