//! The individual checks, one function per dimension.
//!
//! Each function returns its sub-score and pushes one feedback item per
//! failed (or partially credited) check, in evaluation order.

use std::sync::LazyLock;

use regex::Regex;

use crate::lexicon::{self, CLICHES, ORGANIZATIONS, PRODUCTS};
use crate::{Feedback, FeedbackKind};

const FULL_LENGTH_CHARS: usize = 3000;
const PARTIAL_LENGTH_CHARS: usize = 2000;
const MIN_HEADINGS: usize = 3;
const TERMINAL_PUNCTUATION: &str = "。！？.!?";

const FULL_DATA_POINTS: usize = 5;
const PARTIAL_DATA_POINTS: usize = 3;
const MIN_ORGANIZATIONS: usize = 3;
const MIN_PRODUCTS: usize = 2;
const FULL_SOURCES: usize = 2;

const MIN_PARAGRAPHS: usize = 5;
const PARAGRAPH_BAND: (f64, f64) = (100.0, 400.0);
const MAX_BULLET_RATIO: f64 = 0.3;
const PARTIAL_CLICHES: usize = 2;

const FULL_QUESTIONS: usize = 2;
const MAX_INTRO_CHARS: usize = 150;

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid regex"))
        .collect()
}

fn count_matches(patterns: &[Regex], text: &str) -> usize {
    patterns.iter().map(|re| re.find_iter(text).count()).sum()
}

// ---------------------------------------------------------------------------
// Completeness
// ---------------------------------------------------------------------------

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{2,3}\s+.+").expect("valid regex"));

static CONCLUSION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?i)##\s*(まとめ|結論|おわりに|今後の展望|結び)",
        r"(?i)##\s*(Conclusion|Summary|Final)",
    ])
});

pub(crate) fn completeness(body: &str, feedback: &mut Vec<Feedback>) -> u32 {
    let mut score = 0;

    let chars = body.chars().count();
    if chars >= FULL_LENGTH_CHARS {
        score += 10;
    } else if chars >= PARTIAL_LENGTH_CHARS {
        score += 5;
        feedback.push(Feedback::new(
            FeedbackKind::BelowTargetLength,
            format!("Article is {chars} chars, aim for {FULL_LENGTH_CHARS}+"),
        ));
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::TooShort,
            format!("Article too short: {chars} chars (need {FULL_LENGTH_CHARS}+)"),
        ));
    }

    match body.trim_end().chars().last() {
        Some(c) if TERMINAL_PUNCTUATION.contains(c) => score += 5,
        _ => feedback.push(Feedback::new(
            FeedbackKind::MissingTerminalPunctuation,
            "Article doesn't end with proper punctuation",
        )),
    }

    let headings = HEADING_RE.find_iter(body).count();
    if headings >= MIN_HEADINGS {
        score += 5;
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::MissingHeadings,
            format!("Only {headings} headings (need {MIN_HEADINGS}+)"),
        ));
    }

    if CONCLUSION_PATTERNS.iter().any(|re| re.is_match(body)) {
        score += 5;
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::MissingConclusion,
            "Missing conclusion/summary section",
        ));
    }

    score
}

// ---------------------------------------------------------------------------
// Factual density
// ---------------------------------------------------------------------------

static NUMBER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\d+\.?\d*\s*[%％]",
        r"\$\d+[\d,.]*[BMK]?",
        r"\d+[\d,.]*\s*(億|兆|万)",
        r"\d{4}年",
        r"\d+\.?\d*\s*(倍|件|社|人|台)",
    ])
});

static SOURCE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"によると",
        r"によれば",
        r"発表した",
        r"報告して",
        r"調査では",
        r"レポート",
        r"(?i)according to",
        r"\d{4}年\d{1,2}月時点",
        r"（出典",
        r"出所[：:]",
    ])
});

pub(crate) fn factual_density(body: &str, feedback: &mut Vec<Feedback>) -> u32 {
    let mut score = 0;

    let data_points = count_matches(&NUMBER_PATTERNS, body);
    if data_points >= FULL_DATA_POINTS {
        score += 10;
    } else if data_points >= PARTIAL_DATA_POINTS {
        score += 5;
        feedback.push(Feedback::new(
            FeedbackKind::SomeDataPoints,
            format!("{data_points} data points found, aim for {FULL_DATA_POINTS}+"),
        ));
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::FewDataPoints,
            format!("Only {data_points} data points - add specific numbers, stats, market data"),
        ));
    }

    let organizations = lexicon::found_in(ORGANIZATIONS, body).len();
    if organizations >= MIN_ORGANIZATIONS {
        score += 5;
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::FewOrganizations,
            format!("Only {organizations} companies mentioned (need {MIN_ORGANIZATIONS}+)"),
        ));
    }

    let products = lexicon::found_in(PRODUCTS, body).len();
    if products >= MIN_PRODUCTS {
        score += 5;
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::FewProducts,
            format!("Only {products} products/models mentioned (need {MIN_PRODUCTS}+)"),
        ));
    }

    let sources = count_matches(&SOURCE_PATTERNS, body);
    if sources >= FULL_SOURCES {
        score += 5;
    } else if sources == 1 {
        score += 2;
        feedback.push(Feedback::new(
            FeedbackKind::FewSources,
            "Add more source attributions (e.g., 'Xによると', '2025年時点')",
        ));
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::NoSources,
            "No source attributions found - cite sources for credibility",
        ));
    }

    score
}

// ---------------------------------------------------------------------------
// Readability
// ---------------------------------------------------------------------------

static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-*][ \t]").expect("valid regex"));

/// Blank-line separated blocks that are not headings, trimmed.
fn paragraphs(body: &str) -> Vec<&str> {
    body.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty() && !p.starts_with('#'))
        .collect()
}

pub(crate) fn readability(body: &str, feedback: &mut Vec<Feedback>) -> u32 {
    let mut score = 0;

    let paras = paragraphs(body);
    if paras.len() >= MIN_PARAGRAPHS {
        score += 5;
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::FewParagraphs,
            format!("Only {} paragraphs (need {MIN_PARAGRAPHS}+)", paras.len()),
        ));
    }

    // No paragraphs at all reads as an average of zero.
    let avg = if paras.is_empty() {
        0.0
    } else {
        paras.iter().map(|p| p.chars().count()).sum::<usize>() as f64 / paras.len() as f64
    };
    let (low, high) = PARAGRAPH_BAND;
    if avg < low {
        feedback.push(Feedback::new(
            FeedbackKind::ParagraphsTooShort,
            format!("Paragraphs too short (avg {avg:.0} chars)"),
        ));
    } else if avg > high {
        feedback.push(Feedback::new(
            FeedbackKind::ParagraphsTooLong,
            format!("Paragraphs too long (avg {avg:.0} chars, aim for {low}-{high})"),
        ));
    } else {
        score += 5;
    }

    let bullets = BULLET_RE.find_iter(body).count();
    let lines = body.lines().filter(|l| !l.trim().is_empty()).count();
    let ratio = bullets as f64 / lines.max(1) as f64;
    if ratio <= MAX_BULLET_RATIO {
        score += 5;
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::TooManyBullets,
            format!("Too many bullet points ({:.0}% of content)", ratio * 100.0),
        ));
    }

    let cliches = lexicon::found_in(CLICHES, body);
    if cliches.is_empty() {
        score += 10;
    } else if cliches.len() <= PARTIAL_CLICHES {
        score += 5;
        feedback.push(Feedback::new(
            FeedbackKind::SomeCliches,
            format!("AI cliches found: {}", cliches.join(", ")),
        ));
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::ManyCliches,
            format!(
                "Multiple AI cliches ({}): {}",
                cliches.len(),
                cliches.iter().take(5).copied().collect::<Vec<_>>().join(", ")
            ),
        ));
    }

    score
}

// ---------------------------------------------------------------------------
// Engagement
// ---------------------------------------------------------------------------

static QUESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[？?]").expect("valid regex"));

static OPINION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"と考え[るられ]",
        r"ではないだろうか",
        r"と言える",
        r"注目すべき",
        r"興味深い",
        r"筆者は",
        r"私見では",
        r"個人的には",
        r"重要なのは",
        r"ポイントは",
    ])
});

static CURIOSITY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"[？?]",
        r"なぜ",
        r"どう",
        r"秘密",
        r"理由",
        r"方法",
        r"比較",
        r"vs\.?",
        r"徹底",
        r"\d+選",
        r"\d+つの",
    ])
});

pub(crate) fn engagement(title: &str, body: &str, feedback: &mut Vec<Feedback>) -> u32 {
    let mut score = 0;

    let questions = QUESTION_RE.find_iter(body).count();
    if questions >= FULL_QUESTIONS {
        score += 10;
    } else if questions == 1 {
        score += 5;
        feedback.push(Feedback::new(
            FeedbackKind::FewQuestions,
            "Add more rhetorical questions to engage readers",
        ));
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::NoQuestions,
            "No questions found - add rhetorical questions",
        ));
    }

    if OPINION_PATTERNS.iter().any(|re| re.is_match(body)) {
        score += 5;
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::NoOpinion,
            "Add editorial perspective or personal analysis",
        ));
    }

    let intro = body
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with('#'));
    match intro.map(|l| l.chars().count()) {
        Some(len) if len <= MAX_INTRO_CHARS => score += 5,
        Some(len) => feedback.push(Feedback::new(
            FeedbackKind::IntroTooLong,
            format!("Intro too long ({len} chars, aim for <={MAX_INTRO_CHARS})"),
        )),
        None => feedback.push(Feedback::new(
            FeedbackKind::MissingIntro,
            "No opening paragraph - start with a short hook",
        )),
    }

    if CURIOSITY_PATTERNS.iter().any(|re| re.is_match(title)) {
        score += 5;
    } else {
        feedback.push(Feedback::new(
            FeedbackKind::FlatTitle,
            "Title could be more curiosity-inducing",
        ));
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(f: impl Fn(&mut Vec<Feedback>) -> u32) -> (u32, Vec<FeedbackKind>) {
        let mut fb = Vec::new();
        let s = f(&mut fb);
        (s, fb.into_iter().map(|f| f.kind).collect())
    }

    #[test]
    fn length_tiers() {
        let (s, kinds) = run(|fb| completeness(&"あ".repeat(2500), fb));
        assert_eq!(s, 5);
        assert_eq!(kinds[0], FeedbackKind::BelowTargetLength);

        let mut body = "あ".repeat(3000);
        body.push('。');
        let (s, _) = run(|fb| completeness(&body, fb));
        assert_eq!(s, 15);
    }

    #[test]
    fn conclusion_heading_variants() {
        for heading in ["## まとめ", "### 今後の展望", "## Summary", "## conclusion"] {
            let (_, kinds) = run(|fb| completeness(heading, fb));
            assert!(!kinds.contains(&FeedbackKind::MissingConclusion), "{heading}");
        }
    }

    #[test]
    fn data_point_patterns() {
        let text = "売上は20%増、$3.5B、100億円、2024年、5社が参加";
        let (s, kinds) = run(|fb| factual_density(text, fb));
        assert_eq!(s, 10);
        assert!(!kinds.contains(&FeedbackKind::FewDataPoints));
        assert!(!kinds.contains(&FeedbackKind::SomeDataPoints));
    }

    #[test]
    fn source_tiers() {
        let (_, kinds) = run(|fb| factual_density("IDCによると", fb));
        assert!(kinds.contains(&FeedbackKind::FewSources));

        let (_, kinds) = run(|fb| factual_density("According to IDC, 2025年3月時点で", fb));
        assert!(!kinds.contains(&FeedbackKind::FewSources));
        assert!(!kinds.contains(&FeedbackKind::NoSources));
    }

    #[test]
    fn paragraph_band_penalizes_both_sides() {
        let short = vec!["短い。"; 6].join("\n\n");
        let (_, kinds) = run(|fb| readability(&short, fb));
        assert!(kinds.contains(&FeedbackKind::ParagraphsTooShort));

        let long = vec!["あ".repeat(450); 6].join("\n\n");
        let (_, kinds) = run(|fb| readability(&long, fb));
        assert!(kinds.contains(&FeedbackKind::ParagraphsTooLong));
    }

    #[test]
    fn bullet_heavy_text_penalized() {
        let body = "導入\n- a\n- b\n* c\n結論";
        let (_, kinds) = run(|fb| readability(body, fb));
        assert!(kinds.contains(&FeedbackKind::TooManyBullets));
    }

    #[test]
    fn cliche_tiers() {
        let (s, kinds) = run(|fb| readability("革命的な技術", fb));
        assert!(kinds.contains(&FeedbackKind::SomeCliches));
        assert!(s >= 5);

        let (_, kinds) = run(|fb| readability("革命的な画期的な前例のない", fb));
        assert!(kinds.contains(&FeedbackKind::ManyCliches));
    }

    #[test]
    fn engagement_checks() {
        let (s, kinds) = run(|fb| engagement("GPT-5とClaudeを徹底比較", "導入？\n\n本文？と言える", fb));
        assert_eq!(s, 25, "{kinds:?}");

        let long_intro = "あ".repeat(151);
        let (_, kinds) = run(|fb| engagement("普通のタイトル", &long_intro, fb));
        assert!(kinds.contains(&FeedbackKind::IntroTooLong));
        assert!(kinds.contains(&FeedbackKind::FlatTitle));
        assert!(kinds.contains(&FeedbackKind::NoQuestions));
        assert!(kinds.contains(&FeedbackKind::NoOpinion));
    }

    #[test]
    fn numbered_list_titles_count_as_curious() {
        for title in ["生成AIツール10選", "3つのポイント", "GPT vs. Claude"] {
            let (_, kinds) = run(|fb| engagement(title, "", fb));
            assert!(!kinds.contains(&FeedbackKind::FlatTitle), "{title}");
        }
    }
}
