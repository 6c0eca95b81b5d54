//! Title sanitation: markup stripping, hype removal and boundary-aware truncation.
//!
//! All lengths are counted in characters, never bytes, so multi-byte titles
//! are never split inside a code point.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Titles shorter than this are flagged by [`validate`].
const MIN_TITLE_CHARS: usize = 5;

/// Titles longer than this are flagged by [`validate`].
const MAX_TITLE_CHARS: usize = 60;

/// Fraction of `max_len` where the backward boundary search stops.
const SEARCH_WINDOW_FLOOR: f64 = 0.7;

/// Closing punctuation: the preferred place to cut.
const STRONG_BREAKS: &str = "。、！？：；）」』】〕》〉｝},.!?:;)";

/// Particles and connectives: acceptable when no strong break is in reach.
const SOFT_BREAKS: &str = "のがをはにでとも・";

/// Characters trimmed from both ends after whitespace collapsing.
const DECORATIVE_EDGES: &[char] = &[' ', '\t', '\n', '\r', '\u{3000}', '-', '_', '='];

// ---------------------------------------------------------------------------
// Pattern tables
// ---------------------------------------------------------------------------

/// Markup decorations, applied in order; inner content is kept.
static MARKUP_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\*\*(.+?)\*\*", "$1"),
        (r"\*(.+?)\*", "$1"),
        (r"__(.+?)__", "$1"),
        (r"_(.+?)_", "$1"),
        (r"~~(.+?)~~", "$1"),
        (r"`(.+?)`", "$1"),
        (r"\[(.+?)\]\(.+?\)", "$1"),
        (r"(?m)^#{1,6}\s*", ""),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
    .collect()
});

/// Unpaired markup tokens that survive the ordered pass (`****`, a lone backtick).
static RESIDUAL_MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\*\*|__|~~|`)+").expect("valid regex"));

/// Hype tags and punctuation runs.
static HYPE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"【衝撃】",
        r"【速報】",
        r"【緊急】",
        r"【驚愕】",
        r"【悲報】",
        r"【朗報】",
        r"【注目】",
        r"【必見】",
        r"【最新】",
        r"【重要】",
        r"【話題】",
        r"【炎上】",
        r"！{2,}",
        r"!{2,}",
        r"？{2,}",
        r"\?{2,}",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid regex"))
    .collect()
});

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

// ---------------------------------------------------------------------------
// Sanitize
// ---------------------------------------------------------------------------

/// Full sanitation pipeline: normalize, then truncate to `max_len` characters.
pub fn sanitize(text: &str, max_len: usize) -> String {
    smart_truncate(&normalize(text), max_len)
}

/// Everything [`sanitize`] does except truncation.
pub fn normalize(text: &str) -> String {
    let mut result = text.trim().to_string();

    // Dropping a hype run can join two halves of a markup token ("~!!~"),
    // so alternate both passes until neither changes anything. Markup goes
    // last, and every round that continues has removed characters.
    loop {
        let next = strip_markup(&strip_hype(&result));
        if next == result {
            break;
        }
        result = next;
    }

    collapse_whitespace(&result)
}

fn strip_markup(text: &str) -> String {
    let mut result = text.to_string();
    for (re, replacement) in MARKUP_PATTERNS.iter() {
        result = re.replace_all(&result, *replacement).into_owned();
    }
    // Removing a token can splice two halves into a new one ("_**_"), so
    // repeat until nothing matches. Each round strictly shrinks the string.
    while RESIDUAL_MARKUP_RE.is_match(&result) {
        result = RESIDUAL_MARKUP_RE.replace_all(&result, "").into_owned();
    }
    result.trim().to_string()
}

fn strip_hype(text: &str) -> String {
    let mut result = text.to_string();
    for re in HYPE_PATTERNS.iter() {
        result = re.replace_all(&result, "").into_owned();
    }
    result.trim().to_string()
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE
        .replace_all(text, " ")
        .trim_matches(DECORATIVE_EDGES)
        .to_string()
}

// ---------------------------------------------------------------------------
// Truncation
// ---------------------------------------------------------------------------

/// Cut `text` to at most `max_len` characters, preferring a natural boundary.
///
/// Searches backward from `max_len` to `0.7 × max_len` for closing
/// punctuation, then the same window for a particle, and cuts just after the
/// first hit. With no boundary in the window the text is hard-cut and
/// trailing whitespace trimmed.
pub fn smart_truncate(text: &str, max_len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_len {
        return text.to_string();
    }
    if max_len == 0 {
        return String::new();
    }

    let floor = (max_len as f64 * SEARCH_WINDOW_FLOOR).floor() as usize;
    let window = || (floor..max_len).rev();

    let cut = window()
        .find(|&i| STRONG_BREAKS.contains(chars[i]))
        .or_else(|| window().find(|&i| SOFT_BREAKS.contains(chars[i])))
        .map(|i| i + 1);

    match cut {
        Some(end) => chars[..end].iter().collect(),
        None => chars[..max_len]
            .iter()
            .collect::<String>()
            .trim_end()
            .to_string(),
    }
}

/// Whether `c` counts as a truncation boundary (strong or soft).
pub fn is_boundary(c: char) -> bool {
    STRONG_BREAKS.contains(c) || SOFT_BREAKS.contains(c)
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

/// Build a URL path segment from a title.
///
/// Word characters (including non-ASCII letters) are kept, punctuation
/// dropped, whitespace and underscores become hyphens. Over-long slugs are
/// cut back to the last whole hyphen-separated word. Empty results fall back
/// to `"article"`.
pub fn to_slug(text: &str, max_len: usize) -> String {
    static NON_WORD_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));
    static SEPARATOR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\s_]+").expect("valid regex"));
    static HYPHEN_RUN_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"-+").expect("valid regex"));

    let lowered = text.to_lowercase();
    let slug = NON_WORD_RE.replace_all(&lowered, "");
    let slug = SEPARATOR_RE.replace_all(&slug, "-");
    let slug = HYPHEN_RUN_RE.replace_all(&slug, "-");
    let mut slug = slug.trim_matches('-').to_string();

    if slug.chars().count() > max_len {
        let cut: String = slug.chars().take(max_len).collect();
        slug = match cut.rsplit_once('-') {
            Some((head, _)) => head.to_string(),
            None => cut,
        };
    }

    if slug.is_empty() {
        "article".to_string()
    } else {
        slug
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A problem found in a (usually already sanitized) title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleIssue {
    Empty,
    TooShort { chars: usize },
    TooLong { chars: usize },
    ResidualMarkup,
    BracketDecoration,
    /// Ends in an ellipsis, the usual sign of an upstream cut.
    Truncated,
    /// Replacement character anywhere, or `?` in the last three characters.
    EncodingCorruption,
}

impl fmt::Display for TitleIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitleIssue::Empty => write!(f, "Title is empty"),
            TitleIssue::TooShort { .. } => {
                write!(f, "Title too short (< {MIN_TITLE_CHARS} chars)")
            }
            TitleIssue::TooLong { chars } => {
                write!(f, "Title too long ({chars} chars, max {MAX_TITLE_CHARS})")
            }
            TitleIssue::ResidualMarkup => write!(f, "Contains Markdown formatting"),
            TitleIssue::BracketDecoration => write!(f, "Contains bracket decorations"),
            TitleIssue::Truncated => write!(f, "Appears truncated"),
            TitleIssue::EncodingCorruption => write!(f, "Possible encoding corruption"),
        }
    }
}

/// Check a title for leftovers of generation and truncation.
///
/// An empty title reports only [`TitleIssue::Empty`].
pub fn validate(title: &str) -> Vec<TitleIssue> {
    static MARKUP_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\*\*|__|~~|`").expect("valid regex"));
    static BRACKET_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"【.+?】").expect("valid regex"));

    if title.is_empty() {
        return vec![TitleIssue::Empty];
    }

    let chars = title.chars().count();
    let mut issues = Vec::new();

    if chars < MIN_TITLE_CHARS {
        issues.push(TitleIssue::TooShort { chars });
    }
    if chars > MAX_TITLE_CHARS {
        issues.push(TitleIssue::TooLong { chars });
    }
    if MARKUP_RE.is_match(title) {
        issues.push(TitleIssue::ResidualMarkup);
    }
    if BRACKET_RE.is_match(title) {
        issues.push(TitleIssue::BracketDecoration);
    }
    if title.ends_with("...") || title.ends_with('…') {
        issues.push(TitleIssue::Truncated);
    }

    let tail: String = title.chars().skip(chars.saturating_sub(3)).collect();
    if title.contains('\u{FFFD}') || tail.contains('?') {
        issues.push(TitleIssue::EncodingCorruption);
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- normalize ---

    #[test]
    fn strips_markup_keeping_content() {
        assert_eq!(normalize("**GPT-5**の衝撃"), "GPT-5の衝撃");
        assert_eq!(normalize("## `RAG`入門"), "RAG入門");
        assert_eq!(normalize("[Gemini](https://example.com)徹底比較"), "Gemini徹底比較");
        assert_eq!(normalize("~~旧~~新モデル"), "旧新モデル");
    }

    #[test]
    fn unpaired_markup_is_removed() {
        assert_eq!(normalize("****"), "");
        assert_eq!(normalize("LLM`入門"), "LLM入門");
        assert_eq!(normalize("a_**_b"), "ab");
    }

    #[test]
    fn strips_hype_decorations() {
        assert_eq!(normalize("【速報】OpenAIが新モデル発表！！"), "OpenAIが新モデル発表");
        assert_eq!(normalize("本当に使える？？？"), "本当に使える");
        assert_eq!(normalize("【注目】【必見】生成AI"), "生成AI");
    }

    #[test]
    fn hype_removal_cannot_leave_markup_behind() {
        assert_eq!(normalize("AI~!!~X"), "AIX");
        assert_eq!(normalize("GPU`？？`比較"), "GPU比較");
        assert_eq!(normalize("*！！*新モデル"), "新モデル");
        let title = sanitize("AI~!!~X", 45);
        assert!(!title.contains("~~"));
        assert!(!validate(&title).contains(&TitleIssue::ResidualMarkup));
    }

    #[test]
    fn collapses_whitespace_and_trims_edges() {
        assert_eq!(normalize("  AI　 導入   の  壁 -- "), "AI 導入 の 壁");
        assert_eq!(normalize("==タイトル=="), "タイトル");
    }

    // --- smart_truncate ---

    #[test]
    fn short_text_untouched() {
        assert_eq!(smart_truncate("短いタイトル", 45), "短いタイトル");
    }

    #[test]
    fn cuts_after_strong_boundary_in_window() {
        // 10 chars allowed, window is indices 7..=9.
        let text = "あいうえおかき。くけこさしす";
        assert_eq!(smart_truncate(text, 10), "あいうえおかき。");
    }

    #[test]
    fn prefers_strong_over_nearer_soft_boundary() {
        // Soft break at index 9, strong at index 7.
        let text = "あいうえおかき、くのこさしす";
        assert_eq!(smart_truncate(text, 10), "あいうえおかき、");
    }

    #[test]
    fn falls_back_to_soft_boundary() {
        let text = "あいうえおかきくのこさしす";
        assert_eq!(smart_truncate(text, 10), "あいうえおかきくの");
    }

    #[test]
    fn hard_cut_when_no_boundary() {
        let text = "abcdefgh jklmnop";
        assert_eq!(smart_truncate(text, 9), "abcdefgh");
        assert_eq!(smart_truncate("あいうえおかきくけこさ", 10), "あいうえおかきくけこ");
    }

    #[test]
    fn boundary_outside_window_ignored() {
        // Strong break at index 2 is below the 0.7 floor.
        let text = "あい。えおかきくけこさしす";
        assert_eq!(smart_truncate(text, 10), "あい。えおかきくけこ");
    }

    #[test]
    fn zero_length_budget() {
        assert_eq!(smart_truncate("abc", 0), "");
    }

    #[test]
    fn sanitize_runs_full_pipeline() {
        let raw = "**【速報】NVIDIAの新GPU「B200」が変えるAIインフラ投資の常識と日本企業が今すぐ取るべき対応策とは！！**";
        let title = sanitize(raw, 45);
        assert!(title.chars().count() <= 45);
        assert!(!title.contains("**"));
        assert!(!title.contains("【速報】"));
        assert!(title.starts_with("NVIDIAの新GPU"));
    }

    // --- to_slug ---

    #[test]
    fn slug_from_ascii_title() {
        assert_eq!(to_slug("OpenAI GPT-5: Enterprise Impact!", 60), "openai-gpt-5-enterprise-impact");
    }

    #[test]
    fn slug_truncates_at_word() {
        assert_eq!(to_slug("alpha beta gamma delta", 12), "alpha-beta");
    }

    #[test]
    fn slug_falls_back() {
        assert_eq!(to_slug("!!!", 60), "article");
        assert_eq!(to_slug("", 60), "article");
    }

    // --- validate ---

    #[test]
    fn validate_clean_title() {
        assert!(validate("なぜ今RAGが企業に選ばれるのか").is_empty());
    }

    #[test]
    fn validate_empty_reports_only_empty() {
        assert_eq!(validate(""), vec![TitleIssue::Empty]);
    }

    #[test]
    fn validate_flags_each_problem() {
        assert!(validate("AI").contains(&TitleIssue::TooShort { chars: 2 }));
        assert!(validate(&"あ".repeat(61)).contains(&TitleIssue::TooLong { chars: 61 }));
        assert!(validate("**太字**のタイトル").contains(&TitleIssue::ResidualMarkup));
        assert!(validate("【衝撃】新しいAIの話").contains(&TitleIssue::BracketDecoration));
        assert!(validate("AIが変える未来とは…").contains(&TitleIssue::Truncated));
        assert!(validate("AI導入のポイント?").contains(&TitleIssue::EncodingCorruption));
        assert!(validate("AI導入\u{FFFD}のポイント").contains(&TitleIssue::EncodingCorruption));
    }

    #[test]
    fn issue_messages() {
        assert_eq!(TitleIssue::Empty.to_string(), "Title is empty");
        assert_eq!(
            TitleIssue::TooLong { chars: 72 }.to_string(),
            "Title too long (72 chars, max 60)"
        );
    }

    // --- properties ---

    mod props {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_exceeds_budget(text in "\\PC{0,120}", max_len in 1usize..80) {
                prop_assert!(sanitize(&text, max_len).chars().count() <= max_len);
            }

            #[test]
            fn fitting_titles_are_only_normalized(text in "[a-zあ-ん。、の ]{0,30}") {
                prop_assert_eq!(sanitize(&text, 45), normalize(&text));
            }

            #[test]
            fn no_markup_survives(text in "[a-z*_~`#\\[\\]()!！?？【】あい ]{0,60}") {
                let out = sanitize(&text, 45);
                prop_assert!(!validate(&out).contains(&TitleIssue::ResidualMarkup));
            }

            #[test]
            fn ends_on_boundary_when_window_has_one(
                prefix in "[a-z]{14}",
                boundary in "[。、！？のが]",
                suffix in "[a-z]{20}",
            ) {
                // max_len 20: window 14..=19, boundary sits at index 14.
                let text = format!("{prefix}{boundary}{suffix}");
                let out = smart_truncate(&text, 20);
                let last = out.chars().last().expect("non-empty");
                prop_assert!(is_boundary(last));
            }
        }
    }
}
