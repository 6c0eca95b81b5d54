//! Turning a [`Score`] into text: the human report and revision instructions.

use crate::{Feedback, FeedbackKind, Score};

/// The corrective instruction for one kind of failure.
fn instruction(kind: FeedbackKind) -> &'static str {
    use FeedbackKind::*;
    match kind {
        TooShort | BelowTargetLength => {
            "Expand the article to at least 3000 characters with deeper analysis"
        }
        MissingTerminalPunctuation => "Finish the article with a complete final sentence",
        MissingHeadings => "Organize the article into at least 3 sections with ## headings",
        MissingConclusion => "Close with a conclusion section such as '## まとめ' or '## 今後の展望'",
        FewDataPoints | SomeDataPoints => {
            "Include more specific numbers, statistics, and market data (at least 5 data points)"
        }
        FewOrganizations => {
            "Mention at least 3 specific companies with their actual products or achievements"
        }
        FewProducts => "Name at least 2 concrete products or models and what they do",
        NoSources | FewSources => "Add source attributions like 'Xによると' or 'Y年時点で'",
        FewParagraphs => "Break the body into at least 5 paragraphs",
        ParagraphsTooShort => "Develop each paragraph to 100-400 characters",
        ParagraphsTooLong => "Split long paragraphs so each stays within 100-400 characters",
        TooManyBullets => "Rewrite bullet lists as prose; keep bullets under 30% of lines",
        SomeCliches | ManyCliches => {
            "Replace generic AI phrases with specific, concrete descriptions"
        }
        NoQuestions | FewQuestions => "Add 2-3 rhetorical questions to engage readers",
        NoOpinion => "Add an editorial perspective, e.g. 'と考えられる' or '注目すべきは'",
        IntroTooLong => "Shorten the opening paragraph to 150 characters or fewer",
        MissingIntro => "Open with a short hook paragraph before the first heading",
        FlatTitle => "Make the title provoke curiosity with a question or comparison",
    }
}

/// One instruction per distinct problem, in feedback order.
pub fn revision_instructions(feedback: &[Feedback]) -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for item in feedback {
        let text = instruction(item.kind);
        if !out.contains(&text) {
            out.push(text);
        }
    }
    out
}

/// Numbered improvement list, or `None` when there is nothing to fix.
pub fn improvement_prompt(feedback: &[Feedback]) -> Option<String> {
    let instructions = revision_instructions(feedback);
    if instructions.is_empty() {
        return None;
    }

    let mut prompt = String::from("Please revise the article with these improvements:\n");
    for (i, text) in instructions.iter().enumerate() {
        prompt.push_str(&format!("{}. {text}\n", i + 1));
    }
    Some(prompt)
}

/// Human-readable summary of a score.
pub fn format_report(score: &Score) -> String {
    let verdict = if score.passed() { "PASS" } else { "FAIL" };
    let mut lines = vec![
        format!("Quality Score: {}/100 ({verdict})", score.total()),
        format!("  Completeness:    {}/25", score.completeness()),
        format!("  Factual density: {}/25", score.factual_density()),
        format!("  Readability:     {}/25", score.readability()),
        format!("  Engagement:      {}/25", score.engagement()),
    ];

    if !score.feedback().is_empty() {
        lines.push(String::new());
        lines.push("Feedback for improvement:".to_string());
        lines.extend(score.feedback().iter().map(|f| format!("  - {f}")));
    }

    lines.join("\n")
}
