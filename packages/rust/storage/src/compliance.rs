//! Compliance rules and tool notes for drafting.
//!
//! A Markdown library maintained by editors:
//!
//! ```text
//! knowledge/
//!   compliance/*.md          rules; sections "記事生成時の適用ルール" and "禁止表現・注意表現"
//!   compliance/金融商品取引法ガイド.md
//!   tools/tool_database.md   one "### Name" section per tool or company
//! ```
//!
//! Every file is optional. A missing library yields no context at all.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use newsroom_shared::Category;

const RULES_HEADER: &str = "【コンプライアンスルール（法令遵守・必須）】\n以下のルールは法令に基づく必須要件です。記事内容がこれらに違反しないよう注意すること。\n";
const APPLY_SECTION: &str = "記事生成時の適用ルール";
const FORBIDDEN_SECTION: &str = "禁止表現・注意表現";
const FINANCE_GUIDE: &str = "金融商品取引法ガイド.md";
const TOOL_DATABASE: &str = "tool_database.md";
const FACT_CHECK: &str = "【ファクトチェック指示】
- 数値データは「〜によると」「〜年時点で」と出典を明記すること
- 確認できない数値は使用しないこと
- 「必ず」「絶対」などの断定表現を避けること
- 景品表示法に抵触する誇大表現を使用しないこと";

const MAX_SECTION_CHARS: usize = 2000;
const MAX_TOOLS: usize = 3;

/// Handle on the Markdown knowledge library.
#[derive(Debug, Clone)]
pub struct ComplianceLibrary {
    dir: PathBuf,
}

impl ComplianceLibrary {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read(&self, path: &Path) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "library file unavailable");
                None
            }
        }
    }

    /// Rules from every `compliance/*.md`, in file-name order.
    pub fn rules(&self) -> String {
        let Ok(entries) = std::fs::read_dir(self.dir.join("compliance")) else {
            return String::new();
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
            .collect();
        paths.sort();

        let mut blocks = vec![RULES_HEADER.to_string()];
        for path in paths {
            let Some(text) = self.read(&path) else {
                continue;
            };
            let name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            blocks.push(format!("■ {name}"));
            if let Some(rules) = section(&text, APPLY_SECTION) {
                blocks.push(format!("{rules}\n"));
            }
            if let Some(forbidden) = section(&text, FORBIDDEN_SECTION) {
                blocks.push(format!("{}\n", truncate(&forbidden, MAX_SECTION_CHARS)));
            }
        }
        if blocks.len() == 1 {
            return String::new();
        }
        blocks.join("\n")
    }

    /// The `### name` section of the tool database. An exact heading wins
    /// over one that merely mentions the name.
    pub fn tool_info(&self, name: &str) -> Option<String> {
        let text = self.read(&self.dir.join("tools").join(TOOL_DATABASE))?;
        let needle = name.to_lowercase();
        let sections = subsections(&text);

        let exact = sections.iter().find(|(heading, _)| {
            let heading = heading.to_lowercase();
            heading.strip_prefix(&needle).is_some_and(|rest| {
                rest.chars().next().is_none_or(|c| !c.is_alphanumeric())
            })
        });
        if let Some((_, body)) = exact {
            return Some(body.clone());
        }
        sections
            .iter()
            .find(|(heading, _)| heading.to_lowercase().contains(&needle))
            .map(|(_, body)| truncate(body, MAX_SECTION_CHARS))
    }

    /// Rules, category notes, tool notes and the fact-check reminder for one
    /// article. Empty when the library directory does not exist.
    pub fn article_context(&self, category: Category, companies: &[String]) -> String {
        if !self.dir.is_dir() {
            return String::new();
        }

        let mut sections = Vec::new();
        let rules = self.rules();
        if !rules.is_empty() {
            sections.push(rules);
        }

        if matches!(
            category,
            Category::AdoptionStrategy | Category::IndustryUseCases | Category::CaseStudies
        ) {
            let guide = self
                .read(&self.dir.join("compliance").join(FINANCE_GUIDE))
                .and_then(|text| section(&text, APPLY_SECTION));
            if let Some(guide) = guide {
                sections.push(format!("\n【投資関連記事の追加注意事項】\n{guide}"));
            }
        }

        let tools: Vec<String> = companies
            .iter()
            .take(MAX_TOOLS)
            .filter_map(|name| self.tool_info(name))
            .collect();
        if !tools.is_empty() {
            sections.push("\n【ツール・企業最新情報】".into());
            sections.push(tools.join("\n---\n"));
        }

        sections.push(format!("\n{FACT_CHECK}"));
        let context = sections.join("\n\n");
        info!(chars = context.chars().count(), "compliance context loaded");
        context
    }
}

/// Body of the `## name` section, trimmed. `None` when absent or blank.
fn section(text: &str, name: &str) -> Option<String> {
    let heading = format!("## {name}");
    let mut lines = text.lines();
    lines.by_ref().find(|line| line.trim_end() == heading)?;
    let body: Vec<&str> = lines.take_while(|line| !line.starts_with("## ")).collect();
    let body = body.join("\n").trim().to_string();
    (!body.is_empty()).then_some(body)
}

/// `### ` sections as (heading text, whole section including heading).
fn subsections(text: &str) -> Vec<(String, String)> {
    let mut sections: Vec<(String, Vec<&str>)> = Vec::new();
    for line in text.lines() {
        if let Some(heading) = line.strip_prefix("### ") {
            sections.push((heading.trim().to_string(), vec![line]));
        } else if let Some((_, body)) = sections.last_mut() {
            body.push(line);
        }
    }
    sections
        .into_iter()
        .map(|(heading, body)| (heading, body.join("\n").trim().to_string()))
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}\n...(以下省略)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const ADS_GUIDE: &str = "# 景品表示法ガイド

## 概要
広告表示のルール。

## 記事生成時の適用ルール
- 収入を保証する表現を使わない

## 禁止表現・注意表現
- 誰でも簡単に稼げる
";

    const FINANCE: &str = "# 金融商品取引法ガイド

## 記事生成時の適用ルール
- 特定銘柄の購入を勧めない
";

    const TOOLS: &str = "# ツール一覧

### ChatGPT Plus
月額20ドル。

### OpenAI API
従量課金。

### Claude
Anthropic製。
";

    fn library() -> (PathBuf, ComplianceLibrary) {
        let dir = std::env::temp_dir().join(format!("nr-compliance-{}", Uuid::now_v7()));
        std::fs::create_dir_all(dir.join("compliance")).unwrap();
        std::fs::create_dir_all(dir.join("tools")).unwrap();
        std::fs::write(dir.join("compliance/景品表示法ガイド.md"), ADS_GUIDE).unwrap();
        std::fs::write(dir.join("compliance").join(FINANCE_GUIDE), FINANCE).unwrap();
        std::fs::write(dir.join("tools").join(TOOL_DATABASE), TOOLS).unwrap();
        (dir.clone(), ComplianceLibrary::open(dir))
    }

    #[test]
    fn rules_quote_both_sections_per_file() {
        let (dir, library) = library();
        let rules = library.rules();
        assert!(rules.starts_with("【コンプライアンスルール（法令遵守・必須）】"));
        assert!(rules.contains("■ 景品表示法ガイド\n- 収入を保証する表現を使わない\n"));
        assert!(rules.contains("- 誰でも簡単に稼げる"));
        assert!(rules.contains("■ 金融商品取引法ガイド\n- 特定銘柄の購入を勧めない"));
        assert!(!rules.contains("広告表示のルール"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn tool_lookup_prefers_exact_heading() {
        let (dir, library) = library();
        assert_eq!(library.tool_info("openai").as_deref(), Some("### OpenAI API\n従量課金。"));
        assert_eq!(library.tool_info("Claude").as_deref(), Some("### Claude\nAnthropic製。"));
        assert_eq!(library.tool_info("Plus").as_deref(), Some("### ChatGPT Plus\n月額20ドル。"));
        assert_eq!(library.tool_info("nvidia"), None);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn business_categories_get_finance_notes() {
        let (dir, library) = library();
        let companies = vec!["claude".to_string()];

        let strategy = library.article_context(Category::AdoptionStrategy, &companies);
        assert!(strategy.contains("【投資関連記事の追加注意事項】\n- 特定銘柄の購入を勧めない"));
        assert!(strategy.contains("【ツール・企業最新情報】\n\n### Claude"));
        assert!(strategy.ends_with("景品表示法に抵触する誇大表現を使用しないこと"));

        let guide = library.article_context(Category::TechGuide, &[]);
        assert!(!guide.contains("【投資関連記事の追加注意事項】"));
        assert!(!guide.contains("【ツール・企業最新情報】"));
        assert!(guide.contains("【ファクトチェック指示】"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_library_yields_nothing() {
        let dir = std::env::temp_dir().join(format!("nr-compliance-{}", Uuid::now_v7()));
        let library = ComplianceLibrary::open(&dir);
        assert_eq!(library.article_context(Category::CaseStudies, &["openai".into()]), "");
        assert_eq!(library.rules(), "");
    }

    #[test]
    fn long_sections_are_cut() {
        let text = format!("## {FORBIDDEN_SECTION}\n{}", "あ".repeat(2500));
        let body = section(&text, FORBIDDEN_SECTION).unwrap();
        let cut = truncate(&body, MAX_SECTION_CHARS);
        assert!(cut.ends_with("\n...(以下省略)"));
        assert_eq!(cut.chars().count(), MAX_SECTION_CHARS + "\n...(以下省略)".chars().count());
    }
}
