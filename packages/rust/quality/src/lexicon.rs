//! Fixed reference lists the scorer matches against.
//!
//! Matching is plain substring containment, counted once per entry.

/// Organizations whose mention counts toward factual density.
pub const ORGANIZATIONS: &[&str] = &[
    "OpenAI",
    "Google",
    "Microsoft",
    "NVIDIA",
    "Meta",
    "Amazon",
    "Anthropic",
    "Apple",
    "Samsung",
    "Intel",
    "AMD",
    "Broadcom",
    "ByteDance",
    "Baidu",
    "Mistral",
    "IBM",
    "Oracle",
    "Salesforce",
    "Adobe",
    "Tesla",
    "DeepMind",
    "Hugging Face",
    "Stability AI",
    "Cohere",
    "xAI",
    "Perplexity",
    "Databricks",
    "Snowflake",
    "ソフトバンク",
    "NTT",
    "富士通",
    "NEC",
    "日立",
    "トヨタ",
    "ソニー",
    "楽天",
    "LINE",
    "サイバーエージェント",
    "PKSHA",
    "Preferred Networks",
    "ABEJA",
];

/// Products, models and named techniques.
pub const PRODUCTS: &[&str] = &[
    "GPT-4",
    "GPT-4o",
    "GPT-5",
    "o1",
    "o3",
    "Claude",
    "Gemini",
    "Llama",
    "Mistral",
    "DALL-E",
    "Sora",
    "Midjourney",
    "Stable Diffusion",
    "Copilot",
    "Duet AI",
    "Bard",
    "H100",
    "H200",
    "B200",
    "A100",
    "ChatGPT",
    "Perplexity",
    "NotebookLM",
    "RAG",
    "LoRA",
    "RLHF",
    "DPO",
    "Transformer",
    "BERT",
    "LLM",
];

/// Stock phrases typical of unedited machine-written prose.
pub const CLICHES: &[&str] = &[
    "大幅な改善",
    "革命的な",
    "画期的な",
    "パラダイムシフト",
    "目覚ましい進歩",
    "飛躍的な成長",
    "無限の可能性",
    "前例のない",
    "言うまでもなく",
    "いかがでしたでしょうか",
    "いかがでしたか",
    "まとめると",
    "最後までお読みいただき",
    "参考になれば幸いです",
    "お役に立てれば幸いです",
    "注目を集めています",
    "期待されています",
    "ますます重要になって",
];

/// Entries of `list` that occur in `text`, in list order.
pub fn found_in<'a>(list: &[&'a str], text: &str) -> Vec<&'a str> {
    list.iter().copied().filter(|entry| text.contains(entry)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_entry_once() {
        let text = "OpenAIとOpenAIとGoogle";
        assert_eq!(found_in(ORGANIZATIONS, text), vec!["OpenAI", "Google"]);
    }

    #[test]
    fn overlapping_entries_both_match() {
        assert_eq!(found_in(PRODUCTS, "GPT-4oの性能"), vec!["GPT-4", "GPT-4o"]);
    }
}
