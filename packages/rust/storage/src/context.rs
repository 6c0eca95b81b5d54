//! Prompt context rendered from the knowledge base.

use serde_yaml::{Mapping, Value};
use tracing::warn;

use newsroom_shared::Category;

use crate::records::{Benchmarks, Company, field_text, scalar_text};
use crate::store::{KnowledgeStore, StoreError};

const CONTEXT_HEADER: &str = "【参照データ（ナレッジベース）】";
const CITATION_INSTRUCTIONS: &str = "【指示】上記データは事実として使用可。最新情報はWeb検索で補完すること。\n\n数値は「〜によると」「〜年時点で」のように出典を明示すること。";

const MAX_PRODUCTS: usize = 4;
const MAX_PARTNERS: usize = 5;
const MAX_LLM_ROWS: usize = 8;
const MAX_GPU_ROWS: usize = 5;
const MAX_SEGMENTS: usize = 5;
const MAX_MODELS_PER_PROVIDER: usize = 3;
const MAX_TECHNOLOGIES: usize = 5;
const MAX_INVESTMENTS: usize = 5;
const MAX_REGULATIONS: usize = 3;

/// Which sections to render.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Companies to include. Empty means all of them.
    pub company_ids: Vec<String>,
    pub market: bool,
    pub benchmarks: bool,
    pub pricing: bool,
    pub trends: bool,
}

impl ContextOptions {
    /// Everything.
    pub fn all() -> Self {
        Self {
            company_ids: Vec::new(),
            market: true,
            benchmarks: true,
            pricing: true,
            trends: true,
        }
    }

    /// Sections relevant to an article in `category` about `company_ids`.
    pub fn for_article(category: Category, company_ids: &[String]) -> Self {
        Self {
            company_ids: company_ids.to_vec(),
            market: true,
            benchmarks: matches!(category, Category::TechGuide | Category::ResearchPapers),
            pricing: matches!(category, Category::TechGuide | Category::AdoptionStrategy),
            trends: true,
        }
    }
}

/// All collections, loaded once per run.
///
/// An unreadable collection is logged and treated as empty; context is
/// advisory and never blocks generation.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeSnapshot {
    pub companies: Vec<Company>,
    pub market_sizes: Mapping,
    pub benchmarks: Benchmarks,
    pub trends: Value,
    pub pricing: Value,
}

fn or_empty<T: Default>(result: Result<T, StoreError>) -> T {
    result.unwrap_or_else(|e| {
        warn!(error = %e, "knowledge collection unavailable, continuing without it");
        T::default()
    })
}

impl KnowledgeSnapshot {
    pub fn load(store: &KnowledgeStore) -> Self {
        Self {
            companies: or_empty(store.companies()),
            market_sizes: or_empty(store.market_sizes()),
            benchmarks: or_empty(store.benchmarks()),
            trends: or_empty(store.trends()),
            pricing: or_empty(store.pricing()),
        }
    }

    /// Full context block: header, selected sections, citation instructions.
    pub fn prompt_context(&self, options: &ContextOptions) -> String {
        let mut sections = vec![CONTEXT_HEADER.to_string()];

        let mut push = |text: String| {
            if !text.is_empty() {
                sections.push(text);
            }
        };
        push(self.company_context(&options.company_ids));
        if options.market {
            push(self.market_context());
        }
        if options.benchmarks {
            push(self.benchmark_context());
        }
        if options.pricing {
            push(self.pricing_context());
        }
        if options.trends {
            push(self.trends_context());
        }

        sections.push(String::new());
        sections.push(CITATION_INSTRUCTIONS.to_string());
        sections.join("\n\n")
    }

    pub fn company_context(&self, ids: &[String]) -> String {
        let mut lines = Vec::new();
        let selected = self
            .companies
            .iter()
            .filter(|c| ids.is_empty() || ids.contains(&c.id));

        for c in selected {
            let mut figures = Vec::new();
            if let Some(v) = c.valuation_usd.as_ref().map(scalar_text).filter(|s| !s.is_empty()) {
                figures.push(format!("評価額${v}"));
            }
            if let Some(v) = c
                .revenue_annual_usd
                .as_ref()
                .map(scalar_text)
                .filter(|s| !s.is_empty())
            {
                figures.push(format!("年間売上${v}"));
            }
            if figures.is_empty() {
                lines.push(format!("■ {}", c.display_name()));
            } else {
                lines.push(format!("■ {}: {}", c.display_name(), figures.join(", ")));
            }

            if !c.key_products.is_empty() {
                let products: Vec<String> = c
                    .key_products
                    .iter()
                    .take(MAX_PRODUCTS)
                    .map(|p| format!("{}({})", p.name, p.kind.as_deref().unwrap_or("")))
                    .collect();
                lines.push(format!("  主力製品: {}", products.join(", ")));
            }
            if let Some(latest) = c.recent_news.first() {
                lines.push(format!(
                    "  最新: {} {}",
                    latest.date.as_deref().unwrap_or(""),
                    latest.headline
                ));
            }
            if !c.partnerships.is_empty() {
                let partners: Vec<&str> = c
                    .partnerships
                    .iter()
                    .take(MAX_PARTNERS)
                    .map(String::as_str)
                    .collect();
                lines.push(format!("  提携: {}", partners.join(", ")));
            }
        }
        lines.join("\n")
    }

    pub fn market_context(&self) -> String {
        let mut lines = Vec::new();
        let bucket = |name: &str| self.market_sizes.get(name).filter(|v| v.is_mapping());

        if let Some(global) = bucket("global_ai_market") {
            if let Some(current) = global.get("current") {
                lines.push(format!(
                    "■ AI市場規模: {}年 ${}",
                    field_text(current, "year"),
                    field_text(current, "size_usd")
                ));
            }
            if let Some(forecast) = global.get("forecast") {
                lines.push(format!(
                    "  予測: {}年 ${} (CAGR {})",
                    field_text(forecast, "year"),
                    field_text(forecast, "size_usd"),
                    field_text(forecast, "cagr")
                ));
            }
        }
        if let Some(current) = bucket("generative_ai_market").and_then(|b| b.get("current")) {
            lines.push(format!(
                "■ 生成AI市場: {}年 ${}",
                field_text(current, "year"),
                field_text(current, "size_usd")
            ));
        }
        if let Some(current) = bucket("japan_ai_market").and_then(|b| b.get("current")) {
            lines.push(format!(
                "■ 日本AI市場: {}年 {}",
                field_text(current, "year"),
                field_text(current, "size_jpy")
            ));
        }
        if let Some(segments) = self
            .market_sizes
            .get("segments")
            .and_then(Value::as_sequence)
            .filter(|s| !s.is_empty())
        {
            lines.push("■ セグメント別:".to_string());
            for seg in segments.iter().take(MAX_SEGMENTS) {
                lines.push(format!(
                    "  {}: ${} ({})",
                    field_text(seg, "name"),
                    field_text(seg, "size_usd"),
                    field_text(seg, "growth")
                ));
            }
        }
        lines.join("\n")
    }

    pub fn benchmark_context(&self) -> String {
        let mut lines = Vec::new();

        if !self.benchmarks.llm_benchmarks.is_empty() {
            lines.push("■ LLMベンチマーク:".to_string());
            for row in self.benchmarks.llm_benchmarks.iter().take(MAX_LLM_ROWS) {
                let scores: Vec<String> = [("MMLU", &row.mmlu), ("HumanEval", &row.humaneval), ("MATH", &row.math)]
                    .into_iter()
                    .filter_map(|(label, v)| {
                        let text = v.as_ref().map(scalar_text)?;
                        (!text.is_empty()).then(|| format!("{label}:{text}"))
                    })
                    .collect();
                if !scores.is_empty() {
                    lines.push(format!("  {}: {}", row.model, scores.join(", ")));
                }
            }
        }

        if !self.benchmarks.gpu_benchmarks.is_empty() {
            lines.push("■ GPU性能:".to_string());
            for gpu in self.benchmarks.gpu_benchmarks.iter().take(MAX_GPU_ROWS) {
                let mut specs = Vec::new();
                if let Some(memory) = gpu.memory.as_ref().map(scalar_text).filter(|s| !s.is_empty()) {
                    specs.push(memory);
                }
                if let Some(tflops) = gpu
                    .tflops_fp16
                    .as_ref()
                    .map(scalar_text)
                    .filter(|s| !s.is_empty())
                {
                    specs.push(format!("FP16:{tflops}TFLOPS"));
                }
                if !specs.is_empty() {
                    lines.push(format!("  {}: {}", gpu.name, specs.join(", ")));
                }
            }
        }
        lines.join("\n")
    }

    pub fn pricing_context(&self) -> String {
        let Some(providers) = self.pricing.get("providers").and_then(Value::as_sequence) else {
            return String::new();
        };

        let mut lines = vec!["■ AI API価格比較:".to_string()];
        for provider in providers {
            let name = field_text(provider, "name");
            let models = provider
                .get("models")
                .and_then(Value::as_sequence)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for model in models.iter().take(MAX_MODELS_PER_PROVIDER) {
                let price = |key: &str| {
                    let text = field_text(model, key);
                    if text.is_empty() { "?".to_string() } else { text }
                };
                lines.push(format!(
                    "  {name} {}: 入力${}/1M, 出力${}/1M",
                    field_text(model, "name"),
                    price("input_per_1m_tokens"),
                    price("output_per_1m_tokens")
                ));
            }
        }
        lines.join("\n")
    }

    pub fn trends_context(&self) -> String {
        let mut lines = Vec::new();
        let list = |key: &str| {
            self.trends
                .get(key)
                .and_then(Value::as_sequence)
                .filter(|s| !s.is_empty())
        };

        if let Some(items) = list("hot_technologies") {
            lines.push("■ 注目技術:".to_string());
            for t in items.iter().take(MAX_TECHNOLOGIES) {
                lines.push(format!(
                    "  - {}: {}",
                    field_text(t, "name"),
                    field_text(t, "description")
                ));
            }
        }
        if let Some(items) = list("investments") {
            lines.push("■ 投資動向:".to_string());
            for i in items.iter().take(MAX_INVESTMENTS) {
                lines.push(format!(
                    "  - {}: {} ({})",
                    field_text(i, "company"),
                    field_text(i, "amount"),
                    field_text(i, "description")
                ));
            }
        }
        if let Some(items) = list("regulatory") {
            lines.push("■ 規制動向:".to_string());
            for r in items.iter().take(MAX_REGULATIONS) {
                lines.push(format!(
                    "  - {}: {}",
                    field_text(r, "region"),
                    field_text(r, "description")
                ));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> KnowledgeSnapshot {
        KnowledgeSnapshot {
            companies: serde_yaml::from_str(
                r#"
- id: openai
  name: OpenAI
  valuation_usd: 300B
  key_products: [{name: GPT-4o, type: LLM}, {name: Sora, type: 動画生成}]
  recent_news: [{date: "2025-06-01", headline: X announced Y}]
  partnerships: [Microsoft, Apple]
- id: nvidia
  name: NVIDIA
"#,
            )
            .unwrap(),
            market_sizes: serde_yaml::from_str(
                "global_ai_market:\n  current: {year: 2025, size_usd: 244B}\n  forecast: {year: 2030, size_usd: 826B, cagr: 28%}\n",
            )
            .unwrap(),
            benchmarks: serde_yaml::from_str(
                "llm_benchmarks:\n  - {model: GPT-4o, mmlu: 88.7, humaneval: 90.2}\n  - {model: Empty}\ngpu_benchmarks:\n  - {name: H100, memory: 80GB, tflops_fp16: 989}\n",
            )
            .unwrap(),
            trends: serde_yaml::from_str(
                "hot_technologies:\n  - {name: AIエージェント, description: 自律実行}\nregulatory:\n  - {region: EU, description: AI Act施行}\n",
            )
            .unwrap(),
            pricing: serde_yaml::from_str(
                "providers:\n  - name: OpenAI\n    models:\n      - {name: gpt-4o, input_per_1m_tokens: 2.5}\n",
            )
            .unwrap(),
        }
    }

    #[test]
    fn companies_filtered_by_id() {
        let text = snapshot().company_context(&["openai".to_string()]);
        assert!(text.starts_with("■ OpenAI: 評価額$300B"));
        assert!(text.contains("  主力製品: GPT-4o(LLM), Sora(動画生成)"));
        assert!(text.contains("  最新: 2025-06-01 X announced Y"));
        assert!(text.contains("  提携: Microsoft, Apple"));
        assert!(!text.contains("NVIDIA"));

        let all = snapshot().company_context(&[]);
        assert!(all.contains("■ NVIDIA"));
    }

    #[test]
    fn market_and_benchmarks() {
        let s = snapshot();
        let market = s.market_context();
        assert!(market.contains("■ AI市場規模: 2025年 $244B"));
        assert!(market.contains("  予測: 2030年 $826B (CAGR 28%)"));

        let bench = s.benchmark_context();
        assert!(bench.contains("  GPT-4o: MMLU:88.7, HumanEval:90.2"));
        assert!(!bench.contains("Empty"));
        assert!(bench.contains("  H100: 80GB, FP16:989TFLOPS"));
    }

    #[test]
    fn pricing_marks_missing_prices() {
        let text = snapshot().pricing_context();
        assert!(text.contains("  OpenAI gpt-4o: 入力$2.5/1M, 出力$?/1M"));
    }

    #[test]
    fn category_selects_sections() {
        let s = snapshot();
        let news = s.prompt_context(&ContextOptions::for_article(
            Category::LatestNews,
            &["openai".to_string()],
        ));
        assert!(news.starts_with(CONTEXT_HEADER));
        assert!(news.contains("■ 注目技術:"));
        assert!(!news.contains("■ LLMベンチマーク:"));
        assert!(!news.contains("■ AI API価格比較:"));
        assert!(news.ends_with("出典を明示すること。"));

        let guide = s.prompt_context(&ContextOptions::for_article(Category::TechGuide, &[]));
        assert!(guide.contains("■ LLMベンチマーク:"));
        assert!(guide.contains("■ AI API価格比較:"));
    }

    #[test]
    fn empty_snapshot_still_has_instructions() {
        let text = KnowledgeSnapshot::default().prompt_context(&ContextOptions::all());
        assert!(text.starts_with(CONTEXT_HEADER));
        assert!(text.contains("【指示】"));
    }
}
