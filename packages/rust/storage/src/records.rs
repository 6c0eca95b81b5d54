//! Typed views of the knowledge-base collections.
//!
//! Only the fields the merge engine and prompt context touch are typed.
//! Everything else round-trips through the flattened `extra` mappings so a
//! rewrite never drops data it does not understand.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Collection file names inside the knowledge-base directory.
pub const COMPANIES_FILE: &str = "companies.yml";
pub const MARKET_SIZES_FILE: &str = "market_sizes.yml";
pub const BENCHMARKS_FILE: &str = "benchmarks.yml";
pub const TRENDS_FILE: &str = "trends.yml";
pub const PRICING_FILE: &str = "pricing.yml";
pub const MARKER_FILE: &str = "_last_updated.yml";

// ---------------------------------------------------------------------------
// Companies
// ---------------------------------------------------------------------------

/// One dated announcement in a company's bounded news history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub headline: String,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// A company profile, identified by `id`. Also the shape of a company update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation_usd: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_annual_usd: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_products: Vec<Product>,
    /// Newest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recent_news: Vec<NewsItem>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partnerships: Vec<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl Company {
    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// One LLM benchmark row, identified by `model`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    #[serde(default)]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mmlu: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humaneval: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub math: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpqa: Option<Value>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl Benchmark {
    /// The overwritable score fields, paired with their names.
    pub(crate) fn scores_mut(&mut self) -> [(&'static str, &mut Option<Value>); 5] {
        [
            ("mmlu", &mut self.mmlu),
            ("humaneval", &mut self.humaneval),
            ("math", &mut self.math),
            ("gpqa", &mut self.gpqa),
            ("provider", &mut self.provider),
        ]
    }

    pub(crate) fn scores(&self) -> [&Option<Value>; 5] {
        [
            &self.mmlu,
            &self.humaneval,
            &self.math,
            &self.gpqa,
            &self.provider,
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GpuSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tflops_fp16: Option<Value>,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// `benchmarks.yml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Benchmarks {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub llm_benchmarks: Vec<Benchmark>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gpu_benchmarks: Vec<GpuSpec>,
    #[serde(flatten)]
    pub extra: Mapping,
}

// ---------------------------------------------------------------------------
// Marker
// ---------------------------------------------------------------------------

/// `_last_updated.yml`: what was applied last, and when.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_research_applied: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_sha256: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A proposed value counts only when it is present and not null.
pub(crate) fn is_present(value: &Option<Value>) -> bool {
    value.as_ref().is_some_and(|v| !v.is_null())
}

/// Render a scalar for prompt text. Sequences and mappings render empty.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Tagged(tagged) => scalar_text(&tagged.value),
        Value::Null | Value::Sequence(_) | Value::Mapping(_) => String::new(),
    }
}

/// `map[key]` as prompt text, empty when missing.
pub fn field_text(map: &Value, key: &str) -> String {
    map.get(key).map(scalar_text).unwrap_or_default()
}
