//! Research batches: YAML files proposing knowledge-base changes.
//!
//! A batch is named `{YYYY-MM-DD}-{slug}.yml`. Only the `kb_updates` and
//! `kb_additions` sections are read; anything else in the file is notes for
//! humans.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;
use serde_yaml::Mapping;
use sha2::{Digest, Sha256};

use crate::records::{Benchmark, Company};
use crate::store::StoreError;

/// Proposed changes to existing records.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KbUpdates {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub market_sizes: Mapping,
    #[serde(default)]
    pub benchmarks: BenchmarkUpdates,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BenchmarkUpdates {
    #[serde(default)]
    pub llm_benchmarks: Vec<Benchmark>,
}

/// Records to create. Never applied to ids that already exist.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KbAdditions {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub benchmarks: Vec<Benchmark>,
}

#[derive(Deserialize)]
struct RawBatch {
    #[serde(default)]
    kb_updates: Option<KbUpdates>,
    #[serde(default)]
    kb_additions: Option<KbAdditions>,
}

/// A parsed batch plus its identity.
#[derive(Debug, Clone)]
pub struct ResearchBatch {
    pub path: PathBuf,
    /// File name, recorded in the marker as the batch identifier.
    pub source: String,
    /// Hex SHA-256 of the file contents.
    pub sha256: String,
    /// Date prefix of the file name, if any.
    pub date: Option<NaiveDate>,
    pub updates: KbUpdates,
    pub additions: KbAdditions,
}

impl ResearchBatch {
    /// Read and parse a batch file.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let bytes = std::fs::read(path).map_err(|e| StoreError::Unreadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let raw: Option<RawBatch> =
            serde_yaml::from_slice(&bytes).map_err(|e| StoreError::Unreadable {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        let (updates, additions) = raw
            .map(|r| (r.kb_updates.unwrap_or_default(), r.kb_additions.unwrap_or_default()))
            .unwrap_or_default();

        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path: path.to_path_buf(),
            date: batch_date(&source),
            sha256: content_hash(&bytes),
            source,
            updates,
            additions,
        })
    }

    /// Nothing to update and nothing to add.
    pub fn is_empty(&self) -> bool {
        self.updates.companies.is_empty()
            && self.updates.market_sizes.is_empty()
            && self.updates.benchmarks.llm_benchmarks.is_empty()
            && self.additions.companies.is_empty()
            && self.additions.benchmarks.is_empty()
    }

    /// Older than `max_age_days` relative to `today`. Undated batches never are.
    pub fn is_stale(&self, today: NaiveDate, max_age_days: i64) -> bool {
        self.date
            .is_some_and(|d| (today - d).num_days() > max_age_days)
    }
}

/// `2025-06-01-openai-funding.yml` → 2025-06-01.
pub fn batch_date(file_name: &str) -> Option<NaiveDate> {
    let prefix = file_name.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Batch files in `dir`, in name order. Hidden files and non-YAML are skipped.
pub fn list_batches(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StoreError::Unreadable {
                path: dir.to_path_buf(),
                message: e.to_string(),
            });
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            let name = p.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            p.is_file() && name.ends_with(".yml") && !name.starts_with('.')
        })
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const BATCH: &str = r#"
summary: notes for editors
kb_updates:
  companies:
    - id: openai
      recent_news:
        - {date: "2025-06-01", headline: X announced Y}
  market_sizes:
    global_ai_market:
      current: {year: 2025, size_usd: 244B}
  benchmarks:
    llm_benchmarks:
      - {model: GPT-4o, gpqa: 53.6}
kb_additions:
  companies:
    - {id: mistral, name: Mistral AI}
"#;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nr-batch-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parses_sections_and_identity() {
        let dir = temp_dir();
        let path = dir.join("2025-06-01-openai.yml");
        std::fs::write(&path, BATCH).unwrap();

        let batch = ResearchBatch::load(&path).unwrap();
        assert_eq!(batch.source, "2025-06-01-openai.yml");
        assert_eq!(batch.date, NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(batch.sha256.len(), 64);
        assert_eq!(batch.updates.companies[0].recent_news[0].headline, "X announced Y");
        assert!(batch.updates.market_sizes.contains_key("global_ai_market"));
        assert_eq!(batch.updates.benchmarks.llm_benchmarks[0].model, "GPT-4o");
        assert_eq!(batch.additions.companies[0].id, "mistral");
        assert!(!batch.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn notes_only_file_is_empty() {
        let dir = temp_dir();
        let path = dir.join("notes.yml");
        std::fs::write(&path, "summary: nothing actionable\n").unwrap();
        let batch = ResearchBatch::load(&path).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.date, None);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn staleness_uses_the_file_date() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let batch = |name: &str| ResearchBatch {
            path: PathBuf::from(name),
            source: name.to_string(),
            sha256: String::new(),
            date: batch_date(name),
            updates: KbUpdates::default(),
            additions: KbAdditions::default(),
        };
        assert!(!batch("2025-06-07-a.yml").is_stale(today, 3));
        assert!(batch("2025-06-06-a.yml").is_stale(today, 3));
        assert!(!batch("weekly.yml").is_stale(today, 3));
    }

    #[test]
    fn listing_is_sorted_and_filtered() {
        let dir = temp_dir();
        for name in ["2025-06-02-b.yml", "2025-06-01-a.yml", ".hidden.yml", "readme.md"] {
            std::fs::write(dir.join(name), "{}").unwrap();
        }
        let names: Vec<String> = list_batches(&dir)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["2025-06-01-a.yml", "2025-06-02-b.yml"]);
        std::fs::remove_dir_all(&dir).ok();

        assert!(list_batches(&dir).unwrap().is_empty());
    }

    #[test]
    fn garbage_batch_is_unreadable() {
        let dir = temp_dir();
        let path = dir.join("2025-06-01-bad.yml");
        std::fs::write(&path, "kb_updates: [unclosed").unwrap();
        assert!(matches!(
            ResearchBatch::load(&path),
            Err(StoreError::Unreadable { .. })
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
