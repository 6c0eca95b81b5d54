//! Stage 1: topic planning.
//!
//! Always yields exactly the requested number of topics. Entries the service
//! does not supply (or supplies unusably) are replaced by a synthetic topic
//! for the same category slot.

use chrono::{Datelike, NaiveDate};
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use newsroom_provider::GenerationRequest;
use newsroom_shared::{Category, Topic};

use crate::personas::targets_for;
use crate::pipeline::RunContext;

/// Recent titles quoted in the planning prompt.
const PROMPT_RECENT_TITLES: usize = 10;

fn topic_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title_seed": {"type": "STRING"},
                "category": {"type": "STRING"},
                "angle": {"type": "STRING"},
                "target_companies": {"type": "ARRAY", "items": {"type": "STRING"}},
            },
            "required": ["title_seed", "category", "angle"],
        }
    })
}

pub fn planning_prompt(
    targets: &[Category],
    recent_titles: &[String],
    trends: &str,
    today: NaiveDate,
) -> String {
    let categories: Vec<String> = targets
        .iter()
        .enumerate()
        .map(|(i, c)| format!("  {}. {c}", i + 1))
        .collect();
    let recent = if recent_titles.is_empty() {
        "なし".to_string()
    } else {
        recent_titles
            .iter()
            .take(PROMPT_RECENT_TITLES)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("、")
    };
    let trends = if trends.trim().is_empty() { "なし" } else { trends };

    format!(
        "AI業界の最新トピックを{count}件企画してください。\n\n\
         【カテゴリ指定】以下のカテゴリで1件ずつ:\n{categories}\n\n\
         【最近の記事（重複回避）】\n{recent}\n\n\
         【最新トレンド参考】\n{trends}\n\n\
         【条件】\n\
         - 各トピックは異なる企業・分野・角度から\n\
         - 具体的な企業名・製品名・数値を含むこと\n\
         - title_seedは30文字以内の仮タイトル\n\
         - angleは「何の視点から書くか」を50文字で\n\
         - target_companiesは記事で言及予定の企業ID(openai, google, nvidia等)を2-4個\n\n\
         日付: {date}",
        count = targets.len(),
        categories = categories.join("\n"),
        date = today.format("%Y年%m月%d日"),
    )
}

/// Generic topic for a category slot the service left empty.
pub fn synthetic_topic(category: Category) -> Topic {
    Topic {
        seed: format!("AI{}の最新動向", category.label()),
        category,
        angle: "最新動向を分析".into(),
        entities: vec!["openai".into(), "google".into()],
    }
}

fn dry_run_topics(targets: &[Category]) -> Vec<Topic> {
    targets
        .iter()
        .enumerate()
        .map(|(i, &category)| Topic {
            seed: format!("テストトピック{}", i + 1),
            category,
            angle: "テスト".into(),
            entities: vec!["openai".into()],
        })
        .collect()
}

/// One planned entry. `None` when it has no usable seed.
fn parse_topic(item: &Value, target: Category) -> Option<Topic> {
    let seed = item.get("title_seed")?.as_str()?.trim();
    if seed.is_empty() {
        return None;
    }

    let category = item
        .get("category")
        .and_then(Value::as_str)
        .and_then(Category::resolve)
        .unwrap_or(target);
    let angle = item
        .get("angle")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let entities = item
        .get("target_companies")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    Some(Topic {
        seed: seed.to_string(),
        category,
        angle,
        entities,
    })
}

/// Plan `count` topics for `today`.
#[instrument(skip_all, fields(count))]
pub async fn plan_topics(
    ctx: &RunContext<'_>,
    count: usize,
    today: NaiveDate,
    recent_titles: &[String],
    trends: &str,
) -> Vec<Topic> {
    let targets = targets_for(today.weekday(), count);
    if targets.is_empty() {
        return Vec::new();
    }

    let Some(service) = ctx.service else {
        info!(count, "dry run, using placeholder topics");
        return dry_run_topics(&targets);
    };

    let prompt = planning_prompt(&targets, recent_titles, trends, today);
    let planned = match service
        .generate(&GenerationRequest::json(prompt, topic_schema()))
        .await
    {
        Ok(generated) => match generated.json {
            Some(Value::Array(items)) => items,
            _ => {
                warn!(model = %generated.model, "topic plan is not a list, using synthetic topics");
                Vec::new()
            }
        },
        Err(e) => {
            warn!(error = %e, "topic planning failed, using synthetic topics");
            Vec::new()
        }
    };

    let topics: Vec<Topic> = targets
        .iter()
        .enumerate()
        .map(|(i, &target)| {
            planned
                .get(i)
                .and_then(|item| parse_topic(item, target))
                .unwrap_or_else(|| synthetic_topic(target))
        })
        .collect();

    for (i, topic) in topics.iter().enumerate() {
        info!(n = i + 1, category = %topic.category, seed = %topic.seed, "topic planned");
    }
    topics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{Reply, ScriptedService, json as reply_json};
    use newsroom_shared::PipelineSettings;

    // 2025-06-02 is a Monday.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[tokio::test]
    async fn categories_resolve_or_fall_back_to_slot() {
        let service = ScriptedService::new([reply_json(json!([
            {"title_seed": "RAG導入の実際", "category": "AI技術ガイド", "angle": "実装", "target_companies": [" openai ", ""]},
            {"title_seed": "製造業のAI", "category": "業界別", "angle": "現場"},
            {"title_seed": "謎のトピック", "category": "天気予報", "angle": "?"},
        ]))]);
        let settings = PipelineSettings::default();
        let ctx = RunContext::live(&service, &settings);

        let topics = plan_topics(&ctx, 3, monday(), &[], "").await;
        assert_eq!(topics.len(), 3);
        assert_eq!(topics[0].category, Category::TechGuide);
        assert_eq!(topics[0].entities, ["openai"]);
        assert_eq!(topics[1].category, Category::IndustryUseCases);
        // Monday's third slot.
        assert_eq!(topics[2].category, Category::LatestNews);
        assert_eq!(topics[2].seed, "謎のトピック");
    }

    #[tokio::test]
    async fn short_plan_is_padded_with_synthetic_topics() {
        let service = ScriptedService::new([reply_json(json!([
            {"title_seed": "GPUの供給", "category": "AI技術ガイド", "angle": "供給網"},
            {"title_seed": "", "category": "導入事例", "angle": "空"},
        ]))]);
        let settings = PipelineSettings::default();
        let ctx = RunContext::live(&service, &settings);

        let topics = plan_topics(&ctx, 4, monday(), &[], "").await;
        assert_eq!(topics.len(), 4);
        assert_eq!(topics[1], synthetic_topic(Category::IndustryUseCases));
        assert_eq!(topics[3], synthetic_topic(Category::AdoptionStrategy));
    }

    #[tokio::test]
    async fn failed_call_still_yields_every_topic() {
        let service = ScriptedService::new([Reply::Fail]);
        let settings = PipelineSettings::default();
        let ctx = RunContext::live(&service, &settings);

        let topics = plan_topics(&ctx, 3, monday(), &[], "").await;
        let seeds: Vec<&str> = topics.iter().map(|t| t.seed.as_str()).collect();
        assert_eq!(
            seeds,
            ["AIAI技術ガイドの最新動向", "AI業界別AI活用の最新動向", "AIAI最新ニュースの最新動向"]
        );
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn dry_run_makes_no_calls() {
        let settings = PipelineSettings::default();
        let ctx = RunContext::dry_run(&settings);
        let topics = plan_topics(&ctx, 2, monday(), &[], "").await;
        assert_eq!(topics[0].seed, "テストトピック1");
        assert_eq!(topics[1].category, Category::IndustryUseCases);
    }

    #[test]
    fn prompt_lists_slots_and_recent_titles() {
        let recent: Vec<String> = (1..=12).map(|i| format!("記事{i}")).collect();
        let prompt = planning_prompt(
            &[Category::TechGuide, Category::CaseStudies],
            &recent,
            "",
            monday(),
        );
        assert!(prompt.starts_with("AI業界の最新トピックを2件企画してください。"));
        assert!(prompt.contains("  1. AI技術ガイド\n  2. 導入事例"));
        assert!(prompt.contains("記事1、記事2"));
        assert!(prompt.contains("記事10\n"));
        assert!(!prompt.contains("記事11"));
        assert!(prompt.contains("【最新トレンド参考】\nなし"));
        assert!(prompt.ends_with("日付: 2025年06月02日"));

        let none = planning_prompt(&[Category::TechGuide], &[], "trend", monday());
        assert!(none.contains("【最近の記事（重複回避）】\nなし"));
    }
}
