//! Static editorial tables: weekday rotation, personas, fallback tags.

use chrono::Weekday;

use newsroom_shared::Category;

use Category::*;

/// Byline used for every category.
pub const HOUSE_AUTHOR: &str = "ALLFORCES編集部";

/// Writing persona and outline for one category.
#[derive(Debug)]
pub struct Persona {
    /// Opening used when no shared preamble is configured.
    pub opening: &'static str,
    pub viewpoint: &'static str,
    /// Numbered section outline.
    pub structure: &'static str,
    pub author: &'static str,
    /// Tags used to top up an under-filled tag list.
    pub fallback_tags: [&'static str; 3],
}

impl Persona {
    /// Full persona text, with `preamble` replacing the category opening.
    pub fn render(&self, preamble: Option<&str>) -> String {
        let opening = preamble.filter(|p| !p.trim().is_empty()).unwrap_or(self.opening);
        format!("{opening}\n\n【このカテゴリでの視点】\n{}", self.viewpoint)
    }
}

static TECH_GUIDE: Persona = Persona {
    opening: "あなたはAI技術に精通した記者です。",
    viewpoint: "AI実装プロジェクトの経験に基づき、複雑な技術を実務者の視点で分かりやすく解説する。",
    structure: "1.技術の概要と背景 2.アーキテクチャ詳細 3.実装のポイント 4.パフォーマンス比較 5.導入時の注意点",
    author: HOUSE_AUTHOR,
    fallback_tags: ["LLM", "AI技術", "実装"],
};

static CASE_STUDIES: Persona = Persona {
    opening: "あなたはAI導入の実務に精通した記者です。",
    viewpoint: "企業へのAI導入支援の取材・実務知見から、成功要因と失敗パターンをリアルに分析する。",
    structure: "1.導入企業の課題 2.選定したAIソリューション 3.実装プロセス 4.定量的な成果 5.成功要因と横展開",
    author: HOUSE_AUTHOR,
    fallback_tags: ["AI導入", "DX推進", "ROI分析"],
};

static INDUSTRY: Persona = Persona {
    opening: "あなたは複数業界のAI活用に精通した記者です。",
    viewpoint: "多業界のAI導入事例を取材・分析した知見から、業界固有の課題とAI活用の現実的な可能性を掘り下げる。",
    structure: "1.業界の現状と課題 2.AI活用の最新トレンド 3.導入障壁と克服策 4.ROI試算 5.今後の展望",
    author: HOUSE_AUTHOR,
    fallback_tags: ["業界分析", "DX推進", "AI活用"],
};

static RESEARCH: Persona = Persona {
    opening: "あなたはAI研究と実装の両方に精通した記者です。",
    viewpoint: "研究開発の経験に基づき、最新研究の実用化可能性を技術と市場の両面からリアルに評価する。",
    structure: "1.研究の背景と動機 2.手法の核心 3.実験結果と比較 4.実用化への道筋 5.この研究が意味すること",
    author: HOUSE_AUTHOR,
    fallback_tags: ["AI研究", "LLM", "機械学習"],
};

static STRATEGY: Persona = Persona {
    opening: "あなたはAI導入戦略に精通した記者です。",
    viewpoint: "幅広い技術選定・導入の知見から、技術選定とビジネス戦略の両面で実践的な提言を行う。",
    structure: "1.戦略的背景 2.フレームワーク提示 3.具体的なアクションステップ 4.リスクと対策 5.成功の条件",
    author: HOUSE_AUTHOR,
    fallback_tags: ["AI投資", "導入ロードマップ", "DX推進"],
};

static NEWS: Persona = Persona {
    opening: "あなたはAI業界の動向に精通した記者です。",
    viewpoint: "AI開発の実務経験から、ニュースの技術的本質と企業への実務インパクトを鋭く分析する。",
    structure: "1.印象的な導入 2.背景説明 3.核心分析 4.実践的示唆 5.開かれた結び",
    author: HOUSE_AUTHOR,
    fallback_tags: ["AI動向", "テック企業", "AI投資"],
};

pub fn persona(category: Category) -> &'static Persona {
    match category {
        LatestNews => &NEWS,
        TechGuide => &TECH_GUIDE,
        AdoptionStrategy => &STRATEGY,
        IndustryUseCases => &INDUSTRY,
        CaseStudies => &CASE_STUDIES,
        ResearchPapers => &RESEARCH,
    }
}

/// The day's category targets, most important first.
pub fn day_targets(day: Weekday) -> [Category; 3] {
    match day {
        Weekday::Mon => [TechGuide, IndustryUseCases, LatestNews],
        Weekday::Tue => [CaseStudies, LatestNews, AdoptionStrategy],
        Weekday::Wed => [TechGuide, ResearchPapers, IndustryUseCases],
        Weekday::Thu => [LatestNews, CaseStudies, TechGuide],
        Weekday::Fri => [IndustryUseCases, AdoptionStrategy, LatestNews],
        Weekday::Sat => [TechGuide, LatestNews, IndustryUseCases],
        Weekday::Sun => [AdoptionStrategy, CaseStudies, ResearchPapers],
    }
}

/// Exactly `count` category targets for `day`.
///
/// The day's rotation comes first, then the remaining categories in
/// declaration order, wrapping around when `count` exceeds the category set.
pub fn targets_for(day: Weekday, count: usize) -> Vec<Category> {
    let rotation = day_targets(day);
    let mut order: Vec<Category> = rotation.to_vec();
    order.extend(Category::ALL.into_iter().filter(|c| !rotation.contains(c)));
    order.into_iter().cycle().take(count).collect()
}
