//! 热点题材聚合
//!
//! 对人气榜上的每只股票拉取其题材关键词，按题材代码累计热度，
//! 取热度最高的若干题材，每个题材再选出若干成员股。
//! 同一只股票只归属于排名更靠前的题材。

use std::collections::{HashMap, HashSet};

use crate::models::{Candidate, ConceptKeyword, HotStock, ScreenParams};
use crate::services::retry::RetryPolicy;
use crate::services::stock::normalize::normalize_keywords;
use crate::services::stock::{MarketDataProvider, ProviderCall, Symbol};

/// 题材成员
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeMember {
    pub stock: HotStock,
    /// 该股在题材中的热度
    pub member_heat: f64,
}

/// 题材
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub code: String,
    pub name: String,
    /// 成员热度之和
    pub total_heat: f64,
    pub members: Vec<ThemeMember>,
}

impl Theme {
    /// 按 (成员热度降序, 人气排名升序) 排列的成员
    pub fn ranked_members(&self) -> Vec<&ThemeMember> {
        let mut members: Vec<&ThemeMember> = self.members.iter().collect();
        members.sort_by(|a, b| {
            b.member_heat
                .total_cmp(&a.member_heat)
                .then(a.stock.rank.cmp(&b.stock.rank))
        });
        members
    }
}

/// 逐只拉取人气股的题材关键词
///
/// 单只股票失败只记录日志并跳过
pub async fn collect_keywords(
    provider: &dyn MarketDataProvider,
    retry: &RetryPolicy,
    hot: &[HotStock],
) -> Vec<(HotStock, Vec<ConceptKeyword>)> {
    let mut result = Vec::with_capacity(hot.len());

    for stock in hot {
        let symbol = match Symbol::parse(&stock.code) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("跳过人气股 {}: {}", stock.code, e);
                continue;
            }
        };

        let call = ProviderCall::HotKeywords { symbol };
        let keywords = match retry.run(&call.to_string(), || provider.call(&call)).await {
            Ok(table) => normalize_keywords(&table),
            Err(e) => Err(e),
        };

        match keywords {
            Ok(keywords) => {
                log::debug!("{} 关联 {} 个题材", stock.code, keywords.len());
                result.push((stock.clone(), keywords));
            }
            Err(e) => log::warn!("获取 {} 题材关键词失败: {}", stock.code, e),
        }
    }

    result
}

/// 按题材代码累计热度，按总热度降序排列
///
/// 总热度相同的题材保持首次出现的顺序
pub fn aggregate_themes(keywords: &[(HotStock, Vec<ConceptKeyword>)]) -> Vec<Theme> {
    let mut themes: Vec<Theme> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (stock, concepts) in keywords {
        for concept in concepts {
            let idx = *index.entry(concept.concept_code.clone()).or_insert_with(|| {
                themes.push(Theme {
                    code: concept.concept_code.clone(),
                    name: concept.concept_name.clone(),
                    total_heat: 0.0,
                    members: Vec::new(),
                });
                themes.len() - 1
            });

            let theme = &mut themes[idx];
            theme.total_heat += concept.heat;
            theme.members.push(ThemeMember {
                stock: stock.clone(),
                member_heat: concept.heat,
            });
        }
    }

    themes.sort_by(|a, b| b.total_heat.total_cmp(&a.total_heat));
    themes
}

/// 选出前 `params.themes` 个题材，每个题材最多 `params.theme_members` 只未被占用的成员股
pub fn build_candidates(themes: &[Theme], params: &ScreenParams) -> Vec<Candidate> {
    let mut claimed: HashSet<String> = HashSet::new();
    let mut candidates = Vec::new();

    for (theme_idx, theme) in themes.iter().take(params.themes).enumerate() {
        let mut selected = 0;
        for (member_idx, member) in theme.ranked_members().into_iter().enumerate() {
            if selected >= params.theme_members {
                break;
            }
            if !claimed.insert(member.stock.code.clone()) {
                log::debug!(
                    "{} 已归属更靠前的题材，不计入 {}",
                    member.stock.code,
                    theme.name
                );
                continue;
            }
            selected += 1;

            candidates.push(Candidate {
                stock_code: member.stock.code.clone(),
                stock_name: member.stock.name.clone(),
                stock_hot_rank: member.stock.rank,
                stock_hot_heat: member.stock.heat,
                theme_rank: theme_idx + 1,
                theme_code: theme.code.clone(),
                theme_name: theme.name.clone(),
                theme_total_heat: theme.total_heat,
                theme_member_rank: member_idx + 1,
                member_concept_heat: member.member_heat,
                trade_date: None,
                close: None,
                pct_change: None,
                turnover_pct: None,
                volume_ratio: None,
                history_method: None,
                indicators: None,
                rules: None,
                passed: false,
                fail_reasons: Vec::new(),
                notes: Vec::new(),
            });
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::services::stock::mock::ScriptedProvider;
    use crate::services::stock::RawTable;
    use serde_json::json;
    use std::time::Duration;

    fn hot(rank: u32, code: &str) -> HotStock {
        HotStock {
            rank,
            code: code.to_string(),
            name: format!("股票{}", rank),
            heat: 0.0,
        }
    }

    fn concept(code: &str, heat: f64) -> ConceptKeyword {
        ConceptKeyword {
            concept_code: code.to_string(),
            concept_name: format!("题材{}", code),
            heat,
        }
    }

    fn params(themes: usize, theme_members: usize) -> ScreenParams {
        ScreenParams {
            top_hot: 10,
            themes,
            theme_members,
        }
    }

    #[test]
    fn test_aggregate_sums_heat_per_theme() {
        let keywords = vec![
            (hot(1, "000001"), vec![concept("A", 10.0), concept("B", 50.0)]),
            (hot(2, "000002"), vec![concept("A", 30.0)]),
            (hot(3, "000003"), vec![concept("C", 5.0)]),
        ];
        let themes = aggregate_themes(&keywords);
        let summary: Vec<(&str, f64, usize)> = themes
            .iter()
            .map(|t| (t.code.as_str(), t.total_heat, t.members.len()))
            .collect();
        assert_eq!(summary, vec![("B", 50.0, 1), ("A", 40.0, 2), ("C", 5.0, 1)]);
    }

    #[test]
    fn test_member_order_heat_then_rank() {
        let keywords = vec![
            (hot(3, "000003"), vec![concept("A", 20.0)]),
            (hot(1, "000001"), vec![concept("A", 10.0)]),
            (hot(2, "000002"), vec![concept("A", 20.0)]),
        ];
        let themes = aggregate_themes(&keywords);
        let codes: Vec<&str> = themes[0]
            .ranked_members()
            .iter()
            .map(|m| m.stock.code.as_str())
            .collect();
        assert_eq!(codes, vec!["000002", "000003", "000001"]);
    }

    #[test]
    fn test_first_claim_wins_across_themes() {
        // 000001 在两个题材中都是热度最高的成员
        let keywords = vec![
            (hot(1, "000001"), vec![concept("A", 100.0), concept("B", 90.0)]),
            (hot(2, "000002"), vec![concept("A", 10.0)]),
            (hot(3, "000003"), vec![concept("B", 20.0)]),
            (hot(4, "000004"), vec![concept("B", 5.0)]),
        ];
        let themes = aggregate_themes(&keywords);
        let candidates = build_candidates(&themes, &params(2, 2));

        let picks: Vec<(usize, &str, usize)> = candidates
            .iter()
            .map(|c| (c.theme_rank, c.stock_code.as_str(), c.theme_member_rank))
            .collect();
        assert_eq!(
            picks,
            vec![(1, "000001", 1), (1, "000003", 2), (2, "000002", 2)]
        );
        // 题材 B 排名更高，题材 A 中的 000001 不再重复出现
        assert_eq!(candidates[0].theme_code, "B");
        assert_eq!(
            candidates.iter().filter(|c| c.stock_code == "000001").count(),
            1
        );
    }

    #[test]
    fn test_limits_theme_count() {
        let keywords = vec![(
            hot(1, "000001"),
            vec![concept("A", 3.0), concept("B", 2.0), concept("C", 1.0)],
        )];
        let themes = aggregate_themes(&keywords);
        let candidates = build_candidates(&themes, &params(3, 3));
        // 同一只股票只会被第一个题材选中
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].theme_code, "A");
    }

    #[tokio::test]
    async fn test_collect_keywords_skips_failures() {
        let provider = ScriptedProvider::new(|call| match call {
            ProviderCall::HotKeywords { symbol } if symbol.code == "000001" => {
                Ok(Some(RawTable::from_columns(
                    &["时间", "股票代码", "概念名称", "概念代码", "热度"],
                    vec![vec![
                        json!("2024-06-28 10:00:00"),
                        json!("SZ000001"),
                        json!("银行"),
                        json!("BK0475"),
                        json!(88.0),
                    ]],
                )))
            }
            _ => Err(ProviderError::Http { status: 500 }),
        });
        let retry = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        };

        let collected =
            collect_keywords(&provider, &retry, &[hot(1, "000001"), hot(2, "000002")]).await;
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].1[0].concept_code, "BK0475");
        assert_eq!(provider.calls().len(), 2);
    }
}
