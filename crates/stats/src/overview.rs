use quizden_domain::CategoryStat;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PerformanceBadge {
    Excellent,
    Good,
    Average,
    NeedsImprovement,
}

impl PerformanceBadge {
    pub fn for_score(score: f64) -> Self {
        if score >= 90.0 {
            PerformanceBadge::Excellent
        } else if score >= 75.0 {
            PerformanceBadge::Good
        } else if score >= 60.0 {
            PerformanceBadge::Average
        } else {
            PerformanceBadge::NeedsImprovement
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BestCategory {
    pub category_id: String,
    pub average_score: f64,
}

/// Headline numbers across all of a user's category aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsOverview {
    pub total_attempts: u32,
    pub total_completed: u32,
    pub completion_rate: f64,
    /// Mean of the per-category averages that exist.
    pub overall_average: f64,
    pub categories_engaged: u32,
    pub best_category: Option<BestCategory>,
    /// Up to four most attempted categories.
    pub top_categories: Vec<String>,
    pub badge: PerformanceBadge,
}

const TOP_CATEGORIES: usize = 4;

impl StatsOverview {
    pub fn from_stats(stats: &[CategoryStat]) -> Self {
        let total_attempts: u32 = stats.iter().map(|s| s.attempts).sum();
        let total_completed: u32 = stats.iter().map(|s| s.completed).sum();
        let completion_rate = if total_attempts > 0 {
            total_completed as f64 / total_attempts as f64 * 100.0
        } else {
            0.0
        };

        let averages: Vec<f64> = stats.iter().filter_map(|s| s.average_score).collect();
        let overall_average = if averages.is_empty() {
            0.0
        } else {
            averages.iter().sum::<f64>() / averages.len() as f64
        };

        let best_category = stats
            .iter()
            .filter_map(|s| s.average_score.map(|avg| (s, avg)))
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(s, average_score)| BestCategory {
                category_id: s.category_id.clone(),
                average_score,
            });

        let mut engaged: Vec<&CategoryStat> = stats.iter().filter(|s| s.attempts > 0).collect();
        engaged.sort_by(|a, b| b.attempts.cmp(&a.attempts));
        let top_categories = engaged
            .iter()
            .take(TOP_CATEGORIES)
            .map(|s| s.category_id.clone())
            .collect();

        Self {
            total_attempts,
            total_completed,
            completion_rate,
            overall_average,
            categories_engaged: engaged.len() as u32,
            best_category,
            top_categories,
            badge: PerformanceBadge::for_score(overall_average),
        }
    }
}
