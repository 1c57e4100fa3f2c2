pub mod aggregate;
pub mod overview;
pub mod streak;
pub mod trend;

pub use aggregate::{StatUpdate, StatsAggregator};
pub use overview::{BestCategory, PerformanceBadge, StatsOverview};
pub use streak::{current_streak, summarize, StreakSummary};
pub use trend::{bucket_attempts, Period, TrendBucket, TrendWindow};
