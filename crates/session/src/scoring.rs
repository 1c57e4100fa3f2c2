use quizden_domain::Response;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ScoreReport {
    /// Rounded to a whole percent.
    pub percentage: f64,
    pub correct: u32,
    pub total: u32,
}

impl ScoreReport {
    pub fn tier(&self) -> ResultTier {
        ResultTier::for_percentage(self.percentage)
    }
}

/// Feedback band shown once a session is scored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResultTier {
    TryHarder,
    GettingThere,
    GoodEffort,
    Great,
    Perfect,
}

impl ResultTier {
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 100.0 {
            ResultTier::Perfect
        } else if percentage >= 75.0 {
            ResultTier::Great
        } else if percentage >= 50.0 {
            ResultTier::GoodEffort
        } else if percentage >= 25.0 {
            ResultTier::GettingThere
        } else {
            ResultTier::TryHarder
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ResultTier::TryHarder => "You need to try harder!",
            ResultTier::GettingThere => "You're getting there! Keep practicing.",
            ResultTier::GoodEffort => "Good effort! You're above average.",
            ResultTier::Great => "Great job! You're so close to perfect!",
            ResultTier::Perfect => "Outstanding! You got everything right!",
        }
    }
}

pub struct ScoreCalculator;

impl ScoreCalculator {
    pub fn score(&self, responses: &[Response]) -> Result<ScoreReport, SessionError> {
        if responses.is_empty() {
            return Err(SessionError::EmptySubmission);
        }
        let total = responses.len() as u32;
        let correct = responses.iter().filter(|r| r.is_correct).count() as u32;
        let percentage = (correct as f64 / total as f64 * 100.0).round();
        Ok(ScoreReport {
            percentage,
            correct,
            total,
        })
    }
}
