use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Difficulty, DomainError};

/// Difficulty restriction requested when a session is set up.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub enum DifficultyFilter {
    #[default]
    Unspecified,
    Only(Difficulty),
}

impl DifficultyFilter {
    pub fn admits(&self, difficulty: Option<Difficulty>) -> bool {
        match self {
            DifficultyFilter::Unspecified => true,
            DifficultyFilter::Only(wanted) => difficulty == Some(*wanted),
        }
    }
}

impl FromStr for DifficultyFilter {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("unspecified") {
            return Ok(DifficultyFilter::Unspecified);
        }
        Ok(DifficultyFilter::Only(trimmed.parse()?))
    }
}

impl TryFrom<String> for DifficultyFilter {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DifficultyFilter> for String {
    fn from(filter: DifficultyFilter) -> Self {
        filter.to_string()
    }
}

impl fmt::Display for DifficultyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DifficultyFilter::Unspecified => f.write_str("unspecified"),
            DifficultyFilter::Only(difficulty) => difficulty.fmt(f),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSessionConfig {
    questions_count: u32,
    #[serde(default)]
    difficulty: DifficultyFilter,
}

impl TryFrom<RawSessionConfig> for SessionConfig {
    type Error = DomainError;

    fn try_from(raw: RawSessionConfig) -> Result<Self, Self::Error> {
        SessionConfig::new(raw.questions_count, raw.difficulty)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", try_from = "RawSessionConfig")]
pub struct SessionConfig {
    questions_count: u32,
    pub difficulty: DifficultyFilter,
}

impl SessionConfig {
    pub fn new(questions_count: u32, difficulty: DifficultyFilter) -> Result<Self, DomainError> {
        if questions_count == 0 {
            return Err(DomainError::validation(
                "a session needs at least one question",
            ));
        }
        Ok(Self {
            questions_count,
            difficulty,
        })
    }

    pub fn questions_count(&self) -> u32 {
        self.questions_count
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            questions_count: 1,
            difficulty: DifficultyFilter::Unspecified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_validation() {
        assert!(SessionConfig::new(0, DifficultyFilter::Unspecified).is_err());
        let config = SessionConfig::new(5, DifficultyFilter::Only(Difficulty::Hard)).unwrap();
        assert_eq!(config.questions_count(), 5);
    }

    #[test]
    fn filter_parsing() {
        assert_eq!(
            "Unspecified".parse::<DifficultyFilter>().unwrap(),
            DifficultyFilter::Unspecified
        );
        assert_eq!(
            "easy".parse::<DifficultyFilter>().unwrap(),
            DifficultyFilter::Only(Difficulty::Easy)
        );
        assert!("sometimes".parse::<DifficultyFilter>().is_err());
    }

    #[test]
    fn filter_admits_only_matching_difficulty() {
        let easy = DifficultyFilter::Only(Difficulty::Easy);
        assert!(easy.admits(Some(Difficulty::Easy)));
        assert!(!easy.admits(Some(Difficulty::Hard)));
        assert!(!easy.admits(None));
        assert!(DifficultyFilter::Unspecified.admits(None));
    }

    #[test]
    fn config_deserializes_through_validation() {
        let json = r#"{"questionsCount": 3, "difficulty": "HARD"}"#;
        let config: SessionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.difficulty, DifficultyFilter::Only(Difficulty::Hard));
        assert_eq!(config.questions_count(), 3);

        let zero = r#"{"questionsCount": 0}"#;
        assert!(serde_json::from_str::<SessionConfig>(zero).is_err());
    }
}
