use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(DomainError::validation(format!(
                "unknown difficulty '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuizOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

impl QuizOption {
    pub fn new(id: impl Into<String>, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            is_correct,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    pub options: Vec<QuizOption>,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        difficulty: Option<Difficulty>,
        options: Vec<QuizOption>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            difficulty,
            options,
            explanation: None,
        }
    }

    pub fn option(&self, option_id: &str) -> Option<&QuizOption> {
        self.options.iter().find(|option| option.id == option_id)
    }

    pub fn correct_option(&self) -> Option<&QuizOption> {
        self.options.iter().find(|option| option.is_correct)
    }

    /// A question is playable when it has exactly one correct option and
    /// option ids are unique within it.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.options.is_empty() {
            return Err(DomainError::validation(format!(
                "question '{}' has no options",
                self.id
            )));
        }
        let correct = self.options.iter().filter(|o| o.is_correct).count();
        if correct != 1 {
            return Err(DomainError::validation(format!(
                "question '{}' must have exactly one correct option, found {correct}",
                self.id
            )));
        }
        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.id.as_str()) {
                return Err(DomainError::validation(format!(
                    "question '{}' repeats option id '{}'",
                    self.id, option.id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: String,
    pub category_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn new(
        id: impl Into<String>,
        category_id: impl Into<String>,
        title: impl Into<String>,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            id: id.into(),
            category_id: category_id.into(),
            title: title.into(),
            description: None,
            questions,
        }
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.category_id.trim().is_empty() {
            return Err(DomainError::validation(format!(
                "quiz '{}' has no category",
                self.id
            )));
        }
        let mut seen = HashSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(DomainError::validation(format!(
                    "quiz '{}' repeats question id '{}'",
                    self.id, question.id
                )));
            }
            question.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, correct: &[bool]) -> Question {
        let options = correct
            .iter()
            .enumerate()
            .map(|(i, c)| QuizOption::new(format!("{id}-o{i}"), format!("Option {i}"), *c))
            .collect();
        Question::new(id, "text", None, options)
    }

    #[test]
    fn difficulty_parses_case_insensitively() {
        assert_eq!("EASY".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!(" Hard ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn difficulty_deserializes_from_mixed_case() {
        let parsed: Difficulty = serde_json::from_str("\"Medium\"").unwrap();
        assert_eq!(parsed, Difficulty::Medium);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"medium\"");
    }

    #[test]
    fn question_requires_exactly_one_correct_option() {
        assert!(question("q1", &[true, false]).validate().is_ok());
        assert!(question("q1", &[false, false]).validate().is_err());
        assert!(question("q1", &[true, true]).validate().is_err());
        assert!(question("q1", &[]).validate().is_err());
    }

    #[test]
    fn quiz_rejects_duplicate_question_ids() {
        let quiz = Quiz::new(
            "quiz",
            "cat",
            "Quiz",
            vec![question("q1", &[true]), question("q1", &[true])],
        );
        assert!(quiz.validate().is_err());
    }
}
