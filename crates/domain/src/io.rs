use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{error::DomainError, quiz::Quiz};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, DomainError> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("json") => Ok(DocumentFormat::Json),
            Some("yaml") | Some("yml") => Ok(DocumentFormat::Yaml),
            _ => Err(DomainError::validation(format!(
                "cannot infer quiz document format from {}",
                path.display()
            ))),
        }
    }
}

pub trait QuizLoader {
    fn load(&self, bytes: &[u8], format: DocumentFormat) -> Result<Quiz, DomainError>;
}

/// Parses a quiz document and rejects quizzes that cannot be played.
pub struct ValidatingLoader;

impl QuizLoader for ValidatingLoader {
    fn load(&self, bytes: &[u8], format: DocumentFormat) -> Result<Quiz, DomainError> {
        let quiz: Quiz = match format {
            DocumentFormat::Json => serde_json::from_slice(bytes)
                .map_err(|err| DomainError::Serialization(err.to_string()))?,
            DocumentFormat::Yaml => serde_yaml::from_slice(bytes)
                .map_err(|err| DomainError::Serialization(err.to_string()))?,
        };
        quiz.validate()?;
        Ok(quiz)
    }
}

pub fn load_quiz_file(path: &Path) -> Result<Quiz, DomainError> {
    let format = DocumentFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    ValidatingLoader.load(&bytes, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Difficulty;

    const YAML_QUIZ: &str = r#"
id: capitals
categoryId: geography
title: Capitals
questions:
  - id: q1
    text: Capital of France?
    difficulty: Easy
    options:
      - { id: a, text: Paris, isCorrect: true }
      - { id: b, text: Lyon, isCorrect: false }
  - id: q2
    text: Capital of Australia?
    options:
      - { id: a, text: Sydney, isCorrect: false }
      - { id: b, text: Canberra, isCorrect: true }
"#;

    #[test]
    fn loads_yaml_document() {
        let quiz = ValidatingLoader
            .load(YAML_QUIZ.as_bytes(), DocumentFormat::Yaml)
            .unwrap();
        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(quiz.questions[0].difficulty, Some(Difficulty::Easy));
        assert_eq!(quiz.questions[1].difficulty, None);
    }

    #[test]
    fn rejects_question_without_correct_option() {
        let json = r#"{
            "id": "q", "categoryId": "c", "title": "t",
            "questions": [{"id": "q1", "text": "?", "options": [
                {"id": "a", "text": "x", "isCorrect": false}
            ]}]
        }"#;
        let err = ValidatingLoader
            .load(json.as_bytes(), DocumentFormat::Json)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("quiz.YML")).unwrap(),
            DocumentFormat::Yaml
        );
        assert!(DocumentFormat::from_path(Path::new("quiz.xlsx")).is_err());
    }
}
