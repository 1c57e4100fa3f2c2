use quizden_domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no answers were submitted")]
    EmptySubmission,
    #[error("question '{0}' is not part of this session")]
    UnknownQuestion(String),
    #[error("option '{option_id}' does not belong to question '{question_id}'")]
    UnknownOption {
        question_id: String,
        option_id: String,
    },
    #[error("no questions found for the selected criteria")]
    NoQuestionsAvailable,
    #[error("question index {index} is out of range for {len} questions")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("quiz cannot be played: {0}")]
    InvalidQuiz(#[from] DomainError),
}
