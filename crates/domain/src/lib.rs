pub mod config;
pub mod error;
pub mod io;
pub mod quiz;
pub mod record;

pub use crate::config::{DifficultyFilter, SessionConfig};
pub use crate::error::DomainError;
pub use crate::io::{load_quiz_file, DocumentFormat, QuizLoader, ValidatingLoader};
pub use crate::quiz::{Difficulty, Question, Quiz, QuizOption};
pub use crate::record::{truncate_to_millis, CategoryStat, QuizAttempt, Response};
