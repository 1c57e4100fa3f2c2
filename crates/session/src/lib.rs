pub mod error;
pub mod progress;
pub mod scoring;
pub mod selector;
pub mod session;
pub mod shuffle;
pub mod tracker;

pub use error::SessionError;
pub use progress::progress;
pub use scoring::{ResultTier, ScoreCalculator, ScoreReport};
pub use selector::QuestionSelector;
pub use session::{QuizSession, Submission};
pub use shuffle::shuffle;
pub use tracker::ResponseTracker;
