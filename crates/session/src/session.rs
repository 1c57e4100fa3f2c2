use quizden_domain::{Question, Quiz, Response, SessionConfig};
use rand::Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::info;

use crate::error::SessionError;
use crate::progress::progress;
use crate::scoring::{ScoreCalculator, ScoreReport};
use crate::selector::QuestionSelector;
use crate::tracker::ResponseTracker;

/// One user's in-progress run through a shuffled subset of a quiz.
/// Nothing here is persisted; dropping the value abandons the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSession {
    pub quiz_id: String,
    pub category_id: String,
    pub config: SessionConfig,
    questions: Vec<Question>,
    tracker: ResponseTracker,
    current_index: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
}

/// A finished session, ready to be persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Submission {
    pub quiz_id: String,
    pub category_id: String,
    pub responses: Vec<Response>,
    pub score: ScoreReport,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finished_at: OffsetDateTime,
}

impl Submission {
    pub fn time_spent_secs(&self) -> f64 {
        (self.finished_at - self.started_at)
            .as_seconds_f64()
            .max(0.0)
    }
}

impl QuizSession {
    pub fn start<R: Rng + ?Sized>(
        quiz: &Quiz,
        config: SessionConfig,
        started_at: OffsetDateTime,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        quiz.validate()?;
        let questions = QuestionSelector.select(
            &quiz.questions,
            config.difficulty,
            config.questions_count(),
            rng,
        );
        if questions.is_empty() {
            return Err(SessionError::NoQuestionsAvailable);
        }
        info!(
            quiz_id = %quiz.id,
            difficulty = %config.difficulty,
            questions = questions.len(),
            "quiz session started"
        );
        Ok(Self {
            quiz_id: quiz.id.clone(),
            category_id: quiz.category_id.clone(),
            config,
            questions,
            tracker: ResponseTracker::new(),
            current_index: 0,
            started_at,
        })
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 >= self.questions.len()
    }

    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        if index >= self.questions.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.questions.len(),
            });
        }
        self.current_index = index;
        Ok(())
    }

    /// Moves to the next question; returns `false` when already on the last.
    pub fn advance(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current_index += 1;
        true
    }

    /// Records (or replaces) the answer to `question_id`. Correctness is
    /// taken from the question pool, never from the caller.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        option_id: &str,
    ) -> Result<&Response, SessionError> {
        let question = self
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;
        let option = question
            .option(option_id)
            .ok_or_else(|| SessionError::UnknownOption {
                question_id: question_id.to_string(),
                option_id: option_id.to_string(),
            })?;
        let is_correct = option.is_correct;
        self.tracker.record_answer(question_id, option_id, is_correct);
        self.tracker
            .answer_for(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))
    }

    pub fn responses(&self) -> Vec<Response> {
        self.tracker.responses()
    }

    pub fn current_progress(&self) -> u8 {
        progress(&self.questions, &self.tracker, self.current_index)
    }

    pub fn score(&self) -> Result<ScoreReport, SessionError> {
        ScoreCalculator.score(&self.tracker.responses())
    }

    pub fn finish(self, finished_at: OffsetDateTime) -> Result<Submission, SessionError> {
        let responses = self.tracker.responses();
        let score = ScoreCalculator.score(&responses)?;
        info!(
            quiz_id = %self.quiz_id,
            correct = score.correct,
            total = score.total,
            percentage = score.percentage,
            "quiz session finished"
        );
        Ok(Submission {
            quiz_id: self.quiz_id,
            category_id: self.category_id,
            responses,
            score,
            started_at: self.started_at,
            finished_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use quizden_domain::{DifficultyFilter, QuizOption};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use time::macros::datetime;
    use time::Duration;

    fn five_question_quiz() -> Quiz {
        let questions = (0..5)
            .map(|i| {
                Question::new(
                    format!("q{i}"),
                    format!("Question {i}"),
                    None,
                    vec![
                        QuizOption::new(format!("q{i}-right"), "Right", true),
                        QuizOption::new(format!("q{i}-wrong"), "Wrong", false),
                        QuizOption::new(format!("q{i}-other"), "Other", false),
                    ],
                )
            })
            .collect();
        Quiz::new("quiz-1", "science", "Science", questions)
    }

    fn start(count: u32) -> QuizSession {
        let mut rng = StdRng::seed_from_u64(17);
        let config = SessionConfig::new(count, DifficultyFilter::Unspecified).unwrap();
        QuizSession::start(
            &five_question_quiz(),
            config,
            datetime!(2024-05-01 09:00 UTC),
            &mut rng,
        )
        .unwrap()
    }

    #[test]
    fn end_to_end_three_of_five() {
        let mut session = start(3);
        assert_eq!(session.questions().len(), 3);
        let ids: HashSet<_> = session.questions().iter().map(|q| q.id.clone()).collect();
        assert_eq!(ids.len(), 3);
        for question in session.questions() {
            assert_eq!(question.options.len(), 3);
        }

        let picks: Vec<(String, String)> = session
            .questions()
            .iter()
            .enumerate()
            .map(|(i, q)| {
                let suffix = if i < 2 { "right" } else { "wrong" };
                (q.id.clone(), format!("{}-{suffix}", q.id))
            })
            .collect();
        for (i, (question_id, option_id)) in picks.iter().enumerate() {
            session.go_to(i).unwrap();
            session.record_answer(question_id, option_id).unwrap();
        }
        assert_eq!(session.current_progress(), 100);

        let finished_at = datetime!(2024-05-01 09:05 UTC);
        let submission = session.finish(finished_at).unwrap();
        assert_eq!(submission.score.percentage, 67.0);
        assert_eq!(submission.score.correct, 2);
        assert_eq!(submission.score.total, 3);
        assert_eq!(submission.time_spent_secs(), Duration::minutes(5).as_seconds_f64());
    }

    #[test]
    fn reanswer_replaces_previous_choice() {
        let mut session = start(2);
        let question_id = session.questions()[0].id.clone();
        session
            .record_answer(&question_id, &format!("{question_id}-wrong"))
            .unwrap();
        let response = session
            .record_answer(&question_id, &format!("{question_id}-right"))
            .unwrap();
        assert!(response.is_correct);
        assert_eq!(session.responses().len(), 1);
    }

    #[test]
    fn rejects_unknown_ids() {
        let mut session = start(2);
        assert!(matches!(
            session.record_answer("missing", "x"),
            Err(SessionError::UnknownQuestion(_))
        ));
        let question_id = session.questions()[0].id.clone();
        assert!(matches!(
            session.record_answer(&question_id, "nope"),
            Err(SessionError::UnknownOption { .. })
        ));
        assert!(session.responses().is_empty());
    }

    #[test]
    fn finishing_without_answers_fails() {
        let session = start(2);
        assert!(matches!(
            session.finish(datetime!(2024-05-01 09:01 UTC)),
            Err(SessionError::EmptySubmission)
        ));
    }

    #[test]
    fn navigation_is_bounded() {
        let mut session = start(2);
        assert!(session.advance());
        assert!(!session.advance());
        assert!(session.is_last());
        assert!(session.go_to(2).is_err());
    }

    #[test]
    fn no_matching_questions_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = SessionConfig::new(
            3,
            DifficultyFilter::Only(quizden_domain::Difficulty::Hard),
        )
        .unwrap();
        let result = QuizSession::start(
            &five_question_quiz(),
            config,
            datetime!(2024-05-01 09:00 UTC),
            &mut rng,
        );
        assert!(matches!(result, Err(SessionError::NoQuestionsAvailable)));
    }

    #[test]
    fn invalid_quiz_is_refused() {
        let mut quiz = five_question_quiz();
        quiz.questions[0].options[1].is_correct = true;
        let mut rng = StdRng::seed_from_u64(1);
        let result = QuizSession::start(
            &quiz,
            SessionConfig::default(),
            datetime!(2024-05-01 09:00 UTC),
            &mut rng,
        );
        assert!(matches!(result, Err(SessionError::InvalidQuiz(_))));
    }
}
