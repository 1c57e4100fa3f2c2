#![allow(dead_code)]

use quizden_domain::{DifficultyFilter, Question, Quiz, QuizAttempt, QuizOption, SessionConfig};
use quizden_session::{QuizSession, Submission};
use rand::rngs::StdRng;
use rand::SeedableRng;
use time::{Duration, OffsetDateTime};

pub const USER: &str = "learner";

pub fn quiz(category: &str, questions: usize) -> Quiz {
    let questions = (0..questions)
        .map(|i| {
            Question::new(
                format!("q{i}"),
                format!("Question {i}"),
                None,
                vec![
                    QuizOption::new("right", "Right", true),
                    QuizOption::new("wrong", "Wrong", false),
                ],
            )
        })
        .collect();
    Quiz::new(format!("{category}-quiz"), category, "Sample", questions)
}

/// Runs a full session answering the first `correct` questions right and
/// the rest wrong.
pub fn submission(
    quiz: &Quiz,
    count: u32,
    correct: usize,
    finished_at: OffsetDateTime,
    seed: u64,
) -> Submission {
    let mut rng = StdRng::seed_from_u64(seed);
    let config = SessionConfig::new(count, DifficultyFilter::Unspecified).unwrap();
    let started_at = finished_at - Duration::seconds(45);
    let mut session = QuizSession::start(quiz, config, started_at, &mut rng).unwrap();
    let ids: Vec<String> = session.questions().iter().map(|q| q.id.clone()).collect();
    for (i, id) in ids.iter().enumerate() {
        let option = if i < correct { "right" } else { "wrong" };
        session.record_answer(id, option).unwrap();
    }
    session.finish(finished_at).unwrap()
}

/// A scored, completed attempt stored directly, bypassing the service.
pub fn attempt(id: &str, category: &str, at: OffsetDateTime, score: Option<f64>) -> QuizAttempt {
    QuizAttempt {
        id: id.into(),
        user_id: USER.into(),
        quiz_id: format!("{category}-quiz"),
        category_id: category.into(),
        score,
        total_questions: 4,
        correct_answers: 2,
        completed: score.is_some(),
        time_spent: Some(30.0),
        answers: Vec::new(),
        started_at: at - Duration::seconds(30),
        completed_at: score.map(|_| at),
        created_at: at,
        updated_at: at,
    }
}
