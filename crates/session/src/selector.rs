use quizden_domain::{DifficultyFilter, Question};
use rand::Rng;
use tracing::debug;

use crate::shuffle::shuffle;

pub struct QuestionSelector;

impl QuestionSelector {
    /// Picks a random subset of at most `count` questions matching `filter`
    /// and shuffles the option order of each one.
    ///
    /// The retained pool is shuffled before truncation so the subset itself
    /// is random, not just its presentation order.
    pub fn select<R: Rng + ?Sized>(
        &self,
        all: &[Question],
        filter: DifficultyFilter,
        count: u32,
        rng: &mut R,
    ) -> Vec<Question> {
        let retained: Vec<Question> = all
            .iter()
            .filter(|question| filter.admits(question.difficulty))
            .cloned()
            .collect();
        if retained.is_empty() {
            debug!(%filter, pool = all.len(), "no questions match difficulty filter");
            return Vec::new();
        }

        let take = (count as usize).clamp(1, retained.len());
        let mut selected = shuffle(&retained, rng);
        selected.truncate(take);
        for question in &mut selected {
            question.options = shuffle(&question.options, rng);
        }
        debug!(%filter, requested = count, selected = selected.len(), "selected session questions");
        selected
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use quizden_domain::{Difficulty, QuizOption};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool() -> Vec<Question> {
        let difficulties = [
            Some(Difficulty::Easy),
            Some(Difficulty::Hard),
            None,
            Some(Difficulty::Easy),
            Some(Difficulty::Medium),
        ];
        difficulties
            .iter()
            .enumerate()
            .map(|(i, difficulty)| {
                Question::new(
                    format!("q{i}"),
                    format!("Question {i}"),
                    *difficulty,
                    vec![
                        QuizOption::new("a", "A", true),
                        QuizOption::new("b", "B", false),
                        QuizOption::new("c", "C", false),
                    ],
                )
            })
            .collect()
    }

    #[test]
    fn never_serves_more_than_available() {
        let mut rng = StdRng::seed_from_u64(3);
        let selected = QuestionSelector.select(&pool(), DifficultyFilter::Unspecified, 50, &mut rng);
        assert_eq!(selected.len(), 5);
        let ids: HashSet<_> = selected.iter().map(|q| q.id.clone()).collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn zero_count_is_clamped_to_one() {
        let mut rng = StdRng::seed_from_u64(3);
        let selected = QuestionSelector.select(&pool(), DifficultyFilter::Unspecified, 0, &mut rng);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn filter_keeps_only_matching_difficulty() {
        let mut rng = StdRng::seed_from_u64(9);
        let selected = QuestionSelector.select(
            &pool(),
            DifficultyFilter::Only(Difficulty::Easy),
            10,
            &mut rng,
        );
        assert_eq!(selected.len(), 2);
        assert!(selected
            .iter()
            .all(|q| q.difficulty == Some(Difficulty::Easy)));
    }

    #[test]
    fn empty_when_nothing_matches() {
        let mut rng = StdRng::seed_from_u64(9);
        let questions: Vec<Question> = pool()
            .into_iter()
            .filter(|q| q.difficulty != Some(Difficulty::Hard))
            .collect();
        let selected = QuestionSelector.select(
            &questions,
            DifficultyFilter::Only(Difficulty::Hard),
            3,
            &mut rng,
        );
        assert!(selected.is_empty());
    }

    #[test]
    fn options_are_kept_intact() {
        let mut rng = StdRng::seed_from_u64(11);
        let original = pool();
        for question in QuestionSelector.select(&original, DifficultyFilter::Unspecified, 5, &mut rng) {
            let mut ids: Vec<_> = question.options.iter().map(|o| o.id.as_str()).collect();
            ids.sort_unstable();
            assert_eq!(ids, vec!["a", "b", "c"]);
        }
        assert_eq!(original, pool());
    }

    #[test]
    fn subset_is_random_not_leading_prefix() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut chosen = HashSet::new();
        for _ in 0..200 {
            for question in QuestionSelector.select(&pool(), DifficultyFilter::Unspecified, 1, &mut rng) {
                chosen.insert(question.id);
            }
        }
        assert_eq!(chosen.len(), 5);
    }
}
