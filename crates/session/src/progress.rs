use quizden_domain::Question;

use crate::tracker::ResponseTracker;

/// Percentage of the sequence answered at or before `current_index`.
/// Navigating ahead without answering does not raise progress.
pub fn progress(sequence: &[Question], tracker: &ResponseTracker, current_index: usize) -> u8 {
    if sequence.is_empty() {
        return 0;
    }
    let answered = sequence
        .iter()
        .take(current_index.saturating_add(1))
        .filter(|question| tracker.is_answered(&question.id))
        .count();
    let percent = (answered as f64 / sequence.len() as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(n: usize) -> Vec<Question> {
        (0..n)
            .map(|i| Question::new(format!("q{i}"), "text", None, Vec::new()))
            .collect()
    }

    #[test]
    fn counts_only_answered_questions_up_to_cursor() {
        let questions = sequence(3);
        let mut tracker = ResponseTracker::new();
        assert_eq!(progress(&questions, &tracker, 0), 0);

        tracker.record_answer("q0", "a", true);
        assert_eq!(progress(&questions, &tracker, 0), 33);
        // skipped q1, moved on to q2
        assert_eq!(progress(&questions, &tracker, 2), 33);

        tracker.record_answer("q2", "a", true);
        assert_eq!(progress(&questions, &tracker, 1), 33);
        assert_eq!(progress(&questions, &tracker, 2), 67);
    }

    #[test]
    fn empty_sequence_and_cursor_past_end() {
        let tracker = ResponseTracker::new();
        assert_eq!(progress(&[], &tracker, 5), 0);

        let questions = sequence(2);
        let mut tracker = ResponseTracker::new();
        tracker.record_answer("q0", "a", true);
        tracker.record_answer("q1", "a", true);
        assert_eq!(progress(&questions, &tracker, usize::MAX), 100);
    }

    #[test]
    fn answers_outside_the_sequence_are_ignored() {
        let questions = sequence(2);
        let mut tracker = ResponseTracker::new();
        tracker.record_answer("other", "a", true);
        assert_eq!(progress(&questions, &tracker, 1), 0);
    }
}
