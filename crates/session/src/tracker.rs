use std::collections::HashMap;

use quizden_domain::Response;
use serde::{Deserialize, Serialize};

/// Latest answer per question for the active session. Re-answering a
/// question replaces its entry in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Response>", into = "Vec<Response>")]
pub struct ResponseTracker {
    responses: Vec<Response>,
    positions: HashMap<String, usize>,
}

impl From<Vec<Response>> for ResponseTracker {
    fn from(responses: Vec<Response>) -> Self {
        let mut tracker = Self::new();
        for response in responses {
            tracker.record_answer(response.question_id, response.option_id, response.is_correct);
        }
        tracker
    }
}

impl From<ResponseTracker> for Vec<Response> {
    fn from(tracker: ResponseTracker) -> Self {
        tracker.responses
    }
}

impl ResponseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_answer(
        &mut self,
        question_id: impl Into<String>,
        option_id: impl Into<String>,
        is_correct: bool,
    ) {
        let response = Response::new(question_id, option_id, is_correct);
        match self.position(&response.question_id) {
            Some(index) => self.responses[index] = response,
            None => {
                self.positions
                    .insert(response.question_id.clone(), self.responses.len());
                self.responses.push(response);
            }
        }
    }

    /// Snapshot in first-answer order.
    pub fn responses(&self) -> Vec<Response> {
        self.responses.clone()
    }

    pub fn answer_for(&self, question_id: &str) -> Option<&Response> {
        self.position(question_id).map(|index| &self.responses[index])
    }

    pub fn is_answered(&self, question_id: &str) -> bool {
        self.answer_for(question_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    fn position(&self, question_id: &str) -> Option<usize> {
        self.positions.get(question_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reanswering_replaces_in_place() {
        let mut tracker = ResponseTracker::new();
        tracker.record_answer("q1", "A", false);
        tracker.record_answer("q2", "C", true);
        tracker.record_answer("q1", "B", true);

        let responses = tracker.responses();
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0], Response::new("q1", "B", true));
        assert_eq!(responses[1].question_id, "q2");
    }

    #[test]
    fn lookup_by_question() {
        let mut tracker = ResponseTracker::new();
        assert!(tracker.is_empty());
        tracker.record_answer("q7", "x", false);
        assert!(tracker.is_answered("q7"));
        assert!(!tracker.is_answered("q8"));
        assert_eq!(tracker.answer_for("q7").map(|r| r.option_id.as_str()), Some("x"));
    }

    #[test]
    fn deserialized_tracker_still_upserts() {
        let mut tracker = ResponseTracker::new();
        tracker.record_answer("q1", "A", true);
        let json = serde_json::to_string(&tracker).unwrap();
        let mut restored: ResponseTracker = serde_json::from_str(&json).unwrap();
        restored.record_answer("q1", "B", false);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.responses()[0].option_id, "B");
    }
}
