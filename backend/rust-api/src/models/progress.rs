use serde::{Deserialize, Serialize};

use crate::errors::ServiceError;

/// Number of sequential topics in the course.
pub const TOPIC_COUNT: u8 = 3;

/// Minimum percentage required to pass a topic.
pub const PASS_THRESHOLD: u32 = 60;

/// Completion state of a single topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TopicProgress {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub score: u32,
}

/// Where a topic sits in the unlock sequence for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicState {
    /// Predecessor not yet passed; submissions are rejected.
    Locked,
    /// Available for evaluation.
    Unlocked,
    /// Passed. Terminal, though re-evaluation is still allowed.
    Passed,
}

/// Per-user course progress embedded in the user document.
///
/// The topic fields are a fixed-size mapping keyed by topic number; MongoDB
/// updates address them by dot path (`progress.topic2.score`). All
/// transitions go through [`CourseProgress::record_pass`] so the sequential
/// unlock invariant cannot be bypassed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CourseProgress {
    #[serde(default)]
    pub topic1: TopicProgress,
    #[serde(default)]
    pub topic2: TopicProgress,
    #[serde(default)]
    pub topic3: TopicProgress,
}

impl CourseProgress {
    pub fn topic(&self, number: u8) -> Option<&TopicProgress> {
        match number {
            1 => Some(&self.topic1),
            2 => Some(&self.topic2),
            3 => Some(&self.topic3),
            _ => None,
        }
    }

    fn topic_mut(&mut self, number: u8) -> Option<&mut TopicProgress> {
        match number {
            1 => Some(&mut self.topic1),
            2 => Some(&mut self.topic2),
            3 => Some(&mut self.topic3),
            _ => None,
        }
    }

    /// Current state of `number` in the unlock sequence.
    pub fn state(&self, number: u8) -> TopicState {
        let Some(topic) = self.topic(number) else {
            return TopicState::Locked;
        };
        if topic.completed {
            return TopicState::Passed;
        }
        let unlocked = match number {
            1 => true,
            n => self
                .topic(n - 1)
                .map(|prev| prev.completed)
                .unwrap_or(false),
        };
        if unlocked {
            TopicState::Unlocked
        } else {
            TopicState::Locked
        }
    }

    /// Records a passing evaluation for `number`.
    ///
    /// Rejects locked topics with `SequenceViolation` and leaves the value
    /// untouched. An already-passed topic is re-recorded: the new score
    /// overwrites the stored one even when lower.
    pub fn record_pass(&mut self, number: u8, score: u32) -> Result<(), ServiceError> {
        if !(1..=TOPIC_COUNT).contains(&number) {
            return Err(ServiceError::Validation(format!(
                "topic must be between 1 and {}",
                TOPIC_COUNT
            )));
        }
        if self.state(number) == TopicState::Locked {
            return Err(ServiceError::SequenceViolation);
        }
        let topic = self
            .topic_mut(number)
            .expect("topic number range checked above");
        topic.completed = true;
        topic.score = score;
        Ok(())
    }

    pub fn all_completed(&self) -> bool {
        self.topic1.completed && self.topic2.completed && self.topic3.completed
    }

    /// Rounded average of the three stored topic scores.
    pub fn final_score(&self) -> u32 {
        let sum = self.topic1.score + self.topic2.score + self.topic3.score;
        (sum as f64 / TOPIC_COUNT as f64).round() as u32
    }

    /// Admin reset: back to the initial state (topic 1 unlocked, all scores 0).
    pub fn reset(&mut self) {
        *self = CourseProgress::default();
    }
}

/// Whether `percentage` clears the pass threshold.
pub fn is_passing(percentage: u32) -> bool {
    percentage >= PASS_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_states() {
        let progress = CourseProgress::default();
        assert_eq!(progress.state(1), TopicState::Unlocked);
        assert_eq!(progress.state(2), TopicState::Locked);
        assert_eq!(progress.state(3), TopicState::Locked);
        assert!(!progress.all_completed());
    }

    #[test]
    fn passing_topic_unlocks_the_next() {
        let mut progress = CourseProgress::default();
        progress.record_pass(1, 80).unwrap();
        assert_eq!(progress.state(1), TopicState::Passed);
        assert_eq!(progress.state(2), TopicState::Unlocked);
        assert_eq!(progress.state(3), TopicState::Locked);
    }

    #[test]
    fn locked_topic_rejects_submission_without_side_effect() {
        let mut progress = CourseProgress::default();
        let before = progress;
        let err = progress.record_pass(2, 95).unwrap_err();
        assert!(matches!(err, ServiceError::SequenceViolation));
        assert_eq!(progress, before);
    }

    #[test]
    fn topic_out_of_range_is_a_validation_error() {
        let mut progress = CourseProgress::default();
        assert!(matches!(
            progress.record_pass(0, 80),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            progress.record_pass(4, 80),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn repass_overwrites_score_even_when_lower() {
        let mut progress = CourseProgress::default();
        progress.record_pass(1, 100).unwrap();
        progress.record_pass(1, 60).unwrap();
        assert_eq!(progress.topic1.score, 60);
        assert_eq!(progress.state(1), TopicState::Passed);
    }

    #[test]
    fn final_score_is_rounded_average() {
        let mut progress = CourseProgress::default();
        progress.record_pass(1, 100).unwrap();
        progress.record_pass(2, 80).unwrap();
        progress.record_pass(3, 60).unwrap();
        assert!(progress.all_completed());
        assert_eq!(progress.final_score(), 80);
    }

    #[test]
    fn pass_threshold_boundary() {
        assert!(is_passing(60));
        assert!(!is_passing(59));
        assert!(is_passing(100));
    }

    #[test]
    fn full_course_walkthrough() {
        let mut progress = CourseProgress::default();

        // Topic 1 passes exactly at the threshold.
        assert!(is_passing(60));
        progress.record_pass(1, 60).unwrap();

        // Topic 2 fails at 59: nothing recorded, still unlocked.
        assert!(!is_passing(59));
        assert_eq!(progress.state(2), TopicState::Unlocked);
        assert_eq!(progress.topic2, TopicProgress::default());

        // Retry passes with 100, then topic 3 passes with 75.
        progress.record_pass(2, 100).unwrap();
        progress.record_pass(3, 75).unwrap();

        assert!(progress.all_completed());
        assert_eq!(progress.final_score(), 78); // round((60+100+75)/3)
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut progress = CourseProgress::default();
        progress.record_pass(1, 90).unwrap();
        progress.record_pass(2, 70).unwrap();
        progress.reset();
        assert_eq!(progress, CourseProgress::default());
        assert_eq!(progress.state(1), TopicState::Unlocked);
    }
}
