use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::progress::TOPIC_COUNT;
use crate::models::user::bson_datetime_as_chrono;

/// Quiz question stored in MongoDB "questions" collection.
///
/// Exactly one correct answer and three wrong answers. Soft-deleted via the
/// `active` flag: inactive questions are never served to quiz takers but
/// stay visible to admin queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Topic this question belongs to (1..=3).
    pub topic: u8,
    pub prompt: String,
    pub correct_answer: String,
    pub wrong_answer_1: String,
    pub wrong_answer_2: String,
    pub wrong_answer_3: String,
    pub active: bool,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt", with = "bson_datetime_as_chrono")]
    pub updated_at: DateTime<Utc>,
}

impl Question {
    /// The four answer strings in stored order, correct answer first.
    pub fn answers(&self) -> [&str; 4] {
        [
            &self.correct_answer,
            &self.wrong_answer_1,
            &self.wrong_answer_2,
            &self.wrong_answer_3,
        ]
    }
}

/// A question as delivered to a quiz taker: no correct-answer marker,
/// options already shuffled for this request.
#[derive(Debug, Serialize)]
pub struct QuizQuestion {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub topic: u8,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(range(min = 1, max = 3, message = "Topic must be 1, 2 or 3"))]
    pub topic: u8,

    #[validate(length(min = 1, message = "Prompt is required"))]
    pub prompt: String,

    #[validate(length(min = 1, message = "Correct answer is required"))]
    pub correct_answer: String,

    #[validate(length(min = 1, message = "Wrong answer 1 is required"))]
    pub wrong_answer_1: String,

    #[validate(length(min = 1, message = "Wrong answer 2 is required"))]
    pub wrong_answer_2: String,

    #[validate(length(min = 1, message = "Wrong answer 3 is required"))]
    pub wrong_answer_3: String,
}

/// Admin update; the topic of an existing question never changes.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, message = "Prompt must not be empty"))]
    pub prompt: Option<String>,

    #[validate(length(min = 1, message = "Correct answer must not be empty"))]
    pub correct_answer: Option<String>,

    #[validate(length(min = 1, message = "Wrong answer 1 must not be empty"))]
    pub wrong_answer_1: Option<String>,

    #[validate(length(min = 1, message = "Wrong answer 2 must not be empty"))]
    pub wrong_answer_2: Option<String>,

    #[validate(length(min = 1, message = "Wrong answer 3 must not be empty"))]
    pub wrong_answer_3: Option<String>,

    pub active: Option<bool>,
}

/// Query params for the admin question listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuestionsQuery {
    pub topic: Option<u8>,
    pub active: Option<bool>,
}

/// One submitted answer.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerPair {
    pub question_id: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyAnswersRequest {
    pub answers: Vec<AnswerPair>,
}

/// Per-question verification detail.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AnswerDetail {
    pub question_id: String,
    pub correct: bool,
    pub correct_answer: String,
}

/// Outcome of scoring one submission.
#[derive(Debug, Serialize)]
pub struct EvaluationReport {
    pub correct_count: usize,
    pub total: usize,
    pub percentage: u32,
    pub passed: bool,
    pub results: Vec<AnswerDetail>,
}

pub fn valid_topic(topic: u8) -> bool {
    (1..=TOPIC_COUNT).contains(&topic)
}
