use std::collections::HashMap;

use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::errors::ServiceError;
use crate::metrics::ANSWERS_VERIFIED_TOTAL;
use crate::models::progress::is_passing;
use crate::models::question::{
    valid_topic, AnswerDetail, AnswerPair, CreateQuestionRequest, EvaluationReport,
    ListQuestionsQuery, Question, QuizQuestion, UpdateQuestionRequest,
};

pub struct QuestionService {
    mongo: Database,
}

impl QuestionService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn collection(&self) -> mongodb::Collection<Question> {
        self.mongo.collection("questions")
    }

    /// Active questions for one topic, options shuffled per request.
    pub async fn questions_for_topic(&self, topic: u8) -> Result<Vec<QuizQuestion>, ServiceError> {
        if !valid_topic(topic) {
            return Err(ServiceError::Validation(format!(
                "topic must be 1, 2 or 3, got {}",
                topic
            )));
        }

        let mut cursor = self
            .collection()
            .find(doc! { "topic": topic as i32, "active": true })
            .await?;

        let mut questions = Vec::new();
        while let Some(question) = cursor.try_next().await? {
            questions.push(question);
        }

        // Shuffling happens after the cursor is drained: ThreadRng must not
        // live across an await point.
        let mut rng = rand::rng();
        let quiz: Vec<QuizQuestion> = questions
            .into_iter()
            .map(|question| {
                let options = shuffle_options(&mut rng, &question);
                QuizQuestion {
                    id: question.id.map(|id| id.to_hex()).unwrap_or_default(),
                    options,
                    prompt: question.prompt,
                    topic: question.topic,
                }
            })
            .collect();

        tracing::debug!("Serving {} questions for topic {}", quiz.len(), topic);
        Ok(quiz)
    }

    /// Scores a submission against the stored correct answers.
    ///
    /// A pair whose question id does not resolve stays in the submitted
    /// total but is dropped from the correct count and the detail list.
    pub async fn verify_answers(
        &self,
        answers: &[AnswerPair],
    ) -> Result<EvaluationReport, ServiceError> {
        if answers.is_empty() {
            return Err(ServiceError::InvalidInput(
                "answer submission must not be empty".to_string(),
            ));
        }

        let ids: Vec<ObjectId> = answers
            .iter()
            .filter_map(|pair| ObjectId::parse_str(&pair.question_id).ok())
            .collect();

        let mut correct_by_id = HashMap::new();
        let mut cursor = self
            .collection()
            .find(doc! { "_id": { "$in": ids } })
            .await?;
        while let Some(question) = cursor.try_next().await? {
            if let Some(id) = question.id {
                correct_by_id.insert(id.to_hex(), question.correct_answer);
            }
        }

        let report = score_submission(answers, &correct_by_id);
        for detail in &report.results {
            ANSWERS_VERIFIED_TOTAL
                .with_label_values(&[if detail.correct { "true" } else { "false" }])
                .inc();
        }

        tracing::info!(
            "Verified submission: {}/{} correct, {}%, passed={}",
            report.correct_count,
            report.total,
            report.percentage,
            report.passed
        );
        Ok(report)
    }

    /// Admin listing; unlike quiz delivery this includes inactive questions.
    pub async fn list_questions(
        &self,
        query: ListQuestionsQuery,
    ) -> Result<Vec<Question>, ServiceError> {
        let mut filter = doc! {};
        if let Some(topic) = query.topic {
            filter.insert("topic", topic as i32);
        }
        if let Some(active) = query.active {
            filter.insert("active", active);
        }

        let mut cursor = self
            .collection()
            .find(filter)
            .sort(doc! { "topic": 1, "createdAt": -1 })
            .await?;

        let mut questions = Vec::new();
        while let Some(question) = cursor.try_next().await? {
            questions.push(question);
        }
        Ok(questions)
    }

    pub async fn create_question(
        &self,
        req: CreateQuestionRequest,
    ) -> Result<Question, ServiceError> {
        let now = Utc::now();
        let question = Question {
            id: None,
            topic: req.topic,
            prompt: req.prompt,
            correct_answer: req.correct_answer,
            wrong_answer_1: req.wrong_answer_1,
            wrong_answer_2: req.wrong_answer_2,
            wrong_answer_3: req.wrong_answer_3,
            active: true,
            created_at: now,
            updated_at: now,
        };

        let insert_result = self.collection().insert_one(&question).await?;
        let question_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow::anyhow!("Failed to get inserted question ID"))?;

        self.collection()
            .find_one(doc! { "_id": question_id })
            .await?
            .ok_or(ServiceError::NotFound("question"))
    }

    pub async fn update_question(
        &self,
        question_id: &str,
        req: UpdateQuestionRequest,
    ) -> Result<Question, ServiceError> {
        let object_id = parse_question_id(question_id)?;

        let mut set_doc = doc! {
            "updatedAt": mongodb::bson::DateTime::from_millis(Utc::now().timestamp_millis()),
        };
        if let Some(prompt) = req.prompt {
            set_doc.insert("prompt", prompt);
        }
        if let Some(correct_answer) = req.correct_answer {
            set_doc.insert("correct_answer", correct_answer);
        }
        if let Some(wrong_answer_1) = req.wrong_answer_1 {
            set_doc.insert("wrong_answer_1", wrong_answer_1);
        }
        if let Some(wrong_answer_2) = req.wrong_answer_2 {
            set_doc.insert("wrong_answer_2", wrong_answer_2);
        }
        if let Some(wrong_answer_3) = req.wrong_answer_3 {
            set_doc.insert("wrong_answer_3", wrong_answer_3);
        }
        if let Some(active) = req.active {
            set_doc.insert("active", active);
        }

        let update_result = self
            .collection()
            .update_one(doc! { "_id": object_id }, doc! { "$set": set_doc })
            .await?;
        if update_result.matched_count == 0 {
            return Err(ServiceError::NotFound("question"));
        }

        self.collection()
            .find_one(doc! { "_id": object_id })
            .await?
            .ok_or(ServiceError::NotFound("question"))
    }

    /// Soft delete: flips `active` off, never removes the document.
    pub async fn soft_delete_question(&self, question_id: &str) -> Result<(), ServiceError> {
        let object_id = parse_question_id(question_id)?;

        let update_result = self
            .collection()
            .update_one(
                doc! { "_id": object_id },
                doc! { "$set": {
                    "active": false,
                    "updatedAt": mongodb::bson::DateTime::from_millis(Utc::now().timestamp_millis()),
                } },
            )
            .await?;

        if update_result.matched_count == 0 {
            return Err(ServiceError::NotFound("question"));
        }
        Ok(())
    }
}

fn parse_question_id(question_id: &str) -> Result<ObjectId, ServiceError> {
    ObjectId::parse_str(question_id)
        .map_err(|_| ServiceError::Validation(format!("invalid question id: {}", question_id)))
}

/// Randomized presentation order for a question's four answers.
///
/// Pure in its inputs plus the injected random source; the stored ordering
/// is never touched. Called on every retrieval, not once at creation.
pub fn shuffle_options<R: Rng + ?Sized>(rng: &mut R, question: &Question) -> Vec<String> {
    let mut options: Vec<String> = question
        .answers()
        .iter()
        .map(|answer| answer.to_string())
        .collect();
    options.shuffle(rng);
    options
}

/// Pure scoring over an already-resolved correct-answer map.
///
/// `total` counts every submitted pair; unresolved ids contribute to the
/// denominator only. Correctness is exact, case-sensitive equality.
/// Callers must reject empty submissions before calling.
pub fn score_submission(
    answers: &[AnswerPair],
    correct_by_id: &HashMap<String, String>,
) -> EvaluationReport {
    let total = answers.len();
    let mut correct_count = 0;
    let mut results = Vec::new();

    for pair in answers {
        let Some(correct_answer) = correct_by_id.get(&pair.question_id) else {
            continue;
        };
        let correct = *correct_answer == pair.answer;
        if correct {
            correct_count += 1;
        }
        results.push(AnswerDetail {
            question_id: pair.question_id.clone(),
            correct,
            correct_answer: correct_answer.clone(),
        });
    }

    let percentage = (correct_count as f64 / total as f64 * 100.0).round() as u32;

    EvaluationReport {
        correct_count,
        total,
        percentage,
        passed: is_passing(percentage),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn question(correct: &str, wrong: [&str; 3]) -> Question {
        let now = Utc::now();
        Question {
            id: Some(ObjectId::new()),
            topic: 1,
            prompt: "prompt".to_string(),
            correct_answer: correct.to_string(),
            wrong_answer_1: wrong[0].to_string(),
            wrong_answer_2: wrong[1].to_string(),
            wrong_answer_3: wrong[2].to_string(),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn pair(id: &str, answer: &str) -> AnswerPair {
        AnswerPair {
            question_id: id.to_string(),
            answer: answer.to_string(),
        }
    }

    #[test]
    fn shuffle_is_a_permutation_of_all_four_answers() {
        let q = question("a", ["b", "c", "d"]);
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..100 {
            let mut options = shuffle_options(&mut rng, &q);
            options.sort();
            assert_eq!(options, vec!["a", "b", "c", "d"]);
        }
    }

    #[test]
    fn shuffle_does_not_mutate_the_question() {
        let q = question("a", ["b", "c", "d"]);
        let mut rng = StdRng::seed_from_u64(2);
        let _ = shuffle_options(&mut rng, &q);
        assert_eq!(q.correct_answer, "a");
        assert_eq!(q.answers(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn correct_answer_position_is_roughly_uniform() {
        let q = question("a", ["b", "c", "d"]);
        let mut rng = StdRng::seed_from_u64(3);
        let mut position_counts = [0u32; 4];

        let runs = 4000;
        for _ in 0..runs {
            let options = shuffle_options(&mut rng, &q);
            let position = options.iter().position(|o| o == "a").unwrap();
            position_counts[position] += 1;
        }

        // Expected 1000 per slot; a wide band keeps the test stable.
        for count in position_counts {
            assert!(
                (800..1200).contains(&count),
                "correct answer position skewed: {:?}",
                position_counts
            );
        }
    }

    #[test]
    fn scores_exact_case_sensitive_matches() {
        let mut correct_by_id = HashMap::new();
        correct_by_id.insert("q1".to_string(), "Paris".to_string());
        correct_by_id.insert("q2".to_string(), "Madrid".to_string());

        let report = score_submission(
            &[pair("q1", "Paris"), pair("q2", "madrid")],
            &correct_by_id,
        );

        assert_eq!(report.correct_count, 1);
        assert_eq!(report.total, 2);
        assert_eq!(report.percentage, 50);
        assert!(!report.passed);
        assert_eq!(report.results.len(), 2);
        assert!(report.results[0].correct);
        assert!(!report.results[1].correct);
    }

    #[test]
    fn missing_question_counts_toward_total_only() {
        let mut correct_by_id = HashMap::new();
        correct_by_id.insert("q1".to_string(), "yes".to_string());

        let report = score_submission(
            &[
                pair("q1", "yes"),
                pair("unknown", "yes"),
                pair("also-unknown", "no"),
            ],
            &correct_by_id,
        );

        // 1 correct out of 3 submitted; detail only covers resolved pairs.
        assert_eq!(report.correct_count, 1);
        assert_eq!(report.total, 3);
        assert_eq!(report.percentage, 33);
        assert!(!report.passed);
        assert_eq!(report.results.len(), 1);
    }

    // The driver connects lazily, so validation paths that return before
    // any storage call can be exercised without a running MongoDB.
    async fn detached_service() -> QuestionService {
        let client = mongodb::Client::with_uri_str("mongodb://127.0.0.1:27099")
            .await
            .unwrap();
        QuestionService::new(client.database("certcourse_test"))
    }

    #[tokio::test]
    async fn empty_submission_is_rejected_before_any_lookup() {
        let service = detached_service().await;
        let err = service.verify_answers(&[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn out_of_range_topic_is_rejected_before_any_lookup() {
        let service = detached_service().await;
        for topic in [0u8, 4, 200] {
            let err = service.questions_for_topic(topic).await.unwrap_err();
            assert!(matches!(err, ServiceError::Validation(_)));
        }
    }

    #[test]
    fn percentage_rounds_and_pass_threshold_applies() {
        let mut correct_by_id = HashMap::new();
        for i in 0..5 {
            correct_by_id.insert(format!("q{}", i), "x".to_string());
        }

        // 3/5 = 60%, the boundary pass.
        let answers: Vec<AnswerPair> = (0..5)
            .map(|i| pair(&format!("q{}", i), if i < 3 { "x" } else { "y" }))
            .collect();
        let report = score_submission(&answers, &correct_by_id);
        assert_eq!(report.percentage, 60);
        assert!(report.passed);

        // 2/3 = 66.67% rounds to 67.
        let answers: Vec<AnswerPair> = (0..3)
            .map(|i| pair(&format!("q{}", i), if i < 2 { "x" } else { "y" }))
            .collect();
        let report = score_submission(&answers, &correct_by_id);
        assert_eq!(report.percentage, 67);
        assert!(report.passed);
    }
}
