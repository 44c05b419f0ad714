use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;
use serde::Serialize;

use crate::errors::ServiceError;
use crate::metrics::EVALUATIONS_SUBMITTED_TOTAL;
use crate::models::certificate::{Certificate, CertificateSummary};
use crate::models::progress::{is_passing, CourseProgress};
use crate::models::question::valid_topic;
use crate::models::user::User;

use super::certificate_service::CertificateService;

/// Result of one evaluation submission.
#[derive(Debug, Serialize)]
pub struct EvaluationOutcome {
    pub approved: bool,
    pub percentage: u32,
    pub message: String,
    pub progress: CourseProgress,
    pub all_topics_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateSummary>,
}

pub struct ProgressService {
    mongo: Database,
    course_name: String,
}

impl ProgressService {
    pub fn new(mongo: Database, course_name: String) -> Self {
        Self { mongo, course_name }
    }

    fn users(&self) -> mongodb::Collection<User> {
        self.mongo.collection("users")
    }

    fn certificates(&self) -> CertificateService {
        CertificateService::new(self.mongo.clone(), self.course_name.clone())
    }

    /// Applies one verified evaluation submission to the user's progress.
    ///
    /// One logical transaction per user: read progress, compute the
    /// transition on the value object, write it back conditionally (the
    /// unlock gate is repeated in the update filter, so a concurrent reset
    /// cannot be overtaken), then issue the certificate when the course is
    /// complete. A failing submission writes nothing.
    pub async fn submit_evaluation(
        &self,
        user_id: &str,
        topic: u8,
        percentage: u32,
    ) -> Result<EvaluationOutcome, ServiceError> {
        if !valid_topic(topic) {
            return Err(ServiceError::Validation(format!(
                "topic must be 1, 2 or 3, got {}",
                topic
            )));
        }
        if percentage > 100 {
            return Err(ServiceError::Validation(format!(
                "percentage must be between 0 and 100, got {}",
                percentage
            )));
        }

        let object_id = parse_user_id(user_id)?;
        let user = self
            .users()
            .find_one(doc! { "_id": object_id })
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        let passed = is_passing(percentage);
        let mut progress = user.progress;

        if passed {
            // Validates the gate and mutates the local copy only.
            progress.record_pass(topic, percentage)?;

            let mut filter = doc! { "_id": object_id };
            if topic > 1 {
                filter.insert(format!("progress.topic{}.completed", topic - 1), true);
            }

            let mut set_doc = doc! {
                "updatedAt": mongodb::bson::DateTime::from_millis(Utc::now().timestamp_millis()),
            };
            set_doc.insert(format!("progress.topic{}.completed", topic), true);
            set_doc.insert(format!("progress.topic{}.score", topic), percentage as i32);

            let update_result = self
                .users()
                .update_one(filter, doc! { "$set": set_doc })
                .await?;

            if update_result.matched_count == 0 {
                // The gate held at read time but not at write time: the
                // user vanished or an admin reset raced us.
                return match self.users().find_one(doc! { "_id": object_id }).await? {
                    None => Err(ServiceError::NotFound("user")),
                    Some(_) => Err(ServiceError::SequenceViolation),
                };
            }

            tracing::info!(
                "User {} passed topic {} with {}%",
                user_id,
                topic,
                percentage
            );
        }

        EVALUATIONS_SUBMITTED_TOTAL
            .with_label_values(&[if passed { "true" } else { "false" }])
            .inc();

        let all_topics_complete = progress.all_completed();
        let certificate = if all_topics_complete {
            let user_after = User { progress, ..user };
            Some(self.certificates().issue_or_get(&user_after).await?)
        } else {
            None
        };

        Ok(EvaluationOutcome {
            approved: passed,
            percentage,
            message: outcome_message(passed).to_string(),
            progress,
            all_topics_complete,
            certificate: certificate.as_ref().map(CertificateSummary::from),
        })
    }

    /// Progress map plus the certificate, if one was issued.
    pub async fn progress_for_user(
        &self,
        user_id: &str,
    ) -> Result<(CourseProgress, Option<Certificate>), ServiceError> {
        let object_id = parse_user_id(user_id)?;
        let user = self
            .users()
            .find_one(doc! { "_id": object_id })
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        let certificate = self.certificates().find_for_user(object_id).await?;
        Ok((user.progress, certificate))
    }

    /// The caller's own certificate with holder data, or NotFound until the
    /// course is complete.
    pub async fn own_certificate(
        &self,
        user_id: &str,
    ) -> Result<(Certificate, User), ServiceError> {
        let object_id = parse_user_id(user_id)?;
        let user = self
            .users()
            .find_one(doc! { "_id": object_id })
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        let certificate = self
            .certificates()
            .find_for_user(object_id)
            .await?
            .ok_or(ServiceError::NotFound("certificate"))?;

        Ok((certificate, user))
    }

    /// Admin reset: zeroes all topic progress and deletes any certificate.
    pub async fn reset_progress(&self, user_id: &str) -> Result<(), ServiceError> {
        let object_id = parse_user_id(user_id)?;

        let fresh = mongodb::bson::to_bson(&CourseProgress::default())
            .map_err(|e| anyhow::anyhow!("failed to serialize progress: {}", e))?;

        let update_result = self
            .users()
            .update_one(
                doc! { "_id": object_id },
                doc! { "$set": {
                    "progress": fresh,
                    "updatedAt": mongodb::bson::DateTime::from_millis(Utc::now().timestamp_millis()),
                } },
            )
            .await?;

        if update_result.matched_count == 0 {
            return Err(ServiceError::NotFound("user"));
        }

        self.certificates().delete_for_user(object_id).await?;

        tracing::info!("Progress reset for user {}", user_id);
        Ok(())
    }
}

fn parse_user_id(user_id: &str) -> Result<ObjectId, ServiceError> {
    ObjectId::parse_str(user_id)
        .map_err(|_| ServiceError::Validation(format!("invalid user id: {}", user_id)))
}

fn outcome_message(approved: bool) -> &'static str {
    if approved {
        "Congratulations! You have completed this topic"
    } else {
        "You did not reach the minimum score. Try again."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_reflect_outcome() {
        assert!(outcome_message(true).contains("completed"));
        assert!(outcome_message(false).contains("Try again"));
    }

    #[test]
    fn user_id_parsing() {
        assert!(parse_user_id("507f1f77bcf86cd799439011").is_ok());
        assert!(matches!(
            parse_user_id("nope"),
            Err(ServiceError::Validation(_))
        ));
    }

    // Validation happens before any storage round-trip; the lazy driver
    // handle never connects in these tests.
    async fn detached_service() -> ProgressService {
        let client = mongodb::Client::with_uri_str("mongodb://127.0.0.1:27099")
            .await
            .unwrap();
        ProgressService::new(client.database("certcourse_test"), "Test Course".to_string())
    }

    #[tokio::test]
    async fn submission_rejects_bad_topic_before_any_lookup() {
        let service = detached_service().await;
        let err = service
            .submit_evaluation("507f1f77bcf86cd799439011", 0, 80)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn submission_rejects_percentage_over_100_before_any_lookup() {
        let service = detached_service().await;
        let err = service
            .submit_evaluation("507f1f77bcf86cd799439011", 1, 101)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }
}
