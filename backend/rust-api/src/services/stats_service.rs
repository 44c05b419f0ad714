use mongodb::bson::doc;
use mongodb::Database;
use serde::Serialize;

use crate::errors::ServiceError;
use crate::models::certificate::Certificate;
use crate::models::user::User;

/// Read-only rollups for the admin dashboard.
#[derive(Debug, Serialize)]
pub struct CourseStatistics {
    pub total_advisors: u64,
    pub active_advisors: u64,
    pub completed_topic1: u64,
    pub completed_topic2: u64,
    pub completed_topic3: u64,
    pub certificates_issued: u64,
    /// Percentage of advisors holding a certificate.
    pub completion_rate: u32,
}

pub struct StatsService {
    mongo: Database,
}

impl StatsService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    /// Count rollups over users and certificates. No writes, no locking
    /// beyond the storage layer's read consistency.
    pub async fn course_statistics(&self) -> Result<CourseStatistics, ServiceError> {
        let users = self.mongo.collection::<User>("users");
        let certificates = self.mongo.collection::<Certificate>("certificates");

        let total_advisors = users.count_documents(doc! { "role": "advisor" }).await?;
        let active_advisors = users
            .count_documents(doc! { "role": "advisor", "status": "active" })
            .await?;

        let completed_topic1 = users
            .count_documents(doc! { "role": "advisor", "progress.topic1.completed": true })
            .await?;
        let completed_topic2 = users
            .count_documents(doc! { "role": "advisor", "progress.topic2.completed": true })
            .await?;
        let completed_topic3 = users
            .count_documents(doc! { "role": "advisor", "progress.topic3.completed": true })
            .await?;

        let certificates_issued = certificates.count_documents(doc! {}).await?;

        Ok(CourseStatistics {
            total_advisors,
            active_advisors,
            completed_topic1,
            completed_topic2,
            completed_topic3,
            certificates_issued,
            completion_rate: completion_rate(certificates_issued, total_advisors),
        })
    }
}

/// round(certificates / total_advisors * 100), 0 for an empty course.
pub fn completion_rate(certificates_issued: u64, total_advisors: u64) -> u32 {
    if total_advisors == 0 {
        return 0;
    }
    (certificates_issued as f64 / total_advisors as f64 * 100.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_rate_rounds() {
        assert_eq!(completion_rate(1, 3), 33);
        assert_eq!(completion_rate(2, 3), 67);
        assert_eq!(completion_rate(3, 3), 100);
        assert_eq!(completion_rate(0, 10), 0);
    }

    #[test]
    fn completion_rate_with_no_advisors_is_zero() {
        assert_eq!(completion_rate(0, 0), 0);
        assert_eq!(completion_rate(5, 0), 0);
    }
}
