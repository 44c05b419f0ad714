use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::user::bson_datetime_as_chrono;

/// Proof of course completion, stored in MongoDB "certificates" collection.
///
/// At most one per user and a globally unique human-readable code, both
/// enforced by unique indexes. Never mutated after creation; an admin
/// progress reset deletes it together with the progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    /// Public verification code, e.g. `CERT-2026-A1B2C3`.
    pub code: String,
    #[serde(with = "bson_datetime_as_chrono")]
    pub issued_at: DateTime<Utc>,
    pub course: String,
    /// Rounded average of the three topic scores.
    pub final_score: u32,
}

/// Compact certificate view embedded in progress responses.
#[derive(Debug, Serialize)]
pub struct CertificateSummary {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub final_score: u32,
}

impl From<&Certificate> for CertificateSummary {
    fn from(cert: &Certificate) -> Self {
        CertificateSummary {
            code: cert.code.clone(),
            issued_at: cert.issued_at,
            final_score: cert.final_score,
        }
    }
}

/// Public verification view, resolved by code without authentication.
#[derive(Debug, Serialize)]
pub struct VerifiedCertificate {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub course: String,
    pub final_score: u32,
    pub holder_name: String,
    pub holder_id_number: String,
}
