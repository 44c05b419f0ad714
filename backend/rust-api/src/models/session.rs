use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::models::user::{bson_datetime_as_chrono, bson_datetime_as_chrono_option};

/// Login/logout interval for one user, stored in "login_sessions".
///
/// Created at login, closed at logout. Not part of the evaluation core; the
/// admin user view reads these for connected-time reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSession {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    #[serde(with = "bson_datetime_as_chrono")]
    pub started_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson_datetime_as_chrono_option"
    )]
    pub ended_at: Option<DateTime<Utc>>,
    /// Connected time in seconds, filled in when the session closes.
    #[serde(default)]
    pub duration_secs: i64,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Query params for the admin per-user session listing.
#[derive(Debug, Default, Deserialize)]
pub struct ListSessionsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}
