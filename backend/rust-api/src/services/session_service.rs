use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Database;
use serde::Serialize;

use crate::errors::ServiceError;
use crate::models::session::{ListSessionsQuery, LoginSession};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Serialize)]
pub struct SessionPage {
    pub sessions: Vec<LoginSession>,
    pub total: u64,
    pub pages: u64,
    pub page: u32,
    /// Sum of the durations of all closed sessions, in seconds.
    pub total_connected_secs: i64,
}

pub struct SessionService {
    mongo: Database,
}

impl SessionService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn collection(&self) -> mongodb::Collection<LoginSession> {
        self.mongo.collection("login_sessions")
    }

    /// Opens a session at login time.
    pub async fn open_session(
        &self,
        user_id: ObjectId,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<ObjectId, ServiceError> {
        let session = LoginSession {
            id: None,
            user_id,
            started_at: Utc::now(),
            ended_at: None,
            duration_secs: 0,
            active: true,
            ip,
            user_agent,
        };

        let insert_result = self.collection().insert_one(&session).await?;
        insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow::anyhow!("Failed to get inserted session ID").into())
    }

    /// Closes a session at logout, filling in the connected duration.
    /// A missing or unparsable session id is ignored: logout never fails
    /// over bookkeeping.
    pub async fn close_session(&self, session_id: &str) -> Result<(), ServiceError> {
        let Ok(object_id) = ObjectId::parse_str(session_id) else {
            tracing::debug!("Ignoring logout for unparsable session id {}", session_id);
            return Ok(());
        };

        let Some(session) = self.collection().find_one(doc! { "_id": object_id }).await? else {
            return Ok(());
        };

        let ended_at = Utc::now();
        let duration_secs = (ended_at - session.started_at).num_seconds().max(0);

        self.collection()
            .update_one(
                doc! { "_id": object_id },
                doc! { "$set": {
                    "ended_at": mongodb::bson::DateTime::from_millis(ended_at.timestamp_millis()),
                    "duration_secs": duration_secs,
                    "active": false,
                } },
            )
            .await?;

        Ok(())
    }

    /// Paginated session history for one user, newest first, with the total
    /// connected time across all of them.
    pub async fn sessions_for_user(
        &self,
        user_id: &str,
        query: ListSessionsQuery,
    ) -> Result<SessionPage, ServiceError> {
        let object_id = ObjectId::parse_str(user_id)
            .map_err(|_| ServiceError::Validation(format!("invalid user id: {}", user_id)))?;

        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

        let mut cursor = self
            .collection()
            .find(doc! { "user_id": object_id })
            .sort(doc! { "started_at": -1 })
            .skip(((page - 1) * limit) as u64)
            .limit(limit as i64)
            .await?;

        let mut sessions = Vec::new();
        while let Some(session) = cursor.try_next().await? {
            sessions.push(session);
        }

        let total = self
            .collection()
            .count_documents(doc! { "user_id": object_id })
            .await?;

        let total_connected_secs = self.total_connected_secs(object_id).await?;

        Ok(SessionPage {
            sessions,
            total,
            pages: total.div_ceil(limit as u64),
            page,
            total_connected_secs,
        })
    }

    async fn total_connected_secs(&self, user_id: ObjectId) -> Result<i64, ServiceError> {
        let pipeline = vec![
            doc! { "$match": { "user_id": user_id } },
            doc! { "$group": { "_id": null, "total": { "$sum": "$duration_secs" } } },
        ];

        let mut cursor = self.collection().aggregate(pipeline).await?;
        if let Some(group) = cursor.try_next().await? {
            return Ok(read_total(&group));
        }
        Ok(0)
    }
}

fn read_total(group: &Document) -> i64 {
    group
        .get_i64("total")
        .or_else(|_| group.get_i32("total").map(i64::from))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_reads_both_integer_widths() {
        assert_eq!(read_total(&doc! { "total": 90i64 }), 90);
        assert_eq!(read_total(&doc! { "total": 45i32 }), 45);
        assert_eq!(read_total(&doc! {}), 0);
    }
}
