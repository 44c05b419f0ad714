use anyhow::Context;
use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId, Regex};
use mongodb::Database;
use serde::Serialize;

use crate::errors::ServiceError;
use crate::models::user::{
    AccountStatus, CreateUserRequest, ListUsersQuery, UpdateUserRequest, User, UserProfile,
};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub users: Vec<UserProfile>,
    pub total: u64,
    pub pages: u64,
    pub page: u32,
}

pub struct UserManagementService {
    mongo: Database,
}

impl UserManagementService {
    pub fn new(mongo: Database) -> Self {
        Self { mongo }
    }

    fn users(&self) -> mongodb::Collection<User> {
        self.mongo.collection("users")
    }

    /// Admin user creation: same shape as registration plus a role choice.
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<UserProfile, ServiceError> {
        let email = req.email.to_lowercase();

        let existing = self
            .users()
            .find_one(doc! { "$or": [
                { "id_number": &req.id_number },
                { "email": &email },
            ] })
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Validation(
                "A user with this id number or email already exists".to_string(),
            ));
        }

        let password_hash =
            hash(&req.password, DEFAULT_COST).context("Failed to hash password")?;

        let now = Utc::now();
        let user = User {
            id: None,
            id_number: req.id_number,
            name: req.name,
            email,
            phone: req.phone,
            password_hash,
            role: req.role.unwrap_or_default(),
            status: AccountStatus::Active,
            progress: Default::default(),
            created_at: now,
            updated_at: now,
        };

        let insert_result = self.users().insert_one(&user).await?;
        let user_id = insert_result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| anyhow::anyhow!("Failed to get inserted user ID"))?;

        let created = self
            .users()
            .find_one(doc! { "_id": user_id })
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        Ok(UserProfile::from(created))
    }

    /// Paginated listing with status/role filters and a case-insensitive
    /// search over name, email and id number.
    pub async fn list_users(&self, query: ListUsersQuery) -> Result<UserPage, ServiceError> {
        let mut filter = doc! {};

        if let Some(status) = query.status {
            filter.insert("status", status);
        }
        if let Some(role) = query.role {
            filter.insert("role", role);
        }
        if let Some(search) = query.search {
            let regex = Regex {
                pattern: search,
                options: "i".to_string(),
            };
            filter.insert(
                "$or",
                vec![
                    doc! { "name": &regex },
                    doc! { "email": &regex },
                    doc! { "id_number": &regex },
                ],
            );
        }

        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

        let mut cursor = self
            .users()
            .find(filter.clone())
            .sort(doc! { "createdAt": -1 })
            .skip(((page - 1) * limit) as u64)
            .limit(limit as i64)
            .await
            .context("Failed to query users")?;

        let mut users = Vec::new();
        while cursor.advance().await.context("Failed to advance cursor")? {
            let user = cursor
                .deserialize_current()
                .context("Failed to deserialize user")?;
            users.push(UserProfile::from(user));
        }

        let total = self.users().count_documents(filter).await?;

        Ok(UserPage {
            users,
            total,
            pages: total.div_ceil(limit as u64),
            page,
        })
    }

    pub async fn get_user(&self, user_id: &str) -> Result<UserProfile, ServiceError> {
        let user = self.find_user(user_id).await?;
        Ok(UserProfile::from(user))
    }

    pub async fn update_user(
        &self,
        user_id: &str,
        req: UpdateUserRequest,
    ) -> Result<UserProfile, ServiceError> {
        let object_id = parse_user_id(user_id)?;
        let user = self
            .users()
            .find_one(doc! { "_id": object_id })
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        let mut set_doc = doc! {
            "updatedAt": mongodb::bson::DateTime::from_millis(Utc::now().timestamp_millis()),
        };

        if let Some(email) = req.email {
            let email = email.to_lowercase();
            if email != user.email {
                let email_taken = self
                    .users()
                    .find_one(doc! { "email": &email })
                    .await?
                    .is_some();
                if email_taken {
                    return Err(ServiceError::Validation(
                        "Email already in use".to_string(),
                    ));
                }
            }
            set_doc.insert("email", email);
        }
        if let Some(name) = req.name {
            set_doc.insert("name", name);
        }
        if let Some(phone) = req.phone {
            set_doc.insert("phone", phone);
        }
        if let Some(role) = req.role {
            set_doc.insert("role", role.as_str());
        }
        if let Some(status) = req.status {
            set_doc.insert("status", status.as_str());
        }

        self.users()
            .update_one(doc! { "_id": object_id }, doc! { "$set": set_doc })
            .await?;

        let updated = self
            .users()
            .find_one(doc! { "_id": object_id })
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        Ok(UserProfile::from(updated))
    }

    /// Flips Active <-> Inactive. Deactivation is the only removal this
    /// system has; user documents are never deleted.
    pub async fn toggle_status(&self, user_id: &str) -> Result<AccountStatus, ServiceError> {
        let user = self.find_user(user_id).await?;
        let new_status = user.status.toggled();

        self.users()
            .update_one(
                doc! { "_id": user.id },
                doc! { "$set": {
                    "status": new_status.as_str(),
                    "updatedAt": mongodb::bson::DateTime::from_millis(Utc::now().timestamp_millis()),
                } },
            )
            .await?;

        tracing::info!("User {} status set to {}", user_id, new_status.as_str());
        Ok(new_status)
    }

    pub async fn reset_password(
        &self,
        user_id: &str,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        let user = self.find_user(user_id).await?;

        let password_hash =
            hash(new_password, DEFAULT_COST).context("Failed to hash password")?;

        self.users()
            .update_one(
                doc! { "_id": user.id },
                doc! { "$set": {
                    "password_hash": password_hash,
                    "updatedAt": mongodb::bson::DateTime::from_millis(Utc::now().timestamp_millis()),
                } },
            )
            .await?;

        Ok(())
    }

    async fn find_user(&self, user_id: &str) -> Result<User, ServiceError> {
        let object_id = parse_user_id(user_id)?;
        self.users()
            .find_one(doc! { "_id": object_id })
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }
}

fn parse_user_id(user_id: &str) -> Result<ObjectId, ServiceError> {
    ObjectId::parse_str(user_id)
        .map_err(|_| ServiceError::Validation(format!("invalid user id: {}", user_id)))
}
