use anyhow::Context;
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::Database;

use crate::errors::ServiceError;
use crate::metrics::LOGINS_TOTAL;
use crate::middlewares::auth::JwtService;
use crate::models::user::{
    AccountStatus, AuthResponse, LoginRequest, RegisterRequest, User, UserProfile, UserRole,
};

use super::session_service::SessionService;

pub struct AuthService {
    mongo: Database,
    jwt: JwtService,
}

impl AuthService {
    pub fn new(mongo: Database, jwt: JwtService) -> Self {
        Self { mongo, jwt }
    }

    fn users(&self) -> mongodb::Collection<User> {
        self.mongo.collection("users")
    }

    /// Public self-registration. New accounts are always advisors with a
    /// fresh progress map; administrators are created by other admins.
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ServiceError> {
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
            role: UserRole::Advisor,
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

        let token = self
            .jwt
            .token_for_user(&created)
            .context("Failed to issue token")?;

        tracing::info!("User registered: {}", created.email);

        Ok(AuthResponse {
            token,
            session_id: None,
            user: UserProfile::from(created),
        })
    }

    /// Login with email and password. Opens a login session on success so
    /// admins can audit connected time.
    pub async fn login(
        &self,
        req: LoginRequest,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> Result<AuthResponse, ServiceError> {
        let email = req.email.to_lowercase();

        let Some(user) = self.users().find_one(doc! { "email": &email }).await? else {
            LOGINS_TOTAL.with_label_values(&["failure"]).inc();
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        };

        if user.status == AccountStatus::Inactive {
            LOGINS_TOTAL.with_label_values(&["failure"]).inc();
            return Err(ServiceError::Unauthorized(
                "Your account has been deactivated. Contact the administrator.".to_string(),
            ));
        }

        let password_ok =
            verify(&req.password, &user.password_hash).context("Failed to verify password")?;
        if !password_ok {
            LOGINS_TOTAL.with_label_values(&["failure"]).inc();
            return Err(ServiceError::Unauthorized("Invalid credentials".to_string()));
        }

        let user_id = user
            .id
            .ok_or_else(|| anyhow::anyhow!("user document has no id"))?;

        let session_id = SessionService::new(self.mongo.clone())
            .open_session(user_id, ip, user_agent)
            .await?;

        let token = self
            .jwt
            .token_for_user(&user)
            .context("Failed to issue token")?;

        LOGINS_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!("User logged in: {}", user.email);

        Ok(AuthResponse {
            token,
            session_id: Some(session_id.to_hex()),
            user: UserProfile::from(user),
        })
    }

    /// Logout closes the login session when the client supplies one.
    pub async fn logout(&self, session_id: Option<&str>) -> Result<(), ServiceError> {
        if let Some(session_id) = session_id {
            SessionService::new(self.mongo.clone())
                .close_session(session_id)
                .await?;
        }
        Ok(())
    }

    pub async fn current_user(&self, user_id: &str) -> Result<UserProfile, ServiceError> {
        let object_id = ObjectId::parse_str(user_id)
            .map_err(|_| ServiceError::Validation(format!("invalid user id: {}", user_id)))?;

        let user = self
            .users()
            .find_one(doc! { "_id": object_id })
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        Ok(UserProfile::from(user))
    }
}
