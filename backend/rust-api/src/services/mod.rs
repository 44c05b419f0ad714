use crate::config::Config;
use crate::models::{Certificate, Question, User};
use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client as MongoClient, Database, IndexModel};

pub struct AppState {
    pub config: Config,
    pub mongo: Database,
}

impl AppState {
    pub async fn new(config: Config, mongo_client: MongoClient) -> anyhow::Result<Self> {
        let mongo = mongo_client.database(&config.mongo_database);

        ensure_indexes(&mongo).await?;

        Ok(Self { config, mongo })
    }
}

/// Creates the unique indexes the domain invariants rely on: one account
/// per id number/email, at most one certificate per user, globally unique
/// certificate codes. Idempotent; safe to run on every startup.
pub async fn ensure_indexes(mongo: &Database) -> anyhow::Result<()> {
    let unique = || IndexOptions::builder().unique(true).build();

    let users = mongo.collection::<User>("users");
    users
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique())
                .build(),
        )
        .await?;
    users
        .create_index(
            IndexModel::builder()
                .keys(doc! { "id_number": 1 })
                .options(unique())
                .build(),
        )
        .await?;

    let certificates = mongo.collection::<Certificate>("certificates");
    certificates
        .create_index(
            IndexModel::builder()
                .keys(doc! { "user_id": 1 })
                .options(unique())
                .build(),
        )
        .await?;
    certificates
        .create_index(
            IndexModel::builder()
                .keys(doc! { "code": 1 })
                .options(unique())
                .build(),
        )
        .await?;

    // Quiz delivery always filters on (topic, active).
    let questions = mongo.collection::<Question>("questions");
    questions
        .create_index(
            IndexModel::builder()
                .keys(doc! { "topic": 1, "active": 1 })
                .build(),
        )
        .await?;

    tracing::info!("MongoDB indexes ensured");
    Ok(())
}

pub mod auth_service;
pub mod certificate_service;
pub mod progress_service;
pub mod question_service;
pub mod session_service;
pub mod stats_service;
pub mod user_management_service;
