/// Public contact form submissions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContactMessage {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

impl ContactMessage {
    pub async fn create<'e>(executor: impl PgExecutor<'e>, data: NewContactMessage) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ContactMessage>(
            "INSERT INTO contact_messages (name, email, subject, message)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, email, subject, message, created_at",
        )
        .bind(data.name)
        .bind(data.email)
        .bind(data.subject)
        .bind(data.message)
        .fetch_one(executor)
        .await
    }
}
