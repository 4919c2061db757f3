/// Video generation requests
///
/// A video row records what the user asked for; generation itself happens
/// elsewhere and moves `status` forward.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE videos (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title TEXT NOT NULL,
///     description TEXT,
///     prompt TEXT NOT NULL,
///     quality TEXT NOT NULL DEFAULT '1080p',
///     status TEXT NOT NULL DEFAULT 'processing',
///     video_url TEXT,
///     thumbnail_url TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT videos_status_check CHECK (
///         status IN ('processing', 'pending', 'completed')
///     )
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Quality used when the request doesn't name one
pub const DEFAULT_QUALITY: &str = "1080p";

const VIDEO_COLUMNS: &str = "id, user_id, title, description, prompt, quality, status, video_url, \
     thumbnail_url, created_at";

/// Generation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Processing,
    Pending,
    Completed,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Pending => "pending",
            VideoStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(VideoStatus::Processing),
            "pending" => Some(VideoStatus::Pending),
            "completed" => Some(VideoStatus::Completed),
            _ => None,
        }
    }
}

/// Video row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Video {
    pub id: Uuid,

    /// Owner; never echoed to clients
    #[serde(skip_serializing)]
    pub user_id: Uuid,

    pub title: String,
    pub description: Option<String>,
    pub prompt: String,

    /// Requested output quality, e.g. `1080p`
    pub quality: String,

    /// One of `processing`, `pending`, `completed`
    pub status: String,

    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Video {
    /// Parsed status
    pub fn get_status(&self) -> Option<VideoStatus> {
        VideoStatus::from_str(&self.status)
    }
}

/// Input for a new video request
#[derive(Debug, Clone, PartialEq)]
pub struct NewVideo {
    pub title: String,
    pub description: Option<String>,
    pub prompt: String,
    pub quality: Option<String>,
}

impl Video {
    /// Lists a user's videos, newest first
    pub async fn list_by_user<'e>(executor: impl PgExecutor<'e>, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Video>(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(executor)
        .await
    }

    /// Records a new request in `processing` state
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        data: NewVideo,
    ) -> Result<Self, sqlx::Error> {
        let quality = data.quality.unwrap_or_else(|| DEFAULT_QUALITY.to_string());

        sqlx::query_as::<_, Video>(&format!(
            "INSERT INTO videos (user_id, title, description, prompt, quality, status)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {VIDEO_COLUMNS}"
        ))
        .bind(user_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.prompt)
        .bind(quality)
        .bind(VideoStatus::Processing.as_str())
        .fetch_one(executor)
        .await
    }
}
