/// Video generation requests
///
/// - `GET /api/videos` - The caller's videos, newest first
/// - `POST /api/videos` - Submit a new generation request
///
/// New requests start in `processing` with quality `1080p` unless given.

use axum::{extract::State, Json};
use reelforge_shared::{
    auth::middleware::AuthUser,
    models::video::{NewVideo, Video},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    app::AppState,
    error::ApiResult,
    extract::ValidatedJson,
    middleware::request_id::RequestContext,
    registry::RouteModule,
    routes::db_error,
};

pub fn module() -> RouteModule<AppState> {
    RouteModule::new().get(list_videos).post(create_video)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVideoRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,

    pub description: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "prompt is required"))]
    pub prompt: String,

    /// e.g. `720p`, `1080p`, `4k`
    pub quality: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VideoListResponse {
    pub videos: Vec<Video>,
}

#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub video: Video,
}

pub async fn list_videos(
    State(state): State<AppState>,
    ctx: RequestContext,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<VideoListResponse>> {
    let videos = Video::list_by_user(state.db.pool(), user.id)
        .await
        .map_err(|e| db_error(&ctx, "Failed to fetch videos", e))?;

    Ok(Json(VideoListResponse { videos }))
}

pub async fn create_video(
    State(state): State<AppState>,
    ctx: RequestContext,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateVideoRequest>,
) -> ApiResult<Json<VideoResponse>> {
    let data = NewVideo {
        title: req.title,
        description: req.description,
        prompt: req.prompt,
        quality: req.quality.filter(|q| !q.trim().is_empty()),
    };

    let video = Video::create(state.db.pool(), user.id, data)
        .await
        .map_err(|e| db_error(&ctx, "Failed to create video", e))?;

    tracing::info!(request_id = %ctx.request_id, video_id = %video.id, "Video request created");

    Ok(Json(VideoResponse { video }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_missing_title_and_prompt_fail_validation() {
        let req: CreateVideoRequest = serde_json::from_str(r#"{"description":"d"}"#).unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("title"));
        assert!(fields.contains_key("prompt"));
    }

    #[test]
    fn test_module_exports_get_and_post() {
        let methods: Vec<_> = module().methods().collect();
        assert_eq!(methods.len(), 2);
    }
}
