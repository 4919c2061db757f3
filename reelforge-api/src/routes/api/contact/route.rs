/// Public contact form
///
/// `POST /api/contact` stores the message; no session required.

use axum::{extract::State, Json};
use reelforge_shared::models::contact_message::{ContactMessage, NewContactMessage};
use serde::Deserialize;
use serde_json::{json, Value};
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
    RouteModule::new().post(submit_contact_form)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactFormRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "subject is required"))]
    pub subject: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "message is required"))]
    pub message: String,
}

pub async fn submit_contact_form(
    State(state): State<AppState>,
    ctx: RequestContext,
    ValidatedJson(req): ValidatedJson<ContactFormRequest>,
) -> ApiResult<Json<Value>> {
    let data = NewContactMessage {
        name: req.name,
        email: req.email,
        subject: req.subject,
        message: req.message,
    };

    let stored = ContactMessage::create(state.db.pool(), data)
        .await
        .map_err(|e| db_error(&ctx, "Failed to send message", e))?;

    tracing::info!(request_id = %ctx.request_id, message_id = %stored.id, "Contact message received");

    Ok(Json(json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_fields_required() {
        let req: ContactFormRequest = serde_json::from_str(r#"{"name":"Ada","email":"ada@example.com"}"#).unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();

        assert_eq!(fields.len(), 2);
        assert!(fields.contains_key("subject"));
        assert!(fields.contains_key("message"));
    }
}
