/// CRM contact collection
///
/// - `GET /api/crm/contacts?search=&status=` - List the caller's contacts
/// - `POST /api/crm/contacts` - Add a contact
///
/// `search` is a case-insensitive substring of name, email, or company;
/// `status` must be one of `lead`, `prospect`, `customer`, `inactive`.

use axum::{
    extract::{Query, State},
    Json,
};
use reelforge_shared::{
    auth::middleware::AuthUser,
    models::crm_contact::{ContactFilter, ContactStatus, CrmContact, NewContact},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ValidatedJson,
    middleware::request_id::RequestContext,
    registry::RouteModule,
    routes::db_error,
};

pub fn module() -> RouteModule<AppState> {
    RouteModule::new().get(list_contacts).post(create_contact)
}

/// Parses a status value; blank means "not given"
pub(crate) fn parse_status(raw: Option<&str>) -> ApiResult<Option<ContactStatus>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => ContactStatus::from_str(value).map(Some).ok_or_else(|| {
            let allowed: Vec<&str> = ContactStatus::ALL.iter().map(|s| s.as_str()).collect();
            ApiError::BadRequest(format!("Invalid status, expected one of: {}", allowed.join(", ")))
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListContactsQuery {
    pub search: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateContactRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "email is required"))]
    pub email: String,

    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,

    /// Defaults to `lead`
    pub status: Option<String>,

    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactListResponse {
    pub contacts: Vec<CrmContact>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub contact: CrmContact,
}

pub async fn list_contacts(
    State(state): State<AppState>,
    ctx: RequestContext,
    AuthUser(user): AuthUser,
    Query(query): Query<ListContactsQuery>,
) -> ApiResult<Json<ContactListResponse>> {
    let filter = ContactFilter {
        search: query.search.filter(|s| !s.trim().is_empty()),
        status: parse_status(query.status.as_deref())?,
    };

    let contacts = CrmContact::list(state.db.pool(), user.id, &filter)
        .await
        .map_err(|e| db_error(&ctx, "Failed to fetch contacts", e))?;

    Ok(Json(ContactListResponse { contacts }))
}

pub async fn create_contact(
    State(state): State<AppState>,
    ctx: RequestContext,
    AuthUser(user): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateContactRequest>,
) -> ApiResult<Json<ContactResponse>> {
    let data = NewContact {
        name: req.name,
        email: req.email,
        phone: req.phone,
        company: req.company,
        position: req.position,
        status: parse_status(req.status.as_deref())?.unwrap_or_default(),
        notes: req.notes,
    };

    let contact = CrmContact::create(state.db.pool(), user.id, data)
        .await
        .map_err(|e| db_error(&ctx, "Failed to create contact", e))?;

    tracing::info!(request_id = %ctx.request_id, contact_id = %contact.id, "Contact created");

    Ok(Json(ContactResponse { contact }))
}
