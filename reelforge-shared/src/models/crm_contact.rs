/// CRM contact list
///
/// Every query here is scoped by the owning user's id; a contact that belongs
/// to someone else is indistinguishable from one that doesn't exist.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE crm_contacts (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     email TEXT NOT NULL,
///     phone TEXT,
///     company TEXT,
///     position TEXT,
///     status TEXT NOT NULL DEFAULT 'lead',
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT crm_contacts_status_check CHECK (
///         status IN ('lead', 'prospect', 'customer', 'inactive')
///     )
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

const CONTACT_COLUMNS: &str = "id, user_id, name, email, phone, company, position, status, notes, \
     created_at, updated_at";

/// Pipeline stage of a contact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    #[default]
    Lead,
    Prospect,
    Customer,
    Inactive,
}

impl ContactStatus {
    pub const ALL: [ContactStatus; 4] = [
        ContactStatus::Lead,
        ContactStatus::Prospect,
        ContactStatus::Customer,
        ContactStatus::Inactive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::Lead => "lead",
            ContactStatus::Prospect => "prospect",
            ContactStatus::Customer => "customer",
            ContactStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lead" => Some(ContactStatus::Lead),
            "prospect" => Some(ContactStatus::Prospect),
            "customer" => Some(ContactStatus::Customer),
            "inactive" => Some(ContactStatus::Inactive),
            _ => None,
        }
    }
}

/// Contact row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CrmContact {
    pub id: Uuid,

    #[serde(skip_serializing)]
    pub user_id: Uuid,

    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,

    /// One of `lead`, `prospect`, `customer`, `inactive`
    pub status: String,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CrmContact {
    pub fn get_status(&self) -> Option<ContactStatus> {
        ContactStatus::from_str(&self.status)
    }
}

/// Input for a new contact
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub position: Option<String>,
    pub status: ContactStatus,
    pub notes: Option<String>,
}

/// Partial contact update
///
/// Only `Some` fields are written. For nullable columns `Some(None)` stores NULL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContactChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<Option<String>>,
    pub company: Option<Option<String>>,
    pub position: Option<Option<String>>,
    pub status: Option<ContactStatus>,
    pub notes: Option<Option<String>>,
}

impl ContactChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.company.is_none()
            && self.position.is_none()
            && self.status.is_none()
            && self.notes.is_none()
    }
}

/// List filter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContactFilter {
    /// Case-insensitive substring matched against name, email, and company
    pub search: Option<String>,
    pub status: Option<ContactStatus>,
}

/// Escapes LIKE wildcards so the term matches literally
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

impl CrmContact {
    /// Lists a user's contacts, newest first
    pub async fn list<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        filter: &ContactFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {CONTACT_COLUMNS} FROM crm_contacts WHERE user_id = "));
        query.push_bind(user_id);

        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = like_pattern(search);
            query
                .push(" AND (name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR company ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }

        query.push(" ORDER BY created_at DESC");

        query.build_query_as::<CrmContact>().fetch_all(executor).await
    }

    /// Fetches one contact owned by `user_id`
    pub async fn find<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CrmContact>(&format!(
            "SELECT {CONTACT_COLUMNS} FROM crm_contacts WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
    }

    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        data: NewContact,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, CrmContact>(&format!(
            "INSERT INTO crm_contacts (user_id, name, email, phone, company, position, status, notes)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {CONTACT_COLUMNS}"
        ))
        .bind(user_id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.company)
        .bind(data.position)
        .bind(data.status.as_str())
        .bind(data.notes)
        .fetch_one(executor)
        .await
    }

    /// Writes only the fields present in `changes` and refreshes `updated_at`
    ///
    /// Returns `None` when the contact doesn't exist or isn't owned by
    /// `user_id`. Callers reject empty change sets before getting here; an
    /// empty set only touches `updated_at`.
    pub async fn update<'e>(
        executor: impl PgExecutor<'e>,
        user_id: Uuid,
        id: Uuid,
        changes: ContactChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE crm_contacts SET ");
        let mut assignments = query.separated(", ");

        if let Some(name) = changes.name {
            assignments.push("name = ").push_bind_unseparated(name);
        }
        if let Some(email) = changes.email {
            assignments.push("email = ").push_bind_unseparated(email);
        }
        if let Some(phone) = changes.phone {
            assignments.push("phone = ").push_bind_unseparated(phone);
        }
        if let Some(company) = changes.company {
            assignments.push("company = ").push_bind_unseparated(company);
        }
        if let Some(position) = changes.position {
            assignments.push("position = ").push_bind_unseparated(position);
        }
        if let Some(status) = changes.status {
            assignments.push("status = ").push_bind_unseparated(status.as_str());
        }
        if let Some(notes) = changes.notes {
            assignments.push("notes = ").push_bind_unseparated(notes);
        }
        assignments.push("updated_at = NOW()");

        query.push(" WHERE id = ").push_bind(id);
        query.push(" AND user_id = ").push_bind(user_id);
        query.push(format!(" RETURNING {CONTACT_COLUMNS}"));

        query.build_query_as::<CrmContact>().fetch_optional(executor).await
    }

    /// Deletes a contact owned by `user_id`; false when nothing matched
    pub async fn delete<'e>(executor: impl PgExecutor<'e>, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM crm_contacts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_status_default_is_lead() {
        assert_eq!(ContactStatus::default(), ContactStatus::Lead);
        assert_eq!(NewContact::default().status.as_str(), "lead");
    }

    #[test]
    fn test_contact_status_parsing() {
        for status in ContactStatus::ALL {
            assert_eq!(ContactStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ContactStatus::from_str("Lead"), None);
        assert_eq!(ContactStatus::from_str("churned"), None);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("acme"), "%acme%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_contact_changes_is_empty() {
        assert!(ContactChanges::default().is_empty());

        let clear_phone = ContactChanges {
            phone: Some(None),
            ..Default::default()
        };
        assert!(!clear_phone.is_empty());
    }
}
