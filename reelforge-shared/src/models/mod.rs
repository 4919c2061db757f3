/// Database models for Reelforge
///
/// Each model owns the SQL for its table. Resource models (`video`,
/// `crm_contact`) take the owning user's id on every call and scope every
/// statement by it.
///
/// # Models
///
/// - `user`: Identity records
/// - `account`: Provider links (credentials accounts carry the password hash)
/// - `session`: Server-side sessions keyed by opaque token
/// - `verification_token`: Single-use verification tokens
/// - `video`: Video generation requests
/// - `crm_contact`: CRM contact list entries
/// - `contact_message`: Public contact form submissions

pub mod account;
pub mod contact_message;
pub mod crm_contact;
pub mod session;
pub mod user;
pub mod verification_token;
pub mod video;

use serde::{Deserialize, Deserializer};

/// Deserializes a field that distinguishes "absent" from "explicit null"
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: a missing
/// key yields `None`, `null` yields `Some(None)`, a value yields `Some(Some(v))`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        phone: Option<Option<String>>,
    }

    #[test]
    fn test_double_option_distinguishes_null_from_absent() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.phone, None);

        let null: Patch = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        assert_eq!(null.phone, Some(None));

        let value: Patch = serde_json::from_str(r#"{"phone": "555"}"#).unwrap();
        assert_eq!(value.phone, Some(Some("555".to_string())));
    }
}
