//! Cloud-issued records.
//!
//! The cloud assigns these at registration time and owns their schema. Apart
//! from the identifier, every field is opaque to the device: unknown fields
//! are captured verbatim so that a persisted record re-serializes to exactly
//! what the cloud sent.

use serde::{Deserialize, Serialize};

/// The cloud's record identifying this device once registered.
///
/// Returned by `POST /v1/stations` and persisted as-is. The `id` is the only
/// field the device itself interprets; everything else rides along in
/// `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceAccount {
    /// Cloud-assigned identifier (guid).
    pub id: String,
    /// Opaque cloud-issued fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ServiceAccount {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            extra: serde_json::Map::new(),
        }
    }
}

/// A remote user record, as returned by `GET /v1/users/<guid>`.
///
/// Same opacity contract as [`ServiceAccount`]: the device relays these, it
/// does not interpret them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Cloud-assigned user identifier (guid).
    pub id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn service_account_roundtrip_preserves_unknown_fields() {
        let raw = json!({
            "id": "sa-1",
            "label": "living-room-nas",
            "quota": { "bytes": 1_000_000 }
        });

        let account: ServiceAccount = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(account.id, "sa-1");
        assert_eq!(account.extra["label"], "living-room-nas");

        // Re-serializing yields the original document.
        let back = serde_json::to_value(&account).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn service_account_requires_id() {
        let raw = json!({ "label": "no-id-here" });
        let result: Result<ServiceAccount, _> = serde_json::from_value(raw);
        assert!(result.is_err());
    }

    #[test]
    fn service_account_minimal() {
        let account = ServiceAccount::new("sa-2");
        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(json, r#"{"id":"sa-2"}"#);
        let parsed: ServiceAccount = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, account);
    }

    #[test]
    fn user_info_roundtrip() {
        let raw = json!({
            "id": "u-42",
            "username": "alice",
            "avatar": null
        });
        let user: UserInfo = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(user.id, "u-42");
        assert_eq!(serde_json::to_value(&user).unwrap(), raw);
    }
}
