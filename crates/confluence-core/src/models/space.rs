use serde::{Deserialize, Serialize};

use super::document::User;

/// A workspace that groups documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DocumentSpace {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "createdBy")]
    pub created_by: User,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(rename = "isPrivate", default)]
    pub is_private: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_space() {
        let json = r#"{
            "id": "s1",
            "name": "Engineering",
            "createdAt": "2024-01-01T00:00:00Z",
            "createdBy": {"id": "u1", "name": "Ada", "email": "ada@example.com"},
            "updatedAt": "2024-02-01T00:00:00Z",
            "icon": "gear",
            "isPrivate": true
        }"#;

        let space: DocumentSpace = serde_json::from_str(json).expect("Failed to parse space JSON");
        assert_eq!(space.name, "Engineering");
        assert_eq!(space.description, None);
        assert_eq!(space.icon.as_deref(), Some("gear"));
        assert!(space.is_private);

        let out = serde_json::to_value(&space).unwrap();
        assert!(out.get("description").is_none());
        assert_eq!(out["createdBy"]["id"], "u1");
    }
}
