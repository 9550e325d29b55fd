use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(rename = "avatarUrl", default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum DocumentPermission {
    View,
    Edit,
    Comment,
    Admin,
}

impl std::fmt::Display for DocumentPermission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentPermission::View => write!(f, "view"),
            DocumentPermission::Edit => write!(f, "edit"),
            DocumentPermission::Comment => write!(f, "comment"),
            DocumentPermission::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DocumentCollaborator {
    pub user: User,
    pub permissions: Vec<DocumentPermission>,
    #[serde(rename = "addedAt")]
    pub added_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(rename = "createdBy")]
    pub created_by: User,
    #[serde(rename = "updatedBy")]
    pub updated_by: User,
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub collaborators: Vec<DocumentCollaborator>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "spaceId")]
    pub space_id: String,
    #[serde(rename = "isArchived", default)]
    pub is_archived: bool,
}

impl Document {
    /// Whether `user_id` may edit, either as creator or via a grant.
    pub fn can_edit(&self, user_id: &str) -> bool {
        self.created_by.id == user_id
            || self.collaborators.iter().any(|c| {
                c.user.id == user_id
                    && c.permissions.iter().any(|p| {
                        matches!(p, DocumentPermission::Edit | DocumentPermission::Admin)
                    })
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DocumentList {
    pub documents: Vec<Document>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CollaboratorGrant {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub permissions: Vec<DocumentPermission>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DocumentCreateRequest {
    pub title: String,
    pub content: String,
    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "spaceId")]
    pub space_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collaborators: Option<Vec<CollaboratorGrant>>,
}

/// Partial update; only fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DocumentUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(rename = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "spaceId", skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
    #[serde(rename = "isArchived", skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

/// A saved revision of a document's content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DocumentVersion {
    pub id: String,
    #[serde(rename = "documentId")]
    pub document_id: String,
    #[serde(rename = "versionNumber")]
    pub version_number: u32,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "createdBy")]
    pub created_by: User,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Character range in the document content a comment is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CommentPosition {
    #[serde(rename = "startOffset")]
    pub start_offset: u64,
    #[serde(rename = "endOffset")]
    pub end_offset: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DocumentComment {
    pub id: String,
    #[serde(rename = "documentId")]
    pub document_id: String,
    pub content: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
    #[serde(rename = "createdBy")]
    pub created_by: User,
    /// Set on replies.
    #[serde(rename = "parentId", default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(rename = "isResolved", default)]
    pub is_resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<CommentPosition>,
}

impl DocumentComment {
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_document() {
        let json = r##"{
            "id": "d1",
            "title": "Roadmap",
            "content": "# Q3",
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-02T10:00:00Z",
            "createdBy": {"id": "u1", "name": "Ada", "email": "ada@example.com"},
            "updatedBy": {"id": "u2", "name": "Grace", "email": "grace@example.com", "avatarUrl": "https://cdn/g.png"},
            "collaborators": [
                {"user": {"id": "u2", "name": "Grace", "email": "grace@example.com"}, "permissions": ["view", "edit"], "addedAt": "2024-05-01T11:00:00Z"}
            ],
            "tags": ["planning"],
            "spaceId": "s1",
            "isArchived": false
        }"##;

        let doc: Document = serde_json::from_str(json).expect("Failed to parse document JSON");
        assert_eq!(doc.title, "Roadmap");
        assert_eq!(doc.parent_id, None);
        assert_eq!(doc.updated_by.avatar_url.as_deref(), Some("https://cdn/g.png"));
        assert_eq!(
            doc.collaborators[0].permissions,
            vec![DocumentPermission::View, DocumentPermission::Edit]
        );
        assert!(doc.can_edit("u1"));
        assert!(doc.can_edit("u2"));
        assert!(!doc.can_edit("u3"));
    }

    #[test]
    fn test_parse_version() {
        let json = r#"{
            "id": "v3",
            "documentId": "d1",
            "versionNumber": 3,
            "content": "Draft",
            "createdAt": "2024-05-03T09:00:00Z",
            "createdBy": {"id": "u1", "name": "Ada", "email": "ada@example.com"}
        }"#;

        let version: DocumentVersion = serde_json::from_str(json).expect("Failed to parse version JSON");
        assert_eq!(version.version_number, 3);
        assert_eq!(version.document_id, "d1");
        assert_eq!(version.comment, None);
    }

    #[test]
    fn test_parse_comment() {
        let json = r#"{
            "id": "c2",
            "documentId": "d1",
            "content": "Typo here",
            "createdAt": "2024-05-03T09:00:00Z",
            "updatedAt": "2024-05-03T09:05:00Z",
            "createdBy": {"id": "u2", "name": "Grace", "email": "grace@example.com"},
            "parentId": "c1",
            "isResolved": true,
            "position": {"startOffset": 10, "endOffset": 14}
        }"#;

        let comment: DocumentComment = serde_json::from_str(json).expect("Failed to parse comment JSON");
        assert!(comment.is_reply());
        assert!(comment.is_resolved);
        assert_eq!(
            comment.position,
            Some(CommentPosition {
                start_offset: 10,
                end_offset: 14
            })
        );

        let top_level: DocumentComment = serde_json::from_value(json!({
            "id": "c1",
            "documentId": "d1",
            "content": "Looks good",
            "createdAt": "2024-05-03T08:00:00Z",
            "updatedAt": "2024-05-03T08:00:00Z",
            "createdBy": {"id": "u1", "name": "Ada", "email": "ada@example.com"}
        }))
        .expect("Failed to parse comment JSON");
        assert!(!top_level.is_reply());
        assert!(!top_level.is_resolved);
        assert_eq!(top_level.position, None);
    }

    #[test]
    fn test_update_request_sends_only_set_fields() {
        let req = DocumentUpdateRequest {
            title: Some("New title".into()),
            is_archived: Some(true),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "title": "New title", "isArchived": true })
        );
    }

    #[test]
    fn test_create_request_shape() {
        let req = DocumentCreateRequest {
            title: "Notes".into(),
            content: String::new(),
            space_id: "s1".into(),
            collaborators: Some(vec![CollaboratorGrant {
                user_id: "u9".into(),
                permissions: vec![DocumentPermission::Comment],
            }]),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "title": "Notes",
                "content": "",
                "spaceId": "s1",
                "collaborators": [{ "userId": "u9", "permissions": ["comment"] }]
            })
        );
    }
}
