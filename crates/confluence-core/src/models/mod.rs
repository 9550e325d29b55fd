//! Data models for Confluence 2.0 entities.
//!
//! - `Document`, `DocumentList`: documents and paged listings
//! - `User`, `DocumentCollaborator`, `DocumentPermission`: ownership and sharing
//! - `DocumentCreateRequest`, `DocumentUpdateRequest`: mutation payloads
//! - `DocumentVersion`, `DocumentComment`: revision history and review threads
//! - `DocumentSpace`: workspaces that group documents

pub mod document;
pub mod space;

pub use document::{
    CollaboratorGrant, CommentPosition, Document, DocumentCollaborator, DocumentComment,
    DocumentCreateRequest, DocumentList, DocumentPermission, DocumentUpdateRequest,
    DocumentVersion, User,
};
pub use space::DocumentSpace;
