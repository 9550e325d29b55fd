//! Document data access on top of the gateway and the query cache.

pub mod keys;
pub mod service;

pub use keys::document_keys;
pub use service::{DocumentFilters, DocumentService, DEFAULT_PAGE_SIZE};
