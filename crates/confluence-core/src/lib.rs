//! Client core for Confluence 2.0.
//!
//! Two components carry the weight:
//!
//! - [`auth::SessionManager`] owns the signed credential and the
//!   [`auth::Session`] derived from it.
//! - [`api::Gateway`] is the single path to the remote API. It attaches the
//!   credential, normalizes failures into [`api::ApiError`], and logs the
//!   user out on a 401.
//!
//! Everything else (documents, the query cache, the OAuth callback) is built
//! on those two. [`context::AppContext`] wires them together at startup.

pub mod api;
pub mod auth;
pub mod cache;
pub mod callback;
pub mod config;
pub mod context;
pub mod documents;
pub mod models;
pub mod navigation;
pub mod notify;

pub use api::{ApiError, Gateway, RequestDescriptor};
pub use auth::{Session, SessionManager};
pub use config::Config;
pub use context::AppContext;
