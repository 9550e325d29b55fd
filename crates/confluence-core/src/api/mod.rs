//! Gateway for the Confluence 2.0 REST API.
//!
//! All remote calls go through [`Gateway`], which attaches the session's
//! bearer credential, normalizes failures into [`ApiError`], and reacts to
//! authentication failures by tearing the session down.

pub mod error;
pub mod gateway;
pub mod request;
pub mod transport;

pub use error::ApiError;
pub use gateway::Gateway;
pub use request::{RequestDescriptor, RetryPolicy};
pub use transport::{HttpTransport, OutboundRequest, RawResponse, Transport, TransportError};
