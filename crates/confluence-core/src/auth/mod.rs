//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionManager`: owns the session credential and the identity derived from it
//! - `TokenStore`: persistence for the single credential key (file, keychain, memory)
//! - `decode_claims`: display-only decoding of the credential payload
//!
//! The credential is never parsed or stored outside this module.

pub mod session;
pub mod store;
pub mod token;

pub use session::{AuthState, Session, SessionError, SessionManager};
pub use store::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
pub use token::{decode_claims, TokenClaims, TokenError};
