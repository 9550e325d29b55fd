use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::store::TokenStore;
use super::token::{decode_claims, TokenClaims, TokenError};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid credential: {0}")]
    InvalidCredential(#[from] TokenError),

    #[error("credential expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("failed to persist credential: {0}")]
    Storage(String),
}

/// Identity of the signed-in user, projected from the credential payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Session {
    pub subject: String,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    fn from_claims(claims: &TokenClaims) -> Result<Self, TokenError> {
        Ok(Self {
            subject: claims.sub.clone(),
            email: claims.email.clone(),
            display_name: claims.display_name(),
            avatar_url: claims.picture.clone(),
            expires_at: claims.expires_at()?,
        })
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expires_at - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
}

/// Credential and the session derived from it. Always replaced together.
struct Current {
    credential: String,
    session: Session,
}

/// Owns the session credential and the identity derived from it.
///
/// `login`, `logout` and `initialize` each hold the state lock across the
/// storage write and the in-memory update, so readers only ever observe the
/// state before or after the whole operation.
pub struct SessionManager {
    store: Arc<dyn TokenStore>,
    leeway: Duration,
    state: RwLock<Option<Current>>,
    loading: AtomicBool,
}

impl SessionManager {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            leeway: Duration::zero(),
            state: RwLock::new(None),
            loading: AtomicBool::new(true),
        }
    }

    /// Accept credentials up to `leeway` past their expiry to absorb clock skew.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Restore the session from the persisted credential.
    ///
    /// A missing, undecodable or expired credential leaves the session
    /// anonymous. The latter two are also removed from storage.
    pub fn initialize(&self) {
        let mut state = self.write();
        *state = None;

        match self.store.load() {
            Ok(Some(credential)) => match self.derive(&credential) {
                Ok(session) => {
                    info!(subject = %session.subject, "Session restored");
                    *state = Some(Current {
                        credential: credential.trim().to_string(),
                        session,
                    });
                }
                Err(e) => {
                    debug!(error = %e, "Discarding persisted credential");
                    if let Err(e) = self.store.clear() {
                        warn!(error = %e, "Failed to remove stale credential");
                    }
                }
            },
            Ok(None) => debug!("No persisted credential"),
            Err(e) => warn!(error = %e, "Failed to read persisted credential"),
        }

        self.loading.store(false, Ordering::Release);
    }

    /// Replace the current session with one derived from `credential`.
    ///
    /// Malformed or expired credentials are rejected and leave the prior
    /// session untouched. Surrounding whitespace is not part of the credential.
    pub fn login(&self, credential: &str) -> Result<Session, SessionError> {
        let credential = credential.trim();
        let session = self.derive(credential)?;

        let mut state = self.write();
        self.store
            .save(credential)
            .map_err(|e| SessionError::Storage(format!("{:#}", e)))?;
        *state = Some(Current {
            credential: credential.to_string(),
            session: session.clone(),
        });

        info!(subject = %session.subject, "Logged in");
        Ok(session)
    }

    /// Drop the session and the persisted credential.
    ///
    /// In-memory state is cleared even if storage fails.
    pub fn logout(&self) -> Result<()> {
        let mut state = self.write();
        let was_authenticated = state.take().is_some();
        if was_authenticated {
            info!("Logged out");
        }
        self.store.clear()
    }

    pub fn current_user(&self) -> Option<Session> {
        self.read().as_ref().map(|c| c.session.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }

    pub fn state(&self) -> AuthState {
        if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }

    /// True until `initialize` has finished.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Attach the bearer credential to outgoing headers, if signed in.
    pub fn authorize(&self, headers: &mut HeaderMap) {
        let state = self.read();
        let Some(ref current) = *state else {
            headers.remove(header::AUTHORIZATION);
            return;
        };
        match HeaderValue::from_str(&format!("Bearer {}", current.credential)) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(header::AUTHORIZATION, value);
            }
            Err(e) => warn!(error = %e, "Credential is not a valid header value"),
        }
    }

    fn derive(&self, credential: &str) -> Result<Session, SessionError> {
        let claims = decode_claims(credential)?;
        if claims.is_expired_at(Utc::now(), self.leeway) {
            return Err(SessionError::Expired(claims.expires_at()?));
        }
        Ok(Session::from_claims(&claims)?)
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Current>> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Current>> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
