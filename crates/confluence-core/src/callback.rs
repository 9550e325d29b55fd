//! OAuth redirect flow.
//!
//! Login starts by sending the browser to the backend's authorization
//! endpoint ([`login_url`]). The backend redirects back to the callback route
//! with the issued credential in the `token` query parameter, which
//! [`AuthCallback::process`] hands to the session manager.

use std::sync::Arc;
use std::time::Duration;

pub use reqwest::Url;
use tracing::{info, warn};

use crate::auth::SessionManager;
use crate::navigation::{routes, Navigator};

/// Query parameter carrying the issued credential.
const TOKEN_PARAM: &str = "token";

/// Query parameter carrying the message on the auth error route.
const MESSAGE_PARAM: &str = "message";

const NO_TOKEN_MESSAGE: &str = "Authentication failed. No token received.";
const LOGIN_FAILED_MESSAGE: &str = "An error occurred during authentication.";
const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred during authentication.";
pub const SUCCESS_MESSAGE: &str = "Authentication successful! Redirecting...";

/// Backend endpoint that starts the OAuth dance.
pub fn login_url(api_base_url: &str) -> anyhow::Result<Url> {
    let url = format!("{}/auth/google", api_base_url.trim_end_matches('/'));
    Url::parse(&url).map_err(|e| anyhow::anyhow!("Invalid login URL {}: {}", url, e))
}

/// Message to show on the auth error route.
pub fn auth_error_message(url: &Url) -> String {
    query_param(url, MESSAGE_PARAM).unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string())
}

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Signed in; the user was sent to `redirect_to`.
    Authenticated { redirect_to: String },
    /// Nothing changed; offer `retry_route` to start over.
    Failed { message: String, retry_route: String },
}

pub struct AuthCallback {
    sessions: Arc<SessionManager>,
    navigator: Arc<dyn Navigator>,
    redirect_delay: Duration,
}

impl AuthCallback {
    pub fn new(sessions: Arc<SessionManager>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            sessions,
            navigator,
            redirect_delay: Duration::ZERO,
        }
    }

    /// Delay between confirming the login and navigating away.
    pub fn with_redirect_delay(mut self, delay: Duration) -> Self {
        self.redirect_delay = delay;
        self
    }

    pub async fn process(&self, callback_url: &Url) -> CallbackOutcome {
        let Some(token) = query_param(callback_url, TOKEN_PARAM) else {
            warn!("Callback reached without a token");
            return Self::failed(NO_TOKEN_MESSAGE);
        };

        if let Err(e) = self.sessions.login(&token) {
            warn!(error = %e, "Callback token rejected");
            return Self::failed(LOGIN_FAILED_MESSAGE);
        }

        info!("{}", SUCCESS_MESSAGE);
        if !self.redirect_delay.is_zero() {
            tokio::time::sleep(self.redirect_delay).await;
        }
        self.navigator.navigate(routes::HOME);

        CallbackOutcome::Authenticated {
            redirect_to: routes::HOME.to_string(),
        }
    }

    fn failed(message: &str) -> CallbackOutcome {
        CallbackOutcome::Failed {
            message: message.to_string(),
            retry_route: routes::LOGIN.to_string(),
        }
    }
}
