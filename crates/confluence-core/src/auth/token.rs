//! Client-side decoding of the signed session credential.
//!
//! The credential is a compact JWT. Only the payload is decoded, and only to
//! derive display data: the signature is never checked here and the claims
//! must not be trusted for authorization decisions.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// base64url that accepts payloads with or without trailing `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("credential is not a three-part token")]
    Shape,

    #[error("credential payload is not valid base64url: {0}")]
    Encoding(String),

    #[error("credential payload is not valid claims JSON: {0}")]
    Claims(String),

    #[error("credential expiry {0} is out of range")]
    ExpiryOutOfRange(i64),
}

/// Claims read from the credential payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub email: String,
    /// Expiry in seconds since the Unix epoch.
    pub exp: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl TokenClaims {
    pub fn expires_at(&self) -> Result<DateTime<Utc>, TokenError> {
        DateTime::from_timestamp(self.exp, 0).ok_or(TokenError::ExpiryOutOfRange(self.exp))
    }

    /// A credential is expired once `now` reaches `expiry + leeway`.
    ///
    /// An expiry so far out that adding the leeway overflows never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        match self.expires_at() {
            Ok(expiry) => match expiry.checked_add_signed(leeway) {
                Some(deadline) => deadline <= now,
                None => leeway < Duration::zero(),
            },
            Err(_) => true,
        }
    }

    /// `name` when present, otherwise given and family names joined.
    pub fn display_name(&self) -> Option<String> {
        if let Some(ref name) = self.name {
            if !name.trim().is_empty() {
                return Some(name.clone());
            }
        }
        let parts: Vec<&str> = [self.given_name.as_deref(), self.family_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Decode the payload segment of a credential into its claims.
pub fn decode_claims(credential: &str) -> Result<TokenClaims, TokenError> {
    let mut parts = credential.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(TokenError::Shape);
    };

    let bytes = URL_SAFE_LENIENT
        .decode(payload)
        .map_err(|e| TokenError::Encoding(e.to_string()))?;

    let claims: TokenClaims =
        serde_json::from_slice(&bytes).map_err(|e| TokenError::Claims(e.to_string()))?;

    claims.expires_at()?;
    Ok(claims)
}

/// Build an unsigned token around the given payload. Test helper.
#[cfg(test)]
pub(crate) fn encode_for_test(payload: &serde_json::Value) -> String {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}
