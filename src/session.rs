use std::time::Duration;

use axum::http::{
    HeaderMap, HeaderValue,
    header::{self, InvalidHeaderValue},
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    auth::Principal,
    config::{AppConfig, Env},
};

/// Name of the cookie holding the signed session token.
pub const SESSION_COOKIE: &str = "session";

/// Claims
///
/// Payload of the signed session token. The principal travels inside the token, so
/// resolving a session needs no store access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the account id.
    pub sub: Uuid,
    pub email: String,
    pub name: String,
    /// Issued At (iat).
    pub iat: usize,
    /// Expiration Time (exp). Tokens past this instant resolve to "no session".
    pub exp: usize,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to sign session token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("session cookie is not a valid header value: {0}")]
    Header(#[from] InvalidHeaderValue),
}

/// SessionManager
///
/// Issues, resolves and clears cookie sessions backed by HS256 tokens.
#[derive(Clone)]
pub struct SessionManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    // Adds the `Secure` cookie attribute; off locally where there is no TLS.
    secure_cookie: bool,
}

impl SessionManager {
    pub fn new(secret: &str, ttl: Duration, secure_cookie: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            secure_cookie,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.auth_secret,
            config.session_ttl,
            config.env == Env::Production,
        )
    }

    /// current_session
    ///
    /// Resolves the principal from the session cookie, falling back to an
    /// `Authorization: Bearer` header. Missing, forged or expired tokens yield `None`.
    pub fn current_session(&self, headers: &HeaderMap) -> Option<Principal> {
        let token = session_cookie(headers).or_else(|| bearer_token(headers))?;
        self.principal_from_token(token)
    }

    /// establish_session
    ///
    /// Signs a token for `principal` and returns the `Set-Cookie` value carrying it.
    pub fn establish_session(&self, principal: &Principal) -> Result<HeaderValue, SessionError> {
        let token = self.issue_token(principal)?;
        let cookie = format!(
            "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
            self.ttl.as_secs(),
            if self.secure_cookie { "; Secure" } else { "" },
        );
        Ok(HeaderValue::from_str(&cookie)?)
    }

    /// clear_session
    ///
    /// `Set-Cookie` value that expires the session cookie immediately.
    pub fn clear_session(&self) -> HeaderValue {
        HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
    }

    pub fn issue_token(&self, principal: &Principal) -> Result<String, SessionError> {
        let now = Utc::now().timestamp().max(0) as usize;
        let claims = Claims {
            sub: principal.id,
            email: principal.email.clone(),
            name: principal.name.clone(),
            iat: now,
            exp: now + self.ttl.as_secs() as usize,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn principal_from_token(&self, token: &str) -> Option<Principal> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(Principal {
                id: data.claims.sub,
                email: data.claims.email,
                name: data.claims.name,
            }),
            Err(e) => {
                tracing::debug!(error = %e, "session token rejected");
                None
            }
        }
    }
}

/// Value of the session cookie across every `Cookie` header, if present and non-empty.
fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SessionManager {
        SessionManager::new("unit-test-secret", Duration::from_secs(3600), false)
    }

    fn principal() -> Principal {
        Principal {
            id: Uuid::from_u128(7),
            email: "user@nextmail.com".to_string(),
            name: "User".to_string(),
        }
    }

    #[test]
    fn cookie_round_trips_to_principal() {
        let sessions = manager();
        let set_cookie = sessions.establish_session(&principal()).unwrap();
        let pair = set_cookie.to_str().unwrap().split(';').next().unwrap().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&format!("theme=dark; {pair}")).unwrap());

        assert_eq!(sessions.current_session(&headers), Some(principal()));
    }

    #[test]
    fn token_signed_with_other_secret_is_no_session() {
        let token = SessionManager::new("other-secret", Duration::from_secs(3600), false)
            .issue_token(&principal())
            .unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());

        assert_eq!(manager().current_session(&headers), None);
    }

    #[test]
    fn cleared_cookie_is_no_session() {
        let sessions = manager();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(sessions.current_session(&headers), None);
        assert!(sessions.clear_session().to_str().unwrap().contains("Max-Age=0"));
    }
}
