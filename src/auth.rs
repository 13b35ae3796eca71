use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::Account,
    repository::{RepositoryError, RepositoryState},
    validation::credentials_well_formed,
};

/// Well-formed bcrypt hash (zero salt, zero digest) that no password matches. Compared
/// against when the email is unknown so both rejection paths do the same work.
const DUMMY_HASH: &str = "$2b$10$.....................................................";

/// Principal
///
/// The authenticated identity attached to a request once the session gate has resolved
/// a valid session. Lives exactly as long as the session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

impl From<Account> for Principal {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            email: account.email,
            name: account.name,
        }
    }
}

/// Principal Extractor
///
/// The session gate stores the resolved `Principal` in the request extensions before
/// any handler runs. Handlers on protected routes take it as an argument; a request
/// that somehow arrives without one is rejected with 401.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

/// AuthError
///
/// `InvalidCredentials` is the normal "no" answer and carries no detail
/// about which part was wrong. The other variants are infrastructure faults.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("password verification task failed: {0}")]
    Hashing(#[from] tokio::task::JoinError),
}

/// CredentialVerifier
///
/// Checks an email/password pair against the stored bcrypt hash.
#[derive(Clone)]
pub struct CredentialVerifier {
    repo: RepositoryState,
}

impl CredentialVerifier {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }

    /// verify
    ///
    /// 1. Shape check (email syntax, password length). Fails before touching the store.
    /// 2. One lookup by exact email.
    /// 3. bcrypt comparison on the blocking pool.
    ///
    /// Unknown email and wrong password both return `InvalidCredentials`.
    pub async fn verify(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        if !credentials_well_formed(email, password) {
            tracing::debug!("credentials rejected before lookup: malformed input");
            return Err(AuthError::InvalidCredentials);
        }

        let account = self.repo.find_account_by_email(email).await?;
        let hash = account
            .as_ref()
            .map_or_else(|| DUMMY_HASH.to_string(), |a| a.password_hash.clone());

        let matches = password_matches(password.to_string(), hash).await?;

        match account {
            Some(account) if matches => {
                tracing::info!(account_id = %account.id, "credentials verified");
                Ok(Principal::from(account))
            }
            _ => {
                tracing::info!("credentials rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }
}

/// Runs the CPU-bound bcrypt comparison off the async workers.
async fn password_matches(password: String, hash: String) -> Result<bool, AuthError> {
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await?;
    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            // A stored hash that does not parse can never match.
            tracing::warn!(error = %e, "stored password hash is not a valid bcrypt hash");
            Ok(false)
        }
    }
}
