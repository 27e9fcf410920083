//! Sign-up, login and session lookup.

use std::{sync::Arc, time::Duration};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{RepoError, SessionsRepo, UsersRepo};
use crate::domain::entities::{SessionRecord, UserRecord};
use crate::domain::error::DomainError;
use crate::domain::users::{validate_password, validate_username};

const SOURCE: &str = "application::accounts";

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error("a user with that username already exists")]
    UsernameTaken,
    #[error("the two password fields didn't match")]
    PasswordMismatch,
    #[error("please enter a correct username and password")]
    InvalidCredentials,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl AccountError {
    /// Whether the error should be shown on the form rather than treated as a failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Invalid(_) | Self::UsernameTaken | Self::PasswordMismatch | Self::InvalidCredentials
        )
    }
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    pub async fn signup(&self, form: SignupForm) -> Result<UserRecord, AccountError> {
        let username = validate_username(&form.username)?;
        if form.password != form.password_confirmation {
            return Err(AccountError::PasswordMismatch);
        }
        validate_password(&form.password)?;

        if self.users.find_user_by_username(&username).await?.is_some() {
            return Err(AccountError::UsernameTaken);
        }

        let hash = hash_password(&form.password)?;
        let user = match self.users.create_user(&username, &hash).await {
            Ok(user) => user,
            Err(RepoError::Duplicate { .. }) => return Err(AccountError::UsernameTaken),
            Err(err) => return Err(err.into()),
        };

        info!(target = SOURCE, username = %user.username, "account created");
        Ok(user)
    }

    /// Check credentials and open a new session.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<(UserRecord, SessionRecord), AccountError> {
        let user = self
            .users
            .find_user_by_username(username.trim())
            .await?
            .ok_or(AccountError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AccountError::InvalidCredentials);
        }

        let session = self.open_session(&user).await?;
        Ok((user, session))
    }

    pub async fn open_session(&self, user: &UserRecord) -> Result<SessionRecord, AccountError> {
        let token = Uuid::new_v4().to_string();
        let expires_at = OffsetDateTime::now_utc() + self.session_ttl;
        Ok(self
            .sessions
            .create_session(&token, user.id, expires_at)
            .await?)
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        Ok(self.sessions.delete_session(token).await?)
    }

    /// Resolve a session token to its user. Expired sessions are removed.
    pub async fn resolve(&self, token: &str) -> Result<Option<UserRecord>, AccountError> {
        let Some(session) = self.sessions.find_session(token).await? else {
            return Ok(None);
        };

        if session.is_expired_at(OffsetDateTime::now_utc()) {
            if let Err(err) = self.sessions.delete_session(token).await {
                warn!(target = SOURCE, error = %err, "failed to purge expired session");
            }
            return Ok(None);
        }

        Ok(self.users.find_user_by_id(session.user_id).await?)
    }
}

pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountError::Hashing(err.to_string()))
}

/// A stored hash that cannot be parsed never matches.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AccountError> {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return Ok(false);
    };
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AccountError::Hashing(err.to_string())),
    }
}
