/// Account registration, confirmation and sessions
///
/// # Flow
///
/// 1. `register` creates the account. When email verification is required
///    the account starts disabled and a confirmation link is mailed;
///    otherwise a session is opened immediately.
/// 2. `confirm_email` redeems the link's token and enables the account.
/// 3. `login` opens a session: an access token plus a refresh token that
///    replaces any earlier one.
/// 4. `refresh` trades the refresh token for a new access token.
/// 5. `logout` revokes the user's refresh tokens.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::ValidateEmail;

use super::error::ServiceError;
use super::mail::{MailMessage, Mailer};
use crate::auth::password::{hash_password, validate_password_strength, verify_password};
use crate::auth::tokens::{IssuedToken, TokenService};
use crate::models::user::{normalize_email, CreateUser, User, UserProfile};
use crate::store::{Store, StoreError};

/// Input of [`AuthService::register`]
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Tokens of an open session
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
    pub user: UserProfile,
}

/// Result of a registration
#[derive(Debug, Clone, Serialize)]
pub struct Registered {
    pub user: UserProfile,
    /// Whether a confirmation mail must be followed before logging in
    pub verification_required: bool,
    /// Present when the account was enabled right away
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

/// Settings of [`AuthService`]
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub require_verification: bool,
    /// Base URL of the web client, used in confirmation links
    pub client_url: String,
}

/// Account and session operations
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: TokenService,
        mailer: Arc<dyn Mailer>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            store,
            tokens,
            mailer,
            settings,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Creates an account
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` for a blank name, malformed email or weak password
    /// - `ServiceError::UserAlreadyExists` if the email is taken
    pub async fn register(&self, input: Registration) -> Result<Registered, ServiceError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("name", "must not be blank"));
        }

        let email = normalize_email(&input.email);
        if !email.validate_email() {
            return Err(ServiceError::validation("email", "must be a valid email address"));
        }

        validate_password_strength(&input.password)
            .map_err(|message| ServiceError::validation("password", message))?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::UserAlreadyExists(email));
        }

        let password_hash = hash_password(&input.password)?;
        let user = self
            .store
            .insert_user(CreateUser {
                name: name.to_string(),
                email: email.clone(),
                password_hash,
                enabled: !self.settings.require_verification,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => ServiceError::UserAlreadyExists(email.clone()),
                other => other.into(),
            })?;

        tracing::info!(user_id = %user.id, "Registered user");

        if !self.settings.require_verification {
            let session = self.open_session(&user).await?;
            return Ok(Registered {
                user: user.profile(),
                verification_required: false,
                session: Some(session),
            });
        }

        let verification = self.tokens.issue_verification_token(user.id).await?;
        let message = MailMessage::confirmation(
            &user.email,
            &user.name,
            &self.settings.client_url,
            &verification.token,
        );
        if let Err(e) = self.mailer.send(message).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to send confirmation mail");
        }

        Ok(Registered {
            user: user.profile(),
            verification_required: true,
            session: None,
        })
    }

    /// Redeems a confirmation token and enables its account
    pub async fn confirm_email(&self, token: &str) -> Result<UserProfile, ServiceError> {
        let user_id = self.tokens.redeem_verification_token(token).await?;
        let user = self.user(user_id).await?;

        tracing::info!(user_id = %user_id, "Confirmed email");

        Ok(user.profile())
    }

    /// Opens a session for valid credentials
    ///
    /// # Errors
    ///
    /// - `ServiceError::InvalidCredentials` for an unknown email or wrong password
    /// - `ServiceError::AccountDisabled` if the account isn't confirmed yet
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ServiceError> {
        let email = normalize_email(email);
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or(ServiceError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "Rejected login with wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        if !user.enabled {
            return Err(ServiceError::AccountDisabled);
        }

        let session = self.open_session(&user).await?;

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(session)
    }

    /// Issues a new access token from a refresh token
    pub async fn refresh(
        &self,
        refresh_token: Option<&str>,
    ) -> Result<(IssuedToken, UserProfile), ServiceError> {
        let (access, user) = self.tokens.refresh(refresh_token).await?;
        Ok((access, user.profile()))
    }

    /// Revokes every refresh token of the user
    pub async fn logout(&self, user_id: Uuid) -> Result<(), ServiceError> {
        self.tokens.revoke_all_for_user(user_id).await?;
        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    pub async fn current_user(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        Ok(self.user(user_id).await?.profile())
    }

    async fn open_session(&self, user: &User) -> Result<Session, ServiceError> {
        let access = self.tokens.issue_access_token(user)?;
        let refresh = self.tokens.issue_refresh_token(user.id).await?;

        Ok(Session {
            access,
            refresh,
            user: user.profile(),
        })
    }

    async fn user(&self, user_id: Uuid) -> Result<User, ServiceError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))
    }
}
