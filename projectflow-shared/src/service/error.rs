/// Error taxonomy of the domain services
///
/// Every service operation fails with a [`ServiceError`]. Lower-level module
/// errors convert into it, collapsing into the variant the caller can act
/// on: any authorization failure becomes `AccessDenied`, token failures
/// become their token variant, and store or hashing failures stay opaque.

use uuid::Uuid;

use crate::auth::authorization::AuthzError;
use crate::auth::password::PasswordError;
use crate::auth::tokens::TokenError;
use crate::rank::RankError;
use crate::store::StoreError;

/// Error type for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Project {0} not found")]
    ProjectNotFound(Uuid),

    #[error("Task {0} not found")]
    TaskNotFound(Uuid),

    /// Unknown user, by ID or email
    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("User {user_id} is not a member of project {project_id}")]
    MembershipNotFound { project_id: Uuid, user_id: Uuid },

    #[error("A user with email {0} already exists")]
    UserAlreadyExists(String),

    #[error("User {user_id} is already a member of project {project_id}")]
    AlreadyMember { project_id: Uuid, user_id: Uuid },

    #[error("Token is missing")]
    MissingToken,

    #[error("Token is invalid")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token not found")]
    TokenNotFound,

    #[error("Access denied")]
    AccessDenied,

    /// A field of the request breaks a domain rule
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is not enabled")]
    AccountDisabled,

    #[error("Failed to sign token: {0}")]
    Signing(String),

    #[error(transparent)]
    Rank(#[from] RankError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    /// Shorthand for a `Validation` error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::ProjectNotFound(_) => "project_not_found",
            ServiceError::TaskNotFound(_) => "task_not_found",
            ServiceError::UserNotFound(_) => "user_not_found",
            ServiceError::MembershipNotFound { .. } => "membership_not_found",
            ServiceError::UserAlreadyExists(_) => "user_already_exists",
            ServiceError::AlreadyMember { .. } => "already_member",
            ServiceError::MissingToken => "missing_token",
            ServiceError::InvalidToken => "invalid_token",
            ServiceError::TokenExpired => "token_expired",
            ServiceError::TokenNotFound => "token_not_found",
            ServiceError::AccessDenied => "access_denied",
            ServiceError::Validation { .. } => "validation_error",
            ServiceError::InvalidCredentials => "invalid_credentials",
            ServiceError::AccountDisabled => "account_disabled",
            ServiceError::Store(StoreError::Conflict(_)) => "conflict",
            ServiceError::Signing(_)
            | ServiceError::Rank(_)
            | ServiceError::Password(_)
            | ServiceError::Store(_) => "internal_error",
        }
    }
}

impl From<TokenError> for ServiceError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Missing => ServiceError::MissingToken,
            TokenError::Invalid => ServiceError::InvalidToken,
            TokenError::Expired => ServiceError::TokenExpired,
            TokenError::NotFound => ServiceError::TokenNotFound,
            TokenError::Signing(msg) => ServiceError::Signing(msg),
            TokenError::Store(e) => ServiceError::Store(e),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotMember(_) | AuthzError::InsufficientRole { .. } => {
                ServiceError::AccessDenied
            }
            AuthzError::Store(e) => ServiceError::Store(e),
        }
    }
}
