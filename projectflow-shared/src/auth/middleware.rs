/// Request authentication helpers for Axum
///
/// Access tokens arrive either as `Authorization: Bearer <token>` or in the
/// `access_token` cookie; the header wins when both are present. The API's
/// auth layer calls [`authenticate`] and stores the resulting
/// [`AuthContext`] in the request extensions, where handlers pick it up as
/// an extractor.
///
/// # Example
///
/// ```no_run
/// use projectflow_shared::auth::middleware::AuthContext;
///
/// async fn protected_handler(auth: AuthContext) -> String {
///     format!("Hello, {}!", auth.email)
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::tokens::{TokenError, TokenService};

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Identity of the caller, resolved from a valid access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Email the token was issued for
    pub email: String,
}

/// Rejection when a handler asks for [`AuthContext`] on an unauthenticated request
#[derive(Debug)]
pub struct MissingAuthContext;

impl IntoResponse for MissingAuthContext {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "Missing credentials").into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = MissingAuthContext;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(MissingAuthContext)
    }
}

/// Reads a cookie value from the `Cookie` headers
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Finds the access token of a request (Bearer header, then cookie)
pub fn access_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer.or_else(|| cookie_value(headers, ACCESS_TOKEN_COOKIE))
}

/// Resolves the caller of a request
///
/// # Errors
///
/// - `TokenError::Missing` if the request carries no access token
/// - `TokenError::Invalid` / `TokenError::Expired` from validation
pub fn authenticate(tokens: &TokenService, headers: &HeaderMap) -> Result<AuthContext, TokenError> {
    let token = access_token(headers).ok_or(TokenError::Missing)?;
    let claims = tokens.validate_access(token)?;

    Ok(AuthContext {
        user_id: claims.id,
        email: claims.sub,
    })
}
