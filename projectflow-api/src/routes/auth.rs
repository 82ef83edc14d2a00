/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register a new account
/// - `GET /api/auth/confirm?token=` - Confirm an email address
/// - `POST /api/auth/login` - Login; sets the session cookies
/// - `POST /api/auth/refresh` - Get a new access token
/// - `POST /api/auth/logout` - Revoke refresh tokens and clear cookies
/// - `GET /api/auth/me` - Current user
///
/// Session tokens are returned in the body and also set as `HttpOnly`
/// cookies (`access_token`, `refresh_token`), which are `Secure` in
/// production.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};
use chrono::{DateTime, Utc};
use projectflow_shared::{
    auth::middleware::{cookie_value, AuthContext, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE},
    auth::tokens::IssuedToken,
    models::user::UserProfile,
    service::auth::{Registered, Registration, Session},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 1, max = 100, message = "Name must be 1 to 100 characters"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (also checked for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        Self {
            user: session.user,
            access_token: session.access.token,
            access_token_expires_at: session.access.expires_at,
            refresh_token: session.refresh.token,
            refresh_token_expires_at: session.refresh.expires_at,
        }
    }
}

/// Refresh token request; the cookie is used when the body has no token
#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub user: UserProfile,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
}

/// Confirmation query
#[derive(Debug, Deserialize)]
pub struct ConfirmQuery {
    pub token: String,
}

/// Builds a `Set-Cookie` value for a session cookie
///
/// A zero `max_age` expires the cookie.
pub fn session_cookie(
    name: &str,
    value: &str,
    max_age_secs: i64,
    secure: bool,
) -> ApiResult<(HeaderName, HeaderValue)> {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name,
        value,
        max_age_secs.max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }

    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::InternalError(format!("Invalid cookie value: {}", e)))?;

    Ok((header::SET_COOKIE, value))
}

fn token_cookie(
    state: &AppState,
    name: &str,
    token: &IssuedToken,
) -> ApiResult<(HeaderName, HeaderValue)> {
    let max_age = (token.expires_at - state.tokens().now()).num_seconds();
    session_cookie(name, &token.token, max_age, state.config.api.production)
}

fn session_cookies(state: &AppState, session: &Session) -> ApiResult<Vec<(HeaderName, HeaderValue)>> {
    Ok(vec![
        token_cookie(state, ACCESS_TOKEN_COOKIE, &session.access)?,
        token_cookie(state, REFRESH_TOKEN_COOKIE, &session.refresh)?,
    ])
}

/// Register a new account
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "name": "Ada",
///   "email": "ada@example.com",
///   "password": "password123"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with the user and `verification_required`. When email
/// verification is off, the session is included and its cookies are set.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let registered: Registered = state
        .auth
        .register(Registration {
            name: req.name,
            email: req.email,
            password: req.password,
        })
        .await?;

    let cookies = match &registered.session {
        Some(session) => session_cookies(&state, session)?,
        None => Vec::new(),
    };

    Ok((StatusCode::CREATED, AppendHeaders(cookies), Json(registered)))
}

/// Confirm an email address from the link in the confirmation mail
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown, used or expired token
pub async fn confirm(
    State(state): State<AppState>,
    Query(query): Query<ConfirmQuery>,
) -> ApiResult<Json<UserProfile>> {
    let user = state.auth.confirm_email(&query.token).await?;
    Ok(Json(user))
}

/// Login endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: Email not confirmed yet
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate()?;

    let session = state.auth.login(&req.email, &req.password).await?;
    let cookies = session_cookies(&state, &session)?;

    Ok((AppendHeaders(cookies), Json(LoginResponse::from(session))))
}

/// Token refresh endpoint
///
/// Reads `refresh_token` from the JSON body, falling back to the cookie.
///
/// # Errors
///
/// - `401 Unauthorized`: Missing, unknown or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let req: RefreshRequest = if body.is_empty() {
        RefreshRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?
    };

    let token = req
        .refresh_token
        .as_deref()
        .or_else(|| cookie_value(&headers, REFRESH_TOKEN_COOKIE));

    let (access, user) = state.auth.refresh(token).await?;
    let cookie = token_cookie(&state, ACCESS_TOKEN_COOKIE, &access)?;

    Ok((
        AppendHeaders([cookie]),
        Json(RefreshResponse {
            user,
            access_token: access.token,
            access_token_expires_at: access.expires_at,
        }),
    ))
}

/// Logout endpoint
///
/// Revokes the caller's refresh tokens and expires both cookies.
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<impl IntoResponse> {
    state.auth.logout(auth.user_id).await?;

    let secure = state.config.api.production;
    let cookies = [
        session_cookie(ACCESS_TOKEN_COOKIE, "", 0, secure)?,
        session_cookie(REFRESH_TOKEN_COOKIE, "", 0, secure)?,
    ];

    Ok((StatusCode::NO_CONTENT, AppendHeaders(cookies)))
}

/// Current user
pub async fn me(State(state): State<AppState>, auth: AuthContext) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.auth.current_user(auth.user_id).await?))
}
