/// User profile endpoint
///
/// - `GET /api/users/:id` - Public profile of a user

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, State},
    Json,
};
use projectflow_shared::{auth::middleware::AuthContext, models::user::UserProfile};
use uuid::Uuid;

pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthContext,
    Path(user_id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.users.get_user(user_id).await?))
}
