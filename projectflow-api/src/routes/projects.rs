/// Project and membership endpoints
///
/// # Endpoints
///
/// - `POST /api/projects` - Create a project (caller becomes admin)
/// - `GET /api/projects` - Projects the caller belongs to
/// - `GET /api/projects/:id` - Get a project (members)
/// - `PUT /api/projects/:id` - Update a project (admins)
/// - `DELETE /api/projects/:id` - Delete a project (admins)
/// - `GET /api/projects/:id/role` - Caller's role
/// - `GET /api/projects/:id/members?page=&size=` - List members (members)
/// - `POST /api/projects/:id/members` - Add a member by email (admins)
/// - `PUT /api/projects/:id/members/:user_id` - Change a member's role (admins)
/// - `DELETE /api/projects/:id/members/:user_id` - Exclude a member (admins)

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use projectflow_shared::{
    auth::middleware::AuthContext,
    models::{
        membership::{Membership, ProjectMember, ProjectRole},
        project::Project,
    },
    service::{
        pagination::{Page, PageRequest},
        project::{NewProject, ProjectChanges, RoleInfo},
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Derived from the title when omitted
    #[validate(length(max = 10, message = "Key must be at most 10 characters"))]
    #[serde(default)]
    pub key: Option<String>,
}

/// Update project request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[validate(length(max = 10, message = "Key must be at most 10 characters"))]
    #[serde(default)]
    pub key: Option<String>,
}

/// Add member request
#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Defaults to `member`
    #[serde(default)]
    pub role: Option<ProjectRole>,
}

/// Change role request
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: ProjectRole,
}

pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate()?;

    let project = state
        .projects
        .create_project(
            auth.user_id,
            NewProject {
                title: req.title,
                description: req.description.unwrap_or_default(),
                key: req.key,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.projects.list_projects(auth.user_id).await?))
}

pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.projects.get_project(auth.user_id, project_id).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;

    let project = state
        .projects
        .update_project(
            auth.user_id,
            project_id,
            ProjectChanges {
                title: req.title,
                description: req.description.unwrap_or_default(),
                key: req.key,
            },
        )
        .await?;

    Ok(Json(project))
}

pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.projects.delete_project(auth.user_id, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Json<RoleInfo>> {
    Ok(Json(state.projects.get_role(auth.user_id, project_id).await?))
}

pub async fn list_members(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<Page<ProjectMember>>> {
    let members = state
        .projects
        .list_members(auth.user_id, project_id, page)
        .await?;
    Ok(Json(members))
}

pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(project_id): Path<Uuid>,
    Json(req): Json<AddMemberRequest>,
) -> ApiResult<(StatusCode, Json<Membership>)> {
    req.validate()?;

    let membership = state
        .projects
        .add_member(
            auth.user_id,
            project_id,
            &req.email,
            req.role.unwrap_or(ProjectRole::Member),
        )
        .await?;

    Ok((StatusCode::CREATED, Json(membership)))
}

pub async fn change_role(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ChangeRoleRequest>,
) -> ApiResult<Json<Membership>> {
    let membership = state
        .projects
        .change_role(auth.user_id, project_id, member_id, req.role)
        .await?;
    Ok(Json(membership))
}

pub async fn exclude_member(
    State(state): State<AppState>,
    auth: AuthContext,
    Path((project_id, member_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state
        .projects
        .exclude_member(auth.user_id, project_id, member_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
