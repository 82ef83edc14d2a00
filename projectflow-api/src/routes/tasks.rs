/// Task endpoints
///
/// # Endpoints
///
/// - `POST /api/tasks` - Create a task in a project
/// - `GET /api/tasks?project_id=&page=&size=&sort=&direction=` - List tasks
/// - `GET /api/tasks/dashboard?project_id=` - Tasks grouped by status
/// - `GET /api/tasks/:id` - Get a task
/// - `PUT /api/tasks/:id` - Update a task
/// - `DELETE /api/tasks/:id` - Delete a task (admins)
/// - `PUT /api/tasks/:id/position` - Move a task on the board
///
/// # Moving
///
/// ```text
/// PUT /api/tasks/:id/position
///
/// { "status": "in_progress", "after_id": "uuid", "before_id": "uuid" }
/// ```
///
/// `after_id` is the task that will precede the moved one, `before_id` the
/// one that will follow it. Any of the three fields may be omitted; with no
/// neighbors the task goes to the end of the lane.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use projectflow_shared::{
    auth::middleware::AuthContext,
    models::task::{SortDirection, Task, TaskPriority, TaskSort, TaskSortField, TaskStatus, TaskType},
    service::{
        field::FieldUpdate,
        pagination::{Page, PageRequest, DEFAULT_PAGE_SIZE},
        task::{Dashboard, NewTask, TaskChanges, TaskMove},
    },
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    pub project_id: Uuid,

    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub task_type: Option<TaskType>,

    #[serde(default)]
    pub priority: Option<TaskPriority>,

    #[serde(default)]
    pub executor_id: Option<Uuid>,
}

/// Update task request
///
/// `executor_id` distinguishes absent (unchanged), `null` (unassign) and a
/// user ID (assign).
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1 to 255 characters"))]
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub task_type: Option<TaskType>,

    #[serde(default)]
    pub priority: Option<TaskPriority>,

    #[serde(default)]
    pub status: Option<TaskStatus>,

    #[serde(default)]
    pub executor_id: FieldUpdate<Uuid>,
}

/// Task listing query
#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub project_id: Uuid,

    #[serde(default)]
    pub page: Option<u32>,

    #[serde(default)]
    pub size: Option<u32>,

    #[serde(default)]
    pub sort: Option<TaskSortField>,

    #[serde(default)]
    pub direction: Option<SortDirection>,
}

/// Dashboard query
#[derive(Debug, Deserialize)]
pub struct ProjectQuery {
    pub project_id: Uuid,
}

pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let task = state
        .tasks
        .create_task(
            auth.user_id,
            NewTask {
                project_id: req.project_id,
                title: req.title,
                description: req.description.unwrap_or_default(),
                task_type: req.task_type,
                priority: req.priority,
                executor_id: req.executor_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Page<Task>>> {
    let page = PageRequest::new(
        query.page.unwrap_or(1),
        query.size.unwrap_or(DEFAULT_PAGE_SIZE),
    );
    let sort = TaskSort {
        field: query.sort.unwrap_or_default(),
        direction: query.direction.unwrap_or_default(),
    };

    let tasks = state
        .tasks
        .list_tasks(auth.user_id, query.project_id, page, sort)
        .await?;
    Ok(Json(tasks))
}

pub async fn dashboard(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<ProjectQuery>,
) -> ApiResult<Json<Dashboard>> {
    Ok(Json(state.tasks.dashboard(auth.user_id, query.project_id).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.get_task(auth.user_id, task_id).await?))
}

pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let task = state
        .tasks
        .update_task(
            auth.user_id,
            task_id,
            TaskChanges {
                title: req.title,
                description: req.description,
                task_type: req.task_type,
                priority: req.priority,
                status: req.status,
                executor_id: req.executor_id,
            },
        )
        .await?;

    Ok(Json(task))
}

pub async fn move_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
    Json(target): Json<TaskMove>,
) -> ApiResult<Json<Task>> {
    let task = state.tasks.move_task(auth.user_id, task_id, target).await?;

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(task_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.tasks.delete_task(auth.user_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_executor_states() {
        let keep: UpdateTaskRequest = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(keep.executor_id, FieldUpdate::Keep);

        let clear: UpdateTaskRequest = serde_json::from_str(r#"{"executor_id":null}"#).unwrap();
        assert_eq!(clear.executor_id, FieldUpdate::Clear);

        let id = Uuid::new_v4();
        let set: UpdateTaskRequest =
            serde_json::from_str(&format!(r#"{{"executor_id":"{}"}}"#, id)).unwrap();
        assert_eq!(set.executor_id, FieldUpdate::Set(id));
    }

    #[test]
    fn test_blank_title_fails_validation() {
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"title":""}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
