/// Task model and database operations
///
/// Tasks belong to exactly one project and sit in one status lane. Within a
/// lane they are ordered by `rank`, a key produced by [`crate::rank`].
///
/// # Lanes
///
/// ```text
/// open → in_progress → review → testing → complete
/// ```
///
/// Any status can move to any other; the arrow only shows board order.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     key VARCHAR(32) NOT NULL,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     task_type task_type NOT NULL,
///     priority task_priority NOT NULL,
///     status task_status NOT NULL DEFAULT 'open',
///     author_id UUID NOT NULL REFERENCES users(id),
///     executor_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     rank VARCHAR(255) COLLATE "C" NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ,
///     UNIQUE (project_id, key)
/// );
/// ```
///
/// The `C` collation makes SQL comparisons on `rank` byte-wise, matching
/// the ordering the rank engine relies on.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// Workflow status of a task (its board lane)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    InProgress,
    Review,
    Testing,
    Complete,
}

impl TaskStatus {
    /// All statuses in board order
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Open,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Testing,
        TaskStatus::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Testing => "testing",
            TaskStatus::Complete => "complete",
        }
    }
}

/// Kind of work a task represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Task,
    Bug,
    Feature,
    Improvement,
}

/// Task priority, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning project
    pub project_id: Uuid,

    /// Human key, e.g. `DEMO-7`
    pub key: String,

    pub title: String,

    pub description: String,

    pub task_type: TaskType,

    pub priority: TaskPriority,

    /// Current lane
    pub status: TaskStatus,

    /// User who created the task
    pub author_id: Uuid,

    /// User working on the task, if any
    pub executor_id: Option<Uuid>,

    /// Position within the lane
    pub rank: String,

    /// When the task was created (immutable)
    pub created_at: DateTime<Utc>,

    /// When the task was last changed
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub project_id: Uuid,
    pub key: String,
    pub title: String,
    pub description: String,
    pub task_type: TaskType,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub author_id: Uuid,
    pub executor_id: Option<Uuid>,
    pub rank: String,
}

/// Column a task listing is sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Priority,
    Status,
    Key,
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort order for task listings
///
/// Ties are broken by task ID so paging is stable. Tasks never updated sort
/// last when ordering by `updated_at`, in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskSort {
    #[serde(default)]
    pub field: TaskSortField,
    #[serde(default)]
    pub direction: SortDirection,
}

impl TaskSort {
    fn column(&self) -> &'static str {
        match self.field {
            TaskSortField::CreatedAt => "created_at",
            TaskSortField::UpdatedAt => "updated_at",
            TaskSortField::Title => "title",
            TaskSortField::Priority => "priority",
            TaskSortField::Status => "status",
            TaskSortField::Key => "key",
        }
    }

    /// SQL `ORDER BY` clause for this sort (built from static fragments only)
    pub fn order_by(&self) -> String {
        let direction = match self.direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        format!("ORDER BY {} {} NULLS LAST, id ASC", self.column(), direction)
    }

    /// Compares two tasks the same way [`TaskSort::order_by`] orders rows
    pub fn compare(&self, a: &Task, b: &Task) -> Ordering {
        let directed = |ordering: Ordering| match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };

        let primary = match self.field {
            TaskSortField::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
            TaskSortField::UpdatedAt => match (a.updated_at, b.updated_at) {
                (Some(x), Some(y)) => directed(x.cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            TaskSortField::Title => directed(a.title.cmp(&b.title)),
            TaskSortField::Priority => directed(a.priority.cmp(&b.priority)),
            TaskSortField::Status => directed(a.status.cmp(&b.status)),
            TaskSortField::Key => directed(a.key.cmp(&b.key)),
        };

        primary.then_with(|| a.id.cmp(&b.id))
    }
}

const TASK_COLUMNS: &str = "id, project_id, key, title, description, task_type, priority, status, \
     author_id, executor_id, rank, created_at, updated_at";

impl Task {
    /// Creates a new task
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The key already exists in the project (unique constraint violation)
    /// - Project, author or executor doesn't exist (foreign key violation)
    /// - Database connection fails
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            INSERT INTO tasks (project_id, key, title, description, task_type, priority, status,
                               author_id, executor_id, rank)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {TASK_COLUMNS}
            "#
        );

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(data.project_id)
            .bind(data.key)
            .bind(data.title)
            .bind(data.description)
            .bind(data.task_type)
            .bind(data.priority)
            .bind(data.status)
            .bind(data.author_id)
            .bind(data.executor_id)
            .bind(data.rank)
            .fetch_one(executor)
            .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        let task = sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(task)
    }

    /// Writes every mutable field of `task` and stamps `updated_at`
    ///
    /// # Returns
    ///
    /// The stored task, None if it no longer exists
    pub async fn save<'e, E>(executor: E, task: &Task) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, task_type = $4, priority = $5, status = $6,
                executor_id = $7, rank = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        );

        let saved = sqlx::query_as::<_, Task>(&query)
            .bind(task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.task_type)
            .bind(task.priority)
            .bind(task.status)
            .bind(task.executor_id)
            .bind(&task.rank)
            .fetch_optional(executor)
            .await?;

        Ok(saved)
    }

    /// Deletes a task
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists one page of a project's tasks
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: Uuid,
        sort: TaskSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 {} LIMIT $2 OFFSET $3",
            sort.order_by()
        );

        let tasks = sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await?;

        Ok(tasks)
    }

    /// Counts a project's tasks
    pub async fn count_by_project(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(pool)
            .await?;

        Ok(count.0)
    }

    /// Lists every task of a project in board order (rank, then ID)
    pub async fn list_board(pool: &PgPool, project_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = $1 ORDER BY rank ASC, id ASC"
        );

        let tasks = sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await?;

        Ok(tasks)
    }

    /// Highest rank in a lane, None if the lane is empty
    pub async fn max_rank<'e, E>(
        executor: E,
        project_id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<String>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let rank = sqlx::query_scalar::<_, Option<String>>(
            "SELECT MAX(rank) FROM tasks WHERE project_id = $1 AND status = $2",
        )
        .bind(project_id)
        .bind(status)
        .fetch_one(executor)
        .await?;

        Ok(rank)
    }

    /// Greatest rank in a lane strictly below `rank`
    pub async fn rank_below<'e, E>(
        executor: E,
        project_id: Uuid,
        status: TaskStatus,
        rank: &str,
    ) -> Result<Option<String>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let below = sqlx::query_scalar::<_, Option<String>>(
            "SELECT MAX(rank) FROM tasks WHERE project_id = $1 AND status = $2 AND rank < $3",
        )
        .bind(project_id)
        .bind(status)
        .bind(rank)
        .fetch_one(executor)
        .await?;

        Ok(below)
    }

    /// Smallest rank in a lane strictly above `rank`
    pub async fn rank_above<'e, E>(
        executor: E,
        project_id: Uuid,
        status: TaskStatus,
        rank: &str,
    ) -> Result<Option<String>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let above = sqlx::query_scalar::<_, Option<String>>(
            "SELECT MIN(rank) FROM tasks WHERE project_id = $1 AND status = $2 AND rank > $3",
        )
        .bind(project_id)
        .bind(status)
        .bind(rank)
        .fetch_one(executor)
        .await?;

        Ok(above)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(title: &str, priority: TaskPriority, updated: Option<i64>) -> Task {
        let created_at = Utc::now();
        Task {
            id: Uuid::new_v4(),
            project_id: Uuid::nil(),
            key: format!("T-{}", title),
            title: title.to_string(),
            description: String::new(),
            task_type: TaskType::Task,
            priority,
            status: TaskStatus::Open,
            author_id: Uuid::nil(),
            executor_id: None,
            rank: "a0".to_string(),
            created_at,
            updated_at: updated.map(|secs| created_at + chrono::Duration::seconds(secs)),
        }
    }

    #[test]
    fn test_status_serde_is_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
    }

    #[test]
    fn test_status_board_order() {
        let mut shuffled = vec![TaskStatus::Complete, TaskStatus::Open, TaskStatus::Review];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![TaskStatus::Open, TaskStatus::Review, TaskStatus::Complete]
        );
        assert_eq!(TaskStatus::ALL.len(), 5);
    }

    #[test]
    fn test_order_by_is_static() {
        let sort = TaskSort {
            field: TaskSortField::Priority,
            direction: SortDirection::Desc,
        };
        assert_eq!(sort.order_by(), "ORDER BY priority DESC NULLS LAST, id ASC");
        assert_eq!(
            TaskSort::default().order_by(),
            "ORDER BY created_at ASC NULLS LAST, id ASC"
        );
    }

    #[test]
    fn test_compare_by_priority_desc() {
        let sort = TaskSort {
            field: TaskSortField::Priority,
            direction: SortDirection::Desc,
        };
        let mut tasks = vec![
            task("a", TaskPriority::Low, None),
            task("b", TaskPriority::Critical, None),
            task("c", TaskPriority::Medium, None),
        ];
        tasks.sort_by(|a, b| sort.compare(a, b));
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c", "a"]);
    }

    #[test]
    fn test_compare_never_updated_sorts_last() {
        for direction in [SortDirection::Asc, SortDirection::Desc] {
            let sort = TaskSort {
                field: TaskSortField::UpdatedAt,
                direction,
            };
            let mut tasks = vec![
                task("never", TaskPriority::Low, None),
                task("early", TaskPriority::Low, Some(10)),
                task("late", TaskPriority::Low, Some(20)),
            ];
            tasks.sort_by(|a, b| sort.compare(a, b));
            assert_eq!(tasks[2].title, "never");
        }
    }

    #[test]
    fn test_sort_deserializes_with_defaults() {
        let sort: TaskSort = serde_json::from_str(r#"{"field":"title"}"#).unwrap();
        assert_eq!(sort.field, TaskSortField::Title);
        assert_eq!(sort.direction, SortDirection::Asc);
    }
}
