/// Project model and database operations
///
/// A project owns its memberships and tasks; deleting it cascades to both.
/// The short `key` prefixes every task key (`DEMO-1`, `DEMO-2`, ...) and
/// `task_seq` counts the tasks ever created, so numbers are never reused.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     key VARCHAR(10) NOT NULL,
///     task_seq BIGINT NOT NULL DEFAULT 0,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::membership::ProjectRole;

/// Maximum length of a project key
pub const MAX_KEY_LEN: usize = 10;

/// Project model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID
    pub id: Uuid,

    /// Project title
    pub title: String,

    /// Free-form description
    pub description: String,

    /// Task key prefix (uppercase, at most 10 characters)
    pub key: String,

    /// Number of tasks ever created in this project
    #[serde(skip_serializing)]
    pub task_seq: i64,

    /// When the project was created
    pub created_at: DateTime<Utc>,

    /// When the project was last updated
    pub updated_at: Option<DateTime<Utc>>,
}

/// Input for creating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub title: String,
    pub description: String,
    /// Already normalized key
    pub key: String,
}

/// Input for updating a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateProject {
    pub title: String,
    pub description: String,
    pub key: String,
}

impl Project {
    /// Creates a project and makes `admin_id` its first admin
    ///
    /// Both rows are written in one transaction, so a project never exists
    /// without an admin.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use projectflow_shared::models::project::{Project, CreateProject};
    /// # use sqlx::PgPool;
    /// # use uuid::Uuid;
    /// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    /// let project = Project::create_with_admin(&pool, CreateProject {
    ///     title: "Demo".to_string(),
    ///     description: String::new(),
    ///     key: "DEMO".to_string(),
    /// }, user_id).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create_with_admin(
        pool: &PgPool,
        data: CreateProject,
        admin_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let project = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (title, description, key)
            VALUES ($1, $2, $3)
            RETURNING id, title, description, key, task_seq, created_at, updated_at
            "#,
        )
        .bind(data.title)
        .bind(data.description)
        .bind(data.key)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO project_memberships (project_id, user_id, role) VALUES ($1, $2, $3)",
        )
        .bind(project.id)
        .bind(admin_id)
        .bind(ProjectRole::Admin)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(project)
    }

    /// Finds a project by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            SELECT id, title, description, key, task_seq, created_at, updated_at
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Lists the projects a user participates in, oldest first
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT p.id, p.title, p.description, p.key, p.task_seq, p.created_at, p.updated_at
            FROM projects p
            JOIN project_memberships m ON m.project_id = p.id
            WHERE m.user_id = $1
            ORDER BY p.created_at ASC, p.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(projects)
    }

    /// Updates title, description and key
    ///
    /// # Returns
    ///
    /// The updated project, None if it doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let project = sqlx::query_as::<_, Project>(
            r#"
            UPDATE projects
            SET title = $2, description = $3, key = $4, updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, key, task_seq, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.key)
        .fetch_optional(pool)
        .await?;

        Ok(project)
    }

    /// Deletes a project (cascades to memberships and tasks)
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Takes the row lock that serializes rank changes in a project's lanes
    ///
    /// Must run inside a transaction; the lock is held until it ends.
    ///
    /// # Returns
    ///
    /// False if the project doesn't exist
    pub async fn lock_for_update(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
        let locked = sqlx::query_scalar::<_, Uuid>("SELECT id FROM projects WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(locked.is_some())
    }

    /// Reserves the next task number for a project
    ///
    /// The counter is bumped in a single statement, so concurrent task
    /// creation never hands out the same number twice.
    ///
    /// # Returns
    ///
    /// The reserved 1-based number, None if the project doesn't exist
    pub async fn allocate_task_number(pool: &PgPool, id: Uuid) -> Result<Option<i64>, sqlx::Error> {
        let number = sqlx::query_scalar::<_, i64>(
            "UPDATE projects SET task_seq = task_seq + 1 WHERE id = $1 RETURNING task_seq",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(number)
    }
}

/// Normalizes a project key
///
/// Whitespace is stripped, letters are uppercased and the result is cut to
/// [`MAX_KEY_LEN`] characters. The same rule derives a key from a title.
///
/// # Example
///
/// ```
/// use projectflow_shared::models::project::normalize_key;
///
/// assert_eq!(normalize_key("Demo"), "DEMO");
/// assert_eq!(normalize_key("My Cool Project"), "MYCOOLPROJ");
/// ```
pub fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .take(MAX_KEY_LEN)
        .collect()
}

/// Formats the human key of the `number`-th task of a project
pub fn task_key(project_key: &str, number: i64) -> String {
    format!("{}-{}", project_key, number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key_strips_and_uppercases() {
        assert_eq!(normalize_key(" web app "), "WEBAPP");
        assert_eq!(normalize_key("abc"), "ABC");
    }

    #[test]
    fn test_normalize_key_truncates() {
        assert_eq!(normalize_key("abcdefghijklmnop"), "ABCDEFGHIJ");
        assert_eq!(normalize_key("abcdefghijklmnop").chars().count(), MAX_KEY_LEN);
    }

    #[test]
    fn test_normalize_key_of_blank_is_empty() {
        assert_eq!(normalize_key("   \t"), "");
    }

    #[test]
    fn test_task_key_format() {
        assert_eq!(task_key("DEMO", 1), "DEMO-1");
        assert_eq!(task_key("DEMO", 42), "DEMO-42");
    }
}
