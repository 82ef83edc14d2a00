/// Project membership model and database operations
///
/// A membership links one user to one project with exactly one role. Rows
/// are keyed by `(project_id, user_id)`, so a user can never hold two
/// memberships in the same project.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE project_role AS ENUM ('admin', 'member');
///
/// CREATE TABLE project_memberships (
///     project_id UUID NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role project_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (project_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **admin**: everything a member can do, plus deleting the project or its
///   tasks, changing roles, and adding or removing members
/// - **member**: read the project, create and edit tasks
///
/// # Example
///
/// ```no_run
/// use projectflow_shared::models::membership::{Membership, CreateMembership, ProjectRole};
/// use projectflow_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let project_id = Uuid::new_v4();
/// let user_id = Uuid::new_v4();
///
/// Membership::create(&pool, CreateMembership {
///     project_id,
///     user_id,
///     role: ProjectRole::Member,
/// }).await?;
///
/// let membership = Membership::find(&pool, project_id, user_id).await?;
/// assert_eq!(membership.map(|m| m.role), Some(ProjectRole::Member));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Role of a user within a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    /// Manages the project, its members and destructive operations
    Admin,

    /// Works on tasks
    Member,
}

impl ProjectRole {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Admin => "admin",
            ProjectRole::Member => "member",
        }
    }

    /// Checks if this role has the permission level of the required role
    ///
    /// Hierarchy: Admin > Member
    pub fn has_permission(&self, required: &ProjectRole) -> bool {
        self.permission_level() >= required.permission_level()
    }

    fn permission_level(&self) -> u8 {
        match self {
            ProjectRole::Admin => 2,
            ProjectRole::Member => 1,
        }
    }
}

/// Membership linking a user to a project
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Membership {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the project
    pub role: ProjectRole,

    /// When the user joined the project
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new membership
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMembership {
    /// Project ID
    pub project_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role to assign (defaults to Member)
    #[serde(default = "default_role")]
    pub role: ProjectRole,
}

fn default_role() -> ProjectRole {
    ProjectRole::Member
}

/// A project member as listed to other participants
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProjectMember {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
}

impl Membership {
    /// Creates a new membership (adds user to project)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Membership already exists (primary key violation)
    /// - Project or user doesn't exist (foreign key violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateMembership) -> Result<Self, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            INSERT INTO project_memberships (project_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING project_id, user_id, role, created_at
            "#,
        )
        .bind(data.project_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        Ok(membership)
    }

    /// Finds the membership for a (project, user) pair
    pub async fn find(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            SELECT project_id, user_id, role, created_at
            FROM project_memberships
            WHERE project_id = $1 AND user_id = $2
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Changes a member's role
    ///
    /// # Returns
    ///
    /// The updated membership, None if the pair has no membership
    pub async fn update_role(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Self>, sqlx::Error> {
        let membership = sqlx::query_as::<_, Membership>(
            r#"
            UPDATE project_memberships
            SET role = $3
            WHERE project_id = $1 AND user_id = $2
            RETURNING project_id, user_id, role, created_at
            "#,
        )
        .bind(project_id)
        .bind(user_id)
        .bind(role)
        .fetch_optional(pool)
        .await?;

        Ok(membership)
    }

    /// Removes a user from a project
    ///
    /// # Returns
    ///
    /// True if a membership was deleted
    pub async fn delete(pool: &PgPool, project_id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM project_memberships WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists the members of a project with their roles, oldest first
    pub async fn list_members(
        pool: &PgPool,
        project_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProjectMember>, sqlx::Error> {
        let members = sqlx::query_as::<_, ProjectMember>(
            r#"
            SELECT u.id AS user_id, u.name, u.email, m.role, m.created_at AS joined_at
            FROM project_memberships m
            JOIN users u ON u.id = m.user_id
            WHERE m.project_id = $1
            ORDER BY m.created_at ASC, u.id ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(project_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(members)
    }

    /// Counts the members of a project
    pub async fn count_members(pool: &PgPool, project_id: Uuid) -> Result<i64, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM project_memberships WHERE project_id = $1")
                .bind(project_id)
                .fetch_one(pool)
                .await?;

        Ok(count.0)
    }
}
