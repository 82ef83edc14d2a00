/// Repository-style access to persisted state
///
/// Domain services never talk to the database directly. They go through
/// these traits, which exist in two implementations:
///
/// - [`postgres::PgStore`]: delegates to the model queries over a `PgPool`
/// - [`memory::MemoryStore`]: keeps everything in maps behind one lock, for
///   tests and database-less local runs
///
/// Multi-row writes that must not be observed half-done (project + admin
/// membership, refresh token replacement, verification redemption) are
/// single trait methods, so each implementation makes them atomic. Rank
/// changes run under a per-project [`LaneLock`].
///
/// # Example
///
/// ```
/// use projectflow_shared::store::{memory::MemoryStore, UserStore};
/// use projectflow_shared::models::user::CreateUser;
///
/// # async fn example() -> Result<(), projectflow_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let user = store.insert_user(CreateUser {
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     enabled: true,
/// }).await?;
///
/// assert!(store.find_user(user.id).await?.is_some());
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    membership::{CreateMembership, Membership, ProjectMember, ProjectRole},
    project::{CreateProject, Project, UpdateProject},
    refresh_token::RefreshToken,
    task::{CreateTask, Task, TaskSort, TaskStatus},
    user::{CreateUser, User},
    verification_token::VerificationToken,
};

pub mod memory;
pub mod postgres;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint was violated (duplicate email, membership, ...)
    #[error("Unique constraint violated: {0}")]
    Conflict(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let what = db_err
                    .constraint()
                    .map(str::to_string)
                    .unwrap_or_else(|| db_err.message().to_string());
                return StoreError::Conflict(what);
            }
        }
        StoreError::Database(err)
    }
}

/// User lookups and creation
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; `Conflict` if the email is taken
    async fn insert_user(&self, data: CreateUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
}

/// Projects and their task counters
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Creates a project together with an admin membership for `admin_id`
    async fn create_project(&self, data: CreateProject, admin_id: Uuid)
        -> Result<Project, StoreError>;

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;

    /// Projects the user is a member of, oldest first
    async fn list_projects_for_user(&self, user_id: Uuid) -> Result<Vec<Project>, StoreError>;

    async fn update_project(
        &self,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Project>, StoreError>;

    /// Deletes a project with its memberships and tasks
    async fn delete_project(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Bumps and returns the project's task counter
    async fn allocate_task_number(&self, id: Uuid) -> Result<Option<i64>, StoreError>;
}

/// Memberships keyed by (project, user)
#[async_trait]
pub trait MembershipStore: Send + Sync {
    async fn find_membership(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError>;

    /// Inserts a membership; `Conflict` if the pair already has one
    async fn insert_membership(&self, data: CreateMembership) -> Result<Membership, StoreError>;

    async fn update_membership_role(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Membership>, StoreError>;

    async fn delete_membership(&self, project_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    /// One page of members with their roles, in join order
    async fn list_members(
        &self,
        project_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProjectMember>, StoreError>;

    async fn count_members(&self, project_id: Uuid) -> Result<i64, StoreError>;
}

/// Task lookups and listings
///
/// Every write that assigns a rank goes through [`TaskStore::lock_lanes`].
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list_tasks(
        &self,
        project_id: Uuid,
        sort: TaskSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Task>, StoreError>;

    async fn count_tasks(&self, project_id: Uuid) -> Result<i64, StoreError>;

    /// Every task of the project ordered by rank, then ID
    async fn list_board(&self, project_id: Uuid) -> Result<Vec<Task>, StoreError>;

    /// Locks the lanes of a project for rank changes
    ///
    /// Returns None if the project doesn't exist.
    async fn lock_lanes(&self, project_id: Uuid) -> Result<Option<Box<dyn LaneLock>>, StoreError>;
}

/// Exclusive access to the task lanes of one project
///
/// Obtained from [`TaskStore::lock_lanes`]. While a lock is alive, every
/// other `lock_lanes` call for the same project waits, so ranks read through
/// the lock are still current when the task is written back. Writes become
/// visible on [`LaneLock::commit`]; dropping the lock instead discards them
/// on PostgreSQL.
///
/// # Example
///
/// ```
/// use projectflow_shared::models::task::TaskStatus;
/// use projectflow_shared::store::{memory::MemoryStore, LaneLock, TaskStore};
/// # use projectflow_shared::store::StoreError;
/// # use uuid::Uuid;
///
/// # async fn example(store: MemoryStore, project_id: Uuid) -> Result<(), StoreError> {
/// if let Some(mut lane) = store.lock_lanes(project_id).await? {
///     let _last = lane.max_rank(TaskStatus::Open).await?;
///     lane.commit().await?;
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait LaneLock: Send {
    async fn find_task(&mut self, id: Uuid) -> Result<Option<Task>, StoreError>;

    async fn insert_task(&mut self, data: CreateTask) -> Result<Task, StoreError>;

    /// Writes the mutable fields of `task` and stamps `updated_at`
    async fn save_task(&mut self, task: &Task) -> Result<Option<Task>, StoreError>;

    /// Highest rank in a lane, None if the lane is empty
    async fn max_rank(&mut self, status: TaskStatus) -> Result<Option<String>, StoreError>;

    /// Greatest rank in a lane strictly below `rank`
    async fn rank_below(
        &mut self,
        status: TaskStatus,
        rank: &str,
    ) -> Result<Option<String>, StoreError>;

    /// Smallest rank in a lane strictly above `rank`
    async fn rank_above(
        &mut self,
        status: TaskStatus,
        rank: &str,
    ) -> Result<Option<String>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Refresh and verification tokens, stored by digest
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Atomically replaces the user's refresh token
    async fn replace_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, StoreError>;

    async fn find_refresh_token(&self, token_hash: &str)
        -> Result<Option<RefreshToken>, StoreError>;

    async fn delete_refresh_token(&self, token_hash: &str) -> Result<bool, StoreError>;

    async fn delete_refresh_tokens_for_user(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// Atomically replaces the user's verification token
    async fn replace_verification_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationToken, StoreError>;

    async fn find_verification_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<VerificationToken>, StoreError>;

    async fn delete_verification_token(&self, token_hash: &str) -> Result<bool, StoreError>;

    /// Deletes the token and enables its user; false if the token is gone
    async fn redeem_verification_token(&self, token_hash: &str) -> Result<bool, StoreError>;
}

/// Everything the services need from persistence
#[async_trait]
pub trait Store: UserStore + ProjectStore + MembershipStore + TaskStore + TokenStore {
    /// Short backend name for health reporting
    fn backend(&self) -> &'static str;

    /// Checks that the backend is reachable
    async fn ping(&self) -> Result<(), StoreError>;

    /// Releases backend connections on shutdown
    async fn close(&self) {}
}
