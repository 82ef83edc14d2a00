/// PostgreSQL implementation of the store traits
///
/// Every method delegates to the query on the corresponding model and
/// converts `sqlx::Error` into [`StoreError`]. A lane lock is a transaction
/// that starts with `SELECT ... FOR UPDATE` on the project row.
///
/// # Example
///
/// ```no_run
/// use projectflow_shared::db::pool::{create_pool, DatabaseConfig};
/// use projectflow_shared::store::{postgres::PgStore, Store};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// }).await?;
///
/// let store = PgStore::new(pool);
/// store.ping().await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    LaneLock, MembershipStore, ProjectStore, Store, StoreError, TaskStore, TokenStore, UserStore,
};
use crate::db::pool::{close_pool, health_check};
use crate::models::{
    membership::{CreateMembership, Membership, ProjectMember, ProjectRole},
    project::{CreateProject, Project, UpdateProject},
    refresh_token::RefreshToken,
    task::{CreateTask, Task, TaskSort, TaskStatus},
    user::{CreateUser, User},
    verification_token::VerificationToken,
};

/// Store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, data: CreateUser) -> Result<User, StoreError> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn create_project(
        &self,
        data: CreateProject,
        admin_id: Uuid,
    ) -> Result<Project, StoreError> {
        Ok(Project::create_with_admin(&self.pool, data, admin_id).await?)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(Project::find_by_id(&self.pool, id).await?)
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> Result<Vec<Project>, StoreError> {
        Ok(Project::list_for_user(&self.pool, user_id).await?)
    }

    async fn update_project(
        &self,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Project>, StoreError> {
        Ok(Project::update(&self.pool, id, data).await?)
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Project::delete(&self.pool, id).await?)
    }

    async fn allocate_task_number(&self, id: Uuid) -> Result<Option<i64>, StoreError> {
        Ok(Project::allocate_task_number(&self.pool, id).await?)
    }
}

#[async_trait]
impl MembershipStore for PgStore {
    async fn find_membership(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(Membership::find(&self.pool, project_id, user_id).await?)
    }

    async fn insert_membership(&self, data: CreateMembership) -> Result<Membership, StoreError> {
        Ok(Membership::create(&self.pool, data).await?)
    }

    async fn update_membership_role(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Membership>, StoreError> {
        Ok(Membership::update_role(&self.pool, project_id, user_id, role).await?)
    }

    async fn delete_membership(&self, project_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        Ok(Membership::delete(&self.pool, project_id, user_id).await?)
    }

    async fn list_members(
        &self,
        project_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProjectMember>, StoreError> {
        Ok(Membership::list_members(&self.pool, project_id, limit, offset).await?)
    }

    async fn count_members(&self, project_id: Uuid) -> Result<i64, StoreError> {
        Ok(Membership::count_members(&self.pool, project_id).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn list_tasks(
        &self,
        project_id: Uuid,
        sort: TaskSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list_by_project(&self.pool, project_id, sort, limit, offset).await?)
    }

    async fn count_tasks(&self, project_id: Uuid) -> Result<i64, StoreError> {
        Ok(Task::count_by_project(&self.pool, project_id).await?)
    }

    async fn list_board(&self, project_id: Uuid) -> Result<Vec<Task>, StoreError> {
        Ok(Task::list_board(&self.pool, project_id).await?)
    }

    async fn lock_lanes(&self, project_id: Uuid) -> Result<Option<Box<dyn LaneLock>>, StoreError> {
        let mut tx = self.pool.begin().await?;

        if !Project::lock_for_update(&mut tx, project_id).await? {
            return Ok(None);
        }

        Ok(Some(Box::new(PgLaneLock { project_id, tx })))
    }
}

/// Transaction holding the project row lock
struct PgLaneLock {
    project_id: Uuid,
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LaneLock for PgLaneLock {
    async fn find_task(&mut self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(Task::find_by_id(&mut *self.tx, id).await?)
    }

    async fn insert_task(&mut self, data: CreateTask) -> Result<Task, StoreError> {
        Ok(Task::create(&mut *self.tx, data).await?)
    }

    async fn save_task(&mut self, task: &Task) -> Result<Option<Task>, StoreError> {
        Ok(Task::save(&mut *self.tx, task).await?)
    }

    async fn max_rank(&mut self, status: TaskStatus) -> Result<Option<String>, StoreError> {
        Ok(Task::max_rank(&mut *self.tx, self.project_id, status).await?)
    }

    async fn rank_below(
        &mut self,
        status: TaskStatus,
        rank: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(Task::rank_below(&mut *self.tx, self.project_id, status, rank).await?)
    }

    async fn rank_above(
        &mut self,
        status: TaskStatus,
        rank: &str,
    ) -> Result<Option<String>, StoreError> {
        Ok(Task::rank_above(&mut *self.tx, self.project_id, status, rank).await?)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let lock = *self;
        lock.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn replace_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, StoreError> {
        Ok(RefreshToken::replace_for_user(&self.pool, user_id, token_hash, expires_at).await?)
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, StoreError> {
        Ok(RefreshToken::find_by_hash(&self.pool, token_hash).await?)
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(RefreshToken::delete_by_hash(&self.pool, token_hash).await?)
    }

    async fn delete_refresh_tokens_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        Ok(RefreshToken::delete_for_user(&self.pool, user_id).await?)
    }

    async fn replace_verification_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationToken, StoreError> {
        Ok(VerificationToken::replace_for_user(&self.pool, user_id, token_hash, expires_at).await?)
    }

    async fn find_verification_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<VerificationToken>, StoreError> {
        Ok(VerificationToken::find_by_hash(&self.pool, token_hash).await?)
    }

    async fn delete_verification_token(&self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(VerificationToken::delete_by_hash(&self.pool, token_hash).await?)
    }

    async fn redeem_verification_token(&self, token_hash: &str) -> Result<bool, StoreError> {
        Ok(VerificationToken::redeem(&self.pool, token_hash).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(health_check(&self.pool).await?)
    }

    async fn close(&self) {
        close_pool(self.pool.clone()).await;
    }
}
