/// In-memory implementation of the store traits
///
/// All tables live behind a single `tokio::sync::RwLock`, so every trait
/// method is atomic with respect to the others. Lane locks are taken on one
/// store-wide mutex; their writes apply immediately and are not rolled back
/// when a lock is dropped without committing. Unique constraints of the
/// SQL schema (user email, membership pair, token digest, task key) are
/// enforced and reported as [`StoreError::Conflict`]; deleting a project
/// removes its memberships and tasks like the `ON DELETE CASCADE` clauses.
///
/// Used by the test suites and by the API server when no `DATABASE_URL` is
/// configured. Nothing survives a restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use super::{
    LaneLock, MembershipStore, ProjectStore, Store, StoreError, TaskStore, TokenStore, UserStore,
};
use crate::models::{
    membership::{CreateMembership, Membership, ProjectMember, ProjectRole},
    project::{CreateProject, Project, UpdateProject},
    refresh_token::RefreshToken,
    task::{CreateTask, Task, TaskSort, TaskStatus},
    user::{CreateUser, User},
    verification_token::VerificationToken,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    projects: HashMap<Uuid, Project>,
    memberships: BTreeMap<(Uuid, Uuid), Membership>,
    tasks: HashMap<Uuid, Task>,
    refresh_tokens: HashMap<Uuid, RefreshToken>,
    verification_tokens: HashMap<Uuid, VerificationToken>,
}

impl Tables {
    fn lane(&self, project_id: Uuid, status: TaskStatus) -> impl Iterator<Item = &str> {
        self.tasks
            .values()
            .filter(move |t| t.project_id == project_id && t.status == status)
            .map(|t| t.rank.as_str())
    }

    fn insert_task(&mut self, data: CreateTask) -> Result<Task, StoreError> {
        if self
            .tasks
            .values()
            .any(|t| t.project_id == data.project_id && t.key == data.key)
        {
            return Err(StoreError::Conflict("tasks_project_id_key_key".to_string()));
        }

        let task = Task {
            id: Uuid::new_v4(),
            project_id: data.project_id,
            key: data.key,
            title: data.title,
            description: data.description,
            task_type: data.task_type,
            priority: data.priority,
            status: data.status,
            author_id: data.author_id,
            executor_id: data.executor_id,
            rank: data.rank,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.tasks.insert(task.id, task.clone());

        Ok(task)
    }

    fn save_task(&mut self, task: &Task) -> Option<Task> {
        let stored = self.tasks.get_mut(&task.id)?;
        stored.title = task.title.clone();
        stored.description = task.description.clone();
        stored.task_type = task.task_type;
        stored.priority = task.priority;
        stored.status = task.status;
        stored.executor_id = task.executor_id;
        stored.rank = task.rank.clone();
        stored.updated_at = Some(Utc::now());

        Some(stored.clone())
    }
}

/// Store keeping every table in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    lanes: Arc<Mutex<()>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.email == data.email) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            enabled: data.enabled,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(
        &self,
        data: CreateProject,
        admin_id: Uuid,
    ) -> Result<Project, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let project = Project {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            key: data.key,
            task_seq: 0,
            created_at: now,
            updated_at: None,
        };

        tables.projects.insert(project.id, project.clone());
        tables.memberships.insert(
            (project.id, admin_id),
            Membership {
                project_id: project.id,
                user_id: admin_id,
                role: ProjectRole::Admin,
                created_at: now,
            },
        );

        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }

    async fn list_projects_for_user(&self, user_id: Uuid) -> Result<Vec<Project>, StoreError> {
        let tables = self.tables.read().await;

        let mut projects: Vec<Project> = tables
            .memberships
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| tables.projects.get(&m.project_id).cloned())
            .collect();
        projects.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        Ok(projects)
    }

    async fn update_project(
        &self,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Project>, StoreError> {
        let mut tables = self.tables.write().await;

        let Some(project) = tables.projects.get_mut(&id) else {
            return Ok(None);
        };
        project.title = data.title;
        project.description = data.description;
        project.key = data.key;
        project.updated_at = Some(Utc::now());

        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.projects.remove(&id).is_none() {
            return Ok(false);
        }
        tables.memberships.retain(|(project_id, _), _| *project_id != id);
        tables.tasks.retain(|_, task| task.project_id != id);

        Ok(true)
    }

    async fn allocate_task_number(&self, id: Uuid) -> Result<Option<i64>, StoreError> {
        let mut tables = self.tables.write().await;

        Ok(tables.projects.get_mut(&id).map(|project| {
            project.task_seq += 1;
            project.task_seq
        }))
    }
}

#[async_trait]
impl MembershipStore for MemoryStore {
    async fn find_membership(
        &self,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.memberships.get(&(project_id, user_id)).cloned())
    }

    async fn insert_membership(&self, data: CreateMembership) -> Result<Membership, StoreError> {
        let mut tables = self.tables.write().await;
        let key = (data.project_id, data.user_id);

        if tables.memberships.contains_key(&key) {
            return Err(StoreError::Conflict("project_memberships_pkey".to_string()));
        }

        let membership = Membership {
            project_id: data.project_id,
            user_id: data.user_id,
            role: data.role,
            created_at: Utc::now(),
        };
        tables.memberships.insert(key, membership.clone());

        Ok(membership)
    }

    async fn update_membership_role(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        role: ProjectRole,
    ) -> Result<Option<Membership>, StoreError> {
        let mut tables = self.tables.write().await;

        Ok(tables
            .memberships
            .get_mut(&(project_id, user_id))
            .map(|membership| {
                membership.role = role;
                membership.clone()
            }))
    }

    async fn delete_membership(&self, project_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.memberships.remove(&(project_id, user_id)).is_some())
    }

    async fn list_members(
        &self,
        project_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ProjectMember>, StoreError> {
        let tables = self.tables.read().await;

        let mut members: Vec<ProjectMember> = tables
            .memberships
            .range((project_id, Uuid::nil())..=(project_id, Uuid::from_u128(u128::MAX)))
            .filter_map(|(_, m)| {
                tables.users.get(&m.user_id).map(|u| ProjectMember {
                    user_id: u.id,
                    name: u.name.clone(),
                    email: u.email.clone(),
                    role: m.role,
                    joined_at: m.created_at,
                })
            })
            .collect();
        members.sort_by(|a, b| {
            a.joined_at
                .cmp(&b.joined_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });

        Ok(paginate(members, limit, offset))
    }

    async fn count_members(&self, project_id: Uuid) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        let count = tables
            .memberships
            .range((project_id, Uuid::nil())..=(project_id, Uuid::from_u128(u128::MAX)))
            .count();

        Ok(count as i64)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.tasks.remove(&id).is_some())
    }

    async fn list_tasks(
        &self,
        project_id: Uuid,
        sort: TaskSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;

        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| sort.compare(a, b));

        Ok(paginate(tasks, limit, offset))
    }

    async fn count_tasks(&self, project_id: Uuid) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        let count = tables
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .count();

        Ok(count as i64)
    }

    async fn list_board(&self, project_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let tables = self.tables.read().await;

        let mut tasks: Vec<Task> = tables
            .tasks
            .values()
            .filter(|t| t.project_id == project_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.id.cmp(&b.id)));

        Ok(tasks)
    }

    async fn lock_lanes(&self, project_id: Uuid) -> Result<Option<Box<dyn LaneLock>>, StoreError> {
        let guard = self.lanes.clone().lock_owned().await;

        if !self.tables.read().await.projects.contains_key(&project_id) {
            return Ok(None);
        }

        Ok(Some(Box::new(MemoryLaneLock {
            project_id,
            tables: self.tables.clone(),
            _guard: guard,
        })))
    }
}

struct MemoryLaneLock {
    project_id: Uuid,
    tables: Arc<RwLock<Tables>>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl LaneLock for MemoryLaneLock {
    async fn find_task(&mut self, id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn insert_task(&mut self, data: CreateTask) -> Result<Task, StoreError> {
        self.tables.write().await.insert_task(data)
    }

    async fn save_task(&mut self, task: &Task) -> Result<Option<Task>, StoreError> {
        Ok(self.tables.write().await.save_task(task))
    }

    async fn max_rank(&mut self, status: TaskStatus) -> Result<Option<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.lane(self.project_id, status).max().map(str::to_string))
    }

    async fn rank_below(
        &mut self,
        status: TaskStatus,
        rank: &str,
    ) -> Result<Option<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .lane(self.project_id, status)
            .filter(|r| *r < rank)
            .max()
            .map(str::to_string))
    }

    async fn rank_above(
        &mut self,
        status: TaskStatus,
        rank: &str,
    ) -> Result<Option<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .lane(self.project_id, status)
            .filter(|r| *r > rank)
            .min()
            .map(str::to_string))
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn replace_refresh_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, StoreError> {
        let mut tables = self.tables.write().await;

        if tables
            .refresh_tokens
            .values()
            .any(|t| t.token_hash == token_hash && t.user_id != user_id)
        {
            return Err(StoreError::Conflict("refresh_tokens_token_hash_key".to_string()));
        }

        let token = RefreshToken {
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        tables.refresh_tokens.insert(user_id, token.clone());

        Ok(token)
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<RefreshToken>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .refresh_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.refresh_tokens.len();
        tables.refresh_tokens.retain(|_, t| t.token_hash != token_hash);

        Ok(tables.refresh_tokens.len() < before)
    }

    async fn delete_refresh_tokens_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(u64::from(tables.refresh_tokens.remove(&user_id).is_some()))
    }

    async fn replace_verification_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationToken, StoreError> {
        let mut tables = self.tables.write().await;

        if tables
            .verification_tokens
            .values()
            .any(|t| t.token_hash == token_hash && t.user_id != user_id)
        {
            return Err(StoreError::Conflict(
                "verification_tokens_token_hash_key".to_string(),
            ));
        }

        let token = VerificationToken {
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        tables.verification_tokens.insert(user_id, token.clone());

        Ok(token)
    }

    async fn find_verification_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<VerificationToken>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .verification_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn delete_verification_token(&self, token_hash: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.verification_tokens.len();
        tables
            .verification_tokens
            .retain(|_, t| t.token_hash != token_hash);

        Ok(tables.verification_tokens.len() < before)
    }

    async fn redeem_verification_token(&self, token_hash: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;

        let Some(user_id) = tables
            .verification_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .map(|t| t.user_id)
        else {
            return Ok(false);
        };

        tables.verification_tokens.remove(&user_id);
        if let Some(user) = tables.users.get_mut(&user_id) {
            user.enabled = true;
            user.updated_at = Utc::now();
        }

        Ok(true)
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::{TaskPriority, TaskType};

    async fn seed_user(store: &MemoryStore, email: &str) -> User {
        store
            .insert_user(CreateUser {
                name: email.to_string(),
                email: email.to_string(),
                password_hash: "hash".to_string(),
                enabled: true,
            })
            .await
            .unwrap()
    }

    fn new_task(project_id: Uuid, author_id: Uuid, key: &str, rank: &str) -> CreateTask {
        CreateTask {
            project_id,
            key: key.to_string(),
            title: key.to_string(),
            description: String::new(),
            task_type: TaskType::Task,
            priority: TaskPriority::Medium,
            status: TaskStatus::Open,
            author_id,
            executor_id: None,
            rank: rank.to_string(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        seed_user(&store, "ada@example.com").await;

        let result = store
            .insert_user(CreateUser {
                name: "Other".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hash".to_string(),
                enabled: true,
            })
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_project_adds_admin() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "ada@example.com").await;

        let project = store
            .create_project(
                CreateProject {
                    title: "Demo".to_string(),
                    description: String::new(),
                    key: "DEMO".to_string(),
                },
                user.id,
            )
            .await
            .unwrap();

        let membership = store.find_membership(project.id, user.id).await.unwrap().unwrap();
        assert_eq!(membership.role, ProjectRole::Admin);
        assert_eq!(store.count_members(project.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_membership_conflicts() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "ada@example.com").await;
        let project = store
            .create_project(
                CreateProject {
                    title: "Demo".to_string(),
                    description: String::new(),
                    key: "DEMO".to_string(),
                },
                user.id,
            )
            .await
            .unwrap();

        let result = store
            .insert_membership(CreateMembership {
                project_id: project.id,
                user_id: user.id,
                role: ProjectRole::Member,
            })
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
    }

    async fn seed_project(store: &MemoryStore, admin_id: Uuid) -> Project {
        store
            .create_project(
                CreateProject {
                    title: "Demo".to_string(),
                    description: String::new(),
                    key: "DEMO".to_string(),
                },
                admin_id,
            )
            .await
            .unwrap()
    }

    async fn insert(store: &MemoryStore, data: CreateTask) -> Task {
        let mut lane = store.lock_lanes(data.project_id).await.unwrap().unwrap();
        let task = lane.insert_task(data).await.unwrap();
        lane.commit().await.unwrap();
        task
    }

    #[tokio::test]
    async fn test_delete_project_cascades() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "ada@example.com").await;
        let project = seed_project(&store, user.id).await;
        let task = insert(&store, new_task(project.id, user.id, "DEMO-1", "a0")).await;

        assert!(store.delete_project(project.id).await.unwrap());
        assert!(store.find_task(task.id).await.unwrap().is_none());
        assert!(store.find_membership(project.id, user.id).await.unwrap().is_none());
        assert!(!store.delete_project(project.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_allocate_task_number_is_monotonic() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "ada@example.com").await;
        let project = seed_project(&store, user.id).await;

        assert_eq!(store.allocate_task_number(project.id).await.unwrap(), Some(1));
        assert_eq!(store.allocate_task_number(project.id).await.unwrap(), Some(2));
        assert_eq!(store.allocate_task_number(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lane_rank_lookups() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "ada@example.com").await;
        let project = seed_project(&store, user.id).await;

        for (key, rank) in [("T-1", "a0"), ("T-2", "a1"), ("T-3", "a2")] {
            insert(&store, new_task(project.id, user.id, key, rank)).await;
        }

        let open = TaskStatus::Open;
        let mut lane = store.lock_lanes(project.id).await.unwrap().unwrap();
        assert_eq!(lane.max_rank(open).await.unwrap().as_deref(), Some("a2"));
        assert_eq!(lane.rank_below(open, "a1").await.unwrap().as_deref(), Some("a0"));
        assert_eq!(lane.rank_above(open, "a1").await.unwrap().as_deref(), Some("a2"));
        assert_eq!(lane.rank_above(open, "a2").await.unwrap(), None);
        assert_eq!(lane.max_rank(TaskStatus::Review).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lock_lanes_requires_project() {
        let store = MemoryStore::new();
        assert!(store.lock_lanes(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lane_lock_is_exclusive() {
        let store = Arc::new(MemoryStore::new());
        let user = seed_user(&store, "ada@example.com").await;
        let project = seed_project(&store, user.id).await;

        let held = store.lock_lanes(project.id).await.unwrap().unwrap();

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.lock_lanes(project.id).await.unwrap().is_some() })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        held.commit().await.unwrap();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_close_keeps_memory_store_usable() {
        let store = MemoryStore::new();
        store.close().await;
        assert!(store.ping().await.is_ok());
        assert_eq!(store.backend(), "memory");
    }

    #[tokio::test]
    async fn test_redeem_verification_enables_user_once() {
        let store = MemoryStore::new();
        let user = store
            .insert_user(CreateUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                password_hash: "hash".to_string(),
                enabled: false,
            })
            .await
            .unwrap();
        store
            .replace_verification_token(user.id, "digest", Utc::now())
            .await
            .unwrap();

        assert!(store.redeem_verification_token("digest").await.unwrap());
        assert!(store.find_user(user.id).await.unwrap().unwrap().enabled);
        assert!(!store.redeem_verification_token("digest").await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_token_is_replaced_per_user() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "ada@example.com").await;

        store.replace_refresh_token(user.id, "first", Utc::now()).await.unwrap();
        store.replace_refresh_token(user.id, "second", Utc::now()).await.unwrap();

        assert!(store.find_refresh_token("first").await.unwrap().is_none());
        assert!(store.find_refresh_token("second").await.unwrap().is_some());
        assert_eq!(store.delete_refresh_tokens_for_user(user.id).await.unwrap(), 1);
    }
}
