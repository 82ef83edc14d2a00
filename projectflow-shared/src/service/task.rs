/// Task operations and board positioning
///
/// Tasks live in lanes, one per (project, status). Within a lane they are
/// ordered by their rank key (see [`crate::rank`]). Every rank change holds
/// the project's lane lock from reading the neighbors to writing the task,
/// so concurrent creates and moves never compute the same key.
///
/// # Positioning
///
/// | Placement | New rank |
/// |-----------|----------|
/// | end of lane with max rank `m` | `next(m)` |
/// | start of lane with min rank `m` | `prev(m)` |
/// | between ranks `a < b` | `between(a, b)` |
/// | empty lane | `middle()` |
///
/// New tasks and tasks whose status changes without a position are
/// appended to the end of their lane.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use projectflow_shared::service::project::{NewProject, ProjectService};
/// use projectflow_shared::service::task::{NewTask, TaskService};
/// use projectflow_shared::store::memory::MemoryStore;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), projectflow_shared::service::ServiceError> {
/// let store = Arc::new(MemoryStore::new());
/// let projects = ProjectService::new(store.clone());
/// let tasks = TaskService::new(store);
/// let owner = Uuid::new_v4();
///
/// let project = projects.create_project(owner, NewProject {
///     title: "Demo".to_string(),
///     description: String::new(),
///     key: None,
/// }).await?;
///
/// let task = tasks.create_task(owner, NewTask::titled(project.id, "Fix bug")).await?;
/// assert_eq!(task.key, "DEMO-1");
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ServiceError;
use super::field::FieldUpdate;
use super::pagination::{Page, PageRequest};
use crate::auth::authorization::{require_admin, require_participation};
use crate::models::project::{task_key, Project};
use crate::models::task::{CreateTask, Task, TaskPriority, TaskSort, TaskStatus, TaskType};
use crate::rank;
use crate::store::{LaneLock, Store};

/// Input of [`TaskService::create_task`]
#[derive(Debug, Clone)]
pub struct NewTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: String,
    /// Defaults to `task`
    pub task_type: Option<TaskType>,
    /// Defaults to `medium`
    pub priority: Option<TaskPriority>,
    pub executor_id: Option<Uuid>,
}

impl NewTask {
    /// A task with only a title
    pub fn titled(project_id: Uuid, title: &str) -> Self {
        Self {
            project_id,
            title: title.to_string(),
            description: String::new(),
            task_type: None,
            priority: None,
            executor_id: None,
        }
    }
}

/// Input of [`TaskService::update_task`]; absent fields are left unchanged
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub task_type: Option<TaskType>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub executor_id: FieldUpdate<Uuid>,
}

/// Where to put a task, as sent by the board
///
/// `after_id` names the task that will directly precede the moved task,
/// `before_id` the one that will directly follow it. Without `status` the
/// task stays in its current lane.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskMove {
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub before_id: Option<Uuid>,
    #[serde(default)]
    pub after_id: Option<Uuid>,
}

/// A project's tasks grouped by status, each lane in rank order
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dashboard {
    pub open: Vec<Task>,
    pub in_progress: Vec<Task>,
    pub review: Vec<Task>,
    pub testing: Vec<Task>,
    pub complete: Vec<Task>,
}

impl Dashboard {
    /// Groups tasks already sorted by rank
    pub fn from_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut dashboard = Dashboard::default();
        for task in tasks {
            let lane = match task.status {
                TaskStatus::Open => &mut dashboard.open,
                TaskStatus::InProgress => &mut dashboard.in_progress,
                TaskStatus::Review => &mut dashboard.review,
                TaskStatus::Testing => &mut dashboard.testing,
                TaskStatus::Complete => &mut dashboard.complete,
            };
            lane.push(task);
        }
        dashboard
    }

    pub fn lane(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Open => &self.open,
            TaskStatus::InProgress => &self.in_progress,
            TaskStatus::Review => &self.review,
            TaskStatus::Testing => &self.testing,
            TaskStatus::Complete => &self.complete,
        }
    }
}

/// Task operations
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates an open task at the end of the project's open lane
    ///
    /// The task key is `<project key>-<n>` where `n` counts every task ever
    /// created in the project.
    ///
    /// # Errors
    ///
    /// - `ServiceError::ProjectNotFound` if the project doesn't exist
    /// - `ServiceError::AccessDenied` if the actor isn't a member
    /// - `ServiceError::Validation` for a blank title or a non-member executor
    pub async fn create_task(&self, user_id: Uuid, input: NewTask) -> Result<Task, ServiceError> {
        let project = self.existing_project(input.project_id).await?;
        require_participation(self.store.as_ref(), project.id, user_id).await?;

        let title = required_title(&input.title)?;
        if let Some(executor_id) = input.executor_id {
            self.require_executor(project.id, executor_id).await?;
        }

        let number = self
            .store
            .allocate_task_number(project.id)
            .await?
            .ok_or(ServiceError::ProjectNotFound(project.id))?;

        let mut lane = self.lock_lanes(project.id).await?;
        let rank = append_rank(lane.as_mut(), TaskStatus::Open).await?;
        let task = lane
            .insert_task(CreateTask {
                project_id: project.id,
                key: task_key(&project.key, number),
                title: title.to_string(),
                description: input.description,
                task_type: input.task_type.unwrap_or(TaskType::Task),
                priority: input.priority.unwrap_or(TaskPriority::Medium),
                status: TaskStatus::Open,
                author_id: user_id,
                executor_id: input.executor_id,
                rank,
            })
            .await?;
        lane.commit().await?;

        tracing::info!(
            task_id = %task.id,
            project_id = %project.id,
            user_id = %user_id,
            key = %task.key,
            "Created task"
        );

        Ok(task)
    }

    pub async fn get_task(&self, user_id: Uuid, task_id: Uuid) -> Result<Task, ServiceError> {
        let task = self.existing_task(task_id).await?;
        require_participation(self.store.as_ref(), task.project_id, user_id).await?;
        Ok(task)
    }

    /// One page of a project's tasks
    pub async fn list_tasks(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        page: PageRequest,
        sort: TaskSort,
    ) -> Result<Page<Task>, ServiceError> {
        self.existing_project(project_id).await?;
        require_participation(self.store.as_ref(), project_id, user_id).await?;

        let page = page.clamped();
        let tasks = self
            .store
            .list_tasks(project_id, sort, page.limit(), page.offset())
            .await?;
        let total = self.store.count_tasks(project_id).await?;

        Ok(Page::new(tasks, page, total))
    }

    /// Every task of the project, grouped into status lanes
    pub async fn dashboard(&self, user_id: Uuid, project_id: Uuid) -> Result<Dashboard, ServiceError> {
        self.existing_project(project_id).await?;
        require_participation(self.store.as_ref(), project_id, user_id).await?;

        let tasks = self.store.list_board(project_id).await?;
        Ok(Dashboard::from_tasks(tasks))
    }

    /// Applies field changes to a task
    ///
    /// A status change moves the task to the end of the new lane.
    pub async fn update_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        changes: TaskChanges,
    ) -> Result<Task, ServiceError> {
        let task = self.existing_task(task_id).await?;
        require_participation(self.store.as_ref(), task.project_id, user_id).await?;

        let title = changes
            .title
            .as_deref()
            .map(required_title)
            .transpose()?
            .map(str::to_string);
        if let Some(&executor_id) = changes.executor_id.as_set() {
            self.require_executor(task.project_id, executor_id).await?;
        }

        let mut lane = self.lock_lanes(task.project_id).await?;
        let mut task = lane
            .find_task(task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(task_type) = changes.task_type {
            task.task_type = task_type;
        }
        if let Some(priority) = changes.priority {
            task.priority = priority;
        }
        task.executor_id = changes.executor_id.apply(task.executor_id);

        if let Some(status) = changes.status.filter(|s| *s != task.status) {
            task.rank = append_rank(lane.as_mut(), status).await?;
            task.status = status;
        }

        let saved = lane
            .save_task(&task)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;
        lane.commit().await?;

        tracing::info!(task_id = %task_id, user_id = %user_id, "Updated task");

        Ok(saved)
    }

    /// Repositions a task within its lane or into another lane
    ///
    /// Neighbors that share a rank are pulled apart by re-ranking `before`
    /// just past `after` first.
    ///
    /// # Errors
    ///
    /// - `ServiceError::TaskNotFound` if the task or a named neighbor doesn't exist
    /// - `ServiceError::Validation` if a neighbor is the task itself, belongs
    ///   to another project or lane, or the neighbors are out of order
    pub async fn move_task(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        target: TaskMove,
    ) -> Result<Task, ServiceError> {
        let task = self.existing_task(task_id).await?;
        require_participation(self.store.as_ref(), task.project_id, user_id).await?;

        let mut lane = self.lock_lanes(task.project_id).await?;
        let mut task = lane
            .find_task(task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;

        let status = target.status.unwrap_or(task.status);
        let after = neighbor(lane.as_mut(), &task, status, target.after_id, "after_id").await?;
        let before = neighbor(lane.as_mut(), &task, status, target.before_id, "before_id").await?;

        let rank = match (after, before) {
            (Some(after), Some(mut before)) => {
                if after.rank > before.rank {
                    return Err(ServiceError::validation(
                        "before_id",
                        "must be ranked after the task named by after_id",
                    ));
                }
                if after.rank == before.rank {
                    let successor = lane.rank_above(status, &after.rank).await?;
                    before.rank = rank::key_between(Some(&after.rank), successor.as_deref())?;
                    lane.save_task(&before).await?;

                    tracing::debug!(
                        task_id = %before.id,
                        rank = %before.rank,
                        "Re-ranked tied neighbor"
                    );
                }
                rank::between(&after.rank, &before.rank)?
            }
            (Some(after), None) => {
                let successor = lane.rank_above(status, &after.rank).await?;
                rank::key_between(Some(&after.rank), successor.as_deref())?
            }
            (None, Some(before)) => {
                let predecessor = lane.rank_below(status, &before.rank).await?;
                rank::key_between(predecessor.as_deref(), Some(&before.rank))?
            }
            (None, None) => append_rank(lane.as_mut(), status).await?,
        };

        let from = task.status;
        task.status = status;
        task.rank = rank;

        let saved = lane
            .save_task(&task)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))?;
        lane.commit().await?;

        tracing::info!(
            task_id = %task_id,
            user_id = %user_id,
            from = from.as_str(),
            to = status.as_str(),
            rank = %saved.rank,
            "Moved task"
        );

        Ok(saved)
    }

    /// Deletes a task; admin only
    ///
    /// The task's number is not released.
    pub async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> Result<(), ServiceError> {
        let task = self.existing_task(task_id).await?;
        require_admin(self.store.as_ref(), task.project_id, user_id).await?;

        if !self.store.delete_task(task_id).await? {
            return Err(ServiceError::TaskNotFound(task_id));
        }

        tracing::info!(
            task_id = %task_id,
            project_id = %task.project_id,
            user_id = %user_id,
            "Deleted task"
        );

        Ok(())
    }

    async fn existing_project(&self, project_id: Uuid) -> Result<Project, ServiceError> {
        self.store
            .find_project(project_id)
            .await?
            .ok_or(ServiceError::ProjectNotFound(project_id))
    }

    async fn existing_task(&self, task_id: Uuid) -> Result<Task, ServiceError> {
        self.store
            .find_task(task_id)
            .await?
            .ok_or(ServiceError::TaskNotFound(task_id))
    }

    async fn lock_lanes(&self, project_id: Uuid) -> Result<Box<dyn LaneLock>, ServiceError> {
        self.store
            .lock_lanes(project_id)
            .await?
            .ok_or(ServiceError::ProjectNotFound(project_id))
    }

    async fn require_executor(&self, project_id: Uuid, executor_id: Uuid) -> Result<(), ServiceError> {
        if self
            .store
            .find_membership(project_id, executor_id)
            .await?
            .is_none()
        {
            return Err(ServiceError::validation(
                "executor_id",
                "must be a member of the project",
            ));
        }
        Ok(())
    }
}

/// Rank after the last task of the lane, or the middle of an empty one
async fn append_rank(lane: &mut dyn LaneLock, status: TaskStatus) -> Result<String, ServiceError> {
    let max = lane.max_rank(status).await?;
    Ok(rank::key_between(max.as_deref(), None)?)
}

/// Loads a neighbor named in a move and checks it shares the destination lane
async fn neighbor(
    lane: &mut dyn LaneLock,
    task: &Task,
    status: TaskStatus,
    neighbor_id: Option<Uuid>,
    field: &str,
) -> Result<Option<Task>, ServiceError> {
    let Some(neighbor_id) = neighbor_id else {
        return Ok(None);
    };

    if neighbor_id == task.id {
        return Err(ServiceError::validation(field, "must not be the moved task"));
    }

    let neighbor = lane
        .find_task(neighbor_id)
        .await?
        .ok_or(ServiceError::TaskNotFound(neighbor_id))?;
    if neighbor.project_id != task.project_id {
        return Err(ServiceError::validation(field, "must belong to the same project"));
    }
    if neighbor.status != status {
        return Err(ServiceError::validation(
            field,
            format!("must be in the {} lane", status.as_str()),
        ));
    }

    Ok(Some(neighbor))
}

fn required_title(title: &str) -> Result<&str, ServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation("title", "must not be blank"));
    }
    Ok(title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::membership::{CreateMembership, ProjectRole};
    use crate::models::project::CreateProject;
    use crate::store::memory::MemoryStore;
    use crate::store::{MembershipStore, ProjectStore, TaskStore};
    use std::collections::HashSet;

    struct Fixture {
        store: Arc<MemoryStore>,
        tasks: TaskService,
        owner: Uuid,
        project: Project,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        let project = store
            .create_project(
                CreateProject {
                    title: "Demo".to_string(),
                    description: String::new(),
                    key: "DEMO".to_string(),
                },
                owner,
            )
            .await
            .unwrap();

        Fixture {
            tasks: TaskService::new(store.clone()),
            store,
            owner,
            project,
        }
    }

    impl Fixture {
        async fn task(&self, title: &str) -> Task {
            self.tasks
                .create_task(self.owner, NewTask::titled(self.project.id, title))
                .await
                .unwrap()
        }

        async fn member(&self, role: ProjectRole) -> Uuid {
            let user_id = Uuid::new_v4();
            self.store
                .insert_membership(CreateMembership {
                    project_id: self.project.id,
                    user_id,
                    role,
                })
                .await
                .unwrap();
            user_id
        }

        async fn lane(&self, status: TaskStatus) -> Vec<String> {
            self.tasks
                .dashboard(self.owner, self.project.id)
                .await
                .unwrap()
                .lane(status)
                .iter()
                .map(|t| t.title.clone())
                .collect()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_keys_and_appends() {
        let f = fixture().await;

        let first = f.task("one").await;
        let second = f.task("two").await;

        assert_eq!(first.key, "DEMO-1");
        assert_eq!(first.status, TaskStatus::Open);
        assert_eq!(first.rank, rank::middle());
        assert_eq!(first.author_id, f.owner);
        assert_eq!(first.task_type, TaskType::Task);
        assert_eq!(first.priority, TaskPriority::Medium);
        assert_eq!(second.key, "DEMO-2");
        assert!(second.rank > first.rank);
    }

    #[tokio::test]
    async fn test_numbers_are_not_reused_after_delete() {
        let f = fixture().await;

        let first = f.task("one").await;
        f.tasks.delete_task(f.owner, first.id).await.unwrap();

        assert_eq!(f.task("two").await.key, "DEMO-2");
    }

    #[tokio::test]
    async fn test_executor_must_be_member() {
        let f = fixture().await;

        let mut input = NewTask::titled(f.project.id, "task");
        input.executor_id = Some(Uuid::new_v4());
        assert!(matches!(
            f.tasks.create_task(f.owner, input).await,
            Err(ServiceError::Validation { field, .. }) if field == "executor_id"
        ));

        let member = f.member(ProjectRole::Member).await;
        let mut input = NewTask::titled(f.project.id, "task");
        input.executor_id = Some(member);
        let task = f.tasks.create_task(f.owner, input).await.unwrap();
        assert_eq!(task.executor_id, Some(member));
    }

    #[tokio::test]
    async fn test_update_executor_three_states() {
        let f = fixture().await;
        let member = f.member(ProjectRole::Member).await;
        let task = f.task("task").await;

        let set = f
            .tasks
            .update_task(
                f.owner,
                task.id,
                TaskChanges {
                    executor_id: FieldUpdate::Set(member),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(set.executor_id, Some(member));

        let kept = f
            .tasks
            .update_task(
                f.owner,
                task.id,
                TaskChanges {
                    title: Some("renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(kept.executor_id, Some(member));
        assert_eq!(kept.title, "renamed");
        assert!(kept.updated_at.is_some());

        let cleared = f
            .tasks
            .update_task(
                f.owner,
                task.id,
                TaskChanges {
                    executor_id: FieldUpdate::Clear,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(cleared.executor_id, None);
    }

    #[tokio::test]
    async fn test_status_change_appends_to_destination_lane() {
        let f = fixture().await;
        let a = f.task("a").await;
        let b = f.task("b").await;

        f.tasks
            .update_task(
                f.owner,
                a.id,
                TaskChanges {
                    status: Some(TaskStatus::Review),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let moved = f
            .tasks
            .update_task(
                f.owner,
                b.id,
                TaskChanges {
                    status: Some(TaskStatus::Review),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.status, TaskStatus::Review);
        assert_eq!(f.lane(TaskStatus::Review).await, vec!["a", "b"]);
        assert!(f.lane(TaskStatus::Open).await.is_empty());
    }

    #[tokio::test]
    async fn test_move_before_first() {
        let f = fixture().await;
        let a = f.task("a").await;
        let b = f.task("b").await;

        let moved = f
            .tasks
            .move_task(
                f.owner,
                b.id,
                TaskMove {
                    before_id: Some(a.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(moved.rank < a.rank);
        assert_eq!(f.lane(TaskStatus::Open).await, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_move_between_and_after() {
        let f = fixture().await;
        let a = f.task("a").await;
        let b = f.task("b").await;
        let c = f.task("c").await;

        f.tasks
            .move_task(
                f.owner,
                c.id,
                TaskMove {
                    after_id: Some(a.id),
                    before_id: Some(b.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(f.lane(TaskStatus::Open).await, vec!["a", "c", "b"]);

        f.tasks
            .move_task(
                f.owner,
                a.id,
                TaskMove {
                    after_id: Some(c.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(f.lane(TaskStatus::Open).await, vec!["c", "a", "b"]);

        f.tasks
            .move_task(
                f.owner,
                c.id,
                TaskMove {
                    after_id: Some(b.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(f.lane(TaskStatus::Open).await, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_move_between_tied_neighbors() {
        let f = fixture().await;
        let a = f.task("a").await;
        let mut b = f.task("b").await;
        let c = f.task("c").await;

        b.rank = a.rank.clone();
        let mut lane = f.store.lock_lanes(f.project.id).await.unwrap().unwrap();
        lane.save_task(&b).await.unwrap();
        lane.commit().await.unwrap();

        // Ties are shown in ID order
        let (first, second) = if a.id < b.id { (a, b) } else { (b, a) };

        let moved = f
            .tasks
            .move_task(
                f.owner,
                c.id,
                TaskMove {
                    after_id: Some(first.id),
                    before_id: Some(second.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(moved.rank > first.rank);
        assert_eq!(
            f.lane(TaskStatus::Open).await,
            vec![first.title.clone(), "c".to_string(), second.title.clone()]
        );

        let lane = f.tasks.dashboard(f.owner, f.project.id).await.unwrap().open;
        assert!(lane.windows(2).all(|w| w[0].rank < w[1].rank));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_get_distinct_ranks() {
        let f = fixture().await;

        let handles: Vec<_> = (0..32)
            .map(|n| {
                let tasks = f.tasks.clone();
                let input = NewTask::titled(f.project.id, &format!("task {}", n));
                let owner = f.owner;
                tokio::spawn(async move { tasks.create_task(owner, input).await.unwrap() })
            })
            .collect();

        let mut ranks = HashSet::new();
        for handle in handles {
            assert!(ranks.insert(handle.await.unwrap().rank));
        }
        assert_eq!(ranks.len(), 32);
    }

    #[tokio::test]
    async fn test_move_into_empty_lane_takes_middle() {
        let f = fixture().await;
        let a = f.task("a").await;
        f.task("b").await;

        let moved = f
            .tasks
            .move_task(
                f.owner,
                a.id,
                TaskMove {
                    status: Some(TaskStatus::InProgress),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(moved.status, TaskStatus::InProgress);
        assert_eq!(moved.rank, rank::middle());
    }

    #[tokio::test]
    async fn test_move_rejects_bad_neighbors() {
        let f = fixture().await;
        let a = f.task("a").await;
        let b = f.task("b").await;

        let to_self = TaskMove {
            before_id: Some(a.id),
            ..Default::default()
        };
        assert!(matches!(
            f.tasks.move_task(f.owner, a.id, to_self).await,
            Err(ServiceError::Validation { .. })
        ));

        let other_lane = TaskMove {
            status: Some(TaskStatus::Testing),
            after_id: Some(b.id),
            ..Default::default()
        };
        assert!(matches!(
            f.tasks.move_task(f.owner, a.id, other_lane).await,
            Err(ServiceError::Validation { .. })
        ));

        let reversed = TaskMove {
            after_id: Some(b.id),
            before_id: Some(a.id),
            ..Default::default()
        };
        let c = f.task("c").await;
        assert!(matches!(
            f.tasks.move_task(f.owner, c.id, reversed).await,
            Err(ServiceError::Validation { .. })
        ));

        let missing = TaskMove {
            after_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(matches!(
            f.tasks.move_task(f.owner, a.id, missing).await,
            Err(ServiceError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_member_can_work_but_not_delete() {
        let f = fixture().await;
        let member = f.member(ProjectRole::Member).await;

        let task = f
            .tasks
            .create_task(member, NewTask::titled(f.project.id, "mine"))
            .await
            .unwrap();
        assert_eq!(task.author_id, member);

        assert!(matches!(
            f.tasks.delete_task(member, task.id).await,
            Err(ServiceError::AccessDenied)
        ));
        f.tasks.delete_task(f.owner, task.id).await.unwrap();
        assert!(matches!(
            f.tasks.get_task(f.owner, task.id).await,
            Err(ServiceError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_outsider_is_denied() {
        let f = fixture().await;
        let task = f.task("a").await;
        let outsider = Uuid::new_v4();

        assert!(matches!(
            f.tasks.get_task(outsider, task.id).await,
            Err(ServiceError::AccessDenied)
        ));
        assert!(matches!(
            f.tasks
                .create_task(outsider, NewTask::titled(f.project.id, "x"))
                .await,
            Err(ServiceError::AccessDenied)
        ));
        assert!(matches!(
            f.tasks.dashboard(outsider, f.project.id).await,
            Err(ServiceError::AccessDenied)
        ));
    }

    #[tokio::test]
    async fn test_list_tasks_pages() {
        let f = fixture().await;
        for title in ["a", "b", "c"] {
            f.task(title).await;
        }

        let page = f
            .tasks
            .list_tasks(f.owner, f.project.id, PageRequest::new(2, 2), TaskSort::default())
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 1);
    }

    #[test]
    fn test_dashboard_groups_by_status() {
        let project_id = Uuid::new_v4();
        let task = |status: TaskStatus| Task {
            id: Uuid::new_v4(),
            project_id,
            key: "DEMO-1".to_string(),
            title: status.as_str().to_string(),
            description: String::new(),
            task_type: TaskType::Task,
            priority: TaskPriority::Low,
            status,
            author_id: Uuid::new_v4(),
            executor_id: None,
            rank: rank::middle(),
            created_at: chrono::Utc::now(),
            updated_at: None,
        };

        let dashboard = Dashboard::from_tasks(TaskStatus::ALL.iter().map(|s| task(*s)));

        for status in TaskStatus::ALL {
            let lane = dashboard.lane(status);
            assert_eq!(lane.len(), 1);
            assert_eq!(lane[0].status, status);
        }
    }
}
