/// Project and membership operations
///
/// Every operation takes the acting user's ID explicitly. Checks run in a
/// fixed order: the target project must exist (`ProjectNotFound`), then the
/// actor must hold the required permission (`AccessDenied`), then the
/// operation's own preconditions are checked.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use projectflow_shared::service::project::{NewProject, ProjectService};
/// use projectflow_shared::store::memory::MemoryStore;
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), projectflow_shared::service::ServiceError> {
/// let projects = ProjectService::new(Arc::new(MemoryStore::new()));
/// let owner = Uuid::new_v4();
///
/// let project = projects.create_project(owner, NewProject {
///     title: "Demo".to_string(),
///     description: String::new(),
///     key: None,
/// }).await?;
///
/// assert_eq!(project.key, "DEMO");
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ServiceError;
use super::pagination::{Page, PageRequest};
use crate::auth::authorization::{require_admin, require_participation};
use crate::models::membership::{CreateMembership, Membership, ProjectMember, ProjectRole};
use crate::models::project::{normalize_key, CreateProject, Project, UpdateProject};
use crate::models::user::normalize_email;
use crate::store::{Store, StoreError};

/// Input of [`ProjectService::create_project`]
#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Derived from the title when absent or blank
    #[serde(default)]
    pub key: Option<String>,
}

/// Input of [`ProjectService::update_project`]
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectChanges {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Current key is kept when absent or blank
    #[serde(default)]
    pub key: Option<String>,
}

/// The caller's standing in a project
#[derive(Debug, Clone, Serialize)]
pub struct RoleInfo {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub role: ProjectRole,
}

/// Project operations
#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn Store>,
}

impl ProjectService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a project with the creator as its admin
    ///
    /// # Errors
    ///
    /// - `ServiceError::Validation` if the title is blank or no key can be
    ///   derived from it
    pub async fn create_project(
        &self,
        user_id: Uuid,
        input: NewProject,
    ) -> Result<Project, ServiceError> {
        let title = required_title(&input.title)?;
        let key = match input.key.as_deref().map(normalize_key) {
            Some(key) if !key.is_empty() => key,
            _ => derive_key(title)?,
        };

        let project = self
            .store
            .create_project(
                CreateProject {
                    title: title.to_string(),
                    description: input.description,
                    key,
                },
                user_id,
            )
            .await?;

        tracing::info!(
            project_id = %project.id,
            user_id = %user_id,
            key = %project.key,
            "Created project"
        );

        Ok(project)
    }

    /// Projects the user is a member of
    pub async fn list_projects(&self, user_id: Uuid) -> Result<Vec<Project>, ServiceError> {
        Ok(self.store.list_projects_for_user(user_id).await?)
    }

    pub async fn get_project(&self, user_id: Uuid, project_id: Uuid) -> Result<Project, ServiceError> {
        let project = self.existing(project_id).await?;
        require_participation(self.store.as_ref(), project_id, user_id).await?;
        Ok(project)
    }

    /// Updates title, description and (optionally) key; admin only
    pub async fn update_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        changes: ProjectChanges,
    ) -> Result<Project, ServiceError> {
        let project = self.existing(project_id).await?;
        require_admin(self.store.as_ref(), project_id, user_id).await?;

        let title = required_title(&changes.title)?;
        let key = match changes.key.as_deref().map(normalize_key) {
            Some(key) if !key.is_empty() => key,
            _ => project.key,
        };

        let updated = self
            .store
            .update_project(
                project_id,
                UpdateProject {
                    title: title.to_string(),
                    description: changes.description,
                    key,
                },
            )
            .await?
            .ok_or(ServiceError::ProjectNotFound(project_id))?;

        tracing::info!(project_id = %project_id, user_id = %user_id, "Updated project");

        Ok(updated)
    }

    /// Deletes a project with its memberships and tasks; admin only
    pub async fn delete_project(&self, user_id: Uuid, project_id: Uuid) -> Result<(), ServiceError> {
        self.existing(project_id).await?;
        require_admin(self.store.as_ref(), project_id, user_id).await?;

        if !self.store.delete_project(project_id).await? {
            return Err(ServiceError::ProjectNotFound(project_id));
        }

        tracing::info!(project_id = %project_id, user_id = %user_id, "Deleted project");

        Ok(())
    }

    pub async fn list_members(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<ProjectMember>, ServiceError> {
        self.existing(project_id).await?;
        require_participation(self.store.as_ref(), project_id, user_id).await?;

        let page = page.clamped();
        let members = self
            .store
            .list_members(project_id, page.limit(), page.offset())
            .await?;
        let total = self.store.count_members(project_id).await?;

        Ok(Page::new(members, page, total))
    }

    /// The caller's own role in the project
    pub async fn get_role(&self, user_id: Uuid, project_id: Uuid) -> Result<RoleInfo, ServiceError> {
        self.existing(project_id).await?;

        let membership = self
            .store
            .find_membership(project_id, user_id)
            .await?
            .ok_or(ServiceError::MembershipNotFound {
                project_id,
                user_id,
            })?;

        Ok(RoleInfo {
            project_id,
            user_id,
            role: membership.role,
        })
    }

    /// Adds the user registered under `email`; admin only
    ///
    /// # Errors
    ///
    /// - `ServiceError::UserNotFound` if no user has that email
    /// - `ServiceError::AlreadyMember` if the user already belongs to the project
    pub async fn add_member(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        email: &str,
        role: ProjectRole,
    ) -> Result<Membership, ServiceError> {
        self.existing(project_id).await?;
        require_admin(self.store.as_ref(), project_id, user_id).await?;

        let email = normalize_email(email);
        let target = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound(email.clone()))?;

        let already_member = || ServiceError::AlreadyMember {
            project_id,
            user_id: target.id,
        };

        if self.store.find_membership(project_id, target.id).await?.is_some() {
            return Err(already_member());
        }

        let membership = self
            .store
            .insert_membership(CreateMembership {
                project_id,
                user_id: target.id,
                role,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => already_member(),
                other => other.into(),
            })?;

        tracing::info!(
            project_id = %project_id,
            user_id = %user_id,
            member_id = %target.id,
            role = role.as_str(),
            "Added project member"
        );

        Ok(membership)
    }

    /// Sets the role of an existing member; admin only
    pub async fn change_role(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        member_id: Uuid,
        role: ProjectRole,
    ) -> Result<Membership, ServiceError> {
        self.existing(project_id).await?;
        require_admin(self.store.as_ref(), project_id, user_id).await?;

        let membership = self
            .store
            .update_membership_role(project_id, member_id, role)
            .await?
            .ok_or(ServiceError::MembershipNotFound {
                project_id,
                user_id: member_id,
            })?;

        tracing::info!(
            project_id = %project_id,
            user_id = %user_id,
            member_id = %member_id,
            role = role.as_str(),
            "Changed member role"
        );

        Ok(membership)
    }

    /// Removes a member from the project; admin only
    pub async fn exclude_member(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        member_id: Uuid,
    ) -> Result<(), ServiceError> {
        self.existing(project_id).await?;
        require_admin(self.store.as_ref(), project_id, user_id).await?;

        if !self.store.delete_membership(project_id, member_id).await? {
            return Err(ServiceError::MembershipNotFound {
                project_id,
                user_id: member_id,
            });
        }

        tracing::info!(
            project_id = %project_id,
            user_id = %user_id,
            member_id = %member_id,
            "Excluded project member"
        );

        Ok(())
    }

    async fn existing(&self, project_id: Uuid) -> Result<Project, ServiceError> {
        self.store
            .find_project(project_id)
            .await?
            .ok_or(ServiceError::ProjectNotFound(project_id))
    }
}

fn required_title(title: &str) -> Result<&str, ServiceError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ServiceError::validation("title", "must not be blank"));
    }
    Ok(title)
}

fn derive_key(title: &str) -> Result<String, ServiceError> {
    let key = normalize_key(title);
    if key.is_empty() {
        return Err(ServiceError::validation(
            "key",
            "cannot be derived from the title",
        ));
    }
    Ok(key)
}
