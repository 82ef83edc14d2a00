/// Project-scoped authorization checks
///
/// Membership is the only gate for reading a project and working on its
/// tasks; the admin role is the only gate for destructive and
/// administrative operations.
///
/// # Permission Model
///
/// | Permission | Minimum role | Operations |
/// |------------|--------------|------------|
/// | `Participate` | member | read project, list members, create/update/move tasks |
/// | `Administer` | admin | update/delete project, add/exclude members, change roles, delete tasks |
///
/// Callers check that the target project exists before calling these, so a
/// missing project is reported as not found rather than as access denied.
///
/// # Example
///
/// ```no_run
/// use projectflow_shared::auth::authorization::{require_admin, require_participation};
/// use projectflow_shared::store::memory::MemoryStore;
/// use uuid::Uuid;
///
/// # async fn example(project_id: Uuid, user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
///
/// let membership = require_participation(&store, project_id, user_id).await?;
/// println!("{} is a {}", membership.user_id, membership.role.as_str());
///
/// require_admin(&store, project_id, user_id).await?;
/// # Ok(())
/// # }
/// ```

use uuid::Uuid;

use crate::models::membership::{Membership, ProjectRole};
use crate::store::{MembershipStore, StoreError};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// User is not a member of the project
    #[error("Not a member of project {0}")]
    NotMember(Uuid),

    /// User doesn't have the required role
    #[error("Insufficient permissions: requires {required:?}, has {actual:?}")]
    InsufficientRole {
        required: ProjectRole,
        actual: ProjectRole,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Permission levels for project operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectPermission {
    /// Any member
    Participate,

    /// Admins only
    Administer,
}

impl ProjectPermission {
    /// Gets the minimum role required for this permission
    pub fn min_role(&self) -> ProjectRole {
        match self {
            ProjectPermission::Participate => ProjectRole::Member,
            ProjectPermission::Administer => ProjectRole::Admin,
        }
    }
}

/// Checks that `user_id` holds `permission` in `project_id`
///
/// # Returns
///
/// The caller's membership
///
/// # Errors
///
/// - `AuthzError::NotMember` if no membership exists for the pair
/// - `AuthzError::InsufficientRole` if the role is too low
pub async fn require_permission<S>(
    store: &S,
    project_id: Uuid,
    user_id: Uuid,
    permission: ProjectPermission,
) -> Result<Membership, AuthzError>
where
    S: MembershipStore + ?Sized,
{
    let membership = store
        .find_membership(project_id, user_id)
        .await?
        .ok_or(AuthzError::NotMember(project_id))?;

    let required = permission.min_role();
    if !membership.role.has_permission(&required) {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: membership.role,
        });
    }

    Ok(membership)
}

/// Fails unless a membership row exists for (project, user)
pub async fn require_participation<S>(
    store: &S,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Membership, AuthzError>
where
    S: MembershipStore + ?Sized,
{
    require_permission(store, project_id, user_id, ProjectPermission::Participate).await
}

/// Fails unless the user is an admin of the project
pub async fn require_admin<S>(
    store: &S,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Membership, AuthzError>
where
    S: MembershipStore + ?Sized,
{
    require_permission(store, project_id, user_id, ProjectPermission::Administer).await
}
