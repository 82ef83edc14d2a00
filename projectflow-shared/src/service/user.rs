/// User profile lookups

use std::sync::Arc;

use uuid::Uuid;

use super::error::ServiceError;
use crate::models::user::UserProfile;
use crate::store::Store;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Public profile of any user
    pub async fn get_user(&self, user_id: Uuid) -> Result<UserProfile, ServiceError> {
        self.store
            .find_user(user_id)
            .await?
            .map(|user| user.profile())
            .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))
    }
}
