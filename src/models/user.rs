//! User model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A principal of the system, bound to the identity source that created it.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub provider_code: String,
    pub provider_user_id: Option<String>,
    pub password_hash: Option<String>,
    pub banned: bool,
    pub created_utc: DateTime<Utc>,
}

impl User {
    /// Create a local-credential user.
    pub fn new_basic(name: String, email: String, password_hash: String) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            name,
            email,
            provider_code: "basic".to_string(),
            provider_user_id: None,
            password_hash: Some(password_hash),
            banned: false,
            created_utc: Utc::now(),
        }
    }

    /// Create a user provisioned from a federated identity.
    pub fn new_federated(
        name: String,
        email: String,
        provider_code: String,
        provider_user_id: String,
    ) -> Self {
        Self {
            user_id: Uuid::new_v4(),
            name,
            email,
            provider_code,
            provider_user_id: Some(provider_user_id),
            password_hash: None,
            banned: false,
            created_utc: Utc::now(),
        }
    }

    /// Public view without sensitive fields.
    pub fn sanitized(&self) -> UserProfile {
        UserProfile {
            user_id: self.user_id,
            name: self.name.clone(),
            email: self.email.clone(),
            provider_code: self.provider_code.clone(),
            provider_user_id: self.provider_user_id.clone(),
            created_utc: self.created_utc,
        }
    }
}

/// User response for the API (no password hash, no ban flag).
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub provider_code: String,
    pub provider_user_id: Option<String>,
    pub created_utc: DateTime<Utc>,
}
