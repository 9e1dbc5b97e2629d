//! Session model.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A live authenticated session. The session id doubles as the bearer token;
/// deleting the row revokes it.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub session_id: String,
    pub user_id: Uuid,
    pub remote_ip: String,
    pub user_agent: String,
    pub created_utc: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: String, user_id: Uuid, remote_ip: String, user_agent: String) -> Self {
        Self {
            session_id,
            user_id,
            remote_ip,
            user_agent,
            created_utc: Utc::now(),
        }
    }
}
