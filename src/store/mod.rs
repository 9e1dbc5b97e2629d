//! Persistence seam.
//!
//! The rest of the crate talks to a durable store only through [`AuthStore`];
//! production uses [`PgStore`], the test suite uses [`MemoryStore`].

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Provider, Session, User};

#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn ping(&self) -> Result<(), AppError>;

    // Users
    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    /// Insert a user. A duplicate email maps to `AppError::Conflict`.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
    /// Delete a user; their sessions go with them.
    async fn delete_user(&self, user_id: Uuid) -> Result<(), AppError>;

    // Sessions
    async fn insert_session(&self, session: &Session) -> Result<(), AppError>;
    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, AppError>;
    async fn delete_session(&self, session_id: &str) -> Result<(), AppError>;

    // Providers
    async fn find_provider(&self, code: &str) -> Result<Option<Provider>, AppError>;
    async fn list_providers(&self) -> Result<Vec<Provider>, AppError>;
    /// Seed helper: a no-op when the row already exists.
    async fn insert_provider_if_absent(&self, provider: &Provider) -> Result<(), AppError>;
    /// Administrative write: create or replace a provider row.
    async fn upsert_provider(&self, provider: &Provider) -> Result<(), AppError>;
}
