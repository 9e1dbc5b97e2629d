//! In-memory store used by the test suite and local development.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Provider, Session, User};

use super::AuthStore;

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    sessions: Mutex<HashMap<String, Session>>,
    providers: Mutex<HashMap<String, Provider>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(what: &str) -> AppError {
    AppError::Database(anyhow::anyhow!("memory store mutex poisoned: {}", what))
}

#[async_trait]
impl AuthStore for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        let users = self.users.lock().map_err(|_| poisoned("users"))?;
        Ok(users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let users = self.users.lock().map_err(|_| poisoned("users"))?;
        Ok(users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users.lock().map_err(|_| poisoned("users"))?;
        if users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::Conflict("user already exists".to_string()));
        }
        users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<(), AppError> {
        self.users
            .lock()
            .map_err(|_| poisoned("users"))?
            .remove(&user_id);
        self.sessions
            .lock()
            .map_err(|_| poisoned("sessions"))?
            .retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        self.sessions
            .lock()
            .map_err(|_| poisoned("sessions"))?
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<Session>, AppError> {
        let sessions = self.sessions.lock().map_err(|_| poisoned("sessions"))?;
        Ok(sessions.get(session_id).cloned())
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), AppError> {
        self.sessions
            .lock()
            .map_err(|_| poisoned("sessions"))?
            .remove(session_id);
        Ok(())
    }

    async fn find_provider(&self, code: &str) -> Result<Option<Provider>, AppError> {
        let providers = self.providers.lock().map_err(|_| poisoned("providers"))?;
        Ok(providers.get(code).cloned())
    }

    async fn list_providers(&self) -> Result<Vec<Provider>, AppError> {
        let providers = self.providers.lock().map_err(|_| poisoned("providers"))?;
        let mut rows: Vec<Provider> = providers.values().cloned().collect();
        rows.sort_by(|a, b| a.provider_code.cmp(&b.provider_code));
        Ok(rows)
    }

    async fn insert_provider_if_absent(&self, provider: &Provider) -> Result<(), AppError> {
        let mut providers = self.providers.lock().map_err(|_| poisoned("providers"))?;
        providers
            .entry(provider.provider_code.clone())
            .or_insert_with(|| provider.clone());
        Ok(())
    }

    async fn upsert_provider(&self, provider: &Provider) -> Result<(), AppError> {
        self.providers
            .lock()
            .map_err(|_| poisoned("providers"))?
            .insert(provider.provider_code.clone(), provider.clone());
        Ok(())
    }
}
