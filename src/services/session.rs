//! Session issuance and validation.
//!
//! A session token is an opaque random id stored server-side. Validation hits
//! the store on every request, so revocation and bans take effect
//! immediately.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;

use crate::error::AppError;
use crate::models::{Session, User};
use crate::store::AuthStore;

/// Resolved identity of an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub session_id: String,
}

#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn AuthStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    fn new_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Open a session for a user and return the bearer token.
    pub async fn create(
        &self,
        user: &User,
        remote_ip: String,
        user_agent: String,
    ) -> Result<String, AppError> {
        let session = Session::new(Self::new_token(), user.user_id, remote_ip, user_agent);
        self.store.insert_session(&session).await?;

        tracing::debug!(user_id = %user.user_id, "session opened");
        Ok(session.session_id)
    }

    /// Resolve a bearer token to its user.
    ///
    /// Fail-closed: an unknown token, a dangling session or a banned user all
    /// come back as `Unauthorized`. A dangling or banned session is deleted
    /// on the way out.
    pub async fn resolve(&self, token: &str) -> Result<AuthContext, AppError> {
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }

        let session = self
            .store
            .find_session(token)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let user = match self.store.find_user_by_id(session.user_id).await? {
            Some(user) => user,
            None => {
                self.store.delete_session(&session.session_id).await?;
                return Err(AppError::Unauthorized);
            }
        };

        if user.banned {
            tracing::warn!(user_id = %user.user_id, "revoking session of banned user");
            self.store.delete_session(&session.session_id).await?;
            return Err(AppError::Unauthorized);
        }

        Ok(AuthContext {
            user,
            session_id: session.session_id,
        })
    }

    /// Revoke one session. Revoking an already-gone session is not an error.
    pub async fn invalidate(&self, session_id: &str) -> Result<(), AppError> {
        self.store.delete_session(session_id).await
    }
}
