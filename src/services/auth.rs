//! Account resolution: local credential accounts and federated identities.

use std::sync::Arc;

use crate::error::AppError;
use crate::models::{ProviderCode, User};
use crate::oauth::client::ExternalProfile;
use crate::store::AuthStore;
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn AuthStore>,
}

impl AuthService {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        Self { store }
    }

    /// Create a local-credential account. The `basic` provider row must exist
    /// and be enabled.
    pub async fn signup_basic(
        &self,
        name: String,
        email: String,
        password: &Password,
    ) -> Result<User, AppError> {
        let code = ProviderCode::Basic.as_str();
        let provider = self
            .store
            .find_provider(code)
            .await?
            .ok_or_else(|| AppError::ProviderNotFound(code.to_string()))?;
        if !provider.enabled {
            return Err(AppError::ProviderDisabled(code.to_string()));
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("email is already registered".to_string()));
        }

        let hash = hash_password(password)?;
        let user = User::new_basic(name, email, hash.into_string());
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.user_id, "basic account created");
        Ok(user)
    }

    /// Verify local credentials.
    ///
    /// Unknown email, a federated account with no password, a wrong password
    /// and a banned user all collapse to `InvalidCredentials`; the response
    /// must not reveal which check failed.
    pub async fn verify_basic(&self, email: &str, password: &Password) -> Result<User, AppError> {
        let code = ProviderCode::Basic.as_str();
        let provider = self
            .store
            .find_provider(code)
            .await?
            .ok_or_else(|| AppError::ProviderNotFound(code.to_string()))?;
        if !provider.enabled {
            return Err(AppError::ProviderDisabled(code.to_string()));
        }

        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let hash = user
            .password_hash
            .clone()
            .ok_or(AppError::InvalidCredentials)?;

        verify_password(password, &PasswordHashString::new(hash))
            .map_err(|_| AppError::InvalidCredentials)?;

        if user.banned {
            tracing::warn!(user_id = %user.user_id, "login attempt by banned user");
            return Err(AppError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Find or provision the account behind a federated identity.
    ///
    /// Lookup is by email. A hit under a different provider is merged into
    /// the existing account rather than duplicated; a miss provisions a new
    /// user.
    pub async fn resolve_oauth_user(
        &self,
        provider_code: &str,
        profile: &ExternalProfile,
    ) -> Result<User, AppError> {
        if let Some(user) = self.store.find_user_by_email(&profile.email).await? {
            if user.banned {
                tracing::warn!(user_id = %user.user_id, "federated login by banned user");
                return Err(AppError::Unauthorized);
            }
            if user.provider_code != provider_code {
                tracing::warn!(
                    user_id = %user.user_id,
                    account_provider = %user.provider_code,
                    login_provider = %provider_code,
                    "cross-provider login merged into existing account by email"
                );
            }
            return Ok(user);
        }

        let user = User::new_federated(
            profile.display_name(),
            profile.email.clone(),
            provider_code.to_string(),
            profile.provider_user_id.clone(),
        );
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.user_id, provider = %provider_code, "federated account provisioned");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Provider;
    use crate::store::MemoryStore;

    async fn service_with_basic_enabled() -> AuthService {
        let store = Arc::new(MemoryStore::new());
        let mut basic = Provider::seed(ProviderCode::Basic);
        basic.enabled = true;
        store.upsert_provider(&basic).await.unwrap();
        AuthService::new(store)
    }

    #[tokio::test]
    async fn signup_then_login() {
        let auth = service_with_basic_enabled().await;
        let password = Password::new("hunter2hunter2".to_string());

        let created = auth
            .signup_basic("Ada".to_string(), "ada@example.com".to_string(), &password)
            .await
            .unwrap();

        let verified = auth.verify_basic("ada@example.com", &password).await.unwrap();
        assert_eq!(verified.user_id, created.user_id);
    }

    #[tokio::test]
    async fn signup_rejects_duplicate_email() {
        let auth = service_with_basic_enabled().await;
        let password = Password::new("hunter2hunter2".to_string());

        auth.signup_basic("Ada".to_string(), "ada@example.com".to_string(), &password)
            .await
            .unwrap();

        let err = auth
            .signup_basic("Eve".to_string(), "ada@example.com".to_string(), &password)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn signup_fails_when_basic_disabled() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert_provider(&Provider::seed(ProviderCode::Basic))
            .await
            .unwrap();
        let auth = AuthService::new(store);

        let err = auth
            .signup_basic(
                "Ada".to_string(),
                "ada@example.com".to_string(),
                &Password::new("hunter2hunter2".to_string()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ProviderDisabled(_)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_identical() {
        let auth = service_with_basic_enabled().await;
        auth.signup_basic(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            &Password::new("hunter2hunter2".to_string()),
        )
        .await
        .unwrap();

        let wrong = auth
            .verify_basic("ada@example.com", &Password::new("nope".to_string()))
            .await
            .unwrap_err();
        let unknown = auth
            .verify_basic("ghost@example.com", &Password::new("nope".to_string()))
            .await
            .unwrap_err();

        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn federated_account_cannot_password_login() {
        let store = Arc::new(MemoryStore::new());
        let mut basic = Provider::seed(ProviderCode::Basic);
        basic.enabled = true;
        store.upsert_provider(&basic).await.unwrap();

        let user = User::new_federated(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "github".to_string(),
            "42".to_string(),
        );
        store.insert_user(&user).await.unwrap();

        let auth = AuthService::new(store);
        let err = auth
            .verify_basic("ada@example.com", &Password::new("anything".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn oauth_resolution_provisions_then_reuses() {
        let store = Arc::new(MemoryStore::new());
        let auth = AuthService::new(store);

        let profile = ExternalProfile {
            provider_user_id: "42".to_string(),
            email: "ada@example.com".to_string(),
            nickname: "ada".to_string(),
            ..Default::default()
        };

        let first = auth.resolve_oauth_user("github", &profile).await.unwrap();
        assert_eq!(first.name, "ada");
        assert_eq!(first.provider_code, "github");

        let second = auth.resolve_oauth_user("github", &profile).await.unwrap();
        assert_eq!(second.user_id, first.user_id);
    }

    #[tokio::test]
    async fn cross_provider_email_merges_into_existing_account() {
        let store = Arc::new(MemoryStore::new());
        let auth = AuthService::new(store);

        let profile = ExternalProfile {
            provider_user_id: "42".to_string(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            ..Default::default()
        };

        let github = auth.resolve_oauth_user("github", &profile).await.unwrap();
        let google = auth.resolve_oauth_user("google", &profile).await.unwrap();

        assert_eq!(google.user_id, github.user_id);
        assert_eq!(google.provider_code, "github");
    }

    #[tokio::test]
    async fn banned_user_cannot_resolve_via_oauth() {
        let store = Arc::new(MemoryStore::new());
        let mut user = User::new_federated(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "github".to_string(),
            "42".to_string(),
        );
        user.banned = true;
        store.insert_user(&user).await.unwrap();

        let auth = AuthService::new(store);
        let profile = ExternalProfile {
            provider_user_id: "42".to_string(),
            email: "ada@example.com".to_string(),
            ..Default::default()
        };

        let err = auth.resolve_oauth_user("github", &profile).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }
}
