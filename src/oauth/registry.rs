//! Runtime view of enabled identity providers.
//!
//! Provider rows live in the store; the registry materializes the enabled,
//! well-formed ones into ready-to-use [`OauthClient`]s. Refreshes swap the
//! whole snapshot atomically so in-flight requests never see a half-built
//! view.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::{Provider, ProviderCode};
use crate::oauth::client::{Endpoints, OauthClient};
use crate::store::AuthStore;

#[derive(Default)]
struct RegistryInner {
    /// Endpoint overrides, keyed by provider code. Used by tests to point a
    /// provider at a stub server.
    endpoints: HashMap<String, Endpoints>,
    active: Arc<HashMap<String, Arc<OauthClient>>>,
}

pub struct ProviderRegistry {
    inner: RwLock<RegistryInner>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Ensure a row exists for every known provider code. Existing rows are
    /// left untouched; new codes get a disabled placeholder.
    pub async fn seed_defaults(store: &dyn AuthStore) -> Result<(), AppError> {
        for code in ProviderCode::ALL {
            store.insert_provider_if_absent(&Provider::seed(code)).await?;
        }
        Ok(())
    }

    /// Rebuild the active snapshot from the store.
    ///
    /// Enabled federated rows become clients; rows that cannot be
    /// materialized (unknown code, missing credentials, no endpoints) are
    /// logged and skipped rather than failing the refresh.
    pub async fn refresh(&self, store: &dyn AuthStore) -> Result<(), AppError> {
        let rows = store.list_providers().await?;

        let mut inner = self.inner.write().await;
        let mut active = HashMap::new();

        for row in rows {
            if !row.enabled || row.provider_code == ProviderCode::Basic.as_str() {
                continue;
            }

            let endpoints = match inner.endpoints.get(&row.provider_code).cloned() {
                Some(endpoints) => Some(endpoints),
                None => ProviderCode::from_str(&row.provider_code)
                    .ok()
                    .and_then(Endpoints::builtin),
            };

            let Some(endpoints) = endpoints else {
                tracing::warn!(provider = %row.provider_code, "no endpoints for enabled provider, skipping");
                continue;
            };

            match OauthClient::from_provider(&row, endpoints) {
                Ok(client) => {
                    active.insert(row.provider_code.clone(), Arc::new(client));
                }
                Err(e) => {
                    tracing::warn!(provider = %row.provider_code, error = %e, "skipping misconfigured provider");
                }
            }
        }

        tracing::debug!(count = active.len(), "provider registry refreshed");
        inner.active = Arc::new(active);
        Ok(())
    }

    /// Look up the client for an enabled provider.
    pub async fn get(&self, code: &str) -> Option<Arc<OauthClient>> {
        self.inner.read().await.active.get(code).cloned()
    }

    /// Redirect subsequent refreshes of `code` to the given endpoints.
    pub async fn override_endpoints(&self, code: &str, endpoints: Endpoints) {
        let mut inner = self.inner.write().await;
        inner.endpoints.insert(code.to_string(), endpoints);
    }
}
