//! Federated login: the redirect/callback state machine.

pub mod client;
pub mod registry;
pub mod state;

pub use client::{Endpoints, ExternalProfile, OauthClient};
pub use registry::ProviderRegistry;
pub use state::{StateSigner, TransientAuthState, STATE_COOKIE};

use std::sync::Arc;

use crate::error::AppError;
use crate::services::{AuthService, SessionService};
use crate::store::AuthStore;

/// Result of starting a flow: the signed artifact to set as a cookie and the
/// IdP authorization URL to redirect to.
pub struct StartOutcome {
    pub artifact: String,
    pub redirect_url: String,
}

/// Result of completing a flow: the session token plus the delivery flags
/// captured at flow start.
pub struct CallbackOutcome {
    pub token: String,
    pub mobile: bool,
    pub popup: bool,
}

/// Orchestrates the two halves of a federated login.
#[derive(Clone)]
pub struct OauthFlow {
    registry: Arc<ProviderRegistry>,
    signer: Arc<StateSigner>,
    http: reqwest::Client,
    store: Arc<dyn AuthStore>,
    auth: AuthService,
    sessions: SessionService,
}

impl OauthFlow {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        signer: Arc<StateSigner>,
        http: reqwest::Client,
        store: Arc<dyn AuthStore>,
        auth: AuthService,
        sessions: SessionService,
    ) -> Self {
        Self {
            registry,
            signer,
            http,
            store,
            auth,
            sessions,
        }
    }

    /// Begin a flow for a provider.
    ///
    /// Configuration is re-read from the store so enable and credential
    /// changes take effect without a restart.
    pub async fn start(
        &self,
        provider: &str,
        mobile: bool,
        popup: bool,
    ) -> Result<StartOutcome, AppError> {
        let row = self
            .store
            .find_provider(provider)
            .await?
            .ok_or_else(|| AppError::ProviderNotFound(provider.to_string()))?;
        if !row.enabled {
            return Err(AppError::ProviderDisabled(provider.to_string()));
        }

        self.registry.refresh(self.store.as_ref()).await?;
        let client = self
            .registry
            .get(provider)
            .await
            .ok_or_else(|| AppError::ProviderMisconfigured(provider.to_string()))?;

        let transient = TransientAuthState {
            provider: provider.to_string(),
            mobile,
            popup,
            nonce: StateSigner::new_nonce(),
        };
        let artifact = self.signer.sign(&transient)?;
        let redirect_url = client.authorize_url(&transient.nonce);

        tracing::info!(provider = %provider, mobile, popup, "oauth flow started");
        Ok(StartOutcome {
            artifact,
            redirect_url,
        })
    }

    /// Complete a flow at the callback.
    ///
    /// The artifact is verified before anything else; the path provider and
    /// the IdP-echoed state must both match it. The external exchange runs
    /// strictly before any user or session write, so a failed exchange leaves
    /// no trace.
    pub async fn complete(
        &self,
        path_provider: &str,
        artifact: Option<&str>,
        query_state: &str,
        code: &str,
        remote_ip: String,
        user_agent: String,
    ) -> Result<CallbackOutcome, AppError> {
        let artifact = artifact.ok_or(AppError::InvalidState)?;
        let transient = self.signer.verify(artifact)?;

        if transient.provider != path_provider {
            tracing::warn!(
                path = %path_provider,
                artifact = %transient.provider,
                "callback provider does not match flow artifact"
            );
            return Err(AppError::InvalidState);
        }
        if transient.nonce != query_state {
            tracing::warn!(provider = %path_provider, "state nonce mismatch at callback");
            return Err(AppError::InvalidState);
        }
        if code.is_empty() {
            return Err(AppError::InvalidState);
        }

        let row = self
            .store
            .find_provider(path_provider)
            .await?
            .ok_or_else(|| AppError::ProviderNotFound(path_provider.to_string()))?;
        if !row.enabled {
            return Err(AppError::ProviderDisabled(path_provider.to_string()));
        }

        self.registry.refresh(self.store.as_ref()).await?;
        let client = self
            .registry
            .get(path_provider)
            .await
            .ok_or_else(|| AppError::ProviderMisconfigured(path_provider.to_string()))?;

        let profile = client.fetch_profile(&self.http, code).await?;

        let user = self.auth.resolve_oauth_user(path_provider, &profile).await?;
        let token = self.sessions.create(&user, remote_ip, user_agent).await?;

        tracing::info!(provider = %path_provider, user_id = %user.user_id, "oauth flow completed");
        Ok(CallbackOutcome {
            token,
            mobile: transient.mobile,
            popup: transient.popup,
        })
    }
}
