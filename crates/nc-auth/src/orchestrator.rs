use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::chain::run_downstream;
use crate::client::ProviderClient;
use crate::credentials::ServiceCredential;
use crate::errors::{NcAuthError, Result};
use crate::grant::{authorize_url, AuthorizationGrant, GrantCapturer};
use crate::store::{TokenStore, TokenStoreExt};

/// Drives login and refresh runs and persists their results.
///
/// A run that fails part way never replaces the stored service credential.
/// The Microsoft token pair is saved as soon as it is obtained so a refresh
/// token survives a later hop failing.
pub struct Orchestrator {
    client: ProviderClient,
    store: Arc<dyn TokenStore>,
}

impl Orchestrator {
    pub fn new(client: ProviderClient, store: Arc<dyn TokenStore>) -> Self {
        Self { client, store }
    }

    pub fn client(&self) -> &ProviderClient {
        &self.client
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Full login from a captured authorization grant
    #[instrument(skip(self, grant))]
    pub async fn login(&self, grant: AuthorizationGrant) -> Result<ServiceCredential> {
        info!("Starting login");

        let provider_tokens = self.client.exchange_authorization_grant(grant).await?;
        self.store.save_provider_tokens(&provider_tokens).await?;

        let credential = run_downstream(&self.client, &provider_tokens.access_token).await?;
        self.store.commit_service_credential(&credential).await?;

        info!(
            "Logged in as {} ({})",
            credential.username, credential.account_id
        );
        Ok(credential)
    }

    /// Login with a grant obtained from `capturer`
    pub async fn login_interactive(&self, capturer: &dyn GrantCapturer) -> Result<ServiceCredential> {
        let url = authorize_url(self.client.config());
        let grant = capturer.capture(&url).await?;
        self.login(grant).await
    }

    /// Refresh using the stored Microsoft refresh token, re-running every hop
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<ServiceCredential> {
        info!("Starting refresh");

        let stored = self
            .store
            .load_provider_tokens()
            .await?
            .ok_or(NcAuthError::NotAuthenticated)?;
        let refresh_token = stored
            .refresh_token
            .ok_or(NcAuthError::NotAuthenticated)?;

        let provider_tokens = match self.client.refresh_provider_token(&refresh_token).await {
            Ok(tokens) => tokens.carry_forward(&refresh_token),
            Err(NcAuthError::RefreshTokenInvalid { body }) => {
                warn!("Refresh token rejected, full login required: {}", body);
                return Err(NcAuthError::ReauthenticationRequired);
            }
            Err(e) => return Err(e),
        };
        self.store.save_provider_tokens(&provider_tokens).await?;

        let credential = run_downstream(&self.client, &provider_tokens.access_token).await?;
        self.store.commit_service_credential(&credential).await?;

        info!(
            "Refreshed tokens for {} ({})",
            credential.username, credential.account_id
        );
        Ok(credential)
    }
}
