use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::{AuthConfig, IDENTITY_SCHEME, RP_MINECRAFT, RP_XBOX_AUTH, XBL_SITE_NAME};
use crate::credentials::{DelegateToken, ProviderTokenPair, SecurityToken, ServiceToken};
use crate::errors::{Hop, NcAuthError, Result};
use crate::grant::AuthorizationGrant;
use crate::models::*;

/// HTTP client for the five upstream hops.
///
/// Every operation is a single request with no retry. Tokens, grants and
/// response bodies containing them are never logged.
#[derive(Debug, Clone)]
pub struct ProviderClient {
    config: AuthConfig,
    http: Client,
}

impl ProviderClient {
    /// Create a new provider client
    pub fn new(config: AuthConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.http_timeouts.connect)
            .timeout(config.http_timeouts.request)
            .user_agent(config.user_agent.as_deref().unwrap_or("nixcraft-auth"))
            .build()?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Exchange an authorization grant for Microsoft tokens
    #[instrument(skip(self, grant))]
    pub async fn exchange_authorization_grant(
        &self,
        grant: AuthorizationGrant,
    ) -> Result<ProviderTokenPair> {
        let form = MsTokenForm {
            client_id: &self.config.client_id,
            code: Some(grant.code()),
            refresh_token: None,
            grant_type: "authorization_code",
            redirect_uri: Some(self.config.redirect_uri.as_str()),
        };

        debug!("Exchanging authorization code for tokens");
        let response = self
            .http
            .post(self.config.endpoints.token.clone())
            .form(&form)
            .send()
            .await?;

        let response = ensure_success(Hop::MicrosoftToken, response).await?;
        let token_response: MsTokenResponse = read_json(Hop::MicrosoftToken, response).await?;
        Ok(provider_pair(token_response))
    }

    /// Refresh Microsoft tokens using a stored refresh token
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_provider_token(&self, refresh_token: &str) -> Result<ProviderTokenPair> {
        let form = MsTokenForm {
            client_id: &self.config.client_id,
            code: None,
            refresh_token: Some(refresh_token),
            grant_type: "refresh_token",
            redirect_uri: Some(self.config.redirect_uri.as_str()),
        };

        debug!("Refreshing Microsoft access token");
        let response = self
            .http
            .post(self.config.endpoints.token.clone())
            .form(&form)
            .send()
            .await?;

        let response = match ensure_success(Hop::MicrosoftToken, response).await {
            Ok(response) => response,
            Err(NcAuthError::UpstreamRejected { body, .. }) if is_invalid_grant(&body) => {
                warn!("Microsoft rejected the stored refresh token");
                return Err(NcAuthError::RefreshTokenInvalid { body });
            }
            Err(e) => return Err(e),
        };

        let token_response: MsTokenResponse = read_json(Hop::MicrosoftToken, response).await?;
        Ok(provider_pair(token_response))
    }

    /// Authenticate with Xbox Live using the Microsoft access token
    #[instrument(skip(self, provider_access_token))]
    pub async fn authenticate_delegate(&self, provider_access_token: &str) -> Result<DelegateToken> {
        let request = XblAuthRequest {
            properties: XblAuthProperties {
                auth_method: "RPS".to_string(),
                site_name: XBL_SITE_NAME.to_string(),
                rps_ticket: format!("d={}", provider_access_token),
            },
            relying_party: RP_XBOX_AUTH.to_string(),
            token_type: "JWT".to_string(),
        };

        debug!("Authenticating with Xbox Live");
        let response = self
            .http
            .post(self.config.endpoints.xbl_authenticate.clone())
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let response = ensure_success(Hop::XboxLive, response).await?;
        let xbl_response: XboxTokenResponse = read_json(Hop::XboxLive, response).await?;
        let user_hash = xbl_response
            .user_hash()
            .ok_or_else(|| NcAuthError::InvalidResponse("Missing XUI claims".to_string()))?
            .to_string();

        Ok(DelegateToken {
            token: xbl_response.token,
            user_hash,
        })
    }

    /// Authorize the Xbox Live token for the Minecraft relying party.
    ///
    /// Ineligible accounts (no Xbox profile, region, age) are rejected here;
    /// the raw body is kept on the error, see [`NcAuthError::xsts_reason`].
    #[instrument(skip(self, delegate))]
    pub async fn authorize_security_token(&self, delegate: &DelegateToken) -> Result<SecurityToken> {
        let request = XstsAuthRequest {
            properties: XstsAuthProperties {
                sandbox_id: "RETAIL".to_string(),
                user_tokens: vec![delegate.token.clone()],
            },
            relying_party: RP_MINECRAFT.to_string(),
            token_type: "JWT".to_string(),
        };

        debug!("Authorizing with XSTS");
        let response = self
            .http
            .post(self.config.endpoints.xsts_authorize.clone())
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let response = ensure_success(Hop::Xsts, response).await?;
        let xsts_response: XboxTokenResponse = read_json(Hop::Xsts, response).await?;

        Ok(SecurityToken {
            token: xsts_response.token,
        })
    }

    /// Login to Minecraft services with the XSTS token
    #[instrument(skip(self, security, user_hash))]
    pub async fn authenticate_service(
        &self,
        security: &SecurityToken,
        user_hash: &str,
    ) -> Result<ServiceToken> {
        let identity_token = format!("{} x={};{}", IDENTITY_SCHEME, user_hash, security.token);
        let request = McLoginRequest { identity_token };

        debug!("Logging in to Minecraft Services");
        let response = self
            .http
            .post(self.config.endpoints.mc_login.clone())
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let response = ensure_success(Hop::MinecraftLogin, response).await?;
        let mc_response: McLoginResponse = read_json(Hop::MinecraftLogin, response).await?;
        if mc_response.expires_in.is_none() {
            warn!("login_with_xbox response has no expires_in, assuming 24 hours");
        }

        Ok(ServiceToken {
            access_token: mc_response.access_token,
            expires_in: mc_response.expires_in,
        })
    }

    /// Fetch the Minecraft profile owned by the access token
    #[instrument(skip(self, service_access_token))]
    pub async fn fetch_profile(&self, service_access_token: &str) -> Result<McProfile> {
        debug!("Fetching Minecraft profile");
        let response = self
            .http
            .get(self.config.endpoints.mc_profile.clone())
            .bearer_auth(service_access_token)
            .send()
            .await?;

        let response = ensure_success(Hop::MinecraftProfile, response).await?;
        read_json(Hop::MinecraftProfile, response).await
    }
}

fn provider_pair(response: MsTokenResponse) -> ProviderTokenPair {
    if response.expires_in.is_none() {
        warn!("Token response has no expires_in, assuming one hour");
    }
    ProviderTokenPair::new(
        response.access_token,
        response.refresh_token,
        response.expires_in,
    )
}

fn is_invalid_grant(body: &str) -> bool {
    serde_json::from_str::<MsOAuthError>(body)
        .map(|e| e.error == "invalid_grant")
        .unwrap_or(false)
}

/// Map a non-2xx response to `UpstreamRejected`, keeping the full body
async fn ensure_success(hop: Hop, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    debug!("{} failed with HTTP {}", hop, status);
    Err(NcAuthError::UpstreamRejected { hop, status, body })
}

async fn read_json<T: DeserializeOwned>(hop: Hop, response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| NcAuthError::InvalidResponse(format!("Unexpected {} response: {}", hop, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_grant_detection() {
        assert!(is_invalid_grant(
            r#"{"error":"invalid_grant","error_description":"The refresh token has expired."}"#
        ));
        assert!(!is_invalid_grant(r#"{"error":"invalid_request"}"#));
        assert!(!is_invalid_grant("invalid_grant"));
    }
}
