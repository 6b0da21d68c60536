use std::fmt;

use tracing::{debug, instrument};
use url::Url;

use crate::config::AuthConfig;
use crate::errors::{NcAuthError, Result};

/// One-time authorization code captured from the OAuth redirect.
///
/// Consumed by [`ProviderClient::exchange_authorization_grant`](crate::ProviderClient::exchange_authorization_grant)
/// and never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationGrant {
    code: String,
}

impl AuthorizationGrant {
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(NcAuthError::MalformedGrant(
                "authorization code is empty".to_string(),
            ));
        }
        Ok(Self { code })
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Debug for AuthorizationGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthorizationGrant([REDACTED])")
    }
}

/// Build the authorization URL for the user to visit
#[instrument(skip(config))]
pub fn authorize_url(config: &AuthConfig) -> Url {
    let mut url = config.endpoints.authorize.clone();
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", config.redirect_uri.as_str())
        .append_pair("scope", &config.scope);

    debug!("Built authorize URL: {}", url);
    url
}

/// Parse the redirected URL pasted back by the user and extract the code
pub fn parse_redirect(redirect_url: &str) -> Result<AuthorizationGrant> {
    let url = Url::parse(redirect_url.trim()).map_err(|e| {
        NcAuthError::MalformedGrant(format!("not a URL ({}), paste the entire address", e))
    })?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" => {
                return Err(NcAuthError::MalformedGrant(format!(
                    "authorization was not granted: {}",
                    value
                )));
            }
            "code" if code.is_none() => code = Some(value.into_owned()),
            _ => {}
        }
    }

    let code = code.ok_or_else(|| {
        NcAuthError::MalformedGrant(
            "no authorization code found, make sure the URL includes the 'code=' parameter"
                .to_string(),
        )
    })?;
    AuthorizationGrant::new(code)
}

/// Source of authorization grants for an interactive login.
///
/// The CLI asks the user to paste the redirected URL; a local redirect
/// listener can implement the same trait.
#[async_trait::async_trait]
pub trait GrantCapturer: Send + Sync {
    async fn capture(&self, authorize_url: &Url) -> Result<AuthorizationGrant>;
}

/// Capturer that hands out an already known grant
#[derive(Debug, Clone)]
pub struct FixedGrant(AuthorizationGrant);

impl FixedGrant {
    pub fn new(grant: AuthorizationGrant) -> Self {
        Self(grant)
    }
}

#[async_trait::async_trait]
impl GrantCapturer for FixedGrant {
    async fn capture(&self, _authorize_url: &Url) -> Result<AuthorizationGrant> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_redirect_extracts_code() {
        let grant = parse_redirect(
            "https://login.live.com/oauth20_desktop.srf?code=M.C105_BAY.2.ABC123&lc=1033",
        )
        .unwrap();
        assert_eq!(grant.code(), "M.C105_BAY.2.ABC123");
    }

    #[test]
    fn test_parse_redirect_trims_whitespace() {
        let grant = parse_redirect("  https://login.live.com/oauth20_desktop.srf?code=ABC123\n").unwrap();
        assert_eq!(grant.code(), "ABC123");
    }

    #[test]
    fn test_parse_redirect_missing_code() {
        let result = parse_redirect("https://login.live.com/oauth20_desktop.srf?lc=1033");
        assert!(matches!(result, Err(NcAuthError::MalformedGrant(_))));
    }

    #[test]
    fn test_parse_redirect_error_param() {
        let result = parse_redirect(
            "https://login.live.com/oauth20_desktop.srf?error=access_denied&error_description=cancelled",
        );
        match result {
            Err(NcAuthError::MalformedGrant(message)) => assert!(message.contains("access_denied")),
            other => panic!("Expected MalformedGrant, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_redirect_rejects_bare_code() {
        assert!(matches!(
            parse_redirect("ABC123"),
            Err(NcAuthError::MalformedGrant(_))
        ));
    }

    #[test]
    fn test_parse_redirect_empty_code() {
        assert!(matches!(
            parse_redirect("https://login.live.com/oauth20_desktop.srf?code="),
            Err(NcAuthError::MalformedGrant(_))
        ));
    }

    #[test]
    fn test_grant_debug_is_redacted() {
        let grant = AuthorizationGrant::new("secret-code").unwrap();
        assert!(!format!("{:?}", grant).contains("secret-code"));
    }

    #[test]
    fn test_authorize_url() {
        let config = AuthConfig::official_in("/tmp/nixcraft-auth").unwrap();
        let url = authorize_url(&config);
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("login.live.com"));
        assert_eq!(params["client_id"], "00000000402b5328");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["redirect_uri"], "https://login.live.com/oauth20_desktop.srf");
        assert_eq!(params["scope"], "XboxLive.signin offline_access");
    }

    #[tokio::test]
    async fn test_fixed_grant_capturer() {
        let grant = AuthorizationGrant::new("ABC123").unwrap();
        let capturer = FixedGrant::new(grant.clone());
        let url = Url::parse("https://example.invalid/authorize").unwrap();

        assert_eq!(capturer.capture(&url).await.unwrap(), grant);
    }
}
