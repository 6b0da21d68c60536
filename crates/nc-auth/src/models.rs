use serde::{Deserialize, Serialize};

/// Microsoft OAuth token request (form-encoded, code and refresh_token grants)
#[derive(Debug, Clone, Serialize)]
pub struct MsTokenForm<'a> {
    pub client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<&'a str>,
    pub grant_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<&'a str>,
}

/// Microsoft OAuth token response (from both code and refresh_token grants)
#[derive(Debug, Clone, Deserialize)]
pub struct MsTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// OAuth error body returned by the token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct MsOAuthError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Xbox Live user.authenticate request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XblAuthRequest {
    pub properties: XblAuthProperties,
    pub relying_party: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XblAuthProperties {
    pub auth_method: String,
    pub site_name: String,
    pub rps_ticket: String,
}

/// Response shape shared by user.authenticate and xsts/authorize
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XboxTokenResponse {
    pub token: String,
    #[serde(default)]
    pub display_claims: Option<XblDisplayClaims>,
}

impl XboxTokenResponse {
    /// First user hash in the display claims, if any
    pub fn user_hash(&self) -> Option<&str> {
        self.display_claims
            .as_ref()
            .and_then(|claims| claims.xui.first())
            .map(|xui| xui.uhs.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct XblDisplayClaims {
    #[serde(default)]
    pub xui: Vec<XblUserInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XblUserInfo {
    pub uhs: String,
}

/// XSTS authorize request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XstsAuthRequest {
    pub properties: XstsAuthProperties,
    pub relying_party: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XstsAuthProperties {
    pub sandbox_id: String,
    pub user_tokens: Vec<String>,
}

/// XSTS error response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XstsErrorResponse {
    #[serde(rename = "XErr")]
    pub xerr: u64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Minecraft login_with_xbox request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct McLoginRequest {
    pub identity_token: String,
}

/// Minecraft login_with_xbox response
#[derive(Debug, Clone, Deserialize)]
pub struct McLoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Minecraft profile response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct McProfile {
    /// UUID without dashes
    pub id: String,
    /// Player name
    pub name: String,
    #[serde(default)]
    pub skins: Vec<McSkin>,
}

/// A skin owned by the profile, kept verbatim for the skin tooling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct McSkin {
    pub id: String,
    pub state: String,
    pub url: String,
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_form_code_grant() {
        let form = MsTokenForm {
            client_id: "client",
            code: Some("ABC123"),
            refresh_token: None,
            grant_type: "authorization_code",
            redirect_uri: Some("https://login.live.com/oauth20_desktop.srf"),
        };
        let value = serde_json::to_value(&form).unwrap();

        assert_eq!(value["code"], "ABC123");
        assert_eq!(value["grant_type"], "authorization_code");
        assert!(value.get("refresh_token").is_none());
    }

    #[test]
    fn test_xbl_request_shape() {
        let request = XblAuthRequest {
            properties: XblAuthProperties {
                auth_method: "RPS".to_string(),
                site_name: "user.auth.xboxlive.com".to_string(),
                rps_ticket: "d=MA".to_string(),
            },
            relying_party: "http://auth.xboxlive.com".to_string(),
            token_type: "JWT".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["Properties"]["AuthMethod"], "RPS");
        assert_eq!(value["Properties"]["RpsTicket"], "d=MA");
        assert_eq!(value["RelyingParty"], "http://auth.xboxlive.com");
        assert_eq!(value["TokenType"], "JWT");
    }

    #[test]
    fn test_xsts_request_shape() {
        let request = XstsAuthRequest {
            properties: XstsAuthProperties {
                sandbox_id: "RETAIL".to_string(),
                user_tokens: vec!["XBL".to_string()],
            },
            relying_party: "rp://api.minecraftservices.com/".to_string(),
            token_type: "JWT".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["Properties"]["SandboxId"], "RETAIL");
        assert_eq!(value["Properties"]["UserTokens"][0], "XBL");
    }

    #[test]
    fn test_user_hash_from_display_claims() {
        let response: XboxTokenResponse = serde_json::from_str(
            r#"{"Token":"XBL","DisplayClaims":{"xui":[{"uhs":"H1"}]},"NotAfter":"2030-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(response.user_hash(), Some("H1"));

        let bare: XboxTokenResponse = serde_json::from_str(r#"{"Token":"XSTS1"}"#).unwrap();
        assert_eq!(bare.user_hash(), None);
    }

    #[test]
    fn test_profile_without_skins() {
        let profile: McProfile =
            serde_json::from_str(r#"{"id":"uuid1","name":"Steve"}"#).unwrap();
        assert!(profile.skins.is_empty());
    }
}
