use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use tracing::{debug, error};
use url::Url;

use crate::errors::{NcAuthError, Result};

/// Microsoft authentication endpoints
pub mod endpoints {
    pub const MS_AUTHORIZE: &str = "https://login.live.com/oauth20_authorize.srf";
    pub const MS_TOKEN: &str = "https://login.live.com/oauth20_token.srf";
    pub const XBL_AUTHENTICATE: &str = "https://user.auth.xboxlive.com/user/authenticate";
    pub const XSTS_AUTHORIZE: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
    pub const MC_LOGIN: &str = "https://api.minecraftservices.com/authentication/login_with_xbox";
    pub const MC_PROFILE: &str = "https://api.minecraftservices.com/minecraft/profile";
}

/// Official Minecraft launcher OAuth configuration
pub mod official {
    /// Public client ID of the official launcher
    pub const CLIENT_ID: &str = "00000000402b5328";
    pub const REDIRECT_URI: &str = "https://login.live.com/oauth20_desktop.srf";
}

pub const SCOPE: &str = "XboxLive.signin offline_access";

/// Relying parties
pub const RP_XBOX_AUTH: &str = "http://auth.xboxlive.com";
pub const RP_MINECRAFT: &str = "rp://api.minecraftservices.com/";
pub const XBL_SITE_NAME: &str = "user.auth.xboxlive.com";

/// Identity assertion scheme for login_with_xbox
pub const IDENTITY_SCHEME: &str = "XBL3.0";

/// Lifetime assumed when the token endpoint omits `expires_in`
pub const DEFAULT_PROVIDER_TOKEN_LIFETIME: u64 = 3600;

/// Lifetime assumed when login_with_xbox omits `expires_in`
pub const DEFAULT_SERVICE_TOKEN_LIFETIME: u64 = 86400;

/// Endpoint URLs for every hop of the exchange chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub authorize: Url,
    pub token: Url,
    pub xbl_authenticate: Url,
    pub xsts_authorize: Url,
    pub mc_login: Url,
    pub mc_profile: Url,
}

impl Endpoints {
    /// Production endpoints
    pub fn official() -> Result<Self> {
        Ok(Self {
            authorize: Url::parse(endpoints::MS_AUTHORIZE)?,
            token: Url::parse(endpoints::MS_TOKEN)?,
            xbl_authenticate: Url::parse(endpoints::XBL_AUTHENTICATE)?,
            xsts_authorize: Url::parse(endpoints::XSTS_AUTHORIZE)?,
            mc_login: Url::parse(endpoints::MC_LOGIN)?,
            mc_profile: Url::parse(endpoints::MC_PROFILE)?,
        })
    }

    /// Route every hop to one base URL, keeping the production paths.
    ///
    /// Used to point the client at a local mock server.
    pub fn with_base(base: &Url) -> Result<Self> {
        let official = Self::official()?;
        let rebase = |url: &Url| base.join(url.path());

        Ok(Self {
            authorize: rebase(&official.authorize)?,
            token: rebase(&official.token)?,
            xbl_authenticate: rebase(&official.xbl_authenticate)?,
            xsts_authorize: rebase(&official.xsts_authorize)?,
            mc_login: rebase(&official.mc_login)?,
            mc_profile: rebase(&official.mc_profile)?,
        })
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            request: Duration::from_secs(30),
        }
    }
}

/// Configuration for the credential tooling
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth redirect URI
    pub redirect_uri: Url,

    /// OAuth scope requested at authorization time
    pub scope: String,

    pub endpoints: Endpoints,

    /// HTTP client timeouts
    pub http_timeouts: HttpTimeouts,

    /// Custom user agent (optional)
    pub user_agent: Option<String>,

    /// Directory holding the token records and the bearer artifact
    pub data_dir: PathBuf,
}

impl AuthConfig {
    /// Official launcher client with the platform data directory
    pub fn official() -> Result<Self> {
        Self::official_in(Self::default_data_dir()?)
    }

    /// Official launcher client storing records under `data_dir`
    pub fn official_in(data_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            client_id: official::CLIENT_ID.to_string(),
            redirect_uri: Url::parse(official::REDIRECT_URI)?,
            scope: SCOPE.to_string(),
            endpoints: Endpoints::official()?,
            http_timeouts: HttpTimeouts::default(),
            user_agent: Some(concat!("nixcraft-auth/", env!("CARGO_PKG_VERSION")).to_string()),
            data_dir: data_dir.into(),
        })
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Platform data directory, `~/.local/share/nixcraft/auth` on Linux
    pub fn default_data_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("", "", "nixcraft").ok_or_else(|| {
            error!("Failed to determine project directories - this usually indicates an unsupported OS or missing home directory");
            NcAuthError::ProjectDirectoriesUnavailable
        })?;

        let data_dir = proj_dirs.data_dir().join("auth");
        debug!("Auth data directory resolved to: {}", data_dir.display());
        Ok(data_dir)
    }
}
