use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The upstream request that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    /// Microsoft OAuth token endpoint (code or refresh grant)
    MicrosoftToken,
    /// Xbox Live user.authenticate
    XboxLive,
    /// XSTS authorize
    Xsts,
    /// Minecraft login_with_xbox
    MinecraftLogin,
    /// Minecraft profile
    MinecraftProfile,
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MicrosoftToken => "Microsoft token exchange",
            Self::XboxLive => "Xbox Live authentication",
            Self::Xsts => "XSTS authorization",
            Self::MinecraftLogin => "Minecraft login",
            Self::MinecraftProfile => "Minecraft profile fetch",
        };
        f.write_str(name)
    }
}

/// Credential exchange error types
#[derive(Error, Debug)]
pub enum NcAuthError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{hop} rejected (HTTP {status}): {body}")]
    UpstreamRejected {
        hop: Hop,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Refresh token was rejected by Microsoft: {body}")]
    RefreshTokenInvalid { body: String },

    #[error("Stored refresh token is no longer valid - run 'nixcraft-auth login' again")]
    ReauthenticationRequired,

    #[error("Malformed authorization redirect: {0}")]
    MalformedGrant(String),

    #[error("Not logged in - run 'nixcraft-auth login' first")]
    NotAuthenticated,

    #[error("Access token expired at {expired_at} - run 'nixcraft-auth refresh'")]
    CredentialExpired { expired_at: DateTime<Utc> },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error(
        "Project directories are unavailable - this usually indicates an unsupported OS or missing home directory"
    )]
    ProjectDirectoriesUnavailable,

    #[error("Token store at '{path}' is locked by another process")]
    StoreLocked { path: PathBuf },
}

impl NcAuthError {
    /// Decoded account-ineligibility reason, if this is an XSTS rejection
    /// carrying an `XErr` code. The raw body stays available on the error.
    pub fn xsts_reason(&self) -> Option<XstsError> {
        match self {
            Self::UpstreamRejected {
                hop: Hop::Xsts,
                body,
                ..
            } => XstsError::from_body(body),
            _ => None,
        }
    }

    /// Whether the error can only be resolved by a fresh interactive login
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::ReauthenticationRequired | Self::RefreshTokenInvalid { .. } | Self::NotAuthenticated
        )
    }
}

/// XSTS-specific error codes from XErr field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XstsError {
    #[error("Account doesn't have an Xbox account (XErr: 2148916233)")]
    NoXboxAccount,

    #[error("Xbox Live not available in this country (XErr: 2148916235)")]
    RegionNotSupported,

    #[error("Adult verification required on Xbox page (XErr: 2148916236/2148916237)")]
    AdultVerificationRequired,

    #[error("Child account requires Family (XErr: 2148916238)")]
    ChildAccountRequiresFamily,

    #[error("Unknown XSTS error code: {0}")]
    Unknown(u64),
}

impl XstsError {
    /// Parse XErr code from XSTS response
    pub fn from_xerr(code: u64) -> Self {
        match code {
            2148916233 => Self::NoXboxAccount,
            2148916235 => Self::RegionNotSupported,
            2148916236 | 2148916237 => Self::AdultVerificationRequired,
            2148916238 => Self::ChildAccountRequiresFamily,
            code => Self::Unknown(code),
        }
    }

    fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<crate::models::XstsErrorResponse>(body)
            .ok()
            .map(|e| Self::from_xerr(e.xerr))
    }
}

pub type Result<T> = std::result::Result<T, NcAuthError>;
