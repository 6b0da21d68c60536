use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_PROVIDER_TOKEN_LIFETIME, DEFAULT_SERVICE_TOKEN_LIFETIME};
use crate::models::{McProfile, McSkin};

fn expiry(issued_at: DateTime<Utc>, expires_in: Option<u64>, fallback: u64) -> DateTime<Utc> {
    let lifetime = expires_in.unwrap_or(fallback).min(u32::MAX as u64) as i64;
    issued_at
        .checked_add_signed(Duration::seconds(lifetime))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Microsoft OAuth tokens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderTokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl ProviderTokenPair {
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: Option<u64>) -> Self {
        Self::issued_at(access_token, refresh_token, expires_in, Utc::now())
    }

    /// Build a pair issued at `issued_at`; a missing lifetime falls back to one hour
    pub fn issued_at(
        access_token: String,
        refresh_token: Option<String>,
        expires_in: Option<u64>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: expiry(issued_at, expires_in, DEFAULT_PROVIDER_TOKEN_LIFETIME),
        }
    }

    /// Keep the previous refresh token when a refresh response omits a new one
    pub fn carry_forward(mut self, previous_refresh_token: &str) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = Some(previous_refresh_token.to_string());
        }
        self
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Xbox Live user token and the user hash it was issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateToken {
    pub token: String,
    pub user_hash: String,
}

/// XSTS token scoped to the Minecraft relying party
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityToken {
    pub token: String,
}

/// Minecraft access token as returned by login_with_xbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceToken {
    pub access_token: String,
    pub expires_in: Option<u64>,
}

/// Final usable Minecraft credential
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceCredential {
    pub access_token: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
    pub username: String,
    #[serde(rename = "uuid")]
    pub account_id: String,
    #[serde(rename = "skins", default)]
    pub owned_skin_refs: Vec<McSkin>,
}

impl ServiceCredential {
    /// Combine the service token with the profile it belongs to.
    /// A missing lifetime falls back to 24 hours.
    pub fn from_parts(token: ServiceToken, profile: McProfile, issued_at: DateTime<Utc>) -> Self {
        Self {
            expires_at: expiry(issued_at, token.expires_in, DEFAULT_SERVICE_TOKEN_LIFETIME),
            access_token: token.access_token,
            username: profile.name,
            account_id: profile.id,
            owned_skin_refs: profile.skins,
        }
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Time left before expiry, `None` once expired
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.is_valid_at(now).then(|| self.expires_at - now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> McProfile {
        McProfile {
            id: "uuid1".to_string(),
            name: "Steve".to_string(),
            skins: vec![],
        }
    }

    #[test]
    fn test_provider_lifetime_fallback() {
        let now = Utc::now();
        let pair = ProviderTokenPair::issued_at("MA".to_string(), None, None, now);
        assert_eq!(pair.expires_at, now + Duration::seconds(3600));

        let pair = ProviderTokenPair::issued_at("MA".to_string(), None, Some(60), now);
        assert_eq!(pair.expires_at, now + Duration::seconds(60));
    }

    #[test]
    fn test_carry_forward_refresh_token() {
        let fresh = ProviderTokenPair::new("MA2".to_string(), None, Some(3600));
        assert_eq!(fresh.carry_forward("R1").refresh_token.as_deref(), Some("R1"));

        let rotated = ProviderTokenPair::new("MA2".to_string(), Some("R2".to_string()), None);
        assert_eq!(rotated.carry_forward("R1").refresh_token.as_deref(), Some("R2"));
    }

    #[test]
    fn test_service_lifetime_fallback() {
        let now = Utc::now();
        let token = ServiceToken {
            access_token: "MC1".to_string(),
            expires_in: None,
        };
        let credential = ServiceCredential::from_parts(token, profile(), now);

        assert_eq!(credential.expires_at, now + Duration::seconds(86400));
        assert_eq!(credential.username, "Steve");
        assert_eq!(credential.account_id, "uuid1");
    }

    #[test]
    fn test_validity_boundary() {
        let now = Utc::now();
        let token = ServiceToken {
            access_token: "MC1".to_string(),
            expires_in: Some(10),
        };
        let credential = ServiceCredential::from_parts(token, profile(), now);

        assert!(credential.is_valid_at(now));
        assert_eq!(credential.remaining_at(now), Some(Duration::seconds(10)));
        assert!(!credential.is_valid_at(credential.expires_at));
        assert_eq!(credential.remaining_at(credential.expires_at), None);
    }

    #[test]
    fn test_record_format_uses_unix_seconds() {
        let credential = ServiceCredential {
            access_token: "MC1".to_string(),
            expires_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
            username: "Steve".to_string(),
            account_id: "uuid1".to_string(),
            owned_skin_refs: vec![],
        };
        let value = serde_json::to_value(&credential).unwrap();

        assert_eq!(value["expires_at"], 1_700_000_000);
        assert_eq!(value["uuid"], "uuid1");
        assert!(value["skins"].as_array().unwrap().is_empty());
    }
}
