use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};

use crate::credentials::ServiceCredential;
use crate::errors::{NcAuthError, Result};
use crate::orchestrator::Orchestrator;
use crate::store::{RecordKind, TokenStore, TokenStoreExt};

/// Whether the stored credential can still be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid { remaining: Duration },
    Expired,
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid { remaining } => write!(
                f,
                "Valid ({}h {}m remaining)",
                remaining.num_hours(),
                remaining.num_minutes() % 60
            ),
            Self::Expired => f.write_str("Expired"),
        }
    }
}

/// Snapshot of the logged-in account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub username: String,
    pub account_id: String,
    pub expires_at: DateTime<Utc>,
    pub validity: Validity,
}

/// Read-side view of the stored credentials, used by the launcher and the
/// skin tooling. Nothing here talks to the network except [`Session::ensure_valid`].
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn TokenStore>,
}

impl Session {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// The stored service credential, if any
    pub async fn current_credential(&self) -> Result<Option<ServiceCredential>> {
        self.store.load_service_credential().await
    }

    pub fn is_valid(credential: &ServiceCredential) -> bool {
        credential.is_valid_at(Utc::now())
    }

    pub async fn status(&self) -> Result<Status> {
        self.status_at(Utc::now()).await
    }

    pub async fn status_at(&self, now: DateTime<Utc>) -> Result<Status> {
        let credential = self
            .current_credential()
            .await?
            .ok_or(NcAuthError::NotAuthenticated)?;

        let validity = match credential.remaining_at(now) {
            Some(remaining) => Validity::Valid { remaining },
            None => Validity::Expired,
        };

        Ok(Status {
            username: credential.username,
            account_id: credential.account_id,
            expires_at: credential.expires_at,
            validity,
        })
    }

    /// The access token of a credential that has not expired yet
    pub async fn bearer_token(&self) -> Result<String> {
        let credential = self
            .current_credential()
            .await?
            .ok_or(NcAuthError::NotAuthenticated)?;

        if !Self::is_valid(&credential) {
            return Err(NcAuthError::CredentialExpired {
                expired_at: credential.expires_at,
            });
        }
        Ok(credential.access_token)
    }

    /// Return the stored credential, refreshing it first if it has expired
    #[instrument(skip(self, orchestrator))]
    pub async fn ensure_valid(&self, orchestrator: &Orchestrator) -> Result<ServiceCredential> {
        match self.current_credential().await? {
            Some(credential) if Self::is_valid(&credential) => Ok(credential),
            Some(credential) => {
                debug!("Credential expired at {}, refreshing", credential.expires_at);
                orchestrator.refresh().await
            }
            None => Err(NcAuthError::NotAuthenticated),
        }
    }

    /// Remove every stored record, returning how many existed
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<usize> {
        let mut removed = 0;
        for kind in RecordKind::ALL {
            removed += self.store.remove(kind).await?;
        }
        info!("Removed {} auth file(s)", removed);
        Ok(removed)
    }

    /// Where other processes can read the raw access token
    pub fn bearer_token_path(&self) -> Option<PathBuf> {
        self.store.location(RecordKind::BearerArtifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::ProviderTokenPair;
    use crate::store::MemoryTokenStore;

    fn credential(expires_at: DateTime<Utc>) -> ServiceCredential {
        ServiceCredential {
            access_token: "MC1".to_string(),
            expires_at,
            username: "Steve".to_string(),
            account_id: "uuid1".to_string(),
            owned_skin_refs: vec![],
        }
    }

    async fn session_with(credential: Option<ServiceCredential>) -> (Session, Arc<MemoryTokenStore>) {
        let store = Arc::new(MemoryTokenStore::new());
        if let Some(credential) = credential {
            store.commit_service_credential(&credential).await.unwrap();
        }
        (Session::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_status_not_authenticated() {
        let (session, _) = session_with(None).await;
        assert!(matches!(session.status().await, Err(NcAuthError::NotAuthenticated)));
        assert!(session.current_credential().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_expired_iff_past_expiry() {
        // Records keep whole seconds
        let expires_at = DateTime::from_timestamp(Utc::now().timestamp() + 7200, 0).unwrap();
        let (session, _) = session_with(Some(credential(expires_at))).await;

        let before = session.status_at(expires_at - Duration::seconds(1)).await.unwrap();
        assert_eq!(before.validity, Validity::Valid { remaining: Duration::seconds(1) });

        let at = session.status_at(expires_at).await.unwrap();
        assert_eq!(at.validity, Validity::Expired);
        assert_eq!(at.username, "Steve");
        assert_eq!(at.account_id, "uuid1");
    }

    #[tokio::test]
    async fn test_remaining_decreases() {
        let expires_at = Utc::now() + Duration::hours(2);
        let (session, _) = session_with(Some(credential(expires_at))).await;
        let now = Utc::now();

        let first = session.status_at(now).await.unwrap();
        let second = session.status_at(now + Duration::minutes(5)).await.unwrap();
        match (first.validity, second.validity) {
            (Validity::Valid { remaining: a }, Validity::Valid { remaining: b }) => assert!(b < a),
            other => panic!("Expected two valid snapshots, got {:?}", other),
        }
    }

    #[test]
    fn test_validity_display() {
        let validity = Validity::Valid {
            remaining: Duration::minutes(23 * 60 + 59),
        };
        assert_eq!(validity.to_string(), "Valid (23h 59m remaining)");
        assert_eq!(Validity::Expired.to_string(), "Expired");
    }

    #[tokio::test]
    async fn test_bearer_token() {
        let (session, _) = session_with(Some(credential(Utc::now() + Duration::hours(1)))).await;
        assert_eq!(session.bearer_token().await.unwrap(), "MC1");

        let (expired, _) = session_with(Some(credential(Utc::now() - Duration::seconds(1)))).await;
        assert!(matches!(
            expired.bearer_token().await,
            Err(NcAuthError::CredentialExpired { .. })
        ));

        let (empty, _) = session_with(None).await;
        assert!(matches!(empty.bearer_token().await, Err(NcAuthError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (session, store) = session_with(Some(credential(Utc::now()))).await;
        store
            .save_provider_tokens(&ProviderTokenPair::new("MA".to_string(), None, None))
            .await
            .unwrap();

        assert_eq!(session.logout().await.unwrap(), 3);
        assert_eq!(session.logout().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_logout_counts_only_present_records() {
        let (session, _) = session_with(Some(credential(Utc::now()))).await;
        assert_eq!(session.logout().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_memory_store_has_no_bearer_path() {
        let (session, _) = session_with(None).await;
        assert!(session.bearer_token_path().is_none());
    }
}
