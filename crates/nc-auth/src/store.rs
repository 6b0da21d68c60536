use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::credentials::{ProviderTokenPair, ServiceCredential};
use crate::errors::{NcAuthError, Result};

/// The records kept by a token store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Microsoft access/refresh tokens
    ProviderToken,
    /// Minecraft access token and profile
    ServiceCredential,
    /// Raw Minecraft access token for other tools
    BearerArtifact,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::ProviderToken,
        RecordKind::ServiceCredential,
        RecordKind::BearerArtifact,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::ProviderToken => "microsoft_token.json",
            Self::ServiceCredential => "minecraft_token.json",
            Self::BearerArtifact => "access_token",
        }
    }
}

/// Trait for storing and retrieving credential records
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Load a record, `None` if it was never written
    async fn load(&self, kind: RecordKind) -> Result<Option<Vec<u8>>>;

    /// Replace a record
    async fn save(&self, kind: RecordKind, contents: &[u8]) -> Result<()>;

    /// Replace several records together; either all become visible or none
    async fn save_batch(&self, records: &[(RecordKind, Vec<u8>)]) -> Result<()>;

    /// Remove a record, returning how many were removed (0 if absent)
    async fn remove(&self, kind: RecordKind) -> Result<usize>;

    /// Where the record lives on disk, if anywhere
    fn location(&self, kind: RecordKind) -> Option<PathBuf>;
}

/// Typed access to the records of a [`TokenStore`]
#[async_trait::async_trait]
pub trait TokenStoreExt: TokenStore {
    async fn load_provider_tokens(&self) -> Result<Option<ProviderTokenPair>> {
        load_json(self, RecordKind::ProviderToken).await
    }

    async fn save_provider_tokens(&self, tokens: &ProviderTokenPair) -> Result<()> {
        let contents = serde_json::to_vec_pretty(tokens)?;
        self.save(RecordKind::ProviderToken, &contents).await
    }

    async fn load_service_credential(&self) -> Result<Option<ServiceCredential>> {
        load_json(self, RecordKind::ServiceCredential).await
    }

    /// Write the credential and its bearer artifact as one batch
    async fn commit_service_credential(&self, credential: &ServiceCredential) -> Result<()> {
        let records = [
            (
                RecordKind::ServiceCredential,
                serde_json::to_vec_pretty(credential)?,
            ),
            (
                RecordKind::BearerArtifact,
                credential.access_token.as_bytes().to_vec(),
            ),
        ];
        self.save_batch(&records).await
    }
}

impl<T: TokenStore + ?Sized> TokenStoreExt for T {}

async fn load_json<S, T>(store: &S, kind: RecordKind) -> Result<Option<T>>
where
    S: TokenStore + ?Sized,
    T: serde::de::DeserializeOwned,
{
    match store.load(kind).await? {
        Some(contents) => Ok(Some(serde_json::from_slice(&contents)?)),
        None => Ok(None),
    }
}

/// In-memory token store for testing and simple use cases
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    records: Arc<RwLock<HashMap<RecordKind, Vec<u8>>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn poisoned() -> NcAuthError {
        NcAuthError::InvalidResponse("Lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self, kind: RecordKind) -> Result<Option<Vec<u8>>> {
        Ok(self
            .records
            .read()
            .map_err(|_| Self::poisoned())?
            .get(&kind)
            .cloned())
    }

    async fn save(&self, kind: RecordKind, contents: &[u8]) -> Result<()> {
        self.records
            .write()
            .map_err(|_| Self::poisoned())?
            .insert(kind, contents.to_vec());
        Ok(())
    }

    async fn save_batch(&self, records: &[(RecordKind, Vec<u8>)]) -> Result<()> {
        let mut guard = self.records.write().map_err(|_| Self::poisoned())?;
        for (kind, contents) in records {
            guard.insert(*kind, contents.clone());
        }
        Ok(())
    }

    async fn remove(&self, kind: RecordKind) -> Result<usize> {
        let removed = self
            .records
            .write()
            .map_err(|_| Self::poisoned())?
            .remove(&kind);
        Ok(usize::from(removed.is_some()))
    }

    fn location(&self, _kind: RecordKind) -> Option<PathBuf> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn credential() -> ServiceCredential {
        ServiceCredential {
            access_token: "MC1".to_string(),
            expires_at: Utc::now(),
            username: "Steve".to_string(),
            account_id: "uuid1".to_string(),
            owned_skin_refs: vec![],
        }
    }

    #[tokio::test]
    async fn test_commit_writes_bearer_artifact() {
        let store = MemoryTokenStore::new();
        store.commit_service_credential(&credential()).await.unwrap();

        let bearer = store.load(RecordKind::BearerArtifact).await.unwrap().unwrap();
        assert_eq!(bearer, b"MC1");

        let loaded = store.load_service_credential().await.unwrap().unwrap();
        assert_eq!(loaded.username, "Steve");
    }

    #[tokio::test]
    async fn test_remove_counts() {
        let store = MemoryTokenStore::new();
        store
            .save_provider_tokens(&ProviderTokenPair::new("MA".to_string(), None, None))
            .await
            .unwrap();

        assert_eq!(store.remove(RecordKind::ProviderToken).await.unwrap(), 1);
        assert_eq!(store.remove(RecordKind::ProviderToken).await.unwrap(), 0);
        assert!(store.load_provider_tokens().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let store = MemoryTokenStore::new();
        store
            .save(RecordKind::ServiceCredential, b"{not json")
            .await
            .unwrap();

        assert!(matches!(
            store.load_service_credential().await,
            Err(NcAuthError::Serde(_))
        ));
    }

    #[test]
    fn test_file_names() {
        assert_eq!(RecordKind::ProviderToken.file_name(), "microsoft_token.json");
        assert_eq!(RecordKind::ServiceCredential.file_name(), "minecraft_token.json");
        assert_eq!(RecordKind::BearerArtifact.file_name(), "access_token");
    }
}
