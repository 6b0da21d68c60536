use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, error, instrument, warn};

use crate::config::AuthConfig;
use crate::errors::{NcAuthError, Result};
use crate::store::{RecordKind, TokenStore};

/// How long a write waits for another process to release the store lock
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// File-based token store
///
/// Every record is a separate file, written with owner-only permissions.
///
/// # Directory Structure
/// ```text
/// ~/.local/share/nixcraft/auth/
/// ├── .lock                  # Advisory lock held while writing
/// ├── microsoft_token.json   # Microsoft access/refresh tokens
/// ├── minecraft_token.json   # Minecraft access token and profile
/// └── access_token           # Raw Minecraft access token
/// ```
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    storage_dir: PathBuf,
    lock_file: PathBuf,
    lock_timeout: Duration,
}

impl FileTokenStore {
    /// Create a store rooted at `storage_dir`; nothing is touched until the first write
    pub fn new(storage_dir: impl AsRef<Path>) -> Self {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        let lock_file = storage_dir.join(".lock");
        Self {
            storage_dir,
            lock_file,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.data_dir)
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Get the path for a record file
    pub fn record_path(&self, kind: RecordKind) -> PathBuf {
        self.storage_dir.join(kind.file_name())
    }

    fn temp_path(&self, kind: RecordKind) -> PathBuf {
        self.storage_dir
            .join(format!(".{}.tmp-{}", kind.file_name(), std::process::id()))
    }

    async fn ensure_storage_dir(&self) -> Result<()> {
        if fs::metadata(&self.storage_dir).await.is_err() {
            debug!("Creating storage directory: {}", self.storage_dir.display());
            fs::create_dir_all(&self.storage_dir).await?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&self.storage_dir).await?.permissions().mode() & 0o777;
            if mode != 0o700 {
                debug!(
                    "Restricting {} from {:o} to 700",
                    self.storage_dir.display(),
                    mode
                );
                fs::set_permissions(&self.storage_dir, std::fs::Permissions::from_mode(0o700))
                    .await?;
            }
        }
        Ok(())
    }

    /// Acquire an exclusive lock on the storage, released when the file is dropped.
    ///
    /// Waits up to the lock timeout for another writer to finish.
    async fn acquire_lock(&self) -> Result<std::fs::File> {
        let mut options = std::fs::OpenOptions::new();
        options.create(true).truncate(false).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let lock_file = options.open(&self.lock_file)?;

        let deadline = Instant::now() + self.lock_timeout;
        let mut waited = false;
        loop {
            match lock_file.try_lock_exclusive() {
                Ok(()) => return Ok(lock_file),
                Err(e) if is_lock_contended(&e) => {
                    if Instant::now() >= deadline {
                        warn!(
                            "Gave up waiting for {} after {:?}",
                            self.lock_file.display(),
                            self.lock_timeout
                        );
                        return Err(NcAuthError::StoreLocked {
                            path: self.lock_file.clone(),
                        });
                    }
                    if !waited {
                        debug!("Waiting for {}", self.lock_file.display());
                        waited = true;
                    }
                    tokio::time::sleep(LOCK_POLL_INTERVAL).await;
                }
                Err(e) => {
                    error!("Failed to lock {}: {}", self.lock_file.display(), e);
                    return Err(e.into());
                }
            }
        }
    }

    /// Write `contents` to a private temp file next to the record
    async fn stage(&self, kind: RecordKind, contents: &[u8]) -> Result<PathBuf> {
        let temp_path = self.temp_path(kind);
        // A leftover from a crashed run may carry other permissions
        let _ = fs::remove_file(&temp_path).await;

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);

        let write_result = async {
            let mut file = options.open(&temp_path).await?;
            file.write_all(contents).await?;
            file.sync_all().await?;
            Ok::<_, std::io::Error>(())
        }
        .await;

        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp_path).await;
            error!("Failed to stage {}: {}", kind.file_name(), e);
            return Err(e.into());
        }

        Ok(temp_path)
    }

    async fn discard(staged: &[(RecordKind, PathBuf)]) {
        for (_, temp_path) in staged {
            let _ = fs::remove_file(temp_path).await;
        }
    }
}

fn is_lock_contended(e: &std::io::Error) -> bool {
    e.kind() == ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

#[async_trait::async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self, kind: RecordKind) -> Result<Option<Vec<u8>>> {
        let path = self.record_path(kind);
        match fs::read(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                error!("Failed to read {}: {}", path.display(), e);
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self, contents))]
    async fn save(&self, kind: RecordKind, contents: &[u8]) -> Result<()> {
        self.save_batch(&[(kind, contents.to_vec())]).await
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn save_batch(&self, records: &[(RecordKind, Vec<u8>)]) -> Result<()> {
        self.ensure_storage_dir().await?;
        let _lock = self.acquire_lock().await?;

        let mut staged = Vec::with_capacity(records.len());
        for (kind, contents) in records {
            match self.stage(*kind, contents).await {
                Ok(temp_path) => staged.push((*kind, temp_path)),
                Err(e) => {
                    Self::discard(&staged).await;
                    return Err(e);
                }
            }
        }

        for (index, (kind, temp_path)) in staged.iter().enumerate() {
            let path = self.record_path(*kind);
            if let Err(e) = fs::rename(temp_path, &path).await {
                error!("Failed to move {} into place: {}", path.display(), e);
                Self::discard(&staged[index..]).await;
                return Err(e.into());
            }
            debug!("Wrote {}", path.display());
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, kind: RecordKind) -> Result<usize> {
        let path = self.record_path(kind);
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                Ok(1)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => {
                error!("Failed to remove {}: {}", path.display(), e);
                Err(e.into())
            }
        }
    }

    fn location(&self, kind: RecordKind) -> Option<PathBuf> {
        Some(self.record_path(kind))
    }
}
