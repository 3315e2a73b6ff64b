//! Persisted client state holding the access token

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::ClientError;

/// Opaque bearer credential.
///
/// Never validated or parsed by the client. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token string
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Key-value slot holding the current access token.
///
/// Read before every request, written on login and refresh, cleared on
/// logout and failed refresh. Implementations must replace the value
/// atomically so concurrent readers see either the old or the new token.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait CredentialStore: Send + Sync {
    async fn get(&self) -> Result<Option<AccessToken>, ClientError>;
    async fn set(&self, token: AccessToken) -> Result<(), ClientError>;
    async fn clear(&self) -> Result<(), ClientError>;
}

/// In-process credential store shared across clones
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    token: Arc<RwLock<Option<AccessToken>>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `token`
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(AccessToken::new(token)))),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Result<Option<AccessToken>, ClientError> {
        Ok(self.token.read().await.clone())
    }

    async fn set(&self, token: AccessToken) -> Result<(), ClientError> {
        *self.token.write().await = Some(token);
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        *self.token.write().await = None;
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileCredentialStore;

#[cfg(not(target_arch = "wasm32"))]
mod file {
    use super::{AccessToken, ClientError, CredentialStore};
    use async_trait::async_trait;
    use serde::{Deserialize, Serialize};
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};
    use tokio::sync::Mutex;
    use tracing::debug;

    /// File name of the token slot inside a data directory
    pub const TOKEN_FILE: &str = "token.json";

    #[derive(Serialize, Deserialize)]
    struct StoredToken {
        token: AccessToken,
    }

    /// Credential store backed by a JSON file.
    ///
    /// Writes go to a temporary file that is renamed over the target, so a
    /// reader never sees a partially written token.
    #[derive(Debug)]
    pub struct FileCredentialStore {
        path: PathBuf,
        write_lock: Mutex<()>,
    }

    impl FileCredentialStore {
        pub fn new(path: impl Into<PathBuf>) -> Self {
            Self {
                path: path.into(),
                write_lock: Mutex::new(()),
            }
        }

        /// Store at `<dir>/token.json`
        pub fn in_dir(dir: impl AsRef<Path>) -> Self {
            Self::new(dir.as_ref().join(TOKEN_FILE))
        }

        pub fn path(&self) -> &Path {
            &self.path
        }

        pub(super) fn tmp_path(&self) -> PathBuf {
            self.path.with_extension("json.tmp")
        }
    }

    fn store_error(action: &str, path: &Path, err: &std::io::Error) -> ClientError {
        ClientError::Store(format!("failed to {action} {}: {err}", path.display()))
    }

    #[async_trait]
    impl CredentialStore for FileCredentialStore {
        async fn get(&self) -> Result<Option<AccessToken>, ClientError> {
            let content = match tokio::fs::read_to_string(&self.path).await {
                Ok(content) => content,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
                Err(err) => return Err(store_error("read", &self.path, &err)),
            };

            let stored: StoredToken = serde_json::from_str(&content)?;
            if stored.token.expose().is_empty() {
                return Ok(None);
            }
            Ok(Some(stored.token))
        }

        async fn set(&self, token: AccessToken) -> Result<(), ClientError> {
            let _guard = self.write_lock.lock().await;

            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| store_error("create", parent, &e))?;
            }

            let content = serde_json::to_vec(&StoredToken { token })?;
            let tmp = self.tmp_path();
            tokio::fs::write(&tmp, content)
                .await
                .map_err(|e| store_error("write", &tmp, &e))?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
                    .await
                    .map_err(|e| store_error("restrict permissions on", &tmp, &e))?;
            }

            tokio::fs::rename(&tmp, &self.path)
                .await
                .map_err(|e| store_error("replace", &self.path, &e))?;

            debug!(path = %self.path.display(), "Stored access token");
            Ok(())
        }

        async fn clear(&self) -> Result<(), ClientError> {
            let _guard = self.write_lock.lock().await;

            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {
                    debug!(path = %self.path.display(), "Removed access token");
                    Ok(())
                }
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(store_error("remove", &self.path, &err)),
            }
        }
    }
}

#[cfg(all(feature = "web", target_arch = "wasm32"))]
pub use web::LocalStorageCredentialStore;

#[cfg(all(feature = "web", target_arch = "wasm32"))]
mod web {
    use super::{AccessToken, ClientError, CredentialStore};
    use async_trait::async_trait;
    use gloo::storage::{LocalStorage, Storage};

    /// Browser local storage key holding the token
    pub const TOKEN_KEY: &str = "token";

    /// Credential store backed by browser local storage.
    ///
    /// The token is stored as a raw string so pages that read the key
    /// directly keep working.
    #[derive(Debug, Clone)]
    pub struct LocalStorageCredentialStore {
        key: String,
    }

    impl LocalStorageCredentialStore {
        pub fn new() -> Self {
            Self::with_key(TOKEN_KEY)
        }

        pub fn with_key(key: impl Into<String>) -> Self {
            Self { key: key.into() }
        }
    }

    impl Default for LocalStorageCredentialStore {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait(?Send)]
    impl CredentialStore for LocalStorageCredentialStore {
        async fn get(&self) -> Result<Option<AccessToken>, ClientError> {
            let value = LocalStorage::raw()
                .get_item(&self.key)
                .map_err(|e| ClientError::Store(format!("localStorage read failed: {e:?}")))?;
            Ok(value.filter(|v| !v.is_empty()).map(AccessToken::new))
        }

        async fn set(&self, token: AccessToken) -> Result<(), ClientError> {
            LocalStorage::raw()
                .set_item(&self.key, token.expose())
                .map_err(|e| ClientError::Store(format!("localStorage write failed: {e:?}")))
        }

        async fn clear(&self) -> Result<(), ClientError> {
            LocalStorage::delete(&self.key);
            Ok(())
        }
    }
}
