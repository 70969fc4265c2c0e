use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use super::credential::Credential;
use super::error::AuthError;
use crate::error::{FileIoError, FileIoErrorKind};

const SESSION_FILE_NAME: &str = "session.toml";
const SESSION_FILE_VERSION: u32 = 1;

/// Durable holder of the current credential.
///
/// `replace` is atomic: once it returns `Ok`, `current` and every subscriber
/// observe the new value, and the value is persisted.
pub trait CredentialStore: Send + Sync {
    /// Latest persisted credential, `None` when signed out.
    fn current(&self) -> Option<Credential>;

    /// Persist a new credential, or clear it with `None`.
    fn replace(&self, credential: Option<Credential>) -> Result<(), AuthError>;

    /// Like [`replace`](Self::replace), but only while the stored credential
    /// still carries `expected_refresh_token`. Returns whether it replaced.
    /// The check and the write form one critical section.
    fn replace_if(
        &self,
        expected_refresh_token: &str,
        credential: Option<Credential>,
    ) -> Result<bool, AuthError>;

    /// Watch handle over the current value.
    fn subscribe(&self) -> watch::Receiver<Option<Credential>>;

    /// Every change, starting with the current value.
    fn stream(&self) -> BoxStream<'static, Option<Credential>> {
        WatchStream::new(self.subscribe()).boxed()
    }
}

/// Configuration for file-backed credential storage.
#[derive(Debug, Clone)]
pub struct CredentialStoreConfig {
    pub base_dir: PathBuf,
}

impl CredentialStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_petsit_dir()
    }
}

/// File-backed credential store using a single TOML file.
///
/// The file is read once on [`open`](Self::open); afterwards the in-memory
/// copy is authoritative and every `replace` rewrites the file atomically.
///
/// # Example
/// ```no_run
/// use petsit::auth::{Credential, CredentialStore, CredentialStoreConfig, FileCredentialStore};
///
/// let store = FileCredentialStore::open(CredentialStoreConfig::new("/tmp/petsit".into()))?;
/// store.replace(Some(Credential::new("access", "refresh")))?;
/// assert!(store.current().is_some());
/// # Ok::<(), petsit::auth::AuthError>(())
/// ```
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    current: watch::Sender<Option<Credential>>,
}

impl FileCredentialStore {
    pub fn open(config: CredentialStoreConfig) -> Result<Self, AuthError> {
        let path = config.base_dir.join(SESSION_FILE_NAME);
        let loaded = read_session_file(&path)?;
        let (current, _) = watch::channel(loaded);
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
            current,
        })
    }

    pub fn open_default() -> Result<Self, AuthError> {
        Self::open(CredentialStoreConfig::new(default_petsit_dir()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Caller holds `write_lock`.
    fn write(&self, credential: Option<Credential>) -> Result<(), AuthError> {
        match &credential {
            Some(value) => {
                let file = SessionFile {
                    version: SESSION_FILE_VERSION,
                    credential: value.clone(),
                    saved_at: Utc::now(),
                };
                let serialized = toml::to_string(&file)?;
                atomic_write(&self.path, serialized.as_bytes())?;
            }
            None => match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(FileIoError::at_path(&err, &self.path).into()),
            },
        }
        tracing::debug!(
            path = %self.path.display(),
            signed_in = credential.is_some(),
            "credential replaced"
        );
        self.current.send_replace(credential);
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn current(&self) -> Option<Credential> {
        self.current.borrow().clone()
    }

    fn replace(&self, credential: Option<Credential>) -> Result<(), AuthError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.write(credential)
    }

    fn replace_if(
        &self,
        expected_refresh_token: &str,
        credential: Option<Credential>,
    ) -> Result<bool, AuthError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !holds_refresh_token(&self.current.borrow(), expected_refresh_token) {
            tracing::debug!(path = %self.path.display(), "credential changed; replace skipped");
            return Ok(false);
        }
        self.write(credential)?;
        Ok(true)
    }

    fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.current.subscribe()
    }
}

/// Non-durable credential store, for tests and ephemeral sessions.
#[derive(Debug)]
pub struct MemoryCredentialStore {
    current: watch::Sender<Option<Credential>>,
}

impl MemoryCredentialStore {
    pub fn new(initial: Option<Credential>) -> Self {
        let (current, _) = watch::channel(initial);
        Self { current }
    }

    pub fn signed_in(credential: Credential) -> Self {
        Self::new(Some(credential))
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn current(&self) -> Option<Credential> {
        self.current.borrow().clone()
    }

    fn replace(&self, credential: Option<Credential>) -> Result<(), AuthError> {
        self.current.send_replace(credential);
        Ok(())
    }

    fn replace_if(
        &self,
        expected_refresh_token: &str,
        credential: Option<Credential>,
    ) -> Result<bool, AuthError> {
        Ok(self.current.send_if_modified(|current| {
            if !holds_refresh_token(current, expected_refresh_token) {
                return false;
            }
            *current = credential;
            true
        }))
    }

    fn subscribe(&self) -> watch::Receiver<Option<Credential>> {
        self.current.subscribe()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionFile {
    version: u32,
    credential: Credential,
    saved_at: DateTime<Utc>,
}

fn holds_refresh_token(current: &Option<Credential>, expected: &str) -> bool {
    current
        .as_ref()
        .is_some_and(|credential| credential.refresh_token() == expected)
}

fn read_session_file(path: &Path) -> Result<Option<Credential>, AuthError> {
    let raw = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(FileIoError::at_path(&err, path).into()),
    };
    let file: SessionFile = toml::from_str(&raw)?;
    if file.version != SESSION_FILE_VERSION {
        return Err(AuthError::Serialization(format!(
            "Unsupported session file version {} at {}",
            file.version,
            path.display()
        )));
    }
    Ok(Some(file.credential))
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), FileIoError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| FileIoError::at_path(&err, parent))?;
        }
    }

    let file_name = path.file_name().ok_or_else(|| {
        FileIoError::new(
            FileIoErrorKind::Unknown,
            format!("Session path {} has no file name", path.display()),
        )
    })?;

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let temp_name = format!(
        ".{}.tmp-{}-{nonce}",
        file_name.to_string_lossy(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(FileIoError::at_path(&err, &temp_path));
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(FileIoError::at_path(&err, path));
    }

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|err| FileIoError::at_path(&err, path))?;

    Ok(())
}

fn default_petsit_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".petsit"))
        .unwrap_or_else(|| PathBuf::from(".petsit"))
}
