//! Client-side session context.
//!
//! Keeps the issued token in a `TokenStorage`, decodes it locally and exposes
//! the resulting authentication status. The decoded identity is only a display
//! hint: the signature is not checked here, and every authorization decision
//! is made server-side by the token verifier.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::crypto::token::decode_unverified;
use crate::models::claims::TokenUser;

/// Where the client keeps its session token between runs.
pub trait TokenStorage {
    fn load(&self) -> io::Result<Option<String>>;
    fn store(&self, token: &str) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

/// Keeps the token in a single file.
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenStorage for FileTokenStorage {
    fn load(&self) -> io::Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_private(&self.path, token)
    }

    fn clear(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Writes `contents` so that only the owner can read them back.
#[cfg(unix)]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    use std::fs::{OpenOptions, Permissions};
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation; tighten a file left by an older run.
    file.set_permissions(Permissions::from_mode(0o600))?;
    file.write_all(contents.as_bytes())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    std::fs::write(path, contents)
}

/// Keeps the token in memory for the life of the process.
#[derive(Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn load(&self) -> io::Result<Option<String>> {
        Ok(self.token.lock().map_err(poisoned)?.clone())
    }

    fn store(&self, token: &str) -> io::Result<()> {
        *self.token.lock().map_err(poisoned)? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> io::Result<()> {
        *self.token.lock().map_err(poisoned)? = None;
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> io::Error {
    io::Error::other("token storage lock poisoned")
}

/// The state of a `SessionContext`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// The persisted token has not been checked yet.
    Loading,
    Authenticated(TokenUser),
    Anonymous,
}

/// Client-side authentication state derived from the persisted token.
pub struct SessionContext<S: TokenStorage> {
    storage: S,
    state: SessionState,
    token: Option<String>,
}

impl<S: TokenStorage> SessionContext<S> {
    /// Creates a context in the `Loading` state. Call `restore` next.
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            state: SessionState::Loading,
            token: None,
        }
    }

    /// Rebuilds the state from storage, as done on process start.
    ///
    /// An undecodable or expired token is purged.
    pub fn restore(&mut self) -> &SessionState {
        let persisted = match self.storage.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Could not read persisted session token: {}", e);
                None
            }
        };

        match persisted {
            Some(token) => self.adopt(token),
            None => self.become_anonymous(),
        }
        &self.state
    }

    /// Persists a newly issued token and authenticates with it.
    pub fn login(&mut self, token: &str) -> &SessionState {
        if let Err(e) = self.storage.store(token) {
            tracing::warn!("Could not persist session token: {}", e);
        }
        self.adopt(token.to_string());
        &self.state
    }

    /// Forgets the token and becomes anonymous.
    pub fn logout(&mut self) -> &SessionState {
        if let Err(e) = self.storage.clear() {
            tracing::warn!("Could not clear session token: {}", e);
        }
        self.become_anonymous();
        &self.state
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current_user(&self) -> Option<&TokenUser> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    pub fn is_loading(&self) -> bool {
        self.state == SessionState::Loading
    }

    /// The raw token, for attaching to outgoing requests.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn adopt(&mut self, token: String) {
        match decode_unverified(&token) {
            Ok(claims) => {
                tracing::debug!("Session restored for {}", claims.user.email);
                self.state = SessionState::Authenticated(claims.user);
                self.token = Some(token);
            }
            Err(e) => {
                tracing::warn!("Discarding undecodable session token: {}", e);
                if let Err(e) = self.storage.clear() {
                    tracing::warn!("Could not clear session token: {}", e);
                }
                self.become_anonymous();
            }
        }
    }

    fn become_anonymous(&mut self) {
        self.state = SessionState::Anonymous;
        self.token = None;
    }
}
