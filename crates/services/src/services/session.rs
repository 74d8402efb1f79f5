//! Where the signed-in user's token lives between requests.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use domain::models::user::AuthSession;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session json error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Persistent storage of the authenticated session.
///
/// `load` is called on every request; implementations must be cheap.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Option<AuthSession>;
    fn save(&self, session: &AuthSession) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;

    fn token(&self) -> Option<String> {
        self.load().map(|s| s.token)
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<AuthSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: AuthSession) -> Self {
        Self {
            session: RwLock::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn save(&self, session: &AuthSession) -> Result<(), SessionError> {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// JSON file in the user's config directory, read through on every `load`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/kivora/session.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("kivora").join("session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SessionError {
        SessionError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<AuthSession> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read session file");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring corrupt session file");
                None
            }
        }
    }

    fn save(&self, session: &AuthSession) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let raw = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, raw).map_err(|e| self.io_error(e))?;
        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> AuthSession {
        AuthSession {
            token: "jwt".to_string(),
            user_id: "u1".to_string(),
            username: "ana".to_string(),
            email: Some("ana@kinal.edu.gt".to_string()),
            profile_picture: None,
        }
    }

    #[test]
    fn test_file_store_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));
        assert!(store.load().is_none());

        store.save(&session()).unwrap();
        assert_eq!(store.token().as_deref(), Some("jwt"));

        store.clear().unwrap();
        assert!(store.load().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_reads_as_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        assert!(FileSessionStore::new(path).load().is_none());
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::new();
        assert!(store.token().is_none());
        store.save(&session()).unwrap();
        assert_eq!(store.load().unwrap().user_id, "u1");
    }
}
