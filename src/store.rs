use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Persistent store for the single bearer token, the localStorage analog
/// of the browser client.
///
/// The token lives in one file and in a shared in-memory cell, so the
/// API client (which clears it on 401) and the session controller (which
/// clears it on logout) observe the same value. No expiry is tracked;
/// validity is decided by the server alone.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
    cached: Arc<Mutex<Option<String>>>,
}

impl TokenStore {
    /// Open the store at `path`, reading any previously persisted token.
    pub fn open(path: PathBuf) -> Self {
        let cached = match std::fs::read_to_string(&path) {
            Ok(raw) => {
                let token = raw.trim().to_string();
                if token.is_empty() { None } else { Some(token) }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("Failed to read token file {}: {}", path.display(), e);
                None
            }
        };
        Self {
            path,
            cached: Arc::new(Mutex::new(cached)),
        }
    }

    /// Current token, if any.
    pub fn get(&self) -> Option<String> {
        self.cached.lock().unwrap().clone()
    }

    /// Store a token, or remove the stored one when `None` or empty.
    pub fn set(&self, token: Option<&str>) -> io::Result<()> {
        let token = token.map(str::trim).filter(|t| !t.is_empty());
        match token {
            Some(token) => {
                if let Some(parent) = self.path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&self.path, token)?;
                *self.cached.lock().unwrap() = Some(token.to_string());
            }
            None => {
                match std::fs::remove_file(&self.path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
                *self.cached.lock().unwrap() = None;
            }
        }
        Ok(())
    }

    /// Drop the token from memory and disk, logging rather than failing.
    ///
    /// Used on 401 interception and logout, where the caller has no
    /// sensible way to recover from a failed delete.
    pub fn clear(&self) {
        if let Err(e) = self.set(None) {
            log::error!("Failed to clear token file {}: {}", self.path.display(), e);
        }
    }
}
