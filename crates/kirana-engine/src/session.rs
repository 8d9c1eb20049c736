//! Persisted authentication session.
//!
//! Session material (bearer token, cookies, identifiers) lives in a JSON
//! file so a restart does not force a fresh OTP round-trip. Records carry
//! a seven-day expiry; an expired record is treated as absent and removed
//! on load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How long a stored session is trusted before forcing re-authentication.
const SESSION_TTL_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("reading session file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("writing session file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} is not valid JSON: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub auth_token: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub cookies: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    #[must_use]
    pub fn new(
        auth_token: Option<String>,
        session_id: Option<String>,
        user_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            auth_token,
            session_id,
            user_id,
            cookies: HashMap::new(),
            created_at: now,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
        }
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// File-backed store for the single active session.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the stored session, if any. An expired record is deleted and
    /// reported as absent.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] on unreadable or malformed files. A missing
    /// file is `Ok(None)`.
    pub fn load(&self) -> Result<Option<SessionRecord>, SessionError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SessionError::Read {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };
        let record: SessionRecord =
            serde_json::from_str(&raw).map_err(|e| SessionError::Malformed {
                path: self.path.clone(),
                source: e,
            })?;
        if record.is_expired() {
            tracing::info!(path = %self.path.display(), "stored session expired, discarding");
            self.clear()?;
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// # Errors
    ///
    /// Returns [`SessionError::Write`] when the file cannot be written.
    pub fn save(&self, record: &SessionRecord) -> Result<(), SessionError> {
        let body = serde_json::to_string_pretty(record).map_err(|e| SessionError::Malformed {
            path: self.path.clone(),
            source: e,
        })?;
        std::fs::write(&self.path, body).map_err(|e| SessionError::Write {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Remove the stored session. Missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Write`] on filesystem failures other than
    /// the file already being gone.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Write {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("kirana-session-{name}-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn round_trips_a_session_record() {
        let path = temp_path("roundtrip");
        let store = SessionStore::new(&path);
        let mut record = SessionRecord::new(
            Some("tok".to_owned()),
            Some("sess".to_owned()),
            Some("user".to_owned()),
        );
        record
            .cookies
            .insert("__cfduid".to_owned(), "abc".to_owned());
        store.save(&record).expect("save");
        let loaded = store.load().expect("load").expect("present");
        assert_eq!(loaded.auth_token.as_deref(), Some("tok"));
        assert_eq!(loaded.cookies.get("__cfduid").map(String::as_str), Some("abc"));
        store.clear().expect("clear");
        assert!(store.load().expect("load after clear").is_none());
    }

    #[test]
    fn expired_record_loads_as_absent_and_is_removed() {
        let path = temp_path("expired");
        let store = SessionStore::new(&path);
        let mut record = SessionRecord::new(Some("tok".to_owned()), None, None);
        record.expires_at = Utc::now() - Duration::days(1);
        store.save(&record).expect("save");
        assert!(store.load().expect("load").is_none());
        assert!(!path.exists(), "expired file should be deleted");
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let store = SessionStore::new(temp_path("missing"));
        assert!(store.load().expect("load").is_none());
        store.clear().expect("clear is idempotent");
    }

    #[test]
    fn fresh_record_expires_in_seven_days() {
        let record = SessionRecord::new(None, None, None);
        let ttl = record.expires_at - record.created_at;
        assert_eq!(ttl.num_days(), 7);
        assert!(!record.is_expired());
    }
}
