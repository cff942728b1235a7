use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::tprintln;

use super::principal::Identity;

const TOKEN_KEY: &str = "auth_token";
const USER_KEY: &str = "auth_user";
const EXPIRES_KEY: &str = "auth_expires";

/// Bearer credential paired with its identity. Mutated in place only by the
/// session lifecycle manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub identity: Identity,
    /// Advisory; the refresh timer runs on a fixed interval either way.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// 128-bit random token base64url without padding
pub(crate) fn gen_id() -> String {
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Durable local key-value storage: string-keyed, string-valued, synchronous.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
    fn remove(&self, key: &str);
}

/// One file per key under a root directory; writes go through a temp file and
/// rename so a loader never observes a torn value.
pub struct FileKv {
    root: PathBuf,
}

impl FileKv {
    pub fn new(root: impl AsRef<Path>) -> AppResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .map_err(|e| AppError::storage("kv_root", format!("create {}: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        let path = self.path_for(key);
        let tmp = self.root.join(format!(".{}.{}", key, gen_id()));
        std::fs::write(&tmp, value)
            .and_then(|_| std::fs::rename(&tmp, &path))
            .map_err(|e| AppError::storage("kv_write", format!("write {}: {}", path.display(), e)))
    }

    fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.path_for(key));
    }
}

/// In-memory store for tests and ephemeral demo runs.
#[derive(Default)]
pub struct MemoryKv {
    map: RwLock<HashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self { Self::default() }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        self.map.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.map.write().remove(key);
    }
}

/// Persists the current session under the `auth_token` / `auth_user` keys.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self { Self { kv } }

    /// Corrupt or partial stored state is treated as no session, never an
    /// error to the caller.
    pub fn load(&self) -> Option<Session> {
        let token = self.kv.get(TOKEN_KEY)?;
        let raw = self.kv.get(USER_KEY)?;
        let identity: Identity = match serde_json::from_str(&raw) {
            Ok(id) => id,
            Err(e) => {
                tprintln!("session.load corrupt identity entry dropped: {}", e);
                self.clear();
                return None;
            }
        };
        if token.is_empty() || !identity.is_valid() {
            self.clear();
            return None;
        }
        let expires_at = self
            .kv
            .get(EXPIRES_KEY)
            .and_then(|s| s.parse::<DateTime<Utc>>().ok());
        Some(Session { token, identity, expires_at })
    }

    /// Identity is written before the token so a concurrent `load` never sees
    /// a token without its identity.
    pub fn save(&self, session: &Session) -> AppResult<()> {
        if !session.identity.is_valid() {
            return Err(AppError::session("invalid_identity", "refusing to persist identity with empty subject or role"));
        }
        let raw = serde_json::to_string(&session.identity)?;
        self.kv.set(USER_KEY, &raw)?;
        match session.expires_at {
            Some(ts) => self.kv.set(EXPIRES_KEY, &ts.to_rfc3339())?,
            None => self.kv.remove(EXPIRES_KEY),
        }
        self.kv.set(TOKEN_KEY, &session.token)?;
        tprintln!("session.save subject={} role={}", session.identity.subject_id, session.identity.role);
        Ok(())
    }

    pub fn clear(&self) {
        self.kv.remove(TOKEN_KEY);
        self.kv.remove(USER_KEY);
        self.kv.remove(EXPIRES_KEY);
    }
}
