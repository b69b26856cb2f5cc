//! Credential store collaborator: user records with argon2 password hashes,
//! persisted as a single JSON file under the data root. The authorization
//! engine itself never touches this module; only signup and login do.

use std::collections::HashMap as StdHashMap;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::groups;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub groups: Vec<String>,
    pub created_at: i64,
}

/// Sanitized user view returned to clients; the hash never leaves the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub groups: Vec<String>,
}

impl From<&UserRecord> for PublicUser {
    fn from(u: &UserRecord) -> Self {
        Self { id: u.id.clone(), username: u.username.clone(), groups: u.groups.clone() }
    }
}

#[derive(Debug, Error)]
pub enum SignupError {
    #[error("username and password are required")]
    MissingFields,
    #[error("group name '{0}' is reserved")]
    ReservedGroup(String),
    #[error("group name '{0}' is not a valid identifier")]
    InvalidGroup(String),
    #[error("username '{0}' already exists")]
    UsernameTaken(String),
    #[error("credential store write failed: {0}")]
    Io(String),
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

pub struct UserStore {
    path: PathBuf,
    map: RwLock<StdHashMap<String, UserRecord>>,
}

impl UserStore {
    /// Open (or create) the store at `path`, loading any existing records.
    pub fn open(path: PathBuf) -> Result<Self> {
        let mut map = StdHashMap::new();
        if path.exists() {
            let bytes = std::fs::read(&path)
                .with_context(|| format!("reading user store {}", path.display()))?;
            let records: Vec<UserRecord> = serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing user store {}", path.display()))?;
            for rec in records {
                map.insert(rec.username.clone(), rec);
            }
        }
        Ok(Self { path, map: RwLock::new(map) })
    }

    fn save(&self, map: &StdHashMap<String, UserRecord>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).ok();
        }
        let mut records: Vec<&UserRecord> = map.values().collect();
        records.sort_by(|a, b| a.username.cmp(&b.username));
        let bytes = serde_json::to_vec_pretty(&records)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Register a new user. Group names must be identifier-shaped and must
    /// avoid the reserved synthetic names, so every stored membership stays
    /// expressible in group expressions.
    pub fn signup(&self, username: &str, password: &str, group_list: &[String]) -> Result<UserRecord, SignupError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(SignupError::MissingFields);
        }
        for name in group_list {
            if groups::is_reserved(name) {
                return Err(SignupError::ReservedGroup(name.clone()));
            }
            if !groups::is_valid_name(name) {
                return Err(SignupError::InvalidGroup(name.clone()));
            }
        }
        let mut map = self.map.write();
        if map.contains_key(username) {
            return Err(SignupError::UsernameTaken(username.to_string()));
        }
        let rec = UserRecord {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: hash_password(password).map_err(|e| SignupError::Io(e.to_string()))?,
            groups: group_list.to_vec(),
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        map.insert(username.to_string(), rec.clone());
        self.save(&map).map_err(|e| SignupError::Io(e.to_string()))?;
        Ok(rec)
    }

    pub fn find_by_username(&self, username: &str) -> Option<UserRecord> {
        self.map.read().get(username).cloned()
    }
}
