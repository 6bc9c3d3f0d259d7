//! Persistent application state behind an injected key-value interface
//!
//! Every value is a JSON document under a string key. `FileStore` keeps one
//! file per key under the data directory; `MemoryStore` backs tests. The
//! typed `AppStore` wrapper owns the key names and JSON shapes.

use crate::error::{VoxError, VoxResult};
use crate::profile::UserProfile;
use crate::scorer::CategoryScore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

const KEY_USERS: &str = "prep_ai_users";
const KEY_CURRENT_USER: &str = "current_user";
const KEY_HISTORY: &str = "interview_history";
const KEY_COMPLETED_QUIZZES: &str = "completed_quizzes";
const KEY_LAST_ROLE: &str = "last_target_role";
const KEY_LAST_COMPANY: &str = "last_target_company";

/// A persisted interview outcome; immutable once written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewResult {
    pub id: String,
    pub date: String,
    pub role: String,
    pub company: String,
    #[serde(rename = "overallScore")]
    pub overall_score: u32,
    pub categories: Vec<CategoryScore>,
    pub feedback: Vec<String>,
    pub transcription: Vec<String>,
}

/// Minimal key-value persistence interface
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> VoxResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> VoxResult<()>;
    fn remove(&self, key: &str) -> VoxResult<()>;
}

/// One JSON file per key under the data directory
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> VoxResult<Self> {
        std::fs::create_dir_all(&root)
            .map_err(|e| VoxError::Storage(format!("cannot create {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    /// Default store location under the platform data directory
    pub fn open_default() -> VoxResult<Self> {
        let root = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voxprep/store");
        Self::new(root)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> VoxResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> VoxResult<()> {
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> VoxResult<()> {
        let path = self.path_for(key);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// In-memory store for tests
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> VoxResult<Option<String>> {
        Ok(self.values.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> VoxResult<()> {
        self.values.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> VoxResult<()> {
        self.values.lock()?.remove(key);
        Ok(())
    }
}

/// Typed access to everything the application persists
pub struct AppStore {
    kv: Box<dyn KvStore>,
}

impl AppStore {
    pub fn new(kv: Box<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub fn open_default() -> VoxResult<Self> {
        Ok(Self::new(Box::new(FileStore::open_default()?)))
    }

    fn get_json<T: for<'de> Deserialize<'de>>(&self, key: &str) -> VoxResult<Option<T>> {
        match self.kv.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> VoxResult<()> {
        self.kv.set(key, &serde_json::to_string(value)?)
    }

    // Users

    pub fn users(&self) -> VoxResult<Vec<UserProfile>> {
        Ok(self.get_json(KEY_USERS)?.unwrap_or_default())
    }

    /// Insert or replace a user record, matching on email
    pub fn save_user(&self, user: &UserProfile) -> VoxResult<()> {
        let mut users = self.users()?;
        match users.iter_mut().find(|u| u.email == user.email) {
            Some(existing) => *existing = user.clone(),
            None => users.push(user.clone()),
        }
        self.set_json(KEY_USERS, &users)
    }

    /// Create an account and make it the active one. Emails are unique.
    pub fn register(&self, user: &UserProfile) -> VoxResult<()> {
        if self.users()?.iter().any(|u| u.email == user.email) {
            return Err(VoxError::Validation(format!(
                "an account for '{}' already exists",
                user.email
            )));
        }
        self.save_user(user)?;
        self.set_current_user(user)
    }

    /// Check credentials against the stored accounts; a match becomes the
    /// active user. Passwords are plaintext by design.
    pub fn login(&self, email: &str, password: &str) -> VoxResult<Option<UserProfile>> {
        let user = self
            .users()?
            .into_iter()
            .find(|u| u.email == email && u.password == password);
        if let Some(user) = &user {
            self.set_current_user(user)?;
        }
        Ok(user)
    }

    pub fn current_user(&self) -> VoxResult<Option<UserProfile>> {
        self.get_json(KEY_CURRENT_USER)
    }

    pub fn set_current_user(&self, user: &UserProfile) -> VoxResult<()> {
        self.set_json(KEY_CURRENT_USER, user)
    }

    pub fn clear_current_user(&self) -> VoxResult<()> {
        self.kv.remove(KEY_CURRENT_USER)
    }

    // Interview history (newest first)

    pub fn history(&self) -> VoxResult<Vec<InterviewResult>> {
        Ok(self.get_json(KEY_HISTORY)?.unwrap_or_default())
    }

    /// Prepend a result; history is ordered newest first and never mutated
    pub fn push_result(&self, result: InterviewResult) -> VoxResult<()> {
        let mut history = self.history()?;
        history.insert(0, result);
        self.set_json(KEY_HISTORY, &history)
    }

    // Quiz completion

    pub fn completed_topics(&self) -> VoxResult<Vec<String>> {
        Ok(self.get_json(KEY_COMPLETED_QUIZZES)?.unwrap_or_default())
    }

    pub fn is_topic_completed(&self, topic: &str) -> VoxResult<bool> {
        Ok(self
            .completed_topics()?
            .iter()
            .any(|t| t == &topic.to_lowercase()))
    }

    pub fn mark_topic_completed(&self, topic: &str) -> VoxResult<()> {
        let mut topics = self.completed_topics()?;
        let lowered = topic.to_lowercase();
        if !topics.contains(&lowered) {
            topics.push(lowered);
            self.set_json(KEY_COMPLETED_QUIZZES, &topics)?;
        }
        Ok(())
    }

    // Last interview target

    pub fn last_target(&self) -> VoxResult<(Option<String>, Option<String>)> {
        Ok((
            self.get_json(KEY_LAST_ROLE)?,
            self.get_json(KEY_LAST_COMPANY)?,
        ))
    }

    pub fn set_last_target(&self, role: &str, company: &str) -> VoxResult<()> {
        self.set_json(KEY_LAST_ROLE, &role)?;
        self.set_json(KEY_LAST_COMPANY, &company)
    }
}
