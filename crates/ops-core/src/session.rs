//! Session Management
//!
//! Durable per-conversation state keyed by a caller-supplied session id.
//! Sessions are created lazily the first time an id is seen.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Role};

/// Session identifier.
///
/// Opaque to this crate: any string is accepted, no uniqueness or format
/// checks are applied.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Id used when the caller does not supply one
    pub const DEFAULT: &'static str = "default";

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self(Self::DEFAULT.into())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted conversation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Conversation history (user and assistant turns)
    pub conversation: Conversation,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            conversation: Conversation::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Title derived from the first user message
    pub fn title(&self) -> String {
        self.conversation
            .messages()
            .iter()
            .find(|m| m.role == Role::User)
            .map_or_else(
                || format!("Session {}", self.id),
                |m| {
                    let preview: String = m.content.chars().take(50).collect();
                    if m.content.chars().count() > 50 {
                        format!("{preview}...")
                    } else {
                        preview
                    }
                },
            )
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }
}

/// Session store trait for persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Save a session, replacing any previous version
    async fn save(&self, session: &Session) -> Result<()>;

    /// Load a session by ID
    async fn load(&self, id: &SessionId) -> Result<Option<Session>>;

    /// Delete a session
    async fn delete(&self, id: &SessionId) -> Result<()>;

    /// Most recently updated sessions first
    async fn list(&self, limit: usize) -> Result<Vec<Session>>;
}

/// Handle to one session inside a store.
///
/// This is what the agent receives; it never sees the store directly.
#[derive(Clone)]
pub struct SessionHandle {
    id: SessionId,
    store: Arc<dyn SessionStore>,
}

impl SessionHandle {
    pub fn new(id: SessionId, store: Arc<dyn SessionStore>) -> Self {
        Self { id, store }
    }

    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// Load the session, or start an empty one if the id is new
    pub async fn load_or_create(&self) -> Result<Session> {
        Ok(self
            .store
            .load(&self.id)
            .await?
            .unwrap_or_else(|| Session::new(self.id.clone())))
    }

    pub async fn save(&self, session: &Session) -> Result<()> {
        self.store.save(session).await
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle").field("id", &self.id).finish_non_exhaustive()
    }
}

/// In-memory session store (for development/testing)
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &Session) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().await;
        let mut result: Vec<_> = sessions.values().cloned().collect();
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);
        Ok(result)
    }
}

/// One JSON file per session under a storage directory
pub struct FileSessionStore {
    storage_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Create the storage directory if it does not exist
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.storage_dir).await?;
        Ok(())
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.storage_dir
            .join(format!("session_{}.json", file_stem(id.as_str())))
    }
}

/// Longest readable stem kept before falling back to a digest
const MAX_READABLE_STEM: usize = 200;

/// Readable stem for short ids, `%sha256-<hex>` for ones that would not fit
/// in a file name. Encoded stems never contain `%s`, so the two never meet.
fn file_stem(id: &str) -> String {
    let encoded = encode_file_stem(id);
    if encoded.len() <= MAX_READABLE_STEM {
        encoded
    } else {
        format!("%sha256-{}", hex::encode(Sha256::digest(id.as_bytes())))
    }
}

/// Percent-encode everything outside `[A-Za-z0-9_-]` so any id maps to a
/// distinct, path-safe file stem.
fn encode_file_stem(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            out.push(char::from(byte));
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, session: &Session) -> Result<()> {
        self.ensure_dir().await?;
        let encoded = serde_json::to_vec_pretty(session)?;
        tokio::fs::write(self.path_for(&session.id), encoded).await?;
        Ok(())
    }

    async fn load(&self, id: &SessionId) -> Result<Option<Session>> {
        match tokio::fs::read(self.path_for(id)).await {
            Ok(bytes) => {
                let session = serde_json::from_slice(&bytes).map_err(|e| {
                    AgentError::Session(format!("corrupt session '{id}': {e}"))
                })?;
                Ok(Some(session))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, id: &SessionId) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, limit: usize) -> Result<Vec<Session>> {
        let mut entries = match tokio::fs::read_dir(&self.storage_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut result = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<Session>(&bytes) {
                Ok(session) => result.push(session),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable session file");
                }
            }
        }

        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);
        Ok(result)
    }
}
