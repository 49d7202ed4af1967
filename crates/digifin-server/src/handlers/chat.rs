//! Chatbot handler - conversational spending queries
//!
//! Each session owns a transcript. A session answers one query at a time:
//! a second query arriving while the first is still resolving gets 409.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::{get_user, AppError, AppState, MAX_QUERY_CHARS};
use digifin_core::{ChatMessage, ReplySource, Transcript};

/// Session timeout (30 minutes of inactivity)
const SESSION_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// A chat session with its transcript
#[derive(Debug)]
pub struct ChatSession {
    created_at: Instant,
    /// Milliseconds after `created_at` of the last activity
    last_activity_ms: AtomicU64,
    /// Held for the whole resolution of a query
    transcript: Mutex<Transcript>,
}

impl ChatSession {
    fn new() -> Self {
        Self {
            created_at: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            transcript: Mutex::new(Transcript::new()),
        }
    }

    fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.created_at.elapsed().saturating_sub(last)
    }

    fn is_expired(&self) -> bool {
        self.idle_for() > SESSION_TIMEOUT
    }

    fn touch(&self) {
        let elapsed = self.created_at.elapsed().as_millis() as u64;
        self.last_activity_ms.store(elapsed, Ordering::Relaxed);
    }
}

/// In-memory session manager
#[derive(Debug, Default)]
pub struct ChatSessionManager {
    sessions: RwLock<HashMap<String, Arc<ChatSession>>>,
    counter: AtomicU64,
}

impl ChatSessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new session and return its ID
    pub async fn create_session(&self) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);

        let mut hasher = Sha256::new();
        hasher.update(timestamp.to_le_bytes());
        hasher.update(sequence.to_le_bytes());
        let hash = hasher.finalize();
        let session_id = format!("chat_{:x}", hash)[..21].to_string();

        let mut sessions = self.sessions.write().await;

        // Clean up expired sessions while we're here
        sessions.retain(|_, s| !s.is_expired());

        sessions.insert(session_id.clone(), Arc::new(ChatSession::new()));
        session_id
    }

    /// Look up a live session
    pub async fn get(&self, session_id: &str) -> Option<Arc<ChatSession>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .filter(|s| !s.is_expired())
            .cloned()
    }

    /// Delete a session
    pub async fn delete_session(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(session_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Request to query the chatbot
#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub query: String,
    /// Omit to start a new session
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response from the chatbot
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub source: ReplySource,
    pub session_id: String,
    /// Full transcript after this exchange
    pub messages: Vec<ChatMessage>,
    pub processing_time_ms: u64,
}

/// Session info response
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub messages: Vec<ChatMessage>,
    pub created_at_secs_ago: u64,
    pub last_activity_secs_ago: u64,
}

/// POST /api/chat/session - Create a new chat session
pub async fn create_chat_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionInfo>, AppError> {
    let user = get_user(&headers);

    let session_id = state.chat_sessions.create_session().await;

    debug!(session_id = %session_id, user = %user, "Created chat session");

    state.db.log_audit(
        &user,
        "chat_session_create",
        Some("chat"),
        None,
        Some(&session_id),
    )?;

    Ok(Json(SessionInfo {
        session_id,
        messages: Transcript::new().messages().to_vec(),
        created_at_secs_ago: 0,
        last_activity_secs_ago: 0,
    }))
}

/// GET /api/chat/session/:id - Get a session's transcript
///
/// Returns 409 while a query on the session is still resolving.
pub async fn get_chat_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionInfo>, AppError> {
    let session = state
        .chat_sessions
        .get(&session_id)
        .await
        .ok_or_else(|| AppError::not_found("Session not found or expired"))?;

    let messages = session
        .transcript
        .try_lock()
        .map_err(|_| AppError::conflict("A query is in progress for this session"))?
        .messages()
        .to_vec();

    Ok(Json(SessionInfo {
        session_id,
        messages,
        created_at_secs_ago: session.created_at.elapsed().as_secs(),
        last_activity_secs_ago: session.idle_for().as_secs(),
    }))
}

/// DELETE /api/chat/session/:id - Delete a chat session
pub async fn delete_chat_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = get_user(&headers);

    let deleted = state.chat_sessions.delete_session(&session_id).await;

    debug!(session_id = %session_id, deleted = deleted, "Deleted chat session");

    state.db.log_audit(
        &user,
        "chat_session_delete",
        Some("chat"),
        None,
        Some(&session_id),
    )?;

    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

/// POST /api/chat/query - Ask the chatbot a question
pub async fn query_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<ChatQuery>,
) -> Result<Json<ChatResponse>, AppError> {
    let start = Instant::now();
    let user = get_user(&headers);

    let query = request.query.trim();
    if query.is_empty() {
        return Err(AppError::bad_request("Query cannot be empty"));
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(AppError::bad_request(&format!(
            "Query too long (max {} characters)",
            MAX_QUERY_CHARS
        )));
    }

    let session_id = match request.session_id {
        Some(id) => id,
        None => state.chat_sessions.create_session().await,
    };
    let session = state
        .chat_sessions
        .get(&session_id)
        .await
        .ok_or_else(|| AppError::not_found("Session not found or expired"))?;

    let mut transcript = session
        .transcript
        .try_lock()
        .map_err(|_| AppError::conflict("A query is already in progress for this session"))?;
    session.touch();

    let expenses = state.snapshot.current();
    let resolution = transcript
        .send(&state.resolver, query, &expenses)
        .await
        .ok_or_else(|| AppError::bad_request("Query cannot be empty"))?;
    let messages = transcript.messages().to_vec();
    drop(transcript);
    session.touch();

    let processing_time_ms = start.elapsed().as_millis() as u64;
    debug!(
        session_id = %session_id,
        source = ?resolution.source,
        processing_time_ms,
        "Chat query answered"
    );

    state.db.log_audit(
        &user,
        "chat_query",
        Some("chat"),
        None,
        Some(&format!(
            "session={}, query_len={}, source={:?}",
            session_id,
            query.len(),
            resolution.source
        )),
    )?;

    Ok(Json(ChatResponse {
        reply: resolution.reply,
        source: resolution.source,
        session_id,
        messages,
        processing_time_ms,
    }))
}
