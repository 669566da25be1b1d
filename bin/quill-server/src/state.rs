//! Shared application state injected into every Axum handler.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use quill_core::{CompletionAdapter, CompletionResult, Message, SessionHistory};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::routes::pages::Pages;

struct Entry {
    history: SessionHistory,
    touched: Instant,
}

impl Entry {
    fn touch(&mut self) -> &mut SessionHistory {
        self.touched = Instant::now();
        &mut self.history
    }
}

/// A user turn that is waiting for its reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTurn {
    /// Index of the user message.
    pub index: usize,
    generation: u64,
}

/// Why an assistant reply was not appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReply {
    /// The session was deleted or evicted while the turn was in flight.
    Gone,
    /// The history was cleared while the turn was in flight.
    Cleared,
}

/// In-memory chat histories for the session widget, keyed by session ID.
///
/// Sessions idle for longer than `idle_timeout` are evicted, and at most
/// `max_sessions` are kept; creating one beyond the cap evicts the least
/// recently used. The lock only guards map and vector mutation; callers must
/// not hold it across a backend call.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Entry>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SessionRegistry({} sessions)", self.lock().len())
    }
}

impl SessionRegistry {
    /// `idle_timeout` of zero disables idle eviction.
    pub fn new(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    // A panic while holding the lock cannot leave a history half-written
    // (every mutation is a single push or clear), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start a new, empty session.
    pub fn create(&self) -> Uuid {
        let now = Instant::now();
        let mut map = self.lock();
        self.evict_idle_locked(&mut map, now);
        while map.len() >= self.max_sessions {
            let Some(oldest) = map.iter().min_by_key(|(_, e)| e.touched).map(|(id, _)| *id) else {
                break;
            };
            map.remove(&oldest);
            debug!(session_id = %oldest, "session cap reached; evicted least recently used");
        }

        let id = Uuid::new_v4();
        map.insert(id, Entry { history: SessionHistory::new(), touched: now });
        id
    }

    /// Drop every session untouched since `now - idle_timeout`. Returns how
    /// many were removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        self.evict_idle_locked(&mut self.lock(), now)
    }

    fn evict_idle_locked(&self, map: &mut HashMap<Uuid, Entry>, now: Instant) -> usize {
        if self.idle_timeout.is_zero() {
            return 0;
        }
        let before = map.len();
        map.retain(|_, e| now.saturating_duration_since(e.touched) <= self.idle_timeout);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Snapshot of the history, oldest first. `None` if the session is unknown.
    pub fn messages(&self, id: &Uuid) -> Option<Vec<Message>> {
        self.lock().get_mut(id).map(|e| e.touch().messages().to_vec())
    }

    /// Append a user turn. The returned [`PendingTurn`] must be handed back
    /// to [`SessionRegistry::push_assistant`] with the reply.
    pub fn push_user(&self, id: &Uuid, content: &str) -> Option<PendingTurn> {
        let mut map = self.lock();
        let history = map.get_mut(id)?.touch();
        history.push_user(content);
        Some(PendingTurn { index: history.len() - 1, generation: history.generation() })
    }

    /// Append the assistant turn for `result`; returns its index and message.
    ///
    /// Nothing is appended if the session was cleared or removed after
    /// `turn` was started.
    pub fn push_assistant(
        &self,
        id: &Uuid,
        turn: PendingTurn,
        result: &CompletionResult,
    ) -> Result<(usize, Message), StaleReply> {
        let mut map = self.lock();
        let history = map.get_mut(id).ok_or(StaleReply::Gone)?.touch();
        let message = history.push_reply(turn.generation, result).ok_or(StaleReply::Cleared)?.clone();
        Ok((history.len() - 1, message))
    }

    /// Empty the history. Returns `false` if the session is unknown.
    pub fn clear(&self, id: &Uuid) -> bool {
        match self.lock().get_mut(id) {
            Some(entry) => {
                entry.touch().clear();
                true
            }
            None => false,
        }
    }

    /// End a session, discarding its history.
    pub fn remove(&self, id: &Uuid) -> bool {
        self.lock().remove(id).is_some()
    }
}

/// Periodically evict idle sessions. Runs until the task is dropped.
pub async fn sweep_idle_sessions(registry: Arc<SessionRegistry>) {
    if registry.idle_timeout().is_zero() {
        return;
    }
    let period = registry.idle_timeout().clamp(Duration::from_secs(1), Duration::from_secs(60));
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        let evicted = registry.evict_idle(Instant::now());
        if evicted > 0 {
            info!(evicted, remaining = registry.len(), "evicted idle sessions");
        }
    }
}

/// State shared across all HTTP handlers.
#[derive(Debug)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Persona-configured completion adapter; read-only.
    pub adapter: Arc<CompletionAdapter>,
    /// Session widget histories.
    pub sessions: Arc<SessionRegistry>,
    /// Pre-rendered HTML pages.
    pub pages: Arc<Pages>,
}

impl AppState {
    pub fn new(config: Config, adapter: CompletionAdapter) -> Result<Self, minijinja::Error> {
        let pages = Pages::render(&config)?;
        let sessions =
            SessionRegistry::new(Duration::from_secs(config.session_idle_secs), config.max_sessions);
        Ok(Self {
            config: Arc::new(config),
            adapter: Arc::new(adapter),
            sessions: Arc::new(sessions),
            pages: Arc::new(pages),
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
