use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::session::memory::{extract_entities, extract_topics};
use crate::session::types::{Session, Turn, TurnRole};

pub const DEFAULT_IDLE_TIMEOUT_MINUTES: i64 = 30;

/// Interval between background sweeps of idle sessions
pub const CLEANUP_INTERVAL_SECS: u64 = 5 * 60;

type SessionSlot = Arc<Mutex<Session>>;

/// Keyed conversation store.
///
/// The outer map lock is held only long enough to find or insert a key's
/// slot; all session mutation happens under that key's own mutex, so two keys
/// never contend and one key has a single writer at a time.
pub struct ConversationStore {
    sessions: RwLock<HashMap<String, SessionSlot>>,
    idle_timeout: Duration,
}

impl ConversationStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Returns a snapshot of the key's session, creating it (or replacing an
    /// expired one) as needed.
    pub async fn get_or_create_session(&self, key: &str) -> Session {
        self.get_or_create_session_at(key, Utc::now()).await
    }

    pub async fn get_or_create_session_at(&self, key: &str, now: DateTime<Utc>) -> Session {
        let slot = self.slot(key, now).await;
        let mut session = slot.lock().await;
        self.renew_if_expired(&mut session, now);
        session.touch(now);
        session.clone()
    }

    /// Appends a turn and updates the session's memory. Returns the id of the
    /// session the turn landed in.
    pub async fn append(&self, key: &str, turn: Turn) -> String {
        self.append_at(key, turn, Utc::now()).await
    }

    pub async fn append_at(&self, key: &str, turn: Turn, now: DateTime<Utc>) -> String {
        let slot = self.slot(key, now).await;
        let mut session = slot.lock().await;
        self.renew_if_expired(&mut session, now);

        if turn.role != TurnRole::Error {
            session.topics.extend(extract_topics(&turn.content));
            session.entities.extend(extract_entities(&turn.content));
        }
        session.history.push(turn);
        session.touch(now);

        debug!(
            session_key = %key,
            session_id = %session.id,
            turns = session.history.len(),
            "Turn appended"
        );
        session.id.clone()
    }

    /// The last `n` turns of the key's live session. Empty when the key is
    /// unknown or its session has expired.
    pub async fn recent_turns(&self, key: &str, n: usize) -> Vec<Turn> {
        let slot = {
            let guard = self.sessions.read().await;
            guard.get(key).cloned()
        };
        let Some(slot) = slot else {
            return Vec::new();
        };

        let session = slot.lock().await;
        if session.is_expired_at(Utc::now(), self.idle_timeout) {
            return Vec::new();
        }
        session.recent_turns(n).to_vec()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every idle session. A slot a request has already looked up is in
    /// use and kept, even before that request takes its lock.
    pub async fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now()).await
    }

    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let mut guard = self.sessions.write().await;
        let before = guard.len();
        guard.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(session) => !session.is_expired_at(now, self.idle_timeout),
                Err(_) => true,
            }
        });
        let removed = before - guard.len();
        if removed > 0 {
            info!(removed, remaining = guard.len(), "Purged idle sessions");
        }
        removed
    }

    /// Spawns a task that purges idle sessions every `CLEANUP_INTERVAL_SECS`.
    ///
    /// Returns the task handle and a sender that stops the task.
    pub fn start_cleanup_task(
        self: &Arc<Self>,
    ) -> (tokio::task::JoinHandle<()>, tokio::sync::mpsc::Sender<()>) {
        self.start_cleanup_task_every(std::time::Duration::from_secs(CLEANUP_INTERVAL_SECS))
    }

    pub fn start_cleanup_task_every(
        self: &Arc<Self>,
        period: std::time::Duration,
    ) -> (tokio::task::JoinHandle<()>, tokio::sync::mpsc::Sender<()>) {
        let store = Arc::clone(self);
        let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        store.purge_expired().await;
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Session cleanup task stopping");
                        break;
                    }
                }
            }
        });

        (handle, shutdown_tx)
    }

    async fn slot(&self, key: &str, now: DateTime<Utc>) -> SessionSlot {
        {
            let guard = self.sessions.read().await;
            if let Some(slot) = guard.get(key) {
                return Arc::clone(slot);
            }
        }

        let mut guard = self.sessions.write().await;
        Arc::clone(guard.entry(key.to_string()).or_insert_with(|| {
            debug!(session_key = %key, "Creating session");
            Arc::new(Mutex::new(Session::new_at(key, now)))
        }))
    }

    fn renew_if_expired(&self, session: &mut Session, now: DateTime<Utc>) {
        if session.is_expired_at(now, self.idle_timeout) {
            info!(
                session_key = %session.key,
                expired_id = %session.id,
                idle_minutes = now.signed_duration_since(session.last_active_at).num_minutes(),
                "Session expired, starting a new one"
            );
            *session = Session::new_at(session.key.clone(), now);
        }
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_IDLE_TIMEOUT_MINUTES))
    }
}
