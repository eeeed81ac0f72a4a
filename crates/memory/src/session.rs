//! Conversation memory: per-session append-only message logs.
//!
//! Unknown session ids never fail; they materialize an empty session.
//! With a non-zero `max_sessions`, creating a session beyond the bound
//! evicts the least-recently-updated one. Sessions with a turn in flight
//! (between `begin_turn` and `finish_turn`) are never evicted.

use std::collections::HashMap;

use ragline_core::message::{Message, Session, SessionId};
use tokio::sync::RwLock;
use tracing::{debug, warn};

struct Entry {
    session: Session,
    /// Logical clock value of the last touch; orders eviction.
    touched: u64,
    /// Turns started but not yet finished; pins the session.
    in_flight: u32,
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionId, Entry>,
    clock: u64,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Get or create the entry for `id`, evicting if a creation would
    /// exceed `max_sessions`.
    fn entry(&mut self, id: &SessionId, max_sessions: usize) -> &mut Entry {
        if !self.sessions.contains_key(id) {
            if max_sessions > 0 && self.sessions.len() >= max_sessions {
                self.evict_oldest();
            }
            debug!(session_id = %id, "Session created");
        }
        let touched = self.tick();
        self.sessions.entry(id.clone()).or_insert_with(|| Entry {
            session: Session::new(id.clone()),
            touched,
            in_flight: 0,
        })
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .sessions
            .iter()
            .filter(|(_, e)| e.in_flight == 0)
            .min_by_key(|(_, e)| e.touched)
            .map(|(id, _)| id.clone());
        match oldest {
            Some(id) => {
                self.sessions.remove(&id);
                debug!(session_id = %id, "Session evicted");
            }
            None => debug!(
                sessions = self.sessions.len(),
                "Every session has a turn in flight, bound exceeded"
            ),
        }
    }
}

pub struct SessionStore {
    inner: RwLock<Inner>,
    max_sessions: usize,
}

impl SessionStore {
    /// `max_sessions = 0` means unbounded.
    pub fn new(max_sessions: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_sessions,
        }
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Append `message` to the session, creating it if needed.
    pub async fn append(&self, id: &SessionId, message: Message) {
        let mut inner = self.inner.write().await;
        let touched = inner.tick();
        let entry = inner.entry(id, self.max_sessions);
        entry.session.push(message);
        entry.touched = touched;
    }

    /// Record the user message of a new turn and pin the session until
    /// the matching `finish_turn`.
    pub async fn begin_turn(&self, id: &SessionId, message: Message) {
        let mut inner = self.inner.write().await;
        let touched = inner.tick();
        let entry = inner.entry(id, self.max_sessions);
        entry.session.push(message);
        entry.touched = touched;
        entry.in_flight += 1;
    }

    /// Close a turn opened by `begin_turn`, recording `reply` if the turn
    /// produced one. A session that no longer exists is not recreated.
    pub async fn finish_turn(&self, id: &SessionId, reply: Option<Message>) {
        let mut inner = self.inner.write().await;
        let touched = inner.tick();
        let Some(entry) = inner.sessions.get_mut(id) else {
            warn!(session_id = %id, "Turn finished for a session that no longer exists");
            return;
        };
        entry.in_flight = entry.in_flight.saturating_sub(1);
        if let Some(reply) = reply {
            entry.session.push(reply);
            entry.touched = touched;
        }
    }

    /// The last `n` messages of the session, oldest first.
    pub async fn recent(&self, id: &SessionId, n: usize) -> Vec<Message> {
        {
            let inner = self.inner.read().await;
            if let Some(entry) = inner.sessions.get(id) {
                return entry.session.recent(n).to_vec();
            }
        }
        let mut inner = self.inner.write().await;
        inner.entry(id, self.max_sessions).session.recent(n).to_vec()
    }

    /// Every message of the session, oldest first.
    pub async fn all(&self, id: &SessionId) -> Vec<Message> {
        let mut inner = self.inner.write().await;
        inner.entry(id, self.max_sessions).session.messages.clone()
    }

    /// A copy of the session, if it exists. Does not create one.
    pub async fn get(&self, id: &SessionId) -> Option<Session> {
        self.inner
            .read()
            .await
            .sessions
            .get(id)
            .map(|e| e.session.clone())
    }

    pub async fn session_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(0)
    }
}
