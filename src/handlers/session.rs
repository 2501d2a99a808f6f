use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::MealLog;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// One user session and the meals logged during it.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub meals: MealLog,
}

/// Shared handle to a session. Locking it is the single-writer section
/// for the meal log.
pub type SessionHandle = Arc<Mutex<Session>>;

struct Entry {
    handle: SessionHandle,
    last_seen: Instant,
}

/// In-memory registry of live sessions.
///
/// A session ends when it is reset or when it has not been looked up for
/// longer than the idle timeout. Ending a session drops its log. Expired
/// sessions are swept on every `create` and `get`.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Entry>>>,
    idle_timeout: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionStore {
    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    pub fn create(&self) -> (Uuid, DateTime<Utc>, SessionHandle) {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let handle = Arc::new(Mutex::new(Session {
            id,
            created_at,
            meals: MealLog::new(),
        }));

        let now = Instant::now();
        let active = {
            let mut sessions = self.sessions.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            self.evict_idle(&mut sessions, now);
            sessions.insert(
                id,
                Entry {
                    handle: handle.clone(),
                    last_seen: now,
                },
            );
            sessions.len()
        };
        log::info!("🆕 Session started: {} ({} active)", id, active);

        (id, created_at, handle)
    }

    /// Looks up a live session and marks it as seen.
    pub fn get(&self, id: &Uuid) -> Option<SessionHandle> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.evict_idle(&mut sessions, now);
        sessions.get_mut(id).map(|entry| {
            entry.last_seen = now;
            entry.handle.clone()
        })
    }

    pub fn reset(&self, id: &Uuid) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(id)
            .is_some();
        if removed {
            log::info!("🧹 Session reset: {} ({} active)", id, self.len());
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, Entry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= self.idle_timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            log::info!("⌛ Expired {} idle session(s)", evicted);
        }
    }
}
