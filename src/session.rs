use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::records::Role;

/// Who is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: String,
    pub name: String,
    pub role: Role,
    /// Role text from the Clients table, shown in the sidebar
    pub role_label: String,
}

impl Identity {
    pub fn is_lawyer(&self) -> bool {
        self.role.is_lawyer()
    }
}

/// Per-visitor login state.
///
/// Starts [`Session::LoggedOut`]; [`Session::login`] and [`Session::logout`] are the
/// only transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    LoggedOut,
    LoggedIn(Identity),
}

impl Session {
    pub fn login(&mut self, identity: Identity) {
        *self = Session::LoggedIn(identity);
    }

    pub fn logout(&mut self) {
        *self = Session::LoggedOut;
    }

    pub fn is_logged_in(&self) -> bool {
        matches!(self, Session::LoggedIn(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Session::LoggedIn(identity) => Some(identity),
            Session::LoggedOut => None,
        }
    }

    pub fn is_lawyer(&self) -> bool {
        self.identity().is_some_and(Identity::is_lawyer)
    }
}

#[derive(Debug, Clone)]
struct StoredSession {
    identity: Identity,
    expires_at: SystemTime,
}

/// Logged-in sessions of this server process, keyed by the id in the session cookie
///
/// Nothing is persisted: a restart logs everyone out.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, StoredSession>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a freshly authenticated identity and return its session id
    pub fn create(&self, identity: Identity) -> String {
        let session_id = Uuid::new_v4().to_string();
        let stored = StoredSession {
            identity,
            expires_at: SystemTime::now() + self.ttl,
        };

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.insert(session_id.clone(), stored);
        session_id
    }

    /// Resolve a session id; unknown and expired ids are logged out
    pub fn resolve(&self, session_id: &str) -> Session {
        {
            let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
            match sessions.get(session_id) {
                Some(stored) if stored.expires_at > SystemTime::now() => {
                    return Session::LoggedIn(stored.identity.clone());
                }
                Some(_) => {}
                None => return Session::LoggedOut,
            }
        }

        self.destroy(session_id);
        Session::LoggedOut
    }

    /// Forget a session; returns whether it existed
    pub fn destroy(&self, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id).is_some()
    }

    /// Drop every expired session, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = SystemTime::now();
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, stored| stored.expires_at > now);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
