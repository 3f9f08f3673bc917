//! The injected session-store abstraction.
//!
//! Sessions are keyed by machine id and live from registration to cleanup.
//! The store is handed to the manager rather than reached through ambient
//! globals, so tests and deployments can choose their own backing.

use std::collections::HashMap;
use std::sync::RwLock;

use printvendo_types::{MachineId, MachineSession, SessionState};

/// Keyed storage for live sessions.
pub trait SessionStore: Send + Sync {
    /// Snapshot of the session for a machine, if one exists.
    fn get(&self, machine: &MachineId) -> Option<MachineSession>;

    /// Store (or replace) a session.
    fn put(&self, session: MachineSession);

    /// Remove and return a session.
    fn remove(&self, machine: &MachineId) -> Option<MachineSession>;

    /// Atomically advance a session from `from` to `to`.
    ///
    /// Returns the updated session, or `None` when the session is absent or
    /// not in `from`: the caller lost the claim and must short-circuit.
    /// This is the gate that keeps two concurrent generation calls from
    /// double-billing the same machine.
    fn advance_if(
        &self,
        machine: &MachineId,
        from: SessionState,
        to: SessionState,
    ) -> Option<MachineSession>;
}

/// The default in-process store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<MachineId, MachineSession>>,
}

impl InMemorySessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, machine: &MachineId) -> Option<MachineSession> {
        self.sessions.read().unwrap().get(machine).cloned()
    }

    fn put(&self, session: MachineSession) {
        self.sessions
            .write()
            .unwrap()
            .insert(session.machine_id.clone(), session);
    }

    fn remove(&self, machine: &MachineId) -> Option<MachineSession> {
        self.sessions.write().unwrap().remove(machine)
    }

    fn advance_if(
        &self,
        machine: &MachineId,
        from: SessionState,
        to: SessionState,
    ) -> Option<MachineSession> {
        let mut sessions = self.sessions.write().unwrap();
        let session = sessions.get_mut(machine)?;
        if session.state != from {
            return None;
        }
        session.state = to;
        Some(session.clone())
    }
}
