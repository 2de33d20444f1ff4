//! Session registry
//!
//! Maps buffer handles to their sessions so a buffer-deleted event from
//! the host can tear the right session down.

use std::collections::HashMap;

use tracing::debug;

use super::host::{BufferId, Host};
use super::session::Session;

/// Live sessions by buffer
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<BufferId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `session` under its buffer, returning any session it
    /// replaces
    pub fn attach(
        &mut self,
        session: Session,
    ) -> Option<Session> {
        debug!(buf = session.buffer(), "session attached");
        self.sessions.insert(session.buffer(), session)
    }

    pub fn get(
        &self,
        buf: BufferId,
    ) -> Option<&Session> {
        self.sessions.get(&buf)
    }

    pub fn get_mut(
        &mut self,
        buf: BufferId,
    ) -> Option<&mut Session> {
        self.sessions.get_mut(&buf)
    }

    /// Forget the session of a deleted buffer
    pub fn on_buffer_deleted(
        &mut self,
        buf: BufferId,
    ) -> Option<Session> {
        let session = self.sessions.remove(&buf);
        if session.is_some() {
            debug!(buf, "session released");
        }
        session
    }

    /// Drop every session whose buffer is gone; returns their handles
    pub fn reap(
        &mut self,
        host: &dyn Host,
    ) -> Vec<BufferId> {
        let mut dead: Vec<BufferId> = self
            .sessions
            .iter()
            .filter(|(_, session)| !session.is_alive(host))
            .map(|(&buf, _)| buf)
            .collect();
        dead.sort_unstable();
        for buf in &dead {
            self.on_buffer_deleted(*buf);
        }
        dead
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repl::host::MemoryHost;
    use crate::util::config::ReplConfig;

    #[test]
    fn test_attach_and_delete() {
        let mut registry = SessionRegistry::new();
        let config = ReplConfig::default();
        assert!(registry.attach(Session::new(1, &config)).is_none());
        assert!(registry.attach(Session::new(1, &config)).is_some());
        assert_eq!(registry.len(), 1);
        assert!(registry.on_buffer_deleted(1).is_some());
        assert!(registry.on_buffer_deleted(1).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reap_dead_buffers() {
        let mut host = MemoryHost::new();
        let second = host.create_buffer(Vec::new());
        let config = ReplConfig::default();
        let mut registry = SessionRegistry::new();
        registry.attach(Session::new(1, &config));
        registry.attach(Session::new(second, &config));

        host.delete_buffer(second);
        assert_eq!(registry.reap(&host), vec![second]);
        assert!(registry.get(1).is_some());
        assert!(registry.get_mut(second).is_none());
    }
}
