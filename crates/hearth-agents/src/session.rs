use dashmap::DashMap;
use hearth_common::Message;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Per-session state carried across turns of one process lifetime.
#[derive(Debug, Default)]
pub struct SessionRecord {
    /// The working conversation, including tool traffic the durable
    /// store filters out.
    pub live_messages: Vec<Message>,
    /// Cached compressed context. `None` until the first summarization.
    pub summary: Option<Vec<Message>>,
    pub turns_since_summary: u32,
    /// Whether live_messages was seeded from durable history.
    pub seeded: bool,
}

/// Maps session ids to their records. The per-record mutex is what
/// serializes turns within a session; separate sessions never contend.
#[derive(Default)]
pub struct SessionDirectory {
    sessions: DashMap<String, Arc<Mutex<SessionRecord>>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, session_id: &str) -> Arc<Mutex<SessionRecord>> {
        self.sessions
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop a session's in-process state: live messages and the summary
    /// cache. Durable history is unaffected and reseeds the next turn.
    pub fn reset(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
