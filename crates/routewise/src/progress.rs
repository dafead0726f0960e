//! Session-scoped progress events.
//!
//! A [`ProgressBus`] maps a session id to at most one live delivery channel.
//! [`ProgressBus::join`] binds a session and hands back the receiving end;
//! [`ProgressBus::publish`] delivers best-effort to that binding only.
//! Publishing never blocks and never fails: an unbound session is a silent
//! no-op, and a binding whose receiver has gone away is dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Default per-session channel capacity.
pub const DEFAULT_BUFFER: usize = 64;

/// Kind of progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Status,
    Progress,
    Result,
    Error,
}

/// Named pipeline stage an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStage {
    Thinking,
    Researching,
    Writing,
    Reviewing,
    Complete,
    Error,
}

impl fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Thinking => "thinking",
            Self::Researching => "researching",
            Self::Writing => "writing",
            Self::Reviewing => "reviewing",
            Self::Complete => "complete",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// One event delivered to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<ProgressStage>,
    /// Percentage, 0 to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(session_id: impl Into<String>, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            stage: None,
            progress: None,
            session_id: session_id.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_stage(mut self, stage: ProgressStage) -> Self {
        self.stage = Some(stage);
        self
    }

    /// Attach a percentage, clamped to 100.
    pub fn with_progress(mut self, pct: u8) -> Self {
        self.progress = Some(pct.min(100));
        self
    }
}

/// Identifies one [`ProgressBus::bind`] call, so a holder can unbind its
/// own binding without touching a later one for the same session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

#[derive(Debug)]
struct SessionChannel {
    id: BindingId,
    tx: broadcast::Sender<ProgressEvent>,
}

/// Session id -> live delivery channel.
#[derive(Debug)]
pub struct ProgressBus {
    sessions: Mutex<HashMap<String, SessionChannel>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl Default for ProgressBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER)
    }
}

impl ProgressBus {
    pub fn new(buffer: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            buffer: buffer.max(1),
        }
    }

    /// Bind `session_id` to a new channel and return its receiving end.
    ///
    /// An earlier binding for the same session is replaced; its receiver
    /// sees the channel close.
    pub fn join(&self, session_id: &str) -> broadcast::Receiver<ProgressEvent> {
        self.bind(session_id).1
    }

    /// Like [`join`](Self::join), also returning the id of the new binding
    /// for [`leave_binding`](Self::leave_binding).
    pub fn bind(&self, session_id: &str) -> (BindingId, broadcast::Receiver<ProgressEvent>) {
        let (tx, rx) = broadcast::channel(self.buffer);
        let id = BindingId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let channel = SessionChannel { id, tx };
        if self.lock().insert(session_id.to_string(), channel).is_some() {
            debug!("Session {session_id} rebound to a new channel");
        } else {
            debug!("Session {session_id} joined");
        }
        (id, rx)
    }

    /// Unbind `session_id`. Returns whether it was bound.
    pub fn leave(&self, session_id: &str) -> bool {
        let removed = self.lock().remove(session_id).is_some();
        if removed {
            debug!("Session {session_id} left");
        }
        removed
    }

    /// Unbind `session_id` only if it is still bound by `id`. A session
    /// rebound since then is left alone. Returns whether it was removed.
    pub fn leave_binding(&self, session_id: &str, id: BindingId) -> bool {
        let mut sessions = self.lock();
        if sessions.get(session_id).is_none_or(|c| c.id != id) {
            return false;
        }
        sessions.remove(session_id);
        debug!("Session {session_id} left");
        true
    }

    pub fn is_bound(&self, session_id: &str) -> bool {
        self.lock().contains_key(session_id)
    }

    /// Number of bound sessions.
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    /// Deliver an event to the session it names. Fire-and-forget.
    pub fn publish(&self, event: ProgressEvent) {
        let mut sessions = self.lock();
        let Some(channel) = sessions.get(&event.session_id) else {
            trace!("No channel for session {}, dropping event", event.session_id);
            return;
        };
        if channel.tx.send(event.clone()).is_err() {
            warn!(
                "Progress receiver for session {} is gone, unbinding",
                event.session_id
            );
            sessions.remove(&event.session_id);
        }
    }

    // ── Emitters ───────────────────────────────────────────────────

    fn status(&self, session_id: &str, stage: ProgressStage, message: &str) {
        self.publish(ProgressEvent::new(session_id, EventKind::Status, message).with_stage(stage));
    }

    pub fn emit_thinking(&self, session_id: &str, message: Option<&str>) {
        self.status(session_id, ProgressStage::Thinking, message.unwrap_or("Thinking..."));
    }

    pub fn emit_researching(&self, session_id: &str, message: Option<&str>) {
        self.status(session_id, ProgressStage::Researching, message.unwrap_or("Researching..."));
    }

    pub fn emit_writing(&self, session_id: &str, message: Option<&str>) {
        self.status(session_id, ProgressStage::Writing, message.unwrap_or("Writing draft..."));
    }

    pub fn emit_reviewing(&self, session_id: &str, message: Option<&str>) {
        self.status(session_id, ProgressStage::Reviewing, message.unwrap_or("Reviewing content..."));
    }

    /// Final result event (`type: result`, stage `complete`).
    pub fn emit_complete(&self, session_id: &str, message: Option<&str>) {
        self.publish(
            ProgressEvent::new(session_id, EventKind::Result, message.unwrap_or("Complete!"))
                .with_stage(ProgressStage::Complete),
        );
    }

    pub fn emit_error(&self, session_id: &str, message: &str) {
        self.publish(
            ProgressEvent::new(session_id, EventKind::Error, message).with_stage(ProgressStage::Error),
        );
    }

    pub fn emit_progress(&self, session_id: &str, pct: u8, message: &str) {
        self.publish(ProgressEvent::new(session_id, EventKind::Progress, message).with_progress(pct));
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionChannel>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
