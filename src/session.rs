use chrono::Utc;
use rand::Rng;

/// One chat session: a server-correlatable id plus the turn-level state the
/// failure path needs (remembered quick replies, first-turn flag).
#[derive(Debug, Clone)]
pub struct ConversationSession {
    id: String,
    last_quick_replies: Vec<String>,
    started: bool,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self {
            id: generate_session_id(),
            last_quick_replies: Vec::new(),
            started: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether at least one turn (successful or not) has completed
    pub fn started(&self) -> bool {
        self.started
    }

    pub fn mark_started(&mut self) {
        self.started = true;
    }

    /// Quick replies offered by the most recent turn, replayed when a
    /// request fails so the user isn't stranded without options
    pub fn last_quick_replies(&self) -> &[String] {
        &self.last_quick_replies
    }

    pub fn set_last_quick_replies(&mut self, replies: Vec<String>) {
        self.last_quick_replies = replies;
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Correlation id: epoch milliseconds plus fractional jitter. Uniqueness
/// only, not security.
fn generate_session_id() -> String {
    let jitter: f64 = rand::thread_rng().gen();
    format!("{}", Utc::now().timestamp_millis() as f64 + jitter)
}
