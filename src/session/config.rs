use serde::{Deserialize, Serialize};

/// Caller-supplied inputs for one interview session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Session identifier shared with the interview service.
    ///
    /// `None` is valid: turns are still recorded and encoded, but the
    /// exchange is skipped with a log line.
    pub session_id: Option<String>,

    /// Total number of questions, used for display only
    pub question_count: Option<u32>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            session_id: Some(format!("interview-{}", uuid::Uuid::new_v4())),
            question_count: None,
        }
    }
}
