use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
/// The only record exchanged through the automation file.
///
/// `sent_at` is a dedup token: two records with equal values are the same
/// event no matter what `command` says.
pub struct AutomationMessage {
    #[serde(rename = "Command", default)]
    pub command: String,
    #[serde(rename = "SentAt", default)]
    pub sent_at: i64,
}

impl AutomationMessage {
    pub fn new(command: impl Into<String>, sent_at: i64) -> Self {
        Self {
            command: command.into(),
            sent_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What the poll loop does with one decoded record.
pub enum PollDecision {
    Duplicate,
    Empty,
    Execute(String),
}

impl PollDecision {
    /// Compares against `last_seen` and records the new token for every
    /// non-duplicate record, including empty ones.
    ///
    /// Callers hold the token lock from reading the file until this returns.
    pub fn decide(message: &AutomationMessage, last_seen: &mut i64) -> Self {
        if message.sent_at == *last_seen {
            return Self::Duplicate;
        }
        *last_seen = message.sent_at;

        let command = message.command.trim();
        if command.is_empty() {
            Self::Empty
        } else {
            Self::Execute(command.to_string())
        }
    }
}
