//! Local chat history, one JSON file per storage key.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::state::ChatMessage;

pub const DEFAULT_STORAGE_KEY: &str = "travel_agent_chat";
pub const DEFAULT_MAX_ENTRIES: usize = 30;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("could not determine data directory")]
    NoDataDir,
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ChatHistory {
    path: PathBuf,
    max_entries: usize,
}

impl ChatHistory {
    pub fn open(dir: impl AsRef<Path>, storage_key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{}.json", file_stem(storage_key))),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }

    /// History under the user's data directory, e.g. `~/.local/share/skyway/`.
    pub fn default_location(storage_key: &str) -> Result<Self, HistoryError> {
        let data_dir = dirs::data_dir().ok_or(HistoryError::NoDataDir)?;
        Ok(Self::open(data_dir.join("skyway"), storage_key))
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored messages, oldest first. Unreadable history is treated as empty.
    pub fn load(&self) -> Vec<ChatMessage> {
        match self.read() {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable chat history");
                Vec::new()
            }
        }
    }

    pub fn append(&self, message: &ChatMessage) -> Result<(), HistoryError> {
        let mut messages = self.load();
        messages.push(message.clone());
        if messages.len() > self.max_entries {
            let excess = messages.len() - self.max_entries;
            messages.drain(..excess);
        }
        self.write(&messages)
    }

    pub fn clear(&self) -> Result<(), HistoryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self) -> Result<Vec<ChatMessage>, HistoryError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    fn write(&self, messages: &[ChatMessage]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(messages)?)?;
        Ok(())
    }
}

/// Keep storage keys from escaping the history directory.
fn file_stem(storage_key: &str) -> String {
    let stem: String = storage_key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        DEFAULT_STORAGE_KEY.to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ChatRole;
    use tempfile::TempDir;

    #[test]
    fn test_empty_when_missing() {
        let dir = TempDir::new().unwrap();
        let history = ChatHistory::open(dir.path(), DEFAULT_STORAGE_KEY);
        assert!(history.load().is_empty());
        assert!(history.path().ends_with("travel_agent_chat.json"));
    }

    #[test]
    fn test_append_and_load() {
        let dir = TempDir::new().unwrap();
        let history = ChatHistory::open(dir.path().join("nested"), DEFAULT_STORAGE_KEY);

        history.append(&ChatMessage::user("Any flights to Rome?")).unwrap();
        history.append(&ChatMessage::assistant("Flight found!")).unwrap();

        let messages = history.load();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, ChatRole::User);
        assert_eq!(messages[1].content, "Flight found!");
    }

    #[test]
    fn test_keeps_most_recent_entries() {
        let dir = TempDir::new().unwrap();
        let history = ChatHistory::open(dir.path(), DEFAULT_STORAGE_KEY).with_max_entries(3);
        for i in 0..5 {
            history.append(&ChatMessage::user(i.to_string())).unwrap();
        }

        let contents: Vec<String> = history.load().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let history = ChatHistory::open(dir.path(), DEFAULT_STORAGE_KEY);
        fs::write(history.path(), "{ not a list").unwrap();

        assert!(history.load().is_empty());
        history.append(&ChatMessage::user("hello")).unwrap();
        assert_eq!(history.load().len(), 1);
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let history = ChatHistory::open(dir.path(), DEFAULT_STORAGE_KEY);
        history.clear().unwrap();

        history.append(&ChatMessage::user("hello")).unwrap();
        history.clear().unwrap();
        assert!(history.load().is_empty());
        assert!(!history.path().exists());
    }

    #[test]
    fn test_separate_keys_do_not_mix() {
        let dir = TempDir::new().unwrap();
        let a = ChatHistory::open(dir.path(), "a");
        let b = ChatHistory::open(dir.path(), "b");
        a.append(&ChatMessage::user("for a")).unwrap();
        assert!(b.load().is_empty());
    }

    #[test]
    fn test_storage_key_cannot_escape_directory() {
        assert_eq!(file_stem("../../etc/passwd"), "______etc_passwd");
        assert_eq!(file_stem(""), DEFAULT_STORAGE_KEY);
    }
}
