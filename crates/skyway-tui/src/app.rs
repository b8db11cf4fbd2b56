use std::sync::Arc;

use skyway_core::flow::FALLBACK_REPLY;
use skyway_core::{ChatHistory, ChatMessage, Conversation};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub struct App {
    pub should_quit: bool,

    // Input line
    pub input: String,
    pub cursor: usize,

    // Transcript: restored history first, then this session
    pub messages: Vec<ChatMessage>,
    pub restored_count: usize,

    // In-flight turn
    pub reply_task: Option<JoinHandle<String>>,
    pub animation_frame: u8, // 0-2 for typing indicator

    // Transcript scrolling (sizes updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub follow_tail: bool,

    pub status: Option<String>,

    conversation: Arc<Mutex<Conversation>>,
    history: Option<ChatHistory>,
}

impl App {
    pub fn new(conversation: Conversation, history: Option<ChatHistory>) -> Self {
        let messages = history.as_ref().map(ChatHistory::load).unwrap_or_default();
        let restored_count = messages.len();

        Self {
            should_quit: false,
            input: String::new(),
            cursor: 0,
            messages,
            restored_count,
            reply_task: None,
            animation_frame: 0,
            chat_scroll: 0,
            chat_height: 0,
            follow_tail: true,
            status: None,
            conversation: Arc::new(Mutex::new(conversation)),
            history,
        }
    }

    pub fn awaiting_reply(&self) -> bool {
        self.reply_task.is_some()
    }

    /// Show the flow's greeting. The greeting is not written to history.
    pub async fn start(&mut self) {
        let greeting = self.conversation.lock().await.begin().await;
        self.messages.push(ChatMessage::assistant(greeting));
        self.follow_tail = true;
    }

    /// Send the input line as one user turn. Returns false when nothing was sent.
    pub fn submit(&mut self) -> bool {
        if self.awaiting_reply() || self.input.trim().is_empty() {
            return false;
        }

        let user_input = std::mem::take(&mut self.input);
        self.cursor = 0;
        self.record(ChatMessage::user(user_input.clone()));

        let conversation = Arc::clone(&self.conversation);
        self.reply_task = Some(tokio::spawn(async move {
            conversation.lock().await.turn(&user_input).await
        }));
        self.animation_frame = 0;
        true
    }

    /// Collect the reply once the in-flight turn has finished.
    pub async fn poll_reply(&mut self) {
        let finished = self
            .reply_task
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(false);
        if !finished {
            return;
        }

        if let Some(task) = self.reply_task.take() {
            let reply = match task.await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!(error = %e, "reply task did not complete");
                    FALLBACK_REPLY.to_string()
                }
            };
            self.record(ChatMessage::assistant(reply));
        }
    }

    /// Forget stored history and start the conversation over.
    pub async fn clear_history(&mut self) {
        if self.awaiting_reply() {
            return;
        }
        if let Some(history) = &self.history {
            if let Err(e) = history.clear() {
                tracing::warn!(error = %e, "failed to clear chat history");
                self.status = Some(format!("Could not clear history: {}", e));
            }
        }
        self.messages.clear();
        self.restored_count = 0;
        self.chat_scroll = 0;
        self.start().await;
    }

    pub fn tick_animation(&mut self) {
        if self.awaiting_reply() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_tail = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    /// Render clamps the offset and re-enables tail following at the bottom.
    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn half_page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }

    fn record(&mut self, message: ChatMessage) {
        if let Some(history) = &self.history {
            if let Err(e) = history.append(&message) {
                tracing::warn!(error = %e, "failed to save chat history");
                self.status = Some(format!("History not saved: {}", e));
            }
        }
        self.messages.push(message);
        self.follow_tail = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyway_core::flow::GREETING;
    use skyway_core::{AgentClient, AgentConfig, ChatRole, Flow, NodeId};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Points at a closed port so every turn takes the fallback path.
    fn offline_conversation() -> Conversation {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let client = AgentClient::new(&AgentConfig::new(format!("http://{}", addr)));
        Conversation::new(Flow::travel_agent(client))
    }

    async fn wait_for_reply(app: &mut App) {
        for _ in 0..200 {
            app.poll_reply().await;
            if !app.awaiting_reply() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("reply never arrived");
    }

    #[tokio::test]
    async fn test_start_shows_greeting() {
        let mut app = App::new(offline_conversation(), None);
        app.start().await;
        assert_eq!(app.messages, vec![ChatMessage::assistant(GREETING)]);
        assert_eq!(app.conversation.lock().await.current(), NodeId::Chat);
    }

    #[tokio::test]
    async fn test_blank_input_is_not_sent() {
        let mut app = App::new(offline_conversation(), None);
        app.start().await;
        app.input = "   ".to_string();
        assert!(!app.submit());
        assert_eq!(app.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_turn_shows_fallback_and_blocks_while_waiting() {
        let mut app = App::new(offline_conversation(), None);
        app.start().await;

        app.input = "Book a hotel".to_string();
        app.cursor = 12;
        assert!(app.submit());
        assert!(app.input.is_empty());
        assert_eq!(app.cursor, 0);

        app.input = "second".to_string();
        assert!(!app.submit());
        assert_eq!(app.input, "second");

        wait_for_reply(&mut app).await;
        let last = app.messages.last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.content, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_history_restored_and_greeting_not_stored() {
        let dir = TempDir::new().unwrap();
        let history = ChatHistory::open(dir.path(), "travel_agent_chat");
        history.append(&ChatMessage::user("earlier question")).unwrap();
        history.append(&ChatMessage::assistant("earlier answer")).unwrap();

        let mut app = App::new(offline_conversation(), Some(history.clone()));
        assert_eq!(app.restored_count, 2);
        app.start().await;
        assert_eq!(app.messages.len(), 3);
        assert_eq!(history.load().len(), 2);

        app.input = "new question".to_string();
        app.submit();
        wait_for_reply(&mut app).await;

        let stored = history.load();
        assert_eq!(stored.len(), 4);
        assert_eq!(stored[2], ChatMessage::user("new question"));
        assert_eq!(stored[3], ChatMessage::assistant(FALLBACK_REPLY));
    }

    #[tokio::test]
    async fn test_clear_history_restarts_conversation() {
        let dir = TempDir::new().unwrap();
        let history = ChatHistory::open(dir.path(), "travel_agent_chat");
        history.append(&ChatMessage::user("old")).unwrap();

        let mut app = App::new(offline_conversation(), Some(history.clone()));
        app.start().await;
        app.clear_history().await;

        assert!(history.load().is_empty());
        assert_eq!(app.restored_count, 0);
        assert_eq!(app.messages, vec![ChatMessage::assistant(GREETING)]);
    }

    #[test]
    fn test_scroll_up_stops_following() {
        let mut app = App::new(offline_conversation(), None);
        app.chat_scroll = 10;
        app.scroll_up(3);
        assert_eq!(app.chat_scroll, 7);
        assert!(!app.follow_tail);
        app.scroll_up(100);
        assert_eq!(app.chat_scroll, 0);
    }
}
