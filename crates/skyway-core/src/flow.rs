//! Conversation flow
//!
//! A flow is a fixed graph of two nodes. `start` greets the user and moves on
//! to `chat`; `chat` answers every user turn and loops back to itself.
//! Transitions never depend on message content.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::AgentClient;

pub const GREETING: &str = "Hello! I'm your travel assistant. I can help you search and book flights, hotels, and rental cars. How can I assist you today?";

pub const FALLBACK_REPLY: &str =
    "Sorry, I'm having trouble connecting to the server. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Start,
    Chat,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::Start => "start",
            NodeId::Chat => "chat",
        }
    }
}

/// Input available to a node when it produces its message
#[derive(Debug, Clone, Default)]
pub struct Params {
    pub user_input: String,
}

/// Computes a node's message at the time the node is reached.
///
/// Producers are infallible: any failure must already be folded into the
/// returned text.
#[async_trait]
pub trait MessageProducer: Send + Sync {
    async fn produce(&self, params: &Params) -> String;
}

pub enum NodeMessage {
    Static(String),
    Producer(Arc<dyn MessageProducer>),
}

impl NodeMessage {
    pub async fn render(&self, params: &Params) -> String {
        match self {
            NodeMessage::Static(text) => text.clone(),
            NodeMessage::Producer(producer) => producer.produce(params).await,
        }
    }
}

impl fmt::Debug for NodeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeMessage::Static(text) => f.debug_tuple("Static").field(text).finish(),
            NodeMessage::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

#[derive(Debug)]
pub struct FlowNode {
    pub message: NodeMessage,
    pub path: NodeId,
}

#[derive(Debug)]
pub struct Flow {
    start: FlowNode,
    chat: FlowNode,
}

impl Flow {
    pub fn new(start: FlowNode, chat: FlowNode) -> Self {
        Self { start, chat }
    }

    /// The travel assistant flow: fixed greeting, then one agent call per turn.
    pub fn travel_agent(client: AgentClient) -> Self {
        Self::new(
            FlowNode {
                message: NodeMessage::Static(GREETING.to_string()),
                path: NodeId::Chat,
            },
            FlowNode {
                message: NodeMessage::Producer(Arc::new(AgentReply::new(client))),
                path: NodeId::Chat,
            },
        )
    }

    pub fn node(&self, id: NodeId) -> &FlowNode {
        match id {
            NodeId::Start => &self.start,
            NodeId::Chat => &self.chat,
        }
    }
}

/// Replies with the agent's answer, or [`FALLBACK_REPLY`] when the call fails.
pub struct AgentReply {
    client: AgentClient,
}

impl AgentReply {
    pub fn new(client: AgentClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MessageProducer for AgentReply {
    async fn produce(&self, params: &Params) -> String {
        match self.client.call(&params.user_input).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, "agent call failed, showing fallback reply");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

/// A flow plus the node the conversation is currently on
#[derive(Debug)]
pub struct Conversation {
    flow: Flow,
    current: NodeId,
}

impl Conversation {
    pub fn new(flow: Flow) -> Self {
        Self {
            flow,
            current: NodeId::Start,
        }
    }

    pub fn current(&self) -> NodeId {
        self.current
    }

    /// Restart at `start` and return its message, whatever state came before.
    pub async fn begin(&mut self) -> String {
        self.current = NodeId::Start;
        self.advance(&Params::default()).await
    }

    /// Produce the current node's message for this user turn, then follow the
    /// node's path.
    pub async fn turn(&mut self, user_input: &str) -> String {
        let params = Params {
            user_input: user_input.to_string(),
        };
        self.advance(&params).await
    }

    async fn advance(&mut self, params: &Params) -> String {
        let node = self.flow.node(self.current);
        let path = node.path;
        let message = node.message.render(params).await;
        tracing::debug!(from = self.current.as_str(), to = path.as_str(), "flow transition");
        self.current = path;
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Echoes input and records what it was asked
    struct Echo {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessageProducer for Echo {
        async fn produce(&self, params: &Params) -> String {
            self.seen.lock().unwrap().push(params.user_input.clone());
            format!("echo: {}", params.user_input)
        }
    }

    fn echo_conversation() -> (Conversation, Arc<Echo>) {
        let echo = Arc::new(Echo {
            seen: Mutex::new(Vec::new()),
        });
        let flow = Flow::new(
            FlowNode {
                message: NodeMessage::Static(GREETING.to_string()),
                path: NodeId::Chat,
            },
            FlowNode {
                message: NodeMessage::Producer(echo.clone()),
                path: NodeId::Chat,
            },
        );
        (Conversation::new(flow), echo)
    }

    #[tokio::test]
    async fn test_begin_emits_greeting_and_moves_to_chat() {
        let (mut conversation, echo) = echo_conversation();
        assert_eq!(conversation.current(), NodeId::Start);

        assert_eq!(conversation.begin().await, GREETING);
        assert_eq!(conversation.current(), NodeId::Chat);
        assert!(echo.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_begin_ignores_prior_state() {
        let (mut conversation, _echo) = echo_conversation();
        conversation.begin().await;
        conversation.turn("first").await;
        conversation.turn("second").await;

        assert_eq!(conversation.begin().await, GREETING);
        assert_eq!(conversation.current(), NodeId::Chat);
    }

    #[tokio::test]
    async fn test_chat_passes_user_input_to_producer() {
        let (mut conversation, echo) = echo_conversation();
        conversation.begin().await;

        assert_eq!(conversation.turn("Book a car").await, "echo: Book a car");
        assert_eq!(*echo.seen.lock().unwrap(), vec!["Book a car".to_string()]);
    }

    #[tokio::test]
    async fn test_chat_loops_on_itself() {
        let (mut conversation, echo) = echo_conversation();
        conversation.begin().await;
        for i in 0..25 {
            conversation.turn(&i.to_string()).await;
            assert_eq!(conversation.current(), NodeId::Chat);
        }
        assert_eq!(echo.seen.lock().unwrap().len(), 25);
    }

    #[tokio::test]
    async fn test_turn_before_begin_runs_start_node() {
        let (mut conversation, echo) = echo_conversation();
        assert_eq!(conversation.turn("too early").await, GREETING);
        assert_eq!(conversation.current(), NodeId::Chat);
        assert!(echo.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_travel_agent_flow_shape() {
        let client = AgentClient::new(&crate::agent::AgentConfig::default());
        let flow = Flow::travel_agent(client);

        let start = flow.node(NodeId::Start);
        assert!(matches!(&start.message, NodeMessage::Static(text) if text == GREETING));
        assert_eq!(start.path, NodeId::Chat);

        let chat = flow.node(NodeId::Chat);
        assert!(matches!(chat.message, NodeMessage::Producer(_)));
        assert_eq!(chat.path, NodeId::Chat);
    }

    #[test]
    fn test_node_message_debug_hides_producer() {
        let msg = NodeMessage::Producer(Arc::new(Echo {
            seen: Mutex::new(Vec::new()),
        }));
        assert_eq!(format!("{:?}", msg), "Producer(..)");
    }
}
