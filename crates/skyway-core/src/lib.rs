pub mod agent;
pub mod config;
pub mod flow;
pub mod history;
pub mod state;

// Re-export main types for convenience
pub use agent::{AgentClient, AgentConfig, AgentError};
pub use config::Config;
pub use flow::{Conversation, Flow, FlowNode, MessageProducer, NodeId, NodeMessage, Params};
pub use history::ChatHistory;
pub use state::{ChatMessage, ChatRole};
