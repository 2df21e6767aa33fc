pub mod anthropic;
pub mod debug;
pub mod intent;
pub mod mem0;
pub mod runtime;
pub mod timeparse;
pub mod tools;

pub use anthropic::{
    AnthropicClient, ChatMessage, ChatRole, ContentBlock, MessageContent, MessagesResponse,
    ToolDefinition, Usage,
};
pub use debug::TurnDebug;
pub use mem0::{Mem0Client, MemoryItem};
pub use runtime::{AgentRuntime, PendingAction, TurnOutcome};
