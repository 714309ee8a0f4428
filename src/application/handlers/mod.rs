//! Request pipeline handlers, one per inbound operation.

mod complete_chat;
mod stream_chat;

pub use complete_chat::CompleteChatHandler;
pub use stream_chat::StreamChatHandler;
