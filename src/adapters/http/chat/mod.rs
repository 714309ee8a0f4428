//! Chat completion endpoints.

mod dto;
mod handlers;
mod routes;

pub use dto::{
    ChatCompletionRequest, ChatCompletionResponse, MessageDto, StreamFrameDto, StreamMetadataDto,
};
pub use handlers::ChatAppState;
pub use routes::chat_router;
