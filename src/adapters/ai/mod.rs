//! Upstream provider adapters.

mod mock_provider;
mod open_router;

pub use mock_provider::{MockChatProvider, ScriptedOutcome};
pub use open_router::{OpenRouterConfig, OpenRouterProvider};
