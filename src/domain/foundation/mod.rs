//! Foundation value objects shared across the domain.

mod cost;
mod errors;
mod model_id;
mod timestamp;
mod token_count;

pub use cost::CostAmount;
pub use errors::{GatewayError, ValidationError};
pub use model_id::ModelId;
pub use timestamp::Timestamp;
pub use token_count::TokenCount;
