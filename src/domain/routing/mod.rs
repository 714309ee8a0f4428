//! Routing rules: initial model selection and the fallback chain.

mod fallback;
mod router;

pub use fallback::FallbackChain;
pub use router::{Router, RoutingTable};
