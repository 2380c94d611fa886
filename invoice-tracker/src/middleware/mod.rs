pub mod metrics;
pub mod owner;

pub use metrics::metrics_middleware;
pub use owner::{OwnerContext, OWNER_ID_HEADER};
