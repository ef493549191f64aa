pub mod actor;
pub mod metrics;

pub use actor::ACTOR_HEADER;
pub use metrics::metrics_middleware;
