//! Router-wide middleware
//!
//! Route-level authentication lives in [`crate::auth::middleware`].

pub mod metrics;

pub use metrics::{metrics_middleware, AuthMetrics};
