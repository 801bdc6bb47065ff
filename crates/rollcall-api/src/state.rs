//! Application state management

use crate::auth::AuthSessionManager;
use crate::middleware::metrics::AuthMetrics;
use rollcall_core::config::AppConfig;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Request counter
    pub request_count: AtomicU64,
    /// Login, logout and per-request authorization
    pub auth: Arc<AuthSessionManager>,
    /// Authorization outcome counters
    pub metrics: AuthMetrics,
}

impl AppState {
    pub fn new(config: AppConfig, auth: Arc<AuthSessionManager>) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
            auth,
            metrics: AuthMetrics::default(),
        }
    }

    /// Increment request counter
    pub fn increment_requests(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Get total request count
    pub fn get_request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
