//! Admission control.
//!
//! A single sliding-window counter gates every request. The counter lives
//! behind [`RateLimiter`] so the bucket store and the bucket identifier can
//! change without touching the pipeline.

pub mod memory;
pub mod upstash;

pub use memory::SlidingWindowLimiter;
pub use upstash::UpstashRateLimiter;

use crate::types::RateLimitDecision;
use grounded_core::config::RateLimitSettings;
use grounded_core::AppResult;
use std::sync::Arc;
use std::time::Duration;

/// Sliding-window policy: at most `limit` admissions per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub limit: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            limit: 3,
            window: Duration::from_secs(10),
        }
    }
}

impl RateLimitPolicy {
    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self {
            limit: settings.limit,
            window: Duration::from_secs(settings.window_secs),
        }
    }
}

/// Atomic counter store for sliding-window admission.
///
/// Implementations must be safe under concurrent calls for the same
/// identifier; the pipeline does no locking of its own.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    /// Backend name for logs (e.g., "upstash", "memory").
    fn backend_name(&self) -> &str;

    /// Consume one slot for `identifier` and report whether the call is admitted.
    async fn limit(&self, identifier: &str) -> AppResult<RateLimitDecision>;
}

/// Gate in front of the pipeline, bound to one bucket identifier.
#[derive(Clone)]
pub struct AdmissionController {
    limiter: Arc<dyn RateLimiter>,
    identifier: String,
}

impl AdmissionController {
    pub fn new(limiter: Arc<dyn RateLimiter>, identifier: impl Into<String>) -> Self {
        Self {
            limiter,
            identifier: identifier.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Check the shared window. `Ok(false)` means the request must be rejected.
    pub async fn admit(&self) -> AppResult<bool> {
        let decision = self.limiter.limit(&self.identifier).await?;

        tracing::debug!(
            backend = self.limiter.backend_name(),
            identifier = %self.identifier,
            allowed = decision.allowed,
            remaining = ?decision.remaining,
            "Admission decision"
        );

        Ok(decision.allowed)
    }
}
