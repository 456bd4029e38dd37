//! In-process sliding-window counter.
//!
//! Stands in for the external counter store when running a single instance
//! locally. Keeps a timestamp log per identifier.

use super::{RateLimitPolicy, RateLimiter};
use crate::types::RateLimitDecision;
use grounded_core::AppResult;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Exact sliding log: a check is admitted when fewer than `limit` checks
/// happened in the trailing `window`.
///
/// Every check is logged, admitted or not, so a caller that keeps hammering a
/// full window stays locked out until it backs off.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    policy: RateLimitPolicy,
    log: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            log: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl RateLimiter for SlidingWindowLimiter {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn limit(&self, identifier: &str) -> AppResult<RateLimitDecision> {
        let now = Instant::now();
        let mut log = self.log.lock().await;
        let entries = log.entry(identifier.to_string()).or_default();

        while let Some(oldest) = entries.front() {
            if now.duration_since(*oldest) >= self.policy.window {
                entries.pop_front();
            } else {
                break;
            }
        }

        let in_window = entries.len() as i64;
        entries.push_back(now);

        let limit = i64::from(self.policy.limit);
        if in_window < limit {
            Ok(RateLimitDecision::allowed(limit - in_window - 1))
        } else {
            Ok(RateLimitDecision::denied())
        }
    }
}
