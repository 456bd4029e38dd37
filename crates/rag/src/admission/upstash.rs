//! Upstash Redis REST counter store.
//!
//! The whole check runs as one Lua script on the server, so concurrent
//! requests from any number of instances see a consistent count.
//!
//! Algorithm: two fixed buckets (`{prefix}:{identifier}:{n}` with
//! `n = now / window`). The previous bucket's count is weighted by the part
//! of it still inside the trailing window.

use super::{RateLimitPolicy, RateLimiter};
use crate::types::RateLimitDecision;
use grounded_core::config::RateLimitSettings;
use grounded_core::{AppError, AppResult};
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns -1 when denied, otherwise the remaining quota.
///
/// The current bucket is incremented before the comparison, so a denied
/// check still takes a slot.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local currentKey  = KEYS[1]
local previousKey = KEYS[2]
local tokens      = tonumber(ARGV[1])
local now         = tonumber(ARGV[2])
local window      = tonumber(ARGV[3])
local incrementBy = tonumber(ARGV[4])

local requestsInPreviousWindow = redis.call("GET", previousKey)
if requestsInPreviousWindow == false then
  requestsInPreviousWindow = 0
end

local requestsInCurrentWindow = redis.call("INCRBY", currentKey, incrementBy)
if requestsInCurrentWindow == incrementBy then
  redis.call("PEXPIRE", currentKey, window * 2 + 1000)
end

local percentageInCurrent = (now % window) / window
requestsInPreviousWindow = math.floor((1 - percentageInCurrent) * requestsInPreviousWindow)
if requestsInPreviousWindow + requestsInCurrentWindow > tokens then
  return -1
end
return tokens - (requestsInCurrentWindow + requestsInPreviousWindow)
"#;

/// Upstash REST response: exactly one of `result` / `error` is set.
#[derive(Debug, Deserialize)]
struct RestResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Sliding-window limiter backed by Upstash Redis.
#[derive(Debug)]
pub struct UpstashRateLimiter {
    client: reqwest::Client,
    url: String,
    token: String,
    prefix: String,
    policy: RateLimitPolicy,
}

impl UpstashRateLimiter {
    pub fn new(
        url: impl Into<String>,
        token: impl Into<String>,
        prefix: impl Into<String>,
        policy: RateLimitPolicy,
        timeout: Option<Duration>,
    ) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::RateLimit(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            prefix: prefix.into(),
            policy,
        })
    }

    /// Build from the `rateLimit` configuration section.
    pub fn from_settings(settings: &RateLimitSettings) -> AppResult<Self> {
        let url = settings.url.clone().ok_or_else(|| {
            AppError::Config(format!(
                "Rate limit store URL not set ({})",
                settings.url_env
            ))
        })?;
        let token = settings.token.clone().ok_or_else(|| {
            AppError::Config(format!(
                "Rate limit token not found in environment variable: {}",
                settings.token_env
            ))
        })?;

        Self::new(
            url,
            token,
            settings.prefix.clone(),
            RateLimitPolicy::from_settings(settings),
            settings.timeout_secs.map(Duration::from_secs),
        )
    }

    fn window_ms(&self) -> u64 {
        self.policy.window.as_millis().max(1) as u64
    }

    /// Current and previous bucket keys at `now_ms`.
    fn bucket_keys(&self, identifier: &str, now_ms: u64) -> (String, String) {
        let bucket = now_ms / self.window_ms();
        (
            format!("{}:{}:{}", self.prefix, identifier, bucket),
            format!("{}:{}:{}", self.prefix, identifier, bucket.saturating_sub(1)),
        )
    }

    /// Redis command array for one check.
    fn eval_command(&self, identifier: &str, now_ms: u64) -> serde_json::Value {
        let (current, previous) = self.bucket_keys(identifier, now_ms);
        serde_json::json!([
            "EVAL",
            SLIDING_WINDOW_SCRIPT,
            "2",
            current,
            previous,
            self.policy.limit.to_string(),
            now_ms.to_string(),
            self.window_ms().to_string(),
            "1"
        ])
    }

    fn decision_from(response: RestResponse) -> AppResult<RateLimitDecision> {
        if let Some(error) = response.error {
            return Err(AppError::RateLimit(error));
        }

        let remaining = response
            .result
            .as_ref()
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| {
                AppError::RateLimit(format!(
                    "Unexpected rate limit script result: {:?}",
                    response.result
                ))
            })?;

        if remaining < 0 {
            Ok(RateLimitDecision::denied())
        } else {
            Ok(RateLimitDecision::allowed(remaining))
        }
    }
}

#[async_trait::async_trait]
impl RateLimiter for UpstashRateLimiter {
    fn backend_name(&self) -> &str {
        "upstash"
    }

    async fn limit(&self, identifier: &str) -> AppResult<RateLimitDecision> {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::RateLimit(format!("System clock before epoch: {}", e)))?
            .as_millis() as u64;

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&self.eval_command(identifier, now_ms))
            .send()
            .await
            .map_err(|e| AppError::RateLimit(format!("Failed to reach rate limit store: {}", e)))?;

        let status = response.status();
        let body: RestResponse = response.json().await.map_err(|e| {
            AppError::RateLimit(format!(
                "Failed to parse rate limit response ({}): {}",
                status, e
            ))
        })?;

        Self::decision_from(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> UpstashRateLimiter {
        UpstashRateLimiter::new(
            "https://eu1-example.upstash.io/",
            "token",
            "@upstash/ratelimit",
            RateLimitPolicy::default(),
            None,
        )
        .unwrap()
    }

    fn response(json: &str) -> RestResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_url_trailing_slash_trimmed() {
        assert_eq!(limiter().url, "https://eu1-example.upstash.io");
    }

    #[test]
    fn test_bucket_keys() {
        let (current, previous) = limiter().bucket_keys("api", 1_700_000_012_345);
        assert_eq!(current, "@upstash/ratelimit:api:170000001");
        assert_eq!(previous, "@upstash/ratelimit:api:170000000");
    }

    #[test]
    fn test_eval_command_arguments() {
        let command = limiter().eval_command("api", 25_000);
        let args = command.as_array().unwrap();

        assert_eq!(args[0], "EVAL");
        assert_eq!(args[2], "2");
        assert_eq!(args[3], "@upstash/ratelimit:api:2");
        assert_eq!(args[4], "@upstash/ratelimit:api:1");
        assert_eq!(args[5], "3");
        assert_eq!(args[6], "25000");
        assert_eq!(args[7], "10000");
        assert_eq!(args[8], "1");
    }

    #[test]
    fn test_decision_allowed() {
        let decision = UpstashRateLimiter::decision_from(response(r#"{"result": 2}"#)).unwrap();
        assert_eq!(decision, RateLimitDecision::allowed(2));
    }

    #[test]
    fn test_decision_denied() {
        let decision = UpstashRateLimiter::decision_from(response(r#"{"result": -1}"#)).unwrap();
        assert!(!decision.allowed);
    }

    #[test]
    fn test_store_error() {
        let err = UpstashRateLimiter::decision_from(response(
            r#"{"error": "WRONGPASS invalid password"}"#,
        ))
        .unwrap_err();
        assert!(matches!(err, AppError::RateLimit(ref m) if m.contains("WRONGPASS")));
    }

    #[test]
    fn test_unexpected_result() {
        let result = UpstashRateLimiter::decision_from(response(r#"{"result": "OK"}"#));
        assert!(result.is_err());
    }

    #[test]
    fn test_script_counts_denied_checks() {
        // The slot is taken before the deny branch can return
        let incr = SLIDING_WINDOW_SCRIPT.find("INCRBY").unwrap();
        let deny = SLIDING_WINDOW_SCRIPT.find("return -1").unwrap();
        assert!(incr < deny);
        assert_eq!(SLIDING_WINDOW_SCRIPT.matches("INCRBY").count(), 1);
        // Fourth increment in a fresh window is the first one over the limit
        assert!(SLIDING_WINDOW_SCRIPT.contains("requestsInCurrentWindow > tokens"));
    }

    #[test]
    fn test_from_settings_with_timeout() {
        let settings = RateLimitSettings {
            url: Some("https://eu1-example.upstash.io".to_string()),
            token: Some("token".to_string()),
            timeout_secs: Some(3),
            ..Default::default()
        };
        let limiter = UpstashRateLimiter::from_settings(&settings).unwrap();
        assert_eq!(limiter.backend_name(), "upstash");
    }

    #[test]
    fn test_from_settings_requires_token() {
        let settings = RateLimitSettings {
            url: Some("https://eu1-example.upstash.io".to_string()),
            ..Default::default()
        };
        assert!(UpstashRateLimiter::from_settings(&settings).is_err());
    }
}
