//! Failure Classification
//!
//! Maps upstream errors onto the outcomes the router reacts to.

use crate::error::UpstreamError;
use std::time::Duration;

/// How the router should treat a failed backend call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Backend is rate limiting us; put it on cooldown
    RateLimited { retry_after: Option<Duration> },

    /// Backend answered with an error; try the next one
    Transient,

    /// No status to go on (transport failure, empty response)
    Unknown,
}

impl FailureKind {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FailureKind::RateLimited { .. })
    }
}

/// Decides what an upstream error means for backend selection
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &UpstreamError) -> FailureKind;
}

/// Default classifier: only HTTP 429 is a rate limit
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusClassifier;

impl ErrorClassifier for StatusClassifier {
    fn classify(&self, error: &UpstreamError) -> FailureKind {
        match error.status {
            Some(429) => FailureKind::RateLimited {
                retry_after: error.retry_after,
            },
            Some(_) => FailureKind::Transient,
            None => FailureKind::Unknown,
        }
    }
}

/// Opt-in classifier that also treats a 400/403 with a rate-limit or quota
/// message in its body as a rate limit
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl ErrorClassifier for HeuristicClassifier {
    fn classify(&self, error: &UpstreamError) -> FailureKind {
        match error.status {
            Some(status) if is_rate_limit_error(status, &error.message) => {
                FailureKind::RateLimited {
                    retry_after: error.retry_after,
                }
            }
            _ => StatusClassifier.classify(error),
        }
    }
}

/// Detect if a status/body pair indicates a rate limit
pub fn is_rate_limit_error(status: u16, body: &str) -> bool {
    if status == 429 {
        return true;
    }

    // Some providers return 400 or 403 with rate limit messages
    if status != 400 && status != 403 {
        return false;
    }
    let lower_body = body.to_lowercase();
    lower_body.contains("rate limit")
        || lower_body.contains("rate_limit")
        || lower_body.contains("too many requests")
        || lower_body.contains("quota exceeded")
}

/// Parse a Retry-After style value: plain seconds, or "1m30s", "2h", "500ms".
/// Values too large to represent yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let s = value.trim();

    if let Ok(secs) = s.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }

    if let Some(stripped) = s.strip_suffix("ms") {
        return stripped.parse::<u64>().ok().map(Duration::from_millis);
    }

    // Compound form, e.g. "1m30s" or "2h30m"
    if s.contains('h') || (s.contains('m') && s.contains('s')) {
        let mut total_secs = 0u64;
        let mut current_num = String::new();

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_num.push(c);
            } else if !current_num.is_empty() {
                let n = current_num.parse::<u64>().ok()?;
                let secs = match c {
                    'h' => n.checked_mul(3600)?,
                    'm' => n.checked_mul(60)?,
                    's' => n,
                    _ => 0,
                };
                total_secs = total_secs.checked_add(secs)?;
                current_num.clear();
            }
        }

        if total_secs > 0 {
            return Some(Duration::from_secs(total_secs));
        }
    }

    if let Some(stripped) = s.strip_suffix('s') {
        return stripped
            .parse::<f64>()
            .ok()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());
    }
    if let Some(stripped) = s.strip_suffix('m') {
        return stripped
            .parse::<u64>()
            .ok()
            .and_then(|mins| mins.checked_mul(60))
            .map(Duration::from_secs);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_retry_after() {
        assert_eq!(parse_retry_after("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_retry_after("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse_retry_after("1h"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_retry_after("1m30s"), Some(Duration::from_secs(90)));
        assert_eq!(parse_retry_after("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_retry_after("1.5s"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn test_parse_retry_after_rejects_overflow() {
        assert_eq!(parse_retry_after("99999999999999999h"), None);
        assert_eq!(parse_retry_after("99999999999999999999m"), None);
        assert_eq!(parse_retry_after("307445734561825861m"), None);
        assert_eq!(parse_retry_after("1e30s"), None);
        assert_eq!(parse_retry_after("infs"), None);
        assert_eq!(parse_retry_after("-5s"), None);
    }

    #[test]
    fn test_is_rate_limit_error() {
        assert!(is_rate_limit_error(429, ""));
        assert!(is_rate_limit_error(400, "rate limit exceeded"));
        assert!(is_rate_limit_error(403, "Too Many Requests"));
        assert!(!is_rate_limit_error(200, "success"));
        assert!(!is_rate_limit_error(500, "internal error"));
        assert!(!is_rate_limit_error(502, "upstream rate limit proxy down"));
    }

    #[test]
    fn test_status_classifier() {
        let classifier = StatusClassifier;

        let limited = UpstreamError::with_status(429, "slow down").retry_after(Duration::from_secs(7));
        assert_eq!(
            classifier.classify(&limited),
            FailureKind::RateLimited {
                retry_after: Some(Duration::from_secs(7))
            }
        );

        let quota = UpstreamError::with_status(403, "Quota exceeded for today");
        assert_eq!(classifier.classify(&quota), FailureKind::Transient);

        let bad_request = UpstreamError::with_status(400, "rate_limit_exceeded");
        assert_eq!(classifier.classify(&bad_request), FailureKind::Transient);

        let server = UpstreamError::with_status(503, "overloaded");
        assert_eq!(classifier.classify(&server), FailureKind::Transient);

        let empty = UpstreamError::empty_response();
        assert_eq!(classifier.classify(&empty), FailureKind::Unknown);
    }

    #[test]
    fn test_heuristic_classifier() {
        let classifier = HeuristicClassifier;

        let quota = UpstreamError::with_status(403, "Quota exceeded for today")
            .retry_after(Duration::from_secs(45));
        assert_eq!(
            classifier.classify(&quota),
            FailureKind::RateLimited {
                retry_after: Some(Duration::from_secs(45))
            }
        );
        assert!(classifier
            .classify(&UpstreamError::with_status(429, ""))
            .is_rate_limited());

        let forbidden = UpstreamError::with_status(403, "invalid api key");
        assert_eq!(classifier.classify(&forbidden), FailureKind::Transient);
        let proxy = UpstreamError::with_status(502, "rate limit proxy down");
        assert_eq!(classifier.classify(&proxy), FailureKind::Transient);
        assert_eq!(
            classifier.classify(&UpstreamError::transport("reset")),
            FailureKind::Unknown
        );
    }
}
