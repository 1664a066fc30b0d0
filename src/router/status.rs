//! Router Status
//!
//! Read-only availability snapshot for health and monitoring endpoints.

use crate::router::backend::Backend;
use crate::router::ledger::RateLimitLedger;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Availability of a single backend
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub name: String,
    pub label: String,
    pub available: bool,

    /// Seconds until the cooldown ends (rounded up)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_remaining_secs: Option<u64>,

    /// Wall-clock time the cooldown ends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_at: Option<DateTime<Utc>>,
}

/// Snapshot of the whole router
#[derive(Debug, Clone, Serialize)]
pub struct RouterStatus {
    pub backends: Vec<BackendStatus>,
    pub available_backends: usize,
    pub total_backends: usize,

    /// Earliest moment a cooling backend becomes available again
    pub next_reset: Option<DateTime<Utc>>,
    pub next_reset_minutes: Option<u64>,

    pub last_successful: Option<String>,
}

impl RouterStatus {
    pub(crate) fn capture(
        backends: &[Backend],
        ledger: &RateLimitLedger,
        last_successful: Option<&str>,
    ) -> Self {
        let now = Utc::now();

        let backends: Vec<BackendStatus> = backends
            .iter()
            .map(|backend| {
                let remaining = ledger.remaining(&backend.name);
                BackendStatus {
                    name: backend.name.clone(),
                    label: backend.label.clone(),
                    available: remaining.is_none(),
                    cooldown_remaining_secs: remaining.map(ceil_secs),
                    available_at: remaining.and_then(|r| wall_clock(now, r)),
                }
            })
            .collect();

        let next = ledger.next_expiry().map(|(_, remaining)| remaining);

        Self {
            available_backends: backends.iter().filter(|b| b.available).count(),
            total_backends: backends.len(),
            backends,
            next_reset: next.and_then(|r| wall_clock(now, r)),
            next_reset_minutes: next.map(ceil_minutes),
            last_successful: last_successful.map(str::to_string),
        }
    }

    /// Whether every backend is cooling down
    pub fn all_cooling(&self) -> bool {
        self.available_backends == 0
    }
}

fn wall_clock(now: DateTime<Utc>, remaining: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(remaining)
        .ok()
        .map(|delta| now + delta)
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_millis().div_ceil(1000) as u64
}

fn ceil_minutes(d: Duration) -> u64 {
    d.as_millis().div_ceil(60_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backends() -> Vec<Backend> {
        vec![
            Backend::new("a", Duration::from_secs(60), "A"),
            Backend::new("b", Duration::from_secs(120), "B"),
            Backend::new("c", Duration::from_secs(180), "C"),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_counts_and_next_reset() {
        let mut ledger = RateLimitLedger::new();
        ledger.record("b", Duration::from_secs(120));
        ledger.record("c", Duration::from_secs(90));

        let status = RouterStatus::capture(&backends(), &ledger, Some("a"));

        assert_eq!(status.total_backends, 3);
        assert_eq!(status.available_backends, 1);
        assert!(!status.all_cooling());
        assert_eq!(status.next_reset_minutes, Some(2));
        assert!(status.next_reset.is_some());
        assert_eq!(status.last_successful.as_deref(), Some("a"));

        assert!(status.backends[0].available);
        assert_eq!(status.backends[1].cooldown_remaining_secs, Some(120));
        assert_eq!(status.backends[2].cooldown_remaining_secs, Some(90));
        assert!(status.backends[2].available_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_all_available() {
        let status = RouterStatus::capture(&backends(), &RateLimitLedger::new(), None);

        assert_eq!(status.available_backends, 3);
        assert_eq!(status.next_reset, None);
        assert_eq!(status.next_reset_minutes, None);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["total_backends"], 3);
        assert!(json["backends"][0].get("available_at").is_none());
        assert!(json["last_successful"].is_null());
    }
}
