//! Rate Limit Ledger
//!
//! Records which backends are cooling down after a rate limit, and until when.
//! Expired entries are only dropped by [`RateLimitLedger::sweep`]; every query
//! still compares against the clock, so a stale entry never blocks a backend.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Longest cooldown the ledger will hold; longer requests are clamped
pub const MAX_COOLDOWN: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Default)]
pub struct RateLimitLedger {
    /// Backend name -> instant its cooldown ends
    entries: HashMap<String, Instant>,
}

impl RateLimitLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a cooldown for `name`, returning the duration applied
    pub fn record(&mut self, name: &str, duration: Duration) -> Duration {
        let applied = duration.min(MAX_COOLDOWN);
        let now = Instant::now();
        let until = now.checked_add(applied).unwrap_or(now);
        self.entries.insert(name.to_string(), until);
        applied
    }

    /// Drop the cooldown for `name`, if any
    pub fn clear(&mut self, name: &str) {
        self.entries.remove(name);
    }

    /// Remove every entry whose expiry has passed; returns the freed names
    pub fn sweep(&mut self) -> Vec<String> {
        let now = Instant::now();
        let mut freed: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, until)| now >= **until)
            .map(|(name, _)| name.clone())
            .collect();

        for name in &freed {
            self.entries.remove(name);
        }

        freed.sort();
        freed
    }

    /// Check if `name` is currently cooling down
    pub fn is_cooling(&self, name: &str) -> bool {
        self.remaining(name).is_some()
    }

    /// Time left on the cooldown for `name`
    pub fn remaining(&self, name: &str) -> Option<Duration> {
        let until = *self.entries.get(name)?;
        let now = Instant::now();
        if now < until {
            Some(until - now)
        } else {
            None
        }
    }

    /// Earliest upcoming expiry across all live entries
    pub fn next_expiry(&self) -> Option<(&str, Duration)> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|(_, until)| now < **until)
            .min_by_key(|(_, until)| **until)
            .map(|(name, until)| (name.as_str(), *until - now))
    }

    /// Number of entries still held, expired or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_record_and_expire() {
        let mut ledger = RateLimitLedger::new();
        ledger.record("a", Duration::from_secs(60));

        assert!(ledger.is_cooling("a"));
        assert!(!ledger.is_cooling("b"));
        assert_eq!(ledger.remaining("a"), Some(Duration::from_secs(60)));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(ledger.sweep().is_empty());
        assert!(ledger.is_cooling("a"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!ledger.is_cooling("a"));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.sweep(), vec!["a".to_string()]);
        assert!(ledger.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_expiry_picks_earliest() {
        let mut ledger = RateLimitLedger::new();
        assert!(ledger.next_expiry().is_none());

        ledger.record("slow", Duration::from_secs(180));
        ledger.record("fast", Duration::from_secs(60));

        let (name, remaining) = ledger.next_expiry().unwrap();
        assert_eq!(name, "fast");
        assert_eq!(remaining, Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(90)).await;
        let (name, remaining) = ledger.next_expiry().unwrap();
        assert_eq!(name, "slow");
        assert_eq!(remaining, Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_clamps_huge_durations() {
        let mut ledger = RateLimitLedger::new();

        assert_eq!(ledger.record("a", Duration::from_secs(u64::MAX)), MAX_COOLDOWN);
        assert_eq!(ledger.record("b", Duration::MAX), MAX_COOLDOWN);
        assert_eq!(ledger.remaining("a"), Some(MAX_COOLDOWN));

        tokio::time::advance(MAX_COOLDOWN).await;
        assert_eq!(ledger.sweep(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_replaces_and_clear_removes() {
        let mut ledger = RateLimitLedger::new();
        ledger.record("a", Duration::from_secs(10));
        ledger.record("a", Duration::from_secs(30));
        assert_eq!(ledger.remaining("a"), Some(Duration::from_secs(30)));

        ledger.clear("a");
        assert!(!ledger.is_cooling("a"));
        assert!(ledger.is_empty());
    }
}
