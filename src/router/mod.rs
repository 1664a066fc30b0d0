//! Router Module
//!
//! Backend selection, cooldown tracking and failure classification.

pub mod backend;
pub mod classify;
pub mod fallback;
pub mod ledger;
pub mod status;

pub use backend::Backend;
pub use classify::{ErrorClassifier, FailureKind, HeuristicClassifier, StatusClassifier};
pub use fallback::{ModelRouter, RequestOptions};
pub use ledger::{RateLimitLedger, MAX_COOLDOWN};
pub use status::{BackendStatus, RouterStatus};
