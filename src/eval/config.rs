//! Evaluator configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Probability above which a requested slot counts as predicted.
pub const REQ_SLOT_THRESHOLD: f64 = 0.5;

/// Configuration for [`SgdEvaluator`](super::SgdEvaluator).
///
/// # Example
///
/// ```rust
/// use sgd_eval::eval::EvalConfig;
///
/// let config = EvalConfig::new()
///     .with_per_service(true)
///     .with_seen_services(["Restaurants_1", "Hotels_2"]);
/// assert!(config.is_seen("Hotels_2"));
/// assert!(!config.is_seen("Flights_3"));
///
/// let json = r#"{ "req_slot_threshold": 0.6 }"#;
/// let loaded: EvalConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(loaded.req_slot_threshold, 0.6);
/// assert!(!loaded.per_service);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Sigmoid probability threshold for requested slots (default: 0.5).
    pub req_slot_threshold: f64,
    /// Report one group per service in addition to `#ALL_SERVICES`.
    pub per_service: bool,
    /// Services seen during training. When set, turns are also grouped
    /// under `#SEEN_SERVICES` / `#UNSEEN_SERVICES`.
    pub seen_services: Option<BTreeSet<String>>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            req_slot_threshold: REQ_SLOT_THRESHOLD,
            per_service: false,
            seen_services: None,
        }
    }
}

impl EvalConfig {
    /// Create a new configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the requested-slot threshold.
    pub fn with_req_slot_threshold(mut self, threshold: f64) -> Self {
        self.req_slot_threshold = threshold;
        self
    }

    /// Enable or disable per-service groups.
    pub fn with_per_service(mut self, per_service: bool) -> Self {
        self.per_service = per_service;
        self
    }

    /// Set the services seen during training.
    pub fn with_seen_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seen_services = Some(services.into_iter().map(Into::into).collect());
        self
    }

    /// Whether `service` was seen during training.
    ///
    /// Always false when no seen set is configured.
    pub fn is_seen(&self, service: &str) -> bool {
        self.seen_services
            .as_ref()
            .is_some_and(|seen| seen.contains(service))
    }
}
