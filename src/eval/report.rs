//! Epoch summary report.
//!
//! [`EvalSummary`] maps a service-group name (`#ALL_SERVICES`,
//! `#SEEN_SERVICES`, `#UNSEEN_SERVICES`, or a service name) to the
//! [`GroupMetrics`] of that group. Serialized with serde it is a plain nested
//! object, which is what experiment trackers expect:
//!
//! ```json
//! {
//!   "#ALL_SERVICES": {
//!     "active_intent_accuracy": 0.95,
//!     "requested_slots_f1": 0.97,
//!     "average_noncat_accuracy": "NA",
//!     ...
//!   }
//! }
//! ```

use super::accumulator::ALL_SERVICES;
use super::types::MetricValue;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Active intent accuracy.
pub const ACTIVE_INTENT_ACCURACY: &str = "active_intent_accuracy";
/// Requested slots F1.
pub const REQUESTED_SLOTS_F1: &str = "requested_slots_f1";
/// Requested slots precision.
pub const REQUESTED_SLOTS_PRECISION: &str = "requested_slots_precision";
/// Requested slots recall.
pub const REQUESTED_SLOTS_RECALL: &str = "requested_slots_recall";
/// Average goal accuracy.
pub const AVERAGE_GOAL_ACCURACY: &str = "average_goal_accuracy";
/// Average categorical accuracy.
pub const AVERAGE_CAT_ACCURACY: &str = "average_cat_accuracy";
/// Average non-categorical accuracy.
pub const AVERAGE_NONCAT_ACCURACY: &str = "average_noncat_accuracy";
/// Joint goal accuracy.
pub const JOINT_GOAL_ACCURACY: &str = "joint_goal_accuracy";
/// Joint categorical accuracy.
pub const JOINT_CAT_ACCURACY: &str = "joint_cat_accuracy";
/// Joint non-categorical accuracy.
pub const JOINT_NONCAT_ACCURACY: &str = "joint_noncat_accuracy";

/// Summary metrics of one service group.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupMetrics {
    /// Fraction of turns with an active intent whose intent was predicted.
    pub active_intent_accuracy: MetricValue,
    /// F1 of requested-slot detection.
    pub requested_slots_f1: MetricValue,
    /// Precision of requested-slot detection.
    pub requested_slots_precision: MetricValue,
    /// Recall of requested-slot detection.
    pub requested_slots_recall: MetricValue,
    /// Mean correctness over categorical slots.
    pub average_cat_accuracy: MetricValue,
    /// Mean correctness over non-categorical slots.
    pub average_noncat_accuracy: MetricValue,
    /// Mean correctness over all slots.
    pub average_goal_accuracy: MetricValue,
    /// Fraction of turns with every categorical slot correct.
    pub joint_cat_accuracy: MetricValue,
    /// Mean per-turn product over non-categorical slots.
    pub joint_noncat_accuracy: MetricValue,
    /// Mean per-turn product over all slots.
    pub joint_goal_accuracy: MetricValue,
}

impl GroupMetrics {
    /// All metrics as `(name, value)` pairs, in report order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, MetricValue)> {
        [
            (ACTIVE_INTENT_ACCURACY, self.active_intent_accuracy),
            (REQUESTED_SLOTS_F1, self.requested_slots_f1),
            (REQUESTED_SLOTS_PRECISION, self.requested_slots_precision),
            (REQUESTED_SLOTS_RECALL, self.requested_slots_recall),
            (AVERAGE_CAT_ACCURACY, self.average_cat_accuracy),
            (AVERAGE_NONCAT_ACCURACY, self.average_noncat_accuracy),
            (AVERAGE_GOAL_ACCURACY, self.average_goal_accuracy),
            (JOINT_CAT_ACCURACY, self.joint_cat_accuracy),
            (JOINT_NONCAT_ACCURACY, self.joint_noncat_accuracy),
            (JOINT_GOAL_ACCURACY, self.joint_goal_accuracy),
        ]
        .into_iter()
    }

    /// Look a metric up by name.
    pub fn get(&self, name: &str) -> Option<MetricValue> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// Names of metrics that could not be computed.
    pub fn not_applicable(&self) -> Vec<&'static str> {
        self.iter()
            .filter(|(_, v)| !v.is_applicable())
            .map(|(n, _)| n)
            .collect()
    }
}

impl fmt::Display for GroupMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.iter() {
            writeln!(f, "  {:<28} {}", name, value)?;
        }
        Ok(())
    }
}

/// Summary of one evaluation epoch, keyed by service group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvalSummary {
    groups: BTreeMap<String, GroupMetrics>,
}

impl EvalSummary {
    /// Build a summary from per-group metrics.
    pub fn new(groups: BTreeMap<String, GroupMetrics>) -> Self {
        Self { groups }
    }

    /// Metrics of one group.
    pub fn get(&self, group: &str) -> Option<&GroupMetrics> {
        self.groups.get(group)
    }

    /// Metrics over every evaluated turn.
    ///
    /// All metrics are not applicable when nothing was evaluated.
    pub fn all_services(&self) -> GroupMetrics {
        self.groups.get(ALL_SERVICES).copied().unwrap_or_default()
    }

    /// Group names, in order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Groups and their metrics, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GroupMetrics)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the summary has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for EvalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (group, metrics) in self.iter() {
            writeln!(f, "{}", group)?;
            write!(f, "{}", metrics)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GroupMetrics {
        GroupMetrics {
            active_intent_accuracy: MetricValue::Value(0.9),
            requested_slots_f1: MetricValue::Value(1.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_get_by_name() {
        let metrics = sample();
        assert_eq!(metrics.get(ACTIVE_INTENT_ACCURACY), Some(MetricValue::Value(0.9)));
        assert_eq!(metrics.get(JOINT_GOAL_ACCURACY), Some(MetricValue::NotApplicable));
        assert_eq!(metrics.get("slot_tagging_f1"), None);
    }

    #[test]
    fn test_iter_covers_all_metrics() {
        assert_eq!(sample().iter().count(), 10);
        assert_eq!(sample().not_applicable().len(), 8);
    }

    #[test]
    fn test_summary_json_shape() {
        let mut groups = BTreeMap::new();
        groups.insert(ALL_SERVICES.to_string(), sample());
        let summary = EvalSummary::new(groups);

        let value: serde_json::Value = serde_json::from_str(&summary.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value[ALL_SERVICES][ACTIVE_INTENT_ACCURACY], 0.9);
        assert_eq!(value[ALL_SERVICES][JOINT_GOAL_ACCURACY], "NA");

        let back: EvalSummary = serde_json::from_value(value).unwrap();
        assert_eq!(back, summary);
    }

    #[test]
    fn test_missing_all_services() {
        let summary = EvalSummary::default();
        assert!(summary.is_empty());
        assert!(summary.all_services().not_applicable().len() == 10);
    }

    #[test]
    fn test_display() {
        let mut groups = BTreeMap::new();
        groups.insert(ALL_SERVICES.to_string(), sample());
        let text = EvalSummary::new(groups).to_string();
        assert!(text.starts_with(ALL_SERVICES));
        assert!(text.contains("active_intent_accuracy"));
        assert!(text.contains("0.9000"));
        assert!(text.contains("NA"));
    }
}
