//! Metric reductions for schema-guided DST.
//!
//! - [`compute_f1`]: F1 / precision / recall from binary predictions
//! - [`average_accuracy`]: mean of per-slot correctness scores
//! - [`joint_accuracy`]: product of per-slot correctness scores
//! - [`goal_accuracy_for_frame`]: average and joint goal accuracy of one frame
//!
//! Empty inputs never divide by zero. F1 follows the DSTC8 convention
//! (no predictions means perfect precision, no labels means perfect recall);
//! the accuracy reductions return [`MetricValue::NotApplicable`].

use super::types::{F1Scores, MetricValue};
use serde::{Deserialize, Serialize};

/// Compute F1 score from binary predictions and labels (ground truth).
///
/// With zero predicted positives precision is 1.0, with zero actual
/// positives recall is 1.0, and F1 is 0.0 when precision + recall is 0.
///
/// # Example
///
/// ```rust
/// use sgd_eval::eval::compute_f1;
///
/// let scores = compute_f1(&[true, true, false], &[true, false, false]);
/// assert!((scores.precision - 0.5).abs() < 1e-9);
/// assert!((scores.recall - 1.0).abs() < 1e-9);
///
/// // Nothing predicted, nothing to find.
/// let scores = compute_f1(&[false, false], &[false, false]);
/// assert_eq!(scores.f1, 1.0);
/// ```
#[must_use]
pub fn compute_f1(predictions: &[bool], labels: &[bool]) -> F1Scores {
    debug_assert_eq!(predictions.len(), labels.len());

    let true_count = labels.iter().filter(|&&l| l).count();
    let positive = predictions.iter().filter(|&&p| p).count();
    let true_positive = predictions
        .iter()
        .zip(labels)
        .filter(|(p, l)| **p && **l)
        .count();

    let precision = if positive > 0 {
        true_positive as f64 / positive as f64
    } else {
        1.0
    };
    let recall = if true_count > 0 {
        true_positive as f64 / true_count as f64
    } else {
        1.0
    };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    F1Scores {
        f1,
        precision,
        recall,
    }
}

/// Arithmetic mean of correctness scores.
#[must_use]
pub fn average_accuracy(scores: &[f64]) -> MetricValue {
    if scores.is_empty() {
        return MetricValue::NotApplicable;
    }
    MetricValue::Value(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Product of correctness scores: 1.0 only if every slot is fully correct.
#[must_use]
pub fn joint_accuracy(scores: &[f64]) -> MetricValue {
    if scores.is_empty() {
        return MetricValue::NotApplicable;
    }
    MetricValue::Value(scores.iter().product())
}

/// Fraction of equal label/prediction pairs.
#[must_use]
pub fn equality_rate<T: PartialEq>(labels: &[T], predictions: &[T]) -> MetricValue {
    debug_assert_eq!(labels.len(), predictions.len());
    if labels.is_empty() {
        return MetricValue::NotApplicable;
    }
    let correct = labels
        .iter()
        .zip(predictions)
        .filter(|(l, p)| l == p)
        .count();
    MetricValue::Value(correct as f64 / labels.len() as f64)
}

/// Correctness of one slot in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlotScore {
    /// Correctness in [0.0, 1.0] (fuzzy for non-categorical slots).
    pub score: f64,
    /// Whether the slot has a value in the reference state.
    pub active: bool,
    /// Whether the slot is categorical.
    pub categorical: bool,
}

impl SlotScore {
    /// Score for a categorical slot.
    #[must_use]
    pub fn categorical(score: f64, active: bool) -> Self {
        Self {
            score,
            active,
            categorical: true,
        }
    }

    /// Score for a non-categorical slot.
    #[must_use]
    pub fn noncategorical(score: f64, active: bool) -> Self {
        Self {
            score,
            active,
            categorical: false,
        }
    }
}

/// Average and joint goal accuracies of a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FrameGoalAccuracy {
    /// Mean correctness over active slots.
    pub average_goal_accuracy: MetricValue,
    /// Mean correctness over active categorical slots.
    pub average_cat_accuracy: MetricValue,
    /// Mean correctness over active non-categorical slots.
    pub average_noncat_accuracy: MetricValue,
    /// Product of correctness over all slots.
    pub joint_goal_accuracy: MetricValue,
    /// Product of correctness over categorical slots.
    pub joint_cat_accuracy: MetricValue,
    /// Product of correctness over non-categorical slots.
    pub joint_noncat_accuracy: MetricValue,
}

/// Average and joint goal accuracies of one frame of a service.
///
/// Averages only count slots that are active in the reference; joint
/// accuracies count every slot of the service, since predicting a value for
/// an inactive slot breaks the joint goal as well.
///
/// # Example
///
/// ```rust
/// use sgd_eval::eval::{goal_accuracy_for_frame, MetricValue, SlotScore};
///
/// let frame = goal_accuracy_for_frame(&[
///     SlotScore::categorical(1.0, true),
///     SlotScore::noncategorical(0.5, true),
///     SlotScore::categorical(1.0, false),
/// ]);
/// assert_eq!(frame.average_goal_accuracy, MetricValue::Value(0.75));
/// assert_eq!(frame.joint_cat_accuracy, MetricValue::Value(1.0));
/// assert_eq!(frame.joint_goal_accuracy, MetricValue::Value(0.5));
/// ```
#[must_use]
pub fn goal_accuracy_for_frame(slots: &[SlotScore]) -> FrameGoalAccuracy {
    let collect = |keep: &dyn Fn(&SlotScore) -> bool| -> Vec<f64> {
        slots.iter().filter(|s| keep(s)).map(|s| s.score).collect()
    };

    FrameGoalAccuracy {
        average_goal_accuracy: average_accuracy(&collect(&|s| s.active)),
        average_cat_accuracy: average_accuracy(&collect(&|s| s.active && s.categorical)),
        average_noncat_accuracy: average_accuracy(&collect(&|s| s.active && !s.categorical)),
        joint_goal_accuracy: joint_accuracy(&collect(&|_| true)),
        joint_cat_accuracy: joint_accuracy(&collect(&|s| s.categorical)),
        joint_noncat_accuracy: joint_accuracy(&collect(&|s| !s.categorical)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f1_all_ones() {
        let ones = vec![true; 5];
        let scores = compute_f1(&ones, &ones);
        assert_eq!(scores.precision, 1.0);
        assert_eq!(scores.recall, 1.0);
        assert_eq!(scores.f1, 1.0);
    }

    #[test]
    fn test_f1_zero_positive_zero_true() {
        let zeros = vec![false; 4];
        let scores = compute_f1(&zeros, &zeros);
        assert_eq!(scores.precision, 1.0);
        assert_eq!(scores.recall, 1.0);
        assert_eq!(scores.f1, 1.0);
    }

    #[test]
    fn test_f1_empty() {
        let scores = compute_f1(&[], &[]);
        assert_eq!(scores.f1, 1.0);
    }

    #[test]
    fn test_f1_all_wrong() {
        let scores = compute_f1(&[true, false], &[false, true]);
        assert_eq!(scores.precision, 0.0);
        assert_eq!(scores.recall, 0.0);
        assert_eq!(scores.f1, 0.0);
    }

    #[test]
    fn test_f1_missed_everything() {
        // No predictions: precision 1.0 by convention, recall 0.0.
        let scores = compute_f1(&[false, false], &[true, false]);
        assert_eq!(scores.precision, 1.0);
        assert_eq!(scores.recall, 0.0);
        assert_eq!(scores.f1, 0.0);
    }

    #[test]
    fn test_f1_mixed() {
        // tp = 2, positive = 3, true = 4
        let preds = [true, true, true, false, false];
        let labels = [true, true, false, true, true];
        let scores = compute_f1(&preds, &labels);
        assert!((scores.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((scores.recall - 0.5).abs() < 1e-9);
        let expected = 2.0 * (2.0 / 3.0) * 0.5 / (2.0 / 3.0 + 0.5);
        assert!((scores.f1 - expected).abs() < 1e-9);
    }

    #[test]
    fn test_average_is_mean() {
        assert_eq!(average_accuracy(&[1.0, 0.0, 0.5, 0.5]), MetricValue::Value(0.5));
        assert_eq!(average_accuracy(&[]), MetricValue::NotApplicable);
    }

    #[test]
    fn test_joint_all_correct() {
        assert_eq!(joint_accuracy(&[1.0; 6]), MetricValue::Value(1.0));
    }

    #[test]
    fn test_joint_single_miss() {
        assert_eq!(joint_accuracy(&[1.0, 1.0, 0.0, 1.0]), MetricValue::Value(0.0));
        assert_eq!(joint_accuracy(&[]), MetricValue::NotApplicable);
    }

    #[test]
    fn test_equality_rate() {
        assert_eq!(equality_rate(&[1, 2, 3, 4], &[1, 2, 0, 0]), MetricValue::Value(0.5));
        assert_eq!(equality_rate::<usize>(&[], &[]), MetricValue::NotApplicable);
    }

    #[test]
    fn test_frame_without_noncat_slots() {
        let frame = goal_accuracy_for_frame(&[
            SlotScore::categorical(1.0, true),
            SlotScore::categorical(0.0, true),
        ]);
        assert_eq!(frame.average_cat_accuracy, MetricValue::Value(0.5));
        assert_eq!(frame.average_noncat_accuracy, MetricValue::NotApplicable);
        assert_eq!(frame.joint_noncat_accuracy, MetricValue::NotApplicable);
        assert_eq!(frame.joint_goal_accuracy, MetricValue::Value(0.0));
    }

    #[test]
    fn test_frame_inactive_slots_excluded_from_average() {
        let frame = goal_accuracy_for_frame(&[
            SlotScore::noncategorical(0.0, false),
            SlotScore::noncategorical(1.0, true),
        ]);
        assert_eq!(frame.average_noncat_accuracy, MetricValue::Value(1.0));
        assert_eq!(frame.joint_noncat_accuracy, MetricValue::Value(0.0));
    }

    #[test]
    fn test_frame_empty() {
        assert_eq!(goal_accuracy_for_frame(&[]), FrameGoalAccuracy::default());
    }
}
