//! Per-batch scoring and the epoch-scoped accumulator.
//!
//! Every turn of a batch is reduced to a [`TurnScores`]: the intent pair,
//! the requested-slot pairs, and one correctness score per real
//! (non-padding) categorical and non-categorical slot. Turn scores are then
//! appended to every service group the turn belongs to.
//!
//! # Slot correctness
//!
//! ```text
//!   status label == status prediction ?
//!        │no                    │yes
//!        ▼                      ▼
//!       0.0             label == ACTIVE ?
//!                        │no          │yes
//!                        ▼            ▼
//!                       1.0     categorical:     value label == value prediction
//!                               non-categorical: fuzzy(label span, predicted span)
//! ```

use super::metrics::{average_accuracy, compute_f1, equality_rate, joint_accuracy};
use super::report::GroupMetrics;
use super::types::{MetricValue, SlotStatus};
use crate::batch::{argmax, masked_argmax, sigmoid, EvalBatch};
use crate::offset::TextSpan;
use crate::similarity::StringSimilarity;
use crate::{Error, Result};
use ndarray::ArrayView1;
use std::collections::BTreeMap;

/// Group that every turn contributes to.
pub const ALL_SERVICES: &str = "#ALL_SERVICES";
/// Group of turns whose service was seen in training.
pub const SEEN_SERVICES: &str = "#SEEN_SERVICES";
/// Group of turns whose service was not seen in training.
pub const UNSEEN_SERVICES: &str = "#UNSEEN_SERVICES";

/// Scores extracted from a single dialogue turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnScores {
    /// `(label, prediction)` of the active intent, if the turn has one.
    /// Index 0 is the NONE intent.
    pub intent: Option<(usize, usize)>,
    /// `(prediction, label)` for every unpadded requested slot.
    pub requested_slots: Vec<(bool, bool)>,
    /// Correctness of every real categorical slot.
    pub cat_slot_correctness: Vec<f64>,
    /// Correctness of every real non-categorical slot.
    pub noncat_slot_correctness: Vec<f64>,
}

impl TurnScores {
    /// Product over this turn's categorical slots.
    pub fn joint_cat(&self) -> Option<f64> {
        joint_accuracy(&self.cat_slot_correctness).get()
    }

    /// Product over this turn's non-categorical slots.
    pub fn joint_noncat(&self) -> Option<f64> {
        joint_accuracy(&self.noncat_slot_correctness).get()
    }

    /// Product over all of this turn's slots.
    pub fn joint_goal(&self) -> Option<f64> {
        match (self.joint_cat(), self.joint_noncat()) {
            (Some(c), Some(n)) => Some(c * n),
            (c, n) => c.or(n),
        }
    }
}

/// Accumulated lists for one service group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupAccumulator {
    /// Active intent labels.
    pub active_intent_labels: Vec<usize>,
    /// Active intent predictions.
    pub active_intent_preds: Vec<usize>,
    /// Requested-slot predictions.
    pub req_slot_predictions: Vec<bool>,
    /// Requested-slot labels.
    pub requested_slot_status: Vec<bool>,
    /// Per-slot categorical correctness.
    pub cat_slot_correctness: Vec<f64>,
    /// Per-slot non-categorical correctness.
    pub noncat_slot_correctness: Vec<f64>,
    /// Per-turn categorical joint accuracy.
    pub joint_cat_accuracy: Vec<f64>,
    /// Per-turn non-categorical joint accuracy.
    pub joint_noncat_accuracy: Vec<f64>,
    /// Per-turn joint goal accuracy.
    pub joint_goal_accuracy: Vec<f64>,
}

impl GroupAccumulator {
    /// Append one turn.
    pub fn push(&mut self, turn: &TurnScores) {
        if let Some((label, pred)) = turn.intent {
            self.active_intent_labels.push(label);
            self.active_intent_preds.push(pred);
        }
        for &(pred, label) in &turn.requested_slots {
            self.req_slot_predictions.push(pred);
            self.requested_slot_status.push(label);
        }
        self.cat_slot_correctness
            .extend_from_slice(&turn.cat_slot_correctness);
        self.noncat_slot_correctness
            .extend_from_slice(&turn.noncat_slot_correctness);

        if let Some(joint) = turn.joint_cat() {
            self.joint_cat_accuracy.push(joint);
        }
        if let Some(joint) = turn.joint_noncat() {
            self.joint_noncat_accuracy.push(joint);
        }
        if let Some(joint) = turn.joint_goal() {
            self.joint_goal_accuracy.push(joint);
        }
    }

    /// Number of turns that contributed a joint goal score.
    pub fn num_turns(&self) -> usize {
        self.joint_goal_accuracy.len()
    }

    /// Reduce the lists to summary metrics.
    pub fn summarize(&self) -> GroupMetrics {
        let goal: Vec<f64> = self
            .cat_slot_correctness
            .iter()
            .chain(&self.noncat_slot_correctness)
            .copied()
            .collect();

        let (f1, precision, recall): (MetricValue, MetricValue, MetricValue) =
            if self.req_slot_predictions.is_empty() {
                Default::default()
            } else {
                let scores = compute_f1(&self.req_slot_predictions, &self.requested_slot_status);
                (
                    scores.f1.into(),
                    scores.precision.into(),
                    scores.recall.into(),
                )
            };

        GroupMetrics {
            active_intent_accuracy: equality_rate(
                &self.active_intent_labels,
                &self.active_intent_preds,
            ),
            requested_slots_f1: f1,
            requested_slots_precision: precision,
            requested_slots_recall: recall,
            average_cat_accuracy: average_accuracy(&self.cat_slot_correctness),
            average_noncat_accuracy: average_accuracy(&self.noncat_slot_correctness),
            average_goal_accuracy: average_accuracy(&goal),
            joint_cat_accuracy: average_accuracy(&self.joint_cat_accuracy),
            joint_noncat_accuracy: average_accuracy(&self.joint_noncat_accuracy),
            joint_goal_accuracy: average_accuracy(&self.joint_goal_accuracy),
        }
    }
}

/// Epoch-scoped accumulator, one [`GroupAccumulator`] per service group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvalAccumulator {
    groups: BTreeMap<String, GroupAccumulator>,
}

impl EvalAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything accumulated so far.
    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Append a turn to each of the named groups.
    pub fn push<'a>(&mut self, groups: impl IntoIterator<Item = &'a str>, turn: &TurnScores) {
        for group in groups {
            self.groups.entry(group.to_string()).or_default().push(turn);
        }
    }

    /// Accumulated lists of one group.
    pub fn group(&self, name: &str) -> Option<&GroupAccumulator> {
        self.groups.get(name)
    }

    /// All groups, in name order.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &GroupAccumulator)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether nothing has been accumulated.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

// =============================================================================
// Batch scoring
// =============================================================================

/// Check that every example in the batch has the same slot count.
///
/// Returns the shared count (0 for an empty batch).
pub fn check_uniform_slot_counts(counts: ArrayView1<'_, usize>, kind: &'static str) -> Result<usize> {
    let first = counts.first().copied().unwrap_or(0);
    if counts.iter().any(|&c| c != first) {
        return Err(Error::InconsistentSlotCount {
            kind,
            counts: counts.to_vec(),
        });
    }
    Ok(first)
}

/// Score every turn of a validated batch.
///
/// Fails without scoring anything when categorical or non-categorical slot
/// counts differ across the batch.
pub fn score_batch<S: StringSimilarity + ?Sized>(
    batch: &EvalBatch,
    req_slot_threshold: f64,
    similarity: &S,
) -> Result<Vec<TurnScores>> {
    check_uniform_slot_counts(batch.num_categorical_slots.view(), "categorical")?;
    check_uniform_slot_counts(batch.num_noncategorical_slots.view(), "non-categorical")?;

    Ok((0..batch.batch_size())
        .map(|b| TurnScores {
            intent: score_intent(batch, b),
            requested_slots: score_requested_slots(batch, b, req_slot_threshold),
            cat_slot_correctness: score_categorical_slots(batch, b),
            noncat_slot_correctness: score_noncategorical_slots(batch, b, similarity),
        })
        .collect())
}

/// `(label, prediction)` for turn `b`, or `None` if no intent is active.
///
/// The label is the position of the active intent in the one-hot row plus
/// one, aligning it with the logits whose column 0 is the NONE intent.
pub fn score_intent(batch: &EvalBatch, b: usize) -> Option<(usize, usize)> {
    let labels = batch.intent_status.row(b);
    if labels.sum() <= 0 {
        return None;
    }

    let mut label = 0;
    let mut best = i64::MIN;
    for (i, &v) in labels.iter().enumerate() {
        if v > best {
            best = v;
            label = i;
        }
    }

    let pred = argmax(batch.logit_intent_status.row(b));
    Some((label + 1, pred))
}

/// `(prediction, label)` for each unpadded requested slot of turn `b`.
pub fn score_requested_slots(batch: &EvalBatch, b: usize, threshold: f64) -> Vec<(bool, bool)> {
    let logits = batch.logit_req_slot_status.row(b);
    let labels = batch.requested_slot_status.row(b);
    let mask = batch.req_slot_mask.row(b);

    logits
        .iter()
        .zip(labels.iter())
        .zip(mask.iter())
        .filter(|(_, keep)| **keep)
        .map(|((&logit, &label), _)| (f64::from(sigmoid(logit)) > threshold, label != 0))
        .collect()
}

/// Correctness of each real categorical slot of turn `b`.
pub fn score_categorical_slots(batch: &EvalBatch, b: usize) -> Vec<f64> {
    let num_slots = batch.num_categorical_slots[b];

    (0..num_slots)
        .map(|j| {
            let status_label = batch.categorical_slot_status[[b, j]];
            let status_pred = argmax(batch.logit_cat_slot_status.slice(ndarray::s![b, j, ..]));

            slot_correctness(status_label, status_pred, || {
                let mask = batch
                    .cat_slot_values_mask
                    .as_ref()
                    .map(|m| m.slice(ndarray::s![b, j, ..]));
                let value_pred =
                    masked_argmax(batch.logit_cat_slot_value.slice(ndarray::s![b, j, ..]), mask);
                let value_label = batch.categorical_slot_values[[b, j]];
                if value_label == value_pred as i64 {
                    1.0
                } else {
                    0.0
                }
            })
        })
        .collect()
}

/// Correctness of each real non-categorical slot of turn `b`.
///
/// Spans index into turn `b`'s utterance. The label and predicted
/// substrings are compared with `similarity`.
pub fn score_noncategorical_slots<S: StringSimilarity + ?Sized>(
    batch: &EvalBatch,
    b: usize,
    similarity: &S,
) -> Vec<f64> {
    let num_slots = batch.num_noncategorical_slots[b];
    let utterance = batch.user_utterances[b].as_str();

    (0..num_slots)
        .map(|j| {
            let status_label = batch.noncategorical_slot_status[[b, j]];
            let status_pred = argmax(batch.logit_noncat_slot_status.slice(ndarray::s![b, j, ..]));

            slot_correctness(status_label, status_pred, || {
                let start_pred = argmax(batch.logit_noncat_slot_start.slice(ndarray::s![b, j, ..]));
                let end_pred = argmax(batch.logit_noncat_slot_end.slice(ndarray::s![b, j, ..]));

                let label = TextSpan::clamped(
                    utterance,
                    batch.noncategorical_slot_value_start[[b, j]],
                    batch.noncategorical_slot_value_end[[b, j]],
                );
                let pred = TextSpan::clamped(utterance, start_pred as i64, end_pred as i64);

                similarity
                    .similarity(label.extract(utterance), pred.extract(utterance))
                    .clamp(0.0, 1.0)
            })
        })
        .collect()
}

/// Combine status agreement with the value score of an active slot.
fn slot_correctness(status_label: i64, status_pred: usize, active_value_score: impl FnOnce() -> f64) -> f64 {
    if status_label != status_pred as i64 {
        0.0
    } else if status_label == SlotStatus::Active.index() {
        active_value_score()
    } else {
        1.0
    }
}
