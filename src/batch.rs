//! Evaluation batches: model outputs and labels for a set of dialogue turns.
//!
//! One [`EvalBatch`] holds everything the evaluator needs for `B` turns:
//!
//! ```text
//! tensor                              shape       dtype
//! ─────────────────────────────────── ─────────── ──────
//! logit_intent_status                 [B, I+1]    f32    column 0 = NONE intent
//! intent_status                       [B, I]      i64    one-hot active intent
//! logit_req_slot_status               [B, R]      f32
//! requested_slot_status               [B, R]      i64    0 / 1
//! req_slot_mask                       [B, R]      bool   false = padding
//! logit_cat_slot_status               [B, C, S]   f32    S = 3 statuses
//! logit_cat_slot_value                [B, C, V]   f32
//! categorical_slot_status             [B, C]      i64
//! categorical_slot_values             [B, C]      i64
//! cat_slot_values_mask (optional)     [B, C, V]   bool   false = padded value
//! num_categorical_slots               [B]         i64
//! logit_noncat_slot_status            [B, N, S]   f32
//! logit_noncat_slot_start             [B, N, L]   f32
//! logit_noncat_slot_end               [B, N, L]   f32
//! noncategorical_slot_status          [B, N]      i64
//! noncategorical_slot_value_start     [B, N]      i64    char offset, inclusive
//! noncategorical_slot_value_end       [B, N]      i64    char offset, exclusive
//! num_noncategorical_slots            [B]         i64
//! user_utterance                      B           text
//! service_id (optional)               B           text
//! ```
//!
//! Batches can be built field by field, or from a [`TensorMap`] keyed by the
//! names above. Training frameworks often decorate output names
//! (`logit_intent_status~~~eval`), so lookup falls back to a prefix match.

use crate::{Error, Result};
use ndarray::{Array1, Array2, Array3, ArrayD, ArrayView1, Dimension, Ix1, Ix3};
use std::collections::BTreeMap;

/// Tensor names understood by [`EvalBatch::from_tensors`].
pub mod names {
    /// Intent logits, `[B, I+1]`.
    pub const LOGIT_INTENT_STATUS: &str = "logit_intent_status";
    /// One-hot intent labels, `[B, I]`.
    pub const INTENT_STATUS: &str = "intent_status";
    /// Requested-slot logits, `[B, R]`.
    pub const LOGIT_REQ_SLOT_STATUS: &str = "logit_req_slot_status";
    /// Requested-slot labels, `[B, R]`.
    pub const REQUESTED_SLOT_STATUS: &str = "requested_slot_status";
    /// Requested-slot padding mask, `[B, R]`.
    pub const REQ_SLOT_MASK: &str = "req_slot_mask";
    /// Categorical slot status logits, `[B, C, 3]`.
    pub const LOGIT_CAT_SLOT_STATUS: &str = "logit_cat_slot_status";
    /// Categorical slot value logits, `[B, C, V]`.
    pub const LOGIT_CAT_SLOT_VALUE: &str = "logit_cat_slot_value";
    /// Categorical slot status labels, `[B, C]`.
    pub const CATEGORICAL_SLOT_STATUS: &str = "categorical_slot_status";
    /// Categorical slot value labels, `[B, C]`.
    pub const CATEGORICAL_SLOT_VALUES: &str = "categorical_slot_values";
    /// Categorical value padding mask, `[B, C, V]`.
    pub const CAT_SLOT_VALUES_MASK: &str = "cat_slot_values_mask";
    /// Number of categorical slots per turn, `[B]`.
    pub const NUM_CATEGORICAL_SLOTS: &str = "num_categorical_slots";
    /// Non-categorical slot status logits, `[B, N, 3]`.
    pub const LOGIT_NONCAT_SLOT_STATUS: &str = "logit_noncat_slot_status";
    /// Span start logits, `[B, N, L]`.
    pub const LOGIT_NONCAT_SLOT_START: &str = "logit_noncat_slot_start";
    /// Span end logits, `[B, N, L]`.
    pub const LOGIT_NONCAT_SLOT_END: &str = "logit_noncat_slot_end";
    /// Non-categorical slot status labels, `[B, N]`.
    pub const NONCATEGORICAL_SLOT_STATUS: &str = "noncategorical_slot_status";
    /// Span start labels, `[B, N]`.
    pub const NONCATEGORICAL_SLOT_VALUE_START: &str = "noncategorical_slot_value_start";
    /// Span end labels, `[B, N]`.
    pub const NONCATEGORICAL_SLOT_VALUE_END: &str = "noncategorical_slot_value_end";
    /// Number of non-categorical slots per turn, `[B]`.
    pub const NUM_NONCATEGORICAL_SLOTS: &str = "num_noncategorical_slots";
    /// Raw user utterances, `B` strings.
    pub const USER_UTTERANCE: &str = "user_utterance";
    /// Service name per turn, `B` strings.
    pub const SERVICE_ID: &str = "service_id";
}

/// A named tensor as handed over by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    /// Floating point values (logits).
    F32(ArrayD<f32>),
    /// Integer values (labels, counts, offsets).
    I64(ArrayD<i64>),
    /// Boolean values (masks).
    Bool(ArrayD<bool>),
    /// One string per turn.
    Text(Vec<String>),
}

impl Tensor {
    /// Shape of the tensor (`[len]` for text).
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Tensor::F32(a) => a.shape().to_vec(),
            Tensor::I64(a) => a.shape().to_vec(),
            Tensor::Bool(a) => a.shape().to_vec(),
            Tensor::Text(v) => vec![v.len()],
        }
    }

    /// Short dtype name for error messages.
    #[must_use]
    pub fn dtype(&self) -> &'static str {
        match self {
            Tensor::F32(_) => "f32",
            Tensor::I64(_) => "i64",
            Tensor::Bool(_) => "bool",
            Tensor::Text(_) => "text",
        }
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(a: ArrayD<f32>) -> Self {
        Tensor::F32(a)
    }
}

impl From<ArrayD<i64>> for Tensor {
    fn from(a: ArrayD<i64>) -> Self {
        Tensor::I64(a)
    }
}

impl From<ArrayD<bool>> for Tensor {
    fn from(a: ArrayD<bool>) -> Self {
        Tensor::Bool(a)
    }
}

impl From<Vec<String>> for Tensor {
    fn from(v: Vec<String>) -> Self {
        Tensor::Text(v)
    }
}

/// Named tensors for one batch.
pub type TensorMap = BTreeMap<String, Tensor>;

/// Predictions and labels for one batch of dialogue turns.
///
/// Fields follow the layout documented at module level. Use
/// [`EvalBatch::validate`] (called by the evaluator on every update) to check
/// that all shapes agree.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalBatch {
    /// Intent logits, `[B, I+1]`, column 0 is the NONE intent.
    pub logit_intent_status: Array2<f32>,
    /// One-hot active intent labels, `[B, I]`.
    pub intent_status: Array2<i64>,

    /// Requested-slot logits, `[B, R]`.
    pub logit_req_slot_status: Array2<f32>,
    /// Requested-slot labels (0 / 1), `[B, R]`.
    pub requested_slot_status: Array2<i64>,
    /// Requested-slot mask, false for padding, `[B, R]`.
    pub req_slot_mask: Array2<bool>,

    /// Categorical slot status logits, `[B, C, S]`.
    pub logit_cat_slot_status: Array3<f32>,
    /// Categorical slot value logits, `[B, C, V]`.
    pub logit_cat_slot_value: Array3<f32>,
    /// Categorical slot status labels, `[B, C]`.
    pub categorical_slot_status: Array2<i64>,
    /// Categorical slot value labels, `[B, C]`.
    pub categorical_slot_values: Array2<i64>,
    /// Valid categorical values, false for padding, `[B, C, V]`.
    pub cat_slot_values_mask: Option<Array3<bool>>,
    /// Number of real categorical slots per turn, `[B]`.
    pub num_categorical_slots: Array1<usize>,

    /// Non-categorical slot status logits, `[B, N, S]`.
    pub logit_noncat_slot_status: Array3<f32>,
    /// Span start logits, `[B, N, L]`.
    pub logit_noncat_slot_start: Array3<f32>,
    /// Span end logits, `[B, N, L]`.
    pub logit_noncat_slot_end: Array3<f32>,
    /// Non-categorical slot status labels, `[B, N]`.
    pub noncategorical_slot_status: Array2<i64>,
    /// Span start labels (char offset, inclusive), `[B, N]`.
    pub noncategorical_slot_value_start: Array2<i64>,
    /// Span end labels (char offset, exclusive), `[B, N]`.
    pub noncategorical_slot_value_end: Array2<i64>,
    /// Number of real non-categorical slots per turn, `[B]`.
    pub num_noncategorical_slots: Array1<usize>,

    /// Raw user utterance per turn.
    pub user_utterances: Vec<String>,
    /// Service name per turn, if known.
    pub service_ids: Option<Vec<String>>,
}

impl EvalBatch {
    /// Build a batch from named tensors.
    ///
    /// Each tensor is looked up by exact name first, then by the first key
    /// starting with that name. Integer tensors are accepted for masks
    /// (non-zero = true).
    pub fn from_tensors(mut tensors: TensorMap) -> Result<Self> {
        let num_cat = take_i64::<Ix1>(&mut tensors, names::NUM_CATEGORICAL_SLOTS)?;
        let num_noncat = take_i64::<Ix1>(&mut tensors, names::NUM_NONCATEGORICAL_SLOTS)?;

        let cat_slot_values_mask = if lookup_key(&tensors, names::CAT_SLOT_VALUES_MASK).is_some() {
            Some(take_bool::<Ix3>(&mut tensors, names::CAT_SLOT_VALUES_MASK)?)
        } else {
            None
        };
        let service_ids = if lookup_key(&tensors, names::SERVICE_ID).is_some() {
            Some(take_text(&mut tensors, names::SERVICE_ID)?)
        } else {
            None
        };

        let batch = Self {
            logit_intent_status: take_f32(&mut tensors, names::LOGIT_INTENT_STATUS)?,
            intent_status: take_i64(&mut tensors, names::INTENT_STATUS)?,
            logit_req_slot_status: take_f32(&mut tensors, names::LOGIT_REQ_SLOT_STATUS)?,
            requested_slot_status: take_i64(&mut tensors, names::REQUESTED_SLOT_STATUS)?,
            req_slot_mask: take_bool(&mut tensors, names::REQ_SLOT_MASK)?,
            logit_cat_slot_status: take_f32(&mut tensors, names::LOGIT_CAT_SLOT_STATUS)?,
            logit_cat_slot_value: take_f32(&mut tensors, names::LOGIT_CAT_SLOT_VALUE)?,
            categorical_slot_status: take_i64(&mut tensors, names::CATEGORICAL_SLOT_STATUS)?,
            categorical_slot_values: take_i64(&mut tensors, names::CATEGORICAL_SLOT_VALUES)?,
            cat_slot_values_mask,
            num_categorical_slots: to_counts(names::NUM_CATEGORICAL_SLOTS, num_cat)?,
            logit_noncat_slot_status: take_f32(&mut tensors, names::LOGIT_NONCAT_SLOT_STATUS)?,
            logit_noncat_slot_start: take_f32(&mut tensors, names::LOGIT_NONCAT_SLOT_START)?,
            logit_noncat_slot_end: take_f32(&mut tensors, names::LOGIT_NONCAT_SLOT_END)?,
            noncategorical_slot_status: take_i64(&mut tensors, names::NONCATEGORICAL_SLOT_STATUS)?,
            noncategorical_slot_value_start: take_i64(
                &mut tensors,
                names::NONCATEGORICAL_SLOT_VALUE_START,
            )?,
            noncategorical_slot_value_end: take_i64(
                &mut tensors,
                names::NONCATEGORICAL_SLOT_VALUE_END,
            )?,
            num_noncategorical_slots: to_counts(names::NUM_NONCATEGORICAL_SLOTS, num_noncat)?,
            user_utterances: take_text(&mut tensors, names::USER_UTTERANCE)?,
            service_ids,
        };

        if !tensors.is_empty() {
            log::debug!(
                "Ignoring {} unused tensors: {:?}",
                tensors.len(),
                tensors.keys().collect::<Vec<_>>()
            );
        }

        batch.validate()?;
        Ok(batch)
    }

    /// Number of turns in the batch.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.logit_intent_status.nrows()
    }

    /// Check that every tensor agrees on batch size and slot dimensions.
    pub fn validate(&self) -> Result<()> {
        let b = self.batch_size();

        // Intents: labels have one column fewer than logits (no NONE column).
        let intents = self.logit_intent_status.ncols();
        if intents == 0 {
            return Err(Error::invalid_input(
                "logit_intent_status needs at least the NONE intent column",
            ));
        }
        expect_shape(names::INTENT_STATUS, self.intent_status.shape(), &[b, intents - 1])?;

        // Requested slots.
        let r = self.logit_req_slot_status.shape()[1];
        expect_shape(names::LOGIT_REQ_SLOT_STATUS, self.logit_req_slot_status.shape(), &[b, r])?;
        expect_shape(names::REQUESTED_SLOT_STATUS, self.requested_slot_status.shape(), &[b, r])?;
        expect_shape(names::REQ_SLOT_MASK, self.req_slot_mask.shape(), &[b, r])?;

        // Categorical slots.
        let cat_status = self.logit_cat_slot_status.shape();
        let (c, s) = (cat_status[1], cat_status[2]);
        expect_shape(names::LOGIT_CAT_SLOT_STATUS, cat_status, &[b, c, s])?;
        let v = self.logit_cat_slot_value.shape()[2];
        expect_shape(names::LOGIT_CAT_SLOT_VALUE, self.logit_cat_slot_value.shape(), &[b, c, v])?;
        expect_shape(names::CATEGORICAL_SLOT_STATUS, self.categorical_slot_status.shape(), &[b, c])?;
        expect_shape(names::CATEGORICAL_SLOT_VALUES, self.categorical_slot_values.shape(), &[b, c])?;
        if let Some(mask) = &self.cat_slot_values_mask {
            expect_shape(names::CAT_SLOT_VALUES_MASK, mask.shape(), &[b, c, v])?;
        }
        expect_shape(names::NUM_CATEGORICAL_SLOTS, self.num_categorical_slots.shape(), &[b])?;
        check_counts_fit(names::NUM_CATEGORICAL_SLOTS, self.num_categorical_slots.view(), c)?;

        // Non-categorical slots.
        let noncat_status = self.logit_noncat_slot_status.shape();
        let (n, ns) = (noncat_status[1], noncat_status[2]);
        expect_shape(names::LOGIT_NONCAT_SLOT_STATUS, noncat_status, &[b, n, ns])?;
        let l = self.logit_noncat_slot_start.shape()[2];
        expect_shape(names::LOGIT_NONCAT_SLOT_START, self.logit_noncat_slot_start.shape(), &[b, n, l])?;
        expect_shape(names::LOGIT_NONCAT_SLOT_END, self.logit_noncat_slot_end.shape(), &[b, n, l])?;
        expect_shape(
            names::NONCATEGORICAL_SLOT_STATUS,
            self.noncategorical_slot_status.shape(),
            &[b, n],
        )?;
        expect_shape(
            names::NONCATEGORICAL_SLOT_VALUE_START,
            self.noncategorical_slot_value_start.shape(),
            &[b, n],
        )?;
        expect_shape(
            names::NONCATEGORICAL_SLOT_VALUE_END,
            self.noncategorical_slot_value_end.shape(),
            &[b, n],
        )?;
        expect_shape(names::NUM_NONCATEGORICAL_SLOTS, self.num_noncategorical_slots.shape(), &[b])?;
        check_counts_fit(names::NUM_NONCATEGORICAL_SLOTS, self.num_noncategorical_slots.view(), n)?;

        // Text.
        expect_shape(names::USER_UTTERANCE, &[self.user_utterances.len()], &[b])?;
        if let Some(services) = &self.service_ids {
            expect_shape(names::SERVICE_ID, &[services.len()], &[b])?;
        }

        Ok(())
    }

    /// Service name of turn `b`, if the batch carries service ids.
    #[must_use]
    pub fn service_id(&self, b: usize) -> Option<&str> {
        self.service_ids
            .as_ref()
            .and_then(|ids| ids.get(b))
            .map(String::as_str)
    }
}

// =============================================================================
// Array helpers
// =============================================================================

/// Index of the largest value (first one on ties, NaN never wins).
///
/// Returns 0 for an empty row.
#[must_use]
pub fn argmax(row: ArrayView1<'_, f32>) -> usize {
    masked_argmax(row, None)
}

/// Index of the largest value among positions where `mask` is true.
///
/// Falls back to an unmasked argmax when the mask selects nothing.
#[must_use]
pub fn masked_argmax(row: ArrayView1<'_, f32>, mask: Option<ArrayView1<'_, bool>>) -> usize {
    let allowed = |i: usize| mask.as_ref().map_or(true, |m| m.get(i).copied().unwrap_or(false));

    let mut best: Option<(usize, f32)> = None;
    for (i, &value) in row.iter().enumerate() {
        if !allowed(i) || value.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| value > b) {
            best = Some((i, value));
        }
    }

    match best {
        Some((i, _)) => i,
        None if mask.is_some() => argmax(row),
        None => 0,
    }
}

/// Logistic sigmoid.
#[inline]
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

// =============================================================================
// Tensor map extraction
// =============================================================================

fn lookup_key(tensors: &TensorMap, name: &str) -> Option<String> {
    if tensors.contains_key(name) {
        return Some(name.to_string());
    }
    tensors.keys().find(|k| k.starts_with(name)).cloned()
}

fn take(tensors: &mut TensorMap, name: &str) -> Result<Tensor> {
    let key = lookup_key(tensors, name).ok_or_else(|| Error::missing_tensor(name))?;
    tensors.remove(&key).ok_or_else(|| Error::missing_tensor(name))
}

fn into_dim<T, D: Dimension>(name: &str, array: ArrayD<T>, ndim: usize) -> Result<ndarray::Array<T, D>> {
    let actual = array.shape().to_vec();
    array
        .into_dimensionality::<D>()
        .map_err(|_| Error::shape_mismatch(name, &vec![usize::MAX; ndim], &actual))
}

fn take_f32<D: Dimension>(tensors: &mut TensorMap, name: &str) -> Result<ndarray::Array<f32, D>> {
    match take(tensors, name)? {
        Tensor::F32(a) => into_dim(name, a, D::NDIM.unwrap_or(0)),
        other => Err(Error::invalid_input(format!(
            "{} must be f32, got {}",
            name,
            other.dtype()
        ))),
    }
}

fn take_i64<D: Dimension>(tensors: &mut TensorMap, name: &str) -> Result<ndarray::Array<i64, D>> {
    match take(tensors, name)? {
        Tensor::I64(a) => into_dim(name, a, D::NDIM.unwrap_or(0)),
        other => Err(Error::invalid_input(format!(
            "{} must be i64, got {}",
            name,
            other.dtype()
        ))),
    }
}

fn take_bool<D: Dimension>(tensors: &mut TensorMap, name: &str) -> Result<ndarray::Array<bool, D>> {
    match take(tensors, name)? {
        Tensor::Bool(a) => into_dim(name, a, D::NDIM.unwrap_or(0)),
        Tensor::I64(a) => into_dim(name, a.mapv(|x| x != 0), D::NDIM.unwrap_or(0)),
        other => Err(Error::invalid_input(format!(
            "{} must be bool, got {}",
            name,
            other.dtype()
        ))),
    }
}

fn take_text(tensors: &mut TensorMap, name: &str) -> Result<Vec<String>> {
    match take(tensors, name)? {
        Tensor::Text(v) => Ok(v),
        other => Err(Error::invalid_input(format!(
            "{} must be text, got {}",
            name,
            other.dtype()
        ))),
    }
}

fn to_counts(name: &str, counts: Array1<i64>) -> Result<Array1<usize>> {
    if let Some(&bad) = counts.iter().find(|&&c| c < 0) {
        return Err(Error::invalid_input(format!(
            "{} must be non-negative, got {}",
            name, bad
        )));
    }
    Ok(counts.mapv(|c| c as usize))
}

fn expect_shape(name: &str, actual: &[usize], expected: &[usize]) -> Result<()> {
    if actual != expected {
        return Err(Error::shape_mismatch(name, expected, actual));
    }
    Ok(())
}

fn check_counts_fit(name: &str, counts: ArrayView1<'_, usize>, max: usize) -> Result<()> {
    if let Some(&bad) = counts.iter().find(|&&c| c > max) {
        return Err(Error::invalid_input(format!(
            "{} = {} exceeds the padded slot dimension {}",
            name, bad, max
        )));
    }
    Ok(())
}
