//! Shared helpers for building synthetic evaluation batches.

#![allow(dead_code)]

use ndarray::{Array1, Array2, Array3};
use sgd_eval::EvalBatch;

pub const NUM_INTENTS: usize = 4;
pub const MAX_REQ_SLOTS: usize = 4;
pub const MAX_CAT_SLOTS: usize = 4;
pub const MAX_VALUES: usize = 5;
pub const MAX_NONCAT_SLOTS: usize = 4;
pub const NUM_STATUSES: usize = 3;
pub const MAX_TOKENS: usize = 64;

pub const OFF: i64 = 0;
pub const ACTIVE: i64 = 1;
pub const DONTCARE: i64 = 2;

/// A categorical slot: labels and the argmax the model should produce.
#[derive(Debug, Clone, Copy)]
pub struct Cat {
    pub status: i64,
    pub status_pred: usize,
    pub value: i64,
    pub value_pred: usize,
}

impl Cat {
    pub fn correct(status: i64, value: i64) -> Self {
        Self {
            status,
            status_pred: status as usize,
            value,
            value_pred: value as usize,
        }
    }
}

/// A non-categorical slot: span labels (char offsets) and predicted span.
#[derive(Debug, Clone, Copy)]
pub struct NonCat {
    pub status: i64,
    pub status_pred: usize,
    pub span: (i64, i64),
    pub span_pred: (usize, usize),
}

impl NonCat {
    pub fn correct(status: i64, span: (i64, i64)) -> Self {
        Self {
            status,
            status_pred: status as usize,
            span,
            span_pred: (span.0 as usize, span.1 as usize),
        }
    }
}

/// One dialogue turn of a synthetic batch.
#[derive(Debug, Clone, Default)]
pub struct Turn {
    pub utterance: String,
    pub service: Option<String>,
    /// Index of the active intent (0-based, without NONE).
    pub active_intent: Option<usize>,
    /// Column of the predicted intent (0 = NONE).
    pub intent_pred: usize,
    /// `(predicted, label)` per requested slot.
    pub requested: Vec<(bool, bool)>,
    pub cat: Vec<Cat>,
    pub noncat: Vec<NonCat>,
}

impl Turn {
    pub fn new(utterance: &str) -> Self {
        Self {
            utterance: utterance.to_string(),
            ..Default::default()
        }
    }

    pub fn service(mut self, service: &str) -> Self {
        self.service = Some(service.to_string());
        self
    }

    pub fn intent(mut self, active: Option<usize>, pred: usize) -> Self {
        self.active_intent = active;
        self.intent_pred = pred;
        self
    }

    pub fn requested(mut self, requested: Vec<(bool, bool)>) -> Self {
        self.requested = requested;
        self
    }

    pub fn cat(mut self, cat: Vec<Cat>) -> Self {
        self.cat = cat;
        self
    }

    pub fn noncat(mut self, noncat: Vec<NonCat>) -> Self {
        self.noncat = noncat;
        self
    }
}

/// Build a padded batch whose logits argmax to the requested predictions.
pub fn build_batch(turns: &[Turn]) -> EvalBatch {
    let b = turns.len();

    let mut logit_intent_status = Array2::<f32>::zeros((b, NUM_INTENTS + 1));
    let mut intent_status = Array2::<i64>::zeros((b, NUM_INTENTS));

    let mut logit_req_slot_status = Array2::<f32>::from_elem((b, MAX_REQ_SLOTS), -4.0);
    let mut requested_slot_status = Array2::<i64>::zeros((b, MAX_REQ_SLOTS));
    let mut req_slot_mask = Array2::<bool>::from_elem((b, MAX_REQ_SLOTS), false);

    let mut logit_cat_slot_status = Array3::<f32>::zeros((b, MAX_CAT_SLOTS, NUM_STATUSES));
    let mut logit_cat_slot_value = Array3::<f32>::zeros((b, MAX_CAT_SLOTS, MAX_VALUES));
    let mut categorical_slot_status = Array2::<i64>::zeros((b, MAX_CAT_SLOTS));
    let mut categorical_slot_values = Array2::<i64>::zeros((b, MAX_CAT_SLOTS));
    let mut num_categorical_slots = Array1::<usize>::zeros(b);

    let mut logit_noncat_slot_status = Array3::<f32>::zeros((b, MAX_NONCAT_SLOTS, NUM_STATUSES));
    let mut logit_noncat_slot_start = Array3::<f32>::zeros((b, MAX_NONCAT_SLOTS, MAX_TOKENS));
    let mut logit_noncat_slot_end = Array3::<f32>::zeros((b, MAX_NONCAT_SLOTS, MAX_TOKENS));
    let mut noncategorical_slot_status = Array2::<i64>::zeros((b, MAX_NONCAT_SLOTS));
    let mut noncategorical_slot_value_start = Array2::<i64>::zeros((b, MAX_NONCAT_SLOTS));
    let mut noncategorical_slot_value_end = Array2::<i64>::zeros((b, MAX_NONCAT_SLOTS));
    let mut num_noncategorical_slots = Array1::<usize>::zeros(b);

    for (i, turn) in turns.iter().enumerate() {
        if let Some(intent) = turn.active_intent {
            intent_status[[i, intent]] = 1;
        }
        logit_intent_status[[i, turn.intent_pred]] = 5.0;

        for (j, &(pred, label)) in turn.requested.iter().enumerate() {
            req_slot_mask[[i, j]] = true;
            logit_req_slot_status[[i, j]] = if pred { 4.0 } else { -4.0 };
            requested_slot_status[[i, j]] = i64::from(label);
        }

        num_categorical_slots[i] = turn.cat.len();
        for (j, slot) in turn.cat.iter().enumerate() {
            categorical_slot_status[[i, j]] = slot.status;
            categorical_slot_values[[i, j]] = slot.value;
            logit_cat_slot_status[[i, j, slot.status_pred]] = 5.0;
            logit_cat_slot_value[[i, j, slot.value_pred]] = 5.0;
        }

        num_noncategorical_slots[i] = turn.noncat.len();
        for (j, slot) in turn.noncat.iter().enumerate() {
            noncategorical_slot_status[[i, j]] = slot.status;
            noncategorical_slot_value_start[[i, j]] = slot.span.0;
            noncategorical_slot_value_end[[i, j]] = slot.span.1;
            logit_noncat_slot_status[[i, j, slot.status_pred]] = 5.0;
            logit_noncat_slot_start[[i, j, slot.span_pred.0]] = 5.0;
            logit_noncat_slot_end[[i, j, slot.span_pred.1]] = 5.0;
        }
    }

    let service_ids = if turns.iter().any(|t| t.service.is_some()) {
        Some(
            turns
                .iter()
                .map(|t| t.service.clone().unwrap_or_default())
                .collect(),
        )
    } else {
        None
    };

    EvalBatch {
        logit_intent_status,
        intent_status,
        logit_req_slot_status,
        requested_slot_status,
        req_slot_mask,
        logit_cat_slot_status,
        logit_cat_slot_value,
        categorical_slot_status,
        categorical_slot_values,
        cat_slot_values_mask: None,
        num_categorical_slots,
        logit_noncat_slot_status,
        logit_noncat_slot_start,
        logit_noncat_slot_end,
        noncategorical_slot_status,
        noncategorical_slot_value_start,
        noncategorical_slot_value_end,
        num_noncategorical_slots,
        user_utterances: turns.iter().map(|t| t.utterance.clone()).collect(),
        service_ids,
    }
}

/// Char offsets `(start, end)` of the first occurrence of `needle`.
pub fn span_of(text: &str, needle: &str) -> (i64, i64) {
    let byte_start = text
        .find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not in {text:?}"));
    let start = text[..byte_start].chars().count();
    let end = start + needle.chars().count();
    (start as i64, end as i64)
}

/// Flatten a batch back into named tensors, appending `suffix` to each name.
pub fn to_tensor_map(batch: &EvalBatch, suffix: &str) -> sgd_eval::TensorMap {
    use sgd_eval::batch::names;
    use sgd_eval::Tensor;

    let mut map = sgd_eval::TensorMap::new();
    let mut put = |name: &str, tensor: Tensor| {
        map.insert(format!("{name}{suffix}"), tensor);
    };
    let counts = |c: &Array1<usize>| Tensor::I64(c.mapv(|v| v as i64).into_dyn());

    put(names::LOGIT_INTENT_STATUS, batch.logit_intent_status.clone().into_dyn().into());
    put(names::INTENT_STATUS, batch.intent_status.clone().into_dyn().into());
    put(names::LOGIT_REQ_SLOT_STATUS, batch.logit_req_slot_status.clone().into_dyn().into());
    put(names::REQUESTED_SLOT_STATUS, batch.requested_slot_status.clone().into_dyn().into());
    put(names::REQ_SLOT_MASK, batch.req_slot_mask.clone().into_dyn().into());
    put(names::LOGIT_CAT_SLOT_STATUS, batch.logit_cat_slot_status.clone().into_dyn().into());
    put(names::LOGIT_CAT_SLOT_VALUE, batch.logit_cat_slot_value.clone().into_dyn().into());
    put(names::CATEGORICAL_SLOT_STATUS, batch.categorical_slot_status.clone().into_dyn().into());
    put(names::CATEGORICAL_SLOT_VALUES, batch.categorical_slot_values.clone().into_dyn().into());
    put(names::NUM_CATEGORICAL_SLOTS, counts(&batch.num_categorical_slots));
    put(names::LOGIT_NONCAT_SLOT_STATUS, batch.logit_noncat_slot_status.clone().into_dyn().into());
    put(names::LOGIT_NONCAT_SLOT_START, batch.logit_noncat_slot_start.clone().into_dyn().into());
    put(names::LOGIT_NONCAT_SLOT_END, batch.logit_noncat_slot_end.clone().into_dyn().into());
    put(
        names::NONCATEGORICAL_SLOT_STATUS,
        batch.noncategorical_slot_status.clone().into_dyn().into(),
    );
    put(
        names::NONCATEGORICAL_SLOT_VALUE_START,
        batch.noncategorical_slot_value_start.clone().into_dyn().into(),
    );
    put(
        names::NONCATEGORICAL_SLOT_VALUE_END,
        batch.noncategorical_slot_value_end.clone().into_dyn().into(),
    );
    put(names::NUM_NONCATEGORICAL_SLOTS, counts(&batch.num_noncategorical_slots));
    put(names::USER_UTTERANCE, Tensor::Text(batch.user_utterances.clone()));
    if let Some(services) = &batch.service_ids {
        put(names::SERVICE_ID, Tensor::Text(services.clone()));
    }
    map
}
