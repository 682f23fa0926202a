//! Schema-guided DST evaluation.
//!
//! # Overview
//!
//! Evaluation runs in two phases per epoch:
//!
//! 1. **Accumulation**: every batch of model outputs is reduced to per-turn
//!    correctness scores ([`TurnScores`]) which are appended to an
//!    [`EvalAccumulator`], grouped by service.
//! 2. **Summarization**: the accumulated lists are reduced to scalar metrics
//!    ([`EvalSummary`]).
//!
//! ```rust,ignore
//! use sgd_eval::eval::{EvalConfig, SgdEvaluator};
//!
//! let mut evaluator = SgdEvaluator::new(EvalConfig::default());
//! evaluator.reset();
//! for batch in eval_batches {
//!     evaluator.update(&batch)?;
//! }
//! let summary = evaluator.summarize();
//! println!("{}", summary.to_json_pretty()?);
//! ```
//!
//! # Metrics
//!
//! | Metric | Reduction |
//! |--------|-----------|
//! | `active_intent_accuracy` | label == prediction rate over turns with an active intent |
//! | `requested_slots_{f1,precision,recall}` | [`compute_f1`] over unpadded requested slots |
//! | `average_{cat,noncat,goal}_accuracy` | mean of per-slot correctness |
//! | `joint_{cat,noncat,goal}_accuracy` | mean over turns of the per-turn product |
//!
//! Metrics with nothing to reduce over are [`MetricValue::NotApplicable`].

pub mod accumulator;
pub mod config;
pub mod evaluator;
pub mod metrics;
pub mod report;
pub mod types;

pub use accumulator::{
    EvalAccumulator, GroupAccumulator, TurnScores, ALL_SERVICES, SEEN_SERVICES, UNSEEN_SERVICES,
};
pub use config::{EvalConfig, REQ_SLOT_THRESHOLD};
pub use evaluator::SgdEvaluator;
pub use metrics::{
    average_accuracy, compute_f1, equality_rate, goal_accuracy_for_frame, joint_accuracy,
    FrameGoalAccuracy, SlotScore,
};
pub use report::{EvalSummary, GroupMetrics};
pub use types::{F1Scores, MetricValue, SlotStatus, NAN_VAL};
