//! # sgd-eval
//!
//! Evaluation metrics for schema-guided dialogue state tracking (DSTC8 SGD).
//!
//! - **Intents**: active intent accuracy
//! - **Requested slots**: F1 / precision / recall
//! - **Categorical slots**: average and joint accuracy
//! - **Non-categorical slots**: average and joint accuracy with fuzzy span matching
//! - **Goal**: average and joint accuracy over all slots
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sgd_eval::{EvalBatch, EvalConfig, SgdEvaluator};
//!
//! let mut evaluator = SgdEvaluator::new(EvalConfig::default());
//! for tensors in model_outputs {
//!     let batch = EvalBatch::from_tensors(tensors)?;
//!     evaluator.update(&batch)?;
//! }
//! let summary = evaluator.summarize();
//! let joint = summary.all_services().joint_goal_accuracy;
//! ```
//!
//! ## Frame-level Metrics
//!
//! ```rust
//! use sgd_eval::eval::{goal_accuracy_for_frame, SlotScore};
//!
//! let frame = goal_accuracy_for_frame(&[
//!     SlotScore::categorical(1.0, true),
//!     SlotScore::noncategorical(0.0, true),
//! ]);
//! assert_eq!(frame.joint_goal_accuracy.get(), Some(0.0));
//! assert_eq!(frame.average_goal_accuracy.get(), Some(0.5));
//! ```
//!
//! ## Design
//!
//! - **Two phases**: per-batch accumulation, end-of-epoch summarization
//! - **All-or-nothing batches**: a rejected batch never half-updates the epoch
//! - **No silent division by zero**: empty categories report `"NA"`
//! - **Pluggable fuzzy matching** via [`similarity::StringSimilarity`]

#![warn(missing_docs)]

pub mod batch;
mod error;
pub mod eval;
pub mod offset;
pub mod similarity;

pub use batch::{EvalBatch, Tensor, TensorMap};
pub use error::{Error, Result};
pub use eval::{EvalConfig, EvalSummary, GroupMetrics, MetricValue, SgdEvaluator};
pub use similarity::{fuzzy_string_match, StringSimilarity, TokenSortRatio};
