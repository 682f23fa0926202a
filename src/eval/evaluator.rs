//! The epoch evaluator: `update` per batch, `summarize` at epoch end.

use super::accumulator::{
    score_batch, EvalAccumulator, TurnScores, ALL_SERVICES, SEEN_SERVICES, UNSEEN_SERVICES,
};
use super::config::EvalConfig;
use super::report::EvalSummary;
use crate::batch::EvalBatch;
use crate::similarity::{StringSimilarity, TokenSortRatio};
use crate::Result;
use std::collections::BTreeMap;

/// Accumulates schema-guided DST correctness over an evaluation epoch.
///
/// Call [`reset`](Self::reset) at the start of an epoch, [`update`](Self::update)
/// once per batch, and [`summarize`](Self::summarize) at the end. Updates are
/// all-or-nothing: a batch that fails validation leaves the accumulated state
/// untouched.
///
/// The fuzzy matcher for non-categorical slots defaults to
/// [`TokenSortRatio`]; pass another [`StringSimilarity`] with
/// [`with_similarity`](Self::with_similarity).
///
/// # Example
///
/// ```rust,ignore
/// use sgd_eval::eval::{EvalConfig, SgdEvaluator};
///
/// let mut evaluator = SgdEvaluator::new(EvalConfig::default());
/// for batch in batches {
///     evaluator.update(&batch)?;
/// }
/// let summary = evaluator.summarize();
/// println!("{}", summary);
/// ```
#[derive(Debug)]
pub struct SgdEvaluator<S = TokenSortRatio> {
    config: EvalConfig,
    similarity: S,
    accumulator: EvalAccumulator,
}

impl SgdEvaluator<TokenSortRatio> {
    /// Create an evaluator using the token-sort ratio for span matching.
    pub fn new(config: EvalConfig) -> Self {
        Self::with_similarity(config, TokenSortRatio)
    }
}

impl Default for SgdEvaluator<TokenSortRatio> {
    fn default() -> Self {
        Self::new(EvalConfig::default())
    }
}

impl<S: StringSimilarity> SgdEvaluator<S> {
    /// Create an evaluator with a custom span similarity.
    pub fn with_similarity(config: EvalConfig, similarity: S) -> Self {
        Self {
            config,
            similarity,
            accumulator: EvalAccumulator::new(),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// State accumulated so far this epoch.
    pub fn accumulator(&self) -> &EvalAccumulator {
        &self.accumulator
    }

    /// Start a new epoch.
    pub fn reset(&mut self) {
        self.accumulator.clear();
    }

    /// Score one batch and append the results.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`](crate::Error::ShapeMismatch) /
    ///   [`Error::InvalidInput`](crate::Error::InvalidInput) if the batch
    ///   tensors do not fit together
    /// - [`Error::InconsistentSlotCount`](crate::Error::InconsistentSlotCount)
    ///   if turns in the batch disagree on their number of categorical or
    ///   non-categorical slots
    pub fn update(&mut self, batch: &EvalBatch) -> Result<()> {
        batch.validate()?;

        let turns = score_batch(batch, self.config.req_slot_threshold, &self.similarity)
            .map_err(|e| {
                log::warn!("Rejecting batch of {} turns: {}", batch.batch_size(), e);
                e
            })?;

        for (b, turn) in turns.iter().enumerate() {
            let groups = self.groups_for(batch.service_id(b));
            self.accumulator
                .push(groups.iter().map(String::as_str), turn);
        }

        log::debug!(
            "Accumulated {} turns ({} cat slots, {} noncat slots)",
            turns.len(),
            turns.iter().map(|t| t.cat_slot_correctness.len()).sum::<usize>(),
            turns.iter().map(|t| t.noncat_slot_correctness.len()).sum::<usize>(),
        );
        Ok(())
    }

    /// Score one batch without touching the accumulator.
    pub fn score(&self, batch: &EvalBatch) -> Result<Vec<TurnScores>> {
        batch.validate()?;
        score_batch(batch, self.config.req_slot_threshold, &self.similarity)
    }

    /// Reduce everything accumulated this epoch to summary metrics.
    ///
    /// Does not reset the accumulator. `#ALL_SERVICES` is always present.
    pub fn summarize(&self) -> EvalSummary {
        let mut groups = BTreeMap::new();
        groups.insert(ALL_SERVICES.to_string(), Default::default());

        for (name, group) in self.accumulator.groups() {
            let metrics = group.summarize();
            let missing = metrics.not_applicable();
            if !missing.is_empty() {
                log::warn!("{}: not applicable: {}", name, missing.join(", "));
            }
            groups.insert(name.to_string(), metrics);
        }

        let summary = EvalSummary::new(groups);
        let all = summary.all_services();
        log::info!(
            "Intent acc {} | req slot F1 {} | avg goal acc {} | joint goal acc {}",
            all.active_intent_accuracy,
            all.requested_slots_f1,
            all.average_goal_accuracy,
            all.joint_goal_accuracy,
        );
        summary
    }

    /// Groups a turn of `service` contributes to.
    fn groups_for(&self, service: Option<&str>) -> Vec<String> {
        let mut groups = vec![ALL_SERVICES.to_string()];
        let Some(service) = service else {
            return groups;
        };

        if self.config.seen_services.is_some() {
            let split = if self.config.is_seen(service) {
                SEEN_SERVICES
            } else {
                UNSEEN_SERVICES
            };
            groups.push(split.to_string());
        }
        if self.config.per_service {
            groups.push(service.to_string());
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_without_service() {
        let evaluator = SgdEvaluator::new(EvalConfig::new().with_per_service(true));
        assert_eq!(evaluator.groups_for(None), vec![ALL_SERVICES.to_string()]);
    }

    #[test]
    fn test_groups_default_config() {
        let evaluator: SgdEvaluator = SgdEvaluator::default();
        assert_eq!(
            evaluator.groups_for(Some("Hotels_1")),
            vec![ALL_SERVICES.to_string()]
        );
    }

    #[test]
    fn test_groups_seen_and_per_service() {
        let config = EvalConfig::new()
            .with_per_service(true)
            .with_seen_services(["Hotels_1"]);
        let evaluator = SgdEvaluator::new(config);

        assert_eq!(
            evaluator.groups_for(Some("Hotels_1")),
            vec![ALL_SERVICES, SEEN_SERVICES, "Hotels_1"]
        );
        assert_eq!(
            evaluator.groups_for(Some("Flights_4")),
            vec![ALL_SERVICES, UNSEEN_SERVICES, "Flights_4"]
        );
    }

    #[test]
    fn test_summary_of_nothing() {
        let evaluator: SgdEvaluator = SgdEvaluator::default();
        let summary = evaluator.summarize();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary.all_services().not_applicable().len(), 10);
    }
}
