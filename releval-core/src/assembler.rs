//! Reassembles per-query engine output into the nested result mapping.

use std::collections::BTreeMap;

use crate::engine::{Measure, MeasureParams, TrecEval};

/// Measure label to value for one query.
pub type MeasureValues = BTreeMap<String, f64>;

/// Query id to its measure values.
pub type EvaluationResults = BTreeMap<String, MeasureValues>;

/// Labelled values a measure produced in `q_eval`.
///
/// Cut-style measures contribute one entry per parameter, in parameter order,
/// under the engine's fully qualified names (`P_5`, `P_10`). Everything else
/// contributes a single entry under the measure name.
pub fn measure_outputs<'a>(
    measure: &dyn Measure,
    params: &MeasureParams,
    eval_index: usize,
    q_eval: &'a TrecEval,
) -> Vec<(&'a str, f64)> {
    if measure.is_cut() {
        q_eval.values[eval_index..eval_index + measure.num_values(params)]
            .iter()
            .map(|slot| (slot.name.as_str(), slot.value))
            .collect()
    } else {
        vec![(measure.name(), q_eval.get(eval_index))]
    }
}

/// Collects labelled values per query.
#[derive(Debug, Default)]
pub struct ResultAssembler {
    results: EvaluationResults,
}

impl ResultAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `qid` has an entry, even if no measure reports for it.
    pub fn begin_query(&mut self, qid: &str) {
        self.results.entry(qid.to_string()).or_default();
    }

    pub fn record<'a>(&mut self, qid: &str, outputs: impl IntoIterator<Item = (&'a str, f64)>) {
        let values = self.results.entry(qid.to_string()).or_default();
        for (label, value) in outputs {
            values.insert(label.to_string(), value);
        }
    }

    pub fn num_queries(&self) -> usize {
        self.results.len()
    }

    pub fn finish(self) -> EvaluationResults {
        self.results
    }
}
