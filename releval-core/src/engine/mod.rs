//! Built-in evaluation engine.
//!
//! The orchestration layer only talks to the engine through the [`Measure`]
//! trait and the [`MeasureCatalog`]: each catalog entry initializes value slots
//! in an accumulator, computes per-query values into a working buffer,
//! accumulates them, and finalizes the aggregate. The formulas follow the
//! standard TREC definitions.

pub mod catalog;
pub mod measures;
pub mod params;
pub mod rels;

pub use catalog::{CatalogWindow, MeasureCatalog, SharedCatalog};
pub use params::MeasureParams;
pub use rels::RankedRels;

use serde::{Deserialize, Serialize};

use crate::error::{RelevalError, Result};
use crate::ranking::{JudgedQuery, RankedQuery};

/// Engine-wide evaluation settings shared by every measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalParams {
    /// Minimum grade for a document to count as relevant.
    pub relevance_level: i64,
    /// Drop retrieved documents that have no judgment.
    pub judged_docs_only: bool,
    /// Only the first `n` retrieved documents per query are considered.
    pub max_docs_per_query: Option<usize>,
}

impl Default for EvalParams {
    fn default() -> Self {
        Self {
            relevance_level: 1,
            judged_docs_only: false,
            max_docs_per_query: None,
        }
    }
}

impl EvalParams {
    pub fn validate(&self) -> Result<()> {
        if self.relevance_level < 1 {
            return Err(RelevalError::invalid_value(format!(
                "relevance_level should be positive, got {}",
                self.relevance_level
            )));
        }
        if self.max_docs_per_query == Some(0) {
            return Err(RelevalError::invalid_value(
                "max_docs_per_query should be positive",
            ));
        }
        Ok(())
    }
}

/// A named value slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalValue {
    pub name: String,
    pub value: f64,
}

/// Value slots for one query (working buffer) or for all queries
/// (accumulator).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrecEval {
    pub qid: String,
    pub num_queries: usize,
    pub values: Vec<EvalValue>,
}

impl TrecEval {
    pub fn new(qid: impl Into<String>) -> Self {
        Self {
            qid: qid.into(),
            ..Self::default()
        }
    }

    /// Append a zeroed slot and return its index.
    pub fn push_slot(&mut self, name: impl Into<String>) -> usize {
        self.values.push(EvalValue {
            name: name.into(),
            value: 0.0,
        });
        self.values.len() - 1
    }

    /// Zero every slot, keeping names.
    pub fn zero(&mut self) {
        for slot in &mut self.values {
            slot.value = 0.0;
        }
    }

    pub fn set(&mut self, index: usize, value: f64) {
        self.values[index].value = value;
    }

    pub fn get(&self, index: usize) -> f64 {
        self.values[index].value
    }
}

/// How per-query values fold into the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Averaging {
    /// Arithmetic mean over queries.
    Mean,
    /// Sum over queries (counts).
    Sum,
    /// Per-query values are logarithms; the aggregate is `exp(mean)`.
    Geometric,
}

/// One catalog entry of the evaluation engine.
pub trait Measure: Send + Sync {
    /// Catalog name; the key measure specifiers are matched against.
    fn name(&self) -> &'static str;

    /// One-line description.
    fn explanation(&self) -> &'static str;

    fn default_params(&self) -> MeasureParams {
        MeasureParams::None
    }

    /// Cut-style measures report one named value per parameter.
    fn is_cut(&self) -> bool {
        false
    }

    fn averaging(&self) -> Averaging {
        Averaging::Mean
    }

    fn parse_params(&self, raw: &str) -> Result<MeasureParams> {
        self.default_params().parse_like(self.name(), raw)
    }

    /// Number of value slots this measure occupies.
    fn num_values(&self, params: &MeasureParams) -> usize {
        if self.is_cut() {
            params.num_cutoffs()
        } else {
            1
        }
    }

    /// Append this measure's slots to the accumulator; returns the index of
    /// the first slot.
    fn init(&self, params: &MeasureParams, accum: &mut TrecEval) -> usize {
        let eval_index = accum.values.len();
        if self.is_cut() {
            for name in params.cut_names(self.name()) {
                accum.push_slot(name);
            }
        } else {
            accum.push_slot(self.name());
        }
        eval_index
    }

    /// Compute per-query values into `q_eval` starting at `eval_index`.
    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    );

    fn accumulate(
        &self,
        params: &MeasureParams,
        eval_index: usize,
        q_eval: &TrecEval,
        accum: &mut TrecEval,
    ) {
        for idx in eval_index..eval_index + self.num_values(params) {
            accum.values[idx].value += q_eval.values[idx].value;
        }
    }

    /// Turn accumulated sums into final values. Nothing is printed; final
    /// values are only traced.
    fn finalize(&self, params: &MeasureParams, eval_index: usize, accum: &mut TrecEval) {
        let num_queries = accum.num_queries.max(1) as f64;
        for idx in eval_index..eval_index + self.num_values(params) {
            let slot = &mut accum.values[idx];
            slot.value = match self.averaging() {
                Averaging::Mean => slot.value / num_queries,
                Averaging::Sum => slot.value,
                Averaging::Geometric => (slot.value / num_queries).exp(),
            };
            tracing::trace!(measure = %slot.name, value = slot.value, "Final value");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trec_eval_slots() {
        let mut eval = TrecEval::new("all");
        assert_eq!(eval.push_slot("map"), 0);
        assert_eq!(eval.push_slot("P_5"), 1);
        eval.set(1, 0.4);
        assert_eq!(eval.get(1), 0.4);
        eval.zero();
        assert_eq!(eval.get(1), 0.0);
        assert_eq!(eval.values[1].name, "P_5");
    }

    #[test]
    fn test_default_eval_params() {
        let epi = EvalParams::default();
        assert_eq!(epi.relevance_level, 1);
        assert!(!epi.judged_docs_only);
        assert_eq!(epi.max_docs_per_query, None);
        assert!(epi.validate().is_ok());
    }

    #[test]
    fn test_relevance_level_zero_is_invalid() {
        let epi = EvalParams {
            relevance_level: 0,
            ..EvalParams::default()
        };
        assert!(matches!(
            epi.validate(),
            Err(RelevalError::InvalidValue { .. })
        ));
    }
}
