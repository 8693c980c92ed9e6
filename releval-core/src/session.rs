//! Evaluation sessions.
//!
//! A session owns the judgments and the resolved measure set. Each
//! [`EvaluationSession::evaluate`] call marshals a fresh result set, locks the
//! catalog, applies this session's parameter overrides inside a
//! [`CatalogWindow`](crate::engine::CatalogWindow), drives the engine once per
//! query/measure pair, and hands the labelled values to the assembler. Queries
//! without judgments are skipped silently.

use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

use crate::assembler::{EvaluationResults, ResultAssembler, measure_outputs};
use crate::config::EvalConfig;
use crate::engine::catalog::lock;
use crate::engine::{EvalParams, MeasureCatalog, SharedCatalog, TrecEval};
use crate::error::{RelevalError, Result, ShapeViolation};
use crate::ranking::{JudgmentSet, Relevance, RankingVariant, ResultSet};
use crate::resolver::MeasureSet;

pub struct EvaluationSession {
    judgments: JudgmentSet,
    measures: MeasureSet,
    epi: EvalParams,
    catalog: SharedCatalog,
}

impl EvaluationSession {
    /// Build a session from host mappings against the process-wide catalog.
    ///
    /// `judgments` must map query ids to mappings of document id to integer
    /// grade; `measures` must be an array of specifier strings.
    pub fn new(judgments: &Value, measures: &Value, relevance_level: i64) -> Result<Self> {
        let epi = EvalParams {
            relevance_level,
            ..EvalParams::default()
        };
        Self::with_catalog(MeasureCatalog::global(), judgments, measures, epi)
    }

    /// Build a session using the measures and engine settings in `config`.
    pub fn with_config(judgments: &Value, config: &EvalConfig) -> Result<Self> {
        expect_mapping(judgments)?;
        let epi = config.eval_params()?;
        Self::build(MeasureCatalog::global(), &config.measures, epi, || {
            JudgmentSet::from_value(judgments)
        })
    }

    /// Build a session against an explicitly owned catalog.
    pub fn with_catalog(
        catalog: SharedCatalog,
        judgments: &Value,
        measures: &Value,
        epi: EvalParams,
    ) -> Result<Self> {
        expect_mapping(judgments)?;
        let specifiers = measure_specifiers(measures)?;
        epi.validate()?;
        Self::build(catalog, &specifiers, epi, || JudgmentSet::from_value(judgments))
    }

    /// Build a session from typed judgments; no shape checks are needed.
    pub fn from_maps<Q, D, K, M, S>(judgments: Q, measures: M, relevance_level: i64) -> Result<Self>
    where
        Q: IntoIterator<Item = (K, D)>,
        D: IntoIterator<Item = (K, i64)>,
        K: Into<String>,
        M: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let epi = EvalParams {
            relevance_level,
            ..EvalParams::default()
        };
        epi.validate()?;
        Self::build(MeasureCatalog::global(), measures, epi, || {
            Ok(JudgmentSet::from_entries(judgments))
        })
    }

    // Measures resolve before judgments are marshalled; nothing is kept if
    // either step fails.
    fn build<M, S>(
        catalog: SharedCatalog,
        specifiers: M,
        epi: EvalParams,
        judgments: impl FnOnce() -> Result<JudgmentSet>,
    ) -> Result<Self>
    where
        M: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let measures = MeasureSet::resolve(&lock(&catalog), specifiers)?;
        let judgments = judgments()?;

        tracing::info!(
            queries = judgments.len(),
            judgments = judgments.num_pairs(),
            measures = measures.len(),
            relevance_level = epi.relevance_level,
            "Evaluation session ready"
        );

        Ok(Self {
            judgments,
            measures,
            epi,
            catalog,
        })
    }

    pub fn judgments(&self) -> &JudgmentSet {
        &self.judgments
    }

    pub fn measures(&self) -> &MeasureSet {
        &self.measures
    }

    pub fn eval_params(&self) -> &EvalParams {
        &self.epi
    }

    /// Evaluate a host score mapping (`query -> document -> score`).
    ///
    /// Malformed input aborts the whole call; no partial result is returned.
    pub fn evaluate(&self, scores: &Value) -> Result<EvaluationResults> {
        let results = ResultSet::from_value(scores)?;
        Ok(self.evaluate_results(&results))
    }

    /// Evaluate typed scores.
    pub fn evaluate_maps<Q, D, K>(&self, scores: Q) -> EvaluationResults
    where
        Q: IntoIterator<Item = (K, D)>,
        D: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        self.evaluate_results(&ResultSet::from_entries(scores))
    }

    /// Evaluate an already marshalled result set.
    pub fn evaluate_results(&self, results: &ResultSet) -> EvaluationResults {
        let mut catalog = lock(&self.catalog);
        let window = self.measures.apply(&mut catalog);

        let mut accum = TrecEval::new("all");
        let active: Vec<_> = self
            .measures
            .specs()
            .iter()
            .map(|spec| {
                let measure = window.measure(spec.index);
                let params = window.params(spec.index);
                (measure, params, measure.init(params, &mut accum))
            })
            .collect();

        let mut q_eval = accum.clone();
        let mut assembler = ResultAssembler::new();
        let mut skipped = 0usize;

        for ranked in results.queries() {
            let qid = ranked.qid();
            let Some(judged) = self.judgments.get(qid) else {
                tracing::debug!(qid, "Query not found in relevance judgments; skipping");
                skipped += 1;
                continue;
            };

            q_eval.qid = qid.to_string();
            assembler.begin_query(qid);

            for &(measure, params, eval_index) in &active {
                q_eval.zero();
                measure.calc(&self.epi, judged, ranked, params, eval_index, &mut q_eval);
                assembler.record(qid, measure_outputs(measure, params, eval_index, &q_eval));
                measure.accumulate(params, eval_index, &q_eval, &mut accum);
            }
            accum.num_queries += 1;
        }

        for &(measure, params, eval_index) in &active {
            measure.finalize(params, eval_index, &mut accum);
        }

        tracing::info!(
            evaluated = assembler.num_queries(),
            skipped,
            measures = active.len(),
            "Evaluation complete"
        );

        assembler.finish()
    }
}

impl fmt::Debug for EvaluationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationSession")
            .field("queries", &self.judgments.len())
            .field("measures", &self.measures)
            .field("epi", &self.epi)
            .finish_non_exhaustive()
    }
}

fn expect_mapping(judgments: &Value) -> Result<()> {
    if judgments.is_object() {
        Ok(())
    } else {
        Err(RelevalError::shape(
            ShapeViolation::NotMapping,
            format!("argument '{}'", Relevance::ARGUMENT),
        ))
    }
}

/// Measures arrive as an array of strings; duplicates collapse.
fn measure_specifiers(measures: &Value) -> Result<BTreeSet<String>> {
    let Some(items) = measures.as_array() else {
        return Err(RelevalError::invalid_type(
            "argument 'measures' should be a set of measure specifiers",
        ));
    };
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                RelevalError::invalid_type(format!(
                    "measure specifiers should be strings, got {item}"
                ))
            })
        })
        .collect()
}
