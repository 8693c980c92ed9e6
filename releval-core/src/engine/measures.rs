//! Built-in measures.
//!
//! Per-query formulas follow the TREC definitions. Every measure forms the
//! ranked relevance list itself, so the orchestration layer only ever passes
//! judgments and canonically sorted results.

use super::{Averaging, EvalParams, Measure, MeasureParams, RankedRels, TrecEval};
use crate::ranking::{JudgedQuery, RankedQuery};

/// Floor applied before taking logarithms for geometric means.
pub const MIN_GEO_MEAN: f64 = 0.00001;

const DEFAULT_RANK_CUTOFFS: [usize; 9] = [5, 10, 15, 20, 30, 100, 200, 500, 1000];

/// Every built-in measure, in catalog order.
pub static BUILTIN_MEASURES: [&dyn Measure; 20] = [
    &NumQ,
    &NumRet,
    &NumRel,
    &NumRelRet,
    &Map,
    &GmMap,
    &Rprec,
    &Bpref,
    &RecipRank,
    &IprecAtRecall,
    &Precision,
    &Recall,
    &MapCut,
    &Ndcg,
    &NdcgCut,
    &RprecMult,
    &Success,
    &SetP,
    &SetRecall,
    &SetF,
];

/// Nickname table for the built-in catalog. `all_trec` is derived from the
/// catalog itself.
pub const OFFICIAL: &[&str] = &[
    "num_q",
    "num_ret",
    "num_rel",
    "num_rel_ret",
    "map",
    "gm_map",
    "Rprec",
    "bpref",
    "recip_rank",
    "iprec_at_recall",
    "P",
];

pub const SET: &[&str] = &[
    "num_q",
    "num_ret",
    "num_rel",
    "num_rel_ret",
    "set_P",
    "set_recall",
    "set_F",
];

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

fn average_precision(rels: &RankedRels, limit: usize) -> f64 {
    let sum: f64 = rels
        .rel_ranks()
        .take_while(|&rank| rank <= limit)
        .enumerate()
        .map(|(i, rank)| (i + 1) as f64 / rank as f64)
        .sum();
    if rels.num_rel == 0 {
        0.0
    } else {
        sum / rels.num_rel as f64
    }
}

fn dcg(rels: &RankedRels, params: &MeasureParams, limit: usize) -> f64 {
    rels.rel_list
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, grade)| match grade {
            Some(g) => params.gain(*g) / ((i + 2) as f64).log2(),
            None => 0.0,
        })
        .sum()
}

fn ideal_dcg(rels: &RankedRels, params: &MeasureParams, limit: usize) -> f64 {
    let mut gains: Vec<f64> = rels
        .judged_grades
        .iter()
        .map(|&g| params.gain(g))
        .filter(|&gain| gain > 0.0)
        .collect();
    gains.sort_by(|a, b| b.total_cmp(a));
    gains
        .iter()
        .take(limit)
        .enumerate()
        .map(|(i, gain)| gain / ((i + 2) as f64).log2())
        .sum()
}

fn ndcg_at(rels: &RankedRels, params: &MeasureParams, limit: usize) -> f64 {
    let ideal = ideal_dcg(rels, params, limit);
    if ideal == 0.0 {
        0.0
    } else {
        dcg(rels, params, limit) / ideal
    }
}

pub struct NumQ;

impl Measure for NumQ {
    fn name(&self) -> &'static str {
        "num_q"
    }

    fn explanation(&self) -> &'static str {
        "Number of topics evaluated"
    }

    fn averaging(&self) -> Averaging {
        Averaging::Sum
    }

    fn calc(
        &self,
        _epi: &EvalParams,
        _judged: &JudgedQuery,
        _ranked: &RankedQuery,
        _params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        q_eval.set(eval_index, 1.0);
    }
}

pub struct NumRet;

impl Measure for NumRet {
    fn name(&self) -> &'static str {
        "num_ret"
    }

    fn explanation(&self) -> &'static str {
        "Number of documents retrieved for topic"
    }

    fn averaging(&self) -> Averaging {
        Averaging::Sum
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        _params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        q_eval.set(eval_index, rels.num_ret as f64);
    }
}

pub struct NumRel;

impl Measure for NumRel {
    fn name(&self) -> &'static str {
        "num_rel"
    }

    fn explanation(&self) -> &'static str {
        "Number of relevant documents for topic"
    }

    fn averaging(&self) -> Averaging {
        Averaging::Sum
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        _params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        q_eval.set(eval_index, rels.num_rel as f64);
    }
}

pub struct NumRelRet;

impl Measure for NumRelRet {
    fn name(&self) -> &'static str {
        "num_rel_ret"
    }

    fn explanation(&self) -> &'static str {
        "Number of relevant documents retrieved for topic"
    }

    fn averaging(&self) -> Averaging {
        Averaging::Sum
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        _params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        q_eval.set(eval_index, rels.num_rel_ret as f64);
    }
}

pub struct Map;

impl Measure for Map {
    fn name(&self) -> &'static str {
        "map"
    }

    fn explanation(&self) -> &'static str {
        "Mean Average Precision: mean over relevant documents of precision at their ranks"
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        _params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        q_eval.set(eval_index, average_precision(&rels, usize::MAX));
    }
}

pub struct GmMap;

impl Measure for GmMap {
    fn name(&self) -> &'static str {
        "gm_map"
    }

    fn explanation(&self) -> &'static str {
        "Geometric Mean Average Precision; per-topic values are log(max(AP, 0.00001))"
    }

    fn averaging(&self) -> Averaging {
        Averaging::Geometric
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        _params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        let ap = average_precision(&rels, usize::MAX).max(MIN_GEO_MEAN);
        q_eval.set(eval_index, ap.ln());
    }
}

pub struct Rprec;

impl Measure for Rprec {
    fn name(&self) -> &'static str {
        "Rprec"
    }

    fn explanation(&self) -> &'static str {
        "Precision after R documents have been retrieved, R = number of relevant documents"
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        _params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        q_eval.set(eval_index, ratio(rels.rel_in_top(rels.num_rel), rels.num_rel));
    }
}

pub struct Bpref;

impl Measure for Bpref {
    fn name(&self) -> &'static str {
        "bpref"
    }

    fn explanation(&self) -> &'static str {
        "Binary preference: fraction of judged non-relevant documents ranked below each relevant one"
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        _params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        if rels.num_rel == 0 {
            return;
        }

        let bound = rels.num_rel.min(rels.num_nonrel) as f64;
        let mut nonrel_so_far = 0usize;
        let mut bpref = 0.0;
        for &grade in rels.rel_list.iter().flatten() {
            if grade >= epi.relevance_level {
                bpref += if nonrel_so_far > 0 {
                    1.0 - nonrel_so_far.min(rels.num_rel) as f64 / bound
                } else {
                    1.0
                };
            } else {
                nonrel_so_far += 1;
            }
        }
        q_eval.set(eval_index, bpref / rels.num_rel as f64);
    }
}

pub struct RecipRank;

impl Measure for RecipRank {
    fn name(&self) -> &'static str {
        "recip_rank"
    }

    fn explanation(&self) -> &'static str {
        "Reciprocal rank of the first relevant document"
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        _params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        if let Some(rank) = rels.rel_ranks().next() {
            q_eval.set(eval_index, 1.0 / rank as f64);
        }
    }
}

pub struct IprecAtRecall;

impl Measure for IprecAtRecall {
    fn name(&self) -> &'static str {
        "iprec_at_recall"
    }

    fn explanation(&self) -> &'static str {
        "Interpolated precision at recall cutoffs: highest precision at any rank reaching that recall"
    }

    fn default_params(&self) -> MeasureParams {
        MeasureParams::FloatCutoffs((0..=10).map(|i| i as f64 / 10.0).collect())
    }

    fn is_cut(&self) -> bool {
        true
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        if rels.num_rel == 0 {
            return;
        }

        // (recall, precision) at every relevant retrieved rank.
        let points: Vec<(f64, f64)> = rels
            .rel_ranks()
            .enumerate()
            .map(|(i, rank)| {
                let rel_so_far = (i + 1) as f64;
                (rel_so_far / rels.num_rel as f64, rel_so_far / rank as f64)
            })
            .collect();

        for (offset, &cutoff) in params.float_cutoffs().iter().enumerate() {
            let best = points
                .iter()
                .filter(|&&(recall, _)| recall >= cutoff)
                .map(|&(_, precision)| precision)
                .fold(0.0, f64::max);
            q_eval.set(eval_index + offset, best);
        }
    }
}

pub struct Precision;

impl Measure for Precision {
    fn name(&self) -> &'static str {
        "P"
    }

    fn explanation(&self) -> &'static str {
        "Precision at rank cutoffs"
    }

    fn default_params(&self) -> MeasureParams {
        MeasureParams::LongCutoffs(DEFAULT_RANK_CUTOFFS.to_vec())
    }

    fn is_cut(&self) -> bool {
        true
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        for (offset, &k) in params.long_cutoffs().iter().enumerate() {
            q_eval.set(eval_index + offset, ratio(rels.rel_in_top(k), k));
        }
    }
}

pub struct Recall;

impl Measure for Recall {
    fn name(&self) -> &'static str {
        "recall"
    }

    fn explanation(&self) -> &'static str {
        "Recall at rank cutoffs"
    }

    fn default_params(&self) -> MeasureParams {
        MeasureParams::LongCutoffs(DEFAULT_RANK_CUTOFFS.to_vec())
    }

    fn is_cut(&self) -> bool {
        true
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        for (offset, &k) in params.long_cutoffs().iter().enumerate() {
            q_eval.set(eval_index + offset, ratio(rels.rel_in_top(k), rels.num_rel));
        }
    }
}

pub struct MapCut;

impl Measure for MapCut {
    fn name(&self) -> &'static str {
        "map_cut"
    }

    fn explanation(&self) -> &'static str {
        "Average precision with the ranking truncated at rank cutoffs"
    }

    fn default_params(&self) -> MeasureParams {
        MeasureParams::LongCutoffs(DEFAULT_RANK_CUTOFFS.to_vec())
    }

    fn is_cut(&self) -> bool {
        true
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        for (offset, &k) in params.long_cutoffs().iter().enumerate() {
            q_eval.set(eval_index + offset, average_precision(&rels, k));
        }
    }
}

pub struct Ndcg;

impl Measure for Ndcg {
    fn name(&self) -> &'static str {
        "ndcg"
    }

    fn explanation(&self) -> &'static str {
        "Normalized discounted cumulative gain over the whole ranking; gains default to grades"
    }

    fn default_params(&self) -> MeasureParams {
        MeasureParams::GainPairs(Vec::new())
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        q_eval.set(eval_index, ndcg_at(&rels, params, usize::MAX));
    }
}

pub struct NdcgCut;

impl Measure for NdcgCut {
    fn name(&self) -> &'static str {
        "ndcg_cut"
    }

    fn explanation(&self) -> &'static str {
        "Normalized discounted cumulative gain at rank cutoffs"
    }

    fn default_params(&self) -> MeasureParams {
        MeasureParams::LongCutoffs(DEFAULT_RANK_CUTOFFS.to_vec())
    }

    fn is_cut(&self) -> bool {
        true
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        // Cutoffs carry no gain pairs; gains are the grades.
        let gains = MeasureParams::None;
        for (offset, &k) in params.long_cutoffs().iter().enumerate() {
            q_eval.set(eval_index + offset, ndcg_at(&rels, &gains, k));
        }
    }
}

pub struct RprecMult;

impl Measure for RprecMult {
    fn name(&self) -> &'static str {
        "Rprec_mult"
    }

    fn explanation(&self) -> &'static str {
        "Precision at multiples of R, the number of relevant documents"
    }

    fn default_params(&self) -> MeasureParams {
        MeasureParams::FloatCutoffs((1..=10).map(|i| i as f64 * 0.2).collect())
    }

    fn is_cut(&self) -> bool {
        true
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        for (offset, &mult) in params.float_cutoffs().iter().enumerate() {
            let cutoff = (mult * rels.num_rel as f64 + 0.9).floor().max(0.0) as usize;
            q_eval.set(eval_index + offset, ratio(rels.rel_in_top(cutoff), cutoff));
        }
    }
}

pub struct Success;

impl Measure for Success {
    fn name(&self) -> &'static str {
        "success"
    }

    fn explanation(&self) -> &'static str {
        "1 if a relevant document appears at or above each rank cutoff"
    }

    fn default_params(&self) -> MeasureParams {
        MeasureParams::LongCutoffs(vec![1, 5, 10])
    }

    fn is_cut(&self) -> bool {
        true
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        for (offset, &k) in params.long_cutoffs().iter().enumerate() {
            let hit = if rels.rel_in_top(k) > 0 { 1.0 } else { 0.0 };
            q_eval.set(eval_index + offset, hit);
        }
    }
}

pub struct SetP;

impl Measure for SetP {
    fn name(&self) -> &'static str {
        "set_P"
    }

    fn explanation(&self) -> &'static str {
        "Set precision: relevant retrieved over retrieved"
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        _params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        q_eval.set(eval_index, ratio(rels.num_rel_ret, rels.num_ret));
    }
}

pub struct SetRecall;

impl Measure for SetRecall {
    fn name(&self) -> &'static str {
        "set_recall"
    }

    fn explanation(&self) -> &'static str {
        "Set recall: relevant retrieved over relevant"
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        _params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        q_eval.set(eval_index, ratio(rels.num_rel_ret, rels.num_rel));
    }
}

pub struct SetF;

impl Measure for SetF {
    fn name(&self) -> &'static str {
        "set_F"
    }

    fn explanation(&self) -> &'static str {
        "Set F-measure weighted by beta (default 1)"
    }

    fn default_params(&self) -> MeasureParams {
        MeasureParams::Float(1.0)
    }

    fn calc(
        &self,
        epi: &EvalParams,
        judged: &JudgedQuery,
        ranked: &RankedQuery,
        params: &MeasureParams,
        eval_index: usize,
        q_eval: &mut TrecEval,
    ) {
        let rels = RankedRels::form(epi, judged, ranked);
        let beta = match params {
            MeasureParams::Float(beta) => *beta,
            _ => 1.0,
        };
        let precision = ratio(rels.num_rel_ret, rels.num_ret);
        let recall = ratio(rels.num_rel_ret, rels.num_rel);
        let b2 = beta * beta;
        let denom = b2 * precision + recall;
        if denom > 0.0 {
            q_eval.set(eval_index, (1.0 + b2) * precision * recall / denom);
        }
    }
}
