//! Ranked relevance lists: retrieved documents mapped to their grades.

use super::EvalParams;
use crate::ranking::{JudgedQuery, RankedQuery};

/// Grades of the retrieved documents in rank order, plus the counts every
/// measure needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedRels {
    /// Grade per retrieved rank; `None` for unjudged documents.
    pub rel_list: Vec<Option<i64>>,
    pub num_ret: usize,
    pub num_rel: usize,
    pub num_rel_ret: usize,
    /// Judged documents below the relevance level.
    pub num_nonrel: usize,
    /// Every judged grade, descending.
    pub judged_grades: Vec<i64>,
    relevance_level: i64,
}

impl RankedRels {
    /// Form the ranked list for one query. `ranked` is used in its stored
    /// (canonical) order.
    pub fn form(epi: &EvalParams, judged: &JudgedQuery, ranked: &RankedQuery) -> Self {
        let level = epi.relevance_level;
        let limit = epi.max_docs_per_query.unwrap_or(usize::MAX);

        let rel_list: Vec<Option<i64>> = ranked
            .docnos()
            .map(|docno| judged.grade_of(docno))
            .filter(|grade| !epi.judged_docs_only || grade.is_some())
            .take(limit)
            .collect();

        let mut judged_grades: Vec<i64> = judged.pairs().iter().map(|p| p.value).collect();
        judged_grades.sort_unstable_by(|a, b| b.cmp(a));

        let num_rel = judged_grades.iter().filter(|&&g| g >= level).count();
        let num_rel_ret = rel_list
            .iter()
            .filter(|g| matches!(g, Some(g) if *g >= level))
            .count();

        Self {
            num_ret: rel_list.len(),
            num_rel,
            num_rel_ret,
            num_nonrel: judged_grades.len() - num_rel,
            judged_grades,
            rel_list,
            relevance_level: level,
        }
    }

    pub fn is_rel(&self, grade: Option<i64>) -> bool {
        matches!(grade, Some(g) if g >= self.relevance_level)
    }

    /// Relevant documents among the first `k` retrieved.
    pub fn rel_in_top(&self, k: usize) -> usize {
        self.rel_list
            .iter()
            .take(k)
            .filter(|&&g| self.is_rel(g))
            .count()
    }

    /// 1-based ranks of the relevant retrieved documents.
    pub fn rel_ranks(&self) -> impl Iterator<Item = usize> + '_ {
        self.rel_list
            .iter()
            .enumerate()
            .filter(|&(_, &g)| self.is_rel(g))
            .map(|(i, _)| i + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::{JudgmentSet, ResultSet};

    fn fixture() -> (JudgmentSet, ResultSet) {
        let judgments = JudgmentSet::from_entries(vec![(
            "q1",
            vec![("d1", 2), ("d2", 0), ("d3", 1), ("d4", 1)],
        )]);
        let results = ResultSet::from_entries(vec![(
            "q1",
            vec![("d1", 0.9), ("x", 0.8), ("d2", 0.7), ("d3", 0.6)],
        )]);
        (judgments, results)
    }

    #[test]
    fn test_form_counts() {
        let (judgments, results) = fixture();
        let rels = RankedRels::form(
            &EvalParams::default(),
            judgments.get("q1").unwrap(),
            results.get("q1").unwrap(),
        );
        assert_eq!(rels.rel_list, vec![Some(2), None, Some(0), Some(1)]);
        assert_eq!(rels.num_ret, 4);
        assert_eq!(rels.num_rel, 3);
        assert_eq!(rels.num_rel_ret, 2);
        assert_eq!(rels.num_nonrel, 1);
        assert_eq!(rels.rel_ranks().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(rels.rel_in_top(2), 1);
    }

    #[test]
    fn test_relevance_level_two() {
        let (judgments, results) = fixture();
        let epi = EvalParams {
            relevance_level: 2,
            ..EvalParams::default()
        };
        let rels = RankedRels::form(&epi, judgments.get("q1").unwrap(), results.get("q1").unwrap());
        assert_eq!(rels.num_rel, 1);
        assert_eq!(rels.num_rel_ret, 1);
        assert_eq!(rels.num_nonrel, 3);
    }

    #[test]
    fn test_judged_only_and_truncation() {
        let (judgments, results) = fixture();
        let epi = EvalParams {
            judged_docs_only: true,
            max_docs_per_query: Some(2),
            ..EvalParams::default()
        };
        let rels = RankedRels::form(&epi, judgments.get("q1").unwrap(), results.get("q1").unwrap());
        assert_eq!(rels.rel_list, vec![Some(2), Some(0)]);
        assert_eq!(rels.num_ret, 2);
    }
}
