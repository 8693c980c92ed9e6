//! Canonical rankings built from host-supplied nested mappings.
//!
//! A host hands over `query -> document -> value` mappings. The builder copies
//! every identifier into owned storage, validates the value type for the
//! variant, and sorts each query's pairs into the order the engine expects:
//!
//! - judgments ([`Relevance`]): document id ascending
//! - system output ([`Score`]): score descending, document id ascending on ties
//!
//! The two variants share one generic builder; the variant only supplies the
//! value extraction and the pair ordering.

use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;

use crate::error::{RelevalError, Result, ShapeViolation};

/// Capability set distinguishing judgments from system output.
pub trait RankingVariant {
    /// Value stored per query/document pair.
    type Value: Copy + fmt::Debug + PartialEq;

    /// Argument name used in error messages for the whole mapping.
    const ARGUMENT: &'static str;

    /// Description of the accepted inner value, used in error messages.
    const EXPECTED: &'static str;

    /// Extract a value from a host node, or `None` if the type is wrong.
    fn extract(raw: &Value) -> Option<Self::Value>;

    /// Canonical ordering of pairs within one query.
    fn compare(
        a: &QueryDocumentPair<Self::Value>,
        b: &QueryDocumentPair<Self::Value>,
    ) -> Ordering;
}

/// Relevance judgments: integer grades, sorted by document id.
#[derive(Debug, Clone, Copy)]
pub struct Relevance;

impl RankingVariant for Relevance {
    type Value = i64;

    const ARGUMENT: &'static str = "query_relevance";
    const EXPECTED: &'static str = "relevance to be integer";

    fn extract(raw: &Value) -> Option<i64> {
        raw.as_i64()
    }

    fn compare(a: &QueryDocumentPair<i64>, b: &QueryDocumentPair<i64>) -> Ordering {
        a.docno.cmp(&b.docno)
    }
}

/// System output: numeric scores, sorted best-first.
#[derive(Debug, Clone, Copy)]
pub struct Score;

impl RankingVariant for Score {
    type Value = f64;

    const ARGUMENT: &'static str = "scores";
    const EXPECTED: &'static str = "matching score to be numeric";

    // Integers are accepted and coerced.
    fn extract(raw: &Value) -> Option<f64> {
        if raw.is_number() { raw.as_f64() } else { None }
    }

    fn compare(a: &QueryDocumentPair<f64>, b: &QueryDocumentPair<f64>) -> Ordering {
        score_order(b.value, a.value).then_with(|| a.docno.cmp(&b.docno))
    }
}

/// Total order on scores where `0.0` and `-0.0` tie.
fn score_order(a: f64, b: f64) -> Ordering {
    if a == b {
        Ordering::Equal
    } else {
        a.total_cmp(&b)
    }
}

/// A document identifier together with its grade or score.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDocumentPair<T> {
    pub docno: String,
    pub value: T,
}

impl<T> QueryDocumentPair<T> {
    pub fn new(docno: impl Into<String>, value: T) -> Self {
        Self {
            docno: docno.into(),
            value,
        }
    }
}

/// One query and its canonically sorted document pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Query<T> {
    qid: String,
    pairs: Vec<QueryDocumentPair<T>>,
}

impl<T> Query<T> {
    pub fn qid(&self) -> &str {
        &self.qid
    }

    pub fn pairs(&self) -> &[QueryDocumentPair<T>] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterate document ids in stored order.
    pub fn docnos(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|p| p.docno.as_str())
    }
}

impl Query<i64> {
    /// Look up the grade of a document. Requires document-id ordering, which
    /// every judged query carries.
    pub fn grade_of(&self, docno: &str) -> Option<i64> {
        self.pairs
            .binary_search_by(|p| p.docno.as_str().cmp(docno))
            .ok()
            .map(|idx| self.pairs[idx].value)
    }
}

/// Judged query (relevance variant).
pub type JudgedQuery = Query<i64>;
/// Ranked query (score variant).
pub type RankedQuery = Query<f64>;

/// An owned, canonically sorted set of queries.
pub struct Ranking<V: RankingVariant> {
    queries: Vec<Query<V::Value>>,
    index: HashMap<String, usize>,
    _variant: PhantomData<V>,
}

/// Relevance judgments, built once per session.
pub type JudgmentSet = Ranking<Relevance>;
/// System output, built fresh per evaluation.
pub type ResultSet = Ranking<Score>;

impl<V: RankingVariant> Ranking<V> {
    /// Marshal a host mapping into a ranking.
    ///
    /// Fails on the first shape violation; nothing built so far survives the
    /// error.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let Some(outer) = raw.as_object() else {
            return Err(RelevalError::shape(
                ShapeViolation::NotMapping,
                format!("argument '{}'", V::ARGUMENT),
            ));
        };

        let mut entries = Vec::with_capacity(outer.len());
        for (qid, docs) in outer {
            let Some(inner) = docs.as_object() else {
                return Err(RelevalError::shape(
                    ShapeViolation::ValueNotMapping,
                    format!("query '{qid}'"),
                ));
            };

            let mut pairs = Vec::with_capacity(inner.len());
            for (docno, raw_value) in inner {
                let Some(value) = V::extract(raw_value) else {
                    return Err(RelevalError::shape(
                        ShapeViolation::InnerValueWrongType {
                            expected: V::EXPECTED,
                        },
                        format!("query '{qid}', document '{docno}'"),
                    ));
                };
                pairs.push(QueryDocumentPair::new(docno.as_str(), value));
            }
            entries.push((qid.clone(), pairs));
        }

        Ok(Self::from_pairs(entries))
    }

    /// Build a ranking from typed entries. Values are already of the right
    /// type, so this cannot fail.
    pub fn from_entries<Q, D, K>(entries: Q) -> Self
    where
        Q: IntoIterator<Item = (K, D)>,
        D: IntoIterator<Item = (K, V::Value)>,
        K: Into<String>,
    {
        Self::from_pairs(entries.into_iter().map(|(qid, docs)| {
            let pairs = docs
                .into_iter()
                .map(|(docno, value)| QueryDocumentPair::new(docno, value))
                .collect();
            (qid.into(), pairs)
        }))
    }

    fn from_pairs(
        entries: impl IntoIterator<Item = (String, Vec<QueryDocumentPair<V::Value>>)>,
    ) -> Self {
        let entries = entries.into_iter();
        let mut queries = Vec::with_capacity(entries.size_hint().0);
        let mut index = HashMap::with_capacity(entries.size_hint().0);

        for (qid, mut pairs) in entries {
            if index.contains_key(&qid) {
                tracing::warn!(qid = %qid, "Duplicate query id, keeping the first");
                continue;
            }

            let duplicates = count_duplicate_docnos(&pairs);
            if duplicates > 0 {
                tracing::warn!(qid = %qid, duplicates, "Duplicate document ids within query");
            }
            pairs.sort_by(V::compare);

            index.insert(qid.clone(), queries.len());
            queries.push(Query { qid, pairs });
        }

        Self {
            queries,
            index,
            _variant: PhantomData,
        }
    }

    pub fn get(&self, qid: &str) -> Option<&Query<V::Value>> {
        self.index.get(qid).map(|&idx| &self.queries[idx])
    }

    pub fn contains(&self, qid: &str) -> bool {
        self.index.contains_key(qid)
    }

    pub fn queries(&self) -> &[Query<V::Value>] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Total number of query/document pairs across all queries.
    pub fn num_pairs(&self) -> usize {
        self.queries.iter().map(Query::len).sum()
    }
}

impl<V: RankingVariant> fmt::Debug for Ranking<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ranking")
            .field("argument", &V::ARGUMENT)
            .field("queries", &self.queries)
            .finish()
    }
}

impl<V: RankingVariant> Clone for Ranking<V> {
    fn clone(&self) -> Self {
        Self {
            queries: self.queries.clone(),
            index: self.index.clone(),
            _variant: PhantomData,
        }
    }
}

/// Number of pairs whose document id already appeared earlier in `pairs`.
fn count_duplicate_docnos<T>(pairs: &[QueryDocumentPair<T>]) -> usize {
    let mut seen = HashSet::with_capacity(pairs.len());
    pairs
        .iter()
        .filter(|pair| !seen.insert(pair.docno.as_str()))
        .count()
}
