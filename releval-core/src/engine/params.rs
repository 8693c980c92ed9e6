//! Measure parameters and their textual form.
//!
//! A parameter suffix such as `"5,10,15"` is parsed according to the kind of
//! the measure's default parameters, so `P.5,10` yields long cutoffs while
//! `iprec_at_recall.0.5` yields float cutoffs.

use serde::{Deserialize, Serialize};

use crate::error::{RelevalError, Result};

/// Parameters attached to a catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureParams {
    /// The measure takes no parameters.
    None,
    /// Rank cutoffs, ascending and distinct.
    LongCutoffs(Vec<usize>),
    /// Fractional cutoffs (recall levels, R multiples), ascending and distinct.
    FloatCutoffs(Vec<f64>),
    /// A single float, e.g. the F-measure beta.
    Float(f64),
    /// Relevance grade to gain mapping, ascending by grade.
    GainPairs(Vec<(i64, f64)>),
}

impl MeasureParams {
    /// Parse `raw` as parameters of the same kind as `self`.
    pub fn parse_like(&self, measure: &str, raw: &str) -> Result<Self> {
        let invalid = |reason: &str| {
            RelevalError::invalid_value(format!(
                "invalid parameters '{raw}' for measure '{measure}': {reason}"
            ))
        };

        match self {
            Self::None => Err(invalid("measure takes no parameters")),
            Self::LongCutoffs(_) => {
                let mut cutoffs = split_list(raw)
                    .map(|item| match item.parse::<usize>() {
                        Ok(k) if k > 0 => Ok(k),
                        _ => Err(invalid("expected positive integer cutoffs")),
                    })
                    .collect::<Result<Vec<_>>>()?;
                if cutoffs.is_empty() {
                    return Err(invalid("empty cutoff list"));
                }
                cutoffs.sort_unstable();
                cutoffs.dedup();
                Ok(Self::LongCutoffs(cutoffs))
            }
            Self::FloatCutoffs(_) => {
                let mut cutoffs = split_list(raw)
                    .map(|item| parse_finite(item).ok_or_else(|| invalid("expected numbers")))
                    .collect::<Result<Vec<_>>>()?;
                if cutoffs.is_empty() {
                    return Err(invalid("empty cutoff list"));
                }
                cutoffs.sort_by(f64::total_cmp);
                cutoffs.dedup();
                // Every cutoff must keep its own value name.
                if let Some(pair) = cutoffs
                    .windows(2)
                    .find(|w| float_label(w[0]) == float_label(w[1]))
                {
                    return Err(invalid(&format!(
                        "cutoffs {} and {} share the name suffix {}",
                        pair[0],
                        pair[1],
                        float_label(pair[0])
                    )));
                }
                Ok(Self::FloatCutoffs(cutoffs))
            }
            Self::Float(_) => parse_finite(raw.trim())
                .map(Self::Float)
                .ok_or_else(|| invalid("expected a number")),
            Self::GainPairs(_) => {
                let mut pairs = split_list(raw)
                    .map(|item| {
                        let (grade, gain) = item
                            .split_once('=')
                            .ok_or_else(|| invalid("expected grade=gain pairs"))?;
                        let grade = grade
                            .trim()
                            .parse::<i64>()
                            .map_err(|_| invalid("grade must be an integer"))?;
                        let gain =
                            parse_finite(gain.trim()).ok_or_else(|| invalid("gain must be a number"))?;
                        Ok((grade, gain))
                    })
                    .collect::<Result<Vec<_>>>()?;
                if pairs.is_empty() {
                    return Err(invalid("empty gain list"));
                }
                pairs.sort_by_key(|&(grade, _)| grade);
                pairs.dedup_by_key(|&mut (grade, _)| grade);
                Ok(Self::GainPairs(pairs))
            }
        }
    }

    /// Number of cut values carried.
    pub fn num_cutoffs(&self) -> usize {
        match self {
            Self::LongCutoffs(c) => c.len(),
            Self::FloatCutoffs(c) => c.len(),
            _ => 0,
        }
    }

    /// Fully qualified value names for a cut-style measure.
    pub fn cut_names(&self, measure: &str) -> Vec<String> {
        match self {
            Self::LongCutoffs(c) => c.iter().map(|k| format!("{measure}_{k}")).collect(),
            Self::FloatCutoffs(c) => c
                .iter()
                .map(|&x| format!("{measure}_{}", float_label(x)))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn long_cutoffs(&self) -> &[usize] {
        match self {
            Self::LongCutoffs(c) => c,
            _ => &[],
        }
    }

    pub fn float_cutoffs(&self) -> &[f64] {
        match self {
            Self::FloatCutoffs(c) => c,
            _ => &[],
        }
    }

    /// Gain for `grade`; grades without an explicit pair gain their own value.
    pub fn gain(&self, grade: i64) -> f64 {
        match self {
            Self::GainPairs(pairs) => pairs
                .binary_search_by_key(&grade, |&(g, _)| g)
                .map(|idx| pairs[idx].1)
                .unwrap_or(grade as f64),
            _ => grade as f64,
        }
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn float_label(x: f64) -> String {
    format!("{x:.2}")
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|x| x.is_finite())
}
