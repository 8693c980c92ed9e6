//! Folding per-query values into one value per measure label.

use std::collections::BTreeMap;

use crate::assembler::{EvaluationResults, MeasureValues};

/// Aggregate the per-query values of one label.
///
/// `num_` labels are counts and are summed. `gm_` labels hold per-query
/// logarithms, so their aggregate is `exp(mean)`. Everything else is the
/// arithmetic mean. An empty slice aggregates to `0.0`.
pub fn compute_aggregated_measure(label: &str, values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum: f64 = values.iter().sum();
    let mean = sum / values.len() as f64;

    if label.starts_with("num_") {
        sum
    } else if label.starts_with("gm_") {
        mean.exp()
    } else {
        mean
    }
}

/// Aggregate every label across all queries in `results`.
pub fn aggregate(results: &EvaluationResults) -> MeasureValues {
    let mut by_label: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for values in results.values() {
        for (label, &value) in values {
            by_label.entry(label.as_str()).or_default().push(value);
        }
    }

    by_label
        .into_iter()
        .map(|(label, values)| (label.to_string(), compute_aggregated_measure(label, &values)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn results(entries: &[(&str, &[(&str, f64)])]) -> EvaluationResults {
        entries
            .iter()
            .map(|(qid, values)| {
                let values = values.iter().map(|(l, v)| (l.to_string(), *v)).collect();
                (qid.to_string(), values)
            })
            .collect()
    }

    #[test]
    fn test_mean_by_default() {
        assert!((compute_aggregated_measure("map", &[0.2, 0.4]) - 0.3).abs() < 1e-12);
        assert_eq!(compute_aggregated_measure("P_5", &[1.0]), 1.0);
    }

    #[test]
    fn test_counts_are_summed() {
        assert_eq!(compute_aggregated_measure("num_rel", &[3.0, 4.0]), 7.0);
    }

    #[test]
    fn test_geometric_from_logs() {
        let logs = [0.25f64.ln(), 1.0f64.ln()];
        let gm = compute_aggregated_measure("gm_map", &logs);
        assert!((gm - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_values() {
        assert_eq!(compute_aggregated_measure("map", &[]), 0.0);
        assert!(aggregate(&EvaluationResults::new()).is_empty());
    }

    #[test]
    fn test_aggregate_across_queries() {
        let results = results(&[
            ("q1", &[("map", 0.5), ("num_ret", 10.0)]),
            ("q2", &[("map", 1.0), ("num_ret", 5.0)]),
        ]);
        let all = aggregate(&results);
        assert_eq!(all.len(), 2);
        assert_eq!(all["map"], 0.75);
        assert_eq!(all["num_ret"], 15.0);
    }
}
