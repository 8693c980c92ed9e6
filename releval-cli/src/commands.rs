//! CLI subcommand handlers.

use anyhow::Context;
use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;

use releval_core::{
    EvalConfig, EvaluationResults, EvaluationSession, MeasureCatalog, MeasureParams, aggregate,
    expand_nicknames, load_config,
};

use crate::{Commands, EvaluateArgs};

/// Label of the aggregate entry added by `--aggregate`.
const AGGREGATE_QID: &str = "all";

/// Handle a CLI subcommand.
pub fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Evaluate(args) => handle_evaluate(args),
        Commands::Measures => {
            print!("{}", render_catalog(&MeasureCatalog::builtin()));
            Ok(())
        }
    }
}

fn handle_evaluate(args: EvaluateArgs) -> anyhow::Result<()> {
    let config = load_config(args.config.as_deref(), None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    let config = apply_args(config, &args);
    tracing::debug!(
        measures = ?config.measures,
        relevance_level = config.relevance_level,
        "Resolved configuration"
    );

    let qrels = read_json(&args.qrels)?;
    let run = read_json(&args.run)?;

    let session = EvaluationSession::with_config(&qrels, &config)
        .context("Failed to set up evaluation")?;
    let results = session.evaluate(&run).context("Failed to evaluate run")?;

    let report = build_report(results, args.aggregate)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Command-line options win over every configuration layer. Nicknames are
/// expanded into their member measures.
fn apply_args(mut config: EvalConfig, args: &EvaluateArgs) -> EvalConfig {
    if !args.measures.is_empty() {
        config.measures = args.measures.clone();
    }
    if let Some(level) = args.relevance_level {
        config.relevance_level = level;
    }
    if args.judged_docs_only {
        config.judged_docs_only = true;
    } else if args.no_judged_docs_only {
        config.judged_docs_only = false;
    }
    if args.max_docs_per_query.is_some() {
        config.max_docs_per_query = args.max_docs_per_query;
    }
    config.measures = expand_nicknames(&MeasureCatalog::builtin(), &config.measures)
        .into_iter()
        .collect();
    config
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

/// The aggregate entry may not shadow a query of the same id.
fn build_report(
    mut results: EvaluationResults,
    with_aggregate: bool,
) -> anyhow::Result<EvaluationResults> {
    if with_aggregate {
        if results.contains_key(AGGREGATE_QID) {
            anyhow::bail!(
                "Cannot add the aggregate entry: the run already has a query named '{AGGREGATE_QID}'"
            );
        }
        let all = aggregate(&results);
        results.insert(AGGREGATE_QID.to_string(), all);
    }
    Ok(results)
}

fn describe_params(params: &MeasureParams) -> String {
    match params {
        MeasureParams::None => String::new(),
        MeasureParams::LongCutoffs(cutoffs) => join(cutoffs.iter()),
        MeasureParams::FloatCutoffs(cutoffs) => join(cutoffs.iter().map(|x| format!("{x:.2}"))),
        MeasureParams::Float(value) => value.to_string(),
        MeasureParams::GainPairs(pairs) => {
            join(pairs.iter().map(|(grade, gain)| format!("{grade}={gain}")))
        }
    }
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

fn render_catalog(catalog: &MeasureCatalog) -> String {
    let width = catalog.names().map(str::len).max().unwrap_or(0);
    let mut out = String::from("Measures:\n");
    for idx in 0..catalog.len() {
        let measure = catalog.measure(idx);
        let defaults = describe_params(catalog.default_params(idx));
        let _ = write!(out, "  {:<width$}  {}", measure.name(), measure.explanation());
        if !defaults.is_empty() {
            let _ = write!(out, " [default: {defaults}]");
        }
        out.push('\n');
    }

    out.push_str("\nNicknames:\n");
    for (nick, members) in catalog.nicknames() {
        let _ = writeln!(out, "  {nick}: {}", members.join(" "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::path::PathBuf;

    fn args(measures: &[&str]) -> EvaluateArgs {
        EvaluateArgs {
            qrels: PathBuf::from("qrels.json"),
            run: PathBuf::from("run.json"),
            measures: measures.iter().map(|m| m.to_string()).collect(),
            relevance_level: None,
            judged_docs_only: false,
            no_judged_docs_only: false,
            max_docs_per_query: None,
            aggregate: false,
            config: None,
        }
    }

    #[test]
    fn test_apply_args_overrides_config() {
        let mut cli = args(&["P.5", "map"]);
        cli.relevance_level = Some(2);
        cli.max_docs_per_query = Some(10);
        let config = apply_args(EvalConfig::default(), &cli);
        assert_eq!(config.measures, vec!["P.5", "map"]);
        assert_eq!(config.relevance_level, 2);
        assert_eq!(config.max_docs_per_query, Some(10));
        assert!(!config.judged_docs_only);
    }

    #[test]
    fn test_apply_args_keeps_config_measures() {
        let config = apply_args(EvalConfig::default(), &args(&[]));
        assert_eq!(config.measures, vec!["P", "map", "ndcg"]);
    }

    #[test]
    fn test_apply_args_expands_nicknames() {
        let config = apply_args(EvalConfig::default(), &args(&["set"]));
        assert!(config.measures.contains(&"set_F".to_string()));
        assert!(!config.measures.contains(&"set".to_string()));
    }

    #[test]
    fn test_read_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"q1": {{"d1": 1}}}}"#).unwrap();
        let value = read_json(file.path()).unwrap();
        assert_eq!(value["q1"]["d1"], 1);

        assert!(read_json(Path::new("/nonexistent/run.json")).is_err());
    }

    #[test]
    fn test_build_report_with_aggregate() {
        let mut results = EvaluationResults::new();
        results.insert("q1".into(), [("map".to_string(), 0.5)].into());
        results.insert("q2".into(), [("map".to_string(), 1.0)].into());

        let report = build_report(results.clone(), false).unwrap();
        assert_eq!(report, results);

        let report = build_report(results, true).unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report["all"]["map"], 0.75);
    }

    #[test]
    fn test_build_report_refuses_to_shadow_query() {
        let mut results = EvaluationResults::new();
        results.insert("all".into(), [("map".to_string(), 0.5)].into());
        results.insert("q2".into(), [("map".to_string(), 1.0)].into());

        let err = build_report(results.clone(), true).unwrap_err();
        assert!(err.to_string().contains("'all'"));

        // Without aggregation the query is reported as-is.
        assert_eq!(build_report(results.clone(), false).unwrap(), results);
    }

    #[test]
    fn test_judged_docs_only_can_be_switched_off() {
        let from_config = EvalConfig {
            judged_docs_only: true,
            ..EvalConfig::default()
        };

        let config = apply_args(from_config.clone(), &args(&[]));
        assert!(config.judged_docs_only);

        let mut cli = args(&[]);
        cli.no_judged_docs_only = true;
        assert!(!apply_args(from_config, &cli).judged_docs_only);

        let mut cli = args(&[]);
        cli.judged_docs_only = true;
        assert!(apply_args(EvalConfig::default(), &cli).judged_docs_only);
    }

    #[test]
    fn test_judged_docs_only_flags_parse() {
        use clap::Parser;

        let parse = |extra: &[&str]| {
            let mut argv = vec!["releval", "evaluate", "--qrels", "q.json", "--run", "r.json"];
            argv.extend_from_slice(extra);
            match crate::Cli::try_parse_from(argv).unwrap().command {
                Commands::Evaluate(args) => (args.judged_docs_only, args.no_judged_docs_only),
                Commands::Measures => unreachable!(),
            }
        };

        assert_eq!(parse(&[]), (false, false));
        assert_eq!(parse(&["--no-judged-docs-only"]), (false, true));
        assert_eq!(parse(&["-j", "--no-judged-docs-only"]), (false, true));
        assert_eq!(parse(&["--no-judged-docs-only", "-j"]), (true, false));
    }

    #[test]
    fn test_describe_params() {
        assert_eq!(describe_params(&MeasureParams::None), "");
        assert_eq!(describe_params(&MeasureParams::LongCutoffs(vec![5, 10])), "5,10");
        assert_eq!(
            describe_params(&MeasureParams::FloatCutoffs(vec![0.0, 0.5])),
            "0.00,0.50"
        );
        assert_eq!(describe_params(&MeasureParams::Float(1.0)), "1");
    }

    #[test]
    fn test_render_catalog_lists_everything() {
        let catalog = MeasureCatalog::builtin();
        let rendered = render_catalog(&catalog);
        for name in catalog.names() {
            assert!(rendered.contains(name), "missing {name}");
        }
        assert!(rendered.contains("all_trec:"));
        assert!(rendered.contains("official:"));
        assert!(rendered.contains("[default: 5,10,15,20,30,100,200,500,1000]"));
    }
}
