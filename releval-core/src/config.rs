//! Configuration system for releval.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! explicit config file -> environment -> explicit overrides. The user config
//! lives at `~/.config/releval/config.toml` (platform equivalent via
//! `directories`).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::engine::EvalParams;
use crate::error::{ConfigError, RelevalError, Result};

/// Evaluation settings a session is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Minimum grade counted as relevant. Must be at least 1.
    pub relevance_level: i64,
    /// Ignore retrieved documents without a judgment.
    pub judged_docs_only: bool,
    /// Consider at most this many retrieved documents per query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_docs_per_query: Option<usize>,
    /// Measure specifiers, e.g. `["map", "P.5,10"]`.
    pub measures: Vec<String>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            relevance_level: 1,
            judged_docs_only: false,
            max_docs_per_query: None,
            measures: vec!["map".into(), "P".into(), "ndcg".into()],
        }
    }
}

impl EvalConfig {
    /// Engine parameters, validated.
    pub fn eval_params(&self) -> Result<EvalParams> {
        let epi = EvalParams {
            relevance_level: self.relevance_level,
            judged_docs_only: self.judged_docs_only,
            max_docs_per_query: self.max_docs_per_query,
        };
        epi.validate()?;
        Ok(epi)
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `RELEVAL_`)
/// 3. Explicit config file (`config_file`)
/// 4. User config (`~/.config/releval/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    config_file: Option<&Path>,
    overrides: Option<&EvalConfig>,
) -> Result<EvalConfig> {
    let mut figment = Figment::from(Serialized::defaults(EvalConfig::default()));

    if let Some(dirs) = directories::ProjectDirs::from("dev", "releval", "releval") {
        let user_config = dirs.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(path) = config_file {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        figment = figment.merge(Toml::file(path));
    }

    // RELEVAL_RELEVANCE_LEVEL, RELEVAL_JUDGED_DOCS_ONLY, ...
    figment = figment.merge(Env::prefixed("RELEVAL_"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(|e| {
        RelevalError::from(ConfigError::ParseError {
            message: e.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = EvalConfig::default();
        assert_eq!(config.relevance_level, 1);
        assert!(!config.judged_docs_only);
        assert_eq!(config.measures, vec!["map", "P", "ndcg"]);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = EvalConfig {
            max_docs_per_query: Some(100),
            ..EvalConfig::default()
        };
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: EvalConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_eval_params_validation() {
        let config = EvalConfig {
            relevance_level: 0,
            ..EvalConfig::default()
        };
        assert!(matches!(
            config.eval_params(),
            Err(RelevalError::InvalidValue { .. })
        ));

        let config = EvalConfig {
            max_docs_per_query: Some(0),
            ..EvalConfig::default()
        };
        assert!(config.eval_params().is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "relevance_level = 2\njudged_docs_only = true\nmeasures = [\"P.5\", \"bpref\"]"
        )
        .unwrap();

        let config = load_config(Some(file.path()), None).unwrap();
        assert_eq!(config.relevance_level, 2);
        assert!(config.judged_docs_only);
        assert_eq!(config.measures, vec!["P.5", "bpref"]);
    }

    #[test]
    fn test_load_config_overrides_win() {
        let overrides = EvalConfig {
            measures: vec!["recip_rank".into()],
            ..EvalConfig::default()
        };
        let config = load_config(None, Some(&overrides)).unwrap();
        assert_eq!(config.measures, vec!["recip_rank"]);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/releval.toml")), None).unwrap_err();
        assert!(matches!(
            err,
            RelevalError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
