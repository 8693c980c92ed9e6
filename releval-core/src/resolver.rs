//! Measure specifier resolution.
//!
//! A specifier is either a bare catalog name (`map`) or a name with a
//! parameter suffix (`P.5,10`). Resolution is all-or-nothing: every distinct
//! specifier must map to its own catalog entry or the whole set is rejected.

use std::collections::{BTreeMap, BTreeSet};

use crate::engine::{CatalogWindow, MeasureCatalog, MeasureParams};
use crate::error::{RelevalError, Result};

/// Separates a measure name from its parameter suffix.
pub const PARAM_DELIMITER: char = '.';

/// Split a specifier into base name and optional raw parameters.
pub fn split_specifier(specifier: &str) -> (&str, Option<&str>) {
    match specifier.split_once(PARAM_DELIMITER) {
        Some((name, params)) => (name, Some(params)),
        None => (specifier, None),
    }
}

/// A measure resolved against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureSpec {
    /// Position in the catalog.
    pub index: usize,
    pub name: &'static str,
    /// Parameter suffix as supplied, e.g. `"5,10,15"`.
    pub raw_params: Option<String>,
    params: Option<MeasureParams>,
}

impl MeasureSpec {
    /// Parsed override, if the specifier carried one.
    pub fn params(&self) -> Option<&MeasureParams> {
        self.params.as_ref()
    }
}

/// Resolved measures, ordered by catalog index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureSet {
    specs: Vec<MeasureSpec>,
}

impl MeasureSet {
    /// Resolve `specifiers` against `catalog`.
    ///
    /// Fails with `MeasureResolution` when a name is unknown or two specifiers
    /// share a base name, and with `InvalidValue` when a parameter suffix does
    /// not parse for its measure.
    pub fn resolve<I, S>(catalog: &MeasureCatalog, specifiers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = specifiers
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut resolved: BTreeMap<usize, MeasureSpec> = BTreeMap::new();
        let mut unresolved = Vec::new();

        for specifier in &distinct {
            let (name, raw_params) = split_specifier(specifier);
            let Some(index) = catalog.position(name) else {
                unresolved.push(specifier.clone());
                continue;
            };

            let measure = catalog.measure(index);
            let params = raw_params.map(|raw| measure.parse_params(raw)).transpose()?;

            if let Some(existing) = resolved.get(&index) {
                tracing::debug!(
                    measure = measure.name(),
                    first = ?existing.raw_params,
                    second = ?raw_params,
                    "Conflicting specifiers for one measure"
                );
                unresolved.push(specifier.clone());
                continue;
            }

            resolved.insert(
                index,
                MeasureSpec {
                    index,
                    name: measure.name(),
                    raw_params: raw_params.map(str::to_string),
                    params,
                },
            );
        }

        if !unresolved.is_empty() || resolved.len() != distinct.len() {
            return Err(RelevalError::MeasureResolution { unresolved });
        }

        Ok(Self {
            specs: resolved.into_values().collect(),
        })
    }

    pub fn specs(&self) -> &[MeasureSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Restore every entry this set uses to its default, then apply this
    /// set's overrides. The returned window restores defaults again on drop.
    pub(crate) fn apply<'a>(&self, catalog: &'a mut MeasureCatalog) -> CatalogWindow<'a> {
        let mut window = catalog.window();
        for spec in &self.specs {
            window.apply(spec.index, spec.params());
        }
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_specifier() {
        assert_eq!(split_specifier("map"), ("map", None));
        assert_eq!(split_specifier("P.5,10"), ("P", Some("5,10")));
        assert_eq!(split_specifier("set_F.0.5"), ("set_F", Some("0.5")));
    }

    #[test]
    fn test_resolve_known_measures() {
        let catalog = MeasureCatalog::builtin();
        let set = MeasureSet::resolve(&catalog, ["ndcg", "map", "map"]).unwrap();
        assert_eq!(set.len(), 2);
        // Ordered by catalog index: map precedes ndcg.
        let names: Vec<_> = set.specs().iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["map", "ndcg"]);
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let catalog = MeasureCatalog::builtin();
        let err = MeasureSet::resolve(&catalog, ["map", "nonexistent"]).unwrap_err();
        match err {
            RelevalError::MeasureResolution { unresolved } => {
                assert_eq!(unresolved, vec!["nonexistent".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let catalog = MeasureCatalog::builtin();
        assert!(MeasureSet::resolve(&catalog, ["MAP"]).is_err());
    }

    #[test]
    fn test_resolve_override() {
        let catalog = MeasureCatalog::builtin();
        let set = MeasureSet::resolve(&catalog, ["P.10,5"]).unwrap();
        let spec = &set.specs()[0];
        assert_eq!(spec.name, "P");
        assert_eq!(spec.raw_params.as_deref(), Some("10,5"));
        assert_eq!(spec.params(), Some(&MeasureParams::LongCutoffs(vec![5, 10])));
    }

    #[test]
    fn test_resolve_conflicting_base_names_fails() {
        let catalog = MeasureCatalog::builtin();
        assert!(matches!(
            MeasureSet::resolve(&catalog, ["P.5", "P.10"]),
            Err(RelevalError::MeasureResolution { .. })
        ));
        assert!(MeasureSet::resolve(&catalog, ["P", "P.5"]).is_err());
    }

    #[test]
    fn test_resolve_bad_params_is_invalid_value() {
        let catalog = MeasureCatalog::builtin();
        assert!(matches!(
            MeasureSet::resolve(&catalog, ["P.abc"]),
            Err(RelevalError::InvalidValue { .. })
        ));
        assert!(matches!(
            MeasureSet::resolve(&catalog, ["map.5"]),
            Err(RelevalError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_resolve_empty_set() {
        let catalog = MeasureCatalog::builtin();
        let set = MeasureSet::resolve(&catalog, Vec::<String>::new()).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_apply_and_restore() {
        let mut catalog = MeasureCatalog::builtin();
        let set = MeasureSet::resolve(&catalog, ["P.3"]).unwrap();
        let p = set.specs()[0].index;
        {
            let window = set.apply(&mut catalog);
            assert_eq!(window.params(p), &MeasureParams::LongCutoffs(vec![3]));
        }
        assert_eq!(catalog.params(p), catalog.default_params(p));
    }
}
