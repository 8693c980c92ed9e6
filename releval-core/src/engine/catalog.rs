//! The measure catalog: names, nicknames, and working parameters.
//!
//! Entry parameters are mutable: a session's override (`P.5`) is written into
//! the entry for the duration of an evaluation. Defaults live in a snapshot
//! captured once and never mutated, and every evaluation runs inside a
//! [`CatalogWindow`] that restores touched entries from that snapshot on entry
//! and on drop.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Deref;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use super::measures::{BUILTIN_MEASURES, OFFICIAL, SET};
use super::{Measure, MeasureParams};

/// Catalog handle shared between sessions.
pub type SharedCatalog = Arc<Mutex<MeasureCatalog>>;

static BUILTIN_DEFAULTS: LazyLock<Arc<[MeasureParams]>> =
    LazyLock::new(|| BUILTIN_MEASURES.iter().map(|m| m.default_params()).collect());

static GLOBAL_CATALOG: LazyLock<SharedCatalog> =
    LazyLock::new(|| Arc::new(Mutex::new(MeasureCatalog::builtin())));

/// Nickname covering every catalog entry.
pub const ALL_TREC: &str = "all_trec";

struct CatalogEntry {
    measure: &'static dyn Measure,
    params: MeasureParams,
}

pub struct MeasureCatalog {
    entries: Vec<CatalogEntry>,
    defaults: Arc<[MeasureParams]>,
    nicknames: BTreeMap<&'static str, Vec<&'static str>>,
}

impl MeasureCatalog {
    /// A fresh catalog of the built-in measures sharing the process-wide
    /// default snapshot.
    pub fn builtin() -> Self {
        let mut catalog = Self::from_parts(BUILTIN_MEASURES.to_vec(), BUILTIN_DEFAULTS.clone());
        catalog.nicknames.insert("official", OFFICIAL.to_vec());
        catalog.nicknames.insert("set", SET.to_vec());
        catalog
    }

    /// A catalog over custom measures. Defaults are snapshotted here.
    pub fn from_measures(measures: Vec<&'static dyn Measure>) -> Self {
        let defaults = measures.iter().map(|m| m.default_params()).collect();
        Self::from_parts(measures, defaults)
    }

    fn from_parts(measures: Vec<&'static dyn Measure>, defaults: Arc<[MeasureParams]>) -> Self {
        let entries = measures
            .into_iter()
            .zip(defaults.iter())
            .map(|(measure, params)| CatalogEntry {
                measure,
                params: params.clone(),
            })
            .collect::<Vec<_>>();
        let all = entries.iter().map(|e| e.measure.name()).collect();
        Self {
            entries,
            defaults,
            nicknames: BTreeMap::from([(ALL_TREC, all)]),
        }
    }

    /// The process-wide catalog, created on first access.
    pub fn global() -> SharedCatalog {
        GLOBAL_CATALOG.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact, case-sensitive lookup.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.measure.name() == name)
    }

    pub fn measure(&self, index: usize) -> &'static dyn Measure {
        self.entries[index].measure
    }

    /// Current (possibly overridden) parameters of an entry.
    pub fn params(&self, index: usize) -> &MeasureParams {
        &self.entries[index].params
    }

    pub fn default_params(&self, index: usize) -> &MeasureParams {
        &self.defaults[index]
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.measure.name())
    }

    pub fn nicknames(&self) -> &BTreeMap<&'static str, Vec<&'static str>> {
        &self.nicknames
    }

    pub fn restore_default(&mut self, index: usize) {
        self.entries[index].params = self.defaults[index].clone();
    }

    /// Open an override window. Entries touched through it are restored to
    /// their defaults when it drops.
    pub fn window(&mut self) -> CatalogWindow<'_> {
        CatalogWindow {
            catalog: self,
            touched: Vec::new(),
        }
    }
}

/// Lock a shared catalog. A poisoned lock is recovered: windows restore
/// defaults before use, so a panic mid-window leaves nothing behind that the
/// next window trusts.
pub fn lock(catalog: &SharedCatalog) -> MutexGuard<'_, MeasureCatalog> {
    catalog.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Scoped parameter overrides on a catalog.
pub struct CatalogWindow<'a> {
    catalog: &'a mut MeasureCatalog,
    touched: Vec<usize>,
}

impl CatalogWindow<'_> {
    /// Restore an entry to its default, then apply `params` if given.
    pub fn apply(&mut self, index: usize, params: Option<&MeasureParams>) {
        self.catalog.restore_default(index);
        if let Some(params) = params {
            tracing::debug!(
                measure = self.catalog.measure(index).name(),
                params = ?params,
                "Applying parameter override"
            );
            self.catalog.entries[index].params = params.clone();
        }
        self.touched.push(index);
    }
}

impl Deref for CatalogWindow<'_> {
    type Target = MeasureCatalog;

    fn deref(&self) -> &MeasureCatalog {
        &*self.catalog
    }
}

impl Drop for CatalogWindow<'_> {
    fn drop(&mut self) {
        for &index in &self.touched {
            self.catalog.restore_default(index);
        }
    }
}

/// Every base measure name the built-in catalog supports.
pub fn supported_measures() -> BTreeSet<&'static str> {
    lock(&GLOBAL_CATALOG).names().collect()
}

/// Nickname to member names for the built-in catalog.
pub fn nicknames() -> BTreeMap<&'static str, BTreeSet<&'static str>> {
    lock(&GLOBAL_CATALOG)
        .nicknames()
        .iter()
        .map(|(&nick, members)| (nick, members.iter().copied().collect()))
        .collect()
}

/// Replace nickname specifiers with their member names; other specifiers pass
/// through untouched.
pub fn expand_nicknames<I, S>(catalog: &MeasureCatalog, specifiers: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut expanded = BTreeSet::new();
    for spec in specifiers {
        let spec = spec.as_ref();
        match catalog.nicknames().get(spec) {
            Some(members) => expanded.extend(members.iter().map(|m| m.to_string())),
            None => {
                expanded.insert(spec.to_string());
            }
        }
    }
    expanded
}
