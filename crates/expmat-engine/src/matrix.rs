//! Scope restriction and matrix expansion.
//!
//! A scope narrows what a matrix query may select along five independent
//! dimensions plus a repetition count. Expansion walks the restriction
//! tree depth first, extracts concrete tuples at every leaf, then sorts
//! the union by a canonical key and drops adjacent duplicates. Overlapping
//! inclusion rules may legitimately re-select the same tuple from
//! different branches; the contract is "each concrete unit exactly once,
//! deterministically ordered", not "branches are disjoint".

use std::collections::BTreeSet;
use std::sync::Arc;

use expmat_core::errors::ExpmatError;
use expmat_core::schema::MatrixDecl;

use crate::config::Config;
use crate::experiment::ExperimentInfo;
use crate::instance::Instance;
use crate::revision::Revision;
use crate::variant::Variant;

/// Five independently-nullable restriction sets plus a nullable
/// repetition count. `None` means unrestricted, which is distinct from an
/// empty set (nothing selected).
#[derive(Debug, Clone, Default)]
pub(crate) struct MatrixScope {
    pub(crate) experiments: Option<BTreeSet<String>>,
    pub(crate) revisions: Option<BTreeSet<String>>,
    pub(crate) axes: Option<BTreeSet<String>>,
    pub(crate) variants: Option<BTreeSet<String>>,
    pub(crate) instsets: Option<BTreeSet<String>>,
    pub(crate) repetitions: Option<usize>,
}

/// An unrestricted slot adopts the child's list; two restricted slots
/// narrow to their intersection.
fn restrict_set(
    broad: &Option<BTreeSet<String>>,
    narrow: Option<&Vec<String>>,
) -> Option<BTreeSet<String>> {
    match (broad, narrow) {
        (broad, None) => broad.clone(),
        (None, Some(narrow)) => Some(narrow.iter().cloned().collect()),
        (Some(broad), Some(narrow)) => Some(
            narrow
                .iter()
                .filter(|name| broad.contains(*name))
                .cloned()
                .collect(),
        ),
    }
}

impl MatrixScope {
    /// The fully unrestricted root scope.
    pub(crate) fn unrestricted() -> Self {
        Self::default()
    }

    /// Narrows this scope by one node of the restriction tree.
    pub(crate) fn restrict(&self, decl: &MatrixDecl) -> Self {
        Self {
            experiments: restrict_set(&self.experiments, decl.experiments.as_ref()),
            revisions: restrict_set(&self.revisions, decl.revisions.as_ref()),
            axes: restrict_set(&self.axes, decl.axes.as_ref()),
            variants: restrict_set(&self.variants, decl.variants.as_ref()),
            instsets: restrict_set(&self.instsets, decl.instsets.as_ref()),
            // Repetition counts denote zero-based ranges; intersecting
            // two ranges keeps the smaller count.
            repetitions: match (self.repetitions, decl.repetitions) {
                (reps, None) => reps,
                (None, reps) => reps,
                (Some(a), Some(b)) => Some(a.min(b)),
            },
        }
    }
}

/// Concrete entity lists resolved from a leaf scope.
pub(crate) struct MatrixSelection {
    pub(crate) experiments: Vec<Arc<ExperimentInfo>>,
    /// `None` means every revision is independently eligible, not the
    /// absent revision.
    pub(crate) revisions: Option<Vec<Arc<Revision>>>,
    pub(crate) variations: Vec<Vec<Arc<Variant>>>,
    pub(crate) instances: Vec<Arc<Instance>>,
    pub(crate) repetitions: Option<usize>,
}

/// Resolves a leaf scope to its selection. Unknown experiment, revision
/// or variant names fail immediately; nothing is silently dropped.
pub(crate) fn selection_from_scope(
    cfg: &Config,
    scope: &MatrixScope,
) -> Result<MatrixSelection, ExpmatError> {
    let experiments = match &scope.experiments {
        Some(names) => names
            .iter()
            .map(|name| cfg.get_experiment_info(name))
            .collect::<Result<Vec<_>, _>>()?,
        None => cfg.all_experiment_infos().cloned().collect(),
    };

    let revisions = match &scope.revisions {
        Some(names) => Some(
            names
                .iter()
                .map(|name| cfg.get_revision(name))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => None,
    };

    let instances = match &scope.instsets {
        Some(sets) => cfg
            .all_instances()
            .filter(|inst| {
                inst.instsets()
                    .iter()
                    .copied()
                    .any(|set| set.map_or(false, |name| sets.contains(name)))
            })
            .cloned()
            .collect(),
        None => cfg.all_instances().cloned().collect(),
    };

    Ok(MatrixSelection {
        experiments,
        revisions,
        variations: variations_from_scope(cfg, scope)?,
        instances,
        repetitions: scope.repetitions,
    })
}

/// Resolves the variation list of a scope: one representative per
/// eligible axis, as a Cartesian product across axes.
///
/// Variant names within a variation are canonicalized by sorting so that
/// variation identity never depends on axis enumeration order. Axes that
/// contribute no variant collapse to a placeholder that is dropped from
/// the tuple.
fn variations_from_scope(
    cfg: &Config,
    scope: &MatrixScope,
) -> Result<Vec<Vec<Arc<Variant>>>, ExpmatError> {
    // Unknown variant names in the restriction are errors regardless of
    // which axes end up eligible.
    if let Some(names) = &scope.variants {
        for name in names {
            cfg.get_variant(name)?;
        }
    }

    let axes: BTreeSet<String> = match &scope.axes {
        Some(axes) => axes.clone(),
        None => cfg.all_variants().map(|var| var.axis().to_string()).collect(),
    };

    // The restriction touches an axis only when it names at least one of
    // the axis's variants; otherwise the whole axis stays eligible.
    let restriction_touches_axis = |axis: &str| -> bool {
        scope.variants.as_ref().is_some_and(|names| {
            cfg.all_variants_for_axis(axis)
                .any(|var| names.contains(var.name()))
        })
    };

    let mut bundle: Vec<Vec<Option<String>>> = Vec::new();
    for axis in &axes {
        let eligible: BTreeSet<String> = match &scope.variants {
            Some(names) if restriction_touches_axis(axis.as_str()) => cfg
                .all_variants_for_axis(axis)
                .filter(|var| names.contains(var.name()))
                .map(|var| var.name().to_string())
                .collect(),
            _ => cfg
                .all_variants_for_axis(axis)
                .map(|var| var.name().to_string())
                .collect(),
        };
        if eligible.is_empty() {
            bundle.push(vec![None]);
        } else {
            bundle.push(eligible.into_iter().map(Some).collect());
        }
    }

    let mut variations = Vec::new();
    for product in cartesian_product(&bundle) {
        let mut names: Vec<&String> = product.into_iter().flatten().collect();
        names.sort();
        let variation = names
            .into_iter()
            .map(|name| cfg.get_variant(name))
            .collect::<Result<Vec<_>, _>>()?;
        variations.push(variation);
    }
    Ok(variations)
}

/// Cartesian product over the per-axis candidate lists. The empty bundle
/// yields exactly one empty combination.
fn cartesian_product<T: Clone>(bundle: &[Vec<T>]) -> Vec<Vec<&T>> {
    let mut products: Vec<Vec<&T>> = vec![Vec::new()];
    for candidates in bundle {
        let mut next = Vec::with_capacity(products.len() * candidates.len());
        for prefix in &products {
            for candidate in candidates {
                let mut extended = prefix.clone();
                extended.push(candidate);
                next.push(extended);
            }
        }
        products = next;
    }
    products
}

/// Walks the restriction tree depth first, invoking `extract` on the
/// selection of every leaf, then sorts the union by `key` and drops
/// adjacent duplicates.
pub(crate) fn expand_matrix<T, K, F>(
    cfg: &Config,
    mut extract: F,
    key: impl Fn(&T) -> K,
) -> Result<Vec<T>, ExpmatError>
where
    K: Ord,
    F: FnMut(&MatrixSelection) -> Result<Vec<T>, ExpmatError>,
{
    fn walk<T>(
        cfg: &Config,
        scope: &MatrixScope,
        decl: &MatrixDecl,
        extract: &mut dyn FnMut(&MatrixSelection) -> Result<Vec<T>, ExpmatError>,
        out: &mut Vec<T>,
    ) -> Result<(), ExpmatError> {
        let scope = scope.restrict(decl);
        match &decl.include {
            Some(children) => {
                for child in children {
                    walk(cfg, &scope, child, extract, out)?;
                }
            }
            None => {
                let selection = selection_from_scope(cfg, &scope)?;
                out.extend(extract(&selection)?);
            }
        }
        Ok(())
    }

    let mut unordered = Vec::new();
    let root = MatrixScope::unrestricted();
    match cfg.matrix_decl() {
        Some(decl) => walk(cfg, &root, decl, &mut extract, &mut unordered)?,
        None => {
            let selection = selection_from_scope(cfg, &root)?;
            unordered.extend(extract(&selection)?);
        }
    }

    let mut keyed: Vec<(K, T)> = unordered
        .into_iter()
        .map(|item| (key(&item), item))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.dedup_by(|a, b| a.0 == b.0);
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}
