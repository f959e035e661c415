//! Configuration root: owns every entity collection and drives matrix
//! expansion.

use std::collections::BTreeMap;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use expmat_core::errors::{ErrorInfo, ExpmatError};
use expmat_core::schema::{self, ConfigDoc, MatrixDecl};

use crate::build::{Build, BuildInfo};
use crate::experiment::{Experiment, ExperimentInfo};
use crate::instance::Instance;
use crate::matrix::{expand_matrix, MatrixSelection};
use crate::paths::BaseDirs;
use crate::revision::Revision;
use crate::run::Run;
use crate::variant::Variant;

/// Sort-key marker for the absent revision. Starts with the reserved
/// prefix, so it can never collide with a declared revision name.
const ABSENT_REVISION_KEY: &str = "_none";

/// The entire configuration: all entity collections, built once at load
/// time and read-only afterwards.
///
/// Collections are keyed by name, so iteration order is always the
/// sorted name order; every `all_*` query is restartable and recomputes
/// nothing.
#[derive(Debug)]
pub struct Config {
    base: Arc<BaseDirs>,
    matrix: Option<MatrixDecl>,
    insts: BTreeMap<String, Arc<Instance>>,
    build_infos: BTreeMap<String, Arc<BuildInfo>>,
    revisions: BTreeMap<String, Arc<Revision>>,
    variants: BTreeMap<String, Arc<Variant>>,
    exp_infos: BTreeMap<String, Arc<ExperimentInfo>>,
}

fn reserved_name_error(kind: &str, name: &str) -> ExpmatError {
    ExpmatError::Config(
        ErrorInfo::new(
            "reserved-name",
            "names starting with an underscore are reserved for internal markers",
        )
        .with_context("kind", kind)
        .with_context("name", name),
    )
}

fn ambiguous_name_error(kind: &str, name: &str) -> ExpmatError {
    ExpmatError::Config(
        ErrorInfo::new("ambiguous-name", "the name is declared more than once")
            .with_context("kind", kind)
            .with_context("name", name),
    )
}

fn not_found_error(kind: &str, name: &str) -> ExpmatError {
    ExpmatError::Lookup(
        ErrorInfo::new("not-found", "no entity with this name exists")
            .with_context("kind", kind)
            .with_context("name", name),
    )
}

fn check_reserved(kind: &str, name: &str) -> Result<(), ExpmatError> {
    if schema::is_reserved_name(name) {
        return Err(reserved_name_error(kind, name));
    }
    Ok(())
}

impl Config {
    /// Builds the configuration root from an absolute base directory and
    /// a validated document. Construction is all-or-nothing: the first
    /// name conflict aborts it entirely.
    pub fn new(basedir: impl Into<PathBuf>, doc: ConfigDoc) -> Result<Self, ExpmatError> {
        let basedir = basedir.into();
        if !basedir.is_absolute() {
            return Err(ExpmatError::Config(
                ErrorInfo::new("basedir-relative", "the base directory must be absolute")
                    .with_context("basedir", basedir.display().to_string()),
            ));
        }
        let base = Arc::new(BaseDirs {
            basedir,
            instdir: doc.instdir.clone(),
        });

        let mut insts = BTreeMap::new();
        for block in doc.instances {
            let block = Arc::new(block);
            for index in 0..block.items.len() {
                let inst = Instance::new(base.clone(), block.clone(), index);
                let shortname = inst.shortname().to_string();
                if insts.insert(shortname.clone(), Arc::new(inst)).is_some() {
                    return Err(ambiguous_name_error("instance", &shortname));
                }
            }
        }

        let mut build_infos = BTreeMap::new();
        for decl in doc.builds {
            check_reserved("build", &decl.name)?;
            let name = decl.name.clone();
            let info = Arc::new(BuildInfo::new(Arc::new(decl)));
            if build_infos.insert(name.clone(), info).is_some() {
                return Err(ambiguous_name_error("build", &name));
            }
        }

        let mut revisions = BTreeMap::new();
        for decl in doc.revisions {
            if let Some(name) = &decl.name {
                check_reserved("revision", name)?;
            }
            let revision = Revision::new(Arc::new(decl));
            let name = revision.name().to_string();
            // Two anonymous revisions both claim the default dev name and
            // collide here.
            if revisions.insert(name.clone(), Arc::new(revision)).is_some() {
                return Err(ambiguous_name_error("revision", &name));
            }
        }

        let mut variants = BTreeMap::new();
        for axis in doc.variants {
            check_reserved("axis", &axis.axis)?;
            for decl in axis.items {
                check_reserved("variant", &decl.name)?;
                let name = decl.name.clone();
                let variant = Arc::new(Variant::new(axis.axis.clone(), Arc::new(decl)));
                // Variant names share one flat namespace across all axes,
                // so a variation can be written as a bare list of names.
                if variants.insert(name.clone(), variant).is_some() {
                    return Err(ambiguous_name_error("variant", &name));
                }
            }
        }

        let mut exp_infos = BTreeMap::new();
        for decl in doc.experiments {
            check_reserved("experiment", &decl.name)?;
            let name = decl.name.clone();
            let info = Arc::new(ExperimentInfo::new(Arc::new(decl)));
            if exp_infos.insert(name.clone(), info).is_some() {
                return Err(ambiguous_name_error("experiment", &name));
            }
        }

        Ok(Self {
            base,
            matrix: doc.matrix,
            insts,
            build_infos,
            revisions,
            variants,
            exp_infos,
        })
    }

    /// Absolute base directory of this configuration.
    pub fn basedir(&self) -> &Path {
        &self.base.basedir
    }

    /// Directory that stores all instance files.
    pub fn instance_dir(&self) -> PathBuf {
        self.base.instance_dir()
    }

    pub(crate) fn matrix_decl(&self) -> Option<&MatrixDecl> {
        self.matrix.as_ref()
    }

    /// All instances, ordered by short name.
    pub fn all_instances(&self) -> impl Iterator<Item = &Arc<Instance>> {
        self.insts.values()
    }

    /// Short names of all instances, in order.
    pub fn all_instance_ids(&self) -> impl Iterator<Item = &str> {
        self.insts.keys().map(String::as_str)
    }

    /// Looks up an instance by short name.
    pub fn get_instance(&self, name: &str) -> Result<Arc<Instance>, ExpmatError> {
        self.insts
            .get(name)
            .cloned()
            .ok_or_else(|| not_found_error("instance", name))
    }

    /// All build recipes, ordered by name.
    pub fn all_build_infos(&self) -> impl Iterator<Item = &Arc<BuildInfo>> {
        self.build_infos.values()
    }

    /// Looks up a build recipe by name.
    pub fn get_build_info(&self, name: &str) -> Result<Arc<BuildInfo>, ExpmatError> {
        self.build_infos
            .get(name)
            .cloned()
            .ok_or_else(|| not_found_error("build", name))
    }

    /// All revisions, ordered by name.
    pub fn all_revisions(&self) -> impl Iterator<Item = &Arc<Revision>> {
        self.revisions.values()
    }

    /// Looks up a revision by name.
    pub fn get_revision(&self, name: &str) -> Result<Arc<Revision>, ExpmatError> {
        self.revisions
            .get(name)
            .cloned()
            .ok_or_else(|| not_found_error("revision", name))
    }

    /// All variants across all axes, ordered by name.
    pub fn all_variants(&self) -> impl Iterator<Item = &Arc<Variant>> {
        self.variants.values()
    }

    /// All variants of one axis, ordered by name.
    pub fn all_variants_for_axis<'a>(
        &'a self,
        axis: &'a str,
    ) -> impl Iterator<Item = &'a Arc<Variant>> + 'a {
        self.variants.values().filter(move |var| var.axis() == axis)
    }

    /// Looks up a variant by name.
    pub fn get_variant(&self, name: &str) -> Result<Arc<Variant>, ExpmatError> {
        self.variants
            .get(name)
            .cloned()
            .ok_or_else(|| not_found_error("variant", name))
    }

    /// All experiment definitions, ordered by name.
    pub fn all_experiment_infos(&self) -> impl Iterator<Item = &Arc<ExperimentInfo>> {
        self.exp_infos.values()
    }

    /// Looks up an experiment definition by name.
    pub fn get_experiment_info(&self, name: &str) -> Result<Arc<ExperimentInfo>, ExpmatError> {
        self.exp_infos
            .get(name)
            .cloned()
            .ok_or_else(|| not_found_error("experiment", name))
    }

    /// Cross-joins build recipes with revisions, yielding a [`Build`]
    /// exactly when the revision pins the build's name.
    ///
    /// Only direct presence is checked; whether a build's recursive
    /// requirements are also pinned by the same revision is deliberately
    /// not validated here.
    pub fn all_builds(&self) -> impl Iterator<Item = Build> + '_ {
        self.build_infos.values().flat_map(move |info| {
            self.revisions.values().filter_map(move |revision| {
                if revision.pins(info.name()) {
                    Some(Build::new(self.base.clone(), info.clone(), revision.clone()))
                } else {
                    None
                }
            })
        })
    }

    /// All builds pinned by one revision.
    pub fn all_builds_for_revision<'a>(
        &'a self,
        revision: &'a Arc<Revision>,
    ) -> impl Iterator<Item = Build> + 'a {
        self.all_builds()
            .filter(move |build| build.revision().name() == revision.name())
    }

    /// Binds a build recipe to a revision; fails when the revision does
    /// not pin that build.
    pub fn get_build(&self, name: &str, revision: &Arc<Revision>) -> Result<Build, ExpmatError> {
        let info = self.get_build_info(name)?;
        if !revision.pins(name) {
            return Err(ExpmatError::Lookup(
                ErrorInfo::new("build-not-pinned", "the revision does not pin this build")
                    .with_context("build", name)
                    .with_context("revision", revision.name()),
            ));
        }
        Ok(Build::new(self.base.clone(), info, revision.clone()))
    }

    /// Eligible revisions for one experiment within a selection:
    /// experiments that use builds take the selection's revisions (or
    /// every revision when unrestricted); build-less experiments take the
    /// single absent revision.
    fn revisions_for_experiment(
        &self,
        info: &ExperimentInfo,
        selection: &MatrixSelection,
    ) -> Vec<Option<Arc<Revision>>> {
        if info.used_builds().is_some() {
            match &selection.revisions {
                Some(revisions) => revisions.iter().cloned().map(Some).collect(),
                None => self.revisions.values().cloned().map(Some).collect(),
            }
        } else {
            vec![None]
        }
    }

    fn experiment_sort_key(experiment: &Experiment) -> (String, String, Vec<String>) {
        (
            experiment.name().to_string(),
            experiment
                .revision()
                .map_or_else(|| ABSENT_REVISION_KEY.to_string(), |rev| rev.name().to_string()),
            experiment
                .variation()
                .iter()
                .map(|var| var.name().to_string())
                .collect(),
        )
    }

    /// Expands the matrix into every concrete experiment, deduplicated
    /// and ordered by (name, revision, variation).
    pub fn all_experiments(&self) -> Result<Vec<Experiment>, ExpmatError> {
        expand_matrix(
            self,
            |selection| {
                let mut out = Vec::new();
                for info in &selection.experiments {
                    for revision in self.revisions_for_experiment(info, selection) {
                        for variation in &selection.variations {
                            out.push(Experiment::new(
                                self.base.clone(),
                                info.clone(),
                                revision.clone(),
                                variation.clone(),
                            ));
                        }
                    }
                }
                Ok(out)
            },
            Self::experiment_sort_key,
        )
    }

    /// Expands the matrix into every concrete run, deduplicated and
    /// ordered by (experiment identity, instance, repetition).
    ///
    /// Repetition precedence: the selection's explicit count, else the
    /// experiment's declared `repeat`, else exactly one repetition.
    pub fn discover_all_runs(&self) -> Result<Vec<Run>, ExpmatError> {
        expand_matrix(
            self,
            |selection| {
                let mut out = Vec::new();
                for info in &selection.experiments {
                    for revision in self.revisions_for_experiment(info, selection) {
                        for variation in &selection.variations {
                            for instance in &selection.instances {
                                let repetitions = selection
                                    .repetitions
                                    .or_else(|| info.repeat())
                                    .unwrap_or(1);
                                for repetition in 0..repetitions {
                                    out.push(Run::new(
                                        Experiment::new(
                                            self.base.clone(),
                                            info.clone(),
                                            revision.clone(),
                                            variation.clone(),
                                        ),
                                        instance.clone(),
                                        repetition,
                                    ));
                                }
                            }
                        }
                    }
                }
                Ok(out)
            },
            |run| {
                (
                    Self::experiment_sort_key(run.experiment()),
                    run.instance().shortname().to_string(),
                    run.repetition(),
                )
            },
        )
    }

    /// Collects every successfully finished run and applies `parse` to
    /// its captured output. Runs that are not in a positive state are
    /// skipped; unreadable evidence is an error, never ignored.
    pub fn collect_successful_results<T, F>(&self, mut parse: F) -> Result<Vec<T>, ExpmatError>
    where
        F: FnMut(&Run, &mut dyn BufRead) -> Result<T, ExpmatError>,
    {
        let mut results = Vec::new();
        for run in self.discover_all_runs()? {
            if !run.status()?.is_positive() {
                continue;
            }
            let path = run.output_file_path("out");
            let file = fs::File::open(&path).map_err(|err| {
                ExpmatError::Run(
                    ErrorInfo::new("output-read", "failed to open run output file")
                        .with_context("path", path.display().to_string())
                        .with_hint(err.to_string()),
                )
            })?;
            let mut reader = BufReader::new(file);
            results.push(parse(&run, &mut reader)?);
        }
        Ok(results)
    }
}

/// Loads `experiments.yml` from a base directory and builds the
/// configuration root over its absolute path.
pub fn config_for_dir(basedir: impl AsRef<Path>) -> Result<Config, ExpmatError> {
    let basedir = fs::canonicalize(basedir.as_ref()).map_err(|err| {
        ExpmatError::Config(
            ErrorInfo::new("basedir-resolve", "failed to resolve the base directory")
                .with_context("basedir", basedir.as_ref().display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    let path = basedir.join("experiments.yml");
    let text = fs::read_to_string(&path).map_err(|err| {
        ExpmatError::Config(
            ErrorInfo::new("doc-read", "failed to read the experiments document")
                .with_context("path", path.display().to_string())
                .with_hint(err.to_string()),
        )
    })?;
    Config::new(basedir, schema::from_yaml_str(&text)?)
}
