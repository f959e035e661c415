//! Typed configuration document consumed by the engine.
//!
//! The engine never walks a raw YAML tree: a document is deserialized into
//! these structs up front and every later query operates on the typed form.
//! Unknown keys are rejected during deserialization so that schema drift
//! surfaces at load time rather than as silently ignored settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, ExpmatError};

/// Names starting with this prefix are reserved for internal markers
/// (the default dev revision, the absent-revision sort key, etc.).
pub const RESERVED_PREFIX: char = '_';

/// Name claimed by a revision that omits its own.
pub const DEFAULT_DEV_NAME: &str = "_dev";

/// A YAML field that accepts either a single string or a list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// Single bare string.
    One(String),
    /// Explicit list form.
    Many(Vec<String>),
}

impl OneOrMany {
    /// Returns the field contents as a slice-backed vector of names.
    pub fn names(&self) -> Vec<&str> {
        match self {
            OneOrMany::One(name) => vec![name.as_str()],
            OneOrMany::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Root of a validated experiments document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDoc {
    /// Directory (relative to the base directory) storing instance files.
    #[serde(default = "ConfigDoc::default_instdir")]
    pub instdir: String,
    /// Instance blocks, each contributing one or more instances.
    #[serde(default)]
    pub instances: Vec<InstanceBlock>,
    /// Build recipes.
    #[serde(default)]
    pub builds: Vec<BuildDecl>,
    /// Pinned revision declarations.
    #[serde(default)]
    pub revisions: Vec<RevisionDecl>,
    /// Variant axes.
    #[serde(default)]
    pub variants: Vec<AxisDecl>,
    /// Experiment definitions.
    #[serde(default)]
    pub experiments: Vec<ExperimentDecl>,
    /// Optional matrix restriction tree.
    #[serde(default)]
    pub matrix: Option<MatrixDecl>,
}

impl ConfigDoc {
    fn default_instdir() -> String {
        "instances".to_string()
    }
}

impl Default for ConfigDoc {
    fn default() -> Self {
        Self {
            instdir: Self::default_instdir(),
            instances: Vec::new(),
            builds: Vec::new(),
            revisions: Vec::new(),
            variants: Vec::new(),
            experiments: Vec::new(),
            matrix: None,
        }
    }
}

/// One `instances` stanza; `items` expands to one instance per entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct InstanceBlock {
    /// Remote repository the instances can be fetched from.
    #[serde(default)]
    pub repo: Option<String>,
    /// Generator command producing the instance files.
    #[serde(default)]
    pub generator: Option<GeneratorDecl>,
    /// Instance-set membership shared by all items of the block.
    #[serde(default)]
    pub set: Option<OneOrMany>,
    /// Extensions shared by all items; each item then maps to one file
    /// per extension.
    #[serde(default)]
    pub extensions: Option<Vec<String>>,
    /// The instances themselves.
    #[serde(default)]
    pub items: Vec<InstanceItemDecl>,
}

/// Generator provenance for synthesized instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratorDecl {
    /// Argument template; occurrences of `@INSTANCE_FILENAME@` are
    /// substituted by the acquisition layer.
    pub args: Vec<String>,
}

/// A single instance item: either a bare filename or a named group of
/// backing files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstanceItemDecl {
    /// Bare filename; the shortname is derived by stripping the extension.
    Name(String),
    /// Named instance backed by several files.
    Detailed {
        /// Instance name.
        name: String,
        /// Backing files.
        files: Vec<String>,
    },
}

impl InstanceItemDecl {
    /// Declared name of the item.
    pub fn name(&self) -> &str {
        match self {
            InstanceItemDecl::Name(name) => name,
            InstanceItemDecl::Detailed { name, .. } => name,
        }
    }
}

/// One step of a build recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct BuildStepDecl {
    /// Command line of the step.
    pub args: Vec<String>,
    /// Extra environment entries for the step.
    #[serde(default)]
    pub environ: BTreeMap<String, String>,
    /// Working directory override, relative to the stage directory.
    #[serde(default)]
    pub workdir: Option<String>,
}

/// Static recipe of a buildable component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildDecl {
    /// Build name, unique across the document.
    pub name: String,
    /// Names of builds that must be installed first.
    #[serde(default)]
    pub requires: Option<OneOrMany>,
    /// Git repository holding the sources.
    #[serde(default)]
    pub git: Option<String>,
    /// Clone submodules recursively.
    #[serde(default, rename = "recursive-clone")]
    pub recursive_clone: bool,
    /// Steps run after checkout to regenerate derived sources.
    #[serde(default)]
    pub regenerate: Vec<BuildStepDecl>,
    /// Configure steps.
    #[serde(default)]
    pub configure: Vec<BuildStepDecl>,
    /// Compile steps.
    #[serde(default)]
    pub compile: Vec<BuildStepDecl>,
    /// Install steps.
    #[serde(default)]
    pub install: Vec<BuildStepDecl>,
}

/// A pinned set of build versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevisionDecl {
    /// Revision name; at most one revision may omit it and claim the
    /// default dev identity.
    #[serde(default)]
    pub name: Option<String>,
    /// Mapping from build name to pinned version string.
    #[serde(default)]
    pub build_version: BTreeMap<String, String>,
    /// Marks a live checkout instead of a pinned clone.
    #[serde(default)]
    pub develop: bool,
}

/// One axis of parameter variation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxisDecl {
    /// Axis name.
    pub axis: String,
    /// Variants on this axis.
    pub items: Vec<VariantDecl>,
}

/// One labeled point on an axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantDecl {
    /// Variant name; the namespace is flat across all axes.
    pub name: String,
    /// Extra arguments contributed by the variant.
    #[serde(default)]
    pub args: Vec<String>,
    /// Node count override.
    #[serde(default)]
    pub num_nodes: Option<usize>,
    /// Processes-per-node override; only meaningful with `num_nodes`.
    #[serde(default)]
    pub procs_per_node: Option<usize>,
    /// Thread count override.
    #[serde(default)]
    pub num_threads: Option<usize>,
}

/// Static experiment definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentDecl {
    /// Experiment name.
    pub name: String,
    /// Builds the experiment's program is assembled from. The presence of
    /// this key (even with an empty list) marks the experiment as
    /// revision-dependent.
    #[serde(default)]
    pub use_builds: Option<Vec<String>>,
    /// Command line template.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment entries.
    #[serde(default)]
    pub environ: BTreeMap<String, String>,
    /// Wall-clock timeout in seconds, enforced by the execution backend.
    #[serde(default)]
    pub timeout: Option<f64>,
    /// Number of repetitions per (experiment, instance) pair.
    #[serde(default)]
    pub repeat: Option<usize>,
    /// Default node count.
    #[serde(default)]
    pub num_nodes: Option<usize>,
    /// Default processes per node.
    #[serde(default)]
    pub procs_per_node: Option<usize>,
    /// Default thread count.
    #[serde(default)]
    pub num_threads: Option<usize>,
    /// Arguments passed through verbatim to the cluster scheduler.
    #[serde(default)]
    pub scheduler_args: Vec<String>,
}

/// One node of the matrix restriction tree.
///
/// Every restriction list is optional; an absent list leaves that
/// dimension unrestricted, which is distinct from an empty list (nothing
/// selected). A node either recurses into `include` children or acts as a
/// leaf that is expanded into concrete tuples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct MatrixDecl {
    /// Selectable experiment names.
    #[serde(default)]
    pub experiments: Option<Vec<String>>,
    /// Selectable revision names.
    #[serde(default)]
    pub revisions: Option<Vec<String>>,
    /// Selectable axes.
    #[serde(default)]
    pub axes: Option<Vec<String>>,
    /// Selectable variant names.
    #[serde(default)]
    pub variants: Option<Vec<String>>,
    /// Selectable instance-set names.
    #[serde(default)]
    pub instsets: Option<Vec<String>>,
    /// Repetition count for everything under this node.
    #[serde(default)]
    pub repetitions: Option<usize>,
    /// Nested inclusion rules; present (even empty) means this node is
    /// not a leaf.
    #[serde(default)]
    pub include: Option<Vec<MatrixDecl>>,
}

/// Returns whether a name claims the reserved internal prefix.
pub fn is_reserved_name(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

/// Parses a YAML experiments document into its typed form.
pub fn from_yaml_str(text: &str) -> Result<ConfigDoc, ExpmatError> {
    serde_yaml::from_str(text).map_err(|err| {
        ExpmatError::Serde(
            ErrorInfo::new("doc-parse", "failed to parse experiments document")
                .with_hint(err.to_string()),
        )
    })
}
