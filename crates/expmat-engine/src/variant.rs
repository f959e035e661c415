//! Variant axes and process/thread settings.

use std::sync::Arc;

use expmat_core::schema::VariantDecl;
use serde::{Deserialize, Serialize};

/// Process topology requested for an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessSettings {
    /// Number of nodes.
    pub num_nodes: usize,
    /// Processes launched per node, if constrained.
    pub procs_per_node: Option<usize>,
}

/// Thread count requested for an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSettings {
    /// Number of threads.
    pub num_threads: usize,
}

/// Process settings are considered declared only when a node count is
/// given; a bare `procs_per_node` is ignored.
pub(crate) fn process_settings_from(
    num_nodes: Option<usize>,
    procs_per_node: Option<usize>,
) -> Option<ProcessSettings> {
    num_nodes.map(|num_nodes| ProcessSettings {
        num_nodes,
        procs_per_node,
    })
}

pub(crate) fn thread_settings_from(num_threads: Option<usize>) -> Option<ThreadSettings> {
    num_threads.map(|num_threads| ThreadSettings { num_threads })
}

/// One labeled point on one axis of variation.
///
/// Variant names form a single flat namespace across all axes so that a
/// variation can be written as a bare list of names.
#[derive(Debug, Clone)]
pub struct Variant {
    axis: String,
    decl: Arc<VariantDecl>,
}

impl Variant {
    pub(crate) fn new(axis: String, decl: Arc<VariantDecl>) -> Self {
        Self { axis, decl }
    }

    /// Axis this variant belongs to.
    pub fn axis(&self) -> &str {
        &self.axis
    }

    /// Variant name.
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    /// Extra arguments contributed by this variant.
    pub fn args(&self) -> &[String] {
        &self.decl.args
    }

    /// Process settings override, if declared.
    pub fn process_settings(&self) -> Option<ProcessSettings> {
        process_settings_from(self.decl.num_nodes, self.decl.procs_per_node)
    }

    /// Thread settings override, if declared.
    pub fn thread_settings(&self) -> Option<ThreadSettings> {
        thread_settings_from(self.decl.num_threads)
    }
}
