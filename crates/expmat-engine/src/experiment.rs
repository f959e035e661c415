//! Experiment definitions and revision/variation-bound experiments.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use expmat_core::errors::{ErrorInfo, ExpmatError};
use expmat_core::schema::ExperimentDecl;

use crate::paths::{aux_subdir, output_subdir, BaseDirs};
use crate::revision::Revision;
use crate::variant::{
    process_settings_from, thread_settings_from, ProcessSettings, ThreadSettings, Variant,
};

/// Static experiment definition.
#[derive(Debug, Clone)]
pub struct ExperimentInfo {
    decl: Arc<ExperimentDecl>,
}

impl ExperimentInfo {
    pub(crate) fn new(decl: Arc<ExperimentDecl>) -> Self {
        Self { decl }
    }

    /// Experiment name.
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    /// Names of the builds this experiment's program is assembled from.
    /// `Some` (even when empty) marks the experiment as revision-bound.
    pub fn used_builds(&self) -> Option<&[String]> {
        self.decl.use_builds.as_deref()
    }

    /// Command line template.
    pub fn args(&self) -> &[String] {
        &self.decl.args
    }

    /// Extra environment entries.
    pub fn environ(&self) -> &BTreeMap<String, String> {
        &self.decl.environ
    }

    /// Wall-clock timeout in seconds, if declared.
    pub fn timeout(&self) -> Option<f64> {
        self.decl.timeout
    }

    /// Declared repetition count, if any.
    pub fn repeat(&self) -> Option<usize> {
        self.decl.repeat
    }

    /// Default process settings, if declared.
    pub fn process_settings(&self) -> Option<ProcessSettings> {
        process_settings_from(self.decl.num_nodes, self.decl.procs_per_node)
    }

    /// Default thread settings, if declared.
    pub fn thread_settings(&self) -> Option<ThreadSettings> {
        thread_settings_from(self.decl.num_threads)
    }

    /// Arguments passed through verbatim to the cluster scheduler.
    pub fn scheduler_args(&self) -> &[String] {
        &self.decl.scheduler_args
    }
}

/// An [`ExperimentInfo`] bound to an optional revision and a canonical
/// variation (at most one variant per axis, sorted by name).
#[derive(Debug, Clone)]
pub struct Experiment {
    base: Arc<BaseDirs>,
    info: Arc<ExperimentInfo>,
    revision: Option<Arc<Revision>>,
    variation: Vec<Arc<Variant>>,
}

impl Experiment {
    pub(crate) fn new(
        base: Arc<BaseDirs>,
        info: Arc<ExperimentInfo>,
        revision: Option<Arc<Revision>>,
        variation: Vec<Arc<Variant>>,
    ) -> Self {
        debug_assert!(variation.windows(2).all(|w| w[0].name() <= w[1].name()));
        Self {
            base,
            info,
            revision,
            variation,
        }
    }

    /// Experiment name.
    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// The underlying definition.
    pub fn info(&self) -> &Arc<ExperimentInfo> {
        &self.info
    }

    /// Bound revision, absent for experiments that use no builds.
    pub fn revision(&self) -> Option<&Arc<Revision>> {
        self.revision.as_ref()
    }

    /// The canonical variant tuple.
    pub fn variation(&self) -> &[Arc<Variant>] {
        &self.variation
    }

    fn variation_names(&self) -> Vec<&str> {
        self.variation.iter().map(|var| var.name()).collect()
    }

    /// Directory holding this experiment's auxiliary sentinel files.
    pub fn aux_subdir(&self) -> PathBuf {
        aux_subdir(
            &self.base.basedir,
            self.name(),
            &self.variation_names(),
            self.revision.as_deref().map(Revision::name),
        )
    }

    /// Directory holding this experiment's output files.
    pub fn output_subdir(&self) -> PathBuf {
        output_subdir(
            &self.base.basedir,
            self.name(),
            &self.variation_names(),
            self.revision.as_deref().map(Revision::name),
        )
    }

    /// Effective process settings: a single variant override wins over
    /// the experiment default; two variant overrides conflict.
    pub fn effective_process_settings(&self) -> Result<Option<ProcessSettings>, ExpmatError> {
        let mut settings = None;
        for variant in &self.variation {
            let Some(vs) = variant.process_settings() else {
                continue;
            };
            if settings.is_some() {
                return Err(self.settings_conflict("process-settings-conflict", variant.name()));
            }
            settings = Some(vs);
        }
        Ok(settings.or_else(|| self.info.process_settings()))
    }

    /// Effective thread settings, with the same override precedence as
    /// [`Experiment::effective_process_settings`].
    pub fn effective_thread_settings(&self) -> Result<Option<ThreadSettings>, ExpmatError> {
        let mut settings = None;
        for variant in &self.variation {
            let Some(vs) = variant.thread_settings() else {
                continue;
            };
            if settings.is_some() {
                return Err(self.settings_conflict("thread-settings-conflict", variant.name()));
            }
            settings = Some(vs);
        }
        Ok(settings.or_else(|| self.info.thread_settings()))
    }

    fn settings_conflict(&self, code: &str, variant: &str) -> ExpmatError {
        ExpmatError::Matrix(
            ErrorInfo::new(code, "settings overridden by multiple variants")
                .with_context("experiment", self.name())
                .with_context("variant", variant),
        )
    }

    /// Human readable identity, e.g. `bfs ~ fast, large @ r1`.
    pub fn display_name(&self) -> String {
        let mut display = self.name().to_string();
        if !self.variation.is_empty() {
            display.push_str(" ~ ");
            display.push_str(&self.variation_names().join(", "));
        }
        if let Some(revision) = &self.revision {
            display.push_str(" @ ");
            display.push_str(revision.name());
        }
        display
    }
}
