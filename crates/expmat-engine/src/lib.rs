//! Matrix resolution and run-identity engine for computational
//! experiments.
//!
//! The engine turns a declarative experiments document into the full,
//! deduplicated cross-product of experiments × revisions × variants ×
//! instances × repetitions, and derives each run's execution state purely
//! from sentinel-file evidence left behind by an external backend. All
//! queries are read-only over an immutable [`Config`], so concurrent
//! callers need no coordination.

mod build;
mod config;
mod experiment;
mod instance;
mod matrix;
mod paths;
mod revision;
mod run;
mod variant;

pub use build::{
    Build, BuildInfo, CHECKED_OUT_MARKER, COMPILED_MARKER, CONFIGURED_MARKER, INSTALLED_MARKER,
    REGENERATED_MARKER,
};
pub use config::{config_for_dir, Config};
pub use experiment::{Experiment, ExperimentInfo};
pub use instance::Instance;
pub use paths::{aux_subdir, output_subdir, run_file_name};
pub use revision::Revision;
pub use run::{Run, RunStatus, StatusFile};
pub use variant::{ProcessSettings, ThreadSettings, Variant};
