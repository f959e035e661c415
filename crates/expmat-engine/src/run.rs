//! Concrete execution units and the status state machine.

use std::fmt::{self, Display};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use expmat_core::errors::{ErrorInfo, ExpmatError};
use serde::{Deserialize, Serialize};

use crate::experiment::Experiment;
use crate::instance::Instance;
use crate::paths::run_file_name;

/// Execution state of a run, derived purely from sentinel-file evidence.
///
/// Never stored: every query re-inspects the filesystem, so concurrent
/// observers always agree with the files on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// No evidence of the run exists yet.
    NotSubmitted,
    /// The run sentinel exists; the backend accepted the run.
    Submitted,
    /// Only the lock sentinel exists; submission is underway.
    InSubmission,
    /// Captured stdout exists; the program started.
    Started,
    /// Terminal: the program exited cleanly.
    Finished,
    /// Terminal: the backend cut the run off at its time limit.
    Timeout,
    /// Terminal: the program died on a signal.
    Killed,
    /// Terminal: the program exited with a non-zero code.
    Failed,
}

impl RunStatus {
    /// Whether the run completed successfully.
    pub fn is_positive(&self) -> bool {
        matches!(self, RunStatus::Finished)
    }

    /// Whether the run is still moving through the pipeline.
    pub fn is_neutral(&self) -> bool {
        matches!(
            self,
            RunStatus::InSubmission | RunStatus::Submitted | RunStatus::Started
        )
    }

    /// Whether the run terminated unsuccessfully.
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            RunStatus::Timeout | RunStatus::Killed | RunStatus::Failed
        )
    }
}

impl Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RunStatus::NotSubmitted => "not submitted",
            RunStatus::Submitted => "submitted",
            RunStatus::InSubmission => "in submission",
            RunStatus::Started => "started",
            RunStatus::Finished => "finished",
            RunStatus::Timeout => "timeout",
            RunStatus::Killed => "killed",
            RunStatus::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Structured outcome written by the execution backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusFile {
    /// The backend cut the run off at its time limit.
    pub timeout: bool,
    /// The program died on a signal.
    pub signal: bool,
    /// Exit code of the program.
    pub status: i64,
}

impl StatusFile {
    /// Classifies the outcome into a terminal [`RunStatus`].
    pub fn classify(&self) -> RunStatus {
        if self.timeout {
            RunStatus::Timeout
        } else if self.signal {
            RunStatus::Killed
        } else if self.status > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Finished
        }
    }
}

/// One concrete execution unit: an experiment on one instance, for one
/// zero-based repetition index.
#[derive(Debug, Clone)]
pub struct Run {
    experiment: Experiment,
    instance: Arc<Instance>,
    repetition: usize,
}

impl Run {
    pub(crate) fn new(experiment: Experiment, instance: Arc<Instance>, repetition: usize) -> Self {
        Self {
            experiment,
            instance,
            repetition,
        }
    }

    /// The bound experiment.
    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    /// The input instance.
    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    /// Zero-based repetition index.
    pub fn repetition(&self) -> usize {
        self.repetition
    }

    /// Path of an auxiliary file. Auxiliary files are never needed to
    /// determine the result of a run.
    pub fn aux_file_path(&self, ext: &str) -> PathBuf {
        self.experiment.aux_subdir().join(run_file_name(
            ext,
            self.instance.shortname(),
            self.repetition,
        ))
    }

    /// Path of an output file. Output files alone determine whether the
    /// run succeeded.
    pub fn output_file_path(&self, ext: &str) -> PathBuf {
        self.experiment.output_subdir().join(run_file_name(
            ext,
            self.instance.shortname(),
            self.repetition,
        ))
    }

    /// Parses the structured status file written by the backend.
    fn read_status_file(&self) -> Result<StatusFile, ExpmatError> {
        let path = self.output_file_path("status");
        let text = fs::read_to_string(&path).map_err(|err| {
            ExpmatError::Run(
                ErrorInfo::new("status-read", "failed to read run status file")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        serde_yaml::from_str(&text).map_err(|err| {
            ExpmatError::Run(
                ErrorInfo::new("status-parse", "malformed run status file")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })
    }

    /// Derives the current status from sentinel-file evidence.
    ///
    /// Checked in precedence order: status file, captured stdout, run
    /// sentinel, lock sentinel. The result is recomputed on every call.
    pub fn status(&self) -> Result<RunStatus, ExpmatError> {
        if self.output_file_path("status").exists() {
            return Ok(self.read_status_file()?.classify());
        }
        if self.output_file_path("out").exists() {
            return Ok(RunStatus::Started);
        }
        if self.aux_file_path("run").exists() {
            return Ok(RunStatus::Submitted);
        }
        if self.aux_file_path("lock").exists() {
            return Ok(RunStatus::InSubmission);
        }
        Ok(RunStatus::NotSubmitted)
    }
}
