//! Deterministic path derivation for runs and build stages.
//!
//! Every path is a pure function of entity identity so that two processes
//! inspecting the same base directory always agree on where a run's
//! sentinel files live.

use std::path::{Path, PathBuf};

/// Resolved directory context shared by all entities of one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BaseDirs {
    pub(crate) basedir: PathBuf,
    pub(crate) instdir: String,
}

impl BaseDirs {
    /// Directory that stores all instance files.
    pub(crate) fn instance_dir(&self) -> PathBuf {
        self.basedir.join(&self.instdir)
    }
}

/// Renders the `~v1,v2` variation suffix; empty for the empty variation.
/// Variant names must already be in canonical (sorted) order.
fn variation_suffix(variation: &[&str]) -> String {
    if variation.is_empty() {
        String::new()
    } else {
        format!("~{}", variation.join(","))
    }
}

/// Renders the `@revision` suffix; empty when no revision applies.
fn revision_suffix(revision: Option<&str>) -> String {
    match revision {
        Some(name) => format!("@{name}"),
        None => String::new(),
    }
}

/// Directory holding auxiliary sentinel files for one experiment identity.
pub fn aux_subdir(
    basedir: &Path,
    experiment: &str,
    variation: &[&str],
    revision: Option<&str>,
) -> PathBuf {
    basedir.join("aux").join(format!(
        "{experiment}{}{}",
        variation_suffix(variation),
        revision_suffix(revision)
    ))
}

/// Directory holding output files for one experiment identity.
pub fn output_subdir(
    basedir: &Path,
    experiment: &str,
    variation: &[&str],
    revision: Option<&str>,
) -> PathBuf {
    basedir.join("output").join(format!(
        "{experiment}{}{}",
        variation_suffix(variation),
        revision_suffix(revision)
    ))
}

/// File name of a per-run file. Repetition zero is encoded by omission,
/// every later repetition as a bracketed suffix.
pub fn run_file_name(ext: &str, instance: &str, repetition: usize) -> String {
    if repetition > 0 {
        format!("{instance}.{ext}[{repetition}]")
    } else {
        format!("{instance}.{ext}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffixes_compose() {
        let dir = aux_subdir(Path::new("/base"), "bfs", &["fast", "large"], Some("r1"));
        assert_eq!(dir, Path::new("/base/aux/bfs~fast,large@r1"));
        let dir = output_subdir(Path::new("/base"), "bfs", &[], None);
        assert_eq!(dir, Path::new("/base/output/bfs"));
    }

    #[test]
    fn repetition_zero_is_omitted() {
        assert_eq!(run_file_name("out", "g1", 0), "g1.out");
        assert_eq!(run_file_name("status", "g1", 3), "g1.status[3]");
    }
}
