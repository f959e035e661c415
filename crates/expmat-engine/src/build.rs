//! Build recipes, revision-bound builds, and the requirement resolver.

use std::path::PathBuf;
use std::sync::Arc;

use expmat_core::errors::{ErrorInfo, ExpmatError};
use expmat_core::schema::{BuildDecl, BuildStepDecl};

use crate::config::Config;
use crate::paths::BaseDirs;
use crate::revision::Revision;

/// Marker file recording a completed checkout.
pub const CHECKED_OUT_MARKER: &str = "checkedout.simexpal";
/// Marker file recording completed source regeneration.
pub const REGENERATED_MARKER: &str = "regenerated.simexpal";
/// Marker file recording a completed configure stage.
pub const CONFIGURED_MARKER: &str = "configured.simexpal";
/// Marker file recording a completed compile stage.
pub const COMPILED_MARKER: &str = "compiled.simexpal";
/// Marker file recording a completed install stage.
pub const INSTALLED_MARKER: &str = "installed.simexpal";

/// Static recipe of a buildable component.
#[derive(Debug, Clone)]
pub struct BuildInfo {
    decl: Arc<BuildDecl>,
}

impl BuildInfo {
    pub(crate) fn new(decl: Arc<BuildDecl>) -> Self {
        Self { decl }
    }

    /// Build name.
    pub fn name(&self) -> &str {
        &self.decl.name
    }

    /// Names of directly required builds.
    pub fn requirements(&self) -> Vec<&str> {
        match &self.decl.requires {
            Some(requires) => requires.names(),
            None => Vec::new(),
        }
    }

    /// Transitive closure over required builds, in DFS pop order.
    ///
    /// Every requirement appears exactly once; ordering between siblings
    /// is not topological. A duplicated direct requirement is a
    /// configuration error. Cycles among indirect requirements are not
    /// rejected; the visited set alone keeps the traversal finite.
    pub fn traverse_requirements(&self, cfg: &Config) -> Result<Vec<Arc<BuildInfo>>, ExpmatError> {
        let mut stack = Vec::new();
        let mut visited = Vec::new();

        for req_name in self.requirements() {
            if visited.iter().any(|seen| seen == req_name) {
                return Err(ExpmatError::Config(
                    ErrorInfo::new(
                        "duplicate-requirement",
                        "build lists the same requirement twice",
                    )
                    .with_context("build", self.name())
                    .with_context("requirement", req_name),
                ));
            }
            stack.push(cfg.get_build_info(req_name)?);
            visited.push(req_name.to_string());
        }

        let mut closure = Vec::new();
        while let Some(current) = stack.pop() {
            for req_name in current.requirements() {
                if visited.iter().any(|seen| seen == req_name) {
                    continue;
                }
                stack.push(cfg.get_build_info(req_name)?);
                visited.push(req_name.to_string());
            }
            closure.push(current);
        }
        Ok(closure)
    }

    /// Git repository holding the sources.
    pub fn git_repo(&self) -> Option<&str> {
        self.decl.git.as_deref()
    }

    /// Whether submodules are cloned recursively.
    pub fn recursive_clone(&self) -> bool {
        self.decl.recursive_clone
    }

    /// Steps regenerating derived sources after checkout.
    pub fn regenerate(&self) -> &[BuildStepDecl] {
        &self.decl.regenerate
    }

    /// Configure steps.
    pub fn configure(&self) -> &[BuildStepDecl] {
        &self.decl.configure
    }

    /// Compile steps.
    pub fn compile(&self) -> &[BuildStepDecl] {
        &self.decl.compile
    }

    /// Install steps.
    pub fn install(&self) -> &[BuildStepDecl] {
        &self.decl.install
    }
}

/// A [`BuildInfo`] bound to a [`Revision`].
///
/// Exists only for pairs where the revision pins the build's name. Pinned
/// revisions split sources into repo and clone directories under
/// `builds/`; dev revisions keep a single live source tree under
/// `develop/` with stage directories under `dev-builds/`.
#[derive(Debug, Clone)]
pub struct Build {
    base: Arc<BaseDirs>,
    info: Arc<BuildInfo>,
    revision: Arc<Revision>,
}

impl Build {
    pub(crate) fn new(base: Arc<BaseDirs>, info: Arc<BuildInfo>, revision: Arc<Revision>) -> Self {
        Self {
            base,
            info,
            revision,
        }
    }

    /// Build name.
    pub fn name(&self) -> &str {
        self.info.name()
    }

    /// The underlying recipe.
    pub fn info(&self) -> &Arc<BuildInfo> {
        &self.info
    }

    /// The bound revision.
    pub fn revision(&self) -> &Arc<Revision> {
        &self.revision
    }

    /// Revision suffix for dev layouts; the default dev revision renders
    /// without a suffix.
    fn dev_suffix(&self) -> String {
        if self.revision.is_default_dev_build() {
            String::new()
        } else {
            format!("@{}", self.revision.name())
        }
    }

    fn dev_layout_error(&self, code: &str) -> ExpmatError {
        ExpmatError::Lookup(
            ErrorInfo::new(code, "dev revisions use a single source directory")
                .with_context("build", self.name())
                .with_context("revision", self.revision.name())
                .with_hint("use source_dir() for dev-build revisions"),
        )
    }

    /// Pristine repository directory; pinned revisions only.
    pub fn repo_dir(&self) -> Result<PathBuf, ExpmatError> {
        if self.revision.is_dev_build() {
            return Err(self.dev_layout_error("repo-dir-dev"));
        }
        Ok(self
            .base
            .basedir
            .join("builds")
            .join(format!("{}.repo", self.name())))
    }

    /// Per-revision clone directory; pinned revisions only.
    pub fn clone_dir(&self) -> Result<PathBuf, ExpmatError> {
        if self.revision.is_dev_build() {
            return Err(self.dev_layout_error("clone-dir-dev"));
        }
        Ok(self
            .base
            .basedir
            .join("builds")
            .join(format!("{}@{}.clone", self.name(), self.revision.name())))
    }

    /// Live source tree; dev revisions only.
    pub fn source_dir(&self) -> Result<PathBuf, ExpmatError> {
        if !self.revision.is_dev_build() {
            return Err(ExpmatError::Lookup(
                ErrorInfo::new(
                    "source-dir-pinned",
                    "pinned revisions split sources into repo and clone directories",
                )
                .with_context("build", self.name())
                .with_context("revision", self.revision.name())
                .with_hint("use repo_dir() and clone_dir() for pinned revisions"),
            ));
        }
        Ok(self
            .base
            .basedir
            .join("develop")
            .join(format!("{}{}", self.name(), self.dev_suffix())))
    }

    /// Compile stage directory.
    pub fn compile_dir(&self) -> PathBuf {
        if self.revision.is_dev_build() {
            self.base
                .basedir
                .join("dev-builds")
                .join(format!("{}{}.compile", self.name(), self.dev_suffix()))
        } else {
            self.base
                .basedir
                .join("builds")
                .join(format!("{}@{}.compile", self.name(), self.revision.name()))
        }
    }

    /// Install prefix directory.
    pub fn prefix_dir(&self) -> PathBuf {
        if self.revision.is_dev_build() {
            self.base
                .basedir
                .join("dev-builds")
                .join(format!("{}{}", self.name(), self.dev_suffix()))
        } else {
            self.base
                .basedir
                .join("builds")
                .join(format!("{}@{}", self.name(), self.revision.name()))
        }
    }

    /// Directory holding the checkout and regeneration markers.
    fn checkout_stage_dir(&self) -> PathBuf {
        if self.revision.is_dev_build() {
            self.base
                .basedir
                .join("develop")
                .join(format!("{}{}", self.name(), self.dev_suffix()))
        } else {
            self.base
                .basedir
                .join("builds")
                .join(format!("{}@{}.clone", self.name(), self.revision.name()))
        }
    }

    /// Whether the sources have been checked out.
    pub fn is_checked_out(&self) -> bool {
        self.checkout_stage_dir().join(CHECKED_OUT_MARKER).exists()
    }

    /// Whether derived sources have been regenerated.
    pub fn is_regenerated(&self) -> bool {
        self.checkout_stage_dir().join(REGENERATED_MARKER).exists()
    }

    /// Whether the configure stage completed.
    pub fn is_configured(&self) -> bool {
        self.compile_dir().join(CONFIGURED_MARKER).exists()
    }

    /// Whether the compile stage completed.
    pub fn is_compiled(&self) -> bool {
        self.compile_dir().join(COMPILED_MARKER).exists()
    }

    /// Whether the install stage completed.
    pub fn is_installed(&self) -> bool {
        self.prefix_dir().join(INSTALLED_MARKER).exists()
    }
}
