//! Named, pinned sets of build versions.

use std::sync::Arc;

use expmat_core::errors::{ErrorInfo, ExpmatError};
use expmat_core::schema::{RevisionDecl, DEFAULT_DEV_NAME};

/// A named snapshot pinning one version string per build, or a live
/// development checkout.
#[derive(Debug, Clone)]
pub struct Revision {
    decl: Arc<RevisionDecl>,
}

impl Revision {
    pub(crate) fn new(decl: Arc<RevisionDecl>) -> Self {
        Self { decl }
    }

    /// Revision name; an unnamed revision claims the reserved default
    /// dev identity.
    pub fn name(&self) -> &str {
        self.decl.name.as_deref().unwrap_or(DEFAULT_DEV_NAME)
    }

    /// Names of all builds pinned by this revision.
    pub fn specified_versions(&self) -> impl Iterator<Item = &str> {
        self.decl.build_version.keys().map(String::as_str)
    }

    /// Whether this revision pins the given build name.
    pub fn pins(&self, build_name: &str) -> bool {
        self.decl.build_version.contains_key(build_name)
    }

    /// Pinned version string for a build.
    pub fn version_for_build(&self, build_name: &str) -> Result<&str, ExpmatError> {
        self.decl
            .build_version
            .get(build_name)
            .map(String::as_str)
            .ok_or_else(|| {
                ExpmatError::Lookup(
                    ErrorInfo::new("revision-missing-build", "revision does not pin this build")
                        .with_context("revision", self.name())
                        .with_context("build", build_name),
                )
            })
    }

    /// Whether this revision is a live development checkout.
    pub fn is_dev_build(&self) -> bool {
        self.decl.develop
    }

    /// Whether this is the anonymous default dev revision.
    pub fn is_default_dev_build(&self) -> bool {
        self.name() == DEFAULT_DEV_NAME
    }
}
