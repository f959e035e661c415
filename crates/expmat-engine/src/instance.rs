//! Input instances and their backing files.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use expmat_core::errors::{ErrorInfo, ExpmatError};
use expmat_core::schema::{GeneratorDecl, InstanceBlock, InstanceItemDecl};

use crate::paths::BaseDirs;

/// One input dataset item, a view over a single `items` entry of an
/// instance block.
#[derive(Debug, Clone)]
pub struct Instance {
    base: Arc<BaseDirs>,
    block: Arc<InstanceBlock>,
    index: usize,
}

/// Strips the final extension from a declared instance name, mirroring
/// how shortnames are rendered in run file names.
fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    }
}

impl Instance {
    pub(crate) fn new(base: Arc<BaseDirs>, block: Arc<InstanceBlock>, index: usize) -> Self {
        Self { base, block, index }
    }

    fn item(&self) -> &InstanceItemDecl {
        &self.block.items[self.index]
    }

    /// Name exactly as declared in the configuration document.
    pub fn declared_name(&self) -> &str {
        self.item().name()
    }

    /// Unique short name: the declared name minus its file extension.
    pub fn shortname(&self) -> &str {
        strip_extension(self.declared_name())
    }

    /// Whether the enclosing block declares shared extensions.
    pub fn has_multi_ext(&self) -> bool {
        self.block.extensions.is_some()
    }

    /// Whether this item lists several backing files explicitly.
    pub fn has_multi_files(&self) -> bool {
        matches!(self.item(), InstanceItemDecl::Detailed { .. })
    }

    /// All backing file names of this instance. Block-level extensions
    /// take precedence over an explicit per-item file list.
    pub fn filenames(&self) -> Vec<String> {
        if let Some(exts) = &self.block.extensions {
            let name = self.declared_name();
            return exts.iter().map(|ext| format!("{name}.{ext}")).collect();
        }
        match self.item() {
            InstanceItemDecl::Detailed { files, .. } => files.clone(),
            InstanceItemDecl::Name(name) => vec![name.clone()],
        }
    }

    /// The single backing file name; fails for multi-file instances,
    /// which have no unique filename by definition.
    pub fn unique_filename(&self) -> Result<String, ExpmatError> {
        let mut filenames = self.filenames();
        if filenames.len() != 1 {
            return Err(ExpmatError::Lookup(
                ErrorInfo::new(
                    "instance-not-unique",
                    "the instance does not have a unique filename",
                )
                .with_context("instance", self.declared_name()),
            ));
        }
        Ok(filenames.remove(0))
    }

    /// Instance-set membership. Untagged instances belong to the
    /// anonymous `None` marker set, never to any named set.
    pub fn instsets(&self) -> BTreeSet<Option<&str>> {
        match &self.block.set {
            Some(sets) => sets.names().into_iter().map(Some).collect(),
            None => BTreeSet::from([None]),
        }
    }

    /// Remote repository this instance can be fetched from, if any.
    pub fn repo(&self) -> Option<&str> {
        self.block.repo.as_deref()
    }

    /// Generator command producing this instance, if any.
    pub fn generator(&self) -> Option<&GeneratorDecl> {
        self.block.generator.as_ref()
    }

    /// Full path of the unique backing file under the instance directory.
    pub fn fullpath(&self) -> Result<PathBuf, ExpmatError> {
        Ok(self.base.instance_dir().join(self.unique_filename()?))
    }

    /// Whether every backing file is present on disk.
    pub fn check_available(&self) -> bool {
        let dir = self.base.instance_dir();
        self.filenames()
            .iter()
            .all(|file| dir.join(file).is_file())
    }
}
