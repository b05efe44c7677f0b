//! Ordered set of filesystem roots that types are resolved from.

use crate::error::ClasspathError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One entry of an [`ArtifactClasspath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClasspathRoot {
    Directory(PathBuf),
    /// A zip archive whose entries mirror a directory root.
    Archive(PathBuf),
}

impl ClasspathRoot {
    pub fn path(&self) -> &Path {
        match self {
            ClasspathRoot::Directory(p) | ClasspathRoot::Archive(p) => p,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArtifactClasspath {
    roots: Vec<ClasspathRoot>,
}

impl ArtifactClasspath {
    /// Build a classpath from the build's output roots followed by its
    /// dependency artifacts.
    ///
    /// Roots are canonicalized and de-duplicated, keeping the first
    /// occurrence. Any root that does not exist fails the whole build.
    pub fn build<I, J>(output_roots: I, dependency_artifacts: J) -> Result<Self, ClasspathError>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
        J: IntoIterator,
        J::Item: AsRef<Path>,
    {
        let mut seen = HashSet::new();
        let mut roots = Vec::new();

        let all = output_roots
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .chain(
                dependency_artifacts
                    .into_iter()
                    .map(|p| p.as_ref().to_path_buf()),
            );

        for raw in all {
            if !raw.exists() {
                return Err(ClasspathError::Missing(raw));
            }
            let canonical = raw.canonicalize().map_err(|source| ClasspathError::Io {
                path: raw.clone(),
                source,
            })?;
            if !seen.insert(canonical.clone()) {
                debug!(path = %canonical.display(), "Skipping duplicate classpath root");
                continue;
            }

            let root = if canonical.is_dir() {
                ClasspathRoot::Directory(canonical)
            } else {
                ClasspathRoot::Archive(canonical)
            };
            debug!(path = %root.path().display(), "Added classpath root");
            roots.push(root);
        }

        Ok(Self { roots })
    }

    pub fn roots(&self) -> &[ClasspathRoot] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}
