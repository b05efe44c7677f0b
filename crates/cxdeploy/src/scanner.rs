//! Candidate discovery in compiled output.

use crate::context::{ExecutionContext, FileListing};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, warn};

/// A type name found in a package directory, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub type_name: String,
    pub package: String,
    pub source: PathBuf,
}

/// Walks one package directory at a time.
#[derive(Debug, Clone)]
pub struct CandidateScanner {
    type_suffix: String,
}

impl CandidateScanner {
    pub fn new(type_suffix: impl Into<String>) -> Self {
        Self {
            type_suffix: type_suffix.into(),
        }
    }

    /// Candidates directly inside `package` under the output root.
    ///
    /// A missing package directory produces a warning and no candidates.
    pub fn scan<'a>(&'a self, ctx: &ExecutionContext, package: &str) -> PackageScan<'a> {
        let rel = package_path(package);
        let listing = ctx.list_files(&rel);
        if listing.is_none() {
            warn!(package, "Omitting non-existent package {}", rel.display());
        }
        PackageScan {
            listing,
            package: package.to_string(),
            suffix: &self.type_suffix,
        }
    }
}

impl Default for CandidateScanner {
    fn default() -> Self {
        Self::new(".type.json")
    }
}

/// Lazy, single-pass sequence of [`Candidate`]s for one package.
pub struct PackageScan<'a> {
    listing: Option<FileListing>,
    package: String,
    suffix: &'a str,
}

impl PackageScan<'_> {
    fn candidate_for(&self, path: PathBuf) -> Option<Candidate> {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            error!(path = %path.display(), "Failed to process a file: {}", path.display());
            return None;
        };
        let stem = file_name.strip_suffix(self.suffix)?;
        if stem.is_empty() {
            return None;
        }
        let type_name = if self.package.is_empty() {
            stem.to_string()
        } else {
            format!("{}.{}", self.package, stem)
        };
        if !is_top_level_type_name(&type_name) {
            return None;
        }
        Some(Candidate {
            type_name,
            package: self.package.clone(),
            source: path,
        })
    }
}

impl Iterator for PackageScan<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            let entry = self.listing.as_mut()?.next()?;
            match entry {
                Ok(path) => {
                    if let Some(candidate) = self.candidate_for(path) {
                        return Some(candidate);
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    error!(path = %path, error = %e, "Failed to process a file: {}", path);
                }
            }
        }
    }
}

/// `a.b.c` → `a/b/c`; the empty package is the output root itself.
pub fn package_path(package: &str) -> PathBuf {
    if package.is_empty() {
        return PathBuf::new();
    }
    package.split('.').collect()
}

/// Nested and synthetic names carry a `$` somewhere before the end.
///
/// Accepted: no `$` at all, or a single trailing `$`.
pub fn is_top_level_type_name(name: &str) -> bool {
    match name.find('$') {
        None => true,
        Some(idx) => idx == name.len() - 1,
    }
}
