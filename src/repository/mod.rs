// src/repository/mod.rs

//! Read-only repository query surface used while cooking
//!
//! The cook continuity engine consults repository history through the
//! [`RepositoryClient`] trait. Network transport and authentication live
//! behind implementations of the trait; [`MemoryRepository`] serves tests
//! and offline tooling.

mod memory;

pub use memory::MemoryRepository;

use crate::dependencies::{Dependency, DependencySet};
use crate::files::{FileId, FileInfo, PathId};
use crate::flavor::Flavor;
use crate::label::LabelPath;
use crate::trove::{Trove, TroveTuple};
use crate::version::{Branch, Version};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Result type for repository queries
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Errors a repository query can report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A requested trove does not exist
    #[error("trove not found: {0}")]
    TroveMissing(String),

    /// A requested file stream does not exist
    #[error("file stream not found: {0}")]
    FileMissing(FileId),

    /// The caller may not read from this label or branch
    #[error("insufficient permission to access {0}")]
    InsufficientPermission(String),

    /// The repository could not be opened at all
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// Any other repository failure
    #[error("{0}")]
    Other(String),
}

impl RepositoryError {
    /// Create a new "other" error with a message
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// The recorded identity of one path in a source trove's file history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    pub path_id: PathId,
    /// Version at which this fileId was introduced
    pub version: Version,
    pub file_id: FileId,
}

/// A trove search term for [`RepositoryClient::find_troves`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TroveSpec {
    pub name: String,
    /// Restrict to one exact version
    pub version: Option<Version>,
    /// Restrict to troves this flavor is compatible with
    pub flavor: Option<Flavor>,
}

impl TroveSpec {
    /// Match every version and flavor of `name`
    pub fn any(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            flavor: None,
        }
    }

    /// Whether a tuple matches this spec
    pub fn matches(&self, tuple: &TroveTuple) -> bool {
        tuple.name == self.name
            && self.version.as_ref().is_none_or(|v| *v == tuple.version)
            && self.flavor.as_ref().is_none_or(|f| f.satisfies(&tuple.flavor))
    }
}

/// Repository queries consulted by the cook continuity engine
pub trait RepositoryClient: Send + Sync {
    /// Latest version of each name on `branch`, with every flavor present
    /// at that version
    ///
    /// When `flavor` is given, only troves it is compatible with are
    /// considered.
    fn get_trove_leaves_by_branch(
        &self,
        names: &[String],
        branch: &Branch,
        flavor: Option<&Flavor>,
    ) -> RepositoryResult<Vec<TroveTuple>>;

    /// Fetch full troves, optionally with their file lists
    ///
    /// Fails with [`RepositoryError::TroveMissing`] if any tuple is unknown.
    fn get_troves(&self, tuples: &[TroveTuple], with_files: bool) -> RepositoryResult<Vec<Trove>>;

    /// Tuples matching `specs` along `label_path`
    ///
    /// Labels are searched in path order. Each spec is answered from the
    /// first label holding any match for it; later labels are not consulted
    /// for that spec.
    fn find_troves(
        &self,
        label_path: &LabelPath,
        specs: &[TroveSpec],
    ) -> RepositoryResult<BTreeSet<TroveTuple>>;

    /// File history of a source trove on one branch
    ///
    /// Covers every path under one of `prefixes` (all paths when empty).
    /// For each path the most recent record whose fileId is in `file_ids`
    /// is returned, otherwise the most recent record.
    fn get_package_branch_path_ids(
        &self,
        source_name: &str,
        branch: &Branch,
        prefixes: &[String],
        file_ids: &BTreeSet<FileId>,
    ) -> RepositoryResult<BTreeMap<String, PathRecord>>;

    /// File metadata for `(pathId, fileId, version)` triples
    fn get_file_versions(
        &self,
        files: &[(PathId, FileId, Version)],
    ) -> RepositoryResult<Vec<FileInfo>>;

    /// All known versions of each name on `branch`, with their flavors
    fn get_trove_versions_by_branch(
        &self,
        names: &[String],
        branch: &Branch,
    ) -> RepositoryResult<BTreeMap<String, BTreeMap<Version, BTreeSet<Flavor>>>>;

    /// Troves providing each dependency in `deps`, split per dependency
    fn get_troves_with_provides(
        &self,
        deps: &DependencySet,
    ) -> RepositoryResult<BTreeMap<Dependency, Vec<TroveTuple>>>;
}
