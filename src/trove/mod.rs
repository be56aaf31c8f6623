// src/trove/mod.rs

//! Troves: named, versioned, flavored units stored in a repository
//!
//! A package (`foo`) references its components (`foo:runtime`, `foo:lib`);
//! components hold the files. Groups reference other troves the same way a
//! package references its components.

mod metadata;

pub use metadata::{MetadataItem, TroveMetadata};

use crate::dependencies::DependencySet;
use crate::files::{FileId, PathId};
use crate::flavor::Flavor;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// `(name, version, flavor)` naming exactly one trove
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TroveTuple {
    pub name: String,
    pub version: Version,
    pub flavor: Flavor,
}

impl TroveTuple {
    pub fn new(name: impl Into<String>, version: Version, flavor: Flavor) -> Self {
        Self {
            name: name.into(),
            version,
            flavor,
        }
    }

    /// Whether this names a component (`pkg:comp`)
    pub fn is_component(&self) -> bool {
        self.name.contains(':')
    }

    /// Package part of the name
    pub fn package_name(&self) -> &str {
        self.name.split(':').next().unwrap_or(&self.name)
    }
}

impl fmt::Display for TroveTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}{}", self.name, self.version, self.flavor)
    }
}

/// A file entry in a trove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroveFile {
    pub path: String,
    pub file_id: FileId,
    /// Version at which this fileId was last changed
    pub version: Version,
}

/// A trove with its file list, references, dependencies and metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trove {
    tuple: TroveTuple,
    /// Source trove this was built from, e.g. `foo:source`
    pub source_name: String,
    files: BTreeMap<PathId, TroveFile>,
    troves: BTreeSet<TroveTuple>,
    pub requires: DependencySet,
    pub provides: DependencySet,
    /// Troves that satisfied the recipe's build requirements
    pub build_requirements: BTreeSet<TroveTuple>,
    pub metadata: TroveMetadata,
}

impl Trove {
    pub fn new(name: impl Into<String>, version: Version, flavor: Flavor) -> Self {
        let tuple = TroveTuple::new(name, version, flavor);
        let source_name = format!("{}:source", tuple.package_name());
        Self {
            tuple,
            source_name,
            files: BTreeMap::new(),
            troves: BTreeSet::new(),
            requires: DependencySet::new(),
            provides: DependencySet::new(),
            build_requirements: BTreeSet::new(),
            metadata: TroveMetadata::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.tuple.name
    }

    pub fn version(&self) -> &Version {
        &self.tuple.version
    }

    pub fn flavor(&self) -> &Flavor {
        &self.tuple.flavor
    }

    pub fn tuple(&self) -> &TroveTuple {
        &self.tuple
    }

    pub fn is_component(&self) -> bool {
        self.tuple.is_component()
    }

    pub fn add_file(&mut self, path_id: PathId, path: impl Into<String>, file_id: FileId, version: Version) {
        self.files.insert(
            path_id,
            TroveFile {
                path: path.into(),
                file_id,
                version,
            },
        );
    }

    pub fn file(&self, path_id: &PathId) -> Option<&TroveFile> {
        self.files.get(path_id)
    }

    /// Files ordered by pathId
    pub fn files(&self) -> impl Iterator<Item = (&PathId, &TroveFile)> {
        self.files.iter()
    }

    /// Copy without the file list, as returned by file-less queries
    pub fn without_files(&self) -> Trove {
        Self {
            files: BTreeMap::new(),
            ..self.clone()
        }
    }

    pub fn add_trove(&mut self, tuple: TroveTuple) {
        self.troves.insert(tuple);
    }

    /// Referenced troves (components of a package, members of a group)
    pub fn troves(&self) -> impl Iterator<Item = &TroveTuple> {
        self.troves.iter()
    }
}
