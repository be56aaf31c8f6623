// src/cook/identity.rs

//! Stable file identities across rebuilds
//!
//! Every path a cook produces needs a pathId. A path that existed in an
//! earlier build of the same source trove must keep its old pathId, and if
//! its fileId is unchanged the file keeps the version it was last changed
//! at. Lookups run from cheapest to most expensive:
//!
//! 1. the latest packages on the search branch (one batched query for the
//!    packages, one for their components)
//! 2. the source trove's file history on the search branch, then on each
//!    ancestor branch in turn, narrowed to the directories still unresolved
//!
//! Entries found by an earlier lookup are never replaced by a later one.
//! Repository failures never abort the cook: missing troves and permission
//! errors skip that lookup, and an unreachable repository falls back to
//! minting fresh pathIds for everything left.

use crate::files::{dirname, path_under, FileId, PathId};
use crate::label::Label;
use crate::repository::{PathRecord, RepositoryClient, RepositoryError, RepositoryResult};
use crate::trove::TroveTuple;
use crate::version::{Branch, Version};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Identity assigned to one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEntry {
    pub path_id: PathId,
    /// Version the known file was last changed at
    pub file_version: Option<Version>,
    /// fileId of the known file
    pub file_id: Option<FileId>,
}

impl IdentityEntry {
    /// A freshly minted identity with no known predecessor
    pub fn fresh(source_name: &str, path: &str, version: &Version) -> Self {
        Self {
            path_id: PathId::mint(source_name, path, version),
            file_version: None,
            file_id: None,
        }
    }

    /// Whether a predecessor file is known for this path
    pub fn is_known(&self) -> bool {
        self.file_version.is_some()
    }
}

impl From<PathRecord> for IdentityEntry {
    fn from(record: PathRecord) -> Self {
        Self {
            path_id: record.path_id,
            file_version: Some(record.version),
            file_id: Some(record.file_id),
        }
    }
}

/// `path -> identity` for one source trove's cook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMap {
    source_name: String,
    entries: BTreeMap<String, IdentityEntry>,
}

impl IdentityMap {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Source trove fresh pathIds are minted for
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn get(&self, path: &str) -> Option<&IdentityEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &IdentityEntry)> {
        self.entries.iter()
    }

    /// Add an entry unless the path is already known
    ///
    /// Returns true if the entry was added.
    pub fn insert_if_absent(&mut self, path: impl Into<String>, entry: IdentityEntry) -> bool {
        match self.entries.entry(path.into()) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Merge entries from a later lookup; existing entries are kept
    ///
    /// Returns the number of entries added.
    pub fn merge(&mut self, other: impl IntoIterator<Item = (String, IdentityEntry)>) -> usize {
        let mut added = 0;
        for (path, entry) in other {
            if self.insert_if_absent(path, entry) {
                added += 1;
            }
        }
        added
    }

    /// Identity for `path`, minting and remembering a fresh one if unknown
    pub fn resolve(&mut self, path: &str, version: &Version) -> IdentityEntry {
        let source_name = &self.source_name;
        self.entries
            .entry(path.to_string())
            .or_insert_with(|| IdentityEntry::fresh(source_name, path, version))
            .clone()
    }
}

/// Directories covering `paths`, with nested directories collapsed into
/// their closest listed ancestor
pub fn dir_prefixes<'a>(paths: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let dirs: BTreeSet<&str> = paths.into_iter().map(dirname).collect();

    let mut prefixes: Vec<String> = Vec::new();
    for dir in dirs {
        if !prefixes.iter().any(|p| path_under(dir, p)) {
            prefixes.push(dir.to_string());
        }
    }
    prefixes
}

/// Inputs for resolving the identities of one source trove's build output
#[derive(Debug, Clone, Copy)]
pub struct IdentityRequest<'a> {
    /// Source trove name, e.g. `foo:source`
    pub source_name: &'a str,
    /// Version the new troves will be committed at
    pub target_version: &'a Version,
    /// Label the cook forks onto, for local cooks and emerges
    pub target_label: Option<&'a Label>,
    /// Packages produced by this cook, across all flavors
    pub package_names: &'a [String],
    /// fileId of every path just built
    pub new_files: &'a BTreeMap<String, FileId>,
}

/// Repository failures that only mean "nothing found here"
fn swallow<T: Default>(result: RepositoryResult<T>, what: &str) -> RepositoryResult<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err @ RepositoryError::Unavailable(_)) => Err(err),
        Err(err) => {
            debug!("{} failed, skipping: {}", what, err);
            Ok(T::default())
        }
    }
}

/// Assigns pathIds to build output from repository history
pub struct IdentityResolver<'a> {
    repos: Option<&'a dyn RepositoryClient>,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(repos: &'a dyn RepositoryClient) -> Self {
        Self { repos: Some(repos) }
    }

    /// Resolver for builds with no repository; every path gets a fresh id
    pub fn offline() -> Self {
        Self { repos: None }
    }

    /// Resolve an identity for every path in `request.new_files`
    pub fn resolve(&self, request: &IdentityRequest<'_>) -> IdentityMap {
        let mut map = IdentityMap::new(request.source_name);

        if let Some(repos) = self.repos {
            let mut branch = request.target_version.branch().clone();
            // Cook and emerge branches never carry identities worth reusing
            if request.target_label.is_some() {
                if let Some(parent) = branch.parent_branch() {
                    branch = parent;
                }
            }

            if branch.is_on_local_host() {
                debug!("search branch {} is local, minting new pathIds", branch);
            } else if let Err(err) = self.lookup(repos, request, branch, &mut map) {
                warn!("pathId lookup abandoned, minting new pathIds: {}", err);
            }
        }

        let mut fresh = 0;
        for path in request.new_files.keys() {
            if !map.contains(path) {
                map.resolve(path, request.target_version);
                fresh += 1;
            }
        }

        info!(
            "pathId lookup complete: {} reused, {} new",
            map.len() - fresh,
            fresh
        );
        map
    }

    fn lookup(
        &self,
        repos: &dyn RepositoryClient,
        request: &IdentityRequest<'_>,
        mut branch: Branch,
        map: &mut IdentityMap,
    ) -> RepositoryResult<()> {
        let mut unresolved: BTreeSet<&str> =
            request.new_files.keys().map(String::as_str).collect();

        let mut leaves = swallow(
            repos.get_trove_leaves_by_branch(request.package_names, &branch, None),
            "package leaf lookup",
        )?;
        // Only the leaf lookup moves uphill; history starts on the search branch
        if leaves.is_empty() {
            if let Some(parent) = branch.parent_branch() {
                debug!("no packages on {}, looking uphill", branch);
                leaves = swallow(
                    repos.get_trove_leaves_by_branch(request.package_names, &parent, None),
                    "package leaf lookup",
                )?;
            }
        }

        if !leaves.is_empty() {
            self.claim_from_leaves(repos, &leaves, &mut unresolved, map)?;
        }

        info!("looking up pathids from repository history");
        while !unresolved.is_empty() {
            let prefixes = dir_prefixes(unresolved.iter().copied());
            let file_ids: BTreeSet<FileId> = unresolved
                .iter()
                .filter_map(|p| request.new_files.get(*p))
                .copied()
                .collect();

            let found = swallow(
                repos.get_package_branch_path_ids(
                    request.source_name,
                    &branch,
                    &prefixes,
                    &file_ids,
                ),
                "branch pathId lookup",
            )?;

            let mut claimed = 0;
            for (path, record) in found {
                if unresolved.remove(path.as_str()) && map.insert_if_absent(path, record.into()) {
                    claimed += 1;
                }
            }
            debug!("{} paths resolved on {}", claimed, branch);

            match branch.parent_branch() {
                Some(parent) => branch = parent,
                None => break,
            }
        }

        Ok(())
    }

    fn claim_from_leaves(
        &self,
        repos: &dyn RepositoryClient,
        leaves: &[TroveTuple],
        unresolved: &mut BTreeSet<&str>,
        map: &mut IdentityMap,
    ) -> RepositoryResult<()> {
        let packages = swallow(repos.get_troves(leaves, false), "package fetch")?;

        let components: Vec<TroveTuple> = packages
            .iter()
            .flat_map(|p| p.troves().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if components.is_empty() {
            return Ok(());
        }

        let components = swallow(repos.get_troves(&components, true), "component fetch")?;
        for component in &components {
            for (path_id, file) in component.files() {
                if unresolved.remove(file.path.as_str()) {
                    map.insert_if_absent(
                        file.path.clone(),
                        IdentityEntry {
                            path_id: *path_id,
                            file_version: Some(file.version.clone()),
                            file_id: Some(file.file_id),
                        },
                    );
                }
            }
        }

        debug!("{} paths resolved from latest packages", map.len());
        Ok(())
    }
}
