// src/repository/memory.rs

//! In-memory repository
//!
//! Holds troves and file streams in ordered maps so every query answers
//! deterministically. Labels can be marked as denied to simulate permission
//! failures, and the whole repository can be switched offline.

use super::{PathRecord, RepositoryClient, RepositoryError, RepositoryResult, TroveSpec};
use crate::dependencies::{Dependency, DependencySet};
use crate::files::{path_under, FileId, FileInfo, PathId};
use crate::flavor::Flavor;
use crate::label::{Label, LabelPath};
use crate::trove::{Trove, TroveTuple};
use crate::version::{Branch, Version};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::trace;

/// Repository backed by in-process maps
#[derive(Debug, Default)]
pub struct MemoryRepository {
    troves: BTreeMap<TroveTuple, Trove>,
    file_streams: BTreeMap<FileId, FileInfo>,
    denied: BTreeSet<Label>,
    unavailable: bool,
    queries: AtomicUsize,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a trove, replacing any trove with the same tuple
    pub fn add_trove(&mut self, trove: Trove) {
        self.troves.insert(trove.tuple().clone(), trove);
    }

    /// Store the metadata of a file stream
    pub fn add_file_stream(&mut self, info: FileInfo) {
        self.file_streams.insert(info.file_id(), info);
    }

    /// Refuse every query touching `label`
    pub fn deny_label(&mut self, label: Label) {
        self.denied.insert(label);
    }

    /// Make every query fail as if the repository could not be opened
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    /// Number of queries answered or refused so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn trove_count(&self) -> usize {
        self.troves.len()
    }

    fn begin(&self, method: &str) -> RepositoryResult<()> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        trace!(method = %method, "repository query");
        if self.unavailable {
            return Err(RepositoryError::Unavailable(
                "in-memory repository is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn check_label(&self, label: &Label) -> RepositoryResult<()> {
        if self.denied.contains(label) {
            return Err(RepositoryError::InsufficientPermission(label.to_string()));
        }
        Ok(())
    }

    fn on_branch<'a>(&'a self, branch: &'a Branch) -> impl Iterator<Item = &'a Trove> + 'a {
        self.troves
            .values()
            .filter(move |t| t.version().branch() == branch)
    }
}

impl RepositoryClient for MemoryRepository {
    fn get_trove_leaves_by_branch(
        &self,
        names: &[String],
        branch: &Branch,
        flavor: Option<&Flavor>,
    ) -> RepositoryResult<Vec<TroveTuple>> {
        self.begin("get_trove_leaves_by_branch")?;
        self.check_label(branch.label())?;

        let mut leaves = Vec::new();
        for name in names {
            let candidates: Vec<&TroveTuple> = self
                .on_branch(branch)
                .map(Trove::tuple)
                .filter(|t| &t.name == name)
                .filter(|t| flavor.is_none_or(|f| f.satisfies(&t.flavor)))
                .collect();

            let Some(latest) = candidates.iter().map(|t| &t.version).max() else {
                continue;
            };
            leaves.extend(
                candidates
                    .iter()
                    .filter(|t| &t.version == latest)
                    .map(|t| (*t).clone()),
            );
        }

        Ok(leaves)
    }

    fn get_troves(&self, tuples: &[TroveTuple], with_files: bool) -> RepositoryResult<Vec<Trove>> {
        self.begin("get_troves")?;

        tuples
            .iter()
            .map(|tuple| {
                self.check_label(tuple.version.trailing_label())?;
                let trove = self
                    .troves
                    .get(tuple)
                    .ok_or_else(|| RepositoryError::TroveMissing(tuple.to_string()))?;
                Ok(if with_files {
                    trove.clone()
                } else {
                    trove.without_files()
                })
            })
            .collect()
    }

    fn find_troves(
        &self,
        label_path: &LabelPath,
        specs: &[TroveSpec],
    ) -> RepositoryResult<BTreeSet<TroveTuple>> {
        self.begin("find_troves")?;
        for label in label_path.labels() {
            self.check_label(label)?;
        }

        let mut found = BTreeSet::new();
        for spec in specs {
            for label in label_path.labels() {
                let on_label: Vec<&TroveTuple> = self
                    .troves
                    .keys()
                    .filter(|t| t.version.trailing_label() == label && spec.matches(t))
                    .collect();
                if !on_label.is_empty() {
                    found.extend(on_label.into_iter().cloned());
                    break;
                }
            }
        }
        Ok(found)
    }

    fn get_package_branch_path_ids(
        &self,
        source_name: &str,
        branch: &Branch,
        prefixes: &[String],
        file_ids: &BTreeSet<FileId>,
    ) -> RepositoryResult<BTreeMap<String, PathRecord>> {
        self.begin("get_package_branch_path_ids")?;
        self.check_label(branch.label())?;

        // path -> (trove version, record, fileId requested)
        let mut best: BTreeMap<String, (&Version, PathRecord, bool)> = BTreeMap::new();

        for trove in self.on_branch(branch).filter(|t| t.source_name == source_name) {
            for (path_id, file) in trove.files() {
                if !prefixes.is_empty() && !prefixes.iter().any(|p| path_under(&file.path, p)) {
                    continue;
                }

                let wanted = file_ids.contains(&file.file_id);
                let replace = match best.get(&file.path) {
                    None => true,
                    Some((seen_version, _, seen_wanted)) => {
                        (wanted, trove.version()) > (*seen_wanted, *seen_version)
                    }
                };

                if replace {
                    let record = PathRecord {
                        path_id: *path_id,
                        version: file.version.clone(),
                        file_id: file.file_id,
                    };
                    best.insert(file.path.clone(), (trove.version(), record, wanted));
                }
            }
        }

        Ok(best
            .into_iter()
            .map(|(path, (_, record, _))| (path, record))
            .collect())
    }

    fn get_file_versions(
        &self,
        files: &[(PathId, FileId, Version)],
    ) -> RepositoryResult<Vec<FileInfo>> {
        self.begin("get_file_versions")?;

        files
            .iter()
            .map(|(_, file_id, version)| {
                self.check_label(version.trailing_label())?;
                self.file_streams
                    .get(file_id)
                    .cloned()
                    .ok_or(RepositoryError::FileMissing(*file_id))
            })
            .collect()
    }

    fn get_trove_versions_by_branch(
        &self,
        names: &[String],
        branch: &Branch,
    ) -> RepositoryResult<BTreeMap<String, BTreeMap<Version, BTreeSet<Flavor>>>> {
        self.begin("get_trove_versions_by_branch")?;
        self.check_label(branch.label())?;

        let mut result: BTreeMap<String, BTreeMap<Version, BTreeSet<Flavor>>> = BTreeMap::new();
        for tuple in self.on_branch(branch).map(Trove::tuple) {
            if names.contains(&tuple.name) {
                result
                    .entry(tuple.name.clone())
                    .or_default()
                    .entry(tuple.version.clone())
                    .or_default()
                    .insert(tuple.flavor.clone());
            }
        }
        Ok(result)
    }

    fn get_troves_with_provides(
        &self,
        deps: &DependencySet,
    ) -> RepositoryResult<BTreeMap<Dependency, Vec<TroveTuple>>> {
        self.begin("get_troves_with_provides")?;

        Ok(deps
            .iter()
            .map(|dep| {
                let providers = self
                    .troves
                    .values()
                    .filter(|t| !self.denied.contains(t.version().trailing_label()))
                    .filter(|t| t.provides.provides(dep))
                    .map(|t| t.tuple().clone())
                    .collect();
                (dep.clone(), providers)
            })
            .collect())
    }
}
