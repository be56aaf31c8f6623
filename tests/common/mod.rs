// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use conary_cook::cook::component::assemble_component;
use conary_cook::{
    BuildFile, FileId, FileInfo, Flavor, IdentityMap, IdentityRequest, IdentityResolver, Label,
    MemoryRepository, Trove, Version,
};
use std::collections::BTreeMap;

/// Route tracing output through the test harness; `RUST_LOG` controls it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn v(s: &str) -> Version {
    Version::parse(s).unwrap()
}

pub fn fl(s: &str) -> Flavor {
    Flavor::parse(s).unwrap()
}

pub fn build_files(files: &[(&str, &str)]) -> Vec<BuildFile> {
    files
        .iter()
        .map(|(path, content)| BuildFile::new(*path, FileInfo::regular(content.as_bytes())))
        .collect()
}

pub fn file_ids(files: &[BuildFile]) -> BTreeMap<String, FileId> {
    files.iter().map(|f| (f.path.clone(), f.file_id())).collect()
}

/// Resolve identities for `files` as a cook of `package` at `version` would
pub fn resolve(
    repo: &MemoryRepository,
    package: &str,
    version: &Version,
    target_label: Option<&Label>,
    files: &[BuildFile],
) -> IdentityMap {
    let names = vec![package.to_string()];
    let source = format!("{}:source", package);
    let new_files = file_ids(files);
    IdentityResolver::new(repo).resolve(&IdentityRequest {
        source_name: &source,
        target_version: version,
        target_label,
        package_names: &names,
        new_files: &new_files,
    })
}

/// Cook `package:runtime` from `files` and commit the package, the
/// component and the file streams to `repo`
///
/// Returns the committed component.
pub fn cook_and_commit(
    repo: &mut MemoryRepository,
    package: &str,
    version: &Version,
    flavor: &Flavor,
    files: &[(&str, &str)],
) -> Trove {
    let mut files = build_files(files);
    let mut identities = resolve(repo, package, version, None, &files);

    let component = assemble_component(
        &format!("{}:runtime", package),
        version,
        flavor,
        &mut files,
        &mut identities,
    );

    let mut pkg = Trove::new(package, version.clone(), flavor.clone());
    pkg.add_trove(component.tuple().clone());

    for file in &files {
        repo.add_file_stream(file.info.clone());
    }
    repo.add_trove(pkg);
    repo.add_trove(component.clone());
    component
}

/// Path of a component's file to the version it is recorded at
pub fn file_versions(component: &Trove) -> BTreeMap<String, Version> {
    component
        .files()
        .map(|(_, file)| (file.path.clone(), file.version.clone()))
        .collect()
}
