// src/cook/component.rs

//! Component assembly from build output
//!
//! Turns the files of one built component into a trove, taking pathIds
//! and reused file versions from the resolved [`IdentityMap`].

use super::identity::IdentityMap;
use crate::error::Result;
use crate::files::{BuildFile, FileInfo, PathId};
use crate::flavor::Flavor;
use crate::repository::RepositoryClient;
use crate::trove::Trove;
use crate::version::Version;
use std::collections::BTreeMap;
use tracing::debug;

/// Build the component trove `name=version[flavor]` from `files`
///
/// Every file gets its pathId assigned. A file whose fileId matches the
/// known predecessor keeps the predecessor's version; anything else is
/// recorded at `version`. Paths the map does not know yet get a fresh
/// pathId, which is remembered in `identities`.
pub fn assemble_component(
    name: &str,
    version: &Version,
    flavor: &Flavor,
    files: &mut [BuildFile],
    identities: &mut IdentityMap,
) -> Trove {
    let mut trove = Trove::new(name, version.clone(), flavor.clone());
    let mut reused = 0;

    for file in files.iter_mut() {
        let entry = identities.resolve(&file.path, version);
        file.set_path_id(entry.path_id);

        let file_id = file.file_id();
        let file_version = match (entry.file_id, entry.file_version) {
            (Some(known), Some(old_version)) if known == file_id => {
                reused += 1;
                old_version
            }
            _ => version.clone(),
        };
        trove.add_file(entry.path_id, file.path.clone(), file_id, file_version);
    }

    debug!("assembled {} with {} files, {} unchanged", trove.tuple(), files.len(), reused);
    trove
}

/// Fetch the old file objects for every file `trove` reuses
///
/// A file is reused when it is recorded at a version other than the
/// trove's own.
pub fn fetch_reused_files(
    repos: &dyn RepositoryClient,
    trove: &Trove,
) -> Result<BTreeMap<PathId, FileInfo>> {
    let reused: Vec<_> = trove
        .files()
        .filter(|(_, file)| file.version != *trove.version())
        .map(|(path_id, file)| (*path_id, file.file_id, file.version.clone()))
        .collect();
    if reused.is_empty() {
        return Ok(BTreeMap::new());
    }

    let infos = repos.get_file_versions(&reused)?;
    Ok(reused
        .into_iter()
        .map(|(path_id, _, _)| path_id)
        .zip(infos)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cook::identity::IdentityEntry;

    fn version(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_unchanged_file_keeps_old_version() {
        let old = version("/repo@rpl:devel/1.0-1-1");
        let new = version("/repo@rpl:devel/1.0-2-1");
        let info = FileInfo::regular(b"A");

        let mut identities = IdentityMap::new("foo:source");
        identities.insert_if_absent(
            "/bin/foo",
            IdentityEntry {
                path_id: PathId::mint("foo:source", "/bin/foo", &old),
                file_version: Some(old.clone()),
                file_id: Some(info.file_id()),
            },
        );

        let mut files = vec![
            BuildFile::new("/bin/foo", info.clone()),
            BuildFile::new("/bin/bar", FileInfo::regular(b"B")),
        ];
        let trove = assemble_component("foo:runtime", &new, &Flavor::empty(), &mut files, &mut identities);

        let foo = trove.file(&PathId::mint("foo:source", "/bin/foo", &old)).unwrap();
        assert_eq!(foo.version, old);
        let bar = trove.file(&PathId::mint("foo:source", "/bin/bar", &new)).unwrap();
        assert_eq!(bar.version, new);
        assert_eq!(files[1].path_id(), Some(PathId::mint("foo:source", "/bin/bar", &new)));
        assert!(identities.contains("/bin/bar"));
    }

    #[test]
    fn test_changed_file_uses_new_version() {
        let old = version("/repo@rpl:devel/1.0-1-1");
        let new = version("/repo@rpl:devel/1.0-2-1");

        let mut identities = IdentityMap::new("foo:source");
        identities.insert_if_absent(
            "/bin/foo",
            IdentityEntry {
                path_id: PathId::mint("foo:source", "/bin/foo", &old),
                file_version: Some(old.clone()),
                file_id: Some(FileInfo::regular(b"A").file_id()),
            },
        );

        let mut files = vec![BuildFile::new("/bin/foo", FileInfo::regular(b"changed"))];
        let trove = assemble_component("foo:runtime", &new, &Flavor::empty(), &mut files, &mut identities);

        let foo = trove.file(&PathId::mint("foo:source", "/bin/foo", &old)).unwrap();
        assert_eq!(foo.version, new);
    }
}
