// src/cook/nextversion.rs

//! Version selection for freshly built binaries

use crate::error::Result;
use crate::flavor::Flavor;
use crate::label::Label;
use crate::repository::RepositoryClient;
use crate::version::Version;
use tracing::debug;

/// What is about to be built from one source version
#[derive(Debug, Clone, Copy)]
pub struct NextVersionRequest<'a> {
    /// Version of the source trove, without a build count
    pub source_version: &'a Version,
    pub package_names: &'a [String],
    /// Flavors this cook builds
    pub flavors: &'a [Flavor],
    /// Label to fork the result onto, for local cooks and emerges
    pub target_label: Option<&'a Label>,
    pub always_bump_count: bool,
}

/// Pick the binary version for a cook
///
/// Reuses the latest build count of the source revision unless one of the
/// flavors being built already exists there (or bumping is forced), so
/// flavors cooked separately end up side by side on one version. Without
/// a repository, or on the local host, the first build count is used.
pub fn next_version(
    repos: Option<&dyn RepositoryClient>,
    request: &NextVersionRequest<'_>,
) -> Result<Version> {
    let source = request.source_version.source_version();
    let mut first = source.clone();
    first.increment_build_count();

    let mut version = match repos {
        Some(repos) if !source.is_on_local_host() => {
            let existing =
                repos.get_trove_versions_by_branch(request.package_names, source.branch())?;
            let source_revision = source.trailing_revision();

            let latest = existing
                .values()
                .flat_map(|versions| versions.keys())
                .filter(|v| v.trailing_revision().source_revision() == *source_revision)
                .max()
                .cloned();

            match latest {
                None => first,
                Some(mut latest) => {
                    let collides = existing.values().any(|versions| {
                        versions
                            .get(&latest)
                            .is_some_and(|built| request.flavors.iter().any(|f| built.contains(f)))
                    });
                    if request.always_bump_count || collides {
                        latest.increment_build_count();
                    }
                    latest
                }
            }
        }
        _ => first,
    };

    if let Some(label) = request.target_label {
        version = version.create_branch(label.clone());
        version.increment_build_count();
    }

    debug!("next version for {}: {}", request.source_version, version);
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use crate::trove::Trove;

    fn version(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn fl(s: &str) -> Flavor {
        Flavor::parse(s).unwrap()
    }

    fn request<'a>(
        source: &'a Version,
        names: &'a [String],
        flavors: &'a [Flavor],
    ) -> NextVersionRequest<'a> {
        NextVersionRequest {
            source_version: source,
            package_names: names,
            flavors,
            target_label: None,
            always_bump_count: false,
        }
    }

    #[test]
    fn test_first_build() {
        let repo = MemoryRepository::new();
        let source = version("/repo@rpl:devel/1.0-1");
        let names = vec!["foo".to_string()];
        let flavors = vec![fl("[ssl]")];

        let next = next_version(Some(&repo), &request(&source, &names, &flavors)).unwrap();
        assert_eq!(next.to_string(), "/repo@rpl:devel/1.0-1-1");
    }

    #[test]
    fn test_new_flavor_shares_build_count() {
        let mut repo = MemoryRepository::new();
        repo.add_trove(Trove::new("foo", version("/repo@rpl:devel/1.0-1-2"), fl("[ssl]")));
        let source = version("/repo@rpl:devel/1.0-1");
        let names = vec!["foo".to_string()];

        let flavors = vec![fl("[!ssl]")];
        let next = next_version(Some(&repo), &request(&source, &names, &flavors)).unwrap();
        assert_eq!(next.to_string(), "/repo@rpl:devel/1.0-1-2");

        let flavors = vec![fl("[ssl]")];
        let next = next_version(Some(&repo), &request(&source, &names, &flavors)).unwrap();
        assert_eq!(next.to_string(), "/repo@rpl:devel/1.0-1-3");

        let flavors = vec![fl("[!ssl]")];
        let mut req = request(&source, &names, &flavors);
        req.always_bump_count = true;
        let next = next_version(Some(&repo), &req).unwrap();
        assert_eq!(next.to_string(), "/repo@rpl:devel/1.0-1-3");
    }

    #[test]
    fn test_other_source_revision_ignored() {
        let mut repo = MemoryRepository::new();
        repo.add_trove(Trove::new("foo", version("/repo@rpl:devel/1.0-1-4"), fl("[]")));
        let source = version("/repo@rpl:devel/1.0-2");
        let names = vec!["foo".to_string()];
        let flavors = vec![fl("[]")];

        let next = next_version(Some(&repo), &request(&source, &names, &flavors)).unwrap();
        assert_eq!(next.to_string(), "/repo@rpl:devel/1.0-2-1");
    }

    #[test]
    fn test_offline_and_target_label() {
        let source = version("/repo@rpl:devel/1.0-1");
        let names = vec!["foo".to_string()];
        let flavors = vec![fl("[]")];

        let next = next_version(None, &request(&source, &names, &flavors)).unwrap();
        assert_eq!(next.to_string(), "/repo@rpl:devel/1.0-1-1");

        let cook = Label::cook();
        let mut req = request(&source, &names, &flavors);
        req.target_label = Some(&cook);
        let next = next_version(None, &req).unwrap();
        assert_eq!(next.trailing_label(), &cook);
        assert_eq!(next.trailing_revision().build_count, Some(2));
    }
}
