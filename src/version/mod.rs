// src/version/mod.rs

//! Branched trove versions
//!
//! A version is a revision sitting at the tip of a branch. Branches form a
//! tree: every branch starts on a trunk label and may fork further, either
//! as a real branch off a specific revision (`/1.0-1-1/label`) or as a
//! shadow (`//label`) that tracks its parent without a fork point.
//!
//! ```text
//! /conary.example.com@rpl:devel//conary.example.com@rpl:shadow/1.0-1-2
//!  ^ trunk                      ^ shadow fork                 ^ revision
//! ```

use crate::error::{Error, Result};
use crate::label::Label;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Trailing revision of a version: `upstream-sourceCount[-buildCount]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision {
    pub upstream: String,
    pub source_count: u32,
    /// Present on binary versions only
    pub build_count: Option<u32>,
}

impl Revision {
    /// Create a source revision (no build count)
    pub fn source(upstream: impl Into<String>, source_count: u32) -> Self {
        Self {
            upstream: upstream.into(),
            source_count,
            build_count: None,
        }
    }

    /// Create a binary revision
    pub fn binary(upstream: impl Into<String>, source_count: u32, build_count: u32) -> Self {
        Self {
            upstream: upstream.into(),
            source_count,
            build_count: Some(build_count),
        }
    }

    /// Parse a revision string
    ///
    /// Examples:
    /// - "1.0-1" → upstream="1.0", source_count=1, build_count=None
    /// - "2.3.4-5-2" → upstream="2.3.4", source_count=5, build_count=Some(2)
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(Error::ParseError(format!(
                "Revision '{}' must be upstream-source[-build]",
                s
            )));
        }
        if parts[0].is_empty() {
            return Err(Error::ParseError(format!(
                "Empty upstream version in revision '{}'",
                s
            )));
        }

        let count = |p: &str| {
            p.parse::<u32>().map_err(|e| {
                Error::ParseError(format!("Invalid count '{}' in revision '{}': {}", p, s, e))
            })
        };

        let source_count = count(parts[1])?;
        let build_count = parts.get(2).map(|p| count(p)).transpose()?;

        Ok(Self {
            upstream: parts[0].to_string(),
            source_count,
            build_count,
        })
    }

    /// The source revision this binary revision was built from
    pub fn source_revision(&self) -> Self {
        Self {
            build_count: None,
            ..self.clone()
        }
    }

    /// Bump the build count, starting at 1 for source revisions
    pub fn increment_build_count(&mut self) {
        self.build_count = Some(self.build_count.map_or(1, |n| n + 1));
    }

    /// Upstream version normalized for comparison
    ///
    /// Upstream versions are rarely semver-compliant, so missing or
    /// non-numeric components are read as zero.
    fn upstream_semver(&self) -> semver::Version {
        if let Ok(v) = semver::Version::parse(&self.upstream) {
            return v;
        }

        let parts: Vec<&str> = self.upstream.split('.').collect();
        let major = parts.first().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let minor = parts.get(1).and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);
        let patch = parts.get(2).and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);

        semver::Version::new(major, minor, patch)
    }
}

impl Ord for Revision {
    fn cmp(&self, other: &Self) -> Ordering {
        self.upstream_semver()
            .cmp(&other.upstream_semver())
            .then_with(|| self.upstream.cmp(&other.upstream))
            .then_with(|| self.source_count.cmp(&other.source_count))
            .then_with(|| self.build_count.cmp(&other.build_count))
    }
}

impl PartialOrd for Revision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.upstream, self.source_count)?;
        if let Some(build) = self.build_count {
            write!(f, "-{}", build)?;
        }
        Ok(())
    }
}

/// One step away from the trunk
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fork {
    /// Revision the branch was forked from; `None` for shadows
    pub from: Option<Revision>,
    pub label: Label,
}

/// A line of development: a trunk label plus any number of forks
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Branch {
    trunk: Label,
    forks: Vec<Fork>,
}

impl Branch {
    /// Create a trunk branch on the given label
    pub fn trunk(label: Label) -> Self {
        Self {
            trunk: label,
            forks: Vec::new(),
        }
    }

    /// Parse a branch string such as `/repo@ns:1//repo@ns:shadow`
    pub fn parse(s: &str) -> Result<Self> {
        let rest = s.strip_prefix('/').ok_or_else(|| {
            Error::ParseError(format!("Branch '{}' must start with '/'", s))
        })?;

        let tokens: Vec<&str> = rest.split('/').collect();
        let trunk = Label::parse(tokens[0])?;
        let mut forks = Vec::new();

        let mut i = 1;
        while i < tokens.len() {
            let label = tokens.get(i + 1).ok_or_else(|| {
                Error::ParseError(format!("Branch '{}' ends without a label", s))
            })?;
            let from = if tokens[i].is_empty() {
                None
            } else {
                Some(Revision::parse(tokens[i])?)
            };
            forks.push(Fork {
                from,
                label: Label::parse(label)?,
            });
            i += 2;
        }

        Ok(Self { trunk, forks })
    }

    /// The label at the tip of this branch
    pub fn label(&self) -> &Label {
        self.forks.last().map_or(&self.trunk, |f| &f.label)
    }

    /// Walk every label from the trunk to the tip
    pub fn iter_labels(&self) -> impl DoubleEndedIterator<Item = &Label> {
        std::iter::once(&self.trunk).chain(self.forks.iter().map(|f| &f.label))
    }

    /// Whether this branch was forked or shadowed from another branch
    pub fn has_parent_branch(&self) -> bool {
        !self.forks.is_empty()
    }

    /// The branch this one was forked or shadowed from
    pub fn parent_branch(&self) -> Option<Branch> {
        if self.forks.is_empty() {
            return None;
        }
        Some(Self {
            trunk: self.trunk.clone(),
            forks: self.forks[..self.forks.len() - 1].to_vec(),
        })
    }

    /// Whether the tip label lives on the reserved local host
    pub fn is_on_local_host(&self) -> bool {
        self.label().is_local()
    }

    /// Create a shadow of this branch on another label
    pub fn create_shadow(&self, label: Label) -> Branch {
        let mut forks = self.forks.clone();
        forks.push(Fork { from: None, label });
        Self {
            trunk: self.trunk.clone(),
            forks,
        }
    }

    /// Create a version on this branch
    pub fn create_version(&self, revision: Revision) -> Version {
        Version {
            branch: self.clone(),
            revision,
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.trunk)?;
        for fork in &self.forks {
            match &fork.from {
                Some(rev) => write!(f, "/{}/{}", rev, fork.label)?,
                None => write!(f, "//{}", fork.label)?,
            }
        }
        Ok(())
    }
}

impl FromStr for Branch {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Branch::parse(s)
    }
}

/// A revision at the tip of a branch
///
/// Versions order by revision first and branch second, so the most recent
/// build of a lineage sorts last regardless of which shadow it lives on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    branch: Branch,
    revision: Revision,
}

impl Version {
    /// Parse a full version string such as `/repo@ns:1/1.0-1-1`
    pub fn parse(s: &str) -> Result<Self> {
        let (branch, revision) = s.rsplit_once('/').ok_or_else(|| {
            Error::ParseError(format!("Version '{}' has no revision", s))
        })?;
        Ok(Self {
            branch: Branch::parse(branch)?,
            revision: Revision::parse(revision)?,
        })
    }

    /// The branch this version is part of
    pub fn branch(&self) -> &Branch {
        &self.branch
    }

    /// The label at the tip of this version's branch
    pub fn trailing_label(&self) -> &Label {
        self.branch.label()
    }

    /// The revision at the end of the version
    pub fn trailing_revision(&self) -> &Revision {
        &self.revision
    }

    /// Whether this version lives on the reserved local host
    pub fn is_on_local_host(&self) -> bool {
        self.branch.is_on_local_host()
    }

    /// Whether this version's branch has a parent
    pub fn has_parent_branch(&self) -> bool {
        self.branch.has_parent_branch()
    }

    /// Parent of this version's branch
    pub fn parent_branch(&self) -> Option<Branch> {
        self.branch.parent_branch()
    }

    /// The same revision with its build count stripped
    pub fn source_version(&self) -> Version {
        Self {
            branch: self.branch.clone(),
            revision: self.revision.source_revision(),
        }
    }

    /// Fork this version onto a new label, keeping the revision
    pub fn create_branch(&self, label: Label) -> Version {
        let mut forks = self.branch.forks.clone();
        forks.push(Fork {
            from: Some(self.revision.clone()),
            label,
        });
        Self {
            branch: Branch {
                trunk: self.branch.trunk.clone(),
                forks,
            },
            revision: self.revision.clone(),
        }
    }

    /// Bump the trailing build count
    pub fn increment_build_count(&mut self) {
        self.revision.increment_build_count();
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.revision
            .cmp(&other.revision)
            .then_with(|| self.branch.cmp(&other.branch))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.branch, self.revision)
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = Error;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Version::parse(&s)
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_parse() {
        let rev = Revision::parse("1.2.3-4").unwrap();
        assert_eq!(rev.upstream, "1.2.3");
        assert_eq!(rev.source_count, 4);
        assert_eq!(rev.build_count, None);

        let rev = Revision::parse("1.0-1-2").unwrap();
        assert_eq!(rev.build_count, Some(2));
        assert_eq!(rev.to_string(), "1.0-1-2");
    }

    #[test]
    fn test_revision_parse_errors() {
        assert!(Revision::parse("1.0").is_err());
        assert!(Revision::parse("-1-1").is_err());
        assert!(Revision::parse("1.0-x").is_err());
        assert!(Revision::parse("1.0-1-2-3").is_err());
    }

    #[test]
    fn test_revision_ordering() {
        let r = |s| Revision::parse(s).unwrap();
        assert!(r("1.0-1-1") < r("1.0-1-2"));
        assert!(r("1.0-1-9") < r("1.0-2-1"));
        assert!(r("1.9-1-1") < r("1.10-1-1"));
        assert!(r("1.0-1") < r("1.0-1-1"));
    }

    #[test]
    fn test_increment_build_count() {
        let mut rev = Revision::source("1.0", 1);
        rev.increment_build_count();
        assert_eq!(rev.to_string(), "1.0-1-1");
        rev.increment_build_count();
        assert_eq!(rev.to_string(), "1.0-1-2");
        assert_eq!(rev.source_revision().to_string(), "1.0-1");
    }

    #[test]
    fn test_branch_parse_trunk() {
        let branch = Branch::parse("/conary.example.com@rpl:devel").unwrap();
        assert!(!branch.has_parent_branch());
        assert!(branch.parent_branch().is_none());
        assert_eq!(branch.label().tag, "devel");
        assert_eq!(branch.to_string(), "/conary.example.com@rpl:devel");
    }

    #[test]
    fn test_branch_parse_fork_and_shadow() {
        let s = "/repo@rpl:devel/1.0-1-1/repo@rpl:fix//other@rpl:shadow";
        let branch = Branch::parse(s).unwrap();
        assert_eq!(branch.to_string(), s);
        assert_eq!(branch.label(), &Label::new("other", "rpl", "shadow"));

        let labels: Vec<String> = branch.iter_labels().map(|l| l.tag.clone()).collect();
        assert_eq!(labels, vec!["devel", "fix", "shadow"]);

        let parent = branch.parent_branch().unwrap();
        assert_eq!(parent.to_string(), "/repo@rpl:devel/1.0-1-1/repo@rpl:fix");
        let grandparent = parent.parent_branch().unwrap();
        assert_eq!(grandparent.to_string(), "/repo@rpl:devel");
    }

    #[test]
    fn test_branch_parse_errors() {
        assert!(Branch::parse("repo@rpl:devel").is_err());
        assert!(Branch::parse("/repo@rpl:devel/1.0-1-1").is_err());
        assert!(Branch::parse("/not-a-label").is_err());
    }

    #[test]
    fn test_version_parse() {
        let v = Version::parse("/repo@rpl:devel//repo@rpl:shadow/1.0-1-2").unwrap();
        assert_eq!(v.trailing_label().tag, "shadow");
        assert_eq!(v.trailing_revision().build_count, Some(2));
        assert!(v.has_parent_branch());
        assert_eq!(v.parent_branch().unwrap().to_string(), "/repo@rpl:devel");
        assert_eq!(v.to_string(), "/repo@rpl:devel//repo@rpl:shadow/1.0-1-2");
    }

    #[test]
    fn test_version_local_host() {
        let v = Version::parse("/local@local:COOK/1.0-1-1").unwrap();
        assert!(v.is_on_local_host());
        let v = Version::parse("/repo@rpl:devel/1.0-1-1").unwrap();
        assert!(!v.is_on_local_host());
    }

    #[test]
    fn test_version_create_branch() {
        let v = Version::parse("/repo@rpl:devel/1.0-1-1").unwrap();
        let forked = v.create_branch(Label::cook());
        assert_eq!(
            forked.to_string(),
            "/repo@rpl:devel/1.0-1-1/local@local:COOK/1.0-1-1"
        );
        assert_eq!(forked.parent_branch().unwrap(), *v.branch());
        assert!(forked.is_on_local_host());
    }

    #[test]
    fn test_version_ordering_prefers_revision() {
        let a = Version::parse("/repo@rpl:devel/1.0-1-2").unwrap();
        let b = Version::parse("/repo@rpl:devel//repo@rpl:shadow/1.0-1-1").unwrap();
        assert!(b < a);
        let c = Version::parse("/repo@rpl:devel/1.0-1-1").unwrap();
        assert!(c < a);
    }

    #[test]
    fn test_version_serde_string_form() {
        let v = Version::parse("/repo@rpl:devel/1.0-1-1").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"/repo@rpl:devel/1.0-1-1\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
