// src/cook/mod.rs

//! Cook identity and continuity
//!
//! Consults repository history so a freshly cooked changeset stays
//! consistent with what was cooked before:
//! - [`identity`]: stable pathIds and reused file versions
//! - [`flavors`]: shortened flavors and flavor-set checks for group cooks
//! - [`metadata`]: predecessor troves to copy descriptive metadata from
//! - [`buildreqs`]: transitive closure of satisfied build requirements
//!
//! [`component`] and [`nextversion`] consume these results when the
//! changeset is assembled.

pub mod buildreqs;
pub mod component;
pub mod flavors;
pub mod identity;
pub mod metadata;
pub mod nextversion;

use crate::flavor::Flavor;
use crate::trove::MetadataItem;
use std::collections::{BTreeMap, BTreeSet};

/// Switches for a multi-flavor group cook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupCookOptions {
    /// Shorten flavors down to the flags that tell builds apart
    pub shorten_flavors: bool,
    /// Refuse to commit when the set of cooked flavors changed
    pub error_on_flavor_change: bool,
    /// Always bump the build count, even if no flavor collides
    pub always_bump_count: bool,
}

impl Default for GroupCookOptions {
    fn default() -> Self {
        Self {
            shorten_flavors: true,
            error_on_flavor_change: true,
            always_bump_count: false,
        }
    }
}

/// Immutable build settings threaded through every cook call
///
/// Holds the platform flag set and per-group key flavors so nothing in a
/// cook depends on process-wide flag tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildContext {
    /// Canonical flags of the platform being built for
    pub platform_flags: Flavor,
    /// Extra key flags per group name
    pub key_flavors: BTreeMap<String, Flavor>,
    /// Flavors to prefer when several troves provide a build requirement
    pub flavor_path: Vec<Flavor>,
    pub options: GroupCookOptions,
    /// Metadata items never copied forward
    pub metadata_skip: BTreeSet<MetadataItem>,
}

impl BuildContext {
    pub fn new(platform_flags: Flavor) -> Self {
        Self {
            platform_flags,
            ..Default::default()
        }
    }

    pub fn with_key_flavor(mut self, group: impl Into<String>, flavor: Flavor) -> Self {
        self.key_flavors.insert(group.into(), flavor);
        self
    }

    pub fn with_flavor_path(mut self, flavor_path: Vec<Flavor>) -> Self {
        self.flavor_path = flavor_path;
        self
    }

    pub fn with_options(mut self, options: GroupCookOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_metadata_skip(mut self, skip: impl IntoIterator<Item = MetadataItem>) -> Self {
        self.metadata_skip.extend(skip);
        self
    }

    /// Canonical key flags for a group: platform flags plus the group's own
    pub fn key_flavor_for(&self, group: &str) -> Flavor {
        match self.key_flavors.get(group) {
            Some(extra) => self.platform_flags.union(extra),
            None => self.platform_flags.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_flavor_for() {
        let ctx = BuildContext::new(Flavor::parse("[ssl]").unwrap())
            .with_key_flavor("group-dist", Flavor::parse("[xen]").unwrap());

        assert_eq!(
            ctx.key_flavor_for("group-dist"),
            Flavor::parse("[ssl, xen]").unwrap()
        );
        assert_eq!(ctx.key_flavor_for("group-other"), Flavor::parse("[ssl]").unwrap());
    }

    #[test]
    fn test_default_options() {
        let opts = GroupCookOptions::default();
        assert!(opts.shorten_flavors);
        assert!(opts.error_on_flavor_change);
        assert!(!opts.always_bump_count);
    }
}
