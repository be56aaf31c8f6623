// src/config.rs
//! Cook configuration file
//!
//! ```toml
//! [cook]
//! shorten_group_flavors = true
//! error_on_flavor_change = true
//! always_bump_count = false
//!
//! [flavors]
//! platform = "[ssl, !debug, is: x86_64]"
//! flavor_path = ["[is: x86_64]", "[is: x86]"]
//!
//! [flavors.key]
//! group-dist = "[xen]"
//!
//! [metadata]
//! skip = ["longDesc"]
//! ```

use crate::cook::{BuildContext, GroupCookOptions};
use crate::flavor::Flavor;
use crate::trove::MetadataItem;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// `[cook]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookSection {
    pub shorten_group_flavors: bool,
    pub error_on_flavor_change: bool,
    pub always_bump_count: bool,
}

impl Default for CookSection {
    fn default() -> Self {
        let opts = GroupCookOptions::default();
        Self {
            shorten_group_flavors: opts.shorten_flavors,
            error_on_flavor_change: opts.error_on_flavor_change,
            always_bump_count: opts.always_bump_count,
        }
    }
}

/// `[flavors]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlavorSection {
    /// Flags of the platform being built for
    pub platform: Flavor,
    /// Extra key flags per group
    pub key: BTreeMap<String, Flavor>,
    /// Preferred flavors for build requirement providers, in order
    pub flavor_path: Vec<Flavor>,
}

/// `[metadata]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSection {
    /// Items never copied from a predecessor
    pub skip: Vec<MetadataItem>,
}

/// Complete cook configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookConfig {
    pub cook: CookSection,
    pub flavors: FlavorSection,
    pub metadata: MetadataSection,
}

impl CookConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CookConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn options(&self) -> GroupCookOptions {
        GroupCookOptions {
            shorten_flavors: self.cook.shorten_group_flavors,
            error_on_flavor_change: self.cook.error_on_flavor_change,
            always_bump_count: self.cook.always_bump_count,
        }
    }

    /// Build settings for a cook
    pub fn into_context(self) -> BuildContext {
        let options = self.options();
        let mut context = BuildContext::new(self.flavors.platform)
            .with_flavor_path(self.flavors.flavor_path)
            .with_options(options)
            .with_metadata_skip(self.metadata.skip);
        for (group, flavor) in self.flavors.key {
            context = context.with_key_flavor(group, flavor);
        }
        context
    }
}
