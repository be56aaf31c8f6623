// src/flavor/mod.rs
//! Flavor parsing, scoring and set algebra
//!
//! Flavors describe the build-time variation of a trove: use flags with a
//! sense plus the instruction set it was built for.
//! Syntax: `[ssl, !debug, ~vmware, ~!xen, is: x86 x86_64]`
//!
//! Scoring compares a system (or desired) flavor against a trove flavor and
//! either yields a compatibility score or reports the pair incompatible.
//! Group cooks lean on the set operations to shorten flavors down to the
//! flags that actually tell builds apart.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Sense of a use flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FlavorOp {
    /// Built with this flag (no prefix)
    Required,
    /// Built without this flag (! prefix)
    Not,
    /// Soft preference for the flag (~ prefix)
    Prefers,
    /// Soft preference against the flag (~! prefix)
    PrefersNot,
}

impl FlavorOp {
    /// Get the string prefix for this operator
    pub fn as_prefix(&self) -> &'static str {
        match self {
            Self::Required => "",
            Self::Not => "!",
            Self::Prefers => "~",
            Self::PrefersNot => "~!",
        }
    }

    /// Parse an operator and name from a string
    /// Returns (operator, remaining name)
    pub fn parse_with_name(s: &str) -> Result<(Self, &str)> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::ParseError("Empty flavor item".to_string()));
        }

        // Check longer operators first
        let (op, name) = if let Some(rest) = s.strip_prefix("~!") {
            (Self::PrefersNot, rest.trim())
        } else if let Some(rest) = s.strip_prefix('~') {
            (Self::Prefers, rest.trim())
        } else if let Some(rest) = s.strip_prefix('!') {
            (Self::Not, rest.trim())
        } else {
            (Self::Required, s)
        };

        if name.is_empty() {
            return Err(Error::ParseError(format!(
                "Missing name after {} operator",
                op.as_prefix()
            )));
        }
        if name.contains(char::is_whitespace) {
            return Err(Error::ParseError(format!(
                "Flavor flag '{}' contains whitespace",
                name
            )));
        }

        Ok((op, name))
    }
}

/// Compatibility of one use flag: the system's sense (or none) against the
/// trove's sense. `None` means incompatible.
fn sense_score(system: Option<FlavorOp>, trove: FlavorOp) -> Option<i32> {
    use FlavorOp::*;

    match (system, trove) {
        (None, Required) => None,
        (None, Not) => Some(0),
        (None, Prefers) => Some(-1),
        (None, PrefersNot) => Some(1),

        (Some(Required), Required) => Some(2),
        (Some(Required), Not) => None,
        (Some(Required), Prefers) => Some(1),
        (Some(Required), PrefersNot) => None,

        (Some(Not), Required) => None,
        (Some(Not), Not) => Some(2),
        (Some(Not), Prefers) => None,
        (Some(Not), PrefersNot) => Some(1),

        (Some(Prefers), Required) => Some(1),
        (Some(Prefers), Not) => None,
        (Some(Prefers), Prefers) => Some(2),
        (Some(Prefers), PrefersNot) => Some(-1),

        (Some(PrefersNot), Required) => Some(-2),
        (Some(PrefersNot), Not) => Some(1),
        (Some(PrefersNot), Prefers) => Some(-1),
        (Some(PrefersNot), PrefersNot) => Some(1),
    }
}

/// A single use flag with its sense
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlavorItem {
    pub op: FlavorOp,
    pub name: String,
}

impl FlavorItem {
    /// Create a new flavor item
    pub fn new(op: FlavorOp, name: impl Into<String>) -> Self {
        Self {
            op,
            name: name.into(),
        }
    }

    /// Parse a flavor item from a string like "ssl", "!debug", "~vmware", "~!xen"
    pub fn parse(s: &str) -> Result<Self> {
        let (op, name) = FlavorOp::parse_with_name(s)?;
        Ok(Self {
            op,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for FlavorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op.as_prefix(), self.name)
    }
}

/// An immutable set of use flags plus instruction set
///
/// Always held in canonical form: one sense per flag name, flags and
/// architectures sorted. Two flavors are equal exactly when their string
/// forms are equal.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Flavor {
    use_flags: BTreeMap<String, FlavorOp>,
    arch: BTreeSet<String>,
}

impl Flavor {
    /// Create an empty flavor
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a flavor from items and architectures
    ///
    /// A flag named more than once keeps its last sense.
    pub fn new(
        items: impl IntoIterator<Item = FlavorItem>,
        arch: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            use_flags: items.into_iter().map(|i| (i.name, i.op)).collect(),
            arch: arch.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if this flavor is empty
    pub fn is_empty(&self) -> bool {
        self.use_flags.is_empty() && self.arch.is_empty()
    }

    /// Use flags in canonical order
    pub fn items(&self) -> impl Iterator<Item = FlavorItem> + '_ {
        self.use_flags
            .iter()
            .map(|(name, op)| FlavorItem::new(*op, name.clone()))
    }

    /// Architectures in canonical order
    pub fn architectures(&self) -> impl Iterator<Item = &str> {
        self.arch.iter().map(String::as_str)
    }

    /// Sense of a use flag, if present
    pub fn sense(&self, name: &str) -> Option<FlavorOp> {
        self.use_flags.get(name).copied()
    }

    /// Whether the instruction set includes this architecture
    pub fn has_arch(&self, arch: &str) -> bool {
        self.arch.contains(arch)
    }

    /// Parse a flavor specification string
    ///
    /// Examples:
    /// - `[ssl, !debug, is: x86_64]`
    /// - `ssl, !debug` (without brackets)
    /// - `[]` (empty)
    /// - `[is: x86 x86_64]` (arch only)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        let inner = if s.starts_with('[') && s.ends_with(']') {
            &s[1..s.len() - 1]
        } else {
            s
        };

        let mut flavor = Self::empty();

        for part in inner.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if let Some(arch_str) = part.strip_prefix("is:") {
                let before = flavor.arch.len();
                flavor
                    .arch
                    .extend(arch_str.split_whitespace().map(str::to_string));
                if flavor.arch.len() == before && arch_str.trim().is_empty() {
                    return Err(Error::ParseError(
                        "Empty architecture specification after 'is:'".to_string(),
                    ));
                }
            } else {
                let item = FlavorItem::parse(part)?;
                flavor.use_flags.insert(item.name, item.op);
            }
        }

        Ok(flavor)
    }

    /// Compatibility score of `other` (a trove flavor) on `self` (a system
    /// or desired flavor)
    ///
    /// Returns `None` when `other` cannot be used where `self` is wanted.
    /// Higher scores mean a closer fit.
    pub fn score(&self, other: &Flavor) -> Option<i32> {
        if !other.arch.iter().all(|a| self.arch.contains(a)) {
            return None;
        }

        other
            .use_flags
            .iter()
            .try_fold(0, |total, (name, op)| {
                sense_score(self.sense(name), *op).map(|s| total + s)
            })
    }

    /// Whether `other` is compatible with `self`
    pub fn satisfies(&self, other: &Flavor) -> bool {
        self.score(other).is_some()
    }

    /// Flags and architectures of `self` that do not appear identically in `other`
    pub fn difference(&self, other: &Flavor) -> Flavor {
        Self {
            use_flags: self
                .use_flags
                .iter()
                .filter(|(name, op)| other.use_flags.get(*name) != Some(op))
                .map(|(name, op)| (name.clone(), *op))
                .collect(),
            arch: self.arch.difference(&other.arch).cloned().collect(),
        }
    }

    /// Flags and architectures present identically in both flavors
    pub fn intersection(&self, other: &Flavor) -> Flavor {
        Self {
            use_flags: self
                .use_flags
                .iter()
                .filter(|(name, op)| other.use_flags.get(*name) == Some(op))
                .map(|(name, op)| (name.clone(), *op))
                .collect(),
            arch: self.arch.intersection(&other.arch).cloned().collect(),
        }
    }

    /// Combine two flavors; `other` wins where a flag's sense conflicts
    pub fn union(&self, other: &Flavor) -> Flavor {
        let mut result = self.clone();
        result
            .use_flags
            .extend(other.use_flags.iter().map(|(n, op)| (n.clone(), *op)));
        result.arch.extend(other.arch.iter().cloned());
        result
    }

    /// Restrict to the flags and architectures named by any key flavor
    ///
    /// Only names matter: `[ssl]` as a key keeps `!ssl` as well as `ssl`.
    pub fn filter(&self, keys: &[Flavor]) -> Flavor {
        Self {
            use_flags: self
                .use_flags
                .iter()
                .filter(|(name, _)| keys.iter().any(|k| k.use_flags.contains_key(*name)))
                .map(|(name, op)| (name.clone(), *op))
                .collect(),
            arch: self
                .arch
                .iter()
                .filter(|a| keys.iter().any(|k| k.arch.contains(*a)))
                .cloned()
                .collect(),
        }
    }

    /// The instruction-set part of this flavor
    pub fn instruction_set(&self) -> Flavor {
        Self {
            use_flags: BTreeMap::new(),
            arch: self.arch.clone(),
        }
    }
}

/// For each flavor, the part that is not shared by every flavor in the list
pub fn flavor_differences(flavors: &[Flavor]) -> Vec<Flavor> {
    let Some((first, rest)) = flavors.split_first() else {
        return Vec::new();
    };

    let common = rest
        .iter()
        .fold(first.clone(), |acc, f| acc.intersection(f));

    flavors.iter().map(|f| f.difference(&common)).collect()
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.items().map(|item| item.to_string()).collect();

        // Architecture always goes last
        if !self.arch.is_empty() {
            let arch: Vec<&str> = self.architectures().collect();
            parts.push(format!("is: {}", arch.join(" ")));
        }

        write!(f, "[{}]", parts.join(", "))
    }
}

impl FromStr for Flavor {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Flavor::parse(s)
    }
}

impl TryFrom<String> for Flavor {
    type Error = Error;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Flavor::parse(&s)
    }
}

impl From<Flavor> for String {
    fn from(flavor: Flavor) -> Self {
        flavor.to_string()
    }
}
