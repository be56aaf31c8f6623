// src/dependencies/mod.rs

//! Trove-level dependencies
//!
//! Troves carry a `requires` and a `provides` set. A provided dependency
//! satisfies a required one when both name the same class and name and the
//! provider offers every flag the requirement asks for:
//!
//! ```ignore
//! use conary_cook::dependencies::Dependency;
//!
//! let req = Dependency::parse("soname: ELF64/libc.so.6(GLIBC_2.2)").unwrap();
//! let prov = Dependency::parse("soname: ELF64/libc.so.6(GLIBC_2.2 GLIBC_2.3)").unwrap();
//! assert!(prov.satisfies(&req));
//! ```

mod classes;

pub use classes::DependencyClass;

use crate::error::{Error, Result};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A single dependency: class, name and an optional set of flags
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dependency {
    pub class: DependencyClass,
    pub name: String,
    pub flags: BTreeSet<String>,
}

impl Dependency {
    /// Create a dependency without flags
    pub fn new(class: DependencyClass, name: impl Into<String>) -> Self {
        Self {
            class,
            name: name.into(),
            flags: BTreeSet::new(),
        }
    }

    /// Shorthand for a `trove:` dependency
    pub fn trove(name: impl Into<String>) -> Self {
        Self::new(DependencyClass::Trove, name)
    }

    /// Add flags to this dependency
    pub fn with_flags(mut self, flags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Parse `class: name(flag flag)`
    pub fn parse(s: &str) -> Result<Self> {
        let (prefix, rest) = s.split_once(':').ok_or_else(|| {
            Error::ParseError(format!("Dependency '{}' has no class prefix", s))
        })?;

        let class = DependencyClass::from_prefix(prefix.trim()).ok_or_else(|| {
            Error::ParseError(format!("Unknown dependency class '{}'", prefix.trim()))
        })?;

        let rest = rest.trim();
        let (name, flags) = match rest.find('(') {
            Some(open) => {
                let inner = rest[open + 1..].strip_suffix(')').ok_or_else(|| {
                    Error::ParseError(format!("Unterminated flag list in '{}'", s))
                })?;
                (&rest[..open], inner.split_whitespace().map(str::to_string).collect())
            }
            None => (rest, BTreeSet::new()),
        };

        if name.is_empty() {
            return Err(Error::ParseError(format!("Dependency '{}' has no name", s)));
        }

        Ok(Self {
            class,
            name: name.to_string(),
            flags,
        })
    }

    /// Whether this (provided) dependency satisfies a required one
    pub fn satisfies(&self, required: &Dependency) -> bool {
        self.class == required.class
            && self.name == required.name
            && required.flags.is_subset(&self.flags)
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.name)?;
        if !self.flags.is_empty() {
            let flags: Vec<&str> = self.flags.iter().map(String::as_str).collect();
            write!(f, "({})", flags.join(" "))?;
        }
        Ok(())
    }
}

impl FromStr for Dependency {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Dependency::parse(s)
    }
}

/// An ordered set of dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    deps: BTreeSet<Dependency>,
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dep: Dependency) -> bool {
        self.deps.insert(dep)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.deps.iter()
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    pub fn contains(&self, dep: &Dependency) -> bool {
        self.deps.contains(dep)
    }

    /// Copy of this set with every dependency of `class` removed
    pub fn without_class(&self, class: DependencyClass) -> DependencySet {
        self.deps.iter().filter(|d| d.class != class).cloned().collect()
    }

    /// Whether any dependency in this set satisfies `required`
    pub fn provides(&self, required: &Dependency) -> bool {
        self.deps.iter().any(|d| d.satisfies(required))
    }

    /// Merge another set into this one
    pub fn union(&mut self, other: &DependencySet) {
        self.deps.extend(other.deps.iter().cloned());
    }
}

impl FromIterator<Dependency> for DependencySet {
    fn from_iter<I: IntoIterator<Item = Dependency>>(iter: I) -> Self {
        Self {
            deps: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DependencySet {
    type Item = &'a Dependency;
    type IntoIter = std::collections::btree_set::Iter<'a, Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.deps.iter()
    }
}

impl fmt::Display for DependencySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.deps.iter().map(|d| d.to_string()).collect();
        write!(f, "{}", lines.join("\n"))
    }
}
