// src/cook/flavors.rs

//! Flavor planning for multi-flavor group cooks
//!
//! When one group recipe is cooked for several flavors at once, each build
//! gets a shortened flavor that keeps only the flags telling the builds
//! apart (plus the instruction set, which is never dropped). Before such a
//! cook is committed, [`FlavorSetPlanner::check_cook`] makes sure the set
//! of flavors matches the previous cook on the target branch.

use super::BuildContext;
use crate::error::{Error, Result};
use crate::flavor::{flavor_differences, Flavor};
use crate::repository::{RepositoryClient, RepositoryError};
use crate::version::Branch;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// Upper bound on shortening rounds before giving up
const MAX_SHORTEN_ROUNDS: usize = 64;

/// Key flavor handed to the planner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum KeyFlavor {
    /// Derive keys from the platform flags
    #[default]
    None,
    /// Derive keys from the platform flags, seeded with this flavor
    Single(Flavor),
    /// Use exactly these keys
    List(Vec<Flavor>),
}

/// One build of a group cook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedBuild<R> {
    pub recipe: R,
    pub full: Flavor,
    pub short: Flavor,
}

/// Shortened flavors for every build of a group cook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlavorPlan<R> {
    /// Keys the shortened flavors were filtered by
    pub key_flavors: Vec<Flavor>,
    pub builds: Vec<PlannedBuild<R>>,
}

impl<R> FlavorPlan<R> {
    pub fn short_flavors(&self) -> impl Iterator<Item = &Flavor> {
        self.builds.iter().map(|b| &b.short)
    }
}

/// Flavor and name differences between two cooks of the same groups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlavorSetDiff {
    /// Flavors cooked now but not last time, with their names
    pub added_flavors: BTreeMap<Flavor, BTreeSet<String>>,
    /// Flavors cooked last time but not now, with their names
    pub removed_flavors: BTreeMap<Flavor, BTreeSet<String>>,
    /// Names newly cooked at a flavor both cooks share
    pub added_names: BTreeMap<Flavor, BTreeSet<String>>,
    /// Names no longer cooked at a flavor both cooks share
    pub removed_names: BTreeMap<Flavor, BTreeSet<String>>,
}

impl FlavorSetDiff {
    /// Compare the flavors of the previous cook against the new one
    pub fn between(
        old: &BTreeMap<Flavor, BTreeSet<String>>,
        new: &BTreeMap<Flavor, BTreeSet<String>>,
    ) -> Self {
        let mut diff = Self::default();

        for (flavor, names) in new {
            match old.get(flavor) {
                None => {
                    diff.added_flavors.insert(flavor.clone(), names.clone());
                }
                Some(old_names) => {
                    let added: BTreeSet<String> = names.difference(old_names).cloned().collect();
                    let removed: BTreeSet<String> = old_names.difference(names).cloned().collect();
                    if !added.is_empty() {
                        diff.added_names.insert(flavor.clone(), added);
                    }
                    if !removed.is_empty() {
                        diff.removed_names.insert(flavor.clone(), removed);
                    }
                }
            }
        }

        for (flavor, names) in old {
            if !new.contains_key(flavor) {
                diff.removed_flavors.insert(flavor.clone(), names.clone());
            }
        }

        diff
    }

    /// Whether any flavor was added or removed
    pub fn flavors_changed(&self) -> bool {
        !self.added_flavors.is_empty() || !self.removed_flavors.is_empty()
    }

    /// Whether any name moved within a shared flavor
    pub fn names_changed(&self) -> bool {
        !self.added_names.is_empty() || !self.removed_names.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.flavors_changed() && !self.names_changed()
    }
}

fn write_section(
    f: &mut fmt::Formatter<'_>,
    title: &str,
    entries: &BTreeMap<Flavor, BTreeSet<String>>,
) -> fmt::Result {
    if entries.is_empty() {
        return Ok(());
    }
    writeln!(f, "{}", title)?;
    for (flavor, names) in entries {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        writeln!(f, "    {} ({})", flavor, names.join(", "))?;
    }
    Ok(())
}

impl fmt::Display for FlavorSetDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_section(f, "Flavors newly cooked:", &self.added_flavors)?;
        write_section(f, "Flavors not cooked this time:", &self.removed_flavors)?;
        write_section(f, "Names newly cooked at an existing flavor:", &self.added_names)?;
        write_section(f, "Names not cooked this time at an existing flavor:", &self.removed_names)
    }
}

/// The flavors of a group cook differ from the previous cook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlavorSetChangedError {
    pub branch: Branch,
    pub diff: FlavorSetDiff,
}

impl fmt::Display for FlavorSetChangedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "The group flavors being cooked differ from the previous cook on {}.",
            self.branch
        )?;
        write!(f, "{}", self.diff)?;
        write!(
            f,
            "Every flavor of a group has to be cooked together; clients pick a \
             group version by the flavors present at the latest version, so a \
             partial cook leaves them racing between versions."
        )
    }
}

impl std::error::Error for FlavorSetChangedError {}

/// Shortens and validates the flavors of a multi-flavor group cook
pub struct FlavorSetPlanner<'a> {
    context: &'a BuildContext,
}

impl<'a> FlavorSetPlanner<'a> {
    pub fn new(context: &'a BuildContext) -> Self {
        Self { context }
    }

    /// Keys shortening starts from
    pub fn initial_key_flavors(&self, group: &str, key: &KeyFlavor, builds: usize) -> Vec<Flavor> {
        match key {
            KeyFlavor::List(keys) => keys.clone(),
            KeyFlavor::None if builds == 1 => vec![Flavor::empty()],
            KeyFlavor::None => vec![self.context.key_flavor_for(group)],
            KeyFlavor::Single(seed) => vec![seed.clone(), self.context.key_flavor_for(group)],
        }
    }

    /// Compute shortened flavors for every build
    ///
    /// Returns the full flavors unchanged when shortening is disabled.
    pub fn plan<R>(
        &self,
        group: &str,
        key: &KeyFlavor,
        builds: Vec<(R, Flavor)>,
    ) -> Result<FlavorPlan<R>> {
        if !self.context.options.shorten_flavors {
            return Ok(FlavorPlan {
                key_flavors: Vec::new(),
                builds: builds
                    .into_iter()
                    .map(|(recipe, full)| PlannedBuild {
                        recipe,
                        short: full.clone(),
                        full,
                    })
                    .collect(),
            });
        }

        let fulls: Vec<Flavor> = builds.iter().map(|(_, f)| f.clone()).collect();
        let key_flavors =
            shorten_flavors(self.initial_key_flavors(group, key, builds.len()), &fulls)?;

        let plan_builds = builds
            .into_iter()
            .map(|(recipe, full)| PlannedBuild {
                recipe,
                short: shorten(&full, &key_flavors),
                full,
            })
            .collect();

        Ok(FlavorPlan {
            key_flavors,
            builds: plan_builds,
        })
    }

    /// Refuse a cook whose set of flavors differs from the previous cook
    ///
    /// `cooked` lists every `(group name, flavor)` about to be committed on
    /// `branch`. Local branches are never checked. Returns the differences
    /// found when the cook may proceed.
    pub fn check_cook(
        &self,
        repos: &dyn RepositoryClient,
        branch: &Branch,
        cooked: &[(String, Flavor)],
    ) -> Result<FlavorSetDiff> {
        if branch.is_on_local_host() {
            return Ok(FlavorSetDiff::default());
        }

        let names: Vec<String> = cooked
            .iter()
            .map(|(name, _)| name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let leaves = match repos.get_trove_leaves_by_branch(&names, branch, None) {
            Ok(leaves) => leaves,
            Err(RepositoryError::TroveMissing(_)) => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        if leaves.is_empty() {
            debug!("nothing cooked on {} yet", branch);
            return Ok(FlavorSetDiff::default());
        }

        let mut old: BTreeMap<Flavor, BTreeSet<String>> = BTreeMap::new();
        for tuple in leaves {
            old.entry(tuple.flavor).or_default().insert(tuple.name);
        }
        let mut new: BTreeMap<Flavor, BTreeSet<String>> = BTreeMap::new();
        for (name, flavor) in cooked {
            new.entry(flavor.clone()).or_default().insert(name.clone());
        }

        let diff = FlavorSetDiff::between(&old, &new);

        if diff.flavors_changed() {
            if self.context.options.error_on_flavor_change {
                return Err(Error::FlavorSetChanged(Box::new(FlavorSetChangedError {
                    branch: branch.clone(),
                    diff,
                })));
            }
            warn!("group flavors changed from the previous cook on {}:\n{}", branch, diff);
        } else if diff.names_changed() {
            warn!("group names changed from the previous cook on {}:\n{}", branch, diff);
        }

        Ok(diff)
    }
}

/// Shortened form of `full` under `keys`; the instruction set is always kept
pub fn shorten(full: &Flavor, keys: &[Flavor]) -> Flavor {
    full.filter(keys).union(&full.instruction_set())
}

/// Grow `key_flavors` until every full flavor shortens to a distinct flavor
///
/// Returns the final keys.
pub fn shorten_flavors(mut key_flavors: Vec<Flavor>, fulls: &[Flavor]) -> Result<Vec<Flavor>> {
    for round in 0..MAX_SHORTEN_ROUNDS {
        let mut by_short: BTreeMap<Flavor, Vec<&Flavor>> = BTreeMap::new();
        for full in fulls {
            by_short.entry(shorten(full, &key_flavors)).or_default().push(full);
        }

        let collisions: Vec<(Flavor, Vec<Flavor>)> = by_short
            .into_iter()
            .filter(|(_, group)| group.len() > 1)
            .map(|(short, group)| (short, group.into_iter().cloned().collect()))
            .collect();

        let Some((first_short, first_group)) = collisions.first().cloned() else {
            debug!("flavors distinct after {} shortening rounds", round);
            return Ok(key_flavors);
        };

        let before = key_flavors.len();
        for (_, group) in &collisions {
            for diff in flavor_differences(group) {
                if !diff.is_empty() && !key_flavors.contains(&diff) {
                    key_flavors.push(diff);
                }
            }
        }

        if key_flavors.len() == before {
            return Err(Error::GroupFlavorCollisionUnresolved {
                shortened: first_short,
                full: first_group,
            });
        }
    }

    // Each round adds keys, so only pathological inputs reach the cap
    let (shortened, full) = first_collision(&key_flavors, fulls).unwrap_or_default();
    Err(Error::GroupFlavorCollisionUnresolved { shortened, full })
}

fn first_collision(keys: &[Flavor], fulls: &[Flavor]) -> Option<(Flavor, Vec<Flavor>)> {
    let mut by_short: BTreeMap<Flavor, Vec<Flavor>> = BTreeMap::new();
    for full in fulls {
        by_short.entry(shorten(full, keys)).or_default().push(full.clone());
    }
    by_short.into_iter().find(|(_, group)| group.len() > 1)
}
