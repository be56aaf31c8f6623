// src/cook/metadata.rs

//! Metadata continuity across rebuilds and shadows
//!
//! Descriptive metadata (descriptions, url, licenses, categories) is not
//! regenerated by a cook. Instead each new trove inherits it from the best
//! predecessor found along its branch's label ancestry, closest label
//! first, so metadata follows a trove across shadows and rebuilds.

use super::BuildContext;
use crate::flavor::Flavor;
use crate::label::LabelPath;
use crate::repository::{RepositoryClient, TroveSpec};
use crate::trove::{MetadataItem, Trove, TroveMetadata, TroveTuple};
use crate::version::{Branch, Version};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use strum::IntoEnumIterator;
use tracing::{debug, warn};

/// One new trove and the predecessor it inherits metadata from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedTrove {
    pub new: TroveTuple,
    pub old: TroveTuple,
}

/// `new trove -> predecessor trove` for one cook invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<MatchedTrove>", into = "Vec<MatchedTrove>")]
pub struct MetadataMatch {
    matches: BTreeMap<TroveTuple, TroveTuple>,
}

impl MetadataMatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, new: &TroveTuple) -> Option<&TroveTuple> {
        self.matches.get(new)
    }

    pub fn insert(&mut self, new: TroveTuple, old: TroveTuple) {
        self.matches.insert(new, old);
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TroveTuple, &TroveTuple)> {
        self.matches.iter()
    }

    pub fn extend(&mut self, other: MetadataMatch) {
        self.matches.extend(other.matches);
    }
}

impl From<Vec<MatchedTrove>> for MetadataMatch {
    fn from(list: Vec<MatchedTrove>) -> Self {
        Self {
            matches: list.into_iter().map(|m| (m.new, m.old)).collect(),
        }
    }
}

impl From<MetadataMatch> for Vec<MatchedTrove> {
    fn from(matches: MetadataMatch) -> Self {
        matches
            .matches
            .into_iter()
            .map(|(new, old)| MatchedTrove { new, old })
            .collect()
    }
}

/// Label search path for metadata: the branch's labels, closest first
pub fn metadata_label_path(branch: &Branch) -> LabelPath {
    branch.iter_labels().rev().cloned().collect()
}

/// Flavors in string order, the order ties and fallbacks are decided in
fn in_string_order(flavors: &BTreeSet<Flavor>) -> Vec<&Flavor> {
    let mut ordered: Vec<&Flavor> = flavors.iter().collect();
    ordered.sort_by_cached_key(|f| f.to_string());
    ordered
}

/// Pick the predecessor of `desired` among `candidates` (version -> flavors)
///
/// `candidates` must not contain `desired` itself.
pub fn select_match(
    desired: &TroveTuple,
    candidates: &BTreeMap<Version, BTreeSet<Flavor>>,
) -> Option<TroveTuple> {
    let newest_first: Vec<(&Version, &BTreeSet<Flavor>)> = candidates
        .iter()
        .rev()
        .filter(|(_, flavors)| !flavors.is_empty())
        .collect();
    let (newest, newest_flavors) = *newest_first.first()?;

    // A new flavor at an already-cooked version also looks one version back
    let checked = if *newest == desired.version {
        &newest_first[..newest_first.len().min(2)]
    } else {
        &newest_first[..1]
    };

    let tuple = |version: &Version, flavor: &Flavor| {
        TroveTuple::new(desired.name.clone(), version.clone(), flavor.clone())
    };

    for (version, flavors) in checked {
        if flavors.contains(&desired.flavor) {
            return Some(tuple(*version, &desired.flavor));
        }
    }

    for (version, flavors) in checked {
        let mut best: Option<(i32, &Flavor)> = None;
        for flavor in in_string_order(flavors) {
            let score = flavor.score(&desired.flavor).max(desired.flavor.score(flavor));
            if let Some(score) = score {
                if best.is_none_or(|(top, _)| score > top) {
                    best = Some((score, flavor));
                }
            }
        }
        if let Some((_, flavor)) = best {
            return Some(tuple(*version, flavor));
        }
    }

    let fallback = in_string_order(newest_flavors).into_iter().next()?;
    Some(tuple(newest, fallback))
}

/// Copy metadata forward from a predecessor
///
/// Items in `skip` are never copied; items set in `explicit` (the recipe's
/// own directives) are applied last and always win.
pub fn copy_metadata(
    target: &mut TroveMetadata,
    old: &TroveMetadata,
    skip: &BTreeSet<MetadataItem>,
    explicit: &TroveMetadata,
) {
    for item in MetadataItem::iter() {
        if !skip.contains(&item) && old.is_set(item) {
            target.copy_item(old, item);
        }
    }
    for item in MetadataItem::iter() {
        if explicit.is_set(item) {
            target.copy_item(explicit, item);
        }
    }
}

/// Finds predecessor troves to inherit metadata from
pub struct MetadataContinuityMatcher<'a> {
    repos: &'a dyn RepositoryClient,
}

impl<'a> MetadataContinuityMatcher<'a> {
    pub fn new(repos: &'a dyn RepositoryClient) -> Self {
        Self { repos }
    }

    /// Best predecessor for each desired tuple
    ///
    /// Tuples with no predecessor are left out. Repository failures are
    /// logged and yield no matches.
    pub fn find_matches(&self, desired: &[TroveTuple]) -> MetadataMatch {
        let mut result = MetadataMatch::new();

        let mut by_branch: BTreeMap<&Branch, Vec<&TroveTuple>> = BTreeMap::new();
        for tuple in desired {
            by_branch.entry(tuple.version.branch()).or_default().push(tuple);
        }

        for (branch, wanted) in by_branch {
            let label_path = metadata_label_path(branch);
            let specs: Vec<TroveSpec> = wanted
                .iter()
                .map(|t| t.name.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(TroveSpec::any)
                .collect();

            let found = match self.repos.find_troves(&label_path, &specs) {
                Ok(found) => found,
                Err(err) => {
                    warn!("metadata lookup on {} skipped: {}", label_path, err);
                    continue;
                }
            };

            for tuple in wanted {
                let mut candidates: BTreeMap<Version, BTreeSet<Flavor>> = BTreeMap::new();
                for t in found.iter().filter(|t| t.name == tuple.name && *t != tuple) {
                    candidates
                        .entry(t.version.clone())
                        .or_default()
                        .insert(t.flavor.clone());
                }

                match select_match(tuple, &candidates) {
                    Some(old) => {
                        debug!("metadata for {} comes from {}", tuple, old);
                        result.insert(tuple.clone(), old);
                    }
                    None => debug!("no metadata predecessor for {}", tuple),
                }
            }
        }

        result
    }

    /// Match new top-level troves and their components
    ///
    /// Components present in both the new package and its predecessor map
    /// straight onto the predecessor's component. Components new to this
    /// build are matched on their own.
    pub fn match_troves(&self, new_troves: &[Trove]) -> MetadataMatch {
        let top_level: Vec<TroveTuple> = new_troves
            .iter()
            .filter(|t| !t.is_component())
            .map(|t| t.tuple().clone())
            .collect();
        let mut result = self.find_matches(&top_level);

        let old_tuples: Vec<TroveTuple> = result.iter().map(|(_, old)| old.clone()).collect();
        let old_troves: BTreeMap<TroveTuple, Trove> = if old_tuples.is_empty() {
            BTreeMap::new()
        } else {
            match self.repos.get_troves(&old_tuples, false) {
                Ok(troves) => troves.into_iter().map(|t| (t.tuple().clone(), t)).collect(),
                Err(err) => {
                    warn!("could not fetch metadata predecessors: {}", err);
                    BTreeMap::new()
                }
            }
        };

        let mut unmatched: Vec<TroveTuple> = Vec::new();
        for trove in new_troves.iter().filter(|t| !t.is_component()) {
            let old = result
                .get(trove.tuple())
                .and_then(|old| old_troves.get(old));

            let old_components: BTreeMap<&str, &TroveTuple> = old
                .map(|o| o.troves().map(|c| (c.name.as_str(), c)).collect())
                .unwrap_or_default();

            for component in trove.troves() {
                match old_components.get(component.name.as_str()) {
                    Some(old_component) => {
                        result.insert(component.clone(), (*old_component).clone())
                    }
                    None => unmatched.push(component.clone()),
                }
            }
        }

        if !unmatched.is_empty() {
            debug!("matching {} new components separately", unmatched.len());
            result.extend(self.find_matches(&unmatched));
        }

        result
    }

    /// Copy metadata into `troves` from their matched predecessors
    ///
    /// Returns the number of troves that received metadata.
    pub fn copy_forward(
        &self,
        troves: &mut [Trove],
        matches: &MetadataMatch,
        context: &BuildContext,
    ) -> usize {
        let wanted: Vec<TroveTuple> = troves
            .iter()
            .filter_map(|t| matches.get(t.tuple()).cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if wanted.is_empty() {
            return 0;
        }

        let old: BTreeMap<TroveTuple, TroveMetadata> = match self.repos.get_troves(&wanted, false) {
            Ok(found) => found
                .into_iter()
                .map(|t| (t.tuple().clone(), t.metadata))
                .collect(),
            Err(err) => {
                warn!("metadata copy skipped: {}", err);
                return 0;
            }
        };

        let mut copied = 0;
        for trove in troves.iter_mut() {
            let Some(old_metadata) = matches.get(trove.tuple()).and_then(|o| old.get(o)) else {
                continue;
            };
            let explicit = trove.metadata.clone();
            copy_metadata(
                &mut trove.metadata,
                old_metadata,
                &context.metadata_skip,
                &explicit,
            );
            copied += 1;
        }
        copied
    }
}
