// src/cook/buildreqs.rs

//! Transitive closure of build requirements
//!
//! Starting from the troves that satisfied a recipe's build requirements,
//! follows trove-level `requires` until nothing new turns up. The closure
//! is recorded on the built troves so a build can be reproduced. ABI
//! requirements are implicit and never followed.

use super::BuildContext;
use crate::dependencies::{DependencyClass, DependencySet};
use crate::error::Result;
use crate::flavor::Flavor;
use crate::repository::RepositoryClient;
use crate::trove::TroveTuple;
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Keep only the providers matching the earliest usable flavor-path entry
///
/// When no flavor-path entry is compatible with any provider, every
/// provider is kept.
pub fn restrict_to_flavor_path(candidates: Vec<TroveTuple>, flavor_path: &[Flavor]) -> Vec<TroveTuple> {
    for preferred in flavor_path {
        if candidates.iter().any(|c| preferred.satisfies(&c.flavor)) {
            return candidates
                .into_iter()
                .filter(|c| preferred.satisfies(&c.flavor))
                .collect();
        }
    }
    candidates
}

/// Expands build requirements to their transitive closure
pub struct BuildRequirementClosure<'a> {
    repos: &'a dyn RepositoryClient,
    flavor_path: &'a [Flavor],
}

impl<'a> BuildRequirementClosure<'a> {
    pub fn new(repos: &'a dyn RepositoryClient, context: &'a BuildContext) -> Self {
        Self {
            repos,
            flavor_path: &context.flavor_path,
        }
    }

    /// Close `seed` under `requires`
    ///
    /// The result contains the seed itself. Any repository failure aborts
    /// the closure.
    pub fn close(&self, seed: impl IntoIterator<Item = TroveTuple>) -> Result<BTreeSet<TroveTuple>> {
        let mut seen: BTreeSet<TroveTuple> = seed.into_iter().collect();
        let mut frontier: Vec<TroveTuple> = seen.iter().cloned().collect();
        let mut rounds = 0;

        while !frontier.is_empty() {
            rounds += 1;
            let troves = self.repos.get_troves(&frontier, false)?;

            let mut requires = DependencySet::new();
            for trove in &troves {
                requires.union(&trove.requires.without_class(DependencyClass::Abi));
            }
            trace!(round = rounds, deps = requires.len(), "resolving build requirements");

            frontier = Vec::new();
            if requires.is_empty() {
                break;
            }

            let solutions = self.repos.get_troves_with_provides(&requires)?;
            for (dep, providers) in solutions {
                if providers.is_empty() {
                    debug!("no provider for {}", dep);
                    continue;
                }
                for provider in restrict_to_flavor_path(providers, self.flavor_path) {
                    if seen.insert(provider.clone()) {
                        frontier.push(provider);
                    }
                }
            }
        }

        debug!("build requirement closure: {} troves in {} rounds", seen.len(), rounds);
        Ok(seen)
    }
}
