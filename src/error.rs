// src/error.rs

//! Error types shared across the cook continuity engine

use crate::cook::flavors::FlavorSetChangedError;
use crate::flavor::Flavor;
use crate::repository::RepositoryError;
use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the cook continuity engine
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed label, version, flavor or dependency string
    #[error("parse error: {0}")]
    ParseError(String),

    /// A repository query failed and the caller has no safe fallback
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// The set of group flavors differs from the previous cook
    #[error(transparent)]
    FlavorSetChanged(#[from] Box<FlavorSetChangedError>),

    /// Flavor shortening could not tell two builds apart
    #[error(
        "unable to distinguish group flavors: {} all shorten to {shortened}",
        format_flavor_list(.full)
    )]
    GroupFlavorCollisionUnresolved {
        /// The shortened flavor shared by the colliding builds
        shortened: Flavor,
        /// Full flavors of the colliding builds
        full: Vec<Flavor>,
    },
}

fn format_flavor_list(flavors: &[Flavor]) -> String {
    flavors
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
