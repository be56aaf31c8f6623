// src/lib.rs

//! Conary cook identity and continuity engine
//!
//! Keeps freshly cooked troves consistent with what the repository already
//! holds:
//!
//! - Stable pathIds and reused file versions across rebuilds
//! - Short, distinct flavors for multi-flavor group cooks, and a check
//!   that the set of cooked flavors has not silently changed
//! - Descriptive metadata inherited from the closest predecessor trove
//! - Transitive closure of build requirements for reproducibility
//!
//! Repository access goes through [`RepositoryClient`]; nothing here writes
//! to a repository.

pub mod config;
pub mod cook;
pub mod dependencies;
mod error;
pub mod files;
pub mod flavor;
pub mod label;
pub mod repository;
pub mod trove;
pub mod version;

pub use config::CookConfig;
pub use cook::buildreqs::BuildRequirementClosure;
pub use cook::flavors::{FlavorPlan, FlavorSetChangedError, FlavorSetDiff, FlavorSetPlanner, KeyFlavor};
pub use cook::identity::{IdentityEntry, IdentityMap, IdentityRequest, IdentityResolver};
pub use cook::metadata::{MetadataContinuityMatcher, MetadataMatch};
pub use cook::{BuildContext, GroupCookOptions};
pub use dependencies::{Dependency, DependencyClass, DependencySet};
pub use error::{Error, Result};
pub use files::{BuildFile, FileId, FileInfo, PathId};
pub use flavor::{Flavor, FlavorItem, FlavorOp};
pub use label::{Label, LabelParseError, LabelPath};
pub use repository::{MemoryRepository, RepositoryClient, RepositoryError, TroveSpec};
pub use trove::{Trove, TroveMetadata, TroveTuple};
pub use version::{Branch, Revision, Version};
