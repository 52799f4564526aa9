//! Installation ordering for devcontainer features.
//!
//! Features declare soft dependencies through `installsAfter`. This crate
//! turns a set of resolved features into a deterministic install sequence
//! using petgraph:
//!
//! - References resolve by id, then legacy id, then current id
//! - References to features that were not requested are ignored
//! - Ties are broken alphabetically on the user's identifier
//! - Cycles are reported with every feature that could not be ordered
//!
//! # Example
//!
//! ```ignore
//! use devfeat_feature_graph::{Feature, FeatureSet, compute_installation_order};
//!
//! let sets = vec![
//!     FeatureSet::local("node", vec![Feature::new("node").installs_after(["common"])]),
//!     FeatureSet::local("common", vec![Feature::new("common")]),
//! ];
//! let order = compute_installation_order(sets)?;
//! assert_eq!(order[0].user_feature_id(), "common");
//! ```

mod error;
mod graph;
mod model;
mod order;

pub use error::{Error, Result};
pub use graph::FeatureGraph;
pub use model::{Feature, FeatureSet, SourceInformation};
pub use order::{compute_feature_installation_order, compute_installation_order};
