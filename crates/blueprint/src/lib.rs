//! Blueprint capture, transformation and incremental placement.
//!
//! A [`Blueprint`] is a palette-indexed voxel volume. It can be rotated and
//! mirrored, scanned from a live world, generated from a shape, and placed
//! back into any [`WorldAccess`] implementation a budgeted slice at a time
//! through [`BlueprintPlacementPlugin`].

pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod placement;
pub mod plugin;
pub mod requirements;
pub mod scan;
pub mod shapes;
pub mod state;
pub mod transform;

#[cfg(any(test, feature = "bench"))]
pub mod test_harness;

pub use config::PlacementConfig;
pub use error::BlueprintError;
pub use history::{ChangeHistory, ChangeSet};
pub use model::{Blueprint, Extent};
pub use placement::{PlacementJob, PlacementSettings, StrategyRegistry, WorldAccess};
pub use plugin::{BlueprintPlacementPlugin, PlaceBlueprint, PlacementFinished, RemoveBlueprint};
pub use state::{BlockKind, BlockState};
pub use transform::{Mirror, Rotation};
