// ---------------------------------------------------------------------------
// BlueprintError: failures raised by the model, transform and placement code
// ---------------------------------------------------------------------------

use std::fmt;

use bevy::math::IVec3;

use crate::model::Extent;
use crate::state::BlockKind;

/// Errors produced while building, scanning or placing a blueprint.
#[derive(Debug, Clone, PartialEq)]
pub enum BlueprintError {
    /// A local position lies outside the blueprint volume.
    OutOfBounds { pos: IVec3, size: Extent },
    /// A strategy was handed a block kind it does not handle. Only reachable
    /// through a miswired registry.
    StrategyMismatch {
        strategy: &'static str,
        kind: BlockKind,
    },
    /// A region is larger than the configured scan limit.
    VolumeTooLarge { volume: u64, max: u64 },
    /// The requested anchor does not lie inside the scanned region.
    AnchorOutsideRegion { anchor: IVec3 },
    /// More distinct block states than a 16-bit palette index can address.
    PaletteFull,
    /// Raw parts do not describe a consistent blueprint.
    Malformed(String),
    /// Shape generation was asked for a degenerate shape.
    InvalidShape(String),
    /// Configuration could not be parsed or failed validation.
    Config(String),
}

impl fmt::Display for BlueprintError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlueprintError::OutOfBounds { pos, size } => write!(
                f,
                "Position {pos} is outside the blueprint volume {}x{}x{}",
                size.x, size.y, size.z
            ),
            BlueprintError::StrategyMismatch { strategy, kind } => {
                write!(f, "Strategy '{strategy}' cannot place a {kind:?} block")
            }
            BlueprintError::VolumeTooLarge { volume, max } => write!(
                f,
                "Region volume {volume} exceeds the maximum of {max} cells"
            ),
            BlueprintError::AnchorOutsideRegion { anchor } => {
                write!(f, "Anchor {anchor} is outside the scanned region")
            }
            BlueprintError::PaletteFull => write!(f, "Palette is full (65536 states)"),
            BlueprintError::Malformed(msg) => write!(f, "Malformed blueprint: {msg}"),
            BlueprintError::InvalidShape(msg) => write!(f, "Invalid shape: {msg}"),
            BlueprintError::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for BlueprintError {}

impl From<serde_json::Error> for BlueprintError {
    fn from(e: serde_json::Error) -> Self {
        BlueprintError::Config(e.to_string())
    }
}
