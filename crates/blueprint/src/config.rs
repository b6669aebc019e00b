//! Placement tuning: compile-time defaults plus the runtime `PlacementConfig`
//! resource, which can be loaded from JSON.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::BlueprintError;

// =============================================================================
// Constants
// =============================================================================

/// Cells a placement job may examine in one fixed tick.
pub const DEFAULT_CELLS_PER_TICK: usize = 1000;

/// Completed change sets kept for undo before the oldest is evicted.
pub const MAX_CACHED_CHANGES: usize = 10;

/// Largest region (in cells) the scanner will copy into a blueprint.
pub const MAX_SCAN_VOLUME: u64 = 100_000;

// =============================================================================
// Resources
// =============================================================================

/// Runtime placement settings.
#[derive(
    Resource, Debug, Clone, PartialEq, Serialize, Deserialize, bitcode::Encode, bitcode::Decode,
)]
#[serde(default)]
pub struct PlacementConfig {
    /// Budget of cells examined per tick, shared by scanning and placing.
    pub cells_per_tick: usize,
    /// Undo history depth.
    pub max_cached_changes: usize,
    /// Lenient world comparison: wildcards, door halves and grass/dirt
    /// count as already placed.
    pub fancy_placement: bool,
    /// Write placeholders literally instead of resolving or skipping them.
    pub complete_placement: bool,
    /// Upper bound for `scan_region`, applied through `ScanOptions::from_config`.
    pub max_scan_volume: u64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            cells_per_tick: DEFAULT_CELLS_PER_TICK,
            max_cached_changes: MAX_CACHED_CHANGES,
            fancy_placement: true,
            complete_placement: false,
            max_scan_volume: MAX_SCAN_VOLUME,
        }
    }
}

impl PlacementConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, BlueprintError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BlueprintError> {
        if self.cells_per_tick == 0 {
            return Err(BlueprintError::Config(
                "cells_per_tick must be at least 1".to_string(),
            ));
        }
        if self.max_scan_volume == 0 {
            return Err(BlueprintError::Config(
                "max_scan_volume must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlacementConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cells_per_tick, DEFAULT_CELLS_PER_TICK);
        assert!(config.fancy_placement);
    }

    #[test]
    fn test_from_json_partial_fills_defaults() {
        let config = PlacementConfig::from_json(r#"{ "cells_per_tick": 64 }"#).unwrap();
        assert_eq!(config.cells_per_tick, 64);
        assert_eq!(config.max_cached_changes, MAX_CACHED_CHANGES);
        assert_eq!(config.max_scan_volume, MAX_SCAN_VOLUME);
    }

    #[test]
    fn test_from_json_rejects_zero_budget() {
        let err = PlacementConfig::from_json(r#"{ "cells_per_tick": 0 }"#).unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("cells_per_tick"), "got: {msg}");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = PlacementConfig::from_json("{ cells_per_tick").unwrap_err();
        assert!(matches!(err, BlueprintError::Config(_)));
    }

    #[test]
    fn test_config_bitcode_roundtrip() {
        let config = PlacementConfig {
            cells_per_tick: 7,
            complete_placement: true,
            ..Default::default()
        };
        let bytes = bitcode::encode(&config);
        let decoded: PlacementConfig = bitcode::decode(&bytes).unwrap();
        assert_eq!(decoded, config);
    }
}
