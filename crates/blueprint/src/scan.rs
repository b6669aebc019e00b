//! Capture a box of the live world into a new blueprint.

use bevy::math::IVec3;

use crate::config::{PlacementConfig, MAX_SCAN_VOLUME};
use crate::error::BlueprintError;
use crate::model::{Blueprint, Extent};
use crate::placement::WorldAccess;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    pub name: String,
    /// Also copy loose entities inside the region.
    pub include_entities: bool,
    pub max_volume: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            include_entities: false,
            max_volume: MAX_SCAN_VOLUME,
        }
    }
}

impl ScanOptions {
    /// Defaults with the volume limit taken from `config`.
    pub fn from_config(config: &PlacementConfig) -> Self {
        Self {
            max_volume: config.max_scan_volume,
            ..Default::default()
        }
    }
}

/// Copy the box spanned by `corner_a` and `corner_b` (inclusive, any
/// order) into a blueprint.
///
/// Payloads are copied unchanged since their region markers are already
/// offsets from the owning cell. Entity positions become relative to the
/// region's minimum corner. `anchor` is a world position inside the box
/// that becomes the blueprint's placement origin when it holds no anchor
/// block of its own.
pub fn scan_region<W: WorldAccess + ?Sized>(
    world: &W,
    corner_a: IVec3,
    corner_b: IVec3,
    anchor: Option<IVec3>,
    options: &ScanOptions,
) -> Result<Blueprint, BlueprintError> {
    let min = corner_a.min(corner_b);
    let max = corner_a.max(corner_b);
    let span = max.as_i64vec3() - min.as_i64vec3() + 1;
    let volume = (span.x as u64)
        .saturating_mul(span.y as u64)
        .saturating_mul(span.z as u64);
    let limit = u16::MAX as i64;
    if volume > options.max_volume || span.x > limit || span.y > limit || span.z > limit {
        return Err(BlueprintError::VolumeTooLarge {
            volume,
            max: options.max_volume,
        });
    }
    if let Some(anchor) = anchor {
        if anchor.cmplt(min).any() || anchor.cmpgt(max).any() {
            return Err(BlueprintError::AnchorOutsideRegion { anchor });
        }
    }

    let size = Extent::new(span.x as u16, span.y as u16, span.z as u16);
    let mut bp = Blueprint::new(size).with_name(options.name.clone());
    let mut entities = Vec::new();
    for local in size.positions() {
        let pos = min + local;
        bp.set_cell(local, world.block_state(pos))?;
        if let Some(payload) = world.payload(pos) {
            bp.set_payload(local, Some(payload))?;
        }
        if options.include_entities {
            for mut entity in world.entities_in(pos) {
                entity.position -= min.as_dvec3();
                entities.push(entity);
            }
        }
    }
    bp.set_entities(entities);
    if let Some(anchor) = anchor {
        bp.set_anchor_hint(anchor - min);
    }
    Ok(bp)
}
