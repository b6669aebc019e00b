//! Rotation and mirroring of whole blueprints.
//!
//! Every coordinate a blueprint carries (grid cells, region markers inside
//! side payloads, loose entity positions, the anchor) goes through
//! `transform_coords`. Grid coordinates flip as `v -> -v`; continuous
//! entity coordinates are cell-relative and flip as `v -> 1 - v`, so both
//! land in the same cell after translation.

use bevy::log::warn;
use bevy::math::{DVec3, IVec3};
use bitcode::{Decode, Encode};

use crate::model::{Blueprint, Extent, LooseEntity};
use crate::state::{BlockKind, BlockState};

// =============================================================================
// Rotation / Mirror
// =============================================================================

/// Clockwise rotation around the vertical axis, viewed from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Encode, Decode)]
pub enum Rotation {
    #[default]
    None,
    Clockwise90,
    Clockwise180,
    CounterClockwise90,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Clockwise90,
        Rotation::Clockwise180,
        Rotation::CounterClockwise90,
    ];

    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 1,
            Rotation::Clockwise180 => 2,
            Rotation::CounterClockwise90 => 3,
        }
    }

    pub fn from_quarter_turns(turns: u8) -> Self {
        Self::ALL[(turns % 4) as usize]
    }

    pub fn inverse(self) -> Self {
        Self::from_quarter_turns(4 - self.quarter_turns())
    }

    /// `self` followed by `next`.
    pub fn then(self, next: Rotation) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + next.quarter_turns())
    }
}

/// Reflection applied before rotation. `LeftRight` negates z, `FrontBack`
/// negates x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Encode, Decode)]
pub enum Mirror {
    #[default]
    None,
    LeftRight,
    FrontBack,
}

// =============================================================================
// Coordinate transform
// =============================================================================

trait Axis: Copy {
    fn flip(self) -> Self;
}

impl Axis for i32 {
    fn flip(self) -> Self {
        -self
    }
}

impl Axis for f64 {
    fn flip(self) -> Self {
        1.0 - self
    }
}

/// Mirror first, then rotate. The only place the transform matrix lives.
fn transform_coords<T: Axis>([x, y, z]: [T; 3], rotation: Rotation, mirror: Mirror) -> [T; 3] {
    let (x, z) = match mirror {
        Mirror::None => (x, z),
        Mirror::LeftRight => (x, z.flip()),
        Mirror::FrontBack => (x.flip(), z),
    };
    match rotation {
        Rotation::None => [x, y, z],
        Rotation::Clockwise90 => [z.flip(), y, x],
        Rotation::Clockwise180 => [x.flip(), y, z.flip()],
        Rotation::CounterClockwise90 => [z, y, x.flip()],
    }
}

/// Transform a grid offset without translation.
pub fn transform_pos(pos: IVec3, rotation: Rotation, mirror: Mirror) -> IVec3 {
    let [x, y, z] = transform_coords([pos.x, pos.y, pos.z], rotation, mirror);
    IVec3::new(x, y, z)
}

/// Transform a continuous blueprint-space point without translation.
pub fn transform_point(point: DVec3, rotation: Rotation, mirror: Mirror) -> DVec3 {
    let [x, y, z] = transform_coords([point.x, point.y, point.z], rotation, mirror);
    DVec3::new(x, y, z)
}

pub fn transformed_size(size: Extent, rotation: Rotation) -> Extent {
    if rotation.quarter_turns() % 2 == 1 {
        Extent::new(size.z, size.y, size.x)
    } else {
        size
    }
}

/// Shift that moves every transformed cell back into `[0, new_size)`.
pub fn translation(size: Extent, rotation: Rotation, mirror: Mirror) -> IVec3 {
    fn shift(extreme: i32) -> i32 {
        if extreme < 0 {
            -extreme - 1
        } else {
            0
        }
    }
    let extreme = transform_pos(size.as_ivec3(), rotation, mirror);
    IVec3::new(shift(extreme.x), shift(extreme.y), shift(extreme.z))
}

/// Net yaw change: reflect the heading across the mirror plane, then turn
/// it by the rotation. Yaw 0 faces south (+z) and grows clockwise.
pub fn transform_yaw(yaw: f32, rotation: Rotation, mirror: Mirror) -> f32 {
    let mirrored = match mirror {
        Mirror::None => yaw,
        Mirror::LeftRight => 180.0 - yaw,
        Mirror::FrontBack => -yaw,
    };
    (mirrored + 90.0 * rotation.quarter_turns() as f32).rem_euclid(360.0)
}

// =============================================================================
// Whole-blueprint transform
// =============================================================================

/// Result of [`transform`].
#[derive(Debug, Clone)]
pub struct Transformed {
    pub blueprint: Blueprint,
    /// Entities whose payload could not be decoded. They are not part of
    /// `blueprint`.
    pub dropped_entities: Vec<LooseEntity>,
}

/// Produce a rotated and mirrored copy of `model`.
///
/// Palette indices are preserved; only the states behind them change.
/// Structure-void cells are not carried over: their destination keeps the
/// void fill. Region markers inside payloads are local offsets and are not
/// translated.
pub fn transform(model: &Blueprint, rotation: Rotation, mirror: Mirror) -> Transformed {
    if rotation == Rotation::None && mirror == Mirror::None {
        return Transformed {
            blueprint: model.clone(),
            dropped_entities: Vec::new(),
        };
    }

    let size = model.size();
    let new_size = transformed_size(size, rotation);
    let offset = translation(size, rotation, mirror);

    let palette: Vec<BlockState> = model
        .palette()
        .iter()
        .map(|s| s.mirrored(mirror).rotated(rotation))
        .collect();
    let fill = model
        .palette()
        .iter()
        .position(|s| s.kind == BlockKind::StructureVoid)
        .unwrap_or(0) as u16;

    let volume = size.volume();
    let mut cells = vec![fill; volume];
    let mut payloads = vec![None; volume];
    for (i, pos) in size.positions().enumerate() {
        let palette_idx = model.cell_indices()[i];
        if palette[palette_idx as usize].kind == BlockKind::StructureVoid {
            continue;
        }
        let Some(dst) = new_size.index(transform_pos(pos, rotation, mirror) + offset) else {
            continue;
        };
        cells[dst] = palette_idx;
        if let Some(payload) = &model.payload_grid()[i] {
            let mut payload = payload.clone();
            payload.map_positions(|p| transform_pos(p, rotation, mirror));
            payloads[dst] = Some(payload);
        }
    }

    let mut entities = Vec::with_capacity(model.entities().len());
    let mut dropped_entities = Vec::new();
    for entity in model.entities() {
        if entity.kind().is_none() {
            warn!(
                "Dropping entity '{}' with unknown kind tag {} from blueprint '{}' during transform",
                entity.type_id,
                entity.kind_tag,
                model.name()
            );
            dropped_entities.push(entity.clone());
            continue;
        }
        let mut moved = entity.clone();
        moved.position = transform_point(entity.position, rotation, mirror) + offset.as_dvec3();
        moved.yaw = transform_yaw(entity.yaw, rotation, mirror);
        entities.push(moved);
    }

    let mut blueprint = Blueprint::from_raw(
        new_size,
        palette,
        cells,
        payloads,
        entities,
        model.meta().clone(),
    );
    blueprint.set_anchor_hint(transform_pos(model.anchor(), rotation, mirror) + offset);

    Transformed {
        blueprint,
        dropped_entities,
    }
}
