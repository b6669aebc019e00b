//! Block-state descriptors: the values a blueprint palette stores.
//!
//! A `BlockState` is a block name, a `BlockKind` classifier that placement
//! dispatches on, and an ordered property map (`facing`, `half`, `axis`,
//! ...). States know how to produce their own rotated and mirrored selves.

use std::collections::BTreeMap;

use bevy::math::IVec3;
use bitcode::{Decode, Encode};

use crate::transform::{Mirror, Rotation};

pub const FACING: &str = "facing";
pub const HALF: &str = "half";
pub const PART: &str = "part";
pub const HINGE: &str = "hinge";
pub const SHAPE: &str = "shape";
pub const AXIS: &str = "axis";
pub const ROTATION: &str = "rotation";

// =============================================================================
// BlockKind
// =============================================================================

/// Coarse classification of a block, used for strategy dispatch and world
/// equivalence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Encode, Decode)]
pub enum BlockKind {
    Air,
    /// Selection hole: never placed, dropped by transforms.
    StructureVoid,
    /// Wildcard placeholder that matches whatever the world holds.
    Substitution,
    /// Placeholder resolved to local ground material at placement time.
    SolidSubstitution,
    Fire,
    Grass,
    GrassPath,
    Dirt,
    Door,
    Bed,
    DoublePlant,
    Stairs,
    Falling,
    /// World features that cannot be authored by placement.
    NonPlaceable,
    /// Marks the placement origin of a blueprint.
    Anchor,
    Container,
    FlowerPot,
    Solid,
    NonSolid,
    Liquid,
}

impl BlockKind {
    /// Whether this kind can hold up a gravity-affected block.
    pub fn is_solid(self) -> bool {
        matches!(
            self,
            BlockKind::Solid
                | BlockKind::Container
                | BlockKind::Stairs
                | BlockKind::Falling
                | BlockKind::Dirt
                | BlockKind::Grass
                | BlockKind::GrassPath
                | BlockKind::Anchor
        )
    }

    /// Kinds that describe nothing to build.
    pub fn is_placeholder(self) -> bool {
        matches!(
            self,
            BlockKind::Air
                | BlockKind::StructureVoid
                | BlockKind::Substitution
                | BlockKind::SolidSubstitution
        )
    }
}

// =============================================================================
// Facing
// =============================================================================

/// One of the six block faces. North is -z, east is +x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Encode, Decode)]
pub enum Facing {
    North,
    East,
    South,
    West,
    Up,
    Down,
}

impl Facing {
    pub const HORIZONTAL: [Facing; 4] = [Facing::North, Facing::East, Facing::South, Facing::West];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "north" => Some(Facing::North),
            "east" => Some(Facing::East),
            "south" => Some(Facing::South),
            "west" => Some(Facing::West),
            "up" => Some(Facing::Up),
            "down" => Some(Facing::Down),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Facing::North => "north",
            Facing::East => "east",
            Facing::South => "south",
            Facing::West => "west",
            Facing::Up => "up",
            Facing::Down => "down",
        }
    }

    pub fn offset(self) -> IVec3 {
        match self {
            Facing::North => IVec3::new(0, 0, -1),
            Facing::East => IVec3::new(1, 0, 0),
            Facing::South => IVec3::new(0, 0, 1),
            Facing::West => IVec3::new(-1, 0, 0),
            Facing::Up => IVec3::Y,
            Facing::Down => IVec3::NEG_Y,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Facing::North => Facing::South,
            Facing::East => Facing::West,
            Facing::South => Facing::North,
            Facing::West => Facing::East,
            Facing::Up => Facing::Down,
            Facing::Down => Facing::Up,
        }
    }

    /// Clockwise when viewed from above. Vertical faces are unchanged.
    pub fn rotated(self, rotation: Rotation) -> Self {
        let Some(idx) = Self::HORIZONTAL.iter().position(|f| *f == self) else {
            return self;
        };
        Self::HORIZONTAL[(idx + rotation.quarter_turns() as usize) % 4]
    }

    pub fn mirrored(self, mirror: Mirror) -> Self {
        match (mirror, self) {
            (Mirror::LeftRight, Facing::North | Facing::South) => self.opposite(),
            (Mirror::FrontBack, Facing::East | Facing::West) => self.opposite(),
            _ => self,
        }
    }
}

// =============================================================================
// BlockState
// =============================================================================

/// A palette entry: block name, kind and properties.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockState {
    pub name: String,
    pub kind: BlockKind,
    pub properties: BTreeMap<String, String>,
}

impl BlockState {
    pub fn new(name: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            name: name.into(),
            kind,
            properties: BTreeMap::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn air() -> Self {
        Self::new("air", BlockKind::Air)
    }

    pub fn structure_void() -> Self {
        Self::new("structure_void", BlockKind::StructureVoid)
    }

    pub fn substitution() -> Self {
        Self::new("substitution", BlockKind::Substitution)
    }

    pub fn solid_substitution() -> Self {
        Self::new("solid_substitution", BlockKind::SolidSubstitution)
    }

    pub fn dirt() -> Self {
        Self::new("dirt", BlockKind::Dirt)
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn facing(&self) -> Option<Facing> {
        self.property(FACING).and_then(Facing::parse)
    }

    pub fn is_solid(&self) -> bool {
        self.kind.is_solid()
    }

    pub fn is_air(&self) -> bool {
        self.kind == BlockKind::Air
    }

    /// The item consumed to place this state, if any.
    pub fn item_id(&self) -> Option<String> {
        match self.kind {
            BlockKind::Air
            | BlockKind::StructureVoid
            | BlockKind::Substitution
            | BlockKind::SolidSubstitution
            | BlockKind::Fire
            | BlockKind::NonPlaceable => None,
            BlockKind::Grass | BlockKind::GrassPath => Some("dirt".to_string()),
            _ => Some(self.name.clone()),
        }
    }

    /// Upper/head halves are written by their lower/head partner.
    pub fn is_secondary_half(&self) -> bool {
        match self.kind {
            BlockKind::Door | BlockKind::DoublePlant => self.property(HALF) == Some("upper"),
            BlockKind::Bed => self.property(PART) == Some("foot"),
            _ => false,
        }
    }

    /// This state turned clockwise (viewed from above).
    pub fn rotated(&self, rotation: Rotation) -> Self {
        if rotation == Rotation::None {
            return self.clone();
        }
        let mut out = self.clone();
        if let Some(facing) = self.facing() {
            out.properties
                .insert(FACING.to_string(), facing.rotated(rotation).as_str().to_string());
        }
        if rotation.quarter_turns() % 2 == 1 {
            let swapped = match self.property(AXIS) {
                Some("x") => Some("z"),
                Some("z") => Some("x"),
                _ => None,
            };
            if let Some(axis) = swapped {
                out.properties.insert(AXIS.to_string(), axis.to_string());
            }
        }
        if let Some(r) = self.property(ROTATION).and_then(|r| r.parse::<u32>().ok()) {
            let turned = (r + 4 * rotation.quarter_turns() as u32) % 16;
            out.properties.insert(ROTATION.to_string(), turned.to_string());
        }
        out
    }

    /// This state reflected across the mirror plane. Handedness-bearing
    /// properties (door hinge, stair corner shape) swap sides.
    pub fn mirrored(&self, mirror: Mirror) -> Self {
        if mirror == Mirror::None {
            return self.clone();
        }
        let mut out = self.clone();
        if let Some(facing) = self.facing() {
            out.properties
                .insert(FACING.to_string(), facing.mirrored(mirror).as_str().to_string());
        }
        if let Some(r) = self.property(ROTATION).and_then(|r| r.parse::<u32>().ok()) {
            let flipped = match mirror {
                Mirror::LeftRight => (16 - r % 16) % 16,
                Mirror::FrontBack => (24 - r % 16) % 16,
                Mirror::None => r,
            };
            out.properties.insert(ROTATION.to_string(), flipped.to_string());
        }
        let hinge = match self.property(HINGE) {
            Some("left") => Some("right"),
            Some("right") => Some("left"),
            _ => None,
        };
        if let Some(hinge) = hinge {
            out.properties.insert(HINGE.to_string(), hinge.to_string());
        }
        if let Some(shape) = self.property(SHAPE) {
            let swapped = if shape.ends_with("_left") {
                Some(shape.replace("_left", "_right"))
            } else if shape.ends_with("_right") {
                Some(shape.replace("_right", "_left"))
            } else {
                None
            };
            if let Some(shape) = swapped {
                out.properties.insert(SHAPE.to_string(), shape);
            }
        }
        out
    }

    /// Same block and facing, ignoring neighbour-derived properties.
    pub fn same_orientation(&self, other: &BlockState) -> bool {
        self.name == other.name
            && self.facing() == other.facing()
            && self.property(HALF) == other.property(HALF)
    }
}

// =============================================================================
// Equivalence
// =============================================================================

/// Whether a world block satisfies the blueprint's `expected` state.
///
/// With `fancy` off only exact equality counts. With it on, wildcards match
/// anything, solid wildcards match any solid block, doors and flower pots
/// compare by name, and grass and dirt are interchangeable.
pub fn states_match(expected: &BlockState, actual: &BlockState, fancy: bool) -> bool {
    if expected == actual {
        return true;
    }
    if !fancy {
        return false;
    }
    match expected.kind {
        BlockKind::Substitution => true,
        BlockKind::SolidSubstitution => actual.is_solid(),
        BlockKind::Door | BlockKind::FlowerPot => expected.name == actual.name,
        BlockKind::Grass | BlockKind::Dirt => {
            matches!(actual.kind, BlockKind::Grass | BlockKind::Dirt)
        }
        _ => false,
    }
}
