//! Value types carried by a blueprint: volume extents, side payloads, loose
//! entities and the cell snapshots handed out by the derived views.

use std::collections::BTreeMap;

use bevy::math::{DVec3, IVec3};
use bitcode::{Decode, Encode};

use crate::state::{BlockState, Facing};

// =============================================================================
// Extent
// =============================================================================

/// Blueprint dimensions. Each axis fits in 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Encode, Decode)]
pub struct Extent {
    pub x: u16,
    pub y: u16,
    pub z: u16,
}

impl Extent {
    pub const fn new(x: u16, y: u16, z: u16) -> Self {
        Self { x, y, z }
    }

    pub fn volume(self) -> usize {
        self.x as usize * self.y as usize * self.z as usize
    }

    pub fn is_empty(self) -> bool {
        self.volume() == 0
    }

    pub fn as_ivec3(self) -> IVec3 {
        IVec3::new(self.x as i32, self.y as i32, self.z as i32)
    }

    pub fn contains(self, pos: IVec3) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.z >= 0
            && pos.x < self.x as i32
            && pos.y < self.y as i32
            && pos.z < self.z as i32
    }

    /// Flat index into a `(y, z, x)` grid.
    pub fn index(self, pos: IVec3) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        let (x, y, z) = (pos.x as usize, pos.y as usize, pos.z as usize);
        Some((y * self.z as usize + z) * self.x as usize + x)
    }

    /// Inverse of [`Extent::index`]. `index` must be below `volume()`.
    pub fn position(self, index: usize) -> IVec3 {
        let sx = self.x as usize;
        let sz = self.z as usize;
        let x = index % sx;
        let z = (index / sx) % sz;
        let y = index / (sx * sz);
        IVec3::new(x as i32, y as i32, z as i32)
    }

    /// Every position in raster order: x fastest, then z, then y.
    pub fn positions(self) -> impl Iterator<Item = IVec3> {
        (0..self.volume()).map(move |i| self.position(i))
    }
}

// =============================================================================
// Side payloads
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemStack {
    pub item: String,
    pub count: u32,
}

/// A position inside the blueprint carrying free-form tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaggedPosition {
    pub pos: IVec3,
    pub tags: Vec<String>,
}

/// Tagged sub-region markers. Positions are offsets relative to the cell
/// that owns the payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RegionTags {
    pub tagged: Vec<TaggedPosition>,
    pub corner_one: Option<IVec3>,
    pub corner_two: Option<IVec3>,
}

/// Structured per-cell data beyond the block state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SidePayload {
    /// Payload type, e.g. `chest` or `sign`.
    pub kind: String,
    /// Orientation data re-applied when the payload is replayed.
    pub facing: Option<Facing>,
    /// Container contents.
    pub items: Vec<ItemStack>,
    pub region: Option<RegionTags>,
    pub extra: BTreeMap<String, String>,
}

impl SidePayload {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Apply `f` to every coordinate embedded in the region markers.
    pub fn map_positions(&mut self, f: impl Fn(IVec3) -> IVec3) {
        let Some(region) = self.region.as_mut() else {
            return;
        };
        for tagged in &mut region.tagged {
            tagged.pos = f(tagged.pos);
        }
        region.corner_one = region.corner_one.map(&f);
        region.corner_two = region.corner_two.map(&f);
    }
}

// =============================================================================
// Loose entities
// =============================================================================

/// Entity kinds a blueprint knows how to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Mob,
    ItemFrame,
    Painting,
    ArmorStand,
    Minecart,
    DroppedItem,
}

impl EntityKind {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(EntityKind::Mob),
            1 => Some(EntityKind::ItemFrame),
            2 => Some(EntityKind::Painting),
            3 => Some(EntityKind::ArmorStand),
            4 => Some(EntityKind::Minecart),
            5 => Some(EntityKind::DroppedItem),
            _ => None,
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            EntityKind::Mob => 0,
            EntityKind::ItemFrame => 1,
            EntityKind::Painting => 2,
            EntityKind::ArmorStand => 3,
            EntityKind::Minecart => 4,
            EntityKind::DroppedItem => 5,
        }
    }

    /// Item consumed to spawn this entity during placement.
    pub fn item_id(self) -> Option<&'static str> {
        match self {
            EntityKind::ItemFrame => Some("item_frame"),
            EntityKind::Painting => Some("painting"),
            EntityKind::ArmorStand => Some("armor_stand"),
            EntityKind::Minecart => Some("minecart"),
            EntityKind::Mob | EntityKind::DroppedItem => None,
        }
    }

    /// Non-essential objects are evicted when a cell is cleared.
    pub fn is_essential(self) -> bool {
        !matches!(self, EntityKind::DroppedItem)
    }
}

/// An entity payload with a continuous position in blueprint space.
#[derive(Debug, Clone, PartialEq)]
pub struct LooseEntity {
    pub type_id: String,
    /// Raw kind tag; unknown tags mark payloads that cannot be decoded.
    pub kind_tag: u8,
    pub position: DVec3,
    /// Degrees, 0 facing south, increasing clockwise from above.
    pub yaw: f32,
    pub pitch: f32,
    pub data: BTreeMap<String, String>,
}

impl LooseEntity {
    pub fn new(type_id: impl Into<String>, kind: EntityKind, position: DVec3) -> Self {
        Self {
            type_id: type_id.into(),
            kind_tag: kind.tag(),
            position,
            yaw: 0.0,
            pitch: 0.0,
            data: BTreeMap::new(),
        }
    }

    pub fn kind(&self) -> Option<EntityKind> {
        EntityKind::from_tag(self.kind_tag)
    }

    /// The grid cell this entity sits in.
    pub fn cell(&self) -> IVec3 {
        self.position.floor().as_ivec3()
    }
}

// =============================================================================
// Metadata
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlueprintMeta {
    pub name: String,
    pub authors: Vec<String>,
    /// Order-significant.
    pub required_capabilities: Vec<String>,
    pub missing_capabilities: Vec<String>,
}

// =============================================================================
// Cell snapshots
// =============================================================================

/// One cell of a blueprint. Immutable snapshot, safe to pass by value.
#[derive(Debug, Clone, PartialEq)]
pub struct CellInfo {
    pub pos: IVec3,
    pub state: BlockState,
    pub payload: Option<SidePayload>,
}

/// A cell plus the loose entities sitting in it.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionInfo {
    pub cell: CellInfo,
    pub entities: Vec<LooseEntity>,
}
