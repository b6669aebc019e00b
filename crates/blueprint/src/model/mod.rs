//! In-memory blueprint volume.
//!
//! A `Blueprint` holds a deduplicated palette of block states, a dense grid
//! of palette indices, a parallel grid of optional side payloads and a flat
//! list of loose entities. Cell lists, the position map, per-cell entity
//! lookup and the anchor are derived lazily and dropped together on every
//! mutation.

mod blueprint;
mod types;


pub use blueprint::Blueprint;
pub use types::{
    BlueprintMeta, CellInfo, EntityKind, Extent, ItemStack, LooseEntity, PositionInfo,
    RegionTags, SidePayload, TaggedPosition,
};
