//! On-disk mirror of [`Blueprint`].
//!
//! The model types carry glam vectors and ordered maps that bitcode cannot
//! derive for directly, so the file format has its own plain structs with
//! conversions both ways. Cell indices are packed to one byte per cell
//! whenever the palette is small enough.

use bevy::math::{DVec3, IVec3};
use bitcode::{Decode, Encode};

use blueprint::model::{
    BlueprintMeta, ItemStack, LooseEntity, RegionTags, SidePayload, TaggedPosition,
};
use blueprint::state::{BlockKind, Facing};
use blueprint::{Blueprint, BlockState, Extent};

use crate::storage_error::StorageError;

/// Palettes up to this length store one byte per cell.
pub const NARROW_PALETTE_MAX: usize = 256;

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct StoredBlueprint {
    pub size: Extent,
    pub meta: StoredMeta,
    pub palette: Vec<StoredState>,
    /// `true` when `cells` holds two little-endian bytes per cell.
    pub wide_indices: bool,
    pub cells: Vec<u8>,
    /// Non-empty payloads in raster order.
    pub payloads: Vec<StoredPayloadEntry>,
    pub entities: Vec<StoredEntity>,
    pub anchor_hint: Option<[i32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct StoredMeta {
    pub name: String,
    pub authors: Vec<String>,
    pub required_capabilities: Vec<String>,
    pub missing_capabilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct StoredState {
    pub name: String,
    pub kind: BlockKind,
    pub properties: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct StoredPayloadEntry {
    pub index: u32,
    pub payload: StoredPayload,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct StoredPayload {
    pub kind: String,
    pub facing: Option<Facing>,
    pub items: Vec<(String, u32)>,
    pub region: Option<StoredRegion>,
    pub extra: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct StoredRegion {
    pub tagged: Vec<([i32; 3], Vec<String>)>,
    pub corner_one: Option<[i32; 3]>,
    pub corner_two: Option<[i32; 3]>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct StoredEntity {
    pub type_id: String,
    pub kind_tag: u8,
    pub position: [f64; 3],
    pub yaw: f32,
    pub pitch: f32,
    pub data: Vec<(String, String)>,
}

// =============================================================================
// Blueprint -> stored
// =============================================================================

impl StoredBlueprint {
    pub fn from_blueprint(bp: &Blueprint) -> Self {
        let wide_indices = bp.palette().len() > NARROW_PALETTE_MAX;
        let cells = pack_indices(bp.cell_indices(), wide_indices);
        let payloads = bp
            .payload_grid()
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                p.as_ref().map(|payload| StoredPayloadEntry {
                    index: i as u32,
                    payload: StoredPayload::from(payload),
                })
            })
            .collect();
        let meta = bp.meta();
        Self {
            size: bp.size(),
            meta: StoredMeta {
                name: meta.name.clone(),
                authors: meta.authors.clone(),
                required_capabilities: meta.required_capabilities.clone(),
                missing_capabilities: meta.missing_capabilities.clone(),
            },
            palette: bp.palette().iter().map(StoredState::from).collect(),
            wide_indices,
            cells,
            payloads,
            entities: bp.entities().iter().map(StoredEntity::from).collect(),
            anchor_hint: bp.anchor_hint().map(|a| a.to_array()),
        }
    }

    /// Rebuild the blueprint, validating every structural invariant.
    pub fn into_blueprint(self) -> Result<Blueprint, StorageError> {
        let volume = self.size.volume();
        let cells = unpack_indices(&self.cells, self.wide_indices, volume)?;

        let mut payloads = vec![None; volume];
        for entry in self.payloads {
            let slot = payloads.get_mut(entry.index as usize).ok_or_else(|| {
                StorageError::Corrupt(format!(
                    "payload index {} outside volume of {volume}",
                    entry.index
                ))
            })?;
            *slot = Some(SidePayload::from(entry.payload));
        }

        let meta = BlueprintMeta {
            name: self.meta.name,
            authors: self.meta.authors,
            required_capabilities: self.meta.required_capabilities,
            missing_capabilities: self.meta.missing_capabilities,
        };
        let mut bp = Blueprint::from_parts(
            self.size,
            self.palette.into_iter().map(BlockState::from).collect(),
            cells,
            payloads,
            self.entities.into_iter().map(LooseEntity::from).collect(),
            meta,
        )?;
        if let Some(hint) = self.anchor_hint {
            bp.set_anchor_hint(IVec3::from_array(hint));
        }
        Ok(bp)
    }
}

fn pack_indices(indices: &[u16], wide: bool) -> Vec<u8> {
    if wide {
        indices.iter().flat_map(|i| i.to_le_bytes()).collect()
    } else {
        indices.iter().map(|&i| i as u8).collect()
    }
}

fn unpack_indices(bytes: &[u8], wide: bool, volume: usize) -> Result<Vec<u16>, StorageError> {
    let expected = if wide { volume * 2 } else { volume };
    if bytes.len() != expected {
        return Err(StorageError::Corrupt(format!(
            "expected {expected} cell bytes, found {}",
            bytes.len()
        )));
    }
    Ok(if wide {
        bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    } else {
        bytes.iter().map(|&b| b as u16).collect()
    })
}

// =============================================================================
// Conversions
// =============================================================================

impl From<&BlockState> for StoredState {
    fn from(state: &BlockState) -> Self {
        Self {
            name: state.name.clone(),
            kind: state.kind,
            properties: state
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl From<StoredState> for BlockState {
    fn from(stored: StoredState) -> Self {
        let mut state = BlockState::new(stored.name, stored.kind);
        state.properties = stored.properties.into_iter().collect();
        state
    }
}

impl From<&SidePayload> for StoredPayload {
    fn from(payload: &SidePayload) -> Self {
        Self {
            kind: payload.kind.clone(),
            facing: payload.facing,
            items: payload
                .items
                .iter()
                .map(|s| (s.item.clone(), s.count))
                .collect(),
            region: payload.region.as_ref().map(|region| StoredRegion {
                tagged: region
                    .tagged
                    .iter()
                    .map(|t| (t.pos.to_array(), t.tags.clone()))
                    .collect(),
                corner_one: region.corner_one.map(|c| c.to_array()),
                corner_two: region.corner_two.map(|c| c.to_array()),
            }),
            extra: payload
                .extra
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl From<StoredPayload> for SidePayload {
    fn from(stored: StoredPayload) -> Self {
        Self {
            kind: stored.kind,
            facing: stored.facing,
            items: stored
                .items
                .into_iter()
                .map(|(item, count)| ItemStack { item, count })
                .collect(),
            region: stored.region.map(|region| RegionTags {
                tagged: region
                    .tagged
                    .into_iter()
                    .map(|(pos, tags)| TaggedPosition {
                        pos: IVec3::from_array(pos),
                        tags,
                    })
                    .collect(),
                corner_one: region.corner_one.map(IVec3::from_array),
                corner_two: region.corner_two.map(IVec3::from_array),
            }),
            extra: stored.extra.into_iter().collect(),
        }
    }
}

impl From<&LooseEntity> for StoredEntity {
    fn from(entity: &LooseEntity) -> Self {
        Self {
            type_id: entity.type_id.clone(),
            kind_tag: entity.kind_tag,
            position: entity.position.to_array(),
            yaw: entity.yaw,
            pitch: entity.pitch,
            data: entity
                .data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl From<StoredEntity> for LooseEntity {
    fn from(stored: StoredEntity) -> Self {
        Self {
            type_id: stored.type_id,
            kind_tag: stored.kind_tag,
            position: DVec3::from_array(stored.position),
            yaw: stored.yaw,
            pitch: stored.pitch,
            data: stored.data.into_iter().collect(),
        }
    }
}
