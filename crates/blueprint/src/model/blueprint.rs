//! Core `Blueprint` struct: a palette-indexed voxel volume with side
//! payloads, loose entities and lazily built derived views.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use bevy::math::IVec3;

use crate::error::BlueprintError;
use crate::state::{BlockKind, BlockState};
use crate::transform::{self, Mirror, Rotation};

use super::types::{BlueprintMeta, CellInfo, Extent, LooseEntity, PositionInfo, SidePayload};

/// Palette indices are 16-bit.
const MAX_PALETTE_LEN: usize = u16::MAX as usize + 1;

/// Views rebuilt from the raw grids. Always built and dropped as a unit.
#[derive(Debug, Clone)]
struct DerivedViews {
    cells: Vec<CellInfo>,
    cell_map: HashMap<IVec3, usize>,
    entities_by_cell: HashMap<IVec3, Vec<LooseEntity>>,
    anchor: IVec3,
}

/// A captured structure.
///
/// Cells are stored in one flat buffer indexed by `(y * size.z + z) * size.x + x`.
/// Palette index 0 is always the substitution wildcard.
#[derive(Debug, Clone)]
pub struct Blueprint {
    size: Extent,
    palette: Vec<BlockState>,
    cells: Vec<u16>,
    payloads: Vec<Option<SidePayload>>,
    entities: Vec<LooseEntity>,
    meta: BlueprintMeta,
    /// Anchor carried over from a transform when no unique anchor cell exists.
    anchor_hint: Option<IVec3>,
    views: OnceLock<DerivedViews>,
}

impl PartialEq for Blueprint {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size
            && self.palette == other.palette
            && self.cells == other.cells
            && self.payloads == other.payloads
            && self.entities == other.entities
            && self.meta == other.meta
    }
}

impl Blueprint {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// An empty scan target: every cell holds the substitution wildcard.
    pub fn new(size: Extent) -> Self {
        let volume = size.volume();
        Self {
            size,
            palette: vec![BlockState::substitution()],
            cells: vec![0; volume],
            payloads: vec![None; volume],
            entities: Vec::new(),
            meta: BlueprintMeta::default(),
            anchor_hint: None,
            views: OnceLock::new(),
        }
    }

    /// A volume with every cell set to `state`.
    pub fn filled(size: Extent, state: BlockState) -> Self {
        let mut bp = Self::new(size);
        if state != bp.palette[0] {
            bp.palette.push(state);
            bp.cells.fill(1);
        }
        bp
    }

    /// Assemble a blueprint from raw grids, checking every invariant.
    pub fn from_parts(
        size: Extent,
        palette: Vec<BlockState>,
        cells: Vec<u16>,
        payloads: Vec<Option<SidePayload>>,
        entities: Vec<LooseEntity>,
        meta: BlueprintMeta,
    ) -> Result<Self, BlueprintError> {
        let volume = size.volume();
        if palette.first() != Some(&BlockState::substitution()) {
            return Err(BlueprintError::Malformed(
                "palette index 0 must be the substitution state".to_string(),
            ));
        }
        if palette.len() > MAX_PALETTE_LEN {
            return Err(BlueprintError::PaletteFull);
        }
        let distinct: HashSet<&BlockState> = palette.iter().collect();
        if distinct.len() != palette.len() {
            return Err(BlueprintError::Malformed(
                "palette contains duplicate states".to_string(),
            ));
        }
        if cells.len() != volume || payloads.len() != volume {
            return Err(BlueprintError::Malformed(format!(
                "expected {volume} cells and payloads, got {} and {}",
                cells.len(),
                payloads.len()
            )));
        }
        if let Some(bad) = cells.iter().find(|&&i| i as usize >= palette.len()) {
            return Err(BlueprintError::Malformed(format!(
                "cell index {bad} out of range for palette of {}",
                palette.len()
            )));
        }
        Ok(Self {
            size,
            palette,
            cells,
            payloads,
            entities,
            meta,
            anchor_hint: None,
            views: OnceLock::new(),
        })
    }

    /// Assemble from grids the caller already knows to be consistent.
    pub(crate) fn from_raw(
        size: Extent,
        palette: Vec<BlockState>,
        cells: Vec<u16>,
        payloads: Vec<Option<SidePayload>>,
        entities: Vec<LooseEntity>,
        meta: BlueprintMeta,
    ) -> Self {
        Self {
            size,
            palette,
            cells,
            payloads,
            entities,
            meta,
            anchor_hint: None,
            views: OnceLock::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Raw accessors
    // -------------------------------------------------------------------------

    pub fn size(&self) -> Extent {
        self.size
    }

    pub fn palette(&self) -> &[BlockState] {
        &self.palette
    }

    /// Palette indices in raster order.
    pub fn cell_indices(&self) -> &[u16] {
        &self.cells
    }

    pub fn payload_grid(&self) -> &[Option<SidePayload>] {
        &self.payloads
    }

    pub fn entities(&self) -> &[LooseEntity] {
        &self.entities
    }

    pub fn anchor_hint(&self) -> Option<IVec3> {
        self.anchor_hint
    }

    pub fn meta(&self) -> &BlueprintMeta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut BlueprintMeta {
        &mut self.meta
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.meta.name = name.into();
        self
    }

    pub fn state_at(&self, pos: IVec3) -> Option<&BlockState> {
        let idx = self.size.index(pos)?;
        self.palette.get(self.cells[idx] as usize)
    }

    pub fn payload_at(&self, pos: IVec3) -> Option<&SidePayload> {
        let idx = self.size.index(pos)?;
        self.payloads[idx].as_ref()
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Palette index of `state`, appending it if unseen.
    pub fn add_state(&mut self, state: BlockState) -> Result<u16, BlueprintError> {
        if let Some(idx) = self.palette.iter().position(|s| *s == state) {
            return Ok(idx as u16);
        }
        if self.palette.len() >= MAX_PALETTE_LEN {
            return Err(BlueprintError::PaletteFull);
        }
        self.palette.push(state);
        self.invalidate();
        Ok((self.palette.len() - 1) as u16)
    }

    pub fn set_cell(&mut self, pos: IVec3, state: BlockState) -> Result<u16, BlueprintError> {
        let idx = self.checked_index(pos)?;
        let palette_idx = self.add_state(state)?;
        self.cells[idx] = palette_idx;
        self.anchor_hint = None;
        self.invalidate();
        Ok(palette_idx)
    }

    pub fn set_payload(
        &mut self,
        pos: IVec3,
        payload: Option<SidePayload>,
    ) -> Result<(), BlueprintError> {
        let idx = self.checked_index(pos)?;
        self.payloads[idx] = payload;
        self.invalidate();
        Ok(())
    }

    pub fn set_entities(&mut self, entities: Vec<LooseEntity>) {
        self.entities = entities;
        self.invalidate();
    }

    pub fn push_entity(&mut self, entity: LooseEntity) {
        self.entities.push(entity);
        self.invalidate();
    }

    /// Rotate and mirror in place. Returns loose entities that could not be
    /// carried through the transform.
    pub fn apply_transform(&mut self, rotation: Rotation, mirror: Mirror) -> Vec<LooseEntity> {
        let transformed = transform::transform(self, rotation, mirror);
        *self = transformed.blueprint;
        transformed.dropped_entities
    }

    /// Fallback origin used when the volume holds no single anchor cell.
    /// Cleared by the next `set_cell`.
    pub fn set_anchor_hint(&mut self, anchor: IVec3) {
        self.anchor_hint = Some(anchor);
        self.invalidate();
    }

    fn checked_index(&self, pos: IVec3) -> Result<usize, BlueprintError> {
        self.size.index(pos).ok_or(BlueprintError::OutOfBounds {
            pos,
            size: self.size,
        })
    }

    fn invalidate(&mut self) {
        self.views = OnceLock::new();
    }

    // -------------------------------------------------------------------------
    // Derived views
    // -------------------------------------------------------------------------

    fn views(&self) -> &DerivedViews {
        self.views.get_or_init(|| self.build_views())
    }

    fn build_views(&self) -> DerivedViews {
        let volume = self.size.volume();
        let mut cells = Vec::with_capacity(volume);
        let mut cell_map = HashMap::with_capacity(volume);
        let mut anchors = Vec::new();
        for (i, pos) in self.size.positions().enumerate() {
            let state = self.palette[self.cells[i] as usize].clone();
            if state.kind == BlockKind::Anchor {
                anchors.push(pos);
            }
            cell_map.insert(pos, i);
            cells.push(CellInfo {
                pos,
                state,
                payload: self.payloads[i].clone(),
            });
        }

        // Entities on a far face land one past the grid; file them under the
        // nearest edge cell so every entity is reachable from some cell.
        let max_cell = (self.size.as_ivec3() - IVec3::ONE).max(IVec3::ZERO);
        let mut entities_by_cell: HashMap<IVec3, Vec<LooseEntity>> = HashMap::new();
        for entity in &self.entities {
            entities_by_cell
                .entry(entity.cell().clamp(IVec3::ZERO, max_cell))
                .or_default()
                .push(entity.clone());
        }

        let anchor = match anchors.as_slice() {
            [single] => *single,
            _ => self.anchor_hint.unwrap_or_else(|| self.fallback_anchor()),
        };

        DerivedViews {
            cells,
            cell_map,
            entities_by_cell,
            anchor,
        }
    }

    /// Centre of the base plane.
    fn fallback_anchor(&self) -> IVec3 {
        IVec3::new(self.size.x as i32 / 2, 0, self.size.z as i32 / 2)
    }

    /// Every cell in raster order.
    pub fn cell_list(&self) -> &[CellInfo] {
        &self.views().cells
    }

    pub fn cell_at(&self, pos: IVec3) -> Option<&CellInfo> {
        let views = self.views();
        views.cell_map.get(&pos).map(|&i| &views.cells[i])
    }

    /// Loose entities whose position falls inside the cell at `pos`, or
    /// just outside it when `pos` is on the volume's boundary.
    pub fn entities_at(&self, pos: IVec3) -> &[LooseEntity] {
        self.views()
            .entities_by_cell
            .get(&pos)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn position_info(&self, pos: IVec3, include_entities: bool) -> Option<PositionInfo> {
        let cell = self.cell_at(pos)?.clone();
        let entities = if include_entities {
            self.entities_at(pos).to_vec()
        } else {
            Vec::new()
        };
        Some(PositionInfo { cell, entities })
    }

    /// The placement origin: the single anchor cell, otherwise a position
    /// carried over from a transform, otherwise the centre of the base plane.
    pub fn anchor(&self) -> IVec3 {
        self.views().anchor
    }
}
