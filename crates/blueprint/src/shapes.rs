//! Procedural blueprints: cubes, spheres, cylinders, pyramids and waves.
//!
//! Generators write into a sparse map first (first write to a position
//! wins), then the map is normalized into a blueprint whose bounding box
//! holds exactly the generated cells. Cells inside the box that no shape
//! touched are structure void, so placement leaves the world alone there.

use std::collections::BTreeMap;

use bevy::math::IVec3;

use crate::error::BlueprintError;
use crate::model::{Blueprint, Extent};
use crate::state::BlockState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Cube,
    Sphere,
    HalfSphere,
    Bowl,
    Cylinder,
    Pyramid,
    UpsideDownPyramid,
    Diamond,
    Wave,
    Wave3d,
}

impl Shape {
    pub const ALL: [Shape; 10] = [
        Shape::Cube,
        Shape::Sphere,
        Shape::HalfSphere,
        Shape::Bowl,
        Shape::Cylinder,
        Shape::Pyramid,
        Shape::UpsideDownPyramid,
        Shape::Diamond,
        Shape::Wave,
        Shape::Wave3d,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Shape::Cube => "cube",
            Shape::Sphere => "sphere",
            Shape::HalfSphere => "half_sphere",
            Shape::Bowl => "bowl",
            Shape::Cylinder => "cylinder",
            Shape::Pyramid => "pyramid",
            Shape::UpsideDownPyramid => "upside_down_pyramid",
            Shape::Diamond => "diamond",
            Shape::Wave => "wave",
            Shape::Wave3d => "wave_3d",
        }
    }
}

/// Largest bounding volume a generator may sweep.
pub const MAX_SHAPE_VOLUME: u64 = 1 << 24;

/// Everything a generator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRequest {
    pub shape: Shape,
    pub width: u16,
    pub height: u16,
    pub length: u16,
    /// Wave amplitude in blocks.
    pub frequency: u16,
    /// Outer surface.
    pub state: BlockState,
    /// Interior of solid shapes. Defaults to `state`.
    pub fill: Option<BlockState>,
    pub hollow: bool,
}

impl ShapeRequest {
    pub fn new(shape: Shape, width: u16, height: u16, length: u16, state: BlockState) -> Self {
        Self {
            shape,
            width,
            height,
            length,
            frequency: 1,
            state,
            fill: None,
            hollow: false,
        }
    }
}

/// Generate `shape` from a single block state.
pub fn generate(
    shape: Shape,
    width: u16,
    height: u16,
    length: u16,
    state: BlockState,
    hollow: bool,
) -> Result<Blueprint, BlueprintError> {
    let mut request = ShapeRequest::new(shape, width, height, length, state);
    request.hollow = hollow;
    generate_with(&request)
}

pub fn generate_with(request: &ShapeRequest) -> Result<Blueprint, BlueprintError> {
    if request.width == 0 || request.height == 0 || request.length == 0 {
        return Err(BlueprintError::InvalidShape(format!(
            "{} needs non-zero dimensions, got {}x{}x{}",
            request.shape.name(),
            request.width,
            request.height,
            request.length
        )));
    }
    let [bx, by, bz] = bounding_extent(request);
    let volume = bx.saturating_mul(by).saturating_mul(bz);
    if volume > MAX_SHAPE_VOLUME {
        return Err(BlueprintError::InvalidShape(format!(
            "{} of {}x{}x{} would sweep {volume} cells, limit is {MAX_SHAPE_VOLUME}",
            request.shape.name(),
            request.width,
            request.height,
            request.length
        )));
    }
    let fill = request.fill.as_ref().unwrap_or(&request.state);
    let mut cells = SparseCells::default();
    let (w, h, l) = (
        request.width as i32,
        request.height as i32,
        request.length as i32,
    );
    match request.shape {
        Shape::Cube => cube(&mut cells, w, h, l, &request.state, fill, request.hollow),
        Shape::Sphere | Shape::HalfSphere | Shape::Bowl => sphere(
            &mut cells,
            h / 2,
            &request.state,
            fill,
            request.hollow,
            request.shape,
        ),
        Shape::Cylinder => cylinder(&mut cells, w, h, &request.state, fill, request.hollow),
        Shape::Pyramid | Shape::UpsideDownPyramid | Shape::Diamond => pyramid(
            &mut cells,
            h,
            &request.state,
            fill,
            request.hollow,
            request.shape,
        ),
        Shape::Wave => wave(&mut cells, h, w, l, request.frequency as i32, &request.state, true),
        Shape::Wave3d => wave(&mut cells, h, w, l, request.frequency as i32, &request.state, false),
    }
    cells.into_blueprint(request.shape.name())
}

/// Upper bound on the box a generator covers, before void trimming.
fn bounding_extent(request: &ShapeRequest) -> [u64; 3] {
    let (w, h, l) = (
        u64::from(request.width),
        u64::from(request.height),
        u64::from(request.length),
    );
    match request.shape {
        Shape::Cube => [w, h, l],
        Shape::Sphere | Shape::HalfSphere | Shape::Bowl => {
            let span = h + 3;
            [span, span, span]
        }
        Shape::Cylinder => [w + 1, h, w + 1],
        Shape::Pyramid | Shape::UpsideDownPyramid => [2 * h, 2 * h, 2 * h],
        Shape::Diamond => [h, h, h],
        Shape::Wave | Shape::Wave3d => {
            let amplitude = 2 * u64::from(request.frequency) + 2;
            [l, amplitude + 2 * w, 2 * w]
        }
    }
}

// =============================================================================
// Sparse accumulation
// =============================================================================

/// Generated cells keyed in raster order (y, z, x) so the palette is built
/// deterministically.
#[derive(Default)]
struct SparseCells {
    cells: BTreeMap<(i32, i32, i32), BlockState>,
}

impl SparseCells {
    fn add(&mut self, pos: IVec3, state: &BlockState) {
        self.cells
            .entry((pos.y, pos.z, pos.x))
            .or_insert_with(|| state.clone());
    }

    /// Add `(x, y, z)` reflected into all four horizontal quadrants.
    fn add_quadrants(&mut self, x: i32, y: i32, z: i32, state: &BlockState) {
        self.add(IVec3::new(x, y, z), state);
        self.add(IVec3::new(x, y, -z), state);
        self.add(IVec3::new(-x, y, z), state);
        self.add(IVec3::new(-x, y, -z), state);
    }

    fn into_blueprint(self, name: &str) -> Result<Blueprint, BlueprintError> {
        let mut keys = self.cells.keys();
        let Some(&(y0, z0, x0)) = keys.next() else {
            return Err(BlueprintError::InvalidShape(format!(
                "{name} produced no cells"
            )));
        };
        let (mut min, mut max) = (IVec3::new(x0, y0, z0), IVec3::new(x0, y0, z0));
        for &(y, z, x) in keys {
            let p = IVec3::new(x, y, z);
            min = min.min(p);
            max = max.max(p);
        }
        let span = max - min + IVec3::ONE;
        let limit = u16::MAX as i32;
        if span.x > limit || span.y > limit || span.z > limit {
            return Err(BlueprintError::InvalidShape(format!(
                "{name} spans {span}, larger than a blueprint can hold"
            )));
        }
        let size = Extent::new(span.x as u16, span.y as u16, span.z as u16);
        let mut bp = Blueprint::filled(size, BlockState::structure_void()).with_name(name);
        for ((y, z, x), state) in self.cells {
            bp.set_cell(IVec3::new(x, y, z) - min, state)?;
        }
        Ok(bp)
    }
}

// =============================================================================
// Generators
// =============================================================================

fn cube(
    cells: &mut SparseCells,
    width: i32,
    height: i32,
    length: i32,
    state: &BlockState,
    fill: &BlockState,
    hollow: bool,
) {
    for y in 0..height {
        for x in 0..width {
            for z in 0..length {
                let on_surface = x == 0
                    || x == width - 1
                    || y == 0
                    || y == height - 1
                    || z == 0
                    || z == length - 1;
                if !hollow || on_surface {
                    let block = if on_surface { state } else { fill };
                    cells.add(IVec3::new(x, y, z), block);
                }
            }
        }
    }
}

fn sphere(
    cells: &mut SparseCells,
    radius: i32,
    state: &BlockState,
    fill: &BlockState,
    hollow: bool,
    shape: Shape,
) {
    let r2 = radius * radius;
    let shell = r2 - 2 * radius;
    for y in 0..=radius + 1 {
        for x in 0..=radius + 1 {
            for z in 0..=radius + 1 {
                let sum = x * x + y * y + z * z;
                if sum >= r2 || (hollow && sum <= shell) {
                    continue;
                }
                let block = if sum > shell { state } else { fill };
                if matches!(shape, Shape::Sphere | Shape::HalfSphere) {
                    cells.add_quadrants(x, y, z, block);
                }
                if matches!(shape, Shape::Sphere | Shape::Bowl) {
                    cells.add_quadrants(x, -y, z, block);
                }
            }
        }
    }
}

fn cylinder(
    cells: &mut SparseCells,
    width: i32,
    height: i32,
    state: &BlockState,
    fill: &BlockState,
    hollow: bool,
) {
    let r2 = width * width / 4;
    let shell = r2 - width;
    for x in 0..width {
        for z in 0..width {
            let sum = x * x + z * z;
            if sum >= r2 || (hollow && sum <= shell) {
                continue;
            }
            let block = if sum > shell { state } else { fill };
            for y in 0..height {
                cells.add_quadrants(x, y, z, block);
            }
        }
    }
}

fn pyramid(
    cells: &mut SparseCells,
    input_height: i32,
    state: &BlockState,
    fill: &BlockState,
    hollow: bool,
    shape: Shape,
) {
    let height = if shape == Shape::Diamond {
        input_height
    } else {
        input_height * 2
    };
    let half = height / 2;
    for y in 0..half {
        for x in 0..half {
            for z in 0..half {
                let inner = if hollow { y == z } else { y >= z };
                let edge = (x == z && x >= y) || (x == y && x >= z);
                if !((edge || (inner && y >= x)) && x * z <= y * y) {
                    continue;
                }
                let block = if (x == z && x >= y) || x == y || y == z {
                    state
                } else {
                    fill
                };
                if matches!(shape, Shape::UpsideDownPyramid | Shape::Diamond) {
                    cells.add_quadrants(x, y, z, block);
                }
                if matches!(shape, Shape::Pyramid | Shape::Diamond) {
                    cells.add_quadrants(x, height - 2 - y, z, block);
                }
            }
        }
    }
}

fn wave(
    cells: &mut SparseCells,
    height: i32,
    width: i32,
    length: i32,
    frequency: i32,
    state: &BlockState,
    flat: bool,
) {
    for x in 0..length {
        for z in 0..width {
            let base = if flat { 0.0 } else { z as f64 };
            let y = (base + frequency as f64 * (x as f64 / height as f64).sin()).floor() as i32;
            cells.add(IVec3::new(x, y, z), state);
            if !flat {
                cells.add(IVec3::new(x, y, -z), state);
                cells.add(IVec3::new(x, y + width - 1, z - width + 1), state);
                cells.add(IVec3::new(x, y + width - 1, -z + width - 1), state);
            }
        }
    }
}
