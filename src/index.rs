//! Flat indexing of the fixels of a template mask.

use crate::error::{FixelError, Result};
use crate::image::FixelImage;
use log::info;
use nalgebra::{Point3, Vector3};
use ndarray::Array3;
use std::ops::Range;

/// Location of a voxel's fixels within the flat fixel arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelFixels {
    /// Index of the voxel's first fixel, or -1 if the voxel holds none
    pub offset: i64,
    /// Number of fixels in the voxel
    pub count: u32,
}

impl VoxelFixels {
    /// Entry for a voxel without fixels.
    pub const ABSENT: VoxelFixels = VoxelFixels { offset: -1, count: 0 };

    /// The range of fixel indices, if the voxel holds any.
    pub fn range(&self) -> Option<Range<usize>> {
        if self.offset < 0 {
            None
        } else {
            let start = self.offset as usize;
            Some(start..start + self.count as usize)
        }
    }
}

/// Every fixel of a template mask, indexed densely in voxel-then-within-voxel order.
#[derive(Debug, Clone, PartialEq)]
pub struct FixelIndex {
    table: Array3<VoxelFixels>,
    directions: Vec<Vector3<f32>>,
    positions: Vec<Point3<f32>>,
}

impl FixelIndex {
    /// Index the fixels of the given template mask.
    pub fn new(template: &FixelImage) -> Result<FixelIndex> {
        let [nx, ny, nz] = template.dim();
        let mut table = Array3::from_elem((nx, ny, nz), VoxelFixels::ABSENT);
        let mut directions = Vec::with_capacity(template.num_fixels());
        let mut positions = Vec::with_capacity(template.num_fixels());

        for (voxel, fixels) in template.iter_voxels() {
            if fixels.is_empty() {
                continue;
            }
            let offset = directions.len() as i64;
            let pos = template.voxel_to_scanner(voxel);
            for f in fixels {
                directions.push(f.dir);
                positions.push(pos);
            }
            table[voxel] = VoxelFixels {
                offset,
                count: fixels.len() as u32,
            };
        }

        if directions.is_empty() {
            return Err(FixelError::EmptyTemplate);
        }
        info!("number of fixels: {}", directions.len());
        Ok(FixelIndex {
            table,
            directions,
            positions,
        })
    }

    /// Total number of fixels.
    pub fn num_fixels(&self) -> usize {
        self.directions.len()
    }

    /// Grid dimensions of the template.
    pub fn dim(&self) -> [usize; 3] {
        let (x, y, z) = self.table.dim();
        [x, y, z]
    }

    /// Lookup entry of a voxel. Voxels outside the grid are reported as absent.
    pub fn voxel(&self, voxel: [usize; 3]) -> VoxelFixels {
        self.table.get(voxel).copied().unwrap_or(VoxelFixels::ABSENT)
    }

    /// The fixel index range of a voxel, if it holds any fixel.
    pub fn fixels_in(&self, voxel: [usize; 3]) -> Option<Range<usize>> {
        self.voxel(voxel).range()
    }

    /// Unit directions of all fixels.
    pub fn directions(&self) -> &[Vector3<f32>] {
        &self.directions
    }

    /// Scanner-space positions of all fixels.
    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }
}
