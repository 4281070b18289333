//! In-memory sparse fixel images.
//!
//! A fixel image is a voxel grid where every voxel holds a variable number of
//! fixels, each one a fibre direction with an associated scalar value.

use crate::affine::{shape_zoom_affine, voxel_to_scanner, Affine4};
use crate::error::{FixelError, Result};
use nalgebra::{Point3, Vector3};
use ndarray::{Array3, ShapeBuilder};

/// A single fibre orientation within a voxel, plus its measure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixelMetric {
    /// Unit fibre direction
    pub dir: Vector3<f32>,
    /// Scalar measure (e.g. fibre density)
    pub value: f32,
}

impl FixelMetric {
    /// Create a fixel, normalising the given direction.
    pub fn new(dir: Vector3<f32>, value: f32) -> Self {
        let norm = dir.norm();
        let dir = if norm > 0.0 { dir / norm } else { dir };
        FixelMetric { dir, value }
    }
}

/// A sparse fixel image held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct FixelImage {
    pixdim: [f32; 3],
    affine: Affine4,
    voxels: Array3<Vec<FixelMetric>>,
}

impl FixelImage {
    /// Create an empty image with the given grid and voxel to scanner transform.
    pub fn new(dim: [usize; 3], pixdim: [f32; 3], affine: Affine4) -> Self {
        FixelImage {
            pixdim,
            affine,
            voxels: Array3::from_elem((dim[0], dim[1], dim[2]), Vec::new()),
        }
    }

    /// Build an image from the fixels of every voxel, listed in storage order
    /// (x fastest, then y, then z).
    ///
    /// # Errors
    ///
    /// `FixelError::InvalidFormat` if the number of voxels does not match `dim`.
    pub fn from_voxels(
        dim: [usize; 3],
        voxels: Vec<Vec<FixelMetric>>,
        pixdim: [f32; 3],
        affine: Affine4,
    ) -> Result<Self> {
        let voxels = Array3::from_shape_vec((dim[0], dim[1], dim[2]).f(), voxels)
            .map_err(|_| FixelError::InvalidFormat)?;
        Ok(FixelImage {
            pixdim,
            affine,
            voxels,
        })
    }

    /// Create an empty image centred on the scanner origin.
    pub fn with_spacing(dim: [usize; 3], pixdim: [f32; 3]) -> Self {
        Self::new(dim, pixdim, shape_zoom_affine(&dim, &pixdim))
    }

    /// Create an empty image on the same grid as `other`.
    pub fn empty_like(other: &FixelImage) -> Self {
        Self::new(other.dim(), other.pixdim, other.affine)
    }

    /// Grid dimensions.
    pub fn dim(&self) -> [usize; 3] {
        let (x, y, z) = self.voxels.dim();
        [x, y, z]
    }

    /// Voxel sizes in millimetres.
    pub fn pixdim(&self) -> [f32; 3] {
        self.pixdim
    }

    /// Voxel to scanner transformation.
    pub fn affine(&self) -> &Affine4 {
        &self.affine
    }

    /// The fixels of a voxel.
    ///
    /// # Panics
    ///
    /// If `voxel` lies outside the grid.
    pub fn voxel(&self, voxel: [usize; 3]) -> &[FixelMetric] {
        &self.voxels[voxel]
    }

    /// Replace the fixels of a voxel.
    pub fn set_voxel(&mut self, voxel: [usize; 3], fixels: Vec<FixelMetric>) -> Result<()> {
        match self.voxels.get_mut(voxel) {
            Some(v) => {
                *v = fixels;
                Ok(())
            }
            None => Err(FixelError::OutOfBounds(voxel)),
        }
    }

    /// Append a single fixel to a voxel.
    pub fn push_fixel(&mut self, voxel: [usize; 3], fixel: FixelMetric) -> Result<()> {
        match self.voxels.get_mut(voxel) {
            Some(v) => {
                v.push(fixel);
                Ok(())
            }
            None => Err(FixelError::OutOfBounds(voxel)),
        }
    }

    /// Total number of fixels in the image.
    pub fn num_fixels(&self) -> usize {
        self.voxels.iter().map(Vec::len).sum()
    }

    /// Scanner-space position of a voxel centre.
    pub fn voxel_to_scanner(&self, voxel: [usize; 3]) -> Point3<f32> {
        voxel_to_scanner(&self.affine, voxel)
    }

    /// Iterate over every voxel in storage order (x fastest, then y, then z).
    pub fn iter_voxels(&self) -> impl Iterator<Item = ([usize; 3], &[FixelMetric])> + '_ {
        let [nx, ny, nz] = self.dim();
        (0..nz).flat_map(move |z| {
            (0..ny).flat_map(move |y| {
                (0..nx).map(move |x| {
                    let v = [x, y, z];
                    (v, self.voxels[v].as_slice())
                })
            })
        })
    }

    /// Ensure that `other` lies on the same voxel grid as this image.
    pub fn check_dimensions(&self, other: &FixelImage) -> Result<()> {
        if self.dim() == other.dim() {
            Ok(())
        } else {
            Err(FixelError::DimensionMismatch(self.dim(), other.dim()))
        }
    }
}
