//! Voxel to scanner space transformations.

use nalgebra::{Matrix3, Matrix4, Point3, RowVector4, Scalar, Vector3};

/// Full homogeneous voxel to scanner transformation.
pub type Affine4 = Matrix4<f32>;

/// Separate a 4x4 affine into its 3x3 affine and translation components.
pub fn get_affine_and_translation<T: Scalar>(affine: &Matrix4<T>) -> (Matrix3<T>, Vector3<T>) {
    let translation = Vector3::<T>::new(
        affine[(0, 3)].clone(),
        affine[(1, 3)].clone(),
        affine[(2, 3)].clone(),
    );
    let affine = affine.fixed_view::<3, 3>(0, 0).into_owned();
    (affine, translation)
}

/// Build an affine from the three stored rows.
pub fn affine_from_rows(srow_x: &[f32; 4], srow_y: &[f32; 4], srow_z: &[f32; 4]) -> Affine4 {
    Affine4::from_rows(&[
        RowVector4::from_row_slice(srow_x),
        RowVector4::from_row_slice(srow_y),
        RowVector4::from_row_slice(srow_z),
        RowVector4::new(0.0, 0.0, 0.0, 1.0),
    ])
}

/// Split an affine back into its three stored rows.
pub fn affine_to_rows(affine: &Affine4) -> [[f32; 4]; 3] {
    let mut rows = [[0.0; 4]; 3];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = affine[(r, c)];
        }
    }
    rows
}

/// Get affine implied by given shape and zooms.
///
/// We get the translations from the center of the image (implied by `shape`).
#[rustfmt::skip]
pub fn shape_zoom_affine(shape: &[usize; 3], spacing: &[f32; 3]) -> Affine4 {
    // Get translations from center of image
    let origin = Vector3::new(
        (shape[0] as f32 - 1.0) / 2.0,
        (shape[1] as f32 - 1.0) / 2.0,
        (shape[2] as f32 - 1.0) / 2.0,
    );
    let spacing = [-spacing[0], spacing[1], spacing[2]];
    Affine4::new(
        spacing[0], 0.0, 0.0, -origin[0] * spacing[0],
        0.0, spacing[1], 0.0, -origin[1] * spacing[1],
        0.0, 0.0, spacing[2], -origin[2] * spacing[2],
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Scanner-space position of a voxel centre.
pub fn voxel_to_scanner(affine: &Affine4, voxel: [usize; 3]) -> Point3<f32> {
    let (linear, translation) = get_affine_and_translation(affine);
    let v = Vector3::new(voxel[0] as f32, voxel[1] as f32, voxel[2] as f32);
    Point3::from(linear * v + translation)
}

/// Maps scanner-space points to the nearest voxel of a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerToVoxel {
    inverse: Affine4,
    dim: [usize; 3],
}

impl ScannerToVoxel {
    /// Invert the given voxel to scanner affine. Returns `None` if it is singular.
    pub fn new(affine: &Affine4, dim: [usize; 3]) -> Option<Self> {
        affine
            .try_inverse()
            .map(|inverse| ScannerToVoxel { inverse, dim })
    }

    /// Grid dimensions.
    pub fn dim(&self) -> [usize; 3] {
        self.dim
    }

    /// Continuous voxel coordinates of a scanner-space point.
    pub fn continuous(&self, p: &Point3<f32>) -> Point3<f32> {
        self.inverse.transform_point(p)
    }

    /// The voxel containing the given point, if it lies inside the grid.
    pub fn voxel(&self, p: &Point3<f32>) -> Option<[usize; 3]> {
        let c = self.continuous(p);
        let mut voxel = [0; 3];
        for axis in 0..3 {
            let v = c[axis].round();
            if !(v >= 0.0) || v >= self.dim[axis] as f32 {
                return None;
            }
            voxel[axis] = v as usize;
        }
        Some(voxel)
    }
}
