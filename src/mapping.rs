//! Mapping of streamlines onto the voxel grid.
//!
//! Each streamline becomes a set of dixels: one per voxel it traverses, with
//! the mean (sign-aligned) tangent of the streamline within that voxel.

use crate::affine::{Affine4, ScannerToVoxel};
use crate::error::{FixelError, Result};
use nalgebra::{Point3, Vector3};
use log::debug;
use std::collections::HashMap;

/// A directional streamline sample within a single voxel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dixel {
    /// Voxel coordinates
    pub voxel: [usize; 3],
    /// Unit tangent direction
    pub dir: Vector3<f32>,
}

/// Converts streamlines into per-voxel tangent samples.
#[derive(Debug, Clone)]
pub struct TrackMapper {
    to_voxel: ScannerToVoxel,
    max_step: f32,
}

impl TrackMapper {
    /// Create a mapper for the grid described by `dim`, `pixdim` and `affine`.
    ///
    /// Streamlines are upsampled so that consecutive points are never further
    /// apart than a third of the smallest voxel size.
    pub fn new(dim: [usize; 3], pixdim: [f32; 3], affine: &Affine4) -> Result<TrackMapper> {
        let to_voxel = ScannerToVoxel::new(affine, dim)
            .ok_or(FixelError::LinearAlgebra("voxel to scanner transform is singular"))?;
        let min_vox = pixdim
            .iter()
            .map(|p| p.abs())
            .filter(|p| *p > 0.0)
            .fold(std::f32::INFINITY, f32::min);
        let max_step = if min_vox.is_finite() { min_vox / 3.0 } else { 1.0 };
        Ok(TrackMapper { to_voxel, max_step })
    }

    /// Map a streamline to its dixels, in order of first visit.
    pub fn map(&self, streamline: &[Point3<f32>]) -> Vec<Dixel> {
        let points = self.upsample(streamline);
        let mut dixels: Vec<Dixel> = Vec::new();
        let mut seen: HashMap<[usize; 3], usize> = HashMap::new();

        for (i, p) in points.iter().enumerate() {
            let voxel = match self.to_voxel.voxel(p) {
                Some(v) => v,
                None => continue,
            };
            let tangent = tangent(&points, i);
            match seen.get(&voxel) {
                Some(&d) => {
                    let sum = &mut dixels[d].dir;
                    if sum.dot(&tangent) < 0.0 {
                        *sum -= tangent;
                    } else {
                        *sum += tangent;
                    }
                }
                None => {
                    let _ = seen.insert(voxel, dixels.len());
                    dixels.push(Dixel { voxel, dir: tangent });
                }
            }
        }

        dixels.retain(|d| d.dir.norm() > 0.0);
        for d in &mut dixels {
            d.dir.normalize_mut();
        }
        dixels
    }

    /// Resample a streamline at no more than `max_step` spacing. Segments are
    /// first clipped to the grid (plus a margin of one voxel), so points far
    /// outside it cost nothing.
    fn upsample(&self, streamline: &[Point3<f32>]) -> Vec<Point3<f32>> {
        let mut out = Vec::with_capacity(streamline.len());
        for pair in streamline.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let (t0, t1) = match self.clip(&a, &b) {
                Some(range) => range,
                None => continue,
            };
            let steps = ((b - a).norm() * (t1 - t0) / self.max_step).ceil();
            if !steps.is_finite() {
                debug!("skipping streamline segment with non-finite length");
                continue;
            }
            let n = steps.max(1.0) as usize;
            for k in 0..n {
                let t = t0 + (t1 - t0) * k as f32 / n as f32;
                out.push(a + (b - a) * t);
            }
            if t1 < 1.0 {
                out.push(a + (b - a) * t1);
            }
        }
        if let Some(last) = streamline.last() {
            out.push(*last);
        }
        out
    }

    /// Parameter range of the segment `a -> b` lying within the grid.
    fn clip(&self, a: &Point3<f32>, b: &Point3<f32>) -> Option<(f32, f32)> {
        let ca = self.to_voxel.continuous(a);
        let cb = self.to_voxel.continuous(b);
        let d = cb - ca;
        if !(ca.coords.iter().chain(d.iter()).all(|v| v.is_finite())) {
            return None;
        }
        let (mut t0, mut t1) = (0.0f32, 1.0f32);
        for (axis, &n) in self.to_voxel.dim().iter().enumerate() {
            let (lo, hi) = (-1.0, n as f32);
            if d[axis] == 0.0 {
                if ca[axis] < lo || ca[axis] > hi {
                    return None;
                }
            } else {
                let ta = (lo - ca[axis]) / d[axis];
                let tb = (hi - ca[axis]) / d[axis];
                t0 = t0.max(ta.min(tb));
                t1 = t1.min(ta.max(tb));
            }
        }
        if t0 < t1 {
            Some((t0, t1))
        } else {
            None
        }
    }
}

/// Central difference tangent, one-sided at the streamline ends.
fn tangent(points: &[Point3<f32>], i: usize) -> Vector3<f32> {
    if points.len() < 2 {
        return Vector3::zeros();
    }
    let prev = if i == 0 { 0 } else { i - 1 };
    let next = if i + 1 == points.len() { i } else { i + 1 };
    let d = points[next] - points[prev];
    let norm = d.norm();
    if norm > 0.0 {
        d / norm
    } else {
        Vector3::zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector4;

    fn mapper() -> TrackMapper {
        let affine = Affine4::from_diagonal(&Vector4::new(2.0, 2.0, 2.0, 1.0));
        TrackMapper::new([4, 4, 4], [2.0; 3], &affine).unwrap()
    }

    #[test]
    fn straight_line_along_x() {
        let s = vec![Point3::new(0.0, 2.0, 2.0), Point3::new(6.0, 2.0, 2.0)];
        let dixels = mapper().map(&s);
        let voxels: Vec<_> = dixels.iter().map(|d| d.voxel).collect();
        assert_eq!(voxels, vec![[0, 1, 1], [1, 1, 1], [2, 1, 1], [3, 1, 1]]);
        for d in &dixels {
            assert!((d.dir - Vector3::x()).norm() < 1e-6);
        }
    }

    #[test]
    fn outside_points_are_ignored() {
        let s = vec![Point3::new(-10.0, 2.0, 2.0), Point3::new(-8.0, 2.0, 2.0)];
        assert!(mapper().map(&s).is_empty());
    }

    #[test]
    fn far_outlier_is_clipped_to_grid() {
        let s = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1e7, 0.0, 0.0)];
        let m = mapper();
        assert!(m.upsample(&s).len() < 20);
        let dixels = m.map(&s);
        let voxels: Vec<_> = dixels.iter().map(|d| d.voxel).collect();
        assert_eq!(voxels, vec![[0, 0, 0], [1, 0, 0], [2, 0, 0], [3, 0, 0]]);
        for d in &dixels {
            assert!((d.dir - Vector3::x()).norm() < 1e-6);
        }
    }

    #[test]
    fn segments_missing_the_grid_are_skipped() {
        let s = vec![
            Point3::new(-1e7, -1e7, 0.0),
            Point3::new(1e7, -1e7, 0.0),
            Point3::new(1e30, 1e30, 1e30),
        ];
        let m = mapper();
        assert_eq!(m.upsample(&s).len(), 1);
        assert!(m.map(&s).is_empty());
    }

    #[test]
    fn single_point_has_no_direction() {
        assert!(mapper().map(&[Point3::new(2.0, 2.0, 2.0)]).is_empty());
        assert!(mapper().map(&[]).is_empty());
    }

    #[test]
    fn reversal_within_voxel_is_axial() {
        // goes forward then comes back through the same voxel
        let s = vec![
            Point3::new(1.6, 2.0, 2.0),
            Point3::new(2.4, 2.0, 2.0),
            Point3::new(1.6, 2.0, 2.0),
        ];
        let dixels = mapper().map(&s);
        assert_eq!(dixels.len(), 1);
        assert!(dixels[0].dir.x.abs() > 0.99);
    }
}
