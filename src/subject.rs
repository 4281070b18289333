//! Loading of per-subject fixel data onto the template fixels.

use crate::config::CfeConfig;
use crate::connectivity::SmoothingWeights;
use crate::error::{FixelError, Result};
use crate::image::FixelImage;
use crate::index::FixelIndex;
use crate::util::closest_direction;
use log::{info, warn};
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a subject listing: one fixel image path per line.
///
/// Relative paths are resolved against the directory holding the listing.
/// Blank lines are skipped.
pub fn read_subject_list<P: AsRef<Path>>(path: P) -> Result<Vec<PathBuf>> {
    let path = path.as_ref();
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let contents = fs::read_to_string(path)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| base.join(l))
        .collect())
}

/// Values of a subject image at every template fixel.
///
/// Each template fixel takes the value of the subject fixel in the same voxel
/// with the closest direction, provided it lies within the angular threshold.
/// The second element of the result counts template fixels left unmatched,
/// whose value is 0.
pub fn subject_column(
    subject: &FixelImage,
    template: &FixelImage,
    index: &FixelIndex,
    threshold_dp: f32,
) -> Result<(Vec<f32>, usize)> {
    template.check_dimensions(subject)?;
    let mut column = vec![0.0; index.num_fixels()];
    let mut unmatched = 0;
    for (voxel, _) in template.iter_voxels() {
        let range = match index.fixels_in(voxel) {
            Some(r) => r,
            None => continue,
        };
        let fixels = subject.voxel(voxel);
        for f in range {
            let dirs = fixels.iter().map(|m| &m.dir);
            match closest_direction(&index.directions()[f], dirs, threshold_dp) {
                Some(i) => column[f] = fixels[i].value,
                None => unmatched += 1,
            }
        }
    }
    Ok((column, unmatched))
}

/// Load every subject image, match its fixels against the template and smooth
/// the result.
///
/// Subjects are processed in parallel. The returned matrix holds one row per
/// fixel and one column per subject, in listing order.
pub fn load_subjects(
    paths: &[PathBuf],
    template: &FixelImage,
    index: &FixelIndex,
    weights: &SmoothingWeights,
    config: &CfeConfig,
) -> Result<DMatrix<f32>> {
    let threshold_dp = config.angular_threshold_dp();
    info!("loading and smoothing {} subject images...", paths.len());

    let columns: Vec<(Vec<f32>, usize)> = paths
        .par_iter()
        .map(|p| -> Result<(Vec<f32>, usize)> {
            let subject = FixelImage::from_file(p)?;
            let (raw, unmatched) = subject_column(&subject, template, index, threshold_dp)?;
            Ok((weights.apply(&raw), unmatched))
        })
        .collect::<Result<_>>()?;

    let unmatched: usize = columns.iter().map(|(_, u)| u).sum();
    if unmatched > 0 {
        warn!(
            "{} template fixels across {} subjects had no corresponding subject fixel and were set to 0",
            unmatched,
            paths.len()
        );
    }
    data_matrix(index.num_fixels(), columns.into_iter().map(|(c, _)| c))
}

/// Assemble per-subject columns into a fixels × subjects matrix.
pub fn data_matrix<I>(num_fixels: usize, columns: I) -> Result<DMatrix<f32>>
where
    I: IntoIterator<Item = Vec<f32>>,
{
    let columns: Vec<Vec<f32>> = columns.into_iter().collect();
    if let Some(c) = columns.iter().find(|c| c.len() != num_fixels) {
        return Err(FixelError::MalformedMatrix(format!(
            "subject column has {} values, expected {}",
            c.len(),
            num_fixels
        )));
    }
    Ok(DMatrix::from_fn(num_fixels, columns.len(), |r, c| columns[c][r]))
}
