//! Per-fixel result images.

use crate::error::{FixelError, Result};
use crate::image::{FixelImage, FixelMetric};
use crate::index::FixelIndex;
use crate::writer::WriterOptions;
use log::debug;
use std::path::Path;

/// Build an image on the template's fixels holding one value per fixel.
pub fn fixel_output_image(data: &[f32], template: &FixelImage, index: &FixelIndex) -> Result<FixelImage> {
    if data.len() != index.num_fixels() {
        return Err(FixelError::MalformedMatrix(format!(
            "{} output values for {} fixels",
            data.len(),
            index.num_fixels()
        )));
    }
    let mut image = FixelImage::empty_like(template);
    for (voxel, fixels) in template.iter_voxels() {
        if let Some(range) = index.fixels_in(voxel) {
            let out = fixels
                .iter()
                .zip(&data[range])
                .map(|(f, &v)| FixelMetric { dir: f.dir, value: v })
                .collect();
            image.set_voxel(voxel, out)?;
        }
    }
    Ok(image)
}

/// Write one value per template fixel to a fixel image file.
pub fn write_fixel_output<P: AsRef<Path>>(
    path: P,
    data: &[f32],
    template: &FixelImage,
    index: &FixelIndex,
) -> Result<()> {
    let image = fixel_output_image(data, template, index)?;
    debug!("writing {}", path.as_ref().display());
    WriterOptions::new(path).write_fixel_image(&image)
}
