//! Module for retrieving complete fixel images from files.

use crate::error::{FixelError, Result};
use crate::header::{FixelHeader, ValueType};
use crate::image::{FixelImage, FixelMetric};
use crate::util::is_gz_file;
use byteordered::{ByteOrdered, Endian};
use flate2::bufread::GzDecoder;
use nalgebra::Vector3;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

impl FixelImage {
    /// Retrieve the full contents of a fixel image file.
    /// If the file's name ends with ".gz", the file is decoded as a GZip stream.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use fixelcfe::FixelImage;
    /// # use fixelcfe::Result;
    ///
    /// # fn run() -> Result<()> {
    /// let img = FixelImage::from_file("template.fxl.gz")?;
    /// println!("{} fixels", img.num_fixels());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FixelImage> {
        let gz = is_gz_file(&path);
        let file = BufReader::new(File::open(path)?);
        if gz {
            FixelImage::from_reader(GzDecoder::new(file))
        } else {
            FixelImage::from_reader(file)
        }
    }

    /// Read a fixel image, header included, from the given byte stream.
    pub fn from_reader<S: Read>(mut source: S) -> Result<FixelImage> {
        let header = FixelHeader::from_reader(&mut source)?;
        let value_type = header.value_type()?;
        let source = ByteOrdered::runtime(source, header.endianness);
        let dim = header.dim();
        let voxels = read_voxels(source, dim, value_type)?;
        FixelImage::from_voxels(dim, voxels, header.pixdim, header.affine())
    }
}

/// Read the body of every voxel in storage order. The grid size comes from
/// the header, so storage only grows as voxels are actually read.
fn read_voxels<S, E>(mut source: ByteOrdered<S, E>, dim: [usize; 3], value_type: ValueType) -> Result<Vec<Vec<FixelMetric>>>
where
    S: Read,
    E: Endian,
{
    let num_voxels = dim
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or(FixelError::InvalidFormat)?;
    let mut voxels = Vec::new();
    for _ in 0..num_voxels {
        let count = source.read_u32()?;
        let mut fixels = Vec::new();
        for _ in 0..count {
            let dir = Vector3::new(source.read_f32()?, source.read_f32()?, source.read_f32()?);
            let value = match value_type {
                ValueType::Float32 => source.read_f32()?,
                ValueType::Float64 => source.read_f64()? as f32,
            };
            let norm = dir.norm();
            if !norm.is_finite() || norm == 0.0 {
                return Err(FixelError::InvalidFormat);
            }
            fixels.push(FixelMetric::new(dir, value));
        }
        voxels.push(fixels);
    }
    Ok(voxels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::WriterOptions;

    /// Encode `image` under a header claiming the given grid.
    fn encode(dim: [u16; 3], image: &FixelImage) -> Vec<u8> {
        let mut header = FixelHeader::from_image(image, ValueType::Float32).unwrap();
        header.dim = [3, dim[0], dim[1], dim[2]];
        let mut bytes = Vec::new();
        WriterOptions::new("unused.fxl")
            .write_to(&mut bytes, &header, image)
            .unwrap();
        bytes
    }

    fn one_fixel(dir: Vector3<f32>) -> FixelImage {
        let mut img = FixelImage::with_spacing([1, 1, 1], [2.0; 3]);
        img.set_voxel([0, 0, 0], vec![FixelMetric { dir, value: 5.0 }]).unwrap();
        img
    }

    #[test]
    fn huge_grid_with_short_body_is_an_error() {
        let bytes = encode([60000, 60000, 60000], &FixelImage::with_spacing([1, 1, 1], [2.0; 3]));
        match FixelImage::from_reader(&bytes[..]) {
            Err(FixelError::Io(_)) => {}
            e => panic!("unexpected result {:?}", e),
        }
    }

    #[test]
    fn directions_are_normalised_on_read() {
        let bytes = encode([1, 1, 1], &one_fixel(Vector3::new(0.0, 2.0, 0.0)));
        let img = FixelImage::from_reader(&bytes[..]).unwrap();
        let f = img.voxel([0, 0, 0])[0];
        assert!((f.dir - Vector3::y()).norm() < 1e-6);
        assert_eq!(f.value, 5.0);
    }

    #[test]
    fn zero_direction_is_rejected() {
        let bytes = encode([1, 1, 1], &one_fixel(Vector3::zeros()));
        match FixelImage::from_reader(&bytes[..]) {
            Err(FixelError::InvalidFormat) => {}
            e => panic!("unexpected result {:?}", e),
        }
    }

    #[test]
    fn voxel_order_survives_reading() {
        let mut img = FixelImage::with_spacing([2, 3, 2], [1.5; 3]);
        img.push_fixel([1, 0, 0], FixelMetric::new(Vector3::x(), 1.0)).unwrap();
        img.push_fixel([0, 2, 1], FixelMetric::new(Vector3::z(), 2.0)).unwrap();
        let bytes = encode([2, 3, 2], &img);
        let back = FixelImage::from_reader(&bytes[..]).unwrap();
        assert_eq!(back.voxel([1, 0, 0]), img.voxel([1, 0, 0]));
        assert_eq!(back.voxel([0, 2, 1]), img.voxel([0, 2, 1]));
        assert_eq!(back.num_fixels(), 2);
    }
}
