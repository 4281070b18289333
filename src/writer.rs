//! Utility functions to write fixel images.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteordered::{ByteOrdered, Endian, Endianness};
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::Result;
use crate::header::{FixelHeader, ValueType};
use crate::image::FixelImage;
use crate::util::{is_gz_file, native_endianness};

/// Options and flags which can be used to configure how a fixel image is written.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterOptions {
    /// Where to write the output image.
    path: PathBuf,
    /// Storage type of fixel values.
    value_type: ValueType,
    /// Byte order of the output file.
    endianness: Endianness,
    /// Compression level used when the path ends with ".gz".
    compression: Compression,
}

impl WriterOptions {
    /// Creates a blank new set of options ready for configuration.
    pub fn new<P>(path: P) -> WriterOptions
    where
        P: AsRef<Path>,
    {
        WriterOptions {
            path: path.as_ref().to_owned(),
            value_type: ValueType::Float32,
            endianness: native_endianness(),
            compression: Compression::fast(),
        }
    }

    /// Sets the storage type of fixel values.
    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Sets the byte order of the output file.
    pub fn endianness(mut self, endianness: Endianness) -> Self {
        self.endianness = endianness;
        self
    }

    /// Sets the compression level used for ".gz" outputs.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Write a fixel image to the configured path.
    pub fn write_fixel_image(&self, image: &FixelImage) -> Result<()> {
        let header = FixelHeader::from_image(image, self.value_type)?;
        let writer = BufWriter::new(File::create(&self.path)?);
        if is_gz_file(&self.path) {
            let mut e = GzEncoder::new(writer, self.compression);
            self.write_to(&mut e, &header, image)?;
            let _ = e.finish()?; // Must use result
        } else {
            let mut writer = writer;
            self.write_to(&mut writer, &header, image)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Write a fixel image to an arbitrary byte sink.
    pub fn write_to<W: Write>(&self, writer: W, header: &FixelHeader, image: &FixelImage) -> Result<()> {
        let mut writer = ByteOrdered::runtime(writer, self.endianness);
        write_header(&mut writer, header)?;
        write_voxels(&mut writer, image, self.value_type)
    }
}

fn write_header<W, E>(writer: &mut ByteOrdered<W, E>, header: &FixelHeader) -> Result<()>
where
    W: Write,
    E: Endian,
{
    writer.write_all(&header.magic)?;
    for d in &header.dim {
        writer.write_u16(*d)?;
    }
    writer.write_i16(header.datatype)?;
    for f in header
        .pixdim
        .iter()
        .chain(&header.srow_x)
        .chain(&header.srow_y)
        .chain(&header.srow_z)
    {
        writer.write_f32(*f)?;
    }
    Ok(())
}

fn write_voxels<W, E>(writer: &mut ByteOrdered<W, E>, image: &FixelImage, value_type: ValueType) -> Result<()>
where
    W: Write,
    E: Endian,
{
    for (_, fixels) in image.iter_voxels() {
        writer.write_u32(fixels.len() as u32)?;
        for f in fixels {
            writer.write_f32(f.dir.x)?;
            writer.write_f32(f.dir.y)?;
            writer.write_f32(f.dir.z)?;
            match value_type {
                ValueType::Float32 => writer.write_f32(f.value)?,
                ValueType::Float64 => writer.write_f64(f64::from(f.value))?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HEADER_SIZE;
    use crate::image::FixelMetric;
    use nalgebra::Vector3;

    fn sample() -> FixelImage {
        let mut img = FixelImage::with_spacing([2, 2, 1], [2.0, 2.0, 2.0]);
        img.push_fixel([0, 0, 0], FixelMetric::new(Vector3::x(), 0.5)).unwrap();
        img.push_fixel([0, 0, 0], FixelMetric::new(Vector3::y(), 0.25)).unwrap();
        img.push_fixel([1, 1, 0], FixelMetric::new(Vector3::z(), 1.0)).unwrap();
        img
    }

    #[test]
    fn in_memory_round_trip() {
        let img = sample();
        for &endianness in &[Endianness::Little, Endianness::Big] {
            for &vt in &[ValueType::Float32, ValueType::Float64] {
                let opts = WriterOptions::new("unused.fxl").value_type(vt).endianness(endianness);
                let header = FixelHeader::from_image(&img, vt).unwrap();
                let mut bytes = Vec::new();
                opts.write_to(&mut bytes, &header, &img).unwrap();
                assert_eq!(bytes.len(), HEADER_SIZE + 4 * 4 + 3 * (12 + vt.size_of()));

                let read = FixelImage::from_reader(&bytes[..]).unwrap();
                assert_eq!(read, img);
                assert_eq!(FixelHeader::from_reader(&bytes[..]).unwrap().endianness, endianness);
            }
        }
    }

    #[test]
    fn truncated_body() {
        let img = sample();
        let header = FixelHeader::from_image(&img, ValueType::Float32).unwrap();
        let mut bytes = Vec::new();
        WriterOptions::new("unused.fxl")
            .write_to(&mut bytes, &header, &img)
            .unwrap();
        bytes.truncate(bytes.len() - 2);
        assert!(FixelImage::from_reader(&bytes[..]).is_err());
    }
}
