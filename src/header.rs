//! This module defines the `FixelHeader` struct, which describes the voxel
//! grid and storage of a sparse fixel image file.
//!
//! A fixel file starts with the header, followed by every voxel in storage
//! order (x fastest): a `u32` fixel count, then for each fixel its direction
//! as three `f32` and its value in the header's value type.

use crate::affine::{affine_from_rows, affine_to_rows, Affine4};
use crate::error::{FixelError, Result};
use crate::image::FixelImage;
use crate::util::{is_gz_file, native_endianness, opposite};
use byteordered::{ByteOrdered, Endianness};
use flate2::bufread::GzDecoder;
use num_traits::FromPrimitive;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Magic code for sparse fixel image files (extension ".fxl[.gz]").
pub const MAGIC_CODE_FXL: &[u8; 4] = b"fxl\0";

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 4 + 4 * 2 + 2 + 3 * 4 + 12 * 4;

/// Storage type of fixel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum ValueType {
    /// 32-bit IEEE float
    Float32 = 16,
    /// 64-bit IEEE float
    Float64 = 64,
}

impl ValueType {
    /// Number of bytes used by a single value.
    pub fn size_of(self) -> usize {
        match self {
            ValueType::Float32 => 4,
            ValueType::Float64 => 8,
        }
    }
}

/// The fixel image header data type.
#[derive(Debug, Clone, PartialEq)]
pub struct FixelHeader {
    /// Magic code. Must be `b"fxl\0"`
    pub magic: [u8; 4],
    /// Grid dimensions, `dim[0]` is the dimensionality and must be 3
    pub dim: [u16; 4],
    /// Value type code
    pub datatype: i16,
    /// Voxel sizes in millimetres
    pub pixdim: [f32; 3],
    /// 1st row affine transform
    pub srow_x: [f32; 4],
    /// 2nd row affine transform
    pub srow_y: [f32; 4],
    /// 3rd row affine transform
    pub srow_z: [f32; 4],
    /// Original data Endianness
    pub endianness: Endianness,
}

impl Default for FixelHeader {
    fn default() -> FixelHeader {
        FixelHeader {
            magic: *MAGIC_CODE_FXL,
            dim: [3, 1, 1, 1],
            datatype: ValueType::Float32 as i16,
            pixdim: [1.; 3],
            srow_x: [1., 0., 0., 0.],
            srow_y: [0., 1., 0., 0.],
            srow_z: [0., 0., 1., 0.],
            endianness: native_endianness(),
        }
    }
}

impl FixelHeader {
    /// Describe the grid of an in-memory image.
    pub fn from_image(image: &FixelImage, value_type: ValueType) -> Result<FixelHeader> {
        let mut dim = [3u16; 4];
        for (d, &n) in dim[1..].iter_mut().zip(image.dim().iter()) {
            if n > usize::from(u16::MAX) {
                return Err(FixelError::InvalidFormat);
            }
            *d = n as u16;
        }
        let [srow_x, srow_y, srow_z] = affine_to_rows(image.affine());
        Ok(FixelHeader {
            dim,
            datatype: value_type as i16,
            pixdim: image.pixdim(),
            srow_x,
            srow_y,
            srow_z,
            ..FixelHeader::default()
        })
    }

    /// Retrieve a fixel header, along with its byte order, from a file in the file system.
    /// If the file's name ends with ".gz", the file is assumed to need GZip decoding.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<FixelHeader> {
        let gz = is_gz_file(&path);
        let file = BufReader::new(File::open(path)?);
        if gz {
            FixelHeader::from_reader(GzDecoder::new(file))
        } else {
            FixelHeader::from_reader(file)
        }
    }

    /// Read a fixel header, along with its byte order, from the given byte stream.
    /// It is assumed that the input is currently at the start of the header.
    pub fn from_reader<S: Read>(input: S) -> Result<FixelHeader> {
        parse_header(input)
    }

    /// Get the value type as a validated enum.
    pub fn value_type(&self) -> Result<ValueType> {
        FromPrimitive::from_i16(self.datatype)
            .ok_or(FixelError::UnsupportedValueType(self.datatype))
    }

    /// Grid dimensions.
    pub fn dim(&self) -> [usize; 3] {
        [
            usize::from(self.dim[1]),
            usize::from(self.dim[2]),
            usize::from(self.dim[3]),
        ]
    }

    /// Voxel to scanner transformation.
    pub fn affine(&self) -> Affine4 {
        affine_from_rows(&self.srow_x, &self.srow_y, &self.srow_z)
    }
}

fn parse_header<S: Read>(mut input: S) -> Result<FixelHeader> {
    let mut h = FixelHeader::default();
    input.read_exact(&mut h.magic)?;
    if &h.magic != MAGIC_CODE_FXL {
        return Err(FixelError::InvalidFormat);
    }

    // try the system's native endianness first
    h.dim[0] = ByteOrdered::native(&mut input).read_u16()?;
    h.endianness = if h.dim[0] > 7 {
        h.dim[0] = h.dim[0].swap_bytes();
        opposite(native_endianness())
    } else {
        native_endianness()
    };
    if h.dim[0] != 3 {
        return Err(FixelError::InvalidFormat);
    }

    let mut input = ByteOrdered::runtime(input, h.endianness);
    for v in &mut h.dim[1..] {
        *v = input.read_u16()?;
    }
    h.datatype = input.read_i16()?;
    for v in &mut h.pixdim {
        *v = input.read_f32()?;
    }
    for v in &mut h.srow_x {
        *v = input.read_f32()?;
    }
    for v in &mut h.srow_y {
        *v = input.read_f32()?;
    }
    for v in &mut h.srow_z {
        *v = input.read_f32()?;
    }
    let _ = h.value_type()?;
    Ok(h)
}
