//! Private utility module
use byteordered::Endianness;
use nalgebra::Vector3;
use std::path::Path;

/// Obtain this system's endianness
#[cfg(target_endian = "little")]
pub fn native_endianness() -> Endianness {
    Endianness::Little
}

/// Obtain this system's endianness
#[cfg(target_endian = "big")]
pub fn native_endianness() -> Endianness {
    Endianness::Big
}

/// The opposite byte order: Little Endian returns Big Endian and vice versa.
pub fn opposite(e: Endianness) -> Endianness {
    match e {
        Endianness::Little => Endianness::Big,
        Endianness::Big => Endianness::Little,
    }
}

/// Checks whether the given path names a GZip-compressed file.
pub fn is_gz_file<P>(path: P) -> bool
where
    P: AsRef<Path>,
{
    path.as_ref()
        .file_name()
        .map(|a| a.to_string_lossy().ends_with(".gz"))
        .unwrap_or(false)
}

/// Cosine of an angular threshold given in degrees.
pub fn angular_threshold_dp(degrees: f32) -> f32 {
    f64::from(degrees).to_radians().cos() as f32
}

/// Find the direction among `candidates` closest to `dir`, ignoring sign.
///
/// The first candidate with a strictly larger absolute dot product wins, so
/// ties go to the earliest one and an orthogonal candidate (dot product of 0)
/// is never picked. The match is only returned if its absolute cosine exceeds
/// `threshold_dp`.
pub fn closest_direction<'a, I>(dir: &Vector3<f32>, candidates: I, threshold_dp: f32) -> Option<usize>
where
    I: IntoIterator<Item = &'a Vector3<f32>>,
{
    let mut largest_dp = 0.0;
    let mut closest = None;
    for (i, c) in candidates.into_iter().enumerate() {
        let dp = dir.dot(c).abs();
        if dp > largest_dp {
            largest_dp = dp;
            closest = Some(i);
        }
    }
    if largest_dp > threshold_dp {
        closest
    } else {
        None
    }
}
