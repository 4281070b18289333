//! Streamline sources.
//!
//! The connectivity pipeline pulls decoded streamlines from a [`TrackSource`].
//! Two implementations are provided: [`TckReader`] for track files made of a
//! text header followed by binary point triplets, and [`VecTrackSource`] for
//! streamlines already in memory.

use crate::error::{FixelError, Result};
use byteordered::{ByteOrdered, Endianness};
use log::warn;
use nalgebra::Point3;
use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

/// A streamline, as an ordered list of scanner-space points.
pub type Streamline = Vec<Point3<f32>>;

/// Magic first line of a track file.
pub const TCK_MAGIC: &str = "mrtrix tracks";

/// A sequential supply of streamlines.
pub trait TrackSource {
    /// Number of streamlines the source claims to hold.
    fn declared_count(&self) -> usize;

    /// Fetch the next streamline, or `None` once the source is exhausted.
    fn next_streamline(&mut self) -> Result<Option<Streamline>>;
}

/// Streamlines held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecTrackSource {
    declared: usize,
    tracks: VecDeque<Streamline>,
}

impl VecTrackSource {
    /// Create a source declaring exactly as many streamlines as given.
    pub fn new(tracks: Vec<Streamline>) -> Self {
        VecTrackSource {
            declared: tracks.len(),
            tracks: tracks.into(),
        }
    }

    /// Override the declared streamline count.
    pub fn with_declared_count(mut self, declared: usize) -> Self {
        self.declared = declared;
        self
    }
}

impl TrackSource for VecTrackSource {
    fn declared_count(&self) -> usize {
        self.declared
    }

    fn next_streamline(&mut self) -> Result<Option<Streamline>> {
        Ok(self.tracks.pop_front())
    }
}

/// Reader of track files.
///
/// The header is a sequence of text lines: the magic line `mrtrix tracks`,
/// `key: value` properties (among them `datatype`, `count` and `file`), and a
/// closing `END` line. Point triplets follow at the offset given by the
/// `file: . <offset>` property. A NaN triplet terminates a streamline and an
/// infinite triplet terminates the data.
#[derive(Debug)]
pub struct TckReader<R> {
    properties: BTreeMap<String, String>,
    source: ByteOrdered<R, Endianness>,
    double: bool,
    finished: bool,
}

impl TckReader<BufReader<File>> {
    /// Open a track file from the file system.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        TckReader::from_reader(BufReader::new(File::open(path)?))
    }
}

impl<R: BufRead> TckReader<R> {
    /// Parse the header of a track file and position the reader at its first point.
    pub fn from_reader(mut source: R) -> Result<Self> {
        let mut consumed = 0;
        let mut line = String::new();
        consumed += source.read_line(&mut line)?;
        if line.trim_end() != TCK_MAGIC {
            return Err(FixelError::InvalidTrackFile("missing magic line".to_string()));
        }

        let mut properties = BTreeMap::new();
        loop {
            line.clear();
            let n = source.read_line(&mut line)?;
            if n == 0 {
                return Err(FixelError::InvalidTrackFile("header is not terminated".to_string()));
            }
            consumed += n;
            let entry = line.trim_end();
            if entry == "END" {
                break;
            }
            match entry.find(':') {
                Some(i) => {
                    let _ = properties.insert(
                        entry[..i].trim().to_string(),
                        entry[i + 1..].trim().to_string(),
                    );
                }
                None => {
                    return Err(FixelError::InvalidTrackFile(format!("malformed header line `{}`", entry)))
                }
            }
        }

        let (double, endianness) = match properties.get("datatype").map(String::as_str) {
            None | Some("Float32LE") => (false, Endianness::Little),
            Some("Float32BE") => (false, Endianness::Big),
            Some("Float64LE") => (true, Endianness::Little),
            Some("Float64BE") => (true, Endianness::Big),
            Some(other) => {
                return Err(FixelError::InvalidTrackFile(format!("unsupported datatype `{}`", other)))
            }
        };

        let offset = match properties.get("file") {
            Some(file) => {
                let mut parts = file.split_whitespace();
                match (parts.next(), parts.next().map(str::parse::<usize>)) {
                    (Some("."), Some(Ok(offset))) => offset,
                    (Some("."), None) => consumed,
                    _ => {
                        return Err(FixelError::InvalidTrackFile(format!(
                            "unsupported file property `{}`",
                            file
                        )))
                    }
                }
            }
            None => consumed,
        };
        if offset < consumed {
            return Err(FixelError::InvalidTrackFile("data offset lies within the header".to_string()));
        }
        let skip = (offset - consumed) as u64;
        if io::copy(&mut source.by_ref().take(skip), &mut io::sink())? != skip {
            return Err(FixelError::InvalidTrackFile("data offset beyond end of file".to_string()));
        }

        Ok(TckReader {
            properties,
            source: ByteOrdered::runtime(source, endianness),
            double,
            finished: false,
        })
    }
}

impl<R> TckReader<R> {
    /// All header properties.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// A single header property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl<R: Read> TckReader<R> {
    fn read_value(&mut self) -> io::Result<f32> {
        if self.double {
            self.source.read_f64().map(|v| v as f32)
        } else {
            self.source.read_f32()
        }
    }
}

impl<R: Read> TrackSource for TckReader<R> {
    fn declared_count(&self) -> usize {
        self.property("count")
            .and_then(|c| c.parse().ok())
            .unwrap_or(0)
    }

    fn next_streamline(&mut self) -> Result<Option<Streamline>> {
        if self.finished {
            return Ok(None);
        }
        let mut points = Vec::new();
        loop {
            let x = match self.read_value() {
                Ok(x) => x,
                Err(ref e) if e.kind() == ErrorKind::UnexpectedEof && points.is_empty() => {
                    warn!("track file ended without a terminating triplet");
                    self.finished = true;
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };
            let y = self.read_value()?;
            let z = self.read_value()?;
            if x.is_nan() || y.is_nan() || z.is_nan() {
                return Ok(Some(points));
            }
            if x.is_infinite() || y.is_infinite() || z.is_infinite() {
                self.finished = true;
                if points.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(points));
            }
            points.push(Point3::new(x, y, z));
        }
    }
}

fn tck_header(count: usize, offset: usize) -> String {
    format!(
        "{}\ncount: {}\ndatatype: Float32LE\nfile: . {}\nEND\n",
        TCK_MAGIC, count, offset
    )
}

/// Write streamlines to a track file (single precision, little endian).
pub fn write_tck<P: AsRef<Path>>(path: P, streamlines: &[Streamline]) -> Result<()> {
    let mut offset = 0;
    let header = loop {
        let header = tck_header(streamlines.len(), offset);
        if header.len() == offset {
            break header;
        }
        offset = header.len();
    };

    let mut writer = ByteOrdered::le(BufWriter::new(File::create(path)?));
    writer.write_all(header.as_bytes())?;
    for s in streamlines {
        for p in s {
            writer.write_f32(p.x)?;
            writer.write_f32(p.y)?;
            writer.write_f32(p.z)?;
        }
        for _ in 0..3 {
            writer.write_f32(std::f32::NAN)?;
        }
    }
    for _ in 0..3 {
        writer.write_f32(std::f32::INFINITY)?;
    }
    writer.flush()?;
    Ok(())
}
