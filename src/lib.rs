//! Connectivity-based fixel enhancement (CFE) in Rust.
//!
//! This crate performs fixel-wise statistical inference: fibre orientation
//! specific measures of a group of subjects are tested with a general linear
//! model, and the resulting statistics are enhanced with threshold-free
//! cluster enhancement over a fixel connectivity graph derived from
//! tractography. Family-wise error is controlled by permutation testing.
//!
//! # Example
//!
//! ```no_run
//! use fixelcfe::{run_analysis, CfeConfig, CfeInputs};
//! # use fixelcfe::Result;
//!
//! # fn run() -> Result<()> {
//! let inputs = CfeInputs {
//!     subjects: "subjects.txt".into(),
//!     template: "template.fxl".into(),
//!     design: "design.txt".into(),
//!     contrast: "contrast.txt".into(),
//!     tracks: "tracks.tck".into(),
//!     output_prefix: "results/cfe".to_string(),
//! };
//! let config = CfeConfig::default().num_perms(1000).seed(1);
//! let written = run_analysis(&inputs, &config)?;
//! println!("{} files written", written.len());
//! # Ok(())
//! # }
//! ```
#![deny(missing_debug_implementations)]
#![warn(missing_docs, unused_extern_crates, unused_results)]

#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate num_derive;

pub mod affine;
pub mod analysis;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod glm;
pub mod header;
pub mod image;
pub mod index;
pub mod mapping;
pub mod matrix_io;
pub mod output;
pub mod permutation;
pub mod reader;
pub mod subject;
pub mod tfce;
pub mod tracks;
mod util;
pub mod writer;

pub use crate::analysis::{run_analysis, run_analysis_with_tracks, CfeInputs};
pub use crate::config::CfeConfig;
pub use crate::connectivity::{ConnectivityMatrix, RawConnectivity, SmoothingWeights};
pub use crate::error::{FixelError, Result};
pub use crate::header::{FixelHeader, ValueType};
pub use crate::image::{FixelImage, FixelMetric};
pub use crate::index::FixelIndex;
pub use crate::tfce::{ConnectivityEnhancer, Enhancer};
pub use crate::tracks::{TckReader, TrackSource, VecTrackSource};
pub use crate::writer::WriterOptions;
