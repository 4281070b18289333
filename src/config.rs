//! Run-wide analysis parameters.
//!
//! A [`CfeConfig`] is built once, validated, and then passed by reference to
//! every stage of the analysis. It is never modified afterwards.
//!
//! # Example
//!
//! ```
//! use fixelcfe::CfeConfig;
//! # use fixelcfe::Result;
//!
//! # fn run() -> Result<()> {
//! let config = CfeConfig::default()
//!     .num_perms(1000)
//!     .smooth_fwhm(5.)
//!     .seed(42);
//! config.validate()?;
//! assert_eq!(config.get_num_perms(), 1000);
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```

use crate::error::{FixelError, Result};
use crate::util::angular_threshold_dp;

/// Ratio between the full width at half maximum of a Gaussian and its
/// standard deviation.
pub const FWHM_TO_STD_DEV: f32 = 2.3548;

/// Track counts below this produce a warning about connectivity robustness.
pub const RECOMMENDED_TRACK_COUNT: usize = 1_000_000;

/// Parameters of a connectivity-based fixel enhancement analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct CfeConfig {
    num_perms: usize,
    dh: f32,
    tfce_e: f32,
    tfce_h: f32,
    tfce_c: f32,
    angle: f32,
    connectivity_threshold: f32,
    smooth_fwhm: f32,
    notest: bool,
    seed: Option<u64>,
}

impl Default for CfeConfig {
    fn default() -> Self {
        CfeConfig {
            num_perms: 5000,
            dh: 0.1,
            tfce_e: 2.0,
            tfce_h: 1.0,
            tfce_c: 0.5,
            angle: 30.0,
            connectivity_threshold: 0.01,
            smooth_fwhm: 10.0,
            notest: false,
            seed: None,
        }
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(FixelError::InvalidParameter(name, value))
    }
}

impl CfeConfig {
    /// Set the total number of permutations, the identity labelling included.
    pub fn num_perms(mut self, num_perms: usize) -> Self {
        self.num_perms = num_perms;
        self
    }

    /// Set the height increment of the TFCE integration.
    pub fn dh(mut self, dh: f32) -> Self {
        self.dh = dh;
        self
    }

    /// Set the TFCE extent exponent.
    pub fn tfce_e(mut self, e: f32) -> Self {
        self.tfce_e = e;
        self
    }

    /// Set the TFCE height exponent.
    pub fn tfce_h(mut self, h: f32) -> Self {
        self.tfce_h = h;
        self
    }

    /// Set the exponent applied to connectivity fractions.
    pub fn tfce_c(mut self, c: f32) -> Self {
        self.tfce_c = c;
        self
    }

    /// Set the angular threshold (degrees) for fixel correspondence.
    pub fn angle(mut self, degrees: f32) -> Self {
        self.angle = degrees;
        self
    }

    /// Set the fraction of shared streamlines required for two fixels to be
    /// neighbours.
    pub fn connectivity_threshold(mut self, threshold: f32) -> Self {
        self.connectivity_threshold = threshold;
        self
    }

    /// Set the smoothing kernel FWHM in millimetres. Zero disables smoothing.
    pub fn smooth_fwhm(mut self, fwhm: f32) -> Self {
        self.smooth_fwhm = fwhm;
        self
    }

    /// Skip permutation testing, only producing the GLM outputs.
    pub fn notest(mut self, notest: bool) -> Self {
        self.notest = notest;
        self
    }

    /// Seed the permutation generator for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check that every parameter lies within its accepted range.
    pub fn validate(&self) -> Result<()> {
        check_range("nperms", self.num_perms as f64, 1., 100_000.)?;
        check_range("dh", f64::from(self.dh), 0.001, 100_000.)?;
        check_range("tfce_e", f64::from(self.tfce_e), 0., 100_000.)?;
        check_range("tfce_h", f64::from(self.tfce_h), 0., 100_000.)?;
        check_range("tfce_c", f64::from(self.tfce_c), 0., 100_000.)?;
        check_range("angle", f64::from(self.angle), 0., 90.)?;
        check_range("connectivity", f64::from(self.connectivity_threshold), 0.001, 1.)?;
        check_range("smooth", f64::from(self.smooth_fwhm), 0., 200.)?;
        if !self.notest && self.num_perms < 2 {
            return Err(FixelError::InsufficientPermutations(self.num_perms));
        }
        Ok(())
    }

    /// Total number of permutations.
    pub fn get_num_perms(&self) -> usize {
        self.num_perms
    }

    /// Height increment of the TFCE integration.
    pub fn get_dh(&self) -> f32 {
        self.dh
    }

    /// TFCE extent exponent.
    pub fn get_tfce_e(&self) -> f32 {
        self.tfce_e
    }

    /// TFCE height exponent.
    pub fn get_tfce_h(&self) -> f32 {
        self.tfce_h
    }

    /// Connectivity exponent.
    pub fn get_tfce_c(&self) -> f32 {
        self.tfce_c
    }

    /// Angular threshold in degrees.
    pub fn get_angle(&self) -> f32 {
        self.angle
    }

    /// Connectivity fraction threshold.
    pub fn get_connectivity_threshold(&self) -> f32 {
        self.connectivity_threshold
    }

    /// Smoothing kernel FWHM in millimetres.
    pub fn get_smooth_fwhm(&self) -> f32 {
        self.smooth_fwhm
    }

    /// Whether permutation testing is skipped.
    pub fn get_notest(&self) -> bool {
        self.notest
    }

    /// Permutation generator seed, if any.
    pub fn get_seed(&self) -> Option<u64> {
        self.seed
    }

    /// Standard deviation of the smoothing kernel, in millimetres.
    pub fn smooth_std_dev(&self) -> f32 {
        self.smooth_fwhm / FWHM_TO_STD_DEV
    }

    /// Cosine of the angular threshold, the minimum absolute dot product for
    /// two directions to correspond.
    pub fn angular_threshold_dp(&self) -> f32 {
        angular_threshold_dp(self.angle)
    }
}
