//! Normalisation and thresholding of raw connectivity counts.

use super::RawConnectivity;
use crate::config::CfeConfig;
use log::info;
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::f32::consts::PI;

/// Thresholded connectivity fractions raised to the connectivity exponent.
///
/// Every fixel is connected to itself with a value of exactly 1.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectivityMatrix {
    rows: Vec<BTreeMap<usize, f32>>,
}

impl ConnectivityMatrix {
    /// Build a matrix from explicit rows.
    pub fn from_rows(rows: Vec<BTreeMap<usize, f32>>) -> Self {
        ConnectivityMatrix { rows }
    }

    /// Number of fixels.
    pub fn num_fixels(&self) -> usize {
        self.rows.len()
    }

    /// Neighbours of a fixel with their connectivity values.
    pub fn row(&self, fixel: usize) -> &BTreeMap<usize, f32> {
        &self.rows[fixel]
    }

    /// Total number of stored (directed) entries.
    pub fn num_entries(&self) -> usize {
        self.rows.iter().map(BTreeMap::len).sum()
    }
}

/// Per-fixel smoothing kernels. The weights of every fixel sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingWeights {
    rows: Vec<BTreeMap<usize, f32>>,
}

impl SmoothingWeights {
    /// Number of fixels.
    pub fn num_fixels(&self) -> usize {
        self.rows.len()
    }

    /// Neighbours of a fixel with their smoothing weights.
    pub fn row(&self, fixel: usize) -> &BTreeMap<usize, f32> {
        &self.rows[fixel]
    }

    /// Smooth a column of per-fixel values: every output is the weighted sum
    /// of the input values over the fixel's kernel.
    pub fn apply(&self, values: &[f32]) -> Vec<f32> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|(&n, &w)| values[n] * w).sum())
            .collect()
    }
}

/// Turn raw co-visitation counts into the connectivity matrix used for
/// enhancement and the kernel used for smoothing.
///
/// The connectivity fraction of a pair is its count divided by the TDI of the
/// row's fixel. Fractions not exceeding the connectivity threshold are
/// discarded. When smoothing is enabled, each surviving neighbour also gets a
/// Gaussian spatial weight scaled by its fraction, kept if it exceeds the same
/// threshold. Every fixel is then connected to itself (value 1) and gets the
/// Gaussian peak as its own smoothing weight, and smoothing rows are rescaled
/// to sum to 1.
pub fn normalise(
    raw: &RawConnectivity,
    positions: &[Point3<f32>],
    config: &CfeConfig,
) -> (ConnectivityMatrix, SmoothingWeights) {
    let num_fixels = raw.num_fixels();
    let threshold = config.get_connectivity_threshold();
    let tfce_c = config.get_tfce_c();
    let std_dev = config.smooth_std_dev();
    let do_smoothing = std_dev > 0.0;
    let gaussian_const2 = 2.0 * std_dev * std_dev;
    let gaussian_const1 = if do_smoothing {
        1.0 / (std_dev * (2.0 * PI).sqrt())
    } else {
        1.0
    };

    info!("normalising and thresholding fixel-fixel connectivity matrix...");
    let mut connectivity = Vec::with_capacity(num_fixels);
    let mut smoothing = Vec::with_capacity(num_fixels);
    for fixel in 0..num_fixels {
        let tdi = raw.tdi()[fixel] as f32;
        let mut conn_row = BTreeMap::new();
        let mut smooth_row = BTreeMap::new();
        for (&neighbour, &count) in raw.row(fixel) {
            let fraction = count as f32 / tdi;
            if !(fraction > threshold) {
                continue;
            }
            if do_smoothing {
                let distance2 = (positions[fixel] - positions[neighbour]).norm_squared();
                let weight = fraction * gaussian_const1 * (-distance2 / gaussian_const2).exp();
                if weight > threshold {
                    let _ = smooth_row.insert(neighbour, weight);
                }
            }
            let _ = conn_row.insert(neighbour, fraction.powf(tfce_c));
        }
        let _ = conn_row.insert(fixel, 1.0);
        let _ = smooth_row.insert(fixel, gaussian_const1);

        let sum: f32 = smooth_row.values().sum();
        for w in smooth_row.values_mut() {
            *w /= sum;
        }
        connectivity.push(conn_row);
        smoothing.push(smooth_row);
    }

    let connectivity = ConnectivityMatrix::from_rows(connectivity);
    info!(
        "{} connectivity entries kept across {} fixels",
        connectivity.num_entries(),
        num_fixels
    );
    (connectivity, SmoothingWeights { rows: smoothing })
}
