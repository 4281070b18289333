//! Threshold-free cluster enhancement over the fixel connectivity graph.

use crate::config::CfeConfig;
use crate::connectivity::ConnectivityMatrix;

/// A transform of a per-fixel statistic into an enhanced statistic.
pub trait Enhancer {
    /// Enhance `stats` into `enhanced` (same length) and return the largest
    /// enhanced value.
    fn enhance(&self, stats: &[f32], enhanced: &mut [f32]) -> f32;
}

/// Cluster enhancement where the extent of a fixel at a given height is the
/// summed connectivity of its neighbours (itself included) whose statistic
/// exceeds that height.
///
/// The score of a fixel integrates `extent^E * height^H * dh` over the heights
/// `dh, 2 dh, ...` lying below its statistic. Non-positive statistics are
/// enhanced to 0.
#[derive(Debug, Clone, Copy)]
pub struct ConnectivityEnhancer<'a> {
    connectivity: &'a ConnectivityMatrix,
    dh: f32,
    e: f32,
    h: f32,
}

impl<'a> ConnectivityEnhancer<'a> {
    /// Enhancer with explicit height increment and exponents.
    pub fn new(connectivity: &'a ConnectivityMatrix, dh: f32, e: f32, h: f32) -> Self {
        ConnectivityEnhancer { connectivity, dh, e, h }
    }

    /// Enhancer with the integration parameters of a run configuration.
    pub fn from_config(connectivity: &'a ConnectivityMatrix, config: &CfeConfig) -> Self {
        Self::new(
            connectivity,
            config.get_dh(),
            config.get_tfce_e(),
            config.get_tfce_h(),
        )
    }

    fn extent(&self, stats: &[f32], fixel: usize, height: f32) -> f32 {
        self.connectivity
            .row(fixel)
            .iter()
            .filter(|&(&n, _)| stats[n] > height)
            .map(|(_, &c)| c)
            .sum()
    }
}

impl<'a> Enhancer for ConnectivityEnhancer<'a> {
    fn enhance(&self, stats: &[f32], enhanced: &mut [f32]) -> f32 {
        debug_assert_eq!(stats.len(), self.connectivity.num_fixels());
        let mut max = 0.0_f32;
        for (fixel, (&stat, out)) in stats.iter().zip(enhanced.iter_mut()).enumerate() {
            let mut score = 0.0;
            let mut k = 1;
            loop {
                let height = k as f32 * self.dh;
                if !(height < stat) {
                    break;
                }
                let extent = self.extent(stats, fixel, height);
                score += extent.powf(self.e) * height.powf(self.h) * self.dh;
                k += 1;
            }
            *out = score;
            max = max.max(score);
        }
        max
    }
}
