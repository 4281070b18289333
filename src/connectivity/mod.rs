//! Fixel-fixel connectivity derived from streamlines.
//!
//! Streamlines are mapped to fixels and every pair of fixels visited by the
//! same streamline gets its co-visitation count incremented. The raw counts
//! are then normalised into connectivity fractions, thresholded, and turned
//! into the smoothing kernel and the enhancement neighbourhoods.

pub mod builder;
pub mod normalise;

pub use self::builder::{build_connectivity, TrackProcessor};
pub use self::normalise::{normalise, ConnectivityMatrix, SmoothingWeights};

use std::collections::BTreeMap;

/// Raw streamline co-visitation counts between fixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawConnectivity {
    counts: Vec<BTreeMap<usize, u32>>,
    tdi: Vec<u32>,
}

impl RawConnectivity {
    /// Empty counts for the given number of fixels.
    pub fn new(num_fixels: usize) -> Self {
        RawConnectivity {
            counts: vec![BTreeMap::new(); num_fixels],
            tdi: vec![0; num_fixels],
        }
    }

    /// Number of fixels.
    pub fn num_fixels(&self) -> usize {
        self.tdi.len()
    }

    /// Co-visitation counts of a fixel with its neighbours.
    pub fn row(&self, fixel: usize) -> &BTreeMap<usize, u32> {
        &self.counts[fixel]
    }

    /// Co-visitation count between two fixels.
    pub fn count(&self, a: usize, b: usize) -> u32 {
        self.counts[a].get(&b).copied().unwrap_or(0)
    }

    /// Number of streamline samples assigned to each fixel.
    pub fn tdi(&self) -> &[u32] {
        &self.tdi
    }

    /// Record one streamline's visits.
    ///
    /// Every fixel in `visited` has its TDI incremented, and every pair of list
    /// positions naming two different fixels gets a symmetric count increment.
    /// Repeated visits are not collapsed.
    pub fn add_streamline(&mut self, visited: &[usize]) {
        for &f in visited {
            self.tdi[f] += 1;
        }
        for (i, &a) in visited.iter().enumerate() {
            for &b in &visited[i + 1..] {
                if a == b {
                    continue;
                }
                *self.counts[a].entry(b).or_insert(0) += 1;
                *self.counts[b].entry(a).or_insert(0) += 1;
            }
        }
    }

    /// Set a symmetric pair count directly.
    pub fn set_pair(&mut self, a: usize, b: usize, count: u32) {
        let _ = self.counts[a].insert(b, count);
        let _ = self.counts[b].insert(a, count);
    }

    /// Set the TDI of a fixel directly.
    pub fn set_tdi(&mut self, fixel: usize, tdi: u32) {
        self.tdi[fixel] = tdi;
    }

    /// Fold the counts of another partial accumulation into this one.
    pub fn merge(&mut self, other: RawConnectivity) {
        for (mine, theirs) in self.tdi.iter_mut().zip(other.tdi) {
            *mine += theirs;
        }
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts) {
            for (k, v) in theirs {
                *mine.entry(k).or_insert(0) += v;
            }
        }
    }

    /// Total number of stored (directed) entries.
    pub fn num_entries(&self) -> usize {
        self.counts.iter().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_counts_are_symmetric() {
        let mut raw = RawConnectivity::new(4);
        raw.add_streamline(&[0, 1, 2]);
        raw.add_streamline(&[2, 3]);
        raw.add_streamline(&[1, 2, 1]);
        for a in 0..4 {
            for b in 0..4 {
                assert_eq!(raw.count(a, b), raw.count(b, a));
            }
        }
        assert_eq!(raw.count(1, 2), 3);
        assert_eq!(raw.count(1, 1), 0);
        assert_eq!(raw.tdi(), &[1, 3, 3, 1]);
    }

    #[test]
    fn distinct_fixels_give_k_times_k_minus_one() {
        let mut raw = RawConnectivity::new(5);
        raw.add_streamline(&[0, 1, 2, 3, 4]);
        let total: u32 = (0..5).map(|f| raw.row(f).values().sum::<u32>()).sum();
        assert_eq!(total, 5 * 4);
    }

    #[test]
    fn merge_adds_counts() {
        let mut a = RawConnectivity::new(3);
        a.add_streamline(&[0, 1]);
        let mut b = RawConnectivity::new(3);
        b.add_streamline(&[0, 1, 2]);
        a.merge(b);
        assert_eq!(a.count(0, 1), 2);
        assert_eq!(a.count(2, 1), 1);
        assert_eq!(a.tdi(), &[2, 2, 1]);
    }
}
