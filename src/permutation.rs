//! Non-parametric permutation testing of enhanced statistics.
//!
//! The first permutation is always the identity and yields the observed
//! statistics. Every other permutation contributes the maximum of its enhanced
//! statistic, in each contrast direction, to the null distributions.

use crate::config::CfeConfig;
use crate::error::{FixelError, Result};
use crate::glm::GlmTTest;
use crate::tfce::Enhancer;
use log::{info, warn};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use rayon::prelude::*;
use std::collections::HashSet;

/// Generate `num_perms` relabelings of `num_subjects` subjects, the identity first.
///
/// Relabelings are unique whenever the number of subjects allows for enough
/// distinct ones. Otherwise duplicates are allowed and a warning is emitted.
pub fn generate_permutations<R: Rng>(num_perms: usize, num_subjects: usize, rng: &mut R) -> Vec<Vec<usize>> {
    let identity: Vec<usize> = (0..num_subjects).collect();
    let mut perms = Vec::with_capacity(num_perms);
    if num_perms == 0 {
        return perms;
    }
    let unique = num_perms <= max_unique(num_subjects);
    if !unique {
        warn!(
            "only {} unique relabelings of {} subjects exist; {} permutations will contain duplicates",
            max_unique(num_subjects),
            num_subjects,
            num_perms
        );
    }

    let mut seen = HashSet::new();
    let _ = seen.insert(identity.clone());
    perms.push(identity.clone());
    while perms.len() < num_perms {
        let mut p = identity.clone();
        p.shuffle(rng);
        if unique && !seen.insert(p.clone()) {
            continue;
        }
        perms.push(p);
    }
    perms
}

/// `n!`, saturating.
fn max_unique(n: usize) -> usize {
    (1..=n).fold(1_usize, |acc, k| acc.saturating_mul(k))
}

/// Random number generator for a run: seeded if the configuration asks for
/// reproducibility, from system entropy otherwise.
pub fn rng_from_config(config: &CfeConfig) -> XorShiftRng {
    match config.get_seed() {
        Some(seed) => XorShiftRng::seed_from_u64(seed),
        None => XorShiftRng::from_entropy(),
    }
}

/// Outcome of a permutation test.
#[derive(Debug, Clone, PartialEq)]
pub struct PermutationResults {
    /// Maximum positive enhanced statistic of every non-identity permutation
    pub perm_dist_pos: Vec<f32>,
    /// Maximum negative enhanced statistic of every non-identity permutation
    pub perm_dist_neg: Vec<f32>,
    /// Observed enhanced statistic, positive direction
    pub tfce_pos: Vec<f32>,
    /// Observed enhanced statistic, negative direction
    pub tfce_neg: Vec<f32>,
    /// Observed t statistic
    pub tvalues: Vec<f32>,
}

impl PermutationResults {
    /// One-sided p-values of the positive direction.
    pub fn pvalues_pos(&self) -> Vec<f32> {
        statistic_to_pvalue(&self.perm_dist_pos, &self.tfce_pos)
    }

    /// One-sided p-values of the negative direction.
    pub fn pvalues_neg(&self) -> Vec<f32> {
        statistic_to_pvalue(&self.perm_dist_neg, &self.tfce_neg)
    }
}

fn enhance_both<E: Enhancer>(enhancer: &E, tvalues: &[f32]) -> (Vec<f32>, f32, Vec<f32>, f32) {
    let mut pos = vec![0.0; tvalues.len()];
    let max_pos = enhancer.enhance(tvalues, &mut pos);
    let negated: Vec<f32> = tvalues.iter().map(|t| -t).collect();
    let mut neg = vec![0.0; tvalues.len()];
    let max_neg = enhancer.enhance(&negated, &mut neg);
    (pos, max_pos, neg, max_neg)
}

/// Run the test over the given relabelings, the first of which must be the
/// identity.
///
/// Permutations are evaluated in parallel; each one fills its own slot of the
/// null distributions.
pub fn run_permutations<E>(test: &GlmTTest, enhancer: &E, perms: &[Vec<usize>]) -> Result<PermutationResults>
where
    E: Enhancer + Sync,
{
    if perms.len() < 2 {
        return Err(FixelError::InsufficientPermutations(perms.len()));
    }
    info!("running {} permutations...", perms.len());

    let tvalues = test.tvalues(&perms[0])?;
    let (tfce_pos, _, tfce_neg, _) = enhance_both(enhancer, &tvalues);

    let maxima: Vec<(f32, f32)> = perms[1..]
        .par_iter()
        .map(|p| -> Result<(f32, f32)> {
            let t = test.tvalues(p)?;
            let (_, max_pos, _, max_neg) = enhance_both(enhancer, &t);
            Ok((max_pos, max_neg))
        })
        .collect::<Result<_>>()?;
    let (perm_dist_pos, perm_dist_neg) = maxima.into_iter().unzip();
    info!("{} permutations completed", perms.len());

    Ok(PermutationResults {
        perm_dist_pos,
        perm_dist_neg,
        tfce_pos,
        tfce_neg,
        tvalues,
    })
}

/// Convert statistics to p-values against a null distribution of maxima.
///
/// The p-value of a statistic is `(1 + #{null >= stat}) / (1 + #null)`, the
/// observed labeling counting as a member of its own null distribution.
pub fn statistic_to_pvalue(null: &[f32], stats: &[f32]) -> Vec<f32> {
    let mut sorted = null.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let total = (sorted.len() + 1) as f32;
    stats
        .iter()
        .map(|&s| {
            let below = sorted.partition_point(|&v| v < s);
            (1 + sorted.len() - below) as f32 / total
        })
        .collect()
}
