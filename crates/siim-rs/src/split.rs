//! Seeded, stratified partitioning of label records keyed on `has_mask`.
//!
//! Both splits shuffle within each class stratum before partitioning, so
//! train and eval sets carry the same class balance as the full table. The
//! seed is always an explicit argument; there is no ambient RNG state.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

use crate::types::{FoldSplit, ImageRecord};

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("eval fraction {0} is outside (0, 1)")]
    BadFraction(f64),
    #[error("need at least 2 folds, got {0}")]
    TooFewFolds(usize),
    #[error("stratum with {size} records cannot fill {folds} folds")]
    StratumTooSmall { size: usize, folds: usize },
}

/// Partition record indices by the `has_mask` flag.
fn strata(records: &[ImageRecord]) -> (Vec<usize>, Vec<usize>) {
    let mut with_mask = Vec::new();
    let mut without_mask = Vec::new();
    for (i, r) in records.iter().enumerate() {
        if r.has_mask {
            with_mask.push(i);
        } else {
            without_mask.push(i);
        }
    }
    (with_mask, without_mask)
}

/// Split records into disjoint (train, eval) index sets, taking
/// `eval_fraction` of each `has_mask` stratum for eval.
///
/// Index sets are returned sorted ascending for stable output.
pub fn stratified_holdout(
    records: &[ImageRecord],
    eval_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), SplitError> {
    if !(eval_fraction > 0.0 && eval_fraction < 1.0) {
        return Err(SplitError::BadFraction(eval_fraction));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let (with_mask, without_mask) = strata(records);

    let mut train = Vec::new();
    let mut eval = Vec::new();
    for mut stratum in [with_mask, without_mask] {
        stratum.shuffle(&mut rng);
        let n_eval = ((stratum.len() as f64) * eval_fraction).round() as usize;
        let n_eval = n_eval.min(stratum.len());
        eval.extend(stratum.drain(..n_eval));
        train.extend(stratum);
    }

    train.sort_unstable();
    eval.sort_unstable();
    Ok((train, eval))
}

/// Split records into `k` stratified folds.
///
/// Each `has_mask` stratum is shuffled and dealt round-robin across the
/// folds, so every record lands in exactly one eval set and fold class
/// balances stay within one record of each other. Non-empty strata must
/// hold at least `k` records.
pub fn stratified_kfold(
    records: &[ImageRecord],
    k: usize,
    seed: u64,
) -> Result<Vec<FoldSplit>, SplitError> {
    if k < 2 {
        return Err(SplitError::TooFewFolds(k));
    }

    let (with_mask, without_mask) = strata(records);
    for stratum in [&with_mask, &without_mask] {
        if !stratum.is_empty() && stratum.len() < k {
            return Err(SplitError::StratumTooSmall {
                size: stratum.len(),
                folds: k,
            });
        }
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut eval_sets: Vec<Vec<usize>> = vec![Vec::new(); k];
    for mut stratum in [with_mask, without_mask] {
        stratum.shuffle(&mut rng);
        for (i, idx) in stratum.into_iter().enumerate() {
            eval_sets[i % k].push(idx);
        }
    }

    let folds = eval_sets
        .iter()
        .enumerate()
        .map(|(fold, eval)| {
            let mut eval = eval.clone();
            eval.sort_unstable();
            let mut train: Vec<usize> = eval_sets
                .iter()
                .enumerate()
                .filter(|(other, _)| *other != fold)
                .flat_map(|(_, set)| set.iter().copied())
                .collect();
            train.sort_unstable();
            FoldSplit { fold, train, eval }
        })
        .collect();

    Ok(folds)
}
