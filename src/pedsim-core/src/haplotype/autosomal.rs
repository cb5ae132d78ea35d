//! 2-locus autosomal propagation with theta-correlated genotype sampling
//! (§4.3.2). The "2-locus" terminology refers to the two allele copies at
//! one diploid locus, not two independent loci; no mother individual is
//! tracked in this patrilineal model, so the maternal contribution is
//! always redrawn from the population allele-frequency distribution
//! (theta-corrected), exactly as a founder would be.

use std::collections::VecDeque;

use log::{debug, warn};

use super::{HaplotypeError, Ladder};
use crate::cancel::CancellationProbe;
use crate::individual::IndividualId;
use crate::pedigree::Pedigree;
use crate::population::Population;
use crate::rng::RandomSource;

/// `P(ii) = theta*p_i + (1-theta)*p_i^2`, `P(ij) = (1-theta)*2*p_i*p_j`,
/// flattened in row-major lower-triangular order `(i, j)` for `j <= i`
/// (i.e. 00, 10, 11, 20, 21, 22, ... for K alleles).
#[must_use]
pub fn calc_autosomal_genotype_probs(p: &[f64], theta: f64) -> Vec<f64> {
    let k = p.len();
    let mut out = Vec::with_capacity(k * (k + 1) / 2);
    for i in 0..k {
        for j in 0..=i {
            if i == j {
                out.push(theta * p[i] + (1.0 - theta) * p[i] * p[i]);
            } else {
                out.push((1.0 - theta) * 2.0 * p[i] * p[j]);
            }
        }
    }
    out
}

/// Row `i` gives the cumulative distribution of the partner allele given
/// one parent contributed allele `i` (§4.3.2). Raw joint masses (diagonal
/// `theta*p_i + (1-theta)*p_i^2`, off-diagonal `(1-theta)*p_i*p_j`) are
/// normalized by `p_i` and cumulated.
#[must_use]
pub fn conditional_cumulative_matrix(p: &[f64], theta: f64) -> Vec<Vec<f64>> {
    let k = p.len();
    let mut rows = Vec::with_capacity(k);
    for i in 0..k {
        let mut cumsum = 0.0;
        let row: Vec<f64> = (0..k)
            .map(|j| {
                let raw = if i == j {
                    theta * p[i] + (1.0 - theta) * p[i] * p[i]
                } else {
                    (1.0 - theta) * p[i] * p[j]
                };
                cumsum += raw / p[i];
                cumsum
            })
            .collect();
        rows.push(row);
    }
    rows
}

fn invert_cdf(cdf: &[f64], u: f64) -> usize {
    cdf.partition_point(|&c| c < u).min(cdf.len() - 1)
}

/// Inverts a flattened lower-triangular `(i, j)` index back into `(a, b)`
/// with `a <= b`.
fn unflatten_lower_triangular(flat_index: usize) -> (usize, usize) {
    let mut i = 0;
    let mut remaining = flat_index;
    loop {
        if remaining <= i {
            return (remaining, i);
        }
        remaining -= i + 1;
        i += 1;
    }
}

fn mutate_autosomal_allele(
    allele: i64,
    mu: f64,
    ladder: Option<&Ladder>,
    implicit_max: i64,
    rng: &mut dyn RandomSource,
) -> Result<i64, HaplotypeError> {
    let (min, max) = match ladder {
        Some(l) if !l.min.is_empty() => (l.min[0], l.max[0]),
        _ => (0, implicit_max),
    };
    if allele < min || allele > max {
        return Err(HaplotypeError::InvalidArgument(format!(
            "allele {allele} lies outside its ladder"
        )));
    }
    if !(0.0..=1.0).contains(&mu) {
        return Err(HaplotypeError::InvalidArgument(
            "mutation rate must lie in [0, 1]".into(),
        ));
    }
    if rng.unif() >= mu {
        return Ok(allele);
    }
    let at_min = allele == min;
    let at_max = allele == max;
    let direction = match (at_min, at_max) {
        (true, true) => {
            return Err(HaplotypeError::InvalidArgument(
                "no legal mutation step: ladder collapses to a single value".into(),
            ))
        }
        (true, false) => 1,
        (false, true) => -1,
        (false, false) => {
            if rng.unif() < 0.5 {
                1
            } else {
                -1
            }
        }
    };
    Ok(allele + direction)
}

/// Draws a fresh (a, b) pair from the population distribution: either a
/// founder, or the "maternal side" of a child whose father only supplies
/// one allele.
fn draw_pair(cdf: &[f64], rng: &mut dyn RandomSource) -> (usize, usize) {
    let u = rng.unif();
    unflatten_lower_triangular(invert_cdf(cdf, u))
}

/// Draws founder genotypes and propagates them down `pedigree` under the
/// theta-correlated 2-allele model (§4.3.2).
#[allow(clippy::too_many_arguments)]
pub fn populate_haplotypes_autosomal(
    population: &mut Population,
    pedigree: &Pedigree,
    allele_freqs: &[f64],
    theta: f64,
    mutation_rate: f64,
    ladder: Option<&Ladder>,
    rng: &mut dyn RandomSource,
    cancel: &dyn CancellationProbe,
) -> Result<(), HaplotypeError> {
    if cancel.cancelled() {
        warn!("cancellation probe tripped before autosomal propagation over pedigree {:?}", pedigree.id());
        return Err(HaplotypeError::Cancelled);
    }
    if !(0.0..=1.0).contains(&theta) {
        return Err(HaplotypeError::InvalidArgument(
            "theta must lie in [0, 1]".into(),
        ));
    }
    let k = allele_freqs.len();
    let genotype_cdf = {
        let mut cumsum = 0.0;
        calc_autosomal_genotype_probs(allele_freqs, theta)
            .into_iter()
            .map(|p| {
                cumsum += p;
                cumsum
            })
            .collect::<Vec<f64>>()
    };
    let conditional = conditional_cumulative_matrix(allele_freqs, theta);
    let implicit_max = (k as i64) - 1;
    debug!(
        "propagating 2-locus autosomal genotypes over pedigree {:?} ({k} alleles, theta={theta})",
        pedigree.id()
    );

    let mut members: Vec<IndividualId> = pedigree.members().to_vec();
    members.sort_by_key(|&id| population.get(id).unwrap().pid());
    let founders: Vec<IndividualId> = members
        .iter()
        .copied()
        .filter(|&id| population.get(id).unwrap().is_founder())
        .collect();

    let mut queue = VecDeque::new();
    for &id in &founders {
        let ind = population.get(id).expect("member exists");
        if ind.haplotype_set() {
            queue.push_back(id);
            continue;
        }
        let (a, b) = draw_pair(&genotype_cdf, rng);
        let a = mutate_autosomal_allele(a as i64, mutation_rate, ladder, implicit_max, rng)?;
        let b = mutate_autosomal_allele(b as i64, mutation_rate, ladder, implicit_max, rng)?;
        let (a, b) = if a <= b { (a, b) } else { (b, a) };
        let ind = population.get_mut(id).expect("member exists");
        ind.set_haplotype(vec![a, b]);
        ind.haplotype_mut().expect("just set").mutated = true;
        queue.push_back(id);
    }

    while let Some(parent_id) = queue.pop_front() {
        let children: Vec<IndividualId> = population
            .get(parent_id)
            .expect("member exists")
            .children()
            .to_vec();
        let parent_pair = population
            .get(parent_id)
            .expect("member exists")
            .haplotype()
            .expect("every queued member has a haplotype")
            .alleles
            .clone();
        for child in children {
            if !pedigree.contains(child) {
                continue;
            }
            let child_ind = population.get(child).expect("pedigree member");
            if child_ind.haplotype_set() {
                queue.push_back(child);
                continue;
            }
            let paternal = parent_pair[rng.randint(2)];
            let maternal_index = invert_cdf(&conditional[paternal as usize], rng.unif());
            let a = mutate_autosomal_allele(paternal, mutation_rate, ladder, implicit_max, rng)?;
            let b = mutate_autosomal_allele(
                maternal_index as i64,
                mutation_rate,
                ladder,
                implicit_max,
                rng,
            )?;
            let (a, b) = if a <= b { (a, b) } else { (b, a) };
            let child_ind = population.get_mut(child).expect("pedigree member");
            child_ind.set_haplotype(vec![a, b]);
            child_ind.haplotype_mut().expect("just set").mutated = true;
            queue.push_back(child);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genotype_probs_sum_to_one() {
        let p = [0.2, 0.3, 0.5];
        for theta in [0.0, 0.1, 0.5, 1.0] {
            let probs = calc_autosomal_genotype_probs(&p, theta);
            let sum: f64 = probs.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "theta={theta} sum={sum}");
        }
    }

    #[test]
    fn genotype_probs_match_closed_form() {
        let p = [0.2, 0.3, 0.5];
        let theta = 0.1;
        let probs = calc_autosomal_genotype_probs(&p, theta);
        // order: 00, 10, 11, 20, 21, 22
        let expected_00 = theta * p[0] + (1.0 - theta) * p[0] * p[0];
        let expected_10 = (1.0 - theta) * 2.0 * p[1] * p[0];
        let expected_22 = theta * p[2] + (1.0 - theta) * p[2] * p[2];
        assert!((probs[0] - expected_00).abs() < 1e-12);
        assert!((probs[1] - expected_10).abs() < 1e-12);
        assert!((probs[5] - expected_22).abs() < 1e-12);
    }

    #[test]
    fn unflatten_is_inverse_of_flatten() {
        let k = 4;
        let mut flat_index = 0;
        for i in 0..k {
            for j in 0..=i {
                assert_eq!(unflatten_lower_triangular(flat_index), (j, i));
                flat_index += 1;
            }
        }
    }

    #[test]
    fn conditional_rows_sum_to_one() {
        let p = [0.2, 0.3, 0.5];
        let matrix = conditional_cumulative_matrix(&p, 0.2);
        for row in matrix {
            assert!((row.last().unwrap() - 1.0).abs() < 1e-9);
        }
    }
}
