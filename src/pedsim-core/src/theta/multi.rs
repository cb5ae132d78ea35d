//! Multi-subpopulation theta/f (§4.5.2): the closed-form Weir & Cockerham
//! (1984) variance-components estimator, per Weir's GDA2 (pp. 168-179).
//! Per-allele contributions are accumulated into the three components the
//! book calls `a`, `b`, `c`; we keep that naming as `s1`/`s2`/`s3` sums.

use log::debug;

use super::{ThetaError, ThetaEstimate};
use crate::individual::IndividualId;
use crate::population::Population;

/// The three related quantities reported by §4.5.2: Wright's overall
/// inbreeding coefficient `F` (`F_IT`), the between-subpopulation
/// correlation `theta` (`F_ST`), and the within-subpopulation inbreeding
/// coefficient `f` (`F_IS`), related by `f = (F - theta) / (1 - theta)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiSubpopEstimate {
    pub f_it: ThetaEstimate,
    pub theta: ThetaEstimate,
    pub f_is: ThetaEstimate,
}

struct AlleleSample {
    /// Number of diploid individuals sampled per subpopulation.
    n: Vec<f64>,
    /// Allele frequency of this allele within each subpopulation.
    p: Vec<f64>,
    /// Frequency of heterozygote carriers of this allele within each
    /// subpopulation.
    h: Vec<f64>,
}

/// One allele's contribution to the `a`/`b`/`c` variance components.
fn allele_components(sample: &AlleleSample) -> (f64, f64, f64) {
    let r = sample.n.len() as f64;
    let n_sum: f64 = sample.n.iter().sum();
    let n_bar = n_sum / r;
    let n_sq_sum: f64 = sample.n.iter().map(|n| n * n).sum();
    let nc = (n_sum - n_sq_sum / n_sum) / (r - 1.0);

    let p_bar: f64 = sample
        .n
        .iter()
        .zip(&sample.p)
        .map(|(n, p)| n * p)
        .sum::<f64>()
        / n_sum;
    let s2: f64 = sample
        .n
        .iter()
        .zip(&sample.p)
        .map(|(n, p)| n * (p - p_bar).powi(2))
        .sum::<f64>()
        / ((r - 1.0) * n_bar);
    let h_bar: f64 = sample
        .n
        .iter()
        .zip(&sample.h)
        .map(|(n, h)| n * h)
        .sum::<f64>()
        / n_sum;

    let a = (n_bar / nc)
        * (s2 - (1.0 / (n_bar - 1.0))
            * (p_bar * (1.0 - p_bar) - ((r - 1.0) / r) * s2 - h_bar / 4.0));
    let b = (n_bar / (n_bar - 1.0))
        * (p_bar * (1.0 - p_bar) - ((r - 1.0) / r) * s2
            - (2.0 * n_bar - 1.0) / (4.0 * n_bar) * h_bar);
    let c = h_bar / 2.0;
    (a, b, c)
}

fn allele_samples_from_genotypes(
    subpop_genotypes: &[Vec<(usize, usize)>],
    allele: usize,
) -> AlleleSample {
    let mut n = Vec::with_capacity(subpop_genotypes.len());
    let mut p = Vec::with_capacity(subpop_genotypes.len());
    let mut h = Vec::with_capacity(subpop_genotypes.len());
    for genotypes in subpop_genotypes {
        let n_i = genotypes.len() as f64;
        let mut copies = 0.0;
        let mut carriers = 0.0;
        for &(x, y) in genotypes {
            if x == allele {
                copies += 1.0;
            }
            if y == allele {
                copies += 1.0;
            }
            if (x == allele) != (y == allele) {
                carriers += 1.0;
            }
        }
        n.push(n_i);
        p.push(copies / (2.0 * n_i));
        h.push(carriers / n_i);
    }
    AlleleSample { n, p, h }
}

/// `F`/theta/`f` estimates over `r >= 2` subpopulations, each a list of
/// diploid genotypes at one multiallelic locus, per Weir's GDA2
/// (pp. 168-179). Mirrors [`super::single::estimate_theta_1subpop_genotypes`]'s
/// `{genotypes, individuals}` naming split.
pub fn estimate_theta_subpops_genotypes(
    subpop_genotypes: &[Vec<(usize, usize)>],
) -> Result<MultiSubpopEstimate, ThetaError> {
    if subpop_genotypes.len() < 2 {
        return Err(ThetaError::InvalidArgument(
            "at least two subpopulations are required".into(),
        ));
    }
    if subpop_genotypes.iter().any(Vec::is_empty) {
        return Err(ThetaError::InvalidArgument(
            "every subpopulation needs at least one genotype".into(),
        ));
    }

    let n_alleles = subpop_genotypes
        .iter()
        .flatten()
        .map(|&(x, y)| x.max(y))
        .max()
        .map_or(0, |max| max + 1);
    if n_alleles < 2 {
        return Err(ThetaError::InvalidArgument(
            "at least two distinct alleles are required".into(),
        ));
    }
    debug!(
        "estimating F/theta/f across {} subpopulations, {n_alleles} alleles",
        subpop_genotypes.len()
    );

    let (mut s1, mut s2, mut s3) = (0.0, 0.0, 0.0);
    for allele in 0..n_alleles {
        let sample = allele_samples_from_genotypes(subpop_genotypes, allele);
        let (a, b, c) = allele_components(&sample);
        s1 += a;
        s2 += b;
        s3 += c;
    }

    let total = s1 + s2 + s3;
    let theta = if total == 0.0 {
        ThetaEstimate::failed(0.0, "variance components sum to zero")
    } else {
        bounded_estimate(s1 / total, "theta")
    };
    let f_it = if total == 0.0 {
        ThetaEstimate::failed(0.0, "variance components sum to zero")
    } else {
        bounded_estimate(1.0 - s3 / total, "F")
    };
    let f_is = if (s2 + s3) == 0.0 {
        ThetaEstimate::failed(0.0, "within-subpopulation components sum to zero")
    } else {
        bounded_estimate(1.0 - s3 / (s2 + s3), "f")
    };
    Ok(MultiSubpopEstimate { f_it, theta, f_is })
}

fn bounded_estimate(estimate: f64, name: &str) -> ThetaEstimate {
    if (0.0..=1.0).contains(&estimate) {
        ThetaEstimate::ok(estimate)
    } else {
        ThetaEstimate::failed(estimate, format!("{name} {estimate} lies outside [0, 1]"))
    }
}

/// Convenience wrapper reading genotypes directly off `Population`
/// state, mirroring [`super::single::estimate_theta_1subpop_individuals`].
pub fn estimate_theta_subpops_individuals(
    population: &Population,
    subpops: &[Vec<IndividualId>],
) -> Result<MultiSubpopEstimate, ThetaError> {
    let mut subpop_genotypes = Vec::with_capacity(subpops.len());
    for individuals in subpops {
        let mut genotypes = Vec::with_capacity(individuals.len());
        for &id in individuals {
            let ind = population
                .get(id)
                .ok_or_else(|| ThetaError::InvalidArgument("unknown individual id".into()))?;
            let haplotype = ind.haplotype().ok_or_else(|| {
                ThetaError::InvalidArgument("individual has no haplotype assigned".into())
            })?;
            if haplotype.alleles.len() != 2 {
                return Err(ThetaError::InvalidArgument(
                    "expected a 2-allele autosomal genotype".into(),
                ));
            }
            genotypes.push((haplotype.alleles[0] as usize, haplotype.alleles[1] as usize));
        }
        subpop_genotypes.push(genotypes);
    }
    estimate_theta_subpops_genotypes(&subpop_genotypes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_subpopulations_have_near_zero_theta() {
        let subpop: Vec<(usize, usize)> = vec![(0, 0), (0, 1), (1, 1), (0, 1), (0, 0), (1, 1)];
        let subpops = vec![subpop.clone(), subpop];
        let result = estimate_theta_subpops_genotypes(&subpops).unwrap();
        assert!(!result.theta.error);
        assert!(result.theta.estimate.abs() < 1e-9);
    }

    #[test]
    fn fixed_differences_drive_theta_toward_one() {
        let subpop_a = vec![(0, 0); 10];
        let subpop_b = vec![(1, 1); 10];
        let result = estimate_theta_subpops_genotypes(&[subpop_a, subpop_b]).unwrap();
        assert!(!result.theta.error);
        assert!(result.theta.estimate > 0.9, "theta={}", result.theta.estimate);
    }

    #[test]
    fn f_is_between_theta_and_f_it_relationship_holds() {
        let subpop_a = vec![(0, 0), (0, 1), (1, 1), (0, 1)];
        let subpop_b = vec![(0, 0), (1, 1), (0, 1), (1, 1)];
        let result = estimate_theta_subpops_genotypes(&[subpop_a, subpop_b]).unwrap();
        if !result.theta.error && !result.f_it.error && !result.f_is.error {
            let expected_f_is =
                (result.f_it.estimate - result.theta.estimate) / (1.0 - result.theta.estimate);
            assert!((result.f_is.estimate - expected_f_is).abs() < 1e-9);
        }
    }

    #[test]
    fn single_subpopulation_is_invalid_argument() {
        let subpop = vec![(0, 1), (0, 0)];
        assert!(matches!(
            estimate_theta_subpops_genotypes(&[subpop]),
            Err(ThetaError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_subpopulation_is_invalid_argument() {
        assert!(matches!(
            estimate_theta_subpops_genotypes(&[vec![(0, 0)], vec![]]),
            Err(ThetaError::InvalidArgument(_))
        ));
    }
}
