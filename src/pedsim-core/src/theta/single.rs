//! Single-subpopulation theta (§4.5.1): one-parameter QR least-squares fit.

use ahash::AHashMap;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use super::{ThetaError, ThetaEstimate};
use crate::individual::IndividualId;
use crate::population::Population;

/// Given a sample of `n` diploid 2-allele genotypes `(a, b)` (order within
/// the pair does not matter), estimates theta via the one-parameter
/// least-squares fit described in §4.5.1.
pub fn estimate_theta_1subpop_genotypes(
    genotypes: &[(usize, usize)],
) -> Result<ThetaEstimate, ThetaError> {
    if genotypes.is_empty() {
        return Err(ThetaError::InvalidArgument(
            "at least one genotype is required".into(),
        ));
    }
    let n = genotypes.len() as f64;
    debug!("estimating single-subpopulation theta from {} genotypes", genotypes.len());

    let mut allele_counts: AHashMap<usize, f64> = AHashMap::new();
    let mut genotype_counts: AHashMap<(usize, usize), f64> = AHashMap::new();
    for &(a, b) in genotypes {
        *allele_counts.entry(a).or_insert(0.0) += 1.0;
        *allele_counts.entry(b).or_insert(0.0) += 1.0;
        let key = if a <= b { (a, b) } else { (b, a) };
        *genotype_counts.entry(key).or_insert(0.0) += 1.0;
    }
    let p = |allele: usize| allele_counts.get(&allele).copied().unwrap_or(0.0) / (2.0 * n);

    if genotype_counts.len() == 1 {
        warn!("theta estimate under-determined: only one unique genotype observed");
        return Ok(ThetaEstimate::failed(0.0, "Only one genotype observed"));
    }

    let mut x_rows = Vec::with_capacity(genotype_counts.len());
    let mut y_rows = Vec::with_capacity(genotype_counts.len());
    for (&(a, b), &count) in &genotype_counts {
        let p_ab = count / n;
        if a == b {
            let p_a = p(a);
            x_rows.push(p_a - p_a * p_a);
            y_rows.push(p_ab - p_a * p_a);
        } else {
            let (p_a, p_b) = (p(a), p(b));
            x_rows.push(-2.0 * p_a * p_b);
            y_rows.push(p_ab - 2.0 * p_a * p_b);
        }
    }

    let x = DMatrix::from_vec(x_rows.len(), 1, x_rows);
    let y = DVector::from_vec(y_rows);
    let Some(solution) = x.clone().qr().solve(&y) else {
        warn!("QR decomposition failed while solving for theta");
        return Ok(ThetaEstimate::failed(0.0, "QR decomposition failed"));
    };
    let theta_hat = solution[0];
    if !(0.0..=1.0).contains(&theta_hat) {
        warn!("theta estimate {theta_hat} lies outside [0, 1]");
        return Ok(ThetaEstimate::failed(
            theta_hat,
            format!("estimate {theta_hat} lies outside [0, 1]"),
        ));
    }
    Ok(ThetaEstimate::ok(theta_hat))
}

/// Convenience wrapper over [`estimate_theta_1subpop_genotypes`] that reads
/// genotypes directly off `Population`/`Individual` state rather than
/// requiring the caller to have already extracted raw `(a, b)` pairs.
pub fn estimate_theta_1subpop_individuals(
    population: &Population,
    individuals: &[IndividualId],
) -> Result<ThetaEstimate, ThetaError> {
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
    estimate_theta_1subpop_genotypes(&genotypes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repeated(genotype: (usize, usize), n: usize) -> Vec<(usize, usize)> {
        std::iter::repeat(genotype).take(n).collect()
    }

    #[test]
    fn single_unique_genotype_is_under_determined() {
        let genotypes = repeated((1, 1), 10);
        let result = estimate_theta_1subpop_genotypes(&genotypes).unwrap();
        assert!(result.error);
        assert_eq!(result.details, "Only one genotype observed");
    }

    #[test]
    fn empty_sample_is_invalid_argument() {
        assert!(matches!(
            estimate_theta_1subpop_genotypes(&[]),
            Err(ThetaError::InvalidArgument(_))
        ));
    }

    #[test]
    fn mixed_genotypes_yield_bounded_estimate() {
        let mut genotypes = repeated((1, 1), 50);
        genotypes.extend(repeated((1, 2), 30));
        genotypes.extend(repeated((2, 2), 20));
        let result = estimate_theta_1subpop_genotypes(&genotypes).unwrap();
        assert!(!result.error);
        assert_eq!(result.details, "OK");
        assert!((0.0..=1.0).contains(&result.estimate));
    }
}
