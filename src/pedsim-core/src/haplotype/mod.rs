//! Haplotype propagation engine (§4.3): Y-STR stepwise mutation with
//! optional ladder bounds, plus the 2-locus autosomal model in
//! [`autosomal`].

pub mod autosomal;

use std::collections::VecDeque;

use log::{debug, warn};

use crate::cancel::CancellationProbe;
use crate::individual::{Haplotype, IndividualId};
use crate::pedigree::Pedigree;
use crate::population::Population;
use crate::rng::RandomSource;

#[derive(Debug, thiserror::Error)]
pub enum HaplotypeError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("cancelled")]
    Cancelled,
}

/// Per-locus `[min, max]` bounds on legal allele values under stepwise
/// mutation (the GLOSSARY's "Ladder").
#[derive(Debug, Clone)]
pub struct Ladder {
    pub min: Vec<i64>,
    pub max: Vec<i64>,
}

impl Ladder {
    fn validate(&self, n_loci: usize) -> Result<(), HaplotypeError> {
        if self.min.len() != n_loci || self.max.len() != n_loci {
            return Err(HaplotypeError::InvalidArgument(
                "ladder bounds length does not match locus count".into(),
            ));
        }
        if self.min.iter().zip(&self.max).any(|(lo, hi)| lo > hi) {
            return Err(HaplotypeError::InvalidArgument(
                "ladder min must not exceed max at any locus".into(),
            ));
        }
        Ok(())
    }
}

/// Founder-draw customization points (§4.3.1), mirroring the teacher's
/// enum-of-strategies idiom for simulation parameters.
#[derive(Debug, Clone)]
pub enum FounderDraw {
    /// Start from an all-zero haplotype, then mutate once.
    Zero,
    /// One explicit allele vector per founder, consumed in pid order.
    Custom(Vec<Vec<i64>>),
    /// Sample each locus uniformly within `[min, max]`, then mutate once.
    Ladder { min: Vec<i64>, max: Vec<i64> },
}

fn draw_founder_alleles(
    draw: &FounderDraw,
    founder_index: usize,
    n_loci: usize,
    rng: &mut dyn RandomSource,
) -> Result<Vec<i64>, HaplotypeError> {
    match draw {
        FounderDraw::Zero => Ok(vec![0; n_loci]),
        FounderDraw::Custom(values) => values.get(founder_index).cloned().ok_or_else(|| {
            HaplotypeError::InvalidArgument(format!(
                "no custom haplotype supplied for founder #{founder_index}"
            ))
        }),
        FounderDraw::Ladder { min, max } => {
            if min.len() != n_loci || max.len() != n_loci {
                return Err(HaplotypeError::InvalidArgument(
                    "founder ladder bounds length does not match locus count".into(),
                ));
            }
            Ok((0..n_loci)
                .map(|l| {
                    let span = (max[l] - min[l] + 1) as usize;
                    min[l] + rng.randint(span) as i64
                })
                .collect())
        }
    }
}

/// Mutates `haplotype` exactly once, in place. Fails with `InvalidState` if
/// it was already mutated (§3: "once set is only mutated immediately after
/// setting").
fn mutate_once(
    haplotype: &mut Haplotype,
    mutation_rates: &[f64],
    ladder: Option<&Ladder>,
    rng: &mut dyn RandomSource,
) -> Result<(), HaplotypeError> {
    if haplotype.mutated {
        return Err(HaplotypeError::InvalidState(
            "haplotype already mutated".into(),
        ));
    }
    if mutation_rates.len() != haplotype.alleles.len() {
        return Err(HaplotypeError::InvalidArgument(
            "mutation rate vector does not match locus count".into(),
        ));
    }
    if let Some(ladder) = ladder {
        ladder.validate(haplotype.alleles.len())?;
    }
    for (l, allele) in haplotype.alleles.iter_mut().enumerate() {
        let mu = mutation_rates[l];
        if !(0.0..=1.0).contains(&mu) {
            return Err(HaplotypeError::InvalidArgument(format!(
                "mutation rate at locus {l} must lie in [0, 1]"
            )));
        }
        if let Some(ladder) = ladder {
            if *allele < ladder.min[l] || *allele > ladder.max[l] {
                return Err(HaplotypeError::InvalidArgument(format!(
                    "allele {allele} at locus {l} lies outside its ladder"
                )));
            }
        }
        if rng.unif() >= mu {
            continue;
        }
        let direction = match ladder {
            Some(ladder) => {
                let at_min = *allele == ladder.min[l];
                let at_max = *allele == ladder.max[l];
                match (at_min, at_max) {
                    (true, true) => {
                        return Err(HaplotypeError::InvalidArgument(format!(
                            "locus {l} has no legal mutation step: ladder collapses to a single value"
                        )))
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
                }
            }
            None => {
                if rng.unif() < 0.5 {
                    1
                } else {
                    -1
                }
            }
        };
        *allele += direction;
    }
    haplotype.mutated = true;
    Ok(())
}

/// Draws founder haplotypes and propagates them stepwise down `pedigree`
/// (§4.3.1). `n_loci` is taken from `mutation_rates.len()`.
pub fn populate_haplotypes_ystr(
    population: &mut Population,
    pedigree: &Pedigree,
    mutation_rates: &[f64],
    ladder: Option<&Ladder>,
    founder_draw: &FounderDraw,
    rng: &mut dyn RandomSource,
    cancel: &dyn CancellationProbe,
) -> Result<(), HaplotypeError> {
    if cancel.cancelled() {
        warn!("cancellation probe tripped before Y-STR propagation over pedigree {:?}", pedigree.id());
        return Err(HaplotypeError::Cancelled);
    }
    let n_loci = mutation_rates.len();
    debug!(
        "propagating {n_loci}-locus Y-STR haplotypes over pedigree {:?} ({} members)",
        pedigree.id(),
        pedigree.members().len()
    );
    let mut members: Vec<IndividualId> = pedigree.members().to_vec();
    members.sort_by_key(|&id| population.get(id).unwrap().pid());

    let founders: Vec<IndividualId> = members
        .iter()
        .copied()
        .filter(|&id| population.get(id).unwrap().is_founder())
        .collect();

    let mut queue = VecDeque::new();
    for (founder_index, &id) in founders.iter().enumerate() {
        let ind = population.get_mut(id).expect("member exists");
        if ind.haplotype_set() {
            queue.push_back(id);
            continue;
        }
        let alleles = draw_founder_alleles(founder_draw, founder_index, n_loci, rng)?;
        let ind = population.get_mut(id).expect("member exists");
        ind.set_haplotype(alleles);
        mutate_once(
            ind.haplotype_mut().expect("just set"),
            mutation_rates,
            ladder,
            rng,
        )?;
        queue.push_back(id);
    }

    while let Some(parent_id) = queue.pop_front() {
        let children: Vec<IndividualId> = population
            .get(parent_id)
            .expect("member exists")
            .children()
            .to_vec();
        let parent_alleles = population
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
            let child_ind = population.get_mut(child).expect("child is a pedigree member");
            if child_ind.haplotype_set() {
                queue.push_back(child);
                continue;
            }
            child_ind.set_haplotype(parent_alleles.clone());
            mutate_once(
                child_ind.haplotype_mut().expect("just set"),
                mutation_rates,
                ladder,
                rng,
            )?;
            queue.push_back(child);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pedigree::build_pedigrees;
    use crate::rng::{FastrandSource, MockRandomSource};
    use crate::sampler::{sample_genealogy, GenerationLimit, SamplerConfig};

    fn one_pedigree() -> (Population, Pedigree) {
        let mut rng = FastrandSource::seeded(4);
        let result = sample_genealogy(
            &SamplerConfig {
                population_size: 4,
                generations: GenerationLimit::Fixed(3),
                keep_k_generations: None,
                verbose: false,
            },
            &mut rng,
            &crate::cancel::NeverCancelled,
        )
        .unwrap();
        let mut population = result.population;
        let mut pedigrees = build_pedigrees(&mut population).unwrap();
        (population, pedigrees.remove(0))
    }

    #[test]
    fn every_member_ends_with_a_haplotype() {
        let (mut population, pedigree) = one_pedigree();
        let mut rng = FastrandSource::seeded(9);
        populate_haplotypes_ystr(
            &mut population,
            &pedigree,
            &[0.3],
            None,
            &FounderDraw::Zero,
            &mut rng,
            &crate::cancel::NeverCancelled,
        )
        .unwrap();
        for &id in pedigree.members() {
            assert!(population.get(id).unwrap().haplotype_set());
        }
    }

    #[test]
    fn ladder_collapsed_to_single_value_is_invalid() {
        let mut haplotype = Haplotype::new(vec![5]);
        let ladder = Ladder {
            min: vec![5],
            max: vec![5],
        };
        let mut rng = MockRandomSource::new();
        rng.expect_unif().return_const(0.0); // always triggers mutation
        let err = mutate_once(&mut haplotype, &[1.0], Some(&ladder), &mut rng).unwrap_err();
        assert!(matches!(err, HaplotypeError::InvalidArgument(_)));
    }

    #[test]
    fn ladder_forces_upward_step_at_min() {
        let mut haplotype = Haplotype::new(vec![5]);
        let ladder = Ladder {
            min: vec![5],
            max: vec![6],
        };
        let mut rng = MockRandomSource::new();
        rng.expect_unif().return_const(0.0);
        mutate_once(&mut haplotype, &[1.0], Some(&ladder), &mut rng).unwrap();
        assert_eq!(haplotype.alleles, vec![6]);
    }

    #[test]
    fn mutating_twice_fails_with_invalid_state() {
        let mut haplotype = Haplotype::new(vec![5]);
        haplotype.mutated = true;
        let mut rng = MockRandomSource::new();
        let err = mutate_once(&mut haplotype, &[0.1], None, &mut rng).unwrap_err();
        assert!(matches!(err, HaplotypeError::InvalidState(_)));
    }

    #[test]
    fn out_of_ladder_allele_is_rejected() {
        let mut haplotype = Haplotype::new(vec![10]);
        let ladder = Ladder {
            min: vec![0],
            max: vec![5],
        };
        let mut rng = MockRandomSource::new();
        rng.expect_unif().return_const(0.9);
        let err = mutate_once(&mut haplotype, &[0.1], Some(&ladder), &mut rng).unwrap_err();
        assert!(matches!(err, HaplotypeError::InvalidArgument(_)));
    }
}
