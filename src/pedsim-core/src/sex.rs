//! Opt-in informational sex assignment over a built pedigree. Grounded in
//! the teacher's `Sex::random` / `assign_random_sex` tree walk, used there to
//! drive X-chromosome inheritance; here it is metadata only, consulted by
//! nothing else in this engine.

use crate::individual::Sex;
use crate::pedigree::Pedigree;
use crate::population::Population;
use crate::rng::RandomSource;

/// Assigns a uniformly random [`Sex`] to every member of `pedigree` that
/// doesn't already carry one.
pub fn assign_random_sexes(
    population: &mut Population,
    pedigree: &Pedigree,
    rng: &mut dyn RandomSource,
) {
    for &id in pedigree.members() {
        let Some(ind) = population.get_mut(id) else {
            continue;
        };
        if ind.sex().is_none() {
            ind.set_sex(Sex::random(rng));
        }
    }
}
