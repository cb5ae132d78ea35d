//! Pedigree builder: partitions a [`Population`] into weakly connected
//! components (§4.2). Each [`Pedigree`] holds only ids — it is a view over
//! the population, never an owner.

use ahash::AHashSet;
use log::{debug, info, warn};
use slotmap::new_key_type;

use crate::cancel::CancellationProbe;
use crate::individual::IndividualId;
use crate::population::Population;

new_key_type! {
    /// Stable reference to a [`Pedigree`] within the `Vec` returned by
    /// [`build_pedigrees`]. Stored on each member `Individual` as
    /// `Option<PedigreeId>` — "0 means unassigned" becomes `None`.
    pub struct PedigreeId;
}

#[derive(Debug, thiserror::Error)]
pub enum PedigreeError {
    #[error("cancelled")]
    Cancelled,
}

/// A connected component of the genealogy graph. Members and relations are
/// recorded once at construction and never pruned (§3 invariant).
#[derive(Debug, Clone)]
pub struct Pedigree {
    id: PedigreeId,
    members: Vec<IndividualId>,
    relations: Vec<(IndividualId, IndividualId)>,
    root: IndividualId,
}

impl Pedigree {
    #[must_use]
    pub fn id(&self) -> PedigreeId {
        self.id
    }

    #[must_use]
    pub fn members(&self) -> &[IndividualId] {
        &self.members
    }

    #[must_use]
    pub fn relations(&self) -> &[(IndividualId, IndividualId)] {
        &self.relations
    }

    #[must_use]
    pub fn root(&self) -> IndividualId {
        self.root
    }

    #[must_use]
    pub fn contains(&self, id: IndividualId) -> bool {
        self.members.iter().any(|&m| m == id)
    }
}

/// Flood-fills every weakly connected component of `population`'s
/// father/children graph into a [`Pedigree`], then stamps the resulting
/// `pedigree_id` back onto every member (§4.2's guarantee that every
/// Individual ends up with a non-null pedigree_id). Consults `cancel`
/// between components.
pub fn build_pedigrees(population: &mut Population) -> Result<Vec<Pedigree>, PedigreeError> {
    build_pedigrees_cancellable(population, &crate::cancel::NeverCancelled)
}

/// Same as [`build_pedigrees`] but with an explicit cancellation probe.
pub fn build_pedigrees_cancellable(
    population: &mut Population,
    cancel: &dyn CancellationProbe,
) -> Result<Vec<Pedigree>, PedigreeError> {
    let mut pedigrees = discover_components(population, cancel)?;
    assign_pedigree_ids(population, &mut pedigrees);
    info!(
        "partitioned {} individuals into {} pedigree(s)",
        population.len(),
        pedigrees.len()
    );
    Ok(pedigrees)
}

fn discover_components(
    population: &Population,
    cancel: &dyn CancellationProbe,
) -> Result<Vec<Pedigree>, PedigreeError> {
    let mut assigned: AHashSet<IndividualId> = AHashSet::new();
    let mut pedigrees = Vec::new();
    // Deterministic ordering even though Population iteration order is
    // unspecified (§5): walk by pid.
    for start in population.ids_sorted() {
        if assigned.contains(&start) {
            continue;
        }
        if cancel.cancelled() {
            warn!("cancellation probe tripped mid pedigree discovery");
            return Err(PedigreeError::Cancelled);
        }
        let mut members = Vec::new();
        let mut relations = Vec::new();
        let mut stack = vec![start];
        assigned.insert(start);
        while let Some(current) = stack.pop() {
            members.push(current);
            let ind = population
                .get(current)
                .expect("pedigree traversal only visits live ids");
            if let Some(father) = ind.father() {
                relations.push((father, current));
                if assigned.insert(father) {
                    stack.push(father);
                }
            }
            for &child in ind.children() {
                if assigned.insert(child) {
                    stack.push(child);
                }
            }
        }
        members.sort_by_key(|&id| population.get(id).unwrap().pid());
        let root = members
            .iter()
            .copied()
            .filter(|&id| population.get(id).unwrap().is_founder())
            .min_by_key(|&id| population.get(id).unwrap().pid())
            .unwrap_or(start);
        debug!("discovered pedigree with {} member(s)", members.len());
        pedigrees.push((members, relations, root));
    }

    // pedigree_id is only assignable once every component has been fully
    // discovered, since we mutate the population to stamp it.
    let mut built = Vec::with_capacity(pedigrees.len());
    for (members, relations, root) in pedigrees {
        built.push(Pedigree {
            id: PedigreeId::default(),
            members,
            relations,
            root,
        });
    }
    Ok(built)
}

/// Stamps `pedigree_id` on every member of every discovered pedigree,
/// allocating real [`PedigreeId`] keys.
fn assign_pedigree_ids(population: &mut Population, pedigrees: &mut [Pedigree]) {
    let mut keys: SlotMapIds = SlotMapIds::default();
    for pedigree in pedigrees.iter_mut() {
        let id = keys.next();
        pedigree.id = id;
        for &member in &pedigree.members {
            if let Some(ind) = population.get_mut(member) {
                ind.set_pedigree_id(id);
            }
        }
    }
}

/// Minimal id allocator so `PedigreeId`s are distinct without needing a
/// second full `SlotMap` just to mint keys.
#[derive(Default)]
struct SlotMapIds {
    arena: slotmap::SlotMap<PedigreeId, ()>,
}

impl SlotMapIds {
    fn next(&mut self) -> PedigreeId {
        self.arena.insert(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::FastrandSource;
    use crate::sampler::{sample_genealogy, GenerationLimit, SamplerConfig};

    fn small_population() -> Population {
        let mut rng = FastrandSource::seeded(11);
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
        result.population
    }

    #[test]
    fn every_individual_ends_in_exactly_one_pedigree() {
        let mut population = small_population();
        let pedigrees = build_pedigrees(&mut population).unwrap();

        let total_members: usize = pedigrees.iter().map(|p| p.members().len()).sum();
        assert_eq!(total_members, population.len());
        for id in population.ids() {
            assert!(population.get(id).unwrap().pedigree_id().is_some());
        }
    }

    #[test]
    fn build_pedigrees_is_idempotent() {
        let mut population = small_population();
        let first = build_pedigrees(&mut population).unwrap();
        let second = build_pedigrees(&mut population).unwrap();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.members(), b.members());
        }
    }

    #[test]
    fn tree_has_no_cycles_edge_count() {
        let mut population = small_population();
        let pedigrees = build_pedigrees(&mut population).unwrap();
        for pedigree in &pedigrees {
            assert_eq!(pedigree.relations().len(), pedigree.members().len() - 1);
        }
    }
}
