//! Owning container of [`Individual`]s, keyed by a generational arena.
//! Mirrors the teacher's `PedIndividuals`/`SlotMap<IndividualId, _>` arena —
//! the REDESIGN FLAG target replacing manual pointer graphs.

use slotmap::SlotMap;

use crate::individual::{Individual, IndividualId};

/// Free function error for the one fallible link operation on the arena.
#[derive(Debug, thiserror::Error)]
pub enum PopulationError {
    #[error("unknown individual id")]
    UnknownIndividual,
}

/// Constructed empty, grown only by the sampler. `pid` assignment is
/// monotonic (§3 invariant) regardless of the order individuals are later
/// removed or iterated.
#[derive(Debug, Default)]
pub struct Population {
    arena: SlotMap<IndividualId, Individual>,
    next_pid: u64,
}

impl Population {
    #[must_use]
    pub fn new() -> Self {
        Self {
            arena: SlotMap::with_key(),
            next_pid: 1,
        }
    }

    /// Allocates a fresh individual at `generation`, returning its id.
    pub fn spawn(&mut self, generation: u32) -> IndividualId {
        let pid = self.next_pid;
        self.next_pid += 1;
        self.arena.insert_with_key(|id| Individual::new(id, pid, generation))
    }

    #[must_use]
    pub fn get(&self, id: IndividualId) -> Option<&Individual> {
        self.arena.get(id)
    }

    pub fn get_mut(&mut self, id: IndividualId) -> Option<&mut Individual> {
        self.arena.get_mut(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Iterates ids in unspecified order (§5). Consumers requiring
    /// reproducibility should collect and sort by `pid`.
    pub fn ids(&self) -> impl Iterator<Item = IndividualId> + '_ {
        self.arena.keys()
    }

    /// Links `child` to `father`: records the father on the child and
    /// appends the child to the father's child list (§3 invariant).
    pub fn link(
        &mut self,
        child: IndividualId,
        father: IndividualId,
    ) -> Result<(), PopulationError> {
        if !self.arena.contains_key(father) {
            return Err(PopulationError::UnknownIndividual);
        }
        self.arena
            .get_mut(child)
            .ok_or(PopulationError::UnknownIndividual)?
            .set_father(father);
        self.arena
            .get_mut(father)
            .expect("father existence checked above")
            .push_child(child);
        Ok(())
    }

    /// Ids sorted by `pid`, for deterministic downstream processing.
    #[must_use]
    pub fn ids_sorted(&self) -> Vec<IndividualId> {
        let mut ids: Vec<IndividualId> = self.ids().collect();
        ids.sort_by_key(|&id| self.arena[id].pid());
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_assigns_monotonic_pids() {
        let mut population = Population::new();
        let a = population.spawn(0);
        let b = population.spawn(0);
        assert!(population.get(a).unwrap().pid() < population.get(b).unwrap().pid());
    }

    #[test]
    fn link_sets_father_and_child() {
        let mut population = Population::new();
        let child = population.spawn(0);
        let father = population.spawn(1);
        population.link(child, father).unwrap();
        assert_eq!(population.get(child).unwrap().father(), Some(father));
        assert_eq!(population.get(father).unwrap().children(), &[child]);
    }

    #[test]
    fn link_unknown_id_errors() {
        let mut population = Population::new();
        let child = population.spawn(0);
        let mut other = Population::new();
        let stray_father = other.spawn(1);
        assert!(matches!(
            population.link(child, stray_father),
            Err(PopulationError::UnknownIndividual)
        ));
    }
}
