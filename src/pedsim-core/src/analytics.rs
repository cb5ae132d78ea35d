//! Pedigree analytics (§4.4): meiotic distance, LCA path, and the
//! generation×distance histogram. Traversal state lives in local
//! `AHashMap`s keyed by `IndividualId`, never on `Individual` itself (the
//! REDESIGN FLAG in spec.md §9 — this also makes every query re-entrant).

use std::collections::VecDeque;

use ahash::AHashMap;

use crate::individual::IndividualId;
use crate::pedigree::{Pedigree, PedigreeId};
use crate::population::Population;
use crate::table::Table;

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("individual has no pedigree assigned")]
    MissingPedigree,
    #[error("unknown individual id")]
    UnknownIndividual,
    #[error("individuals lie in different pedigrees")]
    CrossPedigree,
}

fn pedigree_of(population: &Population, id: IndividualId) -> Result<PedigreeId, AnalyticsError> {
    population
        .get(id)
        .ok_or(AnalyticsError::UnknownIndividual)?
        .pedigree_id()
        .ok_or(AnalyticsError::MissingPedigree)
}

fn neighbors(population: &Population, id: IndividualId) -> Vec<IndividualId> {
    let ind = population.get(id).expect("caller validated id");
    let mut out: Vec<IndividualId> = ind.children().to_vec();
    if let Some(father) = ind.father() {
        out.push(father);
    }
    out
}

/// Number of parent-child edges on the unique path between `a` and `b`.
/// Returns `-1` if they lie in different pedigrees; fails with
/// `MissingPedigree` if either has no pedigree assigned at all.
pub fn meiotic_dist(
    population: &Population,
    a: IndividualId,
    b: IndividualId,
) -> Result<i64, AnalyticsError> {
    let pedigree_a = pedigree_of(population, a)?;
    let pedigree_b = pedigree_of(population, b)?;
    if pedigree_a != pedigree_b {
        return Ok(-1);
    }
    if a == b {
        return Ok(0);
    }

    let mut distance: AHashMap<IndividualId, i64> = AHashMap::new();
    distance.insert(a, 0);
    let mut queue = VecDeque::new();
    queue.push_back(a);
    while let Some(current) = queue.pop_front() {
        let d = distance[&current];
        for next in neighbors(population, current) {
            if distance.contains_key(&next) {
                continue;
            }
            distance.insert(next, d + 1);
            if next == b {
                return Ok(d + 1);
            }
            queue.push_back(next);
        }
    }
    unreachable!("same pedigree implies a path exists between any two members")
}

/// Root-to-`target` path within `pedigree`, following father links.
fn path_from_root(
    population: &Population,
    pedigree: &Pedigree,
    target: IndividualId,
) -> Vec<IndividualId> {
    let mut path = vec![target];
    let mut current = target;
    while let Some(father) = population.get(current).expect("pedigree member").father() {
        if !pedigree.contains(father) {
            break;
        }
        path.push(father);
        current = father;
    }
    path.reverse();
    path
}

/// `[LCA, ancestors down to a reversed, ancestors down to b]` (§4.4.2).
/// Fails when `a`/`b` are cross-pedigree.
pub fn calculate_path(
    population: &Population,
    pedigree: &Pedigree,
    a: IndividualId,
    b: IndividualId,
) -> Result<Vec<IndividualId>, AnalyticsError> {
    let pedigree_a = pedigree_of(population, a)?;
    let pedigree_b = pedigree_of(population, b)?;
    if pedigree_a != pedigree_b || pedigree_a != pedigree.id() {
        return Err(AnalyticsError::CrossPedigree);
    }
    let path_a = path_from_root(population, pedigree, a);
    let path_b = path_from_root(population, pedigree, b);

    let common_len = path_a
        .iter()
        .zip(path_b.iter())
        .take_while(|(x, y)| x == y)
        .count();
    let lca_index = common_len - 1;

    let mut result = vec![path_a[lca_index]];
    result.extend(path_a[lca_index + 1..].iter().rev().copied());
    result.extend(path_b[lca_index + 1..].iter().copied());
    Ok(result)
}

/// For every member of `pedigree`, tabulates `(generation, meiotic_dist)`
/// relative to `focal`, optionally capped at `generation_cap`. Rows are
/// sorted by `(generation, distance)`.
pub fn meioses_generation_distribution(
    population: &Population,
    pedigree: &Pedigree,
    focal: IndividualId,
    generation_cap: Option<u32>,
) -> Result<Table, AnalyticsError> {
    use std::collections::BTreeMap;
    let mut counts: BTreeMap<(u32, i64), u32> = BTreeMap::new();
    for &member in pedigree.members() {
        let generation = population.get(member).expect("pedigree member").generation();
        if generation_cap.is_some_and(|cap| generation > cap) {
            continue;
        }
        let distance = meiotic_dist(population, focal, member)?;
        *counts.entry((generation, distance)).or_insert(0) += 1;
    }
    let mut table = Table::new();
    for (&(generation, distance), &count) in &counts {
        table.push_row(vec![
            Some(i64::from(generation)),
            Some(distance),
            Some(i64::from(count)),
        ]);
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pedigree::build_pedigrees;
    use crate::population::Population;

    /// Builds grandparent -> parent -> child by hand for the concrete
    /// scenario in spec.md §8.4.
    fn gpc_tree() -> (Population, Pedigree, IndividualId, IndividualId, IndividualId) {
        let mut population = Population::new();
        let grandparent = population.spawn(2);
        let parent = population.spawn(1);
        let child = population.spawn(0);
        population.link(parent, grandparent).unwrap();
        population.link(child, parent).unwrap();
        let mut pedigrees = build_pedigrees(&mut population).unwrap();
        let pedigree = pedigrees.remove(0);
        (population, pedigree, grandparent, parent, child)
    }

    #[test]
    fn known_tree_distances() {
        let (population, _pedigree, g, c, gc) = gpc_tree();
        assert_eq!(meiotic_dist(&population, g, c).unwrap(), 1);
        assert_eq!(meiotic_dist(&population, c, gc).unwrap(), 1);
        assert_eq!(meiotic_dist(&population, g, gc).unwrap(), 2);
        assert_eq!(meiotic_dist(&population, g, g).unwrap(), 0);
    }

    #[test]
    fn distance_is_symmetric() {
        let (population, _pedigree, g, _c, gc) = gpc_tree();
        assert_eq!(
            meiotic_dist(&population, g, gc).unwrap(),
            meiotic_dist(&population, gc, g).unwrap()
        );
    }

    #[test]
    fn cross_pedigree_returns_negative_one() {
        let (mut population, _pedigree, g, _c, _gc) = gpc_tree();
        let stray = population.spawn(0);
        let pedigrees = build_pedigrees(&mut population).unwrap();
        assert_eq!(meiotic_dist(&population, g, stray).unwrap(), -1);
        assert_eq!(pedigrees.len(), 2);
    }

    #[test]
    fn path_to_self_is_a_single_node() {
        let (population, pedigree, g, _c, _gc) = gpc_tree();
        let path = calculate_path(&population, &pedigree, g, g).unwrap();
        assert_eq!(path, vec![g]);
    }

    #[test]
    fn path_between_grandparent_and_grandchild_goes_through_parent_implicitly() {
        let (population, pedigree, g, _c, gc) = gpc_tree();
        let path = calculate_path(&population, &pedigree, g, gc).unwrap();
        assert_eq!(path.first().copied(), Some(g));
        assert_eq!(path.last().copied(), Some(gc));
    }

    #[test]
    fn generation_distance_histogram_is_sorted() {
        let (population, pedigree, g, _c, _gc) = gpc_tree();
        let table = meioses_generation_distribution(&population, &pedigree, g, None).unwrap();
        let mut prev = None;
        for row in table.rows() {
            let key = (row[0].unwrap(), row[1].unwrap());
            if let Some(p) = prev {
                assert!(key >= p);
            }
            prev = Some(key);
        }
    }
}
