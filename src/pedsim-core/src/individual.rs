//! The Individual node and its arena key.

use slotmap::new_key_type;

use crate::pedigree::PedigreeId;

new_key_type! {
    /// Stable, arena-relative reference to an [`Individual`]. Never reused
    /// while the owning [`crate::population::Population`] is alive.
    pub struct IndividualId;
}

/// Informational sex tag, assigned post-hoc by [`crate::sex::assign_random_sexes`].
/// Never consulted by the sampler or the haplotype engine: the simulated
/// lineage is patrilineal regardless of this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Uniform coin flip through the injected random source.
    pub fn random(rng: &mut dyn crate::rng::RandomSource) -> Self {
        if rng.unif() < 0.5 {
            Sex::Male
        } else {
            Sex::Female
        }
    }
}

/// A haplotype: an ordered allele vector plus the single-mutation guard
/// required by the data model (§3: "once set is only mutated immediately
/// after setting").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Haplotype {
    pub alleles: Vec<i64>,
    pub mutated: bool,
}

impl Haplotype {
    #[must_use]
    pub fn new(alleles: Vec<i64>) -> Self {
        Self {
            alleles,
            mutated: false,
        }
    }
}

/// One node of the genealogy. Scratch traversal state (`visited`/`distance`
/// in the source system) is deliberately absent here — analytics operations
/// carry their own auxiliary maps (see `crate::analytics`), so a node never
/// needs resetting between queries.
#[derive(Debug, Clone)]
pub struct Individual {
    id: IndividualId,
    pid: u64,
    generation: u32,
    father: Option<IndividualId>,
    children: Vec<IndividualId>,
    pedigree_id: Option<PedigreeId>,
    sex: Option<Sex>,
    haplotype: Option<Haplotype>,
}

impl Individual {
    pub(crate) fn new(id: IndividualId, pid: u64, generation: u32) -> Self {
        Self {
            id,
            pid,
            generation,
            father: None,
            children: Vec::new(),
            pedigree_id: None,
            sex: None,
            haplotype: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> IndividualId {
        self.id
    }

    #[must_use]
    pub fn pid(&self) -> u64 {
        self.pid
    }

    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[must_use]
    pub fn father(&self) -> Option<IndividualId> {
        self.father
    }

    #[must_use]
    pub fn children(&self) -> &[IndividualId] {
        &self.children
    }

    #[must_use]
    pub fn is_founder(&self) -> bool {
        self.father.is_none()
    }

    #[must_use]
    pub fn pedigree_id(&self) -> Option<PedigreeId> {
        self.pedigree_id
    }

    pub(crate) fn set_pedigree_id(&mut self, id: PedigreeId) {
        self.pedigree_id = Some(id);
    }

    #[must_use]
    pub fn sex(&self) -> Option<Sex> {
        self.sex
    }

    pub fn set_sex(&mut self, sex: Sex) {
        self.sex = Some(sex);
    }

    #[must_use]
    pub fn haplotype(&self) -> Option<&Haplotype> {
        self.haplotype.as_ref()
    }

    #[must_use]
    pub fn haplotype_mut(&mut self) -> Option<&mut Haplotype> {
        self.haplotype.as_mut()
    }

    #[must_use]
    pub fn haplotype_set(&self) -> bool {
        self.haplotype.is_some()
    }

    /// Sets the haplotype for the first time. Returns `false` without
    /// mutating state if a haplotype is already present.
    #[must_use]
    pub fn set_haplotype(&mut self, alleles: Vec<i64>) -> bool {
        if self.haplotype.is_some() {
            return false;
        }
        self.haplotype = Some(Haplotype::new(alleles));
        true
    }

    pub(crate) fn set_father(&mut self, father: IndividualId) {
        self.father = Some(father);
    }

    pub(crate) fn push_child(&mut self, child: IndividualId) {
        self.children.push(child);
    }
}
