//! Forward-time Wright-Fisher patrilineal pedigree simulation, haplotype
//! propagation and relatedness analytics.
//!
//! A typical pipeline: [`sampler::sample_genealogy`] grows a [`Population`],
//! [`pedigree::build_pedigrees`] partitions it into connected [`Pedigree`]
//! trees, [`haplotype`] propagates marker alleles down each tree, and
//! [`analytics`] / [`theta`] compute relatedness statistics over the result.

pub mod analytics;
pub mod cancel;
pub mod haplotype;
pub mod individual;
pub mod pedigree;
pub mod population;
pub mod progress;
pub mod rng;
pub mod sampler;
pub mod sex;
pub mod table;
pub mod theta;

pub use individual::{Individual, IndividualId, Sex};
pub use pedigree::{Pedigree, PedigreeId};
pub use population::Population;
pub use table::Table;
