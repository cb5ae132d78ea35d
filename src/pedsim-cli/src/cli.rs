//! Argument definitions, mirroring the teacher's `Cli`/`Commands`/flattened
//! `Args` convention (`clap::Parser` + `Subcommand`), updated to the clap 4
//! derive surface carried by this workspace's dependency table.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pedsim", author, version, about, long_about = None)]
#[command(propagate_version = true)]
/// Forward-time pedigree simulation and relatedness analytics.
pub struct Cli {
    /// Set the verbosity level (-v, -vv, -vvv, ...).
    ///
    /// -v: Info | -vv: Debug | -vvv: Trace. The program emits warnings and
    /// errors even without this flag; use --quiet to suppress warnings too.
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress warnings; only errors are printed.
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Collapses `--verbose`/`--quiet` into the single verbosity scale
    /// `logger::Logger::init` expects (0 = errors only).
    #[must_use]
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose + 1
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sample a genealogy, partition it into pedigrees, propagate
    /// haplotypes and report a summary.
    Simulate(SimulateArgs),
    /// Estimate theta (F_ST) from a single subpopulation's genotypes.
    Theta1subpop(Theta1SubpopArgs),
    /// Estimate F / theta / f across several subpopulations' genotypes.
    ThetaSubpops(ThetaSubpopsArgs),
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Number of individuals sampled at generation 0.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub population_size: usize,

    /// Number of generations to simulate. Ignored if --until-one-founder is set.
    #[arg(short = 'g', long, default_value_t = 5)]
    pub generations: u32,

    /// Simulate until only one distinct founder remains, instead of a fixed
    /// number of generations.
    #[arg(long)]
    pub until_one_founder: bool,

    /// Use the gamma-weighted variance-inflated paternal fitness model
    /// instead of uniform father sampling.
    #[arg(long)]
    pub variance: bool,

    /// Shape parameter of the paternal-fitness Gamma distribution
    /// (only used with --variance).
    #[arg(long, default_value_t = 1.0)]
    pub gamma_shape: f64,

    /// Scale parameter of the paternal-fitness Gamma distribution
    /// (only used with --variance).
    #[arg(long, default_value_t = 1.0)]
    pub gamma_scale: f64,

    /// Per-locus Y-STR mutation rates. One haplotype locus per value.
    #[arg(long, value_delimiter = ',', default_value = "0.001")]
    pub mutation_rates: Vec<f64>,

    /// Deterministic RNG seed.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Emit the sampler's verbose pid/father-pid/father-index tables.
    #[arg(long)]
    pub verbose_tables: bool,

    /// Write the verbose tables to this path instead of stdout (CSV).
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct Theta1SubpopArgs {
    /// Path to a whitespace-separated `allele_a allele_b` genotype file,
    /// one diploid individual per line.
    pub genotypes: PathBuf,
}

#[derive(Args, Debug)]
pub struct ThetaSubpopsArgs {
    /// One genotype file per subpopulation (see `theta-1subpop` for the
    /// file format). At least two are required.
    #[arg(required = true, num_args = 2..)]
    pub genotypes: Vec<PathBuf>,
}
