//! Subcommand implementations. Each function borrows straight off
//! `pedsim_core`'s public operations; this crate adds no simulation logic
//! of its own.

use std::fs;
use std::path::Path;

use located_error::prelude::*;
use log::{debug, info};

use pedsim_core::cancel::NeverCancelled;
use pedsim_core::haplotype::{populate_haplotypes_ystr, FounderDraw};
use pedsim_core::pedigree::build_pedigrees;
use pedsim_core::rng::FastrandSource;
use pedsim_core::sampler::{
    sample_genealogy, sample_genealogy_variance, GenerationLimit, SamplerConfig, VarianceConfig,
};
use pedsim_core::theta::multi::estimate_theta_subpops_genotypes;
use pedsim_core::theta::single::estimate_theta_1subpop_genotypes;

use crate::cli::{Cli, Commands, SimulateArgs, Theta1SubpopArgs, ThetaSubpopsArgs};

pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Simulate(args) => simulate(args),
        Commands::Theta1subpop(args) => theta_1subpop(args),
        Commands::ThetaSubpops(args) => theta_subpops(args),
    }
}

fn simulate(args: &SimulateArgs) -> Result<()> {
    info!(
        "Sampling a genealogy: population_size={}, generations={}",
        args.population_size, args.generations
    );
    let mut rng = FastrandSource::seeded(args.seed);
    let generations = if args.until_one_founder {
        GenerationLimit::UntilOneFounder
    } else {
        GenerationLimit::Fixed(args.generations)
    };
    let cfg = SamplerConfig {
        population_size: args.population_size,
        generations,
        keep_k_generations: None,
        verbose: args.verbose_tables,
    };

    let mut result = if args.variance {
        let variance = VarianceConfig {
            gamma_shape: args.gamma_shape,
            gamma_scale: args.gamma_scale,
        };
        sample_genealogy_variance(&cfg, &variance, &mut rng, &NeverCancelled)
            .loc("sample_genealogy_variance failed")?
    } else {
        sample_genealogy(&cfg, &mut rng, &NeverCancelled).loc("sample_genealogy failed")?
    };

    info!(
        "Sampled {} individuals across {} generations ({} founders left)",
        result.population.len(),
        result.generations_completed,
        result.founders_left
    );

    let pedigrees = build_pedigrees(&mut result.population).loc("build_pedigrees failed")?;
    info!("Partitioned population into {} pedigree(s)", pedigrees.len());

    for pedigree in &pedigrees {
        populate_haplotypes_ystr(
            &mut result.population,
            pedigree,
            &args.mutation_rates,
            None,
            &FounderDraw::Zero,
            &mut rng,
            &NeverCancelled,
        )
        .with_loc(|| format!("haplotype propagation failed for pedigree {:?}", pedigree.id()))?;
    }
    debug!("Haplotypes propagated across every pedigree");

    let report = render_report(&result, &pedigrees);
    match &args.output {
        Some(path) => {
            fs::write(path, &report)
                .with_loc(|| format!("failed to write report to {}", path.display()))?;
        }
        None => println!("{report}"),
    }
    Ok(())
}

fn render_report(
    result: &pedsim_core::sampler::SimulationResult,
    pedigrees: &[pedsim_core::Pedigree],
) -> String {
    use std::fmt::Write as _;
    let mut out = String::new();
    let _ = writeln!(out, "population_size\t{}", result.population.len());
    let _ = writeln!(out, "generations_completed\t{}", result.generations_completed);
    let _ = writeln!(out, "founders_left\t{}", result.founders_left);
    let _ = writeln!(out, "pedigrees\t{}", pedigrees.len());
    for pedigree in pedigrees {
        let _ = writeln!(
            out,
            "pedigree {:?}: {} members, root pid {}",
            pedigree.id(),
            pedigree.members().len(),
            result
                .population
                .get(pedigree.root())
                .map_or(0, pedsim_core::Individual::pid)
        );
    }
    if let Some(tables) = &result.verbose_tables {
        let _ = writeln!(out, "--- pid table ---");
        for row in tables.pid.rows() {
            let cells: Vec<String> = row.iter().map(format_cell).collect();
            let _ = writeln!(out, "{}", cells.join("\t"));
        }
    }
    out
}

fn format_cell(value: &Option<i64>) -> String {
    value.map_or_else(|| "NA".to_string(), |v| v.to_string())
}

fn theta_1subpop(args: &Theta1SubpopArgs) -> Result<()> {
    let genotypes = read_genotype_file(&args.genotypes)?;
    let estimate =
        estimate_theta_1subpop_genotypes(&genotypes).loc("estimate_theta_1subpop failed")?;
    println!("theta\t{}", estimate.estimate);
    println!("error\t{}", estimate.error);
    println!("details\t{}", estimate.details);
    Ok(())
}

fn theta_subpops(args: &ThetaSubpopsArgs) -> Result<()> {
    let mut subpops = Vec::with_capacity(args.genotypes.len());
    for path in &args.genotypes {
        subpops.push(read_genotype_file(path)?);
    }
    let result =
        estimate_theta_subpops_genotypes(&subpops).loc("estimate_theta_subpops failed")?;
    println!(
        "F\t{}\t{}\t{}",
        result.f_it.estimate, result.f_it.error, result.f_it.details
    );
    println!(
        "theta\t{}\t{}\t{}",
        result.theta.estimate, result.theta.error, result.theta.details
    );
    println!(
        "f\t{}\t{}\t{}",
        result.f_is.estimate, result.f_is.error, result.f_is.details
    );
    Ok(())
}

fn read_genotype_file(path: &Path) -> Result<Vec<(usize, usize)>> {
    let contents =
        fs::read_to_string(path).with_loc(|| format!("failed to read {}", path.display()))?;
    let mut genotypes = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let a = fields
            .next()
            .with_loc(|| format!("{}:{}: missing allele a", path.display(), line_no + 1))?;
        let b = fields
            .next()
            .with_loc(|| format!("{}:{}: missing allele b", path.display(), line_no + 1))?;
        let a: usize = a
            .parse()
            .with_loc(|| format!("{}:{}: invalid allele '{a}'", path.display(), line_no + 1))?;
        let b: usize = b
            .parse()
            .with_loc(|| format!("{}:{}: invalid allele '{b}'", path.display(), line_no + 1))?;
        genotypes.push((a, b));
    }
    Ok(genotypes)
}
