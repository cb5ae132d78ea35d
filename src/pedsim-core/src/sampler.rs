//! The genealogy sampler (§4.1): forward-time, patrilineal Wright-Fisher
//! reproduction either with uniform paternal fitness or a gamma-weighted
//! variance-inflated variant.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};

use crate::cancel::CancellationProbe;
use crate::individual::IndividualId;
use crate::population::Population;
use crate::progress::ProgressTicker;
use crate::rng::RandomSource;
use crate::table::Table;

#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("cancelled")]
    Cancelled,
}

/// How many generations to simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationLimit {
    /// Simulate exactly this many generations.
    Fixed(u32),
    /// Simulate until only one distinct father is selected in a step.
    UntilOneFounder,
}

/// Parameters bundled behind a single struct, mirroring the teacher's
/// `PedigreeParams` convention of grouping simulation knobs.
#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub population_size: usize,
    pub generations: GenerationLimit,
    /// Individuals created at generation `g <= keep_k_generations` are
    /// retained in [`SimulationResult::kept_individuals`]. `None` keeps
    /// every generation.
    pub keep_k_generations: Option<u32>,
    pub verbose: bool,
}

/// Shape/scale for the gamma-weighted paternal fitness variant.
#[derive(Debug, Clone, Copy)]
pub struct VarianceConfig {
    pub gamma_shape: f64,
    pub gamma_scale: f64,
}

/// The three M×(G+1) verbose tables: lineage pid, next-generation father
/// pid, and the 1-based father slot index drawn for that transition.
#[derive(Debug, Clone)]
pub struct VerboseTables {
    pub pid: Table,
    pub father_pid: Table,
    pub father_index: Table,
}

#[derive(Debug)]
pub struct SimulationResult {
    pub population: Population,
    pub generations_completed: u32,
    pub founders_left: usize,
    pub end_generation_individuals: Vec<IndividualId>,
    pub kept_individuals: Vec<IndividualId>,
    pub verbose_tables: Option<VerboseTables>,
}

fn validate(cfg: &SamplerConfig) -> Result<(), SamplerError> {
    if cfg.population_size <= 1 {
        return Err(SamplerError::InvalidArgument(
            "population_size must be > 1".into(),
        ));
    }
    if let GenerationLimit::Fixed(g) = cfg.generations {
        if g == 0 {
            return Err(SamplerError::InvalidArgument(
                "generations must be a positive integer or the sentinel".into(),
            ));
        }
    }
    Ok(())
}

/// Uniform paternal-fitness variant (§4.1).
pub fn sample_genealogy(
    cfg: &SamplerConfig,
    rng: &mut dyn RandomSource,
    cancel: &dyn CancellationProbe,
) -> Result<SimulationResult, SamplerError> {
    sample_genealogy_ticked(cfg, rng, cancel, &mut crate::progress::NullTicker)
}

/// Same as [`sample_genealogy`] with an explicit progress ticker.
pub fn sample_genealogy_ticked(
    cfg: &SamplerConfig,
    rng: &mut dyn RandomSource,
    cancel: &dyn CancellationProbe,
    ticker: &mut dyn ProgressTicker,
) -> Result<SimulationResult, SamplerError> {
    validate(cfg)?;
    run(cfg, rng, cancel, ticker, |rng, m_cur| {
        (0..m_cur).map(|_| rng.randint(m_cur)).collect()
    })
}

/// Gamma-weighted variance-inflated variant (§4.1).
pub fn sample_genealogy_variance(
    cfg: &SamplerConfig,
    variance: &VarianceConfig,
    rng: &mut dyn RandomSource,
    cancel: &dyn CancellationProbe,
) -> Result<SimulationResult, SamplerError> {
    sample_genealogy_variance_ticked(cfg, variance, rng, cancel, &mut crate::progress::NullTicker)
}

/// Same as [`sample_genealogy_variance`] with an explicit progress ticker.
pub fn sample_genealogy_variance_ticked(
    cfg: &SamplerConfig,
    variance: &VarianceConfig,
    rng: &mut dyn RandomSource,
    cancel: &dyn CancellationProbe,
    ticker: &mut dyn ProgressTicker,
) -> Result<SimulationResult, SamplerError> {
    validate(cfg)?;
    if variance.gamma_shape <= 0.0 || variance.gamma_scale <= 0.0 {
        return Err(SamplerError::InvalidArgument(
            "gamma shape and scale must be strictly positive".into(),
        ));
    }
    run(cfg, rng, cancel, ticker, |rng, m_cur| {
        let weights: Vec<f64> = (0..m_cur)
            .map(|_| rng.gamma(variance.gamma_shape, variance.gamma_scale))
            .collect();
        let total: f64 = weights.iter().sum();
        let probs: Vec<f64> = weights.iter().map(|w| w / total).collect();
        let mut cumsum = 0.0;
        let cdf: Vec<f64> = probs
            .iter()
            .map(|&p| {
                cumsum += p;
                cumsum
            })
            .collect();
        // Binary search over the unsorted cumulative vector (§9 design
        // note): same distribution as the descending-sort-then-scan
        // original, O(log M) per draw instead of O(M).
        (0..m_cur)
            .map(|_| {
                let u = rng.unif();
                cdf.partition_point(|&c| c < u).min(m_cur - 1)
            })
            .collect()
    })
}

fn run(
    cfg: &SamplerConfig,
    rng: &mut dyn RandomSource,
    cancel: &dyn CancellationProbe,
    ticker: &mut dyn ProgressTicker,
    mut draw_father_indices: impl FnMut(&mut dyn RandomSource, usize) -> Vec<usize>,
) -> Result<SimulationResult, SamplerError> {
    let m = cfg.population_size;
    info!("sampling genealogy: population_size={m}, generations={:?}", cfg.generations);
    let mut population = Population::new();
    let mut ancestors: Vec<IndividualId> = (0..m).map(|_| population.spawn(0)).collect();
    let mut current_gen: Vec<IndividualId> = ancestors.clone();

    let mut kept_individuals: Vec<IndividualId> = if cfg.keep_k_generations.map_or(true, |k| k > 0)
    {
        current_gen.clone()
    } else {
        Vec::new()
    };

    let mut tables = cfg.verbose.then(|| {
        let mut pid = Table::new();
        let initial: Vec<Option<i64>> = ancestors
            .iter()
            .map(|&id| Some(population.get(id).unwrap().pid() as i64))
            .collect();
        pid.push_column(initial);
        VerboseTables {
            pid,
            father_pid: Table::new(),
            father_index: Table::new(),
        }
    });

    let mut gen_index: u32 = 0;
    let mut founders_left = m;

    loop {
        // A `Fixed(g)` request materializes generations 0..g-1, i.e. g-1
        // father-sampling transitions (§8 boundary: G=1 performs no
        // transitions at all and returns the untouched generation-0 slate).
        if let GenerationLimit::Fixed(g) = cfg.generations {
            if gen_index == g - 1 {
                break;
            }
        }
        if cancel.cancelled() {
            warn!("cancellation probe tripped at generation {gen_index}, aborting sampler");
            return Err(SamplerError::Cancelled);
        }
        gen_index += 1;
        let m_cur = current_gen.len();
        let picks = draw_father_indices(rng, m_cur);

        let mut father_slots: BTreeMap<usize, IndividualId> = BTreeMap::new();
        let mut link_record: HashMap<IndividualId, (IndividualId, usize)> = HashMap::new();
        for (i, &child) in current_gen.iter().enumerate() {
            let father_idx = picks[i];
            let father_id = *father_slots
                .entry(father_idx)
                .or_insert_with(|| population.spawn(gen_index));
            population.link(child, father_id).expect("ids allocated above are always valid");
            link_record.insert(child, (father_id, father_idx + 1));
        }
        founders_left = father_slots.len();
        debug!("generation {gen_index}: {m_cur} children resolved to {founders_left} fathers");

        if cfg.keep_k_generations.map_or(true, |k| gen_index <= k) {
            kept_individuals.extend(father_slots.values().copied());
        }

        if let Some(tables) = tables.as_mut() {
            let mut pid_col = vec![None; m];
            let mut father_pid_col = vec![None; m];
            let mut father_index_col = vec![None; m];
            for i in 0..m {
                if let Some(&(father_id, idx1)) = link_record.get(&ancestors[i]) {
                    let pid = population.get(father_id).unwrap().pid() as i64;
                    pid_col[i] = Some(pid);
                    father_pid_col[i] = Some(pid);
                    father_index_col[i] = Some(idx1 as i64);
                }
            }
            tables.pid.push_column(pid_col);
            tables.father_pid.push_column(father_pid_col);
            tables.father_index.push_column(father_index_col);
        }

        for i in 0..m {
            if let Some(&(father_id, _)) = link_record.get(&ancestors[i]) {
                ancestors[i] = father_id;
            }
        }
        current_gen = father_slots.into_values().collect();

        ticker.tick();

        if matches!(cfg.generations, GenerationLimit::UntilOneFounder) && founders_left <= 1 {
            break;
        }
    }

    if let Some(tables) = tables.as_mut() {
        tables.father_pid.pad_column();
        tables.father_index.pad_column();
    }

    info!(
        "genealogy sampling complete: {} individuals across {gen_index} generations, {founders_left} founder(s) left",
        population.len()
    );

    Ok(SimulationResult {
        population,
        generations_completed: gen_index,
        founders_left,
        end_generation_individuals: current_gen,
        kept_individuals,
        verbose_tables: tables,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::{MockCancellationProbe, NeverCancelled};
    use crate::rng::FastrandSource;

    #[test]
    fn rejects_population_size_of_one() {
        let cfg = SamplerConfig {
            population_size: 1,
            generations: GenerationLimit::Fixed(1),
            keep_k_generations: None,
            verbose: false,
        };
        let mut rng = FastrandSource::seeded(0);
        assert!(matches!(
            sample_genealogy(&cfg, &mut rng, &NeverCancelled),
            Err(SamplerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn rejects_zero_generations() {
        let cfg = SamplerConfig {
            population_size: 4,
            generations: GenerationLimit::Fixed(0),
            keep_k_generations: None,
            verbose: false,
        };
        let mut rng = FastrandSource::seeded(0);
        assert!(matches!(
            sample_genealogy(&cfg, &mut rng, &NeverCancelled),
            Err(SamplerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn generation_one_performs_no_transitions() {
        let cfg = SamplerConfig {
            population_size: 4,
            generations: GenerationLimit::Fixed(1),
            keep_k_generations: None,
            verbose: false,
        };
        let mut rng = FastrandSource::seeded(3);
        let result = sample_genealogy(&cfg, &mut rng, &NeverCancelled).unwrap();
        assert_eq!(result.population.len(), 4);
        assert_eq!(result.founders_left, 4);
        for id in result.population.ids() {
            let ind = result.population.get(id).unwrap();
            assert_eq!(ind.generation(), 0);
            assert!(ind.father().is_none());
        }
    }

    #[test]
    fn uniform_small_population_scenario() {
        let cfg = SamplerConfig {
            population_size: 4,
            generations: GenerationLimit::Fixed(3),
            keep_k_generations: None,
            verbose: false,
        };
        let mut rng = FastrandSource::seeded(42);
        let result = sample_genealogy(&cfg, &mut rng, &NeverCancelled).unwrap();
        assert!((5..=12).contains(&result.population.len()));
        for id in result.population.ids() {
            let ind = result.population.get(id).unwrap();
            assert!(ind.generation() <= 2);
            if let Some(father) = ind.father() {
                let father_ind = result.population.get(father).unwrap();
                assert_eq!(father_ind.generation(), ind.generation() + 1);
                assert!(father_ind.children().contains(&id));
            }
        }
    }

    #[test]
    fn sentinel_mode_terminates_on_single_founder() {
        let cfg = SamplerConfig {
            population_size: 10,
            generations: GenerationLimit::UntilOneFounder,
            keep_k_generations: None,
            verbose: false,
        };
        let mut rng = FastrandSource::seeded(99);
        let result = sample_genealogy(&cfg, &mut rng, &NeverCancelled).unwrap();
        assert_eq!(result.founders_left, 1);
        assert_eq!(result.end_generation_individuals.len(), 1);
        let only = result.end_generation_individuals[0];
        assert!(result.population.get(only).unwrap().father().is_none());
    }

    #[test]
    fn cancellation_aborts_with_cancelled_error() {
        let cfg = SamplerConfig {
            population_size: 4,
            generations: GenerationLimit::Fixed(5),
            keep_k_generations: None,
            verbose: false,
        };
        let mut rng = FastrandSource::seeded(1);
        let mut probe = MockCancellationProbe::new();
        probe.expect_cancelled().returning(|| true);
        assert!(matches!(
            sample_genealogy(&cfg, &mut rng, &probe),
            Err(SamplerError::Cancelled)
        ));
    }

    #[test]
    fn verbose_tables_share_width() {
        let cfg = SamplerConfig {
            population_size: 4,
            generations: GenerationLimit::Fixed(3),
            keep_k_generations: None,
            verbose: true,
        };
        let mut rng = FastrandSource::seeded(5);
        let result = sample_genealogy(&cfg, &mut rng, &NeverCancelled).unwrap();
        let tables = result.verbose_tables.unwrap();
        assert_eq!(tables.pid.n_cols(), tables.father_pid.n_cols());
        assert_eq!(tables.pid.n_cols(), tables.father_index.n_cols());
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let cfg = SamplerConfig {
            population_size: 6,
            generations: GenerationLimit::Fixed(4),
            keep_k_generations: None,
            verbose: true,
        };
        let mut rng_a = FastrandSource::seeded(123);
        let mut rng_b = FastrandSource::seeded(123);
        let a = sample_genealogy(&cfg, &mut rng_a, &NeverCancelled).unwrap();
        let b = sample_genealogy(&cfg, &mut rng_b, &NeverCancelled).unwrap();
        assert_eq!(a.population.len(), b.population.len());
        assert_eq!(a.founders_left, b.founders_left);
        assert_eq!(
            a.verbose_tables.unwrap().pid.rows(),
            b.verbose_tables.unwrap().pid.rows()
        );
    }
}
