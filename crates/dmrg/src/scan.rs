//! Coupling scans: the `k` lowest energies at every `J` of a grid.

use std::time::{Duration, Instant};

use serde::Deserialize;
use spinchain::{HamiltonianBuilder, Lattice, ModelKind};
use tn::MPO;

use crate::deflation::{
    DeflationOptions, DeflationResult, ExcitedStateDeflator, DEFAULT_INIT_BOND_DIM, DEFAULT_OVERLAP_TOLERANCE,
    DEFAULT_PENALTY_WEIGHT,
};
use crate::error::{ConfigError, Result};
use crate::optimizer::DmrgOptimizer;
use crate::schedule::SweepSchedule;

// Absorbs rounding in (max - min) / step so the upper end is kept.
const GRID_SLACK: f64 = 1e-9;

/// Run parameters, loadable from TOML. Every field has a default, so a file
/// only needs the entries it changes.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub model: ModelKind,
    pub n: usize,
    /// Local Hilbert-space dimension `2S + 1`.
    pub spin_dim: usize,
    /// Transverse field; unused by the Heisenberg model.
    pub h: f64,
    pub j_min: f64,
    pub j_max: f64,
    pub j_step: f64,
    /// Number of states per coupling.
    pub k: usize,
    pub schedule: SweepSchedule,
    pub penalty_weight: f64,
    pub overlap_tolerance: f64,
    pub init_bond_dim: usize,
    pub seed: String,
    /// Sort each row of energies ascending before it is reported.
    pub sort_energies: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Ising,
            n: 32,
            spin_dim: 3,
            h: 1.0,
            j_min: -2.0,
            j_max: 2.0,
            j_step: 0.1,
            k: 3,
            schedule: SweepSchedule::default(),
            penalty_weight: DEFAULT_PENALTY_WEIGHT,
            overlap_tolerance: DEFAULT_OVERLAP_TOLERANCE,
            init_bond_dim: DEFAULT_INIT_BOND_DIM,
            seed: "excited-dmrg".to_string(),
            sort_energies: true,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.n < 2 {
            return Err(ConfigError::ChainTooShort(self.n));
        }
        if self.k == 0 {
            return Err(ConfigError::NoStates);
        }
        if !self.h.is_finite() {
            return Err(ConfigError::NonFinite("h"));
        }
        coupling_grid(self.j_min, self.j_max, self.j_step)?;
        self.schedule.validate()?;
        self.deflation_options().validate()
    }

    pub fn deflation_options(&self) -> DeflationOptions {
        DeflationOptions {
            penalty_weight: self.penalty_weight,
            overlap_tolerance: self.overlap_tolerance,
            init_bond_dim: self.init_bond_dim,
        }
    }

    /// `"{model}{n}"`, the stem of the output file names.
    pub fn run_name(&self) -> String {
        format!("{}{}", self.model.name(), self.n)
    }
}

/// `J_i = j_min + i·j_step` for every `i` with `J_i ≤ j_max`.
pub fn coupling_grid(j_min: f64, j_max: f64, j_step: f64) -> std::result::Result<Vec<f64>, ConfigError> {
    if !j_min.is_finite() {
        return Err(ConfigError::NonFinite("j_min"));
    }
    if !j_max.is_finite() {
        return Err(ConfigError::NonFinite("j_max"));
    }
    if !(j_step.is_finite() && j_step > 0.0) {
        return Err(ConfigError::NonPositiveStep(j_step));
    }
    if j_min > j_max {
        return Err(ConfigError::EmptyRange { min: j_min, max: j_max });
    }
    let count = ((j_max - j_min) / j_step + GRID_SLACK).floor() as usize + 1;
    Ok((0..count).map(|i| j_min + i as f64 * j_step).collect())
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScanRecord {
    pub j: f64,
    pub energies: Vec<f64>,
    pub elapsed: Duration,
    /// Largest `|⟨ψ_i|ψ_j⟩|`, `i ≠ j`.
    pub max_overlap: f64,
    /// True when sorting changed the order in which the states were found.
    pub reordered: bool,
}

impl ScanRecord {
    /// `E_i - E_0` for `i ≥ 1`.
    pub fn gaps(&self) -> Vec<f64> {
        match self.energies.first() {
            Some(&e0) => self.energies[1..].iter().map(|e| e - e0).collect(),
            None => Vec::new(),
        }
    }
}

pub struct ScanDriver {
    config: ScanConfig,
    lattice: Lattice,
    deflator: ExcitedStateDeflator,
}

impl ScanDriver {
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let lattice = Lattice::spin_chain(config.n, config.spin_dim)?;
        let deflator = ExcitedStateDeflator::new(DmrgOptimizer::default(), config.deflation_options());
        Ok(Self {
            config,
            lattice,
            deflator,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    pub fn grid(&self) -> Result<Vec<f64>> {
        let c = &self.config;
        Ok(coupling_grid(c.j_min, c.j_max, c.j_step)?)
    }

    pub fn hamiltonian(&self, j: f64) -> Result<MPO> {
        let c = &self.config;
        let terms = c.model.terms(c.n, j, c.h);
        Ok(HamiltonianBuilder::new(&self.lattice).build(&terms)?)
    }

    /// Seed label of grid point `index`; state `i` then draws from `"{label}-state-{i}"`.
    pub fn point_seed(&self, index: usize) -> String {
        format!("{}-j-{}", self.config.seed, index)
    }

    /// One grid point, returning the record together with the states.
    pub fn run_point(&self, index: usize, j: f64) -> Result<(ScanRecord, DeflationResult)> {
        let h = self.hamiltonian(j)?;
        let seed = self.point_seed(index);

        let started = Instant::now();
        let result = self
            .deflator
            .find_states(&h, self.config.k, &self.config.schedule, &seed)?;
        let elapsed = started.elapsed();

        let mut energies = result.energies();
        let mut reordered = false;
        if self.config.sort_energies {
            let before = energies.clone();
            energies.sort_by(|a, b| a.total_cmp(b));
            reordered = before != energies;
            if reordered {
                log::warn!(
                    "J = {:.4}: states converged out of order {:?}, reporting sorted energies",
                    j,
                    before
                );
            }
        }

        let record = ScanRecord {
            j,
            energies,
            elapsed,
            max_overlap: result.max_overlap(),
            reordered,
        };
        Ok((record, result))
    }

    /// Runs the whole grid in order. `sink` sees every record as soon as it
    /// is complete, so partial results survive a later failure.
    pub fn run<F>(&self, mut sink: F) -> Result<Vec<ScanRecord>>
    where
        F: FnMut(&ScanRecord) -> Result<()>,
    {
        let grid = self.grid()?;
        log::info!(
            "{}: {} couplings in [{}, {}], {} states each",
            self.config.run_name(),
            grid.len(),
            self.config.j_min,
            self.config.j_max,
            self.config.k
        );

        let mut records = Vec::with_capacity(grid.len());
        for (index, &j) in grid.iter().enumerate() {
            let (record, _) = self.run_point(index, j)?;
            let energies: Vec<String> = record.energies.iter().map(|e| format!("{:.10}", e)).collect();
            log::info!(
                "J = {:.4}  E = [{}]  ({:.2?})",
                j,
                energies.join(", "),
                record.elapsed
            );
            for (i, gap) in record.gaps().iter().enumerate() {
                log::info!("    gap E{} - E0 = {:.10}", i + 1, gap);
            }
            if self.config.k > 1 {
                log::info!("    max overlap = {:.3e}", record.max_overlap);
            }
            sink(&record)?;
            records.push(record);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_includes_both_ends() {
        let g = coupling_grid(-2.0, 2.0, 0.1).unwrap();
        assert_eq!(g.len(), 41);
        assert!((g[0] + 2.0).abs() < 1e-12);
        assert!((g[40] - 2.0).abs() < 1e-9);

        let g = coupling_grid(0.0, 1.0, 0.25).unwrap();
        assert_eq!(g, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(coupling_grid(0.5, 0.5, 0.1).unwrap(), vec![0.5]);
        assert_eq!(coupling_grid(0.0, 0.95, 0.5).unwrap().len(), 2);
    }

    #[test]
    fn grid_rejects_bad_ranges() {
        assert_eq!(coupling_grid(0.0, 1.0, 0.0), Err(ConfigError::NonPositiveStep(0.0)));
        assert!(coupling_grid(0.0, 1.0, -0.1).is_err());
        assert!(matches!(coupling_grid(1.0, 0.0, 0.1), Err(ConfigError::EmptyRange { .. })));
        assert!(coupling_grid(f64::NAN, 0.0, 0.1).is_err());
    }

    #[test]
    fn default_config_is_the_spin_one_reference_run() {
        let c = ScanConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.run_name(), "ising32");
        assert_eq!(c.spin_dim, 3);
        assert_eq!(c.k, 3);
    }

    #[test]
    fn config_validation() {
        let c = ScanConfig {
            n: 1,
            ..Default::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::ChainTooShort(1)));
        let c = ScanConfig {
            k: 0,
            ..Default::default()
        };
        assert_eq!(c.validate(), Err(ConfigError::NoStates));
        let c = ScanConfig {
            penalty_weight: -1.0,
            ..Default::default()
        };
        assert!(c.validate().is_err());
        assert!(ScanDriver::new(ScanConfig {
            spin_dim: 1,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn gaps_are_relative_to_ground_state() {
        let r = ScanRecord {
            j: 0.0,
            energies: vec![-2.0, -1.5, -1.0],
            elapsed: Duration::ZERO,
            max_overlap: 0.0,
            reordered: false,
        };
        assert_eq!(r.gaps(), vec![0.5, 1.0]);
    }
}
