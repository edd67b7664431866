use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_SWEEPS: usize = 30;
pub const DEFAULT_MAXDIM: [usize; 5] = [10, 20, 100, 100, 200];
pub const DEFAULT_CUTOFF: f64 = 1e-10;
/// Matvec budget of each local solve. Two is a single Lanczos correction
/// step, so the reference schedule can stop short of convergence (errors
/// of order 1e-4 on small spin-1 chains); `niter(&[3])` or more tightens it.
pub const DEFAULT_NITER: usize = 2;
pub const DEFAULT_NOISE: [f64; 3] = [1e-7, 1e-8, 0.0];

/// Parameters of one sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepConfig {
    pub max_bond_dim: usize,
    pub cutoff: f64,
    pub local_iterations: usize,
    pub noise: f64,
}

/// Ordered per-sweep parameters.
///
/// Setters follow the ITensor `Sweeps` convention: a list shorter than the
/// number of sweeps repeats its last entry. The schedule always runs to the
/// end unless `energy_tolerance` is set.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "RawSchedule")]
pub struct SweepSchedule {
    sweeps: Vec<SweepConfig>,
    energy_tolerance: Option<f64>,
}

impl SweepSchedule {
    pub fn new(nsweeps: usize) -> Self {
        Self {
            sweeps: vec![
                SweepConfig {
                    max_bond_dim: 1,
                    cutoff: 0.0,
                    local_iterations: DEFAULT_NITER,
                    noise: 0.0,
                };
                nsweeps
            ],
            energy_tolerance: None,
        }
    }

    pub fn maxdim(mut self, values: &[usize]) -> Self {
        for (cfg, v) in self.sweeps.iter_mut().zip(repeat_last(values)) {
            cfg.max_bond_dim = v;
        }
        self
    }

    pub fn cutoff(mut self, values: &[f64]) -> Self {
        for (cfg, v) in self.sweeps.iter_mut().zip(repeat_last(values)) {
            cfg.cutoff = v;
        }
        self
    }

    pub fn niter(mut self, values: &[usize]) -> Self {
        for (cfg, v) in self.sweeps.iter_mut().zip(repeat_last(values)) {
            cfg.local_iterations = v;
        }
        self
    }

    pub fn noise(mut self, values: &[f64]) -> Self {
        for (cfg, v) in self.sweeps.iter_mut().zip(repeat_last(values)) {
            cfg.noise = v;
        }
        self
    }

    /// Stop once the per-sweep energy change drops below `tol`.
    pub fn with_energy_tolerance(mut self, tol: f64) -> Self {
        self.energy_tolerance = Some(tol);
        self
    }

    pub fn energy_tolerance(&self) -> Option<f64> {
        self.energy_tolerance
    }

    pub fn len(&self) -> usize {
        self.sweeps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sweeps.is_empty()
    }

    pub fn get(&self, sweep: usize) -> Option<&SweepConfig> {
        self.sweeps.get(sweep)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SweepConfig> {
        self.sweeps.iter()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweeps.is_empty() {
            return Err(ConfigError::EmptySchedule);
        }
        for (s, cfg) in self.sweeps.iter().enumerate() {
            let bad = |reason: &str| ConfigError::InvalidSweep {
                sweep: s + 1,
                reason: reason.to_string(),
            };
            if cfg.max_bond_dim == 0 {
                return Err(bad("maxdim must be at least 1"));
            }
            if cfg.local_iterations == 0 {
                return Err(bad("niter must be at least 1"));
            }
            if !(cfg.cutoff.is_finite() && cfg.cutoff >= 0.0) {
                return Err(bad("cutoff must be finite and non-negative"));
            }
            if !(cfg.noise.is_finite() && cfg.noise >= 0.0) {
                return Err(bad("noise must be finite and non-negative"));
            }
        }
        if let Some(tol) = self.energy_tolerance {
            if !(tol.is_finite() && tol >= 0.0) {
                return Err(ConfigError::NonFinite("energy_tolerance"));
            }
        }
        Ok(())
    }
}

impl Default for SweepSchedule {
    fn default() -> Self {
        SweepSchedule::new(DEFAULT_SWEEPS)
            .maxdim(&DEFAULT_MAXDIM)
            .cutoff(&[DEFAULT_CUTOFF])
            .niter(&[DEFAULT_NITER])
            .noise(&DEFAULT_NOISE)
    }
}

fn repeat_last<T: Copy>(values: &[T]) -> impl Iterator<Item = T> + '_ {
    let last = values.last().copied();
    values.iter().copied().chain(std::iter::from_fn(move || last))
}

/// On-disk form, e.g. in TOML:
///
/// ```toml
/// sweeps = 30
/// maxdim = [10, 20, 100, 100, 200]
/// cutoff = [1e-10]
/// niter = [2]
/// noise = [1e-7, 1e-8, 0.0]
/// ```
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSchedule {
    sweeps: usize,
    #[serde(default)]
    maxdim: Vec<usize>,
    #[serde(default)]
    cutoff: Vec<f64>,
    #[serde(default)]
    niter: Vec<usize>,
    #[serde(default)]
    noise: Vec<f64>,
    #[serde(default)]
    energy_tolerance: Option<f64>,
}

impl TryFrom<RawSchedule> for SweepSchedule {
    type Error = ConfigError;

    fn try_from(raw: RawSchedule) -> Result<Self, Self::Error> {
        let or_default = |v: Vec<usize>, d: &[usize]| if v.is_empty() { d.to_vec() } else { v };
        let or_default_f = |v: Vec<f64>, d: &[f64]| if v.is_empty() { d.to_vec() } else { v };

        let mut schedule = SweepSchedule::new(raw.sweeps)
            .maxdim(&or_default(raw.maxdim, &DEFAULT_MAXDIM))
            .cutoff(&or_default_f(raw.cutoff, &[DEFAULT_CUTOFF]))
            .niter(&or_default(raw.niter, &[DEFAULT_NITER]))
            .noise(&or_default_f(raw.noise, &DEFAULT_NOISE));
        schedule.energy_tolerance = raw.energy_tolerance;
        schedule.validate()?;
        Ok(schedule)
    }
}
