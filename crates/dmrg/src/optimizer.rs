//! Two-site DMRG sweeps.
//!
//! Each sweep visits the bonds `0..n-1` left to right and then right to left.
//! At every bond the two-site tensor is replaced by the lowest eigenvector of
//! the projected Hamiltonian (plus the deflation penalty, if any), optionally
//! perturbed by noise, and split back with a truncated SVD.

use faer::Mat;
use rng::ONDRng;
use tn::lanczos::{dot, lowest_eigenpair, norm, LanczosOptions};
use tn::tensor::C64;
use tn::{Truncation, MPO, MPS};

use crate::deflation::DeflationSet;
use crate::error::{ConfigError, Result};
use crate::projected::{ProjectedOperator, ProjectedOverlap};
use crate::schedule::{SweepConfig, SweepSchedule};

#[derive(Clone, Copy, Debug)]
pub struct DmrgOptions {
    /// Residual tolerance handed to the local eigensolver.
    pub eigensolver_tol: f64,
}

impl Default for DmrgOptions {
    fn default() -> Self {
        Self { eigensolver_tol: 1e-10 }
    }
}

#[derive(Clone, Debug)]
pub struct SweepReport {
    pub sweep: usize,
    /// Local eigenvalue at the last bond of the sweep, penalty included.
    pub local_energy: f64,
    pub max_bond_dim: usize,
    pub max_discarded_weight: f64,
    pub max_residual: f64,
    pub unconverged_steps: usize,
}

#[derive(Clone, Debug)]
pub struct DmrgResult {
    /// `⟨ψ|H|ψ⟩` of the final state, without any penalty contribution.
    pub energy: f64,
    pub state: MPS,
    pub sweeps: Vec<SweepReport>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DmrgOptimizer {
    pub options: DmrgOptions,
}

// Per-sweep running maxima.
#[derive(Default)]
struct SweepStats {
    local_energy: f64,
    max_discarded: f64,
    max_residual: f64,
    unconverged: usize,
}

impl DmrgOptimizer {
    pub fn new(options: DmrgOptions) -> Self {
        Self { options }
    }

    /// Minimises `⟨ψ|H|ψ⟩ + w Σ_k |⟨φ_k|ψ⟩|²` starting from `initial`.
    ///
    /// `rng` supplies the noise draws, so a fixed stream reproduces the run.
    pub fn optimize(
        &self,
        h: &MPO,
        initial: MPS,
        schedule: &SweepSchedule,
        penalty: Option<&DeflationSet>,
        rng: &mut ONDRng,
    ) -> Result<DmrgResult> {
        let n = h.len();
        if n < 2 {
            return Err(ConfigError::ChainTooShort(n).into());
        }
        if initial.len() != n {
            return Err(ConfigError::LengthMismatch {
                mpo: n,
                state: initial.len(),
            }
            .into());
        }
        for (site, (d_h, d_psi)) in h.site_dims().into_iter().zip(initial.site_dims()).enumerate() {
            if d_h != d_psi {
                return Err(tn::TnError::DimensionMismatch {
                    site,
                    expected: d_h,
                    got: d_psi,
                }
                .into());
            }
        }
        if let Some(set) = penalty {
            for phi in set.states() {
                if phi.site_dims() != initial.site_dims() {
                    return Err(tn::TnError::LengthMismatch {
                        left: phi.len(),
                        right: initial.len(),
                    }
                    .into());
                }
            }
        }
        schedule.validate()?;

        let mut psi = initial;
        psi.canonicalize(0)?;
        psi.normalize()?;

        let mut heff = ProjectedOperator::new(h, &psi);
        let weight = penalty.map_or(0.0, |p| p.weight());
        let mut overlaps: Vec<ProjectedOverlap<'_>> = penalty
            .map(|p| p.states().iter().map(|phi| ProjectedOverlap::new(phi, &psi)).collect())
            .unwrap_or_default();

        let mut reports = Vec::with_capacity(schedule.len());
        let mut previous: Option<f64> = None;

        for (s, cfg) in schedule.iter().enumerate() {
            let mut stats = SweepStats::default();

            for b in 0..n - 1 {
                self.update_bond(&mut psi, &mut heff, &mut overlaps, weight, b, cfg, true, rng, &mut stats)?;
            }
            for b in (0..n - 1).rev() {
                self.update_bond(&mut psi, &mut heff, &mut overlaps, weight, b, cfg, false, rng, &mut stats)?;
            }

            let report = SweepReport {
                sweep: s + 1,
                local_energy: stats.local_energy,
                max_bond_dim: psi.max_bond_dim(),
                max_discarded_weight: stats.max_discarded,
                max_residual: stats.max_residual,
                unconverged_steps: stats.unconverged,
            };
            log::debug!(
                "sweep {:>3}: E = {:.12} maxdim = {} discarded = {:.3e} residual = {:.3e}",
                report.sweep,
                report.local_energy,
                report.max_bond_dim,
                report.max_discarded_weight,
                report.max_residual
            );
            if report.unconverged_steps > 0 {
                log::debug!(
                    "sweep {}: {} local solves stopped at the iteration limit",
                    report.sweep,
                    report.unconverged_steps
                );
            }
            reports.push(report);

            if let (Some(tol), Some(prev)) = (schedule.energy_tolerance(), previous) {
                if (stats.local_energy - prev).abs() < tol {
                    log::debug!("energy converged after {} sweeps", s + 1);
                    break;
                }
            }
            previous = Some(stats.local_energy);
        }

        let energy = psi.expectation(h)?;
        if !energy.is_finite() {
            return Err(tn::TnError::NonFinite { context: "DMRG energy" }.into());
        }
        Ok(DmrgResult {
            energy,
            state: psi,
            sweeps: reports,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn update_bond(
        &self,
        psi: &mut MPS,
        heff: &mut ProjectedOperator<'_>,
        overlaps: &mut [ProjectedOverlap<'_>],
        weight: f64,
        b: usize,
        cfg: &SweepConfig,
        move_right: bool,
        rng: &mut ONDRng,
        stats: &mut SweepStats,
    ) -> Result<()> {
        let (a, c) = (&psi.sites[b], &psi.sites[b + 1]);
        let dims = (a.dl, a.dp, c.dp, c.dr);
        let cols = dims.2 * dims.3;
        let theta = two_site_vector(psi, b);

        let projectors: Vec<Vec<C64>> = overlaps.iter().map(|o| o.local_vector(b)).collect();
        let apply = |x: &[C64]| {
            let mut y = heff.apply(b, x);
            for p in &projectors {
                let f = C64::new(weight, 0.0) * dot(p, x);
                for (yi, pi) in y.iter_mut().zip(p) {
                    *yi += f * pi;
                }
            }
            y
        };

        let opts = LanczosOptions {
            max_iter: cfg.local_iterations,
            tol: self.options.eigensolver_tol,
        };
        let pair = lowest_eigenpair(apply, &theta, opts)?;
        let mut v = pair.vector;
        if cfg.noise > 0.0 {
            add_noise(&mut v, cfg.noise, rng)?;
        }

        let m = Mat::from_fn(dims.0 * dims.1, cols, |r, col| v[r * cols + col]);
        let trunc = Truncation {
            max_bond: cfg.max_bond_dim,
            cutoff: cfg.cutoff,
        };
        let split = psi.set_two_site(b, &m, dims, trunc, move_right);

        if move_right {
            heff.update_left(psi, b);
            for o in overlaps.iter_mut() {
                o.update_left(psi, b);
            }
        } else {
            heff.update_right(psi, b + 1);
            for o in overlaps.iter_mut() {
                o.update_right(psi, b + 1);
            }
        }

        stats.local_energy = pair.value;
        stats.max_discarded = stats.max_discarded.max(split.discarded_weight);
        stats.max_residual = stats.max_residual.max(pair.residual);
        if !pair.converged {
            stats.unconverged += 1;
        }
        Ok(())
    }
}

/// Row-major `θ[l, s1, s2, r] = Σ_m A[l, s1, m] B[m, s2, r]` on bond `(b, b+1)`.
fn two_site_vector(psi: &MPS, b: usize) -> Vec<C64> {
    let (a, c) = (&psi.sites[b], &psi.sites[b + 1]);
    let cols = c.dp * c.dr;
    let mut out = vec![C64::new(0.0, 0.0); a.dl * a.dp * cols];
    for l in 0..a.dl {
        for s1 in 0..a.dp {
            let row = (l * a.dp + s1) * cols;
            for m in 0..a.dr {
                let u = a.get(l, s1, m);
                if u == C64::new(0.0, 0.0) {
                    continue;
                }
                for k in 0..cols {
                    out[row + k] += u * c.data[m * cols + k];
                }
            }
        }
    }
    out
}

// θ ← (θ + ε g) / ‖θ + ε g‖ with g complex Gaussian.
fn add_noise(v: &mut [C64], amplitude: f64, rng: &mut ONDRng) -> Result<()> {
    for x in v.iter_mut() {
        let re = rng.next_gaussian(b"DMRG_NOISE_RE");
        let im = rng.next_gaussian(b"DMRG_NOISE_IM");
        *x += C64::new(re, im) * amplitude;
    }
    let nrm = norm(v);
    if nrm == 0.0 || !nrm.is_finite() {
        return Err(tn::TnError::ZeroNorm.into());
    }
    for x in v.iter_mut() {
        *x /= nrm;
    }
    Ok(())
}
