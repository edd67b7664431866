use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use dmrg::exact::lowest_energies;
use dmrg::output::ScanLogs;
use dmrg::{ScanConfig, ScanDriver};
use spinchain::ModelKind;

/// Low-lying spectrum of a spin chain across a coupling scan (two-site DMRG)
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML run configuration; flags below override its entries
    #[arg(long)]
    config: Option<PathBuf>,

    /// Model: ising | heisenberg
    #[arg(long)]
    model: Option<ModelKind>,

    /// Number of sites
    #[arg(long)]
    n: Option<usize>,

    /// Local dimension 2S+1 (2 = spin-1/2, 3 = spin-1)
    #[arg(long)]
    spin_dim: Option<usize>,

    /// Transverse field (Ising only)
    #[arg(long)]
    field: Option<f64>,

    /// First coupling of the scan
    #[arg(long, allow_hyphen_values = true)]
    j_min: Option<f64>,

    /// Last coupling of the scan (inclusive)
    #[arg(long, allow_hyphen_values = true)]
    j_max: Option<f64>,

    /// Coupling step
    #[arg(long)]
    j_step: Option<f64>,

    /// Number of states per coupling
    #[arg(long)]
    k: Option<usize>,

    /// Orthogonality penalty weight
    #[arg(long)]
    penalty_weight: Option<f64>,

    /// RNG seed (full reproducibility)
    #[arg(long)]
    seed: Option<String>,

    /// Report energies in the order they were found instead of sorted
    #[arg(long)]
    unsorted: bool,

    /// Output directory for energy and timing logs
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Also diagonalise every small chain exactly and print the deviation
    #[arg(long)]
    exact: bool,

    /// Number of Rayon worker threads (0 = Rayon default)
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

impl Args {
    fn config(&self) -> Result<ScanConfig> {
        let mut c = match &self.config {
            Some(path) => {
                let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
                toml::from_str::<ScanConfig>(&text).with_context(|| format!("parsing {}", path.display()))?
            }
            None => ScanConfig::default(),
        };
        if let Some(v) = self.model {
            c.model = v;
        }
        if let Some(v) = self.n {
            c.n = v;
        }
        if let Some(v) = self.spin_dim {
            c.spin_dim = v;
        }
        if let Some(v) = self.field {
            c.h = v;
        }
        if let Some(v) = self.j_min {
            c.j_min = v;
        }
        if let Some(v) = self.j_max {
            c.j_max = v;
        }
        if let Some(v) = self.j_step {
            c.j_step = v;
        }
        if let Some(v) = self.k {
            c.k = v;
        }
        if let Some(v) = self.penalty_weight {
            c.penalty_weight = v;
        }
        if let Some(v) = &self.seed {
            c.seed = v.clone();
        }
        if self.unsorted {
            c.sort_energies = false;
        }
        Ok(c)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
            .context("building Rayon thread pool")?;
    }

    let config = args.config()?;
    let stem = config.run_name();
    let k = config.k;
    let driver = ScanDriver::new(config)?;

    let mut logs = ScanLogs::open(&args.out, &stem, k)?;
    log::info!(
        "writing {} and {}",
        logs.energy_path().display(),
        logs.timing_path().display()
    );

    let records = driver.run(|rec| {
        logs.append(rec)?;
        let energies: Vec<String> = rec.energies.iter().map(|e| format!("{:.10}", e)).collect();
        println!("J = {:.4}  {}", rec.j, energies.join("  "));
        Ok(())
    })?;

    if args.exact {
        for rec in &records {
            let h = driver.hamiltonian(rec.j)?;
            let exact = match lowest_energies(&h, k) {
                Ok(e) => e,
                Err(dmrg::DmrgError::ExactTooLarge { dim, limit }) => {
                    bail!("--exact needs a Hilbert space of at most {} states, this chain has {}", limit, dim)
                }
                Err(e) => return Err(e.into()),
            };
            let worst = rec
                .energies
                .iter()
                .zip(&exact)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0_f64, f64::max);
            let exact_str: Vec<String> = exact.iter().map(|e| format!("{:.10}", e)).collect();
            log::info!("J = {:.4}  exact E = [{}]", rec.j, exact_str.join(", "));
            println!("J = {:.4}  exact deviation {:.3e}", rec.j, worst);
        }
    }

    let reordered = records.iter().filter(|r| r.reordered).count();
    if reordered > 0 {
        log::warn!("{} of {} couplings had states found out of order", reordered, records.len());
    }
    Ok(())
}
