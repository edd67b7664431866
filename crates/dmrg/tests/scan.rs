use std::fs;

use dmrg::output::ScanLogs;
use dmrg::{ScanConfig, ScanDriver, SweepSchedule};
use spinchain::ModelKind;

fn small_scan() -> ScanConfig {
    ScanConfig {
        model: ModelKind::Ising,
        n: 8,
        spin_dim: 2,
        h: 1.0,
        j_min: -2.0,
        j_max: 2.0,
        j_step: 0.5,
        k: 3,
        schedule: SweepSchedule::new(6).maxdim(&[8, 16]).cutoff(&[1e-10]).niter(&[4]),
        seed: "scan-test".to_string(),
        ..Default::default()
    }
}

#[test]
fn scan_writes_one_row_per_coupling() {
    let dir = tempfile::tempdir().unwrap();
    let config = small_scan();
    let stem = config.run_name();
    let driver = ScanDriver::new(config).unwrap();

    let mut logs = ScanLogs::open(dir.path(), &stem, 3).unwrap();
    let records = driver.run(|rec| logs.append(rec)).unwrap();
    assert_eq!(records.len(), 9);

    let text = fs::read_to_string(dir.path().join("ising8_energies.csv")).unwrap();
    let rows: Vec<Vec<f64>> = text
        .lines()
        .filter(|l| !l.starts_with('#'))
        .map(|l| l.split(',').map(|v| v.parse().unwrap()).collect())
        .collect();
    assert_eq!(rows.len(), 9);
    for row in &rows {
        assert_eq!(row.len(), 4);
        assert!(row[1] <= row[2] && row[2] <= row[3], "row {:?}", row);
    }
    assert!((rows[0][0] + 2.0).abs() < 1e-12);
    assert!((rows[8][0] - 2.0).abs() < 1e-9);

    let timing = fs::read_to_string(dir.path().join("ising8_timing.csv")).unwrap();
    assert_eq!(timing.lines().filter(|l| !l.starts_with('#')).count(), 9);
}

#[test]
fn grid_points_are_independent_and_reproducible() {
    let driver = ScanDriver::new(small_scan()).unwrap();
    let (a, _) = driver.run_point(3, -0.5).unwrap();
    let (b, _) = driver.run_point(3, -0.5).unwrap();
    assert_eq!(a.energies, b.energies);
    assert_eq!(driver.point_seed(3), "scan-test-j-3");
}

#[test]
fn config_from_toml() {
    let text = r#"
        model = "heisenberg"
        n = 12
        spin_dim = 2
        j_min = 0.0
        j_max = 1.0
        j_step = 0.25
        k = 2
        penalty_weight = 10.0

        [schedule]
        sweeps = 5
        maxdim = [10, 20]
        noise = [1e-7, 0.0]
    "#;
    let config: ScanConfig = toml::from_str(text).unwrap();
    assert_eq!(config.model, ModelKind::Heisenberg);
    assert_eq!(config.run_name(), "heisenberg12");
    assert_eq!(config.schedule.len(), 5);
    let dims: Vec<usize> = config.schedule.iter().map(|c| c.max_bond_dim).collect();
    assert_eq!(dims, vec![10, 20, 20, 20, 20]);
    assert_eq!(config.schedule.get(0).map(|c| c.cutoff), Some(1e-10));
    assert!(config.sort_energies);
    assert!(config.validate().is_ok());

    let driver = ScanDriver::new(config).unwrap();
    assert_eq!(driver.grid().unwrap().len(), 5);
}

#[test]
fn unknown_toml_keys_are_rejected() {
    assert!(toml::from_str::<ScanConfig>("modle = \"ising\"").is_err());
    assert!(toml::from_str::<ScanConfig>("[schedule]\nsweeps = 2\nmaxdim = [0]").is_err());
}
