use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{DmrgError, Result};
use crate::scan::ScanRecord;

/// `#J,E0,E1,...` for `k` states.
pub fn energy_header(k: usize) -> String {
    let cols: Vec<String> = (0..k).map(|i| format!("E{}", i)).collect();
    format!("#J,{}", cols.join(","))
}

pub const TIMING_HEADER: &str = "#J,elapsed_us";

pub fn energy_row(rec: &ScanRecord) -> String {
    let mut row = format!("{:.10}", rec.j);
    for e in &rec.energies {
        row.push_str(&format!(",{:.10}", e));
    }
    row
}

pub fn timing_row(rec: &ScanRecord) -> String {
    format!("{:.10},{}", rec.j, rec.elapsed.as_micros())
}

/// Append-mode energy and timing logs of one run.
///
/// Rows are flushed as soon as they are written. A header goes in only
/// when a file is created or empty, so repeated runs extend the same table.
pub struct ScanLogs {
    energies: BufWriter<File>,
    timing: BufWriter<File>,
    energy_path: PathBuf,
    timing_path: PathBuf,
}

impl ScanLogs {
    /// `{dir}/{stem}_energies.csv` and `{dir}/{stem}_timing.csv`.
    pub fn paths(dir: &Path, stem: &str) -> (PathBuf, PathBuf) {
        (
            dir.join(format!("{}_energies.csv", stem)),
            dir.join(format!("{}_timing.csv", stem)),
        )
    }

    pub fn open(dir: &Path, stem: &str, k: usize) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|source| DmrgError::Output {
            path: dir.to_path_buf(),
            source,
        })?;
        let (energy_path, timing_path) = Self::paths(dir, stem);
        let energies = open_log(&energy_path, &energy_header(k))?;
        let timing = open_log(&timing_path, TIMING_HEADER)?;
        Ok(Self {
            energies,
            timing,
            energy_path,
            timing_path,
        })
    }

    pub fn energy_path(&self) -> &Path {
        &self.energy_path
    }

    pub fn timing_path(&self) -> &Path {
        &self.timing_path
    }

    pub fn append(&mut self, rec: &ScanRecord) -> Result<()> {
        write_line(&mut self.energies, &self.energy_path, &energy_row(rec))?;
        write_line(&mut self.timing, &self.timing_path, &timing_row(rec))
    }
}

fn open_log(path: &Path, header: &str) -> Result<BufWriter<File>> {
    let wrap = |source: io::Error| DmrgError::Output {
        path: path.to_path_buf(),
        source,
    };
    let file = OpenOptions::new().create(true).append(true).open(path).map_err(wrap)?;
    let is_empty = file.metadata().map_err(wrap)?.len() == 0;
    let mut w = BufWriter::new(file);
    if is_empty {
        write_line(&mut w, path, header)?;
    }
    Ok(w)
}

fn write_line(w: &mut BufWriter<File>, path: &Path, line: &str) -> Result<()> {
    writeln!(w, "{}", line)
        .and_then(|_| w.flush())
        .map_err(|source| DmrgError::Output {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(j: f64) -> ScanRecord {
        ScanRecord {
            j,
            energies: vec![-1.25, -0.5, 0.125],
            elapsed: Duration::from_micros(1234),
            max_overlap: 0.0,
            reordered: false,
        }
    }

    #[test]
    fn header_and_rows() {
        assert_eq!(energy_header(3), "#J,E0,E1,E2");
        assert_eq!(energy_row(&record(0.5)), "0.5000000000,-1.2500000000,-0.5000000000,0.1250000000");
        assert_eq!(timing_row(&record(-2.0)), "-2.0000000000,1234");
    }

    #[test]
    fn appends_without_repeating_header() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut logs = ScanLogs::open(dir.path(), "ising4", 3).unwrap();
            logs.append(&record(0.0)).unwrap();
        }
        {
            let mut logs = ScanLogs::open(dir.path(), "ising4", 3).unwrap();
            logs.append(&record(0.1)).unwrap();
        }
        let (ep, tp) = ScanLogs::paths(dir.path(), "ising4");
        let energies = fs::read_to_string(ep).unwrap();
        let lines: Vec<&str> = energies.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "#J,E0,E1,E2");
        assert!(lines[2].starts_with("0.1000000000,"));

        let timing = fs::read_to_string(tp).unwrap();
        assert_eq!(timing.lines().next(), Some(TIMING_HEADER));
        assert_eq!(timing.lines().count(), 3);
    }

    #[test]
    fn creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("run");
        let logs = ScanLogs::open(&nested, "heisenberg8", 2).unwrap();
        assert!(logs.energy_path().exists());
        assert!(logs.timing_path().ends_with("heisenberg8_timing.csv"));
    }
}
