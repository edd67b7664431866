pub mod deflation;
pub mod error;
pub mod exact;
pub mod optimizer;
pub mod output;
mod projected;
pub mod scan;
pub mod schedule;

pub use deflation::{DeflationResult, DeflationSet, ExcitedStateDeflator};
pub use error::{ConfigError, DmrgError, Result};
pub use optimizer::{DmrgOptimizer, DmrgResult};
pub use scan::{coupling_grid, ScanConfig, ScanDriver, ScanRecord};
pub use schedule::{SweepConfig, SweepSchedule};
