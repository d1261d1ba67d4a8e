use std::{num::NonZeroUsize, path::PathBuf};

use crate::processor::{
    RollupError,
    dimension::{CombinationMode, DimensionSet},
    rollup::ExecutionMode,
};

/// Settings for one end-to-end rollup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollupConfig {
    /// Records file: `id,entity,counterparty,rating,status,value`
    pub records_path: PathBuf,
    /// Tier lookup file: `counterparty,tier`
    pub tiers_path: PathBuf,
    pub output_path: PathBuf,
    /// Optional Arrow IPC copy of the output
    pub arrow_path: Option<PathBuf>,
    /// Cube dimensions; their order drives subset enumeration
    pub dimensions: DimensionSet,
    pub execution: ExecutionMode,
    pub combination: CombinationMode,
    /// Worker threads; `None` uses the global rayon pool
    pub threads: Option<NonZeroUsize>,
}

impl Default for RollupConfig {
    fn default() -> Self {
        RollupConfig {
            records_path: PathBuf::from("inputs/dataset1.csv"),
            tiers_path: PathBuf::from("inputs/dataset2.csv"),
            output_path: PathBuf::from("outputs/rollup_output.csv"),
            arrow_path: None,
            dimensions: DimensionSet::default(),
            execution: ExecutionMode::default(),
            combination: CombinationMode::default(),
            threads: None,
        }
    }
}

impl RollupConfig {
    pub fn validate(&self) -> Result<(), RollupError> {
        let outputs = std::iter::once(&self.output_path).chain(&self.arrow_path);
        for output in outputs {
            if [&self.records_path, &self.tiers_path].contains(&output) {
                return Err(RollupError::Config(format!(
                    "output path {} would overwrite an input",
                    output.display()
                )));
            }
        }
        if self.arrow_path.as_ref() == Some(&self.output_path) {
            return Err(RollupError::Config(format!(
                "arrow and csv outputs share the path {}",
                self.output_path.display()
            )));
        }
        Ok(())
    }
}
