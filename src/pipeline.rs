use rayon::ThreadPoolBuilder;
use tracing::info;

use crate::{
    config::RollupConfig,
    processor::{
        RollupError,
        join::JoinedRecordSource,
        loader::{load_records, load_tier_lookup},
        output::{write_arrow, write_csv},
        rollup::RollupDriver,
    },
};

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub records_loaded: usize,
    pub records_rejected: usize,
    pub tier_entries: usize,
    pub tier_rows_rejected: usize,
    pub records_joined: usize,
    pub records_dropped: usize,
    pub subsets: usize,
    pub rows_written: usize,
}

/// Loads both inputs, joins them, rolls the result up and writes the artifact.
///
/// With `threads` set, every stage runs inside a dedicated rayon pool of that size.
pub fn run_pipeline(config: &RollupConfig) -> Result<RunSummary, RollupError> {
    config.validate()?;

    match config.threads {
        Some(threads) => {
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads.get())
                .build()?;
            pool.install(|| run_stages(config))
        }
        None => run_stages(config),
    }
}

fn run_stages(config: &RollupConfig) -> Result<RunSummary, RollupError> {
    info!(
        records = %config.records_path.display(),
        tiers = %config.tiers_path.display(),
        threads = rayon::current_num_threads(),
        "rollup run started"
    );

    let (lookup, tier_summary) = load_tier_lookup(&config.tiers_path)?;
    let (records, record_summary) = load_records(&config.records_path)?;

    let (dataset, join_summary) = JoinedRecordSource::new(&lookup).join(records);

    let result = RollupDriver::new(&dataset)
        .dimensions(config.dimensions.clone())
        .combination(config.combination)
        .execution(config.execution)
        .run();
    let rows = result.rows();
    let rows_written = write_csv(&config.output_path, &rows)?;
    if let Some(arrow_path) = &config.arrow_path {
        write_arrow(arrow_path, &rows)?;
    }

    let summary = RunSummary {
        records_loaded: record_summary.rows_processed,
        records_rejected: record_summary.rows_rejected(),
        tier_entries: lookup.len(),
        tier_rows_rejected: tier_summary.rows_rejected(),
        records_joined: join_summary.matched,
        records_dropped: join_summary.dropped,
        subsets: result.subsets.len(),
        rows_written,
    };
    info!(?summary, "rollup run completed");
    Ok(summary)
}
