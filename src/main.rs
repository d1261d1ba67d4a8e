use std::{num::NonZeroUsize, path::PathBuf};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use jemallocator::Jemalloc;
use rollup_cube::{
    RollupConfig, run_pipeline,
    processor::{
        dimension::{CombinationMode, Dimension, DimensionSet},
        rollup::ExecutionMode,
    },
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Engine {
    /// One fold per subset on a single thread
    Sequential,
    /// Rayon fold/reduce across subsets and record shards
    Parallel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DimensionArg {
    Entity,
    Counterparty,
    Tier,
}

impl From<DimensionArg> for Dimension {
    fn from(arg: DimensionArg) -> Self {
        match arg {
            DimensionArg::Entity => Dimension::Entity,
            DimensionArg::Counterparty => Dimension::Counterparty,
            DimensionArg::Tier => Dimension::Tier,
        }
    }
}

#[derive(Parser)]
#[command(name = "rollup-cube")]
#[command(about = "Partial data cube rollup over entity / counterparty / tier")]
struct Args {
    /// Records file (id,entity,counterparty,rating,status,value)
    #[arg(short, long, default_value = "inputs/dataset1.csv")]
    records: PathBuf,

    /// Tier lookup file (counterparty,tier)
    #[arg(short, long, default_value = "inputs/dataset2.csv")]
    tiers: PathBuf,

    /// Output CSV path
    #[arg(short, long, default_value = "outputs/rollup_output.csv")]
    output: PathBuf,

    /// Also write the rollup as an Arrow IPC file
    #[arg(long)]
    arrow: Option<PathBuf>,

    /// Cube dimensions in enumeration order
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        default_values = ["entity", "counterparty", "tier"]
    )]
    dimensions: Vec<DimensionArg>,

    #[arg(long, value_enum, default_value = "parallel")]
    engine: Engine,

    /// Worker threads (defaults to one per core)
    #[arg(long)]
    threads: Option<NonZeroUsize>,

    /// Skip excluded dimension combinations instead of ending their size
    #[arg(long)]
    skip_excluded: bool,
}

impl From<Args> for RollupConfig {
    fn from(args: Args) -> Self {
        RollupConfig {
            records_path: args.records,
            tiers_path: args.tiers,
            output_path: args.output,
            arrow_path: args.arrow,
            dimensions: DimensionSet::new(args.dimensions.into_iter().map(Dimension::from)),
            execution: match args.engine {
                Engine::Sequential => ExecutionMode::Sequential,
                Engine::Parallel => ExecutionMode::Parallel,
            },
            combination: if args.skip_excluded {
                CombinationMode::SkipExcluded
            } else {
                CombinationMode::Reference
            },
            threads: args.threads,
        }
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = RollupConfig::from(Args::parse());
    let summary = run_pipeline(&config)?;

    info!(
        rows = summary.rows_written,
        rejected = summary.records_rejected,
        dropped = summary.records_dropped,
        output = %config.output_path.display(),
        "done"
    );
    Ok(())
}
