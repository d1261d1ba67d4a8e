use rollup_cube::{RollupConfig, run_pipeline};

#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _profiler = dhat::Profiler::new_heap();

    // expects the files written by `data_generator`
    let config = RollupConfig {
        output_path: "outputs/memory_run.csv".into(),
        ..RollupConfig::default()
    };
    let summary = run_pipeline(&config)?;

    println!(
        "Memory benchmark finished ({} rows). See dhat-heap.json for details",
        summary.rows_written
    );
    Ok(())
}
