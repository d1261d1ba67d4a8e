//! # rollup_cube
//!
//! `rollup_cube` computes a partial data cube over invoice-style records keyed
//! by legal entity and counterparty, enriched with a counterparty tier. For
//! every grouping subset of `(legal_entity, counter_party, tier)` it reports
//! the maximum rating and the value totals for the `ARAP` and `ACCR` statuses.
//!
//! - Memory-mapped, chunk-parallel CSV loading with per-row rejection
//! - Inner join against the tier lookup
//! - Mergeable accumulators, folded sequentially or in parallel with Rayon
//! - One fixed 6-column output, where a dimension that is not part of a
//!   group's key carries the group's record count
//! - CSV and Arrow output
//!
//! # Example
//!
//! ```rust
//! use rollup_cube::processor::{
//!     join::{JoinedRecordSource, TierLookup},
//!     record::{Record, Status},
//!     rollup::RollupDriver,
//! };
//!
//! let lookup: TierLookup = [("C1", 3)].into_iter().collect();
//! let records = vec![
//!     Record::new(1, "L1", "C1", 5, Status::Arap, 100),
//!     Record::new(2, "L1", "C1", 7, Status::Accr, 50),
//! ];
//!
//! let (dataset, _) = JoinedRecordSource::new(&lookup).join(records);
//! let rows = RollupDriver::new(&dataset).run().rows();
//!
//! // grouped by (legal_entity, counter_party): tier holds the count
//! assert!(rows.iter().any(|r| r.to_string() == "L1,C1,2,7,100,50"));
//! // grouped by tier: both names hold the count
//! assert!(rows.iter().any(|r| r.to_string() == "2,2,3,7,100,50"));
//! ```

mod helpers;
pub mod config;
pub mod pipeline;
pub mod processor;

pub use config::RollupConfig;
pub use pipeline::{RunSummary, run_pipeline};
pub use processor::RollupError;
