use rayon::iter::{IntoParallelIterator, ParallelIterator};
use std::collections::HashMap;
use tracing::debug;

use crate::processor::record::{EnrichedRecord, Record};

/// Counterparty to tier mapping, loaded once and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierLookup {
    tiers: HashMap<String, i64>,
}

impl TierLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a mapping, returning the tier it replaced.
    pub fn insert(&mut self, counterparty: &str, tier: i64) -> Option<i64> {
        self.tiers.insert(counterparty.to_string(), tier)
    }

    pub fn tier(&self, counterparty: &str) -> Option<i64> {
        self.tiers.get(counterparty).copied()
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, i64)> for TierLookup {
    fn from_iter<T: IntoIterator<Item = (&'a str, i64)>>(iter: T) -> Self {
        let mut lookup = TierLookup::new();
        for (cp, tier) in iter {
            lookup.insert(cp, tier);
        }
        lookup
    }
}

/// Immutable handle over the joined records every rollup reads from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<EnrichedRecord>,
}

impl Dataset {
    pub fn new(records: Vec<EnrichedRecord>) -> Self {
        Dataset { records }
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinSummary {
    pub matched: usize,
    pub dropped: usize,
}

/// Inner join of records against the tier lookup on counterparty.
#[derive(Debug, Clone, Copy)]
pub struct JoinedRecordSource<'a> {
    lookup: &'a TierLookup,
}

impl<'a> JoinedRecordSource<'a> {
    pub fn new(lookup: &'a TierLookup) -> Self {
        JoinedRecordSource { lookup }
    }

    /// Resolves the tier of one record; `None` means the record is filtered out.
    pub fn enrich(&self, record: Record) -> Option<EnrichedRecord> {
        let tier = self.lookup.tier(&record.counterparty)?;
        Some(EnrichedRecord::new(record, tier))
    }

    pub fn join(&self, records: Vec<Record>) -> (Dataset, JoinSummary) {
        let total = records.len();
        let joined: Vec<EnrichedRecord> = records
            .into_par_iter()
            .filter_map(|record| self.enrich(record))
            .collect();

        let summary = JoinSummary {
            matched: joined.len(),
            dropped: total - joined.len(),
        };
        debug!(
            matched = summary.matched,
            dropped = summary.dropped,
            "joined records against tier lookup"
        );

        (Dataset::new(joined), summary)
    }
}
