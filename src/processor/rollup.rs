use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::processor::{
    accumulator::{Accumulator, RatingStats},
    dimension::{CombinationMode, DimensionSet, Subset},
    group_key::{GroupKey, GroupKeyBuilder},
    join::Dataset,
    output::{OutputFormatter, OutputRow},
    record::{EnrichedRecord, Observation},
};

/// How the per-subset folds are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One pass per subset on the calling thread.
    Sequential,
    /// Subsets run concurrently; each subset folds shards in parallel and
    /// merges the partial accumulators.
    #[default]
    Parallel,
}

/// Groups of one subset, sorted by key.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetRollup {
    pub subset: Subset,
    pub groups: Vec<(GroupKey, RatingStats)>,
}

/// Output of a rollup run: every subset's groups, in subset order.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupResult {
    pub subsets: Vec<SubsetRollup>,
}

impl RollupResult {
    /// Formats every group of every subset into output rows.
    pub fn rows(&self) -> Vec<OutputRow> {
        self.subsets
            .iter()
            .flat_map(|s| {
                s.groups
                    .iter()
                    .map(move |(key, stats)| OutputFormatter::format(&s.subset, key, stats))
            })
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.subsets.iter().map(|s| s.groups.len()).sum()
    }
}

/// Computes the rollup of a [`Dataset`] over the subsets of a [`DimensionSet`].
///
/// # Example
/// ```rust
/// # use rollup_cube::processor::{join::Dataset, rollup::RollupDriver};
/// let dataset = Dataset::default();
/// let rows = RollupDriver::new(&dataset).run().rows();
/// assert!(rows.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct RollupDriver<'a> {
    dataset: &'a Dataset,
    dimensions: DimensionSet,
    combination: CombinationMode,
    execution: ExecutionMode,
}

impl<'a> RollupDriver<'a> {
    pub fn new(dataset: &'a Dataset) -> Self {
        RollupDriver {
            dataset,
            dimensions: DimensionSet::default(),
            combination: CombinationMode::default(),
            execution: ExecutionMode::default(),
        }
    }

    pub fn dimensions(mut self, dimensions: DimensionSet) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn combination(mut self, mode: CombinationMode) -> Self {
        self.combination = mode;
        self
    }

    pub fn execution(mut self, mode: ExecutionMode) -> Self {
        self.execution = mode;
        self
    }

    pub fn subsets(&self) -> Vec<Subset> {
        self.dimensions.subsets(self.combination)
    }

    /// Folds the dataset into one accumulator per group of `subset`.
    pub fn aggregate_subset<A>(&self, subset: &Subset) -> HashMap<GroupKey, A>
    where
        A: Accumulator<Input = Observation>,
    {
        let keys = GroupKeyBuilder::new(subset);
        let records = self.dataset.records();

        match self.execution {
            ExecutionMode::Sequential => fold_into(HashMap::new(), &keys, records),
            ExecutionMode::Parallel => records
                .par_iter()
                .fold(HashMap::new, |mut groups, record| {
                    add_record(&mut groups, &keys, record);
                    groups
                })
                .reduce(HashMap::new, merge_groups),
        }
    }

    /// Runs every subset and returns the per-subset groups.
    pub fn run(&self) -> RollupResult {
        let subsets = self.subsets();
        info!(
            records = self.dataset.len(),
            subsets = subsets.len(),
            mode = ?self.execution,
            "starting rollup"
        );

        let subsets: Vec<SubsetRollup> = match self.execution {
            ExecutionMode::Sequential => subsets
                .into_iter()
                .map(|subset| self.rollup_subset(subset))
                .collect(),
            ExecutionMode::Parallel => subsets
                .par_iter()
                .map(|subset| self.rollup_subset(subset.clone()))
                .collect(),
        };

        let result = RollupResult { subsets };
        info!(rows = result.row_count(), "rollup finished");
        result
    }

    fn rollup_subset(&self, subset: Subset) -> SubsetRollup {
        let mut groups: Vec<(GroupKey, RatingStats)> = self
            .aggregate_subset::<RatingStats>(&subset)
            .into_iter()
            .map(|(key, acc)| (key, acc.extract()))
            .collect();
        groups.sort_by(|a, b| a.0.cmp(&b.0));

        debug!(subset = %subset, groups = groups.len(), "aggregated subset");
        SubsetRollup { subset, groups }
    }
}

fn add_record<A>(
    groups: &mut HashMap<GroupKey, A>,
    keys: &GroupKeyBuilder<'_>,
    record: &EnrichedRecord,
) where
    A: Accumulator<Input = Observation>,
{
    let slot = groups.entry(keys.key_for(record)).or_insert_with(A::create);
    *slot = std::mem::replace(slot, A::create()).add(record.observation());
}

fn fold_into<A>(
    mut groups: HashMap<GroupKey, A>,
    keys: &GroupKeyBuilder<'_>,
    records: &[EnrichedRecord],
) -> HashMap<GroupKey, A>
where
    A: Accumulator<Input = Observation>,
{
    for record in records {
        add_record(&mut groups, keys, record);
    }
    groups
}

/// Merges two partial group maps; groups present in both are combined with `merge`.
pub fn merge_groups<A: Accumulator>(
    mut left: HashMap<GroupKey, A>,
    right: HashMap<GroupKey, A>,
) -> HashMap<GroupKey, A> {
    if left.len() < right.len() {
        return merge_groups(right, left);
    }
    for (key, acc) in right {
        let merged = match left.remove(&key) {
            Some(existing) => existing.merge(acc),
            None => acc,
        };
        left.insert(key, merged);
    }
    left
}
