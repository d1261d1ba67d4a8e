use crate::processor::record::{Observation, Status};

/// A mergeable per-group aggregate.
///
/// `merge` must be associative and commutative, and merging two accumulators
/// must equal folding `add` over the union of their inputs. That is what lets
/// the rollup fold shards independently and combine them in any order.
pub trait Accumulator: Sized + Send {
    type Input;
    type Output;

    fn create() -> Self;

    fn add(self, input: Self::Input) -> Self;

    fn merge(self, other: Self) -> Self;

    fn extract(self) -> Self::Output;
}

/// Max rating, ARAP/ACCR value sums and row count of a group.
///
/// Sums and the count saturate at their type's bounds instead of overflowing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RatingStats {
    pub max_rating: i64,
    pub sum_value_arap: i64,
    pub sum_value_accr: i64,
    pub count: u64,
}

impl Accumulator for RatingStats {
    type Input = Observation;
    type Output = RatingStats;

    fn create() -> Self {
        RatingStats::default()
    }

    fn add(mut self, input: Observation) -> Self {
        self.count = self.count.saturating_add(1);
        self.max_rating = self.max_rating.max(input.rating);
        match input.status {
            Status::Arap => self.sum_value_arap = self.sum_value_arap.saturating_add(input.value),
            Status::Accr => self.sum_value_accr = self.sum_value_accr.saturating_add(input.value),
            Status::Other => {}
        }
        self
    }

    fn merge(self, other: Self) -> Self {
        RatingStats {
            max_rating: self.max_rating.max(other.max_rating),
            sum_value_arap: self.sum_value_arap.saturating_add(other.sum_value_arap),
            sum_value_accr: self.sum_value_accr.saturating_add(other.sum_value_accr),
            count: self.count.saturating_add(other.count),
        }
    }

    fn extract(self) -> Self::Output {
        self
    }
}
