use crate::processor::{
    Value,
    dimension::{Dimension, Subset},
    record::EnrichedRecord,
};

/// Values of the selected dimensions of one group, in dimension-set order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    parts: Vec<(Dimension, Value)>,
}

impl GroupKey {
    pub fn parts(&self) -> &[(Dimension, Value)] {
        &self.parts
    }

    pub fn value(&self, dimension: Dimension) -> Option<&Value> {
        self.parts
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, v)| v)
    }
}

impl FromIterator<(Dimension, Value)> for GroupKey {
    fn from_iter<T: IntoIterator<Item = (Dimension, Value)>>(iter: T) -> Self {
        GroupKey {
            parts: iter.into_iter().collect(),
        }
    }
}

/// Derives group keys for one subset.
#[derive(Debug, Clone, Copy)]
pub struct GroupKeyBuilder<'a> {
    subset: &'a Subset,
}

impl<'a> GroupKeyBuilder<'a> {
    pub fn new(subset: &'a Subset) -> Self {
        GroupKeyBuilder { subset }
    }

    pub fn key_for(&self, record: &EnrichedRecord) -> GroupKey {
        self.subset
            .selected()
            .iter()
            .map(|&d| (d, record.dimension_value(d)))
            .collect()
    }

    /// Dimensions collapsed by this subset; their output cells hold the group count.
    pub fn remaining(&self) -> &'a [Dimension] {
        self.subset.remaining()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::dimension::{CombinationMode, DimensionSet};
    use crate::processor::record::{Record, Status};

    #[test]
    fn test_key_follows_selected_dimensions() {
        let subsets = DimensionSet::default().subsets(CombinationMode::Reference);
        let rec = EnrichedRecord::new(Record::new(7, "L2", "C9", 1, Status::Accr, 40), 2);

        let by_pair = GroupKeyBuilder::new(&subsets[3]);
        let key = by_pair.key_for(&rec);
        assert_eq!(
            key.parts(),
            &[
                (Dimension::Entity, Value::from("L2")),
                (Dimension::Counterparty, Value::from("C9")),
            ]
        );
        assert_eq!(key.value(Dimension::Tier), None);
        assert_eq!(by_pair.remaining(), &[Dimension::Tier]);

        let by_tier = GroupKeyBuilder::new(&subsets[2]);
        assert_eq!(by_tier.key_for(&rec).value(Dimension::Tier), Some(&Value::Int(2)));
    }

    #[test]
    fn test_records_sharing_values_share_key() {
        let subsets = DimensionSet::default().subsets(CombinationMode::Reference);
        let builder = GroupKeyBuilder::new(&subsets[0]);
        let a = EnrichedRecord::new(Record::new(1, "L1", "C1", 1, Status::Arap, 1), 1);
        let b = EnrichedRecord::new(Record::new(2, "L1", "C2", 9, Status::Accr, 5), 4);
        assert_eq!(builder.key_for(&a), builder.key_for(&b));
    }
}
