use itertools::Itertools;
use std::fmt;

/// Grouping dimensions of the cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Entity,
    Counterparty,
    Tier,
}

impl Dimension {
    /// Column order of the output artifact.
    pub const OUTPUT_ORDER: [Dimension; 3] =
        [Dimension::Entity, Dimension::Counterparty, Dimension::Tier];

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Entity => "legal_entity",
            Dimension::Counterparty => "counter_party",
            Dimension::Tier => "tier",
        }
    }

    /// Collapsing every dimension except this one alone is not a valid rollup.
    fn is_collapse_excluded(self) -> bool {
        matches!(self, Dimension::Entity | Dimension::Counterparty)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the combinator reacts to an excluded combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombinationMode {
    /// Stop the current combination size at the first excluded combination.
    #[default]
    Reference,
    /// Skip only the excluded combination and keep enumerating.
    SkipExcluded,
}

/// Ordered, duplicate-free list of dimensions to build the cube over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionSet {
    dimensions: Vec<Dimension>,
}

impl Default for DimensionSet {
    fn default() -> Self {
        DimensionSet {
            dimensions: Dimension::OUTPUT_ORDER.to_vec(),
        }
    }
}

impl DimensionSet {
    /// Builds a set in the given order; repeated dimensions keep their first position.
    pub fn new(dimensions: impl IntoIterator<Item = Dimension>) -> Self {
        DimensionSet {
            dimensions: dimensions.into_iter().unique().collect(),
        }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Enumerates the subsets to aggregate over, sizes `1..len`, smallest first.
    ///
    /// A combination whose remaining part is exactly `{legal_entity}` or
    /// `{counter_party}` is excluded. In [`CombinationMode::Reference`] the
    /// first excluded combination also ends enumeration for its size.
    ///
    /// The default `[legal_entity, counter_party, tier]` order yields four
    /// subsets in either mode. Other orders can yield fewer in `Reference`
    /// mode, which [`CombinationMode::SkipExcluded`] avoids. A set of just
    /// `legal_entity` and `counter_party` yields no subsets at all, since
    /// each size-1 combination leaves the other one alone.
    pub fn subsets(&self, mode: CombinationMode) -> Vec<Subset> {
        let mut subsets = Vec::new();

        for size in 1..self.dimensions.len() {
            for selected in self.dimensions.iter().copied().combinations(size) {
                let remaining: Vec<Dimension> = self
                    .dimensions
                    .iter()
                    .copied()
                    .filter(|d| !selected.contains(d))
                    .collect();

                let excluded =
                    matches!(remaining.as_slice(), [only] if only.is_collapse_excluded());
                if excluded {
                    match mode {
                        CombinationMode::Reference => break,
                        CombinationMode::SkipExcluded => continue,
                    }
                }

                subsets.push(Subset {
                    selected,
                    remaining,
                });
            }
        }

        subsets
    }
}

/// A split of the dimension set into grouped and collapsed dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subset {
    selected: Vec<Dimension>,
    remaining: Vec<Dimension>,
}

impl Subset {
    pub fn selected(&self) -> &[Dimension] {
        &self.selected
    }

    pub fn remaining(&self) -> &[Dimension] {
        &self.remaining
    }

    pub fn is_selected(&self, dimension: Dimension) -> bool {
        self.selected.contains(&dimension)
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] | [{}]",
            self.selected.iter().join(","),
            self.remaining.iter().join(",")
        )
    }
}
