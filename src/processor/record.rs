use std::fmt;

use crate::processor::{Value, dimension::Dimension};

/// Status flag of a record. Only `Arap` and `Accr` feed the value sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Arap,
    Accr,
    Other,
}

impl Status {
    /// Exact, case-sensitive match; anything else is `Other`.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ARAP" => Status::Arap,
            "ACCR" => Status::Accr,
            _ => Status::Other,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Arap => f.write_str("ARAP"),
            Status::Accr => f.write_str("ACCR"),
            Status::Other => f.write_str("other"),
        }
    }
}

/// One parsed row of the records file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub entity: String,
    pub counterparty: String,
    pub rating: i64,
    pub status: Status,
    pub value: i64,
}

impl Record {
    pub fn new(
        id: i64,
        entity: &str,
        counterparty: &str,
        rating: i64,
        status: Status,
        value: i64,
    ) -> Self {
        Record {
            id,
            entity: entity.to_string(),
            counterparty: counterparty.to_string(),
            rating,
            status,
            value,
        }
    }
}

/// A record with its counterparty tier resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub record: Record,
    pub tier: i64,
}

impl EnrichedRecord {
    pub fn new(record: Record, tier: i64) -> Self {
        EnrichedRecord { record, tier }
    }

    pub fn dimension_value(&self, dimension: Dimension) -> Value {
        match dimension {
            Dimension::Entity => Value::Str(self.record.entity.clone()),
            Dimension::Counterparty => Value::Str(self.record.counterparty.clone()),
            Dimension::Tier => Value::Int(self.tier),
        }
    }

    pub fn observation(&self) -> Observation {
        Observation {
            status: self.record.status,
            rating: self.record.rating,
            value: self.record.value,
        }
    }
}

/// The slice of a record an accumulator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub status: Status,
    pub rating: i64,
    pub value: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        assert_eq!(Status::parse("ARAP"), Status::Arap);
        assert_eq!(Status::parse("ACCR"), Status::Accr);
        assert_eq!(Status::parse("arap"), Status::Other);
        assert_eq!(Status::parse("PAID").to_string(), "other");
    }

    #[test]
    fn test_dimension_value() {
        let rec = EnrichedRecord::new(Record::new(1, "L1", "C1", 5, Status::Arap, 100), 3);
        assert_eq!(rec.dimension_value(Dimension::Entity), Value::from("L1"));
        assert_eq!(rec.dimension_value(Dimension::Counterparty), Value::from("C1"));
        assert_eq!(rec.dimension_value(Dimension::Tier), Value::Int(3));
    }
}
