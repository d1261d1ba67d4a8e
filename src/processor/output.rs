use arrow2::{
    array::{Array, Int64Array, MutableUtf8Array, Utf8Array},
    chunk::Chunk,
    datatypes::{DataType, Field, Schema},
    io::ipc::write::{FileWriter, WriteOptions},
};
use std::{
    fmt,
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
    sync::Arc,
};
use tracing::info;

use crate::processor::{
    RollupError, Value, accumulator::RatingStats, dimension::Dimension, dimension::Subset,
    group_key::GroupKey,
};

/// Column names of the output artifact.
pub const OUTPUT_COLUMNS: [&str; 6] = [
    "legal_entity",
    "counter_party",
    "tier",
    "max_rating",
    "total_value_ARAP",
    "total_value_ACCR",
];

/// One row of the rollup artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputRow {
    pub entity: Value,
    pub counterparty: Value,
    pub tier: Value,
    pub max_rating: i64,
    pub sum_value_arap: i64,
    pub sum_value_accr: i64,
}

impl OutputRow {
    pub fn new(
        entity: Value,
        counterparty: Value,
        tier: Value,
        max_rating: i64,
        sum_value_arap: i64,
        sum_value_accr: i64,
    ) -> Self {
        OutputRow {
            entity,
            counterparty,
            tier,
            max_rating,
            sum_value_arap,
            sum_value_accr,
        }
    }

    /// Dimension cells in output column order.
    pub fn dimension_cells(&self) -> [&Value; 3] {
        [&self.entity, &self.counterparty, &self.tier]
    }

    /// All six fields rendered as text.
    pub fn fields(&self) -> [String; 6] {
        [
            self.entity.to_string(),
            self.counterparty.to_string(),
            self.tier.to_string(),
            self.max_rating.to_string(),
            self.sum_value_arap.to_string(),
            self.sum_value_accr.to_string(),
        ]
    }
}

impl fmt::Display for OutputRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{}",
            self.entity,
            self.counterparty,
            self.tier,
            self.max_rating,
            self.sum_value_arap,
            self.sum_value_accr
        )
    }
}

/// Maps a group onto the fixed output schema.
///
/// A dimension outside the subset's selection is filled with the group's
/// record count rather than left empty.
pub struct OutputFormatter;

impl OutputFormatter {
    pub fn format(subset: &Subset, key: &GroupKey, stats: &RatingStats) -> OutputRow {
        let cell = |dimension: Dimension| match key.value(dimension) {
            Some(value) if subset.is_selected(dimension) => value.clone(),
            _ => Value::Int(stats.count as i64),
        };

        OutputRow {
            entity: cell(Dimension::Entity),
            counterparty: cell(Dimension::Counterparty),
            tier: cell(Dimension::Tier),
            max_rating: stats.max_rating,
            sum_value_arap: stats.sum_value_arap,
            sum_value_accr: stats.sum_value_accr,
        }
    }
}

/// Writes `rows` as a delimited file with a header line, creating parent directories.
pub fn write_csv(path: &Path, rows: &[OutputRow]) -> Result<usize, RollupError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{}", OUTPUT_COLUMNS.join(","))?;
    for row in rows {
        writeln!(writer, "{}", row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "wrote rollup output");
    Ok(rows.len())
}

/// Converts rows into an Arrow chunk.
///
/// The entity and counterparty columns are Utf8 (they may hold a count
/// placeholder); `tier` and the measures are Int64.
pub fn to_arrow(rows: &[OutputRow]) -> Result<(Schema, Chunk<Arc<dyn Array>>), RollupError> {
    let fields: Vec<Field> = OUTPUT_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let dtype = if i < 2 { DataType::Utf8 } else { DataType::Int64 };
            Field::new(*name, dtype, false)
        })
        .collect();
    let schema = Schema::from(fields);

    let arrays = vec![
        text_column(rows, |r| &r.entity),
        text_column(rows, |r| &r.counterparty),
        tier_column(rows)?,
        int_column(rows, |r| r.max_rating),
        int_column(rows, |r| r.sum_value_arap),
        int_column(rows, |r| r.sum_value_accr),
    ];

    Ok((schema, Chunk::try_new(arrays)?))
}

/// Writes `rows` as a single-chunk Arrow IPC file, creating parent directories.
pub fn write_arrow(path: &Path, rows: &[OutputRow]) -> Result<usize, RollupError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let (schema, chunk) = to_arrow(rows)?;
    // the IPC writer takes owned arrays
    let chunk = Chunk::try_new(
        chunk
            .into_arrays()
            .into_iter()
            .map(|array| array.to_boxed())
            .collect::<Vec<Box<dyn Array>>>(),
    )?;

    let file = BufWriter::new(File::create(path)?);
    let mut writer = FileWriter::try_new(file, schema, None, WriteOptions { compression: None })?;
    writer.write(&chunk, None)?;
    writer.finish()?;

    info!(path = %path.display(), rows = rows.len(), "wrote arrow output");
    Ok(rows.len())
}

fn text_column(rows: &[OutputRow], cell: impl Fn(&OutputRow) -> &Value) -> Arc<dyn Array> {
    let mut arr = MutableUtf8Array::<i32>::with_capacity(rows.len());
    for row in rows {
        arr.push(Some(cell(row).to_string()));
    }
    let array: Utf8Array<i32> = arr.into();
    Arc::new(array)
}

fn tier_column(rows: &[OutputRow]) -> Result<Arc<dyn Array>, RollupError> {
    let tiers = rows
        .iter()
        .map(|row| {
            row.tier.as_int().ok_or_else(|| {
                arrow2::error::Error::InvalidArgumentError(format!(
                    "non-integer tier cell '{}'",
                    row.tier
                ))
            })
        })
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(Arc::new(Int64Array::from_vec(tiers)))
}

fn int_column(rows: &[OutputRow], measure: impl Fn(&OutputRow) -> i64) -> Arc<dyn Array> {
    Arc::new(Int64Array::from_vec(rows.iter().map(measure).collect()))
}
