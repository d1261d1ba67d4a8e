use memmap2::Mmap;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use std::{fs::File, path::Path, str};
use tracing::{debug, info, warn};

use crate::{
    helpers::csv_chunks::{
        count_lines, find_chunk_boundaries, is_blank, line_terminator, lines, split_fields,
        split_first_line,
    },
    processor::{
        ParseError, ParseSummary, RollupError,
        join::TierLookup,
        record::{Record, Status},
    },
};

const RECORD_COLUMNS: [&str; 6] = ["id", "entity", "counterparty", "rating", "status", "value"];
const TIER_COLUMNS: [&str; 2] = ["counterparty", "tier"];

/// Rows parsed from one newline-aligned chunk.
struct BatchResult<T> {
    rows: Vec<T>,
    /// Line numbers are chunk-relative until the batch is merged
    errors: Vec<ParseError>,
    line_count: usize,
}

/// Memory-maps `path` and parses every data line with `parse_line`, in parallel.
///
/// Lines end in `\n` or `\r\n`; a file without any `\n` is split on bare `\r`.
/// The header line is skipped. An empty file yields no rows. Rows that fail
/// to parse are collected in the returned [`ParseSummary`], with exact 1-based
/// file line numbers.
fn load_delimited<T, F>(
    path: &Path,
    parse_line: F,
) -> Result<(Vec<T>, ParseSummary), RollupError>
where
    T: Send,
    F: Fn(&[&[u8]]) -> Result<T, ParseError> + Sync,
{
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        debug!(path = %path.display(), "empty input file");
        return Ok((Vec::new(), ParseSummary::default()));
    }

    let mmap = unsafe { Mmap::map(&file)? };
    let buf: &[u8] = &mmap[..];

    let term = line_terminator(buf);
    if term == b'\r' {
        debug!(path = %path.display(), "input uses bare CR line endings");
    }
    let (_header, data) = split_first_line(buf, term);

    let num_threads = rayon::current_num_threads();
    let chunks = find_chunk_boundaries(data, num_threads, term);

    let batches: Vec<BatchResult<T>> = chunks
        .par_iter()
        .map(|&(start, end)| parse_chunk(&data[start..end], term, &parse_line))
        .collect();

    let mut rows = Vec::with_capacity(batches.iter().map(|b| b.rows.len()).sum());
    let mut summary = ParseSummary::default();
    // the header occupies line 1
    let mut first_line = 2;

    for batch in batches {
        summary.rows_processed += batch.rows.len();
        summary.errors.extend(batch.errors.into_iter().map(|mut e| {
            e.line += first_line;
            e
        }));
        first_line += batch.line_count;
        rows.extend(batch.rows);
    }

    for error in &summary.errors {
        warn!(path = %path.display(), "rejected row: {}", error);
    }

    Ok((rows, summary))
}

fn parse_chunk<T, F>(chunk: &[u8], term: u8, parse_line: &F) -> BatchResult<T>
where
    F: Fn(&[&[u8]]) -> Result<T, ParseError>,
{
    let mut rows = Vec::new();
    let mut errors = Vec::new();
    let mut fields = Vec::with_capacity(RECORD_COLUMNS.len());

    for (idx, line) in lines(chunk, term) {
        if is_blank(line) {
            continue;
        }

        split_fields(line, &mut fields);
        match parse_line(&fields) {
            Ok(row) => rows.push(row),
            Err(mut e) => {
                e.line = idx;
                errors.push(e);
            }
        }
    }

    BatchResult {
        rows,
        errors,
        line_count: count_lines(chunk, term),
    }
}

fn row_error(fields: &[&[u8]], column: &str, error: String) -> ParseError {
    ParseError {
        line: 0,
        column: column.to_string(),
        value: fields
            .iter()
            .map(|f| String::from_utf8_lossy(f))
            .collect::<Vec<_>>()
            .join(","),
        error,
    }
}

fn check_width(fields: &[&[u8]], expected: usize) -> Result<(), ParseError> {
    if fields.len() != expected {
        return Err(row_error(
            fields,
            "",
            format!("Expected {} fields, got {}", expected, fields.len()),
        ));
    }
    Ok(())
}

fn parse_int(field: &[u8], column: &str) -> Result<i64, ParseError> {
    atoi_simd::parse::<i64>(field).map_err(|e| ParseError {
        line: 0,
        column: column.to_string(),
        value: String::from_utf8_lossy(field).to_string(),
        error: e.to_string(),
    })
}

fn parse_str<'a>(field: &'a [u8], column: &str) -> Result<&'a str, ParseError> {
    str::from_utf8(field).map_err(|e| ParseError {
        line: 0,
        column: column.to_string(),
        value: String::from_utf8_lossy(field).to_string(),
        error: RollupError::from(e).to_string(),
    })
}

fn parse_record(fields: &[&[u8]]) -> Result<Record, ParseError> {
    check_width(fields, RECORD_COLUMNS.len())?;

    Ok(Record {
        id: parse_int(fields[0], RECORD_COLUMNS[0])?,
        entity: parse_str(fields[1], RECORD_COLUMNS[1])?.to_string(),
        counterparty: parse_str(fields[2], RECORD_COLUMNS[2])?.to_string(),
        rating: parse_int(fields[3], RECORD_COLUMNS[3])?,
        status: Status::parse(parse_str(fields[4], RECORD_COLUMNS[4])?),
        value: parse_int(fields[5], RECORD_COLUMNS[5])?,
    })
}

fn parse_tier(fields: &[&[u8]]) -> Result<(String, i64), ParseError> {
    check_width(fields, TIER_COLUMNS.len())?;

    let counterparty = parse_str(fields[0], TIER_COLUMNS[0])?.to_string();
    let tier = parse_int(fields[1], TIER_COLUMNS[1])?;
    Ok((counterparty, tier))
}

/// Loads the records file (`id,entity,counterparty,rating,status,value`).
///
/// # Errors
/// Returns [`RollupError::Io`] if the file cannot be opened or mapped.
/// Malformed rows are not errors; see [`ParseSummary`].
pub fn load_records(path: &Path) -> Result<(Vec<Record>, ParseSummary), RollupError> {
    let (records, summary) = load_delimited(path, parse_record)?;
    info!(
        path = %path.display(),
        rows = summary.rows_processed,
        rejected = summary.rows_rejected(),
        "loaded records"
    );
    Ok((records, summary))
}

/// Loads the counterparty tier file (`counterparty,tier`) into a [`TierLookup`].
///
/// When a counterparty appears more than once the later row wins.
pub fn load_tier_lookup(path: &Path) -> Result<(TierLookup, ParseSummary), RollupError> {
    let (pairs, summary) = load_delimited(path, parse_tier)?;

    let mut lookup = TierLookup::new();
    let mut overridden = 0;
    for (counterparty, tier) in &pairs {
        if lookup.insert(counterparty, *tier).is_some() {
            overridden += 1;
        }
    }
    if overridden > 0 {
        warn!(path = %path.display(), overridden, "duplicate counterparties in tier lookup");
    }

    info!(
        path = %path.display(),
        entries = lookup.len(),
        rejected = summary.rows_rejected(),
        "loaded tier lookup"
    );
    Ok((lookup, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_tmp(contents: &str) -> NamedTempFile {
        write_tmp_bytes(contents.as_bytes())
    }

    fn write_tmp_bytes(contents: &[u8]) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(contents).unwrap();
        tmp
    }

    #[test]
    fn test_load_records() {
        let tmp = write_tmp(
            "invoice_id,legal_entity,counter_party,rating,status,value\n\
             1,L1,C1,5,ARAP,100\n\
             2,L2,C2,3,ACCR,40\n",
        );
        let (records, summary) = load_records(tmp.path()).unwrap();
        assert_eq!(summary.rows_processed, 2);
        assert!(summary.errors.is_empty());

        let mut records = records;
        records.sort_by_key(|r| r.id);
        assert_eq!(records[0], Record::new(1, "L1", "C1", 5, Status::Arap, 100));
        assert_eq!(records[1], Record::new(2, "L2", "C2", 3, Status::Accr, 40));
    }

    #[test]
    fn test_malformed_rows_are_rejected_with_line_numbers() {
        let tmp = write_tmp(
            "id,e,c,r,s,v\r\n\
             1,L1,C1,5,ARAP,100\r\n\
             2,L1,C1,abc,ARAP,100\r\n\
             \r\n\
             3,L1,C1\r\n\
             4,L1,C1,1,PAID,7",
        );
        let (records, summary) = load_records(tmp.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(summary.rows_processed, 2);
        assert_eq!(summary.rows_rejected(), 2);

        let mut errors = summary.errors.clone();
        errors.sort_by_key(|e| e.line);
        assert_eq!(errors[0].line, 3);
        assert_eq!(errors[0].column, "rating");
        assert_eq!(errors[0].value, "abc");
        assert_eq!(errors[1].line, 5);
        assert_eq!(errors[1].column, "");
        assert!(errors[1].error.contains("Expected 6 fields, got 3"));

        let other = records.iter().find(|r| r.id == 4).unwrap();
        assert_eq!(other.status, Status::Other);
        assert_eq!(other.value, 7);
    }

    #[test]
    fn test_empty_and_header_only_files() {
        let empty = write_tmp("");
        let (records, summary) = load_records(empty.path()).unwrap();
        assert!(records.is_empty());
        assert_eq!(summary, ParseSummary::default());

        let header_only = write_tmp("id,e,c,r,s,v\n");
        let (records, summary) = load_records(header_only.path()).unwrap();
        assert!(records.is_empty());
        assert_eq!(summary.rows_processed, 0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_records(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, RollupError::Io(_)));
    }

    #[test]
    fn test_load_tier_lookup_last_wins() {
        let tmp = write_tmp("counter_party,tier\nC1,1\nC2,2\nC1,3\nC3,x\n");
        let (lookup, summary) = load_tier_lookup(tmp.path()).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.tier("C1"), Some(3));
        assert_eq!(lookup.tier("C2"), Some(2));
        assert_eq!(lookup.tier("C3"), None);
        assert_eq!(summary.rows_rejected(), 1);
        assert_eq!(summary.errors[0].line, 5);
    }

    #[test]
    fn test_line_numbers_span_chunks() {
        let mut csv = String::from("id,e,c,r,s,v\n");
        for i in 0..500 {
            if i % 97 == 0 {
                csv.push_str("bad,row\n");
            } else {
                csv.push_str(&format!("{i},L1,C1,1,ARAP,1\n"));
            }
        }
        let tmp = write_tmp(&csv);

        let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
        let (records, summary) = pool.install(|| load_records(tmp.path())).unwrap();

        assert_eq!(records.len(), 500 - 6);
        let mut lines: Vec<usize> = summary.errors.iter().map(|e| e.line).collect();
        lines.sort();
        assert_eq!(lines, vec![2, 99, 196, 293, 390, 487]);
    }

    #[test]
    fn test_cr_only_line_endings() {
        let tmp = write_tmp(
            "id,e,c,r,s,v\r\
             1,L1,C1,5,ARAP,100\r\
             2,L1,C1,x,ARAP,1\r\
             3,L2,C2,3,ACCR,40\r",
        );
        let (records, summary) = load_records(tmp.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(summary.rows_rejected(), 1);
        assert_eq!(summary.errors[0].line, 3);
        assert_eq!(summary.errors[0].column, "rating");

        let tiers = write_tmp("counter_party,tier\rC1,3\rC2,1");
        let (lookup, summary) = load_tier_lookup(tiers.path()).unwrap();
        assert!(summary.errors.is_empty());
        assert_eq!(lookup.tier("C1"), Some(3));
        assert_eq!(lookup.tier("C2"), Some(1));
    }

    #[test]
    fn test_cr_only_line_numbers_span_chunks() {
        let mut csv = String::from("id,e,c,r,s,v\r");
        for i in 0..300 {
            if i % 50 == 0 {
                csv.push_str("bad\r");
            } else {
                csv.push_str(&format!("{i},L1,C1,1,ARAP,1\r"));
            }
        }
        let tmp = write_tmp(&csv);

        let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
        let (records, summary) = pool.install(|| load_records(tmp.path())).unwrap();

        assert_eq!(records.len(), 300 - 6);
        let mut lines: Vec<usize> = summary.errors.iter().map(|e| e.line).collect();
        lines.sort();
        assert_eq!(lines, vec![2, 52, 102, 152, 202, 252]);
    }

    #[test]
    fn test_invalid_utf8_rejects_only_that_row() {
        let tmp = write_tmp_bytes(
            b"id,e,c,r,s,v\n\
              1,L\xff1,C1,5,ARAP,100\n\
              2,L1,C1,7,ACCR,50\n",
        );
        let (records, summary) = load_records(tmp.path()).unwrap();
        assert_eq!(records, vec![Record::new(2, "L1", "C1", 7, Status::Accr, 50)]);
        assert_eq!(summary.rows_rejected(), 1);

        let error = &summary.errors[0];
        assert_eq!(error.line, 2);
        assert_eq!(error.column, "entity");
        assert!(error.error.starts_with("UTF8 error"), "{}", error.error);
    }

    #[test]
    fn test_tier_row_with_wrong_width_is_rejected() {
        let tmp = write_tmp("counter_party,tier\nC1,3\nC2\nC3,1,9\nC4,2\n");
        let (lookup, summary) = load_tier_lookup(tmp.path()).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.tier("C2"), None);
        assert_eq!(lookup.tier("C3"), None);

        let mut errors = summary.errors.clone();
        errors.sort_by_key(|e| e.line);
        assert_eq!(errors.len(), 2);
        assert_eq!((errors[0].line, errors[1].line), (3, 4));
        assert!(errors[0].error.contains("Expected 2 fields, got 1"));
        assert!(errors[1].error.contains("Expected 2 fields, got 3"));
    }
}
