use memchr::{memchr, memchr_iter};

/// Picks the line terminator of a buffer: `\n` (with optional `\r` before it)
/// unless the buffer only ever uses a bare `\r`.
pub fn line_terminator(buf: &[u8]) -> u8 {
    if memchr(b'\n', buf).is_none() && memchr(b'\r', buf).is_some() {
        b'\r'
    } else {
        b'\n'
    }
}

/// Splits `data` into at most `num_chunks` ranges, each ending right after a
/// `term` byte (or at the end of the buffer).
pub fn find_chunk_boundaries(data: &[u8], num_chunks: usize, term: u8) -> Vec<(usize, usize)> {
    if data.is_empty() {
        return vec![];
    }

    let num_chunks = num_chunks.max(1);
    let chunk_size = data.len() / num_chunks;
    let mut boundaries = Vec::with_capacity(num_chunks);
    let mut start = 0;

    for i in 0..num_chunks - 1 {
        let target = ((i + 1) * chunk_size).max(start);
        if target >= data.len() {
            break;
        }

        // Find next line end
        let end = match memchr(term, &data[target..]) {
            Some(pos) => target + pos + 1,
            None => data.len(),
        };

        if start < end {
            boundaries.push((start, end));
        }
        start = end;
    }

    // Last chunk gets everything remaining
    if start < data.len() {
        boundaries.push((start, data.len()));
    }

    boundaries
}

/// Splits off the first line. Returns `(line, rest)`; `rest` is empty when there is no terminator.
pub fn split_first_line(buf: &[u8], term: u8) -> (&[u8], &[u8]) {
    match memchr(term, buf) {
        Some(pos) => (strip_cr(&buf[..pos]), &buf[pos + 1..]),
        None => (buf, &buf[buf.len()..]),
    }
}

/// Iterates the lines of a chunk as `(line_index, line)`, without the line terminator.
///
/// Every line is yielded, blank ones included, so indices stay aligned with the file.
pub fn lines(chunk: &[u8], term: u8) -> impl Iterator<Item = (usize, &[u8])> + '_ {
    let mut start = 0;
    let mut ends = memchr_iter(term, chunk)
        .map(Some)
        .chain(std::iter::once(None));

    std::iter::from_fn(move || {
        loop {
            let end = ends.next()?;
            let line_start = start;
            match end {
                Some(pos) => {
                    start = pos + 1;
                    return Some(strip_cr(&chunk[line_start..pos]));
                }
                // trailing bytes without a final terminator
                None if line_start < chunk.len() => {
                    start = chunk.len();
                    return Some(strip_cr(&chunk[line_start..]));
                }
                None => continue,
            }
        }
    })
    .enumerate()
}

/// Counts the lines `lines` would yield for this chunk.
pub fn count_lines(chunk: &[u8], term: u8) -> usize {
    let ends = memchr_iter(term, chunk).count();
    match chunk.last() {
        None => ends,
        Some(&last) if last == term => ends,
        Some(_) => ends + 1,
    }
}

pub fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// Splits a line on commas into `fields`, trimming ASCII whitespace around each field.
pub fn split_fields<'a>(line: &'a [u8], fields: &mut Vec<&'a [u8]>) {
    fields.clear();
    let mut field_start = 0;
    for comma_pos in memchr_iter(b',', line) {
        fields.push(line[field_start..comma_pos].trim_ascii());
        field_start = comma_pos + 1;
    }
    fields.push(line[field_start..].trim_ascii());
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_cover_buffer_on_line_boundaries() {
        let data = b"1,a\n2,b\n3,c\n4,d\n5,e\n";
        for n in 1..8 {
            let chunks = find_chunk_boundaries(data, n, b'\n');
            assert_eq!(chunks.first().map(|c| c.0), Some(0));
            assert_eq!(chunks.last().map(|c| c.1), Some(data.len()));
            for w in chunks.windows(2) {
                assert_eq!(w[0].1, w[1].0);
                assert_eq!(data[w[0].1 - 1], b'\n');
            }
            let total: usize = chunks
                .iter()
                .map(|&(s, e)| count_lines(&data[s..e], b'\n'))
                .sum();
            assert_eq!(total, 5);
        }
    }

    #[test]
    fn test_cr_only_chunks() {
        let data = b"1,a\r2,b\r3,c\r4,d";
        assert_eq!(line_terminator(data), b'\r');
        for n in 1..6 {
            let chunks = find_chunk_boundaries(data, n, b'\r');
            for w in chunks.windows(2) {
                assert_eq!(data[w[0].1 - 1], b'\r');
            }
            let total: usize = chunks
                .iter()
                .map(|&(s, e)| count_lines(&data[s..e], b'\r'))
                .sum();
            assert_eq!(total, 4);
        }
    }

    #[test]
    fn test_line_terminator_detection() {
        assert_eq!(line_terminator(b"a\nb\n"), b'\n');
        assert_eq!(line_terminator(b"a\r\nb\r\n"), b'\n');
        assert_eq!(line_terminator(b"a\rb\r"), b'\r');
        assert_eq!(line_terminator(b"a,b"), b'\n');
        assert_eq!(line_terminator(b""), b'\n');
    }

    #[test]
    fn test_empty_buffer_has_no_chunks() {
        assert!(find_chunk_boundaries(b"", 4, b'\n').is_empty());
    }

    #[test]
    fn test_lines_strip_terminators() {
        let chunk = b"a,b\r\n\r\nc,d";
        let got: Vec<(usize, &[u8])> = lines(chunk, b'\n').collect();
        assert_eq!(
            got,
            vec![(0, &b"a,b"[..]), (1, &b""[..]), (2, &b"c,d"[..])]
        );
        assert_eq!(count_lines(chunk, b'\n'), 3);
        assert_eq!(count_lines(b"x\n", b'\n'), 1);
        assert_eq!(count_lines(b"", b'\n'), 0);

        let got: Vec<(usize, &[u8])> = lines(b"a,b\r\rc,d\r", b'\r').collect();
        assert_eq!(
            got,
            vec![(0, &b"a,b"[..]), (1, &b""[..]), (2, &b"c,d"[..])]
        );
        assert_eq!(count_lines(b"a,b\r\rc,d\r", b'\r'), 3);
    }

    #[test]
    fn test_split_fields_trims() {
        let mut fields = Vec::new();
        split_fields(b"1, L1 ,C1,,5", &mut fields);
        assert_eq!(
            fields,
            vec![&b"1"[..], &b"L1"[..], &b"C1"[..], &b""[..], &b"5"[..]]
        );
    }

    #[test]
    fn test_split_first_line() {
        assert_eq!(
            split_first_line(b"h1,h2\nrow", b'\n'),
            (&b"h1,h2"[..], &b"row"[..])
        );
        assert_eq!(
            split_first_line(b"h1,h2\r\nrow", b'\n'),
            (&b"h1,h2"[..], &b"row"[..])
        );
        assert_eq!(
            split_first_line(b"h1,h2\rrow\r", b'\r'),
            (&b"h1,h2"[..], &b"row\r"[..])
        );
        assert_eq!(split_first_line(b"h1,h2", b'\n'), (&b"h1,h2"[..], &b""[..]));
        assert!(is_blank(b" \t\r"));
        assert!(!is_blank(b" x"));
    }
}
