// Primitives for reading the delimited text files.

use crate::pipeline::*;

use csv::StringRecord;
use encoding_rs::Encoding;
use snafu::prelude::*;
use std::fs;

/// Reads a whole text file in the given encoding.
///
/// Bytes that are not valid in the encoding are an error: they would silently
/// turn into new choice labels.
pub fn read_text(path: &str, encoding: &'static Encoding) -> PResult<String> {
    let bytes = fs::read(path).context(OpeningFileSnafu { path })?;
    let (text, actual, had_errors) = encoding.decode(&bytes);
    ensure!(
        !had_errors,
        UndecodableTextSnafu {
            path,
            encoding: actual.name()
        }
    );
    debug!("read_text: {}: {} bytes as {}", path, bytes.len(), actual.name());
    Ok(text.into_owned())
}

// The text after the first `n` physical lines.
fn skip_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => return "",
        }
    }
    rest
}

/// The records of a decoded text, after skipping the first `skip_rows` lines.
///
/// The skipped lines are physical lines, blank ones included. Returns the
/// records and the number of skipped lines, to pass to [`line_number`].
pub fn get_records(
    text: &str,
    delimiter: u8,
    skip_rows: usize,
) -> (csv::StringRecordsIntoIter<&[u8]>, usize) {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(skip_lines(text, skip_rows).as_bytes());
    (rdr.into_records(), skip_rows)
}

/// The line of a record in the whole file, starting at 1.
pub fn line_number(line: &StringRecord, skipped: usize) -> usize {
    skipped + line.position().map(|p| p.line() as usize).unwrap_or(0)
}

/// The trimmed content of a column.
pub fn get_field<'r>(
    line: &'r StringRecord,
    column: usize,
    path: &str,
    lineno: usize,
) -> PResult<&'r str> {
    line.get(column)
        .map(|s| s.trim())
        .context(CsvLineTooShortSnafu {
            path,
            lineno,
            column,
        })
}

/// Reads an integer column.
pub fn get_number<T: std::str::FromStr>(
    line: &StringRecord,
    column: usize,
    path: &str,
    lineno: usize,
) -> PResult<T> {
    let s = get_field(line, column, path, lineno)?;
    s.parse::<T>().ok().context(ParsingNumberSnafu {
        path,
        lineno,
        column,
        value: s,
    })
}
