use crate::pipeline::config_reader::TextSource;
use crate::pipeline::io_common::*;
use crate::pipeline::*;

use commune_scores::GeocodingTable;
use snafu::prelude::*;

const INSEE_COLUMN: usize = 0;
const POSTAL_CODES_COLUMN: usize = 1;

/// Reads the geocoding reference: an insee code, then the postal codes separated by `/`.
pub fn read_geocoding(root: &Path, src: &TextSource) -> PResult<GeocodingTable> {
    let path = src.path(root);
    info!("Attempting to read geocoding file {:?}", path);
    let text = read_text(&path, src.encoding()?)?;
    let (records, skipped) = get_records(&text, src.delimiter()?, src.skip_rows());

    let mut rows: Vec<(String, String)> = Vec::new();
    for line_r in records {
        let line = line_r.context(CsvLineParseSnafu { path: path.clone() })?;
        let lineno = line_number(&line, skipped);
        let insee = get_field(&line, INSEE_COLUMN, &path, lineno)?;
        let postal_codes = get_field(&line, POSTAL_CODES_COLUMN, &path, lineno)?;
        rows.push((insee.to_string(), postal_codes.to_string()));
    }
    let table = GeocodingTable::from_rows(rows.iter().map(|(i, p)| (i.as_str(), p.as_str())));
    debug!("read_geocoding: {} rows, {} communes", rows.len(), table.len());
    Ok(table)
}
