use crate::pipeline::config_reader::DatasetSource;
use crate::pipeline::io_common::*;
use crate::pipeline::*;

use snafu::prelude::*;

/// Reads the results file of a dataset into raw records.
///
/// All the columns that are not part of the mapping are ignored. Text fields
/// are trimmed: some files pad the choice labels with spaces.
pub fn read_results(root: &Path, ds: &DatasetSource) -> PResult<Vec<RawRecord>> {
    let path = ds.source.path(root);
    info!("Attempting to read results file {:?} ({})", path, ds.name);
    let mapping = ds.column_mapping()?;
    let text = read_text(&path, ds.source.encoding()?)?;
    let (records, skipped) = get_records(&text, ds.source.delimiter()?, ds.source.skip_rows());

    let mut res: Vec<RawRecord> = Vec::new();
    for line_r in records {
        let line = line_r.context(CsvLineParseSnafu { path: path.clone() })?;
        let lineno = line_number(&line, skipped);
        let p = path.as_str();
        let record = RawRecord {
            round: get_number(&line, mapping.round, p, lineno)?,
            commune: CommuneKey::new(
                get_field(&line, mapping.departement, p, lineno)?,
                get_field(&line, mapping.commune, p, lineno)?,
            ),
            station: get_field(&line, mapping.station, p, lineno)?.to_string(),
            counts: StationCounts {
                registered: get_number(&line, mapping.registered, p, lineno)?,
                turnout: get_number(&line, mapping.turnout, p, lineno)?,
                valid: get_number(&line, mapping.valid, p, lineno)?,
            },
            choice: get_field(&line, mapping.choice, p, lineno)?.to_string(),
            votes: get_number(&line, mapping.votes, p, lineno)?,
        };
        debug!("read_results: lineno: {:?} record: {:?}", lineno, record);
        res.push(record);
    }
    info!("Read {} records from {:?}", res.len(), path);
    Ok(res)
}
