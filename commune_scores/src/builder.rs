pub use crate::config::*;

/// A builder for adding polling station results.
///
/// The sources repeat the station counts on every choice row. The builder
/// does the same, so that the records it produces go through the same checks
/// as the ones read from a file.
///
/// ```
/// pub use commune_scores::builder::Builder;
/// pub use commune_scores::{CommuneKey, Statistic, StationCounts};
/// # use commune_scores::IntegrityError;
///
/// let mut builder = Builder::new();
/// let commune = CommuneKey::new("01", "001");
/// builder.add_station(1, &commune, "0001", StationCounts::new(300, 160, 150), &[("A", 100), ("B", 50)]);
///
/// let totals = builder.build()?;
/// assert_eq!(totals.stats.get(&commune, &(1, Statistic::Registered)), Some(300));
///
/// # Ok::<(), IntegrityError>(())
/// ```
#[derive(Debug, Default)]
pub struct Builder {
    pub(crate) _records: Vec<RawRecord>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _records: Vec::new(),
        }
    }

    /// Adds the results of one polling station for one round.
    ///
    /// choices: the label and the number of votes of each choice. A station
    /// without choices adds no record.
    pub fn add_station(
        &mut self,
        round: Round,
        commune: &CommuneKey,
        station: &str,
        counts: StationCounts,
        choices: &[(&str, u64)],
    ) {
        for (choice, votes) in choices.iter() {
            self.add_record(RawRecord {
                round,
                commune: commune.clone(),
                station: station.to_string(),
                counts,
                choice: choice.to_string(),
                votes: *votes,
            });
        }
    }

    pub fn add_record(&mut self, record: RawRecord) {
        self._records.push(record);
    }

    pub fn records(&self) -> &[RawRecord] {
        &self._records
    }

    /// Runs the aggregation on all the records added so far.
    pub fn build(&self) -> Result<CommuneTotals, IntegrityError> {
        crate::compute_totals(&self._records)
    }
}
