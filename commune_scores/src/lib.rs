mod config;
pub mod builder;
pub mod geocoding;
pub mod manual;
pub mod merge;
pub mod scores;
pub mod special_codes;

use log::{debug, info};

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    ops::{Add, AddAssign},
};

pub use crate::config::*;
pub use crate::geocoding::GeocodingTable;
pub use crate::merge::{complete_geocoding, merge_communes, CommuneRecord, DatasetScores};
pub use crate::scores::{compute_scores, ScoreTable};
pub use crate::special_codes::{Resolution, SpecialCodeResolver};

// **** Private structures ****

// A polling station within one round.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
struct StationKey<'a> {
    commune: &'a CommuneKey,
    round: Round,
    station: &'a str,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0 + rhs.0)
    }
}

/// Aggregates the records of one dataset into per-commune totals.
///
/// Arguments:
/// * `records` all the rows of the dataset, in any order
///
/// The registered, turnout and valid counts are repeated on every row of a
/// polling station: they must agree, and they are counted once per station.
/// The valid votes of every commune and round must then add up to the votes
/// of all the choices. Any violation is returned as an [`IntegrityError`].
///
/// Rounds or choices that are absent for a commune are filled with zero.
pub fn compute_totals(records: &[RawRecord]) -> Result<CommuneTotals, IntegrityError> {
    info!("compute_totals: processing {:?} records", records.len());

    let rounds: Vec<Round> = records
        .iter()
        .map(|r| r.round)
        .collect::<BTreeSet<Round>>()
        .into_iter()
        .collect();
    debug!("compute_totals: rounds: {:?}", rounds);

    let stations = check_stations(records)?;
    debug!("compute_totals: {:?} polling stations", stations.len());

    let stats = commune_stats(&stations, &rounds);
    let choices = choice_tally(records);
    check_vote_conservation(&stats, &choices, &rounds)?;

    info!(
        "compute_totals: {:?} communes, {:?} choice columns",
        stats.len(),
        choices.columns().len()
    );
    Ok(CommuneTotals { stats, choices })
}

// Keeps one set of counts per polling station, after checking that all the rows agree.
fn check_stations(
    records: &[RawRecord],
) -> Result<HashMap<StationKey<'_>, StationCounts>, IntegrityError> {
    let mut stations: HashMap<StationKey, StationCounts> = HashMap::new();
    for r in records.iter() {
        let key = StationKey {
            commune: &r.commune,
            round: r.round,
            station: r.station.as_str(),
        };
        if let Some(first) = stations.get(&key) {
            let difference = Statistic::ALL
                .iter()
                .find(|stat| first.get(**stat) != r.counts.get(**stat));
            if let Some(stat) = difference {
                return Err(IntegrityError::InconsistentStation {
                    commune: r.commune.clone(),
                    round: r.round,
                    station: r.station.clone(),
                    statistic: *stat,
                    first: first.get(*stat),
                    second: r.counts.get(*stat),
                });
            }
        } else {
            stations.insert(key, r.counts);
        }
    }
    Ok(stations)
}

fn commune_stats(stations: &HashMap<StationKey, StationCounts>, rounds: &[Round]) -> StatsTable {
    let mut sums: BTreeMap<&CommuneKey, HashMap<(Round, Statistic), VoteCount>> = BTreeMap::new();
    for (key, counts) in stations.iter() {
        let commune_sums = sums.entry(key.commune).or_insert_with(HashMap::new);
        for stat in Statistic::ALL {
            let e = commune_sums
                .entry((key.round, stat))
                .or_insert(VoteCount::EMPTY);
            *e += VoteCount(counts.get(stat));
        }
    }

    let columns: Vec<(Round, Statistic)> = rounds
        .iter()
        .flat_map(|r| Statistic::ALL.iter().map(move |s| (*r, *s)))
        .collect();
    let mut table = StatsTable::new(columns.clone());
    for (commune, commune_sums) in sums.into_iter() {
        let values = columns
            .iter()
            .map(|col| commune_sums.get(col).cloned().unwrap_or(VoteCount::EMPTY).0)
            .collect();
        table.insert_row(commune.clone(), values);
    }
    table
}

fn choice_tally(records: &[RawRecord]) -> ChoiceTable {
    let mut sums: BTreeMap<&CommuneKey, HashMap<(Round, &str), VoteCount>> = BTreeMap::new();
    let mut columns: BTreeSet<(Round, &str)> = BTreeSet::new();
    for r in records.iter() {
        columns.insert((r.round, r.choice.as_str()));
        let e = sums
            .entry(&r.commune)
            .or_insert_with(HashMap::new)
            .entry((r.round, r.choice.as_str()))
            .or_insert(VoteCount::EMPTY);
        *e += VoteCount(r.votes);
    }

    let mut table = ChoiceTable::new(columns.iter().map(|(r, c)| (*r, c.to_string())).collect());
    for (commune, commune_sums) in sums.into_iter() {
        // Not all the choices are present everywhere (legislative elections).
        let values = columns
            .iter()
            .map(|col| commune_sums.get(col).cloned().unwrap_or(VoteCount::EMPTY).0)
            .collect();
        table.insert_row(commune.clone(), values);
    }
    table
}

fn check_vote_conservation(
    stats: &StatsTable,
    choices: &ChoiceTable,
    rounds: &[Round],
) -> Result<(), IntegrityError> {
    for (commune, _) in stats.rows() {
        let choice_row: &[u64] = choices.row(commune).unwrap_or(&[]);
        for round in rounds.iter() {
            let valid = stats
                .get(commune, &(*round, Statistic::Valid))
                .unwrap_or(0);
            let total: VoteCount = choices
                .columns()
                .iter()
                .zip(choice_row.iter())
                .filter(|((r, _), _)| r == round)
                .map(|(_, v)| VoteCount(*v))
                .sum();
            if total != VoteCount(valid) {
                return Err(IntegrityError::VoteMismatch {
                    commune: commune.clone(),
                    round: *round,
                    valid,
                    choices: total.0,
                });
            }
        }
    }
    Ok(())
}
