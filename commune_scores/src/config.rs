// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// The number of a voting round (tour) within one election, starting at 1.
pub type Round = u32;

/// Department codes starting with this letter denote overseas collectivities
/// that are not part of the standard geocoding reference.
pub const SPECIAL_PREFIX: char = 'Z';

/// Stable identity of a commune across all datasets and the geocoding table.
///
/// Ordering is lexicographic on the department code, then on the commune code.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct CommuneKey {
    pub departement: String,
    pub commune: String,
}

impl CommuneKey {
    pub fn new(departement: &str, commune: &str) -> CommuneKey {
        CommuneKey {
            departement: departement.to_string(),
            commune: commune.to_string(),
        }
    }

    /// The concatenated department and commune code, used as the key of the output.
    pub fn code(&self) -> String {
        format!("{}{}", self.departement, self.commune)
    }

    /// True for the overseas codes (`ZA`, `ZN`, ...) that need a special resolution.
    pub fn is_special(&self) -> bool {
        self.departement.starts_with(SPECIAL_PREFIX)
    }
}

impl Display for CommuneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.departement, self.commune)
    }
}

/// The three counts that the sources repeat on every choice row of a polling station.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct StationCounts {
    /// inscrits
    pub registered: u64,
    /// votants
    pub turnout: u64,
    /// exprimes
    pub valid: u64,
}

impl StationCounts {
    pub fn new(registered: u64, turnout: u64, valid: u64) -> StationCounts {
        StationCounts {
            registered,
            turnout,
            valid,
        }
    }

    pub fn get(&self, statistic: Statistic) -> u64 {
        match statistic {
            Statistic::Valid => self.valid,
            Statistic::Registered => self.registered,
            Statistic::Turnout => self.turnout,
        }
    }
}

/// One row of a results file: the votes of one choice in one polling station
/// for one round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RawRecord {
    pub round: Round,
    pub commune: CommuneKey,
    /// The polling station (bureau) identifier, unique within a commune.
    pub station: String,
    pub counts: StationCounts,
    /// The candidate or party label.
    pub choice: String,
    pub votes: u64,
}

/// The per-commune statistics.
///
/// The variants are declared in the order of their labels, which is the order
/// of the columns in a [`StatsTable`].
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum Statistic {
    /// exprimes
    Valid,
    /// inscrits
    Registered,
    /// votants
    Turnout,
}

impl Statistic {
    pub const ALL: [Statistic; 3] = [Statistic::Valid, Statistic::Registered, Statistic::Turnout];

    pub fn label(&self) -> &'static str {
        match self {
            Statistic::Valid => "exprimes",
            Statistic::Registered => "inscrits",
            Statistic::Turnout => "votants",
        }
    }
}

// ******** Output data structures *********

/// A dense table with one row per commune and a fixed list of columns.
///
/// Every row has exactly one value per column: absent combinations are filled
/// when the table is built, never left out. Rows are sorted by commune key.
#[derive(PartialEq, Debug, Clone)]
pub struct Table<C, V = u64> {
    columns: Vec<C>,
    rows: BTreeMap<CommuneKey, Vec<V>>,
}

impl<C: PartialEq, V: Copy> Table<C, V> {
    pub fn new(columns: Vec<C>) -> Table<C, V> {
        Table {
            columns,
            rows: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> &[C] {
        &self.columns
    }

    pub fn column_index(&self, column: &C) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn row(&self, key: &CommuneKey) -> Option<&[V]> {
        self.rows.get(key).map(|v| v.as_slice())
    }

    pub fn get(&self, key: &CommuneKey, column: &C) -> Option<V> {
        let idx = self.column_index(column)?;
        self.rows.get(key).map(|row| row[idx])
    }

    pub fn rows(&self) -> impl Iterator<Item = (&CommuneKey, &[V])> {
        self.rows.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn communes(&self) -> impl Iterator<Item = &CommuneKey> {
        self.rows.keys()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn insert_row(&mut self, key: CommuneKey, values: Vec<V>) {
        debug_assert_eq!(
            values.len(),
            self.columns.len(),
            "row {} does not match the columns",
            key
        );
        self.rows.insert(key, values);
    }
}

/// Registered, turnout and valid counts per commune, with (round, statistic) columns.
pub type StatsTable = Table<(Round, Statistic)>;

/// Votes per commune, with (round, choice) columns.
pub type ChoiceTable = Table<(Round, String)>;

/// The output of the aggregation of one dataset.
#[derive(PartialEq, Debug, Clone)]
pub struct CommuneTotals {
    pub stats: StatsTable,
    pub choices: ChoiceTable,
}

impl CommuneTotals {
    /// All the rounds of the dataset, in increasing order.
    pub fn rounds(&self) -> Vec<Round> {
        let mut rounds: Vec<Round> = self.stats.columns().iter().map(|(r, _)| *r).collect();
        rounds.dedup();
        rounds
    }
}

/// Errors that abort the aggregation of a dataset.
///
/// These are never recovered: a dataset that fails them cannot be trusted.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum IntegrityError {
    /// Two rows of the same polling station disagree on a repeated count.
    InconsistentStation {
        commune: CommuneKey,
        round: Round,
        station: String,
        statistic: Statistic,
        first: u64,
        second: u64,
    },
    /// The valid votes of a commune do not match the sum of the votes of its choices.
    VoteMismatch {
        commune: CommuneKey,
        round: Round,
        valid: u64,
        choices: u64,
    },
}

impl Error for IntegrityError {}

impl Display for IntegrityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityError::InconsistentStation {
                commune,
                round,
                station,
                statistic,
                first,
                second,
            } => write!(
                f,
                "commune {} round {} station {}: '{}' has different values ({} and {})",
                commune,
                round,
                station,
                statistic.label(),
                first,
                second
            ),
            IntegrityError::VoteMismatch {
                commune,
                round,
                valid,
                choices,
            } => write!(
                f,
                "commune {} round {}: {} valid votes but {} votes over all the choices",
                commune, round, valid, choices
            ),
        }
    }
}

/// Errors when computing the scores of a dataset.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ScoreError {
    /// A grouping refers to a choice that is not in the first round of the dataset.
    UnknownChoice { group: String, label: String },
}

impl Error for ScoreError {}

impl Display for ScoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoreError::UnknownChoice { group, label } => write!(
                f,
                "group {}: choice {:?} is not present in the first round",
                group, label
            ),
        }
    }
}

// ********* Configuration **********

/// A named set of choices whose scores are added together.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NamedGroup {
    pub name: String,
    pub choices: Vec<String>,
}

impl NamedGroup {
    pub fn new(name: &str, choices: &[&str]) -> NamedGroup {
        NamedGroup {
            name: name.to_string(),
            choices: choices.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// The two opposing groupings of a dataset and the name of their union.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Groupings {
    pub first: NamedGroup,
    pub second: NamedGroup,
    pub union_name: String,
}

/// How the numeric part of a special code maps to a standard insee code.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CodeTransform {
    /// Adds a fixed base to the numeric suffix.
    Offset(u32),
    /// The territory has no data at all.
    NoData,
    /// Codes of this prefix are only handled through the overrides.
    Invalid,
}

/// The postal code returned for the territories that have no data.
pub const NO_DATA_CODE: &str = "00000";

/// The marker returned in place of a postal code list when nothing was found.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Insee codes with this prefix are absent from the reference table.
pub const UNSUPPORTED_INSEE_PREFIX: &str = "98";

/// The tables used to resolve special codes.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SpecialCodeRules {
    /// Transform for each two-letter prefix.
    pub transforms: BTreeMap<String, CodeTransform>,
    /// Postal codes of the known exceptions, keyed by the full special code
    /// (or by an insee code produced by a transform).
    pub overrides: BTreeMap<String, String>,
}

impl SpecialCodeRules {
    /// The rules for the overseas codes found in the historical datasets.
    pub fn french_overseas() -> SpecialCodeRules {
        let transforms = [
            ("ZA", CodeTransform::Offset(97000)),
            ("ZB", CodeTransform::Offset(97000)),
            ("ZC", CodeTransform::Offset(97000)),
            ("ZD", CodeTransform::Offset(97000)),
            ("ZM", CodeTransform::Offset(97100)),
            ("ZN", CodeTransform::Offset(98000)),
            ("ZP", CodeTransform::Offset(98700)),
            // Only Miquelon-Langlade, which is missing from the reference.
            ("ZS", CodeTransform::Offset(97000)),
            ("ZX", CodeTransform::Offset(97000)),
            // Wallis-et-Futuna
            ("ZW", CodeTransform::Invalid),
            ("ZZ", CodeTransform::NoData),
        ];
        let overrides = [
            ("ZA123", "97133"), // Saint-Barthélemy
            ("ZA127", "97150"), // Saint-Martin (2007)
            ("ZS501", "97500"), // Miquelon-Langlade
            ("ZS502", "97410"), // Saint-Pierre
            ("ZX701", "97133"), // Saint-Barthélemy
            ("ZX801", "97150"), // Saint-Martin (2012)
            ("ZW001", "98620"),
        ];
        SpecialCodeRules {
            transforms: transforms
                .iter()
                .map(|(p, t)| (p.to_string(), *t))
                .collect(),
            overrides: overrides
                .iter()
                .map(|(c, p)| (c.to_string(), p.to_string()))
                .collect(),
        }
    }
}
