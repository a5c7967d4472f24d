//! The postal codes of each commune.

use log::debug;
use std::collections::BTreeMap;

use crate::config::CommuneKey;

/// Length of the department part of an insee code.
const DEPARTEMENT_LEN: usize = 2;

/// Maps a commune to the list of its postal codes.
///
/// A commune may span several postal codes. The table is read-only once built:
/// adding the special codes produces a new table.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct GeocodingTable {
    entries: BTreeMap<CommuneKey, Vec<String>>,
}

impl GeocodingTable {
    /// Builds the table from the rows of the reference file.
    ///
    /// Each row is an insee code (department then commune) and the postal codes
    /// separated by `/`. Rows with an insee code too short to be split are skipped.
    pub fn from_rows<'a, I>(rows: I) -> GeocodingTable
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut entries: BTreeMap<CommuneKey, Vec<String>> = BTreeMap::new();
        for (insee, postal_codes) in rows {
            match split_insee(insee) {
                Some(key) => {
                    let codes: Vec<String> = postal_codes
                        .split('/')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                    entries.insert(key, codes);
                }
                None => {
                    debug!("GeocodingTable: skipping insee code {:?}", insee);
                }
            }
        }
        GeocodingTable { entries }
    }

    pub fn get(&self, key: &CommuneKey) -> Option<&[String]> {
        self.entries.get(key).map(|v| v.as_slice())
    }

    /// Looks up a full insee code such as `97133`.
    pub fn get_insee(&self, insee: &str) -> Option<&[String]> {
        split_insee(insee).and_then(|key| self.get(&key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CommuneKey, &[String])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A copy of this table with the given entries added.
    ///
    /// Existing entries are replaced.
    pub fn with_entries<I>(&self, extra: I) -> GeocodingTable
    where
        I: IntoIterator<Item = (CommuneKey, Vec<String>)>,
    {
        let mut entries = self.entries.clone();
        entries.extend(extra);
        GeocodingTable { entries }
    }
}

/// Splits an insee code into its department and commune parts.
pub fn split_insee(insee: &str) -> Option<CommuneKey> {
    let insee = insee.trim();
    if insee.len() <= DEPARTEMENT_LEN || !insee.is_char_boundary(DEPARTEMENT_LEN) {
        return None;
    }
    let (departement, commune) = insee.split_at(DEPARTEMENT_LEN);
    Some(CommuneKey::new(departement, commune))
}
