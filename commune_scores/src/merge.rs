use log::{debug, info, warn};
use std::collections::BTreeMap;

use crate::config::*;
use crate::geocoding::GeocodingTable;
use crate::scores::ScoreTable;
use crate::special_codes::SpecialCodeResolver;

/// The scores of one dataset, with the suffix that disambiguates its columns.
#[derive(PartialEq, Debug, Clone)]
pub struct DatasetScores {
    pub name: String,
    /// Appended to every column name as `<COLUMN>_<SUFFIX>`. Empty for no suffix.
    pub suffix: String,
    pub scores: ScoreTable,
}

impl DatasetScores {
    pub fn column_name(&self, column: &str) -> String {
        if self.suffix.is_empty() {
            column.to_string()
        } else {
            format!("{}_{}", column, self.suffix)
        }
    }
}

/// Everything known about one commune after the merge.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct CommuneRecord {
    /// Non-null scores, keyed by suffixed column name.
    pub scores: BTreeMap<String, f64>,
    pub postal_codes: Option<Vec<String>>,
}

/// Completes the reference with the special communes found in the datasets.
pub fn complete_geocoding(
    datasets: &[DatasetScores],
    reference: &GeocodingTable,
    rules: &SpecialCodeRules,
) -> GeocodingTable {
    let resolver = SpecialCodeResolver::new(rules, reference);
    resolver.extend_table(datasets.iter().flat_map(|ds| ds.scores.communes()))
}

/// Joins the score tables of all the datasets and the geocoding table on the commune key.
///
/// This is an outer join: a commune appears if it is in any of the tables.
/// The result is keyed by the concatenated department and commune code.
pub fn merge_communes(
    datasets: &[DatasetScores],
    geocoding: &GeocodingTable,
) -> BTreeMap<String, CommuneRecord> {
    let mut records: BTreeMap<&CommuneKey, CommuneRecord> = BTreeMap::new();

    for ds in datasets.iter() {
        let columns: Vec<String> = ds
            .scores
            .columns()
            .iter()
            .map(|c| ds.column_name(c))
            .collect();
        debug!("merge_communes: dataset {}: columns {:?}", ds.name, columns);
        for (commune, row) in ds.scores.rows() {
            let rec = records.entry(commune).or_default();
            for (column, value) in columns.iter().zip(row.iter()) {
                if let Some(v) = value {
                    if rec.scores.insert(column.clone(), *v).is_some() {
                        warn!(
                            "merge_communes: commune {}: column {} is present in several datasets",
                            commune, column
                        );
                    }
                }
            }
        }
    }

    for (commune, codes) in geocoding.iter() {
        records.entry(commune).or_default().postal_codes = Some(codes.to_vec());
    }

    info!(
        "merge_communes: {:?} communes from {:?} datasets",
        records.len(),
        datasets.len()
    );
    records
        .into_iter()
        .map(|(commune, rec)| (commune.code(), rec))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::scores::compute_scores;

    fn dataset(name: &str, suffix: &str, communes: &[(&str, &str)]) -> DatasetScores {
        let mut b = Builder::new();
        for (dep, com) in communes.iter() {
            b.add_station(
                1,
                &CommuneKey::new(dep, com),
                "0001",
                StationCounts::new(300, 200, 150),
                &[("A", 100), ("B", 50)],
            );
        }
        DatasetScores {
            name: name.to_string(),
            suffix: suffix.to_string(),
            scores: compute_scores(&b.build().unwrap(), None).unwrap(),
        }
    }

    #[test]
    fn suffixes_and_outer_join() {
        let d1 = dataset("pres", "PRES", &[("01", "001"), ("01", "002")]);
        let d2 = dataset("legi", "LEGI", &[("01", "002")]);
        let geo = GeocodingTable::from_rows(vec![("01001", "01400"), ("01003", "01500")]);
        let merged = merge_communes(&[d1, d2], &geo);

        assert_eq!(
            merged.keys().cloned().collect::<Vec<String>>(),
            vec!["01001", "01002", "01003"]
        );
        let c1 = &merged["01001"];
        assert_eq!(
            c1.scores.keys().cloned().collect::<Vec<String>>(),
            vec!["A_PRES", "B_PRES"]
        );
        assert_eq!(c1.postal_codes, Some(vec!["01400".to_string()]));
        let c2 = &merged["01002"];
        assert_eq!(c2.scores.len(), 4);
        assert_eq!(c2.postal_codes, None);
        let c3 = &merged["01003"];
        assert!(c3.scores.is_empty());
    }

    #[test]
    fn empty_suffix_keeps_the_label() {
        let d = dataset("plain", "", &[("01", "001")]);
        assert_eq!(d.column_name("A"), "A");
        let merged = merge_communes(&[d], &GeocodingTable::default());
        assert!(merged["01001"].scores.contains_key("B"));
    }

    #[test]
    fn missing_scores_are_dropped() {
        let mut b = Builder::new();
        b.add_station(
            1,
            &CommuneKey::new("01", "009"),
            "0001",
            StationCounts::new(0, 0, 0),
            &[("A", 0)],
        );
        let d = DatasetScores {
            name: "empty".to_string(),
            suffix: "X".to_string(),
            scores: compute_scores(&b.build().unwrap(), None).unwrap(),
        };
        let merged = merge_communes(&[d], &GeocodingTable::default());
        assert!(merged["01009"].scores.is_empty());
    }

    #[test]
    fn special_communes_get_postal_codes() {
        let d = dataset("pres", "PRES", &[("ZA", "123"), ("ZN", "001"), ("01", "001")]);
        let reference = GeocodingTable::from_rows(vec![("01001", "01400")]);
        let geo = complete_geocoding(
            std::slice::from_ref(&d),
            &reference,
            &SpecialCodeRules::french_overseas(),
        );
        let merged = merge_communes(&[d], &geo);
        assert_eq!(
            merged["ZA123"].postal_codes,
            Some(vec!["97133".to_string()])
        );
        assert_eq!(
            merged["ZN001"].postal_codes,
            Some(vec![NOT_FOUND.to_string()])
        );
        assert_eq!(
            merged["01001"].postal_codes,
            Some(vec!["01400".to_string()])
        );
    }
}
