use crate::pipeline::*;

use encoding_rs::Encoding;
use snafu::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use std::fs;

/// The description of the historical datasets.
const HISTORICAL_CONFIG: &str = include_str!("../../config/historical.json");

const DEFAULT_ENCODING: &str = "utf-8";
const DEFAULT_DELIMITER: u8 = b';';

/// A delimited text file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TextSource {
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// The label of the text encoding (`utf-8`, `windows-1252`, ...). It is declared, never guessed.
    pub encoding: Option<String>,
    /// The number of lines to skip before the data.
    #[serde(rename = "skipRows")]
    pub skip_rows: Option<usize>,
    pub delimiter: Option<String>,
}

impl TextSource {
    pub fn path(&self, root: &Path) -> String {
        root.join(&self.file_path).display().to_string()
    }

    pub fn encoding(&self) -> PResult<&'static Encoding> {
        let label = self.encoding.as_deref().unwrap_or(DEFAULT_ENCODING);
        Encoding::for_label(label.as_bytes()).context(UnknownEncodingSnafu {
            label,
            path: self.file_path.clone(),
        })
    }

    pub fn delimiter(&self) -> PResult<u8> {
        match self.delimiter.as_deref() {
            None => Ok(DEFAULT_DELIMITER),
            Some(d) if d.len() == 1 && d.is_ascii() => Ok(d.as_bytes()[0]),
            Some(d) => InvalidDelimiterSnafu { delimiter: d }.fail(),
        }
    }

    pub fn skip_rows(&self) -> usize {
        self.skip_rows.unwrap_or(0)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub choices: Vec<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct GroupingsConfig {
    pub first: GroupConfig,
    pub second: GroupConfig,
    #[serde(rename = "unionName")]
    pub union_name: String,
}

/// One results file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSource {
    pub name: String,
    #[serde(flatten)]
    pub source: TextSource,
    /// The names of all the columns of the file, in order.
    pub columns: Vec<String>,
    /// Appended to the names of the score columns of this dataset.
    pub suffix: String,
    pub groupings: Option<GroupingsConfig>,
}

/// The positions of the fields of a raw record in a results file.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ColumnMapping {
    pub round: usize,
    pub departement: usize,
    pub commune: usize,
    pub station: usize,
    pub registered: usize,
    pub turnout: usize,
    pub valid: usize,
    pub choice: usize,
    pub votes: usize,
}

impl DatasetSource {
    pub fn column_mapping(&self) -> PResult<ColumnMapping> {
        let find = |column: &str| -> PResult<usize> {
            self.columns
                .iter()
                .position(|c| c == column)
                .context(MissingColumnSnafu {
                    dataset: self.name.clone(),
                    column,
                })
        };
        Ok(ColumnMapping {
            round: find("tour")?,
            departement: find("departement")?,
            commune: find("commune_code")?,
            station: find("bureau")?,
            registered: find("inscrits")?,
            turnout: find("votants")?,
            valid: find("exprimes")?,
            choice: find("choix")?,
            votes: find("voix")?,
        })
    }

    pub fn groupings(&self) -> Option<Groupings> {
        self.groupings.as_ref().map(|g| Groupings {
            first: NamedGroup {
                name: g.first.name.clone(),
                choices: g.first.choices.clone(),
            },
            second: NamedGroup {
                name: g.second.name.clone(),
                choices: g.second.choices.clone(),
            },
            union_name: g.union_name.clone(),
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SpecialCodesConfig {
    /// For each prefix: a number to add, "noData" or "invalid".
    pub transforms: BTreeMap<String, JSValue>,
    pub overrides: BTreeMap<String, String>,
}

impl SpecialCodesConfig {
    pub fn rules(&self) -> PResult<SpecialCodeRules> {
        let mut transforms: BTreeMap<String, CodeTransform> = BTreeMap::new();
        for (prefix, value) in self.transforms.iter() {
            transforms.insert(prefix.clone(), read_transform(prefix, value)?);
        }
        Ok(SpecialCodeRules {
            transforms,
            overrides: self.overrides.clone(),
        })
    }
}

fn read_transform(prefix: &str, x: &JSValue) -> PResult<CodeTransform> {
    match x {
        JSValue::Number(n) => n
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(CodeTransform::Offset)
            .context(InvalidTransformSnafu {
                prefix,
                value: x.to_string(),
            }),
        JSValue::String(s) if s == "noData" => Ok(CodeTransform::NoData),
        JSValue::String(s) if s == "invalid" => Ok(CodeTransform::Invalid),
        _ => InvalidTransformSnafu {
            prefix,
            value: x.to_string(),
        }
        .fail(),
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionConfig {
    pub geocoding: TextSource,
    pub datasets: Vec<DatasetSource>,
    #[serde(rename = "specialCodes")]
    pub special_codes: Option<SpecialCodesConfig>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

impl ElectionConfig {
    pub fn special_code_rules(&self) -> PResult<SpecialCodeRules> {
        match &self.special_codes {
            Some(sc) => sc.rules(),
            None => Ok(SpecialCodeRules::french_overseas()),
        }
    }
}

pub fn read_config(path: &str) -> PResult<ElectionConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingConfigSnafu { path })
}

pub fn builtin_config() -> PResult<ElectionConfig> {
    serde_json::from_str(HISTORICAL_CONFIG).context(ParsingConfigSnafu {
        path: "config/historical.json",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn historical_datasets() {
        let config = builtin_config().unwrap();
        let names: Vec<&str> = config.datasets.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["tce_2005", "pres_2007", "pres_2012", "legi_2012"]);
        for ds in config.datasets.iter() {
            ds.column_mapping().unwrap();
            ds.source.encoding().unwrap();
            assert_eq!(ds.source.delimiter().unwrap(), b';');
        }
        let tce = &config.datasets[0];
        assert_eq!(tce.source.skip_rows(), 20);
        assert_eq!(tce.source.encoding().unwrap(), encoding_rs::WINDOWS_1252);
        assert!(tce.groupings().is_none());
        let mapping = tce.column_mapping().unwrap();
        assert_eq!(mapping.commune, 6);
        assert_eq!(mapping.station, 9);
        assert_eq!(mapping.votes, 15);
        let pres = config.datasets[2].groupings().unwrap();
        assert_eq!(pres.second.choices, vec!["MELE", "ARTH", "POUT"]);
        assert_eq!(
            config.special_code_rules().unwrap(),
            SpecialCodeRules::french_overseas()
        );
    }

    #[test]
    fn missing_column() {
        let mut ds = builtin_config().unwrap().datasets[1].clone();
        ds.columns.retain(|c| c != "bureau");
        assert!(matches!(
            ds.column_mapping(),
            Err(PipelineError::MissingColumn { column, .. }) if column == "bureau"
        ));
    }

    #[test]
    fn invalid_encoding_and_delimiter() {
        let src = TextSource {
            file_path: "x.csv".to_string(),
            encoding: Some("klingon".to_string()),
            skip_rows: None,
            delimiter: Some(";;".to_string()),
        };
        assert!(matches!(
            src.encoding(),
            Err(PipelineError::UnknownEncoding { .. })
        ));
        assert!(matches!(
            src.delimiter(),
            Err(PipelineError::InvalidDelimiter { .. })
        ));
        assert_eq!(src.skip_rows(), 0);
    }

    #[test]
    fn special_codes_from_json() {
        let sc: SpecialCodesConfig = serde_json::from_str(
            r#"{"transforms": {"ZA": 97000, "ZZ": "noData", "ZW": "invalid"},
                "overrides": {"ZA123": "97133"}}"#,
        )
        .unwrap();
        let rules = sc.rules().unwrap();
        assert_eq!(rules.transforms["ZA"], CodeTransform::Offset(97000));
        assert_eq!(rules.transforms["ZZ"], CodeTransform::NoData);
        assert_eq!(rules.transforms["ZW"], CodeTransform::Invalid);

        let bad: SpecialCodesConfig =
            serde_json::from_str(r#"{"transforms": {"ZA": "plus"}, "overrides": {}}"#).unwrap();
        assert!(matches!(
            bad.rules(),
            Err(PipelineError::InvalidTransform { .. })
        ));
    }
}
