use log::{debug, info, warn};

use commune_scores::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use text_diff::print_diff;

use crate::pipeline::config_reader::*;
use crate::pipeline::io_geocoding::read_geocoding;
use crate::pipeline::io_results::read_results;
use crate::pipeline::output::*;

pub mod config_reader;
mod io_common;
mod io_geocoding;
mod io_results;
mod output;

#[derive(Debug, Snafu)]
pub enum PipelineError {
    #[snafu(display("Error opening file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Unknown text encoding {label:?} for {path}"))]
    UnknownEncoding { label: String, path: String },
    #[snafu(display("Invalid delimiter {delimiter:?}: expected a single ASCII character"))]
    InvalidDelimiter { delimiter: String },
    #[snafu(display("{path}: some bytes are not valid {encoding}"))]
    UndecodableText { path: String, encoding: String },
    #[snafu(display("Error reading a CSV line in {path}"))]
    CsvLineParse { source: csv::Error, path: String },
    #[snafu(display("{path}, line {lineno}: the line has no column {column}"))]
    CsvLineTooShort {
        path: String,
        lineno: usize,
        column: usize,
    },
    #[snafu(display("{path}, line {lineno}, column {column}: cannot read {value:?} as a number"))]
    ParsingNumber {
        path: String,
        lineno: usize,
        column: usize,
        value: String,
    },
    #[snafu(display("Error parsing the configuration {path}"))]
    ParsingConfig {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error parsing the reference {path}"))]
    ParsingReference {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Dataset {dataset}: no column is named {column:?}"))]
    MissingColumn { dataset: String, column: String },
    #[snafu(display("Special code prefix {prefix}: cannot understand the transform {value}"))]
    InvalidTransform { prefix: String, value: String },
    #[snafu(display("Cannot find the directory of {path}"))]
    MissingParentDir { path: String },
    #[snafu(display("Dataset {dataset}: {source}"))]
    Integrity {
        source: IntegrityError,
        dataset: String,
    },
    #[snafu(display("Dataset {dataset}: {source}"))]
    Score { source: ScoreError, dataset: String },
    #[snafu(display("Error serializing the communes"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("The serialized communes are not valid UTF-8"))]
    OutputEncoding { source: std::string::FromUtf8Error },
    #[snafu(display("Error writing the communes to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Difference detected between the communes and the reference {path}"))]
    ReferenceMismatch { path: String },
}

pub type PResult<T> = Result<T, PipelineError>;

/// The output destination that prints to the terminal.
const STDOUT: &str = "stdout";

/// Runs the aggregation and the scores of one dataset.
fn score_dataset(root: &Path, ds: &DatasetSource) -> PResult<DatasetScores> {
    let records = read_results(root, ds)?;
    let totals = compute_totals(&records).context(IntegritySnafu {
        dataset: ds.name.clone(),
    })?;
    info!(
        "Dataset {}: {} communes, rounds {:?}",
        ds.name,
        totals.stats.len(),
        totals.rounds()
    );
    let scores = compute_scores(&totals, ds.groupings().as_ref()).context(ScoreSnafu {
        dataset: ds.name.clone(),
    })?;
    Ok(DatasetScores {
        name: ds.name.clone(),
        suffix: ds.suffix.clone(),
        scores,
    })
}

/// Reads all the sources of the configuration and merges them per commune.
///
/// Any failure on a dataset stops the whole computation.
pub fn compute_communes(
    config: &ElectionConfig,
    root: &Path,
) -> PResult<BTreeMap<String, CommuneRecord>> {
    let rules = config.special_code_rules()?;
    let reference = read_geocoding(root, &config.geocoding)?;
    info!("Geocoding reference: {} communes", reference.len());

    let mut datasets: Vec<DatasetScores> = Vec::new();
    for ds in config.datasets.iter() {
        datasets.push(score_dataset(root, ds)?);
    }

    let geocoding = complete_geocoding(&datasets, &reference, &rules);
    Ok(merge_communes(&datasets, &geocoding))
}

pub fn run_pipeline(
    config_path: Option<String>,
    out: Option<String>,
    check_reference_path: Option<String>,
) -> PResult<()> {
    let (config, root): (ElectionConfig, PathBuf) = match config_path {
        Some(p) => {
            let config = read_config(&p)?;
            let root = Path::new(p.as_str())
                .parent()
                .context(MissingParentDirSnafu { path: p.clone() })?
                .to_path_buf();
            (config, root)
        }
        None => {
            info!("No configuration provided, using the historical datasets");
            (builtin_config()?, PathBuf::from("."))
        }
    };
    debug!("config: {:?}", config);

    let communes = compute_communes(&config, root.as_path())?;
    let pretty_js = to_pretty_string(&communes_to_json(&communes))?;

    let destination = out
        .or_else(|| {
            config
                .output_path
                .as_ref()
                .map(|p| root.join(p).display().to_string())
        })
        .unwrap_or_else(|| STDOUT.to_string());
    write_output(&pretty_js, &destination)?;

    // The reference, if provided for comparison
    if let Some(reference_p) = check_reference_path {
        let pretty_js_ref = read_reference(&reference_p)?;
        if pretty_js_ref != pretty_js {
            warn!("Found differences with the reference {}", reference_p);
            print_diff(pretty_js_ref.as_str(), pretty_js.as_str(), "\n");
            return ReferenceMismatchSnafu { path: reference_p }.fail();
        }
        info!("The communes match the reference {}", reference_p);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as JSValue;
    use std::env;
    use std::fs;

    fn temp_dir(name: &str) -> PathBuf {
        let p = env::temp_dir().join(format!("commune_scores_{}_{}", name, std::process::id()));
        fs::create_dir_all(&p).unwrap();
        p
    }

    const GEOCODING: &str = "insee;codespostaux;communes\n\
        01001;01400;L'Abergement-Clémenciat\n\
        01002;01640;L'Abergement-de-Varey\n";

    const CONFIG: &str = r#"{
        "geocoding": { "filePath": "inseeinfos.csv", "skipRows": 1 },
        "datasets": [
            {
                "name": "test",
                "filePath": "results.csv",
                "skipRows": 1,
                "columns": ["tour", "departement", "commune_code", "commune_nom", "bureau",
                            "inscrits", "votants", "exprimes", "choix", "voix"],
                "suffix": "TEST"
            }
        ]
    }"#;

    fn write_fixtures(dir: &Path, results: &str) -> String {
        fs::write(dir.join("inseeinfos.csv"), GEOCODING).unwrap();
        fs::write(dir.join("results.csv"), results).unwrap();
        let config_p = dir.join("config.json");
        fs::write(&config_p, CONFIG).unwrap();
        config_p.display().to_string()
    }

    #[test]
    fn two_communes_end_to_end() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = temp_dir("end_to_end");
        let config_p = write_fixtures(
            &dir,
            "header line\n\
            1;01;001;Abergement;0001;300;160;150;A;100\n\
            1;01;001;Abergement;0001;300;160;150;B;50\n\
            1;01;002;Varey;0001;300;160;150;A;100\n\
            1;01;002;Varey;0001;300;160;150;B;50\n",
        );
        let out_p = dir.join("communes.json").display().to_string();
        run_pipeline(Some(config_p), Some(out_p.clone()), None).unwrap();

        let contents = fs::read_to_string(&out_p).unwrap();
        let js: JSValue = serde_json::from_str(&contents).unwrap();
        let communes = js.as_object().unwrap();
        assert_eq!(communes.len(), 2);
        for code in ["01001", "01002"] {
            let c = &communes[code];
            assert_eq!(c["A_TEST"].as_f64(), Some(33.33));
            assert_eq!(c["B_TEST"].as_f64(), Some(16.67));
        }
        assert_eq!(communes["01001"]["listecodespostaux"], serde_json::json!(["01400"]));
        assert_eq!(communes["01002"]["listecodespostaux"], serde_json::json!(["01640"]));
        assert!(contents.contains("\"A_TEST\": 33.33"));

        // The output is its own reference.
        run_pipeline(
            Some(dir.join("config.json").display().to_string()),
            Some(dir.join("communes2.json").display().to_string()),
            Some(out_p),
        )
        .unwrap();
    }

    #[test]
    fn integrity_failure_writes_nothing() {
        let dir = temp_dir("integrity");
        let config_p = write_fixtures(
            &dir,
            "header line\n\
            1;01;001;Abergement;0001;300;160;150;A;100\n\
            1;01;001;Abergement;0001;301;160;150;B;50\n",
        );
        let out_p = dir.join("communes.json");
        let _ = fs::remove_file(&out_p);
        let res = run_pipeline(Some(config_p), Some(out_p.display().to_string()), None);
        assert!(matches!(
            res,
            Err(PipelineError::Integrity {
                source: IntegrityError::InconsistentStation { .. },
                ..
            })
        ));
        assert!(!out_p.exists());
    }

    #[test]
    fn reference_mismatch() {
        let dir = temp_dir("reference");
        let config_p = write_fixtures(
            &dir,
            "header line\n\
            1;01;001;Abergement;0001;300;160;150;A;100\n\
            1;01;001;Abergement;0001;300;160;150;B;50\n",
        );
        let ref_p = dir.join("reference.json");
        fs::write(&ref_p, r#"{"01001": {"A_TEST": 12.0}}"#).unwrap();
        let res = run_pipeline(
            Some(config_p),
            Some(dir.join("communes.json").display().to_string()),
            Some(ref_p.display().to_string()),
        );
        assert!(matches!(res, Err(PipelineError::ReferenceMismatch { .. })));
    }

    #[test]
    fn special_codes_are_geocoded() {
        let dir = temp_dir("special");
        let config_p = write_fixtures(
            &dir,
            "header line\n\
            1;ZA;123;Saint-Barthelemy;0001;100;60;50;A;50\n\
            1;ZN;001;Noumea;0001;100;60;50;A;50\n\
            1;ZQ;001;Nowhere;0001;100;60;50;A;50\n",
        );
        let (config, root) = (read_config(&config_p).unwrap(), dir.clone());
        let communes = compute_communes(&config, &root).unwrap();
        assert_eq!(
            communes["ZA123"].postal_codes,
            Some(vec!["97133".to_string()])
        );
        assert_eq!(
            communes["ZN001"].postal_codes,
            Some(vec!["NOT_FOUND".to_string()])
        );
        assert_eq!(
            communes["ZQ001"].postal_codes,
            Some(vec!["NOT_FOUND".to_string()])
        );
        // Communes of the reference without results are kept.
        assert!(communes["01001"].scores.is_empty());
    }
}
