// Serialization of the merged communes.

use crate::pipeline::*;

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use serde_json::{Map, Number, Value as JSValue};
use snafu::prelude::*;
use std::fs;
use std::io;

/// The field that holds the postal codes of a commune.
pub const POSTAL_CODES_FIELD: &str = "listecodespostaux";

/// Pretty printing with 4 spaces, and every float with exactly two decimals.
struct TwoDecimalFormatter<'a> {
    inner: PrettyFormatter<'a>,
}

impl<'a> TwoDecimalFormatter<'a> {
    fn new() -> Self {
        TwoDecimalFormatter {
            inner: PrettyFormatter::with_indent(b"    "),
        }
    }
}

impl<'a> Formatter for TwoDecimalFormatter<'a> {
    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        write!(writer, "{:.2}", value)
    }

    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_array(writer)
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_object(writer)
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_object_value(writer)
    }
}

/// The JSON object of the communes, keyed by commune code.
pub fn communes_to_json(communes: &BTreeMap<String, CommuneRecord>) -> JSValue {
    let mut res: Map<String, JSValue> = Map::new();
    for (code, rec) in communes.iter() {
        let mut fields: Map<String, JSValue> = Map::new();
        for (column, value) in rec.scores.iter() {
            match Number::from_f64(*value) {
                Some(n) => {
                    fields.insert(column.clone(), JSValue::Number(n));
                }
                None => {
                    warn!("communes_to_json: {}: dropping {} = {}", code, column, value);
                }
            }
        }
        if let Some(codes) = &rec.postal_codes {
            fields.insert(
                POSTAL_CODES_FIELD.to_string(),
                JSValue::Array(codes.iter().map(|c| JSValue::String(c.clone())).collect()),
            );
        }
        res.insert(code.clone(), JSValue::Object(fields));
    }
    JSValue::Object(res)
}

pub fn to_pretty_string(js: &JSValue) -> PResult<String> {
    let mut buf: Vec<u8> = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, TwoDecimalFormatter::new());
    js.serialize(&mut ser).context(SerializingJsonSnafu {})?;
    String::from_utf8(buf).context(OutputEncodingSnafu {})
}

/// Writes the text to a file, or to the terminal for `stdout`.
pub fn write_output(text: &str, destination: &str) -> PResult<()> {
    if destination == STDOUT {
        println!("{}", text);
        return Ok(());
    }
    info!("Writing the communes to {:?}", destination);
    fs::write(destination, text).context(WritingOutputSnafu { path: destination })
}

/// Reads a reference file and formats it the same way as the output.
pub fn read_reference(path: &str) -> PResult<String> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingReferenceSnafu { path })?;
    to_pretty_string(&js)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn two_decimals() {
        let js = json!({"b": 30.0, "a": [1.0, 2.5], "c": {"d": 16.666666}});
        let s = to_pretty_string(&js).unwrap();
        assert_eq!(
            s,
            "{\n    \"a\": [\n        1.00,\n        2.50\n    ],\n    \"b\": 30.00,\n    \"c\": {\n        \"d\": 16.67\n    }\n}"
        );
    }

    #[test]
    fn communes_fields() {
        let mut communes: BTreeMap<String, CommuneRecord> = BTreeMap::new();
        let mut rec = CommuneRecord::default();
        rec.scores.insert("OUI_TCE".to_string(), 30.0);
        rec.scores.insert("NON_TCE".to_string(), f64::NAN);
        rec.postal_codes = Some(vec!["01400".to_string()]);
        communes.insert("01001".to_string(), rec);
        communes.insert(
            "01002".to_string(),
            CommuneRecord {
                scores: BTreeMap::new(),
                postal_codes: None,
            },
        );
        let js = communes_to_json(&communes);
        assert_eq!(
            js,
            json!({
                "01001": {"OUI_TCE": 30.0, "listecodespostaux": ["01400"]},
                "01002": {}
            })
        );
    }

    #[test]
    fn reference_is_normalized() {
        let p = std::env::temp_dir().join(format!("commune_scores_ref_{}.json", std::process::id()));
        fs::write(&p, r#"{"01001":{"OUI_TCE":30}}"#).unwrap();
        let s = read_reference(&p.display().to_string()).unwrap();
        assert_eq!(s, "{\n    \"01001\": {\n        \"OUI_TCE\": 30\n    }\n}");
    }
}
