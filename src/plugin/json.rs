//! JSON writer and reader plugins
//!
//! Output is a pretty-printed array of objects, one object per record with
//! keys in layout order. Import accepts the same shape and flattens array
//! values back into indexed `Name[i]` columns.

use std::collections::HashMap;
use std::io::{BufRead, Write as IoWrite};

use anyhow::{Context, Result};
use serde_json::{json, Map, Value as JsonValue};

use crate::dbc::{DecodedRecord, Value};
use crate::dbd::{ResolvedField, VersionDefinition};

use super::{Reader, Writer};

pub struct JsonWriter<W: IoWrite> {
    out: W,
    fields: Vec<ResolvedField>,
    started: bool,
}

impl<W: IoWrite> JsonWriter<W> {
    pub fn new(out: W) -> Self {
        JsonWriter {
            out,
            fields: Vec::new(),
            started: false,
        }
    }
}

impl<W: IoWrite> Writer for JsonWriter<W> {
    fn write_header(&mut self, definition: &VersionDefinition) -> Result<()> {
        self.fields = definition.fields.clone();
        self.out.write_all(b"[").context("Failed to write JSON output")?;
        Ok(())
    }

    fn write_record(&mut self, record: &DecodedRecord) -> Result<()> {
        let mut object = Map::new();
        for field in &self.fields {
            if field.is_noninline {
                continue;
            }
            let value = match record.get(field.name()) {
                Some(value) => value_to_json(value),
                None => JsonValue::Null,
            };
            object.insert(field.name().to_string(), value);
        }

        if self.started {
            self.out.write_all(b",").context("Failed to write JSON output")?;
        }
        self.started = true;

        let text = serde_json::to_string_pretty(&JsonValue::Object(object))
            .context("Failed to serialize record")?;
        for line in text.lines() {
            write!(self.out, "\n  {}", line).context("Failed to write JSON output")?;
        }
        Ok(())
    }

    fn write_footer(&mut self) -> Result<()> {
        self.out.write_all(b"\n]\n").context("Failed to write JSON output")?;
        self.out.flush().context("Failed to flush JSON output")?;
        Ok(())
    }
}

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Int(v) => json!(*v),
        Value::UInt(v) => json!(*v),
        Value::Float(v) => json!(*v),
        Value::String(s) => json!(s),
        Value::LocString(loc) => json!(loc.primary()),
        Value::Array(items) => JsonValue::Array(items.iter().map(value_to_json).collect()),
    }
}

pub struct JsonReader<R: BufRead> {
    source: Option<R>,
    records: std::vec::IntoIter<HashMap<String, String>>,
    columns: Vec<String>,
}

impl<R: BufRead> JsonReader<R> {
    pub fn new(source: R) -> Self {
        JsonReader {
            source: Some(source),
            records: Vec::new().into_iter(),
            columns: Vec::new(),
        }
    }

    fn load(&mut self) -> Result<()> {
        let source = match self.source.take() {
            Some(source) => source,
            None => return Ok(()),
        };
        let objects: Vec<Map<String, JsonValue>> =
            serde_json::from_reader(source).context("Failed to parse JSON input")?;

        let mut records = Vec::with_capacity(objects.len());
        for object in &objects {
            records.push(flatten_object(object));
        }
        if let Some(first) = objects.first() {
            for (key, value) in first {
                match value {
                    JsonValue::Array(items) => {
                        for i in 0..items.len() {
                            self.columns.push(format!("{}[{}]", key, i));
                        }
                    }
                    _ => self.columns.push(key.clone()),
                }
            }
        }
        self.records = records.into_iter();
        Ok(())
    }
}

impl<R: BufRead> Reader for JsonReader<R> {
    fn read_header(&mut self) -> Result<Vec<String>> {
        self.load()?;
        Ok(self.columns.clone())
    }

    fn read_record(&mut self) -> Result<Option<HashMap<String, String>>> {
        self.load()?;
        Ok(self.records.next())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Expands array values into `Name[i]` cells so JSON and CSV imports
/// present the same flat shape.
fn flatten_object(object: &Map<String, JsonValue>) -> HashMap<String, String> {
    let mut cells = HashMap::new();
    for (key, value) in object {
        match value {
            JsonValue::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    cells.insert(format!("{}[{}]", key, i), cell_text(item));
                }
            }
            _ => {
                cells.insert(key.clone(), cell_text(value));
            }
        }
    }
    cells
}

fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::LocString;
    use crate::dbd::{ColumnDefinition, ColumnType};

    fn field(name: &str, column_type: ColumnType, array_size: u32) -> ResolvedField {
        ResolvedField {
            column: ColumnDefinition {
                name: name.to_string(),
                column_type,
                foreign: None,
                verified: true,
            },
            is_unsigned: false,
            size: 32,
            array_size,
            is_id: false,
            is_noninline: false,
        }
    }

    fn record(index: usize, fields: Vec<(&str, Value)>) -> DecodedRecord {
        DecodedRecord {
            index,
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }

    #[test]
    fn test_writes_pretty_array_in_layout_order() {
        let definition = VersionDefinition {
            fields: vec![
                field("ID", ColumnType::Int, 0),
                field("Name", ColumnType::String, 0),
            ],
        };
        let mut out = Vec::new();
        {
            let mut writer = JsonWriter::new(&mut out);
            writer.write_header(&definition).unwrap();
            writer
                .write_record(&record(
                    0,
                    vec![
                        ("ID", Value::Int(1)),
                        ("Name", Value::String("Dun Morogh".to_string())),
                    ],
                ))
                .unwrap();
            writer
                .write_record(&record(
                    1,
                    vec![
                        ("ID", Value::Int(2)),
                        ("Name", Value::String("Elwynn Forest".to_string())),
                    ],
                ))
                .unwrap();
            writer.write_footer().unwrap();
        }

        let text = String::from_utf8(out).unwrap();
        let expected = "[\n  {\n    \"ID\": 1,\n    \"Name\": \"Dun Morogh\"\n  },\n  {\n    \"ID\": 2,\n    \"Name\": \"Elwynn Forest\"\n  }\n]\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_empty_input_writes_empty_array() {
        let definition = VersionDefinition { fields: vec![] };
        let mut out = Vec::new();
        {
            let mut writer = JsonWriter::new(&mut out);
            writer.write_header(&definition).unwrap();
            writer.write_footer().unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "[\n]\n");
    }

    #[test]
    fn test_arrays_and_locstrings_serialize() {
        let definition = VersionDefinition {
            fields: vec![
                field("Stats", ColumnType::Int, 3),
                field("Title", ColumnType::LocString, 0),
            ],
        };
        let mut loc = LocString::default();
        loc.texts[0] = "Fireball".to_string();

        let mut out = Vec::new();
        {
            let mut writer = JsonWriter::new(&mut out);
            writer.write_header(&definition).unwrap();
            writer
                .write_record(&record(
                    0,
                    vec![
                        (
                            "Stats",
                            Value::Array(vec![Value::Int(10), Value::Int(20), Value::Int(30)]),
                        ),
                        ("Title", Value::LocString(loc)),
                    ],
                ))
                .unwrap();
            writer.write_footer().unwrap();
        }

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["Stats"], json!([10, 20, 30]));
        assert_eq!(parsed[0]["Title"], json!("Fireball"));
    }

    #[test]
    fn test_reader_flattens_arrays_to_indexed_columns() {
        let input = br#"[
          {"ID": 1, "Stats": [10, 20], "Name": "Bolt"},
          {"ID": 2, "Stats": [7, 9], "Name": ""}
        ]"#;
        let mut reader = JsonReader::new(&input[..]);

        let columns = reader.read_header().unwrap();
        assert_eq!(columns, vec!["ID", "Stats[0]", "Stats[1]", "Name"]);

        let first = reader.read_record().unwrap().unwrap();
        assert_eq!(first["ID"], "1");
        assert_eq!(first["Stats[1]"], "20");
        assert_eq!(first["Name"], "Bolt");

        let second = reader.read_record().unwrap().unwrap();
        assert_eq!(second["Name"], "");
        assert!(reader.read_record().unwrap().is_none());
        reader.close().unwrap();
    }

    #[test]
    fn test_reader_rejects_malformed_json() {
        let input = b"{ not an array }";
        let mut reader = JsonReader::new(&input[..]);
        assert!(reader.read_header().is_err());
    }
}
