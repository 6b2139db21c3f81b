//! Output and input plugins
//!
//! Converted records flow through a [`Writer`] selected by name; the
//! `import` path reads exported data back through a [`Reader`]. The
//! registry is a plain name match, and nothing in the decode core depends
//! on this layer.
//!
//! Both formats present records as flat column/cell pairs: array fields
//! expand to `Name[i]` columns and localized strings export their primary
//! locale text.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write as IoWrite};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::dbc::DecodedRecord;
use crate::dbd::VersionDefinition;

mod csv;
mod json;

pub use csv::{CsvReader, CsvWriter};
pub use json::{JsonReader, JsonWriter};

/// Writer side of a conversion: header once, one call per record, footer
pub trait Writer {
    fn write_header(&mut self, definition: &VersionDefinition) -> Result<()>;
    fn write_record(&mut self, record: &DecodedRecord) -> Result<()>;
    fn write_footer(&mut self) -> Result<()>;
}

impl std::fmt::Debug for dyn Writer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Writer")
    }
}

/// Reader side of an import: header first, then records until `None`
pub trait Reader {
    /// Returns the column names found in the input
    fn read_header(&mut self) -> Result<Vec<String>>;
    /// Returns the next record as column -> cell text, or `None` at the end
    fn read_record(&mut self) -> Result<Option<HashMap<String, String>>>;
    fn close(&mut self) -> Result<()>;
}

/// Returns the writer plugin for `name`, writing to `output` or stdout
pub fn writer_for(name: &str, output: Option<&Path>) -> Result<Box<dyn Writer>> {
    let out: Box<dyn IoWrite> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout()),
    };

    match name {
        "json" => Ok(Box::new(JsonWriter::new(out))),
        "csv" => Ok(Box::new(CsvWriter::new(out))),
        _ => bail!("unknown plugin: {} (available: json, csv)", name),
    }
}

/// Returns the reader plugin for `name`, reading from `input`, or stdin
/// when `input` is `None` or `-`
pub fn reader_for(name: &str, input: Option<&Path>) -> Result<Box<dyn Reader>> {
    let source: Box<dyn BufRead> = match input {
        Some(path) if path.as_os_str() != "-" => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file: {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        _ => Box::new(BufReader::new(io::stdin())),
    };

    match name {
        "json" => Ok(Box::new(JsonReader::new(source))),
        "csv" => Ok(Box::new(CsvReader::new(source))),
        _ => bail!("unknown plugin: {} (available: json, csv)", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_plugin_names_rejected() {
        let err = writer_for("yaml", None).unwrap_err();
        assert!(err.to_string().contains("available: json, csv"));
        assert!(reader_for("mysql", None).is_err());
    }
}
