//! CSV writer and reader plugins
//!
//! One header row of expanded column names, then one row per record.
//! Array fields occupy `Name[i]` columns and cells containing commas,
//! quotes or newlines are quoted with doubled inner quotes.

use std::collections::HashMap;
use std::io::{BufRead, Write as IoWrite};

use anyhow::{bail, Context, Result};

use crate::dbc::{DecodedRecord, Value};
use crate::dbd::{ResolvedField, VersionDefinition};

use super::{Reader, Writer};

pub struct CsvWriter<W: IoWrite> {
    out: W,
    fields: Vec<ResolvedField>,
}

impl<W: IoWrite> CsvWriter<W> {
    pub fn new(out: W) -> Self {
        CsvWriter {
            out,
            fields: Vec::new(),
        }
    }
}

impl<W: IoWrite> Writer for CsvWriter<W> {
    fn write_header(&mut self, definition: &VersionDefinition) -> Result<()> {
        self.fields = definition.fields.clone();
        let header = definition
            .column_names()
            .iter()
            .map(|name| escape_csv(name))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(self.out, "{}", header).context("Failed to write CSV output")?;
        Ok(())
    }

    fn write_record(&mut self, record: &DecodedRecord) -> Result<()> {
        let mut cells = Vec::new();
        for field in &self.fields {
            if field.is_noninline {
                continue;
            }
            match record.get(field.name()) {
                Some(Value::Array(items)) => {
                    for item in items {
                        cells.push(escape_csv(&item.to_string()));
                    }
                }
                Some(value) => cells.push(escape_csv(&value.to_string())),
                None => {
                    let width = field.array_size.max(1) as usize;
                    cells.extend(std::iter::repeat(String::new()).take(width));
                }
            }
        }
        writeln!(self.out, "{}", cells.join(",")).context("Failed to write CSV output")?;
        Ok(())
    }

    fn write_footer(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush CSV output")?;
        Ok(())
    }
}

fn escape_csv(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub struct CsvReader<R: BufRead> {
    source: R,
    columns: Vec<String>,
}

impl<R: BufRead> CsvReader<R> {
    pub fn new(source: R) -> Self {
        CsvReader {
            source,
            columns: Vec::new(),
        }
    }

    /// Accumulates lines until quotes balance, so quoted cells may span
    /// line breaks.
    fn next_raw_row(&mut self) -> Result<Option<String>> {
        let mut row = String::new();
        let mut read_any = false;
        loop {
            let mut line = String::new();
            let n = self
                .source
                .read_line(&mut line)
                .context("Failed to read CSV input")?;
            if n == 0 {
                if !read_any {
                    return Ok(None);
                }
                return Ok(Some(row));
            }
            read_any = true;
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            if !row.is_empty() {
                row.push('\n');
            }
            row.push_str(&line);
            if row.bytes().filter(|&b| b == b'"').count() % 2 == 0 {
                return Ok(Some(row));
            }
        }
    }
}

impl<R: BufRead> Reader for CsvReader<R> {
    fn read_header(&mut self) -> Result<Vec<String>> {
        match self.next_raw_row()? {
            Some(row) => {
                self.columns = parse_csv_row(&row)?;
                Ok(self.columns.clone())
            }
            None => bail!("CSV input is empty"),
        }
    }

    fn read_record(&mut self) -> Result<Option<HashMap<String, String>>> {
        loop {
            let row = match self.next_raw_row()? {
                Some(row) => row,
                None => return Ok(None),
            };
            if row.is_empty() {
                continue;
            }
            let cells = parse_csv_row(&row)?;
            if cells.len() != self.columns.len() {
                bail!(
                    "CSV row has {} cells, header has {} columns",
                    cells.len(),
                    self.columns.len()
                );
            }
            let record = self
                .columns
                .iter()
                .cloned()
                .zip(cells)
                .collect::<HashMap<_, _>>();
            return Ok(Some(record));
        }
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn parse_csv_row(row: &str) -> Result<Vec<String>> {
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = row.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    cell.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                cell.push(c);
            }
        } else {
            match c {
                ',' => cells.push(std::mem::take(&mut cell)),
                '"' if cell.is_empty() => in_quotes = true,
                _ => cell.push(c),
            }
        }
    }
    if in_quotes {
        bail!("unterminated quoted cell in CSV row");
    }
    cells.push(cell);
    Ok(cells)
}
