//! DBC conversion utility functions
//!
//! This module contains the command glue for schema inspection, header
//! stats, single and batch conversion, and import validation.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use crate::dbd::{Build, DbdFile};
use crate::plugin;
use crate::utils::{collect_files, create_glob_matcher, format_size, matches_filter};

use super::{DbcHeader, DbcReader};

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// Print the resolved layout for a schema file and build
pub fn show_info(dbd_path: &Path, build_str: &str) -> Result<()> {
    println!("Parsing DBD file: {}", dbd_path.display());
    let dbd = DbdFile::open(dbd_path)
        .with_context(|| format!("Failed to parse {}", dbd_path.display()))?;

    let build: Build = build_str.parse()?;
    let definition = dbd.version_definition(&build)?;

    let table = dbd_path.file_stem().unwrap_or_default().to_string_lossy();

    println!();
    println!("Table: {}", table);
    println!("Build: {}", build);
    println!();
    println!("Total Columns Defined: {}", dbd.columns.len());
    println!("Fields in Build: {}", definition.fields.len());
    println!();
    println!("Field Definitions:");
    println!("------------------");

    for (i, field) in definition.fields.iter().enumerate() {
        let array = if field.array_size > 0 {
            format!("[{}]", field.array_size)
        } else {
            String::new()
        };
        let id = if field.is_id { " (ID)" } else { "" };
        let foreign = match &field.column.foreign {
            Some(fk) => format!(" -> {}", fk),
            None => String::new(),
        };
        println!(
            "{:3}. {:<30} {}{}{}{}",
            i + 1,
            field.name(),
            field.type_string(),
            array,
            id,
            foreign
        );
    }

    for warning in dbd.overlap_warnings() {
        eprintln!("Warning: {}", warning);
    }

    Ok(())
}

/// Print header statistics for a DBC file without decoding records
pub fn show_stat(dbc_path: &Path) -> Result<()> {
    let file = File::open(dbc_path)
        .with_context(|| format!("Failed to open {}", dbc_path.display()))?;
    let file_size = file.metadata()?.len();

    let mut buf = Vec::new();
    file.take(DbcHeader::SIZE as u64).read_to_end(&mut buf)?;
    let header = DbcHeader::parse(&buf)?;

    println!("File: {}", dbc_path.display());
    println!("Size: {}", format_size(file_size));
    println!();
    println!("Records: {}", header.record_count);
    println!("Fields per record: {}", header.field_count);
    println!("Record size: {} bytes", header.record_size);
    println!("Record data: {}", format_size(header.records_len()));
    println!(
        "String block: {}",
        format_size(header.string_block_size as u64)
    );

    Ok(())
}

/// Convert a DBC file through the named writer plugin
pub fn convert_dbc(
    dbc_path: &Path,
    dbd_path: &Path,
    build_str: &str,
    plugin_name: &str,
    output: Option<&Path>,
) -> Result<()> {
    println!("Parsing DBD file: {}", dbd_path.display());
    let dbd = DbdFile::open(dbd_path)
        .with_context(|| format!("Failed to parse {}", dbd_path.display()))?;
    for warning in dbd.overlap_warnings() {
        eprintln!("Warning: {}", warning);
    }

    let mut writer = plugin::writer_for(plugin_name, output)?;

    let build: Build = build_str.parse()?;
    let definition = dbd.version_definition(&build)?;

    let file = File::open(dbc_path)
        .with_context(|| format!("Failed to open {}", dbc_path.display()))?;

    println!(
        "Converting {} using {} plugin...",
        dbc_path.display(),
        plugin_name
    );
    let reader = DbcReader::new(file, &definition)?;

    let pb = ProgressBar::new(reader.header().record_count as u64);
    pb.set_style(ProgressStyle::with_template(PROGRESS_TEMPLATE)?);

    writer
        .write_header(&definition)
        .context("Failed to write header")?;

    let mut count = 0usize;
    for result in reader {
        let record = result.context("Failed to convert records")?;
        writer
            .write_record(&record)
            .with_context(|| format!("plugin failed at record {}", record.index))?;
        count += 1;
        pb.inc(1);
    }
    pb.finish_with_message("Done");

    writer.write_footer().context("Failed to write footer")?;

    println!("Successfully converted {} records", count);
    if let Some(path) = output {
        println!("Output written to: {}", path.display());
    }

    Ok(())
}

/// Convert every DBC file in a directory whose matching DBD exists
pub fn batch_convert(
    dbc_dir: &Path,
    dbd_dir: &Path,
    build_str: &str,
    plugin_name: &str,
    output_dir: &Path,
    filter: Option<&str>,
) -> Result<()> {
    use rayon::prelude::*;

    let build: Build = build_str.parse()?;
    let matcher = filter.map(create_glob_matcher).transpose()?;

    let mut jobs = Vec::new();
    let mut skipped = 0u64;
    for path in collect_files(dbc_dir)? {
        let is_dbc = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("dbc"));
        if !is_dbc {
            continue;
        }
        let name = path.file_name().unwrap_or_default().to_string_lossy().to_string();
        if !matches_filter(&name, matcher.as_ref()) {
            continue;
        }
        let stem = path.file_stem().unwrap_or_default().to_string_lossy().to_string();
        let dbd_path = dbd_dir.join(format!("{}.dbd", stem));
        if !dbd_path.is_file() {
            eprintln!("Warning: no DBD definition for {}, skipping", name);
            skipped += 1;
            continue;
        }
        jobs.push((path, dbd_path, stem));
    }

    if jobs.is_empty() {
        println!("No files match the filter");
        return Ok(());
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    println!("Converting {} files...", jobs.len());
    let pb = ProgressBar::new(jobs.len() as u64);
    pb.set_style(ProgressStyle::with_template(PROGRESS_TEMPLATE)?);

    let outcomes: Vec<bool> = jobs
        .par_iter()
        .map(|(dbc_path, dbd_path, stem)| {
            let out_path = output_dir.join(format!("{}.{}", stem, plugin_name));
            let result = convert_quiet(dbc_path, dbd_path, &build, plugin_name, &out_path);
            if let Err(e) = &result {
                pb.println(format!("Error converting {}: {:#}", dbc_path.display(), e));
            }
            pb.inc(1);
            result.is_ok()
        })
        .collect();
    pb.finish_with_message("Done");

    let converted = outcomes.iter().filter(|ok| **ok).count();
    let failed = outcomes.len() - converted;

    println!();
    println!("Converted: {} files", converted);
    if failed > 0 {
        println!("Failed: {} files", failed);
    }
    if skipped > 0 {
        println!("Skipped: {} files (no matching DBD)", skipped);
    }

    Ok(())
}

/// One conversion with no console output, for parallel batch runs
fn convert_quiet(
    dbc_path: &Path,
    dbd_path: &Path,
    build: &Build,
    plugin_name: &str,
    output: &Path,
) -> Result<()> {
    let dbd = DbdFile::open(dbd_path)
        .with_context(|| format!("Failed to parse {}", dbd_path.display()))?;
    let definition = dbd.version_definition(build)?;

    let mut writer = plugin::writer_for(plugin_name, Some(output))?;
    let file = File::open(dbc_path)
        .with_context(|| format!("Failed to open {}", dbc_path.display()))?;
    let reader = DbcReader::new(file, &definition)?;

    writer.write_header(&definition)?;
    for result in reader {
        let record = result?;
        writer
            .write_record(&record)
            .with_context(|| format!("plugin failed at record {}", record.index))?;
    }
    writer.write_footer()?;

    Ok(())
}

/// Read exported data back through a reader plugin and validate its
/// columns against the resolved layout
pub fn import_records(
    input: Option<&Path>,
    dbd_path: &Path,
    build_str: &str,
    plugin_name: &str,
) -> Result<()> {
    println!("Parsing DBD file: {}", dbd_path.display());
    let dbd = DbdFile::open(dbd_path)
        .with_context(|| format!("Failed to parse {}", dbd_path.display()))?;

    let build: Build = build_str.parse()?;
    let definition = dbd.version_definition(&build)?;

    let mut reader = plugin::reader_for(plugin_name, input)?;

    let source = match input {
        Some(path) => path.display().to_string(),
        None => "stdin".to_string(),
    };
    println!("Reading from {} using {} plugin...", source, plugin_name);

    let columns = reader.read_header().context("Failed to read header")?;

    let layout_columns = definition.column_names();
    let expected: HashSet<&str> = layout_columns.iter().map(String::as_str).collect();
    for column in &columns {
        if !expected.contains(column.as_str()) {
            eprintln!("Warning: column {:?} is not part of the layout", column);
        }
    }
    if !columns.is_empty() {
        for column in &layout_columns {
            if !columns.contains(column) {
                eprintln!("Warning: layout column {:?} is missing from the input", column);
            }
        }
    }

    let mut count = 0usize;
    while reader
        .read_record()
        .context("Failed to read record")?
        .is_some()
    {
        count += 1;
    }
    reader.close()?;

    println!("Read {} records", count);
    println!("Note: re-encoding to DBC is not supported");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_quiet_end_to_end() {
        let dir = tempfile::tempdir().unwrap();

        let dbd_path = dir.path().join("AreaTable.dbd");
        fs::write(
            &dbd_path,
            "COLUMNS\nint ID\nstring Name\n\nLAYOUT 12345678\nBUILD 1.12.1.5875\n$id$ID<32>\nName\n",
        )
        .unwrap();

        let mut dbc = Vec::new();
        dbc.extend_from_slice(b"WDBC");
        for v in [2u32, 2, 8, 21] {
            dbc.extend_from_slice(&v.to_le_bytes());
        }
        for (id, offset) in [(1u32, 1u32), (2, 11)] {
            dbc.extend_from_slice(&id.to_le_bytes());
            dbc.extend_from_slice(&offset.to_le_bytes());
        }
        dbc.extend_from_slice(b"\0Ironforge\0Stormwind\0");
        let dbc_path = dir.path().join("AreaTable.dbc");
        fs::write(&dbc_path, &dbc).unwrap();

        let build: Build = "1.12.1.5875".parse().unwrap();
        let out_path = dir.path().join("AreaTable.json");
        convert_quiet(&dbc_path, &dbd_path, &build, "json", &out_path).unwrap();

        let text = fs::read_to_string(&out_path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0]["ID"], 1);
        assert_eq!(parsed[0]["Name"], "Ironforge");
        assert_eq!(parsed[1]["Name"], "Stormwind");
    }

    #[test]
    fn test_convert_quiet_rejects_unknown_build() {
        let dir = tempfile::tempdir().unwrap();

        let dbd_path = dir.path().join("Spell.dbd");
        fs::write(
            &dbd_path,
            "COLUMNS\nint ID\n\nLAYOUT ABCDEF01\nBUILD 1.12.1.5875\n$id$ID<32>\n",
        )
        .unwrap();
        let dbc_path = dir.path().join("Spell.dbc");
        fs::write(&dbc_path, b"WDBC").unwrap();

        let build: Build = "2.4.3.8606".parse().unwrap();
        let out_path = dir.path().join("Spell.json");
        let err = convert_quiet(&dbc_path, &dbd_path, &build, "json", &out_path).unwrap_err();
        assert!(err.to_string().contains("no layout definition"));
    }
}
