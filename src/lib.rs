//! # undbc
//!
//! A Rust library for decoding World of Warcraft `.dbc` client databases
//! using DBD schema definitions.
//!
//! ## Overview
//!
//! Vanilla-era WoW clients store their databases as WDBC files: a fixed
//! header, a block of fixed-width records, and a trailing string block.
//! The community-maintained `.dbd` files describe which columns each
//! client build carries and how wide they are. This library provides:
//!
//! - Parsing `.dbd` schema files (column catalog plus per-build layouts)
//! - Resolving the field layout for a specific client build
//! - Streaming decode of WDBC records, including packed sub-word fields,
//!   sign extension, arrays, and localized strings
//! - JSON and CSV export/import plugins and batch conversion helpers
//!
//! ## Example - Decoding
//!
//! ```rust,no_run
//! use std::fs::File;
//! use undbc::dbd::DbdFile;
//! use undbc::dbc::DbcReader;
//!
//! fn main() -> anyhow::Result<()> {
//!     let dbd = DbdFile::open("definitions/Spell.dbd")?;
//!     let build = "1.12.1.5875".parse()?;
//!     let definition = dbd.version_definition(&build)?;
//!
//!     let file = File::open("DBFilesClient/Spell.dbc")?;
//!     let reader = DbcReader::new(file, &definition)?;
//!
//!     for record in reader {
//!         let record = record?;
//!         println!("{:?}", record.get("ID"));
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Example - Inspecting a layout
//!
//! ```rust,no_run
//! use undbc::dbd::DbdFile;
//!
//! fn main() -> anyhow::Result<()> {
//!     let dbd = DbdFile::open("definitions/Spell.dbd")?;
//!     let build = "1.12.1.5875".parse()?;
//!
//!     for field in &dbd.version_definition(&build)?.fields {
//!         println!("{} {}", field.type_string(), field.name());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod dbc;
pub mod dbd;
pub mod error;
pub mod plugin;
pub mod utils;

pub use dbc::{DbcHeader, DbcReader, DecodedRecord, LocString, StringBlock, Value};
pub use dbd::{Build, BuildRange, DbdFile, ResolvedField, VersionDefinition};
pub use error::{Error, Result};
pub use plugin::{reader_for, writer_for, Reader, Writer};
pub use utils::{collect_files, create_glob_matcher, format_size, matches_filter};
