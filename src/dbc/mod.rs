//! DBC binary format decoder
//!
//! DBC is the record-table format shipped with vanilla-era game clients.
//! Every file is a fixed header, a region of fixed-width records, then a
//! trailing block of null-terminated strings that record fields address by
//! byte offset. The field layout of each table changed across client
//! builds, so decoding takes a [`VersionDefinition`](crate::dbd::VersionDefinition)
//! resolved from a DBD schema description for the build that produced the
//! file.
//!
//! ## Format Overview
//!
//! - 4-byte magic `WDBC`
//! - u32 record count, field count, record size, string block size
//! - `record_count * record_size` bytes of records
//! - string block, offsets resolved lazily during decode
//!
//! ## Example
//!
//! ```rust,no_run
//! use undbc::{DbcReader, DbdFile};
//!
//! let dbd = DbdFile::open("AreaTable.dbd")?;
//! let definition = dbd.version_definition(&"1.12.1.5875".parse()?)?;
//!
//! let file = std::fs::File::open("AreaTable.dbc")?;
//! for record in DbcReader::new(file, &definition)? {
//!     println!("{}", record?.index);
//! }
//! # Ok::<(), undbc::Error>(())
//! ```

mod cursor;
mod header;
mod reader;
mod types;
pub mod utils;

pub use header::{DbcHeader, DBC_MAGIC};
pub use reader::{DbcReader, StringBlock};
pub use types::{DecodedRecord, LocString, Value, LOCALE_COUNT};
pub use utils::{batch_convert, convert_dbc, import_records, show_info, show_stat};
