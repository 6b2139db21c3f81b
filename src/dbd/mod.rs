//! DBD schema description parser and layout resolution
//!
//! DBD files are the human-authored schema descriptions for DBC tables. One
//! file describes one table across every client build: a `COLUMNS` catalog
//! of named, typed columns, then one layout block per era listing the builds
//! it covers and the concrete field layout (widths, signedness, arrays,
//! identifier flags) those clients used.
//!
//! ## Example
//!
//! ```rust,no_run
//! use undbc::dbd::{Build, DbdFile};
//!
//! let dbd = DbdFile::open("definitions/Spell.dbd")?;
//! let build: Build = "1.12.1.5875".parse()?;
//!
//! let definition = dbd.version_definition(&build)?;
//! for field in &definition.fields {
//!     println!("{} {}", field.type_string(), field.name());
//! }
//! # Ok::<(), undbc::Error>(())
//! ```

mod build;
mod parser;
mod types;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub use build::{Build, BuildRange};
pub use types::{
    ColumnDefinition, ColumnType, FieldDefinition, ForeignKey, LayoutBlock, RangeOverlap,
    ResolvedField, VersionDefinition,
};

use crate::error::Result;
use crate::Error;

/// A parsed schema description: the column catalog plus every layout block,
/// in source order
#[derive(Debug, Clone, Default)]
pub struct DbdFile {
    pub columns: HashMap<String, ColumnDefinition>,
    pub blocks: Vec<LayoutBlock>,
}

impl DbdFile {
    /// Reads and parses a schema description file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parses schema description text
    pub fn parse(text: &str) -> Result<Self> {
        parser::parse_str(text)
    }

    /// Resolves the field layout for one build
    ///
    /// Blocks are scanned in source order and the first whose build coverage
    /// contains `build` wins; overlapping coverage is legal and resolved by
    /// that order (see [`overlap_warnings`](Self::overlap_warnings)). Fails
    /// with [`Error::LayoutNotFound`] when no block covers the build.
    pub fn version_definition(&self, build: &Build) -> Result<VersionDefinition> {
        for block in &self.blocks {
            if block.ranges.iter().any(|range| range.contains(build)) {
                return Ok(VersionDefinition {
                    fields: block.fields.clone(),
                });
            }
        }
        Err(Error::LayoutNotFound(*build))
    }

    /// Reports build-range entries of different blocks that cover a common
    /// build. Resolution stays deterministic either way; this is the audit
    /// channel for schema quality.
    pub fn overlap_warnings(&self) -> Vec<RangeOverlap> {
        let mut warnings = Vec::new();
        for (i, first) in self.blocks.iter().enumerate() {
            for (j, second) in self.blocks.iter().enumerate().skip(i + 1) {
                for a in &first.ranges {
                    for b in &second.ranges {
                        if a.overlaps(b) {
                            warnings.push(RangeOverlap {
                                first_block: i,
                                second_block: j,
                                first: *a,
                                second: *b,
                            });
                        }
                    }
                }
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ERAS: &str = "\
COLUMNS
int ID
int Flags
string Name

BUILD 1.0.0.0-1.99.99.99
$id$ID
Flags
Name

BUILD 2.0.0.0-2.99.99.99
$id$ID
Flags<16>
";

    #[test]
    fn test_resolution_picks_covering_block() {
        let dbd = DbdFile::parse(TWO_ERAS).unwrap();

        let vanilla = dbd
            .version_definition(&"1.12.1.5875".parse().unwrap())
            .unwrap();
        assert_eq!(vanilla.fields.len(), 3);
        assert_eq!(vanilla.fields[2].name(), "Name");

        let tbc = dbd
            .version_definition(&"2.0.0.1".parse().unwrap())
            .unwrap();
        assert_eq!(tbc.fields.len(), 2);
        assert_eq!(tbc.fields[1].size, 16);
    }

    #[test]
    fn test_resolution_fails_outside_coverage() {
        let dbd = DbdFile::parse(TWO_ERAS).unwrap();
        let build: Build = "3.0.0.0".parse().unwrap();
        match dbd.version_definition(&build) {
            Err(Error::LayoutNotFound(missing)) => assert_eq!(missing, build),
            other => panic!("expected LayoutNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_first_block_wins_on_overlap() {
        let text = "\
COLUMNS
int ID
int Flags

BUILD 1.0.0.0-1.99.99.99
$id$ID

BUILD 1.12.0.0-1.12.1.5875
$id$ID
Flags
";
        let dbd = DbdFile::parse(text).unwrap();
        let def = dbd
            .version_definition(&"1.12.1.5875".parse().unwrap())
            .unwrap();
        assert_eq!(def.fields.len(), 1);

        let warnings = dbd.overlap_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].first_block, 0);
        assert_eq!(warnings[0].second_block, 1);
    }

    #[test]
    fn test_no_overlap_warnings_for_disjoint_blocks() {
        let dbd = DbdFile::parse(TWO_ERAS).unwrap();
        assert!(dbd.overlap_warnings().is_empty());
    }
}
