//! Schema data model: columns, layout fields and resolved definitions

use std::fmt;

use super::build::BuildRange;

/// Column value type as declared in the catalog section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int,
    UInt,
    Float,
    String,
    /// Localized text: eight locale strings plus a flags mask
    LocString,
}

impl ColumnType {
    /// Parses a catalog type token. Unrecognized tokens are rejected by the
    /// caller, never defaulted.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "int" => Some(ColumnType::Int),
            "uint" => Some(ColumnType::UInt),
            "float" => Some(ColumnType::Float),
            "string" => Some(ColumnType::String),
            "locstring" => Some(ColumnType::LocString),
            _ => None,
        }
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, ColumnType::Int | ColumnType::UInt)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            ColumnType::Int => "int",
            ColumnType::UInt => "uint",
            ColumnType::Float => "float",
            ColumnType::String => "string",
            ColumnType::LocString => "locstring",
        };
        write!(f, "{}", token)
    }
}

/// A foreign-key reference to a column of another table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.table, self.column)
    }
}

/// One column of the catalog section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
    pub foreign: Option<ForeignKey>,
    /// False when the schema author marked the name with a trailing `?`
    pub verified: bool,
}

/// One parsed layout line, before its column is resolved
///
/// `size` is the declared bit width (0 = the format default of 32) and
/// `array_size` the declared element count (0 = scalar).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldDefinition {
    pub column: String,
    pub is_unsigned: bool,
    pub size: u32,
    pub array_size: u32,
    pub is_id: bool,
    pub is_relation: bool,
    pub is_noninline: bool,
}

/// A layout field with its catalog column embedded
///
/// Resolution embeds the column so a decode session consumes the layout
/// alone and never refers back to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub column: ColumnDefinition,
    pub is_unsigned: bool,
    pub size: u32,
    pub array_size: u32,
    pub is_id: bool,
    pub is_noninline: bool,
}

impl ResolvedField {
    pub fn name(&self) -> &str {
        &self.column.name
    }

    /// Effective bit width: the declared width or the format default of 32
    pub fn bits(&self) -> u32 {
        if self.size == 0 {
            32
        } else {
            self.size
        }
    }

    /// True when integer values sign-extend during decode
    pub fn is_signed(&self) -> bool {
        self.column.column_type == ColumnType::Int && !self.is_unsigned
    }

    /// Type annotation as shown by the `info` command, e.g. `unsigned int<16>`
    pub fn type_string(&self) -> String {
        if !self.column.column_type.is_integral() {
            return self.column.column_type.to_string();
        }
        let sign = if self.is_unsigned { "unsigned " } else { "" };
        format!("{}{}<{}>", sign, self.column.column_type, self.bits())
    }
}

/// The ordered field layout for one build, the decoder's sole input
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VersionDefinition {
    pub fields: Vec<ResolvedField>,
}

impl VersionDefinition {
    /// Column names in layout order, arrays expanded to `Name[i]` and kept
    /// as a single name for scalars. Export plugins derive headers from it.
    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for field in self.fields.iter().filter(|f| !f.is_noninline) {
            if field.array_size > 0 {
                for i in 0..field.array_size {
                    names.push(format!("{}[{}]", field.name(), i));
                }
            } else {
                names.push(field.name().to_string());
            }
        }
        names
    }
}

/// One blank-line-delimited block of the schema: build coverage plus the
/// field layout those builds share
#[derive(Debug, Clone, Default)]
pub struct LayoutBlock {
    /// Layout hashes from `LAYOUT` lines; carried for later client eras,
    /// unused by build-based resolution
    pub layouts: Vec<String>,
    pub ranges: Vec<BuildRange>,
    pub fields: Vec<ResolvedField>,
}

/// Two build-range entries from different blocks covering a common build
///
/// Resolution stays first-match-wins; this is the audit record surfaced by
/// [`overlap_warnings`](super::DbdFile::overlap_warnings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeOverlap {
    pub first_block: usize,
    pub second_block: usize,
    pub first: BuildRange,
    pub second: BuildRange,
}

impl fmt::Display for RangeOverlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "blocks {} and {} overlap: {} and {}",
            self.first_block + 1,
            self.second_block + 1,
            self.first,
            self.second
        )
    }
}
