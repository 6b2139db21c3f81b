//! Decoded record values

use std::collections::HashMap;
use std::fmt;

/// Number of locale slots in a localized string payload
pub const LOCALE_COUNT: usize = 8;

/// A localized text value: one string per locale slot plus a flags mask
///
/// On disk this is [`LOCALE_COUNT`] string offsets followed by one u32 of
/// locale flags. Most tables populate a single locale and leave the rest
/// empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocString {
    pub texts: [String; LOCALE_COUNT],
    pub flags: u32,
}

impl LocString {
    /// The first non-empty locale text, or `""` when all slots are empty
    pub fn primary(&self) -> &str {
        self.texts
            .iter()
            .find(|text| !text.is_empty())
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// One decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float(f32),
    String(String),
    LocString(LocString),
    Array(Vec<Value>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::LocString(loc) => write!(f, "{}", loc.primary()),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

/// One decoded record: its zero-based index in the file and the values
/// keyed by column name
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    pub index: usize,
    pub fields: HashMap<String, Value>,
}

impl DecodedRecord {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }
}
