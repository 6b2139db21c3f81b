//! Parser for DBD schema description text
//!
//! A schema file is a `COLUMNS` section followed by blank-line-separated
//! layout blocks. Each block opens with `LAYOUT`/`BUILD`/`COMMENT` header
//! lines and continues with one field line per record field:
//!
//! ```text
//! COLUMNS
//! int ID
//! int<AreaTable::ID> AreaID
//! string Name
//!
//! BUILD 1.0.0.0-1.12.1.5875
//! $id$ID
//! AreaID<u32>
//! Name
//! ```
//!
//! The parser accepts the full authoring grammar (including annotations and
//! layout hashes used by later client eras) so that real schema files load
//! in one piece, and resolves every field against the column catalog as it
//! goes. All failures report the offending 1-based line number.

use std::collections::HashMap;

use regex::Regex;

use super::build::BuildRange;
use super::types::{
    ColumnDefinition, ColumnType, FieldDefinition, ForeignKey, LayoutBlock, ResolvedField,
};
use super::DbdFile;
use crate::error::{Error, Result};

struct LineGrammar {
    column: Regex,
    field: Regex,
}

impl LineGrammar {
    fn new() -> Self {
        LineGrammar {
            // type token, optional <Table::Column>, name, optional `?` marker
            column: Regex::new(r"^([A-Za-z0-9]+)(?:<([^<>]*)>)?\s+([A-Za-z_][A-Za-z0-9_]*)(\?)?$")
                .unwrap(),
            // optional $annotations$, name, optional <u?bits>, optional [len]
            field: Regex::new(
                r"^(?:\$([^$]*)\$)?([A-Za-z_][A-Za-z0-9_]*)(?:<(u?)(\d+)>)?(?:\[(\d+)\])?$",
            )
            .unwrap(),
        }
    }
}

fn syntax_error(line: usize, reason: impl Into<String>) -> Error {
    Error::SchemaSyntax {
        line,
        reason: reason.into(),
    }
}

/// Drops a trailing `// ...` comment. The grammar has no string literals, so
/// a blind split is safe.
fn strip_comment(line: &str) -> &str {
    match line.split_once("//") {
        Some((before, _)) => before,
        None => line,
    }
}

pub(super) fn parse_str(text: &str) -> Result<DbdFile> {
    let grammar = LineGrammar::new();
    let mut columns: HashMap<String, ColumnDefinition> = HashMap::new();
    let mut blocks: Vec<LayoutBlock> = Vec::new();

    let mut seen_columns = false;
    let mut in_columns = false;
    let mut block: Option<LayoutBlock> = None;
    let mut block_has_fields = false;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let raw = if line_no == 1 {
            raw.trim_start_matches('\u{feff}')
        } else {
            raw
        };
        let line = strip_comment(raw).trim();

        if line.is_empty() {
            in_columns = false;
            if let Some(done) = block.take() {
                blocks.push(done);
            }
            block_has_fields = false;
            continue;
        }

        if line == "COLUMNS" {
            if seen_columns {
                return Err(syntax_error(line_no, "duplicate COLUMNS section"));
            }
            seen_columns = true;
            in_columns = true;
            continue;
        }

        if in_columns {
            if line.starts_with("BUILD ") || line.starts_with("LAYOUT ") {
                return Err(syntax_error(
                    line_no,
                    "missing blank line after COLUMNS section",
                ));
            }
            let column = parse_column_line(&grammar, line, line_no)?;
            if columns.contains_key(&column.name) {
                return Err(syntax_error(
                    line_no,
                    format!("duplicate column {:?}", column.name),
                ));
            }
            columns.insert(column.name.clone(), column);
            continue;
        }

        // Anything else opens or continues a layout block.
        if !seen_columns {
            return Err(syntax_error(line_no, "layout block before COLUMNS section"));
        }
        let current = block.get_or_insert_with(LayoutBlock::default);

        if let Some(rest) = line.strip_prefix("LAYOUT ") {
            if block_has_fields {
                return Err(syntax_error(line_no, "LAYOUT line after field definitions"));
            }
            for token in rest.split(',') {
                let token = token.trim();
                if token.len() != 8 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(syntax_error(
                        line_no,
                        format!("invalid layout hash {:?}", token),
                    ));
                }
                current.layouts.push(token.to_string());
            }
            continue;
        }

        if let Some(rest) = line.strip_prefix("BUILD ") {
            if block_has_fields {
                return Err(syntax_error(line_no, "BUILD line after field definitions"));
            }
            for entry in rest.split(',') {
                let range: BuildRange = entry
                    .trim()
                    .parse()
                    .map_err(|e: Error| syntax_error(line_no, e.to_string()))?;
                current.ranges.push(range);
            }
            continue;
        }

        if line == "COMMENT" || line.starts_with("COMMENT ") {
            continue;
        }

        let field = parse_field_line(&grammar, line, line_no)?;
        current.fields.push(resolve_field(&columns, field, line_no)?);
        block_has_fields = true;
    }

    if let Some(done) = block.take() {
        blocks.push(done);
    }
    if !seen_columns {
        return Err(syntax_error(text.lines().count() + 1, "missing COLUMNS section"));
    }

    Ok(DbdFile { columns, blocks })
}

fn parse_column_line(grammar: &LineGrammar, line: &str, line_no: usize) -> Result<ColumnDefinition> {
    let caps = grammar
        .column
        .captures(line)
        .ok_or_else(|| syntax_error(line_no, format!("malformed column declaration {:?}", line)))?;

    let token = &caps[1];
    let column_type = ColumnType::from_token(token)
        .ok_or_else(|| syntax_error(line_no, format!("unknown column type {:?}", token)))?;

    let foreign = match caps.get(2) {
        Some(target) => {
            let (table, column) = target.as_str().split_once("::").ok_or_else(|| {
                syntax_error(
                    line_no,
                    format!(
                        "foreign key reference {:?} missing target column (expected Table::Column)",
                        target.as_str()
                    ),
                )
            })?;
            if table.is_empty() || column.is_empty() {
                return Err(syntax_error(
                    line_no,
                    format!("incomplete foreign key reference {:?}", target.as_str()),
                ));
            }
            Some(ForeignKey {
                table: table.to_string(),
                column: column.to_string(),
            })
        }
        None => None,
    };

    Ok(ColumnDefinition {
        name: caps[3].to_string(),
        column_type,
        foreign,
        verified: caps.get(4).is_none(),
    })
}

fn parse_field_line(grammar: &LineGrammar, line: &str, line_no: usize) -> Result<FieldDefinition> {
    let caps = grammar
        .field
        .captures(line)
        .ok_or_else(|| syntax_error(line_no, format!("malformed field definition {:?}", line)))?;

    let mut field = FieldDefinition {
        column: caps[2].to_string(),
        ..FieldDefinition::default()
    };

    if let Some(annotations) = caps.get(1) {
        for annotation in annotations.as_str().split(',') {
            match annotation.trim() {
                "id" => field.is_id = true,
                "noninline" => field.is_noninline = true,
                "relation" => field.is_relation = true,
                other => {
                    return Err(syntax_error(
                        line_no,
                        format!("unknown annotation {:?}", other),
                    ))
                }
            }
        }
    }

    field.is_unsigned = caps.get(3).map_or(false, |m| !m.as_str().is_empty());
    if let Some(bits) = caps.get(4) {
        field.size = bits
            .as_str()
            .parse()
            .map_err(|_| syntax_error(line_no, format!("invalid field width {:?}", bits.as_str())))?;
        if field.size == 0 {
            return Err(syntax_error(line_no, "field width must be positive"));
        }
    }
    if let Some(len) = caps.get(5) {
        field.array_size = len
            .as_str()
            .parse()
            .map_err(|_| syntax_error(line_no, format!("invalid array length {:?}", len.as_str())))?;
        if field.array_size == 0 {
            return Err(syntax_error(line_no, "array length must be positive"));
        }
    }

    Ok(field)
}

fn resolve_field(
    columns: &HashMap<String, ColumnDefinition>,
    field: FieldDefinition,
    line_no: usize,
) -> Result<ResolvedField> {
    let column = columns.get(&field.column).ok_or_else(|| {
        syntax_error(
            line_no,
            format!("field references undeclared column {:?}", field.column),
        )
    })?;

    if !column.column_type.is_integral() && (field.is_unsigned || field.size != 0) {
        return Err(syntax_error(
            line_no,
            format!(
                "width or sign modifier on {} column {:?}",
                column.column_type, field.column
            ),
        ));
    }

    Ok(ResolvedField {
        column: column.clone(),
        is_unsigned: field.is_unsigned,
        size: field.size,
        array_size: field.array_size,
        is_id: field.is_id,
        is_noninline: field.is_noninline,
    })
}
