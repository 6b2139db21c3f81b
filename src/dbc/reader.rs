//! Streaming DBC record decoder
//!
//! A [`DbcReader`] consumes one byte source up front: header, then the
//! whole record region, then the trailing string block. Both regions are
//! buffered because string offsets point past all records and the source
//! may be a forward-only stream. Iteration then decodes one record per
//! step against the resolved field layout; the first decode error is
//! terminal for the session and is also retained for [`DbcReader::err`].

use std::collections::HashMap;
use std::io::Read;

use crate::dbd::{ColumnType, ResolvedField, VersionDefinition};
use crate::error::{Error, Result};

use super::cursor::RecordCursor;
use super::header::DbcHeader;
use super::types::{DecodedRecord, LocString, Value};

/// Reads a region of exactly `len` bytes, reporting how much actually
/// arrived when the stream ends early
fn read_section<R: Read>(reader: &mut R, len: u64, section: &'static str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(Error::TruncatedStream {
            section,
            needed: len,
            got: buf.len() as u64,
        });
    }
    Ok(buf)
}

/// The trailing region of null-terminated string payloads, addressed by
/// byte offset from String and LocString fields
#[derive(Debug, Clone)]
pub struct StringBlock {
    data: Vec<u8>,
}

impl StringBlock {
    pub fn new(data: Vec<u8>) -> Self {
        StringBlock { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Resolves one offset by scanning to the next null terminator
    pub fn get(&self, offset: u32) -> Result<String> {
        let start = offset as usize;
        if start >= self.data.len() {
            return Err(self.invalid_offset(offset));
        }
        let end = self.data[start..]
            .iter()
            .position(|&b| b == 0)
            .map(|p| start + p)
            .ok_or_else(|| self.invalid_offset(offset))?;
        Ok(String::from_utf8_lossy(&self.data[start..end]).to_string())
    }

    fn invalid_offset(&self, offset: u32) -> Error {
        Error::InvalidStringOffset {
            record: 0,
            column: String::new(),
            offset,
            block_len: self.data.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Streaming,
    Exhausted,
    Failed,
}

/// Streaming decoder for one DBC byte source
///
/// ```rust,no_run
/// use undbc::{DbcReader, DbdFile};
///
/// let dbd = DbdFile::open("Spell.dbd")?;
/// let definition = dbd.version_definition(&"1.12.1.5875".parse()?)?;
///
/// let file = std::fs::File::open("Spell.dbc")?;
/// let mut reader = DbcReader::new(file, &definition)?;
/// for record in &mut reader {
///     let record = record?;
///     println!("{:?}", record.get("ID"));
/// }
/// assert!(reader.err().is_none());
/// # Ok::<(), undbc::Error>(())
/// ```
pub struct DbcReader {
    header: DbcHeader,
    definition: VersionDefinition,
    records: Vec<u8>,
    strings: StringBlock,
    index: usize,
    state: State,
    error: Option<Error>,
}

impl DbcReader {
    /// Opens a decode session: validates the header and buffers the record
    /// region and string block. The source is fully consumed.
    pub fn new<R: Read>(mut source: R, definition: &VersionDefinition) -> Result<Self> {
        let head = read_section(&mut source, DbcHeader::SIZE as u64, "header")?;
        let header = DbcHeader::parse(&head)?;
        let records = read_section(&mut source, header.records_len(), "record data")?;
        let strings = read_section(&mut source, header.string_block_size as u64, "string block")?;

        Ok(DbcReader {
            header,
            definition: definition.clone(),
            records,
            strings: StringBlock::new(strings),
            index: 0,
            state: State::Streaming,
            error: None,
        })
    }

    pub fn header(&self) -> &DbcHeader {
        &self.header
    }

    pub fn string_block(&self) -> &StringBlock {
        &self.strings
    }

    /// Post-loop error accessor: `None` after clean exhaustion, the
    /// terminal error after a failure
    pub fn err(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    fn decode_record(&self, index: usize) -> Result<DecodedRecord> {
        let size = self.header.record_size as usize;
        let start = index * size;
        let mut cursor = RecordCursor::new(&self.records[start..start + size]);

        let mut fields = HashMap::with_capacity(self.definition.fields.len());
        for field in &self.definition.fields {
            if field.is_noninline {
                continue;
            }
            let value = decode_value(&mut cursor, field, &self.strings)
                .map_err(|e| e.at_field(index, field.name()))?;
            fields.insert(field.name().to_string(), value);
        }
        cursor.finish().map_err(|e| e.at_field(index, ""))?;

        Ok(DecodedRecord { index, fields })
    }
}

impl Iterator for DbcReader {
    type Item = Result<DecodedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != State::Streaming {
            return None;
        }
        if self.index >= self.header.record_count as usize {
            self.state = State::Exhausted;
            return None;
        }

        match self.decode_record(self.index) {
            Ok(record) => {
                self.index += 1;
                Some(Ok(record))
            }
            Err(err) => {
                self.state = State::Failed;
                self.error = Some(err.clone());
                Some(Err(err))
            }
        }
    }
}

fn decode_value(
    cursor: &mut RecordCursor,
    field: &ResolvedField,
    strings: &StringBlock,
) -> Result<Value> {
    if field.array_size > 0 {
        let bits = field.bits();
        if field.column.column_type.is_integral() && !matches!(bits, 8 | 16 | 32 | 64) {
            // array elements must occupy whole storage units
            return Err(Error::FieldWidthOverflow {
                record: 0,
                column: String::new(),
                bits,
            });
        }
        let mut items = Vec::with_capacity(field.array_size as usize);
        for _ in 0..field.array_size {
            items.push(decode_scalar(cursor, field, strings)?);
        }
        return Ok(Value::Array(items));
    }
    decode_scalar(cursor, field, strings)
}

fn decode_scalar(
    cursor: &mut RecordCursor,
    field: &ResolvedField,
    strings: &StringBlock,
) -> Result<Value> {
    match field.column.column_type {
        ColumnType::Int | ColumnType::UInt => {
            if field.is_signed() {
                Ok(Value::Int(cursor.read_signed(field.bits())?))
            } else {
                Ok(Value::UInt(cursor.read_unsigned(field.bits())?))
            }
        }
        ColumnType::Float => Ok(Value::Float(cursor.read_f32()?)),
        ColumnType::String => {
            let offset = cursor.read_offset()?;
            Ok(Value::String(strings.get(offset)?))
        }
        ColumnType::LocString => {
            let mut loc = LocString::default();
            for slot in loc.texts.iter_mut() {
                let offset = cursor.read_offset()?;
                *slot = strings.get(offset)?;
            }
            loc.flags = cursor.read_unsigned(32)? as u32;
            Ok(Value::LocString(loc))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbc::header::DBC_MAGIC;
    use crate::dbd::ColumnDefinition;

    fn column(name: &str, column_type: ColumnType) -> ColumnDefinition {
        ColumnDefinition {
            name: name.to_string(),
            column_type,
            foreign: None,
            verified: true,
        }
    }

    fn field(name: &str, column_type: ColumnType) -> ResolvedField {
        ResolvedField {
            column: column(name, column_type),
            is_unsigned: false,
            size: 0,
            array_size: 0,
            is_id: false,
            is_noninline: false,
        }
    }

    fn unsigned(name: &str) -> ResolvedField {
        let mut f = field(name, ColumnType::Int);
        f.is_unsigned = true;
        f
    }

    fn definition(fields: Vec<ResolvedField>) -> VersionDefinition {
        VersionDefinition { fields }
    }

    fn dbc_bytes(field_count: u32, record_size: u32, records: &[Vec<u8>], strings: &[u8]) -> Vec<u8> {
        let mut data = DBC_MAGIC.to_vec();
        data.extend_from_slice(&(records.len() as u32).to_le_bytes());
        data.extend_from_slice(&field_count.to_le_bytes());
        data.extend_from_slice(&record_size.to_le_bytes());
        data.extend_from_slice(&(strings.len() as u32).to_le_bytes());
        for record in records {
            assert_eq!(record.len() as u32, record_size);
            data.extend_from_slice(record);
        }
        data.extend_from_slice(strings);
        data
    }

    #[test]
    fn test_decodes_two_records_then_exhausts() {
        let data = dbc_bytes(
            1,
            4,
            &[5u32.to_le_bytes().to_vec(), 7u32.to_le_bytes().to_vec()],
            &[],
        );
        let def = definition(vec![unsigned("Value")]);
        let mut reader = DbcReader::new(data.as_slice(), &def).unwrap();

        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(first.get("Value"), Some(&Value::UInt(5)));

        let second = reader.next().unwrap().unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.get("Value"), Some(&Value::UInt(7)));

        assert!(reader.next().is_none());
        assert!(reader.next().is_none());
        assert!(reader.err().is_none());
    }

    #[test]
    fn test_zero_records() {
        let data = dbc_bytes(1, 4, &[], &[]);
        let def = definition(vec![unsigned("Value")]);
        let mut reader = DbcReader::new(data.as_slice(), &def).unwrap();
        assert!(reader.next().is_none());
        assert!(reader.err().is_none());
    }

    #[test]
    fn test_signed_decode() {
        let data = dbc_bytes(1, 4, &[(-2i32).to_le_bytes().to_vec()], &[]);
        let def = definition(vec![field("Delta", ColumnType::Int)]);
        let mut reader = DbcReader::new(data.as_slice(), &def).unwrap();
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.get("Delta"), Some(&Value::Int(-2)));
    }

    #[test]
    fn test_string_field_resolves_lazily() {
        let strings = b"\0Ragefire Chasm\0";
        let data = dbc_bytes(
            2,
            8,
            &[{
                let mut rec = 1u32.to_le_bytes().to_vec();
                rec.extend_from_slice(&1u32.to_le_bytes());
                rec
            }],
            strings,
        );
        let def = definition(vec![unsigned("ID"), field("Name", ColumnType::String)]);
        let mut reader = DbcReader::new(data.as_slice(), &def).unwrap();
        let record = reader.next().unwrap().unwrap();
        assert_eq!(
            record.get("Name"),
            Some(&Value::String("Ragefire Chasm".to_string()))
        );
    }

    #[test]
    fn test_offset_zero_is_empty_string() {
        let data = dbc_bytes(1, 4, &[0u32.to_le_bytes().to_vec()], b"\0stuff\0");
        let def = definition(vec![field("Name", ColumnType::String)]);
        let mut reader = DbcReader::new(data.as_slice(), &def).unwrap();
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.get("Name"), Some(&Value::String(String::new())));
    }

    #[test]
    fn test_string_offset_at_block_end_fails() {
        let strings = b"\0ok\0";
        let data = dbc_bytes(
            1,
            4,
            &[(strings.len() as u32).to_le_bytes().to_vec()],
            strings,
        );
        let def = definition(vec![field("Name", ColumnType::String)]);
        let mut reader = DbcReader::new(data.as_slice(), &def).unwrap();

        match reader.next().unwrap() {
            Err(Error::InvalidStringOffset {
                record,
                column,
                offset,
                block_len,
            }) => {
                assert_eq!(record, 0);
                assert_eq!(column, "Name");
                assert_eq!(offset, strings.len() as u32);
                assert_eq!(block_len, strings.len());
            }
            other => panic!("expected InvalidStringOffset, got {:?}", other),
        }
        assert!(reader.next().is_none());
        assert!(matches!(
            reader.err(),
            Some(Error::InvalidStringOffset { .. })
        ));
    }

    #[test]
    fn test_error_carries_failing_record_index() {
        let strings = b"\0a\0";
        let good = 1u32.to_le_bytes().to_vec();
        let bad = 99u32.to_le_bytes().to_vec();
        let data = dbc_bytes(1, 4, &[good, bad], strings);
        let def = definition(vec![field("Name", ColumnType::String)]);
        let mut reader = DbcReader::new(data.as_slice(), &def).unwrap();

        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(Error::InvalidStringOffset { record, .. }) => assert_eq!(record, 1),
            other => panic!("expected InvalidStringOffset, got {:?}", other),
        }
    }

    #[test]
    fn test_record_width_mismatch() {
        let data = dbc_bytes(2, 8, &[vec![0u8; 8]], &[]);
        let def = definition(vec![unsigned("Only")]);
        let mut reader = DbcReader::new(data.as_slice(), &def).unwrap();

        match reader.next().unwrap() {
            Err(Error::RecordWidthMismatch {
                record,
                expected,
                consumed,
            }) => {
                assert_eq!(record, 0);
                assert_eq!(expected, 8);
                assert_eq!(consumed, 4);
            }
            other => panic!("expected RecordWidthMismatch, got {:?}", other),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_array_field() {
        let mut rec = Vec::new();
        for v in [10u32, 20, 30] {
            rec.extend_from_slice(&v.to_le_bytes());
        }
        let data = dbc_bytes(3, 12, &[rec], &[]);
        let mut stats = unsigned("Stats");
        stats.array_size = 3;
        let def = definition(vec![stats]);

        let mut reader = DbcReader::new(data.as_slice(), &def).unwrap();
        let record = reader.next().unwrap().unwrap();
        assert_eq!(
            record.get("Stats"),
            Some(&Value::Array(vec![
                Value::UInt(10),
                Value::UInt(20),
                Value::UInt(30)
            ]))
        );
    }

    #[test]
    fn test_packed_array_rejected() {
        let data = dbc_bytes(2, 8, &[vec![0u8; 8]], &[]);
        let mut packed = unsigned("Packed");
        packed.size = 12;
        packed.array_size = 2;
        let def = definition(vec![packed]);

        let mut reader = DbcReader::new(data.as_slice(), &def).unwrap();
        match reader.next().unwrap() {
            Err(Error::FieldWidthOverflow { column, bits, .. }) => {
                assert_eq!(column, "Packed");
                assert_eq!(bits, 12);
            }
            other => panic!("expected FieldWidthOverflow, got {:?}", other),
        }
    }

    #[test]
    fn test_locstring_field() {
        let strings = b"\0Fireball\0Boule de feu\0";
        let mut rec = Vec::new();
        rec.extend_from_slice(&1u32.to_le_bytes()); // enUS
        rec.extend_from_slice(&10u32.to_le_bytes()); // frFR
        for _ in 0..6 {
            rec.extend_from_slice(&0u32.to_le_bytes());
        }
        rec.extend_from_slice(&0xFFu32.to_le_bytes()); // flags
        let data = dbc_bytes(9, 36, &[rec], strings);
        let def = definition(vec![field("Name_lang", ColumnType::LocString)]);

        let mut reader = DbcReader::new(data.as_slice(), &def).unwrap();
        let record = reader.next().unwrap().unwrap();
        match record.get("Name_lang") {
            Some(Value::LocString(loc)) => {
                assert_eq!(loc.texts[0], "Fireball");
                assert_eq!(loc.texts[1], "Boule de feu");
                assert_eq!(loc.texts[2], "");
                assert_eq!(loc.flags, 0xFF);
                assert_eq!(loc.primary(), "Fireball");
            }
            other => panic!("expected LocString, got {:?}", other),
        }
    }

    #[test]
    fn test_noninline_field_consumes_nothing() {
        let data = dbc_bytes(1, 4, &[7u32.to_le_bytes().to_vec()], &[]);
        let mut id = unsigned("ID");
        id.is_noninline = true;
        let def = definition(vec![id, unsigned("Flags")]);

        let mut reader = DbcReader::new(data.as_slice(), &def).unwrap();
        let record = reader.next().unwrap().unwrap();
        assert_eq!(record.get("ID"), None);
        assert_eq!(record.get("Flags"), Some(&Value::UInt(7)));
    }

    #[test]
    fn test_truncated_record_region() {
        let mut data = dbc_bytes(1, 4, &[vec![0u8; 4], vec![0u8; 4]], &[]);
        data.truncate(data.len() - 2);
        let def = definition(vec![unsigned("Value")]);

        match DbcReader::new(data.as_slice(), &def) {
            Err(Error::TruncatedStream {
                section,
                needed,
                got,
            }) => {
                assert_eq!(section, "record data");
                assert_eq!(needed, 8);
                assert_eq!(got, 6);
            }
            other => panic!("expected TruncatedStream, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_truncated_string_block() {
        let mut data = dbc_bytes(1, 4, &[vec![0u8; 4]], b"\0abc\0");
        data.truncate(data.len() - 3);
        let def = definition(vec![unsigned("Value")]);

        match DbcReader::new(data.as_slice(), &def) {
            Err(Error::TruncatedStream { section, .. }) => {
                assert_eq!(section, "string block");
            }
            other => panic!("expected TruncatedStream, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_bad_magic_from_stream() {
        let mut data = dbc_bytes(0, 4, &[], &[]);
        data[..4].copy_from_slice(b"MPQ\x1a");
        let def = definition(vec![]);
        assert!(matches!(
            DbcReader::new(data.as_slice(), &def),
            Err(Error::BadMagic { .. })
        ));
    }

    #[test]
    fn test_redecoding_is_idempotent() {
        let strings = b"\0left\0right\0";
        let mut rec_a = 5u32.to_le_bytes().to_vec();
        rec_a.extend_from_slice(&1u32.to_le_bytes());
        let mut rec_b = 7u32.to_le_bytes().to_vec();
        rec_b.extend_from_slice(&6u32.to_le_bytes());
        let data = dbc_bytes(2, 8, &[rec_a, rec_b], strings);
        let def = definition(vec![unsigned("ID"), field("Name", ColumnType::String)]);

        let first: Vec<DecodedRecord> = DbcReader::new(data.as_slice(), &def)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        let second: Vec<DecodedRecord> = DbcReader::new(data.as_slice(), &def)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_string_block_scan_bounds() {
        let block = StringBlock::new(b"\0zone\0".to_vec());
        assert_eq!(block.get(1).unwrap(), "zone");
        assert_eq!(block.get(0).unwrap(), "");
        assert!(block.get(6).is_err());
        assert!(block.get(100).is_err());

        // no terminator before the end of the block
        let unterminated = StringBlock::new(b"abc".to_vec());
        assert!(unterminated.get(0).is_err());
    }
}
