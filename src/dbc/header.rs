//! DBC file header parsing

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{Error, Result};

/// Magic signature at the start of every DBC file
pub const DBC_MAGIC: [u8; 4] = *b"WDBC";

/// DBC file header: the four counts following the magic signature
///
/// Every integer in the format is little-endian. `record_size` is the byte
/// width shared by all records; `string_block_size` is the length of the
/// trailing null-terminated string region that record fields address by
/// offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbcHeader {
    pub record_count: u32,
    pub field_count: u32,
    pub record_size: u32,
    pub string_block_size: u32,
}

impl DbcHeader {
    /// Total header size: the magic plus four u32 counts
    pub const SIZE: usize = 20;

    /// Parse a header from the first [`SIZE`](Self::SIZE) bytes of a stream
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::TruncatedStream {
                section: "header",
                needed: Self::SIZE as u64,
                got: data.len() as u64,
            });
        }
        if data[..4] != DBC_MAGIC {
            let mut found = [0u8; 4];
            found.copy_from_slice(&data[..4]);
            return Err(Error::BadMagic { found });
        }

        let mut cursor = Cursor::new(&data[4..]);
        let record_count = cursor.read_u32::<LittleEndian>()?;
        let field_count = cursor.read_u32::<LittleEndian>()?;
        let record_size = cursor.read_u32::<LittleEndian>()?;
        let string_block_size = cursor.read_u32::<LittleEndian>()?;

        Ok(DbcHeader {
            record_count,
            field_count,
            record_size,
            string_block_size,
        })
    }

    /// Bytes occupied by the record region
    pub fn records_len(&self) -> u64 {
        self.record_count as u64 * self.record_size as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(records: u32, fields: u32, size: u32, strings: u32) -> Vec<u8> {
        let mut data = DBC_MAGIC.to_vec();
        data.extend_from_slice(&records.to_le_bytes());
        data.extend_from_slice(&fields.to_le_bytes());
        data.extend_from_slice(&size.to_le_bytes());
        data.extend_from_slice(&strings.to_le_bytes());
        data
    }

    #[test]
    fn test_parse_header() {
        let header = DbcHeader::parse(&header_bytes(2, 1, 4, 0)).unwrap();
        assert_eq!(header.record_count, 2);
        assert_eq!(header.field_count, 1);
        assert_eq!(header.record_size, 4);
        assert_eq!(header.string_block_size, 0);
        assert_eq!(header.records_len(), 8);
    }

    #[test]
    fn test_bad_magic() {
        let mut data = header_bytes(1, 1, 4, 0);
        data[..4].copy_from_slice(b"WDB2");
        match DbcHeader::parse(&data) {
            Err(Error::BadMagic { found }) => assert_eq!(&found, b"WDB2"),
            other => panic!("expected BadMagic, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_header() {
        let data = header_bytes(1, 1, 4, 0);
        match DbcHeader::parse(&data[..10]) {
            Err(Error::TruncatedStream { section, needed, got }) => {
                assert_eq!(section, "header");
                assert_eq!(needed, DbcHeader::SIZE as u64);
                assert_eq!(got, 10);
            }
            other => panic!("expected TruncatedStream, got {:?}", other),
        }
    }
}
