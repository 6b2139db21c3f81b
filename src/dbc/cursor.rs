//! Byte/bit cursor over a single record slice
//!
//! Field widths in this format come in two kinds: whole storage units
//! (1/2/4/8 bytes, read as aligned little-endian loads) and sub-word widths
//! that share a 4-byte unit with their neighbors, extracted by shift and
//! mask. The cursor tracks both the byte position and the bit position
//! inside an open shared unit, so the per-record width check at the end is
//! exact. It never touches I/O; the caller hands it one record's bytes.
//!
//! Errors leave the failing record index at 0; the decode loop stamps the
//! real index and column name via [`Error::at_field`].

use crate::error::{Error, Result};

const UNIT_BYTES: usize = 4;
const UNIT_BITS: u32 = 32;

#[derive(Debug, Clone, Copy)]
struct PackedRun {
    /// First byte of the shared unit
    base: usize,
    /// Next free bit within the unit
    bit: u32,
}

pub(crate) struct RecordCursor<'a> {
    data: &'a [u8],
    byte: usize,
    packed: Option<PackedRun>,
}

impl<'a> RecordCursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        RecordCursor {
            data,
            byte: 0,
            packed: None,
        }
    }

    /// Reads an unsigned integer of `bits` width
    pub(crate) fn read_unsigned(&mut self, bits: u32) -> Result<u64> {
        self.read_raw(bits)
    }

    /// Reads a signed integer of `bits` width, sign-extending from the top
    /// bit of the stored width
    pub(crate) fn read_signed(&mut self, bits: u32) -> Result<i64> {
        let raw = self.read_raw(bits)?;
        let shift = 64 - bits;
        Ok(((raw << shift) as i64) >> shift)
    }

    /// Reads one aligned IEEE754 single
    pub(crate) fn read_f32(&mut self) -> Result<f32> {
        let raw = self.read_aligned(4)? as u32;
        Ok(f32::from_bits(raw))
    }

    /// Reads one aligned u32 string-block offset
    pub(crate) fn read_offset(&mut self) -> Result<u32> {
        Ok(self.read_aligned(4)? as u32)
    }

    /// Closes any open shared unit and verifies the cursor landed exactly
    /// at the end of the record
    pub(crate) fn finish(&mut self) -> Result<()> {
        self.packed = None;
        if self.byte != self.data.len() {
            return Err(Error::RecordWidthMismatch {
                record: 0,
                expected: self.data.len() as u32,
                consumed: self.byte as u32,
            });
        }
        Ok(())
    }

    fn read_raw(&mut self, bits: u32) -> Result<u64> {
        match bits {
            8 | 16 | 32 | 64 => self.read_aligned(bits / 8),
            1..=31 => self.read_packed(bits),
            _ => Err(Error::FieldWidthOverflow {
                record: 0,
                column: String::new(),
                bits,
            }),
        }
    }

    fn read_aligned(&mut self, bytes: u32) -> Result<u64> {
        self.packed = None;
        let start = self.byte;
        let end = start + bytes as usize;
        if end > self.data.len() {
            return Err(self.overrun(end));
        }
        self.byte = end;

        let mut value = 0u64;
        for (i, &b) in self.data[start..end].iter().enumerate() {
            value |= (b as u64) << (8 * i);
        }
        Ok(value)
    }

    fn read_packed(&mut self, bits: u32) -> Result<u64> {
        let run = match self.packed {
            Some(run) if run.bit + bits <= UNIT_BITS => run,
            _ => self.open_unit()?,
        };

        let unit = self.unit_value(run.base);
        let mask = u32::MAX >> (UNIT_BITS - bits);
        let value = (unit >> run.bit) & mask;

        self.packed = Some(PackedRun {
            base: run.base,
            bit: run.bit + bits,
        });
        Ok(value as u64)
    }

    /// Claims the next 4 bytes as a fresh shared unit; the unit is consumed
    /// whole even if the run leaves bits unused
    fn open_unit(&mut self) -> Result<PackedRun> {
        self.packed = None;
        let base = self.byte;
        let end = base + UNIT_BYTES;
        if end > self.data.len() {
            return Err(self.overrun(end));
        }
        self.byte = end;
        Ok(PackedRun { base, bit: 0 })
    }

    fn unit_value(&self, base: usize) -> u32 {
        let mut value = 0u32;
        for (i, &b) in self.data[base..base + UNIT_BYTES].iter().enumerate() {
            value |= (b as u32) << (8 * i);
        }
        value
    }

    fn overrun(&self, attempted: usize) -> Error {
        Error::RecordWidthMismatch {
            record: 0,
            expected: self.data.len() as u32,
            consumed: attempted as u32,
        }
    }
}
