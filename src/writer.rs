//! Byte-order aware file writer underlying the directory engine.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Seek, SeekFrom, Write};

use crate::error::TiffResult;

/// Endianness declared in the file header.
///
/// The order is fixed when the header is written and applies to every
/// multi-byte integer in the file, including entry values that have been
/// packed into offset fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// The byte order of the machine running the writer.
    pub fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    pub(crate) fn put_u16(self, buf: &mut [u8], n: u16) {
        use byteorder::ByteOrder;
        match self {
            Self::LittleEndian => LittleEndian::write_u16(buf, n),
            Self::BigEndian => BigEndian::write_u16(buf, n),
        }
    }

    pub(crate) fn put_u32(self, buf: &mut [u8], n: u32) {
        use byteorder::ByteOrder;
        match self {
            Self::LittleEndian => LittleEndian::write_u32(buf, n),
            Self::BigEndian => BigEndian::write_u32(buf, n),
        }
    }

    pub(crate) fn put_u64(self, buf: &mut [u8], n: u64) {
        use byteorder::ByteOrder;
        match self {
            Self::LittleEndian => LittleEndian::write_u64(buf, n),
            Self::BigEndian => BigEndian::write_u64(buf, n),
        }
    }

    pub(crate) fn get_u16(self, buf: &[u8]) -> u16 {
        use byteorder::ByteOrder;
        match self {
            Self::LittleEndian => LittleEndian::read_u16(buf),
            Self::BigEndian => BigEndian::read_u16(buf),
        }
    }

    pub(crate) fn get_u32(self, buf: &[u8]) -> u32 {
        use byteorder::ByteOrder;
        match self {
            Self::LittleEndian => LittleEndian::read_u32(buf),
            Self::BigEndian => BigEndian::read_u32(buf),
        }
    }

    pub(crate) fn get_u64(self, buf: &[u8]) -> u64 {
        use byteorder::ByteOrder;
        match self {
            Self::LittleEndian => LittleEndian::read_u64(buf),
            Self::BigEndian => BigEndian::read_u64(buf),
        }
    }
}

/// Wrapper that writes integers in the file's byte order and tracks the
/// current position.
pub struct TiffWriter<W> {
    inner: W,
    byte_order: ByteOrder,
}

impl<W> TiffWriter<W> {
    pub fn new(inner: W, byte_order: ByteOrder) -> Self {
        Self { inner, byte_order }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> TiffWriter<W> {
    pub fn write_bytes(&mut self, bytes: &[u8]) -> TiffResult<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    pub fn write_u8(&mut self, n: u8) -> TiffResult<()> {
        self.inner.write_u8(n)?;
        Ok(())
    }

    pub fn write_i8(&mut self, n: i8) -> TiffResult<()> {
        self.inner.write_i8(n)?;
        Ok(())
    }

    pub fn write_u16(&mut self, n: u16) -> TiffResult<()> {
        match self.byte_order {
            ByteOrder::LittleEndian => self.inner.write_u16::<LittleEndian>(n)?,
            ByteOrder::BigEndian => self.inner.write_u16::<BigEndian>(n)?,
        }
        Ok(())
    }

    pub fn write_i16(&mut self, n: i16) -> TiffResult<()> {
        self.write_u16(n as u16)
    }

    pub fn write_u32(&mut self, n: u32) -> TiffResult<()> {
        match self.byte_order {
            ByteOrder::LittleEndian => self.inner.write_u32::<LittleEndian>(n)?,
            ByteOrder::BigEndian => self.inner.write_u32::<BigEndian>(n)?,
        }
        Ok(())
    }

    pub fn write_i32(&mut self, n: i32) -> TiffResult<()> {
        self.write_u32(n as u32)
    }

    pub fn write_u64(&mut self, n: u64) -> TiffResult<()> {
        match self.byte_order {
            ByteOrder::LittleEndian => self.inner.write_u64::<LittleEndian>(n)?,
            ByteOrder::BigEndian => self.inner.write_u64::<BigEndian>(n)?,
        }
        Ok(())
    }

    pub fn write_i64(&mut self, n: i64) -> TiffResult<()> {
        self.write_u64(n as u64)
    }

    pub fn write_f32(&mut self, n: f32) -> TiffResult<()> {
        self.write_u32(n.to_bits())
    }

    pub fn write_f64(&mut self, n: f64) -> TiffResult<()> {
        self.write_u64(n.to_bits())
    }
}

impl<W: Read> TiffWriter<W> {
    pub fn read_exact(&mut self, buf: &mut [u8]) -> TiffResult<()> {
        self.inner.read_exact(buf)?;
        Ok(())
    }

    pub fn read_u16(&mut self) -> TiffResult<u16> {
        let n = match self.byte_order {
            ByteOrder::LittleEndian => self.inner.read_u16::<LittleEndian>()?,
            ByteOrder::BigEndian => self.inner.read_u16::<BigEndian>()?,
        };
        Ok(n)
    }

    pub fn read_u32(&mut self) -> TiffResult<u32> {
        let n = match self.byte_order {
            ByteOrder::LittleEndian => self.inner.read_u32::<LittleEndian>()?,
            ByteOrder::BigEndian => self.inner.read_u32::<BigEndian>()?,
        };
        Ok(n)
    }

    pub fn read_u64(&mut self) -> TiffResult<u64> {
        let n = match self.byte_order {
            ByteOrder::LittleEndian => self.inner.read_u64::<LittleEndian>()?,
            ByteOrder::BigEndian => self.inner.read_u64::<BigEndian>()?,
        };
        Ok(n)
    }
}

impl<W: Seek> TiffWriter<W> {
    pub fn offset(&mut self) -> TiffResult<u64> {
        Ok(self.inner.stream_position()?)
    }

    pub fn goto_offset(&mut self, offset: u64) -> TiffResult<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Seeks to the end of the stream and returns that offset.
    pub fn goto_end(&mut self) -> TiffResult<u64> {
        Ok(self.inner.seek(SeekFrom::End(0))?)
    }
}

/// Rounds an offset up to the next word boundary. Directory and value
/// areas always start on even offsets.
pub(crate) fn even_offset(offset: u64) -> u64 {
    (offset + 1) & !1
}
