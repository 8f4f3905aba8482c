//! Abstraction over the classic TIFF and BigTIFF layouts.
//!
//! The two variants differ only in widths: offsets and entry counts are
//! 32-bit (with 16-bit directory counts) in classic files and 64-bit in
//! BigTIFF. Everything else about directory writing is shared, so the
//! writer is generic over a [`TiffKind`].

use std::io::{Read, Seek, Write};

use crate::error::{CapacityError, TiffFormatError, TiffResult};
use crate::writer::{ByteOrder, TiffWriter};

/// Directory entry counts read back from a file are rejected above this
/// bound; such counts indicate corruption rather than a real directory.
const MAX_PLAUSIBLE_DIR_COUNT: u64 = 0xFFFF;

/// Trait that abstracts over the width differences between the two TIFF
/// variants.
pub trait TiffKind {
    /// Size in bytes of an offset, which is also the inline value
    /// threshold of a directory entry.
    const OFFSET_BYTES: u64;
    /// Size in bytes of one directory entry.
    const ENTRY_BYTES: u64;
    /// Size in bytes of the directory's leading entry count.
    const DIR_COUNT_BYTES: u64;
    /// Size in bytes of the count field inside one entry.
    const VALUE_COUNT_BYTES: u64;
    /// Position of the first-directory pointer inside the header.
    const HEADER_DIR_SLOT: u64;
    /// Total header size.
    const HEADER_BYTES: u64;

    fn is_big() -> bool {
        Self::OFFSET_BYTES == 8
    }

    /// Bytes occupied by a directory of `entries` entries, including the
    /// trailing next-directory pointer.
    fn dir_size(entries: u64) -> u64 {
        Self::DIR_COUNT_BYTES + entries * Self::ENTRY_BYTES + Self::OFFSET_BYTES
    }

    /// Writes the file header with a zero first-directory pointer.
    fn write_header<W: Write>(writer: &mut TiffWriter<W>) -> TiffResult<()>;

    /// Checks that `offset` is representable in this variant.
    fn check_offset(offset: u64) -> TiffResult<()>;

    /// Writes an offset at the current position.
    fn write_offset<W: Write>(writer: &mut TiffWriter<W>, offset: u64) -> TiffResult<()>;

    /// Reads an offset from the current position.
    fn read_offset<R: Read>(writer: &mut TiffWriter<R>) -> TiffResult<u64>;

    /// Writes the directory's leading entry count.
    fn write_dir_count<W: Write>(writer: &mut TiffWriter<W>, count: u64) -> TiffResult<()>;

    /// Reads a directory entry count, rejecting implausible values.
    fn read_dir_count<R: Read>(writer: &mut TiffWriter<R>) -> TiffResult<u64>;

    /// Writes the per-entry value count field.
    fn write_value_count<W: Write>(writer: &mut TiffWriter<W>, count: u64) -> TiffResult<()>;
}

/// Classic TIFF: 32-bit offsets, magic number 42.
pub struct TiffKindStandard;

impl TiffKind for TiffKindStandard {
    const OFFSET_BYTES: u64 = 4;
    const ENTRY_BYTES: u64 = 12;
    const DIR_COUNT_BYTES: u64 = 2;
    const VALUE_COUNT_BYTES: u64 = 4;
    const HEADER_DIR_SLOT: u64 = 4;
    const HEADER_BYTES: u64 = 8;

    fn write_header<W: Write>(writer: &mut TiffWriter<W>) -> TiffResult<()> {
        match writer.byte_order() {
            ByteOrder::LittleEndian => writer.write_bytes(b"II")?,
            ByteOrder::BigEndian => writer.write_bytes(b"MM")?,
        }
        writer.write_u16(42)?;
        writer.write_u32(0)?;
        Ok(())
    }

    fn check_offset(offset: u64) -> TiffResult<()> {
        if offset > u64::from(u32::MAX) {
            return Err(CapacityError::MaximumFileSizeExceeded.into());
        }
        Ok(())
    }

    fn write_offset<W: Write>(writer: &mut TiffWriter<W>, offset: u64) -> TiffResult<()> {
        Self::check_offset(offset)?;
        writer.write_u32(offset as u32)
    }

    fn read_offset<R: Read>(writer: &mut TiffWriter<R>) -> TiffResult<u64> {
        Ok(u64::from(writer.read_u32()?))
    }

    fn write_dir_count<W: Write>(writer: &mut TiffWriter<W>, count: u64) -> TiffResult<()> {
        writer.write_u16(u16::try_from(count)?)
    }

    fn read_dir_count<R: Read>(writer: &mut TiffWriter<R>) -> TiffResult<u64> {
        Ok(u64::from(writer.read_u16()?))
    }

    fn write_value_count<W: Write>(writer: &mut TiffWriter<W>, count: u64) -> TiffResult<()> {
        writer.write_u32(u32::try_from(count)?)
    }
}

/// BigTIFF: 64-bit offsets, magic number 43.
pub struct TiffKindBig;

impl TiffKind for TiffKindBig {
    const OFFSET_BYTES: u64 = 8;
    const ENTRY_BYTES: u64 = 20;
    const DIR_COUNT_BYTES: u64 = 8;
    const VALUE_COUNT_BYTES: u64 = 8;
    const HEADER_DIR_SLOT: u64 = 8;
    const HEADER_BYTES: u64 = 16;

    fn write_header<W: Write>(writer: &mut TiffWriter<W>) -> TiffResult<()> {
        match writer.byte_order() {
            ByteOrder::LittleEndian => writer.write_bytes(b"II")?,
            ByteOrder::BigEndian => writer.write_bytes(b"MM")?,
        }
        writer.write_u16(43)?;
        // Offset byte size and the constant zero pad mandated by the
        // BigTIFF header layout.
        writer.write_u16(8)?;
        writer.write_u16(0)?;
        writer.write_u64(0)?;
        Ok(())
    }

    fn check_offset(_offset: u64) -> TiffResult<()> {
        Ok(())
    }

    fn write_offset<W: Write>(writer: &mut TiffWriter<W>, offset: u64) -> TiffResult<()> {
        writer.write_u64(offset)
    }

    fn read_offset<R: Read>(writer: &mut TiffWriter<R>) -> TiffResult<u64> {
        writer.read_u64()
    }

    fn write_dir_count<W: Write>(writer: &mut TiffWriter<W>, count: u64) -> TiffResult<()> {
        writer.write_u64(count)
    }

    fn read_dir_count<R: Read>(writer: &mut TiffWriter<R>) -> TiffResult<u64> {
        let count = writer.read_u64()?;
        if count > MAX_PLAUSIBLE_DIR_COUNT {
            return Err(TiffFormatError::InvalidDirectoryCount(count).into());
        }
        Ok(count)
    }

    fn write_value_count<W: Write>(writer: &mut TiffWriter<W>, count: u64) -> TiffResult<()> {
        writer.write_u64(count)
    }
}

/// Convenience bound for operations that both read and patch the file.
pub trait ReadWriteSeek: Read + Write + Seek {}
impl<T: Read + Write + Seek> ReadWriteSeek for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn classic_header_layout() {
        let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian);
        TiffKindStandard::write_header(&mut writer).unwrap();
        let bytes = writer.into_inner().into_inner();
        assert_eq!(bytes, vec![b'I', b'I', 42, 0, 0, 0, 0, 0]);
        assert_eq!(bytes.len() as u64, TiffKindStandard::HEADER_BYTES);
    }

    #[test]
    fn big_header_layout() {
        let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::BigEndian);
        TiffKindBig::write_header(&mut writer).unwrap();
        let bytes = writer.into_inner().into_inner();
        assert_eq!(&bytes[..8], &[b'M', b'M', 0, 43, 0, 8, 0, 0]);
        assert_eq!(&bytes[8..], &[0; 8]);
    }

    #[test]
    fn dir_sizes() {
        assert_eq!(TiffKindStandard::dir_size(3), 2 + 3 * 12 + 4);
        assert_eq!(TiffKindBig::dir_size(3), 8 + 3 * 20 + 8);
    }

    #[test]
    fn classic_offset_bound() {
        assert!(TiffKindStandard::check_offset(u64::from(u32::MAX)).is_ok());
        assert!(TiffKindStandard::check_offset(u64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn big_count_sanity_bound() {
        let mut buf = Vec::new();
        {
            let mut writer = TiffWriter::new(Cursor::new(&mut buf), ByteOrder::LittleEndian);
            writer.write_u64(0x10000).unwrap();
        }
        let mut reader = TiffWriter::new(Cursor::new(buf), ByteOrder::LittleEndian);
        assert!(TiffKindBig::read_dir_count(&mut reader).is_err());
    }
}
