//! In-place patching of a single entry in an already written directory.
//!
//! Used to fill in strile arrays that were deferred at directory write
//! time, and to refresh offset tables after data has been appended. The
//! directory's size and entry layout never change: values that fit the
//! existing spot are overwritten where they are, anything else is
//! appended at the end of the file and the entry repointed.

use crate::error::{CapacityError, TiffFormatError, TiffResult};
use crate::fields::DirectoryFields;
use crate::tags::{Tag, Type};
use crate::tiff_kind::{ReadWriteSeek, TiffKind};
use crate::value::{encode_u16s, encode_u32s, encode_u64s};
use crate::writer::{even_offset, TiffWriter};

use super::dirwrite::write_as_wide;
use super::DeferredStrileTypes;

/// Replacement values for a rewritten entry. The wire type actually
/// written may be narrower, matching what the directory already uses.
#[derive(Clone, Copy, Debug)]
pub enum RewriteData<'a> {
    Long8(&'a [u64]),
    Slong8(&'a [i64]),
    Ifd8(&'a [u64]),
}

impl RewriteData<'_> {
    fn count(&self) -> u64 {
        match self {
            RewriteData::Long8(v) | RewriteData::Ifd8(v) => v.len() as u64,
            RewriteData::Slong8(v) => v.len() as u64,
        }
    }
}

/// Picks the type to write, given the type the entry already has on
/// disk. A populated entry keeps its width so the rewrite cannot grow
/// the directory; a deferred strile entry gets the width the assembler
/// would have chosen.
fn resolve_type<K: TiffKind>(
    data: &RewriteData<'_>,
    tag: Tag,
    fields: &DirectoryFields,
    recorded: Option<DeferredStrileTypes>,
    entry_type: u16,
    deferred: bool,
) -> Type {
    if deferred {
        if let Some(types) = recorded {
            return if tag.is_strile_offsets() {
                types.offsets
            } else {
                types.counts
            };
        }
        return if tag.is_strile_offsets() {
            if K::is_big() {
                Type::LONG8
            } else {
                Type::LONG
            }
        } else if K::is_big() {
            if write_as_wide(fields, 0xFFFF_FFFF) {
                Type::LONG8
            } else {
                Type::LONG
            }
        } else if write_as_wide(fields, 0xFFFF) {
            Type::LONG
        } else {
            Type::SHORT
        };
    }
    match data {
        RewriteData::Long8(_) => {
            if K::is_big() {
                match Type::from_u16(entry_type) {
                    Some(t @ (Type::SHORT | Type::LONG | Type::LONG8)) => t,
                    _ => Type::LONG8,
                }
            } else if entry_type == Type::SHORT.to_u16() {
                Type::SHORT
            } else {
                Type::LONG
            }
        }
        RewriteData::Slong8(_) => {
            if K::is_big() && entry_type != Type::SLONG.to_u16() {
                Type::SLONG8
            } else {
                Type::SLONG
            }
        }
        RewriteData::Ifd8(_) => {
            if K::is_big() && entry_type != Type::IFD.to_u16() {
                Type::IFD8
            } else {
                Type::IFD
            }
        }
    }
}

/// Encodes `data` as `datatype`, verifying every element fits.
fn encode_checked(
    data: &RewriteData<'_>,
    datatype: Type,
    tag: Tag,
    order: crate::writer::ByteOrder,
) -> TiffResult<Vec<u8>> {
    fn narrow<T: TryFrom<u64>>(tag: Tag, value: u64, max: u64) -> TiffResult<T> {
        T::try_from(value)
            .map_err(|_| CapacityError::ValueOutOfRange(tag.to_u16(), value, max).into())
    }

    let bytes = match (data, datatype) {
        (RewriteData::Long8(v) | RewriteData::Ifd8(v), Type::SHORT) => {
            let mut narrowed = Vec::with_capacity(v.len());
            for &n in *v {
                narrowed.push(narrow::<u16>(tag, n, u64::from(u16::MAX))?);
            }
            encode_u16s(&narrowed, order)
        }
        (RewriteData::Long8(v) | RewriteData::Ifd8(v), Type::LONG | Type::IFD) => {
            let mut narrowed = Vec::with_capacity(v.len());
            for &n in *v {
                narrowed.push(narrow::<u32>(tag, n, u64::from(u32::MAX))?);
            }
            encode_u32s(&narrowed, order)
        }
        (RewriteData::Long8(v) | RewriteData::Ifd8(v), _) => encode_u64s(v, order),
        (RewriteData::Slong8(v), Type::SLONG) => {
            let mut narrowed = Vec::with_capacity(v.len());
            for &n in *v {
                let n = i32::try_from(n).map_err(|_| {
                    CapacityError::ValueOutOfRange(tag.to_u16(), n as u64, i32::MAX as u64)
                })?;
                narrowed.push(n as u32);
            }
            encode_u32s(&narrowed, order)
        }
        (RewriteData::Slong8(v), _) => {
            let raw: Vec<u64> = v.iter().map(|&n| n as u64).collect();
            encode_u64s(&raw, order)
        }
    };
    Ok(bytes)
}

/// Rewrites the entry for `tag` in the directory at `dir_offset`.
pub(crate) fn rewrite_field<W: ReadWriteSeek, K: TiffKind>(
    writer: &mut TiffWriter<W>,
    fields: &DirectoryFields,
    recorded: Option<DeferredStrileTypes>,
    dir_offset: u64,
    tag: Tag,
    data: &RewriteData<'_>,
) -> TiffResult<()> {
    let order = writer.byte_order();
    let entry_bytes = K::ENTRY_BYTES as usize;

    writer.goto_offset(dir_offset)?;
    let dir_count = K::read_dir_count(writer)?;

    // Entries are scanned sequentially; the reader is already positioned
    // at the first one.
    let mut entry = [0u8; 20];
    let mut found = None;
    for i in 0..dir_count {
        writer.read_exact(&mut entry[..entry_bytes])?;
        if order.get_u16(&entry[0..2]) == tag.to_u16() {
            found = Some(dir_offset + K::DIR_COUNT_BYTES + i * K::ENTRY_BYTES);
            break;
        }
    }
    let Some(entry_pos) = found else {
        return Err(TiffFormatError::TagNotFound(tag.to_u16()).into());
    };

    let entry_type = order.get_u16(&entry[2..4]);
    let (entry_count, entry_value) = if K::is_big() {
        (order.get_u64(&entry[4..12]), order.get_u64(&entry[12..20]))
    } else {
        (
            u64::from(order.get_u32(&entry[4..8])),
            u64::from(order.get_u32(&entry[8..12])),
        )
    };
    let deferred = entry_type == 0 && entry_count == 0 && entry_value == 0;

    let datatype = resolve_type::<K>(data, tag, fields, recorded, entry_type, deferred);
    let bytes = encode_checked(data, datatype, tag, order)?;
    let count = data.count();
    let inline = bytes.len() as u64 <= K::OFFSET_BYTES;

    if !deferred && entry_count == count && entry_type == datatype.to_u16() {
        // Same shape as what is on disk: overwrite the value bytes where
        // they already live and leave the entry untouched.
        let target = if inline {
            entry_pos + 2 + 2 + K::VALUE_COUNT_BYTES
        } else {
            entry_value
        };
        writer.goto_offset(target)?;
        return writer.write_bytes(&bytes);
    }

    // The entry itself needs updating. Out-of-line values go to fresh
    // space at the end of the file; the old value area becomes dead
    // space.
    let value_field = &mut entry[4 + K::VALUE_COUNT_BYTES as usize..entry_bytes];
    value_field.fill(0);
    if inline {
        value_field[..bytes.len()].copy_from_slice(&bytes);
    } else {
        let offset = even_offset(writer.goto_end()?);
        K::check_offset(offset + bytes.len() as u64)?;
        writer.goto_offset(offset)?;
        writer.write_bytes(&bytes)?;
        if K::is_big() {
            order.put_u64(&mut entry[12..20], offset);
        } else {
            order.put_u32(&mut entry[8..12], offset as u32);
        }
    }
    order.put_u16(&mut entry[2..4], datatype.to_u16());
    if K::is_big() {
        order.put_u64(&mut entry[4..12], count);
    } else {
        order.put_u32(&mut entry[4..8], u32::try_from(count)?);
    }
    writer.goto_offset(entry_pos)?;
    writer.write_bytes(&entry[..entry_bytes])
}
