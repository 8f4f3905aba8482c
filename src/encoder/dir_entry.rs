//! Directory entry records and the two-pass build sink.

use std::io::{Seek, Write};
use std::marker::PhantomData;

use crate::error::{CapacityError, TiffResult};
use crate::tiff_kind::TiffKind;
use crate::writer::{ByteOrder, TiffWriter};

/// One materialized directory entry. `value` holds either the inline
/// value bytes or the offset of the out-of-line data, already in file
/// byte order; classic files use only the first four bytes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DirEntry {
    pub tag: u16,
    pub type_: u16,
    pub count: u64,
    pub value: [u8; 8],
}

/// Sink the field walk feeds entries into.
///
/// The walk runs twice per directory. The first pass only counts entries
/// so the directory block can be placed and sized; the second pass, with
/// a data cursor pointing past that block, materializes them. Both passes
/// share one traversal, so they cannot disagree on which fields are
/// present; a diverging entry total still trips an assertion upstream.
pub(crate) struct DirBuild<'a, W, K> {
    writer: &'a mut TiffWriter<W>,
    entries: Option<Vec<DirEntry>>,
    count: u64,
    data_offset: u64,
    _kind: PhantomData<K>,
}

impl<'a, W: Write + Seek, K: TiffKind> DirBuild<'a, W, K> {
    /// A counting-pass sink; nothing is written through it.
    pub fn counting(writer: &'a mut TiffWriter<W>) -> Self {
        Self {
            writer,
            entries: None,
            count: 0,
            data_offset: 0,
            _kind: PhantomData,
        }
    }

    /// A materializing sink whose out-of-line values start at
    /// `data_offset`.
    pub fn materializing(writer: &'a mut TiffWriter<W>, data_offset: u64) -> Self {
        Self {
            writer,
            entries: Some(Vec::new()),
            count: 0,
            data_offset,
            _kind: PhantomData,
        }
    }

    pub fn is_counting(&self) -> bool {
        self.entries.is_none()
    }

    /// Counting-pass bookkeeping for one entry.
    pub fn bump(&mut self) {
        self.count += 1;
    }

    pub fn entry_total(&self) -> u64 {
        match &self.entries {
            Some(entries) => entries.len() as u64,
            None => self.count,
        }
    }

    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.writer.byte_order()
    }

    pub fn into_entries(self) -> Vec<DirEntry> {
        self.entries.unwrap_or_default()
    }

    /// Adds an entry, writing `data` to the data area when it does not
    /// fit inline. Entries are kept sorted by tag; feeding the same tag
    /// twice is a caller bug.
    pub fn push(&mut self, tag: u16, type_: u16, count: u64, data: &[u8]) -> TiffResult<()> {
        let mut value = [0u8; 8];
        if data.len() as u64 <= K::OFFSET_BYTES {
            value[..data.len()].copy_from_slice(data);
        } else {
            let start = self.data_offset;
            let mut end = start.wrapping_add(data.len() as u64);
            if !K::is_big() {
                end &= 0xFFFF_FFFF;
            }
            if end < start || end < data.len() as u64 {
                return Err(CapacityError::MaximumFileSizeExceeded.into());
            }
            self.writer.goto_offset(start)?;
            self.writer.write_bytes(data)?;
            self.data_offset = if end & 1 != 0 { end + 1 } else { end };

            let order = self.writer.byte_order();
            if K::is_big() {
                order.put_u64(&mut value, start);
            } else {
                order.put_u32(&mut value[..4], start as u32);
            }
        }

        let entries = self
            .entries
            .as_mut()
            .unwrap_or_else(|| unreachable!("push during counting pass"));
        let mut index = entries.len();
        while index > 0 {
            assert!(entries[index - 1].tag != tag, "duplicate tag {} in directory", tag);
            if entries[index - 1].tag < tag {
                break;
            }
            index -= 1;
        }
        entries.insert(
            index,
            DirEntry {
                tag,
                type_,
                count,
                value,
            },
        );
        Ok(())
    }

    /// Adds a placeholder entry for a strile array whose values are not
    /// known yet; type, count and value are all zero until a later
    /// rewrite fills them in.
    pub fn push_deferred(&mut self, tag: u16) -> TiffResult<()> {
        self.push(tag, 0, 0, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff_kind::{TiffKindBig, TiffKindStandard};
    use std::io::Cursor;

    #[test]
    fn entries_stay_sorted_by_tag() {
        let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian);
        let mut build = DirBuild::<_, TiffKindStandard>::materializing(&mut writer, 1000);
        build.push(279, 3, 1, &[1, 0]).unwrap();
        build.push(256, 3, 1, &[2, 0]).unwrap();
        build.push(320, 3, 1, &[3, 0]).unwrap();
        let tags: Vec<u16> = build.into_entries().iter().map(|e| e.tag).collect();
        assert_eq!(tags, vec![256, 279, 320]);
    }

    #[test]
    #[should_panic(expected = "duplicate tag")]
    fn duplicate_tags_panic() {
        let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian);
        let mut build = DirBuild::<_, TiffKindStandard>::materializing(&mut writer, 1000);
        build.push(256, 3, 1, &[1, 0]).unwrap();
        build.push(256, 3, 1, &[1, 0]).unwrap();
    }

    #[test]
    fn small_values_are_inline() {
        let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian);
        let mut build = DirBuild::<_, TiffKindStandard>::materializing(&mut writer, 1000);
        build.push(256, 3, 2, &[1, 0, 2, 0]).unwrap();
        let entries = build.into_entries();
        assert_eq!(entries[0].value, [1, 0, 2, 0, 0, 0, 0, 0]);
        // Nothing reached the data area.
        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn large_values_go_to_the_data_area() {
        let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian);
        let mut build = DirBuild::<_, TiffKindStandard>::materializing(&mut writer, 10);
        build.push(258, 3, 3, &[8, 0, 8, 0, 8, 0]).unwrap();
        assert_eq!(build.data_offset(), 16);
        let entries = build.into_entries();
        // The entry holds the offset of the data, little endian.
        assert_eq!(entries[0].value, [10, 0, 0, 0, 0, 0, 0, 0]);
        let bytes = writer.into_inner().into_inner();
        assert_eq!(&bytes[10..16], &[8, 0, 8, 0, 8, 0]);
    }

    #[test]
    fn data_cursor_stays_even() {
        let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian);
        let mut build = DirBuild::<_, TiffKindStandard>::materializing(&mut writer, 10);
        build.push(333, 2, 5, b"abcd\0").unwrap();
        assert_eq!(build.data_offset(), 16);
    }

    #[test]
    fn bigtiff_inlines_eight_bytes() {
        let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian);
        let mut build = DirBuild::<_, TiffKindBig>::materializing(&mut writer, 100);
        build.push(273, 16, 1, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let entries = build.into_entries();
        assert_eq!(entries[0].value, [1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(writer.into_inner().into_inner().is_empty());
    }

    #[test]
    fn classic_offset_wraparound_is_an_error() {
        let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian);
        let mut build =
            DirBuild::<_, TiffKindStandard>::materializing(&mut writer, 0xFFFF_FFFE);
        assert!(build.push(279, 4, 2, &[0; 8]).is_err());
    }

    #[test]
    fn deferred_entries_are_zeroed() {
        let mut writer = TiffWriter::new(Cursor::new(Vec::new()), ByteOrder::LittleEndian);
        let mut build = DirBuild::<_, TiffKindStandard>::materializing(&mut writer, 100);
        build.push_deferred(273).unwrap();
        let entries = build.into_entries();
        assert_eq!(entries[0].type_, 0);
        assert_eq!(entries[0].count, 0);
        assert_eq!(entries[0].value, [0; 8]);
    }
}
