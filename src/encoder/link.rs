//! Maintenance of the on-disk directory chain.
//!
//! Directories form a singly linked list starting at the header's
//! directory slot. Linking a new directory means finding the pointer
//! that currently ends the chain, or the one referencing a directory
//! being replaced, and patching it in place. Child directories bypass
//! the chain entirely and land in their parent's sub-IFD slots.

use crate::error::{TiffFormatError, TiffResult};
use crate::tiff_kind::{ReadWriteSeek, TiffKind};
use crate::writer::TiffWriter;

/// Parent slots still waiting for child directory offsets. While
/// `remaining` is nonzero, newly written directories are patched into
/// `slot_offset` instead of the main chain.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SubIfdState {
    pub remaining: u64,
    pub slot_offset: u64,
}

impl SubIfdState {
    pub fn active(&self) -> bool {
        self.remaining > 0
    }
}

/// Finds the offset of the pointer whose value is `target`, walking the
/// chain from the directory at `first`. With `target == 0` this finds
/// the tail pointer of the chain.
fn find_link_slot<W: ReadWriteSeek, K: TiffKind>(
    writer: &mut TiffWriter<W>,
    first: u64,
    target: u64,
) -> TiffResult<u64> {
    let mut dir = first;
    loop {
        writer.goto_offset(dir)?;
        let entries = K::read_dir_count(writer)?;
        let slot = dir + K::DIR_COUNT_BYTES + entries * K::ENTRY_BYTES;
        writer.goto_offset(slot)?;
        let next = K::read_offset(writer)?;
        if next == target {
            return Ok(slot);
        }
        if next == 0 {
            return Err(TiffFormatError::DirectoryNotInChain(target).into());
        }
        dir = next;
    }
}

/// Links the directory at `offset` into the file: into the pending
/// parent sub-IFD slot when one is armed, otherwise at the end of the
/// main chain (which for the first directory is the header slot).
pub(crate) fn link_directory<W: ReadWriteSeek, K: TiffKind>(
    writer: &mut TiffWriter<W>,
    sub_ifd: &mut SubIfdState,
    offset: u64,
) -> TiffResult<()> {
    if sub_ifd.active() {
        writer.goto_offset(sub_ifd.slot_offset)?;
        K::write_offset(writer, offset)?;
        sub_ifd.remaining -= 1;
        sub_ifd.slot_offset += K::OFFSET_BYTES;
        return Ok(());
    }

    writer.goto_offset(K::HEADER_DIR_SLOT)?;
    let first = K::read_offset(writer)?;
    if first == 0 {
        writer.goto_offset(K::HEADER_DIR_SLOT)?;
        return K::write_offset(writer, offset);
    }
    let slot = find_link_slot::<_, K>(writer, first, 0)?;
    writer.goto_offset(slot)?;
    K::write_offset(writer, offset)
}

/// Removes the directory at `offset` from the chain by pointing its
/// predecessor at zero. The directory's bytes stay in the file as dead
/// space; a following write appends the replacement and relinks. The two
/// steps are not atomic, so a crash in between leaves the chain ending
/// early rather than referencing a stale directory.
pub(crate) fn unlink_directory<W: ReadWriteSeek, K: TiffKind>(
    writer: &mut TiffWriter<W>,
    offset: u64,
) -> TiffResult<()> {
    writer.goto_offset(K::HEADER_DIR_SLOT)?;
    let first = K::read_offset(writer)?;
    if first == offset {
        writer.goto_offset(K::HEADER_DIR_SLOT)?;
        return K::write_offset(writer, 0);
    }
    if first == 0 {
        return Err(TiffFormatError::DirectoryNotInChain(offset).into());
    }
    let slot = find_link_slot::<_, K>(writer, first, offset)?;
    writer.goto_offset(slot)?;
    K::write_offset(writer, 0)
}
