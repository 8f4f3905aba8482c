//! Directory write sessions.
//!
//! A [`TiffFile`] owns the output stream and the fields of the directory
//! currently being assembled. Committing a directory is a two-pass
//! operation: the fields are walked once to size the directory block,
//! the block is placed at the end of the file, and the walk runs again
//! to materialize entries while out-of-line values stream into the area
//! directly behind the block. The finished block is then written in one
//! piece and linked into the chain.

use std::io::{Read, Seek, Write};
use std::marker::PhantomData;

use crate::error::{CapacityError, TiffResult, UsageError};
use crate::fields::{Codec, DirectoryFields};
use crate::tags::{Tag, Type};
use crate::tiff_kind::TiffKind;
use crate::writer::{even_offset, ByteOrder, TiffWriter};

mod dir_entry;
mod dirwrite;
mod link;
mod rewrite;

pub use rewrite::RewriteData;

use dir_entry::DirBuild;
use dirwrite::{emit_fields, write_as_wide};
use link::SubIfdState;

/// Wire types picked for deferred strile entries at directory write
/// time, reused when the entries are filled in later so the rewrite
/// matches what the assembler promised.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DeferredStrileTypes {
    pub offsets: Type,
    pub counts: Type,
}

/// A TIFF or BigTIFF file being written.
pub struct TiffFile<W, K: TiffKind> {
    writer: TiffWriter<W>,
    fields: DirectoryFields,
    codec: Option<Box<dyn Codec>>,
    /// Offset of the current directory, zero until it is first
    /// committed. Stays set across checkpoints so they rewrite in place.
    dir_offset: u64,
    /// Offset of the most recently committed directory, the target of
    /// field rewrites.
    last_dir_offset: u64,
    defer_striles: bool,
    deferred_types: Option<DeferredStrileTypes>,
    sub_ifd: SubIfdState,
    _kind: PhantomData<K>,
}

pub type TiffFileStandard<W> = TiffFile<W, crate::tiff_kind::TiffKindStandard>;
pub type TiffFileBig<W> = TiffFile<W, crate::tiff_kind::TiffKindBig>;

impl<W: Read + Write + Seek, K: TiffKind> TiffFile<W, K> {
    /// Starts a new file in the machine's byte order.
    pub fn new(writer: W) -> TiffResult<Self> {
        Self::with_byte_order(writer, ByteOrder::native())
    }

    /// Starts a new file, writing the header immediately.
    pub fn with_byte_order(writer: W, byte_order: ByteOrder) -> TiffResult<Self> {
        let mut writer = TiffWriter::new(writer, byte_order);
        K::write_header(&mut writer)?;
        Ok(Self {
            writer,
            fields: DirectoryFields::default(),
            codec: None,
            dir_offset: 0,
            last_dir_offset: 0,
            defer_striles: false,
            deferred_types: None,
            sub_ifd: SubIfdState::default(),
            _kind: PhantomData,
        })
    }

    pub fn fields(&self) -> &DirectoryFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut DirectoryFields {
        &mut self.fields
    }

    /// Installs the compression hook consulted when directories are
    /// committed.
    pub fn set_codec(&mut self, codec: Box<dyn Codec>) {
        self.codec = Some(codec);
    }

    /// Arranges for the strile arrays of the current directory to be
    /// written as zeroed placeholder entries, to be filled in through
    /// [`TiffFile::rewrite_field`] once the data has been written. Must
    /// be called before the directory first reaches the file.
    pub fn defer_strile_arrays(&mut self) -> TiffResult<()> {
        if self.dir_offset != 0 {
            return Err(UsageError::DirectoryAlreadyWritten.into());
        }
        self.defer_striles = true;
        Ok(())
    }

    /// Commits the current directory, links it into the chain and resets
    /// the session for the next one. Returns the directory's offset.
    pub fn write_directory(&mut self) -> TiffResult<u64> {
        self.flush_codec()?;
        let offset = self.write_directory_sec(true)?;
        self.fields = DirectoryFields::default();
        self.defer_striles = false;
        self.last_dir_offset = offset;
        self.dir_offset = 0;
        Ok(offset)
    }

    /// Commits the current directory without resetting the session, so
    /// writing can continue. A later commit of the same directory
    /// rewrites it in place; use this to keep the file readable while it
    /// is still growing.
    pub fn checkpoint_directory(&mut self) -> TiffResult<u64> {
        let offset = self.write_directory_sec(true)?;
        self.last_dir_offset = offset;
        Ok(offset)
    }

    /// Writes a directory holding only the queued custom values, outside
    /// the main directory chain. The returned offset is the caller's to
    /// store, typically in a pointer tag of another directory.
    pub fn write_custom_directory(&mut self) -> TiffResult<u64> {
        self.write_directory_sec(false)
    }

    /// Moves the current, already committed directory to the end of the
    /// file: the old copy is unlinked first and the replacement appended
    /// and relinked. Used when a checkpointed directory has grown. The
    /// two steps are not atomic; a crash between them leaves the chain
    /// ending before this directory.
    pub fn rewrite_directory(&mut self) -> TiffResult<u64> {
        if self.dir_offset != 0 {
            link::unlink_directory::<_, K>(&mut self.writer, self.dir_offset)?;
            self.dir_offset = 0;
        }
        self.write_directory()
    }

    /// Replaces the value of one entry of the last committed directory.
    /// See [`RewriteData`] for the accepted shapes.
    pub fn rewrite_field(&mut self, tag: Tag, data: RewriteData<'_>) -> TiffResult<()> {
        if self.last_dir_offset == 0 {
            return Err(UsageError::DirectoryNotWritten.into());
        }
        rewrite::rewrite_field::<_, K>(
            &mut self.writer,
            &self.fields,
            self.deferred_types,
            self.last_dir_offset,
            tag,
            &data,
        )
    }

    /// Consumes the session, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn flush_codec(&mut self) -> TiffResult<()> {
        let Some(codec) = self.codec.as_mut() else {
            return Ok(());
        };
        codec.finalize()?;
        if let Some(bytes) = codec.pending_bytes()? {
            if bytes.is_empty() {
                return Ok(());
            }
            let offset = even_offset(self.writer.goto_end()?);
            K::check_offset(offset + bytes.len() as u64)?;
            self.writer.goto_offset(offset)?;
            self.writer.write_bytes(&bytes)?;
        }
        Ok(())
    }

    fn write_directory_sec(&mut self, is_image: bool) -> TiffResult<u64> {
        // Sizing pass.
        let count = {
            let mut build = DirBuild::<_, K>::counting(&mut self.writer);
            let mut pending = None;
            emit_fields(
                &self.fields,
                self.codec.as_deref(),
                is_image,
                self.defer_striles,
                &mut build,
                &mut pending,
            )?;
            build.entry_total()
        };

        let relink;
        let dir_offset;
        if is_image {
            if self.dir_offset == 0 {
                dir_offset = even_offset(self.writer.goto_end()?);
                relink = true;
            } else {
                dir_offset = self.dir_offset;
                relink = false;
            }
            self.dir_offset = dir_offset;
        } else {
            dir_offset = even_offset(self.writer.goto_end()?);
            relink = false;
        }
        K::check_offset(dir_offset)?;

        let dir_size = K::dir_size(count);
        let mut data_offset = dir_offset.wrapping_add(dir_size);
        if !K::is_big() {
            data_offset &= 0xFFFF_FFFF;
        }
        if data_offset < dir_offset || data_offset < dir_size {
            return Err(CapacityError::MaximumFileSizeExceeded.into());
        }
        data_offset = even_offset(data_offset);

        // Materialize pass, writing out-of-line values behind the block.
        let mut pending = None;
        let entries = {
            let mut build = DirBuild::<_, K>::materializing(&mut self.writer, data_offset);
            emit_fields(
                &self.fields,
                self.codec.as_deref(),
                is_image,
                self.defer_striles,
                &mut build,
                &mut pending,
            )?;
            assert_eq!(
                build.entry_total(),
                count,
                "field walk diverged between sizing and materialize passes"
            );
            build.into_entries()
        };

        let new_sub_ifd = match pending {
            Some(p) => {
                let slot = match p.data_offset {
                    Some(offset) => offset,
                    None => {
                        let index = entries
                            .iter()
                            .position(|e| e.tag == Tag::SubIfd.to_u16())
                            .ok_or(UsageError::NoSubIfdSlot)?;
                        dir_offset
                            + K::DIR_COUNT_BYTES
                            + index as u64 * K::ENTRY_BYTES
                            + 2
                            + 2
                            + K::VALUE_COUNT_BYTES
                    }
                };
                Some(SubIfdState {
                    remaining: p.count,
                    slot_offset: slot,
                })
            }
            None => None,
        };

        // The block is assembled in memory and hits the file in a single
        // write, so readers never see a half-written directory.
        let mut block = TiffWriter::new(Vec::with_capacity(dir_size as usize), self.writer.byte_order());
        K::write_dir_count(&mut block, count)?;
        for entry in &entries {
            block.write_u16(entry.tag)?;
            block.write_u16(entry.type_)?;
            K::write_value_count(&mut block, entry.count)?;
            block.write_bytes(&entry.value[..K::OFFSET_BYTES as usize])?;
        }
        // The next pointer starts at zero; the chain linker patches it
        // when a later directory is appended.
        K::write_offset(&mut block, 0)?;
        let block = block.into_inner();
        debug_assert_eq!(block.len() as u64, dir_size);
        self.writer.goto_offset(dir_offset)?;
        self.writer.write_bytes(&block)?;

        if is_image && self.defer_striles {
            self.deferred_types = Some(DeferredStrileTypes {
                offsets: if K::is_big() { Type::LONG8 } else { Type::LONG },
                counts: if K::is_big() {
                    if write_as_wide(&self.fields, 0xFFFF_FFFF) {
                        Type::LONG8
                    } else {
                        Type::LONG
                    }
                } else if write_as_wide(&self.fields, 0xFFFF) {
                    Type::LONG
                } else {
                    Type::SHORT
                },
            });
        }

        if relink {
            link::link_directory::<_, K>(&mut self.writer, &mut self.sub_ifd, dir_offset)?;
        }
        if let Some(sub) = new_sub_ifd {
            self.sub_ifd = sub;
        }
        Ok(dir_offset)
    }
}
