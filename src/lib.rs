//! Low-level writing of TIFF and BigTIFF directory structures.
//!
//! This crate covers the bookkeeping half of producing a TIFF file: it
//! assembles image file directories from typed field state, writes them
//! in two passes so each directory lands in one contiguous block,
//! maintains the on-disk directory chain and sub-IFD links, and patches
//! individual entries of directories that are already on disk. Image
//! data layout and compression are the caller's business; the engine
//! only records where the striles ended up.
//!
//! ```no_run
//! use std::fs::File;
//! use tiffwrite::{encoder::TiffFileStandard, ByteOrder};
//!
//! # fn run() -> tiffwrite::TiffResult<()> {
//! let file = File::create("out.tif")?;
//! let mut tiff = TiffFileStandard::with_byte_order(file, ByteOrder::LittleEndian)?;
//! let fields = tiff.fields_mut();
//! fields.image_width = Some(256);
//! fields.image_length = Some(256);
//! fields.bits_per_sample = Some(8);
//! fields.rows_per_strip = Some(256);
//! fields.strile_offsets = Some(vec![8]);
//! fields.strile_byte_counts = Some(vec![256 * 256]);
//! tiff.write_directory()?;
//! # Ok(())
//! # }
//! ```

mod clamp;
pub mod encoder;
mod error;
mod fields;
mod rational;
pub mod tags;
mod tiff_kind;
mod value;
mod writer;

pub use self::clamp::{
    clamp_to_f32, clamp_to_i16, clamp_to_i32, clamp_to_i8, clamp_to_u16, clamp_to_u32,
    clamp_to_u8,
};
pub use self::encoder::{RewriteData, TiffFile, TiffFileBig, TiffFileStandard};
pub use self::error::{
    CapacityError, TiffError, TiffFormatError, TiffResult, UsageError,
};
pub use self::fields::{Codec, DirectoryFields};
pub use self::rational::{to_signed_rational, to_unsigned_rational};
pub use self::tiff_kind::{TiffKind, TiffKindBig, TiffKindStandard};
pub use self::value::Value;
pub use self::writer::{ByteOrder, TiffWriter};
