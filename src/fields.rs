//! In-memory directory state accumulated before a write.

use crate::error::TiffResult;
use crate::tags::{
    CompressionMethod, PhotometricInterpretation, PlanarConfiguration, ResolutionUnit,
    SampleFormat, Tag,
};
use crate::value::Value;

/// The fields of one directory while it is being assembled.
///
/// Named fields are written in a fixed order; unset fields are skipped.
/// Anything without a named slot goes through [`DirectoryFields::insert`]
/// as a custom value.
#[derive(Clone, Debug)]
pub struct DirectoryFields {
    pub subfile_type: Option<u32>,
    pub image_width: Option<u32>,
    pub image_length: Option<u32>,
    /// Set together with `tile_length`; presence switches the strile
    /// tags from strips to tiles.
    pub tile_width: Option<u32>,
    pub tile_length: Option<u32>,
    pub x_resolution: Option<f64>,
    pub y_resolution: Option<f64>,
    pub x_position: Option<f64>,
    pub y_position: Option<f64>,
    pub resolution_unit: Option<ResolutionUnit>,
    pub bits_per_sample: Option<u16>,
    pub compression: Option<CompressionMethod>,
    pub photometric: Option<PhotometricInterpretation>,
    pub orientation: Option<u16>,
    pub samples_per_pixel: u16,
    pub rows_per_strip: Option<u32>,
    pub min_sample_value: Option<u16>,
    pub max_sample_value: Option<u16>,
    /// Per-directory extrema for non-integer data, encoded according to
    /// `sample_format` and `bits_per_sample`.
    pub smin_sample_value: Option<f64>,
    pub smax_sample_value: Option<f64>,
    pub planar_config: Option<PlanarConfiguration>,
    pub page_number: Option<[u16; 2]>,
    /// Strip or tile start offsets, depending on `tile_width`.
    pub strile_offsets: Option<Vec<u64>>,
    /// Strip or tile byte counts, depending on `tile_width`.
    pub strile_byte_counts: Option<Vec<u64>>,
    /// Three channels of `1 << bits_per_sample` entries each.
    pub color_map: Option<[Vec<u16>; 3]>,
    pub extra_samples: Option<Vec<u16>>,
    pub sample_format: Option<SampleFormat>,
    /// One to three channels; trailing channels equal to the first are
    /// dropped on write.
    pub transfer_function: Option<Vec<Vec<u16>>>,
    /// Written NUL-separated as a single ASCII entry.
    pub ink_names: Option<Vec<String>>,
    /// Offsets of child directories. Zero placeholders are patched as the
    /// children are written.
    pub sub_ifd: Option<Vec<u64>>,
    pub custom: Vec<(Tag, Value)>,
}

impl Default for DirectoryFields {
    fn default() -> Self {
        Self {
            subfile_type: None,
            image_width: None,
            image_length: None,
            tile_width: None,
            tile_length: None,
            x_resolution: None,
            y_resolution: None,
            x_position: None,
            y_position: None,
            resolution_unit: None,
            bits_per_sample: None,
            compression: None,
            photometric: None,
            orientation: None,
            samples_per_pixel: 1,
            rows_per_strip: None,
            min_sample_value: None,
            max_sample_value: None,
            smin_sample_value: None,
            smax_sample_value: None,
            planar_config: None,
            page_number: None,
            strile_offsets: None,
            strile_byte_counts: None,
            color_map: None,
            extra_samples: None,
            sample_format: None,
            transfer_function: None,
            ink_names: None,
            sub_ifd: None,
            custom: Vec::new(),
        }
    }
}

impl DirectoryFields {
    /// Queues a custom tag value. Each tag may appear once per directory;
    /// duplicates trip an assertion during the write.
    pub fn insert(&mut self, tag: Tag, value: Value) {
        self.custom.push((tag, value));
    }

    /// True when the directory describes tiled rather than stripped data.
    pub fn is_tiled(&self) -> bool {
        self.tile_width.is_some()
    }

    /// Upper bound on the uncompressed size of one strip or tile, used to
    /// pick the wire width of byte-count entries. Unset geometry fields
    /// fall back to their defaults (1 bit per sample, one strip).
    pub fn max_strile_size(&self) -> u64 {
        let bits = u64::from(self.bits_per_sample.unwrap_or(1));
        let samples = u64::from(self.samples_per_pixel);
        let width = u64::from(self.image_width.unwrap_or(0));
        let length = u64::from(self.image_length.unwrap_or(0));

        let (cols, rows) = if self.is_tiled() {
            (
                u64::from(self.tile_width.unwrap_or(0)),
                u64::from(self.tile_length.unwrap_or(0)),
            )
        } else {
            let rows = match self.rows_per_strip {
                Some(r) => u64::from(r).min(length.max(1)),
                None => length.max(1),
            };
            (width, rows)
        };

        let row_bits = cols.saturating_mul(samples).saturating_mul(bits);
        let row_bytes = row_bits / 8 + u64::from(row_bits % 8 != 0);
        rows.saturating_mul(row_bytes)
    }
}

/// Hook for the active compression scheme.
///
/// Before a directory is committed the engine finalizes the encoder,
/// appends any buffered output to the data area and writes the scheme's
/// own tags after the named fields.
pub trait Codec {
    /// Tags the scheme contributes to the directory.
    fn fields(&self) -> Vec<(Tag, Value)> {
        Vec::new()
    }

    /// Finishes any in-flight encoding state.
    fn finalize(&mut self) -> TiffResult<()> {
        Ok(())
    }

    /// Returns bytes buffered by the encoder that still need to reach the
    /// file, or `None` when everything has been flushed already.
    fn pending_bytes(&mut self) -> TiffResult<Option<Vec<u8>>> {
        Ok(None)
    }
}
