//! The field walk that turns `DirectoryFields` into directory entries.
//!
//! One traversal serves both passes of a directory write: during the
//! counting pass every helper only bumps the entry total, during the
//! materialize pass it encodes and pushes the entry. Field presence is
//! decided in exactly one place per field, so the passes cannot drift
//! apart.

use std::io::{Seek, Write};

use crate::clamp::{clamp_to_f32, clamp_to_i16, clamp_to_i32, clamp_to_i8};
use crate::error::{CapacityError, TiffFormatError, TiffResult};
use crate::fields::{Codec, DirectoryFields};
use crate::tags::{CompressionMethod, SampleFormat, Tag, Type};
use crate::tiff_kind::TiffKind;
use crate::value::{encode_u16s, encode_u32s, encode_u64s, Value};

use super::dir_entry::DirBuild;

/// Sub-IFD bookkeeping produced by the materialize pass: how many child
/// directories were declared and, for multi-child arrays, where the
/// offset array landed. Single-child values are inline and their slot is
/// located by scanning the finished entry list.
pub(crate) struct PendingSubIfd {
    pub count: u64,
    pub data_offset: Option<u64>,
}

/// Walks every field of `fields` in tag-group order and feeds the sink.
/// `is_image` selects a full image directory; custom directories carry
/// only the custom values.
pub(crate) fn emit_fields<W: Write + Seek, K: TiffKind>(
    fields: &DirectoryFields,
    codec: Option<&dyn Codec>,
    is_image: bool,
    defer_striles: bool,
    build: &mut DirBuild<'_, W, K>,
    pending_sub_ifd: &mut Option<PendingSubIfd>,
) -> TiffResult<()> {
    if is_image {
        if let Some(n) = fields.image_width {
            emit_short_long(build, Tag::ImageWidth, n)?;
        }
        if let Some(n) = fields.image_length {
            emit_short_long(build, Tag::ImageLength, n)?;
        }
        if let Some(n) = fields.tile_width {
            emit_short_long(build, Tag::TileWidth, n)?;
        }
        if let Some(n) = fields.tile_length {
            emit_short_long(build, Tag::TileLength, n)?;
        }
        if let Some(v) = fields.x_resolution {
            emit_value(build, Tag::XResolution, &Value::Rational(vec![v]))?;
        }
        if let Some(v) = fields.y_resolution {
            emit_value(build, Tag::YResolution, &Value::Rational(vec![v]))?;
        }
        if let Some(v) = fields.x_position {
            emit_value(build, Tag::XPosition, &Value::Rational(vec![v]))?;
        }
        if let Some(v) = fields.y_position {
            emit_value(build, Tag::YPosition, &Value::Rational(vec![v]))?;
        }
        if let Some(n) = fields.subfile_type {
            emit_value(build, Tag::NewSubfileType, &Value::Long(vec![n]))?;
        }
        if let Some(n) = fields.bits_per_sample {
            emit_short_per_sample(build, Tag::BitsPerSample, fields, n)?;
        }
        if let Some(c) = fields.compression {
            emit_short(build, Tag::Compression, c.to_u16())?;
        }
        if let Some(p) = fields.photometric {
            emit_short(build, Tag::PhotometricInterpretation, p.to_u16())?;
        }
        if let Some(n) = fields.orientation {
            emit_short(build, Tag::Orientation, n)?;
        }
        emit_short(build, Tag::SamplesPerPixel, fields.samples_per_pixel)?;
        if let Some(n) = fields.rows_per_strip {
            emit_short_long(build, Tag::RowsPerStrip, n)?;
        }
        if let Some(n) = fields.min_sample_value {
            emit_short_per_sample(build, Tag::MinSampleValue, fields, n)?;
        }
        if let Some(n) = fields.max_sample_value {
            emit_short_per_sample(build, Tag::MaxSampleValue, fields, n)?;
        }
        if let Some(p) = fields.planar_config {
            emit_short(build, Tag::PlanarConfiguration, p.to_u16())?;
        }
        if let Some(u) = fields.resolution_unit {
            emit_short(build, Tag::ResolutionUnit, u.to_u16())?;
        }
        if let Some([page, total]) = fields.page_number {
            emit_value(build, Tag::PageNumber, &Value::Short(vec![page, total]))?;
        }
        let byte_count_tag = if fields.is_tiled() {
            Tag::TileByteCounts
        } else {
            Tag::StripByteCounts
        };
        let offset_tag = if fields.is_tiled() {
            Tag::TileOffsets
        } else {
            Tag::StripOffsets
        };
        if let Some(counts) = &fields.strile_byte_counts {
            emit_strile_array(build, byte_count_tag, counts, fields, defer_striles)?;
        }
        if let Some(offsets) = &fields.strile_offsets {
            emit_strile_array(build, offset_tag, offsets, fields, defer_striles)?;
        }
        if let Some(map) = &fields.color_map {
            emit_color_map(build, map)?;
        }
        if let Some(extra) = &fields.extra_samples {
            emit_value(build, Tag::ExtraSamples, &Value::Short(extra.clone()))?;
        }
        if let Some(f) = fields.sample_format {
            emit_short_per_sample(build, Tag::SampleFormat, fields, f.to_u16())?;
        }
        if let Some(v) = fields.smin_sample_value {
            emit_sample_format_array(build, Tag::SMinSampleValue, fields, v)?;
        }
        if let Some(v) = fields.smax_sample_value {
            emit_sample_format_array(build, Tag::SMaxSampleValue, fields, v)?;
        }
        if let Some(tf) = &fields.transfer_function {
            emit_transfer_function(build, fields, tf)?;
        }
        if let Some(names) = &fields.ink_names {
            emit_ink_names(build, names)?;
        }
        if let Some(children) = &fields.sub_ifd {
            emit_sub_ifd(build, children, pending_sub_ifd)?;
        }
        if let Some(codec) = codec {
            for (tag, value) in codec.fields() {
                emit_value(build, tag, &value)?;
            }
        }
    }
    for (tag, value) in &fields.custom {
        emit_value(build, *tag, value)?;
    }
    Ok(())
}

fn emit_value<W: Write + Seek, K: TiffKind>(
    build: &mut DirBuild<'_, W, K>,
    tag: Tag,
    value: &Value,
) -> TiffResult<()> {
    if build.is_counting() {
        build.bump();
        return Ok(());
    }
    let (ty, count, bytes) = value.encode::<K>(tag, build.byte_order())?;
    build.push(tag.to_u16(), ty.to_u16(), count, &bytes)
}

fn emit_short<W: Write + Seek, K: TiffKind>(
    build: &mut DirBuild<'_, W, K>,
    tag: Tag,
    value: u16,
) -> TiffResult<()> {
    if build.is_counting() {
        build.bump();
        return Ok(());
    }
    let mut bytes = [0u8; 2];
    build.byte_order().put_u16(&mut bytes, value);
    build.push(tag.to_u16(), Type::SHORT.to_u16(), 1, &bytes)
}

/// SHORT when the value fits, LONG otherwise. Used for dimensions that
/// old readers expect narrow.
fn emit_short_long<W: Write + Seek, K: TiffKind>(
    build: &mut DirBuild<'_, W, K>,
    tag: Tag,
    value: u32,
) -> TiffResult<()> {
    if build.is_counting() {
        build.bump();
        return Ok(());
    }
    if value <= 0xFFFF {
        let mut bytes = [0u8; 2];
        build.byte_order().put_u16(&mut bytes, value as u16);
        build.push(tag.to_u16(), Type::SHORT.to_u16(), 1, &bytes)
    } else {
        let mut bytes = [0u8; 4];
        build.byte_order().put_u32(&mut bytes, value);
        build.push(tag.to_u16(), Type::LONG.to_u16(), 1, &bytes)
    }
}

/// One SHORT per sample, all carrying the same value.
fn emit_short_per_sample<W: Write + Seek, K: TiffKind>(
    build: &mut DirBuild<'_, W, K>,
    tag: Tag,
    fields: &DirectoryFields,
    value: u16,
) -> TiffResult<()> {
    let values = vec![value; usize::from(fields.samples_per_pixel)];
    emit_value(build, tag, &Value::Short(values))
}

/// Decides whether a strile byte-count array needs a type wider than the
/// one holding `threshold`.
///
/// Uncompressed data needs the wide type only when a strile really can
/// exceed the threshold. Schemes that reliably shrink their input get a
/// 10x allowance. For anything else the compressed size is unpredictable
/// and the wide type is always used.
pub(crate) fn write_as_wide(fields: &DirectoryFields, threshold: u64) -> bool {
    let size = fields.max_strile_size();
    match fields.compression.unwrap_or(CompressionMethod::None) {
        CompressionMethod::None => size > threshold,
        c if c.shrinks_reliably() => size >= threshold / 10,
        _ => true,
    }
}

fn narrow_u32(tag: Tag, value: u64) -> TiffResult<u32> {
    u32::try_from(value).map_err(|_| {
        CapacityError::ValueOutOfRange(tag.to_u16(), value, u64::from(u32::MAX)).into()
    })
}

fn narrow_u16(tag: Tag, value: u64) -> TiffResult<u16> {
    u16::try_from(value).map_err(|_| {
        CapacityError::ValueOutOfRange(tag.to_u16(), value, u64::from(u16::MAX)).into()
    })
}

/// Strip and tile offset/byte-count arrays, with the narrowest wire type
/// their values and the directory's geometry allow.
///
/// Offset arrays keep the variant's natural width. Byte-count arrays
/// with more than one element may be narrowed one step, LONG8 to LONG in
/// BigTIFF and LONG to SHORT in classic files, when the heuristic says
/// the values will fit. A value that does not fit the chosen width is a
/// hard error.
fn emit_strile_array<W: Write + Seek, K: TiffKind>(
    build: &mut DirBuild<'_, W, K>,
    tag: Tag,
    values: &[u64],
    fields: &DirectoryFields,
    defer: bool,
) -> TiffResult<()> {
    if build.is_counting() {
        build.bump();
        return Ok(());
    }
    if defer {
        return build.push_deferred(tag.to_u16());
    }
    let order = build.byte_order();
    let may_narrow = values.len() > 1 && tag.is_strile_byte_counts();

    if K::is_big() {
        if !may_narrow || write_as_wide(fields, 0xFFFF_FFFF) {
            let bytes = encode_u64s(values, order);
            return build.push(tag.to_u16(), Type::LONG8.to_u16(), values.len() as u64, &bytes);
        }
    } else if may_narrow && !write_as_wide(fields, 0xFFFF) {
        let mut narrow = Vec::with_capacity(values.len());
        for &v in values {
            narrow.push(narrow_u16(tag, v)?);
        }
        let bytes = encode_u16s(&narrow, order);
        return build.push(tag.to_u16(), Type::SHORT.to_u16(), values.len() as u64, &bytes);
    }

    let mut narrow = Vec::with_capacity(values.len());
    for &v in values {
        narrow.push(narrow_u32(tag, v)?);
    }
    let bytes = encode_u32s(&narrow, order);
    build.push(tag.to_u16(), Type::LONG.to_u16(), values.len() as u64, &bytes)
}

/// SMin/SMaxSampleValue, replicated per sample and encoded in the type
/// implied by the sample format and bit depth.
fn emit_sample_format_array<W: Write + Seek, K: TiffKind>(
    build: &mut DirBuild<'_, W, K>,
    tag: Tag,
    fields: &DirectoryFields,
    value: f64,
) -> TiffResult<()> {
    let samples = usize::from(fields.samples_per_pixel);
    let bits = fields.bits_per_sample.unwrap_or(1);
    let value = match fields.sample_format.unwrap_or(SampleFormat::Uint) {
        SampleFormat::IEEEFP => {
            if bits <= 32 {
                Value::Float(vec![clamp_to_f32(value); samples])
            } else {
                Value::Double(vec![value; samples])
            }
        }
        SampleFormat::Int => {
            if bits <= 8 {
                Value::Sbyte(vec![clamp_to_i8(value); samples])
            } else if bits <= 16 {
                Value::Sshort(vec![clamp_to_i16(value); samples])
            } else {
                Value::Slong(vec![clamp_to_i32(value); samples])
            }
        }
        SampleFormat::Uint => {
            if bits <= 8 {
                Value::Byte(vec![crate::clamp::clamp_to_u8(value); samples])
            } else if bits <= 16 {
                Value::Short(vec![crate::clamp::clamp_to_u16(value); samples])
            } else {
                Value::Long(vec![crate::clamp::clamp_to_u32(value); samples])
            }
        }
        // Unclassified data keeps full precision.
        _ => Value::Double(vec![value; samples]),
    };
    emit_value(build, tag, &value)
}

/// The color map always carries three channels of `1 << bits` entries.
fn emit_color_map<W: Write + Seek, K: TiffKind>(
    build: &mut DirBuild<'_, W, K>,
    map: &[Vec<u16>; 3],
) -> TiffResult<()> {
    if build.is_counting() {
        build.bump();
        return Ok(());
    }
    let mut values = Vec::with_capacity(map[0].len() * 3);
    for channel in map {
        values.extend_from_slice(channel);
    }
    let bytes = encode_u16s(&values, build.byte_order());
    build.push(
        Tag::ColorMap.to_u16(),
        Type::SHORT.to_u16(),
        values.len() as u64,
        &bytes,
    )
}

/// The transfer function drops trailing channels identical to the first,
/// shrinking the common grayscale and neutral-RGB cases to one channel.
fn emit_transfer_function<W: Write + Seek, K: TiffKind>(
    build: &mut DirBuild<'_, W, K>,
    fields: &DirectoryFields,
    tf: &[Vec<u16>],
) -> TiffResult<()> {
    if tf.is_empty() {
        return Ok(());
    }
    if build.is_counting() {
        build.bump();
        return Ok(());
    }
    let extra = fields.extra_samples.as_ref().map_or(0, |e| e.len() as u16);
    let color_channels = fields.samples_per_pixel.saturating_sub(extra);
    let mut channels = usize::from(color_channels.clamp(1, 3));
    if channels == 3 && (tf.len() < 3 || tf[2] == tf[0]) {
        channels = 2;
    }
    if channels == 2 && (tf.len() < 2 || tf[1] == tf[0]) {
        channels = 1;
    }
    let mut values = Vec::with_capacity(tf[0].len() * channels);
    for channel in tf.iter().take(channels) {
        values.extend_from_slice(channel);
    }
    let bytes = encode_u16s(&values, build.byte_order());
    build.push(
        Tag::TransferFunction.to_u16(),
        Type::SHORT.to_u16(),
        values.len() as u64,
        &bytes,
    )
}

/// Ink names are packed into one ASCII entry, each name NUL terminated.
fn emit_ink_names<W: Write + Seek, K: TiffKind>(
    build: &mut DirBuild<'_, W, K>,
    names: &[String],
) -> TiffResult<()> {
    if build.is_counting() {
        build.bump();
        return Ok(());
    }
    let mut bytes = Vec::new();
    for name in names {
        if !name.is_ascii() || name.contains('\0') {
            return Err(TiffFormatError::InvalidAscii.into());
        }
        bytes.extend_from_slice(name.as_bytes());
        bytes.push(0);
    }
    build.push(
        Tag::InkNames.to_u16(),
        Type::ASCII.to_u16(),
        bytes.len() as u64,
        &bytes,
    )
}

/// The sub-IFD offset array. The values are zero placeholders at this
/// point; the slot they occupy is recorded so child directory writes can
/// patch them.
fn emit_sub_ifd<W: Write + Seek, K: TiffKind>(
    build: &mut DirBuild<'_, W, K>,
    children: &[u64],
    pending: &mut Option<PendingSubIfd>,
) -> TiffResult<()> {
    if children.is_empty() {
        return Ok(());
    }
    if build.is_counting() {
        build.bump();
        return Ok(());
    }
    let order = build.byte_order();
    // With more than one child the array goes out of line at the current
    // data cursor; a single child is inline and its slot is found by
    // scanning the entry list afterwards.
    let data_offset = if children.len() > 1 {
        Some(build.data_offset())
    } else {
        None
    };
    if K::is_big() {
        let bytes = encode_u64s(children, order);
        build.push(
            Tag::SubIfd.to_u16(),
            Type::IFD8.to_u16(),
            children.len() as u64,
            &bytes,
        )?;
    } else {
        let mut narrow = Vec::with_capacity(children.len());
        for &offset in children {
            narrow.push(narrow_u32(Tag::SubIfd, offset)?);
        }
        let bytes = encode_u32s(&narrow, order);
        build.push(
            Tag::SubIfd.to_u16(),
            Type::IFD.to_u16(),
            children.len() as u64,
            &bytes,
        )?;
    }
    *pending = Some(PendingSubIfd {
        count: children.len() as u64,
        data_offset,
    });
    Ok(())
}
