//! Tag values accepted through the custom value channel.

use crate::error::{CapacityError, TiffFormatError, TiffResult};
use crate::rational::{to_signed_rational, to_unsigned_rational};
use crate::tags::{Tag, Type};
use crate::tiff_kind::TiffKind;
use crate::writer::ByteOrder;

/// A value for a directory entry, one variant per wire type.
///
/// Rationals are given as doubles and approximated to 32-bit fractions
/// when encoded. The 8-byte integer variants are only representable in
/// BigTIFF; `Ifd8` additionally down-converts to 4-byte `IFD` in classic
/// files when every element fits.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Ascii(String),
    Byte(Vec<u8>),
    Sbyte(Vec<i8>),
    Undefined(Vec<u8>),
    Short(Vec<u16>),
    Sshort(Vec<i16>),
    Long(Vec<u32>),
    Slong(Vec<i32>),
    Long8(Vec<u64>),
    Slong8(Vec<i64>),
    Rational(Vec<f64>),
    SRational(Vec<f64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    Ifd(Vec<u32>),
    Ifd8(Vec<u64>),
}

impl Value {
    /// Serializes the value into its wire form for an entry of `tag`,
    /// returning the wire type, element count and raw bytes.
    pub(crate) fn encode<K: TiffKind>(
        &self,
        tag: Tag,
        byte_order: ByteOrder,
    ) -> TiffResult<(Type, u64, Vec<u8>)> {
        let encoded = match self {
            Value::Ascii(s) => {
                if !s.is_ascii() || s.contains('\0') {
                    return Err(TiffFormatError::InvalidAscii.into());
                }
                let mut bytes = s.as_bytes().to_vec();
                bytes.push(0);
                let count = bytes.len() as u64;
                (Type::ASCII, count, bytes)
            }
            Value::Byte(v) => (Type::BYTE, v.len() as u64, v.clone()),
            Value::Sbyte(v) => {
                let bytes = v.iter().map(|&n| n as u8).collect();
                (Type::SBYTE, v.len() as u64, bytes)
            }
            Value::Undefined(v) => (Type::UNDEFINED, v.len() as u64, v.clone()),
            Value::Short(v) => (Type::SHORT, v.len() as u64, encode_u16s(v, byte_order)),
            Value::Sshort(v) => {
                let raw: Vec<u16> = v.iter().map(|&n| n as u16).collect();
                (Type::SSHORT, v.len() as u64, encode_u16s(&raw, byte_order))
            }
            Value::Long(v) => (Type::LONG, v.len() as u64, encode_u32s(v, byte_order)),
            Value::Slong(v) => {
                let raw: Vec<u32> = v.iter().map(|&n| n as u32).collect();
                (Type::SLONG, v.len() as u64, encode_u32s(&raw, byte_order))
            }
            Value::Long8(v) => {
                if !K::is_big() {
                    return Err(CapacityError::WideTypeInClassicFile("LONG8").into());
                }
                (Type::LONG8, v.len() as u64, encode_u64s(v, byte_order))
            }
            Value::Slong8(v) => {
                if !K::is_big() {
                    return Err(CapacityError::WideTypeInClassicFile("SLONG8").into());
                }
                let raw: Vec<u64> = v.iter().map(|&n| n as u64).collect();
                (Type::SLONG8, v.len() as u64, encode_u64s(&raw, byte_order))
            }
            Value::Rational(v) => {
                let mut bytes = Vec::with_capacity(v.len() * 8);
                for &d in v {
                    let (num, denom) = to_unsigned_rational(d);
                    push_u32(&mut bytes, num, byte_order);
                    push_u32(&mut bytes, denom, byte_order);
                }
                (Type::RATIONAL, v.len() as u64, bytes)
            }
            Value::SRational(v) => {
                let mut bytes = Vec::with_capacity(v.len() * 8);
                for &d in v {
                    let (num, denom) = to_signed_rational(d);
                    push_u32(&mut bytes, num as u32, byte_order);
                    push_u32(&mut bytes, denom as u32, byte_order);
                }
                (Type::SRATIONAL, v.len() as u64, bytes)
            }
            Value::Float(v) => {
                let raw: Vec<u32> = v.iter().map(|&f| f.to_bits()).collect();
                (Type::FLOAT, v.len() as u64, encode_u32s(&raw, byte_order))
            }
            Value::Double(v) => {
                let raw: Vec<u64> = v.iter().map(|&f| f.to_bits()).collect();
                (Type::DOUBLE, v.len() as u64, encode_u64s(&raw, byte_order))
            }
            Value::Ifd(v) => (Type::IFD, v.len() as u64, encode_u32s(v, byte_order)),
            Value::Ifd8(v) => {
                if K::is_big() {
                    (Type::IFD8, v.len() as u64, encode_u64s(v, byte_order))
                } else {
                    // Classic files hold IFD offsets in 32 bits; keep the
                    // value if it fits, fail otherwise.
                    let mut narrow = Vec::with_capacity(v.len());
                    for &offset in v {
                        let n = u32::try_from(offset).map_err(|_| {
                            CapacityError::ValueOutOfRange(
                                tag.to_u16(),
                                offset,
                                u64::from(u32::MAX),
                            )
                        })?;
                        narrow.push(n);
                    }
                    (Type::IFD, v.len() as u64, encode_u32s(&narrow, byte_order))
                }
            }
        };
        Ok(encoded)
    }
}

pub(crate) fn encode_u16s(values: &[u16], byte_order: ByteOrder) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len() * 2];
    for (chunk, &n) in bytes.chunks_exact_mut(2).zip(values) {
        byte_order.put_u16(chunk, n);
    }
    bytes
}

pub(crate) fn encode_u32s(values: &[u32], byte_order: ByteOrder) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len() * 4];
    for (chunk, &n) in bytes.chunks_exact_mut(4).zip(values) {
        byte_order.put_u32(chunk, n);
    }
    bytes
}

pub(crate) fn encode_u64s(values: &[u64], byte_order: ByteOrder) -> Vec<u8> {
    let mut bytes = vec![0u8; values.len() * 8];
    for (chunk, &n) in bytes.chunks_exact_mut(8).zip(values) {
        byte_order.put_u64(chunk, n);
    }
    bytes
}

fn push_u32(bytes: &mut Vec<u8>, n: u32, byte_order: ByteOrder) {
    let mut chunk = [0u8; 4];
    byte_order.put_u32(&mut chunk, n);
    bytes.extend_from_slice(&chunk);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff_kind::{TiffKindBig, TiffKindStandard};

    #[test]
    fn ascii_gains_terminator() {
        let value = Value::Ascii("abc".into());
        let (ty, count, bytes) = value
            .encode::<TiffKindStandard>(Tag::Unknown(65000), ByteOrder::LittleEndian)
            .unwrap();
        assert_eq!(ty, Type::ASCII);
        assert_eq!(count, 4);
        assert_eq!(bytes, b"abc\0");
    }

    #[test]
    fn ascii_rejects_interior_nul() {
        let value = Value::Ascii("a\0b".into());
        assert!(value
            .encode::<TiffKindStandard>(Tag::Unknown(65000), ByteOrder::LittleEndian)
            .is_err());
    }

    #[test]
    fn long8_needs_bigtiff() {
        let value = Value::Long8(vec![1]);
        assert!(value
            .encode::<TiffKindStandard>(Tag::Unknown(65000), ByteOrder::LittleEndian)
            .is_err());
        assert!(value
            .encode::<TiffKindBig>(Tag::Unknown(65000), ByteOrder::LittleEndian)
            .is_ok());
    }

    #[test]
    fn ifd8_narrows_in_classic() {
        let value = Value::Ifd8(vec![0x1000]);
        let (ty, count, bytes) = value
            .encode::<TiffKindStandard>(Tag::SubIfd, ByteOrder::LittleEndian)
            .unwrap();
        assert_eq!(ty, Type::IFD);
        assert_eq!(count, 1);
        assert_eq!(bytes, vec![0x00, 0x10, 0x00, 0x00]);

        let too_wide = Value::Ifd8(vec![u64::from(u32::MAX) + 1]);
        assert!(too_wide
            .encode::<TiffKindStandard>(Tag::SubIfd, ByteOrder::LittleEndian)
            .is_err());
    }

    #[test]
    fn rational_values_are_fraction_pairs() {
        let value = Value::Rational(vec![1.5]);
        let (ty, count, bytes) = value
            .encode::<TiffKindStandard>(Tag::XResolution, ByteOrder::BigEndian)
            .unwrap();
        assert_eq!(ty, Type::RATIONAL);
        assert_eq!(count, 1);
        assert_eq!(bytes, vec![0, 0, 0, 3, 0, 0, 0, 2]);
    }
}
