//! Tag and wire type definitions used by the directory writer.

macro_rules! tags {
    // Enums with a catch-all variant for values outside the named set.
    {
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident unknown($unknown_doc:literal) {
            $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[non_exhaustive]
        $vis enum $name {
            $($(#[$ident_attr])* $tag,)*
            #[doc = $unknown_doc]
            Unknown(u16),
        }

        impl $name {
            #[inline(always)]
            pub fn from_u16(val: u16) -> Option<Self> {
                match val {
                    $( $val => Some($name::$tag), )*
                    _ => None,
                }
            }

            #[inline(always)]
            pub fn from_u16_exhaustive(val: u16) -> Self {
                Self::from_u16(val).unwrap_or($name::Unknown(val))
            }

            #[inline(always)]
            pub fn to_u16(self) -> u16 {
                match self {
                    $( $name::$tag => $val, )*
                    $name::Unknown(n) => n,
                }
            }
        }
    };
    // Closed enums.
    {
        $( #[$enum_attr:meta] )*
        $vis:vis enum $name:ident {
            $($(#[$ident_attr:meta])* $tag:ident = $val:expr,)*
        }
    } => {
        $( #[$enum_attr] )*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[non_exhaustive]
        $vis enum $name {
            $($(#[$ident_attr])* $tag,)*
        }

        impl $name {
            #[inline(always)]
            pub fn from_u16(val: u16) -> Option<Self> {
                match val {
                    $( $val => Some($name::$tag), )*
                    _ => None,
                }
            }

            #[inline(always)]
            pub fn to_u16(self) -> u16 {
                match self {
                    $( $name::$tag => $val, )*
                }
            }
        }
    };
}

tags! {
    /// TIFF tags understood by the writer. Other tags travel through the
    /// custom value channel as `Unknown`.
    pub enum Tag unknown("A private or extension tag") {
        NewSubfileType = 254,
        ImageWidth = 256,
        ImageLength = 257,
        BitsPerSample = 258,
        Compression = 259,
        PhotometricInterpretation = 262,
        StripOffsets = 273,
        Orientation = 274,
        SamplesPerPixel = 277,
        RowsPerStrip = 278,
        StripByteCounts = 279,
        MinSampleValue = 280,
        MaxSampleValue = 281,
        XResolution = 282,
        YResolution = 283,
        PlanarConfiguration = 284,
        XPosition = 286,
        YPosition = 287,
        ResolutionUnit = 296,
        PageNumber = 297,
        TransferFunction = 301,
        Predictor = 317,
        ColorMap = 320,
        TileWidth = 322,
        TileLength = 323,
        TileOffsets = 324,
        TileByteCounts = 325,
        SubIfd = 330,
        InkNames = 333,
        ExtraSamples = 338,
        SampleFormat = 339,
        SMinSampleValue = 340,
        SMaxSampleValue = 341,
    }
}

impl Tag {
    /// True for the two tags holding strip or tile start offsets.
    pub fn is_strile_offsets(self) -> bool {
        matches!(self, Tag::StripOffsets | Tag::TileOffsets)
    }

    /// True for the two tags holding strip or tile byte counts.
    pub fn is_strile_byte_counts(self) -> bool {
        matches!(self, Tag::StripByteCounts | Tag::TileByteCounts)
    }
}

tags! {
    /// Wire types of directory entry values.
    pub enum Type unknown("A type not in the TIFF 6.0 or BigTIFF sets") {
        BYTE = 1,
        ASCII = 2,
        SHORT = 3,
        LONG = 4,
        RATIONAL = 5,
        SBYTE = 6,
        UNDEFINED = 7,
        SSHORT = 8,
        SLONG = 9,
        SRATIONAL = 10,
        FLOAT = 11,
        DOUBLE = 12,
        IFD = 13,
        LONG8 = 16,
        SLONG8 = 17,
        IFD8 = 18,
    }
}

impl Type {
    /// Size in bytes of a single value of this type.
    pub fn byte_len(self) -> u8 {
        match self {
            Type::BYTE | Type::SBYTE | Type::ASCII | Type::UNDEFINED => 1,
            Type::SHORT | Type::SSHORT => 2,
            Type::LONG | Type::SLONG | Type::FLOAT | Type::IFD => 4,
            Type::RATIONAL | Type::SRATIONAL => 8,
            Type::DOUBLE | Type::LONG8 | Type::SLONG8 | Type::IFD8 => 8,
            Type::Unknown(_) => 1,
        }
    }
}

tags! {
    /// Compression schemes a directory can declare.
    pub enum CompressionMethod unknown("A compression scheme not part of this set") {
        None = 1,
        Huffman = 2,
        Fax3 = 3,
        Fax4 = 4,
        LZW = 5,
        OldJpeg = 6,
        ModernJPEG = 7,
        Deflate = 8,
        PackBits = 32773,
        OldDeflate = 32946,
        Lerc = 34887,
        Lzma = 34925,
        Zstd = 50000,
        WebP = 50001,
    }
}

impl CompressionMethod {
    /// Schemes whose output is reliably much smaller than the raw data, so
    /// byte-count entries can use a narrow width even when the uncompressed
    /// strile is fairly large.
    pub fn shrinks_reliably(self) -> bool {
        matches!(
            self,
            CompressionMethod::ModernJPEG
                | CompressionMethod::LZW
                | CompressionMethod::Deflate
                | CompressionMethod::Lzma
                | CompressionMethod::Lerc
                | CompressionMethod::Zstd
                | CompressionMethod::WebP
        )
    }
}

tags! {
    pub enum PhotometricInterpretation {
        WhiteIsZero = 0,
        BlackIsZero = 1,
        RGB = 2,
        RGBPalette = 3,
        TransparencyMask = 4,
        CMYK = 5,
        YCbCr = 6,
        CIELab = 8,
    }
}

tags! {
    pub enum SampleFormat unknown("An unregistered sample format") {
        Uint = 1,
        Int = 2,
        IEEEFP = 3,
        Void = 4,
    }
}

tags! {
    pub enum ResolutionUnit {
        None = 1,
        Inch = 2,
        Centimeter = 3,
    }
}

tags! {
    pub enum PlanarConfiguration {
        Chunky = 1,
        Planar = 2,
    }
}
