//! Errors reported by the directory write engine.

use quick_error::quick_error;
use std::io;
use std::num::TryFromIntError;

quick_error! {
    /// Tiff error kinds.
    #[derive(Debug)]
    pub enum TiffError {
        /// The on-disk structures encountered while walking the file are not
        /// a valid TIFF.
        FormatError(err: TiffFormatError) {
            display("format error: {}", err)
            from()
        }
        /// The operation was used in a way the engine does not support.
        UsageError(err: UsageError) {
            display("usage error: {}", err)
            from()
        }
        /// A size or range limit of the chosen file variant was exceeded.
        LimitsExceeded(err: CapacityError) {
            display("limits exceeded: {}", err)
            from()
        }
        /// An I/O error occurred while reading or writing the file.
        IoError(err: io::Error) {
            display("{}", err)
            from()
        }
        /// A count or offset did not fit the integer width required by the
        /// file variant.
        IntSizeError {
            display("platform or format size limits exceeded")
            from(TryFromIntError)
        }
    }
}

quick_error! {
    /// The file contents are not what a conformant writer would have put
    /// there. Raised while re-reading directory structures that are being
    /// patched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum TiffFormatError {
        InvalidDirectoryCount(count: u64) {
            display("directory entry count {} exceeds 65535, likely corrupt file", count)
        }
        DirectoryNotInChain(offset: u64) {
            display("no directory in the chain links to offset {}", offset)
        }
        InvalidAscii {
            display("ASCII value contains non-ASCII or interior NUL bytes")
        }
        TagNotFound(tag: u16) {
            display("tag {} not present in the written directory", tag)
        }
    }
}

quick_error! {
    /// The caller drove the engine outside its supported lifecycle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum UsageError {
        DirectoryAlreadyWritten {
            display("directory has already been written")
        }
        DirectoryNotWritten {
            display("directory has not been written to disk yet")
        }
        NoSubIfdSlot {
            display("cannot find the sub-IFD tag in the written directory")
        }
    }
}

quick_error! {
    /// A value, offset or count cannot be represented within the chosen
    /// wire width or file variant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum CapacityError {
        MaximumFileSizeExceeded {
            display("maximum TIFF file size exceeded")
        }
        ValueOutOfRange(tag: u16, value: u64, max: u64) {
            display("value {} for tag {} exceeds the chosen wire width (max {})", value, tag, max)
        }
        WideTypeInClassicFile(name: &'static str) {
            display("{} values are not representable in classic TIFF", name)
        }
    }
}

/// Result of a directory write or rewrite operation.
pub type TiffResult<T> = Result<T, TiffError>;
