//! Fatal decoding errors.
//!
//! Every variant aborts the table being decoded; anything survivable is a
//! [`Diagnostic`](crate::diag::Diagnostic) instead.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = LineError> = core::result::Result<T, E>;

/// A fatal error while decoding one line table.
///
/// Offsets are byte offsets within the `.debug_line` section (or within the
/// auxiliary string section for strp-form reads), pointing at the position
/// where decoding stopped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    /// A read would cross the table or section end.
    #[error("read crosses the table or section end at offset {offset:#x}")]
    TruncatedInput {
        /// Offset of the failed read.
        offset: u64,
    },

    /// The version stamp is not 2, 3, 4, 5, or the experimental 0xf006.
    #[error("unsupported line table version {version:#x}")]
    VersionStampError {
        /// The rejected version stamp.
        version: u16,
    },

    /// The unit length field is unreadable or carries a reserved value.
    #[error("bad unit length field at offset {offset:#x}")]
    DebugLineLengthBad {
        /// Offset of the length field.
        offset: u64,
    },

    /// An internal pointer exceeded the prologue or program bound.
    #[error("line table pointer out of bounds at offset {offset:#x}")]
    LineOffsetBad {
        /// Offset where the bound was exceeded.
        offset: u64,
    },

    /// `line_range` is zero; the special-opcode formula would divide by it.
    #[error("line_range is zero in the line table header")]
    LineRangeZero,

    /// The standard-opcode operand table matches neither the reference
    /// table nor the known buggy ARM variant.
    #[error("standard opcode operand counts match no known layout")]
    LineNumOperandsBad,

    /// The parser consumed more bytes than the declared prologue length.
    #[error("prologue longer than its declared length")]
    PrologueLengthBad,

    /// A v<=4 file entry names a directory index past the directory table.
    #[error("file entry directory index {dir_index} exceeds directory count {dir_count}")]
    DirIndexBad {
        /// The out-of-range index.
        dir_index: u64,
        /// Number of entries in the directory table.
        dir_count: u64,
    },

    /// A v5 header declares zero directory formats but a nonzero
    /// directory count.
    #[error("zero directory formats but {dir_count} directories declared")]
    DirectoryFormatCountVsDirectoriesMismatch {
        /// The declared directory count.
        dir_count: u64,
    },

    /// An extended opcode length of zero, or one past the sanity ceiling
    /// [`DW_LNE_LEN_MAX`](crate::constants::DW_LNE_LEN_MAX).
    #[error("extended opcode length {length} out of bounds at offset {offset:#x}")]
    LineExtOpcodeBad {
        /// The declared instruction length.
        length: u64,
        /// Offset of the length field.
        offset: u64,
    },

    /// Any other structural violation: a missing terminator, an unknown
    /// v5 content type or form, a bad experimental sentinel.
    #[error("malformed line table header at offset {offset:#x}")]
    LineNumberHeaderError {
        /// Offset of the malformed structure.
        offset: u64,
    },
}
