//! Decoder for the DWARF `.debug_line` section.
//!
//! `.debug_line` maps machine instruction addresses back to source file,
//! line, and column. Each compilation unit contributes one table: a
//! variable-shape header (directory and file tables included) followed by a
//! bytecode program that drives a register machine, emitting one
//! [`LineRow`] per row-committing opcode. This crate parses the header and
//! runs the program for DWARF versions 2 through 5 plus the experimental
//! two-level extension (version stamp 0xf006), treating every input byte
//! as attacker-controlled: all reads are bounds-checked and malformed
//! tables fail with a typed [`LineError`].
//!
//! Well-understood producer bugs (the ARM operand table, gcc's prologue
//! length miscount) are reported through a [`DiagnosticSink`] and decoding
//! continues.
//!
//! # Usage
//!
//! ```
//! use dwarf_lines::{
//!     CollectedDiagnostics, Endian, LineSections, LineTables, UnitDefaults,
//! };
//!
//! fn dump_lines(debug_line: &[u8]) -> Result<(), dwarf_lines::LineError> {
//!     let sections = LineSections::new(debug_line, Endian::Little);
//!     let mut tables = LineTables::new(sections, UnitDefaults::default());
//!     let mut sink = CollectedDiagnostics::new();
//!     while let Some(ctx) = tables.next_table(&mut sink)? {
//!         for row in ctx.rows() {
//!             let _ = (row.address, ctx.full_path(row.file), row.line);
//!         }
//!     }
//!     Ok(())
//! }
//! # let _ = dump_lines(&[]);
//! ```

#![forbid(unsafe_code)]

pub mod constants;
pub mod context;
pub mod cursor;
pub mod diag;
pub mod error;
pub mod header;
pub mod program;

pub use context::{
    AddressFinding, AddressRanges, FileEntry, LineContext, OperandTableMatch, SubprogEntry,
    TablePass,
};
pub use cursor::{Cursor, Endian, LengthFormat};
pub use diag::{CollectedDiagnostics, Diagnostic, DiagnosticSink, LogSink};
pub use error::{LineError, Result};
pub use program::LineRow;

/// The section slices one decode works over.
///
/// Only `debug_line` is required; the string sections back the v5 `strp`
/// forms and may be absent when the producer never uses them. All slices
/// must outlive the contexts decoded from them.
#[derive(Debug, Clone, Copy)]
pub struct LineSections<'a> {
    /// The `.debug_line` section.
    pub debug_line: &'a [u8],
    /// The `.debug_str` section, backing `DW_FORM_strp`.
    pub debug_str: Option<&'a [u8]>,
    /// The `.debug_line_str` section, backing `DW_FORM_line_strp`.
    pub debug_line_str: Option<&'a [u8]>,
    /// Byte order of the object file.
    pub endian: Endian,
}

impl<'a> LineSections<'a> {
    /// Creates a bundle with only `.debug_line` present.
    #[must_use]
    pub fn new(debug_line: &'a [u8], endian: Endian) -> Self {
        Self {
            debug_line,
            debug_str: None,
            debug_line_str: None,
            endian,
        }
    }
}

/// Per-compilation-unit values that pre-v5 line tables inherit instead of
/// encoding themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitDefaults {
    /// Address size in bytes; operand width of `DW_LNE_set_address`.
    pub address_size: u8,
    /// Segment selector size in bytes.
    pub segment_selector_size: u8,
}

impl Default for UnitDefaults {
    fn default() -> Self {
        Self {
            address_size: 8,
            segment_selector_size: 0,
        }
    }
}

/// Walks the consecutive line tables of a `.debug_line` section.
///
/// Ordinary readers locate each table through its compilation unit's
/// `DW_AT_stmt_list` offset and call [`LineContext::parse`] directly; this
/// walker serves dump-style tools that process a whole section.
#[derive(Debug)]
pub struct LineTables<'a> {
    sections: LineSections<'a>,
    defaults: UnitDefaults,
    offset: u64,
}

impl<'a> LineTables<'a> {
    /// Starts walking at the beginning of the section.
    #[must_use]
    pub fn new(sections: LineSections<'a>, defaults: UnitDefaults) -> Self {
        Self {
            sections,
            defaults,
            offset: 0,
        }
    }

    /// Decodes the next table, or returns `None` at the section end.
    ///
    /// A fatal error applies to the table at the current offset; the walk
    /// cannot continue past it because the table's length cannot be
    /// trusted.
    pub fn next_table(
        &mut self,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Option<LineContext<'a>>> {
        if self.offset >= self.sections.debug_line.len() as u64 {
            return Ok(None);
        }
        let ctx = LineContext::parse(self.sections, self.offset, self.defaults, sink)?;
        self.offset = ctx.line_ptr_end();
        Ok(Some(ctx))
    }
}
