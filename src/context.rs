//! The in-memory result of decoding one line table.
//!
//! A [`LineContext`] is created empty when a table is located, populated in
//! a single forward pass (header first, then one or two program runs), and
//! never mutated afterward. It owns its tables and matrices; strings borrow
//! from the section slices, which must outlive it.

use crate::cursor::{Endian, LengthFormat};
use crate::program::LineRow;

/// One entry of the file table.
///
/// `file_name` borrows either from the line table itself (inline strings)
/// or from `.debug_str` / `.debug_line_str` (strp forms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileEntry<'a> {
    /// File name bytes, without the terminating NUL.
    pub file_name: &'a [u8],
    /// Directory table index. 1-based for v<=4 (0 means the compilation
    /// directory); 0-based for v5 and experimental tables, where 0 is a
    /// real entry.
    pub dir_index: u64,
    /// Last-modification time, or 0 when absent.
    pub time_last_mod: u64,
    /// File length in bytes, or 0 when absent.
    pub file_length: u64,
}

/// One entry of the experimental subprograms table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubprogEntry<'a> {
    /// Subprogram name bytes.
    pub subprog_name: &'a [u8],
    /// Declaring file, as a file table index.
    pub decl_file: u64,
    /// Declaration line number.
    pub decl_line: u64,
}

/// Which reference table the header's standard-opcode operand counts
/// matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandTableMatch {
    /// The DWARF reference table for this version.
    Standard,
    /// The known-buggy ARM compiler variant (opcode 9 claims no operand).
    ArmCompiler,
}

/// Which pass of a decode the interpreter is running.
///
/// Chosen once by the outer driver; it disambiguates opcode 0x0d, which
/// means set_subprogram while logicals are built and
/// set_address_from_logical while actuals are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablePass {
    /// The only table of an ordinary (non-two-level) unit.
    Single,
    /// First pass of a two-level unit.
    Logicals,
    /// Second pass of a two-level unit; may reference the logicals matrix.
    Actuals,
}

impl TablePass {
    /// Whether this pass builds the actuals matrix.
    #[must_use]
    pub fn is_actuals(self) -> bool {
        matches!(self, Self::Actuals)
    }
}

/// A fully decoded line table: header parameters, directory/file tables,
/// and the row matrices the program produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineContext<'a> {
    /// Byte offset of this table within `.debug_line`.
    pub(crate) section_offset: u64,
    /// Version stamp: 2, 3, 4, 5, or the experimental 0xf006.
    pub(crate) version: u16,
    /// Address size in bytes, from the v5 header or the owning unit.
    pub(crate) address_size: u8,
    /// Segment selector size, from the v5 header or the owning unit.
    pub(crate) segment_selector_size: u8,
    /// DWARF32 or DWARF64, fixed by the initial-length field.
    pub(crate) length_format: LengthFormat,
    /// Unit length as declared by the initial-length field.
    pub(crate) total_length: u64,
    /// Declared prologue (header) length.
    pub(crate) prologue_length: u64,
    pub(crate) minimum_instruction_length: u8,
    pub(crate) maximum_ops_per_instruction: u8,
    pub(crate) default_is_stmt: bool,
    pub(crate) line_base: i8,
    pub(crate) line_range: u8,
    pub(crate) opcode_base: u8,
    /// Operand counts for standard opcodes 1..opcode_base, borrowed from
    /// the header bytes.
    pub(crate) opcode_length_table: &'a [u8],
    pub(crate) operand_table_match: OperandTableMatch,
    /// Directory paths in table order (old-style entries or v5 entries).
    pub(crate) include_directories: Vec<&'a [u8]>,
    pub(crate) file_entries: Vec<FileEntry<'a>>,
    /// Empty unless the version is experimental.
    pub(crate) subprograms: Vec<SubprogEntry<'a>>,
    /// Offset of the logicals program, relative to the prologue start.
    /// Zero for ordinary tables.
    pub(crate) logicals_table_offset: u64,
    /// Offset of the actuals program, relative to the prologue start.
    /// Nonzero exactly when the unit is two-level.
    pub(crate) actuals_table_offset: u64,
    /// Section offset of the first byte after the prologue-length field.
    pub(crate) line_prologue_start: u64,
    /// Section offset of the first program byte.
    pub(crate) line_ptr_start: u64,
    /// Section offset one past the unit end (clamped to the section end).
    pub(crate) line_ptr_end: u64,
    /// 0 (no program bytes), 1, or 2 (two-level).
    pub(crate) table_count: u8,
    /// The program bytes, `line_ptr_start..line_ptr_end`.
    pub(crate) program_bytes: &'a [u8],
    pub(crate) endian: Endian,
    pub(crate) logicals_matrix: Vec<LineRow>,
    pub(crate) actuals_matrix: Vec<LineRow>,
}

impl<'a> LineContext<'a> {
    /// Byte offset of this table within `.debug_line`.
    #[must_use]
    pub fn section_offset(&self) -> u64 {
        self.section_offset
    }

    /// The version stamp.
    #[must_use]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Whether this is an experimental two-level table.
    #[must_use]
    pub fn is_two_level(&self) -> bool {
        self.version == crate::constants::EXPERIMENTAL_LINE_TABLES_VERSION
    }

    /// Address size used by `DW_LNE_set_address`.
    #[must_use]
    pub fn address_size(&self) -> u8 {
        self.address_size
    }

    /// Segment selector size from the header or owning unit.
    #[must_use]
    pub fn segment_selector_size(&self) -> u8 {
        self.segment_selector_size
    }

    /// Width of the initial-length field: 4 (DWARF32) or 12 (DWARF64).
    #[must_use]
    pub fn length_field_length(&self) -> usize {
        self.length_format.initial_length_size()
    }

    /// DWARF32 or DWARF64.
    #[must_use]
    pub fn length_format(&self) -> LengthFormat {
        self.length_format
    }

    /// Minimum instruction length from the header.
    #[must_use]
    pub fn minimum_instruction_length(&self) -> u8 {
        self.minimum_instruction_length
    }

    /// Maximum operations per instruction (1 before v4).
    #[must_use]
    pub fn maximum_ops_per_instruction(&self) -> u8 {
        self.maximum_ops_per_instruction
    }

    /// Initial value of the `is_stmt` register.
    #[must_use]
    pub fn default_is_stmt(&self) -> bool {
        self.default_is_stmt
    }

    /// Signed line base of the special-opcode formula.
    #[must_use]
    pub fn line_base(&self) -> i8 {
        self.line_base
    }

    /// Line range of the special-opcode formula; never zero.
    #[must_use]
    pub fn line_range(&self) -> u8 {
        self.line_range
    }

    /// First special opcode number.
    #[must_use]
    pub fn opcode_base(&self) -> u8 {
        self.opcode_base
    }

    /// Per-standard-opcode operand counts (`opcode_base - 1` entries).
    #[must_use]
    pub fn opcode_length_table(&self) -> &'a [u8] {
        self.opcode_length_table
    }

    /// Which reference table the operand counts matched.
    #[must_use]
    pub fn operand_table_match(&self) -> OperandTableMatch {
        self.operand_table_match
    }

    /// The directory table, in on-disk order.
    #[must_use]
    pub fn include_directories(&self) -> &[&'a [u8]] {
        &self.include_directories
    }

    /// The file table, in on-disk order (plus any `DW_LNE_define_file`
    /// entries appended by the program).
    #[must_use]
    pub fn file_entries(&self) -> &[FileEntry<'a>] {
        &self.file_entries
    }

    /// The experimental subprograms table; empty for ordinary versions.
    #[must_use]
    pub fn subprograms(&self) -> &[SubprogEntry<'a>] {
        &self.subprograms
    }

    /// Section offset of the first program byte.
    #[must_use]
    pub fn line_ptr_start(&self) -> u64 {
        self.line_ptr_start
    }

    /// Section offset one past the unit end.
    #[must_use]
    pub fn line_ptr_end(&self) -> u64 {
        self.line_ptr_end
    }

    /// 0, 1, or 2; 2 exactly when the actuals table offset is nonzero.
    #[must_use]
    pub fn table_count(&self) -> u8 {
        self.table_count
    }

    /// Rows of the logicals matrix (the only matrix for ordinary tables).
    #[must_use]
    pub fn logical_rows(&self) -> &[LineRow] {
        &self.logicals_matrix
    }

    /// Rows of the actuals matrix; empty unless the table is two-level.
    #[must_use]
    pub fn actual_rows(&self) -> &[LineRow] {
        &self.actuals_matrix
    }

    /// All rows in emission order: logicals, then actuals.
    pub fn rows(&self) -> impl Iterator<Item = &LineRow> {
        self.logicals_matrix.iter().chain(self.actuals_matrix.iter())
    }

    /// Looks up a file entry by the index stored in a row's `file` register.
    ///
    /// Handles both numbering conventions: v5 and experimental indices are
    /// 0-based (their file tables are decoded from the same descriptor
    /// shape), earlier versions are 1-based with 0 reserved.
    #[must_use]
    pub fn file_entry(&self, file_index: u64) -> Option<&FileEntry<'a>> {
        let idx = if self.version >= crate::constants::DW_LINE_VERSION5 {
            file_index as usize
        } else {
            if file_index == 0 {
                return None;
            }
            (file_index - 1) as usize
        };
        self.file_entries.get(idx)
    }

    /// Resolves a row's `dir_index` to a directory path.
    ///
    /// For v5 and experimental tables the index addresses the table
    /// directly and 0 is the compilation directory entry; for earlier
    /// versions 0 means the compilation directory (not stored) and 1
    /// addresses the first entry.
    #[must_use]
    pub fn directory_path(&self, dir_index: u64) -> Option<&'a [u8]> {
        let idx = if self.version >= crate::constants::DW_LINE_VERSION5 {
            dir_index as usize
        } else {
            if dir_index == 0 {
                return None;
            }
            (dir_index - 1) as usize
        };
        self.include_directories.get(idx).copied()
    }

    /// Resolves a row's `file` register to a displayable path, joining the
    /// directory entry when the file name is relative.
    ///
    /// Paths are decoded lossily; object files may carry non-UTF-8 names.
    #[must_use]
    pub fn full_path(&self, file_index: u64) -> Option<String> {
        let entry = self.file_entry(file_index)?;
        let name = String::from_utf8_lossy(entry.file_name);
        if entry.file_name.first() == Some(&b'/') {
            return Some(name.into_owned());
        }
        match self.directory_path(entry.dir_index) {
            Some(dir) if !dir.is_empty() => {
                let dir = String::from_utf8_lossy(dir);
                Some(format!("{dir}/{name}"))
            }
            _ => Some(name.into_owned()),
        }
    }

    /// Checks every row's address against the known `.text` and link-once
    /// ranges, with the suppression rule dump tools rely on: a zero-address
    /// row outside all ranges marks the start of linker-stripped output,
    /// and rows are skipped until the next one whose address was set by an
    /// explicit `DW_LNE_set_address`.
    #[must_use]
    pub fn check_address_ranges(&self, ranges: &dyn AddressRanges) -> Vec<AddressFinding> {
        let mut findings = Vec::new();
        let mut skipping = false;
        for (row_index, row) in self.rows().enumerate() {
            if skipping {
                if row.is_addr_set_marker {
                    skipping = false;
                } else {
                    continue;
                }
            }
            if ranges.in_text_range(row.address) || ranges.in_linkonce(row.address) {
                continue;
            }
            if row.address == 0 {
                skipping = true;
            } else {
                findings.push(AddressFinding {
                    row_index,
                    address: row.address,
                });
            }
        }
        findings
    }
}

/// Address-range oracle supplied by the surrounding reader, which has seen
/// the `.text` extents and the link-once section table.
pub trait AddressRanges {
    /// Whether `address` lies within a known `.text` range.
    fn in_text_range(&self, address: u64) -> bool;
    /// Whether `address` lies within a link-once section range.
    fn in_linkonce(&self, address: u64) -> bool;
}

/// A row whose address lies outside every known range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressFinding {
    /// Index of the row in emission order (logicals then actuals).
    pub row_index: usize,
    /// The out-of-range address.
    pub address: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DW_LINE_VERSION4, DW_LINE_VERSION5};

    fn empty_context(version: u16) -> LineContext<'static> {
        LineContext {
            section_offset: 0,
            version,
            address_size: 8,
            segment_selector_size: 0,
            length_format: LengthFormat::Dwarf32,
            total_length: 0,
            prologue_length: 0,
            minimum_instruction_length: 1,
            maximum_ops_per_instruction: 1,
            default_is_stmt: true,
            line_base: -5,
            line_range: 14,
            opcode_base: 13,
            opcode_length_table: &[],
            operand_table_match: OperandTableMatch::Standard,
            include_directories: Vec::new(),
            file_entries: Vec::new(),
            subprograms: Vec::new(),
            logicals_table_offset: 0,
            actuals_table_offset: 0,
            line_prologue_start: 0,
            line_ptr_start: 0,
            line_ptr_end: 0,
            table_count: 0,
            program_bytes: &[],
            endian: Endian::Little,
            logicals_matrix: Vec::new(),
            actuals_matrix: Vec::new(),
        }
    }

    fn file(name: &'static [u8], dir_index: u64) -> FileEntry<'static> {
        FileEntry {
            file_name: name,
            dir_index,
            time_last_mod: 0,
            file_length: 0,
        }
    }

    #[test]
    fn v4_file_lookup_is_one_based() {
        let mut ctx = empty_context(DW_LINE_VERSION4);
        ctx.file_entries.push(file(b"main.c", 1));
        assert!(ctx.file_entry(0).is_none());
        assert_eq!(ctx.file_entry(1).unwrap().file_name, b"main.c");
        assert!(ctx.file_entry(2).is_none());
    }

    #[test]
    fn v5_file_lookup_is_zero_based() {
        let mut ctx = empty_context(DW_LINE_VERSION5);
        ctx.file_entries.push(file(b"main.c", 0));
        assert_eq!(ctx.file_entry(0).unwrap().file_name, b"main.c");
        assert!(ctx.file_entry(1).is_none());
    }

    #[test]
    fn v4_path_resolution() {
        let mut ctx = empty_context(DW_LINE_VERSION4);
        ctx.include_directories.push(b"src");
        ctx.file_entries.push(file(b"main.c", 1));
        ctx.file_entries.push(file(b"top.c", 0));
        ctx.file_entries.push(file(b"/abs/x.c", 1));
        assert_eq!(ctx.full_path(1).unwrap(), "src/main.c");
        // dir_index 0 is the compilation directory, which this table does
        // not record.
        assert_eq!(ctx.full_path(2).unwrap(), "top.c");
        // Absolute names ignore the directory entry.
        assert_eq!(ctx.full_path(3).unwrap(), "/abs/x.c");
    }

    #[test]
    fn v5_dir_index_zero_is_a_real_entry() {
        let mut ctx = empty_context(DW_LINE_VERSION5);
        ctx.include_directories.push(b"/build/cu");
        ctx.file_entries.push(file(b"main.c", 0));
        assert_eq!(ctx.full_path(0).unwrap(), "/build/cu/main.c");
    }

    struct FixedRanges {
        text: core::ops::Range<u64>,
        linkonce: core::ops::Range<u64>,
    }

    impl AddressRanges for FixedRanges {
        fn in_text_range(&self, address: u64) -> bool {
            self.text.contains(&address)
        }
        fn in_linkonce(&self, address: u64) -> bool {
            self.linkonce.contains(&address)
        }
    }

    fn row_at(address: u64, is_addr_set_marker: bool) -> LineRow {
        LineRow {
            address,
            is_addr_set_marker,
            ..LineRow::default()
        }
    }

    #[test]
    fn range_check_reports_out_of_range_rows() {
        let mut ctx = empty_context(DW_LINE_VERSION4);
        ctx.logicals_matrix.push(row_at(0x1000, true));
        ctx.logicals_matrix.push(row_at(0x9000, false));
        let ranges = FixedRanges {
            text: 0x1000..0x2000,
            linkonce: 0x8000..0x8100,
        };
        let findings = ctx.check_address_ranges(&ranges);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].row_index, 1);
        assert_eq!(findings[0].address, 0x9000);
    }

    #[test]
    fn range_check_skips_stripped_rows_until_set_address() {
        let mut ctx = empty_context(DW_LINE_VERSION4);
        // Stripped link-once output: addr 0 starts skip mode.
        ctx.logicals_matrix.push(row_at(0, false));
        ctx.logicals_matrix.push(row_at(0x9000, false));
        // An explicit set_address ends skip mode; this row is checked.
        ctx.logicals_matrix.push(row_at(0x9500, true));
        let ranges = FixedRanges {
            text: 0x1000..0x2000,
            linkonce: 0x8000..0x8100,
        };
        let findings = ctx.check_address_ranges(&ranges);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].address, 0x9500);
    }
}
