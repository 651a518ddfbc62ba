//! Line-table header (prologue) parsing.
//!
//! The prologue is the variable-shape preamble describing the table's
//! parameters, directory table, and file table. Its layout changed at v4
//! (maximum_ops_per_instruction), at v5 (descriptor-driven directory and
//! file entries, in-header address sizes), and again in the experimental
//! two-level extension (sentinel, table offsets, subprograms table).
//! Every byte here is attacker-controlled; all reads go through the sealed
//! unit cursor.

use tracing::debug;

use crate::constants::{
    ARM_STANDARD_OPCODE_OPERAND_COUNTS, DW_FORM_DATA1, DW_FORM_DATA2, DW_FORM_DATA4,
    DW_FORM_DATA8, DW_FORM_LINE_STRP, DW_FORM_STRING, DW_FORM_STRP, DW_FORM_UDATA,
    DW_LINE_VERSION2, DW_LINE_VERSION4, DW_LINE_VERSION5, DW_LNCT_DECL_FILE, DW_LNCT_DECL_LINE,
    DW_LNCT_DIRECTORY_INDEX, DW_LNCT_PATH, DW_LNCT_SIZE, DW_LNCT_SUBPROGRAM_NAME,
    DW_LNCT_TIMESTAMP, EXPERIMENTAL_LINE_TABLES_VERSION, STANDARD_OPCODE_OPERAND_COUNTS,
    STANDARD_OPERAND_COUNT_DWARF3, TWO_LEVEL_SENTINEL, is_supported_version,
};
use crate::context::{FileEntry, LineContext, OperandTableMatch, SubprogEntry};
use crate::cursor::{Cursor, LengthFormat};
use crate::diag::{Diagnostic, DiagnosticSink};
use crate::error::{LineError, Result};
use crate::{LineSections, UnitDefaults};

impl<'a> LineContext<'a> {
    /// Parses the line-table header at `offset` within `.debug_line`.
    ///
    /// `defaults` supplies the owning compilation unit's address and
    /// segment-selector sizes, which pre-v5 headers inherit. The returned
    /// context has empty matrices; run
    /// [`run_programs`](LineContext::run_programs) (or use
    /// [`parse`](LineContext::parse)) to execute the program.
    pub fn parse_header(
        sections: LineSections<'a>,
        offset: u64,
        defaults: UnitDefaults,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Self> {
        let section = sections.debug_line;
        if offset > section.len() as u64 {
            return Err(LineError::DebugLineLengthBad { offset });
        }
        let mut cursor = Cursor::new(&section[offset as usize..], offset, sections.endian);

        let (total_length, length_format) = cursor.take_initial_length()?;
        // Seal the unit. A declared length past the section end is clamped;
        // whatever read first crosses the real end reports the truncation.
        let unit_len = usize::try_from(total_length)
            .unwrap_or(usize::MAX)
            .min(cursor.remaining());
        let mut unit = cursor.split_at(unit_len)?;
        let line_ptr_end = unit.offset() + unit_len as u64;

        let version = unit.read_u16()?;
        if !is_supported_version(version) {
            return Err(LineError::VersionStampError { version });
        }
        let two_level = version == EXPERIMENTAL_LINE_TABLES_VERSION;

        let (address_size, segment_selector_size) =
            if version == DW_LINE_VERSION5 || two_level {
                (unit.read_u8()?, unit.read_u8()?)
            } else {
                (defaults.address_size, defaults.segment_selector_size)
            };

        let prologue_length = unit.read_uint(length_format.offset_size())?;
        let line_prologue_start = unit.offset();

        let minimum_instruction_length = unit.read_u8()?;
        let maximum_ops_per_instruction =
            if version == DW_LINE_VERSION4 || version == DW_LINE_VERSION5 || two_level {
                unit.read_u8()?
            } else {
                1
            };
        let default_is_stmt = unit.read_u8()? != 0;
        let line_base = unit.read_u8()? as i8;
        let line_range = unit.read_u8()?;
        if line_range == 0 {
            return Err(LineError::LineRangeZero);
        }
        let opcode_base = unit.read_u8()?;
        if opcode_base == 0 {
            return Err(LineError::LineNumberHeaderError {
                offset: unit.offset(),
            });
        }
        let opcode_length_table = unit.take(usize::from(opcode_base) - 1)?;
        let operand_table_match =
            check_operand_table(version, opcode_length_table, offset, sink)?;

        let mut include_directories: Vec<&'a [u8]> = Vec::new();
        let mut file_entries: Vec<FileEntry<'a>> = Vec::new();

        // Old-style tables: present below v5, and kept as empty slots in
        // the experimental layout.
        if version < DW_LINE_VERSION5 {
            parse_old_directories(&mut unit, &mut include_directories)?;
        } else if two_level {
            // Empty old-style directory list: one byte, skipped without
            // looking at it.
            unit.skip(1)?;
        }
        if version < DW_LINE_VERSION5 {
            parse_old_files(&mut unit, &include_directories, &mut file_entries)?;
        } else if two_level {
            // The old-style file slot, by contrast, must really be empty.
            if unit.read_u8()? != 0 {
                return Err(LineError::LineNumberHeaderError {
                    offset: unit.offset() - 1,
                });
            }
        }

        let mut logicals_table_offset = 0u64;
        let mut actuals_table_offset = 0u64;
        if two_level {
            let sentinel_offset = unit.offset();
            if unit.take(TWO_LEVEL_SENTINEL.len())? != TWO_LEVEL_SENTINEL {
                return Err(LineError::LineNumberHeaderError {
                    offset: sentinel_offset,
                });
            }
            logicals_table_offset = unit.read_uint(length_format.offset_size())?;
            actuals_table_offset = unit.read_uint(length_format.offset_size())?;
        }

        if version == DW_LINE_VERSION5 || two_level {
            parse_v5_directories(
                &mut unit,
                &sections,
                length_format,
                &mut include_directories,
            )?;
            parse_v5_files(&mut unit, &sections, length_format, &mut file_entries)?;
        }

        let mut subprograms: Vec<SubprogEntry<'a>> = Vec::new();
        if two_level {
            parse_subprograms(&mut unit, &sections, length_format, &mut subprograms)?;
        }

        // Reconcile the cursor against the declared prologue bound. Short
        // of the bound means a producer miscounted (gcc is known to be off
        // by exactly 12): trust the cursor and treat the gap as program
        // bytes. Past the bound is fatal.
        let expected_program_start = line_prologue_start
            + if two_level {
                logicals_table_offset
            } else {
                prologue_length
            };
        let pos = unit.offset();
        if pos > expected_program_start {
            return Err(LineError::PrologueLengthBad);
        }
        if pos < expected_program_start {
            sink.report(Diagnostic::BogusBytesBeforeProgram {
                offset: pos,
                gap: expected_program_start - pos,
            });
        }
        let line_ptr_start = pos;
        let program_bytes = unit.take(unit.remaining())?;

        let table_count = if actuals_table_offset != 0 {
            2
        } else if line_ptr_end > line_ptr_start {
            1
        } else {
            0
        };

        debug!(
            offset,
            version,
            table_count,
            directories = include_directories.len(),
            files = file_entries.len(),
            "parsed line table header"
        );

        Ok(LineContext {
            section_offset: offset,
            version,
            address_size,
            segment_selector_size,
            length_format,
            total_length,
            prologue_length,
            minimum_instruction_length,
            maximum_ops_per_instruction,
            default_is_stmt,
            line_base,
            line_range,
            opcode_base,
            opcode_length_table,
            operand_table_match,
            include_directories,
            file_entries,
            subprograms,
            logicals_table_offset,
            actuals_table_offset,
            line_prologue_start,
            line_ptr_start,
            line_ptr_end,
            table_count,
            program_bytes,
            endian: sections.endian,
            logicals_matrix: Vec::new(),
            actuals_matrix: Vec::new(),
        })
    }

    /// Parses the header at `offset` and runs the line program(s),
    /// returning the fully populated context.
    pub fn parse(
        sections: LineSections<'a>,
        offset: u64,
        defaults: UnitDefaults,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<Self> {
        let mut ctx = Self::parse_header(sections, offset, defaults, sink)?;
        ctx.run_programs(sink)?;
        Ok(ctx)
    }
}

/// Cross-checks the on-disk operand counts against the reference table,
/// falling back to the known-buggy ARM compiler variant.
fn check_operand_table(
    version: u16,
    table: &[u8],
    table_offset: u64,
    sink: &mut dyn DiagnosticSink,
) -> Result<OperandTableMatch> {
    let std_op_count = table.len();
    let mut check_count = std_op_count;
    if std_op_count > STANDARD_OPCODE_OPERAND_COUNTS.len() {
        sink.report(Diagnostic::TooManyStandardOperands {
            offset: table_offset,
            count: std_op_count,
        });
        check_count = STANDARD_OPCODE_OPERAND_COUNTS.len();
    }

    match first_mismatch(&STANDARD_OPCODE_OPERAND_COUNTS, &table[..check_count]) {
        None => {
            if version == DW_LINE_VERSION2 && std_op_count == STANDARD_OPERAND_COUNT_DWARF3 {
                sink.report(Diagnostic::Dwarf3OperandsInV2Header {
                    offset: table_offset,
                    count: std_op_count,
                });
            }
            Ok(OperandTableMatch::Standard)
        }
        Some((entry, expected, actual)) => {
            sink.report(Diagnostic::StandardOperandsMismatch {
                offset: table_offset,
                checked: check_count,
                entry,
                expected,
                actual,
            });
            let arm_check = check_count.min(ARM_STANDARD_OPCODE_OPERAND_COUNTS.len());
            if first_mismatch(&ARM_STANDARD_OPCODE_OPERAND_COUNTS, &table[..arm_check])
                .is_none()
            {
                sink.report(Diagnostic::ArmOperandTableInUse {
                    offset: table_offset,
                });
                Ok(OperandTableMatch::ArmCompiler)
            } else {
                Err(LineError::LineNumOperandsBad)
            }
        }
    }
}

/// Returns the first index where `header` disagrees with `reference`, with
/// the two differing values.
fn first_mismatch(reference: &[u8], header: &[u8]) -> Option<(usize, u8, u8)> {
    header.iter().enumerate().find_map(|(i, &actual)| {
        let expected = reference.get(i).copied().unwrap_or(0);
        (expected != actual).then_some((i, expected, actual))
    })
}

/// Old-style directory table: NUL-terminated strings, ended by an empty
/// string.
fn parse_old_directories<'a>(
    unit: &mut Cursor<'a>,
    directories: &mut Vec<&'a [u8]>,
) -> Result<()> {
    while unit.peek_u8()? != 0 {
        directories.push(unit.read_cstring()?);
    }
    unit.skip(1)
}

/// Old-style file table: (name, dir_index, mtime, length) tuples, ended by
/// an empty name.
fn parse_old_files<'a>(
    unit: &mut Cursor<'a>,
    directories: &[&'a [u8]],
    files: &mut Vec<FileEntry<'a>>,
) -> Result<()> {
    while unit.peek_u8()? != 0 {
        let file_name = unit.read_cstring()?;
        let dir_index = unit.read_uleb128()?;
        if dir_index > directories.len() as u64 {
            return Err(LineError::DirIndexBad {
                dir_index,
                dir_count: directories.len() as u64,
            });
        }
        let time_last_mod = unit.read_uleb128()?;
        let file_length = unit.read_uleb128()?;
        files.push(FileEntry {
            file_name,
            dir_index,
            time_last_mod,
            file_length,
        });
    }
    unit.skip(1)
}

/// Reads a v5 format description: a 1-byte count of `(content type, form)`
/// ULEB128 pairs.
fn read_format_pairs(unit: &mut Cursor<'_>) -> Result<Vec<(u64, u64)>> {
    let count = usize::from(unit.read_u8()?);
    let mut pairs = Vec::with_capacity(count);
    for _ in 0..count {
        let content_type = unit.read_uleb128()?;
        let form = unit.read_uleb128()?;
        pairs.push((content_type, form));
    }
    Ok(pairs)
}

fn parse_v5_directories<'a>(
    unit: &mut Cursor<'a>,
    sections: &LineSections<'a>,
    length_format: LengthFormat,
    directories: &mut Vec<&'a [u8]>,
) -> Result<()> {
    let formats = read_format_pairs(unit)?;
    let entry_count = unit.read_uleb128()?;
    if formats.is_empty() && entry_count > 0 {
        return Err(LineError::DirectoryFormatCountVsDirectoriesMismatch {
            dir_count: entry_count,
        });
    }
    for _ in 0..entry_count {
        let mut path: &'a [u8] = &[];
        for &(content_type, form) in &formats {
            match content_type {
                DW_LNCT_PATH => {
                    path = decode_string_form(unit, sections, length_format, form)?;
                }
                _ => {
                    return Err(LineError::LineNumberHeaderError {
                        offset: unit.offset(),
                    });
                }
            }
        }
        directories.push(path);
    }
    Ok(())
}

fn parse_v5_files<'a>(
    unit: &mut Cursor<'a>,
    sections: &LineSections<'a>,
    length_format: LengthFormat,
    files: &mut Vec<FileEntry<'a>>,
) -> Result<()> {
    let formats = read_format_pairs(unit)?;
    let entry_count = unit.read_uleb128()?;
    for _ in 0..entry_count {
        let mut entry = FileEntry {
            file_name: &[],
            dir_index: 0,
            time_last_mod: 0,
            file_length: 0,
        };
        for &(content_type, form) in &formats {
            match content_type {
                DW_LNCT_PATH => {
                    entry.file_name = decode_string_form(unit, sections, length_format, form)?;
                }
                DW_LNCT_DIRECTORY_INDEX => {
                    entry.dir_index = decode_udata_form(unit, form)?;
                }
                DW_LNCT_TIMESTAMP => {
                    entry.time_last_mod = decode_udata_form(unit, form)?;
                }
                DW_LNCT_SIZE => {
                    entry.file_length = decode_udata_form(unit, form)?;
                }
                // DW_LNCT_MD5 is not accepted yet; like any unknown content
                // type it poisons the whole entry layout.
                _ => {
                    return Err(LineError::LineNumberHeaderError {
                        offset: unit.offset(),
                    });
                }
            }
        }
        files.push(entry);
    }
    Ok(())
}

/// Experimental subprograms table, in the same format-count/(type, form)
/// shape as the v5 file table.
fn parse_subprograms<'a>(
    unit: &mut Cursor<'a>,
    sections: &LineSections<'a>,
    length_format: LengthFormat,
    subprograms: &mut Vec<SubprogEntry<'a>>,
) -> Result<()> {
    let formats = read_format_pairs(unit)?;
    let entry_count = unit.read_uleb128()?;
    for _ in 0..entry_count {
        let mut entry = SubprogEntry {
            subprog_name: &[],
            decl_file: 0,
            decl_line: 0,
        };
        for &(content_type, form) in &formats {
            match content_type {
                DW_LNCT_SUBPROGRAM_NAME => {
                    entry.subprog_name =
                        decode_string_form(unit, sections, length_format, form)?;
                }
                DW_LNCT_DECL_FILE => {
                    entry.decl_file = decode_udata_form(unit, form)?;
                }
                DW_LNCT_DECL_LINE => {
                    entry.decl_line = decode_udata_form(unit, form)?;
                }
                _ => {
                    return Err(LineError::LineNumberHeaderError {
                        offset: unit.offset(),
                    });
                }
            }
        }
        subprograms.push(entry);
    }
    Ok(())
}

/// Decodes a string-class form: inline, or an offset into `.debug_str` /
/// `.debug_line_str`.
fn decode_string_form<'a>(
    unit: &mut Cursor<'a>,
    sections: &LineSections<'a>,
    length_format: LengthFormat,
    form: u64,
) -> Result<&'a [u8]> {
    match form {
        DW_FORM_STRING => unit.read_cstring(),
        DW_FORM_STRP => resolve_strp(sections.debug_str, unit, length_format),
        DW_FORM_LINE_STRP => resolve_strp(sections.debug_line_str, unit, length_format),
        _ => Err(LineError::LineNumberHeaderError {
            offset: unit.offset(),
        }),
    }
}

/// Follows an offset-sized reference into an auxiliary string section.
fn resolve_strp<'a>(
    string_section: Option<&'a [u8]>,
    unit: &mut Cursor<'a>,
    length_format: LengthFormat,
) -> Result<&'a [u8]> {
    let field_offset = unit.offset();
    let str_offset = unit.read_uint(length_format.offset_size())?;
    let Some(section) = string_section else {
        return Err(LineError::LineNumberHeaderError {
            offset: field_offset,
        });
    };
    let skip = usize::try_from(str_offset).unwrap_or(usize::MAX);
    if skip > section.len() {
        return Err(LineError::TruncatedInput { offset: str_offset });
    }
    let mut strings = Cursor::new(section, 0, unit.endian());
    strings.skip(skip)?;
    strings.read_cstring()
}

/// Decodes an unsigned-integer-class form.
fn decode_udata_form(unit: &mut Cursor<'_>, form: u64) -> Result<u64> {
    match form {
        DW_FORM_UDATA => unit.read_uleb128(),
        DW_FORM_DATA1 => unit.read_u8().map(u64::from),
        DW_FORM_DATA2 => unit.read_u16().map(u64::from),
        DW_FORM_DATA4 => unit.read_u32().map(u64::from),
        DW_FORM_DATA8 => unit.read_u64(),
        _ => Err(LineError::LineNumberHeaderError {
            offset: unit.offset(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Endian;
    use crate::diag::CollectedDiagnostics;

    /// Builds a DWARF v4 unit with one directory, one file, and the given
    /// program bytes; lengths are computed, not declared wrong.
    fn make_v4_unit(program: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0u8; 4]); // unit_length, fixed below
        buf.extend_from_slice(&4u16.to_le_bytes());
        let header_length_pos = buf.len();
        buf.extend_from_slice(&[0u8; 4]); // header_length, fixed below
        let prologue_start = buf.len();
        buf.push(1); // minimum_instruction_length
        buf.push(1); // maximum_operations_per_instruction
        buf.push(1); // default_is_stmt
        buf.push((-5i8) as u8); // line_base
        buf.push(14); // line_range
        buf.push(13); // opcode_base
        buf.extend_from_slice(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
        buf.extend_from_slice(b"src\0");
        buf.push(0); // end of directories
        buf.extend_from_slice(b"main.c\0");
        buf.push(1); // dir_index
        buf.push(0); // mtime
        buf.push(0); // length
        buf.push(0); // end of files
        let header_length = (buf.len() - prologue_start) as u32;
        buf[header_length_pos..header_length_pos + 4]
            .copy_from_slice(&header_length.to_le_bytes());
        buf.extend_from_slice(program);
        let unit_length = (buf.len() - 4) as u32;
        buf[0..4].copy_from_slice(&unit_length.to_le_bytes());
        buf
    }

    fn sections(data: &[u8]) -> LineSections<'_> {
        LineSections::new(data, Endian::Little)
    }

    #[test]
    fn v4_header_fields() {
        let buf = make_v4_unit(&[0x00, 0x01, 0x01]);
        let mut sink = CollectedDiagnostics::new();
        let ctx = LineContext::parse_header(
            sections(&buf),
            0,
            UnitDefaults::default(),
            &mut sink,
        )
        .unwrap();
        assert_eq!(ctx.version(), 4);
        assert_eq!(ctx.minimum_instruction_length(), 1);
        assert_eq!(ctx.line_base(), -5);
        assert_eq!(ctx.line_range(), 14);
        assert_eq!(ctx.opcode_base(), 13);
        assert_eq!(ctx.include_directories(), &[b"src".as_slice()]);
        assert_eq!(ctx.file_entries().len(), 1);
        assert_eq!(ctx.file_entries()[0].file_name, b"main.c");
        assert_eq!(ctx.table_count(), 1);
        assert_eq!(ctx.operand_table_match(), OperandTableMatch::Standard);
        assert!(sink.is_empty());
    }

    #[test]
    fn rejects_bad_version() {
        let mut buf = make_v4_unit(&[]);
        buf[4..6].copy_from_slice(&6u16.to_le_bytes());
        let mut sink = CollectedDiagnostics::new();
        let err = LineContext::parse_header(
            sections(&buf),
            0,
            UnitDefaults::default(),
            &mut sink,
        )
        .unwrap_err();
        assert_eq!(err, LineError::VersionStampError { version: 6 });
    }

    #[test]
    fn rejects_dir_index_past_table() {
        let mut buf = make_v4_unit(&[]);
        // The single file claims dir_index 1 with one directory present;
        // bump it to 2.
        let pos = buf
            .windows(7)
            .position(|w| w == &b"main.c\0"[..])
            .unwrap()
            + 7;
        buf[pos] = 2;
        let mut sink = CollectedDiagnostics::new();
        let err = LineContext::parse_header(
            sections(&buf),
            0,
            UnitDefaults::default(),
            &mut sink,
        )
        .unwrap_err();
        assert_eq!(
            err,
            LineError::DirIndexBad {
                dir_index: 2,
                dir_count: 1
            }
        );
    }

    #[test]
    fn prologue_overrun_is_fatal() {
        let mut buf = make_v4_unit(&[0x00, 0x01, 0x01]);
        // Shrink the declared header length below what the tables consume.
        let declared = u32::from_le_bytes([buf[6], buf[7], buf[8], buf[9]]);
        buf[6..10].copy_from_slice(&(declared - 2).to_le_bytes());
        let mut sink = CollectedDiagnostics::new();
        let err = LineContext::parse_header(
            sections(&buf),
            0,
            UnitDefaults::default(),
            &mut sink,
        )
        .unwrap_err();
        assert_eq!(err, LineError::PrologueLengthBad);
    }

    /// Builds a DWARF v5 unit whose file table exercises strp forms.
    fn make_v5_unit(program: &[u8]) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let debug_str = b"main.c\0".to_vec();
        let debug_line_str = b"/build/cu\0src\0".to_vec();
        let mut buf = Vec::new();
        buf.extend_from_slice(&[0u8; 4]);
        buf.extend_from_slice(&5u16.to_le_bytes());
        buf.push(8); // address_size
        buf.push(0); // segment_selector_size
        let header_length_pos = buf.len();
        buf.extend_from_slice(&[0u8; 4]);
        let prologue_start = buf.len();
        buf.push(1); // minimum_instruction_length
        buf.push(1); // maximum_operations_per_instruction
        buf.push(1); // default_is_stmt
        buf.push((-5i8) as u8);
        buf.push(14);
        buf.push(13);
        buf.extend_from_slice(&[0, 1, 1, 1, 1, 0, 0, 0, 1, 0, 0, 1]);
        // Directory table: 1 format (path, line_strp), 2 entries.
        buf.push(1);
        buf.push(DW_LNCT_PATH as u8);
        buf.push(DW_FORM_LINE_STRP as u8);
        buf.push(2); // entry count
        buf.extend_from_slice(&0u32.to_le_bytes()); // "/build/cu"
        buf.extend_from_slice(&10u32.to_le_bytes()); // "src"
        // File table: 2 formats (path strp, dir_index udata), 1 entry.
        buf.push(2);
        buf.push(DW_LNCT_PATH as u8);
        buf.push(DW_FORM_STRP as u8);
        buf.push(DW_LNCT_DIRECTORY_INDEX as u8);
        buf.push(DW_FORM_UDATA as u8);
        buf.push(1); // entry count
        buf.extend_from_slice(&0u32.to_le_bytes()); // "main.c"
        buf.push(1); // dir_index
        let header_length = (buf.len() - prologue_start) as u32;
        buf[header_length_pos..header_length_pos + 4]
            .copy_from_slice(&header_length.to_le_bytes());
        buf.extend_from_slice(program);
        let unit_length = (buf.len() - 4) as u32;
        buf[0..4].copy_from_slice(&unit_length.to_le_bytes());
        (buf, debug_str, debug_line_str)
    }

    #[test]
    fn v5_header_with_strp_forms() {
        let (buf, debug_str, debug_line_str) = make_v5_unit(&[0x00, 0x01, 0x01]);
        let mut secs = sections(&buf);
        secs.debug_str = Some(&debug_str);
        secs.debug_line_str = Some(&debug_line_str);
        let mut sink = CollectedDiagnostics::new();
        let ctx =
            LineContext::parse_header(secs, 0, UnitDefaults::default(), &mut sink).unwrap();
        assert_eq!(ctx.version(), 5);
        assert_eq!(ctx.address_size(), 8);
        assert_eq!(
            ctx.include_directories(),
            &[b"/build/cu".as_slice(), b"src".as_slice()]
        );
        assert_eq!(ctx.file_entries().len(), 1);
        assert_eq!(ctx.file_entries()[0].file_name, b"main.c");
        assert_eq!(ctx.file_entries()[0].dir_index, 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn v5_unknown_directory_content_type_is_rejected() {
        let (mut buf, debug_str, debug_line_str) = make_v5_unit(&[]);
        // Patch the directory format's content type to timestamp. The
        // format block sits right after the fixed fields and the 12-entry
        // opcode table: 4 + 2 + 1 + 1 + 4 + 6 + 12 = 30 is the format
        // count, 31 the content type.
        assert_eq!(buf[31], DW_LNCT_PATH as u8);
        buf[31] = DW_LNCT_TIMESTAMP as u8;
        let mut secs = sections(&buf);
        secs.debug_str = Some(&debug_str);
        secs.debug_line_str = Some(&debug_line_str);
        let mut sink = CollectedDiagnostics::new();
        let err = LineContext::parse_header(secs, 0, UnitDefaults::default(), &mut sink)
            .unwrap_err();
        assert!(matches!(err, LineError::LineNumberHeaderError { .. }));
    }

    #[test]
    fn missing_string_section_is_a_header_error() {
        let (buf, debug_str, _) = make_v5_unit(&[]);
        let mut secs = sections(&buf);
        secs.debug_str = Some(&debug_str);
        // No debug_line_str: the directory entries cannot resolve.
        let mut sink = CollectedDiagnostics::new();
        let err = LineContext::parse_header(secs, 0, UnitDefaults::default(), &mut sink)
            .unwrap_err();
        assert!(matches!(err, LineError::LineNumberHeaderError { .. }));
    }
}
