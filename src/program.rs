//! Line number program execution.
//!
//! The program is a bytecode stream driving a register machine; each
//! row-committing opcode snapshots the registers into the output matrix.
//! Two-level units run the machine twice over disjoint byte ranges, with
//! the second (actuals) pass able to reference the completed logicals
//! matrix by 1-based row number.

use tracing::{debug, trace};

use crate::constants::{
    DW_LINE_VERSION5, DW_LNE_DEFINE_FILE, DW_LNE_END_SEQUENCE, DW_LNE_LEN_MAX,
    DW_LNE_SET_ADDRESS, DW_LNE_SET_DISCRIMINATOR, DW_LNS_ADVANCE_LINE, DW_LNS_ADVANCE_PC,
    DW_LNS_CONST_ADD_PC, DW_LNS_COPY, DW_LNS_FIXED_ADVANCE_PC, DW_LNS_INLINED_CALL,
    DW_LNS_NEGATE_STMT, DW_LNS_POP_CONTEXT, DW_LNS_SET_BASIC_BLOCK, DW_LNS_SET_COLUMN,
    DW_LNS_SET_EPILOGUE_BEGIN, DW_LNS_SET_FILE, DW_LNS_SET_ISA, DW_LNS_SET_PROLOGUE_END,
    DW_LNS_SET_SUBPROGRAM, MAX_LINE_OP_CODE, highest_defined_standard_opcode,
};
use crate::context::{FileEntry, LineContext, TablePass};
use crate::cursor::Cursor;
use crate::diag::{Diagnostic, DiagnosticSink};
use crate::error::{LineError, Result};

/// One emitted row of the line matrix: a snapshot of the register file at a
/// commit opcode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LineRow {
    /// Machine instruction address.
    pub address: u64,
    /// VLIW operation index within the instruction at `address`.
    pub op_index: u64,
    /// File table index (see [`LineContext::file_entry`] for numbering).
    pub file: u64,
    /// Source line, 1-based; 0 means no source line.
    pub line: u64,
    /// Source column, 0 means left edge.
    pub column: u64,
    /// Recommended breakpoint location.
    pub is_stmt: bool,
    /// First instruction of a basic block.
    pub basic_block: bool,
    /// First byte after the end of a sequence of target machine
    /// instructions.
    pub end_sequence: bool,
    /// Where a function prologue ends.
    pub prologue_end: bool,
    /// Where a function epilogue begins.
    pub epilogue_begin: bool,
    /// Instruction-set architecture register.
    pub isa: u64,
    /// Compiler-assigned discriminator for this block.
    pub discriminator: u64,
    /// Logical row number of the inlined-call context (experimental).
    pub call_context: u64,
    /// Subprograms table index (experimental).
    pub subprogram: u64,
    /// Whether a `DW_LNE_set_address` fired since the previous commit.
    /// Range checkers use this to spot linker-stripped zero-address rows.
    pub is_addr_set_marker: bool,
    /// Whether this row belongs to the actuals matrix.
    pub is_actuals_row: bool,
}

/// The register file. Lives only inside a program run; rows are snapshots.
struct LineRegisters {
    address: u64,
    op_index: u64,
    file: u64,
    line: i64,
    column: u64,
    is_stmt: bool,
    basic_block: bool,
    end_sequence: bool,
    prologue_end: bool,
    epilogue_begin: bool,
    isa: u64,
    discriminator: u64,
    call_context: u64,
    subprogram: u64,
}

impl LineRegisters {
    fn new(default_is_stmt: bool) -> Self {
        Self {
            address: 0,
            op_index: 0,
            file: 1,
            line: 1,
            column: 0,
            is_stmt: default_is_stmt,
            basic_block: false,
            end_sequence: false,
            prologue_end: false,
            epilogue_begin: false,
            isa: 0,
            discriminator: 0,
            call_context: 0,
            subprogram: 0,
        }
    }

    /// Materializes a row from the registers, consuming the address-set
    /// latch.
    fn snapshot(&self, is_addr_set: &mut bool, pass: TablePass) -> LineRow {
        let row = LineRow {
            address: self.address,
            op_index: self.op_index,
            file: self.file,
            line: self.line.max(0) as u64,
            column: self.column,
            is_stmt: self.is_stmt,
            basic_block: self.basic_block,
            end_sequence: self.end_sequence,
            prologue_end: self.prologue_end,
            epilogue_begin: self.epilogue_begin,
            isa: self.isa,
            discriminator: self.discriminator,
            call_context: self.call_context,
            subprogram: self.subprogram,
            is_addr_set_marker: *is_addr_set,
            is_actuals_row: pass.is_actuals(),
        };
        *is_addr_set = false;
        row
    }

    /// Post-commit clearing required after a special opcode or `DW_LNS_copy`.
    fn clear_row_flags(&mut self) {
        self.basic_block = false;
        self.prologue_end = false;
        self.epilogue_begin = false;
        self.discriminator = 0;
    }
}

/// Advances `address` (and `op_index` for VLIW targets) by an operation
/// advance, the shared address branch of the special-opcode formula.
fn advance_address(
    regs: &mut LineRegisters,
    operation_advance: u64,
    minimum_instruction_length: u8,
    maximum_ops_per_instruction: u8,
) {
    let min_len = u64::from(minimum_instruction_length);
    if maximum_ops_per_instruction < 2 {
        regs.address = regs
            .address
            .wrapping_add(min_len.wrapping_mul(operation_advance));
    } else {
        let max_ops = u64::from(maximum_ops_per_instruction);
        let total = regs.op_index.wrapping_add(operation_advance);
        regs.address = regs.address.wrapping_add(min_len.wrapping_mul(total / max_ops));
        regs.op_index = total % max_ops;
    }
}

impl<'a> LineContext<'a> {
    /// Executes the line program(s) of this table, filling the matrices.
    ///
    /// Safe to call again on an unchanged context: matrices are rebuilt
    /// from scratch and come out identical.
    pub fn run_programs(&mut self, sink: &mut dyn DiagnosticSink) -> Result<()> {
        self.logicals_matrix = Vec::new();
        self.actuals_matrix = Vec::new();
        match self.table_count {
            0 => {}
            1 => {
                let cursor =
                    Cursor::new(self.program_bytes, self.line_ptr_start, self.endian);
                self.logicals_matrix =
                    run_table(self, cursor, TablePass::Single, &[], sink)?;
            }
            _ => {
                let actuals_start = self.line_prologue_start + self.actuals_table_offset;
                if actuals_start < self.line_ptr_start || actuals_start > self.line_ptr_end {
                    return Err(LineError::LineOffsetBad {
                        offset: actuals_start,
                    });
                }
                let split = (actuals_start - self.line_ptr_start) as usize;
                let (logical_bytes, actual_bytes) = self.program_bytes.split_at(split);
                let logicals_cursor =
                    Cursor::new(logical_bytes, self.line_ptr_start, self.endian);
                let logicals =
                    run_table(self, logicals_cursor, TablePass::Logicals, &[], sink)?;
                let actuals_cursor = Cursor::new(actual_bytes, actuals_start, self.endian);
                let actuals =
                    run_table(self, actuals_cursor, TablePass::Actuals, &logicals, sink)?;
                self.logicals_matrix = logicals;
                self.actuals_matrix = actuals;
            }
        }
        debug!(
            offset = self.section_offset,
            logicals = self.logicals_matrix.len(),
            actuals = self.actuals_matrix.len(),
            "line program complete"
        );
        Ok(())
    }
}

/// Runs one program over `cursor`, returning the rows it commits.
///
/// `logicals` is the completed first-pass matrix and is only non-empty for
/// the actuals pass. `ctx` is read for header parameters and written only
/// by `DW_LNE_define_file`.
fn run_table<'a>(
    ctx: &mut LineContext<'a>,
    mut cursor: Cursor<'a>,
    pass: TablePass,
    logicals: &[LineRow],
    sink: &mut dyn DiagnosticSink,
) -> Result<Vec<LineRow>> {
    let opcode_base = ctx.opcode_base;
    let line_range = u64::from(ctx.line_range);
    let line_base = i64::from(ctx.line_base);
    let min_len = ctx.minimum_instruction_length;
    let max_ops = ctx.maximum_ops_per_instruction;
    let address_size = usize::from(ctx.address_size);
    let opcode_length_table = ctx.opcode_length_table;
    let highest_defined = highest_defined_standard_opcode(ctx.version);

    let mut rows: Vec<LineRow> = Vec::new();
    let mut regs = LineRegisters::new(ctx.default_is_stmt);
    let mut is_addr_set = false;

    while !cursor.is_empty() {
        let op_offset = cursor.offset();
        let opcode = cursor.read_u8()?;

        if opcode >= opcode_base {
            // Special opcode: advance address and line, commit.
            let adjusted = u64::from(opcode - opcode_base);
            advance_address(&mut regs, adjusted / line_range, min_len, max_ops);
            regs.line = regs
                .line
                .wrapping_add(line_base + (adjusted % line_range) as i64);
            rows.push(regs.snapshot(&mut is_addr_set, pass));
            regs.clear_row_flags();
        } else if opcode == 0 {
            // Extended opcode: the ULEB length covers the sub-opcode byte
            // and all operands; seal them so a lying length cannot pull
            // program bytes into an operand.
            let length = cursor.read_uleb128()?;
            if length < 1 || length - 1 > DW_LNE_LEN_MAX {
                return Err(LineError::LineExtOpcodeBad {
                    length,
                    offset: op_offset,
                });
            }
            let mut instr = cursor.split_at(length as usize)?;
            let ext_opcode = instr.read_u8()?;
            match ext_opcode {
                DW_LNE_END_SEQUENCE => {
                    regs.end_sequence = true;
                    rows.push(regs.snapshot(&mut is_addr_set, pass));
                    regs = LineRegisters::new(ctx.default_is_stmt);
                }
                DW_LNE_SET_ADDRESS => {
                    regs.address = instr.read_uint(address_size)?;
                    regs.op_index = 0;
                    is_addr_set = true;
                    trace!(offset = op_offset, address = regs.address, "set_address");
                }
                DW_LNE_DEFINE_FILE if ctx.version < DW_LINE_VERSION5 => {
                    let file_name = instr.read_cstring()?;
                    let dir_index = instr.read_uleb128()?;
                    let time_last_mod = instr.read_uleb128()?;
                    let file_length = instr.read_uleb128()?;
                    ctx.file_entries.push(FileEntry {
                        file_name,
                        dir_index,
                        time_last_mod,
                        file_length,
                    });
                }
                DW_LNE_SET_DISCRIMINATOR => {
                    regs.discriminator = instr.read_uleb128()?;
                }
                _ => {
                    sink.report(Diagnostic::UnknownExtendedOpcode {
                        offset: op_offset,
                        opcode: ext_opcode,
                        skipped: length - 1,
                    });
                }
            }
        } else if opcode > highest_defined {
            // Inside [1, opcode_base) but not defined by this version:
            // read and discard the operands the header promised.
            let operand_count = opcode_length_table
                .get(usize::from(opcode) - 1)
                .copied()
                .unwrap_or(0);
            let mut operands = Vec::with_capacity(usize::from(operand_count));
            for _ in 0..operand_count {
                operands.push(cursor.read_uleb128()?);
            }
            sink.report(Diagnostic::UnknownStandardOpcode {
                offset: op_offset,
                opcode,
                operands,
            });
        } else {
            match opcode {
                DW_LNS_COPY => {
                    rows.push(regs.snapshot(&mut is_addr_set, pass));
                    regs.clear_row_flags();
                }
                DW_LNS_ADVANCE_PC => {
                    let advance = cursor.read_uleb128()?;
                    advance_address(&mut regs, advance, min_len, max_ops);
                }
                DW_LNS_ADVANCE_LINE => {
                    let delta = cursor.read_sleb128()?;
                    regs.line = regs.line.wrapping_add(delta);
                }
                DW_LNS_SET_FILE => {
                    regs.file = cursor.read_uleb128()?;
                }
                DW_LNS_SET_COLUMN => {
                    regs.column = cursor.read_uleb128()?;
                }
                DW_LNS_NEGATE_STMT => {
                    regs.is_stmt = !regs.is_stmt;
                }
                DW_LNS_SET_BASIC_BLOCK => {
                    regs.basic_block = true;
                }
                DW_LNS_CONST_ADD_PC => {
                    let adjusted = u64::from(MAX_LINE_OP_CODE - opcode_base);
                    advance_address(&mut regs, adjusted / line_range, min_len, max_ops);
                }
                DW_LNS_FIXED_ADVANCE_PC => {
                    let advance = cursor.read_u16()?;
                    regs.address = regs.address.wrapping_add(u64::from(advance));
                    regs.op_index = 0;
                }
                DW_LNS_SET_PROLOGUE_END => {
                    regs.prologue_end = true;
                }
                DW_LNS_SET_EPILOGUE_BEGIN => {
                    regs.epilogue_begin = true;
                }
                DW_LNS_SET_ISA => {
                    regs.isa = cursor.read_uleb128()?;
                }
                // Double-duty opcode 0x0d: set_address_from_logical while
                // actuals are built, set_subprogram while logicals are.
                DW_LNS_SET_SUBPROGRAM => {
                    if pass.is_actuals() {
                        let delta = cursor.read_sleb128()?;
                        regs.line = regs.line.wrapping_add(delta);
                        let row_num = regs.line;
                        if row_num >= 1 && ((row_num - 1) as u64) < logicals.len() as u64 {
                            regs.address = logicals[(row_num - 1) as usize].address;
                            regs.op_index = 0;
                        } else {
                            sink.report(Diagnostic::LogicalRowOutOfRange {
                                offset: op_offset,
                                line: row_num,
                            });
                        }
                    } else {
                        regs.call_context = 0;
                        regs.subprogram = cursor.read_uleb128()?;
                    }
                }
                DW_LNS_INLINED_CALL => {
                    let delta = cursor.read_sleb128()?;
                    let call_context = (rows.len() as i64).wrapping_add(delta);
                    regs.call_context = if call_context < 0 {
                        0
                    } else {
                        call_context as u64
                    };
                    regs.subprogram = cursor.read_uleb128()?;
                }
                DW_LNS_POP_CONTEXT => {
                    let logical_num = regs.call_context;
                    if logical_num >= 1 && logical_num <= rows.len() as u64 {
                        let row = rows[(logical_num - 1) as usize];
                        regs.file = row.file;
                        regs.line = row.line as i64;
                        regs.column = row.column;
                        regs.discriminator = row.discriminator;
                        regs.is_stmt = row.is_stmt;
                        regs.call_context = row.call_context;
                        regs.subprogram = row.subprogram;
                    }
                }
                // opcode is within 1..=highest_defined, all matched above.
                _ => {}
            }
        }
    }
    Ok(rows)
}
