//! DWARF line-table numerology: opcodes, content types, forms, and the
//! reference operand-count tables used to sanity-check headers.

/// DWARF 2 line table version stamp.
pub const DW_LINE_VERSION2: u16 = 2;
/// DWARF 3 line table version stamp.
pub const DW_LINE_VERSION3: u16 = 3;
/// DWARF 4 line table version stamp.
pub const DW_LINE_VERSION4: u16 = 4;
/// DWARF 5 line table version stamp.
pub const DW_LINE_VERSION5: u16 = 5;
/// Version stamp of the experimental two-level line tables.
pub const EXPERIMENTAL_LINE_TABLES_VERSION: u16 = 0xf006;

// Standard opcodes.
pub const DW_LNS_COPY: u8 = 0x01;
pub const DW_LNS_ADVANCE_PC: u8 = 0x02;
pub const DW_LNS_ADVANCE_LINE: u8 = 0x03;
pub const DW_LNS_SET_FILE: u8 = 0x04;
pub const DW_LNS_SET_COLUMN: u8 = 0x05;
pub const DW_LNS_NEGATE_STMT: u8 = 0x06;
pub const DW_LNS_SET_BASIC_BLOCK: u8 = 0x07;
pub const DW_LNS_CONST_ADD_PC: u8 = 0x08;
pub const DW_LNS_FIXED_ADVANCE_PC: u8 = 0x09;
pub const DW_LNS_SET_PROLOGUE_END: u8 = 0x0a;
pub const DW_LNS_SET_EPILOGUE_BEGIN: u8 = 0x0b;
pub const DW_LNS_SET_ISA: u8 = 0x0c;

// Experimental two-level opcodes. 0x0d is double-duty: it means
// set_subprogram while the logicals table is built and
// set_address_from_logical while the actuals table is built.
pub const DW_LNS_SET_SUBPROGRAM: u8 = 0x0d;
pub const DW_LNS_SET_ADDRESS_FROM_LOGICAL: u8 = 0x0d;
pub const DW_LNS_INLINED_CALL: u8 = 0x0e;
pub const DW_LNS_POP_CONTEXT: u8 = 0x0f;

// Extended opcodes.
pub const DW_LNE_END_SEQUENCE: u8 = 0x01;
pub const DW_LNE_SET_ADDRESS: u8 = 0x02;
pub const DW_LNE_DEFINE_FILE: u8 = 0x03;
pub const DW_LNE_SET_DISCRIMINATOR: u8 = 0x04;

// DWARF 5 directory/file entry content types.
pub const DW_LNCT_PATH: u64 = 0x01;
pub const DW_LNCT_DIRECTORY_INDEX: u64 = 0x02;
pub const DW_LNCT_TIMESTAMP: u64 = 0x03;
pub const DW_LNCT_SIZE: u64 = 0x04;
pub const DW_LNCT_MD5: u64 = 0x05;

// Content types of the experimental subprograms table.
pub const DW_LNCT_SUBPROGRAM_NAME: u64 = 0x06;
pub const DW_LNCT_DECL_FILE: u64 = 0x07;
pub const DW_LNCT_DECL_LINE: u64 = 0x08;

// Forms the header decoder understands.
pub const DW_FORM_DATA2: u64 = 0x05;
pub const DW_FORM_DATA4: u64 = 0x06;
pub const DW_FORM_DATA8: u64 = 0x07;
pub const DW_FORM_STRING: u64 = 0x08;
pub const DW_FORM_DATA1: u64 = 0x0b;
pub const DW_FORM_STRP: u64 = 0x0e;
pub const DW_FORM_UDATA: u64 = 0x0f;
pub const DW_FORM_LINE_STRP: u64 = 0x1f;

/// Highest opcode byte; `DW_LNS_const_add_pc` advances as if by the special
/// opcode with this value.
pub const MAX_LINE_OP_CODE: u8 = 255;

/// Sanity ceiling on the payload of an extended opcode. A declared length
/// whose operand part exceeds this is treated as hostile.
pub const DW_LNE_LEN_MAX: u64 = 4096;

/// Sentinel expected between the experimental file table and the
/// logicals/actuals table offsets.
pub const TWO_LEVEL_SENTINEL: [u8; 5] = [0x00, 0xff, 0xff, 0x7f, 0x7f];

/// Standard opcodes defined by DWARF 2.
pub const STANDARD_OPERAND_COUNT_DWARF2: usize = 9;
/// Standard opcodes defined by DWARF 3, 4, and 5.
pub const STANDARD_OPERAND_COUNT_DWARF3: usize = 12;
/// Standard opcodes defined by the experimental two-level extension.
pub const STANDARD_OPERAND_COUNT_TWO_LEVEL: usize = 15;

/// Reference operand counts for standard opcodes 1..=15: DWARF 2 entries,
/// then the DWARF 3 additions, then the experimental two-level additions.
pub const STANDARD_OPCODE_OPERAND_COUNTS: [u8; STANDARD_OPERAND_COUNT_TWO_LEVEL] = [
    0, 1, 1, 1, 1, 0, 0, 0, 1, // DWARF2
    0, 0, 1, // new in DWARF3
    1, 2, 0, // experimental two-level
];

/// Operand counts emitted by a buggy ARM compiler (RVCT 4.0): identical to
/// the DWARF 3 table except entry 8, which claims zero operands for
/// `DW_LNS_fixed_advance_pc` instead of one.
pub const ARM_STANDARD_OPCODE_OPERAND_COUNTS: [u8; STANDARD_OPERAND_COUNT_DWARF3] = [
    0, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 1,
];

/// Returns whether `version` is one this decoder accepts.
#[must_use]
pub fn is_supported_version(version: u16) -> bool {
    matches!(
        version,
        DW_LINE_VERSION2 | DW_LINE_VERSION3 | DW_LINE_VERSION4 | DW_LINE_VERSION5
    ) || version == EXPERIMENTAL_LINE_TABLES_VERSION
}

/// Highest standard opcode the given version defines. Opcodes above this but
/// below `opcode_base` are discarded with a diagnostic.
#[must_use]
pub fn highest_defined_standard_opcode(version: u16) -> u8 {
    match version {
        DW_LINE_VERSION2 => STANDARD_OPERAND_COUNT_DWARF2 as u8,
        EXPERIMENTAL_LINE_TABLES_VERSION => STANDARD_OPERAND_COUNT_TWO_LEVEL as u8,
        _ => STANDARD_OPERAND_COUNT_DWARF3 as u8,
    }
}
