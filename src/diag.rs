//! Non-fatal findings surfaced while a table decodes.
//!
//! Real-world producers emit line tables that are wrong in well-understood
//! ways (the ARM operand table, gcc's prologue length miscount). Those are
//! worth reporting but not worth refusing the table over, so the decoder
//! hands each one to a [`DiagnosticSink`] and keeps going. Survey tools
//! aggregate them; strict readers may treat any finding as an error.

use core::fmt;

use tracing::warn;

/// One non-fatal finding. `offset` is always the byte offset within
/// `.debug_line` where the finding was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The header declares more standard opcodes than any known table
    /// defines; only the known prefix was checked.
    TooManyStandardOperands {
        offset: u64,
        /// Declared count (`opcode_base - 1`).
        count: usize,
    },
    /// The on-disk operand-count table disagrees with the reference table.
    StandardOperandsMismatch {
        offset: u64,
        /// How many entries were compared.
        checked: usize,
        /// Index of the first differing entry.
        entry: usize,
        /// Reference table value at that index.
        expected: u8,
        /// On-disk value at that index.
        actual: u8,
    },
    /// The operand table matches the known buggy ARM compiler variant.
    ArmOperandTableInUse { offset: u64 },
    /// A DWARF 2 header carries the DWARF 3 sized operand table.
    Dwarf3OperandsInV2Header { offset: u64, count: usize },
    /// The prologue ended short of its declared length; the gap bytes are
    /// treated as part of the program (gcc miscounts by exactly 12 for
    /// some configurations).
    BogusBytesBeforeProgram {
        offset: u64,
        /// Width of the gap in bytes.
        gap: u64,
    },
    /// A standard opcode inside `[1, opcode_base)` that this version does
    /// not define; its operands were read and discarded.
    UnknownStandardOpcode {
        offset: u64,
        opcode: u8,
        /// The discarded operand values.
        operands: Vec<u64>,
    },
    /// An extended opcode this decoder does not know; its payload was
    /// skipped.
    UnknownExtendedOpcode {
        offset: u64,
        opcode: u8,
        /// Payload bytes skipped.
        skipped: u64,
    },
    /// `DW_LNS_set_address_from_logical` named a logical row outside the
    /// logicals matrix; the address register was left unchanged.
    LogicalRowOutOfRange {
        offset: u64,
        /// The out-of-range logical row number (1-based).
        line: i64,
    },
}

impl Diagnostic {
    /// Byte offset within `.debug_line` where the finding was made.
    #[must_use]
    pub fn offset(&self) -> u64 {
        match *self {
            Self::TooManyStandardOperands { offset, .. }
            | Self::StandardOperandsMismatch { offset, .. }
            | Self::ArmOperandTableInUse { offset }
            | Self::Dwarf3OperandsInV2Header { offset, .. }
            | Self::BogusBytesBeforeProgram { offset, .. }
            | Self::UnknownStandardOpcode { offset, .. }
            | Self::UnknownExtendedOpcode { offset, .. }
            | Self::LogicalRowOutOfRange { offset, .. } => offset,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyStandardOperands { count, .. } => {
                write!(f, "too many standard operands in line table header: {count}")
            }
            Self::StandardOperandsMismatch {
                checked,
                entry,
                expected,
                actual,
                ..
            } => write!(
                f,
                "standard operands did not match, checked {checked}: \
                 entry {entry} is {actual}, reference says {expected}"
            ),
            Self::ArmOperandTableInUse { .. } => {
                write!(f, "ARM (incorrect) operands in use")
            }
            Self::Dwarf3OperandsInV2Header { count, .. } => write!(
                f,
                "standard DWARF3 operands matched, but is DWARF2 line table: count {count}"
            ),
            Self::BogusBytesBeforeProgram { gap, .. } => {
                write!(f, "{gap} bogus bytes between prologue and program")
            }
            Self::UnknownStandardOpcode {
                opcode, operands, ..
            } => {
                write!(
                    f,
                    "discarded unknown standard opcode {opcode} with {} operands:",
                    operands.len()
                )?;
                for op in operands {
                    write!(f, " {op}")?;
                }
                Ok(())
            }
            Self::UnknownExtendedOpcode {
                opcode, skipped, ..
            } => write!(
                f,
                "skipped unknown extended opcode {opcode:#x} ({skipped} payload bytes)"
            ),
            Self::LogicalRowOutOfRange { line, .. } => write!(
                f,
                "set_address_from_logical names logical row {line} outside the logicals table"
            ),
        }
    }
}

/// Receiver for non-fatal findings. Passed by reference into the header
/// parser and interpreter; no process-wide state is involved.
pub trait DiagnosticSink {
    /// Called once per finding, in decode order.
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Collects findings in order, for survey-style callers.
#[derive(Debug, Default)]
pub struct CollectedDiagnostics {
    findings: Vec<Diagnostic>,
}

impl CollectedDiagnostics {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The findings reported so far, in decode order.
    #[must_use]
    pub fn findings(&self) -> &[Diagnostic] {
        &self.findings
    }

    /// Number of findings reported so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    /// Whether no finding has been reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }
}

impl DiagnosticSink for CollectedDiagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.findings.push(diagnostic);
    }
}

/// Forwards each finding to `tracing` at WARN level, keeping only a count.
/// For production readers that want visibility without aggregation.
#[derive(Debug, Default)]
pub struct LogSink {
    count: usize,
}

impl LogSink {
    /// Creates a sink with a zero count.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of findings logged.
    #[must_use]
    pub fn count(&self) -> usize {
        self.count
    }
}

impl DiagnosticSink for LogSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.count += 1;
        warn!(offset = diagnostic.offset(), "{diagnostic}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collector_keeps_order() {
        let mut sink = CollectedDiagnostics::new();
        sink.report(Diagnostic::ArmOperandTableInUse { offset: 4 });
        sink.report(Diagnostic::BogusBytesBeforeProgram { offset: 9, gap: 12 });
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.findings()[0].offset(), 4);
        assert_eq!(sink.findings()[1].offset(), 9);
    }

    #[test]
    fn display_includes_operand_values() {
        let d = Diagnostic::UnknownStandardOpcode {
            offset: 0,
            opcode: 10,
            operands: vec![5],
        };
        assert_eq!(
            d.to_string(),
            "discarded unknown standard opcode 10 with 1 operands: 5"
        );
    }
}
