//! Decoded-instruction metadata consumed by the JIT dispatcher,
//! the register cache, and the reference interpreter.

use crate::decode;

/// Instruction classification tag.
///
/// `A*` variants are standard (ARM) encodings, `T*` variants are
/// compact (Thumb) encodings. Tags classify the *form* of an
/// instruction; codegen routines re-extract the opcode bits from
/// the raw word, so all opcodes of a family share one tag group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrKind {
    // ARM data processing, split by opcode family and operand form.
    AArithImm,
    AArithRegImm,
    AArithRegShift,
    AMovImm,
    AMovRegImm,
    AMovRegShift,
    ACmpImm,
    ACmpRegImm,
    ACmpRegShift,
    // ARM multiply.
    AMul,
    // ARM single data transfer, immediate offset, no writeback.
    ALdrImm,
    AStrImm,
    // ARM control transfer.
    AB,
    ABl,
    ABxReg,
    ABlxReg,
    ABlxImm,
    // Thumb shift/add/sub.
    TLslImm,
    TLsrImm,
    TAsrImm,
    TAddReg,
    TSubReg,
    TAddImm3,
    TSubImm3,
    // Thumb 8-bit immediate ALU.
    TMovImm8,
    TCmpImm8,
    TAddImm8,
    TSubImm8,
    // Thumb two-register ALU (format 4), one tag per opcode.
    TAnd,
    TEor,
    TLslReg,
    TLsrReg,
    TAsrReg,
    TAdc,
    TSbc,
    TRor,
    TTst,
    TNeg,
    TCmp,
    TCmn,
    TOrr,
    TMul,
    TBic,
    TMvn,
    // Thumb hi-register ops and branch-exchange.
    TAddHi,
    TCmpHi,
    TMovHi,
    TBxReg,
    TBlxReg,
    // Thumb PC/SP-relative.
    TLdrPcRel,
    TAddPcRel,
    TAddSpRel,
    TAddSpImm,
    // Thumb load/store, immediate offset.
    TLdrImm,
    TStrImm,
    TLdrbImm,
    TStrbImm,
    TLdrhImm,
    TStrhImm,
    TLdrSpRel,
    TStrSpRel,
    // Thumb push/pop.
    TPush,
    TPop,
    // Thumb branches.
    TBCond,
    TB,
    TBlSetup,
    TBlOff,
    // Anything not classified above.
    AUnknown,
    TUnknown,
}

/// Static properties of a classified instruction.
#[derive(Debug, Clone, Copy)]
pub struct InstrInfo {
    pub kind: InstrKind,
    /// Guest registers read (bit per register, R15 included).
    pub src_regs: u16,
    /// Guest registers written.
    pub dst_regs: u16,
    /// Whether the instruction is a control transfer (forces
    /// interpreter fallback).
    pub branches: bool,
}

/// One decoded instruction of a block, as handed to the compiler.
#[derive(Debug, Clone, Copy)]
pub struct FetchedInstr {
    /// Raw encoding (low 16 bits for Thumb).
    pub instr: u32,
    /// Successor PCs; only meaningful on the last instruction of a
    /// block ([0] = not-taken, [1] = taken).
    pub next_instr: [u32; 2],
    /// Code-fetch timing value assigned by the fetch stage.
    pub code_cycles: u32,
    pub info: InstrInfo,
}

impl FetchedInstr {
    /// Decode a raw word into a fetched instruction. The fetch
    /// stage proper supplies `code_cycles`; tests pass it directly.
    pub fn new(thumb: bool, instr: u32, code_cycles: u32) -> Self {
        Self {
            instr,
            next_instr: [0; 2],
            code_cycles,
            info: decode::decode(thumb, instr),
        }
    }

    /// Condition field (bits 31:28). Only meaningful for the
    /// standard encoding; Thumb instructions execute
    /// unconditionally.
    #[inline]
    pub fn cond(&self) -> u8 {
        (self.instr >> 28) as u8
    }
}
