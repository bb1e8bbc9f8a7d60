//! Raw-word classification for both encodings.
//!
//! Produces the tag, register masks, and control-transfer flag the
//! dispatcher and register cache key on. Encodings outside the
//! classified set become `AUnknown`/`TUnknown`, which degrade to a
//! cycle-only interpreter handler rather than failing.

use crate::instr::{InstrInfo, InstrKind};
use InstrKind::*;

const fn bit(r: u32) -> u16 {
    1 << (r as u16)
}

fn info(kind: InstrKind, src_regs: u16, dst_regs: u16, branches: bool) -> InstrInfo {
    InstrInfo {
        kind,
        src_regs,
        dst_regs,
        branches,
    }
}

/// Classify a raw instruction word.
pub fn decode(thumb: bool, instr: u32) -> InstrInfo {
    if thumb {
        decode_thumb(instr)
    } else {
        decode_arm(instr)
    }
}

fn decode_arm(instr: u32) -> InstrInfo {
    let cond = instr >> 28;

    // BLX <imm> lives in the 0xF condition space.
    if cond == 0xF {
        if (instr >> 25) & 0x7 == 0b101 {
            return info(ABlxImm, 0, bit(14), true);
        }
        return info(AUnknown, 0, 0, false);
    }

    match (instr >> 26) & 0x3 {
        0b00 => decode_arm_dp(instr),
        0b01 => {
            // Single data transfer. Natively classified only in its
            // plain form: register base, immediate offset, word,
            // no writeback.
            let l = instr & (1 << 20) != 0;
            let imm = instr & (1 << 25) == 0;
            let p = instr & (1 << 24) != 0;
            let w = instr & (1 << 21) != 0;
            let b = instr & (1 << 22) != 0;
            let rn = (instr >> 16) & 0xF;
            let rd = (instr >> 12) & 0xF;
            if imm && p && !w && !b {
                if l {
                    info(ALdrImm, bit(rn), bit(rd), rd == 15)
                } else {
                    info(AStrImm, bit(rn) | bit(rd), 0, false)
                }
            } else {
                info(AUnknown, 0, 0, false)
            }
        }
        0b10 => {
            if (instr >> 25) & 0x7 == 0b101 {
                // B / BL.
                if instr & (1 << 24) != 0 {
                    info(ABl, 0, bit(14), true)
                } else {
                    info(AB, 0, 0, true)
                }
            } else {
                info(AUnknown, 0, 0, false)
            }
        }
        _ => info(AUnknown, 0, 0, false),
    }
}

fn decode_arm_dp(instr: u32) -> InstrInfo {
    let op = (instr >> 21) & 0xF;
    let s = instr & (1 << 20) != 0;
    let imm = instr & (1 << 25) != 0;
    let reg_shift = !imm && instr & (1 << 4) != 0;
    let rn = (instr >> 16) & 0xF;
    let rd = (instr >> 12) & 0xF;
    let rm = instr & 0xF;
    let rs = (instr >> 8) & 0xF;

    // Multiply: bits 7:4 = 1001 in the register-operand space.
    if !imm && (instr >> 4) & 0xF == 0b1001 {
        return if (instr >> 22) & 0x3F == 0 && instr & (1 << 21) == 0 {
            // MUL rd(rn-slot), rm, rs.
            info(AMul, bit(rm) | bit(rs), bit(rn), false)
        } else {
            info(AUnknown, 0, 0, false)
        };
    }

    // The S=0 comparison space holds the miscellaneous encodings.
    if !s && (0x8..=0xB).contains(&op) {
        return if reg_shift && (instr >> 4) & 0xF == 0b0001 && op == 0x9 {
            info(ABxReg, bit(rm), 0, true)
        } else if reg_shift && (instr >> 4) & 0xF == 0b0011 && op == 0x9 {
            info(ABlxReg, bit(rm), bit(14), true)
        } else {
            // MRS/MSR and friends.
            info(AUnknown, 0, 0, false)
        };
    }

    let mut src = 0u16;
    let mut dst = 0u16;
    if !matches!(op, 0xD | 0xF) {
        src |= bit(rn); // all but MOV/MVN read Rn
    }
    if !imm {
        src |= bit(rm);
        if reg_shift {
            src |= bit(rs);
        }
    }
    let compare = (0x8..=0xB).contains(&op);
    if !compare {
        dst |= bit(rd);
    }
    let branches = !compare && rd == 15;

    let kind = match (op, imm, reg_shift) {
        (0xD | 0xF, true, _) => AMovImm,
        (0xD | 0xF, false, false) => AMovRegImm,
        (0xD | 0xF, false, true) => AMovRegShift,
        (0x8..=0xB, true, _) => ACmpImm,
        (0x8..=0xB, false, false) => ACmpRegImm,
        (0x8..=0xB, false, true) => ACmpRegShift,
        (_, true, _) => AArithImm,
        (_, false, false) => AArithRegImm,
        (_, false, true) => AArithRegShift,
    };
    info(kind, src, dst, branches)
}

fn decode_thumb(instr: u32) -> InstrInfo {
    let rd = instr & 0x7;
    let rs = (instr >> 3) & 0x7;

    match (instr >> 13) & 0x7 {
        0b000 => {
            if (instr >> 11) & 0x3 == 0b11 {
                // Three-operand add/sub.
                let imm = instr & (1 << 10) != 0;
                let sub = instr & (1 << 9) != 0;
                let rn = (instr >> 6) & 0x7;
                let kind = match (sub, imm) {
                    (false, false) => TAddReg,
                    (true, false) => TSubReg,
                    (false, true) => TAddImm3,
                    (true, true) => TSubImm3,
                };
                let mut src = bit(rs);
                if !imm {
                    src |= bit(rn);
                }
                info(kind, src, bit(rd), false)
            } else {
                let kind = match (instr >> 11) & 0x3 {
                    0 => TLslImm,
                    1 => TLsrImm,
                    _ => TAsrImm,
                };
                info(kind, bit(rs), bit(rd), false)
            }
        }
        0b001 => {
            let rd8 = (instr >> 8) & 0x7;
            let (kind, src, dst) = match (instr >> 11) & 0x3 {
                0 => (TMovImm8, 0, bit(rd8)),
                1 => (TCmpImm8, bit(rd8), 0),
                2 => (TAddImm8, bit(rd8), bit(rd8)),
                _ => (TSubImm8, bit(rd8), bit(rd8)),
            };
            info(kind, src, dst, false)
        }
        0b010 => decode_thumb_misc(instr),
        0b011 => {
            // Load/store word/byte, immediate offset.
            let l = instr & (1 << 11) != 0;
            let b = instr & (1 << 12) != 0;
            let kind = match (l, b) {
                (false, false) => TStrImm,
                (true, false) => TLdrImm,
                (false, true) => TStrbImm,
                (true, true) => TLdrbImm,
            };
            if l {
                info(kind, bit(rs), bit(rd), false)
            } else {
                info(kind, bit(rs) | bit(rd), 0, false)
            }
        }
        0b100 => {
            if instr & (1 << 12) == 0 {
                // LDRH/STRH immediate.
                if instr & (1 << 11) != 0 {
                    info(TLdrhImm, bit(rs), bit(rd), false)
                } else {
                    info(TStrhImm, bit(rs) | bit(rd), 0, false)
                }
            } else {
                // SP-relative load/store.
                let rd8 = (instr >> 8) & 0x7;
                if instr & (1 << 11) != 0 {
                    info(TLdrSpRel, bit(13), bit(rd8), false)
                } else {
                    info(TStrSpRel, bit(13) | bit(rd8), 0, false)
                }
            }
        }
        0b101 => {
            if instr & (1 << 12) == 0 {
                // ADD rd, PC/SP, #imm.
                let rd8 = (instr >> 8) & 0x7;
                if instr & (1 << 11) != 0 {
                    info(TAddSpRel, bit(13), bit(rd8), false)
                } else {
                    info(TAddPcRel, bit(15), bit(rd8), false)
                }
            } else if (instr >> 8) & 0xFF == 0xB0 {
                info(TAddSpImm, bit(13), bit(13), false)
            } else if (instr >> 9) & 0x3 == 0b10 {
                // PUSH/POP (1011_x10x_....).
                if instr & (1 << 11) != 0 {
                    let dst = (instr & 0xFF) as u16 | ((instr as u16 >> 8) & 1) << 15;
                    info(TPop, bit(13), dst | bit(13), instr & (1 << 8) != 0)
                } else {
                    let src = (instr & 0xFF) as u16 | ((instr as u16 >> 8) & 1) << 14;
                    info(TPush, src | bit(13), bit(13), false)
                }
            } else {
                info(TUnknown, 0, 0, false)
            }
        }
        0b110 => {
            if instr & (1 << 12) != 0 {
                // Conditional branch (0xF = SWI, unclassified).
                if (instr >> 8) & 0xF == 0xF {
                    info(TUnknown, 0, 0, false)
                } else {
                    info(TBCond, 0, 0, true)
                }
            } else {
                info(TUnknown, 0, 0, false) // LDMIA/STMIA
            }
        }
        _ => match (instr >> 11) & 0x3 {
            0b00 => info(TB, 0, 0, true),
            0b10 => info(TBlSetup, 0, bit(14), false),
            0b11 => info(TBlOff, bit(14), bit(14), true),
            _ => info(TUnknown, 0, 0, false),
        },
    }
}

fn decode_thumb_misc(instr: u32) -> InstrInfo {
    let rd = instr & 0x7;
    let rs = (instr >> 3) & 0x7;
    match (instr >> 10) & 0x7 {
        0b000 => {
            // Two-register ALU.
            let (kind, reads_rd, writes_rd) = match (instr >> 6) & 0xF {
                0x0 => (TAnd, true, true),
                0x1 => (TEor, true, true),
                0x2 => (TLslReg, true, true),
                0x3 => (TLsrReg, true, true),
                0x4 => (TAsrReg, true, true),
                0x5 => (TAdc, true, true),
                0x6 => (TSbc, true, true),
                0x7 => (TRor, true, true),
                0x8 => (TTst, true, false),
                0x9 => (TNeg, false, true),
                0xA => (TCmp, true, false),
                0xB => (TCmn, true, false),
                0xC => (TOrr, true, true),
                0xD => (TMul, true, true),
                0xE => (TBic, true, true),
                _ => (TMvn, false, true),
            };
            let mut src = bit(rs);
            if reads_rd {
                src |= bit(rd);
            }
            info(kind, src, if writes_rd { bit(rd) } else { 0 }, false)
        }
        0b001 => {
            // Hi-register ops / BX / BLX.
            let rd_hi = (instr & 0x7) | ((instr >> 4) & 0x8);
            let rs_hi = (instr >> 3) & 0xF;
            match (instr >> 8) & 0x3 {
                0 => info(TAddHi, bit(rd_hi) | bit(rs_hi), bit(rd_hi), rd_hi == 15),
                1 => info(TCmpHi, bit(rd_hi) | bit(rs_hi), 0, false),
                2 => info(TMovHi, bit(rs_hi), bit(rd_hi), rd_hi == 15),
                _ => {
                    if instr & (1 << 7) != 0 {
                        info(TBlxReg, bit(rs_hi), bit(14), true)
                    } else {
                        info(TBxReg, bit(rs_hi), 0, true)
                    }
                }
            }
        }
        0b010 | 0b011 => {
            // LDR rd, [PC, #imm].
            let rd8 = (instr >> 8) & 0x7;
            info(TLdrPcRel, bit(15), bit(rd8), false)
        }
        _ => info(TUnknown, 0, 0, false), // register-offset load/store
    }
}
