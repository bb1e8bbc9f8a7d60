//! Interpreter for the guest instruction set.
//!
//! Serves two roles: the fallback path of the block compiler (which
//! embeds raw pointers to the handlers below in generated code) and
//! the architectural oracle for differential tests (via [`step`]).

use std::sync::LazyLock;

use arm_core::cpu::{condition_holds, FLAG_T};
use arm_core::timings::cycles_c;
use arm_core::{Arm, FetchedInstr, InstrKind};

mod alu;
pub mod arm;
mod mem;
mod shifter;
pub mod thumb;

/// Handler signature shared with compiled code. Returns the cycles
/// the instruction consumed.
pub type InterpFn = unsafe extern "C" fn(*mut Arm) -> u32;

/// Dispatch index for a standard-encoding word: bits 27:20 and 7:4.
#[inline]
pub fn arm_icode(instr: u32) -> usize {
    (((instr >> 4) & 0xF) | ((instr >> 16) & 0xFF0)) as usize
}

/// Dispatch index for a compact-encoding word: bits 15:6.
#[inline]
pub fn thumb_icode(instr: u32) -> usize {
    ((instr >> 6) & 0x3FF) as usize
}

fn arm_handler(kind: InstrKind) -> InterpFn {
    use InstrKind::*;
    match kind {
        AArithImm | AArithRegImm | AArithRegShift | AMovImm | AMovRegImm | AMovRegShift
        | ACmpImm | ACmpRegImm | ACmpRegShift => arm::data_proc,
        AMul => arm::mul,
        ALdrImm => arm::ldr_imm,
        AStrImm => arm::str_imm,
        AB => arm::b,
        ABl => arm::bl,
        ABxReg => arm::bx,
        ABlxReg => arm::blx_reg,
        ABlxImm => arm::blx_imm,
        _ => arm::unk,
    }
}

fn thumb_handler(kind: InstrKind) -> InterpFn {
    use InstrKind::*;
    match kind {
        TLslImm | TLsrImm | TAsrImm => thumb::shift_imm,
        TAddReg | TSubReg | TAddImm3 | TSubImm3 => thumb::add_sub,
        TMovImm8 | TCmpImm8 | TAddImm8 | TSubImm8 => thumb::alu_imm8,
        TAnd | TEor | TLslReg | TLsrReg | TAsrReg | TAdc | TSbc | TRor | TTst | TNeg | TCmp
        | TCmn | TOrr | TMul | TBic | TMvn => thumb::alu_reg,
        TAddHi | TCmpHi | TMovHi | TBxReg | TBlxReg => thumb::hi_reg,
        TLdrPcRel => thumb::ldr_pcrel,
        TAddPcRel | TAddSpRel | TAddSpImm => thumb::addr_calc,
        TLdrImm | TStrImm | TLdrbImm | TStrbImm => thumb::ldst_imm,
        TLdrhImm | TStrhImm => thumb::ldsth_imm,
        TLdrSpRel | TStrSpRel => thumb::ldst_sprel,
        TPush | TPop => thumb::push_pop,
        TBCond => thumb::b_cond,
        TB => thumb::b,
        TBlSetup => thumb::bl_setup,
        TBlOff => thumb::bl_off,
        _ => thumb::unk,
    }
}

/// Standard-encoding dispatch table. The index discards the
/// condition field, so entries are built from a representative word
/// with an always condition; BLX immediate is dispatched separately
/// (its 0xF condition space is not table-indexed).
pub static ARM_TABLE: LazyLock<[InterpFn; 4096]> = LazyLock::new(|| {
    let mut table: [InterpFn; 4096] = [arm::unk as InterpFn; 4096];
    for (icode, entry) in table.iter_mut().enumerate() {
        let icode = icode as u32;
        let word = 0xE000_0000 | ((icode & 0xF) << 4) | ((icode & 0xFF0) << 16);
        *entry = arm_handler(arm_core::decode::decode(false, word).kind);
    }
    table
});

/// Compact-encoding dispatch table.
pub static THUMB_TABLE: LazyLock<[InterpFn; 1024]> = LazyLock::new(|| {
    let mut table: [InterpFn; 1024] = [thumb::unk as InterpFn; 1024];
    for (icode, entry) in table.iter_mut().enumerate() {
        let word = (icode as u32) << 6;
        *entry = thumb_handler(arm_core::decode::decode(true, word).kind);
    }
    table
});

/// Redirect execution. Sets the encoding-mode bit and loads the PC
/// with its pipeline value for the new stream.
pub fn jump_to(cpu: &mut Arm, target: u32, thumb: bool) {
    if thumb {
        cpu.cpsr |= FLAG_T;
        cpu.r[15] = (target & !1).wrapping_add(4);
    } else {
        cpu.cpsr &= !FLAG_T;
        cpu.r[15] = (target & !3).wrapping_add(8);
    }
}

/// Execute one instruction, performing the same per-instruction
/// bookkeeping compiled blocks perform: PC advance, current-state
/// stores, (on the last instruction of a block) successor-PC
/// stores, predicate evaluation, and cycle accounting.
///
/// # Safety
/// `cpu.mem` must point to `cpu.mem_size` bytes of guest RAM.
pub unsafe fn step(cpu: &mut Arm, fetched: &FetchedInstr, last: bool) -> u32 {
    let thumb = cpu.thumb();
    cpu.r[15] = cpu.r[15].wrapping_add(if thumb { 2 } else { 4 });
    cpu.cur_instr = fetched.instr;
    cpu.code_cycles = fetched.code_cycles;
    if last {
        cpu.next_instr = fetched.next_instr;
    }
    if thumb {
        return THUMB_TABLE[thumb_icode(fetched.instr)](cpu);
    }
    let cond = fetched.cond();
    if cond == 0xF {
        if fetched.info.kind == InstrKind::ABlxImm {
            arm::blx_imm(cpu)
        } else {
            cycles_c(cpu.num, false, cpu.r[15], cpu.code_cycles)
        }
    } else if cond == 0xE || condition_holds(cond, cpu.cpsr) {
        ARM_TABLE[arm_icode(fetched.instr)](cpu)
    } else {
        cycles_c(cpu.num, false, cpu.r[15], cpu.code_cycles)
    }
}
