//! Handlers for the standard (32-bit) encoding.
//!
//! A handler runs with `cur_instr` and `code_cycles` already stored
//! and `r[15]` holding the pipeline value (instruction address + 8).
//! The condition field has already been evaluated by the caller;
//! handlers implement the passed-predicate semantics only, and
//! return the cycles consumed.

use arm_core::cpu::FLAG_C;
use arm_core::timings::{cycles_c, cycles_ci};
use arm_core::Arm;

use crate::alu;
use crate::mem;
use crate::shifter;
use crate::jump_to;

fn read_reg(cpu: &Arm, field: u32, pc_adj: u32) -> u32 {
    let i = (field & 0xF) as usize;
    let v = cpu.r[i];
    if i == 15 {
        v.wrapping_add(pc_adj)
    } else {
        v
    }
}

#[inline]
fn sext24(v: u32) -> u32 {
    ((v << 8) as i32 >> 8) as u32
}

/// All sixteen data-processing opcodes, every operand form.
pub unsafe extern "C" fn data_proc(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let op = (instr >> 21) & 0xF;
    let s = instr & (1 << 20) != 0;
    let imm_form = instr & (1 << 25) != 0;
    let reg_shift = !imm_form && instr & (1 << 4) != 0;
    let carry_in = cpu.cpsr & FLAG_C != 0;

    // With a register-specified shift the PC reads 4 bytes further.
    let pc_adj = if reg_shift { 4 } else { 0 };

    let (op2, shifter_carry) = if imm_form {
        let rot = ((instr >> 8) & 0xF) * 2;
        let val = (instr & 0xFF).rotate_right(rot);
        let c = if rot == 0 {
            carry_in
        } else {
            val & (1 << 31) != 0
        };
        (val, c)
    } else {
        let rm = read_reg(cpu, instr, pc_adj);
        let ty = (instr >> 5) & 0x3;
        if reg_shift {
            let amount = cpu.r[((instr >> 8) & 0xF) as usize];
            shifter::shift_reg(ty, amount, rm, carry_in)
        } else {
            shifter::shift_imm(ty, (instr >> 7) & 0x1F, rm, carry_in)
        }
    };
    let rn = read_reg(cpu, instr >> 16, pc_adj);
    let rd = ((instr >> 12) & 0xF) as usize;

    let mut result = None;
    let logical = |cpsr: &mut u32, r: u32| {
        if s {
            alu::set_nz(cpsr, r);
            alu::set_carry(cpsr, shifter_carry);
        }
        r
    };
    match op {
        0x0 => result = Some(logical(&mut cpu.cpsr, rn & op2)),
        0x1 => result = Some(logical(&mut cpu.cpsr, rn ^ op2)),
        0xC => result = Some(logical(&mut cpu.cpsr, rn | op2)),
        0xD => result = Some(logical(&mut cpu.cpsr, op2)),
        0xE => result = Some(logical(&mut cpu.cpsr, rn & !op2)),
        0xF => result = Some(logical(&mut cpu.cpsr, !op2)),
        0x8 => {
            logical(&mut cpu.cpsr, rn & op2);
        }
        0x9 => {
            logical(&mut cpu.cpsr, rn ^ op2);
        }
        _ => {
            let (r, c, v) = match op {
                0x2 => alu::sub(rn, op2),
                0x3 => alu::sub(op2, rn),
                0x4 => alu::add(rn, op2),
                0x5 => alu::adc(rn, op2, carry_in),
                0x6 => alu::sbc(rn, op2, carry_in),
                0x7 => alu::sbc(op2, rn, carry_in),
                0xA => alu::sub(rn, op2),
                _ => alu::add(rn, op2),
            };
            if s {
                alu::set_nzcv(&mut cpu.cpsr, r, c, v);
            }
            if !matches!(op, 0xA | 0xB) {
                result = Some(r);
            }
        }
    }

    let cycles = if let Some(r) = result {
        if rd == 15 {
            let cy = cycles_ci(cpu.num, false, cpu.r[15], cpu.code_cycles, 2);
            jump_to(cpu, r, false);
            cy
        } else {
            cpu.r[rd] = r;
            if reg_shift {
                cycles_ci(cpu.num, false, cpu.r[15], cpu.code_cycles, 1)
            } else {
                cycles_c(cpu.num, false, cpu.r[15], cpu.code_cycles)
            }
        }
    } else if reg_shift {
        cycles_ci(cpu.num, false, cpu.r[15], cpu.code_cycles, 1)
    } else {
        cycles_c(cpu.num, false, cpu.r[15], cpu.code_cycles)
    };
    cycles
}

pub unsafe extern "C" fn mul(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let rm = cpu.r[(instr & 0xF) as usize];
    let rs = cpu.r[((instr >> 8) & 0xF) as usize];
    let rd = ((instr >> 16) & 0xF) as usize;
    let res = rm.wrapping_mul(rs);
    cpu.r[rd] = res;
    if instr & (1 << 20) != 0 {
        alu::set_nz(&mut cpu.cpsr, res);
    }
    // Early-out multiplier: cost depends on the magnitude of Rs.
    let m = if rs & 0xFFFF_FF00 == 0 || rs & 0xFFFF_FF00 == 0xFFFF_FF00 {
        1
    } else if rs & 0xFFFF_0000 == 0 || rs & 0xFFFF_0000 == 0xFFFF_0000 {
        2
    } else if rs & 0xFF00_0000 == 0 || rs & 0xFF00_0000 == 0xFF00_0000 {
        3
    } else {
        4
    };
    cycles_ci(cpu.num, false, cpu.r[15], cpu.code_cycles, m)
}

fn transfer_addr(cpu: &Arm) -> u32 {
    let instr = cpu.cur_instr;
    let rn = read_reg(cpu, instr >> 16, 0);
    let off = instr & 0xFFF;
    if instr & (1 << 23) != 0 {
        rn.wrapping_add(off)
    } else {
        rn.wrapping_sub(off)
    }
}

pub unsafe extern "C" fn ldr_imm(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let addr = transfer_addr(cpu);
    let val = mem::read32(cpu, addr);
    let rd = ((cpu.cur_instr >> 12) & 0xF) as usize;
    let cy = cycles_ci(cpu.num, false, cpu.r[15], cpu.code_cycles, 1);
    if rd == 15 {
        jump_to(cpu, val, val & 1 != 0);
    } else {
        cpu.r[rd] = val;
    }
    cy
}

pub unsafe extern "C" fn str_imm(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let addr = transfer_addr(cpu);
    let rd = ((cpu.cur_instr >> 12) & 0xF) as usize;
    let val = cpu.r[rd];
    mem::write32(cpu, addr, val);
    cycles_c(cpu.num, false, cpu.r[15], cpu.code_cycles)
}

pub unsafe extern "C" fn b(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let target = cpu.r[15].wrapping_add(sext24(cpu.cur_instr) << 2);
    let cy = cycles_ci(cpu.num, false, cpu.r[15], cpu.code_cycles, 2);
    jump_to(cpu, target, false);
    cy
}

pub unsafe extern "C" fn bl(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    cpu.r[14] = cpu.r[15].wrapping_sub(4);
    b(cpu)
}

pub unsafe extern "C" fn bx(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let target = cpu.r[(cpu.cur_instr & 0xF) as usize];
    let cy = cycles_ci(cpu.num, false, cpu.r[15], cpu.code_cycles, 2);
    jump_to(cpu, target, target & 1 != 0);
    cy
}

pub unsafe extern "C" fn blx_reg(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    cpu.r[14] = cpu.r[15].wrapping_sub(4);
    bx(cpu)
}

/// BLX with an immediate target. Encoded in the 0xF condition space
/// but architecturally unconditional; always enters Thumb state.
pub unsafe extern "C" fn blx_imm(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    cpu.r[14] = cpu.r[15].wrapping_sub(4);
    let target = cpu.r[15]
        .wrapping_add(sext24(instr) << 2)
        .wrapping_add(((instr >> 24) & 1) << 1);
    let cy = cycles_ci(cpu.num, false, cpu.r[15], cpu.code_cycles, 2);
    jump_to(cpu, target, true);
    cy
}

/// Unclassified encoding: account the fetch, change nothing.
pub unsafe extern "C" fn unk(cpu: *mut Arm) -> u32 {
    let cpu = &*cpu;
    cycles_c(cpu.num, false, cpu.r[15], cpu.code_cycles)
}
