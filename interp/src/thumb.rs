//! Handlers for the compact (16-bit) encoding. Thumb instructions
//! carry no condition field, so every handler executes
//! unconditionally; `r[15]` holds the instruction address + 4.

use arm_core::cpu::{condition_holds, FLAG_C};
use arm_core::timings::{cycles_c, cycles_ci};
use arm_core::Arm;

use crate::jump_to;
use crate::{alu, mem, shifter};

#[inline]
fn sext8(v: u32) -> u32 {
    v as u8 as i8 as i32 as u32
}

#[inline]
fn sext11(v: u32) -> u32 {
    ((v << 21) as i32 >> 21) as u32
}

fn c(cpu: &Arm) -> u32 {
    cycles_c(cpu.num, true, cpu.r[15], cpu.code_cycles)
}

fn ci(cpu: &Arm, internal: u32) -> u32 {
    cycles_ci(cpu.num, true, cpu.r[15], cpu.code_cycles, internal)
}

/// LSL/LSR/ASR by immediate (format 1).
pub unsafe extern "C" fn shift_imm(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let ty = (instr >> 11) & 0x3;
    let amount = (instr >> 6) & 0x1F;
    let rs = cpu.r[((instr >> 3) & 0x7) as usize];
    let carry_in = cpu.cpsr & FLAG_C != 0;
    let (res, carry) = shifter::shift_imm(ty, amount, rs, carry_in);
    cpu.r[(instr & 0x7) as usize] = res;
    alu::set_nz(&mut cpu.cpsr, res);
    alu::set_carry(&mut cpu.cpsr, carry);
    c(cpu)
}

/// Three-operand ADD/SUB, register or 3-bit immediate (format 2).
pub unsafe extern "C" fn add_sub(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let rs = cpu.r[((instr >> 3) & 0x7) as usize];
    let op2 = if instr & (1 << 10) != 0 {
        (instr >> 6) & 0x7
    } else {
        cpu.r[((instr >> 6) & 0x7) as usize]
    };
    let (res, carry, overflow) = if instr & (1 << 9) != 0 {
        alu::sub(rs, op2)
    } else {
        alu::add(rs, op2)
    };
    cpu.r[(instr & 0x7) as usize] = res;
    alu::set_nzcv(&mut cpu.cpsr, res, carry, overflow);
    c(cpu)
}

/// MOV/CMP/ADD/SUB with 8-bit immediate (format 3).
pub unsafe extern "C" fn alu_imm8(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let rd = ((instr >> 8) & 0x7) as usize;
    let imm = instr & 0xFF;
    match (instr >> 11) & 0x3 {
        0 => {
            cpu.r[rd] = imm;
            alu::set_nz(&mut cpu.cpsr, imm);
        }
        1 => {
            let (res, carry, overflow) = alu::sub(cpu.r[rd], imm);
            alu::set_nzcv(&mut cpu.cpsr, res, carry, overflow);
        }
        2 => {
            let (res, carry, overflow) = alu::add(cpu.r[rd], imm);
            cpu.r[rd] = res;
            alu::set_nzcv(&mut cpu.cpsr, res, carry, overflow);
        }
        _ => {
            let (res, carry, overflow) = alu::sub(cpu.r[rd], imm);
            cpu.r[rd] = res;
            alu::set_nzcv(&mut cpu.cpsr, res, carry, overflow);
        }
    }
    c(cpu)
}

/// Two-register ALU group (format 4).
pub unsafe extern "C" fn alu_reg(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let rd = (instr & 0x7) as usize;
    let a = cpu.r[rd];
    let b = cpu.r[((instr >> 3) & 0x7) as usize];
    let carry_in = cpu.cpsr & FLAG_C != 0;
    let mut internal = 0;
    match (instr >> 6) & 0xF {
        0x0 => {
            let r = a & b;
            cpu.r[rd] = r;
            alu::set_nz(&mut cpu.cpsr, r);
        }
        0x1 => {
            let r = a ^ b;
            cpu.r[rd] = r;
            alu::set_nz(&mut cpu.cpsr, r);
        }
        0x2 | 0x3 | 0x4 | 0x7 => {
            // Shift by register; one interlock cycle.
            let ty = match (instr >> 6) & 0xF {
                0x2 => 0,
                0x3 => 1,
                0x4 => 2,
                _ => 3,
            };
            let (r, carry) = shifter::shift_reg(ty, b, a, carry_in);
            cpu.r[rd] = r;
            alu::set_nz(&mut cpu.cpsr, r);
            alu::set_carry(&mut cpu.cpsr, carry);
            internal = 1;
        }
        0x5 => {
            let (r, carry, overflow) = alu::adc(a, b, carry_in);
            cpu.r[rd] = r;
            alu::set_nzcv(&mut cpu.cpsr, r, carry, overflow);
        }
        0x6 => {
            let (r, carry, overflow) = alu::sbc(a, b, carry_in);
            cpu.r[rd] = r;
            alu::set_nzcv(&mut cpu.cpsr, r, carry, overflow);
        }
        0x8 => alu::set_nz(&mut cpu.cpsr, a & b),
        0x9 => {
            let (r, carry, overflow) = alu::sub(0, b);
            cpu.r[rd] = r;
            alu::set_nzcv(&mut cpu.cpsr, r, carry, overflow);
        }
        0xA => {
            let (r, carry, overflow) = alu::sub(a, b);
            alu::set_nzcv(&mut cpu.cpsr, r, carry, overflow);
        }
        0xB => {
            let (r, carry, overflow) = alu::add(a, b);
            alu::set_nzcv(&mut cpu.cpsr, r, carry, overflow);
        }
        0xC => {
            let r = a | b;
            cpu.r[rd] = r;
            alu::set_nz(&mut cpu.cpsr, r);
        }
        0xD => {
            // Fixed multiplier cost so the compiled form can price
            // it at translation time.
            let r = a.wrapping_mul(b);
            cpu.r[rd] = r;
            alu::set_nz(&mut cpu.cpsr, r);
            internal = 3;
        }
        0xE => {
            let r = a & !b;
            cpu.r[rd] = r;
            alu::set_nz(&mut cpu.cpsr, r);
        }
        _ => {
            let r = !b;
            cpu.r[rd] = r;
            alu::set_nz(&mut cpu.cpsr, r);
        }
    }
    if internal != 0 {
        ci(cpu, internal)
    } else {
        c(cpu)
    }
}

/// Hi-register ADD/CMP/MOV and BX/BLX (format 5).
pub unsafe extern "C" fn hi_reg(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let rd = ((instr & 0x7) | ((instr >> 4) & 0x8)) as usize;
    let rs = ((instr >> 3) & 0xF) as usize;
    let b = cpu.r[rs];
    match (instr >> 8) & 0x3 {
        0 => {
            let res = cpu.r[rd].wrapping_add(b);
            if rd == 15 {
                let cy = ci(cpu, 2);
                jump_to(cpu, res & !1, true);
                return cy;
            }
            cpu.r[rd] = res;
        }
        1 => {
            let (r, carry, overflow) = alu::sub(cpu.r[rd], b);
            alu::set_nzcv(&mut cpu.cpsr, r, carry, overflow);
        }
        2 => {
            if rd == 15 {
                let cy = ci(cpu, 2);
                jump_to(cpu, b & !1, true);
                return cy;
            }
            cpu.r[rd] = b;
        }
        _ => {
            let cy = ci(cpu, 2);
            if instr & (1 << 7) != 0 {
                cpu.r[14] = cpu.r[15].wrapping_sub(2) | 1;
            }
            jump_to(cpu, b, b & 1 != 0);
            return cy;
        }
    }
    c(cpu)
}

/// LDR rd, [PC, #imm] (format 6). The PC operand reads word-aligned.
pub unsafe extern "C" fn ldr_pcrel(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let addr = (cpu.r[15] & !2).wrapping_add((instr & 0xFF) << 2);
    cpu.r[((instr >> 8) & 0x7) as usize] = mem::read32(cpu, addr);
    ci(cpu, 1)
}

/// ADD rd, PC/SP, #imm (format 12) and ADD SP, #imm (format 13).
pub unsafe extern "C" fn addr_calc(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    if (instr >> 8) & 0xFF == 0xB0 {
        let off = (instr & 0x7F) << 2;
        if instr & (1 << 7) != 0 {
            cpu.r[13] = cpu.r[13].wrapping_sub(off);
        } else {
            cpu.r[13] = cpu.r[13].wrapping_add(off);
        }
    } else {
        let off = (instr & 0xFF) << 2;
        let base = if instr & (1 << 11) != 0 {
            cpu.r[13]
        } else {
            cpu.r[15] & !2
        };
        cpu.r[((instr >> 8) & 0x7) as usize] = base.wrapping_add(off);
    }
    c(cpu)
}

/// Load/store word or byte with 5-bit immediate offset (format 9).
pub unsafe extern "C" fn ldst_imm(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let rd = (instr & 0x7) as usize;
    let base = cpu.r[((instr >> 3) & 0x7) as usize];
    let byte = instr & (1 << 12) != 0;
    let load = instr & (1 << 11) != 0;
    let imm = (instr >> 6) & 0x1F;
    let addr = base.wrapping_add(if byte { imm } else { imm << 2 });
    if load {
        cpu.r[rd] = if byte {
            mem::read8(cpu, addr) as u32
        } else {
            mem::read32(cpu, addr)
        };
        ci(cpu, 1)
    } else {
        if byte {
            mem::write8(cpu, addr, cpu.r[rd] as u8);
        } else {
            mem::write32(cpu, addr, cpu.r[rd]);
        }
        c(cpu)
    }
}

/// Load/store halfword with immediate offset (format 10).
pub unsafe extern "C" fn ldsth_imm(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let rd = (instr & 0x7) as usize;
    let base = cpu.r[((instr >> 3) & 0x7) as usize];
    let addr = base.wrapping_add(((instr >> 6) & 0x1F) << 1);
    if instr & (1 << 11) != 0 {
        cpu.r[rd] = mem::read16(cpu, addr) as u32;
        ci(cpu, 1)
    } else {
        mem::write16(cpu, addr, cpu.r[rd] as u16);
        c(cpu)
    }
}

/// SP-relative load/store (format 11).
pub unsafe extern "C" fn ldst_sprel(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let rd = ((instr >> 8) & 0x7) as usize;
    let addr = cpu.r[13].wrapping_add((instr & 0xFF) << 2);
    if instr & (1 << 11) != 0 {
        cpu.r[rd] = mem::read32(cpu, addr);
        ci(cpu, 1)
    } else {
        mem::write32(cpu, addr, cpu.r[rd]);
        c(cpu)
    }
}

/// PUSH/POP (format 14). POP with the PC bit interworks.
pub unsafe extern "C" fn push_pop(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let extra = instr & (1 << 8) != 0;
    let count = (instr & 0xFF).count_ones() + extra as u32;
    if instr & (1 << 11) != 0 {
        // POP.
        let mut addr = cpu.r[13];
        for i in 0..8 {
            if instr & (1 << i) != 0 {
                cpu.r[i as usize] = mem::read32(cpu, addr);
                addr = addr.wrapping_add(4);
            }
        }
        cpu.r[13] = addr.wrapping_add(4 * extra as u32);
        if extra {
            let target = mem::read32(cpu, addr);
            let cy = ci(cpu, count + 2);
            jump_to(cpu, target, target & 1 != 0);
            return cy;
        }
        ci(cpu, count)
    } else {
        // PUSH.
        let mut addr = cpu.r[13].wrapping_sub(4 * count);
        cpu.r[13] = addr;
        for i in 0..8 {
            if instr & (1 << i) != 0 {
                mem::write32(cpu, addr, cpu.r[i as usize]);
                addr = addr.wrapping_add(4);
            }
        }
        if extra {
            mem::write32(cpu, addr, cpu.r[14]);
        }
        ci(cpu, count)
    }
}

/// Conditional branch (format 16). The condition is part of the
/// instruction, so it is evaluated here.
pub unsafe extern "C" fn b_cond(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let instr = cpu.cur_instr;
    let cond = ((instr >> 8) & 0xF) as u8;
    if !condition_holds(cond, cpu.cpsr) {
        return c(cpu);
    }
    let target = cpu.r[15].wrapping_add(sext8(instr & 0xFF) << 1);
    let cy = ci(cpu, 2);
    jump_to(cpu, target, true);
    cy
}

pub unsafe extern "C" fn b(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let target = cpu.r[15].wrapping_add(sext11(cpu.cur_instr & 0x7FF) << 1);
    let cy = ci(cpu, 2);
    jump_to(cpu, target, true);
    cy
}

/// First half of the BL pair: stash the high offset part in LR.
pub unsafe extern "C" fn bl_setup(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    cpu.r[14] = cpu.r[15].wrapping_add(sext11(cpu.cur_instr & 0x7FF) << 12);
    c(cpu)
}

/// Second half of the BL pair: branch and link.
pub unsafe extern "C" fn bl_off(cpu: *mut Arm) -> u32 {
    let cpu = &mut *cpu;
    let target = cpu.r[14].wrapping_add((cpu.cur_instr & 0x7FF) << 1);
    cpu.r[14] = cpu.r[15].wrapping_sub(2) | 1;
    let cy = ci(cpu, 2);
    jump_to(cpu, target, true);
    cy
}

pub unsafe extern "C" fn unk(cpu: *mut Arm) -> u32 {
    let cpu = &*cpu;
    c(cpu)
}
