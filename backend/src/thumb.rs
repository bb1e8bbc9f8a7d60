//! Native codegen for the compact-encoding ALU families. Same shape
//! as the standard-encoding routines: EAX carries the result, flags
//! are rebuilt last. No predicate handling; these instructions are
//! unconditional.

use crate::alu::Operand;
use crate::compiler::Compiler;
use crate::x86_64::emitter::{
    emit_arith_ri, emit_arith_rr, emit_bt_ri, emit_cmc, emit_imul_rr, emit_mov_ri32, emit_mov_rr,
    emit_neg, emit_not, emit_shift_ri, emit_test_rr, ArithOp, ShiftOp, X86Cond,
};
use crate::x86_64::regs::{Reg, RCPSR, SCRATCH, SCRATCH2};

impl Compiler {
    fn host(&self, guest: u32) -> Reg {
        self.reg_cache.host_reg(guest as usize).unwrap()
    }

    fn store_result_t(&mut self, rd: u32) {
        let host = self.host(rd);
        emit_mov_rr(&mut self.buf, false, host, SCRATCH);
        self.reg_cache.mark_dirty(rd as usize);
    }

    /// LSL/LSR/ASR by immediate. Always sets N/Z, and C except for
    /// a shift by zero.
    pub(crate) fn comp_t_shift_imm(&mut self) {
        self.comp_add_cycles_c();
        let instr = self.cur_instr.instr;
        let op = (instr >> 11) & 0x3;
        let amount = ((instr >> 6) & 0x1F) as u8;
        let src = self.host((instr >> 3) & 0x7);
        emit_mov_rr(&mut self.buf, false, SCRATCH, src);

        let shifted = match (op, amount) {
            (0, 0) => {
                emit_test_rr(&mut self.buf, false, SCRATCH, SCRATCH);
                false
            }
            (0, n) => {
                emit_shift_ri(&mut self.buf, ShiftOp::Shl, false, SCRATCH, n);
                true
            }
            (1, 0) => {
                // Shift by zero means a full 32-bit logical shift;
                // splitting it leaves bit 31 in the host carry.
                emit_shift_ri(&mut self.buf, ShiftOp::Shr, false, SCRATCH, 31);
                emit_shift_ri(&mut self.buf, ShiftOp::Shr, false, SCRATCH, 1);
                true
            }
            (1, n) => {
                emit_shift_ri(&mut self.buf, ShiftOp::Shr, false, SCRATCH, n);
                true
            }
            (_, 0) => {
                emit_shift_ri(&mut self.buf, ShiftOp::Sar, false, SCRATCH, 16);
                emit_shift_ri(&mut self.buf, ShiftOp::Sar, false, SCRATCH, 16);
                true
            }
            (_, n) => {
                emit_shift_ri(&mut self.buf, ShiftOp::Sar, false, SCRATCH, n);
                true
            }
        };
        if shifted {
            self.save_host_carry();
        }
        self.store_result_t(instr & 0x7);
        self.set_nz();
        if shifted {
            self.merge_saved_carry();
        }
    }

    /// Three-operand ADD/SUB with register or 3-bit immediate.
    pub(crate) fn comp_t_add_sub(&mut self) {
        self.comp_add_cycles_c();
        let instr = self.cur_instr.instr;
        let src = self.host((instr >> 3) & 0x7);
        emit_mov_rr(&mut self.buf, false, SCRATCH, src);
        let opnd = if instr & (1 << 10) != 0 {
            Operand::Imm((instr >> 6) & 0x7)
        } else {
            Operand::Host(self.host((instr >> 6) & 0x7))
        };
        let sub = instr & (1 << 9) != 0;
        let aop = if sub { ArithOp::Sub } else { ArithOp::Add };
        match opnd {
            Operand::Imm(v) => emit_arith_ri(&mut self.buf, aop, false, SCRATCH, v as i32),
            Operand::Host(r) => emit_arith_rr(&mut self.buf, aop, false, SCRATCH, r),
        }
        self.store_result_t(instr & 0x7);
        self.set_nzcv(if sub { X86Cond::Jae } else { X86Cond::Jb });
    }

    /// MOV/CMP/ADD/SUB with 8-bit immediate.
    pub(crate) fn comp_t_alu_imm8(&mut self) {
        self.comp_add_cycles_c();
        let instr = self.cur_instr.instr;
        let rd = (instr >> 8) & 0x7;
        let imm = (instr & 0xFF) as i32;
        match (instr >> 11) & 0x3 {
            0 => {
                emit_mov_ri32(&mut self.buf, SCRATCH, imm as u32);
                emit_test_rr(&mut self.buf, false, SCRATCH, SCRATCH);
                self.store_result_t(rd);
                self.set_nz();
            }
            1 => {
                let host = self.host(rd);
                emit_mov_rr(&mut self.buf, false, SCRATCH, host);
                emit_arith_ri(&mut self.buf, ArithOp::Cmp, false, SCRATCH, imm);
                self.set_nzcv(X86Cond::Jae);
            }
            2 => {
                let host = self.host(rd);
                emit_mov_rr(&mut self.buf, false, SCRATCH, host);
                emit_arith_ri(&mut self.buf, ArithOp::Add, false, SCRATCH, imm);
                self.store_result_t(rd);
                self.set_nzcv(X86Cond::Jb);
            }
            _ => {
                let host = self.host(rd);
                emit_mov_rr(&mut self.buf, false, SCRATCH, host);
                emit_arith_ri(&mut self.buf, ArithOp::Sub, false, SCRATCH, imm);
                self.store_result_t(rd);
                self.set_nzcv(X86Cond::Jae);
            }
        }
    }

    /// Two-register ALU group, minus the shift-by-register forms.
    pub(crate) fn comp_t_alu_reg(&mut self) {
        let instr = self.cur_instr.instr;
        let op = (instr >> 6) & 0xF;
        // The multiplier does not overlap the fetch; bill a fixed
        // internal cost so it stays compile-time constant.
        if op == 0xD {
            self.comp_add_cycles_ci(3);
        } else {
            self.comp_add_cycles_c();
        }
        let rd = instr & 0x7;
        let rs = self.host((instr >> 3) & 0x7);

        match op {
            0x0 | 0x1 | 0xC => {
                let aop = match op {
                    0x0 => ArithOp::And,
                    0x1 => ArithOp::Xor,
                    _ => ArithOp::Or,
                };
                let dst = self.host(rd);
                emit_mov_rr(&mut self.buf, false, SCRATCH, dst);
                emit_arith_rr(&mut self.buf, aop, false, SCRATCH, rs);
                self.store_result_t(rd);
                self.set_nz();
            }
            0x5 => {
                let dst = self.host(rd);
                emit_mov_rr(&mut self.buf, false, SCRATCH, dst);
                emit_bt_ri(&mut self.buf, false, RCPSR, 29);
                emit_arith_rr(&mut self.buf, ArithOp::Adc, false, SCRATCH, rs);
                self.store_result_t(rd);
                self.set_nzcv(X86Cond::Jb);
            }
            0x6 => {
                let dst = self.host(rd);
                emit_mov_rr(&mut self.buf, false, SCRATCH, dst);
                emit_bt_ri(&mut self.buf, false, RCPSR, 29);
                emit_cmc(&mut self.buf);
                emit_arith_rr(&mut self.buf, ArithOp::Sbb, false, SCRATCH, rs);
                self.store_result_t(rd);
                self.set_nzcv(X86Cond::Jae);
            }
            0x8 => {
                let dst = self.host(rd);
                emit_mov_rr(&mut self.buf, false, SCRATCH, dst);
                emit_arith_rr(&mut self.buf, ArithOp::And, false, SCRATCH, rs);
                self.set_nz();
            }
            0x9 => {
                // NEG sets the host flags as SUB from zero would.
                emit_mov_rr(&mut self.buf, false, SCRATCH, rs);
                emit_neg(&mut self.buf, false, SCRATCH);
                self.store_result_t(rd);
                self.set_nzcv(X86Cond::Jae);
            }
            0xA => {
                let dst = self.host(rd);
                emit_mov_rr(&mut self.buf, false, SCRATCH, dst);
                emit_arith_rr(&mut self.buf, ArithOp::Cmp, false, SCRATCH, rs);
                self.set_nzcv(X86Cond::Jae);
            }
            0xB => {
                let dst = self.host(rd);
                emit_mov_rr(&mut self.buf, false, SCRATCH, dst);
                emit_arith_rr(&mut self.buf, ArithOp::Add, false, SCRATCH, rs);
                self.set_nzcv(X86Cond::Jb);
            }
            0xD => {
                let dst = self.host(rd);
                emit_mov_rr(&mut self.buf, false, SCRATCH, dst);
                emit_imul_rr(&mut self.buf, false, SCRATCH, rs);
                // IMUL leaves SF/ZF undefined.
                emit_test_rr(&mut self.buf, false, SCRATCH, SCRATCH);
                self.store_result_t(rd);
                self.set_nz();
            }
            0xE => {
                let dst = self.host(rd);
                emit_mov_rr(&mut self.buf, false, SCRATCH, dst);
                emit_mov_rr(&mut self.buf, false, SCRATCH2, rs);
                emit_not(&mut self.buf, false, SCRATCH2);
                emit_arith_rr(&mut self.buf, ArithOp::And, false, SCRATCH, SCRATCH2);
                self.store_result_t(rd);
                self.set_nz();
            }
            _ => {
                emit_mov_rr(&mut self.buf, false, SCRATCH, rs);
                emit_not(&mut self.buf, false, SCRATCH);
                emit_test_rr(&mut self.buf, false, SCRATCH, SCRATCH);
                self.store_result_t(rd);
                self.set_nz();
            }
        }
    }

    /// Hi-register ADD/CMP/MOV. ADD and MOV touch R8-R14 without
    /// setting flags; CMP sets all four.
    pub(crate) fn comp_t_hi_reg(&mut self) {
        self.comp_add_cycles_c();
        let instr = self.cur_instr.instr;
        let rd = ((instr & 0x7) | ((instr >> 4) & 0x8)) as usize;
        let rs = ((instr >> 3) & 0xF) as usize;
        match (instr >> 8) & 0x3 {
            0 => {
                let first = self.guest_operand(rd);
                self.emit_mov_eax(&first);
                match self.guest_operand(rs) {
                    Operand::Imm(v) => {
                        emit_arith_ri(&mut self.buf, ArithOp::Add, false, SCRATCH, v as i32)
                    }
                    Operand::Host(r) => {
                        emit_arith_rr(&mut self.buf, ArithOp::Add, false, SCRATCH, r)
                    }
                }
                self.store_result_t(rd as u32);
            }
            1 => {
                let first = self.guest_operand(rd);
                self.emit_mov_eax(&first);
                match self.guest_operand(rs) {
                    Operand::Imm(v) => {
                        emit_arith_ri(&mut self.buf, ArithOp::Cmp, false, SCRATCH, v as i32)
                    }
                    Operand::Host(r) => {
                        emit_arith_rr(&mut self.buf, ArithOp::Cmp, false, SCRATCH, r)
                    }
                }
                self.set_nzcv(X86Cond::Jae);
            }
            _ => {
                let dst = self.host(rd as u32);
                match self.guest_operand(rs) {
                    Operand::Imm(v) => emit_mov_ri32(&mut self.buf, dst, v),
                    Operand::Host(r) => emit_mov_rr(&mut self.buf, false, dst, r),
                }
                self.reg_cache.mark_dirty(rd);
            }
        }
    }
}
