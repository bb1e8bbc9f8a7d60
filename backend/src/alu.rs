//! Native codegen for the data-processing families of the standard
//! encoding. One routine per family (arithmetic/logical, compare,
//! move); the opcode bits select the host instruction inside.
//!
//! Uniform shape: operand 2 is materialized first (into EDX unless
//! it folds to an immediate), operand 1 goes through EAX, the
//! result is copied to the destination's cache register, and the
//! guest flags are rebuilt from the host flags last.

use crate::compiler::Compiler;
use crate::x86_64::emitter::{
    emit_arith_ri, emit_arith_rr, emit_bt_ri, emit_cmc, emit_mov_ri32, emit_mov_rr, emit_movzx,
    emit_not, emit_setcc, emit_shift_ri, emit_test_rr, ArithOp, ShiftOp, X86Cond, OPC_MOVZBL,
};
use crate::x86_64::regs::{Reg, RCPSR, SCRATCH, SCRATCH2, SCRATCH3};

/// A fully evaluated instruction operand.
pub(crate) enum Operand {
    Imm(u32),
    Host(Reg),
}

/// What the barrel shifter says about the guest carry.
pub(crate) enum CarryOut {
    Unchanged,
    Const(bool),
    /// 0/1 saved in ECX at shift time.
    Saved,
}

impl Compiler {
    /// Operand for guest register `idx`. R15 folds to the shadow PC.
    pub(crate) fn guest_operand(&self, idx: usize) -> Operand {
        if idx == 15 {
            Operand::Imm(self.r15)
        } else {
            Operand::Host(self.reg_cache.host_reg(idx).unwrap())
        }
    }

    pub(crate) fn emit_mov_eax(&mut self, opnd: &Operand) {
        match *opnd {
            Operand::Imm(v) => emit_mov_ri32(&mut self.buf, SCRATCH, v),
            Operand::Host(r) => emit_mov_rr(&mut self.buf, false, SCRATCH, r),
        }
    }

    fn emit_arith_eax(&mut self, op: ArithOp, opnd: &Operand) {
        match *opnd {
            Operand::Imm(v) => emit_arith_ri(&mut self.buf, op, false, SCRATCH, v as i32),
            Operand::Host(r) => emit_arith_rr(&mut self.buf, op, false, SCRATCH, r),
        }
    }

    fn store_result(&mut self, rd: usize) {
        let host = self.reg_cache.host_reg(rd).unwrap();
        emit_mov_rr(&mut self.buf, false, host, SCRATCH);
        self.reg_cache.mark_dirty(rd);
    }

    fn apply_shifter_carry(&mut self, carry: CarryOut) {
        match carry {
            CarryOut::Unchanged => {}
            CarryOut::Const(c) => self.set_carry_const(c),
            CarryOut::Saved => self.merge_saved_carry(),
        }
    }

    /// Save the host carry into ECX, to survive until flag
    /// write-back.
    pub(crate) fn save_host_carry(&mut self) {
        emit_setcc(&mut self.buf, X86Cond::Jb, SCRATCH3);
        emit_movzx(&mut self.buf, OPC_MOVZBL, SCRATCH3, SCRATCH3);
    }

    /// Evaluate operand 2 into an [`Operand`]. `want_carry` asks
    /// for the shifter carry-out as well; without it the shift still
    /// happens but no carry is captured.
    pub(crate) fn comp_op2(&mut self, want_carry: bool) -> (Operand, CarryOut) {
        let instr = self.cur_instr.instr;
        if instr & (1 << 25) != 0 {
            let rot = ((instr >> 8) & 0xF) * 2;
            let val = (instr & 0xFF).rotate_right(rot);
            let carry = if want_carry && rot != 0 {
                CarryOut::Const(val & (1 << 31) != 0)
            } else {
                CarryOut::Unchanged
            };
            return (Operand::Imm(val), carry);
        }

        match self.guest_operand((instr & 0xF) as usize) {
            Operand::Imm(v) => emit_mov_ri32(&mut self.buf, SCRATCH2, v),
            Operand::Host(r) => emit_mov_rr(&mut self.buf, false, SCRATCH2, r),
        }
        let ty = (instr >> 5) & 0x3;
        let amount = ((instr >> 7) & 0x1F) as u8;
        let shifted = match (ty, amount) {
            (0, 0) => false,
            (0, n) => {
                emit_shift_ri(&mut self.buf, ShiftOp::Shl, false, SCRATCH2, n);
                true
            }
            (1, 0) => {
                // LSR #32: zero result, carry = bit 31. The second
                // single-bit shift moves the old top bit into CF.
                emit_shift_ri(&mut self.buf, ShiftOp::Shr, false, SCRATCH2, 31);
                emit_shift_ri(&mut self.buf, ShiftOp::Shr, false, SCRATCH2, 1);
                true
            }
            (1, n) => {
                emit_shift_ri(&mut self.buf, ShiftOp::Shr, false, SCRATCH2, n);
                true
            }
            (2, 0) => {
                // ASR #32, split so the carry-out is bit 31.
                emit_shift_ri(&mut self.buf, ShiftOp::Sar, false, SCRATCH2, 16);
                emit_shift_ri(&mut self.buf, ShiftOp::Sar, false, SCRATCH2, 16);
                true
            }
            (2, n) => {
                emit_shift_ri(&mut self.buf, ShiftOp::Sar, false, SCRATCH2, n);
                true
            }
            (3, 0) => {
                // RRX: rotate through the guest carry.
                emit_bt_ri(&mut self.buf, false, RCPSR, 29);
                emit_shift_ri(&mut self.buf, ShiftOp::Rcr, false, SCRATCH2, 1);
                true
            }
            (_, n) => {
                emit_shift_ri(&mut self.buf, ShiftOp::Ror, false, SCRATCH2, n);
                true
            }
        };
        let carry = if want_carry && shifted {
            self.save_host_carry();
            CarryOut::Saved
        } else {
            CarryOut::Unchanged
        };
        (Operand::Host(SCRATCH2), carry)
    }

    /// AND/EOR/SUB/RSB/ADD/ADC/SBC/RSC/ORR/BIC with a destination.
    pub(crate) fn comp_a_arith(&mut self) {
        self.comp_add_cycles_c();
        let instr = self.cur_instr.instr;
        let op = (instr >> 21) & 0xF;
        let s = instr & (1 << 20) != 0;
        let is_logical = matches!(op, 0x0 | 0x1 | 0xC | 0xE);
        let (op2, carry) = self.comp_op2(s && is_logical);

        let rn = self.guest_operand(((instr >> 16) & 0xF) as usize);
        let rd = ((instr >> 12) & 0xF) as usize;

        // RSB/RSC compute op2 - Rn; swap the operand roles.
        let (first, second) = if matches!(op, 0x3 | 0x7) {
            (op2, rn)
        } else {
            (rn, op2)
        };
        self.emit_mov_eax(&first);

        match op {
            0x0 => self.emit_arith_eax(ArithOp::And, &second),
            0x1 => self.emit_arith_eax(ArithOp::Xor, &second),
            0xC => self.emit_arith_eax(ArithOp::Or, &second),
            0xE => match second {
                Operand::Imm(v) => {
                    emit_arith_ri(&mut self.buf, ArithOp::And, false, SCRATCH, !v as i32)
                }
                Operand::Host(r) => {
                    emit_not(&mut self.buf, false, r);
                    emit_arith_rr(&mut self.buf, ArithOp::And, false, SCRATCH, r);
                }
            },
            0x4 => self.emit_arith_eax(ArithOp::Add, &second),
            0x5 => {
                emit_bt_ri(&mut self.buf, false, RCPSR, 29);
                self.emit_arith_eax(ArithOp::Adc, &second);
            }
            0x2 | 0x3 => self.emit_arith_eax(ArithOp::Sub, &second),
            _ => {
                // SBC/RSC: the x86 borrow is the inverted guest carry.
                emit_bt_ri(&mut self.buf, false, RCPSR, 29);
                emit_cmc(&mut self.buf);
                self.emit_arith_eax(ArithOp::Sbb, &second);
            }
        }

        self.store_result(rd);
        if s {
            if is_logical {
                self.set_nz();
                self.apply_shifter_carry(carry);
            } else if matches!(op, 0x4 | 0x5) {
                self.set_nzcv(X86Cond::Jb);
            } else {
                self.set_nzcv(X86Cond::Jae);
            }
        }
    }

    /// TST/TEQ/CMP/CMN: flags only.
    pub(crate) fn comp_a_cmp(&mut self) {
        self.comp_add_cycles_c();
        let instr = self.cur_instr.instr;
        let op = (instr >> 21) & 0xF;
        let (op2, carry) = self.comp_op2(matches!(op, 0x8 | 0x9));
        let rn = self.guest_operand(((instr >> 16) & 0xF) as usize);
        self.emit_mov_eax(&rn);

        match op {
            0x8 => {
                self.emit_arith_eax(ArithOp::And, &op2);
                self.set_nz();
                self.apply_shifter_carry(carry);
            }
            0x9 => {
                self.emit_arith_eax(ArithOp::Xor, &op2);
                self.set_nz();
                self.apply_shifter_carry(carry);
            }
            0xA => {
                self.emit_arith_eax(ArithOp::Cmp, &op2);
                self.set_nzcv(X86Cond::Jae);
            }
            _ => {
                self.emit_arith_eax(ArithOp::Add, &op2);
                self.set_nzcv(X86Cond::Jb);
            }
        }
    }

    /// MOV/MVN.
    pub(crate) fn comp_a_mov(&mut self) {
        self.comp_add_cycles_c();
        let instr = self.cur_instr.instr;
        let mvn = (instr >> 21) & 0xF == 0xF;
        let s = instr & (1 << 20) != 0;
        let (op2, carry) = self.comp_op2(s);
        let rd = ((instr >> 12) & 0xF) as usize;

        match op2 {
            Operand::Imm(v) => {
                emit_mov_ri32(&mut self.buf, SCRATCH, if mvn { !v } else { v });
            }
            Operand::Host(r) => {
                emit_mov_rr(&mut self.buf, false, SCRATCH, r);
                if mvn {
                    emit_not(&mut self.buf, false, SCRATCH);
                }
            }
        }
        if s {
            emit_test_rr(&mut self.buf, false, SCRATCH, SCRATCH);
        }
        self.store_result(rd);
        if s {
            self.set_nz();
            self.apply_shifter_carry(carry);
        }
    }
}
