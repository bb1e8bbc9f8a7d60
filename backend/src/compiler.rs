//! Block compiler.
//!
//! Turns a straight-line run of decoded guest instructions into one
//! callable host function. Per instruction the compiler either
//! invokes a native codegen routine or emits a call into the
//! interpreter, bracketed by the state synchronization the
//! interpreter expects. The block returns the total cycles it
//! consumed.

use std::io;
use std::mem;

use arm_core::cpu::{
    reg_offset, CODE_CYCLES_OFFSET, CONDITION_TABLE, CPSR_OFFSET, CUR_INSTR_OFFSET,
    NEXT_INSTR_OFFSET,
};
use arm_core::timings::{cycles_c, cycles_ci};
use arm_core::{Arm, FetchedInstr, InstrInfo, InstrKind};
use arm_interp::InterpFn;
use log::debug;

use crate::code_buffer::CodeBuffer;
use crate::reg_cache::RegCache;
use crate::x86_64::emitter::{
    emit_arith_ri, emit_arith_rr, emit_bt_ri, emit_btr_ri, emit_bts_ri, emit_call_reg,
    emit_jcc_forward, emit_jmp_forward, emit_lea, emit_lea_sib, emit_load, emit_mov_ri,
    emit_mov_ri32, emit_mov_rr, emit_movzx, emit_pop, emit_push, emit_ret, emit_setcc,
    emit_shift_cl, emit_shift_ri, emit_store, emit_store_imm, emit_test_ri, set_jump_target,
    ArithOp, ShiftOp, X86Cond, OPC_MOVZBL,
};
use crate::x86_64::regs::{
    Reg, ALLOC_ORDER, CALLEE_SAVED, CALL_ARG_REGS, RCPSR, RCPU, RCYCLES, SCRATCH, SCRATCH2,
    SCRATCH3,
};

/// Entry point of a compiled block. Takes the guest CPU state,
/// returns the cycles the block consumed.
pub type CompiledBlock = unsafe extern "C" fn(*mut Arm) -> u32;

/// Native codegen routine for one instruction family.
pub(crate) type CompFunc = fn(&mut Compiler);

pub struct Compiler {
    pub(crate) buf: CodeBuffer,
    pub(crate) reg_cache: RegCache,
    /// Encoding mode of the block being compiled.
    pub(crate) thumb: bool,
    pub(crate) num: u32,
    /// Compile-time shadow of the guest PC (pipeline value).
    pub(crate) r15: u32,
    pub(crate) cur_instr: FetchedInstr,
    /// Cycles of unconditional instructions, folded into the
    /// epilogue instead of added at run time.
    pub(crate) constant_cycles: u32,
    /// Whether the CPSR host register differs from guest memory.
    pub(crate) cpsr_dirty: bool,
    generation: u32,
}

impl Compiler {
    pub fn new() -> io::Result<Self> {
        Ok(Self::from_buffer(CodeBuffer::with_default_size()?))
    }

    /// Arena size override, mainly for exhaustion tests.
    pub fn with_buffer_size(size: usize) -> io::Result<Self> {
        Ok(Self::from_buffer(CodeBuffer::new(size)?))
    }

    fn from_buffer(buf: CodeBuffer) -> Self {
        Self {
            buf,
            reg_cache: RegCache::new(ALLOC_ORDER, &[]),
            thumb: false,
            num: 0,
            r15: 0,
            cur_instr: FetchedInstr::new(false, 0, 0),
            constant_cycles: 0,
            cpsr_dirty: false,
            generation: 0,
        }
    }

    /// Bumped every time the arena is reset. Callers key their block
    /// maps on this: a mismatch means every previously returned
    /// block pointer is dead.
    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Throw away all generated code.
    pub fn reset(&mut self) {
        self.buf.set_offset(0);
        self.generation = self.generation.wrapping_add(1);
        debug!("code arena reset, generation {}", self.generation);
    }

    /// Compile one block. `cpu` supplies the entry state (encoding
    /// mode, core number, PC); `instrs` is the decoded run.
    ///
    /// The returned pointer stays valid until the arena resets;
    /// check [`generation`](Self::generation) before reuse.
    pub fn compile_block(&mut self, cpu: &Arm, instrs: &[FetchedInstr]) -> CompiledBlock {
        assert!(!instrs.is_empty());
        if self.buf.almost_full() {
            self.reset();
        }
        let entry = self.buf.offset();

        self.thumb = cpu.thumb();
        self.num = cpu.num;
        self.r15 = cpu.r[15];
        self.constant_cycles = 0;
        self.cpsr_dirty = false;
        self.reg_cache = RegCache::new(ALLOC_ORDER, instrs);

        for &reg in CALLEE_SAVED {
            emit_push(&mut self.buf, reg);
        }
        // Keep RSP 16-byte aligned for calls out of the block.
        emit_arith_ri(&mut self.buf, ArithOp::Sub, true, Reg::Rsp, 8);
        emit_mov_rr(&mut self.buf, true, RCPU, CALL_ARG_REGS[0]);
        emit_mov_ri(&mut self.buf, false, RCYCLES, 0);
        self.load_cpsr();

        let width = if self.thumb { 2 } else { 4 };
        for (i, instr) in instrs.iter().enumerate() {
            self.r15 = self.r15.wrapping_add(width);
            self.cur_instr = *instr;
            let last = i == instrs.len() - 1;
            let comp = get_comp_func(&instr.info);

            if comp.is_none() || last {
                self.sync_boundary(instr, last);
                if comp.is_none() {
                    self.save_cpsr();
                }
            }
            if comp.is_some() {
                self.reg_cache.prepare(&mut self.buf, i);
            } else {
                self.reg_cache.flush(&mut self.buf);
            }

            if self.thumb {
                match comp {
                    Some(f) => f(self),
                    None => self.comp_fallback(instr, last),
                }
                continue;
            }

            let cond = instr.cond();
            if cond == 0xF {
                // Only BLX <imm> executes in this space; everything
                // else is billed and skipped.
                if instr.info.kind == InstrKind::ABlxImm {
                    self.comp_fallback(instr, last);
                } else {
                    self.comp_add_cycles_c();
                }
            } else if cond == 0xE {
                match comp {
                    Some(f) => f(self),
                    None => self.comp_fallback(instr, last),
                }
            } else {
                let skip_execute = self.emit_cond_skip(cond);
                match comp {
                    Some(f) => f(self),
                    None => self.comp_fallback(instr, last),
                }
                let skip_failed = emit_jmp_forward(&mut self.buf);
                set_jump_target(&mut self.buf, skip_execute);
                // Failed predicate still pays the code fetch.
                self.comp_add_cycles_c();
                set_jump_target(&mut self.buf, skip_failed);
            }
        }

        self.reg_cache.flush(&mut self.buf);
        self.save_cpsr();
        emit_lea(
            &mut self.buf,
            false,
            SCRATCH,
            RCYCLES,
            self.constant_cycles as i32,
        );
        emit_arith_ri(&mut self.buf, ArithOp::Add, true, Reg::Rsp, 8);
        for &reg in CALLEE_SAVED.iter().rev() {
            emit_pop(&mut self.buf, reg);
        }
        emit_ret(&mut self.buf);

        debug!(
            "compiled {}-instruction block at {:#x}, {} bytes",
            instrs.len(),
            entry,
            self.buf.offset() - entry
        );
        // SAFETY: entry..offset holds a complete function following
        // the CompiledBlock ABI.
        unsafe { mem::transmute::<*const u8, CompiledBlock>(self.buf.ptr_at(entry)) }
    }

    // -- State synchronization --

    pub(crate) fn load_cpsr(&mut self) {
        assert!(!self.cpsr_dirty, "reloading CPSR would drop pending flags");
        emit_load(&mut self.buf, false, RCPSR, RCPU, CPSR_OFFSET);
    }

    pub(crate) fn save_cpsr(&mut self) {
        if self.cpsr_dirty {
            emit_store(&mut self.buf, false, RCPSR, RCPU, CPSR_OFFSET);
            self.cpsr_dirty = false;
        }
    }

    /// Store the per-instruction bookkeeping the interpreter (and,
    /// on the last instruction, the caller) reads from memory.
    fn sync_boundary(&mut self, instr: &FetchedInstr, last: bool) {
        emit_store_imm(&mut self.buf, false, RCPU, reg_offset(15), self.r15 as i32);
        emit_store_imm(
            &mut self.buf,
            false,
            RCPU,
            CODE_CYCLES_OFFSET,
            instr.code_cycles as i32,
        );
        emit_store_imm(
            &mut self.buf,
            false,
            RCPU,
            CUR_INSTR_OFFSET,
            instr.instr as i32,
        );
        if last {
            emit_store_imm(
                &mut self.buf,
                false,
                RCPU,
                NEXT_INSTR_OFFSET,
                instr.next_instr[0] as i32,
            );
            emit_store_imm(
                &mut self.buf,
                false,
                RCPU,
                NEXT_INSTR_OFFSET + 4,
                instr.next_instr[1] as i32,
            );
        }
    }

    // -- Conditional execution --

    /// Emit the predicate test; returns the forward-jump patch
    /// offset taken when the predicate fails.
    fn emit_cond_skip(&mut self, cond: u8) -> usize {
        if cond < 8 {
            // Conditions 0..7 test a single flag. Map the pair index
            // to the flag's bit position within the top nibble.
            let flag = ((!(cond >> 1) & 1) << 1) | (((cond >> 2) & 1) ^ ((cond >> 1) & 1));
            emit_bt_ri(&mut self.buf, false, RCPSR, 28 + flag);
            let cc = if cond & 1 != 0 {
                X86Cond::Jb
            } else {
                X86Cond::Jae
            };
            emit_jcc_forward(&mut self.buf, cc)
        } else {
            // Compound conditions: index the truth table with the
            // flag nibble.
            emit_mov_rr(&mut self.buf, false, SCRATCH3, RCPSR);
            emit_shift_ri(&mut self.buf, ShiftOp::Shr, false, SCRATCH3, 28);
            emit_mov_ri32(&mut self.buf, SCRATCH, 1);
            emit_shift_cl(&mut self.buf, ShiftOp::Shl, false, SCRATCH);
            emit_test_ri(
                &mut self.buf,
                false,
                SCRATCH,
                CONDITION_TABLE[cond as usize] as u32,
            );
            emit_jcc_forward(&mut self.buf, X86Cond::Je)
        }
    }

    // -- Interpreter fallback --

    fn comp_fallback(&mut self, instr: &FetchedInstr, last: bool) {
        let handler: InterpFn = if self.thumb {
            arm_interp::THUMB_TABLE[arm_interp::thumb_icode(instr.instr)]
        } else if instr.info.kind == InstrKind::ABlxImm {
            arm_interp::arm::blx_imm
        } else {
            arm_interp::ARM_TABLE[arm_interp::arm_icode(instr.instr)]
        };
        emit_mov_rr(&mut self.buf, true, CALL_ARG_REGS[0], RCPU);
        emit_mov_ri(&mut self.buf, true, SCRATCH, handler as usize as u64);
        emit_call_reg(&mut self.buf, SCRATCH);
        // The handler returns its cycle cost.
        emit_arith_rr(&mut self.buf, ArithOp::Add, false, RCYCLES, SCRATCH);
        if !last {
            self.load_cpsr();
        }
    }

    // -- Cycle accounting --

    fn add_cycles(&mut self, cycles: u32) {
        if !self.thumb && self.cur_instr.cond() < 0xE {
            if cycles > 0 {
                emit_arith_ri(&mut self.buf, ArithOp::Add, false, RCYCLES, cycles as i32);
            }
        } else {
            self.constant_cycles += cycles;
        }
    }

    /// Account the code fetch of the current instruction.
    pub(crate) fn comp_add_cycles_c(&mut self) {
        let cycles = cycles_c(self.num, self.thumb, self.r15, self.cur_instr.code_cycles);
        self.add_cycles(cycles);
    }

    /// Account the code fetch plus `internal` execute cycles.
    pub(crate) fn comp_add_cycles_ci(&mut self, internal: u32) {
        let cycles = cycles_ci(
            self.num,
            self.thumb,
            self.r15,
            self.cur_instr.code_cycles,
            internal,
        );
        self.add_cycles(cycles);
    }

    // -- Flag write-back --
    //
    // These run right after the instruction that produced the host
    // flags; everything they emit (SETcc, MOVZX, LEA) preserves
    // EFLAGS until the final AND/OR.

    /// Fold host SF/ZF into the guest N/Z bits.
    pub(crate) fn set_nz(&mut self) {
        emit_setcc(&mut self.buf, X86Cond::Js, SCRATCH);
        emit_movzx(&mut self.buf, OPC_MOVZBL, SCRATCH, SCRATCH);
        emit_setcc(&mut self.buf, X86Cond::Je, SCRATCH2);
        emit_movzx(&mut self.buf, OPC_MOVZBL, SCRATCH2, SCRATCH2);
        emit_lea_sib(&mut self.buf, false, SCRATCH, SCRATCH2, SCRATCH, 1);
        emit_shift_ri(&mut self.buf, ShiftOp::Shl, false, SCRATCH, 30);
        emit_arith_ri(&mut self.buf, ArithOp::And, false, RCPSR, 0x3FFF_FFFF);
        emit_arith_rr(&mut self.buf, ArithOp::Or, false, RCPSR, SCRATCH);
        self.cpsr_dirty = true;
    }

    /// Fold host flags into all four guest flag bits. `carry_cc`
    /// selects how the guest carry reads the host carry (set for
    /// additions, inverted for subtractions).
    pub(crate) fn set_nzcv(&mut self, carry_cc: X86Cond) {
        emit_setcc(&mut self.buf, X86Cond::Jo, SCRATCH);
        emit_movzx(&mut self.buf, OPC_MOVZBL, SCRATCH, SCRATCH);
        emit_setcc(&mut self.buf, carry_cc, SCRATCH2);
        emit_movzx(&mut self.buf, OPC_MOVZBL, SCRATCH2, SCRATCH2);
        // edx = C<<1 | V
        emit_lea_sib(&mut self.buf, false, SCRATCH2, SCRATCH, SCRATCH2, 1);
        emit_setcc(&mut self.buf, X86Cond::Js, SCRATCH);
        emit_movzx(&mut self.buf, OPC_MOVZBL, SCRATCH, SCRATCH);
        emit_setcc(&mut self.buf, X86Cond::Je, SCRATCH3);
        emit_movzx(&mut self.buf, OPC_MOVZBL, SCRATCH3, SCRATCH3);
        // eax = N<<1 | Z
        emit_lea_sib(&mut self.buf, false, SCRATCH, SCRATCH3, SCRATCH, 1);
        // eax = N<<3 | Z<<2 | C<<1 | V
        emit_lea_sib(&mut self.buf, false, SCRATCH, SCRATCH2, SCRATCH, 2);
        emit_shift_ri(&mut self.buf, ShiftOp::Shl, false, SCRATCH, 28);
        emit_arith_ri(&mut self.buf, ArithOp::And, false, RCPSR, 0x0FFF_FFFF);
        emit_arith_rr(&mut self.buf, ArithOp::Or, false, RCPSR, SCRATCH);
        self.cpsr_dirty = true;
    }

    /// Write a compile-time-known guest carry.
    pub(crate) fn set_carry_const(&mut self, carry: bool) {
        if carry {
            emit_bts_ri(&mut self.buf, false, RCPSR, 29);
        } else {
            emit_btr_ri(&mut self.buf, false, RCPSR, 29);
        }
        self.cpsr_dirty = true;
    }

    /// Write the guest carry from the 0/1 value saved in ECX.
    pub(crate) fn merge_saved_carry(&mut self) {
        emit_arith_ri(
            &mut self.buf,
            ArithOp::And,
            false,
            RCPSR,
            0xDFFF_FFFFu32 as i32,
        );
        emit_shift_ri(&mut self.buf, ShiftOp::Shl, false, SCRATCH3, 29);
        emit_arith_rr(&mut self.buf, ArithOp::Or, false, RCPSR, SCRATCH3);
        self.cpsr_dirty = true;
    }
}

/// Native routine for an instruction family, or `None` for the
/// interpreter path. Control transfers always fall back: they end
/// the block anyway and their state updates are involved.
pub(crate) fn get_comp_func(info: &InstrInfo) -> Option<CompFunc> {
    use InstrKind::*;
    if info.branches {
        return None;
    }
    match info.kind {
        AArithImm | AArithRegImm => Some(Compiler::comp_a_arith),
        AMovImm | AMovRegImm => Some(Compiler::comp_a_mov),
        ACmpImm | ACmpRegImm => Some(Compiler::comp_a_cmp),

        TLslImm | TLsrImm | TAsrImm => Some(Compiler::comp_t_shift_imm),
        TAddReg | TSubReg | TAddImm3 | TSubImm3 => Some(Compiler::comp_t_add_sub),
        TMovImm8 | TCmpImm8 | TAddImm8 | TSubImm8 => Some(Compiler::comp_t_alu_imm8),
        TAnd | TEor | TAdc | TSbc | TTst | TNeg | TCmp | TCmn | TOrr | TMul | TBic | TMvn => {
            Some(Compiler::comp_t_alu_reg)
        }
        TAddHi | TCmpHi | TMovHi => Some(Compiler::comp_t_hi_reg),

        // Register-specified shifts cost an interlock cycle and are
        // rare in hot code; not worth a native path.
        _ => None,
    }
}
