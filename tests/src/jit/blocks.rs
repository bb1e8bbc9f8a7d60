//! End-to-end checks: compile a block, run it, inspect the state.

use arm_core::cpu::{FLAG_C, FLAG_N, FLAG_T, FLAG_Z};
use arm_jit::Compiler;

use super::{fetch_block, make_cpu};

#[test]
fn thumb_native_alu_block() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.cpsr = FLAG_T;
    cpu.r[15] = 0x102; // block at 0x100

    // MOV r2, #42; ADD r2, #7; SUB r3, r2, #1
    let instrs = fetch_block(true, &[0x222A, 0x3207, 0x1E53]);
    let mut comp = Compiler::new().unwrap();
    let block = comp.compile_block(&cpu, &instrs);
    // SAFETY: freshly compiled for this CPU's mode and entry PC.
    let cycles = unsafe { block(&mut cpu) };

    assert_eq!(cpu.r[2], 49);
    assert_eq!(cpu.r[3], 48);
    // The final SUB leaves C set, N and Z clear.
    assert_eq!(cpu.cpsr, FLAG_T | FLAG_C);
    // Fetches at 0x104 (1) + 0x106 (free) + 0x108 (1).
    assert_eq!(cycles, 2);
    assert_eq!(cpu.r[15], 0x108);
    assert_eq!(cpu.cur_instr, 0x1E53);
}

#[test]
fn arm_native_alu_block() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.r[15] = 0x104;
    cpu.r[1] = 700;
    cpu.r[2] = 42;

    // ADDS r0, r1, r2; ORR r3, r0, #0xFF00; MVN r4, r2
    let instrs = fetch_block(false, &[0xE091_0002, 0xE380_3CFF, 0xE1E0_4002]);
    let mut comp = Compiler::new().unwrap();
    let block = comp.compile_block(&cpu, &instrs);
    let cycles = unsafe { block(&mut cpu) };

    assert_eq!(cpu.r[0], 742);
    assert_eq!(cpu.r[3], 742 | 0xFF00);
    assert_eq!(cpu.r[4], !42u32);
    assert_eq!(cpu.cpsr, 0); // ADDS of small positives clears NZCV
    assert_eq!(cycles, 3);
}

#[test]
fn block_reports_successor_pcs() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.cpsr = FLAG_T;
    cpu.r[15] = 0x102;

    let mut instrs = fetch_block(true, &[0x2201]); // MOV r2, #1
    instrs[0].next_instr = [0x102, 0x300];
    let mut comp = Compiler::new().unwrap();
    let block = comp.compile_block(&cpu, &instrs);
    unsafe { block(&mut cpu) };
    assert_eq!(cpu.next_instr, [0x102, 0x300]);
}

#[test]
fn fallback_sees_flushed_registers() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.cpsr = FLAG_T;
    cpu.r[15] = 0x102;
    cpu.r[1] = 1;

    // MOV r0, #8 runs natively; LSL r1, r0 is a register-specified
    // shift and calls into the interpreter, which must observe the
    // freshly written r0 in memory.
    let instrs = fetch_block(true, &[0x2008, 0x4081]);
    let mut comp = Compiler::new().unwrap();
    let block = comp.compile_block(&cpu, &instrs);
    let cycles = unsafe { block(&mut cpu) };

    assert_eq!(cpu.r[1], 1 << 8);
    assert_eq!(cpu.cpsr, FLAG_T); // NZC all clear after the shift
    // MOV pays its fetch (1); the shift's fetch is the free halfword
    // plus one interlock cycle.
    assert_eq!(cycles, 2);
}

#[test]
fn thumb_neg_carry_and_mvn_preserving_it() {
    // NEG r3, r2; MVN r3, r2. NEG's carry means "no borrow"; the
    // following MVN writes only N and Z.
    let mut mem = vec![];
    let mut entry = make_cpu(0, &mut mem);
    entry.cpsr = FLAG_T;
    entry.r[15] = 0x102;
    let instrs = fetch_block(true, &[0x4253, 0x43D3]);
    let mut comp = Compiler::new().unwrap();
    let block = comp.compile_block(&entry, &instrs);

    let run = |r2: u32| {
        let mut mem = vec![];
        let mut cpu = make_cpu(0, &mut mem);
        cpu.cpsr = FLAG_T;
        cpu.r[15] = 0x102;
        cpu.r[2] = r2;
        unsafe { block(&mut cpu) };
        (cpu.r[3], cpu.cpsr)
    };

    // 0 - 5 borrows, so C ends clear.
    let (r3, cpsr) = run(5);
    assert_eq!(r3, !5);
    assert_eq!(cpsr, FLAG_T | FLAG_N);

    // 0 - 0 does not borrow; MVN keeps the C from the NEG.
    let (r3, cpsr) = run(0);
    assert_eq!(r3, 0xFFFF_FFFF);
    assert_eq!(cpsr, FLAG_T | FLAG_N | FLAG_C);
}

#[test]
fn mixed_block_bills_native_and_fallback_cycles() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.r[15] = 0x104;
    cpu.r[0] = 7;
    cpu.r[2] = 0xA1B2_C3D4;
    cpu.r[3] = 0x80;

    // SUBS r0, r0, r0 compiles natively and sets Z; MOVEQ r1, #5
    // executes under the predicate; STR r2, [r3] goes through the
    // interpreter.
    let instrs = fetch_block(false, &[0xE050_0000, 0x03A0_1005, 0xE583_2000]);
    let mut comp = Compiler::new().unwrap();
    let block = comp.compile_block(&cpu, &instrs);
    let cycles = unsafe { block(&mut cpu) };

    assert_eq!(cpu.r[0], 0);
    assert_eq!(cpu.r[1], 5);
    assert_eq!(&mem[0x80..0x84], &0xA1B2_C3D4u32.to_le_bytes());
    // One word fetch per instruction, the fallback's included.
    assert_eq!(cycles, 3);
}

#[test]
fn cpsr_is_written_back() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.cpsr = FLAG_T;
    cpu.r[15] = 0x102;

    let instrs = fetch_block(true, &[0x2000]); // MOV r0, #0
    let mut comp = Compiler::new().unwrap();
    let block = comp.compile_block(&cpu, &instrs);
    unsafe { block(&mut cpu) };
    assert_eq!(cpu.cpsr, FLAG_T | FLAG_Z);
}
