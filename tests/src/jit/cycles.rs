//! Cycle accounting of compiled blocks against the shared timing
//! helpers.

use arm_core::cpu::{FLAG_T, FLAG_Z};
use arm_core::timings::{cycles_c, cycles_ci};
use arm_core::FetchedInstr;
use arm_jit::Compiler;

use super::make_cpu;

#[test]
fn secondary_core_prices_fetches_from_the_timing_table() {
    let mut mem = vec![];
    let mut cpu = make_cpu(1, &mut mem);
    cpu.cpsr = FLAG_T;
    cpu.r[15] = 0x102;

    // Three MOVs fetched from regions with different timing classes.
    let classes = [2u32, 8, 5];
    let instrs: Vec<_> = classes
        .iter()
        .map(|&cc| FetchedInstr::new(true, 0x2001, cc))
        .collect();
    let expected: u32 = classes.iter().map(|&cc| cycles_c(1, true, 0, cc)).sum();

    let mut comp = Compiler::new().unwrap();
    let block = comp.compile_block(&cpu, &instrs);
    let cycles = unsafe { block(&mut cpu) };
    assert_eq!(cycles, expected);
}

#[test]
fn multiply_bills_internal_cycles_at_compile_time() {
    let mut mem = vec![];
    let mut cpu = make_cpu(1, &mut mem);
    cpu.cpsr = FLAG_T;
    cpu.r[15] = 0x102;
    cpu.r[0] = 3;
    cpu.r[1] = 4;

    let instrs = vec![FetchedInstr::new(true, 0x4341, 8)]; // MUL r1, r0
    let mut comp = Compiler::new().unwrap();
    let block = comp.compile_block(&cpu, &instrs);
    let cycles = unsafe { block(&mut cpu) };
    assert_eq!(cpu.r[1], 12);
    assert_eq!(cycles, cycles_ci(1, true, 0, 8, 3));
}

#[test]
fn failed_and_passed_predicates_cost_the_same_fetch() {
    let mut mem = vec![];
    let mut template = make_cpu(1, &mut mem);
    template.r[15] = 0x104;

    // MOVEQ r0, #1
    let instrs = vec![FetchedInstr::new(false, 0x03A0_0001, 8)];
    let mut comp = Compiler::new().unwrap();
    let block = comp.compile_block(&template, &instrs);

    let run = |cpsr: u32| {
        let mut mem = vec![];
        let mut cpu = make_cpu(1, &mut mem);
        cpu.cpsr = cpsr;
        cpu.r[15] = 0x104;
        (unsafe { block(&mut cpu) }, cpu.r[0])
    };
    let (taken_cycles, taken_r0) = run(FLAG_Z);
    let (skipped_cycles, skipped_r0) = run(0);
    assert_eq!(taken_r0, 1);
    assert_eq!(skipped_r0, 0);
    assert_eq!(taken_cycles, skipped_cycles);
    assert_eq!(taken_cycles, cycles_c(1, false, 0, 8));
}

#[test]
fn main_core_fetch_depends_on_halfword_alignment() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.cpsr = FLAG_T;
    cpu.r[15] = 0x102;

    // Fetches land at 0x104 (paid) and 0x106 (free).
    let instrs: Vec<_> = (0..2).map(|_| FetchedInstr::new(true, 0x2001, 1)).collect();
    let mut comp = Compiler::new().unwrap();
    let block = comp.compile_block(&cpu, &instrs);
    assert_eq!(unsafe { block(&mut cpu) }, 1);
}
