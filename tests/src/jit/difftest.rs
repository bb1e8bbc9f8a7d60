//! Differential testing: random instruction streams run through a
//! compiled block and through the interpreter, starting from the
//! same state, must end in the same state with the same cycle total.
//!
//! Streams never contain a control transfer before the last slot,
//! matching how the fetch stage cuts blocks.

use arm_core::cpu::FLAG_T;
use arm_core::{Arm, FetchedInstr};
use arm_jit::Compiler;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const MEM_SIZE: u32 = 4096;
const BASE: u32 = 0x400;

fn gen_arm(rng: &mut ChaCha8Rng) -> u32 {
    loop {
        let cond = rng.gen_range(0..0xFu32);
        let word = if rng.gen_ratio(1, 8) {
            // MUL rd, rm, rs
            let rd = rng.gen_range(0..8u32);
            let rm = rng.gen_range(0..8u32);
            let rs = rng.gen_range(0..8u32);
            let s = rng.gen_range(0..2u32);
            (cond << 28) | (s << 20) | (rd << 16) | (rs << 8) | 0x90 | rm
        } else {
            let op = rng.gen_range(0..16u32);
            let compare = (0x8..=0xB).contains(&op);
            let s = if compare { 1 } else { rng.gen_range(0..2u32) };
            let rn = rng.gen_range(0..16u32);
            let rd = if compare { 0 } else { rng.gen_range(0..15u32) };
            let op2 = match rng.gen_range(0..3u32) {
                // Rotated immediate.
                0 => (1 << 25) | (rng.gen_range(0..16u32) << 8) | rng.gen_range(0..256u32),
                // Register with immediate shift.
                1 => {
                    (rng.gen_range(0..32u32) << 7)
                        | (rng.gen_range(0..4u32) << 5)
                        | rng.gen_range(0..16u32)
                }
                // Register with register shift.
                _ => {
                    (rng.gen_range(0..15u32) << 8)
                        | (rng.gen_range(0..4u32) << 5)
                        | (1 << 4)
                        | rng.gen_range(0..16u32)
                }
            };
            (cond << 28) | (op << 21) | (s << 20) | (rn << 16) | (rd << 12) | op2
        };
        if !arm_core::decode::decode(false, word).branches {
            return word;
        }
    }
}

fn gen_thumb(rng: &mut ChaCha8Rng) -> u32 {
    loop {
        let word = match rng.gen_range(0..9u32) {
            // Shift by immediate.
            0 => {
                (rng.gen_range(0..3u32) << 11)
                    | (rng.gen_range(0..32u32) << 6)
                    | (rng.gen_range(0..8u32) << 3)
                    | rng.gen_range(0..8u32)
            }
            // Three-operand add/sub.
            1 => {
                0x1800
                    | (rng.gen_range(0..4u32) << 9)
                    | (rng.gen_range(0..8u32) << 6)
                    | (rng.gen_range(0..8u32) << 3)
                    | rng.gen_range(0..8u32)
            }
            // MOV/CMP/ADD/SUB immediate.
            2 => {
                0x2000
                    | (rng.gen_range(0..4u32) << 11)
                    | (rng.gen_range(0..8u32) << 8)
                    | rng.gen_range(0..256u32)
            }
            // Two-register ALU, all sixteen opcodes.
            3 => {
                0x4000
                    | (rng.gen_range(0..16u32) << 6)
                    | (rng.gen_range(0..8u32) << 3)
                    | rng.gen_range(0..8u32)
            }
            // Hi-register ADD/CMP/MOV.
            4 => {
                let op = rng.gen_range(0..3u32);
                let rd = if op == 1 {
                    rng.gen_range(0..16u32)
                } else {
                    rng.gen_range(0..15u32)
                };
                let rs = rng.gen_range(0..16u32);
                0x4400 | (op << 8) | ((rd & 8) << 4) | (rs << 3) | (rd & 7)
            }
            // Load/store word or byte, immediate offset.
            5 => {
                0x6000
                    | (rng.gen_range(0..4u32) << 11)
                    | (rng.gen_range(0..32u32) << 6)
                    | (rng.gen_range(0..8u32) << 3)
                    | rng.gen_range(0..8u32)
            }
            // PC-relative load.
            6 => 0x4800 | (rng.gen_range(0..8u32) << 8) | rng.gen_range(0..256u32),
            // SP-relative load/store.
            7 => {
                0x9000
                    | (rng.gen_range(0..2u32) << 11)
                    | (rng.gen_range(0..8u32) << 8)
                    | rng.gen_range(0..256u32)
            }
            // PUSH, or POP without the PC bit.
            _ => {
                if rng.gen_bool(0.5) {
                    0xB400 | (rng.gen_range(0..2u32) << 8) | rng.gen_range(1..256u32)
                } else {
                    0xBC00 | rng.gen_range(1..256u32)
                }
            }
        };
        if !arm_core::decode::decode(true, word).branches {
            return word;
        }
    }
}

fn run_stream(comp: &mut Compiler, rng: &mut ChaCha8Rng, thumb: bool, num: u32, len: usize) {
    let width = if thumb { 2 } else { 4 };
    let words: Vec<u32> = (0..len)
        .map(|_| if thumb { gen_thumb(rng) } else { gen_arm(rng) })
        .collect();
    let mut instrs: Vec<FetchedInstr> = words
        .iter()
        .map(|&w| FetchedInstr::new(thumb, w, rng.gen_range(0..8u32)))
        .collect();
    instrs[len - 1].next_instr = [rng.gen(), rng.gen()];

    let mut mem_jit = vec![0u8; MEM_SIZE as usize];
    rng.fill(&mut mem_jit[..]);
    let mut mem_ref = mem_jit.clone();

    let mut jit = Arm::new(num, mem_jit.as_mut_ptr(), MEM_SIZE);
    for r in jit.r.iter_mut().take(15) {
        *r = rng.gen();
    }
    jit.r[15] = BASE + width;
    jit.cpsr = (rng.gen::<u32>() & 0xF000_0000) | if thumb { FLAG_T } else { 0 };

    let mut reference = Arm::new(num, mem_ref.as_mut_ptr(), MEM_SIZE);
    reference.r = jit.r;
    reference.cpsr = jit.cpsr;

    let block = comp.compile_block(&jit, &instrs);
    // SAFETY: compiled for this CPU's mode, core, and entry PC;
    // `mem_jit` outlives the call.
    let jit_cycles = unsafe { block(&mut jit) };

    let mut ref_cycles = 0;
    for (i, fetched) in instrs.iter().enumerate() {
        // SAFETY: `mem_ref` outlives the call.
        ref_cycles += unsafe { arm_interp::step(&mut reference, fetched, i == len - 1) };
    }

    assert_eq!(jit.r, reference.r, "registers diverged on {words:08X?}");
    assert_eq!(jit.cpsr, reference.cpsr, "flags diverged on {words:08X?}");
    assert_eq!(jit_cycles, ref_cycles, "cycles diverged on {words:08X?}");
    assert_eq!(jit.cur_instr, reference.cur_instr);
    assert_eq!(jit.code_cycles, reference.code_cycles);
    assert_eq!(jit.next_instr, reference.next_instr);
    assert_eq!(mem_jit, mem_ref, "memory diverged on {words:08X?}");
}

#[test]
fn arm_streams_match_the_interpreter() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED_0001);
    let mut comp = Compiler::new().unwrap();
    for _ in 0..150 {
        run_stream(&mut comp, &mut rng, false, 0, 12);
    }
}

#[test]
fn arm_streams_match_on_the_secondary_core() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED_0002);
    let mut comp = Compiler::new().unwrap();
    for _ in 0..100 {
        run_stream(&mut comp, &mut rng, false, 1, 12);
    }
}

#[test]
fn thumb_streams_match_the_interpreter() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED_0003);
    let mut comp = Compiler::new().unwrap();
    for _ in 0..150 {
        run_stream(&mut comp, &mut rng, true, 0, 16);
    }
}

#[test]
fn thumb_streams_match_on_the_secondary_core() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED_0004);
    let mut comp = Compiler::new().unwrap();
    for _ in 0..100 {
        run_stream(&mut comp, &mut rng, true, 1, 16);
    }
}

#[test]
fn single_instruction_blocks_match() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5EED_0005);
    let mut comp = Compiler::new().unwrap();
    for i in 0..200 {
        run_stream(&mut comp, &mut rng, i % 2 == 0, 0, 1);
    }
}
