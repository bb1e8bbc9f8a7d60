//! Control transfer, memory access, and block-level stepping.

use arm_core::cpu::{FLAG_T, FLAG_Z};
use arm_core::FetchedInstr;

use super::{exec, make_cpu};

#[test]
fn branch_is_pc_relative_with_pipeline_offset() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.r[15] = 0x104; // instruction at 0x100
    exec(&mut cpu, false, 0xEA00_0001); // B +4
    // Target 0x108 + 4, landing PC reads target + 8.
    assert_eq!(cpu.r[15], 0x10C + 8);
    assert!(!cpu.thumb());
}

#[test]
fn branch_with_link_stores_return_address() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.r[15] = 0x104;
    exec(&mut cpu, false, 0xEB00_0001); // BL +4
    assert_eq!(cpu.r[14], 0x104);
    assert_eq!(cpu.r[15], 0x10C + 8);
}

#[test]
fn bx_enters_thumb_on_odd_target() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.r[0] = 0x201;
    exec(&mut cpu, false, 0xE12F_FF10); // BX r0
    assert!(cpu.thumb());
    assert_eq!(cpu.r[15], 0x200 + 4);
}

#[test]
fn blx_imm_enters_thumb_with_halfword_bit() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.r[15] = 0x104;
    exec(&mut cpu, false, 0xFB00_0001); // BLX 0x10E
    assert!(cpu.thumb());
    assert_eq!(cpu.r[14], 0x104);
    assert_eq!(cpu.r[15], (0x10E & !1) + 4);
}

#[test]
fn thumb_bl_pair() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.cpsr = FLAG_T;
    cpu.r[15] = 0x202; // setup half at 0x200
    exec(&mut cpu, true, 0xF000); // BL setup, high offset 0
    assert_eq!(cpu.r[14], 0x204);
    exec(&mut cpu, true, 0xF802); // BL offset, low offset 4
    assert_eq!(cpu.r[15], 0x208 + 4);
    assert_eq!(cpu.r[14], 0x205); // return address with the Thumb bit
    assert!(cpu.thumb());
}

#[test]
fn thumb_push_stores_descending() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.cpsr = FLAG_T;
    cpu.r[13] = 0x40;
    cpu.r[0] = 0x11;
    cpu.r[1] = 0x22;
    cpu.r[14] = 0x33;
    exec(&mut cpu, true, 0xB503); // PUSH {r0, r1, lr}
    assert_eq!(cpu.r[13], 0x34);
    assert_eq!(u32::from_le_bytes(mem[0x34..0x38].try_into().unwrap()), 0x11);
    assert_eq!(u32::from_le_bytes(mem[0x38..0x3C].try_into().unwrap()), 0x22);
    assert_eq!(u32::from_le_bytes(mem[0x3C..0x40].try_into().unwrap()), 0x33);
}

#[test]
fn thumb_pop_pc_interworks() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.cpsr = FLAG_T;
    mem[0x40..0x44].copy_from_slice(&0xCAFE_F00Du32.to_le_bytes());
    mem[0x44..0x48].copy_from_slice(&0x31u32.to_le_bytes());
    cpu.r[13] = 0x40;
    exec(&mut cpu, true, 0xBD01); // POP {r0, pc}
    assert_eq!(cpu.r[0], 0xCAFE_F00D);
    assert_eq!(cpu.r[13], 0x48);
    assert!(cpu.thumb());
    assert_eq!(cpu.r[15], 0x30 + 4);
}

#[test]
fn thumb_conditional_branch_checks_its_own_condition() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.cpsr = FLAG_T | FLAG_Z;
    cpu.r[15] = 0x102;
    exec(&mut cpu, true, 0xD001); // BEQ +2
    assert_eq!(cpu.r[15], 0x106 + 4);

    cpu.cpsr = FLAG_T;
    cpu.r[15] = 0x102;
    exec(&mut cpu, true, 0xD001);
    assert_eq!(cpu.r[15], 0x104); // fell through
}

#[test]
fn failed_predicate_only_pays_the_fetch() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.r[15] = 4;
    let cycles = exec(&mut cpu, false, 0x13A0_0001); // MOVNE r0, #1, Z clear
    assert_eq!(cpu.r[0], 1);
    assert_eq!(cycles, 1);

    cpu.cpsr = FLAG_Z;
    cpu.r[0] = 0;
    cpu.r[15] = 4;
    let cycles = exec(&mut cpu, false, 0x13A0_0001); // predicate fails
    assert_eq!(cpu.r[0], 0);
    assert_eq!(cycles, 1);
}

#[test]
fn load_store_roundtrip_with_address_masking() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.r[0] = 0xDEAD_BEEF;
    cpu.r[1] = 0x100;
    exec(&mut cpu, false, 0xE581_0004); // STR r0, [r1, #4]
    exec(&mut cpu, false, 0xE591_2004); // LDR r2, [r1, #4]
    assert_eq!(cpu.r[2], 0xDEAD_BEEF);

    // Out-of-range addresses wrap into the backing buffer.
    cpu.r[1] = super::MEM_SIZE * 4 + 0x100;
    exec(&mut cpu, false, 0xE591_3004);
    assert_eq!(cpu.r[3], 0xDEAD_BEEF);
}

#[test]
fn step_records_block_boundary_state() {
    let mut mem = vec![];
    let mut cpu = make_cpu(0, &mut mem);
    cpu.r[15] = 0x104;
    let mut fetched = FetchedInstr::new(false, 0xE3A0_0007, 3); // MOV r0, #7
    fetched.next_instr = [0x108, 0x200];
    // SAFETY: mem outlives the call.
    unsafe { arm_interp::step(&mut cpu, &fetched, true) };
    assert_eq!(cpu.r[0], 7);
    assert_eq!(cpu.cur_instr, 0xE3A0_0007);
    assert_eq!(cpu.code_cycles, 3);
    assert_eq!(cpu.next_instr, [0x108, 0x200]);
    assert_eq!(cpu.r[15], 0x108);
}
