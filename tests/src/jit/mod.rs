use arm_core::{Arm, FetchedInstr};

mod blocks;
mod code_buffer;
mod cycles;
mod difftest;
mod reg_cache;

pub const MEM_SIZE: u32 = 4096;

pub fn make_cpu(num: u32, mem: &mut Vec<u8>) -> Arm {
    mem.resize(MEM_SIZE as usize, 0);
    Arm::new(num, mem.as_mut_ptr(), MEM_SIZE)
}

/// Decode a run of raw words with a unit code-fetch cost each.
pub fn fetch_block(thumb: bool, words: &[u32]) -> Vec<FetchedInstr> {
    words
        .iter()
        .map(|&w| FetchedInstr::new(thumb, w, 1))
        .collect()
}
