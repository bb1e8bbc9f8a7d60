use arm_core::{Arm, FetchedInstr};

mod flow;

pub const MEM_SIZE: u32 = 4096;

pub fn make_cpu(num: u32, mem: &mut Vec<u8>) -> Arm {
    mem.resize(MEM_SIZE as usize, 0);
    Arm::new(num, mem.as_mut_ptr(), MEM_SIZE)
}

/// Execute one instruction with a unit code-fetch cost.
pub fn exec(cpu: &mut Arm, thumb: bool, word: u32) -> u32 {
    let fetched = FetchedInstr::new(thumb, word, 1);
    // SAFETY: `cpu.mem` backs `MEM_SIZE` bytes owned by the caller.
    unsafe { arm_interp::step(cpu, &fetched, false) }
}
