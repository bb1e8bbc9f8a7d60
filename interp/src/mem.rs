//! Guest RAM accessors. Addresses wrap at the (power-of-two) RAM
//! size and are force-aligned to the access width.

use arm_core::Arm;

pub unsafe fn read32(cpu: &Arm, addr: u32) -> u32 {
    let a = (addr & (cpu.mem_size - 1) & !3) as usize;
    (cpu.mem.add(a) as *const u32).read_unaligned()
}

pub unsafe fn write32(cpu: &mut Arm, addr: u32, val: u32) {
    let a = (addr & (cpu.mem_size - 1) & !3) as usize;
    (cpu.mem.add(a) as *mut u32).write_unaligned(val);
}

pub unsafe fn read16(cpu: &Arm, addr: u32) -> u16 {
    let a = (addr & (cpu.mem_size - 1) & !1) as usize;
    (cpu.mem.add(a) as *const u16).read_unaligned()
}

pub unsafe fn write16(cpu: &mut Arm, addr: u32, val: u16) {
    let a = (addr & (cpu.mem_size - 1) & !1) as usize;
    (cpu.mem.add(a) as *mut u16).write_unaligned(val);
}

pub unsafe fn read8(cpu: &Arm, addr: u32) -> u8 {
    cpu.mem.add((addr & (cpu.mem_size - 1)) as usize).read()
}

pub unsafe fn write8(cpu: &mut Arm, addr: u32, val: u8) {
    cpu.mem
        .add((addr & (cpu.mem_size - 1)) as usize)
        .write(val);
}
