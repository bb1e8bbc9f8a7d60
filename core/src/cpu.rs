//! Guest CPU state.
//!
//! Layout must be `#[repr(C)]` with a frozen field order: the JIT
//! emits raw `[rcpu + offset]` accesses against these offsets, and
//! the interpreter reads the same fields through ordinary Rust
//! code. Changing the field order is a breaking interface change
//! for every compiled block.

/// Number of general-purpose registers (R0-R15; R15 is the PC).
pub const NUM_REGS: usize = 16;

// CPSR bits.
pub const FLAG_N: u32 = 1 << 31;
pub const FLAG_Z: u32 = 1 << 30;
pub const FLAG_C: u32 = 1 << 29;
pub const FLAG_V: u32 = 1 << 28;
/// Thumb state bit.
pub const FLAG_T: u32 = 1 << 5;

/// Guest CPU architectural state plus the per-instruction
/// bookkeeping fields the dispatcher and interpreter share.
#[repr(C)]
pub struct Arm {
    /// General-purpose registers. While an instruction executes,
    /// `r[15]` reads as its address plus twice the encoding width
    /// (pipeline convention).
    pub r: [u32; NUM_REGS],
    /// Current program status register (N/Z/C/V in the top nibble,
    /// Thumb bit 5).
    pub cpsr: u32,
    /// Raw encoding of the instruction currently executing.
    pub cur_instr: u32,
    /// Code-fetch timing value for the current instruction.
    pub code_cycles: u32,
    /// Successor PCs of the last instruction in a block, written so
    /// the caller can resume dispatch after the block returns.
    pub next_instr: [u32; 2],
    /// Which guest core this state belongs to (0 = main core,
    /// 1 = secondary core with table-driven memory timings).
    pub num: u32,
    /// Flat guest RAM for interpreter data accesses.
    pub mem: *mut u8,
    /// Size of `mem` in bytes (power of two; addresses are masked).
    pub mem_size: u32,
}

// Byte offsets into `Arm`, used by the JIT for memory operands.
pub const R_OFFSET: i32 = 0;
pub const CPSR_OFFSET: i32 = 64;
pub const CUR_INSTR_OFFSET: i32 = 68;
pub const CODE_CYCLES_OFFSET: i32 = 72;
pub const NEXT_INSTR_OFFSET: i32 = 76;
pub const NUM_OFFSET: i32 = 84;
pub const MEM_OFFSET: i32 = 88;

/// Byte offset of `r[i]`.
pub const fn reg_offset(i: usize) -> i32 {
    R_OFFSET + (i as i32) * 4
}

impl Arm {
    /// Fresh state for core `num` backed by `mem`.
    pub fn new(num: u32, mem: *mut u8, mem_size: u32) -> Self {
        assert!(mem_size.is_power_of_two());
        Self {
            r: [0; NUM_REGS],
            cpsr: 0,
            cur_instr: 0,
            code_cycles: 0,
            next_instr: [0; 2],
            num,
            mem,
            mem_size,
        }
    }

    /// Whether the CPU is in Thumb state.
    #[inline]
    pub fn thumb(&self) -> bool {
        self.cpsr & FLAG_T != 0
    }
}

/// Per-condition bitmask over the 16 possible flag nibbles.
///
/// Bit `i` of `CONDITION_TABLE[cond]` is set iff the condition
/// holds when `cpsr >> 28 == i` (nibble layout: N=8, Z=4, C=2, V=1).
pub const CONDITION_TABLE: [u16; 16] = [
    0xF0F0, // EQ: Z
    0x0F0F, // NE: !Z
    0xCCCC, // CS: C
    0x3333, // CC: !C
    0xFF00, // MI: N
    0x00FF, // PL: !N
    0xAAAA, // VS: V
    0x5555, // VC: !V
    0x0C0C, // HI: C && !Z
    0xF3F3, // LS: !C || Z
    0xAA55, // GE: N == V
    0x55AA, // LT: N != V
    0x0A05, // GT: !Z && N == V
    0xF5FA, // LE: Z || N != V
    0xFFFF, // AL
    0x0000, // NV
];

/// Evaluate a 4-bit condition field against the CPSR.
#[inline]
pub fn condition_holds(cond: u8, cpsr: u32) -> bool {
    (CONDITION_TABLE[cond as usize] >> (cpsr >> 28)) & 1 != 0
}
