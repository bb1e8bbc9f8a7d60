/// x86-64 general-purpose register indices.
///
/// Encoding matches the x86-64 ModR/M and REX register numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    Rax = 0,
    Rcx = 1,
    Rdx = 2,
    Rbx = 3,
    Rsp = 4,
    Rbp = 5,
    Rsi = 6,
    Rdi = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    R13 = 13,
    R14 = 14,
    R15 = 15,
}

impl Reg {
    /// Low 3 bits of the register encoding (for ModR/M).
    #[inline]
    pub const fn low3(self) -> u8 {
        (self as u8) & 0x7
    }

    /// Whether this register requires a REX prefix (R8-R15).
    #[inline]
    pub const fn needs_rex(self) -> bool {
        (self as u8) >= 8
    }
}

/// Pointer to the guest CPU state, live across a whole block.
pub const RCPU: Reg = Reg::Rbp;

/// Runtime cycle accumulator (32-bit use).
pub const RCYCLES: Reg = Reg::R14;

/// Cached guest CPSR, live across a whole block.
pub const RCPSR: Reg = Reg::R15;

/// Scratch registers for per-instruction codegen. SCRATCH3 is RCX
/// so variable shift counts land in CL without an extra move.
pub const SCRATCH: Reg = Reg::Rax;
pub const SCRATCH2: Reg = Reg::Rdx;
pub const SCRATCH3: Reg = Reg::Rcx;

/// Pool the register cache allocates guest registers from, in
/// preference order. Caller-saved members are fine here: the cache
/// is flushed before any call leaves the block.
pub const ALLOC_ORDER: &[Reg] = &[Reg::Rbx, Reg::Rsi, Reg::Rdi, Reg::R12, Reg::R13];

/// Callee-saved registers the block prologue must save/restore
/// (System V AMD64 ABI).
pub const CALLEE_SAVED: &[Reg] = &[Reg::Rbp, Reg::Rbx, Reg::R12, Reg::R13, Reg::R14, Reg::R15];

/// Function argument registers (System V AMD64 ABI).
pub const CALL_ARG_REGS: &[Reg] = &[Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx, Reg::R8, Reg::R9];
