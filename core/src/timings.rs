//! Memory-timing tables and code-fetch cycle costs.
//!
//! Both the block compiler (at compile time) and the interpreter
//! (at run time) price instructions through these helpers, so the
//! two execution paths always agree on cycle totals.

/// Secondary-core memory timings, indexed by region timing class.
///
/// Columns: 16-bit sequential, 16-bit non-sequential, 32-bit
/// sequential, 32-bit non-sequential.
pub const MEM_TIMINGS7: [[u8; 4]; 16] = [
    [1, 1, 1, 1], // main RAM mirror
    [1, 1, 1, 1], // fast WRAM
    [3, 3, 6, 6], // main RAM
    [1, 1, 1, 1], // shared WRAM
    [1, 1, 1, 1], // I/O
    [1, 1, 2, 2], // VRAM
    [1, 1, 2, 2],
    [1, 1, 1, 1],
    [5, 5, 10, 10], // cart space
    [5, 5, 10, 10],
    [10, 10, 20, 20],
    [1, 1, 1, 1],
    [1, 1, 1, 1],
    [1, 1, 1, 1],
    [1, 1, 1, 1],
    [1, 1, 1, 1],
];

/// Code-fetch cost of an instruction whose execute stage overlaps
/// the fetch (the common sequential case).
#[inline]
pub fn cycles_c(num: u32, thumb: bool, r15: u32, code_cycles: u32) -> u32 {
    if num == 0 {
        // Main core fetches a whole line; the second halfword of a
        // line is free.
        if r15 & 2 != 0 {
            0
        } else {
            code_cycles
        }
    } else {
        MEM_TIMINGS7[code_cycles as usize][if thumb { 1 } else { 3 }] as u32
    }
}

/// Code-fetch cost plus `internal` execute cycles that cannot
/// overlap the fetch.
#[inline]
pub fn cycles_ci(num: u32, thumb: bool, r15: u32, code_cycles: u32, internal: u32) -> u32 {
    if num == 0 {
        let fetch = if r15 & 2 != 0 { 0 } else { code_cycles };
        fetch + internal
    } else {
        MEM_TIMINGS7[code_cycles as usize][if thumb { 0 } else { 2 }] as u32 + internal
    }
}
