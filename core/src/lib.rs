//! Guest architecture definitions shared by the JIT and the
//! interpreter: CPU state layout, instruction classification,
//! the condition truth table, and memory-timing tables.

pub mod cpu;
pub mod decode;
pub mod instr;
pub mod timings;

pub use cpu::{condition_holds, Arm, CONDITION_TABLE};
pub use instr::{FetchedInstr, InstrInfo, InstrKind};
