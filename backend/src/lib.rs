//! Native-code block compiler for the guest CPU.
//!
//! Compiles short straight-line runs of guest instructions into
//! callable x86-64 code. Instructions without a native translation
//! are routed through the interpreter from inside the generated
//! block, so any block compiles.

pub mod code_buffer;
pub mod compiler;
pub mod reg_cache;
pub mod x86_64;

mod alu;
mod thumb;

pub use code_buffer::CodeBuffer;
pub use compiler::{CompiledBlock, Compiler};
