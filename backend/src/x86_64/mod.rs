pub mod emitter;
pub mod regs;
