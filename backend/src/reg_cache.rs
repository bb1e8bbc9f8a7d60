//! Guest-register cache.
//!
//! Maps guest registers to a fixed pool of host registers for the
//! duration of a block. Loads happen lazily per instruction, writes
//! are tracked with a dirty mask and written back on flush. Guest
//! R15 is never cached; the compiler materializes it from its
//! compile-time shadow value.

use arm_core::cpu::reg_offset;
use arm_core::FetchedInstr;

use crate::code_buffer::CodeBuffer;
use crate::x86_64::emitter::{emit_load, emit_store};
use crate::x86_64::regs::{Reg, RCPU};

const PC_MASK: u16 = !(1 << 15);

pub struct RegCache {
    alloc_order: &'static [Reg],
    /// Guest register -> host register.
    mapping: [Option<Reg>; 16],
    /// Host register (by pool slot) -> guest register.
    slot_owner: [Option<usize>; 8],
    dirty: u16,
    /// Per-instruction register use masks, R15 stripped.
    uses: Vec<u16>,
}

impl RegCache {
    pub fn new(alloc_order: &'static [Reg], instrs: &[FetchedInstr]) -> Self {
        assert!(alloc_order.len() <= 8);
        let uses = instrs
            .iter()
            .map(|i| (i.info.src_regs | i.info.dst_regs) & PC_MASK)
            .collect();
        Self {
            alloc_order,
            mapping: [None; 16],
            slot_owner: [None; 8],
            dirty: 0,
            uses,
        }
    }

    /// Host register currently holding guest register `guest`.
    #[inline]
    pub fn host_reg(&self, guest: usize) -> Option<Reg> {
        self.mapping[guest]
    }

    /// Record that the cached copy of `guest` is newer than memory.
    #[inline]
    pub fn mark_dirty(&mut self, guest: usize) {
        assert!(self.mapping[guest].is_some());
        self.dirty |= 1 << guest;
    }

    /// First instruction index >= `from` that touches `guest`.
    fn next_use(&self, guest: usize, from: usize) -> usize {
        self.uses[from..]
            .iter()
            .position(|&m| m & (1 << guest) != 0)
            .map(|p| from + p)
            .unwrap_or(usize::MAX)
    }

    fn store(&mut self, buf: &mut CodeBuffer, guest: usize) {
        if self.dirty & (1 << guest) != 0 {
            let host = self.mapping[guest].unwrap();
            emit_store(buf, false, host, RCPU, reg_offset(guest));
            self.dirty &= !(1 << guest);
        }
    }

    fn unload(&mut self, buf: &mut CodeBuffer, guest: usize) {
        self.store(buf, guest);
        let host = self.mapping[guest].take().unwrap();
        let slot = self.alloc_order.iter().position(|&r| r == host).unwrap();
        self.slot_owner[slot] = None;
    }

    fn load_into(&mut self, buf: &mut CodeBuffer, guest: usize, slot: usize) {
        let host = self.alloc_order[slot];
        emit_load(buf, false, host, RCPU, reg_offset(guest));
        self.mapping[guest] = Some(host);
        self.slot_owner[slot] = Some(guest);
    }

    /// Make every register instruction `i` touches resident.
    ///
    /// Registers the instruction only writes are loaded too: if a
    /// failed predicate skips the body, the eventual flush must
    /// write back the unchanged architectural value.
    pub fn prepare(&mut self, buf: &mut CodeBuffer, i: usize) {
        let needed = self.uses[i];

        // Drop cached registers with no remaining use.
        for guest in 0..15 {
            if self.mapping[guest].is_some() && self.next_use(guest, i) == usize::MAX {
                self.unload(buf, guest);
            }
        }

        for guest in 0..15 {
            if needed & (1 << guest) == 0 || self.mapping[guest].is_some() {
                continue;
            }
            let slot = match (0..self.alloc_order.len()).find(|&s| self.slot_owner[s].is_none()) {
                Some(s) => s,
                None => {
                    // Evict the resident register whose next use is
                    // farthest away, never one this instruction needs.
                    let victim_slot = (0..self.alloc_order.len())
                        .filter(|&s| {
                            let owner = self.slot_owner[s].unwrap();
                            needed & (1 << owner) == 0
                        })
                        .max_by_key(|&s| self.next_use(self.slot_owner[s].unwrap(), i + 1))
                        .expect("more live registers than the host pool");
                    self.unload(buf, self.slot_owner[victim_slot].unwrap());
                    victim_slot
                }
            };
            self.load_into(buf, guest, slot);
        }
    }

    /// Write back every dirty register and drop all mappings.
    pub fn flush(&mut self, buf: &mut CodeBuffer) {
        for guest in 0..15 {
            if self.mapping[guest].is_some() {
                self.store(buf, guest);
                self.mapping[guest] = None;
            }
        }
        self.slot_owner = [None; 8];
        self.dirty = 0;
    }
}
