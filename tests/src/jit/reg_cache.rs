use arm_jit::code_buffer::CodeBuffer;
use arm_jit::reg_cache::RegCache;
use arm_jit::x86_64::regs::ALLOC_ORDER;

use super::fetch_block;

// ADD rd, rn, rm with an always condition.
fn add(rd: u32, rn: u32, rm: u32) -> u32 {
    0xE080_0000 | (rn << 16) | (rd << 12) | rm
}

#[test]
fn prepare_makes_needed_registers_resident() {
    let instrs = fetch_block(false, &[add(0, 1, 2)]);
    let mut cache = RegCache::new(ALLOC_ORDER, &instrs);
    let mut buf = CodeBuffer::new(64 * 1024).unwrap();

    cache.prepare(&mut buf, 0);
    let hosts: Vec<_> = (0..3).map(|g| cache.host_reg(g).unwrap()).collect();
    assert_ne!(hosts[0], hosts[1]);
    assert_ne!(hosts[1], hosts[2]);
    assert_ne!(hosts[0], hosts[2]);
    assert!(cache.host_reg(3).is_none());
    assert!(buf.offset() > 0); // three loads were emitted
}

#[test]
fn registers_without_future_uses_are_dropped() {
    let instrs = fetch_block(false, &[add(0, 1, 2), add(3, 4, 5), add(0, 6, 7)]);
    let mut cache = RegCache::new(ALLOC_ORDER, &instrs);
    let mut buf = CodeBuffer::new(64 * 1024).unwrap();

    cache.prepare(&mut buf, 0);
    cache.prepare(&mut buf, 1);
    // r1 and r2 are dead after instruction 0.
    assert!(cache.host_reg(1).is_none());
    assert!(cache.host_reg(2).is_none());
    // r0 is needed again at instruction 2 and stays resident.
    assert!(cache.host_reg(0).is_some());

    cache.prepare(&mut buf, 2);
    for g in 1..=5 {
        assert!(cache.host_reg(g).is_none());
    }
    assert!(cache.host_reg(6).is_some());
    assert!(cache.host_reg(7).is_some());
}

#[test]
fn eviction_when_more_registers_are_live_than_slots() {
    // Six registers live across the whole run, one more than the pool.
    let instrs = fetch_block(
        false,
        &[add(0, 1, 2), add(3, 4, 5), add(0, 1, 2), add(3, 4, 5)],
    );
    let mut cache = RegCache::new(ALLOC_ORDER, &instrs);
    let mut buf = CodeBuffer::new(64 * 1024).unwrap();

    cache.prepare(&mut buf, 0);
    cache.prepare(&mut buf, 1);
    // Everything instruction 1 needs must be resident even though
    // something had to be evicted for it.
    for g in 3..=5 {
        assert!(cache.host_reg(g).is_some());
    }
    let resident = (0..16).filter(|&g| cache.host_reg(g).is_some()).count();
    assert_eq!(resident, ALLOC_ORDER.len());
}

#[test]
fn flush_writes_back_dirty_registers_once() {
    let instrs = fetch_block(false, &[add(0, 1, 2)]);
    let mut cache = RegCache::new(ALLOC_ORDER, &instrs);
    let mut buf = CodeBuffer::new(64 * 1024).unwrap();

    cache.prepare(&mut buf, 0);
    cache.mark_dirty(0);
    let before = buf.offset();
    cache.flush(&mut buf);
    assert!(buf.offset() > before);
    assert!(cache.host_reg(0).is_none());

    // Nothing left to write.
    let clean = buf.offset();
    cache.flush(&mut buf);
    assert_eq!(buf.offset(), clean);
}
