use arm_jit::CodeBuffer;

#[test]
fn emit_and_read() {
    let mut buf = CodeBuffer::new(64 * 1024).unwrap();
    buf.emit_u8(0x90);
    buf.emit_u32(0xDEAD_BEEF);
    assert_eq!(buf.offset(), 5);
    assert_eq!(buf.as_slice()[0], 0x90);
    assert_eq!(buf.read_u32(1), 0xDEAD_BEEF);
}

#[test]
fn patch() {
    let mut buf = CodeBuffer::new(64 * 1024).unwrap();
    buf.emit_u32(0);
    buf.patch_u32(0, 0x1234_5678);
    assert_eq!(buf.read_u32(0), 0x1234_5678);
}

#[test]
fn reset_via_set_offset() {
    let mut buf = CodeBuffer::new(64 * 1024).unwrap();
    buf.emit_u32(0xAAAA_AAAA);
    buf.set_offset(0);
    assert_eq!(buf.offset(), 0);
    buf.emit_u32(0xBBBB_BBBB);
    assert_eq!(buf.read_u32(0), 0xBBBB_BBBB);
}

#[test]
fn almost_full_tracks_remaining_space() {
    let mut buf = CodeBuffer::new(64 * 1024).unwrap();
    assert!(!buf.almost_full());
    buf.set_offset(buf.capacity() - 1);
    assert!(buf.almost_full());
    assert_eq!(buf.remaining(), 1);
}

#[test]
fn size_rounds_up_to_page() {
    let buf = CodeBuffer::new(100).unwrap();
    assert!(buf.capacity() >= 100);
    assert_eq!(buf.capacity() % 4096, 0);
}
