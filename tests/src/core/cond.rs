use arm_core::condition_holds;

/// Straight transcription of the architectural condition semantics,
/// as a cross-check on the packed truth table.
fn reference(cond: u8, n: bool, z: bool, c: bool, v: bool) -> bool {
    match cond {
        0x0 => z,
        0x1 => !z,
        0x2 => c,
        0x3 => !c,
        0x4 => n,
        0x5 => !n,
        0x6 => v,
        0x7 => !v,
        0x8 => c && !z,
        0x9 => !c || z,
        0xA => n == v,
        0xB => n != v,
        0xC => !z && n == v,
        0xD => z || n != v,
        0xE => true,
        _ => false,
    }
}

#[test]
fn truth_table_matches_flag_semantics() {
    for cond in 0..16u8 {
        for nibble in 0..16u32 {
            let cpsr = nibble << 28;
            let n = nibble & 8 != 0;
            let z = nibble & 4 != 0;
            let c = nibble & 2 != 0;
            let v = nibble & 1 != 0;
            assert_eq!(
                condition_holds(cond, cpsr),
                reference(cond, n, z, c, v),
                "cond {cond:X} flags {nibble:04b}"
            );
        }
    }
}

#[test]
fn low_cpsr_bits_do_not_affect_conditions() {
    for cond in 0..16u8 {
        assert_eq!(
            condition_holds(cond, 0x4000_0000),
            condition_holds(cond, 0x4FFF_FFFF),
        );
    }
}
