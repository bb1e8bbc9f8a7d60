//! Barrel shifter. Every operand-2 form funnels through here so the
//! carry-out edge cases live in exactly one place.

/// Shift by an immediate amount encoded in the instruction.
///
/// Amount 0 is special for every type except LSL: LSR/ASR mean a
/// shift by 32 and ROR means RRX.
pub fn shift_imm(ty: u32, amount: u32, value: u32, carry_in: bool) -> (u32, bool) {
    match (ty, amount) {
        (0, 0) => (value, carry_in),
        (0, n) => (value << n, value & (1 << (32 - n)) != 0),
        (1, 0) => (0, value & (1 << 31) != 0),
        (1, n) => (value >> n, value & (1 << (n - 1)) != 0),
        (2, 0) => {
            if value & (1 << 31) != 0 {
                (0xFFFF_FFFF, true)
            } else {
                (0, false)
            }
        }
        (2, n) => (
            ((value as i32) >> n) as u32,
            value & (1 << (n - 1)) != 0,
        ),
        (3, 0) => {
            // RRX.
            let res = (value >> 1) | ((carry_in as u32) << 31);
            (res, value & 1 != 0)
        }
        (_, n) => (value.rotate_right(n), value & (1 << (n - 1)) != 0),
    }
}

/// Shift by a register amount (low byte of Rs). Amounts of 32 and
/// above behave differently from the immediate forms.
pub fn shift_reg(ty: u32, amount: u32, value: u32, carry_in: bool) -> (u32, bool) {
    let n = amount & 0xFF;
    if n == 0 {
        return (value, carry_in);
    }
    match ty {
        0 => match n {
            1..=31 => (value << n, value & (1 << (32 - n)) != 0),
            32 => (0, value & 1 != 0),
            _ => (0, false),
        },
        1 => match n {
            1..=31 => (value >> n, value & (1 << (n - 1)) != 0),
            32 => (0, value & (1 << 31) != 0),
            _ => (0, false),
        },
        2 => {
            if n < 32 {
                (
                    ((value as i32) >> n) as u32,
                    value & (1 << (n - 1)) != 0,
                )
            } else {
                let sign = value & (1 << 31) != 0;
                (if sign { 0xFFFF_FFFF } else { 0 }, sign)
            }
        }
        _ => {
            let r = n & 31;
            if r == 0 {
                (value, value & (1 << 31) != 0)
            } else {
                (value.rotate_right(r), value & (1 << (r - 1)) != 0)
            }
        }
    }
}
