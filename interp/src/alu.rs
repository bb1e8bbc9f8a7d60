//! Flag-setting arithmetic shared by both encoding modes.

use arm_core::cpu::{FLAG_C, FLAG_N, FLAG_V, FLAG_Z};

#[inline]
pub fn set_nz(cpsr: &mut u32, result: u32) {
    *cpsr &= !(FLAG_N | FLAG_Z);
    if result == 0 {
        *cpsr |= FLAG_Z;
    }
    if result & (1 << 31) != 0 {
        *cpsr |= FLAG_N;
    }
}

#[inline]
pub fn set_nzcv(cpsr: &mut u32, result: u32, carry: bool, overflow: bool) {
    set_nz(cpsr, result);
    *cpsr &= !(FLAG_C | FLAG_V);
    if carry {
        *cpsr |= FLAG_C;
    }
    if overflow {
        *cpsr |= FLAG_V;
    }
}

#[inline]
pub fn set_carry(cpsr: &mut u32, carry: bool) {
    *cpsr &= !FLAG_C;
    if carry {
        *cpsr |= FLAG_C;
    }
}

/// a + b + cin, with the architectural carry and overflow outs.
#[inline]
pub fn adc(a: u32, b: u32, cin: bool) -> (u32, bool, bool) {
    let sum = a as u64 + b as u64 + cin as u64;
    let res = sum as u32;
    let carry = sum >> 32 != 0;
    let overflow = (!(a ^ b) & (a ^ res)) >> 31 != 0;
    (res, carry, overflow)
}

#[inline]
pub fn add(a: u32, b: u32) -> (u32, bool, bool) {
    adc(a, b, false)
}

/// a - b - !cin. Carry out is the no-borrow flag.
#[inline]
pub fn sbc(a: u32, b: u32, cin: bool) -> (u32, bool, bool) {
    adc(a, !b, cin)
}

#[inline]
pub fn sub(a: u32, b: u32) -> (u32, bool, bool) {
    adc(a, !b, true)
}
