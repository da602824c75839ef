//! small integer helpers used by the coders

/// zig-zag map a signed value onto the unsigned line: 0, -1, 1, -2, 2, ...
#[inline]
pub fn s2u(v: i32) -> u32 {
    ((v << 1) ^ (v >> 31)) as u32
}

/// inverse of [`s2u`]
#[inline]
pub fn u2s(u: u32) -> i32 {
    ((u >> 1) as i32) ^ -((u & 1) as i32)
}

/// number of bits needed to represent `v` (0 for 0)
#[inline]
pub fn bit_length(v: u32) -> u32 {
    u32::BITS - v.leading_zeros()
}

/// floor(log2(v)), 0 for v <= 1
#[inline]
pub fn ilog2(v: u32) -> u32 {
    bit_length(v).saturating_sub(1)
}
