// Bit-field helpers over 16 bit words. Bit 0 is the least significant.
//
// Out of range positions and widths are bugs in the caller, not bad input,
// so they panic.

pub const WORD_BITS: u32 = u16::BITS;

fn check_pos(n: u32) {
    assert!(n < WORD_BITS, "bit position {n} out of range");
}

pub fn bit(word: u16, n: u32) -> u16 {
    check_pos(n);
    (word >> n) & 0x1
}

// Bits [start, start + width), shifted down to bit 0.
pub fn field(word: u16, start: u32, width: u32) -> u16 {
    check_pos(start);
    assert!(width < WORD_BITS, "field width {width} out of range");
    let mask = (1u16 << width) - 1;
    (word >> start) & mask
}

pub fn set_bit(word: u16, n: u32) -> u16 {
    check_pos(n);
    word | (1u16 << n)
}

pub fn clear_bit(word: u16, n: u32) -> u16 {
    check_pos(n);
    word & !(1u16 << n)
}

// Treats the low `width` bits of `val` as two's complement and widens to 16 bits.
// Bits above `width` are expected to be clear; they are left alone for
// non-negative values.
pub fn sign_extend(val: u16, width: u32) -> u16 {
    assert!((1..=WORD_BITS).contains(&width), "sign extension width {width} out of range");
    if width == WORD_BITS || bit(val, width - 1) == 0 {
        return val;
    }
    val | (u16::MAX << width)
}

pub fn is_negative(word: u16) -> bool {
    bit(word, WORD_BITS - 1) == 1
}

pub fn is_positive(word: u16) -> bool {
    bit(word, WORD_BITS - 1) == 0
}
