//! Fixed-width base 62 numerals over `0-9A-Za-z`.

pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Value of a single symbol.
pub fn digit(symbol: char) -> Option<u32> {
    match symbol {
        '0'..='9' => Some(symbol as u32 - '0' as u32),
        'A'..='Z' => Some(symbol as u32 - 'A' as u32 + 10),
        'a'..='z' => Some(symbol as u32 - 'a' as u32 + 36),
        _ => None,
    }
}

/// Largest value representable in `width` symbols.
pub fn max_value(width: usize) -> u64 {
    62u64.saturating_pow(width as u32) - 1
}

/// Encodes `value` on exactly `width` symbols, left-padded with `0`. `None`
/// if it does not fit.
pub fn encode(value: u32, width: usize) -> Option<String> {
    if u64::from(value) > max_value(width) {
        return None;
    }
    let mut symbols = vec![ALPHABET[0]; width];
    let mut rest = value;
    for slot in symbols.iter_mut().rev() {
        *slot = ALPHABET[(rest % 62) as usize];
        rest /= 62;
    }
    String::from_utf8(symbols).ok()
}
