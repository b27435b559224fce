use crate::error::DecodeError;

/// The 62 symbols of the short code alphabet.
///
/// The position of a symbol is its digit value, so the order is part of the
/// encoding and must never change once codes have been handed out.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

const BASE: u64 = 62;

/// Number of symbols needed to cover the whole `u64` range.
pub const MAX_LENGTH: usize = 11;

/// Encodes a number as base62, least-significant digit first.
///
/// Zero encodes to the empty string.
pub fn encode(mut number: u64) -> String {
    let mut encoded = String::with_capacity(MAX_LENGTH);
    while number > 0 {
        encoded.push(ALPHABET[(number % BASE) as usize] as char);
        number /= BASE;
    }
    encoded
}

/// Decodes a base62 string produced by [`encode`].
///
/// Each symbol contributes `digit * 62^i`, where `i` is its position.
/// Trailing `a` symbols are zero digits and do not change the value.
pub fn decode(encoded: &str) -> Result<u64, DecodeError> {
    let mut number: u64 = 0;
    let mut weight: Option<u64> = Some(1);

    for (position, character) in encoded.chars().enumerate() {
        let digit = digit_of(character)
            .ok_or(DecodeError::InvalidCharacter { position, character })?;

        if digit != 0 {
            let value = weight
                .and_then(|w| w.checked_mul(digit))
                .ok_or_else(|| DecodeError::Overflow(encoded.to_string()))?;
            number = number
                .checked_add(value)
                .ok_or_else(|| DecodeError::Overflow(encoded.to_string()))?;
        }

        weight = weight.and_then(|w| w.checked_mul(BASE));
    }

    Ok(number)
}

fn digit_of(character: char) -> Option<u64> {
    match character {
        'a'..='z' => Some(character as u64 - 'a' as u64),
        'A'..='Z' => Some(character as u64 - 'A' as u64 + 26),
        '0'..='9' => Some(character as u64 - '0' as u64 + 52),
        _ => None,
    }
}
