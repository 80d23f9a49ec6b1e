//! ISBN-10 / ISBN-13 checksum validation.
//!
//! Hyphens and spaces are ignored, so `978-3-16-148410-0` and `9783161484100` are the
//! same code. [`canonical_isbn`] is the form stored and looked up.

use validator::ValidationError;

fn is_separator(c: char) -> bool {
    c == '-' || c == ' '
}

fn normalized(code: &str) -> Vec<u8> {
    code.bytes().filter(|b| !is_separator(char::from(*b))).collect()
}

/// Strip separators: `978-3-16-148410-0` becomes `9783161484100`.
pub fn canonical_isbn(code: &str) -> String {
    code.chars().filter(|c| !is_separator(*c)).collect()
}

/// ISBN-10: nine digits plus a digit or `X` check character, weighted sum divisible by 11.
pub fn is_valid_isbn10(code: &str) -> bool {
    let digits = normalized(code);
    if digits.len() != 10 || !digits[..9].iter().all(u8::is_ascii_digit) {
        return false;
    }

    let check = match digits[9] {
        b'X' => 10,
        d if d.is_ascii_digit() => u32::from(d - b'0'),
        _ => return false,
    };

    let sum: u32 = digits[..9]
        .iter()
        .enumerate()
        .map(|(i, d)| (i as u32 + 1) * u32::from(d - b'0'))
        .sum::<u32>()
        + 10 * check;

    sum % 11 == 0
}

/// ISBN-13: a `978`/`979` prefix, thirteen digits, alternating 1/3 weights.
pub fn is_valid_isbn13(code: &str) -> bool {
    let digits = normalized(code);
    if digits.len() != 13 || !digits.iter().all(u8::is_ascii_digit) {
        return false;
    }
    if !(digits.starts_with(b"978") || digits.starts_with(b"979")) {
        return false;
    }

    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| {
            let weight = if i % 2 == 0 { 1 } else { 3 };
            weight * u32::from(d - b'0')
        })
        .sum();

    (10 - sum % 10) % 10 == u32::from(digits[12] - b'0')
}

pub fn is_valid_isbn(code: &str) -> bool {
    is_valid_isbn10(code) || is_valid_isbn13(code)
}

/// `validator` hook for `#[validate(custom(function = "validate_isbn"))]`.
pub fn validate_isbn(code: &str) -> Result<(), ValidationError> {
    if is_valid_isbn(code) {
        Ok(())
    } else {
        Err(ValidationError::new("isbn"))
    }
}
