//! Kanji numeral reading for address fragments.
//!
//! This is a deliberately small reader: it understands the ten digit
//! characters plus 十, which covers the block/lot/number values that
//! appear in street addresses. 百 and 千 are not units here.

/// The "ten" unit character.
pub const TEN: char = '十';

/// Every character [`kanji_to_number`] understands.
pub const KANJI_NUMERALS: &str = "〇一二三四五六七八九十";

/// Digit value of a single kanji digit character.
pub fn kanji_digit(ch: char) -> Option<u64> {
    let value = match ch {
        '〇' => 0,
        '一' => 1,
        '二' => 2,
        '三' => 3,
        '四' => 4,
        '五' => 5,
        '六' => 6,
        '七' => 7,
        '八' => 8,
        '九' => 9,
        _ => return None,
    };
    Some(value)
}

/// Value of a part that must be exactly one digit character.
fn single_digit(part: &str) -> Option<u64> {
    let mut chars = part.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => kanji_digit(ch),
        _ => None,
    }
}

/// Read a kanji numeral token as an integer.
///
/// - `"十"` is 10.
/// - With 十 inside, the part left of it is the tens multiplier (1 when
///   empty or unreadable) and the part right of it the units (0 when
///   empty or unreadable): `"二十三"` is 23, `"十五"` is 15.
/// - Otherwise every character is a positional digit: `"一〇"` is 10,
///   `"〇五"` is 5. Unknown characters read as 0.
pub fn kanji_to_number(token: &str) -> u64 {
    if token == "十" {
        return 10;
    }

    if token.contains(TEN) {
        let mut parts = token.split(TEN);
        let left = parts.next().unwrap_or("");
        let right = parts.next().unwrap_or("");
        let tens = if left.is_empty() { 1 } else { single_digit(left).unwrap_or(1) };
        let units = if right.is_empty() { 0 } else { single_digit(right).unwrap_or(0) };
        return tens * 10 + units;
    }

    token.chars().fold(0u64, |acc, ch| {
        acc.saturating_mul(10)
            .saturating_add(kanji_digit(ch).unwrap_or(0))
    })
}
