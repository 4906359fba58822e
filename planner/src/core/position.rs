//! Fractional position keys for user-ordered lists
//!
//! Keys are strings over the base-62 alphabet `0-9A-Za-z`, read as the digits
//! of a fraction in `(0, 1)`. Byte order of two keys equals the numeric order
//! of their fractions, so a list sorts by plain string comparison. A key never
//! ends in `0`; otherwise no key could be placed directly below it.
//!
//! Two writers working from the same stale neighbours can compute the same
//! key. Sort with [`sort_positioned`] so the item's own id breaks such ties.

use std::cmp::Ordering;

use crate::error::{PlannerError, PlannerResult};

const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE: usize = DIGITS.len();
const ZERO: u8 = DIGITS[0];

fn digit_value(byte: u8) -> Option<usize> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as usize),
        b'A'..=b'Z' => Some((byte - b'A') as usize + 10),
        b'a'..=b'z' => Some((byte - b'a') as usize + 36),
        _ => None,
    }
}

/// Check that `key` is a well-formed position key
pub fn validate(key: &str) -> PlannerResult<()> {
    let bytes = key.as_bytes();
    let well_formed = !bytes.is_empty()
        && bytes.iter().all(|b| digit_value(*b).is_some())
        && bytes.last() != Some(&ZERO);

    if well_formed {
        Ok(())
    } else {
        Err(PlannerError::InvalidPositionError { key: key.to_string() })
    }
}

/// Key for the first item of an empty list
pub fn first_position() -> String {
    encode(midpoint(&[], None))
}

/// A key that sorts before `key`
pub fn position_before(key: &str) -> PlannerResult<String> {
    validate(key)?;
    Ok(encode(midpoint(&[], Some(key.as_bytes()))))
}

/// A key that sorts after `key`
pub fn position_after(key: &str) -> PlannerResult<String> {
    validate(key)?;
    Ok(encode(midpoint(key.as_bytes(), None)))
}

/// A key strictly between `lower` and `upper`. Requires `lower < upper`.
pub fn position_between(lower: &str, upper: &str) -> PlannerResult<String> {
    validate(lower)?;
    validate(upper)?;
    if lower >= upper {
        return Err(PlannerError::InvalidRangeError {
            lower: lower.to_string(),
            upper: upper.to_string(),
        });
    }
    Ok(encode(midpoint(lower.as_bytes(), Some(upper.as_bytes()))))
}

/// `count` ascending keys spread evenly over the key space, for seeding a list
pub fn initial_positions(count: usize) -> Vec<String> {
    if count == 0 {
        return Vec::new();
    }

    // Smallest fixed width whose non-zero values can hold `count` keys
    let mut width: u32 = 1;
    while BASE.pow(width) - 1 < count {
        width += 1;
    }
    let space = BASE.pow(width);
    let step = space / (count + 1);

    (1..=count)
        .map(|i| {
            let mut value = step * i;
            let mut digits = vec![ZERO; width as usize];
            for slot in digits.iter_mut().rev() {
                *slot = DIGITS[value % BASE];
                value /= BASE;
            }
            while digits.last() == Some(&ZERO) {
                digits.pop();
            }
            encode(digits)
        })
        .collect()
}

/// Key for dropping an item at `index` among `siblings`.
///
/// `siblings` are the keys of the other items in display order, with the
/// dragged item already removed.
pub fn position_for_slot<S: AsRef<str>>(siblings: &[S], index: usize) -> PlannerResult<String> {
    match (index.checked_sub(1).and_then(|i| siblings.get(i)), siblings.get(index)) {
        (None, None) => Ok(first_position()),
        (None, Some(next)) => position_before(next.as_ref()),
        (Some(prev), None) => position_after(prev.as_ref()),
        (Some(prev), Some(next)) => position_between(prev.as_ref(), next.as_ref()),
    }
}

/// An item ordered by a position key
pub trait Positioned {
    type Id: Ord;

    fn position(&self) -> &str;

    /// Stable identity used when two items carry the same key
    fn tie_breaker(&self) -> Self::Id;
}

/// Compare two positioned items by key, then identity
pub fn compare_positioned<T: Positioned>(a: &T, b: &T) -> Ordering {
    a.position()
        .cmp(b.position())
        .then_with(|| a.tie_breaker().cmp(&b.tie_breaker()))
}

/// Sort items into display order
pub fn sort_positioned<T: Positioned>(items: &mut [T]) {
    items.sort_by(compare_positioned);
}

fn encode(digits: Vec<u8>) -> String {
    digits.into_iter().map(char::from).collect()
}

/// Digits of a fraction strictly between `lower` and `upper`.
///
/// `upper == None` stands for 1.0. Both inputs must be valid digit strings
/// with `lower < upper`; the empty `lower` stands for 0.
fn midpoint(lower: &[u8], upper: Option<&[u8]>) -> Vec<u8> {
    if let Some(upper) = upper {
        // Copy the shared prefix, reading missing lower digits as zero
        let mut shared = 0;
        while shared < upper.len() && lower.get(shared).copied().unwrap_or(ZERO) == upper[shared] {
            shared += 1;
        }
        if shared > 0 {
            let mut key = upper[..shared].to_vec();
            let lower_rest = lower.get(shared..).unwrap_or(&[]);
            key.extend(midpoint(lower_rest, Some(&upper[shared..])));
            return key;
        }
    }

    let low = lower.first().and_then(|b| digit_value(*b)).unwrap_or(0);
    let high = upper
        .and_then(|u| u.first())
        .and_then(|b| digit_value(*b))
        .unwrap_or(BASE);

    if high - low > 1 {
        return vec![DIGITS[(low + high) / 2]];
    }

    // Adjacent leading digits
    match upper {
        Some(upper) if upper.len() > 1 => vec![upper[0]],
        _ => {
            let mut key = vec![DIGITS[low]];
            key.extend(midpoint(lower.get(1..).unwrap_or(&[]), None));
            key
        }
    }
}
