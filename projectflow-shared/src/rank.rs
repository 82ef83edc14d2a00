/// Rank keys for ordering tasks within a status lane
///
/// Tasks on a board are ordered by an opaque string key compared byte by
/// byte. Inserting a task between two others only computes a new key for
/// the moved task; no other row is renumbered.
///
/// # Key Format
///
/// A key is an *integer part* followed by an optional *fraction*, both
/// written with the 62 digits `0-9A-Za-z` (which are already in ASCII order):
///
/// - The first character encodes the integer length: `a`..`z` are
///   non-negative integers of 1..26 digits, `A`..`Z` are negative integers
///   of 26..1 digits. Longer positive integers therefore sort after shorter
///   ones without any padding.
/// - The fraction never ends in `0`, so every pair of distinct keys has
///   another key strictly between them. When two keys are adjacent at their
///   current length, [`between`] widens the result by one digit instead of
///   failing.
///
/// [`middle`] is `a0`. Appending with [`next`] increments the integer part,
/// so a lane of a thousand appended tasks still uses three-character keys.
///
/// # Example
///
/// ```
/// use projectflow_shared::rank;
///
/// # fn example() -> Result<(), rank::RankError> {
/// let first = rank::middle();
/// let second = rank::next(&first)?;
/// let inserted = rank::between(&first, &second)?;
///
/// assert!(first < inserted && inserted < second);
/// assert!(rank::prev(&first)? < first);
/// # Ok(())
/// # }
/// ```

const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE: usize = 62;
const ZERO: u8 = b'0';
const MAX_DIGIT: u8 = b'z';

/// Integer length encoded by the head `A` (the most negative integer).
const SMALLEST_INTEGER_LEN: usize = 27;

/// Error type for rank key operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RankError {
    /// Key contains characters outside the alphabet or is malformed
    #[error("Invalid rank key: {0:?}")]
    InvalidKey(String),

    /// Lower bound does not sort strictly before the upper bound
    #[error("Rank keys out of order: {low:?} must sort before {high:?}")]
    OutOfOrder { low: String, high: String },

    /// Integer part cannot grow or shrink any further
    #[error("Rank key space exhausted")]
    Exhausted,
}

/// Returns the key used to seed an empty lane
pub fn middle() -> String {
    "a0".to_string()
}

/// Returns a key strictly greater than `key`
///
/// # Errors
///
/// Returns `RankError::InvalidKey` if `key` is malformed
pub fn next(key: &str) -> Result<String, RankError> {
    key_between(Some(key), None)
}

/// Returns a key strictly less than `key`
///
/// # Errors
///
/// Returns `RankError::InvalidKey` if `key` is malformed
pub fn prev(key: &str) -> Result<String, RankError> {
    key_between(None, Some(key))
}

/// Returns a key strictly between `low` and `high`
///
/// # Errors
///
/// Returns `RankError::OutOfOrder` unless `low < high`, or
/// `RankError::InvalidKey` if either key is malformed
///
/// # Example
///
/// ```
/// use projectflow_shared::rank::between;
///
/// // Adjacent keys get a longer key in between
/// assert_eq!(between("a0", "a1").unwrap(), "a0V");
/// assert!(between("a1", "a0").is_err());
/// ```
pub fn between(low: &str, high: &str) -> Result<String, RankError> {
    key_between(Some(low), Some(high))
}

/// Generates a key between two optional bounds
///
/// `None` stands for the open end of the lane: `(None, None)` is
/// [`middle`], `(Some(k), None)` is [`next`] and `(None, Some(k))` is
/// [`prev`].
pub fn key_between(low: Option<&str>, high: Option<&str>) -> Result<String, RankError> {
    if let Some(low) = low {
        validate(low)?;
    }
    if let Some(high) = high {
        validate(high)?;
    }

    match (low, high) {
        (None, None) => Ok(middle()),
        (Some(low), Some(high)) if low >= high => Err(RankError::OutOfOrder {
            low: low.to_string(),
            high: high.to_string(),
        }),
        (None, Some(high)) => {
            let (integer, fraction) = split(high)?;
            if integer.len() == SMALLEST_INTEGER_LEN
                && integer.as_bytes()[0] == b'A'
                && integer.bytes().skip(1).all(|d| d == ZERO)
            {
                return Ok(join(integer.as_bytes(), &midpoint(b"", Some(fraction.as_bytes()))));
            }
            if integer.len() < high.len() {
                return Ok(integer.to_string());
            }
            decrement_integer(integer.as_bytes())
                .map(|bytes| join(&bytes, b""))
                .ok_or(RankError::Exhausted)
        }
        (Some(low), None) => {
            let (integer, fraction) = split(low)?;
            Ok(match increment_integer(integer.as_bytes()) {
                Some(bytes) => join(&bytes, b""),
                None => join(integer.as_bytes(), &midpoint(fraction.as_bytes(), None)),
            })
        }
        (Some(low), Some(high)) => {
            let (low_int, low_frac) = split(low)?;
            let (high_int, high_frac) = split(high)?;

            if low_int == high_int {
                return Ok(join(
                    low_int.as_bytes(),
                    &midpoint(low_frac.as_bytes(), Some(high_frac.as_bytes())),
                ));
            }

            let incremented = increment_integer(low_int.as_bytes()).ok_or(RankError::Exhausted)?;
            if incremented.as_slice() < high.as_bytes() {
                return Ok(join(&incremented, b""));
            }
            Ok(join(low_int.as_bytes(), &midpoint(low_frac.as_bytes(), None)))
        }
    }
}

/// Checks that `key` is a well-formed rank key
pub fn validate(key: &str) -> Result<(), RankError> {
    let invalid = || RankError::InvalidKey(key.to_string());

    if key.is_empty() || !key.bytes().all(|b| digit_value(b).is_some()) {
        return Err(invalid());
    }

    let (integer, fraction) = split(key)?;
    if fraction.as_bytes().last() == Some(&ZERO) {
        return Err(invalid());
    }
    if integer.len() == SMALLEST_INTEGER_LEN
        && fraction.is_empty()
        && integer.as_bytes()[0] == b'A'
        && integer.bytes().skip(1).all(|d| d == ZERO)
    {
        return Err(invalid());
    }

    Ok(())
}

fn digit_value(byte: u8) -> Option<usize> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as usize),
        b'A'..=b'Z' => Some((byte - b'A') as usize + 10),
        b'a'..=b'z' => Some((byte - b'a') as usize + 36),
        _ => None,
    }
}

fn integer_len(head: u8) -> Option<usize> {
    match head {
        b'a'..=b'z' => Some((head - b'a') as usize + 2),
        b'A'..=b'Z' => Some((b'Z' - head) as usize + 2),
        _ => None,
    }
}

fn split(key: &str) -> Result<(&str, &str), RankError> {
    let len = key
        .as_bytes()
        .first()
        .and_then(|&head| integer_len(head))
        .filter(|&len| len <= key.len())
        .ok_or_else(|| RankError::InvalidKey(key.to_string()))?;

    Ok(key.split_at(len))
}

fn join(integer: &[u8], fraction: &[u8]) -> String {
    // Only alphabet bytes ever reach this point
    integer
        .iter()
        .chain(fraction.iter())
        .map(|&b| b as char)
        .collect()
}

/// Fraction strictly between `low` and `high` (or 1 when `high` is `None`)
///
/// Both inputs are fractions without trailing zeros and `low < high`.
fn midpoint(low: &[u8], high: Option<&[u8]>) -> Vec<u8> {
    if let Some(high) = high {
        // Shared prefix, reading missing low digits as zero
        let mut n = 0;
        while n < high.len() && low.get(n).copied().unwrap_or(ZERO) == high[n] {
            n += 1;
        }
        if n > 0 {
            let mut out = high[..n].to_vec();
            out.extend(midpoint(low.get(n..).unwrap_or(&[]), Some(&high[n..])));
            return out;
        }
    }

    let digit_low = low.first().and_then(|&d| digit_value(d)).unwrap_or(0);
    let digit_high = high
        .and_then(|h| h.first())
        .and_then(|&d| digit_value(d))
        .unwrap_or(BASE);

    if digit_high.saturating_sub(digit_low) > 1 {
        vec![DIGITS[(digit_low + digit_high + 1) / 2]]
    } else if let Some(high) = high.filter(|h| h.len() > 1) {
        vec![high[0]]
    } else {
        let mut out = vec![DIGITS[digit_low]];
        out.extend(midpoint(low.get(1..).unwrap_or(&[]), None));
        out
    }
}

fn increment_integer(integer: &[u8]) -> Option<Vec<u8>> {
    let (&head, rest) = integer.split_first()?;
    let mut digits = rest.to_vec();

    let mut carry = true;
    for digit in digits.iter_mut().rev() {
        let value = digit_value(*digit).unwrap_or(0) + 1;
        if value == BASE {
            *digit = ZERO;
        } else {
            *digit = DIGITS[value];
            carry = false;
            break;
        }
    }

    if !carry {
        let mut out = vec![head];
        out.extend(digits);
        return Some(out);
    }

    match head {
        b'Z' => Some(vec![b'a', ZERO]),
        b'z' => None,
        _ => {
            let head = head + 1;
            if head > b'a' {
                digits.push(ZERO);
            } else {
                digits.pop();
            }
            let mut out = vec![head];
            out.extend(digits);
            Some(out)
        }
    }
}

fn decrement_integer(integer: &[u8]) -> Option<Vec<u8>> {
    let (&head, rest) = integer.split_first()?;
    let mut digits = rest.to_vec();

    let mut borrow = true;
    for digit in digits.iter_mut().rev() {
        match digit_value(*digit).unwrap_or(0) {
            0 => *digit = MAX_DIGIT,
            value => {
                *digit = DIGITS[value - 1];
                borrow = false;
                break;
            }
        }
    }

    if !borrow {
        let mut out = vec![head];
        out.extend(digits);
        return Some(out);
    }

    match head {
        b'a' => Some(vec![b'Z', MAX_DIGIT]),
        b'A' => None,
        _ => {
            let head = head - 1;
            if head < b'Z' {
                digits.push(MAX_DIGIT);
            } else {
                digits.pop();
            }
            let mut out = vec![head];
            out.extend(digits);
            Some(out)
        }
    }
}
