//! Byte-level comparison primitives.
//!
//! Pure functions over byte strings. Parsing a comparison value and applying
//! it are deliberately one step: `None` means the comparison value itself is
//! malformed (a configuration error), while [`Masked`] outcomes describe the
//! value under check.

/// Outcome of a masked byte comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Masked {
    /// Every masked byte matched its expectation.
    Allowed,
    /// Some masked byte differed.
    NotAllowed,
    /// The configured range extends past the value.
    Overflow,
}

/// Bitmask comparison. The comparison value is a big-endian two byte shift
/// followed by mask and expected halves of equal length (1 to 30 bytes).
pub(crate) fn bitmask(comp_value: &[u8], value: &[u8]) -> Option<Masked> {
    if comp_value.len() < 4 || (comp_value.len() - 2) % 2 != 0 {
        return None;
    }
    let half = (comp_value.len() - 2) / 2;
    if half > 30 {
        return None;
    }
    let shift = usize::from(u16::from_be_bytes([comp_value[0], comp_value[1]]));
    let mask = &comp_value[2..2 + half];
    let expected = &comp_value[2 + half..];
    Some(masked_range(value, shift, mask, expected))
}

/// Bytemask comparison. The comparison value is a `left` byte, a `right`
/// byte, then mask and expected halves of length `right - left` (1 to 31).
pub(crate) fn bytemask(comp_value: &[u8], value: &[u8]) -> Option<Masked> {
    let (left, width) = range_header(comp_value)?;
    if width > 31 || comp_value.len() != 2 + 2 * width {
        return None;
    }
    let mask = &comp_value[2..2 + width];
    let expected = &comp_value[2 + width..];
    Some(masked_range(value, left, mask, expected))
}

/// Slice comparison. The comparison value is a `left` byte, a `right` byte,
/// then the expected bytes for that range. A range the value cannot contain
/// simply does not match.
pub(crate) fn slice(comp_value: &[u8], value: &[u8]) -> Option<bool> {
    let (left, width) = range_header(comp_value)?;
    if comp_value.len() != 2 + width {
        return None;
    }
    let expected = &comp_value[2..];
    let Some(window) = value.get(left..left + width) else {
        return Some(false);
    };
    Some(window == expected)
}

fn range_header(comp_value: &[u8]) -> Option<(usize, usize)> {
    if comp_value.len() < 2 {
        return None;
    }
    let left = usize::from(comp_value[0]);
    let right = usize::from(comp_value[1]);
    if right <= left {
        return None;
    }
    Some((left, right - left))
}

fn masked_range(value: &[u8], start: usize, mask: &[u8], expected: &[u8]) -> Masked {
    let Some(end) = start.checked_add(mask.len()) else {
        return Masked::Overflow;
    };
    if end > value.len() {
        return Masked::Overflow;
    }
    for (index, (&m, &e)) in mask.iter().zip(expected).enumerate() {
        if value[start + index] & m != e {
            return Masked::NotAllowed;
        }
    }
    Masked::Allowed
}
