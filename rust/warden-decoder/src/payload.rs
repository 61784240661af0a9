use warden_topology::Encoding;

use crate::WardenDecoderError;

/// The located byte range of one layout node within a specific buffer.
///
/// `location` is an absolute offset into the buffer the payload was computed
/// against, selector bytes included; `size` is the byte length of the
/// value's complete representation at that location. For offset-addressed
/// values the range starts at the length word, so a plucked dynamic value is
/// the standard encoding of that value with its leading offset word
/// stripped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    /// Absolute byte offset into the inspected buffer.
    pub location: usize,
    /// Byte length of the value's complete representation.
    pub size: usize,
    /// Encoding kind echoed from the layout node.
    pub encoding: Encoding,
    /// Inlining echoed from the layout node.
    pub inlined: bool,
    /// Child payloads: one per layout child, one per runtime element for
    /// arrays, or the single matching branch for variant positions.
    pub children: Vec<Payload>,
}

impl Payload {
    /// Extracts this payload's bytes from the buffer it was computed
    /// against.
    pub fn pluck<'a>(&self, data: &'a [u8]) -> Result<&'a [u8], WardenDecoderError> {
        pluck(data, self.location, self.size)
    }
}

/// Extracts the literal byte slice at `location..location + size`.
///
/// Fails when the range extends past the end of `data`. Passing a range that
/// was computed against a different buffer is the caller's mistake; the
/// bounds check still holds, the slice is just meaningless.
pub fn pluck(data: &[u8], location: usize, size: usize) -> Result<&[u8], WardenDecoderError> {
    let end = location
        .checked_add(size)
        .ok_or(WardenDecoderError::WordOverflow { location })?;
    if end > data.len() {
        return Err(WardenDecoderError::OutOfBounds {
            location,
            size,
            length: data.len(),
        });
    }
    Ok(&data[location..end])
}
