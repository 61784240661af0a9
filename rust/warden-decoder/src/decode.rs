//! The head/tail walk over raw encoded bytes.
//!
//! Every encoding frame is a sequence of head slots: inlined values occupy
//! their slots directly, everything else occupies one word holding an offset
//! relative to the frame start. Tails (length-prefixed byte strings, array
//! element frames, non-inlined tuples, embedded payloads) live past the head
//! and are reached through those offsets. The walk threads two absolute
//! positions through recursion: the frame base for offset resolution and a
//! limit bounding every read, so embedded payloads can never read past their
//! own extent even when the outer buffer continues.

use warden_topology::{Encoding, Layout};

use crate::{Payload, WardenDecoderError};

const WORD: usize = 32;

/// Computes the located [`Payload`] tree for a whole call-data buffer.
///
/// The root layout must describe an encoded call ([`Encoding::Calldata`] or
/// [`Encoding::AbiEncoded`]), or be a variant position whose branches do.
/// The root payload spans the entire buffer; descendant locations are
/// absolute offsets into it, selector bytes included.
pub fn inspect(data: &[u8], layout: &Layout) -> Result<Payload, WardenDecoderError> {
    match layout.encoding {
        Encoding::Calldata | Encoding::AbiEncoded => {
            if data.len() < layout.leading_bytes {
                return Err(WardenDecoderError::OutOfBounds {
                    location: 0,
                    size: layout.leading_bytes,
                    length: data.len(),
                });
            }
            let children: Vec<&Layout> = layout.children.iter().collect();
            let (children, _) = decode_frame(data, &children, layout.leading_bytes, data.len())?;
            Ok(Payload {
                location: 0,
                size: data.len(),
                encoding: layout.encoding,
                inlined: false,
                children,
            })
        }
        Encoding::Dynamic if layout.is_variant() => {
            for branch in &layout.children {
                if let Ok(child) = inspect(data, branch) {
                    return Ok(Payload {
                        location: 0,
                        size: data.len(),
                        encoding: Encoding::Dynamic,
                        inlined: false,
                        children: vec![child],
                    });
                }
            }
            Err(WardenDecoderError::NoMatchingBranch { location: 0 })
        }
        _ => Err(WardenDecoderError::UnsupportedRoot),
    }
}

/// Computes the payload of a single layout node whose representation begins
/// at `location`: directly for inlined nodes, at the tail region for nodes
/// normally reached through offset indirection.
///
/// This is the entry point for re-decoding one branch of a variant position
/// once its region is known.
pub fn decode_at(
    data: &[u8],
    layout: &Layout,
    location: usize,
) -> Result<Payload, WardenDecoderError> {
    if layout.inlined {
        decode_inline(data, layout, location, data.len())
    } else {
        decode_tail(data, layout, location, data.len())
    }
}

/// Walks one frame's head slots. Returns the child payloads and the furthest
/// byte the frame touches (head and tails included).
fn decode_frame(
    data: &[u8],
    layouts: &[&Layout],
    frame_base: usize,
    limit: usize,
) -> Result<(Vec<Payload>, usize), WardenDecoderError> {
    let mut payloads = Vec::with_capacity(layouts.len());
    let mut cursor = frame_base;
    let mut end = frame_base;
    for layout in layouts {
        if layout.inlined {
            let payload = decode_inline(data, layout, cursor, limit)?;
            cursor += payload.size;
            payloads.push(payload);
        } else {
            let offset = read_word(data, cursor, limit)?;
            let target = frame_base
                .checked_add(offset)
                .ok_or(WardenDecoderError::WordOverflow { location: cursor })?;
            let payload = decode_tail(data, layout, target, limit)?;
            end = end.max(payload.location + payload.size);
            cursor += WORD;
            payloads.push(payload);
        }
        end = end.max(cursor);
    }
    Ok((payloads, end))
}

fn decode_inline(
    data: &[u8],
    layout: &Layout,
    location: usize,
    limit: usize,
) -> Result<Payload, WardenDecoderError> {
    match layout.encoding {
        Encoding::EtherValue => Ok(Payload {
            location,
            size: 0,
            encoding: Encoding::EtherValue,
            inlined: true,
            children: vec![],
        }),
        Encoding::Static => {
            bounds(location, WORD, limit)?;
            Ok(Payload {
                location,
                size: WORD,
                encoding: Encoding::Static,
                inlined: true,
                children: vec![],
            })
        }
        Encoding::Tuple => {
            let children: Vec<&Layout> = layout.children.iter().collect();
            let (children, end) = decode_frame(data, &children, location, limit)?;
            Ok(Payload {
                location,
                size: end - location,
                encoding: Encoding::Tuple,
                inlined: true,
                children,
            })
        }
        _ => Err(WardenDecoderError::InconsistentLayout),
    }
}

fn decode_tail(
    data: &[u8],
    layout: &Layout,
    location: usize,
    limit: usize,
) -> Result<Payload, WardenDecoderError> {
    match layout.encoding {
        Encoding::Dynamic if layout.is_variant() => {
            for branch in &layout.children {
                let decoded = if branch.inlined {
                    decode_inline(data, branch, location, limit)
                } else {
                    decode_tail(data, branch, location, limit)
                };
                if let Ok(child) = decoded {
                    return Ok(Payload {
                        location,
                        size: child.size,
                        encoding: Encoding::Dynamic,
                        inlined: false,
                        children: vec![child],
                    });
                }
            }
            Err(WardenDecoderError::NoMatchingBranch { location })
        }
        Encoding::Dynamic => {
            let length = read_word(data, location, limit)?;
            let size = WORD + padded(length, location)?;
            bounds(location, size, limit)?;
            Ok(Payload {
                location,
                size,
                encoding: Encoding::Dynamic,
                inlined: false,
                children: vec![],
            })
        }
        Encoding::Tuple => {
            let children: Vec<&Layout> = layout.children.iter().collect();
            let (children, end) = decode_frame(data, &children, location, limit)?;
            Ok(Payload {
                location,
                size: end - location,
                encoding: Encoding::Tuple,
                inlined: false,
                children,
            })
        }
        Encoding::Array => {
            let count = read_word(data, location, limit)?;
            let frame_base = location + WORD;
            // Sanity bound before allocating: no element count can exceed
            // the bytes left in the frame.
            if count > limit.saturating_sub(frame_base) {
                return Err(WardenDecoderError::OutOfBounds {
                    location: frame_base,
                    size: count,
                    length: limit.saturating_sub(frame_base),
                });
            }
            let elements: Vec<&Layout> = if layout.children.len() == 1 {
                vec![&layout.children[0]; count]
            } else {
                if layout.children.len() != count {
                    return Err(WardenDecoderError::ElementCountMismatch {
                        declared: layout.children.len(),
                        actual: count,
                    });
                }
                layout.children.iter().collect()
            };
            let (children, end) = decode_frame(data, &elements, frame_base, limit)?;
            Ok(Payload {
                location,
                size: end - location,
                encoding: Encoding::Array,
                inlined: false,
                children,
            })
        }
        Encoding::Calldata | Encoding::AbiEncoded => {
            let length = read_word(data, location, limit)?;
            let size = WORD + padded(length, location)?;
            bounds(location, size, limit)?;
            let mut children = vec![];
            if !layout.children.is_empty() {
                let content = location + WORD;
                if layout.leading_bytes > length {
                    return Err(WardenDecoderError::OutOfBounds {
                        location: content,
                        size: layout.leading_bytes,
                        length,
                    });
                }
                let layouts: Vec<&Layout> = layout.children.iter().collect();
                let frame_base = content + layout.leading_bytes;
                (children, _) = decode_frame(data, &layouts, frame_base, content + length)?;
            }
            Ok(Payload {
                location,
                size,
                encoding: layout.encoding,
                inlined: false,
                children,
            })
        }
        _ => Err(WardenDecoderError::InconsistentLayout),
    }
}

/// Reads one 32 byte big-endian word as an address-sized integer. The upper
/// 24 bytes must be zero: no real buffer is addressable past that range.
fn read_word(data: &[u8], location: usize, limit: usize) -> Result<usize, WardenDecoderError> {
    bounds(location, WORD, limit)?;
    let word = &data[location..location + WORD];
    if word[..WORD - 8].iter().any(|&byte| byte != 0) {
        return Err(WardenDecoderError::WordOverflow { location });
    }
    let mut tail = [0u8; 8];
    tail.copy_from_slice(&word[WORD - 8..]);
    usize::try_from(u64::from_be_bytes(tail))
        .map_err(|_| WardenDecoderError::WordOverflow { location })
}

fn bounds(location: usize, size: usize, limit: usize) -> Result<(), WardenDecoderError> {
    let end = location
        .checked_add(size)
        .ok_or(WardenDecoderError::WordOverflow { location })?;
    if end > limit {
        return Err(WardenDecoderError::OutOfBounds {
            location,
            size,
            length: limit,
        });
    }
    Ok(())
}

fn padded(length: usize, location: usize) -> Result<usize, WardenDecoderError> {
    Ok(length
        .checked_add(31)
        .ok_or(WardenDecoderError::WordOverflow { location })?
        / WORD
        * WORD)
}
