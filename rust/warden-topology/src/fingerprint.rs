use crate::{Condition, Layout, WardenTopologyError, pack, resolve};

/// The size of a layout fingerprint in bytes.
pub const FINGERPRINT_SIZE: usize = 32;

/// A structural identity for resolved layouts.
///
/// Two condition trees that resolve to the same layout share a fingerprint
/// regardless of surface differences such as transparent connective wrapping
/// or comparison value content; trees differing in shape, child order or
/// child count never collide. This is the cache key for reusing decoded
/// layouts across repeated evaluations of structurally identical policies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_SIZE]);

impl Fingerprint {
    /// The raw digest bytes.
    pub fn bytes(&self) -> &[u8; FINGERPRINT_SIZE] {
        &self.0
    }
}

impl From<[u8; FINGERPRINT_SIZE]> for Fingerprint {
    fn from(value: [u8; FINGERPRINT_SIZE]) -> Self {
        Fingerprint(value)
    }
}

impl Layout {
    /// Computes the structural fingerprint of this layout.
    ///
    /// The digest is taken over the packed form, which encodes exactly the
    /// structural content and nothing else; a layout the packed form cannot
    /// represent has no fingerprint.
    pub fn fingerprint(&self) -> Result<Fingerprint, WardenTopologyError> {
        Ok(Fingerprint(blake3::hash(&pack(self)?).into()))
    }
}

/// Resolves a condition tree and fingerprints the resulting layout.
pub fn fingerprint(condition: &Condition) -> Result<Fingerprint, WardenTopologyError> {
    resolve(condition)?.fingerprint()
}
