//! Identifiers and capacity limits
//!
//! Class ids index the working alphabet (see [`crate::ClassTable`]), not
//! Unicode code points. Config and proto ids are plain indices into a
//! compiled class.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a character class in the working alphabet
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ClassId(pub u16);

impl ClassId {
    /// The "no class" id. Noise classifications are reported with it.
    pub const NONE: ClassId = ClassId(0);

    /// Returns the id as a table index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns true for [`ClassId::NONE`]
    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl From<u16> for ClassId {
    fn from(id: u16) -> Self {
        ClassId(id)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Font identifier (index into an external font table)
pub type FontId = u16;

/// Index into a [`crate::ShapeTable`]
pub type ShapeId = u32;

/// Index of a prototype within a compiled class
pub type ProtoId = usize;

/// Index of a configuration within a compiled class
pub type ConfigId = usize;

/// Maximum number of prototypes in one compiled class
pub const MAX_NUM_PROTOS: usize = 512;

/// Maximum number of configurations in one compiled class
pub const MAX_NUM_CONFIGS: usize = 32;

/// Feature counts above this are treated as a failed extraction
pub const UNLIKELY_NUM_FEATURES: usize = 200;
