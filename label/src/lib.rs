//! Class labels of annotated objects.

use bbox::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A rectangle paired with its class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label<R, C>
where
    R: Rect,
{
    pub rect: R,
    pub class: C,
}

/// The class ID of an annotated object.
///
/// Positive values are object classes, zero is the background and
/// negative values mark crowd regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub i32);

impl ClassId {
    pub const BACKGROUND: ClassId = ClassId(0);

    pub fn is_crowd(&self) -> bool {
        self.0 < 0
    }

    pub fn is_background(&self) -> bool {
        self.0 == 0
    }

    pub fn is_object(&self) -> bool {
        self.0 > 0
    }

    pub fn kind(&self) -> ClassKind {
        match self.0 {
            id if id < 0 => ClassKind::Crowd,
            0 => ClassKind::Background,
            _ => ClassKind::Object,
        }
    }
}

impl From<i32> for ClassId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl From<ClassId> for i32 {
    fn from(id: ClassId) -> Self {
        id.0
    }
}

impl From<ClassId> for i64 {
    fn from(id: ClassId) -> Self {
        id.0 as i64
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a class ID in target assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Background,
    Object,
    Crowd,
}

impl<R> Label<R, ClassId>
where
    R: Rect,
{
    pub fn is_crowd(&self) -> bool {
        self.class.is_crowd()
    }
}
