//! Safe bounding box types and the box overlap functions.

mod common;

pub use rect::*;
pub mod rect;

pub use tlbr::*;
pub mod tlbr;

pub use cycxhw::*;
pub mod cycxhw;

pub use iou::*;
pub mod iou;

pub mod prelude {
    pub use crate::rect::{Rect, RectFloat, RectNum};
}
