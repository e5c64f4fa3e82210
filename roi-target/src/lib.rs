//! Training target assignment for region-proposal instance detectors.
//!
//! Given the proposals of one image and its ground truth objects, the
//! [assign_targets] function draws a balanced set of positive and negative
//! regions and computes the classification labels, box refinement targets
//! and binary mask targets for them.

mod common;
pub mod config;
pub mod delta;
pub mod driver;
pub mod ground_truth;
pub mod mask;
pub mod ratio;
pub mod target;
#[cfg(feature = "with-tch")]
pub mod tensor;

pub use config::*;
pub use delta::*;
pub use driver::*;
pub use ground_truth::*;
pub use mask::*;
pub use ratio::*;
pub use target::*;
#[cfg(feature = "with-tch")]
pub use tensor::*;
