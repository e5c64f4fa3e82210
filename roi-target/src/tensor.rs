//! Conversion of target batches to tensors.

use crate::{common::*, target::TargetBatch};
use tch::Tensor;

/// The tensors of a [TargetBatch], all on CPU.
#[derive(Debug)]
pub struct TargetTensors {
    /// `[N, 4]` ROIs in `(y1, x1, y2, x2)` order.
    pub rois: Tensor,
    /// `[N]` class IDs.
    pub class_ids: Tensor,
    /// `[N, 4]` normalized box refinements.
    pub deltas: Tensor,
    /// `[N, H, W]` binary mask targets.
    pub masks: Tensor,
}

impl TargetBatch {
    pub fn to_tensors(&self) -> TargetTensors {
        let n_rows = self.len() as i64;
        let [mask_h, mask_w] = self.mask_shape();

        let rois: Vec<f32> = self
            .rois()
            .iter()
            .flat_map(|rect| rect.tlbr())
            .map(|value| value as f32)
            .collect();
        let class_ids: Vec<i64> = self.class_ids().iter().map(|&id| id.into()).collect();
        let deltas: Vec<f32> = self
            .deltas()
            .iter()
            .flat_map(|delta| delta.to_array())
            .map(|value| value as f32)
            .collect();
        let masks: Vec<f32> = self.masks().iter().copied().collect();

        TargetTensors {
            rois: Tensor::of_slice(&rois).view([n_rows, 4]),
            class_ids: Tensor::of_slice(&class_ids),
            deltas: Tensor::of_slice(&deltas).view([n_rows, 4]),
            masks: Tensor::of_slice(&masks).view([n_rows, mask_h as i64, mask_w as i64]),
        }
    }
}
