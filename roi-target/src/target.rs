//! Detection target assignment.

use crate::{
    common::*,
    config::TargetConfig,
    delta::BoxDelta,
    ground_truth::GroundTruth,
    mask::{binarize, mask_to_f32, CropResize},
};
use bbox::{argmax_per_row, iou_matrix, max_per_row};

/// The sampled ROIs of one image and their training targets.
///
/// Rows are ordered as positives, then negatives, then zero padding. All
/// per-row collections have the same length.
#[derive(Debug, Clone, PartialEq, Getters, CopyGetters)]
pub struct TargetBatch {
    /// The sampled ROIs in normalized coordinates.
    #[getset(get = "pub")]
    rois: Vec<TLBR<f64>>,
    /// The class of each ROI, background for negatives and padding.
    #[getset(get = "pub")]
    class_ids: Vec<ClassId>,
    /// The normalized box refinement of each ROI, zero for negatives and padding.
    #[getset(get = "pub")]
    deltas: Vec<BoxDelta>,
    /// The `[N, H, W]` binary mask targets, zero for negatives and padding.
    #[getset(get = "pub")]
    masks: Array3<f32>,
    #[getset(get_copy = "pub")]
    positive_count: usize,
    #[getset(get_copy = "pub")]
    negative_count: usize,
}

/// A row of a [TargetBatch].
#[derive(Debug, Clone, PartialEq)]
pub struct AssignedSample<'a> {
    pub roi: &'a TLBR<f64>,
    pub class_id: ClassId,
    pub delta: &'a BoxDelta,
    pub mask: ArrayView2<'a, f32>,
    pub is_positive: bool,
}

impl TargetBatch {
    pub fn empty(mask_shape: [usize; 2]) -> Self {
        let [mask_h, mask_w] = mask_shape;
        Self {
            rois: vec![],
            class_ids: vec![],
            deltas: vec![],
            masks: Array3::zeros((0, mask_h, mask_w)),
            positive_count: 0,
            negative_count: 0,
        }
    }

    /// The number of rows, padding included.
    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    /// The number of zero rows appended after the negatives.
    pub fn padding_count(&self) -> usize {
        self.len() - self.positive_count - self.negative_count
    }

    pub fn mask_shape(&self) -> [usize; 2] {
        let (_, mask_h, mask_w) = self.masks.dim();
        [mask_h, mask_w]
    }

    pub fn sample(&self, index: usize) -> Option<AssignedSample<'_>> {
        (index < self.len()).then(|| AssignedSample {
            roi: &self.rois[index],
            class_id: self.class_ids[index],
            delta: &self.deltas[index],
            mask: self.masks.index_axis(Axis(0), index),
            is_positive: index < self.positive_count,
        })
    }

    pub fn samples(&self) -> impl Iterator<Item = AssignedSample<'_>> + '_ {
        (0..self.len()).filter_map(move |index| self.sample(index))
    }

    /// Appends zero rows until the batch has `len` rows.
    ///
    /// The batch is left as is if it already has `len` rows or more.
    pub fn pad_to(&mut self, len: usize) {
        let n_pad = len.saturating_sub(self.len());
        if n_pad == 0 {
            return;
        }

        let [mask_h, mask_w] = self.mask_shape();
        let zero_rect = TLBR::from_tlbr([0.0; 4]);
        self.rois.extend(iter_n(zero_rect, n_pad));
        self.class_ids.extend(iter_n(ClassId::BACKGROUND, n_pad));
        self.deltas.extend(iter_n(BoxDelta::default(), n_pad));

        let mut masks = Array3::zeros((len, mask_h, mask_w));
        masks
            .slice_mut(ndarray::s![..self.masks.len_of(Axis(0)), .., ..])
            .assign(&self.masks);
        self.masks = masks;
    }
}

fn iter_n<T>(value: T, count: usize) -> impl Iterator<Item = T>
where
    T: Clone,
{
    std::iter::repeat(value).take(count)
}

/// Subsamples proposals and computes their classification, box refinement
/// and mask targets.
///
/// Positive proposals overlap a ground truth object by at least
/// `map_iou`. Negative proposals overlap every object by less than
/// `map_iou` and do not touch any crowd region. Both sets are drawn at
/// random using `rng`, keeping the positive fraction near
/// `roi_positive_ratio`.
///
/// When no positive is found, no negative is drawn either and the batch is
/// empty, unless `sample_negatives_without_positives` is set.
pub fn assign_targets<C, R>(
    proposals: &[TLBR<f64>],
    ground_truth: &GroundTruth,
    config: &TargetConfig,
    resampler: &C,
    rng: &mut R,
) -> Result<TargetBatch>
where
    C: CropResize + ?Sized,
    R: Rng + ?Sized,
{
    config.validate()?;

    let n_proposals = proposals.len();
    let map_iou = config.map_iou.to_f64();
    let mask_shape = config.mask_shape;
    let [mask_h, mask_w] = mask_shape;

    let crowd_indices = ground_truth.crowd_indices();
    let object_indices = ground_truth.object_indices();
    let n_padding = ground_truth.padding_count();
    if n_padding > 0 {
        trace!("ignore {} ground truth rows with zero class ID", n_padding);
    }

    // proposals overlapping crowds cannot be negatives
    let no_crowd: Vec<bool> = if crowd_indices.is_empty() {
        vec![true; n_proposals]
    } else {
        let crowd_boxes: Vec<_> = crowd_indices
            .iter()
            .map(|&index| ground_truth.boxes()[index])
            .collect();
        let crowd_iou_threshold = config.crowd_iou_threshold.to_f64();
        let crowd_overlaps = iou_matrix(proposals, &crowd_boxes);
        let no_crowd: Vec<bool> = max_per_row(crowd_overlaps.view())
            .iter()
            .map(|&iou| iou < crowd_iou_threshold)
            .collect();
        trace!(
            "{} of {} proposals overlap {} crowd regions",
            no_crowd.iter().filter(|&&flag| !flag).count(),
            n_proposals,
            crowd_boxes.len()
        );
        no_crowd
    };

    let object_boxes: Vec<_> = object_indices
        .iter()
        .map(|&index| ground_truth.boxes()[index])
        .collect();
    let overlaps = iou_matrix(proposals, &object_boxes);
    let roi_iou_max = max_per_row(overlaps.view());
    let roi_gt_assignment = argmax_per_row(overlaps.view());

    // positive ROIs paired with their ground truth indices
    let positives: Vec<(usize, usize)> = {
        let candidates: Vec<(usize, usize)> = izip!(0.., &roi_iou_max, &roi_gt_assignment)
            .filter(|&(_, &iou, _)| iou >= map_iou)
            .filter_map(|(roi_index, _, assignment)| {
                assignment.map(|object_index| (roi_index, object_indices[object_index]))
            })
            .collect();
        subsample(candidates, config.max_positive_count(), rng)
    };
    let positive_count = positives.len();

    let negatives: Vec<usize> = {
        let negative_count = config.negative_count(positive_count);
        if negative_count > 0 {
            let candidates: Vec<usize> = izip!(0.., &roi_iou_max, &no_crowd)
                .filter(|&(_, &iou, &no_crowd)| iou < map_iou && no_crowd)
                .map(|(roi_index, _, _)| roi_index)
                .collect();
            subsample(candidates, negative_count, rng)
        } else {
            vec![]
        }
    };
    let negative_count = negatives.len();

    debug!(
        "assigned {} positive and {} negative ROIs out of {} proposals",
        positive_count, negative_count, n_proposals
    );

    let n_rows = positive_count + negative_count;
    let mut rois = Vec::with_capacity(n_rows);
    let mut class_ids = Vec::with_capacity(n_rows);
    let mut deltas = Vec::with_capacity(n_rows);
    let mut masks = Array3::zeros((n_rows, mask_h, mask_w));

    for (row, &(roi_index, gt_index)) in positives.iter().enumerate() {
        let roi = &proposals[roi_index];
        let gt_box = &ground_truth.boxes()[gt_index];

        rois.push(*roi);
        class_ids.push(ground_truth.class_ids()[gt_index]);
        deltas.push(BoxDelta::encode(roi, gt_box).normalize(&config.bbox_std_dev));

        // mini-masks live in the local frame of their ground truth box
        let crop = if config.use_mini_mask {
            roi.in_frame_of(gt_box)
        } else {
            Some(*roi)
        };

        if let Some(crop) = crop {
            let source = mask_to_f32(ground_truth.mask(gt_index));
            let mut target = resampler.crop_and_resize(source.view(), &crop, mask_shape);
            ensure!(
                target.dim() == (mask_h, mask_w),
                "the resampler returns a mask of shape {:?}, but expect {:?}",
                target.dim(),
                mask_shape
            );
            binarize(&mut target);
            masks.index_axis_mut(Axis(0), row).assign(&target);
        }
    }

    for &roi_index in &negatives {
        rois.push(proposals[roi_index]);
        class_ids.push(ClassId::BACKGROUND);
        deltas.push(BoxDelta::default());
    }

    let mut batch = TargetBatch {
        rois,
        class_ids,
        deltas,
        masks,
        positive_count,
        negative_count,
    };

    if config.pad_to_full {
        batch.pad_to(config.train_rois_per_image);
    }

    Ok(batch)
}

/// Draws up to `count` items in random order without replacement.
fn subsample<T, R>(mut items: Vec<T>, count: usize, rng: &mut R) -> Vec<T>
where
    R: Rng + ?Sized,
{
    items.shuffle(rng);
    items.truncate(count);
    items
}
