//! Ground truth objects of one image.

use crate::common::*;

/// The annotated objects of an image.
///
/// Masks are stored as a `[N, H, W]` array, one grid per object. The grid
/// is either at image resolution or a mini-mask cropped to the object box.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct GroundTruth {
    #[getset(get = "pub")]
    class_ids: Vec<ClassId>,
    #[getset(get = "pub")]
    boxes: Vec<TLBR<f64>>,
    #[getset(get = "pub")]
    masks: Array3<bool>,
}

impl GroundTruth {
    pub fn new(class_ids: Vec<ClassId>, boxes: Vec<TLBR<f64>>, masks: Array3<bool>) -> Result<Self> {
        let n_masks = masks.len_of(Axis(0));
        ensure!(
            class_ids.len() == boxes.len() && boxes.len() == n_masks,
            "the numbers of class IDs ({}), boxes ({}) and masks ({}) do not match",
            class_ids.len(),
            boxes.len(),
            n_masks
        );

        Ok(Self {
            class_ids,
            boxes,
            masks,
        })
    }

    /// Builds the ground truth from raw class IDs, an `[N, 4]` box array
    /// and an `[N, H, W]` mask array.
    pub fn from_arrays(class_ids: &[i32], boxes: ArrayView2<f64>, masks: Array3<bool>) -> Result<Self> {
        let boxes = bbox::boxes_from_array(boxes).context("invalid ground truth boxes")?;
        let class_ids = class_ids.iter().copied().map(ClassId).collect();
        Self::new(class_ids, boxes, masks)
    }

    /// Builds the ground truth from labeled boxes and their `[N, H, W]` masks.
    pub fn from_labels<I>(labels: I, masks: Array3<bool>) -> Result<Self>
    where
        I: IntoIterator<Item = Label<TLBR<f64>, ClassId>>,
    {
        let (class_ids, boxes) = labels
            .into_iter()
            .map(|label| (label.class, label.rect))
            .unzip();
        Self::new(class_ids, boxes, masks)
    }

    /// An image without annotations, with masks of `mask_shape`.
    pub fn empty(mask_shape: [usize; 2]) -> Self {
        let [mask_h, mask_w] = mask_shape;
        Self {
            class_ids: vec![],
            boxes: vec![],
            masks: Array3::from_elem((0, mask_h, mask_w), false),
        }
    }

    pub fn len(&self) -> usize {
        self.class_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.class_ids.is_empty()
    }

    pub fn mask_shape(&self) -> [usize; 2] {
        let (_, mask_h, mask_w) = self.masks.dim();
        [mask_h, mask_w]
    }

    /// The mask of the object at `index`.
    pub fn mask(&self, index: usize) -> ArrayView2<'_, bool> {
        self.masks.index_axis(Axis(0), index)
    }

    /// The boxes paired with their class IDs.
    pub fn labels(&self) -> impl Iterator<Item = Label<TLBR<f64>, ClassId>> + '_ {
        izip!(&self.boxes, &self.class_ids).map(|(&rect, &class)| Label { rect, class })
    }

    /// Indices of crowd regions, which have negative class IDs.
    pub fn crowd_indices(&self) -> Vec<usize> {
        self.indices_where(|label| label.is_crowd())
    }

    /// Indices of objects, which have positive class IDs.
    pub fn object_indices(&self) -> Vec<usize> {
        self.indices_where(|label| label.class.kind() == ClassKind::Object)
    }

    /// The number of padding rows, which have zero class IDs.
    pub fn padding_count(&self) -> usize {
        self.labels()
            .filter(|label| label.class.kind() == ClassKind::Background)
            .count()
    }

    fn indices_where<F>(&self, predicate: F) -> Vec<usize>
    where
        F: Fn(&Label<TLBR<f64>, ClassId>) -> bool,
    {
        self.labels()
            .enumerate()
            .filter(|(_, label)| predicate(label))
            .map(|(index, _)| index)
            .collect()
    }
}

/// Drops proposals whose coordinates are all zero.
///
/// Upstream proposal layers pad their output with such rows.
pub fn trim_zero_boxes(proposals: &[TLBR<f64>]) -> Vec<TLBR<f64>> {
    proposals
        .iter()
        .filter(|rect| !rect.is_zero())
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn split_crowd_objects_and_padding() {
        let boxes = array![
            [0.0, 0.0, 0.5, 0.5],
            [0.1, 0.1, 0.3, 0.3],
            [0.0, 0.0, 0.0, 0.0],
            [0.5, 0.5, 1.0, 1.0],
        ];
        let masks = Array3::from_elem((4, 8, 8), false);
        let gt = GroundTruth::from_arrays(&[3, -1, 0, 5], boxes.view(), masks).unwrap();

        assert_eq!(gt.len(), 4);
        assert_eq!(gt.object_indices(), vec![0, 3]);
        assert_eq!(gt.crowd_indices(), vec![1]);
        assert_eq!(gt.padding_count(), 1);
        assert_eq!(gt.mask_shape(), [8, 8]);
    }

    #[test]
    fn build_from_labels() {
        let labels = vec![
            Label {
                rect: TLBR::from_tlbr([0.0, 0.0, 0.5, 0.5]),
                class: ClassId(2),
            },
            Label {
                rect: TLBR::from_tlbr([0.5, 0.5, 1.0, 1.0]),
                class: ClassId(-1),
            },
        ];
        let masks = Array3::from_elem((2, 4, 4), true);
        let gt = GroundTruth::from_labels(labels.clone(), masks).unwrap();

        assert_eq!(gt.class_ids(), &vec![ClassId(2), ClassId(-1)]);
        assert_eq!(gt.labels().collect::<Vec<_>>(), labels);
        assert_eq!(gt.crowd_indices(), vec![1]);
        assert_eq!(gt.object_indices(), vec![0]);

        let masks = Array3::from_elem((1, 4, 4), true);
        assert!(GroundTruth::from_labels(labels, masks).is_err());
    }

    #[test]
    fn reject_mismatched_counts() {
        let boxes = array![[0.0, 0.0, 0.5, 0.5], [0.1, 0.1, 0.3, 0.3]];
        let masks = Array3::from_elem((1, 8, 8), false);
        assert!(GroundTruth::from_arrays(&[1, 2], boxes.view(), masks.clone()).is_err());
        assert!(GroundTruth::from_arrays(&[1], boxes.view(), masks).is_err());
    }

    #[test]
    fn reject_wrong_box_arity() {
        let boxes = array![[0.0, 0.0, 0.5], [0.1, 0.1, 0.3]];
        let masks = Array3::from_elem((2, 8, 8), false);
        assert!(GroundTruth::from_arrays(&[1, 2], boxes.view(), masks).is_err());
    }

    #[test]
    fn trim_padding_proposals() {
        let proposals = vec![
            TLBR::from_tlbr([0.1, 0.1, 0.2, 0.2]),
            TLBR::from_tlbr([0.0, 0.0, 0.0, 0.0]),
            TLBR::from_tlbr([0.0, 0.0, 0.2, 0.2]),
        ];
        let trimmed = trim_zero_boxes(&proposals);
        assert_eq!(trimmed, vec![proposals[0], proposals[2]]);
    }
}
