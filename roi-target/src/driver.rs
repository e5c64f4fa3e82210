//! Target assignment over many images.

use crate::{
    common::*, config::TargetConfig, ground_truth::GroundTruth, mask::CropResize,
    target::{assign_targets, TargetBatch},
};
use rand::rngs::StdRng;

/// The proposals and annotations of one image in plain nested arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub image_id: u64,
    /// Proposal boxes as `(y1, x1, y2, x2)` rows.
    pub proposals: Vec<Vec<f64>>,
    pub class_ids: Vec<i32>,
    /// Ground truth boxes as `(y1, x1, y2, x2)` rows.
    pub boxes: Vec<Vec<f64>>,
    /// One `H × W` grid per object, nonzero values are foreground.
    pub masks: Vec<Vec<Vec<u8>>>,
}

impl ImageRecord {
    pub fn proposals(&self) -> Result<Vec<TLBR<f64>>> {
        rows_to_boxes(&self.proposals).context("invalid proposals")
    }

    pub fn ground_truth(&self) -> Result<GroundTruth> {
        let boxes = rows_to_boxes(&self.boxes).context("invalid ground truth boxes")?;
        ensure!(
            boxes.len() == self.class_ids.len(),
            "the numbers of boxes ({}) and class IDs ({}) do not match",
            boxes.len(),
            self.class_ids.len()
        );
        let masks = grids_to_masks(&self.masks)?;
        let labels = izip!(boxes, &self.class_ids).map(|(rect, &id)| Label {
            rect,
            class: ClassId(id),
        });
        GroundTruth::from_labels(labels, masks)
    }
}

fn rows_to_boxes(rows: &[Vec<f64>]) -> Result<Vec<TLBR<f64>>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let tlbr: [f64; 4] = row.as_slice().try_into().map_err(|_| {
                format_err!(
                    "expect a box with 4 coordinates at row {}, but get {}",
                    index,
                    row.len()
                )
            })?;
            TLBR::try_from_tlbr(tlbr).with_context(|| format!("invalid box at row {}", index))
        })
        .collect()
}

fn grids_to_masks(grids: &[Vec<Vec<u8>>]) -> Result<Array3<bool>> {
    let (mask_h, mask_w) = match grids.first() {
        Some(grid) => (grid.len(), grid.first().map(|row| row.len()).unwrap_or(0)),
        None => (0, 0),
    };

    let mut masks = Array3::from_elem((grids.len(), mask_h, mask_w), false);

    for (index, (grid, mut mask)) in izip!(grids, masks.outer_iter_mut()).enumerate() {
        ensure!(
            grid.len() == mask_h && grid.iter().all(|row| row.len() == mask_w),
            "mask {} does not have shape {}×{}",
            index,
            mask_h,
            mask_w
        );

        izip!(grid.iter().flatten(), mask.iter_mut()).for_each(|(&value, pixel)| {
            *pixel = value != 0;
        });
    }

    Ok(masks)
}

/// The outcome of target assignment for one image.
#[derive(Debug)]
pub struct ImageTargets {
    pub image_id: u64,
    pub result: Result<TargetBatch>,
}

/// Runs target assignment on each image record.
///
/// Each image draws from its own random generator seeded from `seed`, so
/// the outcome of an image does not depend on how many random numbers
/// the previous images consumed. Failures are reported per image.
pub fn assign_images<'a, I, C>(
    records: I,
    config: &TargetConfig,
    resampler: &C,
    seed: u64,
) -> Vec<ImageTargets>
where
    I: IntoIterator<Item = &'a ImageRecord>,
    C: CropResize + ?Sized,
{
    let mut seeder = StdRng::seed_from_u64(seed);

    records
        .into_iter()
        .map(|record| {
            let mut rng = StdRng::seed_from_u64(seeder.gen());
            let result = (|| -> Result<_> {
                let proposals = record.proposals()?;
                let ground_truth = record.ground_truth()?;
                assign_targets(&proposals, &ground_truth, config, resampler, &mut rng)
            })()
            .with_context(|| format!("failed to assign targets for image {}", record.image_id));

            if let Err(err) = &result {
                warn!("{:#}", err);
            }

            ImageTargets {
                image_id: record.image_id,
                result,
            }
        })
        .collect()
}
