//! Target assignment configuration.

use crate::{common::*, ratio::Ratio};

/// The options of the detection target assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// The minimum IoU with a ground truth object for a proposal to be positive.
    pub map_iou: Ratio,
    /// The maximum number of sampled ROIs per image.
    pub train_rois_per_image: usize,
    /// The target fraction of positive ROIs in the sampled batch.
    pub roi_positive_ratio: Ratio,
    /// The height and width of mask targets.
    pub mask_shape: [usize; 2],
    /// The per-coordinate normalization factors of box refinement targets.
    pub bbox_std_dev: [R64; 4],
    /// If set, ground truth masks are stored cropped to their boxes.
    pub use_mini_mask: bool,
    /// The height and width of mini-masks.
    pub mini_mask_shape: [usize; 2],
    /// Proposals overlapping a crowd region by this IoU or more are never negatives.
    pub crowd_iou_threshold: Ratio,
    /// If set, negatives are sampled even when an image yields no positive.
    pub sample_negatives_without_positives: bool,
    /// If set, batches are zero-padded to `train_rois_per_image` rows.
    pub pad_to_full: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            map_iou: Ratio::try_from(0.5).unwrap(),
            train_rois_per_image: 200,
            roi_positive_ratio: Ratio::try_from(0.33).unwrap(),
            mask_shape: [28, 28],
            bbox_std_dev: [r64(0.1), r64(0.1), r64(0.2), r64(0.2)],
            use_mini_mask: true,
            mini_mask_shape: [56, 56],
            crowd_iou_threshold: Ratio::try_from(0.001).unwrap(),
            sample_negatives_without_positives: false,
            pad_to_full: false,
        }
    }
}

impl TargetConfig {
    /// Loads and validates a JSON5 configuration file.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Self = json5::from_str(&text)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let Self {
            map_iou,
            train_rois_per_image,
            roi_positive_ratio,
            mask_shape,
            bbox_std_dev,
            mini_mask_shape,
            crowd_iou_threshold,
            ..
        } = *self;

        ensure!(!map_iou.is_zero(), "map_iou must be positive");
        // a zero threshold would mark every proposal as touching a crowd
        ensure!(
            !crowd_iou_threshold.is_zero(),
            "crowd_iou_threshold must be positive"
        );
        ensure!(
            train_rois_per_image > 0,
            "train_rois_per_image must be positive"
        );
        ensure!(
            !roi_positive_ratio.is_zero(),
            "roi_positive_ratio must be positive"
        );
        ensure!(
            mask_shape.iter().all(|&size| size > 0),
            "mask_shape must have positive height and width, but get {:?}",
            mask_shape
        );
        ensure!(
            mini_mask_shape.iter().all(|&size| size > 0),
            "mini_mask_shape must have positive height and width, but get {:?}",
            mini_mask_shape
        );
        ensure!(
            bbox_std_dev.iter().all(|&std| std > 0.0),
            "bbox_std_dev must be positive, but get {:?}",
            bbox_std_dev
        );
        Ok(())
    }

    /// The maximum number of positive ROIs per image, `floor(rois × ratio)`.
    pub fn max_positive_count(&self) -> usize {
        (self.train_rois_per_image as f64 * self.roi_positive_ratio.to_f64()).floor() as usize
    }

    /// The number of negatives to request for a realized count of positives.
    ///
    /// It never exceeds the room left in the batch.
    pub fn negative_count(&self, positive_count: usize) -> usize {
        let ratio = self.roi_positive_ratio.to_f64();
        let room = self.train_rois_per_image.saturating_sub(positive_count);

        let count = if positive_count > 0 {
            let positive_count = positive_count as f64;
            (positive_count / ratio - positive_count).round() as usize
        } else if self.sample_negatives_without_positives {
            ((1.0 - ratio) * self.train_rois_per_image as f64).round() as usize
        } else {
            0
        };

        count.min(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::abs_diff_eq;

    #[test]
    fn default_config_is_valid() {
        let config = TargetConfig::default();
        config.validate().unwrap();
        assert_eq!(config.max_positive_count(), 66);
        assert_eq!(config.negative_count(66), 134);
        assert_eq!(config.negative_count(3), 6);
        assert_eq!(config.negative_count(0), 0);
    }

    #[test]
    fn negatives_without_positives() {
        let config = TargetConfig {
            sample_negatives_without_positives: true,
            train_rois_per_image: 10,
            roi_positive_ratio: Ratio::try_from(0.25).unwrap(),
            ..Default::default()
        };
        assert_eq!(config.negative_count(0), 8);
        assert_eq!(config.negative_count(2), 6);
    }

    #[test]
    fn negative_count_fits_in_batch() {
        let config = TargetConfig {
            train_rois_per_image: 7,
            roi_positive_ratio: Ratio::try_from(0.3).unwrap(),
            ..Default::default()
        };
        assert_eq!(config.max_positive_count(), 2);
        (0..=config.max_positive_count()).for_each(|positive_count| {
            assert!(positive_count + config.negative_count(positive_count) <= 7);
        });
    }

    #[test]
    fn parse_partial_json5() {
        let text = r#"{
            // only override a few options
            map_iou: 0.7,
            train_rois_per_image: 64,
            use_mini_mask: false,
        }"#;
        let config: TargetConfig = json5::from_str(text).unwrap();
        config.validate().unwrap();
        assert!(abs_diff_eq!(config.map_iou, 0.7));
        assert_eq!(config.train_rois_per_image, 64);
        assert!(!config.use_mini_mask);
        assert_eq!(config.mask_shape, [28, 28]);
    }

    #[test]
    fn reject_invalid_options() {
        let config = TargetConfig {
            map_iou: Ratio::zero(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TargetConfig {
            crowd_iou_threshold: Ratio::zero(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TargetConfig {
            mask_shape: [0, 28],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TargetConfig {
            bbox_std_dev: [r64(0.1), r64(0.0), r64(0.2), r64(0.2)],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(json5::from_str::<TargetConfig>("{ roi_positive_ratio: 1.5 }").is_err());
    }
}
