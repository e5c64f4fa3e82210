//! Mask cropping and resampling.

use crate::common::*;

/// The crop-and-resize primitive applied to instance masks.
///
/// `crop` is expressed in coordinates normalized to the source grid, where
/// `0` and `1` are the centers of the first and the last pixel. The crop
/// may reach beyond the grid.
pub trait CropResize {
    fn crop_and_resize(
        &self,
        source: ArrayView2<f32>,
        crop: &TLBR<f64>,
        shape: [usize; 2],
    ) -> Array2<f32>;
}

impl<T> CropResize for &T
where
    T: CropResize + ?Sized,
{
    fn crop_and_resize(
        &self,
        source: ArrayView2<f32>,
        crop: &TLBR<f64>,
        shape: [usize; 2],
    ) -> Array2<f32> {
        (*self).crop_and_resize(source, crop, shape)
    }
}

/// Bilinear crop-and-resize on the CPU.
///
/// Samples outside the source grid take the extrapolation value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bilinear {
    pub extrapolation_value: f32,
}

impl Default for Bilinear {
    fn default() -> Self {
        Self {
            extrapolation_value: 0.0,
        }
    }
}

impl CropResize for Bilinear {
    fn crop_and_resize(
        &self,
        source: ArrayView2<f32>,
        crop: &TLBR<f64>,
        shape: [usize; 2],
    ) -> Array2<f32> {
        let [crop_h, crop_w] = shape;
        let (source_h, source_w) = source.dim();

        if source_h == 0 || source_w == 0 {
            return Array2::from_elem((crop_h, crop_w), self.extrapolation_value);
        }

        let ys = sample_positions(crop.t(), crop.b(), source_h, crop_h);
        let xs = sample_positions(crop.l(), crop.r(), source_w, crop_w);

        Array2::from_shape_fn((crop_h, crop_w), |(row, col)| {
            match (ys[row], xs[col]) {
                (Some(in_y), Some(in_x)) => bilinear_at(&source, in_y, in_x),
                _ => self.extrapolation_value,
            }
        })
    }
}

/// Computes the source positions sampled along one axis, or `None` for
/// positions outside the source.
fn sample_positions(lower: f64, upper: f64, source_len: usize, crop_len: usize) -> Vec<Option<f64>> {
    let max_pos = (source_len - 1) as f64;

    (0..crop_len)
        .map(|index| {
            let pos = if crop_len > 1 {
                // multiply before dividing so that the last sample lands exactly on `upper`
                let offset = (upper - lower) * max_pos * index as f64 / (crop_len - 1) as f64;
                lower * max_pos + offset
            } else {
                0.5 * (lower + upper) * max_pos
            };

            (0.0..=max_pos).contains(&pos).then(|| pos)
        })
        .collect()
}

fn bilinear_at(source: &ArrayView2<f32>, in_y: f64, in_x: f64) -> f32 {
    let top = in_y.floor() as usize;
    let bottom = in_y.ceil() as usize;
    let left = in_x.floor() as usize;
    let right = in_x.ceil() as usize;
    let y_lerp = (in_y - top as f64) as f32;
    let x_lerp = (in_x - left as f64) as f32;

    let top_left = source[[top, left]];
    let top_right = source[[top, right]];
    let bottom_left = source[[bottom, left]];
    let bottom_right = source[[bottom, right]];

    let top = top_left + (top_right - top_left) * x_lerp;
    let bottom = bottom_left + (bottom_right - bottom_left) * x_lerp;
    top + (bottom - top) * y_lerp
}

/// Rounds each pixel to the nearest integer, ties to even.
pub fn binarize(mask: &mut Array2<f32>) {
    mask.mapv_inplace(|value| value.round_ties_even());
}

/// Converts a boolean mask to a grid of zeros and ones.
pub fn mask_to_f32(mask: ArrayView2<bool>) -> Array2<f32> {
    mask.mapv(|value| if value { 1.0 } else { 0.0 })
}

/// Crops full-resolution instance masks to their boxes and resizes them to
/// `mini_shape`.
///
/// `masks` has shape `[N, H, W]` and `boxes` holds the `N` normalized boxes.
pub fn minimize_masks<C>(
    boxes: &[TLBR<f64>],
    masks: &Array3<bool>,
    mini_shape: [usize; 2],
    resampler: &C,
) -> Result<Array3<bool>>
where
    C: CropResize + ?Sized,
{
    let [mini_h, mini_w] = mini_shape;
    let n_masks = masks.len_of(Axis(0));
    ensure!(
        boxes.len() == n_masks,
        "the number of boxes ({}) does not match the number of masks ({})",
        boxes.len(),
        n_masks
    );

    let mut mini_masks = Array3::from_elem((n_masks, mini_h, mini_w), false);

    izip!(boxes, masks.outer_iter(), mini_masks.outer_iter_mut()).for_each(
        |(rect, mask, mut mini_mask)| {
            let mut resized = resampler.crop_and_resize(mask_to_f32(mask).view(), rect, mini_shape);
            binarize(&mut resized);
            mini_mask.assign(&resized.mapv(|value| value >= 1.0));
        },
    );

    Ok(mini_masks)
}

/// Pastes a mini-mask back to a full-resolution grid of `image_shape`
/// within the box `rect`.
pub fn expand_mask(rect: &TLBR<f64>, mini_mask: ArrayView2<bool>, image_shape: [usize; 2]) -> Array2<bool> {
    let [image_h, image_w] = image_shape;
    let mut mask = Array2::from_elem((image_h, image_w), false);
    let (mini_h, mini_w) = mini_mask.dim();

    if image_h == 0 || image_w == 0 || mini_h == 0 || mini_w == 0 {
        return mask;
    }

    let mini_mask = mask_to_f32(mini_mask);
    let max_y = (image_h - 1).max(1) as f64;
    let max_x = (image_w - 1).max(1) as f64;
    let mini_max_y = (mini_h - 1) as f64;
    let mini_max_x = (mini_w - 1) as f64;

    let local_positions = |lower: f64, upper: f64, max_pos: f64, mini_max_pos: f64, len: usize| {
        (0..len)
            .map(|index| {
                let pos = index as f64 / max_pos;
                let extent = upper - lower;
                let local = if extent > 0.0 {
                    (pos - lower) / extent
                } else {
                    -1.0
                };
                (0.0..=1.0).contains(&local).then(|| local * mini_max_pos)
            })
            .collect::<Vec<_>>()
    };

    let ys = local_positions(rect.t(), rect.b(), max_y, mini_max_y, image_h);
    let xs = local_positions(rect.l(), rect.r(), max_x, mini_max_x, image_w);

    mask.indexed_iter_mut().for_each(|((row, col), pixel)| {
        if let (Some(in_y), Some(in_x)) = (ys[row], xs[col]) {
            *pixel = bilinear_at(&mini_mask.view(), in_y, in_x).round_ties_even() >= 1.0;
        }
    });

    mask
}
