//! Box refinement encoding.

use crate::common::*;

/// The refinement that moves a box onto a target box.
///
/// `dy` and `dx` are the center shift in units of the source box size,
/// `dh` and `dw` are the log-scale size changes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxDelta {
    pub dy: f64,
    pub dx: f64,
    pub dh: f64,
    pub dw: f64,
}

impl BoxDelta {
    /// Computes the refinement from `roi` to `target`.
    ///
    /// `roi` must have positive height and width.
    pub fn encode<R1, R2>(roi: &R1, target: &R2) -> Self
    where
        R1: Rect<Type = f64>,
        R2: Rect<Type = f64>,
    {
        let [cy, cx, h, w] = roi.cycxhw();
        let [target_cy, target_cx, target_h, target_w] = target.cycxhw();

        Self {
            dy: (target_cy - cy) / h,
            dx: (target_cx - cx) / w,
            dh: (target_h / h).ln(),
            dw: (target_w / w).ln(),
        }
    }

    /// Moves `roi` by this refinement.
    pub fn apply<R>(&self, roi: &R) -> Result<TLBR<f64>>
    where
        R: Rect<Type = f64>,
    {
        let [cy, cx, h, w] = roi.cycxhw();
        let cycxhw = CyCxHW::try_from_cycxhw([
            cy + self.dy * h,
            cx + self.dx * w,
            h * self.dh.exp(),
            w * self.dw.exp(),
        ])
        .with_context(|| format!("unable to apply refinement {:?}", self))?;
        Ok(cycxhw.to_tlbr())
    }

    /// Divides each component by its standard deviation.
    pub fn normalize(&self, std_dev: &[R64; 4]) -> Self {
        let [sy, sx, sh, sw] = *std_dev;
        Self {
            dy: self.dy / sy.raw(),
            dx: self.dx / sx.raw(),
            dh: self.dh / sh.raw(),
            dw: self.dw / sw.raw(),
        }
    }

    /// Multiplies each component by its standard deviation.
    pub fn denormalize(&self, std_dev: &[R64; 4]) -> Self {
        let [sy, sx, sh, sw] = *std_dev;
        Self {
            dy: self.dy * sy.raw(),
            dx: self.dx * sx.raw(),
            dh: self.dh * sh.raw(),
            dw: self.dw * sw.raw(),
        }
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.dy, self.dx, self.dh, self.dw]
    }

    pub fn is_zero(&self) -> bool {
        self.to_array().iter().all(|&value| value == 0.0)
    }
}

impl From<[f64; 4]> for BoxDelta {
    fn from([dy, dx, dh, dw]: [f64; 4]) -> Self {
        Self { dy, dx, dh, dw }
    }
}

impl From<BoxDelta> for [f64; 4] {
    fn from(delta: BoxDelta) -> Self {
        delta.to_array()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn identical_boxes_have_zero_delta() {
        let rect = TLBR::from_tlbr([0.0, 0.0, 0.5, 0.5]);
        assert!(BoxDelta::encode(&rect, &rect).is_zero());
    }

    #[test]
    fn encode_shift_and_scale() {
        let roi = TLBR::from_tlbr([0.0, 0.0, 0.2, 0.4]);
        let target = TLBR::from_tlbr([0.1, 0.0, 0.5, 0.4]);
        let delta = BoxDelta::encode(&roi, &target);

        // centers: roi (0.1, 0.2), target (0.3, 0.2)
        assert_abs_diff_eq!(delta.dy, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(delta.dx, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(delta.dh, 2f64.ln(), epsilon = 1e-9);
        assert_abs_diff_eq!(delta.dw, 0.0, epsilon = 1e-9);

        let std_dev = [r64(0.1), r64(0.1), r64(0.2), r64(0.2)];
        let normalized = delta.normalize(&std_dev);
        assert_abs_diff_eq!(normalized.dy, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(normalized.dh, 2f64.ln() / 0.2, epsilon = 1e-9);
    }

    #[test]
    fn apply_recovers_target() {
        let roi = TLBR::from_tlbr([0.1, 0.2, 0.4, 0.6]);
        let target = TLBR::from_tlbr([0.15, 0.1, 0.5, 0.7]);
        let std_dev = [r64(0.1), r64(0.1), r64(0.2), r64(0.2)];

        let delta = BoxDelta::encode(&roi, &target).normalize(&std_dev);
        let refined = delta.denormalize(&std_dev).apply(&roi).unwrap();

        izip!(refined.tlbr(), target.tlbr()).for_each(|(lhs, rhs)| {
            assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-9);
        });
    }
}
