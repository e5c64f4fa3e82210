//! Pairwise box overlap.

use crate::{common::*, Rect, RectFloat, TLBR};

/// Computes the IoU matrix between two box sets.
///
/// The output has shape `[boxes_a.len(), boxes_b.len()]` and the entry at
/// `[i, j]` is the IoU of `boxes_a[i]` and `boxes_b[j]`.
pub fn iou_matrix<T, A, B>(boxes_a: &[A], boxes_b: &[B]) -> Array2<T>
where
    T: Float,
    A: Rect<Type = T>,
    B: Rect<Type = T>,
{
    Array2::from_shape_fn((boxes_a.len(), boxes_b.len()), |(i, j)| {
        boxes_a[i].iou_with(&boxes_b[j])
    })
}

/// Computes the IoU matrix from two `[N, 4]` arrays of `(y1, x1, y2, x2)` rows.
///
/// It fails if either array does not have exactly four columns or has a
/// row with inverted corners.
pub fn iou_matrix_from_arrays<T>(
    boxes_a: ArrayView2<T>,
    boxes_b: ArrayView2<T>,
) -> Result<Array2<T>>
where
    T: Float,
{
    let boxes_a = boxes_from_array(boxes_a).context("invalid first box set")?;
    let boxes_b = boxes_from_array(boxes_b).context("invalid second box set")?;
    Ok(iou_matrix(&boxes_a, &boxes_b))
}

/// Converts an `[N, 4]` array of `(y1, x1, y2, x2)` rows to boxes.
pub fn boxes_from_array<T>(array: ArrayView2<T>) -> Result<Vec<TLBR<T>>>
where
    T: Float,
{
    let (_, n_coords) = array.dim();
    ensure!(
        n_coords == 4,
        "expect boxes with 4 coordinates, but get {}",
        n_coords
    );

    array
        .outer_iter()
        .enumerate()
        .map(|(index, row)| {
            TLBR::try_from_tlbr([row[0], row[1], row[2], row[3]])
                .with_context(|| format!("invalid box at row {}", index))
        })
        .collect()
}

/// Reduces each row of an overlap matrix to its maximum.
///
/// Rows of a matrix without columns reduce to zero.
pub fn max_per_row<T>(matrix: ArrayView2<T>) -> Array1<T>
where
    T: Float,
{
    matrix
        .outer_iter()
        .map(|row| row.iter().fold(T::zero(), |max, &value| max.max(value)))
        .collect()
}

/// Finds the column of the maximum of each row of an overlap matrix.
///
/// The lowest column index wins ties. Rows of a matrix without columns
/// yield `None`.
pub fn argmax_per_row<T>(matrix: ArrayView2<T>) -> Vec<Option<usize>>
where
    T: Float,
{
    matrix.outer_iter().map(|row| argmax(row)).collect()
}

fn argmax<T>(row: ArrayView1<T>) -> Option<usize>
where
    T: Float,
{
    row.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, T)>, (index, &value)| match best {
            Some((_, best_value)) if value <= best_value => best,
            _ => Some((index, value)),
        })
        .map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RectNum;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn iou_matrix_rows_follow_first_argument() {
        let boxes_a = vec![
            TLBR::from_tlbr([0.0, 0.0, 0.5, 0.5]),
            TLBR::from_tlbr([0.5, 0.5, 1.0, 1.0]),
            TLBR::from_tlbr([0.0, 0.0, 1.0, 1.0]),
        ];
        let boxes_b = vec![
            TLBR::from_tlbr([0.5, 0.5, 1.0, 1.0]),
            TLBR::from_tlbr([0.0, 0.0, 0.5, 0.5]),
        ];

        let matrix = iou_matrix(&boxes_a, &boxes_b);
        assert_eq!(matrix.dim(), (3, 2));

        assert_eq!(matrix[[0, 0]], 0.0);
        assert_eq!(matrix[[0, 1]], 1.0);
        assert_eq!(matrix[[1, 0]], 1.0);
        assert_eq!(matrix[[1, 1]], 0.0);
        assert_abs_diff_eq!(matrix[[2, 0]], 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(matrix[[2, 1]], 0.25, epsilon = 1e-12);

        let transposed = iou_matrix(&boxes_b, &boxes_a);
        assert_eq!(transposed, matrix.t());
    }

    #[test]
    fn iou_matrix_values_are_bounded() {
        let boxes: Vec<_> = (0..6)
            .map(|index| {
                let offset = index as f64 * 0.1;
                TLBR::from_tlbr([offset, offset / 2.0, offset + 0.3, offset + 0.2])
            })
            .collect();
        let matrix = iou_matrix(&boxes, &boxes);
        matrix.iter().for_each(|&iou| {
            assert!((0.0..=1.0).contains(&iou));
        });
        (0..boxes.len()).for_each(|index| {
            assert_eq!(matrix[[index, index]], 1.0);
        });
    }

    #[test]
    fn iou_matrix_with_empty_set() {
        let boxes = vec![TLBR::from_tlbr([0.0, 0.0, 0.5, 0.5])];
        let empty: Vec<TLBR<f64>> = vec![];

        let matrix = iou_matrix(&boxes, &empty);
        assert_eq!(matrix.dim(), (1, 0));
        assert_eq!(max_per_row(matrix.view()).to_vec(), vec![0.0]);
        assert_eq!(argmax_per_row(matrix.view()), vec![None]);

        assert_eq!(iou_matrix(&empty, &boxes).dim(), (0, 1));
    }

    #[test]
    fn iou_matrix_from_arrays_checks_arity() {
        let valid = array![[0.0, 0.0, 0.5, 0.5], [0.1, 0.1, 0.2, 0.2]];
        let three_coords = array![[0.0, 0.0, 0.5], [0.1, 0.1, 0.2]];
        let inverted = array![[0.5, 0.0, 0.0, 0.5]];

        assert_eq!(
            iou_matrix_from_arrays(valid.view(), valid.view()).unwrap().dim(),
            (2, 2)
        );
        assert!(iou_matrix_from_arrays(valid.view(), three_coords.view()).is_err());
        assert!(iou_matrix_from_arrays(inverted.view(), valid.view()).is_err());
    }

    #[test]
    fn argmax_prefers_lowest_index() {
        let matrix = array![[0.2, 0.7, 0.7], [0.0, 0.0, 0.0], [0.3, 0.1, 0.9]];
        assert_eq!(
            argmax_per_row(matrix.view()),
            vec![Some(1), Some(0), Some(2)]
        );
        assert_eq!(max_per_row(matrix.view()).to_vec(), vec![0.7, 0.0, 0.9]);
    }
}
