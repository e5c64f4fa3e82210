pub use anyhow::{ensure, Context as _, Result};
pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
pub use num_traits::{Float, Num, Zero};
pub use std::ops::Mul;
