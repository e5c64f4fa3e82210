pub use anyhow::{ensure, format_err, Context as _, Error, Result};
pub use approx::AbsDiffEq;
pub use bbox::{prelude::*, CyCxHW, TLBR};
pub use getset::{CopyGetters, Getters};
pub use itertools::{izip, Itertools as _};
pub use label::{ClassId, ClassKind, Label};
pub use log::{debug, trace, warn};
pub use ndarray::{Array2, Array3, ArrayView2, Axis};
pub use noisy_float::prelude::*;
pub use rand::prelude::*;
pub use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
pub use std::{
    convert::TryFrom,
    fmt::{self, Debug, Display},
    path::Path,
};
