//! The Wendy-Hunt decision problem: three states, two actions.

use ndarray::{arr2, arr3};

use crate::dynamic::TabularMdp;
use crate::error::Result;

pub const DISCOUNT: f64 = 0.99;

/// Builds the Wendy-Hunt MDP.
///
/// | action | rows of `T[a]` for states 0, 1, 2            | `R[a]`    |
/// |--------|----------------------------------------------|-----------|
/// | 0      | `[1, 0, 0]`, `[1, 0, 0]`, `[0, .3, .7]`      | `1, 1, 3` |
/// | 1      | `[.4, 0, .6]`, `[.1, .6, .3]`, `[0, .1, .9]` | `0, 0, 2` |
pub fn wendy_hunt() -> Result<TabularMdp> {
    TabularMdp::new(
        DISCOUNT,
        arr3(&[
            [[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.3, 0.7]],
            [[0.4, 0.0, 0.6], [0.1, 0.6, 0.3], [0.0, 0.1, 0.9]],
        ]),
        arr2(&[[1.0, 1.0, 3.0], [0.0, 0.0, 2.0]]),
    )
}
