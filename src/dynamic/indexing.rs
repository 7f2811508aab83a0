//! Mixed-radix mapping between a flat index and per-dimension coordinates.
//!
//! Factored state spaces (several entities on a grid, say) are enumerated by a
//! single integer so the solver never needs to know how a state is built. The
//! first dimension is the most significant digit.

/// Converts coordinates into a flat index.
///
/// Only the common prefix of `coords` and `dims` is used when their lengths
/// differ. Coordinates are not bounds checked: `coords[i] >= dims[i]` silently
/// spills into the higher-order digits.
///
/// # Examples
///
/// ```
/// use bellman::dynamic::indexing::flatten;
///
/// assert_eq!(flatten(&[1, 2], &[3, 4]), 6);
/// assert_eq!(flatten(&[2, 3, 1], &[3, 4, 2]), 23);
/// ```
pub fn flatten(coords: &[usize], dims: &[usize]) -> usize {
    coords
        .iter()
        .zip(dims)
        .fold(0, |index, (&coord, &dim)| coord + dim * index)
}

/// Converts a flat index back into coordinates, one per dimension in `dims`.
///
/// # Panics
///
/// Panics if any dimension is zero.
///
/// # Examples
///
/// ```
/// use bellman::dynamic::indexing::unflatten;
///
/// assert_eq!(unflatten(23, &[3, 4, 2]), vec![2, 3, 1]);
/// ```
pub fn unflatten(mut index: usize, dims: &[usize]) -> Vec<usize> {
    let mut coords = vec![0; dims.len()];
    for (coord, &dim) in coords.iter_mut().zip(dims).rev() {
        *coord = index % dim;
        index /= dim;
    }
    coords
}

/// Number of flat indices spanned by `dims`.
pub fn cardinality(dims: &[usize]) -> usize {
    dims.iter().product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_every_index() {
        let dims = [3, 1, 4, 2];
        for index in 0..cardinality(&dims) {
            let coords = unflatten(index, &dims);
            for (c, d) in coords.iter().zip(&dims) {
                assert!(c < d);
            }
            assert_eq!(flatten(&coords, &dims), index);
        }
    }

    #[test]
    fn test_round_trip_coordinates() {
        let dims = [5, 5, 5, 5, 5, 5];
        let samples = [
            [0, 0, 0, 0, 0, 0],
            [4, 4, 4, 4, 4, 4],
            [1, 0, 3, 2, 4, 0],
            [0, 4, 0, 4, 0, 4],
        ];
        for coords in samples {
            assert_eq!(unflatten(flatten(&coords, &dims), &dims), coords);
        }
    }

    #[test]
    fn test_first_dimension_is_most_significant() {
        let dims = [2, 10];
        assert_eq!(flatten(&[0, 9], &dims), 9);
        assert_eq!(flatten(&[1, 0], &dims), 10);
    }

    #[test]
    fn test_flatten_uses_shorter_prefix() {
        assert_eq!(flatten(&[1, 2, 3], &[4, 5]), flatten(&[1, 2], &[4, 5]));
        assert_eq!(flatten(&[1, 2], &[4, 5, 6]), 7);
        assert_eq!(flatten(&[], &[4, 5]), 0);
    }

    #[test]
    fn test_out_of_range_coordinate_spills_upward() {
        // 0 * 4 + 5 aliases [1, 1]
        assert_eq!(flatten(&[0, 5], &[3, 4]), flatten(&[1, 1], &[3, 4]));
    }

    #[test]
    fn test_cardinality() {
        assert_eq!(cardinality(&[5, 5, 5, 5, 5, 5]), 15625);
        assert_eq!(cardinality(&[]), 1);
    }

    #[test]
    #[should_panic]
    fn test_unflatten_zero_dimension() {
        unflatten(3, &[2, 0]);
    }
}
