//! Row-major indexing of product state spaces.
//!
//! Factored models keep value functions as flat vectors over the
//! Cartesian product of their state variables, flattened row-major (the
//! last variable varies fastest). These helpers convert between flat and
//! multi-dimensional indices.

/// Product of the dimensions; the flat length of a tensor.
pub fn size(dims: &[usize]) -> usize {
    dims.iter().product()
}

/// Row-major strides for `dims`. The last dimension has stride one.
pub fn strides(dims: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; dims.len()];
    for i in (0..dims.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * dims[i + 1];
    }
    strides
}

/// Flatten a multi-index. `index` and `dims` must be equally long.
pub fn flatten(index: &[usize], dims: &[usize]) -> usize {
    debug_assert_eq!(index.len(), dims.len());
    index
        .iter()
        .zip(dims.iter())
        .fold(0, |flat, (&i, &d)| flat * d + i)
}

/// Expand a flat index into `out`. `out` and `dims` must be equally long.
pub fn unflatten(mut flat: usize, dims: &[usize], out: &mut [usize]) {
    debug_assert_eq!(out.len(), dims.len());
    for i in (0..dims.len()).rev() {
        out[i] = flat % dims[i];
        flat /= dims[i];
    }
}
