mod ndarray_conv_binds;

use crate::{Error, Result};
use alloc::string::ToString;
use ndarray::{Array1, ArrayView1};
use ndarray_conv::{ConvExt, PaddingMode};

/// Convolution mode determines behavior near edges and output size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvolveMode {
    /// Full convolution, output size is `in1.len() + in2.len() - 1`
    Full,
    /// Valid convolution, output size is `max(in1.len(), in2.len()) - min(in1.len(), in2.len()) + 1`
    Valid,
    /// Same convolution, output size is `max(in1.len(), in2.len())`
    Same,
}

/// Best effort parallel behaviour with numpy's convolve method.
///
/// Returns the discrete, linear convolution of two one-dimensional sequences.
/// As in numpy, the shorter sequence is used as the kernel, so argument order
/// does not change the result.
///
/// # Parameters
/// * `a` : (N,) [[array_like]]([ndarray::Array1])
///   First one-dimensional input array.
/// * `v` : (M,) [[array_like]]([ndarray::Array1])
///   Second one-dimensional input array.
/// * `mode` : [ConvolveMode]
///   [ConvolveMode::Full]:
///   Returns the convolution at each point of overlap, with an output shape of
///   (N+M-1,). At the end-points of the convolution, the signals do not overlap
///   completely, and boundary effects may be seen.
///
///   [ConvolveMode::Same]:
///   Returns output of length ``max(M, N)``.  Boundary effects are still visible.
///
///   [ConvolveMode::Valid]:
///   Returns output of length ``max(M, N) - min(M, N) + 1``.  The convolution
///   product is only given for points where the signals overlap completely.
///
/// # Errors
/// [Error::InvalidArg] when either input is empty.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use fracsig_core::num_rs::{ConvolveMode, convolve};
///
/// let a = array![1., 2., 3.];
/// let v = array![0., 1., 0.5];
///
/// let expected = array![0., 1., 2.5, 4., 1.5];
/// let result = convolve((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
/// assert_eq!(result, expected);
/// ```
pub fn convolve<T>(a: ArrayView1<T>, v: ArrayView1<T>, mode: ConvolveMode) -> Result<Array1<T>>
where
    T: num_traits::NumAssign + core::marker::Copy,
{
    if a.is_empty() || v.is_empty() {
        return Err(Error::InvalidArg {
            arg: if a.is_empty() { "a" } else { "v" }.to_string(),
            reason: "input must be non-empty.".to_string(),
        });
    }
    let result = if v.len() > a.len() {
        v.conv(&a, mode.into(), PaddingMode::Zeros)
    } else {
        a.conv(&v, mode.into(), PaddingMode::Zeros)
    };
    result.map_err(|e| Error::Conv {
        reason: e.to_string(),
    })
}

/// Cross-correlation of two one-dimensional sequences, following numpy's
/// `correlate` for real input.
///
/// Computed as the convolution of `a` with `v` reversed. In
/// [ConvolveMode::Full] the output has length `N + M - 1` and the zero-lag
/// product sits at index `M - 1`; index `k` holds lag `k - (M - 1)`.
///
/// # Examples
/// ```
/// use ndarray::array;
/// use fracsig_core::num_rs::{ConvolveMode, correlate};
///
/// let a = array![1., 2., 3.];
/// let v = array![0., 1., 0.5];
///
/// let expected = array![0.5, 2., 3.5, 3., 0.];
/// let result = correlate((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
/// assert_eq!(result, expected);
/// ```
pub fn correlate<T>(a: ArrayView1<T>, v: ArrayView1<T>, mode: ConvolveMode) -> Result<Array1<T>>
where
    T: num_traits::NumAssign + core::marker::Copy,
{
    let reversed = v.iter().rev().copied().collect::<Array1<T>>();
    convolve(a, reversed.view(), mode)
}

#[cfg(test)]
mod linear_convolve {
    use super::*;
    use alloc::vec;
    use ndarray::array;

    #[test]
    fn full() {
        let a = array![1., 2., 3.];
        let v = array![0., 1., 0.5];

        let expected = array![0., 1., 2.5, 4., 1.5];
        let result = convolve((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn same() {
        let a = array![1., 2., 3.];
        let v = array![0., 1., 0.5];

        let expected = array![1., 2.5, 4.];
        let result = convolve((&a).into(), (&v).into(), ConvolveMode::Same).unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn valid() {
        let a = array![1., 2., 3.];
        let v = array![0., 1., 0.5];

        let expected = array![2.5];
        let result = convolve((&a).into(), (&v).into(), ConvolveMode::Valid).unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn longer_kernel_is_swapped() {
        let a = array![0., 1., 0.5];
        let v = array![1., 2., 3., 4.];

        let forward = convolve((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
        let swapped = convolve((&v).into(), (&a).into(), ConvolveMode::Full).unwrap();
        assert_eq!(forward.len(), 6);
        assert_eq!(forward, swapped);
    }

    #[test]
    fn empty_input_is_rejected() {
        let a = array![1., 2., 3.];
        let v: Array1<f64> = Array1::zeros(0);
        let err = convolve((&a).into(), (&v).into(), ConvolveMode::Full).unwrap_err();
        assert!(matches!(err, Error::InvalidArg { .. }));
    }

    #[test]
    fn correlate_full_places_zero_lag_at_kernel_end() {
        let a = array![1., 2., 3.];
        let v = array![0., 1., 0.5];

        let result = correlate((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
        assert_eq!(result, array![0.5, 2., 3.5, 3., 0.]);
        // zero lag: 1*0 + 2*1 + 3*0.5
        assert_eq!(result[v.len() - 1], 3.5);
    }

    #[test]
    fn correlate_with_longer_second_input() {
        let a = array![1., -1.];
        let v = array![2., 0., 1., 3.];

        let result = correlate((&a).into(), (&v).into(), ConvolveMode::Full).unwrap();
        // numpy.correlate([1, -1], [2, 0, 1, 3], "full")
        assert_eq!(result, array![3., -2., -1., 2., -2.]);
        let result = correlate((&v).into(), (&a).into(), ConvolveMode::Full).unwrap();
        assert_eq!(result, array![-2., 2., -1., -2., 3.]);
    }
}
