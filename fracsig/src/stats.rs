use core::{borrow::Borrow, iter::Sum, ops::Add};
use num_traits::{Float, Num, NumCast};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

///
/// Compute the mean of the signal, `y`
///
/// Return the mean and the number of points averaged
///
/// ```
/// use approx::assert_relative_eq;
/// use fracsig::stats::mean;
///
/// let y: [f64; 5] = [1.,2.,3.,4.,5.];
/// assert_relative_eq!(3f64, mean(y.iter()).0);
///
/// let y: &[f32] = &[];
/// assert_eq!((0f32, 0), mean(y.iter()));
/// ```
///
pub fn mean<YI, F>(y: YI) -> (F, usize)
where
    F: Num + NumCast + Default + Copy + Add,
    YI: Iterator,
    YI::Item: Borrow<F>,
{
    let (sum, count) = y.fold(Default::default(), |acc: (F, usize), yi| {
        (acc.0 + *yi.borrow(), acc.1 + 1)
    });
    match F::from(count) {
        Some(n) if count > 0 => (sum / n, count),
        _ => Default::default(),
    }
}

///
/// Compute the population variance of the signal, `y`
///
/// Return the variance and the number of points averaged
///
/// ```
/// use approx::assert_relative_eq;
/// use fracsig::stats::variance;
///
/// let y: [f64; 5] = [1.,2.,3.,4.,5.];
/// assert_relative_eq!(2f64, variance(y.iter()).0);
/// ```
///
pub fn variance<YI, F>(y: YI) -> (F, usize)
where
    F: Float + Default + Sum,
    YI: Iterator + Clone,
    YI::Item: Borrow<F>,
{
    let (avg, n) = mean(y.clone());
    let sum: F = y
        .map(|f| {
            let delta = *f.borrow() - avg;
            delta * delta
        })
        .sum::<F>();
    match F::from(n) {
        Some(count) if n > 0 => (sum / count, n),
        _ => Default::default(),
    }
}

/// Sum of squared samples.
pub fn energy<YI, F>(y: YI) -> F
where
    F: Float + Sum,
    YI: Iterator,
    YI::Item: Borrow<F>,
{
    y.map(|f| {
        let v = *f.borrow();
        v * v
    })
    .sum()
}

///
/// Index of the largest sample. The first index wins on ties, NaN samples are
/// skipped, and an empty or all-NaN signal has no argmax.
///
/// ```
/// use fracsig::stats::argmax;
///
/// assert_eq!(Some(2), argmax::<_, f64>([0.1f64, 0.3, 0.9, 0.9, -1.0].iter()));
/// assert_eq!(None, argmax::<_, f64>(core::iter::empty::<f64>()));
/// ```
///
pub fn argmax<YI, F>(y: YI) -> Option<usize>
where
    F: Float,
    YI: Iterator,
    YI::Item: Borrow<F>,
{
    let mut best: Option<(usize, F)> = None;
    for (i, v) in y.enumerate() {
        let v: F = *v.borrow();
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if b >= v => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Subtract the mean from every sample.
#[cfg(feature = "alloc")]
pub fn demean<F>(y: &[F]) -> Vec<F>
where
    F: Float + Default,
{
    let (avg, _) = mean(y.iter());
    y.iter().map(|v| *v - avg).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_and_variance_of_ramp() {
        let y = [1.0f64, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(mean::<_, f64>(y.iter()), (3.0, 5));
        let (v, n) = variance::<_, f64>(y.iter());
        assert_relative_eq!(v, 2.0);
        assert_eq!(n, 5);
    }

    #[test]
    fn variance_of_flat_channel_is_zero() {
        let flat = [0.25f64; 64];
        assert_eq!(variance::<_, f64>(flat.iter()).0, 0.0);
    }

    #[test]
    fn energy_is_sum_of_squares() {
        assert_relative_eq!(energy::<_, f64>([3.0f64, -4.0].iter()), 25.0);
    }

    #[test]
    fn argmax_prefers_first_peak_and_skips_nan() {
        assert_eq!(argmax::<_, f64>([f64::NAN, 1.0, 3.0, 3.0].iter()), Some(2));
        assert_eq!(argmax::<_, f64>([f64::NAN].iter()), None);
    }

    #[test]
    fn demean_centers_signal() {
        let centered = demean(&[2.0f64, 4.0, 6.0]);
        assert_eq!(centered, alloc::vec![-2.0, 0.0, 2.0]);
    }
}
