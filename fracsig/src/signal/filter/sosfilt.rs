use crate::kernel::ExecInvariantViolation;
use nalgebra::{Matrix2, Vector2};

use alloc::vec::Vec;

use super::design::Sos;

///
/// Filter `x` through cascaded second-order sections.
///
/// Each section runs in transposed direct form II starting from its `zi0`,
/// `zi1` state, and leaves its final state behind so consecutive calls
/// continue one stream.
///
/// <https://docs.scipy.org/doc/scipy/reference/generated/scipy.signal.sosfilt.html>
///
pub fn sosfilt(x: &[f64], sos: &mut [Sos]) -> Vec<f64> {
    x.iter()
        .map(|xi| {
            sos.iter_mut().fold(*xi, |x_cur, s| {
                let y = s.b[0] * x_cur + s.zi0;
                s.zi0 = s.b[1] * x_cur - s.a[1] * y + s.zi1;
                s.zi1 = s.b[2] * x_cur - s.a[2] * y;
                y
            })
        })
        .collect()
}

///
/// Set each section's state to the steady state of a unit step through the
/// cascade. Scale by the first sample to start filtering without a transient.
///
/// <https://docs.scipy.org/doc/scipy/reference/generated/scipy.signal.sosfilt_zi.html>
///
/// # Errors
/// A section with a pole at `z = 1` has no steady state.
///
pub fn sosfilt_zi(sos: &mut [Sos]) -> Result<(), ExecInvariantViolation> {
    let mut scale = 1.0;
    for s in sos.iter_mut() {
        let [b0, b1, b2] = s.b;
        let [_, a1, a2] = s.a;
        // (I - A^T) zi = B for the section's companion matrix A
        let i_minus_a = Matrix2::new(1.0 + a1, -1.0, a2, 1.0);
        let rhs = Vector2::new(b1 - a1 * b0, b2 - a2 * b0);
        let zi = i_minus_a
            .lu()
            .solve(&rhs)
            .ok_or(ExecInvariantViolation::InvalidState {
                reason: "second-order section has a pole at z = 1",
            })?;
        s.zi0 = scale * zi[0];
        s.zi1 = scale * zi[1];
        scale *= (b0 + b1 + b2) / (1.0 + a1 + a2);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::filter::{butter_sos, FilterBandType};
    use approx::assert_abs_diff_eq;

    #[test]
    fn first_order_section_matches_difference_equation() {
        // y[n] = 0.5 x[n] + 0.25 y[n-1]
        let mut sos = [Sos::new([0.5, 0.0, 0.0], [1.0, -0.25, 0.0])];
        let y = sosfilt(&[1.0, 0.0, 0.0, 2.0], &mut sos);
        let expected = [0.5, 0.125, 0.031_25, 1.007_812_5];
        for (a, b) in y.iter().zip(expected.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-15);
        }
    }

    #[test]
    fn state_carries_between_calls() {
        let x: Vec<f64> = (0..64).map(|i| (i as f64 * 0.37).sin()).collect();
        let mut whole = butter_sos(4, 60.0, 1000.0, FilterBandType::Lowpass).expect("design");
        let mut split = whole.clone();
        let y = sosfilt(&x, &mut whole);
        let mut y_split = sosfilt(&x[..20], &mut split);
        y_split.extend(sosfilt(&x[20..], &mut split));
        for (a, b) in y.iter().zip(y_split.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-14);
        }
    }

    #[test]
    fn steady_state_zi_has_no_step_transient() {
        for btype in [FilterBandType::Lowpass, FilterBandType::Highpass] {
            let mut sos = butter_sos(5, 40.0, 1000.0, btype).expect("design");
            sosfilt_zi(&mut sos).expect("zi");
            let level = 3.5;
            for s in sos.iter_mut() {
                s.zi0 *= level;
                s.zi1 *= level;
            }
            let dc_gain = match btype {
                FilterBandType::Lowpass => 1.0,
                FilterBandType::Highpass => 0.0,
            };
            let y = sosfilt(&[level; 50], &mut sos);
            for v in y {
                assert_abs_diff_eq!(v, level * dc_gain, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn integrator_has_no_steady_state() {
        let mut sos = [Sos::new([1.0, 0.0, 0.0], [1.0, -1.0, 0.0])];
        assert!(sosfilt_zi(&mut sos).is_err());
    }
}
