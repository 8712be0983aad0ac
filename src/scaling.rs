//! Affine change of variables applied before polynomial evaluation.

use crate::basis::BasisError;
use crate::family::RescaleKind;
use faer::c64;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::f64::consts::SQRT_2;

/// Rescale parameters of a tensor basis.
///
/// `Identity` is the state before any reference set has been supplied; the
/// other variants are reached exactly once through [`Rescaling::fit`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Rescaling {
    #[default]
    Identity,
    /// `x' = 2 (x - lb) / (ub - lb) - 1`, componentwise.
    Interval { lb: Array1<f64>, ub: Array1<f64> },
    /// `x' = (x - mean) / (std * sqrt(2))`, componentwise.
    Standardized { mean: Array1<f64>, std: Array1<f64> },
}

impl Rescaling {
    /// Fits rescale parameters of the requested kind from a reference set.
    pub fn fit(kind: RescaleKind, reference: ArrayView2<'_, f64>) -> Result<Self, BasisError> {
        if reference.nrows() == 0 {
            return Err(BasisError::EmptyPointSet);
        }
        if reference.iter().any(|v| !v.is_finite()) {
            return Err(BasisError::NonFiniteInput);
        }

        match kind {
            RescaleKind::Interval => {
                let lb = reference.fold_axis(Axis(0), f64::INFINITY, |&acc, &v| acc.min(v));
                let ub = reference.fold_axis(Axis(0), f64::NEG_INFINITY, |&acc, &v| acc.max(v));
                if let Some(axis) = (0..lb.len()).find(|&k| ub[k] <= lb[k]) {
                    return Err(BasisError::DegenerateScale { axis });
                }
                Ok(Rescaling::Interval { lb, ub })
            }
            RescaleKind::Standardize => {
                let mean = reference
                    .mean_axis(Axis(0))
                    .ok_or(BasisError::EmptyPointSet)?;
                // Population standard deviation.
                let std = reference.std_axis(Axis(0), 0.0);
                if let Some(axis) = std.iter().position(|&s| s <= 0.0) {
                    return Err(BasisError::DegenerateScale { axis });
                }
                Ok(Rescaling::Standardized { mean, std })
            }
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Rescaling::Identity)
    }

    /// Maps raw points into the reference domain.
    pub fn apply(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        match self {
            Rescaling::Identity => x.to_owned(),
            Rescaling::Interval { lb, ub } => {
                let width = ub - lb;
                let mut out = &x - lb;
                out /= &width;
                out.mapv_inplace(|v| 2.0 * v - 1.0);
                out
            }
            Rescaling::Standardized { mean, std } => {
                let denom = std * SQRT_2;
                let mut out = &x - mean;
                out /= &denom;
                out
            }
        }
    }

    /// Chain-rule factor `dx'/dx` per dimension. Identity rescaling has unit
    /// factors.
    pub fn derivative_scale(&self, dim: usize) -> Array1<f64> {
        match self {
            Rescaling::Identity => Array1::ones(dim),
            Rescaling::Interval { lb, ub } => (ub - lb).mapv(|w| 2.0 / w),
            Rescaling::Standardized { std, .. } => std.mapv(|s| 1.0 / (s * SQRT_2)),
        }
    }

    /// Maps a root found in the reference domain of the first coordinate back
    /// to raw coordinates.
    pub fn unmap_root(&self, root: c64) -> c64 {
        let (slope, shift) = match self {
            Rescaling::Identity => (1.0, 0.0),
            Rescaling::Interval { lb, ub } => ((ub[0] - lb[0]) / 2.0, (ub[0] + lb[0]) / 2.0),
            Rescaling::Standardized { mean, std } => (std[0] * SQRT_2, mean[0]),
        };
        c64::new(root.re * slope + shift, root.im * slope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn interval_maps_bounds_to_unit_box() {
        let reference = array![[0.0, 10.0], [4.0, 20.0], [2.0, 15.0]];
        let scale = Rescaling::fit(RescaleKind::Interval, reference.view()).expect("fit");
        let mapped = scale.apply(array![[0.0, 10.0], [4.0, 20.0], [2.0, 15.0]].view());
        assert_abs_diff_eq!(mapped, array![[-1.0, -1.0], [1.0, 1.0], [0.0, 0.0]], epsilon = 1e-15);
        assert_abs_diff_eq!(scale.derivative_scale(2), array![0.5, 0.2], epsilon = 1e-15);
    }

    #[test]
    fn standardize_centers_the_mean() {
        let reference = array![[1.0], [3.0], [5.0], [7.0]];
        let scale = Rescaling::fit(RescaleKind::Standardize, reference.view()).expect("fit");
        let std = 5.0f64.sqrt();
        let mapped = scale.apply(array![[4.0], [4.0 + std * SQRT_2]].view());
        assert_abs_diff_eq!(mapped, array![[0.0], [1.0]], epsilon = 1e-14);
        assert_abs_diff_eq!(scale.derivative_scale(1)[0], 1.0 / (std * SQRT_2), epsilon = 1e-15);
    }

    #[test]
    fn unmap_inverts_apply_on_the_first_axis() {
        let reference = array![[-3.0], [5.0]];
        for kind in [RescaleKind::Interval, RescaleKind::Standardize] {
            let scale = Rescaling::fit(kind, reference.view()).expect("fit");
            let mapped = scale.apply(array![[1.5]].view())[[0, 0]];
            let back = scale.unmap_root(c64::new(mapped, 0.0));
            assert_abs_diff_eq!(back.re, 1.5, epsilon = 1e-14);
        }
    }

    #[test]
    fn identity_is_a_no_op() {
        let scale = Rescaling::default();
        assert!(scale.is_identity());
        let x = array![[0.25, -7.0]];
        assert_eq!(scale.apply(x.view()), x);
        assert_eq!(scale.derivative_scale(2), array![1.0, 1.0]);
    }

    #[test]
    fn degenerate_reference_is_rejected() {
        let reference = array![[1.0, 2.0], [1.0, 3.0]];
        assert!(matches!(
            Rescaling::fit(RescaleKind::Interval, reference.view()),
            Err(BasisError::DegenerateScale { axis: 0 })
        ));
        assert!(matches!(
            Rescaling::fit(RescaleKind::Standardize, reference.view()),
            Err(BasisError::DegenerateScale { axis: 0 })
        ));
        assert!(matches!(
            Rescaling::fit(RescaleKind::Interval, ndarray::Array2::<f64>::zeros((0, 2)).view()),
            Err(BasisError::EmptyPointSet)
        ));
    }
}
