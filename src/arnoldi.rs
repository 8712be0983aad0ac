//! Vandermonde with Arnoldi: an orthonormal polynomial basis for a fixed
//! point cloud.
//!
//! Columns are generated in index-set order. Each new column multiplies an
//! already orthonormal predecessor column by one raw coordinate and is then
//! orthogonalized against every earlier column. The coefficients of that
//! process are kept in the upper-triangular `R`, which is all that is needed
//! to replay the construction at new points.

use crate::basis::{BasisError, PolynomialBasis, check_points};
use crate::faer_ndarray::fast_ata;
use crate::indices::IndexSet;
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis};
use rayon::prelude::*;

/// Relative residual norm below which a new column is treated as linearly
/// dependent on the earlier ones.
const RANK_TOL: f64 = 1e-11;

/// Relative residual norm below which construction still succeeds but the
/// column is reported as poorly conditioned.
const CONDITION_WARN_TOL: f64 = 1e-6;

/// How column `k` is generated: multiply column `pred` by coordinate `axis`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ArnoldiStep {
    axis: usize,
    pred: usize,
}

/// For every non-constant multi-index, the most recently generated index that
/// differs from it by one in a single coordinate.
fn predecessor_steps(indices: &IndexSet) -> Vec<ArnoldiStep> {
    indices
        .iter()
        .skip(1)
        .map(|alpha| {
            (0..alpha.len())
                .filter_map(|axis| {
                    indices
                        .lowered(alpha, axis)
                        .map(|pred| ArnoldiStep { axis, pred })
                })
                .max_by_key(|step| step.pred)
                .unwrap_or(ArnoldiStep { axis: 0, pred: 0 })
        })
        .collect()
}

/// Orthonormal polynomial basis built by Vandermonde-with-Arnoldi on a fixed
/// sample.
#[derive(Debug, Clone)]
pub struct ArnoldiBasis {
    points: Array2<f64>,
    degree: usize,
    indices: IndexSet,
    steps: Vec<ArnoldiStep>,
    q: Array2<f64>,
    r: Array2<f64>,
}

impl ArnoldiBasis {
    /// Runs the Arnoldi process on `points` (shape `(M, dim)`) for all
    /// multi-indices of total degree at most `degree`.
    ///
    /// Fails with [`BasisError::RankDeficient`] when the sample cannot support
    /// the requested degree, which always happens when `M` is smaller than the
    /// basis size.
    pub fn new(points: ArrayView2<'_, f64>, degree: usize) -> Result<Self, BasisError> {
        let (m, dim) = points.dim();
        let indices = IndexSet::total_degree(degree, dim)?;
        if m == 0 {
            return Err(BasisError::EmptyPointSet);
        }
        check_points(points, dim)?;

        let n = indices.len();
        let steps = predecessor_steps(&indices);
        let mut q = Array2::<f64>::zeros((m, n));
        let mut r = Array2::<f64>::zeros((n, n));
        let mf = m as f64;
        q.column_mut(0).fill(1.0 / mf.sqrt());
        r[[0, 0]] = mf.sqrt();

        for (k, step) in (1..n).zip(steps.iter()) {
            let mut trial = &points.column(step.axis) * &q.column(step.pred);
            let trial_norm = trial.dot(&trial).sqrt();

            // Reorthogonalize against every earlier column, not just the
            // Krylov neighbours; coordinate products lose orthogonality fast.
            for j in 0..k {
                let coef = q.column(j).dot(&trial);
                r[[j, k]] = coef;
                trial.scaled_add(-coef, &q.column(j));
            }

            let norm = trial.dot(&trial).sqrt();
            if !norm.is_finite() || !(norm > RANK_TOL * trial_norm) {
                return Err(BasisError::RankDeficient { column: k, norm });
            }
            if norm < CONDITION_WARN_TOL * trial_norm {
                log::warn!(
                    "Arnoldi column {} ({:?}) retained only {:.3e} of its trial norm; basis is poorly conditioned",
                    k,
                    indices.get(k).unwrap_or_default(),
                    norm / trial_norm
                );
            }
            r[[k, k]] = norm;
            trial /= norm;
            q.column_mut(k).assign(&trial);
        }

        log::debug!(
            "Built Arnoldi basis: {} points, dim={}, degree={}, {} functions",
            m,
            dim,
            degree,
            n
        );

        Ok(Self {
            points: points.to_owned(),
            degree,
            indices,
            steps,
            q,
            r,
        })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Training sample, shape `(M, dim)`.
    pub fn points(&self) -> &Array2<f64> {
        &self.points
    }

    /// Orthonormal basis evaluated at the training sample, shape `(M, N)`.
    pub fn q(&self) -> &Array2<f64> {
        &self.q
    }

    /// Upper-triangular orthogonalization coefficients, shape `(N, N)`.
    pub fn r(&self) -> &Array2<f64> {
        &self.r
    }

    /// Largest entry of `|Q^T Q - I|`.
    pub fn orthogonality_defect(&self) -> f64 {
        let mut gram = fast_ata(&self.q);
        for i in 0..gram.nrows() {
            gram[[i, i]] -= 1.0;
        }
        gram.iter().fold(0.0f64, |acc, &v| acc.max(v.abs()))
    }

    fn is_training_sample(&self, points: ArrayView2<'_, f64>) -> bool {
        points == self.points.view()
    }

    /// Evaluates the basis at new points by replaying the stored
    /// orthogonalization, shape `(M_new, N)`.
    pub fn project(&self, points: ArrayView2<'_, f64>) -> Result<Array2<f64>, BasisError> {
        check_points(points, self.points.ncols())?;
        let n = self.indices.len();
        let mut w = Array2::<f64>::zeros((points.nrows(), n));
        w.column_mut(0).fill(1.0 / (self.points.nrows() as f64).sqrt());

        for (k, step) in (1..n).zip(self.steps.iter()) {
            let mut col = &points.column(step.axis) * &w.column(step.pred);
            for j in 0..k {
                col.scaled_add(-self.r[[j, k]], &w.column(j));
            }
            col /= self.r[[k, k]];
            w.column_mut(k).assign(&col);
        }
        Ok(w)
    }

    /// Differentiates the replayed recurrence along every axis.
    ///
    /// With `w_k = (x_a w_p - sum_j R[j,k] w_j) / R[k,k]`, the product rule
    /// gives `d w_k / d x_d = (delta_{ad} w_p + x_a dw_p - sum_j R[j,k] dw_j) / R[k,k]`.
    fn project_derivatives(&self, points: ArrayView2<'_, f64>, w: &Array2<f64>) -> Array3<f64> {
        let (m, n, dim) = (points.nrows(), self.indices.len(), self.points.ncols());

        let slabs: Vec<Array2<f64>> = (0..dim)
            .into_par_iter()
            .map(|d| {
                let mut dw = Array2::<f64>::zeros((m, n));
                let mut col = Array1::<f64>::zeros(m);
                for (k, step) in (1..n).zip(self.steps.iter()) {
                    col.assign(&points.column(step.axis));
                    col *= &dw.column(step.pred);
                    if step.axis == d {
                        col += &w.column(step.pred);
                    }
                    for j in 0..k {
                        col.scaled_add(-self.r[[j, k]], &dw.column(j));
                    }
                    col /= self.r[[k, k]];
                    dw.column_mut(k).assign(&col);
                }
                dw
            })
            .collect();

        let mut out = Array3::<f64>::zeros((m, n, dim));
        for (d, dw) in slabs.iter().enumerate() {
            out.index_axis_mut(Axis(2), d).assign(dw);
        }
        out
    }

    /// Basis values; the stored `Q` when `points` is the training sample.
    pub fn v(&self, points: ArrayView2<'_, f64>) -> Result<Array2<f64>, BasisError> {
        if self.is_training_sample(points) {
            return Ok(self.q.clone());
        }
        self.project(points)
    }

    /// Basis gradients, shape `(M, N, dim)`.
    ///
    /// These are exact gradients of the replayed basis: a column whose
    /// multi-index is zero along `d` can still vary along `d` through its
    /// orthogonalization terms, so it is not forced to zero.
    pub fn dv(&self, points: ArrayView2<'_, f64>) -> Result<Array3<f64>, BasisError> {
        let w = self.v(points)?;
        Ok(self.project_derivatives(points, &w))
    }

    /// Gradients at the training sample.
    pub fn dv_training(&self) -> Array3<f64> {
        self.project_derivatives(self.points.view(), &self.q)
    }
}

impl PolynomialBasis for ArnoldiBasis {
    fn dim(&self) -> usize {
        self.points.ncols()
    }

    fn indices(&self) -> &IndexSet {
        &self.indices
    }

    fn v(&self, points: ArrayView2<'_, f64>) -> Result<Array2<f64>, BasisError> {
        ArnoldiBasis::v(self, points)
    }

    fn dv(&self, points: ArrayView2<'_, f64>) -> Result<Array3<f64>, BasisError> {
        ArnoldiBasis::dv(self, points)
    }
}
