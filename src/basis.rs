use crate::family::ScalarFamily;
use crate::faer_ndarray::FaerLinalgError;
use crate::indices::IndexSet;
use crate::scaling::Rescaling;
use faer::c64;
use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array2, Array3, Array4, ArrayView1, ArrayView2, Axis, s};
use thiserror::Error;

#[cfg(test)]
use approx::assert_abs_diff_eq;

/// A comprehensive error type for all operations within the basis module.
#[derive(Error, Debug)]
pub enum BasisError {
    #[error("Basis dimension must be at least 1, but was {0}.")]
    InvalidDimension(usize),

    #[error("Dimension mismatch: basis expects points with {expected} coordinates, but got {found}.")]
    DimensionMismatch { expected: usize, found: usize },

    #[error(
        "Coefficient length mismatch: basis has {expected} functions, but {found} coefficients were provided."
    )]
    CoefficientLengthMismatch { expected: usize, found: usize },

    #[error("Flat coordinate buffer of length {len} does not split into points of dimension {dim}.")]
    RaggedFlatPoints { len: usize, dim: usize },

    #[error("Point set is empty.")]
    EmptyPointSet,

    #[error("Input contains non-finite values.")]
    NonFiniteInput,

    #[error("Reference points have zero spread along axis {axis}; the rescaling is undefined.")]
    DegenerateScale { axis: usize },

    #[error("Rescale parameters were already set for this basis.")]
    ScaleAlreadySet,

    #[error("Root finding is only defined for one-dimensional bases, but this basis has dimension {dim}.")]
    RootsRequireUnivariate { dim: usize },

    #[error(
        "Point set is rank deficient for this degree: column {column} has norm {norm:e} after orthogonalization."
    )]
    RankDeficient { column: usize, norm: f64 },

    #[error("Eigenvalue computation failed: {0}")]
    LinalgError(#[from] FaerLinalgError),
}

/// Coarse classification of [`BasisError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasisErrorKind {
    /// Caller supplied inputs that violate the operation's contract.
    Precondition,
    /// The operation is not defined for this basis configuration.
    Unsupported,
    /// The data make the requested construction numerically impossible.
    NumericalDegeneracy,
}

impl BasisError {
    pub fn kind(&self) -> BasisErrorKind {
        match self {
            BasisError::InvalidDimension(_)
            | BasisError::DimensionMismatch { .. }
            | BasisError::CoefficientLengthMismatch { .. }
            | BasisError::RaggedFlatPoints { .. }
            | BasisError::EmptyPointSet
            | BasisError::NonFiniteInput
            | BasisError::DegenerateScale { .. }
            | BasisError::ScaleAlreadySet => BasisErrorKind::Precondition,
            BasisError::RootsRequireUnivariate { .. } => BasisErrorKind::Unsupported,
            BasisError::RankDeficient { .. } | BasisError::LinalgError(_) => {
                BasisErrorKind::NumericalDegeneracy
            }
        }
    }
}

/// Operations shared by every polynomial basis over a fixed index set.
pub trait PolynomialBasis {
    fn dim(&self) -> usize;

    fn indices(&self) -> &IndexSet;

    /// Number of basis functions.
    fn len(&self) -> usize {
        self.indices().len()
    }

    fn is_empty(&self) -> bool {
        self.indices().is_empty()
    }

    /// Basis values, shape `(M, N)`.
    fn v(&self, points: ArrayView2<'_, f64>) -> Result<Array2<f64>, BasisError>;

    /// Basis gradients, shape `(M, N, dim)`.
    fn dv(&self, points: ArrayView2<'_, f64>) -> Result<Array3<f64>, BasisError>;
}

pub(crate) fn check_points(points: ArrayView2<'_, f64>, dim: usize) -> Result<(), BasisError> {
    if points.ncols() != dim {
        return Err(BasisError::DimensionMismatch {
            expected: dim,
            found: points.ncols(),
        });
    }
    if points.iter().any(|v| !v.is_finite()) {
        return Err(BasisError::NonFiniteInput);
    }
    Ok(())
}

/// Reinterprets a flat coordinate buffer as points of dimension `dim`,
/// the `(-1, dim)` reshape convention for query arrays.
pub fn points_from_flat(
    flat: ArrayView1<'_, f64>,
    dim: usize,
) -> Result<ArrayView2<'_, f64>, BasisError> {
    if dim == 0 {
        return Err(BasisError::InvalidDimension(dim));
    }
    let len = flat.len();
    if len % dim != 0 {
        return Err(BasisError::RaggedFlatPoints { len, dim });
    }
    flat.into_shape_with_order((len / dim, dim))
        .map_err(|_| BasisError::RaggedFlatPoints { len, dim })
}

/// Per-dimension 1-D tables evaluated at scaled coordinates; column `a` of
/// each table belongs to the degree-`a` scalar polynomial.
struct CoordinateTables {
    values: Vec<Array2<f64>>,
    first: Vec<Array2<f64>>,
    second: Vec<Array2<f64>>,
}

/// Tensor-product polynomial basis of bounded total degree.
///
/// Basis function `j` is `prod_k phi_{alpha_j[k]}(x'_k)`, where `phi_n` is the
/// degree-`n` member of the scalar family, `alpha_j` is row `j` of the index
/// set and `x'` is the rescaled point.
#[derive(Debug, Clone)]
pub struct TensorBasis {
    dim: usize,
    degree: usize,
    family: ScalarFamily,
    indices: IndexSet,
    /// `(degree + 1, degree)`: row `a` holds the coefficients of `phi_a'`.
    dmat: Array2<f64>,
    /// `(degree + 1, degree - 1)`: row `a` holds the coefficients of `phi_a''`.
    d2mat: Array2<f64>,
    rescaling: Rescaling,
}

impl TensorBasis {
    pub fn new(dim: usize, degree: usize, family: ScalarFamily) -> Result<Self, BasisError> {
        let indices = IndexSet::total_degree(degree, dim)?;
        let dmat = family.derivative_matrix(degree, 1);
        let d2mat = family.derivative_matrix(degree, 2);
        log::debug!(
            "Built {:?} tensor basis: dim={}, degree={}, {} functions",
            family,
            dim,
            degree,
            indices.len()
        );
        Ok(Self {
            dim,
            degree,
            family,
            indices,
            dmat,
            d2mat,
            rescaling: Rescaling::Identity,
        })
    }

    pub fn monomial(dim: usize, degree: usize) -> Result<Self, BasisError> {
        Self::new(dim, degree, ScalarFamily::Monomial)
    }

    pub fn legendre(dim: usize, degree: usize) -> Result<Self, BasisError> {
        Self::new(dim, degree, ScalarFamily::Legendre)
    }

    pub fn chebyshev(dim: usize, degree: usize) -> Result<Self, BasisError> {
        Self::new(dim, degree, ScalarFamily::Chebyshev)
    }

    pub fn laguerre(dim: usize, degree: usize) -> Result<Self, BasisError> {
        Self::new(dim, degree, ScalarFamily::Laguerre)
    }

    pub fn hermite(dim: usize, degree: usize) -> Result<Self, BasisError> {
        Self::new(dim, degree, ScalarFamily::Hermite)
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn family(&self) -> ScalarFamily {
        self.family
    }

    pub fn rescaling(&self) -> &Rescaling {
        &self.rescaling
    }

    /// Scalar derivative matrix of shape `(degree + 1, degree)`.
    pub fn derivative_matrix(&self) -> &Array2<f64> {
        &self.dmat
    }

    /// Fits the rescaling from a reference point set. Allowed once.
    pub fn set_scale(&mut self, reference: ArrayView2<'_, f64>) -> Result<(), BasisError> {
        if !self.rescaling.is_identity() {
            return Err(BasisError::ScaleAlreadySet);
        }
        check_points(reference, self.dim)?;
        self.rescaling = Rescaling::fit(self.family.rescale_kind(), reference)?;
        log::debug!(
            "Rescaling set from {} reference points: {:?}",
            reference.nrows(),
            self.rescaling
        );
        Ok(())
    }

    fn coordinate_values(
        &self,
        points: ArrayView2<'_, f64>,
    ) -> Result<Vec<Array2<f64>>, BasisError> {
        check_points(points, self.dim)?;
        let scaled = self.rescaling.apply(points);
        Ok(scaled
            .axis_iter(Axis(1))
            .map(|col| self.family.vander(col, self.degree))
            .collect())
    }

    fn coordinate_tables(
        &self,
        points: ArrayView2<'_, f64>,
        with_second: bool,
    ) -> Result<CoordinateTables, BasisError> {
        let values = self.coordinate_values(points)?;
        let p = self.degree;
        let first = values
            .iter()
            .map(|v| v.slice(s![.., ..p]).dot(&self.dmat.t()))
            .collect();
        let second = if with_second {
            let w = self.d2mat.ncols();
            values
                .iter()
                .map(|v| v.slice(s![.., ..w]).dot(&self.d2mat.t()))
                .collect()
        } else {
            Vec::new()
        };
        Ok(CoordinateTables {
            values,
            first,
            second,
        })
    }

    /// Vandermonde matrix `V[i, j] = psi_j(x_i)`, shape `(M, N)`.
    pub fn v(&self, points: ArrayView2<'_, f64>) -> Result<Array2<f64>, BasisError> {
        let values = self.coordinate_values(points)?;
        let mut out = Array2::<f64>::ones((points.nrows(), self.indices.len()));
        out.axis_iter_mut(Axis(1))
            .into_par_iter()
            .enumerate()
            .for_each(|(j, mut col)| {
                let alpha = self.indices.get(j).unwrap_or_default();
                for (k, &a) in alpha.iter().enumerate() {
                    col *= &values[k].column(a);
                }
            });
        Ok(out)
    }

    /// `V(X) c` for a single coefficient vector, without forming `V`.
    pub fn vc(
        &self,
        points: ArrayView2<'_, f64>,
        coeffs: ArrayView1<'_, f64>,
    ) -> Result<Array1<f64>, BasisError> {
        let out = self.vc_multi(points, coeffs.insert_axis(Axis(1)))?;
        Ok(out.index_axis_move(Axis(1), 0))
    }

    /// `V(X) C` for a `(N, K)` block of coefficient vectors, without forming `V`.
    ///
    /// Columns whose coefficient row is entirely zero are skipped.
    pub fn vc_multi(
        &self,
        points: ArrayView2<'_, f64>,
        coeffs: ArrayView2<'_, f64>,
    ) -> Result<Array2<f64>, BasisError> {
        if coeffs.nrows() != self.indices.len() {
            return Err(BasisError::CoefficientLengthMismatch {
                expected: self.indices.len(),
                found: coeffs.nrows(),
            });
        }
        let values = self.coordinate_values(points)?;
        let m = points.nrows();
        let mut out = Array2::<f64>::zeros((m, coeffs.ncols()));
        let mut col = Array1::<f64>::zeros(m);
        for (alpha, c_row) in self.indices.iter().zip(coeffs.axis_iter(Axis(0))) {
            if c_row.iter().all(|&c| c == 0.0) {
                continue;
            }
            col.fill(1.0);
            for (k, &a) in alpha.iter().enumerate() {
                col *= &values[k].column(a);
            }
            for (mut out_col, &c) in out.axis_iter_mut(Axis(1)).zip(c_row.iter()) {
                out_col.scaled_add(c, &col);
            }
        }
        Ok(out)
    }

    /// Gradient tensor `DV[i, j, k] = d psi_j / d x_k (x_i)`, shape `(M, N, dim)`.
    pub fn dv(&self, points: ArrayView2<'_, f64>) -> Result<Array3<f64>, BasisError> {
        let tables = self.coordinate_tables(points, false)?;
        let dscale = self.rescaling.derivative_scale(self.dim);
        let mut out = Array3::<f64>::ones((points.nrows(), self.indices.len(), self.dim));

        for k in 0..self.dim {
            let mut slab = out.index_axis_mut(Axis(2), k);
            slab.axis_iter_mut(Axis(1))
                .into_par_iter()
                .enumerate()
                .for_each(|(j, mut col)| {
                    let alpha = self.indices.get(j).unwrap_or_default();
                    for (q, &a) in alpha.iter().enumerate() {
                        if q == k {
                            col *= &tables.first[q].column(a);
                        } else {
                            col *= &tables.values[q].column(a);
                        }
                    }
                    col *= dscale[k];
                });
        }
        Ok(out)
    }

    /// Hessian tensor `DDV[i, j, k, l] = d^2 psi_j / d x_k d x_l (x_i)`,
    /// shape `(M, N, dim, dim)`.
    ///
    /// Only `k <= l` is evaluated; the other half is a copy, so the result is
    /// exactly symmetric.
    pub fn ddv(&self, points: ArrayView2<'_, f64>) -> Result<Array4<f64>, BasisError> {
        let tables = self.coordinate_tables(points, true)?;
        let dscale = self.rescaling.derivative_scale(self.dim);
        let (m, n, d) = (points.nrows(), self.indices.len(), self.dim);
        let mut out = Array4::<f64>::ones((m, n, d, d));

        for k in 0..d {
            for ell in k..d {
                let mut slab = out.slice_mut(s![.., .., k, ell]);
                slab.axis_iter_mut(Axis(1))
                    .into_par_iter()
                    .enumerate()
                    .for_each(|(j, mut col)| {
                        let alpha = self.indices.get(j).unwrap_or_default();
                        for (q, &a) in alpha.iter().enumerate() {
                            if q == k && q == ell {
                                col *= &tables.second[q].column(a);
                            } else if q == k || q == ell {
                                col *= &tables.first[q].column(a);
                            } else {
                                col *= &tables.values[q].column(a);
                            }
                        }
                        col *= dscale[k] * dscale[ell];
                    });
                if ell != k {
                    let upper = out.slice(s![.., .., k, ell]).to_owned();
                    out.slice_mut(s![.., .., ell, k]).assign(&upper);
                }
            }
        }
        Ok(out)
    }

    /// Roots of the univariate polynomial with coefficients `coeffs`, mapped
    /// back to raw coordinates.
    pub fn roots(&self, coeffs: ArrayView1<'_, f64>) -> Result<Vec<c64>, BasisError> {
        if self.dim > 1 {
            return Err(BasisError::RootsRequireUnivariate { dim: self.dim });
        }
        if coeffs.len() != self.indices.len() {
            return Err(BasisError::CoefficientLengthMismatch {
                expected: self.indices.len(),
                found: coeffs.len(),
            });
        }
        let roots = self.family.roots(coeffs)?;
        Ok(roots
            .into_iter()
            .map(|r| self.rescaling.unmap_root(r))
            .collect())
    }
}

impl PolynomialBasis for TensorBasis {
    fn dim(&self) -> usize {
        self.dim
    }

    fn indices(&self) -> &IndexSet {
        &self.indices
    }

    fn v(&self, points: ArrayView2<'_, f64>) -> Result<Array2<f64>, BasisError> {
        TensorBasis::v(self, points)
    }

    fn dv(&self, points: ArrayView2<'_, f64>) -> Result<Array3<f64>, BasisError> {
        TensorBasis::dv(self, points)
    }
}
