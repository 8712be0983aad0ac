use faer::linalg::matmul::matmul;
use faer::linalg::solvers;
use faer::{Accum, Mat, MatRef, Par, c64, get_global_parallelism};
use ndarray::{Array2, ArrayBase, Data, Ix2};
use std::marker::PhantomData;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FaerLinalgError {
    #[error("Eigenvalue decomposition failed: {0:?}")]
    Eigen(solvers::EvdError),
    #[error("Eigenvalue decomposition requires a square matrix, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
}

#[inline]
fn should_use_faer_matmul(m: usize, n: usize, k: usize) -> bool {
    // Tiny products stay on ndarray; faer GEMM pays off past this size.
    const MIN_DIM: usize = 32;
    const MIN_FLOP_SCALE: usize = 64 * 64;
    (m >= MIN_DIM || n >= MIN_DIM || k >= MIN_DIM)
        && m.saturating_mul(n).saturating_mul(k) >= MIN_FLOP_SCALE
}

fn mat_to_array(mat: MatRef<'_, f64>) -> Array2<f64> {
    Array2::from_shape_fn((mat.nrows(), mat.ncols()), |(i, j)| mat[(i, j)])
}

/// Borrowed faer view of an ndarray matrix.
///
/// Layouts faer cannot address directly (negative or zero strides) are copied
/// into a compact owned buffer held by the view.
pub struct FaerArrayView<'a> {
    ptr: *const f64,
    rows: usize,
    cols: usize,
    row_stride: isize,
    col_stride: isize,
    owned: Option<Array2<f64>>,
    _marker: PhantomData<&'a f64>,
}

impl<'a> FaerArrayView<'a> {
    pub fn new<S: Data<Elem = f64>>(array: &'a ArrayBase<S, Ix2>) -> Self {
        let (rows, cols) = array.dim();
        let strides = array.strides();
        if strides[0] <= 0 || strides[1] <= 0 {
            let owned = array.as_standard_layout().into_owned();
            return Self {
                ptr: owned.as_ptr(),
                rows,
                cols,
                row_stride: cols as isize,
                col_stride: 1,
                owned: Some(owned),
                _marker: PhantomData,
            };
        }

        Self {
            ptr: array.as_ptr(),
            rows,
            cols,
            row_stride: strides[0],
            col_stride: strides[1],
            owned: None,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn as_ref(&self) -> MatRef<'_, f64> {
        let ptr = match &self.owned {
            Some(owned) => owned.as_ptr(),
            None => self.ptr,
        };
        // SAFETY: the pointer either comes from a live ndarray borrow with
        // positive strides matching `rows`/`cols`, or from the compact row-major
        // copy owned by `self`; both outlive the returned view.
        unsafe { MatRef::from_raw_parts(ptr, self.rows, self.cols, self.row_stride, self.col_stride) }
    }
}

/// Gram matrix `A^T A`, shape `(p, p)` for `A` of shape `(n, p)`.
pub fn fast_ata<S: Data<Elem = f64>>(a: &ArrayBase<S, Ix2>) -> Array2<f64> {
    let (n, p) = a.dim();
    if !should_use_faer_matmul(p, p, n) {
        return a.t().dot(a);
    }

    let mut result = Mat::<f64>::zeros(p, p);
    let view = FaerArrayView::new(a);
    let a_ref = view.as_ref();
    let par = if n < 128 || p < 128 {
        Par::Seq
    } else {
        get_global_parallelism()
    };
    matmul(result.as_mut(), Accum::Replace, a_ref.transpose(), a_ref, 1.0, par);
    mat_to_array(result.as_ref())
}

/// Eigenvalues of a general real square matrix.
pub trait FaerEigenvalues {
    fn eigenvalues(&self) -> Result<Vec<c64>, FaerLinalgError>;
}

impl<S: Data<Elem = f64>> FaerEigenvalues for ArrayBase<S, Ix2> {
    fn eigenvalues(&self) -> Result<Vec<c64>, FaerLinalgError> {
        let (rows, cols) = self.dim();
        if rows != cols {
            return Err(FaerLinalgError::NotSquare { rows, cols });
        }
        if rows == 0 {
            return Ok(Vec::new());
        }
        let view = FaerArrayView::new(self);
        view.as_ref().eigenvalues().map_err(FaerLinalgError::Eigen)
    }
}
