//! One-dimensional polynomial families.
//!
//! Every family supplies three pieces of algebra in its own coefficient
//! basis: the Vandermonde matrix, coefficient-space differentiation and root
//! finding through a family-specific companion matrix. The tensor engine never
//! looks past this module for family-dependent behaviour.

use crate::basis::BasisError;
use crate::faer_ndarray::FaerEigenvalues;
use faer::c64;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// How raw coordinates are mapped into a family's reference domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescaleKind {
    /// Bounding box mapped onto `[-1, 1]`.
    Interval,
    /// Centered and divided by `std * sqrt(2)`.
    Standardize,
}

/// Closed set of supported scalar polynomial families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarFamily {
    Monomial,
    Legendre,
    Chebyshev,
    Laguerre,
    /// Physicists' Hermite polynomials `H_n`.
    Hermite,
}

impl ScalarFamily {
    pub const ALL: [ScalarFamily; 5] = [
        ScalarFamily::Monomial,
        ScalarFamily::Legendre,
        ScalarFamily::Chebyshev,
        ScalarFamily::Laguerre,
        ScalarFamily::Hermite,
    ];

    pub fn rescale_kind(self) -> RescaleKind {
        match self {
            ScalarFamily::Hermite => RescaleKind::Standardize,
            _ => RescaleKind::Interval,
        }
    }

    /// `(len(x), degree + 1)` matrix whose column `n` is the family's
    /// degree-`n` polynomial evaluated at every entry of `x`.
    pub fn vander(self, x: ArrayView1<'_, f64>, degree: usize) -> Array2<f64> {
        let m = x.len();
        let mut v = Array2::<f64>::zeros((m, degree + 1));
        v.column_mut(0).fill(1.0);
        if degree == 0 {
            return v;
        }

        for (row, &xi) in x.iter().enumerate() {
            let first = match self {
                ScalarFamily::Monomial | ScalarFamily::Legendre | ScalarFamily::Chebyshev => xi,
                ScalarFamily::Laguerre => 1.0 - xi,
                ScalarFamily::Hermite => 2.0 * xi,
            };
            v[[row, 1]] = first;

            for n in 2..=degree {
                let p1 = v[[row, n - 1]];
                let p2 = v[[row, n - 2]];
                let nf = n as f64;
                v[[row, n]] = match self {
                    ScalarFamily::Monomial => p1 * xi,
                    ScalarFamily::Legendre => (p1 * xi * (2.0 * nf - 1.0) - p2 * (nf - 1.0)) / nf,
                    ScalarFamily::Chebyshev => 2.0 * xi * p1 - p2,
                    ScalarFamily::Laguerre => (p1 * (2.0 * nf - 1.0 - xi) - p2 * (nf - 1.0)) / nf,
                    ScalarFamily::Hermite => 2.0 * xi * p1 - 2.0 * (nf - 1.0) * p2,
                };
            }
        }
        v
    }

    /// Coefficients of the `order`-th derivative, expressed in the same family.
    ///
    /// The result is shorter than `coeffs` by `order`. Differentiating past the
    /// polynomial's degree yields the single zero coefficient `[0.0]`.
    pub fn der(self, coeffs: ArrayView1<'_, f64>, order: usize) -> Array1<f64> {
        let mut c = coeffs.to_owned();
        if order == 0 {
            return c;
        }
        if order >= c.len() {
            return Array1::zeros(1);
        }
        for _ in 0..order {
            c = self.der_once(c);
        }
        c
    }

    fn der_once(self, mut c: Array1<f64>) -> Array1<f64> {
        let n = c.len() - 1;
        let mut der = Array1::<f64>::zeros(n);
        match self {
            ScalarFamily::Monomial => {
                for j in (1..=n).rev() {
                    der[j - 1] = j as f64 * c[j];
                }
            }
            ScalarFamily::Legendre => {
                for j in (3..=n).rev() {
                    der[j - 1] = (2 * j - 1) as f64 * c[j];
                    c[j - 2] += c[j];
                }
                if n > 1 {
                    der[1] = 3.0 * c[2];
                }
                der[0] = c[1];
            }
            ScalarFamily::Chebyshev => {
                for j in (3..=n).rev() {
                    let jf = j as f64;
                    der[j - 1] = 2.0 * jf * c[j];
                    c[j - 2] += jf * c[j] / (jf - 2.0);
                }
                if n > 1 {
                    der[1] = 4.0 * c[2];
                }
                der[0] = c[1];
            }
            ScalarFamily::Laguerre => {
                for j in (2..=n).rev() {
                    der[j - 1] = -c[j];
                    c[j - 1] += c[j];
                }
                der[0] = -c[1];
            }
            ScalarFamily::Hermite => {
                for j in (1..=n).rev() {
                    der[j - 1] = 2.0 * j as f64 * c[j];
                }
            }
        }
        der
    }

    /// Matrix whose row `j` holds the `order`-th derivative coefficients of the
    /// degree-`j` basis polynomial, shape `(degree + 1, degree + 1 - order)`
    /// (zero columns once `order` exceeds `degree`).
    pub fn derivative_matrix(self, degree: usize, order: usize) -> Array2<f64> {
        let width = (degree + 1).saturating_sub(order);
        let mut dmat = Array2::<f64>::zeros((degree + 1, width));
        let mut unit = Array1::<f64>::zeros(degree + 1);
        for j in 0..=degree {
            unit.fill(0.0);
            unit[j] = 1.0;
            let der = self.der(unit.view(), order);
            for (col, &value) in der.iter().take(width).enumerate() {
                dmat[[j, col]] = value;
            }
        }
        dmat
    }

    /// Companion matrix whose eigenvalues are the roots of `coeffs`.
    ///
    /// `coeffs` must have at least three entries and a non-zero leading term.
    fn companion(self, c: &[f64]) -> Array2<f64> {
        let n = c.len() - 1;
        let lead = c[n];
        let mut mat = Array2::<f64>::zeros((n, n));
        match self {
            ScalarFamily::Monomial => {
                for i in 0..n - 1 {
                    mat[[i + 1, i]] = 1.0;
                }
                for i in 0..n {
                    mat[[i, n - 1]] -= c[i] / lead;
                }
            }
            ScalarFamily::Chebyshev => {
                let scl: Vec<f64> = (0..n)
                    .map(|i| if i == 0 { 1.0 } else { 0.5f64.sqrt() })
                    .collect();
                for i in 0..n - 1 {
                    let off = if i == 0 { 0.5f64.sqrt() } else { 0.5 };
                    mat[[i, i + 1]] = off;
                    mat[[i + 1, i]] = off;
                }
                for i in 0..n {
                    mat[[i, n - 1]] -= (c[i] / lead) * (scl[i] / scl[n - 1]) * 0.5;
                }
            }
            ScalarFamily::Legendre => {
                let scl: Vec<f64> = (0..n).map(|i| 1.0 / ((2 * i + 1) as f64).sqrt()).collect();
                for i in 0..n - 1 {
                    let off = (i + 1) as f64 * scl[i] * scl[i + 1];
                    mat[[i, i + 1]] = off;
                    mat[[i + 1, i]] = off;
                }
                let nf = n as f64;
                for i in 0..n {
                    mat[[i, n - 1]] -= (c[i] / lead) * (scl[i] / scl[n - 1]) * (nf / (2.0 * nf - 1.0));
                }
            }
            ScalarFamily::Laguerre => {
                for i in 0..n {
                    mat[[i, i]] = (2 * i + 1) as f64;
                }
                for i in 0..n - 1 {
                    let off = -((i + 1) as f64);
                    mat[[i, i + 1]] = off;
                    mat[[i + 1, i]] = off;
                }
                for i in 0..n {
                    mat[[i, n - 1]] += (c[i] / lead) * n as f64;
                }
            }
            ScalarFamily::Hermite => {
                // Running product of 1/sqrt(2k) for k = n-1, ..., 1, read backwards.
                let mut acc = Vec::with_capacity(n);
                acc.push(1.0);
                for k in (1..n).rev() {
                    let prev = acc[acc.len() - 1];
                    acc.push(prev / (2.0 * k as f64).sqrt());
                }
                acc.reverse();
                for i in 0..n - 1 {
                    let off = (0.5 * (i + 1) as f64).sqrt();
                    mat[[i, i + 1]] = off;
                    mat[[i + 1, i]] = off;
                }
                for i in 0..n {
                    mat[[i, n - 1]] -= acc[i] * c[i] / (2.0 * lead);
                }
            }
        }
        mat
    }

    /// Roots of the polynomial with coefficients `coeffs` in this family's
    /// basis, sorted by real then imaginary part.
    ///
    /// Trailing zero coefficients are ignored. Constant polynomials have no
    /// roots.
    pub fn roots(self, coeffs: ArrayView1<'_, f64>) -> Result<Vec<c64>, BasisError> {
        if coeffs.iter().any(|v| !v.is_finite()) {
            return Err(BasisError::NonFiniteInput);
        }
        let mut c: Vec<f64> = coeffs.to_vec();
        while c.len() > 1 && c[c.len() - 1] == 0.0 {
            c.pop();
        }

        if c.len() < 2 {
            return Ok(Vec::new());
        }
        if c.len() == 2 {
            let ratio = c[0] / c[1];
            let root = match self {
                ScalarFamily::Monomial | ScalarFamily::Legendre | ScalarFamily::Chebyshev => -ratio,
                ScalarFamily::Laguerre => 1.0 + ratio,
                ScalarFamily::Hermite => -0.5 * ratio,
            };
            return Ok(vec![c64::new(root, 0.0)]);
        }

        let mut roots = self.companion(&c).eigenvalues()?;
        roots.sort_by(|a, b| a.re.total_cmp(&b.re).then(a.im.total_cmp(&b.im)));
        Ok(roots)
    }
}
