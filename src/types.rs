use crate::arnoldi::ArnoldiBasis;
use crate::basis::{BasisError, TensorBasis};
use crate::family::ScalarFamily;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

fn default_family() -> ScalarFamily {
    ScalarFamily::Legendre
}

/// Serializable description of a tensor-product basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorBasisSpec {
    pub dim: usize,
    pub degree: usize,
    #[serde(default = "default_family")]
    pub family: ScalarFamily,
}

impl TensorBasisSpec {
    pub fn new(dim: usize, degree: usize, family: ScalarFamily) -> Self {
        Self {
            dim,
            degree,
            family,
        }
    }

    pub fn build(&self) -> Result<TensorBasis, BasisError> {
        TensorBasis::new(self.dim, self.degree, self.family)
    }

    /// Builds the basis and fits its rescaling to `reference` in one step.
    pub fn build_scaled(&self, reference: ArrayView2<'_, f64>) -> Result<TensorBasis, BasisError> {
        let mut basis = self.build()?;
        basis.set_scale(reference)?;
        Ok(basis)
    }
}

/// Serializable description of a Vandermonde-with-Arnoldi basis. The sample
/// itself is supplied at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArnoldiBasisSpec {
    pub degree: usize,
}

impl ArnoldiBasisSpec {
    pub fn build(&self, points: ArrayView2<'_, f64>) -> Result<ArnoldiBasis, BasisError> {
        ArnoldiBasis::new(points, self.degree)
    }
}
