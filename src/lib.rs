#![deny(dead_code)]
#![deny(unused_imports)]
#![allow(non_snake_case)]

pub mod arnoldi;
pub mod basis;
pub mod family;
pub mod indices;
pub mod linalg;
pub mod scaling;
pub mod types;

pub use linalg::faer_ndarray;

pub use arnoldi::ArnoldiBasis;
pub use basis::{
    BasisError, BasisErrorKind, PolynomialBasis, TensorBasis, points_from_flat,
};
pub use family::{RescaleKind, ScalarFamily};
pub use indices::{IndexSet, index_set, index_set_size};
pub use scaling::Rescaling;
pub use types::{ArnoldiBasisSpec, TensorBasisSpec};
