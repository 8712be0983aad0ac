use ndarray::{Array1, Array2, Array3, Array4, Axis, array};
use polybasis::{PolynomialBasis, Rescaling, ScalarFamily, TensorBasis, TensorBasisSpec};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use rand_distr::{Distribution, Normal};

fn random_points(rng: &mut StdRng, m: usize, dim: usize) -> Array2<f64> {
    Array2::from_shape_fn((m, dim), |_| rng.random_range(-2.0..3.0))
}

fn scaled_basis(family: ScalarFamily, dim: usize, degree: usize, rng: &mut StdRng) -> TensorBasis {
    let reference = random_points(rng, 40, dim);
    TensorBasisSpec::new(dim, degree, family)
        .build_scaled(reference.view())
        .expect("scaled basis")
}

fn max_abs(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().fold(0.0, |acc, v| acc.max(v.abs()))
}

fn central_difference_of_v(basis: &TensorBasis, x: &Array2<f64>, h: f64) -> Array3<f64> {
    let (m, dim) = x.dim();
    let mut out = Array3::<f64>::zeros((m, basis.len(), dim));
    for k in 0..dim {
        let mut plus = x.clone();
        let mut minus = x.clone();
        plus.column_mut(k).mapv_inplace(|v| v + h);
        minus.column_mut(k).mapv_inplace(|v| v - h);
        let diff = (basis.v(plus.view()).expect("V+") - basis.v(minus.view()).expect("V-")) / (2.0 * h);
        out.index_axis_mut(Axis(2), k).assign(&diff);
    }
    out
}

fn central_difference_of_dv(basis: &TensorBasis, x: &Array2<f64>, h: f64) -> Array4<f64> {
    let (m, dim) = x.dim();
    let mut out = Array4::<f64>::zeros((m, basis.len(), dim, dim));
    for ell in 0..dim {
        let mut plus = x.clone();
        let mut minus = x.clone();
        plus.column_mut(ell).mapv_inplace(|v| v + h);
        minus.column_mut(ell).mapv_inplace(|v| v - h);
        let diff = (basis.dv(plus.view()).expect("DV+") - basis.dv(minus.view()).expect("DV-")) / (2.0 * h);
        out.index_axis_mut(Axis(3), ell).assign(&diff);
    }
    out
}

#[test]
fn vc_matches_explicit_product_for_every_family() {
    let mut rng = StdRng::seed_from_u64(20260301);
    for family in ScalarFamily::ALL {
        for dim in 1..=3 {
            let basis = scaled_basis(family, dim, 4, &mut rng);
            let x = random_points(&mut rng, 17, dim);
            let v = basis.v(x.view()).expect("V");

            let mut c = Array1::from_shape_fn(basis.len(), |_| rng.random_range(-1.0..1.0));
            // Zero rows take the skip path and must not change the result.
            c[1] = 0.0;
            let expected = v.dot(&c);
            let got = basis.vc(x.view(), c.view()).expect("VC");
            let tol = 1e-10 * max_abs(expected.iter().copied()).max(1.0);
            for (a, b) in got.iter().zip(expected.iter()) {
                assert!((a - b).abs() <= tol, "{family:?} dim {dim}: {a} vs {b}");
            }

            let block = Array2::from_shape_fn((basis.len(), 3), |_| rng.random_range(-1.0..1.0));
            let expected = v.dot(&block);
            let got = basis.vc_multi(x.view(), block.view()).expect("VC multi");
            assert_eq!(got.dim(), (17, 3));
            let tol = 1e-10 * max_abs(expected.iter().copied()).max(1.0);
            assert!(max_abs((&got - &expected).iter().copied()) <= tol);
        }
    }
}

#[test]
fn gradient_matches_central_differences() {
    let mut rng = StdRng::seed_from_u64(7);
    let h = 1e-5;
    for family in ScalarFamily::ALL {
        for dim in 1..=3 {
            let basis = scaled_basis(family, dim, 3, &mut rng);
            let x = random_points(&mut rng, 9, dim);
            let dv = basis.dv(x.view()).expect("DV");
            assert_eq!(dv.dim(), (9, basis.len(), dim));
            let fd = central_difference_of_v(&basis, &x, h);
            let scale = max_abs(dv.iter().copied()).max(1.0);
            let err = max_abs((&dv - &fd).iter().copied());
            assert!(err <= 1e-6 * scale, "{family:?} dim {dim}: error {err:e} (scale {scale:e})");
        }
    }
}

#[test]
fn hessian_matches_central_differences_of_gradient() {
    let mut rng = StdRng::seed_from_u64(11);
    let h = 1e-4;
    for family in ScalarFamily::ALL {
        for dim in 1..=3 {
            let basis = scaled_basis(family, dim, 3, &mut rng);
            let x = random_points(&mut rng, 6, dim);
            let ddv = basis.ddv(x.view()).expect("DDV");
            assert_eq!(ddv.dim(), (6, basis.len(), dim, dim));
            let fd = central_difference_of_dv(&basis, &x, h);
            let scale = max_abs(ddv.iter().copied()).max(1.0);
            let err = max_abs((&ddv - &fd).iter().copied());
            assert!(err <= 1e-5 * scale, "{family:?} dim {dim}: error {err:e} (scale {scale:e})");
        }
    }
}

#[test]
fn hessian_is_exactly_symmetric() {
    let mut rng = StdRng::seed_from_u64(3);
    for family in ScalarFamily::ALL {
        let basis = scaled_basis(family, 3, 4, &mut rng);
        let x = random_points(&mut rng, 8, 3);
        let ddv = basis.ddv(x.view()).expect("DDV");
        for k in 0..3 {
            for ell in 0..3 {
                let upper = ddv.index_axis(Axis(3), ell);
                let upper = upper.index_axis(Axis(2), k);
                let lower = ddv.index_axis(Axis(3), k);
                let lower = lower.index_axis(Axis(2), ell);
                assert_eq!(upper, lower, "{family:?} ({k}, {ell})");
            }
        }
    }
}

#[test]
fn unscaled_basis_differentiates_raw_coordinates() {
    let basis = TensorBasis::monomial(2, 2).expect("basis");
    let x = array![[0.5, -2.0]];
    let dv = basis.dv(x.view()).expect("DV");
    // Columns: 1, x, y, x^2, xy, y^2
    assert_eq!(dv.index_axis(Axis(0), 0).column(0).to_vec(), vec![0.0, 1.0, 0.0, 1.0, -2.0, 0.0]);
    assert_eq!(dv.index_axis(Axis(0), 0).column(1).to_vec(), vec![0.0, 0.0, 1.0, 0.0, 0.5, -4.0]);
    let ddv = basis.ddv(x.view()).expect("DDV");
    assert_eq!(ddv[[0, 3, 0, 0]], 2.0);
    assert_eq!(ddv[[0, 4, 0, 1]], 1.0);
    assert_eq!(ddv[[0, 5, 1, 1]], 2.0);
}

#[test]
fn hermite_at_sample_mean_is_hermite_at_zero() {
    let mut rng = StdRng::seed_from_u64(42);
    let normal = Normal::new(3.0, 0.5).expect("normal params must be valid");
    let reference = Array2::from_shape_fn((200, 2), |_| normal.sample(&mut rng));

    let mut basis = TensorBasis::hermite(2, 4).expect("basis");
    basis.set_scale(reference.view()).expect("scale");
    let mean = match basis.rescaling() {
        Rescaling::Standardized { mean, .. } => mean.clone(),
        other => panic!("expected standardized rescaling, got {other:?}"),
    };

    let v = basis.v(mean.view().insert_axis(Axis(0))).expect("V");
    let h0 = [1.0, 0.0, -2.0, 0.0, 12.0];
    for (j, alpha) in basis.indices().iter().enumerate() {
        let expected: f64 = alpha.iter().map(|&a| h0[a]).product();
        assert!((v[[0, j]] - expected).abs() < 1e-10, "{alpha:?}: {} vs {expected}", v[[0, j]]);
    }
}

#[test]
fn monomial_cubic_scenario() {
    let x = Array1::linspace(-1.0, 1.0, 5).insert_axis(Axis(1));
    let mut basis = TensorBasis::monomial(1, 3).expect("basis");
    basis.set_scale(x.view()).expect("scale");

    let v = basis.v(x.view()).expect("V");
    let expected = Array2::from_shape_fn((5, 4), |(i, p)| x[[i, 0]].powi(p as i32));
    assert!(max_abs((&v - &expected).iter().copied()) < 1e-14);

    let roots = basis.roots(array![0.0, -1.0, 0.0, 1.0].view()).expect("roots");
    assert_eq!(roots.len(), 3);
    for (root, expected) in roots.iter().zip([-1.0, 0.0, 1.0]) {
        assert!((root.re - expected).abs() < 1e-10);
        assert!(root.im.abs() < 1e-10);
    }
}

#[test]
fn legendre_roots_are_mapped_back_to_the_reference_interval() {
    let mut basis = TensorBasis::legendre(1, 2).expect("basis");
    basis.set_scale(array![[10.0], [14.0]].view()).expect("scale");
    // P_2 vanishes at +-1/sqrt(3) on the scaled axis.
    let roots = basis.roots(array![0.0, 0.0, 1.0].view()).expect("roots");
    let offset = 2.0 / 3.0f64.sqrt();
    assert!((roots[0].re - (12.0 - offset)).abs() < 1e-10);
    assert!((roots[1].re - (12.0 + offset)).abs() < 1e-10);
}

#[test]
fn identical_configuration_gives_identical_column_order() {
    let a = TensorBasis::chebyshev(4, 3).expect("basis");
    let b = TensorBasisSpec::new(4, 3, ScalarFamily::Hermite).build().expect("basis");
    assert_eq!(a.indices(), b.indices());
}
