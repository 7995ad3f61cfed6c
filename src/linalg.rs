use eyre::{bail, Result};
use ndarray::{Array1, Array2};

const MAX_ITERATIONS: usize = 10_000;
const TOLERANCE: f64 = 1e-14;

/// Largest singular value of `m` (the matrix 2-norm).
///
/// Runs power iteration on the Gram matrix `mᵀm` and returns the square root
/// of its dominant eigenvalue. An empty or all-zero matrix has norm 0.
pub fn spectral_norm(m: &Array2<f64>) -> f64 {
    let (rows, cols) = m.dim();
    if rows == 0 || cols == 0 {
        return 0.0;
    }
    let gram = m.t().dot(m);

    // Irregular start so the vector is not orthogonal to structured
    // eigenvectors such as (1, -1, 1, ...).
    let mut v: Array1<f64> =
        Array1::from_iter((0..cols).map(|i| 1.0 + ((i as f64 + 1.0) * 0.618_033_988_75).fract()));
    let start_norm = v.dot(&v).sqrt();
    v /= start_norm;

    let mut eigenvalue = 0.0;
    for _ in 0..MAX_ITERATIONS {
        let w = gram.dot(&v);
        let next = v.dot(&w);
        let norm = w.dot(&w).sqrt();
        if norm == 0.0 {
            return 0.0;
        }
        v = w / norm;
        let converged = (next - eigenvalue).abs() <= TOLERANCE * next.abs();
        eigenvalue = next;
        if converged {
            break;
        }
    }
    eigenvalue.max(0.0).sqrt()
}

/// How well `scores` agrees with a ±1 same-speaker `reference` matrix:
/// `‖reference · scores‖₂ / ‖scores‖₂ / ‖reference‖₂`.
pub fn normalized_alignment(reference: &Array2<f64>, scores: &Array2<f64>) -> Result<f64> {
    if reference.ncols() != scores.nrows() {
        bail!(
            "cannot multiply a {:?} reference matrix by a {:?} score matrix",
            reference.dim(),
            scores.dim()
        );
    }
    let product = reference.dot(scores);
    let dot_prod = spectral_norm(&product);
    let sys_norm = spectral_norm(scores);
    let ref_norm = spectral_norm(reference);
    if sys_norm == 0.0 || ref_norm == 0.0 {
        tracing::warn!("zero matrix norm (scores {sys_norm}, reference {ref_norm})");
    }
    Ok(dot_prod / sys_norm / ref_norm)
}
