//! Square sparse matrices and a preconditioned conjugate gradient solver.

use nalgebra::DVector;

use crate::error::{MeshError, Result};

/// Iteration limits for the linear solves.
#[derive(Debug, Clone)]
pub struct SolverOptions {
    /// Maximum conjugate gradient iterations per solve.
    pub max_iterations: usize,
    /// Relative residual tolerance.
    pub tolerance: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            tolerance: 1e-10,
        }
    }
}

impl SolverOptions {
    /// Set maximum iterations.
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set convergence tolerance.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }
}

/// Square matrix in compressed sparse row form.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    dim: usize,
    /// `row_start[i]..row_start[i + 1]` indexes the entries of row `i`.
    row_start: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Build a `dim x dim` matrix from `(row, col, value)` triplets.
    ///
    /// Repeated positions are summed; entries outside the matrix are dropped.
    pub fn from_triplets(dim: usize, triplets: Vec<(usize, usize, f64)>) -> Self {
        let triplets: Vec<(usize, usize, f64)> = triplets
            .into_iter()
            .filter(|&(r, c, _)| r < dim && c < dim)
            .collect();

        // Bucket by row, then sort and merge each row.
        let mut row_start = vec![0usize; dim + 1];
        for &(r, _, _) in &triplets {
            row_start[r + 1] += 1;
        }
        for r in 0..dim {
            row_start[r + 1] += row_start[r];
        }
        let mut fill = row_start.clone();
        let mut entries = vec![(0usize, 0.0f64); triplets.len()];
        for (r, c, v) in triplets {
            entries[fill[r]] = (c, v);
            fill[r] += 1;
        }

        let mut merged_start = Vec::with_capacity(dim + 1);
        let mut cols: Vec<usize> = Vec::with_capacity(entries.len());
        let mut values: Vec<f64> = Vec::with_capacity(entries.len());
        merged_start.push(0);
        for r in 0..dim {
            let row = &mut entries[row_start[r]..row_start[r + 1]];
            row.sort_by_key(|&(c, _)| c);
            let first = cols.len();
            for &(c, v) in row.iter() {
                if cols.len() > first && cols[cols.len() - 1] == c {
                    let last = values.len() - 1;
                    values[last] += v;
                } else {
                    cols.push(c);
                    values.push(v);
                }
            }
            merged_start.push(cols.len());
        }

        Self {
            dim,
            row_start: merged_start,
            cols,
            values,
        }
    }

    /// Matrix dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Diagonal entries.
    pub fn diagonal(&self) -> DVector<f64> {
        DVector::from_fn(self.dim, |i, _| {
            (self.row_start[i]..self.row_start[i + 1])
                .find(|&k| self.cols[k] == i)
                .map_or(0.0, |k| self.values[k])
        })
    }

    /// `A * x`.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(self.dim, |i, _| {
            (self.row_start[i]..self.row_start[i + 1])
                .map(|k| self.values[k] * x[self.cols[k]])
                .sum()
        })
    }
}

/// Solve `A x = b` for symmetric positive (semi)definite `A`.
///
/// Uses conjugate gradient with a Jacobi preconditioner, starting from `x0`
/// or zero. Converges when `|r| / |b|` drops below the tolerance.
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &DVector<f64>,
    x0: Option<&DVector<f64>>,
    options: &SolverOptions,
) -> Result<DVector<f64>> {
    let n = b.len();
    if a.dim() != n {
        return Err(MeshError::invalid_param(
            "matrix",
            a.dim(),
            "dimension does not match the right-hand side",
        ));
    }

    let b_norm = b.norm();
    if b_norm < 1e-300 {
        return Ok(DVector::zeros(n));
    }
    let mut x = x0.cloned().unwrap_or_else(|| DVector::zeros(n));

    let inv_diag = a
        .diagonal()
        .map(|d| if d.abs() > f64::MIN_POSITIVE { 1.0 / d } else { 1.0 });

    let mut r = b - a.mul_vec(&x);
    if r.norm() / b_norm < options.tolerance {
        return Ok(x);
    }
    let mut z = r.component_mul(&inv_diag);
    let mut p = z.clone();
    let mut rz = r.dot(&z);

    for _ in 0..options.max_iterations {
        let ap = a.mul_vec(&p);
        let pap = p.dot(&ap);
        if pap.abs() < 1e-300 {
            break;
        }
        let alpha = rz / pap;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        if r.norm() / b_norm < options.tolerance {
            return Ok(x);
        }

        z = r.component_mul(&inv_diag);
        let rz_next = r.dot(&z);
        let beta = rz_next / rz;
        rz = rz_next;
        p = &z + p * beta;
    }

    Err(MeshError::ConvergenceFailed {
        iterations: options.max_iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tridiagonal(n: usize) -> CsrMatrix {
        let mut triplets = Vec::new();
        for i in 0..n {
            triplets.push((i, i, 4.0));
            if i + 1 < n {
                triplets.push((i, i + 1, -1.0));
                triplets.push((i + 1, i, -1.0));
            }
        }
        CsrMatrix::from_triplets(n, triplets)
    }

    #[test]
    fn test_duplicates_are_summed() {
        let a = CsrMatrix::from_triplets(
            2,
            vec![(0, 0, 2.0), (1, 1, 3.0), (0, 0, 2.0), (0, 1, 1.0)],
        );
        assert_eq!(a.nnz(), 3);
        assert_eq!(a.diagonal(), DVector::from_vec(vec![4.0, 3.0]));
        let y = a.mul_vec(&DVector::from_vec(vec![1.0, 1.0]));
        assert_eq!(y, DVector::from_vec(vec![5.0, 3.0]));
    }

    #[test]
    fn test_cg_solves_tridiagonal() {
        let a = tridiagonal(50);
        let b = DVector::from_fn(50, |i, _| (i as f64).sin());
        let x = conjugate_gradient(&a, &b, None, &SolverOptions::default()).unwrap();
        assert!((a.mul_vec(&x) - &b).norm() < 1e-8);
    }

    #[test]
    fn test_cg_reports_non_convergence() {
        let a = tridiagonal(50);
        let b = DVector::from_element(50, 1.0);
        let options = SolverOptions::default()
            .with_max_iterations(1)
            .with_tolerance(1e-14);
        assert!(matches!(
            conjugate_gradient(&a, &b, None, &options),
            Err(MeshError::ConvergenceFailed { iterations: 1 })
        ));
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = tridiagonal(3);
        let b = DVector::zeros(4);
        assert!(conjugate_gradient(&a, &b, None, &SolverOptions::default()).is_err());
    }
}
