//! Zero restrictions on the columns of the structural matrix.

use faer::{Mat, MatRef};
use itertools::Itertools;

use crate::error::{Result, SvarError};
use crate::math::{cholesky_lower, mat_all_finite};

/// One basis per column of `B`: column `n` of `B` must lie in the span of the
/// columns of `basis(n)`.
#[derive(Debug, Clone)]
pub struct Restrictions {
    bases: Vec<Mat<f64>>,
}

impl Restrictions {
    pub fn new(bases: Vec<Mat<f64>>) -> Self {
        Self { bases }
    }

    /// Every column of `B` is free.
    pub fn unrestricted(n: usize) -> Self {
        Self::new((0..n).map(|_| Mat::identity(n, n)).collect())
    }

    /// `B[i, n]` is free for `i >= n` only.
    pub fn lower_triangular(n: usize) -> Self {
        Self::from_fn(n, |i, j| i >= j)
    }

    /// `pattern[i][j]` marks `B[i, j]` as free.
    pub fn from_pattern(pattern: &[Vec<bool>]) -> Self {
        let n = pattern.len();
        Self::from_fn(n, |i, j| pattern[i].get(j).copied().unwrap_or(false))
    }

    fn from_fn(n: usize, free: impl Fn(usize, usize) -> bool) -> Self {
        let bases = (0..n)
            .map(|col| {
                let rows = (0..n).filter(|&row| free(row, col)).collect_vec();
                Mat::from_fn(n, rows.len(), |i, j| if rows[j] == i { 1f64 } else { 0f64 })
            })
            .collect();
        Self::new(bases)
    }

    pub fn len(&self) -> usize {
        self.bases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    /// Basis of column `column` of `B`.
    ///
    /// # Panics
    ///
    /// Panics if `column` is not below [`Restrictions::len`]. See
    /// [`Restrictions::get`] for a non-panicking version.
    pub fn basis(&self, column: usize) -> MatRef<'_, f64> {
        self.bases[column].as_ref()
    }

    pub fn get(&self, column: usize) -> Option<MatRef<'_, f64>> {
        self.bases.get(column).map(|basis| basis.as_ref())
    }

    /// Number of free coordinates of each column.
    pub fn free_counts(&self) -> impl Iterator<Item = usize> + '_ {
        self.bases.iter().map(|basis| basis.ncols())
    }

    pub(crate) fn validate(&self, n: usize) -> Result<()> {
        if self.bases.len() != n {
            return Err(SvarError::config(format!(
                "expected {} restriction bases, got {}",
                n,
                self.bases.len()
            )));
        }
        for (column, basis) in self.bases.iter().enumerate() {
            if basis.nrows() != n {
                return Err(SvarError::config(format!(
                    "restriction basis {} must have {} rows, got {}",
                    column,
                    n,
                    basis.nrows()
                )));
            }
            if basis.ncols() == 0 {
                return Err(SvarError::restriction(column, "the basis has no columns"));
            }
            if basis.ncols() > n {
                return Err(SvarError::restriction(
                    column,
                    format!("the basis has {} columns but B has {} rows", basis.ncols(), n),
                ));
            }
            if !mat_all_finite(&basis.as_ref()) {
                return Err(SvarError::restriction(column, "the basis contains non-finite values"));
            }
            let gram = basis.transpose() * basis.as_ref();
            if !full_rank_gram(gram.as_ref()) {
                return Err(SvarError::restriction(
                    column,
                    "the basis columns are linearly dependent",
                ));
            }
        }
        Ok(())
    }
}

fn full_rank_gram(gram: MatRef<'_, f64>) -> bool {
    let Some(lower) = cholesky_lower(gram) else {
        return false;
    };
    let diag = (0..lower.nrows()).map(|i| lower[(i, i)]).collect_vec();
    let max = diag.iter().cloned().fold(0f64, f64::max);
    diag.iter().all(|&d| d > 1e-10 * max)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn lower_triangular_bases() {
        let vb = Restrictions::lower_triangular(3);
        assert_eq!(vb.free_counts().collect_vec(), vec![3, 2, 1]);
        let last = vb.basis(2);
        assert_eq!(last.shape(), (3, 1));
        assert_eq!(last[(2, 0)], 1.);
        assert_eq!(last[(0, 0)], 0.);
        assert!(vb.validate(3).is_ok());
    }

    #[test]
    fn basis_lookup() {
        let vb = Restrictions::lower_triangular(2);
        assert_eq!(vb.get(1).map(|basis| basis.shape()), Some((2, 1)));
        assert!(vb.get(2).is_none());
    }

    #[test]
    #[should_panic]
    fn basis_out_of_range_panics() {
        Restrictions::unrestricted(2).basis(2);
    }

    #[test]
    fn pattern_bases() {
        let pattern = vec![vec![true, false], vec![true, true]];
        let vb = Restrictions::from_pattern(&pattern);
        assert_eq!(vb.free_counts().collect_vec(), vec![2, 1]);
        assert_eq!(vb.basis(1)[(1, 0)], 1.);
    }

    #[test]
    fn empty_column_is_restriction_error() {
        let pattern = vec![vec![true, false], vec![true, false]];
        let vb = Restrictions::from_pattern(&pattern);
        let err = vb.validate(2).unwrap_err();
        assert!(matches!(err, SvarError::Restriction { column: 1, .. }));
    }

    #[test]
    fn dependent_basis_is_restriction_error() {
        let mut bases = Restrictions::unrestricted(2).bases;
        bases[0] = Mat::from_fn(2, 2, |i, _| (i + 1) as f64);
        let err = Restrictions::new(bases).validate(2).unwrap_err();
        assert!(matches!(err, SvarError::Restriction { column: 0, .. }));
    }

    #[test]
    fn wrong_length_is_configuration_error() {
        let vb = Restrictions::unrestricted(3);
        assert!(matches!(vb.validate(2), Err(SvarError::Configuration(_))));
    }
}
